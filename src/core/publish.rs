use std::fs;
use std::path::{Path, PathBuf};

use crate::core::manifest::{ExerciseRecord, META_FILE};
use crate::error::{ErrorContext, Result, StoreError};

/// Copies finished build output into the exercise store under a stable slug,
/// replacing any prior version.
pub struct Publisher {
    store_root: PathBuf,
}

impl Publisher {
    pub fn new<P: AsRef<Path>>(store_root: P) -> Self {
        Self {
            store_root: store_root.as_ref().to_path_buf(),
        }
    }

    pub fn target_dir(&self, slug: &str) -> PathBuf {
        self.store_root.join(slug)
    }

    /// Publish `build_dir` as `record.folder`. An existing folder with the
    /// same slug is fully removed first (replace, never merge). On success
    /// the target mirrors the build output plus the metadata file. A copy
    /// failure is surfaced; partially copied files are not rolled back.
    pub fn publish(&self, build_dir: &Path, record: &ExerciseRecord) -> Result<PathBuf> {
        let target = self.target_dir(&record.folder);

        if target.exists() {
            fs::remove_dir_all(&target)
                .with_io_context(|| format!("removing previous version {}", target.display()))?;
        }
        fs::create_dir_all(&target)
            .with_io_context(|| format!("creating exercise folder {}", target.display()))?;

        copy_recursive(build_dir, &target)?;
        self.write_meta(&target, record)?;

        Ok(target)
    }

    /// Remove a published folder. `NotFound` if the slug has no folder.
    pub fn unpublish(&self, slug: &str) -> Result<()> {
        let target = self.target_dir(slug);
        if !target.is_dir() {
            return Err(StoreError::NotFound {
                resource: "published exercise".to_string(),
                identifier: slug.to_string(),
            });
        }
        fs::remove_dir_all(&target)
            .with_io_context(|| format!("removing exercise folder {}", target.display()))
    }

    fn write_meta(&self, target: &Path, record: &ExerciseRecord) -> Result<()> {
        let meta_path = target.join(META_FILE);
        let content = serde_json::to_string_pretty(record).map_err(|e| StoreError::Generic {
            message: format!("Failed to serialize exercise metadata: {}", e),
            source: Some(Box::new(e)),
        })?;
        fs::write(&meta_path, content)
            .with_io_context(|| format!("writing {}", meta_path.display()))
    }
}

/// Copy every file and subdirectory from `src` to `dest`, preserving
/// structure.
fn copy_recursive(src: &Path, dest: &Path) -> Result<()> {
    let entries = fs::read_dir(src)
        .with_io_context(|| format!("reading build output {}", src.display()))?;

    for entry in entries {
        let entry = entry.with_io_context(|| "reading build output entry".to_string())?;
        let src_path = entry.path();
        let dest_path = dest.join(entry.file_name());

        if entry
            .file_type()
            .with_io_context(|| format!("inspecting {}", src_path.display()))?
            .is_dir()
        {
            fs::create_dir_all(&dest_path)
                .with_io_context(|| format!("creating {}", dest_path.display()))?;
            copy_recursive(&src_path, &dest_path)?;
        } else {
            fs::copy(&src_path, &dest_path).with_io_context(|| {
                format!("copying {} to {}", src_path.display(), dest_path.display())
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::manifest::ExerciseRecord;

    fn sample_build(dir: &Path) {
        fs::create_dir_all(dir.join("assets")).unwrap();
        fs::write(dir.join("index.html"), "<html></html>").unwrap();
        fs::write(dir.join("assets/app.js"), "console.log(1)").unwrap();
    }

    #[test]
    fn publish_mirrors_build_output_plus_metadata() {
        let tmp = tempfile::tempdir().unwrap();
        let build = tmp.path().join("dist");
        sample_build(&build);

        let publisher = Publisher::new(tmp.path().join("exercises"));
        let record = ExerciseRecord::built("quiz", Some("a quiz"), "quiz");
        let target = publisher.publish(&build, &record).unwrap();

        assert!(target.join("index.html").is_file());
        assert!(target.join("assets/app.js").is_file());

        let meta: ExerciseRecord =
            serde_json::from_str(&fs::read_to_string(target.join(META_FILE)).unwrap()).unwrap();
        assert_eq!(meta, record);
    }

    #[test]
    fn republish_replaces_instead_of_merging() {
        let tmp = tempfile::tempdir().unwrap();
        let publisher = Publisher::new(tmp.path().join("exercises"));
        let record = ExerciseRecord::built("quiz", None, "quiz");

        let first = tmp.path().join("dist1");
        sample_build(&first);
        fs::write(first.join("stale.txt"), "old").unwrap();
        publisher.publish(&first, &record).unwrap();

        let second = tmp.path().join("dist2");
        sample_build(&second);
        let target = publisher.publish(&second, &record).unwrap();

        assert!(target.join("index.html").is_file());
        assert!(!target.join("stale.txt").exists());
    }

    #[test]
    fn unpublish_removes_the_folder() {
        let tmp = tempfile::tempdir().unwrap();
        let publisher = Publisher::new(tmp.path().join("exercises"));
        let build = tmp.path().join("dist");
        sample_build(&build);

        let record = ExerciseRecord::built("quiz", None, "quiz");
        publisher.publish(&build, &record).unwrap();
        publisher.unpublish("quiz").unwrap();
        assert!(!publisher.target_dir("quiz").exists());

        assert!(matches!(
            publisher.unpublish("quiz").unwrap_err(),
            StoreError::NotFound { .. }
        ));
    }
}
