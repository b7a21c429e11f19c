use std::fs;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorContext, Result, StoreError};

/// Manifest file name under the store root
pub const MANIFEST_FILE: &str = "manifest.json";

/// Per-exercise metadata file written into each published folder
pub const META_FILE: &str = "meta.json";

/// Id prefix for pipeline-published exercises
pub const BUILT_ID_PREFIX: &str = "built-";

const DEFAULT_ICON: &str = "🎮";
const DEFAULT_DESCRIPTION: &str = "Built web exercise";

/// One entry in the exercise manifest.
///
/// Field names follow the JSON consumed by the gallery front end.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExerciseRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub created: String,
    pub folder: String,
    #[serde(rename = "isBuilt")]
    pub is_built: bool,
}

impl ExerciseRecord {
    /// Record for a pipeline-published exercise. `created` is stamped now;
    /// callers republishing an existing slug keep the original stamp via
    /// [`Manifest::upsert`].
    pub fn built(name: &str, description: Option<&str>, slug: &str) -> Self {
        Self {
            id: format!("{}{}", BUILT_ID_PREFIX, slug),
            name: display_name(name, slug),
            description: description
                .filter(|d| !d.trim().is_empty())
                .unwrap_or(DEFAULT_DESCRIPTION)
                .to_string(),
            icon: DEFAULT_ICON.to_string(),
            created: chrono::Utc::now().format("%Y-%m-%d").to_string(),
            folder: slug.to_string(),
            is_built: true,
        }
    }
}

fn display_name(name: &str, slug: &str) -> String {
    if name.trim().is_empty() {
        slug.replace('-', " ")
    } else {
        name.to_string()
    }
}

/// Derive a filesystem-safe slug from a display name: lowercase, anything
/// outside `[a-z0-9-]` becomes `-`, repeated `-` collapsed.
pub fn slugify(name: &str) -> Result<String> {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = false;

    for c in name.to_lowercase().chars() {
        let mapped = if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
            c
        } else {
            '-'
        };
        if mapped == '-' {
            if !last_dash {
                slug.push('-');
            }
            last_dash = true;
        } else {
            slug.push(mapped);
            last_dash = false;
        }
    }

    if slug.is_empty() {
        return Err(StoreError::InvalidInput {
            message: format!("cannot derive a slug from '{}'", name),
        });
    }

    Ok(slug)
}

/// The single JSON index of all published exercises.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Manifest {
    #[serde(default)]
    pub exercises: Vec<ExerciseRecord>,
}

impl Manifest {
    /// Replace any record with the same id and re-sort by display name.
    ///
    /// The `created` stamp of a replaced record is preserved: republishing
    /// keeps the original publish date.
    pub fn upsert(&mut self, mut record: ExerciseRecord) {
        if let Some(existing) = self.exercises.iter().find(|e| e.id == record.id) {
            record.created = existing.created.clone();
        }
        self.exercises.retain(|e| e.id != record.id);
        self.exercises.push(record);
        self.sort();
    }

    /// Remove a record by id. Returns the removed record, if any.
    pub fn remove(&mut self, id: &str) -> Option<ExerciseRecord> {
        let pos = self.exercises.iter().position(|e| e.id == id)?;
        Some(self.exercises.remove(pos))
    }

    pub fn find(&self, id: &str) -> Option<&ExerciseRecord> {
        self.exercises.iter().find(|e| e.id == id)
    }

    fn sort(&mut self) {
        self.exercises.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name))
        });
    }
}

/// Owns the manifest document under a store root: read-merge-write with
/// whole-file replacement on every mutation.
pub struct ManifestStore {
    root: PathBuf,
}

impl ManifestStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    /// Load the manifest. A missing or unparsable file is treated as an
    /// empty collection, never as a fatal error.
    pub fn load(&self) -> Manifest {
        let path = self.manifest_path();
        if !path.exists() {
            return Manifest::default();
        }
        fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }

    /// Write the whole manifest back in one rename, so readers never see a
    /// partially written document.
    pub fn save(&self, manifest: &Manifest) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_io_context(|| format!("creating store root {}", self.root.display()))?;

        let path = self.manifest_path();
        let tmp = self.root.join(format!("{}.tmp", MANIFEST_FILE));
        let content = serde_json::to_string_pretty(manifest).map_err(|e| StoreError::Generic {
            message: format!("Failed to serialize manifest: {}", e),
            source: Some(Box::new(e)),
        })?;

        fs::write(&tmp, content)
            .with_io_context(|| format!("writing manifest to {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_io_context(|| format!("replacing manifest {}", path.display()))?;

        Ok(())
    }

    /// Load, upsert one record, save. Returns the merged record as stored.
    pub fn upsert(&self, record: ExerciseRecord) -> Result<ExerciseRecord> {
        let mut manifest = self.load();
        let id = record.id.clone();
        manifest.upsert(record);
        self.save(&manifest)?;
        Ok(manifest.find(&id).cloned().expect("record was just inserted"))
    }

    /// Load, remove one record, save. `NotFound` if the id is absent.
    pub fn remove(&self, id: &str) -> Result<ExerciseRecord> {
        let mut manifest = self.load();
        let removed = manifest.remove(id).ok_or_else(|| StoreError::NotFound {
            resource: "exercise".to_string(),
            identifier: id.to_string(),
        })?;
        self.save(&manifest)?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, slug: &str) -> ExerciseRecord {
        ExerciseRecord::built(name, Some("test exercise"), slug)
    }

    #[test]
    fn slugify_normalizes_names() {
        assert_eq!(slugify("grammar-master").unwrap(), "grammar-master");
        assert_eq!(slugify("Grammar Master").unwrap(), "grammar-master");
        assert_eq!(slugify("My  Quiz!! App").unwrap(), "my-quiz-app");
        assert_eq!(slugify("číselná řada").unwrap(), "-seln-ada");
        assert!(slugify("").is_err());
    }

    #[test]
    fn slugify_collapses_repeated_dashes() {
        assert_eq!(slugify("a---b").unwrap(), "a-b");
        assert_eq!(slugify("a!?b").unwrap(), "a-b");
    }

    #[test]
    fn built_record_derives_id_and_folder_from_slug() {
        let r = record("grammar-master", "grammar-master");
        assert_eq!(r.id, "built-grammar-master");
        assert_eq!(r.folder, "grammar-master");
        assert!(r.is_built);
    }

    #[test]
    fn built_record_falls_back_to_defaults() {
        let r = ExerciseRecord::built("", None, "word-drill");
        assert_eq!(r.name, "word drill");
        assert_eq!(r.description, DEFAULT_DESCRIPTION);
        assert_eq!(r.icon, DEFAULT_ICON);
    }

    #[test]
    fn upsert_replaces_by_id_and_keeps_sorted() {
        let mut manifest = Manifest::default();
        manifest.upsert(record("Zeta", "zeta"));
        manifest.upsert(record("alpha", "alpha"));
        manifest.upsert(record("Middle", "middle"));

        let names: Vec<_> = manifest.exercises.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "Middle", "Zeta"]);

        // Same id again: replaced, not duplicated
        manifest.upsert(record("alpha v2", "alpha"));
        assert_eq!(manifest.exercises.len(), 3);
        assert_eq!(
            manifest
                .exercises
                .iter()
                .filter(|e| e.id == "built-alpha")
                .count(),
            1
        );
    }

    #[test]
    fn upsert_preserves_the_original_created_stamp() {
        let mut manifest = Manifest::default();
        let mut first = record("alpha", "alpha");
        first.created = "2020-01-01".to_string();
        manifest.upsert(first);

        manifest.upsert(record("alpha", "alpha"));
        assert_eq!(manifest.find("built-alpha").unwrap().created, "2020-01-01");
    }

    #[test]
    fn store_treats_missing_or_corrupt_manifest_as_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ManifestStore::new(tmp.path());
        assert!(store.load().exercises.is_empty());

        fs::write(store.manifest_path(), "{ not json").unwrap();
        assert!(store.load().exercises.is_empty());
    }

    #[test]
    fn store_round_trips_records() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ManifestStore::new(tmp.path().join("exercises"));
        store.upsert(record("alpha", "alpha")).unwrap();
        store.upsert(record("beta", "beta")).unwrap();

        let manifest = store.load();
        assert_eq!(manifest.exercises.len(), 2);
        assert_eq!(manifest.exercises[0].id, "built-alpha");

        store.remove("built-alpha").unwrap();
        assert_eq!(store.load().exercises.len(), 1);
        assert!(store.remove("built-alpha").is_err());
    }
}
