use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{ErrorContext, Result, StoreError};

/// Build descriptor expected at the project root of every staged archive
pub const BUILD_DESCRIPTOR: &str = "package.json";

/// Extracts a packaged project into a scratch directory and normalizes it
/// to a single project root.
pub struct ArchiveStager {
    scratch: PathBuf,
}

/// A staged archive, resolved to its project root inside the scratch dir.
#[derive(Debug)]
pub struct StagedProject {
    pub root: PathBuf,
}

impl ArchiveStager {
    pub fn new<P: AsRef<Path>>(scratch: P) -> Self {
        Self {
            scratch: scratch.as_ref().to_path_buf(),
        }
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch
    }

    /// Extract `archive` into a fresh scratch directory and locate the
    /// project root. On a missing build descriptor the scratch directory is
    /// removed before the error is returned.
    pub fn stage(&self, archive: &Path) -> Result<StagedProject> {
        if !archive.is_file() {
            return Err(StoreError::InvalidInput {
                message: format!("archive not found: {}", archive.display()),
            });
        }

        self.reset_scratch()?;
        if let Err(e) = self.extract(archive) {
            let _ = self.cleanup();
            return Err(e);
        }

        let root = match resolve_project_root(&self.scratch) {
            Ok(root) => root,
            Err(e) => {
                let _ = self.cleanup();
                return Err(e);
            }
        };

        if !root.join(BUILD_DESCRIPTOR).is_file() {
            self.cleanup()?;
            return Err(StoreError::InvalidPackage { path: root });
        }

        Ok(StagedProject { root })
    }

    /// Remove the scratch directory. Safe to call when it is already gone.
    pub fn cleanup(&self) -> Result<()> {
        if self.scratch.exists() {
            fs::remove_dir_all(&self.scratch)
                .with_io_context(|| format!("removing scratch directory {}", self.scratch.display()))?;
        }
        Ok(())
    }

    fn reset_scratch(&self) -> Result<()> {
        self.cleanup()?;
        fs::create_dir_all(&self.scratch)
            .with_io_context(|| format!("creating scratch directory {}", self.scratch.display()))?;
        Ok(())
    }

    fn extract(&self, archive: &Path) -> Result<()> {
        let name = archive.to_string_lossy().to_lowercase();

        let output = if name.ends_with(".zip") {
            Command::new("unzip")
                .arg("-q")
                .arg(archive)
                .arg("-d")
                .arg(&self.scratch)
                .output()
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Command::new("tar")
                .arg("-xzf")
                .arg(archive)
                .arg("-C")
                .arg(&self.scratch)
                .output()
        } else if name.ends_with(".tar") {
            Command::new("tar")
                .arg("-xf")
                .arg(archive)
                .arg("-C")
                .arg(&self.scratch)
                .output()
        } else {
            return Err(StoreError::Archive {
                path: archive.to_path_buf(),
                reason: "unsupported archive format (expected .zip, .tar.gz, .tgz or .tar)"
                    .to_string(),
            });
        };

        let output = output
            .with_io_context(|| format!("running extractor for {}", archive.display()))?;

        if !output.status.success() {
            return Err(StoreError::Archive {
                path: archive.to_path_buf(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

/// If the scratch directory contains exactly one entry and it is a
/// directory, that directory is the project root; otherwise the scratch
/// directory itself is.
pub fn resolve_project_root(scratch: &Path) -> Result<PathBuf> {
    let mut entries = Vec::new();
    let read = fs::read_dir(scratch)
        .with_io_context(|| format!("reading scratch directory {}", scratch.display()))?;

    for entry in read {
        let entry = entry.with_io_context(|| "reading scratch entry".to_string())?;
        entries.push(entry.path());
    }

    if entries.len() == 1 && entries[0].is_dir() {
        Ok(entries[0].clone())
    } else {
        Ok(scratch.to_path_buf())
    }
}
