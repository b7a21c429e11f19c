use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use regex::Regex;
use serde::Deserialize;

use crate::config::BuildSection;
use crate::core::stage::BUILD_DESCRIPTOR;
use crate::error::{ErrorContext, Result, StoreError};

/// Declared project identity read from the build descriptor.
#[derive(Debug, Clone)]
pub struct ProjectInfo {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct Descriptor {
    name: Option<String>,
    description: Option<String>,
}

/// Outcome of a bounded subprocess run.
#[derive(Debug)]
struct CommandOutcome {
    success: bool,
    exit_code: Option<i32>,
    stderr_tail: String,
}

/// Installs a staged project's dependencies and runs its build command.
pub struct ProjectBuilder {
    config: BuildSection,
}

impl ProjectBuilder {
    pub fn new(config: BuildSection) -> Self {
        Self { config }
    }

    /// Read the project descriptor. A missing `name` falls back to the
    /// archive's base file name without extension.
    pub fn read_descriptor(&self, project_root: &Path, archive: &Path) -> Result<ProjectInfo> {
        let path = project_root.join(BUILD_DESCRIPTOR);
        let content = fs::read_to_string(&path)
            .with_io_context(|| format!("reading {}", path.display()))?;

        let descriptor: Descriptor =
            serde_json::from_str(&content).map_err(|e| StoreError::Generic {
                message: format!("Invalid {}: {}", path.display(), e),
                source: Some(Box::new(e)),
            })?;

        let name = descriptor
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| archive_stem(archive));

        Ok(ProjectInfo {
            name,
            description: descriptor.description,
        })
    }

    /// If the build tool configuration exists and does not already declare a
    /// base path, inject `base: './'` so the output can be served from an
    /// arbitrary sub-path. Mutates the config file in place.
    pub fn inject_relative_base(&self, project_root: &Path) -> Result<bool> {
        for file in ["vite.config.ts", "vite.config.js"] {
            let path = project_root.join(file);
            if !path.is_file() {
                continue;
            }

            let content = fs::read_to_string(&path)
                .with_io_context(|| format!("reading {}", path.display()))?;
            if content.contains("base:") {
                return Ok(false);
            }

            let re = Regex::new(r"export default defineConfig\(\{").expect("static pattern");
            if !re.is_match(&content) {
                return Ok(false);
            }
            let patched = re.replace(
                &content,
                "export default defineConfig({\n  base: './',",
            );
            fs::write(&path, patched.as_ref())
                .with_io_context(|| format!("writing {}", path.display()))?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Run the dependency install command. A failed install is a warning,
    /// not an error: lockfiles may already satisfy the build.
    pub fn install(&self, project_root: &Path) -> Result<bool> {
        let output = Command::new("sh")
            .arg("-c")
            .arg(&self.config.install_command)
            .current_dir(project_root)
            .output()
            .with_io_context(|| format!("running '{}'", self.config.install_command))?;

        Ok(output.status.success())
    }

    /// Run the build command under the configured wall-clock budget.
    /// Failure or timeout is fatal for the publish.
    pub fn build(&self, project_root: &Path) -> Result<()> {
        let outcome = self.run_bounded(&self.config.build_command, project_root)?;

        if !outcome.success {
            return Err(StoreError::Build {
                command: self.config.build_command.clone(),
                exit_code: outcome.exit_code,
                stderr: outcome.stderr_tail,
            });
        }
        Ok(())
    }

    /// Locate the build output: first existing directory from the ordered
    /// candidate list under the project root.
    pub fn find_output_dir(&self, project_root: &Path) -> Result<PathBuf> {
        for candidate in &self.config.output_dirs {
            let path = project_root.join(candidate);
            if path.is_dir() {
                return Ok(path);
            }
        }
        Err(StoreError::NoOutputDirectory {
            searched: self.config.output_dirs.clone(),
        })
    }

    fn run_bounded(&self, command: &str, cwd: &Path) -> Result<CommandOutcome> {
        let stdout_log = cwd.join(".exstore-build.out");
        let stderr_log = cwd.join(".exstore-build.err");
        let stdout_file = fs::File::create(&stdout_log)
            .with_io_context(|| format!("creating build log {}", stdout_log.display()))?;
        let stderr_file = fs::File::create(&stderr_log)
            .with_io_context(|| format!("creating build log {}", stderr_log.display()))?;

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout_file))
            .stderr(Stdio::from(stderr_file))
            .spawn()
            .with_io_context(|| format!("spawning '{}'", command))?;

        let deadline = Instant::now() + Duration::from_secs(self.config.timeout_secs);
        let status = loop {
            if let Some(status) = child
                .try_wait()
                .with_io_context(|| format!("waiting for '{}'", command))?
            {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(StoreError::BuildTimeout {
                    command: command.to_string(),
                    seconds: self.config.timeout_secs,
                });
            }
            thread::sleep(Duration::from_millis(200));
        };

        let stderr_tail = tail_of(&stderr_log, 2000);
        let _ = fs::remove_file(&stdout_log);
        let _ = fs::remove_file(&stderr_log);

        Ok(CommandOutcome {
            success: status.success(),
            exit_code: status.code(),
            stderr_tail,
        })
    }
}

fn archive_stem(archive: &Path) -> String {
    let stem = archive
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "exercise".to_string());
    // foo.tar.gz leaves foo.tar as the stem
    stem.strip_suffix(".tar").map(str::to_string).unwrap_or(stem)
}

fn tail_of(path: &Path, max_bytes: usize) -> String {
    let content = fs::read_to_string(path).unwrap_or_default();
    let trimmed = content.trim();
    if trimmed.len() <= max_bytes {
        return trimmed.to_string();
    }
    let start = trimmed.len() - max_bytes;
    // Avoid slicing inside a UTF-8 sequence
    let start = (start..trimmed.len())
        .find(|i| trimmed.is_char_boundary(*i))
        .unwrap_or(start);
    trimmed[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> ProjectBuilder {
        ProjectBuilder::new(BuildSection::default())
    }

    fn builder_with(f: impl FnOnce(&mut BuildSection)) -> ProjectBuilder {
        let mut config = BuildSection::default();
        f(&mut config);
        ProjectBuilder::new(config)
    }

    #[test]
    fn descriptor_name_falls_back_to_archive_stem() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join(BUILD_DESCRIPTOR), "{}").unwrap();

        let info = builder()
            .read_descriptor(tmp.path(), Path::new("/downloads/grammar-master.zip"))
            .unwrap();
        assert_eq!(info.name, "grammar-master");
        assert!(info.description.is_none());

        let info = builder()
            .read_descriptor(tmp.path(), Path::new("/downloads/word-drill.tar.gz"))
            .unwrap();
        assert_eq!(info.name, "word-drill");
    }

    #[test]
    fn descriptor_reads_declared_name_and_description() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join(BUILD_DESCRIPTOR),
            r#"{"name": "grammar-master", "description": "Irregular verbs quiz"}"#,
        )
        .unwrap();

        let info = builder()
            .read_descriptor(tmp.path(), Path::new("archive.zip"))
            .unwrap();
        assert_eq!(info.name, "grammar-master");
        assert_eq!(info.description.as_deref(), Some("Irregular verbs quiz"));
    }

    #[test]
    fn inject_relative_base_patches_vite_config_once() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("vite.config.ts");
        fs::write(
            &config_path,
            "import { defineConfig } from 'vite'\nexport default defineConfig({\n  plugins: [],\n})\n",
        )
        .unwrap();

        assert!(builder().inject_relative_base(tmp.path()).unwrap());
        let patched = fs::read_to_string(&config_path).unwrap();
        assert!(patched.contains("base: './',"));

        // Second pass: base already declared, nothing to do
        assert!(!builder().inject_relative_base(tmp.path()).unwrap());
        assert_eq!(fs::read_to_string(&config_path).unwrap(), patched);
    }

    #[test]
    fn inject_relative_base_without_config_is_a_noop() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(!builder().inject_relative_base(tmp.path()).unwrap());
    }

    #[test]
    fn find_output_dir_checks_candidates_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("build")).unwrap();
        fs::create_dir(tmp.path().join("dist")).unwrap();

        let out = builder().find_output_dir(tmp.path()).unwrap();
        assert_eq!(out, tmp.path().join("dist"));
    }

    #[test]
    fn missing_output_dir_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = builder().find_output_dir(tmp.path()).unwrap_err();
        assert!(matches!(err, StoreError::NoOutputDirectory { .. }));
    }

    #[test]
    fn build_failure_carries_the_tool_stderr() {
        let tmp = tempfile::tempdir().unwrap();
        let b = builder_with(|c| {
            c.build_command = "echo 'module not found' >&2; exit 2".to_string();
        });

        let err = b.build(tmp.path()).unwrap_err();
        match err {
            StoreError::Build { exit_code, stderr, .. } => {
                assert_eq!(exit_code, Some(2));
                assert!(stderr.contains("module not found"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn build_timeout_kills_the_child() {
        let tmp = tempfile::tempdir().unwrap();
        let b = builder_with(|c| {
            c.build_command = "sleep 30".to_string();
            c.timeout_secs = 1;
        });

        let err = b.build(tmp.path()).unwrap_err();
        assert!(matches!(err, StoreError::BuildTimeout { .. }));
    }

    #[test]
    fn install_failure_is_reported_as_a_flag() {
        let tmp = tempfile::tempdir().unwrap();
        let b = builder_with(|c| c.install_command = "exit 1".to_string());
        assert!(!b.install(tmp.path()).unwrap());

        let b = builder_with(|c| c.install_command = "true".to_string());
        assert!(b.install(tmp.path()).unwrap());
    }
}
