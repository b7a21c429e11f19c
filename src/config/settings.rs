use std::fs;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::error::{ErrorContext, Result, StoreError};

/// Default name of the configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = "exstore.toml";

/// Main exstore configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub build: BuildSection,
    #[serde(default)]
    pub remote: RemoteSection,
    #[serde(default)]
    pub ui: UiSection,
}

/// Exercise store layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSection {
    /// Root directory holding one folder per published exercise plus manifest.json
    pub root: Option<PathBuf>,
    /// Scratch directory used while staging and building an archive
    pub scratch: Option<PathBuf>,
}

/// Settings for the project build step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSection {
    /// Dependency install command, run through `sh -c`. Failure is non-fatal.
    pub install_command: String,
    /// Build command, run through `sh -c`. Failure aborts the publish.
    pub build_command: String,
    /// Wall-clock budget for the build command, in seconds
    pub timeout_secs: u64,
    /// Conventional output folder names, checked in order
    pub output_dirs: Vec<String>,
}

/// Remote mirror repository identity and credential pass-through
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSection {
    /// Repository owner (user or organization)
    pub owner: Option<String>,
    /// Repository name
    pub repo: Option<String>,
    /// Bearer token; falls back to the GITHUB_TOKEN environment variable
    pub token: Option<String>,
    /// Base URL for the Contents API
    pub api_base: String,
    /// Path prefix inside the repository that mirrors the store root
    pub prefix: String,
}

/// UI and display configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiSection {
    /// Whether to show colored output
    pub colored: bool,
    /// Whether to show spinners during install/build
    pub progress_bars: bool,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            root: None,    // resolves to ./exercises
            scratch: None, // resolves to ./temp-build
        }
    }
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            install_command: "npm install".to_string(),
            build_command: "npm run build".to_string(),
            timeout_secs: 180,
            output_dirs: vec![
                "dist".to_string(),
                "build".to_string(),
                "out".to_string(),
                ".output".to_string(),
            ],
        }
    }
}

impl Default for RemoteSection {
    fn default() -> Self {
        Self {
            owner: None,
            repo: None,
            token: None,
            api_base: "https://api.github.com".to_string(),
            prefix: "exercises".to_string(),
        }
    }
}

impl Default for UiSection {
    fn default() -> Self {
        Self {
            colored: std::env::var("NO_COLOR").is_err(),
            progress_bars: true,
        }
    }
}

impl StoreConfig {
    /// Load configuration from file or create default
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        if config_path.exists() {
            let content = fs::read_to_string(config_path)
                .with_io_context(|| format!("reading config file {}", config_path.display()))?;

            toml::from_str(&content).map_err(|e| StoreError::Config {
                message: format!("Invalid TOML: {}", e),
                path: Some(config_path.to_path_buf()),
            })
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, config_path: P) -> Result<()> {
        let config_path = config_path.as_ref();

        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_io_context(|| format!("creating config directory {}", parent.display()))?;
            }
        }

        let content = toml::to_string_pretty(self).map_err(|e| StoreError::Config {
            message: format!("Failed to serialize config: {}", e),
            path: Some(config_path.to_path_buf()),
        })?;

        fs::write(config_path, content)
            .with_io_context(|| format!("writing config file {}", config_path.display()))?;

        Ok(())
    }

    /// Load `exstore.toml` from the working directory, falling back to defaults
    pub fn load_or_default() -> Result<Self> {
        Self::load(CONFIG_FILE)
    }

    /// Exercise store root (configured or ./exercises)
    pub fn store_root(&self) -> PathBuf {
        self.store
            .root
            .clone()
            .unwrap_or_else(|| PathBuf::from("exercises"))
    }

    /// Scratch directory for staging (configured or ./temp-build)
    pub fn scratch_dir(&self) -> PathBuf {
        self.store
            .scratch
            .clone()
            .unwrap_or_else(|| PathBuf::from("temp-build"))
    }
}

impl RemoteSection {
    /// Resolve the bearer token from config or environment
    pub fn resolve_token(&self) -> Option<String> {
        self.token
            .clone()
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
    }
}
