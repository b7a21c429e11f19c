// Core modules
pub mod error;
pub mod config;
pub mod core;

// Remote mirror (GitHub Contents API)
pub mod remote;

// CLI surface
pub mod cli;

// Re-exports for convenience
pub use error::{Result, StoreError};
pub use config::StoreConfig;
pub use self::core::{ArchiveStager, ManifestStore, ProjectBuilder, PublishPipeline, Publisher};
