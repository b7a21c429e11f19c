pub mod build;
pub mod manifest;
pub mod pipeline;
pub mod publish;
pub mod rewrite;
pub mod stage;

pub use build::{ProjectBuilder, ProjectInfo};
pub use manifest::{slugify, ExerciseRecord, Manifest, ManifestStore};
pub use pipeline::{PublishPipeline, PublishReport};
pub use publish::Publisher;
pub use stage::{ArchiveStager, StagedProject};
