pub mod settings;

pub use settings::{BuildSection, RemoteSection, StoreConfig, StoreSection, UiSection};
