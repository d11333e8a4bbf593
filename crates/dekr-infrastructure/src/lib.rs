pub mod config;
pub mod draft_store;
pub mod paths;

pub use crate::config::ClientConfig;
pub use crate::draft_store::FileDraftStore;
pub use crate::paths::DekrPaths;
