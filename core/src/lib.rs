pub mod context;
pub mod engine;
pub mod store;

// Re-exports for convenience
pub use context::{AppConfig, AppConfigExt, ConfigError, EngineConfig};
pub use engine::{
    EngineError, generate_map_snapshot, parse_document, parse_documents, parse_snapshot_time,
};
pub use store::{DocumentStore, StoreError};
