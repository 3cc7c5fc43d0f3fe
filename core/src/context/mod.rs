mod config;
mod error;

pub use config::{AppConfig, AppConfigExt, EngineConfig};
pub use error::ConfigError;
