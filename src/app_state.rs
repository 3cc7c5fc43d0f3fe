use cellmap_core::{AppConfig, AppConfigExt, DocumentStore};
use std::path::{Path, PathBuf};

#[derive(Default)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Option<DocumentStore>,
    /// Directory the current store was loaded from
    pub loaded_from: Option<PathBuf>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            config: AppConfig::load(),
            store: None,
            loaded_from: None,
        }
    }

    /// Resolve a user-supplied directory. Relative paths are taken against
    /// the configured documents directory; no argument means that directory.
    pub fn resolve_directory(&self, dir: Option<&str>) -> PathBuf {
        let base = Path::new(&self.config.documents_directory);
        match dir {
            Some(dir) if Path::new(dir).is_relative() => base.join(dir),
            Some(dir) => PathBuf::from(dir),
            None => base.to_path_buf(),
        }
    }

    pub fn set_store(&mut self, store: DocumentStore, dir: PathBuf) {
        self.store = Some(store);
        self.loaded_from = Some(dir);
    }
}
