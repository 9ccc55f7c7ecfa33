use std::sync::Arc;

use common::storage::BlobStore;
use registry::Registry;

use crate::config::AppConfig;
use crate::files::FileRegistry;
use crate::persona::PersonaDirectory;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub blob_store: Arc<dyn BlobStore>,
    pub directory: Arc<PersonaDirectory>,
    pub files: Arc<FileRegistry>,
}

impl AppState {
    /// Wire the directory and file registry over one shared registry backend.
    pub fn new(
        config: AppConfig,
        registry: Arc<dyn Registry>,
        blob_store: Arc<dyn BlobStore>,
    ) -> Self {
        let directory = Arc::new(PersonaDirectory::new(
            registry.clone(),
            config.identity.namespace,
        ));
        let files = Arc::new(FileRegistry::new(
            registry,
            directory.clone(),
            blob_store.clone(),
        ));

        Self {
            config,
            blob_store,
            directory,
            files,
        }
    }
}
