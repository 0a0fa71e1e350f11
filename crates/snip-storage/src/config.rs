use crate::memory::MemoryStore;
use crate::postgres::PostgresStore;
use snip_core::{Result, Store};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use typed_builder::TypedBuilder;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Selects and configures a storage backend.
///
/// A non-empty `database_url` selects PostgreSQL. Otherwise the in-memory
/// backend is used, persisted to `snapshot_path` when one is set.
#[derive(Debug, Clone, TypedBuilder)]
pub struct StoreConfig {
    #[builder(default, setter(strip_option(fallback = snapshot_path_opt), into))]
    pub snapshot_path: Option<PathBuf>,
    #[builder(default, setter(strip_option(fallback = database_url_opt), into))]
    pub database_url: Option<String>,
    #[builder(default = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: u32,
}

impl StoreConfig {
    fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref().filter(|url| !url.is_empty())
    }
}

/// Opens the backend described by `config`.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn Store>> {
    if let Some(url) = config.database_url() {
        let store = PostgresStore::connect(url, config.max_connections).await?;
        info!(max_connections = config.max_connections, "using postgres store");
        return Ok(Arc::new(store));
    }

    match &config.snapshot_path {
        Some(path) => {
            let store = MemoryStore::open(path.clone()).await?;
            info!(snapshot = %path.display(), "using memory store");
            Ok(Arc::new(store))
        }
        None => {
            info!("using memory store without snapshot");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
