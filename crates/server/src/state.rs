use crate::error::ApiError;
use bucketwatch_core::ConfigStore;
use bucketwatch_s3::ObjectStore;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared handler state. The store slot starts empty when the endpoint
/// is unreachable at boot and is swapped in whenever connection
/// settings are saved, so handlers always see the latest client.
#[derive(Clone)]
pub struct AppState {
    pub config: ConfigStore,
    store: Arc<RwLock<Option<Arc<dyn ObjectStore>>>>,
}

impl AppState {
    pub fn new(config: ConfigStore) -> Self {
        Self {
            config,
            store: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_store(config: ConfigStore, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            config,
            store: Arc::new(RwLock::new(Some(store))),
        }
    }

    /// The current store, or a 503 if no connection has been
    /// configured yet.
    pub async fn store(&self) -> Result<Arc<dyn ObjectStore>, ApiError> {
        self.store
            .read()
            .await
            .clone()
            .ok_or_else(ApiError::unconfigured)
    }

    pub async fn store_if_configured(&self) -> Option<Arc<dyn ObjectStore>> {
        self.store.read().await.clone()
    }

    pub async fn replace_store(&self, store: Arc<dyn ObjectStore>) {
        *self.store.write().await = Some(store);
    }
}
