//! Shared handler state.

use crate::error::ApiError;
use memoria_rs_config::ServerConfig;
use memoria_rs_memory::{MemoryError, MemoryStore};
use std::sync::Arc;

/// Store handle plus request limits, cloned into every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<MemoryStore>,
    pub limits: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(store: Arc<MemoryStore>, limits: ServerConfig) -> Self {
        Self {
            store,
            limits: Arc::new(limits),
        }
    }

    /// Run a store call on the blocking pool.
    pub async fn run<T, F>(&self, call: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&MemoryStore) -> Result<T, MemoryError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let result = tokio::task::spawn_blocking(move || call(&store)).await?;
        Ok(result?)
    }
}
