use crate::config::DashboardConfig;
use crate::errors::AppError;
use crate::storage::RecordStore;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared server state. The store sits behind one mutex so requests reach the
/// backing file one at a time.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<RecordStore>>,
    pub dashboard: Arc<DashboardConfig>,
}

impl AppState {
    pub fn new(store: RecordStore, dashboard: DashboardConfig) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            dashboard: Arc::new(dashboard),
        }
    }

    /// Run a store operation on the blocking pool while holding the lock.
    pub async fn with_store<T, F>(&self, op: F) -> Result<T, AppError>
    where
        F: FnOnce(&RecordStore) -> T + Send + 'static,
        T: Send + 'static,
    {
        let guard = Arc::clone(&self.store).lock_owned().await;
        Ok(tokio::task::spawn_blocking(move || op(&*guard)).await?)
    }
}
