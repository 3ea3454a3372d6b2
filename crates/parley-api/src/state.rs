use std::sync::Arc;

use parley_db::ChatStore;
use tracing::error;

use crate::error::{ApiError, ApiResult};
use crate::middleware::IdentityResolver;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<dyn ChatStore>,
    pub identity: Arc<dyn IdentityResolver>,
    /// Upper bound for the `limit` query parameter.
    pub page_limit_max: u32,
}

impl AppStateInner {
    /// Run blocking store work off the async runtime.
    pub async fn run<F, T>(&self, f: F) -> ApiResult<T>
    where
        F: FnOnce(&dyn ChatStore) -> ApiResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&*db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ApiError::Internal
            })?
    }
}
