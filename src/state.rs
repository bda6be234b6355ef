use std::sync::Arc;

use sqlx::SqlitePool;

use crate::firebase::RemoteStore;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub store: Arc<dyn RemoteStore>,
}
