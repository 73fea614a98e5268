use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::db::ordering::ScopeLocks;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub locks: ScopeLocks,
}

impl AppState {
    pub fn new(db: DatabaseConnection) -> Arc<Self> {
        Arc::new(Self {
            db,
            locks: ScopeLocks::new(),
        })
    }
}
