use std::sync::Arc;

use axum::Router;
use sea_orm::{DatabaseBackend, MockDatabase};

use crate::{routes::router, state::AppState};

/// Router over a mock connection, for tests that never reach the database.
pub fn test_router() -> Router {
    let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
    let state = AppState::new(db);
    router(Arc::clone(&state))
}
