use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

pub mod boards;
pub mod cards;
pub mod columns;
pub mod labels;
pub mod public;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(public::router())
        .merge(boards::router(state.clone()))
        .merge(columns::router(state.clone()))
        .merge(cards::router(state.clone()))
        .merge(labels::router(state))
}
