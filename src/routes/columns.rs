use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{post, put},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cards::CardResponse;
use crate::{
    db::{StoreError, column_repo, entities::board_column, entities::card},
    error::AppError,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct CreateColumnRequest {
    pub name: String,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateColumnRequest {
    pub name: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderColumnsRequest {
    pub column_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ColumnResponse {
    pub id: Uuid,
    pub board_id: Uuid,
    pub name: String,
    pub position: i32,
    pub color: String,
    pub cards: Vec<CardResponse>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/boards/{board_id}/columns", post(create_column))
        .route("/api/columns/reorder", put(reorder_columns))
        .route(
            "/api/columns/{column_id}",
            put(update_column).delete(delete_column),
        )
        .with_state(state)
}

async fn create_column(
    State(state): State<Arc<AppState>>,
    Path(board_id): Path<Uuid>,
    Json(body): Json<CreateColumnRequest>,
) -> Result<(StatusCode, Json<ColumnResponse>), AppError> {
    let name = normalize_name(&body.name)?.to_string();
    let _guard = state.locks.lock(board_id).await;
    let column =
        column_repo::create_column(&state.db, &board_id, &name, body.color.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(column.into())))
}

async fn update_column(
    State(state): State<Arc<AppState>>,
    Path(column_id): Path<Uuid>,
    Json(body): Json<UpdateColumnRequest>,
) -> Result<Json<ColumnResponse>, AppError> {
    let name = match body.name {
        Some(value) => Some(normalize_name(&value)?.to_string()),
        None => None,
    };
    if name.is_none() && body.color.is_none() {
        return Err(AppError::new(StatusCode::BAD_REQUEST, "No fields to update"));
    }
    let column = column_repo::update_column(&state.db, &column_id, name, body.color)
        .await?
        .ok_or_else(|| AppError::new(StatusCode::NOT_FOUND, "Column not found"))?;
    let cards = column_repo::list_cards(&state.db, &column_id).await?;
    Ok(Json(ColumnResponse::from_parts(column, cards)))
}

async fn delete_column(
    State(state): State<Arc<AppState>>,
    Path(column_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    // Board ordering, the dying column's cards, and the receiving column's
    // cards are all rewritten by this operation. The receiving column depends
    // on the board's current ordering, so resolve it under the locks.
    let db = state.db.clone();
    let _guards = state
        .locks
        .lock_resolved(move || {
            let db = db.clone();
            async move {
                let column = column_repo::find_column_by_id(&db, &column_id)
                    .await?
                    .ok_or(StoreError::NotFound("Column not found"))?;
                let mut scopes = vec![column.board_id, column.id];
                if let Some(target) = column_repo::migration_target(&db, &column).await? {
                    scopes.push(target);
                }
                Ok::<_, StoreError>(scopes)
            }
        })
        .await?;
    column_repo::delete_column(&state.db, &column_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn reorder_columns(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ReorderColumnsRequest>,
) -> Result<Json<Vec<ColumnResponse>>, AppError> {
    let Some(first) = body.column_ids.first() else {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "column_ids list cannot be empty",
        ));
    };
    let board_id = column_repo::find_column_by_id(&state.db, first)
        .await?
        .ok_or_else(|| AppError::new(StatusCode::NOT_FOUND, "Column not found"))?
        .board_id;

    let _guard = state.locks.lock(board_id).await;
    let columns = column_repo::reorder_columns(&state.db, &body.column_ids).await?;
    Ok(Json(columns.into_iter().map(ColumnResponse::from).collect()))
}

fn normalize_name(name: &str) -> Result<&str, AppError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::new(StatusCode::BAD_REQUEST, "Name required"));
    }
    Ok(trimmed)
}

impl ColumnResponse {
    pub fn from_parts(column: board_column::Model, cards: Vec<card::Model>) -> Self {
        Self {
            id: column.id,
            board_id: column.board_id,
            name: column.name,
            position: column.position,
            color: column.color,
            cards: cards.into_iter().map(CardResponse::from).collect(),
        }
    }
}

impl From<board_column::Model> for ColumnResponse {
    fn from(model: board_column::Model) -> Self {
        Self::from_parts(model, Vec::new())
    }
}
