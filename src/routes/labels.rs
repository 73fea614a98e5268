use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    db::{entities::label, label_repo},
    error::AppError,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct LabelRequest {
    pub name: String,
    pub color: String,
}

#[derive(Debug, Serialize)]
pub struct LabelResponse {
    pub id: Uuid,
    pub board_id: Uuid,
    pub name: String,
    pub color: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/boards/{board_id}/labels",
            get(list_labels).post(create_label),
        )
        .route(
            "/api/labels/{label_id}",
            put(update_label).delete(delete_label),
        )
        .with_state(state)
}

async fn list_labels(
    State(state): State<Arc<AppState>>,
    Path(board_id): Path<Uuid>,
) -> Result<Json<Vec<LabelResponse>>, AppError> {
    let labels = label_repo::list_labels(&state.db, &board_id).await?;
    Ok(Json(labels.into_iter().map(LabelResponse::from).collect()))
}

async fn create_label(
    State(state): State<Arc<AppState>>,
    Path(board_id): Path<Uuid>,
    Json(body): Json<LabelRequest>,
) -> Result<(StatusCode, Json<LabelResponse>), AppError> {
    let name = normalize_name(&body.name)?;
    let label = label_repo::create_label(&state.db, &board_id, name, &body.color).await?;
    Ok((StatusCode::CREATED, Json(label.into())))
}

async fn update_label(
    State(state): State<Arc<AppState>>,
    Path(label_id): Path<Uuid>,
    Json(body): Json<LabelRequest>,
) -> Result<Json<LabelResponse>, AppError> {
    let name = normalize_name(&body.name)?;
    let label = label_repo::update_label(&state.db, &label_id, name, &body.color)
        .await?
        .ok_or_else(|| AppError::new(StatusCode::NOT_FOUND, "Label not found"))?;
    Ok(Json(label.into()))
}

async fn delete_label(
    State(state): State<Arc<AppState>>,
    Path(label_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let deleted = label_repo::delete_label(&state.db, &label_id).await?;
    if !deleted {
        return Err(AppError::new(StatusCode::NOT_FOUND, "Label not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

fn normalize_name(name: &str) -> Result<&str, AppError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::new(StatusCode::BAD_REQUEST, "Name required"));
    }
    Ok(trimmed)
}

impl From<label::Model> for LabelResponse {
    fn from(model: label::Model) -> Self {
        Self {
            id: model.id,
            board_id: model.board_id,
            name: model.name,
            color: model.color,
        }
    }
}
