use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::columns::ColumnResponse;
use crate::{
    db::{board_repo, entities::board},
    error::AppError,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct CreateBoardRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBoardRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct BoardResponse {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Debug, Serialize)]
pub struct BoardDetailResponse {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub columns: Vec<ColumnResponse>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/boards", post(create_board).get(list_boards))
        .route(
            "/api/boards/{board_id}",
            get(get_board).put(update_board).delete(delete_board),
        )
        .with_state(state)
}

async fn create_board(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateBoardRequest>,
) -> Result<(StatusCode, Json<BoardDetailResponse>), AppError> {
    let name = normalize_name(&body.name)?;
    let (board, columns) = board_repo::create_board(&state.db, name).await?;
    let columns = columns.into_iter().map(ColumnResponse::from).collect();
    Ok((
        StatusCode::CREATED,
        Json(BoardDetailResponse {
            id: board.id,
            name: board.name,
            created_at: board.created_at,
            updated_at: board.updated_at,
            columns,
        }),
    ))
}

async fn list_boards(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<BoardResponse>>, AppError> {
    let boards = board_repo::list_boards(&state.db).await?;
    Ok(Json(boards.into_iter().map(BoardResponse::from).collect()))
}

async fn get_board(
    State(state): State<Arc<AppState>>,
    Path(board_id): Path<Uuid>,
) -> Result<Json<BoardDetailResponse>, AppError> {
    detail_response(&state, &board_id).await.map(Json)
}

async fn update_board(
    State(state): State<Arc<AppState>>,
    Path(board_id): Path<Uuid>,
    Json(body): Json<UpdateBoardRequest>,
) -> Result<Json<BoardDetailResponse>, AppError> {
    let name = normalize_name(&body.name)?;
    board_repo::update_board_name(&state.db, &board_id, name)
        .await?
        .ok_or_else(|| AppError::new(StatusCode::NOT_FOUND, "Board not found"))?;
    detail_response(&state, &board_id).await.map(Json)
}

async fn delete_board(
    State(state): State<Arc<AppState>>,
    Path(board_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let _guard = state.locks.lock(board_id).await;
    let deleted = board_repo::delete_board(&state.db, &board_id).await?;
    if !deleted {
        return Err(AppError::new(StatusCode::NOT_FOUND, "Board not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn detail_response(
    state: &AppState,
    board_id: &Uuid,
) -> Result<BoardDetailResponse, AppError> {
    let (board, columns) = board_repo::board_detail(&state.db, board_id)
        .await?
        .ok_or_else(|| AppError::new(StatusCode::NOT_FOUND, "Board not found"))?;
    let columns = columns
        .into_iter()
        .map(|(column, cards)| ColumnResponse::from_parts(column, cards))
        .collect();
    Ok(BoardDetailResponse {
        id: board.id,
        name: board.name,
        created_at: board.created_at,
        updated_at: board.updated_at,
        columns,
    })
}

fn normalize_name(name: &str) -> Result<&str, AppError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::new(StatusCode::BAD_REQUEST, "Name required"));
    }
    Ok(trimmed)
}

impl From<board::Model> for BoardResponse {
    fn from(model: board::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            created_at: model.created_at,
        }
    }
}
