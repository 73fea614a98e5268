use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    db::{LabelSnapshot, Priority, StoreError, card_repo, entities::card},
    error::AppError,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct CreateCardRequest {
    pub column_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<String>,
    #[serde(default)]
    pub labels: Vec<LabelSnapshot>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCardRequest {
    pub title: Option<String>,
    /// Absent means "leave unchanged"; an explicit null clears the field.
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub priority: Option<String>,
    pub labels: Option<Vec<LabelSnapshot>>,
}

fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = serde::Deserialize::deserialize(deserializer)?;
    Ok(Some(value))
}

#[derive(Debug, Deserialize)]
pub struct MoveCardRequest {
    pub column_id: Uuid,
    pub position: i32,
}

#[derive(Debug, Deserialize)]
pub struct ReorderCardsRequest {
    pub card_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct CardResponse {
    pub id: Uuid,
    pub board_id: Uuid,
    pub column_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub position: i32,
    pub priority: String,
    pub labels: Vec<LabelSnapshot>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/boards/{board_id}/cards", post(create_card))
        .route(
            "/api/cards/{card_id}",
            get(get_card).put(update_card).delete(delete_card),
        )
        .route("/api/cards/{card_id}/move", put(move_card))
        .route(
            "/api/columns/{column_id}/cards/reorder",
            put(reorder_cards),
        )
        .with_state(state)
}

async fn create_card(
    State(state): State<Arc<AppState>>,
    Path(board_id): Path<Uuid>,
    Json(body): Json<CreateCardRequest>,
) -> Result<(StatusCode, Json<CardResponse>), AppError> {
    let title = normalize_title(&body.title)?.to_string();
    let priority = parse_priority(body.priority.as_deref())?.unwrap_or(Priority::None);

    let _guard = state.locks.lock(body.column_id).await;
    let card = card_repo::create_card(
        &state.db,
        &board_id,
        &body.column_id,
        &title,
        body.description,
        priority,
        body.labels,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(card.into())))
}

async fn get_card(
    State(state): State<Arc<AppState>>,
    Path(card_id): Path<Uuid>,
) -> Result<Json<CardResponse>, AppError> {
    let card = require_card(&state, &card_id).await?;
    Ok(Json(card.into()))
}

async fn update_card(
    State(state): State<Arc<AppState>>,
    Path(card_id): Path<Uuid>,
    Json(body): Json<UpdateCardRequest>,
) -> Result<Json<CardResponse>, AppError> {
    let UpdateCardRequest {
        title,
        description,
        priority,
        labels,
    } = body;
    let title = match title {
        Some(value) => Some(normalize_title(&value)?.to_string()),
        None => None,
    };
    let priority = parse_priority(priority.as_deref())?;
    if title.is_none() && description.is_none() && priority.is_none() && labels.is_none() {
        return Err(AppError::new(StatusCode::BAD_REQUEST, "No fields to update"));
    }
    let card = card_repo::update_card(&state.db, &card_id, title, description, priority, labels)
        .await?
        .ok_or_else(|| AppError::new(StatusCode::NOT_FOUND, "Card not found"))?;
    Ok(Json(card.into()))
}

async fn delete_card(
    State(state): State<Arc<AppState>>,
    Path(card_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    // The card's column is read state; resolve it under the lock so a
    // concurrent move cannot leave us compacting an unlocked column.
    let db = state.db.clone();
    let _guards = state
        .locks
        .lock_resolved(move || {
            let db = db.clone();
            async move {
                let card = card_repo::find_card_by_id(&db, &card_id)
                    .await?
                    .ok_or(StoreError::NotFound("Card not found"))?;
                Ok::<_, StoreError>(vec![card.column_id])
            }
        })
        .await?;
    card_repo::delete_card(&state.db, &card_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn move_card(
    State(state): State<Arc<AppState>>,
    Path(card_id): Path<Uuid>,
    Json(body): Json<MoveCardRequest>,
) -> Result<Json<CardResponse>, AppError> {
    let db = state.db.clone();
    let target_column = body.column_id;
    let _guards = state
        .locks
        .lock_resolved(move || {
            let db = db.clone();
            async move {
                let card = card_repo::find_card_by_id(&db, &card_id)
                    .await?
                    .ok_or(StoreError::NotFound("Card not found"))?;
                Ok::<_, StoreError>(vec![card.column_id, target_column])
            }
        })
        .await?;
    let moved = card_repo::move_card(&state.db, &card_id, &body.column_id, body.position).await?;
    Ok(Json(moved.into()))
}

async fn reorder_cards(
    State(state): State<Arc<AppState>>,
    Path(column_id): Path<Uuid>,
    Json(body): Json<ReorderCardsRequest>,
) -> Result<Json<Vec<CardResponse>>, AppError> {
    let _guard = state.locks.lock(column_id).await;
    let cards = card_repo::reorder_cards(&state.db, &column_id, &body.card_ids).await?;
    Ok(Json(cards.into_iter().map(CardResponse::from).collect()))
}

async fn require_card(state: &AppState, card_id: &Uuid) -> Result<card::Model, AppError> {
    Ok(card_repo::find_card_by_id(&state.db, card_id)
        .await?
        .ok_or_else(|| AppError::new(StatusCode::NOT_FOUND, "Card not found"))?)
}

fn normalize_title(title: &str) -> Result<&str, AppError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(AppError::new(StatusCode::BAD_REQUEST, "Title required"));
    }
    Ok(trimmed)
}

fn parse_priority(priority: Option<&str>) -> Result<Option<Priority>, AppError> {
    match priority {
        None => Ok(None),
        Some(value) => Priority::try_from(value)
            .map(Some)
            .map_err(|_| AppError::new(StatusCode::BAD_REQUEST, "Invalid priority")),
    }
}

#[cfg(test)]
mod tests {
    use super::UpdateCardRequest;

    #[test]
    fn update_request_tells_missing_description_from_null() {
        let absent: UpdateCardRequest = serde_json::from_str(r#"{"title": "t"}"#).unwrap();
        assert_eq!(absent.description, None);

        let cleared: UpdateCardRequest = serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert_eq!(cleared.description, Some(None));

        let set: UpdateCardRequest = serde_json::from_str(r#"{"description": "notes"}"#).unwrap();
        assert_eq!(set.description, Some(Some("notes".to_string())));
    }
}

impl From<card::Model> for CardResponse {
    fn from(model: card::Model) -> Self {
        Self {
            id: model.id,
            board_id: model.board_id,
            column_id: model.column_id,
            title: model.title,
            description: model.description,
            position: model.position,
            priority: model.priority,
            labels: serde_json::from_value(model.labels).unwrap_or_default(),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
