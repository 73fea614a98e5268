use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::StoreError;
use super::entities::label;
use super::entities::prelude::{Board, Label};

pub async fn list_labels(
    db: &DatabaseConnection,
    board_id: &Uuid,
) -> Result<Vec<label::Model>, StoreError> {
    if Board::find_by_id(*board_id).one(db).await?.is_none() {
        return Err(StoreError::NotFound("Board not found"));
    }
    Ok(Label::find()
        .filter(label::Column::BoardId.eq(*board_id))
        .order_by_asc(label::Column::Name)
        .all(db)
        .await?)
}

pub async fn create_label(
    db: &DatabaseConnection,
    board_id: &Uuid,
    name: &str,
    color: &str,
) -> Result<label::Model, StoreError> {
    if Board::find_by_id(*board_id).one(db).await?.is_none() {
        return Err(StoreError::NotFound("Board not found"));
    }
    let model = label::ActiveModel {
        id: Set(Uuid::new_v4()),
        board_id: Set(*board_id),
        name: Set(name.to_string()),
        color: Set(color.to_string()),
        ..Default::default()
    };
    Ok(model.insert(db).await?)
}

pub async fn update_label(
    db: &DatabaseConnection,
    id: &Uuid,
    name: &str,
    color: &str,
) -> Result<Option<label::Model>, StoreError> {
    let Some(label) = Label::find_by_id(*id).one(db).await? else {
        return Ok(None);
    };
    let mut active: label::ActiveModel = label.into();
    active.name = Set(name.to_string());
    active.color = Set(color.to_string());
    Ok(Some(active.update(db).await?))
}

/// Card snapshots taken from this label are untouched.
pub async fn delete_label(db: &DatabaseConnection, id: &Uuid) -> Result<bool, StoreError> {
    let result = Label::delete_by_id(*id).exec(db).await?;
    Ok(result.rows_affected > 0)
}
