use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use uuid::Uuid;

use super::StoreError;
use super::entities::prelude::{Board, BoardColumn, Card};
use super::entities::{board, board_column, card};

/// Columns seeded onto every new board.
pub const DEFAULT_COLUMNS: [(&str, &str); 4] = [
    ("Backlog", "#6B7280"),
    ("Todo", "#3B82F6"),
    ("In Progress", "#F59E0B"),
    ("Done", "#10B981"),
];

pub async fn create_board(
    db: &DatabaseConnection,
    name: &str,
) -> Result<(board::Model, Vec<board_column::Model>), StoreError> {
    let txn = db.begin().await?;
    let board = board::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut columns = Vec::with_capacity(DEFAULT_COLUMNS.len());
    for (position, (name, color)) in DEFAULT_COLUMNS.iter().enumerate() {
        let column = board_column::ActiveModel {
            id: Set(Uuid::new_v4()),
            board_id: Set(board.id),
            name: Set((*name).to_string()),
            color: Set((*color).to_string()),
            position: Set(position as i32),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        columns.push(column);
    }
    txn.commit().await?;
    Ok((board, columns))
}

pub async fn list_boards(db: &DatabaseConnection) -> Result<Vec<board::Model>, StoreError> {
    Ok(Board::find()
        .order_by_asc(board::Column::CreatedAt)
        .all(db)
        .await?)
}

pub async fn find_board_by_id(
    db: &DatabaseConnection,
    id: &Uuid,
) -> Result<Option<board::Model>, StoreError> {
    Ok(Board::find_by_id(*id).one(db).await?)
}

/// Board with its columns in position order, each carrying its cards in
/// position order.
pub async fn board_detail(
    db: &DatabaseConnection,
    id: &Uuid,
) -> Result<Option<(board::Model, Vec<(board_column::Model, Vec<card::Model>)>)>, StoreError> {
    let Some(board) = Board::find_by_id(*id).one(db).await? else {
        return Ok(None);
    };
    let columns = BoardColumn::find()
        .filter(board_column::Column::BoardId.eq(board.id))
        .order_by_asc(board_column::Column::Position)
        .all(db)
        .await?;
    let cards = Card::find()
        .filter(card::Column::BoardId.eq(board.id))
        .order_by_asc(card::Column::Position)
        .all(db)
        .await?;

    let mut by_column: HashMap<Uuid, Vec<card::Model>> = HashMap::new();
    for card in cards {
        by_column.entry(card.column_id).or_default().push(card);
    }
    let columns = columns
        .into_iter()
        .map(|column| {
            let cards = by_column.remove(&column.id).unwrap_or_default();
            (column, cards)
        })
        .collect();
    Ok(Some((board, columns)))
}

pub async fn update_board_name(
    db: &DatabaseConnection,
    id: &Uuid,
    name: &str,
) -> Result<Option<board::Model>, StoreError> {
    let Some(board) = Board::find_by_id(*id).one(db).await? else {
        return Ok(None);
    };
    let mut active: board::ActiveModel = board.into();
    active.name = Set(name.to_string());
    active.updated_at = Set(Utc::now().fixed_offset());
    Ok(Some(active.update(db).await?))
}

/// Cascades to columns, cards, and labels at the database level.
pub async fn delete_board(db: &DatabaseConnection, id: &Uuid) -> Result<bool, StoreError> {
    let result = Board::delete_by_id(*id).exec(db).await?;
    Ok(result.rows_affected > 0)
}
