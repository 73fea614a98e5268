use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
    sea_query::{Expr, ExprTrait},
};
use uuid::Uuid;

use super::entities::prelude::{Board, BoardColumn, Card};
use super::entities::{board_column, card};
use super::{StoreError, ordering};

pub async fn find_column_by_id(
    db: &DatabaseConnection,
    id: &Uuid,
) -> Result<Option<board_column::Model>, StoreError> {
    Ok(BoardColumn::find_by_id(*id).one(db).await?)
}

pub async fn list_cards(
    db: &DatabaseConnection,
    column_id: &Uuid,
) -> Result<Vec<card::Model>, StoreError> {
    Ok(Card::find()
        .filter(card::Column::ColumnId.eq(*column_id))
        .order_by_asc(card::Column::Position)
        .all(db)
        .await?)
}

/// Append a new column to the board's ordering.
pub async fn create_column(
    db: &DatabaseConnection,
    board_id: &Uuid,
    name: &str,
    color: Option<&str>,
) -> Result<board_column::Model, StoreError> {
    let txn = db.begin().await?;
    if Board::find_by_id(*board_id).one(&txn).await?.is_none() {
        return Err(StoreError::NotFound("Board not found"));
    }
    let count = BoardColumn::find()
        .filter(board_column::Column::BoardId.eq(*board_id))
        .count(&txn)
        .await?;
    let column = board_column::ActiveModel {
        id: Set(Uuid::new_v4()),
        board_id: Set(*board_id),
        name: Set(name.to_string()),
        color: Set(color.unwrap_or("#6B7280").to_string()),
        position: Set(ordering::append_position(count)),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;
    Ok(column)
}

pub async fn update_column(
    db: &DatabaseConnection,
    id: &Uuid,
    name: Option<String>,
    color: Option<String>,
) -> Result<Option<board_column::Model>, StoreError> {
    let Some(column) = BoardColumn::find_by_id(*id).one(db).await? else {
        return Ok(None);
    };
    let mut active: board_column::ActiveModel = column.into();
    if let Some(name) = name {
        active.name = Set(name);
    }
    if let Some(color) = color {
        active.color = Set(color);
    }
    Ok(Some(active.update(db).await?))
}

/// Id of the column a deleted column's cards would migrate into: the lowest
/// positioned survivor. `None` when the column is the board's last.
pub async fn migration_target(
    db: &DatabaseConnection,
    column: &board_column::Model,
) -> Result<Option<Uuid>, StoreError> {
    let survivor = BoardColumn::find()
        .filter(board_column::Column::BoardId.eq(column.board_id))
        .filter(board_column::Column::Id.ne(column.id))
        .order_by_asc(board_column::Column::Position)
        .one(db)
        .await?;
    Ok(survivor.map(|c| c.id))
}

/// Delete a column. Its cards are appended, in their existing order, onto the
/// lowest positioned surviving column; the board's column positions are then
/// compacted. Deleting the board's last column is rejected while it still
/// holds cards.
pub async fn delete_column(db: &DatabaseConnection, id: &Uuid) -> Result<(), StoreError> {
    let txn = db.begin().await?;
    let Some(column) = BoardColumn::find_by_id(*id).one(&txn).await? else {
        return Err(StoreError::NotFound("Column not found"));
    };

    let survivor = BoardColumn::find()
        .filter(board_column::Column::BoardId.eq(column.board_id))
        .filter(board_column::Column::Id.ne(column.id))
        .order_by_asc(board_column::Column::Position)
        .one(&txn)
        .await?;

    match survivor {
        None => {
            let cards = Card::find()
                .filter(card::Column::ColumnId.eq(column.id))
                .count(&txn)
                .await?;
            if cards > 0 {
                return Err(StoreError::LastColumnNotEmpty);
            }
        }
        Some(target) => {
            let base = Card::find()
                .filter(card::Column::ColumnId.eq(target.id))
                .count(&txn)
                .await?;
            let cards = Card::find()
                .filter(card::Column::ColumnId.eq(column.id))
                .order_by_asc(card::Column::Position)
                .all(&txn)
                .await?;
            let now = Utc::now().fixed_offset();
            for (offset, migrated) in cards.into_iter().enumerate() {
                let mut active: card::ActiveModel = migrated.into();
                active.column_id = Set(target.id);
                active.position = Set(ordering::append_position(base) + offset as i32);
                active.updated_at = Set(now);
                active.update(&txn).await?;
            }
        }
    }

    BoardColumn::delete_by_id(column.id).exec(&txn).await?;
    shift_columns_above(&txn, &column.board_id, column.position).await?;
    txn.commit().await?;
    Ok(())
}

/// Replace the board's entire column ordering from an explicit id list. The
/// list must name the board's current columns exactly.
pub async fn reorder_columns(
    db: &DatabaseConnection,
    column_ids: &[Uuid],
) -> Result<Vec<board_column::Model>, StoreError> {
    if column_ids.is_empty() {
        return Err(StoreError::InvalidReorderSet);
    }
    let txn = db.begin().await?;
    let named: Vec<board_column::Model> = BoardColumn::find()
        .filter(board_column::Column::Id.is_in(column_ids.iter().copied()))
        .all(&txn)
        .await?;
    if named.len() != column_ids.len() {
        return Err(StoreError::InvalidReorderSet);
    }
    let board_id = named[0].board_id;
    if named.iter().any(|c| c.board_id != board_id) {
        return Err(StoreError::ScopeMismatch(
            "All columns must belong to the same board",
        ));
    }
    let members: Vec<Uuid> = BoardColumn::find()
        .filter(board_column::Column::BoardId.eq(board_id))
        .all(&txn)
        .await?
        .iter()
        .map(|c| c.id)
        .collect();
    ordering::validate_reorder(&members, column_ids)?;

    let mut by_id: HashMap<Uuid, board_column::Model> =
        named.into_iter().map(|c| (c.id, c)).collect();
    let mut updated = Vec::with_capacity(column_ids.len());
    for (position, id) in column_ids.iter().enumerate() {
        let column = by_id.remove(id).expect("id validated against membership");
        let mut active: board_column::ActiveModel = column.into();
        active.position = Set(position as i32);
        updated.push(active.update(&txn).await?);
    }
    txn.commit().await?;
    Ok(updated)
}

/// Close the gap left at `removed_position` in a board's column ordering.
async fn shift_columns_above<C: ConnectionTrait>(
    conn: &C,
    board_id: &Uuid,
    removed_position: i32,
) -> Result<(), StoreError> {
    BoardColumn::update_many()
        .col_expr(
            board_column::Column::Position,
            Expr::col(board_column::Column::Position).sub(1),
        )
        .filter(board_column::Column::BoardId.eq(*board_id))
        .filter(board_column::Column::Position.gt(removed_position))
        .exec(conn)
        .await?;
    Ok(())
}
