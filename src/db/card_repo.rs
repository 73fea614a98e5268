use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, Set, TransactionTrait,
    sea_query::{Expr, ExprTrait},
};
use uuid::Uuid;

use super::entities::prelude::{BoardColumn, Card};
use super::entities::card;
use super::{LabelSnapshot, Priority, StoreError, ordering};

pub async fn find_card_by_id(
    db: &DatabaseConnection,
    id: &Uuid,
) -> Result<Option<card::Model>, StoreError> {
    Ok(Card::find_by_id(*id).one(db).await?)
}

/// Append a new card to the named column's ordering.
pub async fn create_card(
    db: &DatabaseConnection,
    board_id: &Uuid,
    column_id: &Uuid,
    title: &str,
    description: Option<String>,
    priority: Priority,
    labels: Vec<LabelSnapshot>,
) -> Result<card::Model, StoreError> {
    let txn = db.begin().await?;
    let Some(column) = BoardColumn::find_by_id(*column_id).one(&txn).await? else {
        return Err(StoreError::NotFound("Column not found"));
    };
    if column.board_id != *board_id {
        return Err(StoreError::ScopeMismatch(
            "Column does not belong to the given board",
        ));
    }
    let count = Card::find()
        .filter(card::Column::ColumnId.eq(*column_id))
        .count(&txn)
        .await?;
    let card = card::ActiveModel {
        id: Set(Uuid::new_v4()),
        board_id: Set(*board_id),
        column_id: Set(*column_id),
        title: Set(title.to_string()),
        description: Set(description),
        position: Set(ordering::append_position(count)),
        priority: Set(priority.as_str().to_string()),
        labels: Set(serde_json::to_value(labels).expect("label snapshots serialize")),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;
    Ok(card)
}

pub async fn update_card(
    db: &DatabaseConnection,
    id: &Uuid,
    title: Option<String>,
    description: Option<Option<String>>,
    priority: Option<Priority>,
    labels: Option<Vec<LabelSnapshot>>,
) -> Result<Option<card::Model>, StoreError> {
    let Some(card) = Card::find_by_id(*id).one(db).await? else {
        return Ok(None);
    };
    let mut active: card::ActiveModel = card.into();
    if let Some(title) = title {
        active.title = Set(title);
    }
    // Outer None leaves the description alone; Some(None) clears it.
    if let Some(description) = description {
        active.description = Set(description);
    }
    if let Some(priority) = priority {
        active.priority = Set(priority.as_str().to_string());
    }
    if let Some(labels) = labels {
        active.labels = Set(serde_json::to_value(labels).expect("label snapshots serialize"));
    }
    active.updated_at = Set(Utc::now().fixed_offset());
    Ok(Some(active.update(db).await?))
}

/// Delete a card and close the gap it leaves in its column.
pub async fn delete_card(db: &DatabaseConnection, id: &Uuid) -> Result<(), StoreError> {
    let txn = db.begin().await?;
    let Some(card) = Card::find_by_id(*id).one(&txn).await? else {
        return Err(StoreError::NotFound("Card not found"));
    };
    Card::delete_by_id(card.id).exec(&txn).await?;
    shift_cards_above(&txn, &card.column_id, card.position).await?;
    txn.commit().await?;
    Ok(())
}

/// Move a card to `requested_position` in `target_column_id`, which may be
/// its current column. Out-of-range targets are clamped. Both the vacated and
/// the receiving ordering are rewritten in one transaction.
pub async fn move_card(
    db: &DatabaseConnection,
    id: &Uuid,
    target_column_id: &Uuid,
    requested_position: i32,
) -> Result<card::Model, StoreError> {
    let txn = db.begin().await?;
    let Some(card) = Card::find_by_id(*id).one(&txn).await? else {
        return Err(StoreError::NotFound("Card not found"));
    };

    if card.column_id == *target_column_id {
        let count = Card::find()
            .filter(card::Column::ColumnId.eq(card.column_id))
            .count(&txn)
            .await?;
        let target = ordering::clamp_move_target(count, requested_position);
        let Some(shift) = ordering::move_shift(card.position, target) else {
            txn.commit().await?;
            return Ok(card);
        };
        Card::update_many()
            .col_expr(
                card::Column::Position,
                Expr::col(card::Column::Position).add(shift.delta),
            )
            .filter(card::Column::ColumnId.eq(card.column_id))
            .filter(card::Column::Position.between(shift.lo, shift.hi))
            .exec(&txn)
            .await?;
        let mut active: card::ActiveModel = card.into();
        active.position = Set(target);
        active.updated_at = Set(Utc::now().fixed_offset());
        let moved = active.update(&txn).await?;
        txn.commit().await?;
        return Ok(moved);
    }

    let Some(target_column) = BoardColumn::find_by_id(*target_column_id).one(&txn).await? else {
        return Err(StoreError::NotFound("Column not found"));
    };
    if target_column.board_id != card.board_id {
        return Err(StoreError::ScopeMismatch(
            "Target column belongs to a different board",
        ));
    }

    let count = Card::find()
        .filter(card::Column::ColumnId.eq(target_column.id))
        .count(&txn)
        .await?;
    let insert_at = ordering::clamp_insert_target(count, requested_position);

    // Open the slot in the receiving column, then compact the vacated one.
    Card::update_many()
        .col_expr(
            card::Column::Position,
            Expr::col(card::Column::Position).add(1),
        )
        .filter(card::Column::ColumnId.eq(target_column.id))
        .filter(card::Column::Position.gte(insert_at))
        .exec(&txn)
        .await?;
    shift_cards_above(&txn, &card.column_id, card.position).await?;

    let mut active: card::ActiveModel = card.into();
    active.column_id = Set(target_column.id);
    active.position = Set(insert_at);
    active.updated_at = Set(Utc::now().fixed_offset());
    let moved = active.update(&txn).await?;
    txn.commit().await?;
    Ok(moved)
}

/// Replace one column's entire card ordering from an explicit id list. The
/// list must name the column's current cards exactly.
pub async fn reorder_cards(
    db: &DatabaseConnection,
    column_id: &Uuid,
    card_ids: &[Uuid],
) -> Result<Vec<card::Model>, StoreError> {
    let txn = db.begin().await?;
    if BoardColumn::find_by_id(*column_id).one(&txn).await?.is_none() {
        return Err(StoreError::NotFound("Column not found"));
    }
    let members: Vec<card::Model> = Card::find()
        .filter(card::Column::ColumnId.eq(*column_id))
        .all(&txn)
        .await?;
    let member_ids: Vec<Uuid> = members.iter().map(|c| c.id).collect();
    ordering::validate_reorder(&member_ids, card_ids)?;

    let mut by_id: HashMap<Uuid, card::Model> = members.into_iter().map(|c| (c.id, c)).collect();
    let mut updated = Vec::with_capacity(card_ids.len());
    for (position, id) in card_ids.iter().enumerate() {
        let card = by_id.remove(id).expect("id validated against membership");
        let mut active: card::ActiveModel = card.into();
        active.position = Set(position as i32);
        updated.push(active.update(&txn).await?);
    }
    txn.commit().await?;
    Ok(updated)
}

/// Close the gap left at `removed_position` in a column's card ordering.
async fn shift_cards_above<C: ConnectionTrait>(
    conn: &C,
    column_id: &Uuid,
    removed_position: i32,
) -> Result<(), StoreError> {
    Card::update_many()
        .col_expr(
            card::Column::Position,
            Expr::col(card::Column::Position).sub(1),
        )
        .filter(card::Column::ColumnId.eq(*column_id))
        .filter(card::Column::Position.gt(removed_position))
        .exec(conn)
        .await?;
    Ok(())
}
