//! Sibling order allocation for block content
//!
//! The sibling scope of a block is its page section: the live (non-removed)
//! content rows of every block sharing `page_section_id`. An unattached
//! block (no page section) is its own scope.

use crate::app_config;
use crate::moderation::ModerateState;
use crate::orm::{blocks, titles};
use sea_orm::{entity::*, query::*, ActiveValue::Set, ConnectionTrait, DbErr};

use crate::error::BlockError;

async fn sibling_block_ids<C: ConnectionTrait>(
    db: &C,
    block: &blocks::Model,
) -> Result<Vec<i32>, DbErr> {
    match block.page_section_id {
        Some(page_section_id) => {
            let siblings = blocks::Entity::find()
                .filter(blocks::Column::PageSectionId.eq(page_section_id))
                .all(db)
                .await?;
            Ok(siblings.into_iter().map(|b| b.id).collect())
        }
        None => Ok(vec![block.id]),
    }
}

/// Highest live order in the block's sibling scope.
async fn max_order<C: ConnectionTrait>(db: &C, block: &blocks::Model) -> Result<Option<i32>, DbErr> {
    let block_ids = sibling_block_ids(db, block).await?;
    let top = titles::Entity::find()
        .filter(titles::Column::BlockId.is_in(block_ids))
        .filter(titles::Column::ModerateState.ne(ModerateState::Removed))
        .order_by_desc(titles::Column::Order)
        .one(db)
        .await?;
    Ok(top.map(|t| t.order))
}

/// Next free sibling position: `max(order) + 1`, or 1 for an empty scope.
///
/// Must run inside the same transaction as the insert that consumes it.
pub async fn next_order<C: ConnectionTrait>(db: &C, block: &blocks::Model) -> Result<i32, DbErr> {
    Ok(max_order(db, block).await?.map(|o| o + 1).unwrap_or(1))
}

/// Post-insert collision check for a freshly allocated order.
///
/// Two creates racing on the same scope can compute the same position;
/// rather than silently overwriting, re-check after the insert and bump the
/// new row to a recomputed position. Retries are bounded by configuration;
/// a still-colliding row surfaces as a constraint violation.
pub async fn ensure_unique_order<C: ConnectionTrait>(
    db: &C,
    block: &blocks::Model,
    content: &titles::Model,
) -> Result<i32, BlockError> {
    let retries = app_config::get_config().ordering.allocation_retries;
    let mut order = content.order;
    for attempt in 0..=retries {
        if !order_taken_by_other(db, block, content.id, order).await? {
            return Ok(order);
        }
        if attempt == retries {
            break;
        }
        let fresh = next_order(db, block).await?;
        log::warn!(
            "order {} already taken in scope of block {}, retrying with {}",
            order,
            block.id,
            fresh
        );
        let mut active: titles::ActiveModel = content.clone().into();
        active.order = Set(fresh);
        active.update(db).await?;
        order = fresh;
    }
    Err(BlockError::Constraint(format!(
        "duplicate sibling order {} for block {}",
        order, block.id
    )))
}

async fn order_taken_by_other<C: ConnectionTrait>(
    db: &C,
    block: &blocks::Model,
    content_id: i32,
    order: i32,
) -> Result<bool, DbErr> {
    let block_ids: Vec<i32> = sibling_block_ids(db, block)
        .await?
        .into_iter()
        .filter(|id| *id != block.id)
        .collect();
    if block_ids.is_empty() {
        return Ok(false);
    }
    let clash = titles::Entity::find()
        .filter(titles::Column::BlockId.is_in(block_ids))
        .filter(titles::Column::ModerateState.ne(ModerateState::Removed))
        .filter(titles::Column::Order.eq(order))
        .filter(titles::Column::Id.ne(content_id))
        .one(db)
        .await?;
    Ok(clash.is_some())
}
