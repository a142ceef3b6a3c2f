//! Content write operations
//!
//! The mutating entry points of the core. Each one resolves the content
//! handler through the registry and opens exactly one transaction, so a
//! failure can never leave the shadow/live pair half-applied.

use crate::error::BlockError;
use crate::orm::{blocks, page_sections, sections};
use crate::registry::{ContentRegistry, ContentView};
use chrono::Utc;
use sea_orm::{
    entity::*, query::*, ActiveValue::Set, DatabaseConnection, TransactionTrait,
};

/// Create a block in the page section and a draft content row on it.
pub async fn create_content(
    db: &DatabaseConnection,
    registry: &ContentRegistry,
    page_section_id: i32,
    payload: &serde_json::Value,
) -> Result<ContentView, BlockError> {
    let page_section = page_sections::Entity::find()
        .filter(page_sections::Column::Id.eq(page_section_id))
        .one(db)
        .await?
        .ok_or_else(|| BlockError::NotFound(format!("page section {}", page_section_id)))?;
    let section = sections::Entity::find()
        .filter(sections::Column::Id.eq(page_section.section_id))
        .one(db)
        .await?
        .ok_or_else(|| BlockError::NotFound(format!("section {}", page_section.section_id)))?;
    let handler = registry.get(&section.kind)?;

    let txn = db.begin().await?;
    let now = Utc::now().naive_utc();
    let block = blocks::ActiveModel {
        page_section_id: Set(Some(page_section.id)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    let view = handler.create(&txn, block.id, payload).await?;
    txn.commit().await?;
    Ok(view)
}

/// Apply a payload to content, shadowing a published row first.
pub async fn update_content(
    db: &DatabaseConnection,
    registry: &ContentRegistry,
    kind: &str,
    content_id: i32,
    payload: &serde_json::Value,
) -> Result<ContentView, BlockError> {
    let handler = registry.get(kind)?;
    let txn = db.begin().await?;
    let view = handler.update(&txn, content_id, payload).await?;
    txn.commit().await?;
    Ok(view)
}

/// Promote content to published, superseding the previous live row.
pub async fn publish_content(
    db: &DatabaseConnection,
    registry: &ContentRegistry,
    kind: &str,
    content_id: i32,
    actor: i32,
) -> Result<ContentView, BlockError> {
    let handler = registry.get(kind)?;
    let txn = db.begin().await?;
    let view = handler.publish(&txn, content_id, actor).await?;
    txn.commit().await?;
    Ok(view)
}

/// Hide the content's block from both read paths, keeping a tombstone.
pub async fn remove_content(
    db: &DatabaseConnection,
    registry: &ContentRegistry,
    kind: &str,
    content_id: i32,
    actor: i32,
) -> Result<(), BlockError> {
    let handler = registry.get(kind)?;
    let txn = db.begin().await?;
    handler.remove(&txn, content_id, actor).await?;
    txn.commit().await?;
    Ok(())
}

/// Throw away a pending shadow; the published row it shadows stays live.
pub async fn discard_pending_edit(
    db: &DatabaseConnection,
    registry: &ContentRegistry,
    kind: &str,
    content_id: i32,
) -> Result<(), BlockError> {
    let handler = registry.get(kind)?;
    let txn = db.begin().await?;
    handler.discard(&txn, content_id).await?;
    txn.commit().await?;
    Ok(())
}

/// Physically delete the content's block and every row hanging off it.
pub async fn purge_content(
    db: &DatabaseConnection,
    registry: &ContentRegistry,
    kind: &str,
    content_id: i32,
) -> Result<(), BlockError> {
    let handler = registry.get(kind)?;
    let txn = db.begin().await?;
    handler.purge(&txn, content_id).await?;
    txn.commit().await?;
    Ok(())
}
