//! Title content kind
//!
//! The reference implementation of [`ContentHandler`]: heading text with an
//! optional picture, an optional link, an ordered slideshow and an ordered
//! reference list. The moderation row mechanics here (shadow copies,
//! supersede-and-promote, block-level tombstones) are what every content
//! kind has to provide behind the capability interface.

use crate::assoc::{self, AssocRow, AssocTable, Direction};
use crate::error::BlockError;
use crate::moderation::{self, ModerateState};
use crate::ordering;
use crate::orm::{blocks, title_images, title_links, titles};
use crate::registry::{ContentHandler, ContentView, FieldRef};
use crate::wizard::{Cardinality, WizardField, WizardKind};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    entity::*, query::*, sea_query::Expr, ActiveValue::Set, ConnectionTrait, DatabaseTransaction,
    DbErr,
};
use serde::Deserialize;
use std::collections::HashMap;
use validator::Validate;

/// Registry key for this kind
pub const KIND: &str = "title";

const WIZARD_FIELDS: &[WizardField] = &[
    WizardField {
        name: "picture",
        kind: WizardKind::Image,
        cardinality: Cardinality::Single,
    },
    WizardField {
        name: "slideshow",
        kind: WizardKind::Image,
        cardinality: Cardinality::Multi,
    },
    WizardField {
        name: "link",
        kind: WizardKind::Link,
        cardinality: Cardinality::Single,
    },
    WizardField {
        name: "references",
        kind: WizardKind::Link,
        cardinality: Cardinality::Multi,
    },
];

/// Inbound create/update payload
#[derive(Debug, Deserialize, Validate)]
pub struct TitlePayload {
    #[validate(length(min = 1, max = 500))]
    pub title: String,
}

/// Slideshow join (title -> images)
pub struct Slideshow;

#[async_trait]
impl AssocTable for Slideshow {
    const FIELD: &'static str = "slideshow";

    async fn rows<C: ConnectionTrait>(db: &C, content_id: i32) -> Result<Vec<AssocRow>, DbErr> {
        let rows = title_images::Entity::find()
            .filter(title_images::Column::ContentId.eq(content_id))
            .order_by_asc(title_images::Column::Order)
            .all(db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| AssocRow {
                id: r.id,
                target_id: r.image_id,
                order: r.order,
            })
            .collect())
    }

    async fn insert<C: ConnectionTrait>(
        db: &C,
        content_id: i32,
        target_id: i32,
        order: i32,
    ) -> Result<i32, DbErr> {
        let row = title_images::ActiveModel {
            content_id: Set(content_id),
            image_id: Set(target_id),
            order: Set(order),
            ..Default::default()
        }
        .insert(db)
        .await?;
        Ok(row.id)
    }

    async fn set_order<C: ConnectionTrait>(db: &C, row_id: i32, order: i32) -> Result<(), DbErr> {
        title_images::Entity::update_many()
            .col_expr(title_images::Column::Order, Expr::value(order))
            .filter(title_images::Column::Id.eq(row_id))
            .exec(db)
            .await?;
        Ok(())
    }

    async fn delete_row<C: ConnectionTrait>(db: &C, row_id: i32) -> Result<(), DbErr> {
        title_images::Entity::delete_many()
            .filter(title_images::Column::Id.eq(row_id))
            .exec(db)
            .await?;
        Ok(())
    }

    async fn clear<C: ConnectionTrait>(db: &C, content_id: i32) -> Result<(), DbErr> {
        title_images::Entity::delete_many()
            .filter(title_images::Column::ContentId.eq(content_id))
            .exec(db)
            .await?;
        Ok(())
    }

    async fn copy_all<C: ConnectionTrait>(
        db: &C,
        from_content: i32,
        to_content: i32,
    ) -> Result<(), DbErr> {
        for row in Self::rows(db, from_content).await? {
            title_images::ActiveModel {
                content_id: Set(to_content),
                image_id: Set(row.target_id),
                order: Set(row.order),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
        Ok(())
    }
}

/// Reference-list join (title -> links)
pub struct References;

#[async_trait]
impl AssocTable for References {
    const FIELD: &'static str = "references";

    async fn rows<C: ConnectionTrait>(db: &C, content_id: i32) -> Result<Vec<AssocRow>, DbErr> {
        let rows = title_links::Entity::find()
            .filter(title_links::Column::ContentId.eq(content_id))
            .order_by_asc(title_links::Column::Order)
            .all(db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| AssocRow {
                id: r.id,
                target_id: r.link_id,
                order: r.order,
            })
            .collect())
    }

    async fn insert<C: ConnectionTrait>(
        db: &C,
        content_id: i32,
        target_id: i32,
        order: i32,
    ) -> Result<i32, DbErr> {
        let row = title_links::ActiveModel {
            content_id: Set(content_id),
            link_id: Set(target_id),
            order: Set(order),
            ..Default::default()
        }
        .insert(db)
        .await?;
        Ok(row.id)
    }

    async fn set_order<C: ConnectionTrait>(db: &C, row_id: i32, order: i32) -> Result<(), DbErr> {
        title_links::Entity::update_many()
            .col_expr(title_links::Column::Order, Expr::value(order))
            .filter(title_links::Column::Id.eq(row_id))
            .exec(db)
            .await?;
        Ok(())
    }

    async fn delete_row<C: ConnectionTrait>(db: &C, row_id: i32) -> Result<(), DbErr> {
        title_links::Entity::delete_many()
            .filter(title_links::Column::Id.eq(row_id))
            .exec(db)
            .await?;
        Ok(())
    }

    async fn clear<C: ConnectionTrait>(db: &C, content_id: i32) -> Result<(), DbErr> {
        title_links::Entity::delete_many()
            .filter(title_links::Column::ContentId.eq(content_id))
            .exec(db)
            .await?;
        Ok(())
    }

    async fn copy_all<C: ConnectionTrait>(
        db: &C,
        from_content: i32,
        to_content: i32,
    ) -> Result<(), DbErr> {
        for row in Self::rows(db, from_content).await? {
            title_links::ActiveModel {
                content_id: Set(to_content),
                link_id: Set(row.target_id),
                order: Set(row.order),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
        Ok(())
    }
}

async fn fetch<C: ConnectionTrait>(db: &C, content_id: i32) -> Result<titles::Model, BlockError> {
    titles::Entity::find()
        .filter(titles::Column::Id.eq(content_id))
        .one(db)
        .await?
        .ok_or_else(|| BlockError::NotFound(format!("title content {}", content_id)))
}

async fn fetch_block<C: ConnectionTrait>(db: &C, block_id: i32) -> Result<blocks::Model, BlockError> {
    blocks::Entity::find()
        .filter(blocks::Column::Id.eq(block_id))
        .one(db)
        .await?
        .ok_or_else(|| BlockError::NotFound(format!("block {}", block_id)))
}

async fn sibling<C: ConnectionTrait>(
    db: &C,
    block_id: i32,
    state: ModerateState,
) -> Result<Option<titles::Model>, BlockError> {
    Ok(titles::Entity::find()
        .filter(titles::Column::BlockId.eq(block_id))
        .filter(titles::Column::ModerateState.eq(state))
        .one(db)
        .await?)
}

async fn view<C: ConnectionTrait>(db: &C, model: &titles::Model) -> Result<ContentView, BlockError> {
    let slideshow = Slideshow::rows(db, model.id).await?;
    let references = References::rows(db, model.id).await?;
    Ok(ContentView {
        id: model.id,
        block_id: model.block_id,
        order: model.order,
        state: model.moderate_state.clone(),
        fields: serde_json::json!({
            "title": model.title,
            "picture_id": model.picture_id,
            "link_id": model.link_id,
            "slideshow": slideshow.iter().map(|r| r.target_id).collect::<Vec<i32>>(),
            "references": references.iter().map(|r| r.target_id).collect::<Vec<i32>>(),
        }),
    })
}

fn parse_payload(payload: &serde_json::Value) -> Result<TitlePayload, BlockError> {
    let payload: TitlePayload = serde_json::from_value(payload.clone())
        .map_err(|e| BlockError::Configuration(format!("title payload does not match: {}", e)))?;
    payload.validate()?;
    Ok(payload)
}

/// Ensure an editable row exists for the content and return its id.
///
/// Draft and Pending rows edit in place. For a Published row the pending
/// shadow is found or materialized: a clone of the row plus copies of its
/// slideshow and reference rows. Calling twice never creates two shadows.
async fn set_pending_edit_in<C: ConnectionTrait>(
    db: &C,
    content_id: i32,
) -> Result<i32, BlockError> {
    let model = fetch(db, content_id).await?;
    moderation::assert_can_edit(&model.moderate_state)?;
    if moderation::editable_in_place(&model.moderate_state) {
        return Ok(model.id);
    }
    if let Some(shadow) = sibling(db, model.block_id, ModerateState::Pending).await? {
        return Ok(shadow.id);
    }
    let now = Utc::now().naive_utc();
    let shadow = titles::ActiveModel {
        block_id: Set(model.block_id),
        moderate_state: Set(ModerateState::Pending),
        order: Set(model.order),
        title: Set(model.title.clone()),
        picture_id: Set(model.picture_id),
        link_id: Set(model.link_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Slideshow::copy_all(db, model.id, shadow.id).await?;
    References::copy_all(db, model.id, shadow.id).await?;
    log::info!(
        "pending shadow {} materialized for published title {}",
        shadow.id,
        model.id
    );
    Ok(shadow.id)
}

async fn delete_content_row<C: ConnectionTrait>(db: &C, content_id: i32) -> Result<(), BlockError> {
    Slideshow::clear(db, content_id).await?;
    References::clear(db, content_id).await?;
    titles::Entity::delete_many()
        .filter(titles::Column::Id.eq(content_id))
        .exec(db)
        .await?;
    Ok(())
}

fn visibility_rank(state: &ModerateState) -> u8 {
    match state {
        ModerateState::Pending => 3,
        ModerateState::Draft => 2,
        ModerateState::Published => 1,
        ModerateState::Removed => 0,
    }
}

async fn section_block_ids<C: ConnectionTrait>(
    db: &C,
    page_section_id: i32,
) -> Result<Vec<i32>, BlockError> {
    let blocks = blocks::Entity::find()
        .filter(blocks::Column::PageSectionId.eq(page_section_id))
        .all(db)
        .await?;
    Ok(blocks.into_iter().map(|b| b.id).collect())
}

/// Handler wiring the title kind into the content registry.
#[derive(Debug, Default)]
pub struct TitleHandler;

#[async_trait]
impl ContentHandler for TitleHandler {
    fn key(&self) -> &'static str {
        KIND
    }

    fn wizard_fields(&self) -> &'static [WizardField] {
        WIZARD_FIELDS
    }

    async fn create(
        &self,
        txn: &DatabaseTransaction,
        block_id: i32,
        payload: &serde_json::Value,
    ) -> Result<ContentView, BlockError> {
        let payload = parse_payload(payload)?;
        let block = fetch_block(txn, block_id).await?;
        let order = ordering::next_order(txn, &block).await?;
        let now = Utc::now().naive_utc();
        let model = titles::ActiveModel {
            block_id: Set(block_id),
            moderate_state: Set(ModerateState::Draft),
            order: Set(order),
            title: Set(payload.title),
            picture_id: Set(None),
            link_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(txn)
        .await?;
        ordering::ensure_unique_order(txn, &block, &model).await?;
        let model = fetch(txn, model.id).await?;
        log::info!(
            "draft title {} created for block {} at order {}",
            model.id,
            block_id,
            model.order
        );
        view(txn, &model).await
    }

    async fn update(
        &self,
        txn: &DatabaseTransaction,
        content_id: i32,
        payload: &serde_json::Value,
    ) -> Result<ContentView, BlockError> {
        let payload = parse_payload(payload)?;
        let edit_id = set_pending_edit_in(txn, content_id).await?;
        titles::Entity::update_many()
            .col_expr(titles::Column::Title, Expr::value(payload.title))
            .col_expr(
                titles::Column::UpdatedAt,
                Expr::value(Utc::now().naive_utc()),
            )
            .filter(titles::Column::Id.eq(edit_id))
            .exec(txn)
            .await?;
        let model = fetch(txn, edit_id).await?;
        view(txn, &model).await
    }

    async fn publish(
        &self,
        txn: &DatabaseTransaction,
        content_id: i32,
        actor: i32,
    ) -> Result<ContentView, BlockError> {
        let model = fetch(txn, content_id).await?;
        let target = match model.moderate_state {
            ModerateState::Draft | ModerateState::Pending => model,
            ModerateState::Published => {
                let shadow = sibling(txn, model.block_id, ModerateState::Pending).await?;
                moderation::assert_can_publish(&model.moderate_state, shadow.is_some())?;
                match shadow {
                    Some(shadow) => shadow,
                    None => {
                        return Err(BlockError::InvalidTransition {
                            from: ModerateState::Published,
                            action: "publish",
                        })
                    }
                }
            }
            ModerateState::Removed => {
                return Err(BlockError::InvalidTransition {
                    from: ModerateState::Removed,
                    action: "publish",
                })
            }
        };
        if target.moderate_state == ModerateState::Pending {
            // supersede: the live row goes away, the shadow becomes canonical
            if let Some(live) = sibling(txn, target.block_id, ModerateState::Published).await? {
                delete_content_row(txn, live.id).await?;
            }
        }
        titles::Entity::update_many()
            .col_expr(
                titles::Column::ModerateState,
                Expr::value(ModerateState::Published),
            )
            .col_expr(
                titles::Column::UpdatedAt,
                Expr::value(Utc::now().naive_utc()),
            )
            .filter(titles::Column::Id.eq(target.id))
            .exec(txn)
            .await?;
        log::info!(
            "title {} published for block {} by user {}",
            target.id,
            target.block_id,
            actor
        );
        let model = fetch(txn, target.id).await?;
        view(txn, &model).await
    }

    async fn remove(
        &self,
        txn: &DatabaseTransaction,
        content_id: i32,
        actor: i32,
    ) -> Result<(), BlockError> {
        let model = fetch(txn, content_id).await?;
        moderation::assert_can_remove(&model.moderate_state)?;
        let siblings = titles::Entity::find()
            .filter(titles::Column::BlockId.eq(model.block_id))
            .all(txn)
            .await?;
        // an older tombstone has to go first: unique (block, state)
        if let Some(old) = siblings
            .iter()
            .find(|s| s.moderate_state == ModerateState::Removed)
        {
            delete_content_row(txn, old.id).await?;
        }
        let tombstone = siblings
            .iter()
            .filter(|s| s.moderate_state != ModerateState::Removed)
            .max_by_key(|s| visibility_rank(&s.moderate_state))
            .ok_or_else(|| BlockError::NotFound(format!("content for block {}", model.block_id)))?;
        for s in siblings
            .iter()
            .filter(|s| s.moderate_state != ModerateState::Removed && s.id != tombstone.id)
        {
            delete_content_row(txn, s.id).await?;
        }
        titles::Entity::update_many()
            .col_expr(
                titles::Column::ModerateState,
                Expr::value(ModerateState::Removed),
            )
            .col_expr(
                titles::Column::UpdatedAt,
                Expr::value(Utc::now().naive_utc()),
            )
            .filter(titles::Column::Id.eq(tombstone.id))
            .exec(txn)
            .await?;
        log::info!(
            "title content for block {} removed by user {} (tombstone {})",
            model.block_id,
            actor,
            tombstone.id
        );
        Ok(())
    }

    async fn discard(
        &self,
        txn: &DatabaseTransaction,
        content_id: i32,
    ) -> Result<(), BlockError> {
        let model = fetch(txn, content_id).await?;
        moderation::assert_can_discard(&model.moderate_state)?;
        delete_content_row(txn, model.id).await?;
        log::info!(
            "pending shadow {} discarded for block {}",
            model.id,
            model.block_id
        );
        Ok(())
    }

    async fn purge(&self, txn: &DatabaseTransaction, content_id: i32) -> Result<(), BlockError> {
        let model = fetch(txn, content_id).await?;
        self.purge_block(txn, model.block_id).await
    }

    async fn purge_block(
        &self,
        txn: &DatabaseTransaction,
        block_id: i32,
    ) -> Result<(), BlockError> {
        let rows = titles::Entity::find()
            .filter(titles::Column::BlockId.eq(block_id))
            .all(txn)
            .await?;
        for row in &rows {
            delete_content_row(txn, row.id).await?;
        }
        blocks::Entity::delete_many()
            .filter(blocks::Column::Id.eq(block_id))
            .exec(txn)
            .await?;
        log::info!("block {} purged ({} content rows)", block_id, rows.len());
        Ok(())
    }

    async fn published(
        &self,
        txn: &DatabaseTransaction,
        page_section_id: i32,
    ) -> Result<Vec<ContentView>, BlockError> {
        let block_ids = section_block_ids(txn, page_section_id).await?;
        if block_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = titles::Entity::find()
            .filter(titles::Column::BlockId.is_in(block_ids))
            .filter(titles::Column::ModerateState.eq(ModerateState::Published))
            .order_by_asc(titles::Column::Order)
            .all(txn)
            .await?;
        let mut views = Vec::with_capacity(rows.len());
        for row in &rows {
            views.push(view(txn, row).await?);
        }
        Ok(views)
    }

    async fn pending(
        &self,
        txn: &DatabaseTransaction,
        page_section_id: i32,
    ) -> Result<Vec<ContentView>, BlockError> {
        let block_ids = section_block_ids(txn, page_section_id).await?;
        if block_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = titles::Entity::find()
            .filter(titles::Column::BlockId.is_in(block_ids))
            .filter(titles::Column::ModerateState.ne(ModerateState::Removed))
            .all(txn)
            .await?;
        // one row per block: the pending shadow wins over the row it shadows
        let mut by_block: HashMap<i32, titles::Model> = HashMap::new();
        for row in rows {
            match by_block.get(&row.block_id) {
                Some(current)
                    if visibility_rank(&current.moderate_state)
                        >= visibility_rank(&row.moderate_state) => {}
                _ => {
                    by_block.insert(row.block_id, row);
                }
            }
        }
        let mut chosen: Vec<titles::Model> = by_block.into_values().collect();
        chosen.sort_by_key(|m| (m.order, m.block_id));
        let mut views = Vec::with_capacity(chosen.len());
        for row in &chosen {
            views.push(view(txn, row).await?);
        }
        Ok(views)
    }

    async fn next_order(
        &self,
        txn: &DatabaseTransaction,
        block_id: i32,
    ) -> Result<i32, BlockError> {
        let block = fetch_block(txn, block_id).await?;
        Ok(ordering::next_order(txn, &block).await?)
    }

    async fn set_pending_edit(
        &self,
        txn: &DatabaseTransaction,
        content_id: i32,
    ) -> Result<i32, BlockError> {
        set_pending_edit_in(txn, content_id).await
    }

    async fn get_field(
        &self,
        txn: &DatabaseTransaction,
        content_id: i32,
        field: &str,
    ) -> Result<Option<FieldRef>, BlockError> {
        let model = fetch(txn, content_id).await?;
        match field {
            "picture" => Ok(model.picture_id.map(FieldRef::Image)),
            "link" => Ok(model.link_id.map(FieldRef::Link)),
            "slideshow" | "references" => Err(BlockError::Configuration(format!(
                "field '{}' is multi-valued, use the association rows",
                field
            ))),
            _ => Err(unknown_field(field)),
        }
    }

    async fn set_field(
        &self,
        txn: &DatabaseTransaction,
        content_id: i32,
        field: &str,
        value: Option<FieldRef>,
    ) -> Result<(), BlockError> {
        let model = fetch(txn, content_id).await?;
        moderation::assert_can_edit(&model.moderate_state)?;
        let update = titles::Entity::update_many()
            .col_expr(
                titles::Column::UpdatedAt,
                Expr::value(Utc::now().naive_utc()),
            )
            .filter(titles::Column::Id.eq(content_id));
        let update = match (field, value) {
            ("picture", None) => update.col_expr(titles::Column::PictureId, Expr::value(None::<i32>)),
            ("picture", Some(FieldRef::Image(id))) => {
                update.col_expr(titles::Column::PictureId, Expr::value(Some(id)))
            }
            ("link", None) => update.col_expr(titles::Column::LinkId, Expr::value(None::<i32>)),
            ("link", Some(FieldRef::Link(id))) => {
                update.col_expr(titles::Column::LinkId, Expr::value(Some(id)))
            }
            ("picture", Some(FieldRef::Link(_))) | ("link", Some(FieldRef::Image(_))) => {
                return Err(BlockError::Configuration(format!(
                    "value kind does not match field '{}'",
                    field
                )))
            }
            ("slideshow", _) | ("references", _) => {
                return Err(BlockError::Configuration(format!(
                    "field '{}' is multi-valued, use the association operations",
                    field
                )))
            }
            _ => return Err(unknown_field(field)),
        };
        update.exec(txn).await?;
        Ok(())
    }

    async fn assoc_rows(
        &self,
        txn: &DatabaseTransaction,
        content_id: i32,
        field: &str,
    ) -> Result<Vec<AssocRow>, BlockError> {
        match field {
            "slideshow" => Ok(Slideshow::rows(txn, content_id).await?),
            "references" => Ok(References::rows(txn, content_id).await?),
            _ => Err(unknown_multi_field(field)),
        }
    }

    async fn assoc_append(
        &self,
        txn: &DatabaseTransaction,
        content_id: i32,
        field: &str,
        target_id: i32,
    ) -> Result<i32, BlockError> {
        match field {
            "slideshow" => assoc::append::<Slideshow, _>(txn, content_id, target_id).await,
            "references" => assoc::append::<References, _>(txn, content_id, target_id).await,
            _ => Err(unknown_multi_field(field)),
        }
    }

    async fn assoc_move(
        &self,
        txn: &DatabaseTransaction,
        content_id: i32,
        field: &str,
        row_id: i32,
        direction: Direction,
    ) -> Result<(), BlockError> {
        match field {
            "slideshow" => assoc::move_row::<Slideshow, _>(txn, content_id, row_id, direction).await,
            "references" => {
                assoc::move_row::<References, _>(txn, content_id, row_id, direction).await
            }
            _ => Err(unknown_multi_field(field)),
        }
    }

    async fn assoc_replace_all(
        &self,
        txn: &DatabaseTransaction,
        content_id: i32,
        field: &str,
        targets: &[i32],
    ) -> Result<(), BlockError> {
        match field {
            "slideshow" => assoc::replace_all::<Slideshow, _>(txn, content_id, targets).await,
            "references" => assoc::replace_all::<References, _>(txn, content_id, targets).await,
            _ => Err(unknown_multi_field(field)),
        }
    }

    async fn assoc_remove_one(
        &self,
        txn: &DatabaseTransaction,
        content_id: i32,
        field: &str,
        row_id: i32,
    ) -> Result<(), BlockError> {
        match field {
            "slideshow" => assoc::remove_one::<Slideshow, _>(txn, content_id, row_id).await,
            "references" => assoc::remove_one::<References, _>(txn, content_id, row_id).await,
            _ => Err(unknown_multi_field(field)),
        }
    }
}

fn unknown_field(field: &str) -> BlockError {
    BlockError::Configuration(format!("title content has no field named '{}'", field))
}

fn unknown_multi_field(field: &str) -> BlockError {
    BlockError::Configuration(format!(
        "title content has no multi-valued field named '{}'",
        field
    ))
}
