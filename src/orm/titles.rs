//! SeaORM Entity for title content
//!
//! The versioned payload of a block: heading text plus an optional picture,
//! an optional link, an ordered slideshow and an ordered reference list.
//! Unique on (block_id, moderate_state) so a block never carries two rows
//! in the same lifecycle state.

use crate::moderation::ModerateState;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "titles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub block_id: i32,
    pub moderate_state: ModerateState,
    /// Sibling position within the block's page section, 1-based
    pub order: i32,
    #[sea_orm(column_type = "Text")]
    pub title: String,
    pub picture_id: Option<i32>,
    pub link_id: Option<i32>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::blocks::Entity",
        from = "Column::BlockId",
        to = "super::blocks::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Block,
    #[sea_orm(
        belongs_to = "super::images::Entity",
        from = "Column::PictureId",
        to = "super::images::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Picture,
    #[sea_orm(
        belongs_to = "super::links::Entity",
        from = "Column::LinkId",
        to = "super::links::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Link,
    #[sea_orm(has_many = "super::title_images::Entity")]
    TitleImages,
    #[sea_orm(has_many = "super::title_links::Entity")]
    TitleLinks,
}

impl Related<super::blocks::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Block.def()
    }
}

impl Related<super::title_images::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TitleImages.def()
    }
}

impl Related<super::title_links::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TitleLinks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
