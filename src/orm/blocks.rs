//! SeaORM Entity for content blocks
//!
//! A block anchors exactly one placed content item to a page section. The
//! section reference is nullable so template-default content can exist
//! before placement.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "blocks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub page_section_id: Option<i32>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::page_sections::Entity",
        from = "Column::PageSectionId",
        to = "super::page_sections::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    PageSection,
    #[sea_orm(has_many = "super::titles::Entity")]
    Titles,
}

impl Related<super::page_sections::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PageSection.def()
    }
}

impl Related<super::titles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Titles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
