//! SeaORM Entity for section definitions
//!
//! A section is a reusable named slot: which content kind backs it (the
//! `kind` key into the content registry), its pagination policy, and an
//! optional create-URL pattern for the design view.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sections")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub slug: String,
    pub name: String,
    /// Registry key of the content kind backing this slot
    pub kind: String,
    /// Page size; null disables pagination for the section
    pub items_per_page: Option<i32>,
    /// Field name overriding the natural content order for display
    pub order_by_field: Option<String>,
    /// URL pattern with `{page}` / `{section}` placeholders
    pub create_url: Option<String>,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::page_sections::Entity")]
    PageSections,
    #[sea_orm(has_many = "super::template_sections::Entity")]
    TemplateSections,
}

impl Related<super::page_sections::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PageSections.def()
    }
}

impl Related<super::template_sections::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TemplateSections.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
