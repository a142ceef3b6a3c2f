//! SeaORM Entity for library images
//!
//! `deleted` is a soft flag: a deleted image stays attached to content that
//! references it but leaves the library listings.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "images")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub file_name: String,
    pub title: String,
    pub category_id: Option<i32>,
    pub deleted: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::image_categories::Entity",
        from = "Column::CategoryId",
        to = "super::image_categories::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Category,
    #[sea_orm(has_many = "super::title_images::Entity")]
    TitleImages,
}

impl Related<super::image_categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::title_images::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TitleImages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
