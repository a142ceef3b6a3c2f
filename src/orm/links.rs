//! SeaORM Entity for link targets
//!
//! A link resolves to exactly one destination: an external URL, an internal
//! page, or an uploaded document. The row is the flat persistence form of
//! [`LinkDestination`]; rows are immutable once attached apart from typo
//! fixes to the title.

use crate::error::BlockError;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Link discriminator, stored as a plain string column.
#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(None)")]
pub enum LinkType {
    #[sea_orm(string_value = "external")]
    External,
    #[sea_orm(string_value = "internal")]
    Internal,
    #[sea_orm(string_value = "document")]
    Document,
}

/// Domain form of a link row: the variant carries exactly the data its
/// destination needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkDestination {
    ExternalUrl { url: String },
    InternalPage { page_id: i32 },
    Document { document_id: i32 },
}

/// Flatten the sum type into the discriminator and payload columns of a row.
pub fn flatten(
    destination: LinkDestination,
) -> (LinkType, Option<String>, Option<i32>, Option<i32>) {
    match destination {
        LinkDestination::ExternalUrl { url } => (LinkType::External, Some(url), None, None),
        LinkDestination::InternalPage { page_id } => {
            (LinkType::Internal, None, Some(page_id), None)
        }
        LinkDestination::Document { document_id } => {
            (LinkType::Document, None, None, Some(document_id))
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "links")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub link_type: LinkType,
    pub url: Option<String>,
    pub page_id: Option<i32>,
    pub document_id: Option<i32>,
    pub category_id: Option<i32>,
    pub deleted: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Model {
    /// Convert the flat row back into the link sum type.
    ///
    /// A row whose variant column disagrees with its payload columns can
    /// only come from a write that bypassed the wizard.
    pub fn destination(&self) -> Result<LinkDestination, BlockError> {
        match self.link_type {
            LinkType::External => self
                .url
                .clone()
                .map(|url| LinkDestination::ExternalUrl { url })
                .ok_or_else(|| {
                    BlockError::Constraint(format!("external link {} has no url", self.id))
                }),
            LinkType::Internal => self
                .page_id
                .map(|page_id| LinkDestination::InternalPage { page_id })
                .ok_or_else(|| {
                    BlockError::Constraint(format!("internal link {} has no page", self.id))
                }),
            LinkType::Document => self
                .document_id
                .map(|document_id| LinkDestination::Document { document_id })
                .ok_or_else(|| {
                    BlockError::Constraint(format!("document link {} has no document", self.id))
                }),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::pages::Entity",
        from = "Column::PageId",
        to = "super::pages::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Page,
    #[sea_orm(
        belongs_to = "super::documents::Entity",
        from = "Column::DocumentId",
        to = "super::documents::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Document,
    #[sea_orm(
        belongs_to = "super::link_categories::Entity",
        from = "Column::CategoryId",
        to = "super::link_categories::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Category,
    #[sea_orm(has_many = "super::title_links::Entity")]
    TitleLinks,
}

impl Related<super::documents::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Document.def()
    }
}

impl Related<super::link_categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::title_links::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TitleLinks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
