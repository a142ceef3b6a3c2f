//! Media library management
//!
//! Images, documents and their categories. Deletion is soft everywhere: a
//! deleted item stays attached to content that references it but leaves the
//! library listings the wizard offers. A category in use by live items
//! cannot be deleted.

use crate::app_config;
use crate::error::{BlockError, BlockResult};
use crate::orm::{documents, image_categories, images, link_categories, links};
use crate::resolver::paginate_slice;
use chrono::Utc;
use sea_orm::{entity::*, query::*, sea_query::Expr, DatabaseConnection};

/// One page of a library listing.
#[derive(Clone, Debug)]
pub struct MediaPage<T> {
    pub items: Vec<T>,
    pub page_number: usize,
    pub num_pages: usize,
}

fn page_of<T>(mut items: Vec<T>, page_number: Option<usize>) -> MediaPage<T> {
    let per_page = app_config::get_config().pagination.media_items_per_page as i32;
    let (page_number, num_pages, range) = paginate_slice(items.len(), Some(per_page), page_number);
    MediaPage {
        items: items.drain(range).collect(),
        page_number,
        num_pages,
    }
}

/// Library images, newest first.
pub async fn images_page(
    db: &DatabaseConnection,
    page_number: Option<usize>,
) -> BlockResult<MediaPage<images::Model>> {
    let items = images::Entity::find()
        .filter(images::Column::Deleted.eq(false))
        .order_by_desc(images::Column::CreatedAt)
        .order_by_desc(images::Column::Id)
        .all(db)
        .await?;
    Ok(page_of(items, page_number))
}

/// Library documents, newest first.
pub async fn documents_page(
    db: &DatabaseConnection,
    page_number: Option<usize>,
) -> BlockResult<MediaPage<documents::Model>> {
    let items = documents::Entity::find()
        .filter(documents::Column::Deleted.eq(false))
        .order_by_desc(documents::Column::CreatedAt)
        .order_by_desc(documents::Column::Id)
        .all(db)
        .await?;
    Ok(page_of(items, page_number))
}

/// Update a library image's title and category.
pub async fn update_image(
    db: &DatabaseConnection,
    image_id: i32,
    title: &str,
    category_id: Option<i32>,
) -> BlockResult<images::Model> {
    fetch_image(db, image_id).await?;
    images::Entity::update_many()
        .col_expr(images::Column::Title, Expr::value(title))
        .col_expr(images::Column::CategoryId, Expr::value(category_id))
        .col_expr(images::Column::UpdatedAt, Expr::value(Utc::now().naive_utc()))
        .filter(images::Column::Id.eq(image_id))
        .exec(db)
        .await?;
    fetch_image(db, image_id).await
}

/// Soft-delete a library image.
pub async fn set_image_deleted(db: &DatabaseConnection, image_id: i32) -> BlockResult<()> {
    fetch_image(db, image_id).await?;
    images::Entity::update_many()
        .col_expr(images::Column::Deleted, Expr::value(true))
        .col_expr(images::Column::UpdatedAt, Expr::value(Utc::now().naive_utc()))
        .filter(images::Column::Id.eq(image_id))
        .exec(db)
        .await?;
    log::info!("image {} removed from the library", image_id);
    Ok(())
}

/// Soft-delete a library document.
pub async fn set_document_deleted(
    db: &DatabaseConnection,
    document_id: i32,
) -> BlockResult<()> {
    documents::Entity::find()
        .filter(documents::Column::Id.eq(document_id))
        .one(db)
        .await?
        .ok_or_else(|| BlockError::NotFound(format!("document {}", document_id)))?;
    documents::Entity::update_many()
        .col_expr(documents::Column::Deleted, Expr::value(true))
        .col_expr(
            documents::Column::UpdatedAt,
            Expr::value(Utc::now().naive_utc()),
        )
        .filter(documents::Column::Id.eq(document_id))
        .exec(db)
        .await?;
    log::info!("document {} removed from the library", document_id);
    Ok(())
}

/// Soft-delete a link row (typo'd links get replaced, not edited).
pub async fn set_link_deleted(db: &DatabaseConnection, link_id: i32) -> BlockResult<()> {
    links::Entity::find()
        .filter(links::Column::Id.eq(link_id))
        .one(db)
        .await?
        .ok_or_else(|| BlockError::NotFound(format!("link {}", link_id)))?;
    links::Entity::update_many()
        .col_expr(links::Column::Deleted, Expr::value(true))
        .col_expr(links::Column::UpdatedAt, Expr::value(Utc::now().naive_utc()))
        .filter(links::Column::Id.eq(link_id))
        .exec(db)
        .await?;
    Ok(())
}

async fn fetch_image(db: &DatabaseConnection, image_id: i32) -> BlockResult<images::Model> {
    images::Entity::find()
        .filter(images::Column::Id.eq(image_id))
        .one(db)
        .await?
        .ok_or_else(|| BlockError::NotFound(format!("image {}", image_id)))
}

/// Non-deleted image categories, by name.
pub async fn image_categories(
    db: &DatabaseConnection,
) -> BlockResult<Vec<image_categories::Model>> {
    Ok(image_categories::Entity::find()
        .filter(image_categories::Column::Deleted.eq(false))
        .order_by_asc(image_categories::Column::Name)
        .all(db)
        .await?)
}

pub async fn create_image_category(
    db: &DatabaseConnection,
    name: &str,
    slug: &str,
) -> BlockResult<image_categories::Model> {
    use sea_orm::ActiveValue::Set;
    Ok(image_categories::ActiveModel {
        name: Set(name.to_string()),
        slug: Set(slug.to_string()),
        deleted: Set(false),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

/// Soft-delete an image category, refusing while live images use it.
pub async fn delete_image_category(
    db: &DatabaseConnection,
    category_id: i32,
) -> BlockResult<()> {
    let category = image_categories::Entity::find()
        .filter(image_categories::Column::Id.eq(category_id))
        .one(db)
        .await?
        .ok_or_else(|| BlockError::NotFound(format!("image category {}", category_id)))?;
    let in_use = images::Entity::find()
        .filter(images::Column::CategoryId.eq(category_id))
        .filter(images::Column::Deleted.eq(false))
        .one(db)
        .await?
        .is_some();
    if in_use {
        return Err(BlockError::Constraint(format!(
            "image category '{}' is in use",
            category.slug
        )));
    }
    image_categories::Entity::update_many()
        .col_expr(image_categories::Column::Deleted, Expr::value(true))
        .filter(image_categories::Column::Id.eq(category_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Non-deleted link categories, by name.
pub async fn link_categories(
    db: &DatabaseConnection,
) -> BlockResult<Vec<link_categories::Model>> {
    Ok(link_categories::Entity::find()
        .filter(link_categories::Column::Deleted.eq(false))
        .order_by_asc(link_categories::Column::Name)
        .all(db)
        .await?)
}

pub async fn create_link_category(
    db: &DatabaseConnection,
    name: &str,
    slug: &str,
) -> BlockResult<link_categories::Model> {
    use sea_orm::ActiveValue::Set;
    Ok(link_categories::ActiveModel {
        name: Set(name.to_string()),
        slug: Set(slug.to_string()),
        deleted: Set(false),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

/// Soft-delete a link category, refusing while live links use it.
pub async fn delete_link_category(
    db: &DatabaseConnection,
    category_id: i32,
) -> BlockResult<()> {
    let category = link_categories::Entity::find()
        .filter(link_categories::Column::Id.eq(category_id))
        .one(db)
        .await?
        .ok_or_else(|| BlockError::NotFound(format!("link category {}", category_id)))?;
    let in_use = links::Entity::find()
        .filter(links::Column::CategoryId.eq(category_id))
        .filter(links::Column::Deleted.eq(false))
        .one(db)
        .await?
        .is_some();
    if in_use {
        return Err(BlockError::Constraint(format!(
            "link category '{}' is in use",
            category.slug
        )));
    }
    link_categories::Entity::update_many()
        .col_expr(link_categories::Column::Deleted, Expr::value(true))
        .filter(link_categories::Column::Id.eq(category_id))
        .exec(db)
        .await?;
    Ok(())
}
