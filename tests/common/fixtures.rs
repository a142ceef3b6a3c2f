//! Test fixtures for pages, sections and media
#![allow(dead_code)]

use chrono::Utc;
use mason::orm::{
    documents, images, link_categories, links, page_sections, pages, sections, template_sections,
    templates,
};
use mason::registry::ContentRegistry;
use mason::title::TitleHandler;
use sea_orm::{entity::*, ActiveValue::Set, DatabaseConnection, DbErr};
use std::sync::Arc;

/// Registry with the title kind wired in, as a deployment would build it.
pub fn test_registry() -> ContentRegistry {
    let mut registry = ContentRegistry::new();
    registry.register(Arc::new(TitleHandler));
    registry
}

pub async fn create_template(
    db: &DatabaseConnection,
    name: &str,
) -> Result<templates::Model, DbErr> {
    templates::ActiveModel {
        name: Set(name.to_string()),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_section(
    db: &DatabaseConnection,
    slug: &str,
    kind: &str,
) -> Result<sections::Model, DbErr> {
    sections::ActiveModel {
        slug: Set(slug.to_string()),
        name: Set(slug.to_string()),
        kind: Set(kind.to_string()),
        items_per_page: Set(None),
        order_by_field: Set(None),
        create_url: Set(None),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_section_paginated(
    db: &DatabaseConnection,
    slug: &str,
    kind: &str,
    items_per_page: i32,
    order_by_field: Option<&str>,
) -> Result<sections::Model, DbErr> {
    sections::ActiveModel {
        slug: Set(slug.to_string()),
        name: Set(slug.to_string()),
        kind: Set(kind.to_string()),
        items_per_page: Set(Some(items_per_page)),
        order_by_field: Set(order_by_field.map(|s| s.to_string())),
        create_url: Set(None),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn link_template_section(
    db: &DatabaseConnection,
    template_id: i32,
    section_id: i32,
) -> Result<template_sections::Model, DbErr> {
    template_sections::ActiveModel {
        template_id: Set(template_id),
        section_id: Set(section_id),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_page(
    db: &DatabaseConnection,
    slug: &str,
    template_id: i32,
) -> Result<pages::Model, DbErr> {
    let now = Utc::now().naive_utc();
    pages::ActiveModel {
        name: Set(slug.to_string()),
        slug: Set(slug.to_string()),
        template_id: Set(template_id),
        order: Set(1),
        deleted: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_page_section(
    db: &DatabaseConnection,
    page_id: i32,
    section_id: i32,
) -> Result<page_sections::Model, DbErr> {
    page_sections::ActiveModel {
        page_id: Set(page_id),
        section_id: Set(section_id),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// A page wired to one title-backed section, ready for content.
pub async fn create_wired_page(
    db: &DatabaseConnection,
    slug: &str,
) -> Result<(pages::Model, sections::Model, page_sections::Model), DbErr> {
    let template = create_template(db, &format!("{}-template", slug)).await?;
    let section = create_section(db, &format!("{}-body", slug), mason::title::KIND).await?;
    link_template_section(db, template.id, section.id).await?;
    let page = create_page(db, slug, template.id).await?;
    let page_section = create_page_section(db, page.id, section.id).await?;
    Ok((page, section, page_section))
}

pub async fn create_image(db: &DatabaseConnection, title: &str) -> Result<images::Model, DbErr> {
    let now = Utc::now().naive_utc();
    images::ActiveModel {
        file_name: Set(format!("{}.jpg", title)),
        title: Set(title.to_string()),
        category_id: Set(None),
        deleted: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_image_in_category(
    db: &DatabaseConnection,
    title: &str,
    category_id: i32,
) -> Result<images::Model, DbErr> {
    let now = Utc::now().naive_utc();
    images::ActiveModel {
        file_name: Set(format!("{}.jpg", title)),
        title: Set(title.to_string()),
        category_id: Set(Some(category_id)),
        deleted: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_document(
    db: &DatabaseConnection,
    title: &str,
) -> Result<documents::Model, DbErr> {
    let now = Utc::now().naive_utc();
    documents::ActiveModel {
        file_name: Set(format!("{}.pdf", title)),
        original_file_name: Set(format!("{}-original.pdf", title)),
        title: Set(title.to_string()),
        description: Set(String::new()),
        deleted: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_external_link(
    db: &DatabaseConnection,
    title: &str,
    url: &str,
) -> Result<links::Model, DbErr> {
    let now = Utc::now().naive_utc();
    links::ActiveModel {
        title: Set(title.to_string()),
        link_type: Set(links::LinkType::External),
        url: Set(Some(url.to_string())),
        page_id: Set(None),
        document_id: Set(None),
        category_id: Set(None),
        deleted: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_link_category(
    db: &DatabaseConnection,
    slug: &str,
) -> Result<link_categories::Model, DbErr> {
    link_categories::ActiveModel {
        name: Set(slug.to_string()),
        slug: Set(slug.to_string()),
        deleted: Set(false),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Shorthand for the title create/update payload.
pub fn title_payload(text: &str) -> serde_json::Value {
    serde_json::json!({ "title": text })
}
