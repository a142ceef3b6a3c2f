//! Test database setup
#![allow(dead_code)]

use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, DbErr, Statement,
};

/// Schema for an isolated in-memory test database.
///
/// Mirrors the production migrations: note the unique constraints on
/// (block_id, moderate_state) and the page/template joins.
const SCHEMA: &[&str] = &[
    "CREATE TABLE templates (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        created_at TIMESTAMP NOT NULL
    )",
    "CREATE TABLE sections (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        slug TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        kind TEXT NOT NULL,
        items_per_page INTEGER,
        order_by_field TEXT,
        create_url TEXT,
        created_at TIMESTAMP NOT NULL
    )",
    "CREATE TABLE template_sections (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        template_id INTEGER NOT NULL REFERENCES templates (id),
        section_id INTEGER NOT NULL REFERENCES sections (id),
        UNIQUE (template_id, section_id)
    )",
    "CREATE TABLE pages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        template_id INTEGER NOT NULL REFERENCES templates (id),
        \"order\" INTEGER NOT NULL,
        deleted BOOLEAN NOT NULL DEFAULT 0,
        created_at TIMESTAMP NOT NULL,
        updated_at TIMESTAMP NOT NULL
    )",
    "CREATE TABLE page_sections (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        page_id INTEGER NOT NULL REFERENCES pages (id),
        section_id INTEGER NOT NULL REFERENCES sections (id),
        created_at TIMESTAMP NOT NULL,
        UNIQUE (page_id, section_id)
    )",
    "CREATE TABLE blocks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        page_section_id INTEGER REFERENCES page_sections (id),
        created_at TIMESTAMP NOT NULL,
        updated_at TIMESTAMP NOT NULL
    )",
    "CREATE TABLE image_categories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        deleted BOOLEAN NOT NULL DEFAULT 0
    )",
    "CREATE TABLE link_categories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        deleted BOOLEAN NOT NULL DEFAULT 0
    )",
    "CREATE TABLE images (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        file_name TEXT NOT NULL,
        title TEXT NOT NULL,
        category_id INTEGER REFERENCES image_categories (id),
        deleted BOOLEAN NOT NULL DEFAULT 0,
        created_at TIMESTAMP NOT NULL,
        updated_at TIMESTAMP NOT NULL
    )",
    "CREATE TABLE documents (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        file_name TEXT NOT NULL,
        original_file_name TEXT NOT NULL,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        deleted BOOLEAN NOT NULL DEFAULT 0,
        created_at TIMESTAMP NOT NULL,
        updated_at TIMESTAMP NOT NULL
    )",
    "CREATE TABLE links (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        link_type TEXT NOT NULL,
        url TEXT,
        page_id INTEGER REFERENCES pages (id),
        document_id INTEGER REFERENCES documents (id),
        category_id INTEGER REFERENCES link_categories (id),
        deleted BOOLEAN NOT NULL DEFAULT 0,
        created_at TIMESTAMP NOT NULL,
        updated_at TIMESTAMP NOT NULL
    )",
    "CREATE TABLE titles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        block_id INTEGER NOT NULL REFERENCES blocks (id),
        moderate_state TEXT NOT NULL,
        \"order\" INTEGER NOT NULL,
        title TEXT NOT NULL,
        picture_id INTEGER REFERENCES images (id),
        link_id INTEGER REFERENCES links (id),
        created_at TIMESTAMP NOT NULL,
        updated_at TIMESTAMP NOT NULL,
        UNIQUE (block_id, moderate_state)
    )",
    "CREATE TABLE title_images (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        content_id INTEGER NOT NULL REFERENCES titles (id),
        image_id INTEGER NOT NULL REFERENCES images (id),
        \"order\" INTEGER NOT NULL
    )",
    "CREATE TABLE title_links (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        content_id INTEGER NOT NULL REFERENCES titles (id),
        link_id INTEGER NOT NULL REFERENCES links (id),
        \"order\" INTEGER NOT NULL
    )",
];

/// Connect an isolated in-memory database with the schema applied.
///
/// A single-connection pool keeps every statement on the same SQLite
/// memory database.
pub async fn setup_test_database() -> Result<DatabaseConnection, DbErr> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut options = ConnectOptions::new("sqlite::memory:".to_string());
    options.max_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await?;
    for statement in SCHEMA {
        db.execute(Statement::from_string(
            DbBackend::Sqlite,
            (*statement).to_string(),
        ))
        .await?;
    }
    Ok(db)
}
