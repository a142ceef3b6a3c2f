//! SeaORM entities for the block content schema

pub mod blocks;
pub mod documents;
pub mod image_categories;
pub mod images;
pub mod link_categories;
pub mod links;
pub mod page_sections;
pub mod pages;
pub mod sections;
pub mod template_sections;
pub mod templates;
pub mod title_images;
pub mod title_links;
pub mod titles;
