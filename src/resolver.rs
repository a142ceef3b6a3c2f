//! Section resolution and template reconciliation
//!
//! The read path of the core: given a page, resolve each of its sections to
//! the content a template will render, in the right moderation view, with
//! the section's pagination policy applied. Also home to the one
//! administrative edit that fans out to many pages' data: re-synchronizing
//! page sections after a template change.

use crate::error::BlockError;
use crate::orm::{blocks, page_sections, pages, sections, template_sections, templates};
use crate::registry::{ContentRegistry, ContentView};
use chrono::Utc;
use sea_orm::{
    entity::*, query::*, ActiveValue::Set, DatabaseConnection, TransactionTrait,
};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Which moderation view the caller wants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewMode {
    /// Editors: pending shadows win over the rows they shadow
    Design,
    /// Public: published rows only
    Published,
}

/// One resolved section of a page.
#[derive(Clone, Debug)]
pub struct ResolvedSection {
    pub section_id: i32,
    pub slug: String,
    pub items: Vec<ContentView>,
    /// Expanded create URL, design mode only
    pub create_url: Option<String>,
    pub page_number: usize,
    pub num_pages: usize,
}

/// Resolve every section of a page to its renderable content.
///
/// Out-of-range page numbers clamp to the first/last page instead of
/// erroring. The whole resolution reads from one transaction, so a
/// mid-flight publish can never show a section half-superseded.
pub async fn resolve_page_sections(
    db: &DatabaseConnection,
    registry: &ContentRegistry,
    page_id: i32,
    mode: ViewMode,
    page_number: Option<usize>,
) -> Result<HashMap<String, ResolvedSection>, BlockError> {
    let page = fetch_page(db, page_id).await?;
    let txn = db.begin().await?;
    let placements = page_sections::Entity::find()
        .filter(page_sections::Column::PageId.eq(page.id))
        .all(&txn)
        .await?;
    let mut resolved = HashMap::with_capacity(placements.len());
    for placement in placements {
        let section = sections::Entity::find()
            .filter(sections::Column::Id.eq(placement.section_id))
            .one(&txn)
            .await?
            .ok_or_else(|| BlockError::NotFound(format!("section {}", placement.section_id)))?;
        let handler = registry.get(&section.kind)?;
        let mut items = match mode {
            ViewMode::Published => handler.published(&txn, placement.id).await?,
            ViewMode::Design => handler.pending(&txn, placement.id).await?,
        };
        if let Some(field) = section.order_by_field.as_deref() {
            sort_by_field(&mut items, field);
        }
        let (page_number, num_pages, range) =
            paginate_slice(items.len(), section.items_per_page, page_number);
        let items = items[range].to_vec();
        let create_url = match mode {
            ViewMode::Design => section
                .create_url
                .as_deref()
                .map(|pattern| expand_create_url(pattern, &page.slug, &section.slug)),
            ViewMode::Published => None,
        };
        resolved.insert(
            section.slug.clone(),
            ResolvedSection {
                section_id: section.id,
                slug: section.slug,
                items,
                create_url,
                page_number,
                num_pages,
            },
        );
    }
    txn.commit().await?;
    Ok(resolved)
}

/// Re-synchronize one page with its template's section list.
///
/// Creates the page sections the template demands and drops the ones it no
/// longer lists, cascading through the registered handler. One transaction
/// per page; safe to run any number of times.
pub async fn refresh_sections_from_template(
    db: &DatabaseConnection,
    registry: &ContentRegistry,
    page_id: i32,
) -> Result<(), BlockError> {
    let page = fetch_page(db, page_id).await?;
    let txn = db.begin().await?;
    let desired: HashSet<i32> = template_sections::Entity::find()
        .filter(template_sections::Column::TemplateId.eq(page.template_id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|ts| ts.section_id)
        .collect();
    let existing = page_sections::Entity::find()
        .filter(page_sections::Column::PageId.eq(page.id))
        .all(&txn)
        .await?;
    let existing_ids: HashSet<i32> = existing.iter().map(|ps| ps.section_id).collect();

    let mut created = 0;
    for section_id in desired.iter().filter(|id| !existing_ids.contains(id)) {
        page_sections::ActiveModel {
            page_id: Set(page.id),
            section_id: Set(*section_id),
            created_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        created += 1;
    }

    let mut dropped = 0;
    for placement in existing
        .iter()
        .filter(|ps| !desired.contains(&ps.section_id))
    {
        let section = sections::Entity::find()
            .filter(sections::Column::Id.eq(placement.section_id))
            .one(&txn)
            .await?
            .ok_or_else(|| BlockError::NotFound(format!("section {}", placement.section_id)))?;
        let handler = registry.get(&section.kind)?;
        let stale_blocks = blocks::Entity::find()
            .filter(blocks::Column::PageSectionId.eq(placement.id))
            .all(&txn)
            .await?;
        for block in stale_blocks {
            handler.purge_block(&txn, block.id).await?;
        }
        page_sections::Entity::delete_many()
            .filter(page_sections::Column::Id.eq(placement.id))
            .exec(&txn)
            .await?;
        dropped += 1;
    }
    txn.commit().await?;
    if created > 0 || dropped > 0 {
        log::info!(
            "page {} re-synced with template {}: {} section(s) added, {} dropped",
            page.id,
            page.template_id,
            created,
            dropped
        );
    }
    Ok(())
}

/// Fan template reconciliation out to every live page using the template.
///
/// Each page gets its own transaction, so an interruption leaves whole
/// pages either synced or untouched, never half-synced.
pub async fn refresh_pages_for_template(
    db: &DatabaseConnection,
    registry: &ContentRegistry,
    template_id: i32,
) -> Result<usize, BlockError> {
    templates::Entity::find()
        .filter(templates::Column::Id.eq(template_id))
        .one(db)
        .await?
        .ok_or_else(|| BlockError::NotFound(format!("template {}", template_id)))?;
    let affected = pages::Entity::find()
        .filter(pages::Column::TemplateId.eq(template_id))
        .filter(pages::Column::Deleted.eq(false))
        .all(db)
        .await?;
    let count = affected.len();
    for page in affected {
        refresh_sections_from_template(db, registry, page.id).await?;
    }
    Ok(count)
}

async fn fetch_page(db: &DatabaseConnection, page_id: i32) -> Result<pages::Model, BlockError> {
    pages::Entity::find()
        .filter(pages::Column::Id.eq(page_id))
        .filter(pages::Column::Deleted.eq(false))
        .one(db)
        .await?
        .ok_or_else(|| BlockError::NotFound(format!("page {}", page_id)))
}

/// Clamp-and-slice pagination over an already-fetched item list.
///
/// Returns the effective page number, the page count and the index range.
/// `per_page` of `None` (or zero) disables pagination for the section.
pub(crate) fn paginate_slice(
    len: usize,
    per_page: Option<i32>,
    requested: Option<usize>,
) -> (usize, usize, std::ops::Range<usize>) {
    let per_page = match per_page {
        Some(n) if n > 0 => n as usize,
        _ => return (1, 1, 0..len),
    };
    let num_pages = std::cmp::max(1, (len + per_page - 1) / per_page);
    let page = requested.unwrap_or(1).clamp(1, num_pages);
    let start = (page - 1) * per_page;
    let end = std::cmp::min(start + per_page, len);
    (page, num_pages, start..end)
}

fn expand_create_url(pattern: &str, page_slug: &str, section_slug: &str) -> String {
    pattern
        .replace("{page}", page_slug)
        .replace("{section}", section_slug)
}

/// Stable sort on a named view field. Unknown fields and mixed types keep
/// the natural content order.
fn sort_by_field(items: &mut [ContentView], field: &str) {
    items.sort_by(|a, b| value_cmp(a.fields.get(field), b.fields.get(field)));
}

fn value_cmp(a: Option<&serde_json::Value>, b: Option<&serde_json::Value>) -> Ordering {
    use serde_json::Value;
    match (a, b) {
        (Some(Value::Number(m)), Some(Value::Number(n))) => match (m.as_f64(), n.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
        (Some(Value::String(s)), Some(Value::String(t))) => s.cmp(t),
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpaginated_sections_get_one_page() {
        assert_eq!(paginate_slice(7, None, Some(3)), (1, 1, 0..7));
        assert_eq!(paginate_slice(7, Some(0), None), (1, 1, 0..7));
    }

    #[test]
    fn page_numbers_clamp_to_range() {
        // 7 items, 3 per page -> 3 pages
        assert_eq!(paginate_slice(7, Some(3), None), (1, 3, 0..3));
        assert_eq!(paginate_slice(7, Some(3), Some(0)), (1, 3, 0..3));
        assert_eq!(paginate_slice(7, Some(3), Some(2)), (2, 3, 3..6));
        assert_eq!(paginate_slice(7, Some(3), Some(9999)), (3, 3, 6..7));
    }

    #[test]
    fn empty_sections_still_have_a_first_page() {
        assert_eq!(paginate_slice(0, Some(5), Some(4)), (1, 1, 0..0));
    }

    #[test]
    fn create_url_placeholders_expand() {
        assert_eq!(
            expand_create_url("/design/{page}/{section}/create", "home", "news"),
            "/design/home/news/create"
        );
    }
}
