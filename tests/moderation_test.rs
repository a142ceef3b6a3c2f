//! Integration tests for the moderation lifecycle: draft/publish, pending
//! shadows, supersede-and-promote, removal and purge.
mod common;

use common::{database::*, fixtures::*};
use mason::content;
use mason::error::BlockError;
use mason::moderation::ModerateState;
use mason::orm::{blocks, titles};
use mason::resolver::{self, ViewMode};
use mason::title::KIND;
use sea_orm::{entity::*, query::*, DatabaseConnection};

async fn block_states(db: &DatabaseConnection, block_id: i32) -> Vec<ModerateState> {
    titles::Entity::find()
        .filter(titles::Column::BlockId.eq(block_id))
        .all(db)
        .await
        .expect("query block states")
        .into_iter()
        .map(|m| m.moderate_state)
        .collect()
}

async fn published_rows(db: &DatabaseConnection, block_id: i32) -> usize {
    block_states(db, block_id)
        .await
        .into_iter()
        .filter(|s| *s == ModerateState::Published)
        .count()
}

async fn section_titles(
    db: &DatabaseConnection,
    registry: &mason::registry::ContentRegistry,
    page_id: i32,
    slug: &str,
    mode: ViewMode,
) -> Vec<String> {
    let resolved = resolver::resolve_page_sections(db, registry, page_id, mode, None)
        .await
        .expect("resolve page sections");
    resolved[slug]
        .items
        .iter()
        .map(|item| item.fields["title"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[actix_rt::test]
async fn create_starts_in_draft() {
    let db = setup_test_database().await.expect("test database");
    let registry = test_registry();
    let (page, section, page_section) = create_wired_page(&db, "home").await.unwrap();

    let view = content::create_content(&db, &registry, page_section.id, &title_payload("Hello"))
        .await
        .expect("create content");
    assert_eq!(view.state, ModerateState::Draft);
    assert_eq!(view.order, 1);

    // drafts are design-only
    let published = section_titles(&db, &registry, page.id, &section.slug, ViewMode::Published).await;
    assert!(published.is_empty());
    let design = section_titles(&db, &registry, page.id, &section.slug, ViewMode::Design).await;
    assert_eq!(design, vec!["Hello".to_string()]);
}

#[actix_rt::test]
async fn first_publish_promotes_the_draft() {
    let db = setup_test_database().await.expect("test database");
    let registry = test_registry();
    let (page, section, page_section) = create_wired_page(&db, "home").await.unwrap();

    let view = content::create_content(&db, &registry, page_section.id, &title_payload("Hello"))
        .await
        .unwrap();
    let published = content::publish_content(&db, &registry, KIND, view.id, 1)
        .await
        .expect("publish draft");
    assert_eq!(published.id, view.id);
    assert_eq!(published.state, ModerateState::Published);
    assert_eq!(block_states(&db, view.block_id).await, vec![ModerateState::Published]);

    let titles = section_titles(&db, &registry, page.id, &section.slug, ViewMode::Published).await;
    assert_eq!(titles, vec!["Hello".to_string()]);
}

#[actix_rt::test]
async fn editing_published_content_goes_through_a_shadow() {
    let db = setup_test_database().await.expect("test database");
    let registry = test_registry();
    let (page, section, page_section) = create_wired_page(&db, "home").await.unwrap();

    let view = content::create_content(&db, &registry, page_section.id, &title_payload("Hello"))
        .await
        .unwrap();
    content::publish_content(&db, &registry, KIND, view.id, 1)
        .await
        .unwrap();

    let shadow = content::update_content(&db, &registry, KIND, view.id, &title_payload("Hello v2"))
        .await
        .expect("update published content");
    assert_ne!(shadow.id, view.id);
    assert_eq!(shadow.state, ModerateState::Pending);
    assert_eq!(shadow.order, view.order);

    // the live row is untouched until the shadow publishes
    let published = section_titles(&db, &registry, page.id, &section.slug, ViewMode::Published).await;
    assert_eq!(published, vec!["Hello".to_string()]);
    let design = section_titles(&db, &registry, page.id, &section.slug, ViewMode::Design).await;
    assert_eq!(design, vec!["Hello v2".to_string()]);

    content::publish_content(&db, &registry, KIND, shadow.id, 1)
        .await
        .expect("publish shadow");
    let published = section_titles(&db, &registry, page.id, &section.slug, ViewMode::Published).await;
    assert_eq!(published, vec!["Hello v2".to_string()]);
    // the shadow became the canonical row; nothing pending remains
    assert_eq!(block_states(&db, view.block_id).await, vec![ModerateState::Published]);
}

#[actix_rt::test]
async fn repeated_edits_reuse_one_shadow() {
    let db = setup_test_database().await.expect("test database");
    let registry = test_registry();
    let (_page, _section, page_section) = create_wired_page(&db, "home").await.unwrap();

    let view = content::create_content(&db, &registry, page_section.id, &title_payload("Hello"))
        .await
        .unwrap();
    content::publish_content(&db, &registry, KIND, view.id, 1)
        .await
        .unwrap();

    let first = content::update_content(&db, &registry, KIND, view.id, &title_payload("v2"))
        .await
        .unwrap();
    let second = content::update_content(&db, &registry, KIND, view.id, &title_payload("v3"))
        .await
        .unwrap();
    assert_eq!(first.id, second.id);

    let pending = block_states(&db, view.block_id)
        .await
        .into_iter()
        .filter(|s| *s == ModerateState::Pending)
        .count();
    assert_eq!(pending, 1);
    assert_eq!(second.fields["title"], "v3");
}

#[actix_rt::test]
async fn discarding_a_shadow_leaves_the_live_row_alone() {
    let db = setup_test_database().await.expect("test database");
    let registry = test_registry();
    let (page, section, page_section) = create_wired_page(&db, "home").await.unwrap();

    let view = content::create_content(&db, &registry, page_section.id, &title_payload("Hello"))
        .await
        .unwrap();
    content::publish_content(&db, &registry, KIND, view.id, 1)
        .await
        .unwrap();
    let shadow = content::update_content(&db, &registry, KIND, view.id, &title_payload("Oops"))
        .await
        .unwrap();

    content::discard_pending_edit(&db, &registry, KIND, shadow.id)
        .await
        .expect("discard the shadow");
    assert_eq!(block_states(&db, view.block_id).await, vec![ModerateState::Published]);
    let design = section_titles(&db, &registry, page.id, &section.slug, ViewMode::Design).await;
    assert_eq!(design, vec!["Hello".to_string()]);

    // only pending shadows discard
    let err = content::discard_pending_edit(&db, &registry, KIND, view.id)
        .await
        .expect_err("cannot discard a published row");
    assert!(matches!(err, BlockError::InvalidTransition { .. }));
}

#[actix_rt::test]
async fn publish_without_a_shadow_is_an_invalid_transition() {
    let db = setup_test_database().await.expect("test database");
    let registry = test_registry();
    let (_page, _section, page_section) = create_wired_page(&db, "home").await.unwrap();

    let view = content::create_content(&db, &registry, page_section.id, &title_payload("Hello"))
        .await
        .unwrap();
    content::publish_content(&db, &registry, KIND, view.id, 1)
        .await
        .unwrap();

    let err = content::publish_content(&db, &registry, KIND, view.id, 1)
        .await
        .expect_err("publishing again without edits must fail");
    assert!(matches!(err, BlockError::InvalidTransition { .. }));
}

#[actix_rt::test]
async fn remove_hides_content_from_both_views() {
    let db = setup_test_database().await.expect("test database");
    let registry = test_registry();
    let (page, section, page_section) = create_wired_page(&db, "home").await.unwrap();

    let view = content::create_content(&db, &registry, page_section.id, &title_payload("Hello"))
        .await
        .unwrap();
    content::publish_content(&db, &registry, KIND, view.id, 1)
        .await
        .unwrap();
    content::update_content(&db, &registry, KIND, view.id, &title_payload("Hello v2"))
        .await
        .unwrap();

    content::remove_content(&db, &registry, KIND, view.id, 1)
        .await
        .expect("remove content");

    let published = section_titles(&db, &registry, page.id, &section.slug, ViewMode::Published).await;
    assert!(published.is_empty());
    let design = section_titles(&db, &registry, page.id, &section.slug, ViewMode::Design).await;
    assert!(design.is_empty());
    // one tombstone survives, nothing else
    assert_eq!(block_states(&db, view.block_id).await, vec![ModerateState::Removed]);
}

#[actix_rt::test]
async fn removed_content_rejects_further_transitions() {
    let db = setup_test_database().await.expect("test database");
    let registry = test_registry();
    let (_page, _section, page_section) = create_wired_page(&db, "home").await.unwrap();

    let view = content::create_content(&db, &registry, page_section.id, &title_payload("Hello"))
        .await
        .unwrap();
    content::remove_content(&db, &registry, KIND, view.id, 1)
        .await
        .unwrap();

    let err = content::remove_content(&db, &registry, KIND, view.id, 1)
        .await
        .expect_err("double remove");
    assert!(matches!(err, BlockError::InvalidTransition { .. }));

    let err = content::publish_content(&db, &registry, KIND, view.id, 1)
        .await
        .expect_err("publish removed");
    assert!(matches!(err, BlockError::InvalidTransition { .. }));

    let err = content::update_content(&db, &registry, KIND, view.id, &title_payload("x"))
        .await
        .expect_err("update removed");
    assert!(matches!(err, BlockError::InvalidTransition { .. }));
}

#[actix_rt::test]
async fn purge_physically_deletes_block_and_rows() {
    let db = setup_test_database().await.expect("test database");
    let registry = test_registry();
    let (_page, _section, page_section) = create_wired_page(&db, "home").await.unwrap();

    let view = content::create_content(&db, &registry, page_section.id, &title_payload("Hello"))
        .await
        .unwrap();
    content::purge_content(&db, &registry, KIND, view.id)
        .await
        .expect("purge content");

    assert!(block_states(&db, view.block_id).await.is_empty());
    let block = blocks::Entity::find()
        .filter(blocks::Column::Id.eq(view.block_id))
        .one(&db)
        .await
        .unwrap();
    assert!(block.is_none());
}

#[actix_rt::test]
async fn blocks_never_expose_two_published_rows() {
    let db = setup_test_database().await.expect("test database");
    let registry = test_registry();
    let (_page, _section, page_section) = create_wired_page(&db, "home").await.unwrap();

    // a scripted editing session over three blocks, checking the invariant
    // after every step
    let a = content::create_content(&db, &registry, page_section.id, &title_payload("a"))
        .await
        .unwrap();
    let b = content::create_content(&db, &registry, page_section.id, &title_payload("b"))
        .await
        .unwrap();
    let c = content::create_content(&db, &registry, page_section.id, &title_payload("c"))
        .await
        .unwrap();
    let block_ids = [a.block_id, b.block_id, c.block_id];

    content::publish_content(&db, &registry, KIND, a.id, 1).await.unwrap();
    content::publish_content(&db, &registry, KIND, b.id, 1).await.unwrap();
    for block_id in block_ids {
        assert!(published_rows(&db, block_id).await <= 1);
    }

    let a2 = content::update_content(&db, &registry, KIND, a.id, &title_payload("a2"))
        .await
        .unwrap();
    content::publish_content(&db, &registry, KIND, a2.id, 1).await.unwrap();
    let a3 = content::update_content(&db, &registry, KIND, a2.id, &title_payload("a3"))
        .await
        .unwrap();
    content::remove_content(&db, &registry, KIND, b.id, 1).await.unwrap();
    content::publish_content(&db, &registry, KIND, c.id, 1).await.unwrap();
    content::publish_content(&db, &registry, KIND, a3.id, 1).await.unwrap();
    for block_id in block_ids {
        assert!(published_rows(&db, block_id).await <= 1);
    }
}

#[actix_rt::test]
async fn publish_is_idempotent_in_effect() {
    let db = setup_test_database().await.expect("test database");
    let registry = test_registry();
    let (page, section, page_section) = create_wired_page(&db, "home").await.unwrap();

    let view = content::create_content(&db, &registry, page_section.id, &title_payload("Hello"))
        .await
        .unwrap();
    content::publish_content(&db, &registry, KIND, view.id, 1)
        .await
        .unwrap();
    let before = section_titles(&db, &registry, page.id, &section.slug, ViewMode::Published).await;

    // a no-op edit + publish cycle must not change the published sequence
    let shadow = content::update_content(&db, &registry, KIND, view.id, &title_payload("Hello"))
        .await
        .unwrap();
    content::publish_content(&db, &registry, KIND, shadow.id, 1)
        .await
        .unwrap();
    let after = section_titles(&db, &registry, page.id, &section.slug, ViewMode::Published).await;
    assert_eq!(before, after);
}
