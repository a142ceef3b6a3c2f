//! Content kind registry
//!
//! Sections are data: each row names the content kind backing it with a
//! string key. The registry maps those keys to typed handlers and is built
//! explicitly at startup (no ambient global lookup), then validated against
//! the sections table so a bad key is a boot failure, not a request failure.

use crate::assoc::{AssocRow, Direction};
use crate::error::BlockError;
use crate::moderation::ModerateState;
use crate::orm::sections;
use crate::wizard::WizardField;
use async_trait::async_trait;
use sea_orm::{entity::*, query::*, DatabaseConnection, DatabaseTransaction};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// A content row rendered for the presentation layer: identity, lifecycle
/// position and a dynamic field map (sections are data, so content shape
/// varies by kind).
#[derive(Clone, Debug, Serialize)]
pub struct ContentView {
    pub id: i32,
    pub block_id: i32,
    pub order: i32,
    pub state: ModerateState,
    pub fields: serde_json::Value,
}

/// A reference held by a single-valued wizard field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldRef {
    Image(i32),
    Link(i32),
}

impl FieldRef {
    /// The referenced row id, whatever the target table.
    pub fn target_id(&self) -> i32 {
        match self {
            FieldRef::Image(id) => *id,
            FieldRef::Link(id) => *id,
        }
    }
}

/// Capability interface implemented once per content kind.
///
/// Every method takes an open transaction: the public API layer owns
/// atomicity (one transaction per mutating call), and read paths get a
/// consistent snapshot: a reader can never observe a half-committed
/// supersede.
#[async_trait]
pub trait ContentHandler: Send + Sync + std::fmt::Debug {
    /// Stable registry key, matching `sections.kind`
    fn key(&self) -> &'static str;

    /// Wizard-attachable fields of this kind
    fn wizard_fields(&self) -> &'static [WizardField];

    async fn create(
        &self,
        txn: &DatabaseTransaction,
        block_id: i32,
        payload: &serde_json::Value,
    ) -> Result<ContentView, BlockError>;

    async fn update(
        &self,
        txn: &DatabaseTransaction,
        content_id: i32,
        payload: &serde_json::Value,
    ) -> Result<ContentView, BlockError>;

    async fn publish(
        &self,
        txn: &DatabaseTransaction,
        content_id: i32,
        actor: i32,
    ) -> Result<ContentView, BlockError>;

    async fn remove(
        &self,
        txn: &DatabaseTransaction,
        content_id: i32,
        actor: i32,
    ) -> Result<(), BlockError>;

    /// Delete a pending shadow, leaving the live row alone
    async fn discard(&self, txn: &DatabaseTransaction, content_id: i32)
        -> Result<(), BlockError>;

    /// Physical deletion of the content's block and every row hanging off it
    async fn purge(&self, txn: &DatabaseTransaction, content_id: i32) -> Result<(), BlockError>;

    /// Cascade used by template reconciliation when a placement disappears
    async fn purge_block(&self, txn: &DatabaseTransaction, block_id: i32)
        -> Result<(), BlockError>;

    async fn published(
        &self,
        txn: &DatabaseTransaction,
        page_section_id: i32,
    ) -> Result<Vec<ContentView>, BlockError>;

    /// Latest-draft view: the pending shadow where one exists, the draft or
    /// published row otherwise
    async fn pending(
        &self,
        txn: &DatabaseTransaction,
        page_section_id: i32,
    ) -> Result<Vec<ContentView>, BlockError>;

    async fn next_order(
        &self,
        txn: &DatabaseTransaction,
        block_id: i32,
    ) -> Result<i32, BlockError>;

    /// Ensure an editable row exists (materializing the pending shadow of a
    /// published row) and return its id. Idempotent.
    async fn set_pending_edit(
        &self,
        txn: &DatabaseTransaction,
        content_id: i32,
    ) -> Result<i32, BlockError>;

    async fn get_field(
        &self,
        txn: &DatabaseTransaction,
        content_id: i32,
        field: &str,
    ) -> Result<Option<FieldRef>, BlockError>;

    async fn set_field(
        &self,
        txn: &DatabaseTransaction,
        content_id: i32,
        field: &str,
        value: Option<FieldRef>,
    ) -> Result<(), BlockError>;

    async fn assoc_rows(
        &self,
        txn: &DatabaseTransaction,
        content_id: i32,
        field: &str,
    ) -> Result<Vec<AssocRow>, BlockError>;

    async fn assoc_append(
        &self,
        txn: &DatabaseTransaction,
        content_id: i32,
        field: &str,
        target_id: i32,
    ) -> Result<i32, BlockError>;

    async fn assoc_move(
        &self,
        txn: &DatabaseTransaction,
        content_id: i32,
        field: &str,
        row_id: i32,
        direction: Direction,
    ) -> Result<(), BlockError>;

    async fn assoc_replace_all(
        &self,
        txn: &DatabaseTransaction,
        content_id: i32,
        field: &str,
        targets: &[i32],
    ) -> Result<(), BlockError>;

    async fn assoc_remove_one(
        &self,
        txn: &DatabaseTransaction,
        content_id: i32,
        field: &str,
        row_id: i32,
    ) -> Result<(), BlockError>;
}

/// Explicit key → handler mapping, constructed at startup and passed into
/// the resolver and wizard.
#[derive(Clone, Default)]
pub struct ContentRegistry {
    handlers: HashMap<&'static str, Arc<dyn ContentHandler>>,
}

impl ContentRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register(&mut self, handler: Arc<dyn ContentHandler>) {
        let key = handler.key();
        if self.handlers.insert(key, handler).is_some() {
            log::warn!("content handler '{}' registered twice, keeping last", key);
        }
    }

    pub fn get(&self, kind: &str) -> Result<&Arc<dyn ContentHandler>, BlockError> {
        self.handlers.get(kind).ok_or_else(|| {
            BlockError::Configuration(format!("no content handler registered for kind '{}'", kind))
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.keys().copied()
    }

    /// Startup validation: every `sections.kind` in the database must
    /// resolve to a registered handler.
    pub async fn validate(&self, db: &DatabaseConnection) -> Result<(), BlockError> {
        let sections = sections::Entity::find().all(db).await?;
        for section in &sections {
            if !self.handlers.contains_key(section.kind.as_str()) {
                return Err(BlockError::Configuration(format!(
                    "section '{}' references unknown content kind '{}'",
                    section.slug, section.kind
                )));
            }
        }
        log::info!(
            "content registry validated: {} handlers, {} sections",
            self.handlers.len(),
            sections.len()
        );
        Ok(())
    }
}
