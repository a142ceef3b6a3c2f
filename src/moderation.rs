//! Moderation lifecycle for block content
//!
//! Content moves draft -> published on first publish. Editing a published row
//! materializes a pending shadow copy; publishing the shadow supersedes the
//! live row inside one transaction. Removal hides a block from both the
//! published and pending read paths without physical deletion.

use crate::error::BlockError;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Moderation state column, stored as a plain string so the same entity
/// runs on Postgres and SQLite.
#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(None)")]
pub enum ModerateState {
    /// Created, never published
    #[sea_orm(string_value = "draft")]
    Draft,
    /// Shadow copy of a published row with unpublished edits
    #[sea_orm(string_value = "pending")]
    Pending,
    /// The live row rendered on the public page
    #[sea_orm(string_value = "published")]
    Published,
    /// Hidden from both read paths, kept until purged
    #[sea_orm(string_value = "removed")]
    Removed,
}

impl ModerateState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerateState::Draft => "draft",
            ModerateState::Pending => "pending",
            ModerateState::Published => "published",
            ModerateState::Removed => "removed",
        }
    }
}

impl std::fmt::Display for ModerateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row in this state may be edited in place.
pub fn editable_in_place(state: &ModerateState) -> bool {
    matches!(state, ModerateState::Draft | ModerateState::Pending)
}

/// Check that an edit (field change, association change) may target content
/// in `state`. Published rows are edited through their pending shadow.
pub fn assert_can_edit(state: &ModerateState) -> Result<(), BlockError> {
    match state {
        ModerateState::Draft | ModerateState::Pending | ModerateState::Published => Ok(()),
        ModerateState::Removed => Err(BlockError::InvalidTransition {
            from: state.clone(),
            action: "edit",
        }),
    }
}

/// Check that `publish` may be attempted on content in `state`.
///
/// Draft and Pending rows publish directly. A Published row only publishes
/// through an existing shadow; the caller passes whether one exists.
pub fn assert_can_publish(state: &ModerateState, has_shadow: bool) -> Result<(), BlockError> {
    match state {
        ModerateState::Draft | ModerateState::Pending => Ok(()),
        ModerateState::Published if has_shadow => Ok(()),
        _ => Err(BlockError::InvalidTransition {
            from: state.clone(),
            action: "publish",
        }),
    }
}

/// Check that `remove` may be attempted on content in `state`.
pub fn assert_can_remove(state: &ModerateState) -> Result<(), BlockError> {
    match state {
        ModerateState::Removed => Err(BlockError::InvalidTransition {
            from: state.clone(),
            action: "remove",
        }),
        _ => Ok(()),
    }
}

/// Check that a pending shadow may be discarded. Only shadows discard; the
/// live row they shadow is untouched by it.
pub fn assert_can_discard(state: &ModerateState) -> Result<(), BlockError> {
    match state {
        ModerateState::Pending => Ok(()),
        _ => Err(BlockError::InvalidTransition {
            from: state.clone(),
            action: "discard",
        }),
    }
}
