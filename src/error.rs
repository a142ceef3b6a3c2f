//! Error types shared across the block content core

use crate::moderation::ModerateState;
use sea_orm::DbErr;

/// Result alias used by the content services
pub type BlockResult<T> = Result<T, BlockError>;

/// Errors raised by the moderation, ordering, resolver and wizard services
#[derive(Debug)]
pub enum BlockError {
    /// Moderation transition attempted from a state that does not permit it
    InvalidTransition {
        from: ModerateState,
        action: &'static str,
    },
    /// Referenced block, content, association row, section or template is missing
    NotFound(String),
    /// Reorder attempted past the first/last position, or on a singleton/empty set
    Boundary(String),
    /// Operation requested against the wrong single/multi mode
    UnsupportedCardinality(String),
    /// A section references a content kind that cannot be resolved, or a
    /// handler lacks a required capability
    Configuration(String),
    /// Write would break the one-published-row or order uniqueness invariant
    Constraint(String),
    /// Inbound payload failed validation
    Validation(validator::ValidationErrors),
    /// Underlying database failure
    Database(DbErr),
}

impl std::fmt::Display for BlockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockError::InvalidTransition { from, action } => {
                write!(f, "cannot {} content in state '{}'", action, from.as_str())
            }
            BlockError::NotFound(msg) => write!(f, "not found: {}", msg),
            BlockError::Boundary(msg) => write!(f, "boundary: {}", msg),
            BlockError::UnsupportedCardinality(msg) => {
                write!(f, "unsupported cardinality: {}", msg)
            }
            BlockError::Configuration(msg) => write!(f, "configuration error: {}", msg),
            BlockError::Constraint(msg) => write!(f, "constraint violation: {}", msg),
            BlockError::Validation(errors) => write!(f, "validation failed: {}", errors),
            BlockError::Database(e) => write!(f, "database error: {}", e),
        }
    }
}

impl std::error::Error for BlockError {}

impl From<DbErr> for BlockError {
    fn from(e: DbErr) -> Self {
        BlockError::Database(e)
    }
}

impl From<validator::ValidationErrors> for BlockError {
    fn from(e: validator::ValidationErrors) -> Self {
        BlockError::Validation(e)
    }
}
