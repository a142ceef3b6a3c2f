//! Ordered many-to-many association operations
//!
//! Slideshows and reference lists are join rows carrying an explicit
//! `order`. The operations here are generic over the join table via
//! [`AssocTable`]; all mutating operations expect to run inside the
//! caller's transaction.

use crate::error::BlockError;
use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DbErr};

/// One association row, detached from its concrete join entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssocRow {
    pub id: i32,
    pub target_id: i32,
    pub order: i32,
}

/// Direction for a single-step reorder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

/// Capability interface over one ordered join table.
#[async_trait]
pub trait AssocTable {
    /// Field name the join backs, for error messages
    const FIELD: &'static str;

    /// Rows for one content item, ordered by `order`
    async fn rows<C: ConnectionTrait>(db: &C, content_id: i32) -> Result<Vec<AssocRow>, DbErr>;
    async fn insert<C: ConnectionTrait>(
        db: &C,
        content_id: i32,
        target_id: i32,
        order: i32,
    ) -> Result<i32, DbErr>;
    async fn set_order<C: ConnectionTrait>(db: &C, row_id: i32, order: i32) -> Result<(), DbErr>;
    async fn delete_row<C: ConnectionTrait>(db: &C, row_id: i32) -> Result<(), DbErr>;
    async fn clear<C: ConnectionTrait>(db: &C, content_id: i32) -> Result<(), DbErr>;
    /// Duplicate all rows of `from_content` onto `to_content`, keeping order.
    /// Used when a pending shadow is materialized.
    async fn copy_all<C: ConnectionTrait>(
        db: &C,
        from_content: i32,
        to_content: i32,
    ) -> Result<(), DbErr>;
}

/// Append `target_id` at the end: order = max + 1, or 1 for the first row.
pub async fn append<A: AssocTable, C: ConnectionTrait>(
    db: &C,
    content_id: i32,
    target_id: i32,
) -> Result<i32, BlockError> {
    let rows = A::rows(db, content_id).await?;
    let order = rows.iter().map(|r| r.order).max().unwrap_or(0) + 1;
    let row_id = A::insert(db, content_id, target_id, order).await?;
    Ok(row_id)
}

/// Locate `row_id` in the ordered sequence and return the indices to swap.
///
/// Fails when the row is absent, when there is nothing to move relative to,
/// and at either end of the sequence.
pub fn plan_move(
    rows: &[AssocRow],
    row_id: i32,
    direction: Direction,
) -> Result<(usize, usize), BlockError> {
    if rows.len() < 2 {
        return Err(BlockError::Boundary(format!(
            "cannot move {}: fewer than two items",
            row_id
        )));
    }
    let idx = rows
        .iter()
        .position(|r| r.id == row_id)
        .ok_or_else(|| BlockError::NotFound(format!("association row {}", row_id)))?;
    match direction {
        Direction::Up if idx == 0 => {
            Err(BlockError::Boundary("cannot move the first item up".into()))
        }
        Direction::Down if idx == rows.len() - 1 => {
            Err(BlockError::Boundary("cannot move the last item down".into()))
        }
        Direction::Up => Ok((idx, idx - 1)),
        Direction::Down => Ok((idx, idx + 1)),
    }
}

/// Swap the row's `order` with its neighbor in `direction`.
///
/// A swap preserves a valid total order, so no renumbering happens here.
pub async fn move_row<A: AssocTable, C: ConnectionTrait>(
    db: &C,
    content_id: i32,
    row_id: i32,
    direction: Direction,
) -> Result<(), BlockError> {
    let rows = A::rows(db, content_id).await?;
    let (idx, neighbor) = plan_move(&rows, row_id, direction)?;
    A::set_order(db, rows[idx].id, rows[neighbor].order).await?;
    A::set_order(db, rows[neighbor].id, rows[idx].order).await?;
    Ok(())
}

/// Replace the whole association with `targets`, renumbered densely 1..N.
pub async fn replace_all<A: AssocTable, C: ConnectionTrait>(
    db: &C,
    content_id: i32,
    targets: &[i32],
) -> Result<(), BlockError> {
    A::clear(db, content_id).await?;
    for (i, target_id) in targets.iter().enumerate() {
        A::insert(db, content_id, *target_id, (i + 1) as i32).await?;
    }
    Ok(())
}

/// Delete one row. Remaining rows keep their order values; a gap is fine
/// for a single removal.
pub async fn remove_one<A: AssocTable, C: ConnectionTrait>(
    db: &C,
    content_id: i32,
    row_id: i32,
) -> Result<(), BlockError> {
    let rows = A::rows(db, content_id).await?;
    if !rows.iter().any(|r| r.id == row_id) {
        return Err(BlockError::NotFound(format!(
            "association row {} on field '{}'",
            row_id,
            A::FIELD
        )));
    }
    A::delete_row(db, row_id).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(specs: &[(i32, i32)]) -> Vec<AssocRow> {
        specs
            .iter()
            .map(|(id, order)| AssocRow {
                id: *id,
                target_id: 100 + id,
                order: *order,
            })
            .collect()
    }

    #[test]
    fn plan_move_swaps_with_neighbor() {
        let rows = rows(&[(1, 1), (2, 2), (3, 3)]);
        assert_eq!(plan_move(&rows, 2, Direction::Up).unwrap(), (1, 0));
        assert_eq!(plan_move(&rows, 2, Direction::Down).unwrap(), (1, 2));
    }

    #[test]
    fn plan_move_rejects_boundaries() {
        let rows = rows(&[(1, 1), (2, 2)]);
        assert!(matches!(
            plan_move(&rows, 1, Direction::Up),
            Err(BlockError::Boundary(_))
        ));
        assert!(matches!(
            plan_move(&rows, 2, Direction::Down),
            Err(BlockError::Boundary(_))
        ));
    }

    #[test]
    fn plan_move_rejects_singleton_and_empty() {
        assert!(matches!(
            plan_move(&rows(&[(1, 1)]), 1, Direction::Down),
            Err(BlockError::Boundary(_))
        ));
        assert!(matches!(
            plan_move(&[], 1, Direction::Up),
            Err(BlockError::Boundary(_))
        ));
    }

    #[test]
    fn plan_move_requires_known_row() {
        let rows = rows(&[(1, 1), (2, 2)]);
        assert!(matches!(
            plan_move(&rows, 9, Direction::Up),
            Err(BlockError::NotFound(_))
        ));
    }
}
