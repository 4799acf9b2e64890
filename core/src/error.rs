//! Error taxonomy for draw box operations.
//!
//! Every failure leaves the store in a state satisfying the box invariants:
//! no ticket mutation is ever half-applied. Callers tell the variants apart to
//! decide between retrying the same call ([`DrawBoxError::StorageUnavailable`])
//! and retrying with different positions ([`DrawBoxError::AlreadyTaken`]).

use crate::types::BoxId;
use thiserror::Error;

/// Result type for draw box operations.
pub type Result<T> = std::result::Result<T, DrawBoxError>;

/// Errors that can occur in draw box operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DrawBoxError {
    /// Prize distribution is malformed (negative quantity, duplicate or blank
    /// rank, zero tickets). Rejected before any box is touched.
    #[error("Invalid distribution: {0}")]
    InvalidDistribution(String),

    /// Draw request is malformed (no positions, position outside the box,
    /// too many positions, blank claimant).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The referenced box does not exist.
    #[error("Box not found: {0}")]
    BoxNotFound(BoxId),

    /// The referenced box exists but has been rotated or reset away.
    #[error("Box is no longer active: {0}")]
    BoxInactive(BoxId),

    /// One or more requested positions were already claimed at claim time.
    ///
    /// The whole batch was rejected; none of the requested tickets changed.
    #[error("Tickets already taken in box {box_id}: positions {positions:?}")]
    AlreadyTaken {
        /// Box the draw targeted.
        box_id: BoxId,
        /// Requested positions that were not free.
        positions: Vec<u32>,
    },

    /// Transient infrastructure failure. Nothing was partially committed, so
    /// the whole operation is safe to retry.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl DrawBoxError {
    /// Whether retrying the identical operation may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }

    /// Stable machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidDistribution(_) => "INVALID_DISTRIBUTION",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::BoxNotFound(_) => "BOX_NOT_FOUND",
            Self::BoxInactive(_) => "BOX_INACTIVE",
            Self::AlreadyTaken { .. } => "ALREADY_TAKEN",
            Self::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_taken_display_lists_positions() {
        let box_id = BoxId::new();
        let error = DrawBoxError::AlreadyTaken {
            box_id,
            positions: vec![0, 3],
        };

        let display = format!("{error}");
        assert!(display.contains(&box_id.to_string()));
        assert!(display.contains("[0, 3]"));
    }

    #[test]
    fn only_storage_failures_are_retryable() {
        assert!(DrawBoxError::StorageUnavailable("connection reset".into()).is_retryable());
        assert!(
            !DrawBoxError::AlreadyTaken {
                box_id: BoxId::new(),
                positions: vec![1],
            }
            .is_retryable()
        );
        assert!(!DrawBoxError::InvalidDistribution("empty".into()).is_retryable());
        assert!(!DrawBoxError::BoxNotFound(BoxId::new()).is_retryable());
    }

    #[test]
    fn codes_are_distinct() {
        let box_id = BoxId::new();
        let codes = [
            DrawBoxError::InvalidDistribution(String::new()).code(),
            DrawBoxError::InvalidRequest(String::new()).code(),
            DrawBoxError::BoxNotFound(box_id).code(),
            DrawBoxError::BoxInactive(box_id).code(),
            DrawBoxError::AlreadyTaken {
                box_id,
                positions: vec![],
            }
            .code(),
            DrawBoxError::StorageUnavailable(String::new()).code(),
        ];
        let unique: std::collections::HashSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), codes.len());
    }
}
