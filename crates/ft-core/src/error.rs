//! Engine error type.
//!
//! Sub-crates define their own error enums and wrap `CoreError` as one
//! variant where they surface configuration problems.

use thiserror::Error;

use crate::EntityId;

/// The top-level error type for `ft-core` and a common base for sub-crates.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("entity {0} not found")]
    EntityNotFound(EntityId),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for `ft-core`.
pub type CoreResult<T> = Result<T, CoreError>;
