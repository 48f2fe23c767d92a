//! Error types shared across the workspace
//!
//! The collaborator and store traits live in this crate, so their error
//! enums do too; implementing crates reuse them.

use thiserror::Error;

/// Errors raised by core domain types
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Illegal stage transition: {from} -> {to}")]
    IllegalTransition {
        from: &'static str,
        to: &'static str,
    },
}

/// Errors from external NLU collaborators (classifier, extractor).
///
/// Every variant is recoverable: the caller falls back to the
/// deterministic path and never surfaces these to the end user.
#[derive(Error, Debug)]
pub enum NluError {
    #[error("No credentials configured")]
    MissingCredentials,

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Call budget exhausted")]
    BudgetExhausted,

    /// The raw payload is carried so the caller can log it.
    #[error("Malformed model output: {raw}")]
    Malformed { raw: String },
}

/// Errors from the persistence layer
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Version conflict on order {order_id}: expected {expected}, found {found}")]
    VersionConflict {
        order_id: String,
        expected: u64,
        found: u64,
    },

    #[error("Storage backend error: {0}")]
    Backend(String),
}
