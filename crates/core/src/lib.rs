//! Core traits and types for the order agent
//!
//! This crate provides foundational types used across all other crates:
//! - Order, line item and modifier types
//! - Conversation and disambiguation session types
//! - Classification/parse result types (closed tagged variants)
//! - Collaborator and store traits
//! - Error types
//! - The inbound-event dedupe fingerprint

pub mod catalog;
pub mod classify;
pub mod dedupe;
pub mod error;
pub mod ingest;
pub mod modifier;
pub mod order;
pub mod session;
pub mod traits;

pub use catalog::Product;
pub use classify::{
    Classification, ClassifierHints, IntentCategory, ParseSource, ParsedOrder,
};
pub use error::{CoreError, NluError, StoreError};
pub use ingest::{IngestResult, SkipReason};
pub use modifier::{
    ApplyStatus, Candidate, ChangeOp, ModifierPayload, ModifierScope, ModifierTarget,
};
pub use order::{LineItem, MatchType, Order, OrderStatus};
pub use session::{
    ConversationSession, ConversationStage, DisambiguationPurpose, DisambiguationSession,
    DisambiguationStatus,
};
pub use traits::{CatalogStore, Classifier, OrderExtractor, OrderStore, SessionStore};
