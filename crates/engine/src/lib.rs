//! Decision engine
//!
//! Ties the classifier, parser, catalog gate, linking decision,
//! modifier engine and disambiguation sessions into one `ingest` entry
//! point per inbound message.

pub mod disambiguation;
pub mod engine;
pub mod linking;
pub mod locks;
pub mod modifier;

use thiserror::Error;

pub use engine::{InboundMessage, OrderAgent};
pub use linking::{decide, LinkAction, LinkDecision, LinkReason};
pub use modifier::{ApplyOutcome, ModifierEngine};

use order_agent_core::{CoreError, StoreError};

/// Failures the engine cannot absorb. NLU failures never appear here;
/// those degrade to the deterministic path inside the pipeline.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Session(#[from] CoreError),
}
