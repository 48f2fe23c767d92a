//! The engine's single logical output type

use serde::{Deserialize, Serialize};

use crate::modifier::{ApplyStatus, Candidate};
use crate::order::LineItem;

/// Why a message produced no state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Same event already processed (dedupe fingerprint hit)
    DuplicateMessage,
    Greeting,
    Smalltalk,
    /// Modifier or cancel with no open order to act on
    NoActiveOrder,
    /// No strategy produced items and no other intent matched
    NothingParsed,
    /// Order cancelled on customer request
    Cancelled,
    /// The referenced order/session vanished between read and write
    StaleSession,
    /// Start-new command processed without any new items
    StartedNew,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::DuplicateMessage => "duplicate_message",
            SkipReason::Greeting => "greeting",
            SkipReason::Smalltalk => "smalltalk",
            SkipReason::NoActiveOrder => "no_active_order",
            SkipReason::NothingParsed => "nothing_parsed",
            SkipReason::Cancelled => "cancelled",
            SkipReason::StaleSession => "stale_session",
            SkipReason::StartedNew => "started_new",
        }
    }
}

/// Decision returned by `ingest`. Delivery of any reply is the caller's
/// concern; this core only decides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IngestResult {
    /// An order was created or appended to
    Order {
        order_id: String,
        items: Vec<LineItem>,
        link_reason: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        reply: Option<String>,
    },
    /// A question or a clarification request back to the customer
    Inquiry {
        topic: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        reply: Option<String>,
    },
    /// A modifier ran (or was parked for disambiguation)
    Modifier {
        order_id: String,
        status: ApplyStatus,
        summary: String,
        items: Vec<LineItem>,
        #[serde(skip_serializing_if = "Option::is_none")]
        candidates: Option<Vec<Candidate>>,
    },
    /// Nothing to do
    None { reason: SkipReason },
}

impl IngestResult {
    pub fn kind(&self) -> &'static str {
        match self {
            IngestResult::Order { .. } => "order",
            IngestResult::Inquiry { .. } => "inquiry",
            IngestResult::Modifier { .. } => "modifier",
            IngestResult::None { .. } => "none",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_serialization() {
        let result = IngestResult::None {
            reason: SkipReason::Greeting,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["kind"], "none");
        assert_eq!(json["reason"], "greeting");
    }
}
