//! Append-vs-new linking decision
//!
//! A small pure function. The rule ordering is load-bearing: explicit
//! new-order intent always wins over "looks appendable", and a closed
//! order always forces a new one regardless of timing.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use order_agent_core::Order;
use order_agent_nlu::rules;

static NEW_ORDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(new order|fresh order|start over|start new)\b").unwrap());

static APPEND_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(also|add|update|as well|one more thing)\b").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkAction {
    Append,
    New,
}

/// Why the decision went the way it did; `as_str` feeds the order's
/// append-only `link_reason` audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkReason {
    NoPrevious,
    NewAfterShippedOrPaid,
    NewAfterWindow,
    ExplicitKeyword,
    FreshListShape,
    ExplicitAppend,
    DefaultWithinWindow,
    ForcedLink,
    EditedLastMessage,
}

impl LinkReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkReason::NoPrevious => "no_previous",
            LinkReason::NewAfterShippedOrPaid => "new_after_shipped_or_paid",
            LinkReason::NewAfterWindow => "new_after_window",
            LinkReason::ExplicitKeyword => "explicit_keyword",
            LinkReason::FreshListShape => "fresh_list_shape",
            LinkReason::ExplicitAppend => "explicit_append",
            LinkReason::DefaultWithinWindow => "default_within_window",
            LinkReason::ForcedLink => "forced_link",
            LinkReason::EditedLastMessage => "edited_last_message",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkDecision {
    pub action: LinkAction,
    pub reason: LinkReason,
}

impl LinkDecision {
    fn new(reason: LinkReason) -> Self {
        Self {
            action: LinkAction::New,
            reason,
        }
    }

    fn append(reason: LinkReason) -> Self {
        Self {
            action: LinkAction::Append,
            reason,
        }
    }
}

/// Decide whether `text` extends `last_order` or starts a new one.
pub fn decide(
    last_order: Option<&Order>,
    text: &str,
    now: DateTime<Utc>,
    merge_window_minutes: i64,
) -> LinkDecision {
    let Some(last) = last_order else {
        return LinkDecision::new(LinkReason::NoPrevious);
    };

    // A closed order is never reopened by appending.
    if last.status.is_closed() {
        return LinkDecision::new(LinkReason::NewAfterShippedOrPaid);
    }

    let elapsed = now.signed_duration_since(last.last_inbound_at).num_minutes();
    if elapsed > merge_window_minutes {
        return LinkDecision::new(LinkReason::NewAfterWindow);
    }

    if NEW_ORDER.is_match(text) {
        return LinkDecision::new(LinkReason::ExplicitKeyword);
    }

    if rules::has_list_shape(text) {
        return LinkDecision::new(LinkReason::FreshListShape);
    }

    if APPEND_MARKER.is_match(text) {
        return LinkDecision::append(LinkReason::ExplicitAppend);
    }

    LinkDecision::append(LinkReason::DefaultWithinWindow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use order_agent_core::OrderStatus;

    fn order_with_status(status: OrderStatus, now: DateTime<Utc>) -> Order {
        let mut order = Order::new("t1", "c1", now);
        order.status = status;
        order
    }

    #[test]
    fn test_no_previous() {
        let decision = decide(None, "2kg onion", Utc::now(), 120);
        assert_eq!(decision.action, LinkAction::New);
        assert_eq!(decision.reason, LinkReason::NoPrevious);
    }

    #[test]
    fn test_terminal_always_new() {
        let now = Utc::now();
        for status in [
            OrderStatus::Paid,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::CancelledByCustomer,
            OrderStatus::ArchivedForNew,
        ] {
            let order = order_with_status(status, now);
            // Appendable-looking text and zero elapsed time change nothing.
            let decision = decide(Some(&order), "also add 2kg onion", now, 120);
            assert_eq!(decision.action, LinkAction::New, "status {status}");
            assert_eq!(decision.reason, LinkReason::NewAfterShippedOrPaid);
        }
    }

    #[test]
    fn test_window_expiry() {
        let now = Utc::now();
        let mut order = order_with_status(OrderStatus::Pending, now);
        order.last_inbound_at = now - chrono::Duration::minutes(121);

        let decision = decide(Some(&order), "2kg onion", now, 120);
        assert_eq!(decision.reason, LinkReason::NewAfterWindow);
    }

    #[test]
    fn test_explicit_keyword_beats_appendable_text() {
        let now = Utc::now();
        let order = order_with_status(OrderStatus::Pending, now);

        let decision = decide(Some(&order), "new order: also 2kg onion", now, 120);
        assert_eq!(decision.action, LinkAction::New);
        assert_eq!(decision.reason, LinkReason::ExplicitKeyword);
    }

    #[test]
    fn test_fresh_list_shape() {
        let now = Utc::now();
        let order = order_with_status(OrderStatus::Pending, now);

        let decision = decide(Some(&order), "2kg onion\n1L milk\nbread", now, 120);
        assert_eq!(decision.action, LinkAction::New);
        assert_eq!(decision.reason, LinkReason::FreshListShape);
    }

    #[test]
    fn test_explicit_append() {
        let now = Utc::now();
        let order = order_with_status(OrderStatus::Pending, now);

        let decision = decide(Some(&order), "also 2kg onion", now, 120);
        assert_eq!(decision.action, LinkAction::Append);
        assert_eq!(decision.reason, LinkReason::ExplicitAppend);
    }

    #[test]
    fn test_default_within_window() {
        let now = Utc::now();
        let order = order_with_status(OrderStatus::Pending, now);

        let decision = decide(Some(&order), "2kg onion", now, 120);
        assert_eq!(decision.action, LinkAction::Append);
        assert_eq!(decision.reason, LinkReason::DefaultWithinWindow);
    }
}
