//! Order and line item types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order is being built from inbound messages
    #[default]
    Pending,
    /// Items settled and delivery address accepted
    Confirmed,
    /// Being prepared for dispatch
    Packing,
    /// Payment received
    Paid,
    /// Handed to delivery
    Shipped,
    /// Delivered to the customer
    Delivered,
    /// Cancelled by the merchant
    Cancelled,
    /// Cancelled on an explicit customer request
    CancelledByCustomer,
    /// Force-closed because the customer started a new order
    ArchivedForNew,
}

impl OrderStatus {
    /// Terminal statuses are never a target for append or modifier.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Paid
                | OrderStatus::Shipped
                | OrderStatus::Delivered
                | OrderStatus::Cancelled
                | OrderStatus::CancelledByCustomer
        )
    }

    /// Closed orders include terminal statuses plus forced archival;
    /// linking never reopens a closed order.
    pub fn is_closed(&self) -> bool {
        self.is_terminal() || matches!(self, OrderStatus::ArchivedForNew)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Packing => "packing",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::CancelledByCustomer => "cancelled_by_customer",
            OrderStatus::ArchivedForNew => "archived_for_new",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a line item was resolved against the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Canonical name matched a catalog product exactly
    CatalogExact,
    /// Matched via token overlap scoring
    CatalogFuzzy,
    /// No catalog resolution, text identity only
    #[default]
    TextOnly,
}

/// A single item on an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Resolved canonical identity (preferred over `name` when present)
    pub canonical: String,
    /// Raw text the customer used
    pub name: String,
    /// Quantity; an operation reducing this to zero or below removes the item
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default)]
    pub match_type: MatchType,
    /// Set by the reconciliation gate when the catalog has multiple
    /// variants and the text did not pick one. Only an explicit
    /// resolution event may clear it and assign a product id.
    #[serde(default)]
    pub needs_clarify: bool,
}

impl LineItem {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            canonical: name.to_lowercase(),
            name,
            qty: None,
            unit: None,
            brand: None,
            variant: None,
            notes: None,
            product_id: None,
            match_type: MatchType::TextOnly,
            needs_clarify: false,
        }
    }

    pub fn with_qty(mut self, qty: f64) -> Self {
        self.qty = Some(qty);
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    /// Best display identity: canonical when resolved, raw text otherwise.
    pub fn display_name(&self) -> &str {
        if self.canonical.is_empty() {
            &self.name
        } else {
            &self.canonical
        }
    }

    /// Human-presentable label for candidate lists and summaries.
    pub fn label(&self) -> String {
        let mut label = self.display_name().to_string();
        if let Some(ref variant) = self.variant {
            label.push_str(" (");
            label.push_str(variant);
            label.push(')');
        }
        if let Some(qty) = self.qty {
            if let Some(ref unit) = self.unit {
                label.push_str(&format!(" x{} {}", trim_qty(qty), unit));
            } else {
                label.push_str(&format!(" x{}", trim_qty(qty)));
            }
        }
        label
    }
}

/// Format a quantity without a trailing ".0" for whole numbers.
pub fn trim_qty(qty: f64) -> String {
    if (qty.fract()).abs() < f64::EPSILON {
        format!("{}", qty as i64)
    } else {
        format!("{}", qty)
    }
}

/// A customer order built from one or more inbound messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Order id, assigned at creation, immutable
    pub id: String,
    /// Tenant id
    pub tenant: String,
    /// Opaque customer key (phone-derived)
    pub source_identity: String,
    /// Insertion order is meaningful and preserved across appends
    pub items: Vec<LineItem>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub last_inbound_at: DateTime<Utc>,
    /// Raw delivery address text; extraction/validation is external
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<String>,
    /// Append-only audit trail of linking and modifier decisions
    pub link_reason: String,
    /// Optimistic-concurrency token, bumped on every store update
    #[serde(default)]
    pub version: u64,
}

impl Order {
    pub fn new(
        tenant: impl Into<String>,
        source_identity: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tenant: tenant.into(),
            source_identity: source_identity.into(),
            items: Vec::new(),
            status: OrderStatus::Pending,
            created_at: now,
            last_inbound_at: now,
            delivery_address: None,
            link_reason: String::new(),
            version: 0,
        }
    }

    /// Append to the audit trail. Never overwrites earlier entries.
    pub fn push_link_reason(&mut self, reason: &str) {
        if !self.link_reason.is_empty() {
            self.link_reason.push_str("; ");
        }
        self.link_reason.push_str(reason);
    }

    /// Append parsed items, preserving insertion order.
    pub fn append_items(&mut self, items: Vec<LineItem>) {
        self.items.extend(items);
    }

    /// Wholesale item replacement. Reserved for the edit-of-last-message
    /// path; every other mutation goes through the modifier engine.
    pub fn replace_items(&mut self, items: Vec<LineItem>) {
        self.items = items;
    }

    pub fn touch_inbound(&mut self, at: DateTime<Utc>) {
        self.last_inbound_at = at;
    }

    /// Any item still waiting on a variant clarification?
    pub fn has_unresolved_clarification(&self) -> bool {
        self.items.iter().any(|i| i.needs_clarify)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(OrderStatus::Paid.is_terminal());
        assert!(OrderStatus::Shipped.is_terminal());
        assert!(OrderStatus::CancelledByCustomer.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::ArchivedForNew.is_terminal());
        assert!(OrderStatus::ArchivedForNew.is_closed());
    }

    #[test]
    fn test_link_reason_is_append_only() {
        let mut order = Order::new("t1", "c1", Utc::now());
        order.push_link_reason("no_previous");
        order.push_link_reason("explicit_append");
        assert_eq!(order.link_reason, "no_previous; explicit_append");
    }

    #[test]
    fn test_item_label() {
        let item = LineItem::new("Coke").with_qty(2.0).with_variant("diet");
        assert_eq!(item.label(), "coke (diet) x2");

        let item = LineItem::new("onion").with_qty(1.5).with_unit("kg");
        assert_eq!(item.label(), "onion x1.5 kg");
    }
}
