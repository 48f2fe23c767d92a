//! Classification and parse result types
//!
//! The intent category is a closed tagged variant produced once at
//! classification time and carried through the pipeline; downstream code
//! branches on the enum, never on reason strings.

use serde::{Deserialize, Serialize};

use crate::order::LineItem;

/// What an inbound message means
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    /// Pure greeting or acknowledgement
    Greeting,
    /// Order-like content (items, quantities)
    Order,
    /// Change request against an existing order
    Modify,
    /// Cancellation request
    Cancel,
    /// Explicit "start a new order" command
    StartNew,
    /// Question about products, prices, availability
    Question,
    /// Address-looking text
    Address,
    /// Small talk / anything recognized but non-actionable
    Other,
    /// Could not classify, or the model's claim was below the floor
    Unknown,
}

impl IntentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentCategory::Greeting => "greeting",
            IntentCategory::Order => "order",
            IntentCategory::Modify => "modify",
            IntentCategory::Cancel => "cancel",
            IntentCategory::StartNew => "start_new",
            IntentCategory::Question => "question",
            IntentCategory::Address => "address",
            IntentCategory::Other => "other",
            IntentCategory::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for IntentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structural hints extracted alongside the category
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifierHints {
    /// Text has ≥2 non-greeting lines
    #[serde(default)]
    pub list_shape: bool,
    /// Text contains a quantity+unit pattern
    #[serde(default)]
    pub has_quantity: bool,
    /// Keyword that drove the classification, when one did
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
}

/// Classifier output: `classify(text) → {category, confidence, hints}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub category: IntentCategory,
    /// 0.0 - 1.0
    pub confidence: f32,
    #[serde(default)]
    pub hints: ClassifierHints,
}

impl Classification {
    pub fn new(category: IntentCategory, confidence: f32) -> Self {
        Self {
            category,
            confidence,
            hints: ClassifierHints::default(),
        }
    }

    pub fn with_hints(mut self, hints: ClassifierHints) -> Self {
        self.hints = hints;
        self
    }
}

/// Which parsing strategy produced the items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseSource {
    /// Model-based structured extraction
    ModelExtraction,
    /// Deterministic per-line extraction over list-shaped text
    ListLines,
    /// Single-line inline quantity fallback
    InlineQuantity,
    /// Nothing usable; the message is not an order
    NotOrder,
}

impl ParseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseSource::ModelExtraction => "model_extraction",
            ParseSource::ListLines => "list_lines",
            ParseSource::InlineQuantity => "inline_quantity",
            ParseSource::NotOrder => "not_order",
        }
    }
}

/// Parser pipeline output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedOrder {
    pub items: Vec<LineItem>,
    pub is_order_like: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    pub source: ParseSource,
}

impl ParsedOrder {
    pub fn not_order() -> Self {
        Self {
            items: Vec::new(),
            is_order_like: false,
            confidence: None,
            source: ParseSource::NotOrder,
        }
    }

    pub fn usable(&self) -> bool {
        !self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_wire_names() {
        let json = serde_json::to_string(&IntentCategory::StartNew).unwrap();
        assert_eq!(json, "\"start_new\"");
        let back: IntentCategory = serde_json::from_str("\"modify\"").unwrap();
        assert_eq!(back, IntentCategory::Modify);
    }

    #[test]
    fn test_not_order_is_unusable() {
        let parsed = ParsedOrder::not_order();
        assert!(!parsed.usable());
        assert_eq!(parsed.source, ParseSource::NotOrder);
    }
}
