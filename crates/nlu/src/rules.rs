//! Deterministic rule-based classifier
//!
//! The always-available fallback behind the gated adapter. Output shape
//! is identical to the model path; confidence is fixed per rule family.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use order_agent_core::{Classification, ClassifierHints, IntentCategory};

use crate::quantity;

/// Pure greetings and acknowledgements
const GREETING_WORDS: &[&str] = &[
    "hi", "hii", "hello", "hey", "namaste", "yo", "thanks", "thank", "you", "ok", "okay", "good",
    "morning", "afternoon", "evening", "night", "bye", "welcome", "cool", "great", "fine",
];

static START_NEW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(new order|fresh order|start over|start new)\b").unwrap());

static CANCEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bcancel\b").unwrap());

static CANCEL_TARGET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bcancel\s+(?:the\s+)?([a-z][\w ]*)").unwrap());

/// "cancel the coke" targets an item (a modifier); "cancel my order",
/// "cancel it" or a bare "cancel" targets the whole order.
fn cancel_targets_item(text: &str) -> bool {
    match CANCEL_TARGET.captures(text) {
        Some(caps) => {
            let first = caps[1]
                .split_whitespace()
                .next()
                .unwrap_or("")
                .to_lowercase();
            !matches!(first.as_str(), "order" | "my" | "it" | "this" | "that" | "everything")
        }
        None => false,
    }
}

static MODIFY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(remove|delete|replace|change|make (?:it|them|that|the)|instead)\b")
        .unwrap()
});

static QUESTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:do|does|did|what|when|where|which|how|why|is|are|can|could|kya)\b")
        .unwrap()
});

static PRICE_WORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(price|rate|cost|how much|available|in stock)\b").unwrap());

static ADDRESS_WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(road|street|house|flat|sector|block|near|landmark|pincode|pin code)\b")
        .unwrap()
});

/// Is one line a pure greeting/acknowledgement?
pub fn is_greeting_line(line: &str) -> bool {
    let words: Vec<&str> = line.unicode_words().collect();
    !words.is_empty()
        && words.len() <= 4
        && words
            .iter()
            .all(|w| GREETING_WORDS.contains(&w.to_lowercase().as_str()))
}

/// Is one line an order-level command (start-new, cancel) rather than
/// an item?
pub fn is_command_line(line: &str) -> bool {
    START_NEW.is_match(line) || CANCEL.is_match(line)
}

/// Does the text have list shape: two or more non-greeting lines?
pub fn has_list_shape(text: &str) -> bool {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !is_greeting_line(l))
        .count()
        >= 2
}

/// Rule-based classifier. Infallible and deterministic; covers greeting
/// detection, order-shape detection, explicit commands and a generic
/// unknown bucket.
#[derive(Debug, Default)]
pub struct RuleClassifier;

impl RuleClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, text: &str) -> Classification {
        let trimmed = text.trim();
        let hints = ClassifierHints {
            list_shape: has_list_shape(trimmed),
            has_quantity: quantity::has_quantity(trimmed),
            keyword: None,
        };

        if trimmed.is_empty() {
            return Classification::new(IntentCategory::Unknown, 0.0).with_hints(hints);
        }

        if is_greeting_line(trimmed) {
            return Classification::new(IntentCategory::Greeting, 0.95).with_hints(hints);
        }

        if let Some(m) = START_NEW.find(trimmed) {
            let mut hints = hints;
            hints.keyword = Some(m.as_str().to_lowercase());
            return Classification::new(IntentCategory::StartNew, 0.9).with_hints(hints);
        }

        if CANCEL.is_match(trimmed) {
            if cancel_targets_item(trimmed) {
                return Classification::new(IntentCategory::Modify, 0.75).with_hints(hints);
            }
            return Classification::new(IntentCategory::Cancel, 0.85).with_hints(hints);
        }

        if let Some(m) = MODIFY.find(trimmed) {
            let mut hints = hints;
            hints.keyword = Some(m.as_str().to_lowercase());
            return Classification::new(IntentCategory::Modify, 0.8).with_hints(hints);
        }

        if hints.list_shape || hints.has_quantity {
            return Classification::new(IntentCategory::Order, 0.8).with_hints(hints);
        }

        if trimmed.contains('?') || QUESTION.is_match(trimmed) || PRICE_WORDS.is_match(trimmed) {
            return Classification::new(IntentCategory::Question, 0.7).with_hints(hints);
        }

        if ADDRESS_WORDS.is_match(trimmed) {
            return Classification::new(IntentCategory::Address, 0.5).with_hints(hints);
        }

        Classification::new(IntentCategory::Unknown, 0.2).with_hints(hints)
    }
}
