//! Modifier payloads — the structured form of a change request
//!
//! A payload is ephemeral: it lives for one message, except when an
//! ambiguous one is parked inside a disambiguation session.

use serde::{Deserialize, Serialize};

use crate::order::trim_qty;

/// What the change request points at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierTarget {
    /// The customer's literal phrase
    pub text: String,
    /// Best-effort cleaned form
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical: Option<String>,
}

impl ModifierTarget {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let canonical = {
            let cleaned = text.trim().to_lowercase();
            if cleaned.is_empty() || cleaned == text {
                None
            } else {
                Some(cleaned)
            }
        };
        Self { text, canonical }
    }

    /// Normalized form used for target resolution.
    pub fn normalized(&self) -> String {
        self.canonical
            .clone()
            .unwrap_or_else(|| self.text.trim().to_lowercase())
    }
}

/// How widely the change applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModifierScope {
    /// Apply to the single item the target resolves to
    #[default]
    One,
    /// Apply to every line item, skipping target resolution
    All,
    /// Terminal signal: never applied, only seeds a disambiguation question
    Ambiguous,
}

/// Exactly one change operation per payload.
///
/// `Unsupported` is produced once at parse time for an unknown change tag
/// and always applies as a no-op with a descriptive summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeOp {
    Variant {
        #[serde(skip_serializing_if = "Option::is_none")]
        new_variant: Option<String>,
    },
    Qty {
        /// Absolute quantity; takes precedence over `delta`
        #[serde(skip_serializing_if = "Option::is_none")]
        new_qty: Option<f64>,
        /// Relative adjustment
        #[serde(skip_serializing_if = "Option::is_none")]
        delta: Option<f64>,
    },
    Remove,
    Note {
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    Unsupported {
        raw: String,
    },
}

impl ChangeOp {
    /// Short tag for summaries and audit strings.
    pub fn kind(&self) -> &'static str {
        match self {
            ChangeOp::Variant { .. } => "variant",
            ChangeOp::Qty { .. } => "qty",
            ChangeOp::Remove => "remove",
            ChangeOp::Note { .. } => "note",
            ChangeOp::Unsupported { .. } => "unsupported",
        }
    }
}

/// A structured change request against an order's item list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierPayload {
    pub target: ModifierTarget,
    #[serde(default)]
    pub scope: ModifierScope,
    pub change: ChangeOp,
}

impl ModifierPayload {
    pub fn new(target: ModifierTarget, scope: ModifierScope, change: ChangeOp) -> Self {
        Self {
            target,
            scope,
            change,
        }
    }

    /// Human-readable description of the pending change, used when the
    /// payload is parked in a disambiguation question.
    pub fn describe(&self) -> String {
        match &self.change {
            ChangeOp::Variant { new_variant } => match new_variant {
                Some(v) => format!("set variant to {v}"),
                None => "set variant".to_string(),
            },
            ChangeOp::Qty { new_qty, delta } => match (new_qty, delta) {
                (Some(q), _) => format!("set quantity to {}", trim_qty(*q)),
                (None, Some(d)) if *d >= 0.0 => format!("add {}", trim_qty(*d)),
                (None, Some(d)) => format!("reduce by {}", trim_qty(-d)),
                (None, None) => "change quantity".to_string(),
            },
            ChangeOp::Remove => "remove".to_string(),
            ChangeOp::Note { text } => match text {
                Some(t) => format!("note: {t}"),
                None => "add note".to_string(),
            },
            ChangeOp::Unsupported { raw } => format!("unsupported change ({raw})"),
        }
    }
}

/// Outcome status of applying a modifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyStatus {
    Applied,
    NoMatch,
    Ambiguous,
    Noop,
}

/// One disambiguation candidate, built from a matching line item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Position in the order's item list at the time the question was asked
    pub index: usize,
    /// Human-presentable label (canonical/variant/unit)
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qty: Option<f64>,
    /// The literal modifier that triggered the question
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modifier: Option<ModifierPayload>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_normalization() {
        let target = ModifierTarget::new("  The Coke ");
        assert_eq!(target.normalized(), "the coke");

        let target = ModifierTarget::new("");
        assert_eq!(target.normalized(), "");
        assert!(target.canonical.is_none());
    }

    #[test]
    fn test_change_serialization_shape() {
        let change = ChangeOp::Qty {
            new_qty: Some(2.0),
            delta: None,
        };
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["type"], "qty");
        assert_eq!(json["new_qty"], 2.0);
    }

    #[test]
    fn test_describe() {
        let payload = ModifierPayload::new(
            ModifierTarget::new("biryani"),
            ModifierScope::One,
            ChangeOp::Qty {
                new_qty: None,
                delta: Some(-1.0),
            },
        );
        assert_eq!(payload.describe(), "reduce by 1");
    }
}
