//! Deterministic modifier-text parser
//!
//! Turns a change-request message into a structured `ModifierPayload`.
//! Unrecognized phrasing yields `ChangeOp::Unsupported`, which the
//! modifier engine applies as a no-op with a descriptive summary;
//! nothing fails silently.

use once_cell::sync::Lazy;
use regex::Regex;

use order_agent_core::{ChangeOp, ModifierPayload, ModifierScope, ModifierTarget};

static REMOVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:please\s+)?(?:remove|delete|cancel)\s+(?:the\s+)?(.*)$").unwrap()
});

static FROM_ORDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+from\s+(?:my\s+|the\s+)?order\s*$").unwrap());

static MAKE_IT_QTY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^make\s+(?:it|them|that)\s+(\d+(?:\.\d+)?)(?:\s+instead)?\s*\.?$").unwrap()
});

static MAKE_TARGET_QTY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^make\s+(?:the\s+)?(.+?)\s+(\d+(?:\.\d+)?)(?:\s+instead)?\s*\.?$").unwrap()
});

static CHANGE_TO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^change\s+(?:the\s+)?(.+?)\s+to\s+(.+?)\s*\.?$").unwrap());

static ADD_MORE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:add\s+)?(\d+(?:\.\d+)?|one|two)\s+more\s+(.+?)\s*\.?$").unwrap()
});

static REDUCE_BY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^reduce\s+(?:the\s+)?(.+?)\s+by\s+(\d+(?:\.\d+)?)\s*\.?$").unwrap()
});

static LESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\d+(?:\.\d+)?)\s+less\s+(.+?)\s*\.?$").unwrap());

static NOTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:add\s+(?:a\s+)?)?note:?\s+(.+)$").unwrap());

static MAKE_IT_VARIANT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^make\s+(?:it|them|that)\s+(.+?)\s*\.?$").unwrap());

static INSTEAD_OF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(.+?)\s+instead\s+of\s+(?:the\s+)?(.+?)\s*\.?$").unwrap());

fn word_count(s: &str) -> f64 {
    match s.to_lowercase().as_str() {
        "one" => 1.0,
        "two" => 2.0,
        other => other.parse().unwrap_or(1.0),
    }
}

/// Split an explicit all-items marker off the target phrase.
fn split_scope(target: &str) -> (ModifierScope, String) {
    let normalized = target.trim().to_lowercase();
    if matches!(
        normalized.as_str(),
        "all" | "everything" | "all items" | "all of them" | "them all"
    ) {
        return (ModifierScope::All, String::new());
    }
    if let Some(rest) = normalized.strip_prefix("all ") {
        return (ModifierScope::All, rest.to_string());
    }
    (ModifierScope::One, target.trim().to_string())
}

fn payload(target: &str, scope: ModifierScope, change: ChangeOp) -> ModifierPayload {
    ModifierPayload::new(ModifierTarget::new(target), scope, change)
}

/// Parse a change request out of free text. Always produces a payload;
/// phrasing the rules do not recognize becomes `Unsupported`.
pub fn parse_modifier(text: &str) -> ModifierPayload {
    let trimmed = text.trim();

    if let Some(caps) = REMOVE.captures(trimmed) {
        let raw_target = FROM_ORDER.replace(&caps[1], "").to_string();
        let (scope, target) = split_scope(&raw_target);
        return payload(&target, scope, ChangeOp::Remove);
    }

    if let Some(caps) = MAKE_IT_QTY.captures(trimmed) {
        let qty: f64 = caps[1].parse().unwrap_or(0.0);
        return payload(
            "",
            ModifierScope::One,
            ChangeOp::Qty {
                new_qty: Some(qty),
                delta: None,
            },
        );
    }

    if let Some(caps) = MAKE_TARGET_QTY.captures(trimmed) {
        let (scope, target) = split_scope(&caps[1]);
        let qty: f64 = caps[2].parse().unwrap_or(0.0);
        return payload(
            &target,
            scope,
            ChangeOp::Qty {
                new_qty: Some(qty),
                delta: None,
            },
        );
    }

    if let Some(caps) = CHANGE_TO.captures(trimmed) {
        let (scope, target) = split_scope(&caps[1]);
        let value = caps[2].trim();
        if let Ok(qty) = value.parse::<f64>() {
            return payload(
                &target,
                scope,
                ChangeOp::Qty {
                    new_qty: Some(qty),
                    delta: None,
                },
            );
        }
        return payload(
            &target,
            scope,
            ChangeOp::Variant {
                new_variant: Some(value.to_string()),
            },
        );
    }

    if let Some(caps) = ADD_MORE.captures(trimmed) {
        let delta = word_count(&caps[1]);
        let (scope, target) = split_scope(&caps[2]);
        return payload(
            &target,
            scope,
            ChangeOp::Qty {
                new_qty: None,
                delta: Some(delta),
            },
        );
    }

    if let Some(caps) = REDUCE_BY.captures(trimmed) {
        let (scope, target) = split_scope(&caps[1]);
        let delta: f64 = caps[2].parse().unwrap_or(0.0);
        return payload(
            &target,
            scope,
            ChangeOp::Qty {
                new_qty: None,
                delta: Some(-delta),
            },
        );
    }

    if let Some(caps) = LESS.captures(trimmed) {
        let delta: f64 = caps[1].parse().unwrap_or(0.0);
        let (scope, target) = split_scope(&caps[2]);
        return payload(
            &target,
            scope,
            ChangeOp::Qty {
                new_qty: None,
                delta: Some(-delta),
            },
        );
    }

    if let Some(caps) = NOTE.captures(trimmed) {
        return payload(
            "",
            ModifierScope::All,
            ChangeOp::Note {
                text: Some(caps[1].trim().to_string()),
            },
        );
    }

    if let Some(caps) = MAKE_IT_VARIANT.captures(trimmed) {
        let (scope, variant) = split_scope(&caps[1]);
        let scope = if scope == ModifierScope::All {
            ModifierScope::All
        } else {
            ModifierScope::One
        };
        return payload(
            "",
            scope,
            ChangeOp::Variant {
                new_variant: Some(variant),
            },
        );
    }

    if let Some(caps) = INSTEAD_OF.captures(trimmed) {
        // "diet coke instead of regular coke"
        let replacement = caps[1].trim().to_string();
        let (scope, target) = split_scope(&caps[2]);
        return payload(
            &target,
            scope,
            ChangeOp::Variant {
                new_variant: Some(replacement),
            },
        );
    }

    payload(
        "",
        ModifierScope::One,
        ChangeOp::Unsupported {
            raw: trimmed.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove() {
        let payload = parse_modifier("remove coke");
        assert_eq!(payload.change, ChangeOp::Remove);
        assert_eq!(payload.target.text, "coke");
        assert_eq!(payload.scope, ModifierScope::One);
    }

    #[test]
    fn test_remove_from_order_suffix() {
        let payload = parse_modifier("remove the milk from my order");
        assert_eq!(payload.change, ChangeOp::Remove);
        assert_eq!(payload.target.text, "milk");
    }

    #[test]
    fn test_remove_everything() {
        let payload = parse_modifier("remove everything");
        assert_eq!(payload.change, ChangeOp::Remove);
        assert_eq!(payload.scope, ModifierScope::All);
    }

    #[test]
    fn test_make_it_qty_has_empty_target() {
        let payload = parse_modifier("make it 2 instead");
        assert_eq!(
            payload.change,
            ChangeOp::Qty {
                new_qty: Some(2.0),
                delta: None
            }
        );
        assert!(payload.target.text.is_empty());
    }

    #[test]
    fn test_make_target_qty() {
        let payload = parse_modifier("make the onions 3");
        assert_eq!(payload.target.text, "onions");
        assert_eq!(
            payload.change,
            ChangeOp::Qty {
                new_qty: Some(3.0),
                delta: None
            }
        );
    }

    #[test]
    fn test_change_to_variant() {
        let payload = parse_modifier("change the biryani to spicy");
        assert_eq!(payload.target.text, "biryani");
        assert_eq!(
            payload.change,
            ChangeOp::Variant {
                new_variant: Some("spicy".to_string())
            }
        );
    }

    #[test]
    fn test_change_to_qty() {
        let payload = parse_modifier("change milk to 2");
        assert_eq!(
            payload.change,
            ChangeOp::Qty {
                new_qty: Some(2.0),
                delta: None
            }
        );
    }

    #[test]
    fn test_add_more_delta() {
        let payload = parse_modifier("add 2 more onions");
        assert_eq!(payload.target.text, "onions");
        assert_eq!(
            payload.change,
            ChangeOp::Qty {
                new_qty: None,
                delta: Some(2.0)
            }
        );

        let payload = parse_modifier("one more coke");
        assert_eq!(
            payload.change,
            ChangeOp::Qty {
                new_qty: None,
                delta: Some(1.0)
            }
        );
    }

    #[test]
    fn test_reduce_by() {
        let payload = parse_modifier("reduce the rice by 5");
        assert_eq!(payload.target.text, "rice");
        assert_eq!(
            payload.change,
            ChangeOp::Qty {
                new_qty: None,
                delta: Some(-5.0)
            }
        );
    }

    #[test]
    fn test_note() {
        let payload = parse_modifier("note: no plastic bags");
        assert_eq!(
            payload.change,
            ChangeOp::Note {
                text: Some("no plastic bags".to_string())
            }
        );
        assert_eq!(payload.scope, ModifierScope::All);
    }

    #[test]
    fn test_make_them_all_variant() {
        let payload = parse_modifier("make them all spicy");
        assert_eq!(payload.scope, ModifierScope::All);
        assert_eq!(
            payload.change,
            ChangeOp::Variant {
                new_variant: Some("spicy".to_string())
            }
        );
    }

    #[test]
    fn test_unrecognized_is_unsupported() {
        let payload = parse_modifier("do something weird to it");
        assert!(matches!(payload.change, ChangeOp::Unsupported { .. }));
    }
}
