//! Disambiguation sessions
//!
//! When a modifier target or a catalog variant is ambiguous, the engine
//! asks a numbered question and parks the pending choice in a
//! `DisambiguationSession`. This module builds those sessions and maps a
//! customer reply back onto one of the offered options.

use chrono::{DateTime, Utc};
use order_agent_core::{
    Candidate, DisambiguationPurpose, DisambiguationSession, DisambiguationStatus,
    ModifierPayload,
};

/// Build a modifier-target question from the candidate set the modifier
/// engine produced.
pub fn modifier_session(
    tenant: &str,
    customer: &str,
    order_id: &str,
    candidates: &[Candidate],
    modifier: ModifierPayload,
    now: DateTime<Utc>,
) -> DisambiguationSession {
    DisambiguationSession {
        tenant: tenant.to_string(),
        customer: customer.to_string(),
        order_id: order_id.to_string(),
        purpose: DisambiguationPurpose::ModifierTarget,
        candidate_indexes: candidates.iter().map(|c| c.index).collect(),
        options: candidates.iter().map(|c| c.label.clone()).collect(),
        modifier: Some(modifier),
        status: DisambiguationStatus::Pending,
        created_at: now,
    }
}

/// Build a catalog-variant question. `candidate_indexes` are the
/// positions of the flagged line items inside the committed order;
/// `options` are the product labels on offer.
pub fn variant_session(
    tenant: &str,
    customer: &str,
    order_id: &str,
    candidate_indexes: Vec<usize>,
    options: Vec<String>,
    now: DateTime<Utc>,
) -> DisambiguationSession {
    DisambiguationSession {
        tenant: tenant.to_string(),
        customer: customer.to_string(),
        order_id: order_id.to_string(),
        purpose: DisambiguationPurpose::CatalogVariant,
        candidate_indexes,
        options,
        modifier: None,
        status: DisambiguationStatus::Pending,
        created_at: now,
    }
}

/// The numbered question presented to the customer.
pub fn question_text(session: &DisambiguationSession) -> String {
    let lead = match session.purpose {
        DisambiguationPurpose::ModifierTarget => "Which one did you mean?",
        DisambiguationPurpose::CatalogVariant => "Which option would you like?",
    };
    let mut lines = vec![lead.to_string()];
    for (i, option) in session.options.iter().enumerate() {
        lines.push(format!("{}. {}", i + 1, option));
    }
    lines.join("\n")
}

/// Map a reply onto an option position.
///
/// Tries, in order: a bare 1-based number, an exact case-insensitive
/// label match, then partial matching (one option contains the reply or
/// vice versa). Partial matches only count when a single option wins.
pub fn resolve_reply(text: &str, options: &[String]) -> Option<usize> {
    let reply = text.trim().trim_end_matches(['.', '!']).to_lowercase();
    if reply.is_empty() || options.is_empty() {
        return None;
    }

    if let Ok(n) = reply.parse::<usize>() {
        if (1..=options.len()).contains(&n) {
            return Some(n - 1);
        }
        return None;
    }

    let lowered: Vec<String> = options.iter().map(|o| o.to_lowercase()).collect();

    if let Some(pos) = lowered.iter().position(|o| *o == reply) {
        return Some(pos);
    }

    // Partial: prefix beats plain containment, and a tie means no answer.
    let mut best_score = 0u8;
    let mut best_pos = None;
    let mut tied = false;
    for (pos, option) in lowered.iter().enumerate() {
        let score = if option.starts_with(&reply) || reply.starts_with(option.as_str()) {
            2
        } else if option.contains(&reply) || reply.contains(option.as_str()) {
            1
        } else {
            0
        };
        if score == 0 {
            continue;
        }
        if score > best_score {
            best_score = score;
            best_pos = Some(pos);
            tied = false;
        } else if score == best_score {
            tied = true;
        }
    }
    if tied {
        return None;
    }
    best_pos
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_numeric_reply() {
        let options = opts(&["chicken biryani (spicy) x1", "chicken biryani (mild) x1"]);
        assert_eq!(resolve_reply("2", &options), Some(1));
        assert_eq!(resolve_reply(" 1 ", &options), Some(0));
        assert_eq!(resolve_reply("3", &options), None);
        assert_eq!(resolve_reply("0", &options), None);
    }

    #[test]
    fn test_exact_label_reply() {
        let options = opts(&["Coke (diet)", "Coke (zero)"]);
        assert_eq!(resolve_reply("coke (zero)", &options), Some(1));
    }

    #[test]
    fn test_partial_unique_reply() {
        let options = opts(&["chicken biryani (spicy) x1", "mutton kebab x2"]);
        assert_eq!(resolve_reply("the kebab", &options), None);
        assert_eq!(resolve_reply("mutton", &options), Some(1));
    }

    #[test]
    fn test_partial_tie_is_unresolved() {
        let options = opts(&["chicken biryani (spicy) x1", "chicken biryani (mild) x1"]);
        assert_eq!(resolve_reply("chicken", &options), None);
    }

    #[test]
    fn test_unrelated_reply_is_unresolved() {
        let options = opts(&["onion x2 kg", "milk x1 l"]);
        assert_eq!(resolve_reply("actually cancel everything", &options), None);
    }

    #[test]
    fn test_question_text_is_numbered() {
        let session = variant_session(
            "shop-1",
            "cust-1",
            "order-1",
            vec![0],
            opts(&["Coke (diet)", "Coke (zero)"]),
            Utc::now(),
        );
        let text = question_text(&session);
        assert!(text.contains("1. Coke (diet)"));
        assert!(text.contains("2. Coke (zero)"));
    }
}
