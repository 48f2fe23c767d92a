//! Modifier engine
//!
//! Resolves a change request against an order's item list: applies it,
//! reports no-match, or surfaces an ambiguous candidate set for
//! disambiguation. Nothing here touches the store; the caller owns
//! persistence.

use unicode_segmentation::UnicodeSegmentation;

use order_agent_core::{
    ApplyStatus, Candidate, ChangeOp, LineItem, ModifierPayload, ModifierScope,
};

/// Result of applying a modifier
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    pub status: ApplyStatus,
    /// The item list after the change (unchanged unless `Applied`)
    pub items: Vec<LineItem>,
    pub summary: String,
    pub candidates: Option<Vec<Candidate>>,
}

impl ApplyOutcome {
    fn unchanged(status: ApplyStatus, items: &[LineItem], summary: impl Into<String>) -> Self {
        Self {
            status,
            items: items.to_vec(),
            summary: summary.into(),
            candidates: None,
        }
    }
}

const SCORE_EXACT: u8 = 3;
const SCORE_SUBSTRING: u8 = 2;
const SCORE_TOKEN: u8 = 1;

fn score_item(item: &LineItem, target: &str) -> u8 {
    // An empty target phrase ties every item at substring level; with a
    // multi-item order that surfaces as ambiguity instead of a guess.
    if target.is_empty() {
        return SCORE_SUBSTRING;
    }

    let mut best = 0;
    for field in [
        Some(item.canonical.as_str()),
        Some(item.name.as_str()),
        item.variant.as_deref(),
    ]
    .into_iter()
    .flatten()
    {
        let field = field.to_lowercase();
        if field == target {
            best = best.max(SCORE_EXACT);
        } else if field.contains(target) || target.contains(&field) {
            best = best.max(SCORE_SUBSTRING);
        } else {
            let target_tokens: Vec<&str> = target.unicode_words().collect();
            if field
                .unicode_words()
                .any(|w| target_tokens.contains(&w))
            {
                best = best.max(SCORE_TOKEN);
            }
        }
    }
    best
}

/// Indices of the items the modifier's target resolves to: only the
/// indices at the maximum nonzero score survive.
fn resolve_targets(items: &[LineItem], modifier: &ModifierPayload) -> Vec<usize> {
    if modifier.scope == ModifierScope::All {
        return (0..items.len()).collect();
    }

    let target = modifier.target.normalized();
    let scores: Vec<u8> = items.iter().map(|i| score_item(i, &target)).collect();
    let max = scores.iter().copied().max().unwrap_or(0);
    if max == 0 {
        return Vec::new();
    }
    scores
        .iter()
        .enumerate()
        .filter(|(_, s)| **s == max)
        .map(|(i, _)| i)
        .collect()
}

fn candidates_for(
    items: &[LineItem],
    indices: &[usize],
    modifier: &ModifierPayload,
) -> Vec<Candidate> {
    indices
        .iter()
        .map(|&index| Candidate {
            index,
            label: items[index].label(),
            qty: items[index].qty,
            modifier: Some(modifier.clone()),
        })
        .collect()
}

#[derive(Debug, Default)]
pub struct ModifierEngine;

impl ModifierEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn apply(&self, items: &[LineItem], modifier: &ModifierPayload) -> ApplyOutcome {
        if items.is_empty() {
            return ApplyOutcome::unchanged(ApplyStatus::NoMatch, items, "order has no items");
        }

        // A payload already marked ambiguous is never applied; it only
        // seeds a disambiguation question.
        if modifier.scope == ModifierScope::Ambiguous {
            let indices: Vec<usize> = (0..items.len()).collect();
            let candidates = candidates_for(items, &indices, modifier);
            return ApplyOutcome {
                status: ApplyStatus::Ambiguous,
                items: items.to_vec(),
                summary: "change needs a target choice".to_string(),
                candidates: Some(candidates),
            };
        }

        let indices = resolve_targets(items, modifier);

        if modifier.scope != ModifierScope::All {
            if indices.is_empty() {
                return ApplyOutcome::unchanged(
                    ApplyStatus::NoMatch,
                    items,
                    format!("no item matches \"{}\"", modifier.target.text.trim()),
                );
            }
            if indices.len() > 1 {
                let candidates = candidates_for(items, &indices, modifier);
                return ApplyOutcome {
                    status: ApplyStatus::Ambiguous,
                    items: items.to_vec(),
                    summary: format!("{} items match", indices.len()),
                    candidates: Some(candidates),
                };
            }
        }

        self.apply_to_indices(items, &indices, modifier)
    }

    /// Apply the change to already-resolved indices. Also used by the
    /// disambiguation path once a reply has picked one candidate.
    pub fn apply_to_indices(
        &self,
        items: &[LineItem],
        indices: &[usize],
        modifier: &ModifierPayload,
    ) -> ApplyOutcome {
        let mut updated = items.to_vec();

        match &modifier.change {
            ChangeOp::Qty { new_qty, delta } => {
                if new_qty.is_none() && delta.is_none() {
                    return ApplyOutcome::unchanged(
                        ApplyStatus::Noop,
                        items,
                        "no quantity change specified",
                    );
                }

                let mut changed = Vec::new();
                let mut removed = Vec::new();
                // Index-descending keeps positions stable during removal.
                let mut ordered: Vec<usize> = indices.to_vec();
                ordered.sort_unstable_by(|a, b| b.cmp(a));
                for &index in &ordered {
                    let current = updated[index].qty.unwrap_or(0.0);
                    // Absolute quantity takes precedence over relative.
                    let next = match (new_qty, delta) {
                        (Some(q), _) => *q,
                        (None, Some(d)) => current + d,
                        (None, None) => unreachable!(),
                    };
                    if (next - current).abs() < f64::EPSILON && updated[index].qty.is_some() {
                        continue;
                    }
                    if next <= 0.0 {
                        removed.push(updated[index].label());
                        updated.remove(index);
                    } else {
                        updated[index].qty = Some(next);
                        changed.push(updated[index].label());
                    }
                }

                if changed.is_empty() && removed.is_empty() {
                    return ApplyOutcome::unchanged(
                        ApplyStatus::Noop,
                        items,
                        "quantity already as requested",
                    );
                }
                let mut parts = Vec::new();
                if !changed.is_empty() {
                    parts.push(format!("updated {}", changed.join(", ")));
                }
                if !removed.is_empty() {
                    parts.push(format!("removed {} (quantity reached zero)", removed.join(", ")));
                }
                ApplyOutcome {
                    status: ApplyStatus::Applied,
                    items: updated,
                    summary: parts.join("; "),
                    candidates: None,
                }
            }

            ChangeOp::Variant { new_variant } => {
                let Some(variant) = new_variant.as_ref().filter(|v| !v.trim().is_empty()) else {
                    return ApplyOutcome::unchanged(
                        ApplyStatus::Noop,
                        items,
                        "no replacement variant given",
                    );
                };
                let mut labels = Vec::new();
                for &index in indices {
                    updated[index].variant = Some(variant.clone());
                    labels.push(updated[index].display_name().to_string());
                }
                ApplyOutcome {
                    status: ApplyStatus::Applied,
                    items: updated,
                    summary: format!("set {} to {variant}", labels.join(", ")),
                    candidates: None,
                }
            }

            ChangeOp::Remove => {
                if indices.is_empty() {
                    return ApplyOutcome::unchanged(ApplyStatus::Noop, items, "nothing to remove");
                }
                let mut ordered: Vec<usize> = indices.to_vec();
                ordered.sort_unstable_by(|a, b| b.cmp(a));
                let mut labels = Vec::new();
                for &index in &ordered {
                    labels.push(updated[index].label());
                    updated.remove(index);
                }
                labels.reverse();
                ApplyOutcome {
                    status: ApplyStatus::Applied,
                    items: updated,
                    summary: format!("removed {}", labels.join(", ")),
                    candidates: None,
                }
            }

            ChangeOp::Note { text } => {
                let Some(note) = text.as_ref().filter(|t| !t.trim().is_empty()) else {
                    return ApplyOutcome::unchanged(ApplyStatus::Noop, items, "no note text given");
                };
                for &index in indices {
                    // Append, never overwrite.
                    updated[index].notes = Some(match updated[index].notes.take() {
                        Some(existing) => format!("{existing}; {note}"),
                        None => note.clone(),
                    });
                }
                ApplyOutcome {
                    status: ApplyStatus::Applied,
                    items: updated,
                    summary: format!("noted: {note}"),
                    candidates: None,
                }
            }

            ChangeOp::Unsupported { raw } => ApplyOutcome::unchanged(
                ApplyStatus::Noop,
                items,
                format!("unsupported change request: \"{raw}\""),
            ),
        }
    }
}
