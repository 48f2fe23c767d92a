//! Catalog reconciliation gate
//!
//! Partitions parsed items into matched/unmatched instead of blocking
//! the whole message. Unmatched items are carried for an upstream
//! warning, never silently dropped.

use order_agent_config::MatcherConfig;
use order_agent_core::{LineItem, MatchType, Product};

use crate::matcher::{CatalogMatcher, ItemMatch};

/// A needs-clarify flag raised for one matched item
#[derive(Debug, Clone)]
pub struct VariantClarification {
    /// Index into the matched item list
    pub item_index: usize,
    pub canonical: String,
    /// Variant labels, in catalog order
    pub options: Vec<String>,
}

/// Gate output
#[derive(Debug)]
pub enum ReconcileOutcome {
    /// Tenant has no catalog configured; nothing to enforce
    NoCatalog { items: Vec<LineItem> },
    /// Every parsed item failed to match; redirect to clarification
    AllUnmatched { items: Vec<LineItem> },
    /// Matched subset proceeds; unmatched subset is surfaced upstream
    Partitioned {
        matched: Vec<LineItem>,
        unmatched: Vec<LineItem>,
        clarifications: Vec<VariantClarification>,
    },
}

pub struct ReconcileGate {
    matcher: CatalogMatcher,
}

impl ReconcileGate {
    pub fn new(config: MatcherConfig) -> Self {
        Self {
            matcher: CatalogMatcher::new(config),
        }
    }

    pub fn reconcile(&self, items: Vec<LineItem>, products: &[Product]) -> ReconcileOutcome {
        if products.is_empty() {
            return ReconcileOutcome::NoCatalog { items };
        }

        let mut matched = Vec::new();
        let mut unmatched = Vec::new();
        let mut clarifications = Vec::new();

        for mut item in items {
            match self.matcher.match_item(item.display_name(), products) {
                ItemMatch::Exact(product) => {
                    enrich(&mut item, product, MatchType::CatalogExact);
                    matched.push(item);
                }
                ItemMatch::Fuzzy(product) => {
                    enrich(&mut item, product, MatchType::CatalogFuzzy);
                    matched.push(item);
                }
                ItemMatch::VariantAmbiguous { canonical, variants } => {
                    item.canonical = canonical.clone();
                    item.match_type = MatchType::CatalogFuzzy;
                    item.needs_clarify = true;
                    clarifications.push(VariantClarification {
                        item_index: matched.len(),
                        canonical,
                        options: variants.iter().map(|p| p.label()).collect(),
                    });
                    matched.push(item);
                }
                ItemMatch::None => {
                    tracing::debug!(item = %item.display_name(), "no catalog match");
                    unmatched.push(item);
                }
            }
        }

        if matched.is_empty() {
            return ReconcileOutcome::AllUnmatched { items: unmatched };
        }

        ReconcileOutcome::Partitioned {
            matched,
            unmatched,
            clarifications,
        }
    }
}

fn enrich(item: &mut LineItem, product: &Product, match_type: MatchType) {
    item.product_id = Some(product.id.clone());
    item.canonical = product.canonical.clone();
    item.match_type = match_type;
    if item.variant.is_none() {
        item.variant = product.variant.clone();
    }
    if item.unit.is_none() {
        item.unit = product.unit.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> ReconcileGate {
        ReconcileGate::new(MatcherConfig::default())
    }

    fn products() -> Vec<Product> {
        vec![
            Product::new("p1", "onion", "Onion").with_unit("kg"),
            Product::new("p2", "milk", "Milk").with_unit("l"),
            Product::new("p3", "chicken biryani", "Chicken Biryani").with_variant("spicy"),
            Product::new("p4", "chicken biryani", "Chicken Biryani").with_variant("mild"),
        ]
    }

    #[test]
    fn test_no_catalog_is_noop() {
        let items = vec![LineItem::new("onion")];
        match gate().reconcile(items, &[]) {
            ReconcileOutcome::NoCatalog { items } => assert_eq!(items.len(), 1),
            other => panic!("expected no-catalog, got {other:?}"),
        }
    }

    #[test]
    fn test_partition_keeps_unmatched_visible() {
        let items = vec![LineItem::new("onion"), LineItem::new("toothpaste")];
        match gate().reconcile(items, &products()) {
            ReconcileOutcome::Partitioned {
                matched,
                unmatched,
                clarifications,
            } => {
                assert_eq!(matched.len(), 1);
                assert_eq!(matched[0].product_id.as_deref(), Some("p1"));
                assert_eq!(matched[0].match_type, MatchType::CatalogExact);
                assert_eq!(unmatched.len(), 1);
                assert_eq!(unmatched[0].canonical, "toothpaste");
                assert!(clarifications.is_empty());
            }
            other => panic!("expected partition, got {other:?}"),
        }
    }

    #[test]
    fn test_all_unmatched() {
        let items = vec![LineItem::new("toothpaste"), LineItem::new("shampoo")];
        match gate().reconcile(items, &products()) {
            ReconcileOutcome::AllUnmatched { items } => assert_eq!(items.len(), 2),
            other => panic!("expected all-unmatched, got {other:?}"),
        }
    }

    #[test]
    fn test_variant_ambiguity_flags_needs_clarify() {
        let items = vec![LineItem::new("biryani")];
        match gate().reconcile(items, &products()) {
            ReconcileOutcome::Partitioned {
                matched,
                clarifications,
                ..
            } => {
                assert!(matched[0].needs_clarify);
                assert!(matched[0].product_id.is_none());
                assert_eq!(clarifications.len(), 1);
                assert_eq!(clarifications[0].options.len(), 2);
            }
            other => panic!("expected partition, got {other:?}"),
        }
    }

    #[test]
    fn test_enrichment_fills_unit() {
        let items = vec![LineItem::new("milk").with_qty(1.0)];
        match gate().reconcile(items, &products()) {
            ReconcileOutcome::Partitioned { matched, .. } => {
                assert_eq!(matched[0].unit.as_deref(), Some("l"));
            }
            other => panic!("expected partition, got {other:?}"),
        }
    }
}
