//! Token-overlap catalog matching
//!
//! The thresholds are asymmetric: a two-word query overlapping on only
//! one generic token ("rice" matching many products) is a weak signal,
//! while a single distinctive word is not. Both thresholds are tunable
//! via `MatcherConfig`.

use std::collections::HashSet;

use unicode_segmentation::UnicodeSegmentation;

use order_agent_config::MatcherConfig;
use order_agent_core::Product;

/// Outcome of matching one query against the catalog
#[derive(Debug)]
pub enum ItemMatch<'a> {
    /// Canonical name equals the query exactly
    Exact(&'a Product),
    /// Best token-overlap hit
    Fuzzy(&'a Product),
    /// The canonical has multiple variants and the text picked none
    VariantAmbiguous {
        canonical: String,
        variants: Vec<&'a Product>,
    },
    None,
}

fn tokenize(text: &str) -> HashSet<String> {
    text.unicode_words().map(|w| w.to_lowercase()).collect()
}

pub struct CatalogMatcher {
    config: MatcherConfig,
}

impl CatalogMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    /// Match one item query against the product list.
    pub fn match_item<'a>(&self, query: &str, products: &'a [Product]) -> ItemMatch<'a> {
        let normalized = query.trim().to_lowercase();
        if normalized.is_empty() || products.is_empty() {
            return ItemMatch::None;
        }

        let query_tokens = tokenize(&normalized);
        let min_overlap = if query_tokens.len() >= 2 {
            self.config.multi_token_min_overlap
        } else {
            self.config.single_token_min_overlap
        };

        let mut best: Option<(&Product, usize, bool)> = None;
        for product in products {
            let exact = product.canonical == normalized;
            let product_tokens = tokenize(&format!(
                "{} {} {}",
                product.canonical,
                product.display_name,
                product.variant.as_deref().unwrap_or("")
            ));
            let overlap = query_tokens.intersection(&product_tokens).count();

            if !exact && overlap < min_overlap {
                continue;
            }
            let score = if exact { usize::MAX } else { overlap };
            match best {
                Some((_, best_score, _)) if score <= best_score => {}
                _ => best = Some((product, score, exact)),
            }
        }

        let Some((product, _, exact)) = best else {
            return ItemMatch::None;
        };

        // Multiple catalog variants of the winning canonical and no
        // variant term in the query means the text did not disambiguate.
        let variants: Vec<&Product> = products
            .iter()
            .filter(|p| p.canonical == product.canonical)
            .collect();
        if variants.len() >= 2 {
            let mentions_variant = variants.iter().any(|p| {
                p.variant
                    .as_deref()
                    .map(|v| tokenize(v).iter().any(|t| query_tokens.contains(t)))
                    .unwrap_or(false)
            });
            if !mentions_variant {
                return ItemMatch::VariantAmbiguous {
                    canonical: product.canonical.clone(),
                    variants,
                };
            }
            // Pick the variant the text mentioned.
            if let Some(picked) = variants.iter().find(|p| {
                p.variant
                    .as_deref()
                    .map(|v| tokenize(v).iter().any(|t| query_tokens.contains(t)))
                    .unwrap_or(false)
            }) {
                return if exact {
                    ItemMatch::Exact(picked)
                } else {
                    ItemMatch::Fuzzy(picked)
                };
            }
        }

        if exact {
            ItemMatch::Exact(product)
        } else {
            ItemMatch::Fuzzy(product)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn products() -> Vec<Product> {
        vec![
            Product::new("p1", "basmati rice", "Basmati Rice"),
            Product::new("p2", "onion", "Onion"),
            Product::new("p3", "chicken biryani", "Chicken Biryani").with_variant("spicy"),
            Product::new("p4", "chicken biryani", "Chicken Biryani").with_variant("mild"),
        ]
    }

    fn matcher() -> CatalogMatcher {
        CatalogMatcher::new(MatcherConfig::default())
    }

    #[test]
    fn test_exact_match() {
        let products = products();
        match matcher().match_item("onion", &products) {
            ItemMatch::Exact(p) => assert_eq!(p.id, "p2"),
            other => panic!("expected exact, got {other:?}"),
        }
    }

    #[test]
    fn test_single_word_fuzzy() {
        // One distinctive word overlapping one token is accepted.
        let products = vec![Product::new("p1", "basmati rice", "Basmati Rice")];
        match matcher().match_item("basmati", &products) {
            ItemMatch::Fuzzy(p) => assert_eq!(p.id, "p1"),
            other => panic!("expected fuzzy, got {other:?}"),
        }
    }

    #[test]
    fn test_multi_word_needs_two_tokens() {
        // "steamed rice" overlaps "basmati rice" on one generic token
        // only, below the two-token requirement for multi-word queries.
        let products = vec![Product::new("p1", "basmati rice", "Basmati Rice")];
        assert!(matches!(
            matcher().match_item("steamed rice", &products),
            ItemMatch::None
        ));
        assert!(matches!(
            matcher().match_item("basmati rice", &products),
            ItemMatch::Exact(_)
        ));
    }

    #[test]
    fn test_variant_ambiguity() {
        let products = products();
        match matcher().match_item("biryani", &products) {
            ItemMatch::VariantAmbiguous { canonical, variants } => {
                assert_eq!(canonical, "chicken biryani");
                assert_eq!(variants.len(), 2);
            }
            other => panic!("expected variant ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn test_variant_term_disambiguates() {
        let products = products();
        match matcher().match_item("spicy biryani", &products) {
            ItemMatch::Fuzzy(p) => assert_eq!(p.id, "p3"),
            other => panic!("expected spicy variant, got {other:?}"),
        }
    }

    #[test]
    fn test_no_match() {
        let products = products();
        assert!(matches!(
            matcher().match_item("toothpaste", &products),
            ItemMatch::None
        ));
    }
}
