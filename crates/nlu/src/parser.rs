//! Order parser pipeline
//!
//! Strategy order:
//! 1. list shape (≥2 non-greeting lines): deterministic per-line
//!    extraction, trusted over any model output;
//! 2. model-based structured extraction, when a backend is wired;
//! 3. single-line inline quantity fallback (comma/"and" segments);
//! 4. nothing usable → not an order, handed back to intent routing.
//!
//! Sub-parse failures never block the message; the pipeline always
//! degrades to the next strategy.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use order_agent_core::{OrderExtractor, ParseSource, ParsedOrder, Product};

use crate::quantity;
use crate::rules;

static SEGMENT_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s*(?:,|;|\band\b)\s*").unwrap());

pub struct OrderParser {
    extractor: Option<Arc<dyn OrderExtractor>>,
}

impl OrderParser {
    pub fn new(extractor: Option<Arc<dyn OrderExtractor>>) -> Self {
        Self { extractor }
    }

    /// Deterministic-only pipeline, no model path.
    pub fn deterministic() -> Self {
        Self::new(None)
    }

    pub async fn parse(&self, text: &str, catalog_sample: &[Product]) -> ParsedOrder {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return ParsedOrder::not_order();
        }

        // List shape is a strong enough signal that deterministic
        // parsing wins over the model result.
        if rules::has_list_shape(trimmed) {
            let parsed = self.parse_list_lines(trimmed);
            if parsed.usable() {
                return parsed;
            }
        }

        if let Some(ref extractor) = self.extractor {
            if extractor.is_available().await {
                match extractor.extract(trimmed, catalog_sample).await {
                    Ok(Some(parsed)) if parsed.usable() => {
                        tracing::debug!(items = parsed.items.len(), "model extraction used");
                        return parsed;
                    }
                    Ok(_) => {
                        tracing::debug!("model extraction empty, degrading to inline parse");
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "model extraction failed, degrading");
                    }
                }
            }
        }

        let parsed = self.parse_inline(trimmed);
        if parsed.usable() {
            return parsed;
        }

        ParsedOrder::not_order()
    }

    /// Per-line extraction over list-shaped text. Greeting and command
    /// lines (a "new order" header, say) carry no items and are skipped.
    fn parse_list_lines(&self, text: &str) -> ParsedOrder {
        let items: Vec<_> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !rules::is_greeting_line(l) && !rules::is_command_line(l))
            .filter_map(quantity::extract_line_item)
            .collect();

        if items.is_empty() {
            return ParsedOrder::not_order();
        }
        ParsedOrder {
            items,
            is_order_like: true,
            confidence: None,
            source: ParseSource::ListLines,
        }
    }

    /// Comma/"and"-separated segments of a single line.
    fn parse_inline(&self, text: &str) -> ParsedOrder {
        let items: Vec<_> = SEGMENT_SPLIT
            .split(text)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(quantity::extract_line_item)
            .filter(|item| item.qty.is_some())
            .collect();

        if items.is_empty() {
            return ParsedOrder::not_order();
        }
        ParsedOrder {
            items,
            is_order_like: true,
            confidence: None,
            source: ParseSource::InlineQuantity,
        }
    }
}
