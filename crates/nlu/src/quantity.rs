//! Quantity/unit extraction
//!
//! Compiled regex patterns, built once at startup and reused for every
//! extraction. These never fabricate an item: extraction only succeeds
//! on text that actually carries a name, with or without a quantity.

use once_cell::sync::Lazy;
use regex::Regex;

use order_agent_core::LineItem;

const UNIT_PATTERN: &str =
    "kg|kgs|g|gm|gms|grams?|l|ltr|litre|liter|ml|dozen|doz|pcs?|pieces?|packets?|pkt|packs?|box|boxes|bottles?";

/// Leading quantity: "2kg onion", "1.5 l milk", "2 onion"
static LEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)^(\d+(?:\.\d+)?)\s*({UNIT_PATTERN})?\.?\s+(?:of\s+)?(.+)$"
    ))
    .unwrap()
});

/// Compact leading quantity with no space: "2kg onion" also matches above,
/// "1L milk" needs the unit glued to the number.
static LEADING_COMPACT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)^(\d+(?:\.\d+)?)({UNIT_PATTERN})\s+(?:of\s+)?(.+)$")).unwrap()
});

/// Trailing quantity: "onion 2kg", "milk 1 litre"
static TRAILING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)^(.+?)\s+(\d+(?:\.\d+)?)\s*({UNIT_PATTERN})?\.?$"
    ))
    .unwrap()
});

/// Multiplicative: "coke x2", "2 x coke"
static MULT_TRAILING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(.+?)\s*[x*]\s*(\d+(?:\.\d+)?)$").unwrap());
static MULT_LEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\d+(?:\.\d+)?)\s*[x*]\s*(.+)$").unwrap());

/// Any quantity+unit shape anywhere in the text (classification hint)
static ANY_QTY_UNIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b\d+(?:\.\d+)?\s*({UNIT_PATTERN})\b|(?i)\b\d+\s*[x*]\s*\w|\w\s*[x*]\s*\d+\b"
    ))
    .unwrap()
});

/// List bullet/number prefixes: "- 2kg onion", "1. coke", "* milk"
static BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s+").unwrap());

/// Normalize unit spellings to a short canonical form.
pub fn normalize_unit(raw: &str) -> String {
    match raw.to_lowercase().as_str() {
        "kg" | "kgs" => "kg".to_string(),
        "g" | "gm" | "gms" | "gram" | "grams" => "g".to_string(),
        "l" | "ltr" | "litre" | "liter" => "l".to_string(),
        "ml" => "ml".to_string(),
        "dozen" | "doz" => "dozen".to_string(),
        "pc" | "pcs" | "piece" | "pieces" => "pc".to_string(),
        "packet" | "packets" | "pkt" | "pack" | "packs" => "packet".to_string(),
        "box" | "boxes" => "box".to_string(),
        "bottle" | "bottles" => "bottle".to_string(),
        other => other.to_string(),
    }
}

/// Does the text carry any quantity+unit or multiplicative pattern?
pub fn has_quantity(text: &str) -> bool {
    ANY_QTY_UNIT.is_match(text)
}

/// Strip list bullets and surrounding punctuation off one line.
pub fn strip_bullet(line: &str) -> &str {
    match BULLET.find(line) {
        Some(m) => line[m.end()..].trim(),
        None => line.trim(),
    }
}

fn clean_name(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c: char| c == ',' || c == '.' || c == ';')
        .trim()
        .to_string()
}

fn build_item(name: &str, qty: f64, unit: Option<&str>) -> Option<LineItem> {
    let name = clean_name(name);
    if name.is_empty() || name.chars().all(|c| !c.is_alphabetic()) {
        return None;
    }
    let mut item = LineItem::new(name).with_qty(qty);
    if let Some(unit) = unit {
        item.unit = Some(normalize_unit(unit));
    }
    Some(item)
}

/// Extract one line item from a single line or comma segment.
///
/// Quantity-bearing shapes are tried first; a bare product name still
/// yields an item with no quantity (the text names it, so it exists).
pub fn extract_line_item(line: &str) -> Option<LineItem> {
    let line = strip_bullet(line);
    if line.is_empty() {
        return None;
    }

    if let Some(caps) = LEADING_COMPACT.captures(line) {
        let qty: f64 = caps[1].parse().ok()?;
        return build_item(&caps[3], qty, Some(&caps[2]));
    }

    if let Some(caps) = LEADING.captures(line) {
        let qty: f64 = caps[1].parse().ok()?;
        let unit = caps.get(2).map(|m| m.as_str());
        return build_item(&caps[3], qty, unit);
    }

    if let Some(caps) = MULT_TRAILING.captures(line) {
        let qty: f64 = caps[2].parse().ok()?;
        return build_item(&caps[1], qty, None);
    }

    if let Some(caps) = MULT_LEADING.captures(line) {
        let qty: f64 = caps[1].parse().ok()?;
        return build_item(&caps[2], qty, None);
    }

    if let Some(caps) = TRAILING.captures(line) {
        let qty: f64 = caps[2].parse().ok()?;
        let unit = caps.get(3).map(|m| m.as_str());
        return build_item(&caps[1], qty, unit);
    }

    // Bare name, no quantity
    let name = clean_name(line);
    if name.is_empty() || !name.chars().any(|c| c.is_alphabetic()) {
        return None;
    }
    Some(LineItem::new(name))
}
