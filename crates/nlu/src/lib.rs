//! NLU components for the order agent
//!
//! Features:
//! - Confidence-gated classifier adapter with a deterministic rule
//!   fallback of identical output shape
//! - Order parser pipeline (model path, list-shape lines, inline
//!   quantity extraction)
//! - Deterministic modifier-text parsing
//! - HTTP backend for the external classification/extraction service

pub mod classifier;
pub mod modifier_text;
pub mod parser;
pub mod quantity;
pub mod remote;
pub mod rules;

pub use classifier::GatedClassifier;
pub use modifier_text::parse_modifier;
pub use parser::OrderParser;
pub use remote::RemoteNlu;
pub use rules::RuleClassifier;
