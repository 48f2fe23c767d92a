//! Catalog matching and the reconciliation gate

pub mod gate;
pub mod matcher;
pub mod store;

pub use gate::{ReconcileGate, ReconcileOutcome, VariantClarification};
pub use matcher::{CatalogMatcher, ItemMatch};
pub use store::InMemoryCatalogStore;
