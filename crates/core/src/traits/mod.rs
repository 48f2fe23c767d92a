//! Traits for pluggable collaborators and stores

pub mod nlu;
pub mod store;

pub use nlu::{Classifier, OrderExtractor};
pub use store::{CatalogStore, OrderStore, SessionStore};
