//! External NLU collaborator traits
//!
//! Both collaborators are black boxes: any error means "use the
//! deterministic path instead". The caller enforces its own timeout
//! around these calls.

use async_trait::async_trait;

use crate::catalog::Product;
use crate::classify::{Classification, ParsedOrder};
use crate::error::NluError;

/// Text classification service
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify one inbound message.
    async fn classify(&self, text: &str) -> Result<Classification, NluError>;

    /// Cheap availability probe (credentials present, endpoint reachable).
    async fn is_available(&self) -> bool;
}

/// Structured order extraction service
#[async_trait]
pub trait OrderExtractor: Send + Sync {
    /// Extract line items from free text. `Ok(None)` means the service
    /// declined ("use the deterministic parser"), same as an error.
    async fn extract(
        &self,
        text: &str,
        catalog_sample: &[Product],
    ) -> Result<Option<ParsedOrder>, NluError>;

    async fn is_available(&self) -> bool;
}
