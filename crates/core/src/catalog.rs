//! Catalog product types

use serde::{Deserialize, Serialize};

/// One product row from the tenant's catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    /// Normalized identity used for matching
    pub canonical: String,
    /// Name shown to customers
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl Product {
    pub fn new(
        id: impl Into<String>,
        canonical: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            canonical: canonical.into().to_lowercase(),
            display_name: display_name.into(),
            variant: None,
            unit: None,
        }
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Label for variant clarification questions.
    pub fn label(&self) -> String {
        match &self.variant {
            Some(v) => format!("{} ({})", self.display_name, v),
            None => self.display_name.clone(),
        }
    }
}
