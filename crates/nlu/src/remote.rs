//! Remote NLU backend
//!
//! HTTP client for the external classification/extraction service. The
//! service is a black box; this adapter only shapes requests, validates
//! response shape and maps failures onto `NluError` so the gated
//! callers can degrade deterministically.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use order_agent_config::NluBackendConfig;
use order_agent_core::{
    Classification, ClassifierHints, IntentCategory, LineItem, NluError, ParseSource, ParsedOrder,
    Product,
};

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    model: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    category: IntentCategory,
    confidence: f32,
    #[serde(default)]
    hints: ClassifierHints,
}

#[derive(Debug, Serialize)]
struct ExtractRequest<'a> {
    model: &'a str,
    text: &'a str,
    catalog_sample: Vec<CatalogEntry<'a>>,
}

#[derive(Debug, Serialize)]
struct CatalogEntry<'a> {
    canonical: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    variant: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct WireItem {
    name: String,
    #[serde(default)]
    canonical: Option<String>,
    #[serde(default)]
    qty: Option<f64>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    brand: Option<String>,
    #[serde(default)]
    variant: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    items: Vec<WireItem>,
    is_order_like: bool,
    #[serde(default)]
    confidence: Option<f32>,
}

/// HTTP-backed classifier and extractor
#[derive(Clone)]
pub struct RemoteNlu {
    client: Client,
    config: NluBackendConfig,
}

impl RemoteNlu {
    /// Build from settings. Returns `None` when no API key is configured:
    /// the caller then never attempts a network call.
    pub fn from_config(config: &NluBackendConfig) -> Option<Self> {
        config.api_key.as_ref()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .ok()?;

        Some(Self {
            client,
            config: config.clone(),
        })
    }

    async fn post_json<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, NluError> {
        let url = format!("{}{}", self.config.endpoint.trim_end_matches('/'), path);
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(NluError::MissingCredentials)?;

        let mut backoff = Duration::from_millis(100);
        let mut last_err = NluError::Unavailable("no attempt made".to_string());

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }

            let response = self
                .client
                .post(&url)
                .bearer_auth(api_key)
                .json(body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(err) if err.is_timeout() => {
                    last_err = NluError::Timeout;
                    continue;
                }
                Err(err) => {
                    last_err = NluError::Unavailable(err.to_string());
                    continue;
                }
            };

            match response.status() {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    return Err(NluError::MissingCredentials);
                }
                StatusCode::TOO_MANY_REQUESTS | StatusCode::PAYMENT_REQUIRED => {
                    // Cost-guard rejection, same handling as unavailable
                    return Err(NluError::BudgetExhausted);
                }
                status if !status.is_success() => {
                    last_err = NluError::Unavailable(format!("status {status}"));
                    continue;
                }
                _ => {}
            }

            let raw = response
                .text()
                .await
                .map_err(|e| NluError::Unavailable(e.to_string()))?;
            return serde_json::from_str(&raw).map_err(|_| NluError::Malformed { raw });
        }

        Err(last_err)
    }
}

#[async_trait::async_trait]
impl order_agent_core::Classifier for RemoteNlu {
    async fn classify(&self, text: &str) -> Result<Classification, NluError> {
        let request = ClassifyRequest {
            model: &self.config.model,
            text,
        };
        let response: ClassifyResponse = self.post_json("/v1/classify", &request).await?;

        if !(0.0..=1.0).contains(&response.confidence) {
            return Err(NluError::Malformed {
                raw: format!("confidence out of range: {}", response.confidence),
            });
        }

        Ok(Classification {
            category: response.category,
            confidence: response.confidence,
            hints: response.hints,
        })
    }

    async fn is_available(&self) -> bool {
        let url = format!(
            "{}/v1/health",
            self.config.endpoint.trim_end_matches('/')
        );
        match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(2))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[async_trait::async_trait]
impl order_agent_core::OrderExtractor for RemoteNlu {
    async fn extract(
        &self,
        text: &str,
        catalog_sample: &[Product],
    ) -> Result<Option<ParsedOrder>, NluError> {
        let request = ExtractRequest {
            model: &self.config.model,
            text,
            catalog_sample: catalog_sample
                .iter()
                .map(|p| CatalogEntry {
                    canonical: &p.canonical,
                    variant: p.variant.as_deref(),
                    unit: p.unit.as_deref(),
                })
                .collect(),
        };

        let response: Option<ExtractResponse> = self.post_json("/v1/extract", &request).await?;
        let Some(response) = response else {
            return Ok(None);
        };

        // Shape validation: an item without a name is a malformed payload,
        // not something to default around.
        if response.items.iter().any(|i| i.name.trim().is_empty()) {
            return Err(NluError::Malformed {
                raw: "extractor item with empty name".to_string(),
            });
        }

        let items = response
            .items
            .into_iter()
            .map(|wire| {
                let mut item = LineItem::new(wire.name);
                if let Some(canonical) = wire.canonical {
                    item.canonical = canonical.to_lowercase();
                }
                item.qty = wire.qty;
                item.unit = wire.unit;
                item.brand = wire.brand;
                item.variant = wire.variant;
                item.notes = wire.notes;
                item
            })
            .collect();

        Ok(Some(ParsedOrder {
            items,
            is_order_like: response.is_order_like,
            confidence: response.confidence,
            source: ParseSource::ModelExtraction,
        }))
    }

    async fn is_available(&self) -> bool {
        order_agent_core::Classifier::is_available(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_api_key_means_no_backend() {
        let config = NluBackendConfig::default();
        assert!(config.api_key.is_none());
        assert!(RemoteNlu::from_config(&config).is_none());
    }

    #[test]
    fn test_backend_built_with_key() {
        let config = NluBackendConfig {
            api_key: Some("secret".to_string()),
            ..NluBackendConfig::default()
        };
        assert!(RemoteNlu::from_config(&config).is_some());
    }

    #[test]
    fn test_classify_response_shape() {
        let raw = r#"{"category":"order","confidence":0.92,"hints":{"has_quantity":true}}"#;
        let parsed: ClassifyResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.category, IntentCategory::Order);
        assert!(parsed.hints.has_quantity);
    }
}
