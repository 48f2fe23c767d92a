//! Confidence-gated classifier adapter
//!
//! Wraps an optional model-backed classifier; every failure mode
//! (missing credentials, timeout, quota, malformed output) degrades to
//! the rule-based classifier with identical output shape. A model claim
//! below the confidence floor is never acted on.

use std::sync::Arc;

use order_agent_core::{Classification, Classifier, NluError};

use crate::rules::RuleClassifier;

pub struct GatedClassifier {
    model: Option<Arc<dyn Classifier>>,
    rules: RuleClassifier,
    confidence_floor: f32,
}

impl GatedClassifier {
    pub fn new(model: Option<Arc<dyn Classifier>>, confidence_floor: f32) -> Self {
        Self {
            model,
            rules: RuleClassifier::new(),
            confidence_floor,
        }
    }

    /// Rule-only classifier, no model path wired.
    pub fn rules_only() -> Self {
        Self::new(None, 0.3)
    }

    /// Classify one message. Infallible: the rule path always answers.
    pub async fn classify(&self, text: &str) -> Classification {
        let Some(ref model) = self.model else {
            return self.rules.classify(text);
        };

        if !model.is_available().await {
            tracing::debug!("classifier backend unavailable, using rules");
            return self.rules.classify(text);
        }

        match model.classify(text).await {
            Ok(result) if result.confidence >= self.confidence_floor => {
                tracing::debug!(
                    category = %result.category,
                    confidence = result.confidence,
                    "model classification accepted"
                );
                result
            }
            Ok(result) => {
                // A low-confidence categorical claim is worth less than the
                // deterministic rules, whatever category it proposed.
                tracing::debug!(
                    category = %result.category,
                    confidence = result.confidence,
                    floor = self.confidence_floor,
                    "model classification below floor, demoting to rules"
                );
                self.rules.classify(text)
            }
            Err(NluError::Malformed { raw }) => {
                tracing::warn!(raw_payload = %raw, "malformed classifier output, using rules");
                self.rules.classify(text)
            }
            Err(err) => {
                tracing::warn!(error = %err, "classifier backend failed, using rules");
                self.rules.classify(text)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use order_agent_core::IntentCategory;

    struct FixedClassifier {
        result: Result<Classification, fn() -> NluError>,
        available: bool,
    }

    #[async_trait]
    impl Classifier for FixedClassifier {
        async fn classify(&self, _text: &str) -> Result<Classification, NluError> {
            match &self.result {
                Ok(c) => Ok(c.clone()),
                Err(make) => Err(make()),
            }
        }

        async fn is_available(&self) -> bool {
            self.available
        }
    }

    #[tokio::test]
    async fn test_no_model_uses_rules() {
        let gate = GatedClassifier::rules_only();
        let result = gate.classify("hi").await;
        assert_eq!(result.category, IntentCategory::Greeting);
    }

    #[tokio::test]
    async fn test_confident_model_wins() {
        let model: Arc<dyn Classifier> = Arc::new(FixedClassifier {
            result: Ok(Classification::new(IntentCategory::Question, 0.9)),
            available: true,
        });
        let gate = GatedClassifier::new(Some(model), 0.3);
        let result = gate.classify("2kg onion").await;
        assert_eq!(result.category, IntentCategory::Question);
    }

    #[tokio::test]
    async fn test_low_confidence_demoted_to_rules() {
        let model: Arc<dyn Classifier> = Arc::new(FixedClassifier {
            result: Ok(Classification::new(IntentCategory::Question, 0.1)),
            available: true,
        });
        let gate = GatedClassifier::new(Some(model), 0.3);
        let result = gate.classify("2kg onion").await;
        assert_eq!(result.category, IntentCategory::Order);
    }

    #[tokio::test]
    async fn test_malformed_output_falls_back() {
        let model: Arc<dyn Classifier> = Arc::new(FixedClassifier {
            result: Err(|| NluError::Malformed {
                raw: "not json".to_string(),
            }),
            available: true,
        });
        let gate = GatedClassifier::new(Some(model), 0.3);
        let result = gate.classify("remove coke").await;
        assert_eq!(result.category, IntentCategory::Modify);
    }

    #[tokio::test]
    async fn test_unavailable_backend_skipped() {
        let model: Arc<dyn Classifier> = Arc::new(FixedClassifier {
            result: Ok(Classification::new(IntentCategory::Question, 0.9)),
            available: false,
        });
        let gate = GatedClassifier::new(Some(model), 0.3);
        let result = gate.classify("hello").await;
        assert_eq!(result.category, IntentCategory::Greeting);
    }
}
