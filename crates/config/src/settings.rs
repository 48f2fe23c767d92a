//! Engine settings
//!
//! Loaded from an optional TOML file plus `ORDER_AGENT_` environment
//! overrides. Every field has a serde default so an empty configuration
//! is fully usable.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Append-vs-new linking decision settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkingConfig {
    /// Messages within this window may append to the customer's open order
    #[serde(default = "default_merge_window")]
    pub merge_window_minutes: i64,
}

fn default_merge_window() -> i64 {
    120
}

impl Default for LinkingConfig {
    fn default() -> Self {
        Self {
            merge_window_minutes: default_merge_window(),
        }
    }
}

/// Classifier gating settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Model confidence below this floor is treated as unknown
    #[serde(default = "default_confidence_floor")]
    pub confidence_floor: f32,
}

fn default_confidence_floor() -> f32 {
    0.3
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            confidence_floor: default_confidence_floor(),
        }
    }
}

/// Catalog token-overlap thresholds.
///
/// The asymmetry is deliberate: one generic token overlapping out of a
/// two-word query is a weak signal, a single distinctive word is not.
/// Tunable, not a guaranteed-correct algorithm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    #[serde(default = "default_multi_token_overlap")]
    pub multi_token_min_overlap: usize,
    #[serde(default = "default_single_token_overlap")]
    pub single_token_min_overlap: usize,
}

fn default_multi_token_overlap() -> usize {
    2
}

fn default_single_token_overlap() -> usize {
    1
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            multi_token_min_overlap: default_multi_token_overlap(),
            single_token_min_overlap: default_single_token_overlap(),
        }
    }
}

/// Disambiguation session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisambiguationConfig {
    /// Pending questions older than this are expired and ignored
    #[serde(default = "default_disambig_expiry")]
    pub expiry_minutes: i64,
}

fn default_disambig_expiry() -> i64 {
    1440
}

impl Default for DisambiguationConfig {
    fn default() -> Self {
        Self {
            expiry_minutes: default_disambig_expiry(),
        }
    }
}

/// Delivery address collection settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AddressConfig {
    /// Ask for a delivery address once items are settled. Off by
    /// default; tenants that deliver enable it.
    #[serde(default)]
    pub required: bool,
}

/// Remote NLU backend settings. Without an API key the engine never
/// attempts a network call and runs fully on the deterministic path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NluBackendConfig {
    #[serde(default = "default_nlu_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_nlu_model")]
    pub model: String,
    #[serde(default = "default_nlu_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_nlu_retries")]
    pub max_retries: u32,
}

fn default_nlu_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_nlu_model() -> String {
    "qwen2.5:7b-instruct-q4_K_M".to_string()
}

fn default_nlu_timeout() -> u64 {
    15
}

fn default_nlu_retries() -> u32 {
    2
}

impl Default for NluBackendConfig {
    fn default() -> Self {
        Self {
            endpoint: default_nlu_endpoint(),
            api_key: None,
            model: default_nlu_model(),
            timeout_secs: default_nlu_timeout(),
            max_retries: default_nlu_retries(),
        }
    }
}

/// Top-level engine settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default)]
    pub linking: LinkingConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub matcher: MatcherConfig,
    #[serde(default)]
    pub disambiguation: DisambiguationConfig,
    #[serde(default)]
    pub address: AddressConfig,
    #[serde(default)]
    pub nlu: NluBackendConfig,
}

/// Load settings from an optional file and `ORDER_AGENT_` env overrides.
///
/// Nested keys use `__` in the environment,
/// e.g. `ORDER_AGENT_LINKING__MERGE_WINDOW_MINUTES=60`.
pub fn load_settings(path: Option<&str>) -> Result<EngineSettings, ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(config::File::with_name(path).required(false));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("ORDER_AGENT")
            .separator("__")
            .try_parsing(true),
    );

    let settings: EngineSettings = builder.build()?.try_deserialize()?;

    if settings.classifier.confidence_floor < 0.0 || settings.classifier.confidence_floor > 1.0 {
        return Err(ConfigError::InvalidValue {
            field: "classifier.confidence_floor".to_string(),
            message: "must be within [0.0, 1.0]".to_string(),
        });
    }
    if settings.linking.merge_window_minutes <= 0 {
        return Err(ConfigError::InvalidValue {
            field: "linking.merge_window_minutes".to_string(),
            message: "must be positive".to_string(),
        });
    }

    tracing::debug!(
        merge_window = settings.linking.merge_window_minutes,
        confidence_floor = settings.classifier.confidence_floor,
        "settings loaded"
    );

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = EngineSettings::default();
        assert_eq!(settings.linking.merge_window_minutes, 120);
        assert_eq!(settings.matcher.multi_token_min_overlap, 2);
        assert_eq!(settings.matcher.single_token_min_overlap, 1);
        assert!(!settings.address.required);
        assert!(settings.nlu.api_key.is_none());
    }

    #[test]
    fn test_empty_config_deserializes() {
        let settings: EngineSettings = serde_json::from_str("{}").unwrap();
        assert!((settings.classifier.confidence_floor - 0.3).abs() < f32::EPSILON);
        assert_eq!(settings.disambiguation.expiry_minutes, 1440);
    }

    #[test]
    fn test_load_without_file() {
        let settings = load_settings(None).unwrap();
        assert_eq!(settings.linking.merge_window_minutes, 120);
    }
}
