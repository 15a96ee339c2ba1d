//! Settings for the query pipeline and server
//!
//! Every knob has a default; files and environment variables override.
//! Nested keys use `__` in the environment, e.g.
//! `CLIMATE_AGENT_PIPELINE__FUZZY_THRESHOLD=0.95`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Top-level settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub pipeline: PipelineConfig,
    pub backend: BackendConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_enabled: bool,
    pub cors_origins: Vec<String>,
    /// Optional JSON corpus indexed into the in-memory vector index at
    /// startup
    pub corpus_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_enabled: true,
            cors_origins: Vec::new(),
            corpus_path: None,
        }
    }
}

/// Query pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Cache entry time-to-live in seconds
    pub cache_ttl_seconds: u64,
    /// Bound on the recent-query index
    pub recent_list_size: usize,
    /// How many recent entries the fuzzy matcher scans
    pub fuzzy_scan_window: usize,
    /// Jaccard similarity required for a fuzzy cache hit
    pub fuzzy_threshold: f32,
    /// Candidates fetched from the vector index
    pub retriever_top_k: usize,
    /// Documents kept after reranking
    pub retriever_final_n: usize,
    /// Score at or above which an answer counts as faithful
    pub faithfulness_threshold: f32,
    /// Score below which an answer is rejected; scores between the floor
    /// and the threshold are returned with a warning
    pub faithfulness_degraded_floor: f32,
    /// Whole-request deadline in milliseconds
    pub request_deadline_ms: u64,
    /// Enable the generator's inner response cache
    pub generator_cache_enabled: bool,
    /// Maximum conversation-history messages accepted per request
    pub max_history_messages: usize,
    /// Per-stage wall-clock budgets
    pub stages: StageBudgets,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: 3600,
            recent_list_size: 100,
            fuzzy_scan_window: 50,
            fuzzy_threshold: 0.92,
            retriever_top_k: 20,
            retriever_final_n: 6,
            faithfulness_threshold: 0.7,
            faithfulness_degraded_floor: 0.4,
            request_deadline_ms: 60_000,
            generator_cache_enabled: true,
            max_history_messages: 50,
            stages: StageBudgets::default(),
        }
    }
}

impl PipelineConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn request_deadline(&self) -> Duration {
        Duration::from_millis(self.request_deadline_ms)
    }
}

/// Per-stage wall-clock budgets in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StageBudgets {
    pub route_ms: u64,
    pub translate_in_ms: u64,
    pub classify_ms: u64,
    pub cache_lookup_ms: u64,
    pub retrieve_ms: u64,
    pub generate_ms: u64,
    pub faithfulness_ms: u64,
    pub translate_out_ms: u64,
    pub cache_write_ms: u64,
}

impl Default for StageBudgets {
    fn default() -> Self {
        Self {
            route_ms: 100,
            translate_in_ms: 5_000,
            classify_ms: 10_000,
            cache_lookup_ms: 200,
            retrieve_ms: 15_000,
            generate_ms: 20_000,
            faithfulness_ms: 5_000,
            translate_out_ms: 10_000,
            cache_write_ms: 500,
        }
    }
}

/// Settings for the bundled HTTP chat backends
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub primary: BackendEndpoint,
    pub secondary: BackendEndpoint,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            primary: BackendEndpoint {
                model: "llama3.1:8b-instruct-q4_K_M".to_string(),
                ..BackendEndpoint::default()
            },
            secondary: BackendEndpoint {
                model: "aya-expanse:8b".to_string(),
                ..BackendEndpoint::default()
            },
        }
    }
}

/// One chat-completions endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendEndpoint {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: usize,
    pub timeout_secs: u64,
}

impl Default for BackendEndpoint {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: String::new(),
            api_key: None,
            temperature: 0.1,
            max_tokens: 1024,
            timeout_secs: 30,
        }
    }
}

/// Load settings from an optional file plus the environment.
///
/// A missing file is fine when `path` is `None`; an explicitly named file
/// that cannot be read is an error.
pub fn load_settings(path: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        if !std::path::Path::new(path).exists() {
            return Err(ConfigError::FileNotFound(path.to_string()));
        }
        builder = builder.add_source(config::File::with_name(path));
    } else {
        builder = builder.add_source(config::File::with_name("climate-agent").required(false));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("CLIMATE_AGENT")
            .separator("__")
            .try_parsing(true),
    );

    let settings: Settings = builder.build()?.try_deserialize()?;
    validate(&settings)?;
    tracing::debug!(file = ?path, "settings loaded");
    Ok(settings)
}

fn validate(settings: &Settings) -> Result<(), ConfigError> {
    let p = &settings.pipeline;
    if !(0.0..=1.0).contains(&p.fuzzy_threshold) {
        return Err(ConfigError::InvalidValue {
            field: "pipeline.fuzzy_threshold".to_string(),
            message: "must be within [0, 1]".to_string(),
        });
    }
    if p.faithfulness_degraded_floor > p.faithfulness_threshold {
        return Err(ConfigError::InvalidValue {
            field: "pipeline.faithfulness_degraded_floor".to_string(),
            message: "must not exceed faithfulness_threshold".to_string(),
        });
    }
    if p.retriever_final_n > p.retriever_top_k {
        return Err(ConfigError::InvalidValue {
            field: "pipeline.retriever_final_n".to_string(),
            message: "must not exceed retriever_top_k".to_string(),
        });
    }
    if p.request_deadline_ms == 0 {
        return Err(ConfigError::InvalidValue {
            field: "pipeline.request_deadline_ms".to_string(),
            message: "must be positive".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_values() {
        let settings = Settings::default();
        assert_eq!(settings.pipeline.cache_ttl_seconds, 3600);
        assert_eq!(settings.pipeline.recent_list_size, 100);
        assert_eq!(settings.pipeline.fuzzy_threshold, 0.92);
        assert_eq!(settings.pipeline.retriever_top_k, 20);
        assert_eq!(settings.pipeline.retriever_final_n, 6);
        assert_eq!(settings.pipeline.faithfulness_threshold, 0.7);
        assert_eq!(settings.pipeline.faithfulness_degraded_floor, 0.4);
        assert_eq!(settings.pipeline.request_deadline_ms, 60_000);
        assert_eq!(settings.pipeline.stages.generate_ms, 20_000);
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        let doc = toml::toml! {
            [pipeline]
            fuzzy_threshold = 0.95
            retriever_final_n = 4
        };
        file.write_all(toml::to_string(&doc).unwrap().as_bytes()).unwrap();

        let settings = load_settings(Some(file.path().to_str().unwrap())).unwrap();
        assert_eq!(settings.pipeline.fuzzy_threshold, 0.95);
        assert_eq!(settings.pipeline.retriever_final_n, 4);
        // Untouched keys keep defaults
        assert_eq!(settings.pipeline.cache_ttl_seconds, 3600);
    }

    #[test]
    fn test_load_missing_named_file_errors() {
        let err = load_settings(Some("/nonexistent/settings.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_yaml_settings_parse() {
        let yaml = r#"
pipeline:
  fuzzy_threshold: 0.9
server:
  port: 9000
"#;
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.pipeline.fuzzy_threshold, 0.9);
        assert_eq!(settings.server.port, 9000);
    }

    #[test]
    fn test_validation_rejects_inverted_floors() {
        let mut settings = Settings::default();
        settings.pipeline.faithfulness_degraded_floor = 0.8;
        assert!(validate(&settings).is_err());
    }

    #[test]
    fn test_validation_rejects_bad_fuzzy_threshold() {
        let mut settings = Settings::default();
        settings.pipeline.fuzzy_threshold = 1.5;
        assert!(validate(&settings).is_err());
    }
}
