//! TOML configuration for retry budgets, temperatures, HTTP, batching and
//! the run store.
//!
//! Resolution: an explicit `--config` path, else `QUORUM_CONFIG`, else
//! compiled defaults. Every section is optional.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use run_store::RunStore;
use serde::{Deserialize, Serialize};

use crate::backoff::BackoffPolicy;
use crate::batch::BatchOptions;
use crate::consensus::ConsensusSettings;
use crate::error::ConfigError;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "QUORUM_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct QuorumConfig {
    pub retry: RetryConfig,
    pub temperatures: TemperatureConfig,
    pub http: HttpConfig,
    pub batch: BatchConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub enrichment_max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 100,
            enrichment_max_attempts: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TemperatureConfig {
    pub worker: f32,
    pub judge: f32,
    pub enrichment: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub request_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: crate::batch::DEFAULT_CONCURRENCY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// `mem://`, `surrealkv://path` or `ws://host:port`.
    pub url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "mem://".to_string(),
        }
    }
}

impl QuorumConfig {
    /// Load from `path`, else from `QUORUM_CONFIG`, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path: Option<PathBuf> = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts < 1 {
            return Err(ConfigError::Invalid("retry.max_attempts must be >= 1".into()));
        }
        if self.retry.enrichment_max_attempts < 1 {
            return Err(ConfigError::Invalid(
                "retry.enrichment_max_attempts must be >= 1".into(),
            ));
        }
        if self.batch.concurrency < 1 {
            return Err(ConfigError::Invalid("batch.concurrency must be >= 1".into()));
        }
        if self.http.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "http.request_timeout_secs must be > 0".into(),
            ));
        }
        for (name, value) in [
            ("worker", self.temperatures.worker),
            ("judge", self.temperatures.judge),
            ("enrichment", self.temperatures.enrichment),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "temperatures.{name} must be within [0, 2], got {value}"
                )));
            }
        }
        Ok(())
    }

    pub fn consensus_settings(&self) -> ConsensusSettings {
        let policy = BackoffPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.base_delay_ms),
        );
        ConsensusSettings {
            worker_policy: policy,
            judge_policy: policy,
            enrichment_policy: policy.with_max_attempts(self.retry.enrichment_max_attempts),
            worker_temperature: self.temperatures.worker,
            judge_temperature: self.temperatures.judge,
            enrichment_temperature: self.temperatures.enrichment,
        }
    }

    pub fn batch_options(&self, run_store: Option<Arc<dyn RunStore>>) -> BatchOptions {
        BatchOptions {
            concurrency: self.batch.concurrency,
            run_store,
            input_label: None,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.request_timeout_secs)
    }
}
