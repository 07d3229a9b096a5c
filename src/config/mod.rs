//! Configuration loading and validation.
//!
//! Configuration comes from a YAML file (with environment variable
//! interpolation) and can be overridden from the command line.

mod vars;

use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::path::Path;
use std::time::Duration;

use crate::error::{
    ConfigError, EmptyQueueUrlSnafu, EnvInterpolationSnafu, InvalidMaxMessagesSnafu,
    InvalidWaitTimeSnafu, ReadFileSnafu, YamlParseSnafu, ZeroMaxFetchesSnafu,
};

/// Largest batch the queue hands out per receive.
pub const MAX_RECEIVE_MESSAGES: i32 = 10;
/// Longest long-poll wait the queue accepts.
pub const MAX_WAIT_TIME_SECS: i32 = 20;

/// Main configuration structure for a redrive run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// URL of the dead-letter queue to drain.
    #[serde(default)]
    pub queue_url: String,
    #[serde(default)]
    pub aws: AwsConfig,
    #[serde(default)]
    pub receive: ReceiveConfig,
    #[serde(default)]
    pub replay: ReplayConfig,
    /// What to do when one message cannot be redriven.
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    /// Metrics configuration (optional, disabled by default).
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// AWS client settings. Anything unset falls back to the default provider chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AwsConfig {
    #[serde(default)]
    pub region: Option<String>,
    /// Custom endpoint, e.g. a local emulator.
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

/// Queue receive settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveConfig {
    /// Messages per receive call (default: 10).
    #[serde(default = "default_max_messages")]
    pub max_messages: i32,
    /// Long-poll wait in seconds (default: 20).
    #[serde(default = "default_wait_time_secs")]
    pub wait_time_secs: i32,
}

impl Default for ReceiveConfig {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
            wait_time_secs: default_wait_time_secs(),
        }
    }
}

impl ReceiveConfig {
    pub fn wait_time(&self) -> Duration {
        Duration::from_secs(self.wait_time_secs.max(0) as u64)
    }
}

fn default_max_messages() -> i32 {
    MAX_RECEIVE_MESSAGES
}

fn default_wait_time_secs() -> i32 {
    MAX_WAIT_TIME_SECS
}

/// Stream replay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Upper bound on record fetches while searching one range (default: 100).
    #[serde(default = "default_max_fetches")]
    pub max_fetches: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            max_fetches: default_max_fetches(),
        }
    }
}

fn default_max_fetches() -> usize {
    100
}

/// Behavior when a single message fails to redrive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort the whole run on the first failure; nothing in that batch is deleted.
    #[default]
    FailFast,
    /// Leave the failed message on the queue and keep going.
    SkipAndContinue,
}

/// Metrics configuration for the Prometheus endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Whether to serve metrics (default: false).
    #[serde(default)]
    pub enabled: bool,
    /// Address to bind the metrics HTTP server (default: "0.0.0.0:9090").
    #[serde(default = "default_metrics_address")]
    pub address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: default_metrics_address(),
        }
    }
}

fn default_metrics_address() -> String {
    "0.0.0.0:9090".to_string()
}

/// Settings given on the command line, taking precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub queue_url: Option<String>,
    pub failure_policy: Option<FailurePolicy>,
}

impl Overrides {
    fn apply(self, config: &mut Config) {
        if let Some(queue_url) = self.queue_url {
            config.queue_url = queue_url;
        }
        if let Some(policy) = self.failure_policy {
            config.failure_policy = policy;
        }
    }
}

impl Config {
    /// Configuration for draining `queue_url` with every other setting at its default.
    pub fn for_queue(queue_url: impl Into<String>) -> Self {
        Self {
            queue_url: queue_url.into(),
            aws: AwsConfig::default(),
            receive: ReceiveConfig::default(),
            replay: ReplayConfig::default(),
            failure_policy: FailurePolicy::default(),
            metrics: MetricsConfig::default(),
        }
    }

    /// Load configuration from a YAML file, interpolating environment variables.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::load(Some(path.as_ref()), Overrides::default())
    }

    /// Parse configuration from YAML text, interpolating environment variables.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config = Self::parse(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Build the effective configuration from an optional file plus overrides.
    ///
    /// Validation runs after the overrides are applied, so a file may leave
    /// out `queue_url` when it is given on the command line.
    pub fn load(path: Option<&Path>, overrides: Overrides) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).context(ReadFileSnafu)?;
                Self::parse(&content)?
            }
            None => Self::for_queue(""),
        };

        overrides.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn parse(content: &str) -> Result<Self, ConfigError> {
        let content = vars::interpolate(content).map_err(|errors| {
            EnvInterpolationSnafu {
                message: errors.join("\n"),
            }
            .build()
        })?;

        serde_yaml::from_str(&content).context(YamlParseSnafu)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure!(!self.queue_url.trim().is_empty(), EmptyQueueUrlSnafu);

        let max_messages = self.receive.max_messages;
        ensure!(
            (1..=MAX_RECEIVE_MESSAGES).contains(&max_messages),
            InvalidMaxMessagesSnafu {
                value: max_messages
            }
        );

        let wait = self.receive.wait_time_secs;
        ensure!(
            (0..=MAX_WAIT_TIME_SECS).contains(&wait),
            InvalidWaitTimeSnafu { value: wait }
        );

        ensure!(self.replay.max_fetches > 0, ZeroMaxFetchesSnafu);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_yaml_uses_defaults() {
        let config = Config::from_yaml("queue_url: https://sqs.local/000/dlq\n").unwrap();

        assert_eq!(config.queue_url, "https://sqs.local/000/dlq");
        assert_eq!(config.receive.max_messages, 10);
        assert_eq!(config.receive.wait_time(), Duration::from_secs(20));
        assert_eq!(config.replay.max_fetches, 100);
        assert_eq!(config.failure_policy, FailurePolicy::FailFast);
        assert!(!config.metrics.enabled);
        assert!(config.aws.region.is_none());
    }

    #[test]
    fn test_full_yaml() {
        let yaml = r#"
queue_url: https://sqs.eu-west-1.amazonaws.com/123/dlq
aws:
  region: eu-west-1
  endpoint_url: http://localhost:4566
receive:
  max_messages: 5
  wait_time_secs: 2
replay:
  max_fetches: 7
failure_policy: skip_and_continue
metrics:
  enabled: true
  address: 127.0.0.1:9100
"#;
        let config = Config::from_yaml(yaml).unwrap();

        assert_eq!(config.aws.region.as_deref(), Some("eu-west-1"));
        assert_eq!(
            config.aws.endpoint_url.as_deref(),
            Some("http://localhost:4566")
        );
        assert_eq!(config.receive.max_messages, 5);
        assert_eq!(config.receive.wait_time_secs, 2);
        assert_eq!(config.replay.max_fetches, 7);
        assert_eq!(config.failure_policy, FailurePolicy::SkipAndContinue);
        assert!(config.metrics.enabled);
        assert_eq!(config.metrics.address, "127.0.0.1:9100");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::for_queue("  ");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyQueueUrl)
        ));

        config.queue_url = "https://sqs.local/000/dlq".to_string();
        config.receive.max_messages = 11;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidMaxMessages { value: 11 })
        ));

        config.receive.max_messages = 10;
        config.receive.wait_time_secs = 21;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWaitTime { value: 21 })
        ));

        config.receive.wait_time_secs = 0;
        config.replay.max_fetches = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroMaxFetches)));

        config.replay.max_fetches = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_env_var_is_reported() {
        let err = Config::from_yaml("queue_url: ${REDRIVE_CONFIG_TEST_NEVER_SET}\n").unwrap_err();
        match err {
            ConfigError::EnvInterpolation { message } => {
                assert!(message.contains("REDRIVE_CONFIG_TEST_NEVER_SET"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("redrive.yaml");
        std::fs::write(&path, "queue_url: https://sqs.local/000/dlq\nfailure_policy: fail_fast\n")
            .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.failure_policy, FailurePolicy::FailFast);

        let missing = Config::from_file(dir.path().join("absent.yaml"));
        assert!(matches!(missing, Err(ConfigError::ReadFile { .. })));
    }

    #[test]
    fn test_overrides_take_precedence() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("redrive.yaml");
        std::fs::write(&path, "receive:\n  max_messages: 4\n").unwrap();

        // The file alone has no queue.
        assert!(matches!(
            Config::from_file(&path),
            Err(ConfigError::EmptyQueueUrl)
        ));

        let config = Config::load(
            Some(&path),
            Overrides {
                queue_url: Some("https://sqs.local/000/dlq".to_string()),
                failure_policy: Some(FailurePolicy::SkipAndContinue),
            },
        )
        .unwrap();
        assert_eq!(config.queue_url, "https://sqs.local/000/dlq");
        assert_eq!(config.receive.max_messages, 4);
        assert_eq!(config.failure_policy, FailurePolicy::SkipAndContinue);
    }

    #[test]
    fn test_load_without_file() {
        let config = Config::load(
            None,
            Overrides {
                queue_url: Some("https://sqs.local/000/dlq".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(config.failure_policy, FailurePolicy::FailFast);

        assert!(Config::load(None, Overrides::default()).is_err());
    }
}
