//! Service configuration.

use posture_analysis::{AnalyzerConfig, CalibrationConfig};
use posture_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Environment variable prefix, e.g. `POSTURE__LIMITS__MAX_LOGS_PER_SESSION`
pub const ENV_PREFIX: &str = "POSTURE";

/// Complete per-connection configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Calibration capture
    pub calibration: CalibrationConfig,

    /// Scoring, smoothing, status and alert tunables
    pub analyzer: AnalyzerConfig,

    /// Boundary limits enforced before messages reach the analysis core
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Messages accepted per sliding window
    pub max_messages_per_window: usize,

    /// Sliding window length (seconds)
    pub rate_window_secs: f64,

    /// Largest accepted text message (bytes)
    pub max_message_bytes: usize,

    /// Posture log records stored per session
    pub max_logs_per_session: u64,

    /// Issues kept per log record
    pub max_issues_per_log: usize,

    /// Highest landmark index accepted from clients
    pub max_landmark_index: u8,

    /// Silence after which the connection should be pinged (seconds)
    pub idle_timeout_secs: f64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_messages_per_window: 15,
            rate_window_secs: 1.0,
            max_message_bytes: 64 * 1024,
            max_logs_per_session: 10_000,
            max_issues_per_log: 10,
            max_landmark_index: 32,
            idle_timeout_secs: 60.0,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from file, with environment overrides
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(environment())
            .build()
            .map_err(config_error)?;

        settings.try_deserialize().map_err(config_error)
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(environment())
            .build()
            .map_err(config_error)?;

        settings.try_deserialize().map_err(config_error)
    }
}

fn config_error(e: config::ConfigError) -> Error {
    Error::Config(e.to_string())
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();
        assert_eq!(config.limits.max_messages_per_window, 15);
        assert_eq!(config.limits.max_logs_per_session, 10_000);
        assert_eq!(config.calibration.required_frames, 20);
        assert_eq!(config.analyzer.alert.arm_after_secs(), 7.0);
    }

    #[test]
    fn test_from_file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!("posture-config-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "[analyzer.alert]\nconsecutive_bad_seconds = 10.0\n\n[limits]\nmax_issues_per_log = 4\n",
        )
        .unwrap();

        let config = ServiceConfig::from_file(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.analyzer.alert.consecutive_bad_seconds, 10.0);
        assert_eq!(config.analyzer.alert.recover_at, 8.0);
        assert_eq!(config.limits.max_issues_per_log, 4);
        assert_eq!(config.limits.max_messages_per_window, 15);
    }

    #[test]
    fn test_missing_file_is_a_config_error() {
        let err = ServiceConfig::from_file("/nonexistent/posture-config.toml").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_mistyped_value_is_a_config_error() {
        let path = std::env::temp_dir().join(format!("posture-bad-{}.toml", std::process::id()));
        std::fs::write(&path, "[limits]\nmax_issues_per_log = \"lots\"\n").unwrap();

        let result = ServiceConfig::from_file(path.to_str().unwrap());
        std::fs::remove_file(&path).ok();

        let Err(Error::Config(message)) = result else {
            panic!("expected a configuration error");
        };
        assert!(message.contains("max_issues_per_log"));
    }
}
