//! Configuration for the Test Analytics MCP server

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use test_analytics::AnalyticsConfig;

/// Server configuration
///
/// Every section is optional; a missing file yields the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfig {
    /// Analyzer thresholds, weights and sensitivities
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Where scope snapshots are read from
    #[serde(default)]
    pub snapshots: SnapshotConfig,
}

/// Snapshot directory configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotConfig {
    /// Root directory holding one subdirectory per scope
    ///
    /// Without it only inline data is accepted.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Lookback used when a scoped call omits `start`, in 1..=36500
    /// Default: 30
    #[serde(default = "default_lookback_days")]
    pub default_lookback_days: u32,
}

fn default_lookback_days() -> u32 {
    30
}

/// One hundred years
const MAX_LOOKBACK_DAYS: u32 = 36_500;

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            dir: None,
            default_lookback_days: default_lookback_days(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from file and environment
    ///
    /// Looks for config in:
    /// 1. `TEST_ANALYTICS_CONFIG` environment variable
    /// 2. `~/.binks/test-analytics.toml`
    ///
    /// `TEST_ANALYTICS_DATA_DIR` overrides `[snapshots] dir`.
    pub fn load() -> Result<Self> {
        let config_path = if let Ok(path) = std::env::var("TEST_ANALYTICS_CONFIG") {
            Some(PathBuf::from(shellexpand::tilde(&path).as_ref()))
        } else {
            dirs::home_dir().map(|home| home.join(".binks").join("test-analytics.toml"))
        };

        let mut config = match config_path {
            Some(path) if path.exists() => {
                tracing::info!("Loading config from: {}", path.display());
                Self::from_file(&path)?
            }
            _ => {
                tracing::info!("No config file found, using defaults");
                Self::default()
            }
        };

        if let Ok(dir) = std::env::var("TEST_ANALYTICS_DATA_DIR") {
            config.snapshots.dir = Some(PathBuf::from(dir));
        }

        config.finish()
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config from {:?}", path))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.finish()
    }

    /// Expand `~` in the snapshot dir and reject invalid settings
    fn finish(mut self) -> Result<Self> {
        if let Some(dir) = self.snapshots.dir.take() {
            let expanded = shellexpand::tilde(&dir.to_string_lossy()).into_owned();
            self.snapshots.dir = Some(PathBuf::from(expanded));
        }

        let lookback = self.snapshots.default_lookback_days;
        if !(1..=MAX_LOOKBACK_DAYS).contains(&lookback) {
            anyhow::bail!(
                "[snapshots] default_lookback_days must be within 1..={} (got {})",
                MAX_LOOKBACK_DAYS,
                lookback
            );
        }

        self.analytics
            .validate()
            .context("Invalid [analytics] configuration")?;

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = ServerConfig::from_toml_str("").unwrap();
        assert!(config.snapshots.dir.is_none());
        assert_eq!(config.snapshots.default_lookback_days, 30);
        assert_eq!(config.analytics, AnalyticsConfig::default());
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = ServerConfig::from_toml_str(
            r#"
            [analytics.flakiness]
            min_executions = 10

            [analytics.risk.thresholds]
            low = 0.3
            medium = 0.6
            high = 0.9

            [snapshots]
            dir = "/var/lib/test-analytics"
            "#,
        )
        .unwrap();

        assert_eq!(config.analytics.flakiness.min_executions, 10);
        assert_eq!(config.analytics.flakiness.confidence_level, 0.85);
        assert_eq!(config.analytics.risk.thresholds.medium, 0.6);
        assert_eq!(config.analytics.risk.weights.test_coverage, 0.25);
        assert_eq!(
            config.snapshots.dir,
            Some(PathBuf::from("/var/lib/test-analytics"))
        );
    }

    #[test]
    fn test_invalid_weights_rejected_at_load() {
        let err = ServerConfig::from_toml_str(
            r#"
            [analytics.risk.weights]
            dependencies = 0.5
            "#,
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("weights must sum to 1.0"));
    }

    #[test]
    fn test_lookback_days_must_be_plausible() {
        for days in ["0", "36501", "200000000"] {
            let err = ServerConfig::from_toml_str(&format!(
                "[snapshots]\ndefault_lookback_days = {}\n",
                days
            ))
            .unwrap_err();
            assert!(err.to_string().contains("default_lookback_days"), "{}", days);
        }

        let config =
            ServerConfig::from_toml_str("[snapshots]\ndefault_lookback_days = 36500\n").unwrap();
        assert_eq!(config.snapshots.default_lookback_days, 36_500);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test-analytics.toml");
        std::fs::write(&path, "[snapshots]\ndefault_lookback_days = 7\n").unwrap();

        let config = ServerConfig::from_file(&path).unwrap();
        assert_eq!(config.snapshots.default_lookback_days, 7);
    }
}
