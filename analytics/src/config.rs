//! Combined analyzer configuration

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::AnalyticsResult;
use crate::flakiness::FlakinessConfig;
use crate::performance::PerformanceConfig;
use crate::quality::QualityConfig;
use crate::risk::RiskConfig;

/// Configuration for every analyzer, treated as immutable per call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalyticsConfig {
    #[serde(default)]
    pub flakiness: FlakinessConfig,
    #[serde(default)]
    pub quality: QualityConfig,
    #[serde(default)]
    pub performance: PerformanceConfig,
    #[serde(default)]
    pub risk: RiskConfig,
}

impl AnalyticsConfig {
    /// Validate all sections, stopping at the first invalid one
    pub fn validate(&self) -> AnalyticsResult<()> {
        self.flakiness.validate()?;
        self.quality.validate()?;
        self.performance.validate()?;
        self.risk.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalyticsError;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AnalyticsConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_section_fails() {
        let mut config = AnalyticsConfig::default();
        config.risk.weights.test_coverage = 0.5;
        assert!(matches!(
            config.validate(),
            Err(AnalyticsError::InvalidWeights { .. })
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AnalyticsConfig =
            serde_json::from_str(r#"{"flakiness": {"min_executions": 10}}"#).unwrap();
        assert_eq!(config.flakiness.min_executions, 10);
        assert_eq!(config.flakiness.confidence_level, 0.85);
        assert_eq!(config.performance.max_bottlenecks, 20);
        assert_eq!(config.risk.weights.test_coverage, 0.25);
    }
}
