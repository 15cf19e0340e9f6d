//! Aggregate quality metrics for a period of test executions

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ensure_within, AnalyticsResult};
use crate::trend::{two_period_trend, PeriodTrend, TwoPeriodTrend};
use crate::types::{pass_rate_series, ExecutionRecord};

/// Thresholds driving quality recommendations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QualityConfig {
    /// Pass rate (percent) below which the period is flagged
    #[serde(default = "default_min_pass_rate")]
    pub min_pass_rate: f64,

    /// Automation rate (percent) below which automation is recommended
    #[serde(default = "default_min_automation_rate")]
    pub min_automation_rate: f64,

    /// Defects per test above which defect density is flagged
    #[serde(default = "default_max_defect_density")]
    pub max_defect_density: f64,

    /// Relative change treated as stable by the period trend
    #[serde(default = "default_stabilization_threshold")]
    pub stabilization_threshold: f64,

    /// Pass-rate drop (percentage points) versus the previous period that is flagged
    #[serde(default = "default_max_pass_rate_drop")]
    pub max_pass_rate_drop: f64,
}

fn default_min_pass_rate() -> f64 {
    80.0
}

fn default_min_automation_rate() -> f64 {
    50.0
}

fn default_max_defect_density() -> f64 {
    0.1
}

fn default_stabilization_threshold() -> f64 {
    crate::trend::DEFAULT_STABILIZATION_THRESHOLD
}

fn default_max_pass_rate_drop() -> f64 {
    5.0
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_pass_rate: default_min_pass_rate(),
            min_automation_rate: default_min_automation_rate(),
            max_defect_density: default_max_defect_density(),
            stabilization_threshold: default_stabilization_threshold(),
            max_pass_rate_drop: default_max_pass_rate_drop(),
        }
    }
}

impl QualityConfig {
    pub fn validate(&self) -> AnalyticsResult<()> {
        ensure_within("min_pass_rate", self.min_pass_rate, 0.0, 100.0)?;
        ensure_within("min_automation_rate", self.min_automation_rate, 0.0, 100.0)?;
        ensure_within("max_defect_density", self.max_defect_density, 0.0, f64::MAX)?;
        ensure_within("stabilization_threshold", self.stabilization_threshold, 0.0, 1.0)?;
        ensure_within("max_pass_rate_drop", self.max_pass_rate_drop, 0.0, 100.0)
    }
}

/// Quality metrics of one period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QualityMetrics {
    #[serde(default)]
    pub total_tests: usize,
    #[serde(default)]
    pub passed: usize,
    #[serde(default)]
    pub failed: usize,
    #[serde(default)]
    pub automated: usize,
    #[serde(default)]
    pub defect_count: u64,
    /// Percentage of executions that passed
    pub pass_rate: f64,
    /// Percentage of executions that were automated
    pub automation_rate: f64,
    /// Defects per test execution
    pub defect_density: f64,
    pub reliability: f64,
    #[serde(default)]
    pub insufficient_data: bool,
}

/// Period-over-period comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QualityComparison {
    /// Change in percentage points versus the previous period
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass_rate_delta: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub automation_rate_delta: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defect_density_delta: Option<f64>,
    /// Two-period trend of the per-run series
    pub trend: TwoPeriodTrend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QualityReport {
    #[serde(flatten)]
    pub metrics: QualityMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<QualityComparison>,
    pub recommendations: Vec<String>,
}

/// Computes quality metrics and rule-based recommendations
#[derive(Debug, Clone, Default)]
pub struct QualityMetricsCalculator {
    config: QualityConfig,
}

impl QualityMetricsCalculator {
    pub fn new(config: QualityConfig) -> AnalyticsResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Metrics over all records of a period
    pub fn calculate(
        &self,
        records: &[ExecutionRecord],
        defect_count: Option<u64>,
    ) -> QualityMetrics {
        let total = records.len();
        let passed = records.iter().filter(|r| r.outcome.is_pass()).count();
        let failed = records.iter().filter(|r| r.outcome.is_failure()).count();
        let automated = records.iter().filter(|r| r.is_automated).count();
        let defect_count = defect_count.unwrap_or(0);

        let percent = |count: usize| {
            if total == 0 {
                0.0
            } else {
                count as f64 / total as f64 * 100.0
            }
        };
        let pass_rate = percent(passed);
        let defect_density = if total == 0 {
            0.0
        } else {
            defect_count as f64 / total as f64
        };

        QualityMetrics {
            total_tests: total,
            passed,
            failed,
            automated,
            defect_count,
            pass_rate,
            automation_rate: percent(automated),
            defect_density,
            reliability: pass_rate,
            insufficient_data: total == 0,
        }
    }

    /// Compare with a previous period and trend the per-run series
    pub fn compare(
        &self,
        current: &QualityMetrics,
        previous: Option<&QualityMetrics>,
        series: &[f64],
    ) -> QualityComparison {
        QualityComparison {
            pass_rate_delta: previous.map(|p| current.pass_rate - p.pass_rate),
            automation_rate_delta: previous.map(|p| current.automation_rate - p.automation_rate),
            defect_density_delta: previous.map(|p| current.defect_density - p.defect_density),
            trend: two_period_trend(series, self.config.stabilization_threshold),
        }
    }

    /// Full report: metrics, optional comparison and recommendations
    ///
    /// When no series is supplied the per-run pass rates of `records` are
    /// trended. A comparison is produced only when a previous period or an
    /// explicit series is given.
    pub fn report(
        &self,
        records: &[ExecutionRecord],
        defect_count: Option<u64>,
        previous: Option<&QualityMetrics>,
        series: Option<&[f64]>,
    ) -> QualityReport {
        let metrics = self.calculate(records, defect_count);

        let comparison = if previous.is_some() || series.is_some() {
            let derived: Vec<f64>;
            let series: &[f64] = match series {
                Some(values) => values,
                None => {
                    derived = pass_rate_series(records);
                    derived.as_slice()
                }
            };
            Some(self.compare(&metrics, previous, series))
        } else {
            None
        };

        let recommendations = self.recommendations(&metrics, comparison.as_ref());

        tracing::info!(
            "Quality metrics: {} tests, pass rate {:.1}%, automation {:.1}%",
            metrics.total_tests,
            metrics.pass_rate,
            metrics.automation_rate
        );

        QualityReport {
            metrics,
            comparison,
            recommendations,
        }
    }

    fn recommendations(
        &self,
        metrics: &QualityMetrics,
        comparison: Option<&QualityComparison>,
    ) -> Vec<String> {
        let mut recommendations = Vec::new();

        if metrics.insufficient_data {
            recommendations.push(
                "No test executions in period; quality cannot be assessed".to_string(),
            );
            return recommendations;
        }

        if metrics.pass_rate < self.config.min_pass_rate {
            recommendations.push(format!(
                "Low pass rate ({:.1}%): investigate failing tests before release",
                metrics.pass_rate
            ));
        }
        if metrics.automation_rate < self.config.min_automation_rate {
            recommendations.push(format!(
                "Low automation rate ({:.1}%): automate high-value manual tests",
                metrics.automation_rate
            ));
        }
        if metrics.defect_density > self.config.max_defect_density {
            recommendations.push(format!(
                "High defect density ({:.2} per test): strengthen reviews and regression coverage",
                metrics.defect_density
            ));
        }

        if let Some(comparison) = comparison {
            if comparison.trend.trend == PeriodTrend::Declining {
                recommendations.push(
                    "Pass rate is declining across runs: review recent changes".to_string(),
                );
            }
            if let Some(delta) = comparison.pass_rate_delta {
                if delta < -self.config.max_pass_rate_drop {
                    recommendations.push(format!(
                        "Pass rate dropped {:.1} points since the previous period",
                        -delta
                    ));
                }
            }
        }

        recommendations
    }
}
