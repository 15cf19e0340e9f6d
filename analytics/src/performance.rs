//! Execution-time and throughput trends, regression points and bottlenecks

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{ensure_within, AnalyticsError, AnalyticsResult};
use crate::trend::linear_slope;
use crate::types::{PerformanceDataPoint, TrendDirection};

/// Samples a test case needs before bottleneck detection applies
pub const MIN_BOTTLENECK_SAMPLES: usize = 3;

/// Slopes smaller than this are reported as stable
const SLOPE_EPSILON: f64 = 1e-9;

/// Performance analysis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PerformanceConfig {
    /// Percentile duration above which a test is a bottleneck
    #[serde(default = "default_slow_test_threshold_ms")]
    pub slow_test_threshold_ms: u64,

    /// Relative worsening between consecutive runs that counts as a regression
    #[serde(default = "default_regression_sensitivity")]
    pub regression_sensitivity: f64,

    /// Percentile of each test's durations compared against the threshold
    #[serde(default = "default_bottleneck_percentile")]
    pub bottleneck_percentile: f64,

    /// Maximum number of bottlenecks reported
    #[serde(default = "default_max_bottlenecks")]
    pub max_bottlenecks: usize,
}

fn default_slow_test_threshold_ms() -> u64 {
    10_000
}

fn default_regression_sensitivity() -> f64 {
    0.1
}

fn default_bottleneck_percentile() -> f64 {
    0.95
}

fn default_max_bottlenecks() -> usize {
    20
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            slow_test_threshold_ms: default_slow_test_threshold_ms(),
            regression_sensitivity: default_regression_sensitivity(),
            bottleneck_percentile: default_bottleneck_percentile(),
            max_bottlenecks: default_max_bottlenecks(),
        }
    }
}

impl PerformanceConfig {
    pub fn validate(&self) -> AnalyticsResult<()> {
        if !(self.regression_sensitivity > 0.0 && self.regression_sensitivity < 1.0) {
            return Err(AnalyticsError::InvalidConfig(format!(
                "regression_sensitivity must be within (0, 1) (got {})",
                self.regression_sensitivity
            )));
        }
        ensure_within("bottleneck_percentile", self.bottleneck_percentile, 0.8, 0.99)
    }
}

/// Metric a regression was detected on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceMetric {
    ExecutionTime,
    Throughput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RegressionSeverity {
    Low,
    Medium,
    High,
}

impl RegressionSeverity {
    /// Severity of a relative change: high above 0.3, medium above 0.15
    pub fn from_change(change_ratio: f64) -> Self {
        let magnitude = change_ratio.abs();
        if magnitude > 0.3 {
            RegressionSeverity::High
        } else if magnitude > 0.15 {
            RegressionSeverity::Medium
        } else {
            RegressionSeverity::Low
        }
    }
}

/// A measured worsening between two consecutive data points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RegressionPoint {
    pub run_id: i64,
    pub timestamp: DateTime<Utc>,
    pub metric: PerformanceMetric,
    /// Signed relative change `(current - previous) / previous`
    pub change_ratio: f64,
    pub severity: RegressionSeverity,
    pub previous_value: f64,
    pub current_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum BottleneckSeverity {
    Medium,
    High,
}

/// A test case whose high-percentile duration exceeds the slow-test threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BottleneckResult {
    pub test_id: i64,
    pub sample_count: usize,
    pub percentile_value_ms: u64,
    pub mean_ms: f64,
    pub max_ms: u64,
    pub severity: BottleneckSeverity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PerformanceTrends {
    /// Milliseconds per run
    pub execution_time_slope: f64,
    /// Executions per minute per run
    pub throughput_slope: f64,
    pub execution_time_direction: TrendDirection,
    pub throughput_direction: TrendDirection,
    pub average_execution_time_ms: f64,
    pub average_throughput: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PerformanceReport {
    pub trends: PerformanceTrends,
    pub regressions: Vec<RegressionPoint>,
    pub bottlenecks: Vec<BottleneckResult>,
    pub recommendations: Vec<String>,
    /// Fewer than two data points; trends and regressions are empty
    pub insufficient_data: bool,
}

fn direction_of(slope: f64) -> TrendDirection {
    if slope > SLOPE_EPSILON {
        TrendDirection::Increasing
    } else if slope < -SLOPE_EPSILON {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    }
}

fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Value at `floor(n * percentile)` of the ascending samples
pub fn percentile_value(samples: &[u64], percentile: f64) -> Option<u64> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();
    let index = ((sorted.len() as f64 * percentile).floor() as usize).min(sorted.len() - 1);
    Some(sorted[index])
}

/// Analyzes run-level performance history and per-test durations
#[derive(Debug, Clone, Default)]
pub struct PerformanceTrendAnalyzer {
    config: PerformanceConfig,
}

impl PerformanceTrendAnalyzer {
    pub fn new(config: PerformanceConfig) -> AnalyticsResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn trends(&self, points: &[PerformanceDataPoint]) -> PerformanceTrends {
        let execution_times: Vec<f64> = points.iter().map(|p| p.execution_time_ms).collect();
        let throughputs: Vec<f64> = points.iter().map(|p| p.throughput).collect();
        let execution_time_slope = linear_slope(&execution_times);
        let throughput_slope = linear_slope(&throughputs);

        PerformanceTrends {
            execution_time_slope,
            throughput_slope,
            execution_time_direction: direction_of(execution_time_slope),
            throughput_direction: direction_of(throughput_slope),
            average_execution_time_ms: average(&execution_times),
            average_throughput: average(&throughputs),
        }
    }

    /// Flag consecutive pairs where execution time grows or throughput drops
    /// by more than the sensitivity. Pairs with a zero previous value are
    /// skipped for that metric.
    pub fn detect_regressions(&self, points: &[PerformanceDataPoint]) -> Vec<RegressionPoint> {
        let sensitivity = self.config.regression_sensitivity;
        let mut regressions = Vec::new();

        for pair in points.windows(2) {
            let (prev, curr) = (&pair[0], &pair[1]);

            if prev.execution_time_ms > 0.0 {
                let change =
                    (curr.execution_time_ms - prev.execution_time_ms) / prev.execution_time_ms;
                if change > sensitivity {
                    regressions.push(RegressionPoint {
                        run_id: curr.run_id,
                        timestamp: curr.timestamp,
                        metric: PerformanceMetric::ExecutionTime,
                        change_ratio: change,
                        severity: RegressionSeverity::from_change(change),
                        previous_value: prev.execution_time_ms,
                        current_value: curr.execution_time_ms,
                    });
                }
            }

            if prev.throughput > 0.0 {
                let drop = (prev.throughput - curr.throughput) / prev.throughput;
                if drop > sensitivity {
                    regressions.push(RegressionPoint {
                        run_id: curr.run_id,
                        timestamp: curr.timestamp,
                        metric: PerformanceMetric::Throughput,
                        change_ratio: -drop,
                        severity: RegressionSeverity::from_change(drop),
                        previous_value: prev.throughput,
                        current_value: curr.throughput,
                    });
                }
            }
        }

        regressions
    }

    fn bottleneck_for(&self, test_id: i64, samples: &[u64]) -> Option<BottleneckResult> {
        if samples.len() < MIN_BOTTLENECK_SAMPLES {
            return None;
        }

        let threshold = self.config.slow_test_threshold_ms;
        let value = percentile_value(samples, self.config.bottleneck_percentile)?;
        if value <= threshold {
            return None;
        }

        let severity = if value > threshold.saturating_mul(2) {
            BottleneckSeverity::High
        } else {
            BottleneckSeverity::Medium
        };

        Some(BottleneckResult {
            test_id,
            sample_count: samples.len(),
            percentile_value_ms: value,
            mean_ms: samples.iter().map(|s| *s as f64).sum::<f64>() / samples.len() as f64,
            max_ms: samples.iter().copied().max().unwrap_or(value),
            severity,
        })
    }

    /// Slowest test cases by percentile duration, capped at `max_bottlenecks`
    pub fn detect_bottlenecks(&self, durations: &BTreeMap<i64, Vec<u64>>) -> Vec<BottleneckResult> {
        let mut bottlenecks: Vec<BottleneckResult> = durations
            .par_iter()
            .filter_map(|(test_id, samples)| self.bottleneck_for(*test_id, samples))
            .collect();

        bottlenecks.sort_by(|a, b| {
            b.percentile_value_ms
                .cmp(&a.percentile_value_ms)
                .then(a.test_id.cmp(&b.test_id))
        });
        bottlenecks.truncate(self.config.max_bottlenecks);
        bottlenecks
    }

    pub fn analyze(
        &self,
        points: &[PerformanceDataPoint],
        durations: &BTreeMap<i64, Vec<u64>>,
    ) -> PerformanceReport {
        let trends = self.trends(points);
        let regressions = self.detect_regressions(points);
        let bottlenecks = self.detect_bottlenecks(durations);

        let mut recommendations = Vec::new();
        if regressions
            .iter()
            .any(|r| r.severity == RegressionSeverity::High)
        {
            recommendations.push(
                "High-severity performance regressions detected: bisect the affected runs"
                    .to_string(),
            );
        }
        if bottlenecks
            .iter()
            .any(|b| b.severity == BottleneckSeverity::High)
        {
            recommendations.push(
                "Tests exceeding twice the slow-test threshold: split or parallelize them"
                    .to_string(),
            );
        }
        if trends.execution_time_direction == TrendDirection::Increasing {
            recommendations.push(
                "Execution time is trending upward: review suite growth and test setup cost"
                    .to_string(),
            );
        }

        let insufficient_data = points.len() < 2;
        if insufficient_data {
            tracing::warn!(
                "Performance analysis with {} data points; trends need at least 2",
                points.len()
            );
        }

        tracing::info!(
            "Performance analysis: {} points, {} regressions, {} bottlenecks",
            points.len(),
            regressions.len(),
            bottlenecks.len()
        );

        PerformanceReport {
            trends,
            regressions,
            bottlenecks,
            recommendations,
            insufficient_data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::fixtures::base_time;
    use chrono::Duration;

    fn point(run_id: i64, execution_time_ms: f64, throughput: f64) -> PerformanceDataPoint {
        PerformanceDataPoint {
            run_id,
            timestamp: base_time() + Duration::hours(run_id),
            execution_time_ms,
            throughput,
            resource_usage: None,
        }
    }

    #[test]
    fn test_severity_boundaries() {
        assert_eq!(RegressionSeverity::from_change(0.12), RegressionSeverity::Low);
        assert_eq!(RegressionSeverity::from_change(0.15), RegressionSeverity::Low);
        assert_eq!(RegressionSeverity::from_change(0.2), RegressionSeverity::Medium);
        assert_eq!(RegressionSeverity::from_change(0.3), RegressionSeverity::Medium);
        assert_eq!(RegressionSeverity::from_change(-0.5), RegressionSeverity::High);
    }

    #[test]
    fn test_trends() {
        let analyzer = PerformanceTrendAnalyzer::default();
        let points = vec![
            point(1, 1000.0, 60.0),
            point(2, 1100.0, 55.0),
            point(3, 1200.0, 50.0),
        ];

        let trends = analyzer.trends(&points);
        assert!((trends.execution_time_slope - 100.0).abs() < 1e-9);
        assert!((trends.throughput_slope + 5.0).abs() < 1e-9);
        assert_eq!(trends.execution_time_direction, TrendDirection::Increasing);
        assert_eq!(trends.throughput_direction, TrendDirection::Decreasing);
        assert!((trends.average_execution_time_ms - 1100.0).abs() < 1e-9);
    }

    #[test]
    fn test_detect_regressions() {
        let analyzer = PerformanceTrendAnalyzer::default();
        let points = vec![
            point(1, 1000.0, 60.0),
            point(2, 1050.0, 60.0), // +5%: below sensitivity
            point(3, 1500.0, 40.0), // +42.9% time, -33.3% throughput
            point(4, 1000.0, 40.0), // improvement
        ];

        let regressions = analyzer.detect_regressions(&points);
        assert_eq!(regressions.len(), 2);

        assert_eq!(regressions[0].metric, PerformanceMetric::ExecutionTime);
        assert_eq!(regressions[0].run_id, 3);
        assert_eq!(regressions[0].severity, RegressionSeverity::High);

        assert_eq!(regressions[1].metric, PerformanceMetric::Throughput);
        assert!((regressions[1].change_ratio + 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(regressions[1].severity, RegressionSeverity::High);
    }

    #[test]
    fn test_zero_previous_value_is_skipped() {
        let analyzer = PerformanceTrendAnalyzer::default();
        let points = vec![point(1, 0.0, 0.0), point(2, 5000.0, 10.0)];
        assert!(analyzer.detect_regressions(&points).is_empty());
    }

    #[test]
    fn test_bottleneck_requires_three_samples() {
        let analyzer = PerformanceTrendAnalyzer::default();
        let durations = BTreeMap::from([(1, vec![60_000, 60_000])]);
        assert!(analyzer.detect_bottlenecks(&durations).is_empty());
    }

    #[test]
    fn test_bottleneck_severity_and_ordering() {
        let analyzer = PerformanceTrendAnalyzer::new(PerformanceConfig {
            slow_test_threshold_ms: 5_000,
            bottleneck_percentile: 0.8,
            ..Default::default()
        })
        .unwrap();

        let durations = BTreeMap::from([
            (1, vec![6_000, 6_000, 7_000]),
            (2, vec![1_000, 2_000, 3_000, 4_000, 100_000]),
            (3, vec![100, 200, 300]),
        ]);

        let bottlenecks = analyzer.detect_bottlenecks(&durations);
        assert_eq!(bottlenecks.len(), 2);
        assert_eq!(bottlenecks[0].test_id, 2);
        assert_eq!(bottlenecks[0].percentile_value_ms, 100_000);
        assert_eq!(bottlenecks[0].severity, BottleneckSeverity::High);
        assert_eq!(bottlenecks[1].test_id, 1);
        assert_eq!(bottlenecks[1].severity, BottleneckSeverity::Medium);
    }

    #[test]
    fn test_bottleneck_cap() {
        let analyzer = PerformanceTrendAnalyzer::default();
        let durations: BTreeMap<i64, Vec<u64>> = (0..30)
            .map(|id| (id, vec![20_000 + id as u64; 3]))
            .collect();

        let bottlenecks = analyzer.detect_bottlenecks(&durations);
        assert_eq!(bottlenecks.len(), 20);
        assert_eq!(bottlenecks[0].test_id, 29);
    }

    #[test]
    fn test_report_with_single_point() {
        let analyzer = PerformanceTrendAnalyzer::default();
        let report = analyzer.analyze(&[point(1, 1000.0, 10.0)], &BTreeMap::new());

        assert!(report.insufficient_data);
        assert_eq!(report.trends.execution_time_slope, 0.0);
        assert_eq!(report.trends.execution_time_direction, TrendDirection::Stable);
        assert!(report.regressions.is_empty());
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn test_config_validation() {
        let config = PerformanceConfig {
            regression_sensitivity: 1.0,
            ..Default::default()
        };
        assert!(PerformanceTrendAnalyzer::new(config).is_err());

        let config = PerformanceConfig {
            bottleneck_percentile: 0.5,
            ..Default::default()
        };
        assert!(PerformanceTrendAnalyzer::new(config).is_err());
    }
}
