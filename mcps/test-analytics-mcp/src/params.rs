//! Parameter types for test analytics MCP tools
//!
//! Every tool takes either inline data or a `scope` resolved through the
//! configured snapshot directory, never both.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use test_analytics::{
    ActorCounters, ExecutionRecord, PerformanceDataPoint, PredictionInput, ProductivityBenchmark,
    QualityMetrics, RiskReadings,
};
use test_analytics::risk::{RiskThresholds, RiskWeights};

/// Where a scoped call reads from and over which window
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ScopeParams {
    /// Snapshot scope (project or suite name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Window start (RFC 3339). Defaults to the configured lookback before `end`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,

    /// Window end, exclusive (RFC 3339). Defaults to now
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

/// Parameters for analyze_flakiness
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct AnalyzeFlakinessParams {
    /// Execution records to analyze instead of a scope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<ExecutionRecord>>,

    #[serde(flatten)]
    pub window: ScopeParams,

    /// Override: executions required before a test is scored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_executions: Option<usize>,

    /// Override: required confidence in [0.8, 0.99]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_level: Option<f64>,

    /// Only return tests classified as flaky
    #[serde(default)]
    pub flaky_only: bool,
}

/// Parameters for calculate_quality_metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CalculateQualityParams {
    /// Execution records to analyze instead of a scope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<ExecutionRecord>>,

    #[serde(flatten)]
    pub window: ScopeParams,

    /// Defects found in the period, for defect density
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defect_count: Option<u64>,

    /// Metrics of the previous period (inline mode)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<QualityMetrics>,

    /// Ordered pass-rate series for the trend (inline mode)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<Vec<f64>>,

    /// Compare with the preceding window of equal length (scope mode)
    #[serde(default)]
    pub compare_previous: bool,
}

/// Duration samples of one test
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TestDurations {
    pub test_id: i64,
    /// Execution durations in milliseconds
    pub durations_ms: Vec<u64>,
}

/// Parameters for analyze_performance_trends
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct AnalyzePerformanceParams {
    /// Per-run performance points, in chronological order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_points: Option<Vec<PerformanceDataPoint>>,

    /// Per-test duration samples for bottleneck detection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub durations: Option<Vec<TestDurations>>,

    /// Execution records to derive points and durations from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<ExecutionRecord>>,

    #[serde(flatten)]
    pub window: ScopeParams,

    /// Override: percentile duration (ms) above which a test is a bottleneck
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slow_test_threshold_ms: Option<u64>,

    /// Override: relative change that counts as a regression, in (0, 1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regression_sensitivity: Option<f64>,

    /// Override: percentile used for bottleneck detection, in [0.8, 0.99]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottleneck_percentile: Option<f64>,
}

/// Parameters for assess_risk
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct AssessRiskParams {
    /// Factor readings, each in [0, 100], instead of a scope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readings: Option<RiskReadings>,

    #[serde(flatten)]
    pub window: ScopeParams,

    /// Quality defect density (defects per test) used as the defect-history reading
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defect_density: Option<f64>,

    /// Override: factor weights, must sum to 1.0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<RiskWeights>,

    /// Override: upper bounds of the low, medium and high levels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<RiskThresholds>,

    /// Failure forecast inputs (inline mode)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction: Option<PredictionInput>,

    /// Forecast horizon in days; in scope mode the failure rate comes from the window's history
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizon_days: Option<u32>,
}

/// Parameters for calculate_productivity
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CalculateProductivityParams {
    /// Per-actor counters instead of a scope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actors: Option<Vec<ActorCounters>>,

    #[serde(flatten)]
    pub window: ScopeParams,

    /// Benchmark rates to compare team metrics against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benchmark: Option<ProductivityBenchmark>,

    /// Include per-actor breakdown
    #[serde(default)]
    pub include_individuals: bool,

    /// Replace actor ids and drop names in the per-actor breakdown
    #[serde(default)]
    pub anonymize: bool,
}
