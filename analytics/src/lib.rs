//! Test Analytics Engine
//!
//! Pure computations over historical test-execution records:
//!
//! - **Flakiness**: symmetric instability score with binomial confidence
//! - **Quality**: pass, automation and defect rates with period comparison
//! - **Performance**: execution-time/throughput trends, regressions, bottlenecks
//! - **Risk**: weighted multi-factor risk score with optional failure forecast
//! - **Productivity**: team and individual rates against benchmarks
//!
//! Analyzers take already-fetched, in-memory data and perform no I/O.
//! [`TestAnalyticsEngine`] wires them to an [`AnalyticsSource`] for callers
//! that want fetching and analysis in one step.
//!
//! # Example
//!
//! ```rust,ignore
//! use test_analytics::{FlakinessAnalyzer, FlakinessConfig};
//!
//! let analyzer = FlakinessAnalyzer::new(FlakinessConfig::default())?;
//! let report = analyzer.analyze(&records);
//! println!("{} of {} tests are flaky", report.flaky_count, report.analyzed_count);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod flakiness;
pub mod performance;
pub mod productivity;
pub mod quality;
pub mod risk;
pub mod source;
pub mod trend;
pub mod types;

pub use config::AnalyticsConfig;
pub use engine::TestAnalyticsEngine;
pub use error::{AnalyticsError, AnalyticsResult};
pub use flakiness::{FlakinessAnalyzer, FlakinessConfig, FlakinessReport, FlakinessResult};
pub use performance::{
    BottleneckResult, BottleneckSeverity, PerformanceConfig, PerformanceMetric, PerformanceReport,
    PerformanceTrendAnalyzer, RegressionPoint, RegressionSeverity,
};
pub use productivity::{
    ActorCounters, ProductivityBenchmark, ProductivityCalculator, ProductivityOptions,
    ProductivityReport,
};
pub use quality::{QualityConfig, QualityMetrics, QualityMetricsCalculator, QualityReport};
pub use risk::{
    PredictionInput, RiskAssessmentEngine, RiskConfig, RiskFactor, RiskLevel, RiskReadings,
    RiskReport,
};
pub use source::AnalyticsSource;
pub use trend::{linear_slope, two_period_trend, PeriodTrend, TwoPeriodTrend};
pub use types::{
    duration_samples, group_by_test, pass_rate_series, performance_points, ExecutionRecord,
    PerformanceDataPoint, TestOutcome, TimeRange, TrendDirection,
};
