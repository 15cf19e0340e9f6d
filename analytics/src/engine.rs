//! Facade that fetches through an [`AnalyticsSource`] and runs the analyzers
//!
//! Every method validates its time range before touching the source, drops
//! records outside the range, and propagates source failures unchanged.

use std::sync::Arc;

use crate::config::AnalyticsConfig;
use crate::error::AnalyticsResult;
use crate::flakiness::{FlakinessAnalyzer, FlakinessReport};
use crate::performance::{PerformanceReport, PerformanceTrendAnalyzer};
use crate::productivity::{
    ProductivityBenchmark, ProductivityCalculator, ProductivityOptions, ProductivityReport,
};
use crate::quality::{QualityMetricsCalculator, QualityReport};
use crate::risk::{PredictionInput, RiskAssessmentEngine, RiskReport};
use crate::source::AnalyticsSource;
use crate::types::{duration_samples, performance_points, ExecutionRecord, TimeRange};

/// Analyzers bound to a validated configuration and a data source
pub struct TestAnalyticsEngine<S> {
    source: Arc<S>,
    config: AnalyticsConfig,
    flakiness: FlakinessAnalyzer,
    quality: QualityMetricsCalculator,
    performance: PerformanceTrendAnalyzer,
    risk: RiskAssessmentEngine,
    productivity: ProductivityCalculator,
}

impl<S: AnalyticsSource> TestAnalyticsEngine<S> {
    pub fn new(source: S, config: AnalyticsConfig) -> AnalyticsResult<Self> {
        Self::with_shared_source(Arc::new(source), config)
    }

    pub fn with_shared_source(source: Arc<S>, config: AnalyticsConfig) -> AnalyticsResult<Self> {
        config.validate()?;
        Ok(Self {
            source,
            flakiness: FlakinessAnalyzer::new(config.flakiness.clone())?,
            quality: QualityMetricsCalculator::new(config.quality.clone())?,
            performance: PerformanceTrendAnalyzer::new(config.performance.clone())?,
            risk: RiskAssessmentEngine::new(config.risk.clone())?,
            productivity: ProductivityCalculator::new(),
            config,
        })
    }

    /// Same source, different configuration
    pub fn reconfigure(&self, config: AnalyticsConfig) -> AnalyticsResult<Self> {
        Self::with_shared_source(Arc::clone(&self.source), config)
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    async fn history(
        &self,
        scope: &str,
        range: &TimeRange,
    ) -> AnalyticsResult<Vec<ExecutionRecord>> {
        range.validate()?;

        let fetched = self.source.fetch_execution_history(scope, range).await?;
        let fetched_count = fetched.len();
        let records: Vec<ExecutionRecord> = fetched
            .into_iter()
            .filter(|r| range.contains(r.timestamp))
            .collect();

        tracing::debug!(
            "Fetched {} executions for scope {} ({} within range)",
            fetched_count,
            scope,
            records.len()
        );

        Ok(records)
    }

    pub async fn flakiness(
        &self,
        scope: &str,
        range: &TimeRange,
    ) -> AnalyticsResult<FlakinessReport> {
        let records = self.history(scope, range).await?;
        Ok(self.flakiness.analyze(&records))
    }

    /// Quality of the range, optionally compared with the preceding window
    /// of equal length
    pub async fn quality(
        &self,
        scope: &str,
        range: &TimeRange,
        defect_count: Option<u64>,
        compare_previous: bool,
    ) -> AnalyticsResult<QualityReport> {
        let records = self.history(scope, range).await?;

        let previous = if compare_previous {
            let previous_records = self.history(scope, &range.preceding()?).await?;
            Some(self.quality.calculate(&previous_records, None))
        } else {
            None
        };

        Ok(self
            .quality
            .report(&records, defect_count, previous.as_ref(), None))
    }

    pub async fn performance(
        &self,
        scope: &str,
        range: &TimeRange,
    ) -> AnalyticsResult<PerformanceReport> {
        let records = self.history(scope, range).await?;
        let points = performance_points(&records);
        let samples = duration_samples(&records);
        Ok(self.performance.analyze(&points, &samples))
    }

    pub async fn risk(&self, scope: &str) -> AnalyticsResult<RiskReport> {
        let readings = self.source.fetch_risk_factor_readings(scope).await?;
        self.risk.assess(&readings)
    }

    /// Risk assessment with a failure forecast derived from the range's history
    pub async fn risk_forecast(
        &self,
        scope: &str,
        range: &TimeRange,
        horizon_days: u32,
    ) -> AnalyticsResult<RiskReport> {
        let records = self.history(scope, range).await?;
        let readings = self.source.fetch_risk_factor_readings(scope).await?;

        let executed: Vec<&ExecutionRecord> =
            records.iter().filter(|r| r.outcome.is_executed()).collect();
        let failures = executed.iter().filter(|r| r.outcome.is_failure()).count();
        let historical_failure_rate = if executed.is_empty() {
            0.0
        } else {
            failures as f64 / executed.len() as f64
        };

        let input = PredictionInput {
            horizon_days,
            historical_failure_rate,
            sample_size: executed.len(),
        };
        self.risk.assess_with_prediction(&readings, Some(&input))
    }

    pub async fn productivity(
        &self,
        scope: &str,
        range: &TimeRange,
        benchmark: Option<&ProductivityBenchmark>,
        options: ProductivityOptions,
    ) -> AnalyticsResult<ProductivityReport> {
        range.validate()?;
        let actors = self.source.fetch_actor_counters(scope, range).await?;
        Ok(self.productivity.report(&actors, benchmark, options))
    }
}
