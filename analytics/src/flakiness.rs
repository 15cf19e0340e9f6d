//! Per-test-case flakiness scoring
//!
//! A test is flaky when its outcome is unpredictable, not when it fails
//! often. The score is the symmetric instability measure
//! `1 - |2 * failure_rate - 1|`: zero for tests that always pass or always
//! fail, one for tests that fail exactly half the time.
//!
//! Confidence comes from the binomial-proportion margin of error of the
//! observed failure rate. Tests with fewer than `min_executions` executed
//! outcomes get a neutral result flagged `insufficient_data`.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ensure_within, AnalyticsError, AnalyticsResult};
use crate::trend::split_index;
use crate::types::{group_by_test, ExecutionRecord, TrendDirection};

/// Minimum score for a test to be flagged
pub const FLAKY_SCORE_THRESHOLD: f64 = 0.1;

/// Failure-rate difference between history halves that counts as a trend
pub const TREND_THRESHOLD: f64 = 0.1;

/// (confidence level, z) anchors for interpolation
///
/// Levels between 0.85 and 0.95 lie on a single straight segment.
const Z_TABLE: [(f64, f64); 4] = [(0.80, 1.282), (0.85, 1.44), (0.95, 1.96), (0.99, 2.576)];

/// Flakiness analysis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FlakinessConfig {
    /// Executions required before a test is scored
    #[serde(default = "default_min_executions")]
    pub min_executions: usize,

    /// Required confidence in [0.8, 0.99]
    #[serde(default = "default_confidence_level")]
    pub confidence_level: f64,
}

fn default_min_executions() -> usize {
    5
}

fn default_confidence_level() -> f64 {
    0.85
}

impl Default for FlakinessConfig {
    fn default() -> Self {
        Self {
            min_executions: default_min_executions(),
            confidence_level: default_confidence_level(),
        }
    }
}

impl FlakinessConfig {
    pub fn validate(&self) -> AnalyticsResult<()> {
        if self.min_executions == 0 {
            return Err(AnalyticsError::InvalidConfig(
                "min_executions must be at least 1".to_string(),
            ));
        }
        ensure_within("confidence_level", self.confidence_level, 0.8, 0.99)
    }
}

/// Flakiness verdict for one test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FlakinessResult {
    pub test_id: i64,
    /// Executed outcomes (blocked and not-executed records are ignored)
    pub total_executions: usize,
    pub failures: usize,
    pub passes: usize,
    pub failure_rate: f64,
    pub flakiness_score: f64,
    pub confidence: f64,
    pub is_flaky: bool,
    pub trend: TrendDirection,
    /// Fewer executions than `min_executions`; score and confidence are 0
    pub insufficient_data: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_seen: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
}

/// Aggregated flakiness across many test cases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FlakinessReport {
    pub analyzed_count: usize,
    pub flaky_count: usize,
    /// Percentage of analyzed tests flagged flaky
    pub flakiness_rate: f64,
    /// Mean score over flagged tests only
    pub average_score: f64,
    pub insufficient_data_count: usize,
    /// Sorted by descending score, then ascending test id
    pub results: Vec<FlakinessResult>,
}

impl FlakinessReport {
    /// Drop every result that is not flagged flaky
    pub fn flaky_only(mut self) -> Self {
        self.results.retain(|r| r.is_flaky);
        self
    }
}

/// Symmetric instability score for a failure rate
pub fn flakiness_score(failure_rate: f64) -> f64 {
    1.0 - (2.0 * failure_rate - 1.0).abs()
}

/// Two-sided z value for a confidence level, linearly interpolated
pub fn z_for_level(level: f64) -> f64 {
    let (first_level, first_z) = Z_TABLE[0];
    if level <= first_level {
        return first_z;
    }

    for pair in Z_TABLE.windows(2) {
        let (lo, z_lo) = pair[0];
        let (hi, z_hi) = pair[1];
        if level <= hi {
            return z_lo + (level - lo) / (hi - lo) * (z_hi - z_lo);
        }
    }

    Z_TABLE[Z_TABLE.len() - 1].1
}

/// Confidence that the observed failure rate is not sampling noise
pub fn confidence(failure_rate: f64, executions: usize, level: f64) -> f64 {
    if executions == 0 {
        return 0.0;
    }
    let variance = failure_rate * (1.0 - failure_rate) / executions as f64;
    let margin = z_for_level(level) * variance.sqrt();
    (1.0 - 2.0 * margin).clamp(0.0, 1.0)
}

fn failure_rate_of(records: &[&ExecutionRecord]) -> Option<f64> {
    if records.is_empty() {
        return None;
    }
    let failures = records.iter().filter(|r| r.outcome.is_failure()).count();
    Some(failures as f64 / records.len() as f64)
}

/// Scores flakiness for individual tests and whole histories
#[derive(Debug, Clone, Default)]
pub struct FlakinessAnalyzer {
    config: FlakinessConfig,
}

impl FlakinessAnalyzer {
    pub fn new(config: FlakinessConfig) -> AnalyticsResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FlakinessConfig {
        &self.config
    }

    /// Score one test from its chronologically ordered history
    pub fn analyze_test(&self, test_id: i64, history: &[ExecutionRecord]) -> FlakinessResult {
        let executed: Vec<&ExecutionRecord> =
            history.iter().filter(|r| r.outcome.is_executed()).collect();
        let total = executed.len();
        let failures = executed.iter().filter(|r| r.outcome.is_failure()).count();
        let passes = executed.iter().filter(|r| r.outcome.is_pass()).count();
        let first_seen = history.iter().map(|r| r.timestamp).min();
        let last_seen = history.iter().map(|r| r.timestamp).max();

        let failure_rate = if total == 0 {
            0.0
        } else {
            failures as f64 / total as f64
        };

        if total == 0 || total < self.config.min_executions {
            tracing::debug!(
                "Test {} has {} executions (< {}), skipping scoring",
                test_id,
                total,
                self.config.min_executions
            );
            return FlakinessResult {
                test_id,
                total_executions: total,
                failures,
                passes,
                failure_rate,
                flakiness_score: 0.0,
                confidence: 0.0,
                is_flaky: false,
                trend: TrendDirection::Stable,
                insufficient_data: true,
                first_seen,
                last_seen,
            };
        }

        let score = flakiness_score(failure_rate);
        let confidence = confidence(failure_rate, total, self.config.confidence_level);
        let is_flaky = score > FLAKY_SCORE_THRESHOLD
            && failure_rate > 0.0
            && failure_rate < 1.0
            && confidence >= self.config.confidence_level;

        FlakinessResult {
            test_id,
            total_executions: total,
            failures,
            passes,
            failure_rate,
            flakiness_score: score,
            confidence,
            is_flaky,
            trend: Self::failure_trend(&executed),
            insufficient_data: false,
            first_seen,
            last_seen,
        }
    }

    /// Compare failure rates of the earlier and later half of the history
    fn failure_trend(executed: &[&ExecutionRecord]) -> TrendDirection {
        let (first, second) = executed.split_at(split_index(executed.len()));
        match (failure_rate_of(first), failure_rate_of(second)) {
            (Some(before), Some(after)) if after - before > TREND_THRESHOLD => {
                TrendDirection::Increasing
            }
            (Some(before), Some(after)) if before - after > TREND_THRESHOLD => {
                TrendDirection::Decreasing
            }
            _ => TrendDirection::Stable,
        }
    }

    /// Score every test in a flat execution history
    ///
    /// Groups are scored in parallel and merged with a single sort, so the
    /// ordering does not depend on the degree of parallelism.
    pub fn analyze(&self, records: &[ExecutionRecord]) -> FlakinessReport {
        let groups = group_by_test(records);

        let mut results: Vec<FlakinessResult> = groups
            .par_iter()
            .map(|(test_id, history)| self.analyze_test(*test_id, history))
            .collect();

        results.sort_by(|a, b| {
            b.flakiness_score
                .total_cmp(&a.flakiness_score)
                .then(a.test_id.cmp(&b.test_id))
        });

        let analyzed_count = results.len();
        let flagged: Vec<f64> = results
            .iter()
            .filter(|r| r.is_flaky)
            .map(|r| r.flakiness_score)
            .collect();
        let flaky_count = flagged.len();
        let insufficient_data_count = results.iter().filter(|r| r.insufficient_data).count();

        let flakiness_rate = if analyzed_count == 0 {
            0.0
        } else {
            flaky_count as f64 / analyzed_count as f64 * 100.0
        };
        let average_score = if flaky_count == 0 {
            0.0
        } else {
            flagged.iter().sum::<f64>() / flaky_count as f64
        };

        tracing::info!(
            "Flakiness analysis: {} tests analyzed, {} flaky, {} with insufficient data",
            analyzed_count,
            flaky_count,
            insufficient_data_count
        );

        FlakinessReport {
            analyzed_count,
            flaky_count,
            flakiness_rate,
            average_score,
            insufficient_data_count,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::fixtures::{history, record};
    use crate::types::TestOutcome;

    fn analyzer() -> FlakinessAnalyzer {
        FlakinessAnalyzer::default()
    }

    #[test]
    fn test_score_is_symmetric() {
        assert_eq!(flakiness_score(0.0), 0.0);
        assert_eq!(flakiness_score(1.0), 0.0);
        assert_eq!(flakiness_score(0.5), 1.0);
        assert!((flakiness_score(0.2) - flakiness_score(0.8)).abs() < 1e-12);
    }

    #[test]
    fn test_z_interpolation() {
        assert!((z_for_level(0.85) - 1.44).abs() < 1e-12);
        assert!((z_for_level(0.95) - 1.96).abs() < 1e-12);
        assert!((z_for_level(0.90) - 1.70).abs() < 1e-9);
        assert!((z_for_level(0.875) - 1.57).abs() < 1e-9);
    }

    #[test]
    fn test_intermediate_level_uses_linear_z() {
        // 25 failures in 100: sqrt(0.25 * 0.75 / 100) ~ 0.0433
        let pattern: Vec<bool> = (0..100).map(|i| i % 4 != 0).collect();
        let records = history(3, &pattern);

        let strict = FlakinessAnalyzer::new(FlakinessConfig {
            confidence_level: 0.90,
            ..Default::default()
        })
        .unwrap();
        let result = strict.analyze_test(3, &records);
        // 1 - 2 * 1.70 * 0.0433
        assert!((result.confidence - 0.852_775_7).abs() < 1e-6);
        assert!(!result.is_flaky);

        // 1 - 2 * 1.44 * 0.0433 ~ 0.875 clears the default level
        let result = analyzer().analyze_test(3, &records);
        assert!(result.confidence >= 0.85);
        assert!(result.is_flaky);
    }

    #[test]
    fn test_alternating_history_scores_one() {
        let pattern: Vec<bool> = (0..10).map(|i| i % 2 == 0).collect();
        let result = analyzer().analyze_test(1, &history(1, &pattern));

        assert_eq!(result.total_executions, 10);
        assert_eq!(result.failure_rate, 0.5);
        assert_eq!(result.flakiness_score, 1.0);
        // margin = 1.44 * sqrt(0.025) ~ 0.228, so confidence ~ 0.545 < 0.85
        assert!((result.confidence - 0.5446).abs() < 1e-3);
        assert!(!result.is_flaky);
        // halves are P F P F P | F P F P F: 0.4 -> 0.6
        assert_eq!(result.trend, TrendDirection::Increasing);
    }

    #[test]
    fn test_large_unstable_history_is_flaky() {
        // 1 failure in 4 over 400 executions: margin ~ 0.031, confidence ~ 0.94
        let pattern: Vec<bool> = (0..400).map(|i| i % 4 != 0).collect();
        let result = analyzer().analyze_test(7, &history(7, &pattern));

        assert_eq!(result.failure_rate, 0.25);
        assert!((result.flakiness_score - 0.5).abs() < 1e-12);
        assert!(result.confidence > 0.9);
        assert!(result.is_flaky);
    }

    #[test]
    fn test_all_pass_is_not_flaky() {
        let result = analyzer().analyze_test(1, &history(1, &[true; 20]));
        assert_eq!(result.flakiness_score, 0.0);
        assert_eq!(result.confidence, 1.0);
        assert!(!result.is_flaky);
    }

    #[test]
    fn test_insufficient_history_is_neutral() {
        let result = analyzer().analyze_test(1, &history(1, &[true, false, true, false]));
        assert!(result.insufficient_data);
        assert_eq!(result.flakiness_score, 0.0);
        assert_eq!(result.confidence, 0.0);
        assert!(!result.is_flaky);
    }

    #[test]
    fn test_unexecuted_outcomes_are_ignored() {
        let mut records = history(1, &[true, false, true, false, true]);
        records.push(record(1, TestOutcome::Blocked, 10));
        records.push(record(1, TestOutcome::NotExecuted, 11));

        let result = analyzer().analyze_test(1, &records);
        assert_eq!(result.total_executions, 5);
        assert_eq!(result.failures, 2);
    }

    #[test]
    fn test_failure_trend() {
        let worsening = [true, true, true, true, true, false, false, false, false, false];
        let result = analyzer().analyze_test(1, &history(1, &worsening));
        assert_eq!(result.trend, TrendDirection::Increasing);

        let recovering = [false, false, false, false, false, true, true, true, true, true];
        let result = analyzer().analyze_test(1, &history(1, &recovering));
        assert_eq!(result.trend, TrendDirection::Decreasing);
    }

    #[test]
    fn test_report_sorting_and_summary() {
        let mut records = history(1, &[true; 10]);
        records.extend(history(2, &(0..10).map(|i| i % 2 == 0).collect::<Vec<_>>()));
        records.extend(history(3, &[true, false]));

        let report = analyzer().analyze(&records);
        assert_eq!(report.analyzed_count, 3);
        assert_eq!(report.insufficient_data_count, 1);
        assert_eq!(report.results[0].test_id, 2);
        assert_eq!(
            report.results.iter().map(|r| r.test_id).collect::<Vec<_>>(),
            vec![2, 1, 3]
        );
        assert_eq!(report.flaky_count, 0);
        assert_eq!(report.average_score, 0.0);
        assert_eq!(report.flakiness_rate, 0.0);
    }

    #[test]
    fn test_report_average_over_flagged_only() {
        let mut records: Vec<ExecutionRecord> =
            history(1, &(0..400).map(|i| i % 4 != 0).collect::<Vec<_>>());
        records.extend(history(2, &[true; 10]));

        let report = analyzer().analyze(&records).flaky_only();
        assert_eq!(report.flaky_count, 1);
        assert!((report.average_score - 0.5).abs() < 1e-12);
        assert!((report.flakiness_rate - 50.0).abs() < 1e-12);
        assert_eq!(report.results.len(), 1);
    }

    #[test]
    fn test_config_validation() {
        let config = FlakinessConfig {
            confidence_level: 0.5,
            ..Default::default()
        };
        assert!(FlakinessAnalyzer::new(config).is_err());

        let config = FlakinessConfig {
            min_executions: 0,
            ..Default::default()
        };
        assert!(FlakinessAnalyzer::new(config).is_err());
    }
}
