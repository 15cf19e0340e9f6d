//! Input records shared by every analyzer, plus the folds that reshape a
//! flat execution history into per-test and per-run views.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{AnalyticsError, AnalyticsResult};

/// Outcome of a single test execution
///
/// Accepts the Azure DevOps spellings (`Passed`, `NotExecuted`, ...) on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TestOutcome {
    #[serde(alias = "Passed")]
    Passed,
    #[serde(alias = "Failed")]
    Failed,
    #[serde(alias = "Blocked")]
    Blocked,
    #[serde(alias = "NotExecuted")]
    NotExecuted,
    #[serde(alias = "Warning")]
    Warning,
    #[serde(alias = "Error")]
    Error,
}

impl TestOutcome {
    /// The test actually ran (blocked and skipped executions did not)
    pub fn is_executed(self) -> bool {
        !matches!(self, TestOutcome::Blocked | TestOutcome::NotExecuted)
    }

    pub fn is_failure(self) -> bool {
        matches!(self, TestOutcome::Failed | TestOutcome::Error)
    }

    pub fn is_pass(self) -> bool {
        self == TestOutcome::Passed
    }
}

/// One test execution outcome as fetched from the test-management backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExecutionRecord {
    /// Test case identifier
    pub test_id: i64,
    pub outcome: TestOutcome,
    /// Execution duration in milliseconds, when recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    pub timestamp: DateTime<Utc>,
    /// Test run the execution belongs to
    pub run_id: i64,
    #[serde(default)]
    pub is_automated: bool,
}

/// Aggregate timing of one test run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PerformanceDataPoint {
    pub run_id: i64,
    pub timestamp: DateTime<Utc>,
    /// Total execution time of the run in milliseconds
    pub execution_time_ms: f64,
    /// Executions per minute
    pub throughput: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_usage: Option<f64>,
}

/// Direction of a metric over time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

/// Half-open time window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Create a validated range
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> AnalyticsResult<Self> {
        let range = Self { start, end };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> AnalyticsResult<()> {
        if self.start >= self.end {
            return Err(AnalyticsError::InvalidRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.start && timestamp < self.end
    }

    /// The window of equal length that ends where this one starts
    ///
    /// Fails with `InvalidRange` when that window would begin before the
    /// earliest representable instant.
    pub fn preceding(&self) -> AnalyticsResult<Self> {
        let length = self.end.signed_duration_since(self.start);
        match self.start.checked_sub_signed(length) {
            Some(start) => Self::new(start, self.start),
            None => Err(AnalyticsError::InvalidRange {
                start: self.start,
                end: self.end,
            }),
        }
    }
}

/// Fold a flat history into chronologically ordered per-test groups
///
/// The map is built fresh on every call and owned by the caller.
pub fn group_by_test(records: &[ExecutionRecord]) -> BTreeMap<i64, Vec<ExecutionRecord>> {
    let mut groups = records
        .iter()
        .fold(BTreeMap::new(), |mut acc: BTreeMap<i64, Vec<ExecutionRecord>>, record| {
            acc.entry(record.test_id).or_default().push(record.clone());
            acc
        });

    for group in groups.values_mut() {
        group.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.run_id.cmp(&b.run_id)));
    }

    groups
}

/// Per-run accumulator used by the run-level folds
struct RunTally {
    first_seen: DateTime<Utc>,
    total: usize,
    passed: usize,
    timed: usize,
    duration_ms: u64,
}

/// Group records by run, ordered by each run's earliest timestamp
fn tally_runs(records: &[ExecutionRecord]) -> Vec<(i64, RunTally)> {
    let mut runs: BTreeMap<i64, RunTally> = BTreeMap::new();

    for record in records {
        let tally = runs.entry(record.run_id).or_insert(RunTally {
            first_seen: record.timestamp,
            total: 0,
            passed: 0,
            timed: 0,
            duration_ms: 0,
        });
        tally.first_seen = tally.first_seen.min(record.timestamp);
        tally.total += 1;
        if record.outcome.is_pass() {
            tally.passed += 1;
        }
        if let Some(duration) = record.duration_ms {
            tally.timed += 1;
            tally.duration_ms = tally.duration_ms.saturating_add(duration);
        }
    }

    let mut ordered: Vec<(i64, RunTally)> = runs.into_iter().collect();
    ordered.sort_by(|(id_a, a), (id_b, b)| a.first_seen.cmp(&b.first_seen).then(id_a.cmp(id_b)));
    ordered
}

/// Pass-rate percentage of every run, in run order
pub fn pass_rate_series(records: &[ExecutionRecord]) -> Vec<f64> {
    tally_runs(records)
        .into_iter()
        .map(|(_, tally)| tally.passed as f64 / tally.total as f64 * 100.0)
        .collect()
}

/// Derive one performance data point per run from raw executions
pub fn performance_points(records: &[ExecutionRecord]) -> Vec<PerformanceDataPoint> {
    tally_runs(records)
        .into_iter()
        .map(|(run_id, tally)| {
            let throughput = if tally.duration_ms == 0 {
                0.0
            } else {
                tally.timed as f64 / (tally.duration_ms as f64 / 60_000.0)
            };
            PerformanceDataPoint {
                run_id,
                timestamp: tally.first_seen,
                execution_time_ms: tally.duration_ms as f64,
                throughput,
                resource_usage: None,
            }
        })
        .collect()
}

/// Chronological duration samples per test case
pub fn duration_samples(records: &[ExecutionRecord]) -> BTreeMap<i64, Vec<u64>> {
    group_by_test(records)
        .into_iter()
        .filter_map(|(test_id, group)| {
            let samples: Vec<u64> = group.iter().filter_map(|r| r.duration_ms).collect();
            (!samples.is_empty()).then_some((test_id, samples))
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::{Duration, TimeZone};

    pub fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    pub fn record(test_id: i64, outcome: TestOutcome, minutes: i64) -> ExecutionRecord {
        ExecutionRecord {
            test_id,
            outcome,
            duration_ms: Some(1_000),
            timestamp: base_time() + Duration::minutes(minutes),
            run_id: minutes,
            is_automated: true,
        }
    }

    /// History for one test built from a pass/fail pattern
    pub fn history(test_id: i64, pattern: &[bool]) -> Vec<ExecutionRecord> {
        pattern
            .iter()
            .enumerate()
            .map(|(i, passed)| {
                let outcome = if *passed {
                    TestOutcome::Passed
                } else {
                    TestOutcome::Failed
                };
                record(test_id, outcome, i as i64)
            })
            .collect()
    }
}
