//! Property tests for analyzer invariants

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use test_analytics::flakiness::flakiness_score;
use test_analytics::performance::RegressionSeverity;
use test_analytics::risk::{RiskWeights, WEIGHT_TOLERANCE};
use test_analytics::{
    two_period_trend, ExecutionRecord, FlakinessAnalyzer, FlakinessConfig, PeriodTrend,
    QualityMetricsCalculator, TestOutcome,
};

fn outcome_strategy() -> impl Strategy<Value = TestOutcome> {
    prop_oneof![
        Just(TestOutcome::Passed),
        Just(TestOutcome::Failed),
        Just(TestOutcome::Blocked),
        Just(TestOutcome::NotExecuted),
        Just(TestOutcome::Warning),
        Just(TestOutcome::Error),
    ]
}

fn records(outcomes: &[(TestOutcome, bool)]) -> Vec<ExecutionRecord> {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    outcomes
        .iter()
        .enumerate()
        .map(|(i, (outcome, automated))| ExecutionRecord {
            test_id: 1,
            outcome: *outcome,
            duration_ms: Some(500),
            timestamp: base + Duration::minutes(i as i64),
            run_id: i as i64,
            is_automated: *automated,
        })
        .collect()
}

proptest! {
    #[test]
    fn short_histories_are_never_flaky(
        outcomes in prop::collection::vec((outcome_strategy(), any::<bool>()), 0..5)
    ) {
        let analyzer = FlakinessAnalyzer::new(FlakinessConfig::default()).unwrap();
        let result = analyzer.analyze_test(1, &records(&outcomes));
        prop_assert_eq!(result.flakiness_score, 0.0);
        prop_assert!(!result.is_flaky);
    }

    #[test]
    fn flakiness_score_is_symmetric(p in 0.0f64..=1.0) {
        prop_assert!((flakiness_score(p) - flakiness_score(1.0 - p)).abs() < 1e-12);
        prop_assert!((0.0..=1.0).contains(&flakiness_score(p)));
    }

    #[test]
    fn quality_rates_stay_in_percent_range(
        outcomes in prop::collection::vec((outcome_strategy(), any::<bool>()), 1..200)
    ) {
        let metrics = QualityMetricsCalculator::default().calculate(&records(&outcomes), None);
        prop_assert!((0.0..=100.0).contains(&metrics.pass_rate));
        prop_assert!((0.0..=100.0).contains(&metrics.automation_rate));
    }

    #[test]
    fn equal_halves_are_stable(value in 0.1f64..1000.0, half in 1usize..20) {
        let series = vec![value; half * 2];
        prop_assert_eq!(two_period_trend(&series, 0.05).trend, PeriodTrend::Stable);
    }

    #[test]
    fn regression_severity_is_monotonic(a in 0.0f64..2.0, b in 0.0f64..2.0) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(RegressionSeverity::from_change(low) <= RegressionSeverity::from_change(high));
    }

    #[test]
    fn weights_off_by_more_than_tolerance_fail(delta in 0.001f64..0.2) {
        let weights = RiskWeights {
            test_coverage: 0.25 - delta,
            ..Default::default()
        };
        prop_assert!((weights.sum() - 1.0).abs() > WEIGHT_TOLERANCE);
        prop_assert!(weights.validate().is_err());
    }
}
