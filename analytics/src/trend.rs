//! Shared trend utilities: least-squares slope and two-period comparison

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default relative change below which two periods are considered equal
pub const DEFAULT_STABILIZATION_THRESHOLD: f64 = 0.05;

/// Classification of a two-period comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PeriodTrend {
    Improving,
    Declining,
    Stable,
    InsufficientData,
}

/// Result of comparing the first and second half of a series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TwoPeriodTrend {
    pub trend: PeriodTrend,
    /// Relative change `(second - first) / first`
    pub change_percentage: f64,
    pub first_avg: f64,
    pub second_avg: f64,
}

impl TwoPeriodTrend {
    fn insufficient(first_avg: f64, second_avg: f64) -> Self {
        Self {
            trend: PeriodTrend::InsufficientData,
            change_percentage: 0.0,
            first_avg,
            second_avg,
        }
    }
}

/// Ordinary least-squares slope of `values` against their index
///
/// Returns 0 for fewer than two values.
pub fn linear_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }

    let n_f = n as f64;
    let (sum_x, sum_y, sum_xy, sum_x2) = values.iter().enumerate().fold(
        (0.0, 0.0, 0.0, 0.0),
        |(sx, sy, sxy, sx2), (i, y)| {
            let x = i as f64;
            (sx + x, sy + y, sxy + x * y, sx2 + x * x)
        },
    );

    let denominator = n_f * sum_x2 - sum_x * sum_x;
    if denominator == 0.0 {
        return 0.0;
    }

    (n_f * sum_xy - sum_x * sum_y) / denominator
}

/// Split point of a series; the first half takes the extra element
pub(crate) fn split_index(len: usize) -> usize {
    len.div_ceil(2)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Compare the mean of the first half of a series with the second half
///
/// - Improving: change above `+threshold`
/// - Declining: change below `-threshold`
/// - Stable: otherwise
pub fn two_period_trend(values: &[f64], stabilization_threshold: f64) -> TwoPeriodTrend {
    if values.len() < 2 {
        return TwoPeriodTrend::insufficient(0.0, 0.0);
    }

    let (first, second) = values.split_at(split_index(values.len()));
    let first_avg = mean(first);
    let second_avg = mean(second);

    if first_avg == 0.0 {
        return TwoPeriodTrend::insufficient(first_avg, second_avg);
    }

    let change_percentage = (second_avg - first_avg) / first_avg;
    let trend = if change_percentage > stabilization_threshold {
        PeriodTrend::Improving
    } else if change_percentage < -stabilization_threshold {
        PeriodTrend::Declining
    } else {
        PeriodTrend::Stable
    };

    TwoPeriodTrend {
        trend,
        change_percentage,
        first_avg,
        second_avg,
    }
}
