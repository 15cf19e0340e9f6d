//! Handler implementations for test analytics MCP tools
//!
//! Handlers return typed reports; the server serializes them.

use chrono::{DateTime, Duration, Utc};
use rmcp::ErrorData as McpError;
use test_analytics::{
    duration_samples, performance_points, AnalyticsConfig, ExecutionRecord, FlakinessAnalyzer,
    FlakinessReport, PerformanceDataPoint, PerformanceReport, PerformanceTrendAnalyzer,
    ProductivityCalculator, ProductivityOptions, ProductivityReport, QualityMetricsCalculator,
    QualityReport, RiskAssessmentEngine, RiskReport, TimeRange,
};
use std::collections::BTreeMap;

use crate::params::*;
use crate::response::{invalid_params, ResultExt};
use crate::server::TestAnalyticsMcpServer;

/// Where a call's data comes from
enum DataInput<T> {
    Inline(T),
    Scoped { scope: String, range: TimeRange },
}

fn resolve<T>(
    server: &TestAnalyticsMcpServer,
    inline: Option<T>,
    window: &ScopeParams,
) -> Result<DataInput<T>, McpError> {
    match (inline, window.scope.as_deref()) {
        (Some(_), Some(_)) => Err(invalid_params(
            "Provide either inline data or a scope, not both",
        )),
        (Some(data), None) => Ok(DataInput::Inline(data)),
        (None, Some(scope)) => {
            let range = scoped_range(server, window)?;
            tracing::debug!("Resolved scope {} over {} .. {}", scope, range.start, range.end);
            Ok(DataInput::Scoped {
                scope: scope.to_string(),
                range,
            })
        }
        (None, None) => Err(invalid_params(
            "Either inline data or a scope is required",
        )),
    }
}

/// `end` defaults to now and `start` to the configured lookback before it
fn scoped_range(
    server: &TestAnalyticsMcpServer,
    window: &ScopeParams,
) -> Result<TimeRange, McpError> {
    let end = window.end.unwrap_or_else(Utc::now);
    let start = match window.start {
        Some(start) => start,
        None => {
            let lookback = Duration::days(i64::from(server.config.snapshots.default_lookback_days));
            end.checked_sub_signed(lookback).ok_or_else(|| {
                invalid_params(format!(
                    "No start given and the default lookback from {} precedes the earliest date",
                    end
                ))
            })?
        }
    };
    TimeRange::new(start, end).to_mcp_err()
}

/// Range restricting inline data, present only when `start` or `end` is given
fn inline_range(window: &ScopeParams) -> Result<Option<TimeRange>, McpError> {
    if window.start.is_none() && window.end.is_none() {
        return Ok(None);
    }
    let start = window.start.unwrap_or(DateTime::<Utc>::MIN_UTC);
    let end = window.end.unwrap_or(DateTime::<Utc>::MAX_UTC);
    TimeRange::new(start, end).to_mcp_err().map(Some)
}

fn filter_records(
    records: Vec<ExecutionRecord>,
    window: &ScopeParams,
) -> Result<Vec<ExecutionRecord>, McpError> {
    Ok(match inline_range(window)? {
        Some(range) => records
            .into_iter()
            .filter(|r| range.contains(r.timestamp))
            .collect(),
        None => records,
    })
}

/// Analyze flakiness
pub async fn analyze_flakiness(
    server: &TestAnalyticsMcpServer,
    params: AnalyzeFlakinessParams,
) -> Result<FlakinessReport, McpError> {
    let mut config = server.analytics_config().clone();
    if let Some(min_executions) = params.min_executions {
        config.flakiness.min_executions = min_executions;
    }
    if let Some(level) = params.confidence_level {
        config.flakiness.confidence_level = level;
    }

    let report = match resolve(server, params.records, &params.window)? {
        DataInput::Inline(records) => {
            let records = filter_records(records, &params.window)?;
            FlakinessAnalyzer::new(config.flakiness)
                .to_mcp_err()?
                .analyze(&records)
        }
        DataInput::Scoped { scope, range } => server
            .engine(config)?
            .flakiness(&scope, &range)
            .await
            .to_mcp_err()?,
    };

    Ok(if params.flaky_only {
        report.flaky_only()
    } else {
        report
    })
}

/// Calculate quality metrics
pub async fn calculate_quality_metrics(
    server: &TestAnalyticsMcpServer,
    params: CalculateQualityParams,
) -> Result<QualityReport, McpError> {
    let config = server.analytics_config().clone();

    match resolve(server, params.records, &params.window)? {
        DataInput::Inline(records) => {
            let records = filter_records(records, &params.window)?;
            let calculator = QualityMetricsCalculator::new(config.quality).to_mcp_err()?;
            Ok(calculator.report(
                &records,
                params.defect_count,
                params.previous.as_ref(),
                params.series.as_deref(),
            ))
        }
        DataInput::Scoped { scope, range } => {
            if params.previous.is_some() || params.series.is_some() {
                return Err(invalid_params(
                    "previous and series apply to inline records; use compare_previous with a scope",
                ));
            }
            server
                .engine(config)?
                .quality(&scope, &range, params.defect_count, params.compare_previous)
                .await
                .to_mcp_err()
        }
    }
}

/// Inline performance data in either shape
enum PerformanceInput {
    Records(Vec<ExecutionRecord>),
    Series {
        points: Vec<PerformanceDataPoint>,
        durations: BTreeMap<i64, Vec<u64>>,
    },
}

/// Samples keyed by test id; repeated ids are concatenated
fn merge_durations(entries: Vec<TestDurations>) -> BTreeMap<i64, Vec<u64>> {
    let mut samples: BTreeMap<i64, Vec<u64>> = BTreeMap::new();
    for entry in entries {
        samples
            .entry(entry.test_id)
            .or_default()
            .extend(entry.durations_ms);
    }
    samples
}

/// Analyze performance trends
pub async fn analyze_performance_trends(
    server: &TestAnalyticsMcpServer,
    params: AnalyzePerformanceParams,
) -> Result<PerformanceReport, McpError> {
    let mut config = server.analytics_config().clone();
    if let Some(threshold) = params.slow_test_threshold_ms {
        config.performance.slow_test_threshold_ms = threshold;
    }
    if let Some(sensitivity) = params.regression_sensitivity {
        config.performance.regression_sensitivity = sensitivity;
    }
    if let Some(percentile) = params.bottleneck_percentile {
        config.performance.bottleneck_percentile = percentile;
    }

    let inline = match (params.records, params.data_points, params.durations) {
        (None, None, None) => None,
        (Some(records), None, None) => Some(PerformanceInput::Records(records)),
        (None, points, durations) => Some(PerformanceInput::Series {
            points: points.unwrap_or_default(),
            durations: merge_durations(durations.unwrap_or_default()),
        }),
        _ => {
            return Err(invalid_params(
                "Provide either records or data_points/durations, not both",
            ))
        }
    };

    match resolve(server, inline, &params.window)? {
        DataInput::Inline(input) => {
            let analyzer = PerformanceTrendAnalyzer::new(config.performance).to_mcp_err()?;
            match input {
                PerformanceInput::Records(records) => {
                    let records = filter_records(records, &params.window)?;
                    Ok(analyzer.analyze(
                        &performance_points(&records),
                        &duration_samples(&records),
                    ))
                }
                PerformanceInput::Series { points, durations } => {
                    let points: Vec<PerformanceDataPoint> = match inline_range(&params.window)? {
                        Some(range) => points
                            .into_iter()
                            .filter(|p| range.contains(p.timestamp))
                            .collect(),
                        None => points,
                    };
                    Ok(analyzer.analyze(&points, &durations))
                }
            }
        }
        DataInput::Scoped { scope, range } => server
            .engine(config)?
            .performance(&scope, &range)
            .await
            .to_mcp_err(),
    }
}

/// Assess risk, optionally with a failure forecast
pub async fn assess_risk(
    server: &TestAnalyticsMcpServer,
    params: AssessRiskParams,
) -> Result<RiskReport, McpError> {
    let mut config = server.analytics_config().clone();
    if let Some(weights) = params.weights {
        config.risk.weights = weights;
    }
    if let Some(thresholds) = params.thresholds {
        config.risk.thresholds = thresholds;
    }

    match resolve(server, params.readings, &params.window)? {
        DataInput::Inline(readings) => {
            let readings = match params.defect_density {
                Some(density) => readings.with_defect_density(density),
                None => readings,
            };
            let prediction = match (params.prediction, params.horizon_days) {
                (Some(mut input), Some(horizon_days)) => {
                    input.horizon_days = horizon_days;
                    Some(input)
                }
                (Some(input), None) => Some(input),
                (None, Some(_)) => {
                    return Err(invalid_params(
                        "horizon_days with inline readings requires prediction inputs",
                    ))
                }
                (None, None) => None,
            };

            RiskAssessmentEngine::new(config.risk)
                .to_mcp_err()?
                .assess_with_prediction(&readings, prediction.as_ref())
                .to_mcp_err()
        }
        DataInput::Scoped { scope, range } => {
            if params.defect_density.is_some() || params.prediction.is_some() {
                return Err(invalid_params(
                    "defect_density and prediction apply to inline readings only",
                ));
            }
            let engine = server.engine(config)?;
            let report = match params.horizon_days {
                Some(horizon_days) => engine.risk_forecast(&scope, &range, horizon_days).await,
                None => engine.risk(&scope).await,
            };
            report.to_mcp_err()
        }
    }
}

/// Calculate team and individual productivity
pub async fn calculate_productivity(
    server: &TestAnalyticsMcpServer,
    params: CalculateProductivityParams,
) -> Result<ProductivityReport, McpError> {
    let options = ProductivityOptions {
        include_individuals: params.include_individuals,
        anonymize: params.anonymize,
    };

    match resolve(server, params.actors, &params.window)? {
        DataInput::Inline(actors) => {
            Ok(ProductivityCalculator::new().report(&actors, params.benchmark.as_ref(), options))
        }
        DataInput::Scoped { scope, range } => server
            .engine(server.analytics_config().clone())?
            .productivity(&scope, &range, params.benchmark.as_ref(), options)
            .await
            .to_mcp_err(),
    }
}

/// Effective analyzer configuration, the baseline for per-call overrides
pub async fn get_analytics_config(server: &TestAnalyticsMcpServer) -> AnalyticsConfig {
    server.analytics_config().clone()
}
