//! Report serialization and analytics error mapping for tool calls

use rmcp::{
    model::{CallToolResult, Content},
    ErrorData as McpError,
};
use serde::Serialize;
use serde_json::{json, Value};
use test_analytics::{AnalyticsError, AnalyticsResult};

/// Serialize an analytics report as the tool's pretty-printed JSON body
pub fn report_success<T: Serialize>(tool: &str, report: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(report).map_err(|e| {
        McpError::internal_error(format!("Failed to serialize {} report: {}", tool, e), None)
    })?;
    tracing::debug!("{} returned {} bytes", tool, json.len());
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Malformed tool arguments detected before any analyzer runs
pub fn invalid_params(msg: impl Into<String>) -> McpError {
    McpError::invalid_params(msg.into(), Some(json!({ "kind": "invalid_arguments" })))
}

/// Structured `data` attached to a mapped analytics error
fn error_data(err: &AnalyticsError) -> Value {
    match err {
        AnalyticsError::InvalidRange { start, end } => json!({
            "kind": "invalid_range",
            "start": start,
            "end": end,
        }),
        AnalyticsError::InvalidWeights { sum } => json!({
            "kind": "invalid_weights",
            "sum": sum,
        }),
        AnalyticsError::InvalidConfig(_) => json!({ "kind": "invalid_config" }),
        AnalyticsError::Upstream(_) => json!({ "kind": "upstream" }),
    }
}

/// Map an analytics failure to a protocol error
///
/// Caller errors become `invalid_params` and source failures become
/// `internal_error`. The message is kept and the kind goes into `data`.
pub fn analytics_error(err: AnalyticsError) -> McpError {
    let data = Some(error_data(&err));
    if err.is_caller_error() {
        McpError::invalid_params(err.to_string(), data)
    } else {
        tracing::warn!("Analytics source failed: {}", err);
        McpError::internal_error(err.to_string(), data)
    }
}

/// `.to_mcp_err()` on analytics results
pub trait ResultExt<T> {
    fn to_mcp_err(self) -> Result<T, McpError>;
}

impl<T> ResultExt<T> for AnalyticsResult<T> {
    fn to_mcp_err(self) -> Result<T, McpError> {
        self.map_err(analytics_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use rmcp::model::ErrorCode;

    #[test]
    fn test_inverted_range_carries_bounds() {
        let start = Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap();
        let err = analytics_error(AnalyticsError::InvalidRange {
            start,
            end: start - Duration::days(1),
        });

        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        let data = err.data.unwrap();
        assert_eq!(data["kind"], "invalid_range");
        assert_eq!(data["start"], json!(start));
    }

    #[test]
    fn test_weight_errors_report_the_sum() {
        let err = analytics_error(AnalyticsError::InvalidWeights { sum: 1.2 });
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        assert!(err.message.contains("1.2"));
        assert_eq!(err.data.unwrap()["sum"], json!(1.2));
    }

    #[test]
    fn test_upstream_errors_become_internal() {
        let result: AnalyticsResult<()> =
            Err(AnalyticsError::Upstream("snapshot missing".to_string()));
        let err = result.to_mcp_err().unwrap_err();
        assert_eq!(err.code, ErrorCode::INTERNAL_ERROR);
        assert!(err.message.contains("snapshot missing"));
        assert_eq!(err.data.unwrap()["kind"], "upstream");
    }

    #[test]
    fn test_argument_errors_are_tagged() {
        let err = invalid_params("Either inline data or a scope is required");
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        assert_eq!(err.data.unwrap()["kind"], "invalid_arguments");
    }

    #[test]
    fn test_report_success_has_one_content_block() {
        let result =
            report_success("get_analytics_config", &json!({ "flakiness": {} })).unwrap();
        assert_eq!(result.content.len(), 1);
    }
}
