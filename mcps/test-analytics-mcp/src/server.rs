//! Test Analytics MCP server implementation

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError,
};
use std::sync::Arc;
use test_analytics::{AnalyticsConfig, TestAnalyticsEngine};

use crate::config::ServerConfig;
use crate::handlers;
use crate::params::*;
use crate::response::{invalid_params, report_success, ResultExt};
use crate::snapshot::JsonSnapshotSource;

/// Test Analytics MCP server
#[derive(Clone)]
pub struct TestAnalyticsMcpServer {
    pub config: Arc<ServerConfig>,
    source: Option<Arc<JsonSnapshotSource>>,
    tool_router: ToolRouter<Self>,
}

impl TestAnalyticsMcpServer {
    /// Create a server from an already validated configuration
    pub fn new(config: ServerConfig) -> Self {
        let source = config.snapshots.dir.as_ref().map(|dir| {
            tracing::info!("Reading scope snapshots from: {}", dir.display());
            Arc::new(JsonSnapshotSource::new(dir))
        });

        if source.is_none() {
            tracing::info!("No snapshot directory configured, accepting inline data only");
        }

        Self {
            config: Arc::new(config),
            source,
            tool_router: Self::tool_router(),
        }
    }

    pub fn analytics_config(&self) -> &AnalyticsConfig {
        &self.config.analytics
    }

    /// Engine over the snapshot source with a per-call configuration
    pub(crate) fn engine(
        &self,
        config: AnalyticsConfig,
    ) -> Result<TestAnalyticsEngine<JsonSnapshotSource>, McpError> {
        let source = self.source.as_ref().ok_or_else(|| {
            invalid_params(
                "Scoped analysis needs a snapshot directory; set [snapshots] dir or TEST_ANALYTICS_DATA_DIR, or pass data inline",
            )
        })?;
        TestAnalyticsEngine::with_shared_source(Arc::clone(source), config).to_mcp_err()
    }
}

// MCP tool router
#[tool_router]
impl TestAnalyticsMcpServer {
    #[tool(
        description = "Score test flakiness from execution history. Returns per-test failure rate, symmetric flakiness score, confidence, trend, and a summary of flaky tests"
    )]
    async fn analyze_flakiness(
        &self,
        Parameters(params): Parameters<AnalyzeFlakinessParams>,
    ) -> Result<CallToolResult, McpError> {
        let report = handlers::analyze_flakiness(self, params).await?;
        report_success("analyze_flakiness", &report)
    }

    #[tool(
        description = "Calculate pass rate, automation rate, defect density and reliability for a period, with optional comparison against a previous period and recommendations"
    )]
    async fn calculate_quality_metrics(
        &self,
        Parameters(params): Parameters<CalculateQualityParams>,
    ) -> Result<CallToolResult, McpError> {
        let report = handlers::calculate_quality_metrics(self, params).await?;
        report_success("calculate_quality_metrics", &report)
    }

    #[tool(
        description = "Analyze execution-time and throughput trends across runs. Detects regressions between consecutive runs and slow-test bottlenecks"
    )]
    async fn analyze_performance_trends(
        &self,
        Parameters(params): Parameters<AnalyzePerformanceParams>,
    ) -> Result<CallToolResult, McpError> {
        let report = handlers::analyze_performance_trends(self, params).await?;
        report_success("analyze_performance_trends", &report)
    }

    #[tool(
        description = "Compute a weighted risk score from six factor readings (0-100), classify it, and optionally forecast failure probability over a horizon"
    )]
    async fn assess_risk(
        &self,
        Parameters(params): Parameters<AssessRiskParams>,
    ) -> Result<CallToolResult, McpError> {
        let report = handlers::assess_risk(self, params).await?;
        report_success("assess_risk", &report)
    }

    #[tool(
        description = "Calculate team productivity rates per hour with optional benchmark comparison and per-actor breakdown (optionally anonymized)"
    )]
    async fn calculate_productivity(
        &self,
        Parameters(params): Parameters<CalculateProductivityParams>,
    ) -> Result<CallToolResult, McpError> {
        let report = handlers::calculate_productivity(self, params).await?;
        report_success("calculate_productivity", &report)
    }

    #[tool(
        description = "Show the analyzer configuration in effect: thresholds, weights and sensitivities that per-call overrides start from"
    )]
    async fn get_analytics_config(&self) -> Result<CallToolResult, McpError> {
        let config = handlers::get_analytics_config(self).await;
        report_success("get_analytics_config", &config)
    }
}

// ============================================================================
// Server Handler Implementation
// ============================================================================

#[tool_handler]
impl rmcp::ServerHandler for TestAnalyticsMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Test Analytics MCP server. Scores flaky tests, computes quality, performance, \
                 risk and productivity metrics from test execution history. Pass data inline or \
                 name a scope to read snapshots from the configured directory."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
