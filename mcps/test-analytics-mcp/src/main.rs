//! Test Analytics MCP Server binary entry point

use rmcp::{transport::io::stdio, ServiceExt};
use test_analytics_mcp::{init::init_tracing, ServerConfig, TestAnalyticsMcpServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    tracing::info!("Starting Test Analytics MCP server");

    let config = ServerConfig::load()?;
    let server = TestAnalyticsMcpServer::new(config);
    let service = server.serve(stdio()).await?;

    tracing::info!("Test Analytics MCP server running");

    service.waiting().await?;

    tracing::info!("Test Analytics MCP server stopped");

    Ok(())
}
