//! Test Analytics MCP Library
//!
//! Exposes the `test-analytics` engine as MCP tools.
//!
//! # Usage as Library
//!
//! ```rust,ignore
//! use test_analytics_mcp::{ServerConfig, TestAnalyticsMcpServer};
//!
//! let server = TestAnalyticsMcpServer::new(ServerConfig::load()?);
//! // Serve via stdio or any other rmcp transport
//! ```
//!
//! - Inline data: pass records, readings or actor counters with the call
//! - Scoped data: name a scope and read `<dir>/<scope>/*.json` snapshots
//! - Defaults come from `~/.binks/test-analytics.toml`; calls may override them

pub mod config;
pub mod handlers;
pub mod init;
pub mod params;
pub mod response;
pub mod server;
pub mod snapshot;


pub use config::ServerConfig;
pub use server::TestAnalyticsMcpServer;
pub use snapshot::JsonSnapshotSource;

// Re-export parameter types for direct API usage
pub use params::*;
