//! Tracing setup for the server binary
//!
//! Logs go to stderr because stdout carries the MCP protocol.

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter variable read before `RUST_LOG`
pub const LOG_FILTER_ENV: &str = "TEST_ANALYTICS_LOG";

/// Engine and server crates log at `info` unless the filter names them
const DEFAULT_DIRECTIVES: [&str; 2] = ["test_analytics=info", "test_analytics_mcp=info"];

/// Output format of the stderr layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// `json` (any case) selects JSON; anything else, or nothing, is text
    pub fn from_setting(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

/// Build the filter from explicit directives, falling back to the defaults
///
/// Default directives are appended only for crates the directives leave
/// unmentioned, so `TEST_ANALYTICS_LOG=test_analytics=trace` keeps trace.
pub fn log_filter(directives: Option<&str>) -> anyhow::Result<EnvFilter> {
    let directives = directives.unwrap_or_default();
    let mut filter = EnvFilter::try_new(directives)
        .with_context(|| format!("Invalid log filter: {:?}", directives))?;

    for directive in DEFAULT_DIRECTIVES {
        let target = directive.split('=').next().unwrap_or(directive);
        let mentioned = directives
            .split(',')
            .any(|d| d.trim().split('=').next() == Some(target));
        if !mentioned {
            filter = filter.add_directive(directive.parse()?);
        }
    }

    Ok(filter)
}

/// Install the global subscriber
///
/// The filter comes from `TEST_ANALYTICS_LOG`, else `RUST_LOG`.
/// `LOG_FORMAT=json` selects structured JSON output; anything else gives
/// plain text without ANSI colors.
pub fn init_tracing() -> anyhow::Result<()> {
    let directives = std::env::var(LOG_FILTER_ENV)
        .or_else(|_| std::env::var("RUST_LOG"))
        .ok();
    let filter = log_filter(directives.as_deref())?;
    let format = LogFormat::from_setting(std::env::var("LOG_FORMAT").ok().as_deref());

    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .init(),
    }

    tracing::debug!("Tracing initialized ({:?} format)", format);
    Ok(())
}
