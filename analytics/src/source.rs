//! Contract for the collaborator that fetches raw data
//!
//! Implementations wrap a test-management backend (or an export of one).
//! Failures are reported as [`AnalyticsError::Upstream`] and are passed to
//! the caller unchanged; the engine never substitutes partial data.
//!
//! [`AnalyticsError::Upstream`]: crate::error::AnalyticsError::Upstream

use async_trait::async_trait;

use crate::error::AnalyticsResult;
use crate::productivity::ActorCounters;
use crate::risk::RiskReadings;
use crate::types::{ExecutionRecord, TimeRange};

/// Source of already-validated analytics inputs
#[async_trait]
pub trait AnalyticsSource: Send + Sync {
    /// Executions for a scope, ascending by timestamp within each test
    async fn fetch_execution_history(
        &self,
        scope: &str,
        range: &TimeRange,
    ) -> AnalyticsResult<Vec<ExecutionRecord>>;

    /// Risk factor readings in `[0, 100]`
    async fn fetch_risk_factor_readings(&self, scope: &str) -> AnalyticsResult<RiskReadings>;

    /// Per-actor activity counters for productivity
    async fn fetch_actor_counters(
        &self,
        scope: &str,
        range: &TimeRange,
    ) -> AnalyticsResult<Vec<ActorCounters>>;
}
