//! JSON snapshot directory as an analytics data source
//!
//! Layout, one directory per scope:
//!
//! ```text
//! <root>/<scope>/executions.json    [ExecutionRecord]
//! <root>/<scope>/risk_factors.json  RiskReadings
//! <root>/<scope>/actors.json        [ActorCounters]
//! ```

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use test_analytics::{
    ActorCounters, AnalyticsError, AnalyticsResult, AnalyticsSource, ExecutionRecord,
    RiskReadings, TimeRange,
};

const EXECUTIONS_FILE: &str = "executions.json";
const RISK_FACTORS_FILE: &str = "risk_factors.json";
const ACTORS_FILE: &str = "actors.json";

/// Reads scope snapshots from disk on every call
#[derive(Debug, Clone)]
pub struct JsonSnapshotSource {
    root: PathBuf,
}

impl JsonSnapshotSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scope names are single path components
    fn scope_dir(&self, scope: &str) -> AnalyticsResult<PathBuf> {
        let valid = !scope.is_empty()
            && scope != "."
            && scope != ".."
            && !scope.contains(['/', '\\']);
        if !valid {
            return Err(AnalyticsError::InvalidConfig(format!(
                "invalid scope name: {:?}",
                scope
            )));
        }
        Ok(self.root.join(scope))
    }

    async fn read_json<T: DeserializeOwned>(&self, scope: &str, file: &str) -> AnalyticsResult<T> {
        let path = self.scope_dir(scope)?.join(file);

        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            AnalyticsError::Upstream(format!("failed to read {}: {}", path.display(), e))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            AnalyticsError::Upstream(format!("failed to parse {}: {}", path.display(), e))
        })
    }
}

#[async_trait]
impl AnalyticsSource for JsonSnapshotSource {
    async fn fetch_execution_history(
        &self,
        scope: &str,
        range: &TimeRange,
    ) -> AnalyticsResult<Vec<ExecutionRecord>> {
        let mut records: Vec<ExecutionRecord> = self.read_json(scope, EXECUTIONS_FILE).await?;
        records.retain(|r| range.contains(r.timestamp));
        records.sort_by(|a, b| {
            a.test_id
                .cmp(&b.test_id)
                .then(a.timestamp.cmp(&b.timestamp))
                .then(a.run_id.cmp(&b.run_id))
        });

        tracing::debug!(
            "Loaded {} executions for scope {} from {}",
            records.len(),
            scope,
            self.root.display()
        );

        Ok(records)
    }

    async fn fetch_risk_factor_readings(&self, scope: &str) -> AnalyticsResult<RiskReadings> {
        self.read_json(scope, RISK_FACTORS_FILE).await
    }

    /// Snapshots hold totals for the whole scope, so the range is not applied
    async fn fetch_actor_counters(
        &self,
        scope: &str,
        _range: &TimeRange,
    ) -> AnalyticsResult<Vec<ActorCounters>> {
        self.read_json(scope, ACTORS_FILE).await
    }
}
