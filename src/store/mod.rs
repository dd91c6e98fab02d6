//! Record sources feeding the analytics pipeline
//!
//! The pipeline never reaches into a global store; callers hand it a
//! [`RecordSource`] that returns fully materialized records.

pub mod file;
pub mod memory;

use async_trait::async_trait;

use crate::models::{Agent, AnalysisWindow, CallRecord};
use crate::Result;

pub use file::FileCallStore;
pub use memory::{CallArtifacts, InMemoryCallStore};

/// Source of call records and agent profiles
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Call records whose `started_at` falls inside `window`.
    async fn get_call_records(&self, window: &AnalysisWindow) -> Result<Vec<CallRecord>>;

    /// All known agents.
    async fn get_agents(&self) -> Result<Vec<Agent>>;

    /// Call records inside `window` handled by one agent.
    async fn get_agent_call_records(&self, window: &AnalysisWindow, agent_id: &str) -> Result<Vec<CallRecord>> {
        let records = self.get_call_records(window).await?;
        Ok(records.into_iter().filter(|record| record.agent_id == agent_id).collect())
    }
}
