//! In-memory call store with the call lifecycle
//!
//! Calls are created when they start, finalized once when they end (status,
//! duration and cost), and may be enriched afterwards with artifacts fetched
//! from the voice provider.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::RecordSource;
use crate::models::{recompute_agent_counters, Agent, AnalysisWindow, CallRecord, CallStatus};
use crate::{Error, Result};

/// Artifacts fetched from the provider after a call ends
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallArtifacts {
    pub recording_url: Option<String>,
    pub transcript: Option<String>,
    pub summary: Option<String>,
    pub quality_score: Option<f64>,
    pub sentiment_score: Option<f64>,
}

/// Thread-safe in-memory store for agents and call records
#[derive(Clone, Default)]
pub struct InMemoryCallStore {
    agents: Arc<DashMap<String, Agent>>,
    calls: Arc<DashMap<String, CallRecord>>,
}

impl InMemoryCallStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_agent(&self, agent: Agent) {
        debug!("Registered agent {} ({})", agent.name, agent.id);
        self.agents.insert(agent.id.clone(), agent);
    }

    /// Insert an already-built record, e.g. when importing history.
    pub fn insert_record(&self, record: CallRecord) -> Result<()> {
        record.validate()?;
        self.calls.insert(record.id.clone(), record);
        Ok(())
    }

    pub fn start_call(&self, agent_id: &str) -> Result<CallRecord> {
        self.start_call_at(agent_id, Utc::now())
    }

    pub fn start_call_at(&self, agent_id: &str, started_at: DateTime<Utc>) -> Result<CallRecord> {
        let agent = self
            .agents
            .get(agent_id)
            .ok_or_else(|| Error::not_found(format!("agent {}", agent_id)))?;

        let record = CallRecord::new(
            Uuid::new_v4().to_string(),
            agent.id.clone(),
            agent.name.clone(),
            started_at,
        );
        drop(agent);

        self.calls.insert(record.id.clone(), record.clone());
        info!("Started call {} with {}", record.id, record.agent_name);
        Ok(record)
    }

    /// Finalize a connected call: final status, duration and cost.
    pub fn end_call(
        &self,
        call_id: &str,
        status: CallStatus,
        ended_at: DateTime<Utc>,
    ) -> Result<CallRecord> {
        if !status.is_terminal() {
            return Err(Error::invalid_state(format!(
                "call {} cannot end with status {}",
                call_id, status
            )));
        }

        let mut record = self
            .calls
            .get_mut(call_id)
            .ok_or_else(|| Error::not_found(format!("call {}", call_id)))?;

        if record.status.is_terminal() {
            return Err(Error::invalid_state(format!(
                "call {} already ended as {}",
                call_id, record.status
            )));
        }

        if ended_at < record.started_at {
            return Err(Error::invalid_state(format!(
                "call {} cannot end at {} before it started at {}",
                call_id,
                ended_at.to_rfc3339(),
                record.started_at.to_rfc3339()
            )));
        }

        let cost_per_minute = self
            .agents
            .get(&record.agent_id)
            .map(|agent| agent.cost_per_minute)
            .ok_or_else(|| Error::not_found(format!("agent {}", record.agent_id)))?;

        let elapsed_ms = ended_at
            .signed_duration_since(record.started_at)
            .num_milliseconds();
        let duration = elapsed_ms as f64 / 1000.0;

        record.status = status;
        record.ended_at = Some(ended_at);
        record.duration = duration;
        record.cost = (duration / 60.0) * cost_per_minute;

        info!(
            "Ended call {} as {} (duration: {:.0}s, cost: ${:.2})",
            call_id, status, record.duration, record.cost
        );
        Ok(record.clone())
    }

    /// Attach provider artifacts. Only fields present in `artifacts` overwrite.
    pub fn attach_artifacts(&self, call_id: &str, artifacts: CallArtifacts) -> Result<CallRecord> {
        let mut record = self
            .calls
            .get_mut(call_id)
            .ok_or_else(|| Error::not_found(format!("call {}", call_id)))?;

        if artifacts.recording_url.is_some() {
            record.recording_url = artifacts.recording_url;
        }
        if artifacts.transcript.is_some() {
            record.transcript = artifacts.transcript;
        }
        if artifacts.summary.is_some() {
            record.summary = artifacts.summary;
        }
        if artifacts.quality_score.is_some() {
            record.quality_score = artifacts.quality_score;
        }
        if artifacts.sentiment_score.is_some() {
            record.sentiment_score = artifacts.sentiment_score;
        }

        debug!("Attached artifacts to call {}", call_id);
        Ok(record.clone())
    }

    pub fn get_call(&self, call_id: &str) -> Option<CallRecord> {
        self.calls.get(call_id).map(|entry| entry.value().clone())
    }

    pub fn get_agent(&self, agent_id: &str) -> Option<Agent> {
        self.agents.get(agent_id).map(|entry| entry.value().clone())
    }

    pub fn call_count(&self) -> usize {
        self.calls.len()
    }

    /// Recompute every agent's cached counters from the stored calls.
    pub fn refresh_agent_counters(&self) {
        let records: Vec<CallRecord> = self.calls.iter().map(|entry| entry.value().clone()).collect();
        let agents: Vec<Agent> = self.agents.iter().map(|entry| entry.value().clone()).collect();

        for agent in recompute_agent_counters(&agents, &records) {
            self.agents.insert(agent.id.clone(), agent);
        }
    }
}

#[async_trait]
impl RecordSource for InMemoryCallStore {
    async fn get_call_records(&self, window: &AnalysisWindow) -> Result<Vec<CallRecord>> {
        Ok(self
            .calls
            .iter()
            .filter(|entry| window.includes(entry.value()))
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn get_agents(&self) -> Result<Vec<Agent>> {
        let mut agents: Vec<Agent> = self.agents.iter().map(|entry| entry.value().clone()).collect();
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(agents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn store_with_neo() -> InMemoryCallStore {
        let store = InMemoryCallStore::new();
        store.register_agent(Agent::new("neo-001", "Agent Neo", "Matrix Operations", 0.25));
        store
    }

    #[test]
    fn test_call_lifecycle_computes_cost() {
        let store = store_with_neo();
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();

        let started = store.start_call_at("neo-001", start).unwrap();
        assert_eq!(started.status, CallStatus::Connected);
        assert_eq!(started.cost, 0.0);
        assert!(started.ended_at.is_none());

        let ended = store
            .end_call(&started.id, CallStatus::Completed, start + Duration::seconds(180))
            .unwrap();
        assert_eq!(ended.duration, 180.0);
        assert!((ended.cost - 0.75).abs() < 1e-12);
        assert!(ended.validate().is_ok());
    }

    #[test]
    fn test_end_call_twice_is_invalid_state() {
        let store = store_with_neo();
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let call = store.start_call_at("neo-001", start).unwrap();

        store.end_call(&call.id, CallStatus::Failed, start + Duration::seconds(5)).unwrap();
        let again = store.end_call(&call.id, CallStatus::Completed, start + Duration::seconds(9));
        assert!(matches!(again, Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_end_before_start_is_invalid_state() {
        let store = store_with_neo();
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let call = store.start_call_at("neo-001", start).unwrap();

        let result = store.end_call(&call.id, CallStatus::Completed, start - Duration::seconds(30));
        assert!(matches!(result, Err(Error::InvalidState(_))));

        let unchanged = store.get_call(&call.id).unwrap();
        assert_eq!(unchanged.status, CallStatus::Connected);
        assert!(unchanged.ended_at.is_none());

        let ended = store.end_call(&call.id, CallStatus::Completed, start).unwrap();
        assert_eq!(ended.duration, 0.0);
    }

    #[test]
    fn test_end_call_requires_terminal_status() {
        let store = store_with_neo();
        let call = store.start_call("neo-001").unwrap();
        let result = store.end_call(&call.id, CallStatus::Connected, Utc::now());
        assert!(matches!(result, Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_unknown_agent_and_call_are_not_found() {
        let store = store_with_neo();
        assert!(matches!(store.start_call("smith-666"), Err(Error::NotFound(_))));
        assert!(matches!(
            store.end_call("missing", CallStatus::Completed, Utc::now()),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            store.attach_artifacts("missing", CallArtifacts::default()),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_attach_artifacts_keeps_existing_fields() {
        let store = store_with_neo();
        let call = store.start_call("neo-001").unwrap();

        store
            .attach_artifacts(&call.id, CallArtifacts {
                recording_url: Some("https://recordings.example/1.wav".to_string()),
                quality_score: Some(8.5),
                ..Default::default()
            })
            .unwrap();
        let updated = store
            .attach_artifacts(&call.id, CallArtifacts {
                sentiment_score: Some(7.0),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(updated.recording_url.as_deref(), Some("https://recordings.example/1.wav"));
        assert_eq!(updated.quality_score, Some(8.5));
        assert_eq!(updated.sentiment_score, Some(7.0));
    }

    #[test]
    fn test_refresh_agent_counters() {
        let store = store_with_neo();
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        for (offset, status) in [(60, CallStatus::Completed), (120, CallStatus::Failed)] {
            let call = store.start_call_at("neo-001", start).unwrap();
            store.end_call(&call.id, status, start + Duration::seconds(offset)).unwrap();
        }

        store.refresh_agent_counters();
        let agent = store.get_agent("neo-001").unwrap();
        assert_eq!(agent.usage_count, 2);
        assert_eq!(agent.avg_call_duration, 90.0);
        assert_eq!(agent.success_rate, 50.0);
    }

    #[tokio::test]
    async fn test_get_call_records_filters_by_window() {
        let store = store_with_neo();
        let inside = Utc.with_ymd_and_hms(2024, 3, 10, 10, 0, 0).unwrap();
        let outside = Utc.with_ymd_and_hms(2024, 4, 10, 10, 0, 0).unwrap();
        store.start_call_at("neo-001", inside).unwrap();
        store.start_call_at("neo-001", outside).unwrap();

        let window = AnalysisWindow::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 59).unwrap(),
        )
        .unwrap();

        let records = store.get_call_records(&window).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].started_at, inside);
        assert_eq!(store.call_count(), 2);
    }
}
