//! AI agent profiles and their derived usage counters

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::call::{CallRecord, CallStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Active,
    Inactive,
    Maintenance,
}

impl Default for AgentStatus {
    fn default() -> Self {
        AgentStatus::Active
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatrixLevel {
    Architect,
    Oracle,
    Operator,
    Sentinel,
    Agent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecurityClearance {
    Alpha,
    Beta,
    Gamma,
    Delta,
    Omega,
}

/// Voice synthesis settings passed through to the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceConfig {
    pub model: String,
    pub voice_id: String,
    #[serde(default = "default_unit")]
    pub speed: f64,
    #[serde(default = "default_unit")]
    pub pitch: f64,
    #[serde(default = "default_voice_balance")]
    pub stability: f64,
    #[serde(default = "default_voice_balance")]
    pub similarity_boost: f64,
}

fn default_unit() -> f64 {
    1.0
}

fn default_voice_balance() -> f64 {
    0.75
}

fn default_cost_per_minute() -> f64 {
    0.12
}

fn default_success_rate() -> f64 {
    100.0
}

/// A configured AI persona.
///
/// `usage_count`, `avg_call_duration` and `success_rate` are caches over the
/// call records; see [`recompute_agent_counters`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_cost_per_minute")]
    pub cost_per_minute: f64,
    #[serde(default)]
    pub voice: Option<VoiceConfig>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub matrix_level: Option<MatrixLevel>,
    #[serde(default)]
    pub security_clearance: Option<SecurityClearance>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub status: AgentStatus,
    #[serde(default)]
    pub usage_count: u64,
    #[serde(default)]
    pub avg_call_duration: f64,
    #[serde(default = "default_success_rate")]
    pub success_rate: f64,
}

impl Agent {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        cost_per_minute: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            description: String::new(),
            cost_per_minute,
            voice: None,
            language: None,
            matrix_level: None,
            security_clearance: None,
            capabilities: Vec::new(),
            status: AgentStatus::Active,
            usage_count: 0,
            avg_call_duration: 0.0,
            success_rate: default_success_rate(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AgentStatus::Active
    }

    /// Cost of a call of `duration_secs` seconds at this agent's rate.
    pub fn call_cost(&self, duration_secs: f64) -> f64 {
        (duration_secs / 60.0) * self.cost_per_minute
    }
}

#[derive(Default)]
struct CounterAccumulator {
    calls: u64,
    duration: f64,
    completed: u64,
}

/// Rebuild every agent's usage counters from the authoritative call records.
///
/// Records are matched on `agent_id`. Agents without calls get zero usage,
/// zero average duration and a 100% success rate.
pub fn recompute_agent_counters(agents: &[Agent], records: &[CallRecord]) -> Vec<Agent> {
    let mut accumulators: HashMap<&str, CounterAccumulator> = HashMap::new();
    for record in records {
        let acc = accumulators.entry(record.agent_id.as_str()).or_default();
        acc.calls += 1;
        acc.duration += record.duration;
        if record.status == CallStatus::Completed {
            acc.completed += 1;
        }
    }

    agents
        .iter()
        .map(|agent| {
            let mut agent = agent.clone();
            match accumulators.get(agent.id.as_str()) {
                Some(acc) if acc.calls > 0 => {
                    agent.usage_count = acc.calls;
                    agent.avg_call_duration = acc.duration / acc.calls as f64;
                    agent.success_rate = acc.completed as f64 / acc.calls as f64 * 100.0;
                }
                _ => {
                    agent.usage_count = 0;
                    agent.avg_call_duration = 0.0;
                    agent.success_rate = default_success_rate();
                }
            }
            agent
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(id: &str, agent_id: &str, status: CallStatus, duration: f64) -> CallRecord {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let mut record = CallRecord::new(id, agent_id, agent_id, start);
        record.status = status;
        record.duration = duration;
        if status.is_terminal() {
            record.ended_at = Some(start + chrono::Duration::seconds(duration as i64));
        }
        record
    }

    #[test]
    fn test_call_cost_uses_rate_per_minute() {
        let agent = Agent::new("neo-001", "Agent Neo", "Matrix Operations", 0.25);
        assert!((agent.call_cost(120.0) - 0.5).abs() < 1e-12);
        assert_eq!(agent.call_cost(0.0), 0.0);
    }

    #[test]
    fn test_recompute_counters_from_records() {
        let agents = vec![
            Agent::new("neo", "Agent Neo", "Matrix Operations", 0.25),
            Agent::new("trinity", "Agent Trinity", "Technical Operations", 0.18),
        ];
        let records = vec![
            record("c1", "neo", CallStatus::Completed, 100.0),
            record("c2", "neo", CallStatus::Failed, 50.0),
            record("c3", "neo", CallStatus::Completed, 150.0),
            record("c4", "morpheus", CallStatus::Completed, 10.0),
        ];

        let agents = recompute_agent_counters(&agents, &records);
        assert_eq!(agents[0].usage_count, 3);
        assert!((agents[0].avg_call_duration - 100.0).abs() < 1e-9);
        assert!((agents[0].success_rate - 200.0 / 3.0).abs() < 1e-9);

        assert_eq!(agents[1].usage_count, 0);
        assert_eq!(agents[1].avg_call_duration, 0.0);
        assert_eq!(agents[1].success_rate, 100.0);
    }

    #[test]
    fn test_recompute_discards_stale_counters() {
        let mut agent = Agent::new("neo", "Agent Neo", "Matrix Operations", 0.25);
        agent.usage_count = 99;
        agent.success_rate = 12.0;

        let agents = recompute_agent_counters(&[agent], &[]);
        assert_eq!(agents[0].usage_count, 0);
        assert_eq!(agents[0].success_rate, 100.0);
    }

    #[test]
    fn test_agent_defaults_from_json() {
        let agent: Agent = serde_json::from_str(
            r#"{"id": "oracle-004", "name": "Agent Oracle", "category": "Prediction & Analysis"}"#,
        )
        .unwrap();
        assert_eq!(agent.cost_per_minute, 0.12);
        assert_eq!(agent.status, AgentStatus::Active);
        assert_eq!(agent.success_rate, 100.0);
    }
}
