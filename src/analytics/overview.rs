//! Aggregate totals for the whole window

use serde::{Deserialize, Serialize};

use super::mean;
use crate::models::{Agent, CallRecord, CallStatus};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverviewMetrics {
    pub total_calls: usize,
    pub total_duration: f64,
    pub total_cost: f64,
    pub avg_call_duration: f64,
    /// Percentage of calls that completed
    pub success_rate: f64,
    pub avg_quality_score: f64,
    pub avg_sentiment_score: f64,
    pub active_agents: usize,
    /// Calls still connected; their duration and cost are not final
    pub provisional_calls: usize,
}

pub fn summarize(records: &[CallRecord], agents: &[Agent]) -> OverviewMetrics {
    let active_agents = agents.iter().filter(|agent| agent.is_active()).count();

    if records.is_empty() {
        return OverviewMetrics {
            active_agents,
            ..Default::default()
        };
    }

    let total_calls = records.len();
    let total_duration: f64 = records.iter().map(|r| r.duration).sum();
    let total_cost: f64 = records.iter().map(|r| r.cost).sum();
    let completed = records.iter().filter(|r| r.status == CallStatus::Completed).count();

    OverviewMetrics {
        total_calls,
        total_duration,
        total_cost,
        avg_call_duration: total_duration / total_calls as f64,
        success_rate: completed as f64 / total_calls as f64 * 100.0,
        avg_quality_score: mean(records.iter().filter_map(|r| r.quality())).unwrap_or(0.0),
        avg_sentiment_score: mean(records.iter().filter_map(|r| r.sentiment())).unwrap_or(0.0),
        active_agents,
        provisional_calls: records.iter().filter(|r| r.is_provisional()).count(),
    }
}
