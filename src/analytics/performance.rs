//! Per-agent statistics and composite performance ranking

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{by_value_asc, by_value_desc};
use crate::models::CallRecord;

const QUALITY_WEIGHT: f64 = 0.4;
const SENTIMENT_WEIGHT: f64 = 0.3;
const VOLUME_WEIGHT: f64 = 0.3;
const RANKING_SIZE: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStats {
    pub agent_name: String,
    pub call_count: usize,
    pub avg_duration: f64,
    pub total_duration: f64,
    pub total_cost: f64,
    pub avg_cost: f64,
    /// `None` when none of the agent's calls were scored
    pub avg_quality: Option<f64>,
    pub avg_sentiment: Option<f64>,
    pub performance_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRanking {
    pub agent_name: String,
    pub performance_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentPerformance {
    /// One entry per agent, ordered by name
    pub agent_stats: Vec<AgentStats>,
    pub top_performers: Vec<AgentRanking>,
    pub improvement_needed: Vec<AgentRanking>,
}

impl AgentPerformance {
    pub fn total_calls(&self) -> usize {
        self.agent_stats.iter().map(|s| s.call_count).sum()
    }
}

#[derive(Default)]
struct RunningStats {
    calls: usize,
    duration: f64,
    cost: f64,
    quality_sum: f64,
    quality_count: usize,
    sentiment_sum: f64,
    sentiment_count: usize,
}

impl RunningStats {
    fn push(&mut self, record: &CallRecord) {
        self.calls += 1;
        self.duration += record.duration;
        self.cost += record.cost;
        if let Some(quality) = record.quality() {
            self.quality_sum += quality;
            self.quality_count += 1;
        }
        if let Some(sentiment) = record.sentiment() {
            self.sentiment_sum += sentiment;
            self.sentiment_count += 1;
        }
    }

    fn avg_quality(&self) -> Option<f64> {
        (self.quality_count > 0).then(|| self.quality_sum / self.quality_count as f64)
    }

    fn avg_sentiment(&self) -> Option<f64> {
        (self.sentiment_count > 0).then(|| self.sentiment_sum / self.sentiment_count as f64)
    }
}

/// Composite score blending quality, sentiment and relative call volume.
///
/// Missing averages contribute 0. A zero `max_call_count` yields 0. The
/// averages are used at full precision; rounding is left to presentation.
pub fn performance_score(
    avg_quality: Option<f64>,
    avg_sentiment: Option<f64>,
    call_count: usize,
    max_call_count: usize,
) -> f64 {
    if max_call_count == 0 {
        return 0.0;
    }
    let volume = call_count as f64 / max_call_count as f64 * 100.0;
    QUALITY_WEIGHT * avg_quality.unwrap_or(0.0)
        + SENTIMENT_WEIGHT * avg_sentiment.unwrap_or(0.0)
        + VOLUME_WEIGHT * volume
}

pub fn rank_agents(records: &[CallRecord]) -> AgentPerformance {
    let mut grouped: BTreeMap<&str, RunningStats> = BTreeMap::new();
    for record in records {
        grouped.entry(record.agent_name.as_str()).or_default().push(record);
    }

    let max_call_count = grouped.values().map(|s| s.calls).max().unwrap_or(0);

    let agent_stats: Vec<AgentStats> = grouped
        .into_iter()
        .map(|(name, stats)| {
            let avg_quality = stats.avg_quality();
            let avg_sentiment = stats.avg_sentiment();
            AgentStats {
                agent_name: name.to_string(),
                call_count: stats.calls,
                avg_duration: stats.duration / stats.calls as f64,
                total_duration: stats.duration,
                total_cost: stats.cost,
                avg_cost: stats.cost / stats.calls as f64,
                avg_quality,
                avg_sentiment,
                performance_score: performance_score(avg_quality, avg_sentiment, stats.calls, max_call_count),
            }
        })
        .collect();

    let mut rankings: Vec<AgentRanking> = agent_stats
        .iter()
        .map(|s| AgentRanking {
            agent_name: s.agent_name.clone(),
            performance_score: s.performance_score,
        })
        .collect();

    rankings.sort_by(|a, b| {
        by_value_desc((a.agent_name.as_str(), a.performance_score), (b.agent_name.as_str(), b.performance_score))
    });
    let top_performers = rankings.iter().take(RANKING_SIZE).cloned().collect();

    rankings.sort_by(|a, b| {
        by_value_asc((a.agent_name.as_str(), a.performance_score), (b.agent_name.as_str(), b.performance_score))
    });
    let improvement_needed = rankings.into_iter().take(RANKING_SIZE).collect();

    AgentPerformance {
        agent_stats,
        top_performers,
        improvement_needed,
    }
}
