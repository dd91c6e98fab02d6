//! Cost totals and cost-efficiency ranking

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{by_value_asc, by_value_desc};
use crate::models::CallRecord;

const EFFICIENCY_RANKING_SIZE: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentCost {
    pub agent_name: String,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEfficiency {
    pub agent_name: String,
    /// Mean of `cost / (duration * quality_score)`; lower is better
    pub cost_efficiency: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostAnalysis {
    pub total_cost: f64,
    pub cost_per_call: f64,
    /// Summed cost per agent, highest first
    pub cost_by_agent: Vec<AgentCost>,
    /// Mean cost per call per agent, highest first
    pub avg_cost_by_agent: Vec<AgentCost>,
    /// Lowest ratio first
    pub most_efficient_agents: Vec<AgentEfficiency>,
    /// Highest ratio first
    pub least_efficient_agents: Vec<AgentEfficiency>,
}

/// Cost per unit of quality-weighted duration for one call.
///
/// `None` when the duration or quality is zero or missing, so no record
/// contributes an infinite or undefined ratio.
pub fn cost_efficiency(record: &CallRecord) -> Option<f64> {
    let quality = record.quality()?;
    if record.duration <= 0.0 || quality <= 0.0 {
        return None;
    }
    let ratio = record.cost / (record.duration * quality);
    ratio.is_finite().then_some(ratio)
}

pub fn analyze_costs(records: &[CallRecord]) -> CostAnalysis {
    if records.is_empty() {
        return CostAnalysis::default();
    }

    let total_cost: f64 = records.iter().map(|r| r.cost).sum();

    let mut per_agent: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    let mut efficiency: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for record in records {
        let entry = per_agent.entry(record.agent_name.as_str()).or_default();
        entry.0 += record.cost;
        entry.1 += 1;

        if let Some(ratio) = cost_efficiency(record) {
            let entry = efficiency.entry(record.agent_name.as_str()).or_default();
            entry.0 += ratio;
            entry.1 += 1;
        }
    }

    let mut cost_by_agent: Vec<AgentCost> = per_agent
        .iter()
        .map(|(name, (cost, _))| AgentCost {
            agent_name: name.to_string(),
            cost: *cost,
        })
        .collect();
    cost_by_agent.sort_by(|a, b| by_value_desc((a.agent_name.as_str(), a.cost), (b.agent_name.as_str(), b.cost)));

    let mut avg_cost_by_agent: Vec<AgentCost> = per_agent
        .iter()
        .map(|(name, (cost, calls))| AgentCost {
            agent_name: name.to_string(),
            cost: cost / *calls as f64,
        })
        .collect();
    avg_cost_by_agent.sort_by(|a, b| by_value_desc((a.agent_name.as_str(), a.cost), (b.agent_name.as_str(), b.cost)));

    let mut ranked: Vec<AgentEfficiency> = efficiency
        .into_iter()
        .map(|(name, (sum, count))| AgentEfficiency {
            agent_name: name.to_string(),
            cost_efficiency: sum / count as f64,
        })
        .collect();

    ranked.sort_by(|a, b| {
        by_value_asc((a.agent_name.as_str(), a.cost_efficiency), (b.agent_name.as_str(), b.cost_efficiency))
    });
    let most_efficient_agents = ranked.iter().take(EFFICIENCY_RANKING_SIZE).cloned().collect();

    ranked.sort_by(|a, b| {
        by_value_desc((a.agent_name.as_str(), a.cost_efficiency), (b.agent_name.as_str(), b.cost_efficiency))
    });
    let least_efficient_agents = ranked.into_iter().take(EFFICIENCY_RANKING_SIZE).collect();

    CostAnalysis {
        total_cost,
        cost_per_call: total_cost / records.len() as f64,
        cost_by_agent,
        avg_cost_by_agent,
        most_efficient_agents,
        least_efficient_agents,
    }
}
