//! Rule-based recommendations derived from analyzer outputs

use std::fmt;

use serde::{Deserialize, Serialize};

use super::by_value_asc;
use super::cost::CostAnalysis;
use super::overview::OverviewMetrics;
use super::performance::AgentPerformance;
use super::usage::UsagePatterns;
use crate::config::RecommendationConfig;

const NAMED_AGENTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    GetStarted,
    CostOptimization,
    QualityImprovement,
    CapacityPlanning,
    AgentUtilization,
}

impl fmt::Display for RecommendationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecommendationKind::GetStarted => "get_started",
            RecommendationKind::CostOptimization => "cost_optimization",
            RecommendationKind::QualityImprovement => "quality_improvement",
            RecommendationKind::CapacityPlanning => "capacity_planning",
            RecommendationKind::AgentUtilization => "agent_utilization",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub message: String,
}

impl Recommendation {
    fn new(kind: RecommendationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Apply the recommendation rules in order. An empty window produces only
/// the get-started hint; otherwise each rule whose inputs are present
/// contributes at most one recommendation.
pub fn generate_recommendations(
    overview: &OverviewMetrics,
    performance: &AgentPerformance,
    cost: &CostAnalysis,
    usage: &UsagePatterns,
    config: &RecommendationConfig,
) -> Vec<Recommendation> {
    if overview.total_calls == 0 {
        return vec![Recommendation::new(
            RecommendationKind::GetStarted,
            "Start making calls to generate analytics data",
        )];
    }

    let mut recommendations = Vec::new();

    if !cost.avg_cost_by_agent.is_empty() {
        let names: Vec<&str> = cost
            .avg_cost_by_agent
            .iter()
            .take(NAMED_AGENTS)
            .map(|c| c.agent_name.as_str())
            .collect();
        recommendations.push(Recommendation::new(
            RecommendationKind::CostOptimization,
            format!("Consider optimizing usage of high-cost agents: {}", names.join(", ")),
        ));
    }

    let mut scored: Vec<(&str, f64)> = performance
        .agent_stats
        .iter()
        .filter_map(|s| s.avg_quality.map(|q| (s.agent_name.as_str(), q)))
        .collect();
    scored.sort_by(|a, b| by_value_asc(*a, *b));
    if let Some(&(_, worst)) = scored.first() {
        if worst < config.quality_threshold {
            let names: Vec<&str> = scored.iter().take(NAMED_AGENTS).map(|&(name, _)| name).collect();
            recommendations.push(Recommendation::new(
                RecommendationKind::QualityImprovement,
                format!("Focus on improving quality for: {}", names.join(", ")),
            ));
        }
    }

    if let Some(hour) = usage.peak_hour() {
        recommendations.push(Recommendation::new(
            RecommendationKind::CapacityPlanning,
            format!("Peak usage is around {}:00 - consider scaling resources accordingly", hour),
        ));
    }

    let total_calls = performance.total_calls();
    if total_calls > 0 {
        let cutoff = total_calls as f64 * config.underutilized_share;
        let mut underutilized: Vec<(&str, usize)> = performance
            .agent_stats
            .iter()
            .filter(|s| (s.call_count as f64) < cutoff)
            .map(|s| (s.agent_name.as_str(), s.call_count))
            .collect();
        underutilized.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        if !underutilized.is_empty() {
            let names: Vec<&str> = underutilized.iter().take(NAMED_AGENTS).map(|&(name, _)| name).collect();
            recommendations.push(Recommendation::new(
                RecommendationKind::AgentUtilization,
                format!("Consider promoting underutilized agents: {}", names.join(", ")),
            ));
        }
    }

    recommendations
}
