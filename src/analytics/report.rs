//! Assembled analytics report

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::clustering::PredictiveInsights;
use super::cost::CostAnalysis;
use super::overview::OverviewMetrics;
use super::performance::AgentPerformance;
use super::quality::QualityMetrics;
use super::recommendations::Recommendation;
use super::usage::UsagePatterns;
use crate::models::AnalysisWindow;
use crate::Result;

/// One read-only analytics report for a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub window: AnalysisWindow,
    pub generated_at: DateTime<Utc>,
    pub overview: OverviewMetrics,
    pub agent_performance: AgentPerformance,
    pub cost_analysis: CostAnalysis,
    pub quality_metrics: QualityMetrics,
    pub usage_patterns: UsagePatterns,
    pub predictive_insights: PredictiveInsights,
    pub recommendations: Vec<Recommendation>,
}

impl Report {
    pub fn is_empty(&self) -> bool {
        self.overview.total_calls == 0
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Whether two reports carry the same analytics, ignoring when they
    /// were generated.
    pub fn same_content(&self, other: &Report) -> bool {
        Report {
            generated_at: other.generated_at,
            ..self.clone()
        } == *other
    }
}
