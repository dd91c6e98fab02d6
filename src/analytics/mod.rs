//! Analytics aggregation and reporting pipeline
//!
//! Every report is computed fresh from a [`CallSnapshot`]: the validated,
//! window-filtered and ordered call records plus the agent catalogue. The
//! five analyzers (overview, performance, cost, quality, usage) read the
//! snapshot independently; clustering reads the raw records; the
//! recommendation rules read analyzer outputs only.

pub mod clustering;
pub mod cost;
pub mod engine;
pub mod figures;
pub mod overview;
pub mod performance;
pub mod quality;
pub mod recommendations;
pub mod report;
pub mod usage;

use std::cmp::Ordering;

use tracing::debug;

use crate::models::{Agent, AnalysisWindow, CallRecord};
use crate::Result;

pub use clustering::{CallFeature, CallPattern, PatternClusterer, PredictiveInsights};
pub use cost::{AgentCost, AgentEfficiency, CostAnalysis};
pub use engine::{analyze, AnalyticsEngine};
pub use figures::{build_dashboard_figures, ChartKind, ChartSpec, DataPoint, Series};
pub use overview::OverviewMetrics;
pub use performance::{AgentPerformance, AgentRanking, AgentStats};
pub use quality::{BandCount, QualityBand, QualityMetrics};
pub use recommendations::{Recommendation, RecommendationKind};
pub use report::Report;
pub use usage::{HourCount, UsagePatterns, WeekdayCount};

/// Immutable input shared by all stages of one report
#[derive(Debug, Clone)]
pub struct CallSnapshot {
    pub window: AnalysisWindow,
    pub records: Vec<CallRecord>,
    pub agents: Vec<Agent>,
}

impl CallSnapshot {
    /// Validate the records, keep those inside `window` and order them by
    /// `(started_at, id)` so results do not depend on source ordering.
    pub fn new(window: AnalysisWindow, records: Vec<CallRecord>, agents: Vec<Agent>) -> Result<Self> {
        for record in &records {
            record.validate()?;
        }

        let total = records.len();
        let mut records: Vec<CallRecord> = records
            .into_iter()
            .filter(|record| window.includes(record))
            .collect();
        records.sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.id.cmp(&b.id)));

        if records.len() != total {
            debug!("Dropped {} records outside the analysis window", total - records.len());
        }

        Ok(Self { window, records, agents })
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Mean of the values, `None` when there are none.
pub(crate) fn mean<I: IntoIterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Descending by value, then ascending by name.
pub(crate) fn by_value_desc(a: (&str, f64), b: (&str, f64)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0))
}

/// Ascending by value, then ascending by name.
pub(crate) fn by_value_asc(a: (&str, f64), b: (&str, f64)) -> Ordering {
    a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use crate::models::{CallRecord, CallStatus};

    pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    /// A completed call starting on 2024-03-`day` at `hour`:00 UTC.
    pub fn call(
        id: &str,
        agent: &str,
        duration: f64,
        cost: f64,
        quality: Option<f64>,
        sentiment: Option<f64>,
        day: u32,
        hour: u32,
    ) -> CallRecord {
        let started_at = at(day, hour);
        let mut record = CallRecord::new(id, format!("{}-id", agent), agent, started_at);
        record.status = CallStatus::Completed;
        record.duration = duration;
        record.cost = cost;
        record.quality_score = quality;
        record.sentiment_score = sentiment;
        record.ended_at = Some(started_at + Duration::milliseconds((duration * 1000.0) as i64));
        record
    }
}
