//! Quality score banding and trends

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::mean;
use crate::models::CallRecord;

/// Qualitative band of a 0-10 quality score.
///
/// Poor is `[0, 2]`; every other band is open below and closed above, so a
/// boundary score belongs to the lower band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityBand {
    Poor,
    Fair,
    Good,
    VeryGood,
    Excellent,
}

impl QualityBand {
    pub const ALL: [QualityBand; 5] = [
        QualityBand::Poor,
        QualityBand::Fair,
        QualityBand::Good,
        QualityBand::VeryGood,
        QualityBand::Excellent,
    ];

    /// Band for `score`, or `None` outside `[0, 10]`.
    pub fn from_score(score: f64) -> Option<Self> {
        if !(0.0..=10.0).contains(&score) {
            return None;
        }
        let band = if score <= 2.0 {
            QualityBand::Poor
        } else if score <= 4.0 {
            QualityBand::Fair
        } else if score <= 6.0 {
            QualityBand::Good
        } else if score <= 8.0 {
            QualityBand::VeryGood
        } else {
            QualityBand::Excellent
        };
        Some(band)
    }

    pub fn label(self) -> &'static str {
        match self {
            QualityBand::Poor => "Poor",
            QualityBand::Fair => "Fair",
            QualityBand::Good => "Good",
            QualityBand::VeryGood => "Very Good",
            QualityBand::Excellent => "Excellent",
        }
    }
}

impl fmt::Display for QualityBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandCount {
    pub band: QualityBand,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub avg_quality: f64,
    pub scored_calls: usize,
    /// Scores outside the 0-10 scale, left out of the distribution
    pub out_of_range: usize,
    /// All five bands, Poor first
    pub quality_distribution: Vec<BandCount>,
    /// Mean quality per calendar day of `started_at`
    pub quality_trends: BTreeMap<NaiveDate, f64>,
    pub quality_by_agent: BTreeMap<String, f64>,
}

impl Default for QualityMetrics {
    fn default() -> Self {
        Self {
            avg_quality: 0.0,
            scored_calls: 0,
            out_of_range: 0,
            quality_distribution: QualityBand::ALL
                .iter()
                .map(|&band| BandCount { band, count: 0 })
                .collect(),
            quality_trends: BTreeMap::new(),
            quality_by_agent: BTreeMap::new(),
        }
    }
}

pub fn analyze_quality(records: &[CallRecord]) -> QualityMetrics {
    let scored: Vec<(&CallRecord, f64)> = records
        .iter()
        .filter_map(|r| r.quality().map(|q| (r, q)))
        .collect();

    let mut metrics = QualityMetrics::default();
    if scored.is_empty() {
        return metrics;
    }

    let mut by_day: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    let mut by_agent: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for &(record, quality) in &scored {
        match QualityBand::from_score(quality) {
            Some(band) => metrics.quality_distribution[band as usize].count += 1,
            None => metrics.out_of_range += 1,
        }
        by_day.entry(record.started_at.date_naive()).or_default().push(quality);
        by_agent.entry(record.agent_name.clone()).or_default().push(quality);
    }

    metrics.scored_calls = scored.len();
    metrics.avg_quality = mean(scored.iter().map(|&(_, q)| q)).unwrap_or(0.0);
    metrics.quality_trends = by_day
        .into_iter()
        .filter_map(|(day, values)| mean(values).map(|m| (day, m)))
        .collect();
    metrics.quality_by_agent = by_agent
        .into_iter()
        .filter_map(|(agent, values)| mean(values).map(|m| (agent, m)))
        .collect();
    metrics
}
