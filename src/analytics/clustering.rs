//! Call pattern discovery
//!
//! Calls are grouped with k-means over standardized numeric features
//! (duration, cost, quality, sentiment). Initialization is k-means++ driven
//! by a seeded RNG, so the same records always produce the same clusters.
//! Missing scores are filled with 0 for clustering only; cluster
//! descriptions use the raw values with missing scores left out.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::mean;
use crate::config::ClusteringConfig;
use crate::models::CallRecord;
use crate::{Error, Result};

/// Fewest records clustering is ever attempted on; configuration may only
/// raise it.
pub const MIN_RECORDS: usize = 10;
const MIN_CLUSTERS: usize = 2;
const MAX_CLUSTERS: usize = 4;
const MIN_FEATURES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallFeature {
    Duration,
    Cost,
    QualityScore,
    SentimentScore,
}

impl CallFeature {
    pub const ALL: [CallFeature; 4] = [
        CallFeature::Duration,
        CallFeature::Cost,
        CallFeature::QualityScore,
        CallFeature::SentimentScore,
    ];

    fn value(self, record: &CallRecord) -> Option<f64> {
        match self {
            CallFeature::Duration => Some(record.duration),
            CallFeature::Cost => Some(record.cost),
            CallFeature::QualityScore => record.quality(),
            CallFeature::SentimentScore => record.sentiment(),
        }
    }

    /// Qualitative label for a cluster whose mean of this feature is `mean`.
    fn describe(self, mean: f64) -> Option<&'static str> {
        match self {
            CallFeature::Duration if mean > 300.0 => Some("Long duration calls"),
            CallFeature::Duration if mean < 60.0 => Some("Short duration calls"),
            CallFeature::Cost if mean > 1.0 => Some("Higher cost calls"),
            CallFeature::Cost if mean < 0.5 => Some("Lower cost calls"),
            CallFeature::QualityScore if mean > 8.0 => Some("High quality interactions"),
            CallFeature::QualityScore if mean < 5.0 => Some("Lower quality interactions"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallPattern {
    pub cluster: usize,
    pub size: usize,
    pub avg_duration: f64,
    pub avg_cost: f64,
    pub characteristics: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PredictiveInsights {
    Patterns {
        features: Vec<CallFeature>,
        /// Non-empty clusters in cluster index order
        call_patterns: Vec<CallPattern>,
        insights: Vec<String>,
        /// Call id to cluster index
        assignments: BTreeMap<String, usize>,
    },
    InsufficientData {
        predictions: String,
    },
    AnalysisError {
        predictions: String,
    },
}

impl PredictiveInsights {
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, PredictiveInsights::InsufficientData { .. })
    }

    pub fn call_patterns(&self) -> &[CallPattern] {
        match self {
            PredictiveInsights::Patterns { call_patterns, .. } => call_patterns,
            _ => &[],
        }
    }
}

pub struct PatternClusterer {
    config: ClusteringConfig,
}

impl PatternClusterer {
    pub fn new(config: ClusteringConfig) -> Self {
        Self { config }
    }

    /// `min(4, max(2, n / 3))`
    pub fn cluster_count(record_count: usize) -> usize {
        (record_count / 3).max(MIN_CLUSTERS).min(MAX_CLUSTERS)
    }

    pub fn analyze(&self, records: &[CallRecord]) -> PredictiveInsights {
        if records.len() < self.config.min_records.max(MIN_RECORDS) {
            debug!("Skipping clustering: {} records", records.len());
            return PredictiveInsights::InsufficientData {
                predictions: "Insufficient data for predictions".to_string(),
            };
        }

        let features: Vec<CallFeature> = CallFeature::ALL
            .iter()
            .copied()
            .filter(|feature| records.iter().any(|r| feature.value(r).is_some()))
            .collect();

        if features.len() < MIN_FEATURES {
            return PredictiveInsights::InsufficientData {
                predictions: "Insufficient feature data for analysis".to_string(),
            };
        }

        match self.cluster(records, features) {
            Ok(insights) => insights,
            Err(e) => {
                warn!("Call pattern clustering failed: {}", e);
                PredictiveInsights::AnalysisError {
                    predictions: format!("Analysis error: {}", e),
                }
            }
        }
    }

    fn cluster(&self, records: &[CallRecord], features: Vec<CallFeature>) -> Result<PredictiveInsights> {
        let matrix: Vec<Vec<f64>> = records
            .iter()
            .map(|r| features.iter().map(|f| f.value(r).unwrap_or(0.0)).collect())
            .collect();

        let scaled = standardize(&matrix)?;
        let k = Self::cluster_count(records.len());
        let labels = self.kmeans(&scaled, k)?;

        let mut call_patterns = Vec::new();
        for cluster in 0..k {
            let members: Vec<&CallRecord> = records
                .iter()
                .zip(&labels)
                .filter(|&(_, &label)| label == cluster)
                .map(|(record, _)| record)
                .collect();
            if members.is_empty() {
                continue;
            }

            call_patterns.push(CallPattern {
                cluster,
                size: members.len(),
                avg_duration: mean(members.iter().map(|r| r.duration)).unwrap_or(0.0),
                avg_cost: mean(members.iter().map(|r| r.cost)).unwrap_or(0.0),
                characteristics: describe_cluster(&members, &features),
            });
        }

        let insights = cluster_insights(&call_patterns);
        let assignments = records
            .iter()
            .zip(labels)
            .map(|(record, label)| (record.id.clone(), label))
            .collect();

        debug!("Clustered {} calls into {} patterns", records.len(), call_patterns.len());
        Ok(PredictiveInsights::Patterns {
            features,
            call_patterns,
            insights,
            assignments,
        })
    }

    fn kmeans(&self, data: &[Vec<f64>], k: usize) -> Result<Vec<usize>> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut centroids = initial_centroids(data, k, &mut rng);
        let mut labels = vec![0usize; data.len()];

        for iteration in 0..self.config.max_iterations {
            assign(data, &centroids, &mut labels);

            let updated = update_centroids(data, &labels, &centroids);
            let shift = centroids
                .iter()
                .zip(&updated)
                .map(|(old, new)| squared_distance(old, new))
                .fold(0.0, f64::max)
                .sqrt();
            centroids = updated;

            if !shift.is_finite() {
                return Err(Error::internal("centroid update diverged"));
            }
            if shift <= self.config.tolerance {
                debug!("k-means converged after {} iterations", iteration + 1);
                break;
            }
        }

        assign(data, &centroids, &mut labels);
        Ok(labels)
    }
}

/// Zero mean, unit variance per column. Constant columns are only centred.
fn standardize(matrix: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
    if matrix.iter().flatten().any(|v| !v.is_finite()) {
        return Err(Error::internal("non-finite feature value"));
    }
    let Some(width) = matrix.first().map(Vec::len) else {
        return Ok(Vec::new());
    };

    let n = matrix.len() as f64;
    let mut scaled = matrix.to_vec();
    for column in 0..width {
        let column_mean = matrix.iter().map(|row| row[column]).sum::<f64>() / n;
        let variance = matrix
            .iter()
            .map(|row| (row[column] - column_mean).powi(2))
            .sum::<f64>()
            / n;
        let std_dev = variance.sqrt();
        let scale = if std_dev > f64::EPSILON { std_dev } else { 1.0 };

        for row in scaled.iter_mut() {
            row[column] = (row[column] - column_mean) / scale;
        }
    }
    Ok(scaled)
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Index of the closest centroid, lowest index on ties.
fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (index, centroid) in centroids.iter().enumerate() {
        let distance = squared_distance(point, centroid);
        if distance < best_distance {
            best = index;
            best_distance = distance;
        }
    }
    best
}

fn assign(data: &[Vec<f64>], centroids: &[Vec<f64>], labels: &mut [usize]) {
    for (label, point) in labels.iter_mut().zip(data) {
        *label = nearest(point, centroids);
    }
}

/// Member means per cluster; an empty cluster keeps its previous centroid.
fn update_centroids(data: &[Vec<f64>], labels: &[usize], previous: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let width = previous.first().map(Vec::len).unwrap_or(0);
    let mut sums = vec![vec![0.0; width]; previous.len()];
    let mut counts = vec![0usize; previous.len()];

    for (point, &label) in data.iter().zip(labels) {
        counts[label] += 1;
        for (sum, value) in sums[label].iter_mut().zip(point) {
            *sum += value;
        }
    }

    sums.into_iter()
        .zip(counts)
        .zip(previous)
        .map(|((sum, count), old)| {
            if count == 0 {
                old.clone()
            } else {
                sum.into_iter().map(|s| s / count as f64).collect()
            }
        })
        .collect()
}

/// k-means++ seeding: each next centroid is drawn with probability
/// proportional to its squared distance from the nearest chosen one.
fn initial_centroids(data: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(data[rng.gen_range(0..data.len())].clone());

    while centroids.len() < k {
        let weights: Vec<f64> = data
            .iter()
            .map(|point| {
                centroids
                    .iter()
                    .map(|c| squared_distance(point, c))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let total: f64 = weights.iter().sum();

        let next = if total > 0.0 {
            let target = rng.gen::<f64>() * total;
            let mut cumulative = 0.0;
            let mut chosen = weights.iter().rposition(|&w| w > 0.0).unwrap_or(0);
            for (index, &weight) in weights.iter().enumerate() {
                cumulative += weight;
                if weight > 0.0 && cumulative > target {
                    chosen = index;
                    break;
                }
            }
            chosen
        } else {
            // Every point coincides with a centroid
            rng.gen_range(0..data.len())
        };
        centroids.push(data[next].clone());
    }

    centroids
}

fn describe_cluster(members: &[&CallRecord], features: &[CallFeature]) -> String {
    let descriptions: Vec<&str> = features
        .iter()
        .filter_map(|&feature| {
            let feature_mean = mean(members.iter().filter_map(|r| feature.value(r)))?;
            feature.describe(feature_mean)
        })
        .collect();

    if descriptions.is_empty() {
        "Standard calls".to_string()
    } else {
        descriptions.join(", ")
    }
}

fn cluster_insights(patterns: &[CallPattern]) -> Vec<String> {
    let mut insights = Vec::new();

    let mut largest: Option<&CallPattern> = None;
    let mut costliest: Option<&CallPattern> = None;
    for pattern in patterns {
        if largest.map_or(true, |best| pattern.size > best.size) {
            largest = Some(pattern);
        }
        if costliest.map_or(true, |best| pattern.avg_cost > best.avg_cost) {
            costliest = Some(pattern);
        }
    }

    if let Some(pattern) = largest {
        insights.push(format!(
            "Most common call pattern: {} ({} calls)",
            pattern.characteristics, pattern.size
        ));
    }
    if let Some(pattern) = costliest {
        insights.push(format!(
            "Highest cost pattern: {} (${:.2} avg)",
            pattern.characteristics, pattern.avg_cost
        ));
    }
    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::fixtures::call;

    fn clusterer() -> PatternClusterer {
        PatternClusterer::new(ClusteringConfig::default())
    }

    fn two_archetypes() -> Vec<CallRecord> {
        let mut records = Vec::new();
        for i in 0..6 {
            records.push(call(&format!("long-{}", i), "A", 600.0, 3.0, Some(9.0), Some(8.0), 1, 9 + i));
            records.push(call(&format!("short-{}", i), "B", 30.0, 0.1, Some(3.0), Some(3.0), 2, 9 + i));
        }
        records
    }

    fn varied() -> Vec<CallRecord> {
        (0..15u32)
            .map(|i| {
                let duration = 20.0 + f64::from(i * 37 % 500);
                let quality = (f64::from(i % 10) + 0.5).min(10.0);
                let sentiment = if i % 4 == 0 { None } else { Some(f64::from(i % 7) + 2.0) };
                call(&format!("c{:02}", i), "A", duration, duration / 60.0 * 0.2, Some(quality), sentiment, 1 + i % 5, i % 24)
            })
            .collect()
    }

    #[test]
    fn test_cluster_count_rule() {
        assert_eq!(PatternClusterer::cluster_count(3), 2);
        assert_eq!(PatternClusterer::cluster_count(10), 3);
        assert_eq!(PatternClusterer::cluster_count(12), 4);
        assert_eq!(PatternClusterer::cluster_count(1000), 4);
    }

    #[test]
    fn test_nine_records_is_insufficient() {
        let records: Vec<_> = varied().into_iter().take(9).collect();
        let insights = clusterer().analyze(&records);
        assert!(insights.is_insufficient_data());
        assert!(insights.call_patterns().is_empty());
    }

    #[test]
    fn test_lowered_minimum_still_needs_ten_records() {
        let lenient = PatternClusterer::new(ClusteringConfig {
            min_records: 5,
            ..Default::default()
        });
        let records: Vec<_> = varied().into_iter().take(9).collect();
        assert!(lenient.analyze(&records).is_insufficient_data());

        let records: Vec<_> = varied().into_iter().take(10).collect();
        assert!(!lenient.analyze(&records).is_insufficient_data());
    }

    #[test]
    fn test_separates_archetypes() {
        let insights = clusterer().analyze(&two_archetypes());

        let PredictiveInsights::Patterns { call_patterns, insights, assignments, features } = insights else {
            panic!("expected call patterns");
        };
        assert_eq!(features.len(), 4);
        assert_eq!(call_patterns.len(), 2);
        assert!(call_patterns.iter().all(|p| p.size == 6));

        let long = call_patterns.iter().find(|p| p.avg_duration == 600.0).unwrap();
        assert_eq!(long.characteristics, "Long duration calls, Higher cost calls, High quality interactions");
        let short = call_patterns.iter().find(|p| p.avg_duration == 30.0).unwrap();
        assert_eq!(short.characteristics, "Short duration calls, Lower cost calls, Lower quality interactions");

        assert!(insights[0].starts_with("Most common call pattern: "));
        assert!(insights[0].ends_with("(6 calls)"));
        assert_eq!(
            insights[1],
            "Highest cost pattern: Long duration calls, Higher cost calls, High quality interactions ($3.00 avg)"
        );

        assert_eq!(assignments.len(), 12);
        assert_eq!(assignments["long-0"], assignments["long-5"]);
        assert_ne!(assignments["long-0"], assignments["short-0"]);
    }

    #[test]
    fn test_clustering_is_deterministic() {
        let records = varied();
        let first = clusterer().analyze(&records);
        let second = clusterer().analyze(&records);
        assert_eq!(first, second);

        let sizes: usize = first.call_patterns().iter().map(|p| p.size).sum();
        assert_eq!(sizes, records.len());
    }

    #[test]
    fn test_missing_feature_is_left_out() {
        let records: Vec<_> = varied()
            .into_iter()
            .map(|mut r| {
                r.sentiment_score = None;
                r
            })
            .collect();

        match clusterer().analyze(&records) {
            PredictiveInsights::Patterns { features, .. } => {
                assert_eq!(
                    features,
                    vec![CallFeature::Duration, CallFeature::Cost, CallFeature::QualityScore]
                );
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_values_become_analysis_error() {
        let mut records = varied();
        records[3].cost = f64::INFINITY;

        match clusterer().analyze(&records) {
            PredictiveInsights::AnalysisError { predictions } => {
                assert!(predictions.starts_with("Analysis error: "));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_standardize_constant_column() {
        let scaled = standardize(&[vec![5.0, 1.0], vec![5.0, 3.0]]).unwrap();
        assert_eq!(scaled[0], vec![0.0, -1.0]);
        assert_eq!(scaled[1], vec![0.0, 1.0]);
    }

    #[test]
    fn test_standard_calls_description() {
        let record = call("1", "A", 120.0, 0.7, Some(6.0), None, 1, 9);
        let description = describe_cluster(&[&record], &CallFeature::ALL);
        assert_eq!(description, "Standard calls");
    }
}
