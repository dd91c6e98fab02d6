//! Configuration management for the Matrix call analytics pipeline

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::analytics::clustering::MIN_RECORDS;
use crate::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    pub general: GeneralConfig,
    pub analytics: AnalyticsSettings,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub app_name: String,
    pub description: String,
    /// Length of the report window used when no explicit bounds are given.
    pub default_window_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsSettings {
    pub clustering: ClusteringConfig,
    pub recommendations: RecommendationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusteringConfig {
    pub seed: u64,
    pub max_iterations: u32,
    pub tolerance: f64,
    pub min_records: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationConfig {
    /// Mean quality below which the lowest-quality agents are flagged.
    pub quality_threshold: f64,
    /// Share of total calls below which an agent counts as underutilized.
    pub underutilized_share: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub calls_path: Option<String>,
    pub agents_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum LogFormat {
    #[serde(rename = "json")]
    Json,
    #[serde(rename = "compact")]
    Compact,
    #[serde(rename = "full")]
    Full,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            max_iterations: 300,
            tolerance: 1e-4,
            min_records: 10,
        }
    }
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            quality_threshold: 7.0,
            underutilized_share: 0.10,
        }
    }
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            clustering: ClusteringConfig::default(),
            recommendations: RecommendationConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            format: LogFormat::Full,
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

impl AnalyticsConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: AnalyticsConfig = toml::from_str(&contents)
            .map_err(|e| Error::parse(format!("Invalid TOML: {}", e)))?;
        Ok(config)
    }

    /// Defaults overlaid with `MATRIX__`-prefixed environment variables,
    /// e.g. `MATRIX__LOGGING__LEVEL=debug`. Unset keys keep their defaults.
    pub fn load_from_env() -> Result<Self> {
        let defaults = config::Config::try_from(&Self::default_config())?;

        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(
                config::Environment::with_prefix("MATRIX")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let analytics_config = settings.try_deserialize()?;
        Ok(analytics_config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.general.default_window_days == 0 {
            return Err(Error::parse("Default window must be at least one day"));
        }

        let clustering = &self.analytics.clustering;
        if clustering.max_iterations == 0 {
            return Err(Error::parse("Clustering max_iterations must be positive"));
        }
        if !(clustering.tolerance.is_finite() && clustering.tolerance >= 0.0) {
            return Err(Error::parse("Clustering tolerance must be a non-negative number"));
        }
        if clustering.min_records < MIN_RECORDS {
            return Err(Error::parse(format!(
                "Clustering min_records must be at least {}",
                MIN_RECORDS
            )));
        }

        let recommendations = &self.analytics.recommendations;
        if !(0.0..=10.0).contains(&recommendations.quality_threshold) {
            return Err(Error::parse("Quality threshold must lie on the 0-10 score scale"));
        }
        if !(0.0..=1.0).contains(&recommendations.underutilized_share) {
            return Err(Error::parse("Underutilized share must be a fraction between 0 and 1"));
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => return Err(Error::parse(format!("Invalid log level: {}", other))),
        }

        Ok(())
    }

    pub fn default_config() -> Self {
        Self {
            general: GeneralConfig {
                app_name: "AI CALL MATRIX".to_string(),
                description: "Analytics for AI voice-call agents".to_string(),
                default_window_days: 30,
            },
            analytics: AnalyticsSettings::default(),
            store: StoreConfig {
                calls_path: None,
                agents_path: None,
            },
            logging: LoggingConfig::default(),
        }
    }
}
