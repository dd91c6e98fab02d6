//! Call records produced by the voice-agent platform

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Lifecycle state of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Connected,
    Disconnected,
    Completed,
    Failed,
}

impl CallStatus {
    /// Whether the call has ended and its duration and cost are final.
    pub fn is_terminal(self) -> bool {
        !matches!(self, CallStatus::Connected)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CallStatus::Connected => "connected",
            CallStatus::Disconnected => "disconnected",
            CallStatus::Completed => "completed",
            CallStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One voice-agent interaction.
///
/// Created as `Connected` with zero duration and cost, finalized once when
/// the call ends, and optionally enriched later with recording, transcript
/// and scores fetched from the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    pub id: String,
    pub agent_id: String,
    pub agent_name: String,
    pub status: CallStatus,
    /// Elapsed seconds
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub quality_score: Option<f64>,
    #[serde(default)]
    pub sentiment_score: Option<f64>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub recording_url: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub customer_number: Option<String>,
}

impl CallRecord {
    pub fn new(
        id: impl Into<String>,
        agent_id: impl Into<String>,
        agent_name: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            agent_id: agent_id.into(),
            agent_name: agent_name.into(),
            status: CallStatus::Connected,
            duration: 0.0,
            cost: 0.0,
            quality_score: None,
            sentiment_score: None,
            started_at,
            ended_at: None,
            recording_url: None,
            transcript: None,
            summary: None,
            phone_number: None,
            customer_number: None,
        }
    }

    /// A record whose duration and cost are not final yet.
    pub fn is_provisional(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Quality score, with non-finite values treated as missing.
    pub fn quality(&self) -> Option<f64> {
        self.quality_score.filter(|q| q.is_finite())
    }

    /// Sentiment score, with non-finite values treated as missing.
    pub fn sentiment(&self) -> Option<f64> {
        self.sentiment_score.filter(|s| s.is_finite())
    }

    /// Reject records downstream aggregation cannot make sense of.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::invalid_record("call record without id"));
        }
        if self.agent_name.trim().is_empty() {
            return Err(Error::invalid_record(format!("call {} has no agent name", self.id)));
        }
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(Error::invalid_record(format!(
                "call {} has invalid duration {}",
                self.id, self.duration
            )));
        }
        if !self.cost.is_finite() || self.cost < 0.0 {
            return Err(Error::invalid_record(format!(
                "call {} has invalid cost {}",
                self.id, self.cost
            )));
        }
        if self.status.is_terminal() != self.ended_at.is_some() {
            return Err(Error::invalid_record(format!(
                "call {} is {} but ended_at is {}",
                self.id,
                self.status,
                if self.ended_at.is_some() { "set" } else { "missing" }
            )));
        }
        Ok(())
    }
}
