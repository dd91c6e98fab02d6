//! File-backed record source
//!
//! Call records are stored as JSON lines, one record per line. The agent
//! catalogue is a JSON array of agent profiles.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::RecordSource;
use crate::models::{Agent, AnalysisWindow, CallRecord};
use crate::{Error, Result};

pub struct FileCallStore {
    calls_path: PathBuf,
    agents_path: Option<PathBuf>,
}

impl FileCallStore {
    pub fn new(calls_path: impl Into<PathBuf>, agents_path: Option<PathBuf>) -> Self {
        Self {
            calls_path: calls_path.into(),
            agents_path,
        }
    }

    pub fn calls_path(&self) -> &Path {
        &self.calls_path
    }

    /// Read every record in the calls file. A missing file holds no calls.
    pub async fn load_all_records(&self) -> Result<Vec<CallRecord>> {
        let contents = match tokio::fs::read_to_string(&self.calls_path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Calls file {:?} does not exist yet", self.calls_path);
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(Error::storage(format!("reading {:?}: {}", self.calls_path, e)));
            }
        };

        let records = parse_call_lines(&contents)?;
        info!("Loaded {} call records from {:?}", records.len(), self.calls_path);
        Ok(records)
    }

    pub async fn append_record(&self, record: &CallRecord) -> Result<()> {
        record.validate()?;

        if let Some(parent) = self.calls_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.calls_path)
            .await?;

        let line = format!("{}\n", serde_json::to_string(record)?);
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Parse and validate every non-blank line, whatever window it falls in.
pub(crate) fn parse_call_lines(contents: &str) -> Result<Vec<CallRecord>> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            let record = serde_json::from_str::<CallRecord>(line)
                .map_err(|e| Error::parse(format!("calls line {}: {}", index + 1, e)))?;
            record.validate()?;
            Ok(record)
        })
        .collect()
}

#[async_trait]
impl RecordSource for FileCallStore {
    async fn get_call_records(&self, window: &AnalysisWindow) -> Result<Vec<CallRecord>> {
        let records = self.load_all_records().await?;
        Ok(records.into_iter().filter(|record| window.includes(record)).collect())
    }

    async fn get_agents(&self) -> Result<Vec<Agent>> {
        let Some(path) = &self.agents_path else {
            return Ok(Vec::new());
        };

        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::storage(format!("reading agents file {:?}: {}", path, e)))?;
        let agents: Vec<Agent> = serde_json::from_str(&contents)
            .map_err(|e| Error::parse(format!("agents file {:?}: {}", path, e)))?;
        Ok(agents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CallStatus;
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::TempDir;

    fn completed(id: &str, day: u32) -> CallRecord {
        let start = Utc.with_ymd_and_hms(2024, 3, day, 14, 0, 0).unwrap();
        let mut record = CallRecord::new(id, "neo-001", "Agent Neo", start);
        record.status = CallStatus::Completed;
        record.duration = 90.0;
        record.cost = 0.375;
        record.quality_score = Some(8.0);
        record.ended_at = Some(start + Duration::seconds(90));
        record
    }

    #[test]
    fn test_parse_call_lines_skips_blank_lines() {
        let a = serde_json::to_string(&completed("a", 1)).unwrap();
        let b = serde_json::to_string(&completed("b", 2)).unwrap();
        let contents = format!("{}\n\n{}\n   \n", a, b);

        let records = parse_call_lines(&contents).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].id, "b");
    }

    #[test]
    fn test_parse_call_lines_reports_line_number() {
        let a = serde_json::to_string(&completed("a", 1)).unwrap();
        let contents = format!("{}\n{{\"id\": 3}}\n", a);

        let err = parse_call_lines(&contents).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[tokio::test]
    async fn test_append_and_query_window() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileCallStore::new(temp_dir.path().join("data/calls.jsonl"), None);

        store.append_record(&completed("early", 1)).await.unwrap();
        store.append_record(&completed("late", 20)).await.unwrap();

        let window = AnalysisWindow::new(
            Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap(),
        )
        .unwrap();

        let records = store.get_call_records(&window).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "late");
        assert_eq!(records[0].quality_score, Some(8.0));
    }

    #[tokio::test]
    async fn test_malformed_record_outside_window_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let calls_path = temp_dir.path().join("calls.jsonl");

        let mut bad = completed("bad", 1);
        bad.cost = -2.0;
        let contents = format!(
            "{}\n{}\n",
            serde_json::to_string(&bad).unwrap(),
            serde_json::to_string(&completed("good", 20)).unwrap()
        );
        std::fs::write(&calls_path, contents).unwrap();

        let store = FileCallStore::new(calls_path, None);
        let window = AnalysisWindow::new(
            Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap(),
        )
        .unwrap();

        let result = store.get_call_records(&window).await;
        assert!(matches!(result, Err(Error::InvalidRecord(_))));
    }

    #[tokio::test]
    async fn test_missing_calls_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileCallStore::new(temp_dir.path().join("absent.jsonl"), None);

        assert!(store.load_all_records().await.unwrap().is_empty());
        assert!(store.get_agents().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_agent_catalogue() {
        let temp_dir = TempDir::new().unwrap();
        let agents_path = temp_dir.path().join("agents.json");
        std::fs::write(
            &agents_path,
            r#"[{"id": "neo-001", "name": "Agent Neo", "category": "Matrix Operations", "cost_per_minute": 0.25}]"#,
        )
        .unwrap();

        let store = FileCallStore::new(temp_dir.path().join("calls.jsonl"), Some(agents_path));
        let agents = store.get_agents().await.unwrap();
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].cost_per_minute, 0.25);
    }

    #[tokio::test]
    async fn test_append_rejects_invalid_record() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileCallStore::new(temp_dir.path().join("calls.jsonl"), None);

        let mut record = completed("bad", 1);
        record.ended_at = None;
        assert!(store.append_record(&record).await.is_err());
    }
}
