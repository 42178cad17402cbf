//! Append-only pipeline event log.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    JobDiscovered,
    JobAnalyzed,
    ApplicationGenerated,
    ApplicationSubmitted,
    ApplicationSkipped,
    JobRejected,
}

impl Event {
    pub fn as_str(self) -> &'static str {
        match self {
            Event::JobDiscovered => "job_discovered",
            Event::JobAnalyzed => "job_analyzed",
            Event::ApplicationGenerated => "application_generated",
            Event::ApplicationSubmitted => "application_submitted",
            Event::ApplicationSkipped => "application_skipped",
            Event::JobRejected => "job_rejected",
        }
    }
}

/// One line of the event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub timestamp: DateTime<Utc>,
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

/// Event counts by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalyticsStats {
    pub jobs_discovered: u64,
    pub jobs_analyzed: u64,
    pub applications_generated: u64,
    pub applications_submitted: u64,
    pub applications_skipped: u64,
    pub jobs_rejected: u64,
}

impl AnalyticsStats {
    pub fn record(&mut self, event: &str) {
        match event {
            "job_discovered" => self.jobs_discovered += 1,
            "job_analyzed" => self.jobs_analyzed += 1,
            "application_generated" => self.applications_generated += 1,
            "application_submitted" => self.applications_submitted += 1,
            "application_skipped" => self.applications_skipped += 1,
            "job_rejected" => self.jobs_rejected += 1,
            other => debug!(event = other, "Ignoring unknown analytics event"),
        }
    }
}

#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    /// Record an event. Failures are logged and swallowed.
    async fn emit(&self, event: Event, data: Value);

    async fn stats(&self) -> Result<AnalyticsStats, PipelineError>;
}

/// Writes one JSON object per line to a file.
pub struct JsonlAnalytics {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlAnalytics {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn append(&self, line: &str) -> std::io::Result<()> {
        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await
    }
}

#[async_trait]
impl AnalyticsSink for JsonlAnalytics {
    async fn emit(&self, event: Event, data: Value) {
        let record = EventRecord {
            timestamp: Utc::now(),
            event: event.as_str().to_string(),
            data,
        };
        let line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(e) => {
                error!(event = event.as_str(), "Failed to encode analytics event: {}", e);
                return;
            }
        };
        if let Err(e) = self.append(&line).await {
            error!(event = event.as_str(), path = %self.path.display(), "Failed to write analytics event: {}", e);
        }
    }

    async fn stats(&self) -> Result<AnalyticsStats, PipelineError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(AnalyticsStats::default()),
            Err(e) => return Err(e.into()),
        };

        let mut stats = AnalyticsStats::default();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            match serde_json::from_str::<EventRecord>(line) {
                Ok(record) => stats.record(&record.event),
                Err(e) => debug!("Skipping unreadable analytics line: {}", e),
            }
        }
        Ok(stats)
    }
}
