use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Generated artifact set for one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: i64,
    pub job_id: i64,
    pub resume_path: String,
    pub cover_letter_path: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub screenshot_path: Option<String>,
    pub logs: Vec<ApplicationLogEntry>,
    pub created_at: DateTime<Utc>,
}

impl Application {
    pub fn is_submitted(&self) -> bool {
        self.submitted_at.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct NewApplication {
    pub job_id: i64,
    pub resume_path: String,
    pub cover_letter_path: Option<String>,
}

/// One structured entry of an application's append-only log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationLogEntry {
    pub at: DateTime<Utc>,
    pub kind: String,
    #[serde(default)]
    pub detail: Value,
}

impl ApplicationLogEntry {
    pub fn new(kind: impl Into<String>, detail: Value) -> Self {
        Self {
            at: Utc::now(),
            kind: kind.into(),
            detail,
        }
    }
}
