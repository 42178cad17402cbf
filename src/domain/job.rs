use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use validator::Validate;

/// Lifecycle status of a job posting.
///
/// Moves only forward:
///
/// ```text
/// DISCOVERED -> TAILORED | REJECTED
/// TAILORED   -> APPLIED  | INTERVIEW
/// APPLIED    -> INTERVIEW
/// ```
///
/// Serialized upper case. Parsed case-insensitively, from JSON and query
/// strings alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Discovered,
    Tailored,
    Rejected,
    Applied,
    Interview,
}

impl JobStatus {
    pub const ALL: [JobStatus; 5] = [
        JobStatus::Discovered,
        JobStatus::Tailored,
        JobStatus::Rejected,
        JobStatus::Applied,
        JobStatus::Interview,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Discovered => "DISCOVERED",
            JobStatus::Tailored => "TAILORED",
            JobStatus::Rejected => "REJECTED",
            JobStatus::Applied => "APPLIED",
            JobStatus::Interview => "INTERVIEW",
        }
    }

    /// Statuses a job must currently hold to be moved to `self`.
    pub fn predecessors(self) -> &'static [JobStatus] {
        match self {
            JobStatus::Discovered => &[],
            JobStatus::Tailored | JobStatus::Rejected => &[JobStatus::Discovered],
            JobStatus::Applied => &[JobStatus::Tailored],
            JobStatus::Interview => &[JobStatus::Tailored, JobStatus::Applied],
        }
    }

    pub fn can_advance_to(self, next: JobStatus) -> bool {
        next.predecessors().contains(&self)
    }

    /// Whether an application may exist for a job in this status.
    pub fn allows_application(self) -> bool {
        matches!(
            self,
            JobStatus::Tailored | JobStatus::Applied | JobStatus::Interview
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown job status: {s}"))
    }
}

impl<'de> Deserialize<'de> for JobStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// A discovered posting as persisted by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub platform: String,
    pub platform_job_id: String,
    pub title: String,
    pub company: String,
    pub url: String,
    pub description: String,
    pub fit_score: Option<u8>,
    pub fit_reasoning: Option<String>,
    pub status: JobStatus,
    pub requires_sponsorship: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw posting as handed over by a discovery producer.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Validate)]
pub struct IntakeItem {
    #[validate(length(min = 1, message = "platform must not be empty"))]
    pub platform: String,
    #[validate(length(min = 1, message = "platform_job_id must not be empty"))]
    pub platform_job_id: String,
    #[validate(length(min = 1, max = 300, message = "title must be between 1 and 300 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "company must not be empty"))]
    pub company: String,
    #[validate(url(message = "url must be an absolute URL"))]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Set by producers whose source marks the posting as needing visa sponsorship.
    #[serde(default)]
    pub requires_sponsorship: bool,
}

/// Insert form of a job; always starts out DISCOVERED.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub platform: String,
    pub platform_job_id: String,
    pub title: String,
    pub company: String,
    pub url: String,
    pub description: String,
    pub requires_sponsorship: bool,
}

impl From<IntakeItem> for NewJob {
    fn from(item: IntakeItem) -> Self {
        // Producers that could not scrape the body still get evaluated on the title.
        let description = item
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| item.title.clone());

        Self {
            platform: item.platform,
            platform_job_id: item.platform_job_id,
            title: item.title,
            company: item.company,
            url: item.url,
            description,
            requires_sponsorship: item.requires_sponsorship,
        }
    }
}

/// Filter for job listings.
#[derive(Debug, Clone, Deserialize)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub skip: i64,
}

impl Default for JobFilter {
    fn default() -> Self {
        Self {
            status: None,
            limit: default_limit(),
            skip: 0,
        }
    }
}

pub(crate) fn default_limit() -> i64 {
    50
}
