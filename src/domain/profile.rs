use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Candidate profile the oracle evaluates postings against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub linkedin_url: String,
    #[serde(default)]
    pub github_url: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience_summary: String,
    #[serde(default)]
    pub resume_raw_text: String,
    #[serde(default)]
    pub requires_sponsorship: bool,
}

impl UserProfile {
    /// Load a profile from a JSON file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            PipelineError::InvalidInput(format!("cannot read profile {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            PipelineError::InvalidInput(format!("invalid profile {}: {e}", path.display()))
        })
    }

    /// Plain-text context handed to the oracle while filling forms.
    pub fn form_context(&self) -> String {
        let mut lines = vec![
            format!("Name: {}", self.full_name),
            format!("Email: {}", self.email),
        ];
        if !self.phone.is_empty() {
            lines.push(format!("Phone: {}", self.phone));
        }
        if !self.linkedin_url.is_empty() {
            lines.push(format!("LinkedIn: {}", self.linkedin_url));
        }
        if !self.github_url.is_empty() {
            lines.push(format!("GitHub: {}", self.github_url));
        }
        if !self.skills.is_empty() {
            lines.push(format!("Skills: {}", self.skills.join(", ")));
        }
        lines.push(format!(
            "Requires visa sponsorship: {}",
            if self.requires_sponsorship { "yes" } else { "no" }
        ));
        lines.join("\n")
    }
}

#[cfg(test)]
pub(crate) fn sample_profile() -> UserProfile {
    UserProfile {
        full_name: "Dana Kim".into(),
        email: "dana@example.com".into(),
        phone: "+1-555-0100".into(),
        linkedin_url: "linkedin.com/in/danakim".into(),
        github_url: String::new(),
        skills: vec!["Rust".into(), "PostgreSQL".into(), "Kubernetes".into()],
        experience_summary: "Backend engineer, six years on payment systems.".into(),
        resume_raw_text: "Built ledger services handling 2k TPS.".into(),
        requires_sponsorship: false,
    }
}
