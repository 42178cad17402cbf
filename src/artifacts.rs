//! Files produced for an application: tailored resume, cover letter and the
//! screenshot taken on submission.

use std::fmt::Write as _;
use std::path::PathBuf;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::info;

use crate::domain::{Job, UserProfile};
use crate::error::PipelineError;
use crate::oracle::TailoredContent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenArtifacts {
    pub resume_path: String,
    pub cover_letter_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub async fn write_application(
        &self,
        job: &Job,
        profile: &UserProfile,
        content: &TailoredContent,
    ) -> Result<WrittenArtifacts, PipelineError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let resume_path = self.dir.join(format!("{}_resume.md", job.id));
        tokio::fs::write(&resume_path, render_resume(job, profile, content)).await?;

        let cover_letter_path = if content.cover_letter.trim().is_empty() {
            None
        } else {
            let path = self.dir.join(format!("{}_cover_letter.txt", job.id));
            tokio::fs::write(&path, content.cover_letter.as_bytes()).await?;
            Some(path.display().to_string())
        };

        info!(job_id = job.id, path = %resume_path.display(), "Wrote application artifacts");
        Ok(WrittenArtifacts {
            resume_path: resume_path.display().to_string(),
            cover_letter_path,
        })
    }

    /// Decode a base64 PNG and store it next to the other artifacts.
    pub async fn save_screenshot(&self, job_id: i64, screenshot_b64: &str) -> Result<String, PipelineError> {
        let bytes = STANDARD
            .decode(screenshot_b64.trim())
            .map_err(|e| PipelineError::InvalidInput(format!("screenshot is not base64: {e}")))?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(format!("{job_id}_submitted.png"));
        tokio::fs::write(&path, bytes).await?;
        Ok(path.display().to_string())
    }
}

fn render_resume(job: &Job, profile: &UserProfile, content: &TailoredContent) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}", profile.full_name);

    let contact: Vec<&str> = [
        profile.email.as_str(),
        profile.phone.as_str(),
        profile.linkedin_url.as_str(),
        profile.github_url.as_str(),
    ]
    .into_iter()
    .filter(|c| !c.is_empty())
    .collect();
    let _ = writeln!(out, "{}\n", contact.join(" | "));

    if !profile.experience_summary.trim().is_empty() {
        let _ = writeln!(out, "## Summary\n\n{}\n", profile.experience_summary.trim());
    }

    let _ = writeln!(out, "## Highlights for {} at {}\n", job.title, job.company);
    for bullet in &content.resume_bullet_points {
        let _ = writeln!(out, "- {}", bullet.trim());
    }

    if !profile.skills.is_empty() {
        let _ = writeln!(out, "\n## Skills\n\n{}", profile.skills.join(", "));
    }
    out
}
