//! Structured decisions made by a language model.

pub mod error;
pub mod openai;
pub mod prompts;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::agent::Action;
use crate::browser::PageState;
use crate::domain::UserProfile;

pub use error::OracleError;
pub use openai::OpenAiOracle;

/// Verdict on how well a posting matches the candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitAnalysis {
    pub score: u8,
    pub reasoning: String,
    #[serde(default)]
    pub matching_skills: Vec<String>,
    #[serde(default, alias = "missing_critical_skills")]
    pub missing_skills: Vec<String>,
}

impl FitAnalysis {
    /// Reject scores outside 0..=100.
    pub fn validate(self) -> Result<Self, OracleError> {
        if self.score > 100 {
            return Err(OracleError::malformed(format!(
                "fit score {} is outside 0-100",
                self.score
            )));
        }
        Ok(self)
    }
}

/// Resume bullets and cover letter written for one posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TailoredContent {
    pub resume_bullet_points: Vec<String>,
    pub cover_letter: String,
}

#[async_trait]
pub trait DecisionOracle: Send + Sync {
    async fn evaluate(
        &self,
        description: &str,
        profile: &UserProfile,
    ) -> Result<FitAnalysis, OracleError>;

    /// `requirements` is the list of skills the draft should emphasise.
    async fn tailor(
        &self,
        description: &str,
        requirements: &[String],
        resume_text: &str,
    ) -> Result<TailoredContent, OracleError>;

    async fn next_action(&self, state: &PageState, context: &str) -> Result<Action, OracleError>;
}
