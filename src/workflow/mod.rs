//! Fit evaluation and content tailoring for a freshly discovered job.

pub mod intake;
pub mod state;

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::{Job, UserProfile};
use crate::oracle::{DecisionOracle, OracleError};

pub use intake::{IntakeOutcome, IntakePipeline};
pub use state::{Decision, Node, WorkflowOutcome, WorkflowRun, WorkflowState};

/// Runs the START → ANALYZE_FIT → TAILOR_CONTENT | ARCHIVE → END graph.
///
/// The workflow only decides. Persisting the result is up to the caller. An
/// oracle failure aborts the run with no decision and nothing is retried.
#[derive(Clone)]
pub struct FitWorkflow {
    oracle: Arc<dyn DecisionOracle>,
    threshold: u8,
}

impl FitWorkflow {
    pub fn new(oracle: Arc<dyn DecisionOracle>, threshold: u8) -> Self {
        Self { oracle, threshold }
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    pub async fn run(&self, job: Job, profile: Arc<UserProfile>) -> Result<WorkflowRun, OracleError> {
        let mut state = WorkflowState::new(job, profile);

        while state.node != Node::End {
            debug!(job_id = state.job.id, node = %state.node, "Workflow node");
            match state.node {
                Node::AnalyzeFit => self.analyze_fit(&mut state).await?,
                Node::TailorContent => self.tailor_content(&mut state).await?,
                Node::Archive => archive_job(&mut state),
                Node::Start | Node::End => {}
            }
            state.advance();
        }
        state.visited.push(Node::End);

        let outcome = match (state.decision, state.fit, state.content) {
            (Some(Decision::Apply), Some(fit), Some(content)) => WorkflowOutcome::Tailored { fit, content },
            (Some(Decision::Reject), Some(fit), _) => WorkflowOutcome::Rejected { fit },
            _ => return Err(OracleError::malformed("workflow ended without a decision")),
        };
        Ok(WorkflowRun {
            outcome,
            visited: state.visited,
        })
    }

    async fn analyze_fit(&self, state: &mut WorkflowState) -> Result<(), OracleError> {
        let fit = self
            .oracle
            .evaluate(&state.job.description, &state.profile)
            .await?
            .validate()?;
        let decision = Decision::for_score(fit.score, self.threshold);
        info!(
            job_id = state.job.id,
            score = fit.score,
            threshold = self.threshold,
            ?decision,
            "Fit analysed"
        );
        state.fit = Some(fit);
        state.decision = Some(decision);
        Ok(())
    }

    async fn tailor_content(&self, state: &mut WorkflowState) -> Result<(), OracleError> {
        let requirements = state
            .fit
            .as_ref()
            .map(|fit| fit.matching_skills.clone())
            .unwrap_or_default();
        let content = self
            .oracle
            .tailor(&state.job.description, &requirements, &state.profile.resume_raw_text)
            .await?;
        info!(
            job_id = state.job.id,
            bullets = content.resume_bullet_points.len(),
            "Content tailored"
        );
        state.content = Some(content);
        Ok(())
    }
}

fn archive_job(state: &mut WorkflowState) {
    info!(job_id = state.job.id, "Archiving job");
    state.decision = Some(Decision::Reject);
}
