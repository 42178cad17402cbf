use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::domain::{Job, UserProfile};
use crate::oracle::{FitAnalysis, TailoredContent};

/// Nodes of the fit/tailoring graph.
///
/// START → ANALYZE_FIT → (TAILOR_CONTENT | ARCHIVE) → END
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Node {
    Start,
    AnalyzeFit,
    TailorContent,
    Archive,
    End,
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Start => write!(f, "START"),
            Node::AnalyzeFit => write!(f, "ANALYZE_FIT"),
            Node::TailorContent => write!(f, "TAILOR_CONTENT"),
            Node::Archive => write!(f, "ARCHIVE"),
            Node::End => write!(f, "END"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Apply,
    Reject,
}

impl Decision {
    /// APPLY only when `score` is strictly above `threshold`.
    pub fn for_score(score: u8, threshold: u8) -> Self {
        if score > threshold {
            Decision::Apply
        } else {
            Decision::Reject
        }
    }
}

/// Value threaded through one run of the graph.
#[derive(Debug, Clone)]
pub struct WorkflowState {
    pub job: Job,
    pub profile: Arc<UserProfile>,
    pub node: Node,
    pub fit: Option<FitAnalysis>,
    pub content: Option<TailoredContent>,
    pub decision: Option<Decision>,
    pub visited: Vec<Node>,
}

impl WorkflowState {
    pub fn new(job: Job, profile: Arc<UserProfile>) -> Self {
        Self {
            job,
            profile,
            node: Node::Start,
            fit: None,
            content: None,
            decision: None,
            visited: Vec::new(),
        }
    }

    /// The node after the current one. END stays at END.
    pub fn next_node(&self) -> Node {
        match self.node {
            Node::Start => Node::AnalyzeFit,
            Node::AnalyzeFit => match self.decision {
                Some(Decision::Apply) => Node::TailorContent,
                _ => Node::Archive,
            },
            Node::TailorContent | Node::Archive | Node::End => Node::End,
        }
    }

    pub fn advance(&mut self) {
        self.visited.push(self.node);
        self.node = self.next_node();
    }
}

/// Terminal decision of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowOutcome {
    Tailored {
        fit: FitAnalysis,
        content: TailoredContent,
    },
    Rejected {
        fit: FitAnalysis,
    },
}

impl WorkflowOutcome {
    pub fn fit(&self) -> &FitAnalysis {
        match self {
            WorkflowOutcome::Tailored { fit, .. } | WorkflowOutcome::Rejected { fit } => fit,
        }
    }

    pub fn decision(&self) -> Decision {
        match self {
            WorkflowOutcome::Tailored { .. } => Decision::Apply,
            WorkflowOutcome::Rejected { .. } => Decision::Reject,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowRun {
    pub outcome: WorkflowOutcome,
    pub visited: Vec<Node>,
}
