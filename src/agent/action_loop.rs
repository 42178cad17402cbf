use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::agent::action::{Action, ActionKind, DocumentKind};
use crate::browser::{DriverError, PageDriver};
use crate::domain::{Application, ApplicationLogEntry};
use crate::oracle::DecisionOracle;

#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub max_steps: usize,
    pub pacing_min: Duration,
    pub pacing_max: Duration,
    /// Characters of page markup handed to the oracle per step.
    pub markup_limit: usize,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            max_steps: 10,
            pacing_min: Duration::from_secs(2),
            pacing_max: Duration::from_secs(4),
            markup_limit: 20_000,
        }
    }
}

/// Artifact paths an `upload` action may resolve to.
#[derive(Debug, Clone, Default)]
pub struct Documents {
    pub resume: Option<String>,
    pub cover_letter: Option<String>,
}

impl Documents {
    pub fn path(&self, kind: DocumentKind) -> Option<&str> {
        let path = match kind {
            DocumentKind::Resume => self.resume.as_deref(),
            DocumentKind::CoverLetter => self.cover_letter.as_deref(),
        };
        path.filter(|p| !p.trim().is_empty())
    }
}

impl From<&Application> for Documents {
    fn from(app: &Application) -> Self {
        Self {
            resume: Some(app.resume_path.clone()),
            cover_letter: app.cover_letter_path.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopOutcome {
    /// The oracle reported the form finished.
    Completed { steps: usize },
    /// The oracle gave up, errored, or the page could not be driven.
    Failed { steps: usize, reason: String },
    /// The step budget ran out first.
    Incomplete { steps: usize },
}

impl LoopOutcome {
    pub fn steps(&self) -> usize {
        match self {
            LoopOutcome::Completed { steps }
            | LoopOutcome::Failed { steps, .. }
            | LoopOutcome::Incomplete { steps } => *steps,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LoopOutcome::Completed { .. } => "completed",
            LoopOutcome::Failed { .. } => "failed",
            LoopOutcome::Incomplete { .. } => "incomplete",
        }
    }
}

#[derive(Debug)]
pub struct LoopReport {
    pub outcome: LoopOutcome,
    pub log: Vec<ApplicationLogEntry>,
}

enum Step {
    Continue,
    Finished(LoopOutcome),
}

/// Drives a page towards a submitted form, one oracle decision at a time.
pub struct ActionLoop {
    oracle: Arc<dyn DecisionOracle>,
    settings: LoopSettings,
}

impl ActionLoop {
    pub fn new(oracle: Arc<dyn DecisionOracle>, settings: LoopSettings) -> Self {
        Self { oracle, settings }
    }

    pub async fn run(
        &self,
        driver: &dyn PageDriver,
        url: &str,
        context: &str,
        documents: &Documents,
        cancel: &CancellationToken,
    ) -> LoopReport {
        let mut log = Vec::new();

        if let Err(e) = driver.navigate(url).await {
            warn!(url, "Navigation failed: {}", e);
            log.push(ApplicationLogEntry::new(
                "navigation_failed",
                json!({"url": url, "error": e.to_string()}),
            ));
            return self.finish(
                LoopOutcome::Failed {
                    steps: 0,
                    reason: format!("navigation failed: {e}"),
                },
                log,
            );
        }
        log.push(ApplicationLogEntry::new("navigated", json!({"url": url})));

        for step in 1..=self.settings.max_steps {
            if cancel.is_cancelled() {
                return self.finish(
                    LoopOutcome::Failed {
                        steps: step - 1,
                        reason: "cancelled".into(),
                    },
                    log,
                );
            }

            info!(step, max_steps = self.settings.max_steps, "Action loop step");
            match self.step(step, driver, context, documents, &mut log).await {
                Step::Finished(outcome) => return self.finish(outcome, log),
                Step::Continue => self.pace().await,
            }
        }

        self.finish(
            LoopOutcome::Incomplete {
                steps: self.settings.max_steps,
            },
            log,
        )
    }

    async fn step(
        &self,
        step: usize,
        driver: &dyn PageDriver,
        context: &str,
        documents: &Documents,
        log: &mut Vec<ApplicationLogEntry>,
    ) -> Step {
        let mut state = match driver.capture_state().await {
            Ok(state) => state,
            Err(e) => return driver_failure(step, "capture", e, log),
        };
        state.truncate_markup(self.settings.markup_limit);

        let action = match self.oracle.next_action(&state, context).await {
            Ok(action) => action,
            Err(e) => {
                warn!(step, "Oracle failed to pick an action: {}", e);
                log.push(ApplicationLogEntry::new(
                    "oracle_failed",
                    json!({"step": step, "error": e.to_string()}),
                ));
                return Step::Finished(LoopOutcome::Failed {
                    steps: step,
                    reason: format!("oracle failure: {e}"),
                });
            }
        };

        info!(step, action = action.name(), selector = ?action.selector(), "Oracle decided");
        log.push(ApplicationLogEntry::new(
            "step",
            json!({
                "step": step,
                "url": state.url,
                "action": action.name(),
                "selector": action.selector(),
                "reasoning": action.reasoning,
            }),
        ));

        match self.act(&action, driver, documents, log).await {
            Ok(()) => {}
            Err(e) => return driver_failure(step, action.name(), e, log),
        }

        match action.kind {
            ActionKind::Done => Step::Finished(LoopOutcome::Completed { steps: step }),
            ActionKind::Fail => Step::Finished(LoopOutcome::Failed {
                steps: step,
                reason: if action.reasoning.is_empty() {
                    "oracle reported failure".into()
                } else {
                    action.reasoning
                },
            }),
            _ => Step::Continue,
        }
    }

    async fn act(
        &self,
        action: &Action,
        driver: &dyn PageDriver,
        documents: &Documents,
        log: &mut Vec<ApplicationLogEntry>,
    ) -> Result<(), DriverError> {
        match &action.kind {
            ActionKind::Click { selector } => driver.click(selector).await,
            ActionKind::Type { selector, text } => driver.fill(selector, text).await,
            ActionKind::Select { selector, label } => driver.select_option(selector, label).await,
            ActionKind::Upload { selector, document } => match documents.path(*document) {
                Some(path) => {
                    driver.upload_file(selector, path).await?;
                    info!(path, "Uploaded document");
                    Ok(())
                }
                None => {
                    warn!(?document, "Upload requested but no file is available");
                    log.push(ApplicationLogEntry::new(
                        "upload_skipped",
                        json!({"document": document, "selector": selector}),
                    ));
                    Ok(())
                }
            },
            ActionKind::Scroll { selector } => driver.scroll(selector.as_deref()).await,
            ActionKind::Wait => {
                self.pace().await;
                Ok(())
            }
            ActionKind::Done | ActionKind::Fail => Ok(()),
        }
    }

    async fn pace(&self) {
        let LoopSettings {
            pacing_min,
            pacing_max,
            ..
        } = self.settings;
        let min = pacing_min.as_millis() as u64;
        let max = (pacing_max.as_millis() as u64).max(min);
        let delay = rand::thread_rng().gen_range(min..=max);
        if delay > 0 {
            debug!(delay_ms = delay, "Pacing");
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }

    fn finish(&self, outcome: LoopOutcome, mut log: Vec<ApplicationLogEntry>) -> LoopReport {
        let reason = match &outcome {
            LoopOutcome::Failed { reason, .. } => Some(reason.clone()),
            _ => None,
        };
        info!(outcome = outcome.label(), steps = outcome.steps(), "Action loop finished");
        log.push(ApplicationLogEntry::new(
            "loop_finished",
            json!({"outcome": outcome.label(), "steps": outcome.steps(), "reason": reason}),
        ));
        LoopReport { outcome, log }
    }
}

fn driver_failure(
    step: usize,
    op: &str,
    err: DriverError,
    log: &mut Vec<ApplicationLogEntry>,
) -> Step {
    warn!(step, op, "Page driver failed: {}", err);
    log.push(ApplicationLogEntry::new(
        "driver_failed",
        json!({"step": step, "operation": op, "error": err.to_string()}),
    ));
    Step::Finished(LoopOutcome::Failed {
        steps: step,
        reason: format!("transient I/O failure: {err}"),
    })
}
