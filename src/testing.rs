//! Scripted collaborators shared by unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::agent::Action;
use crate::browser::{DriverError, DriverFactory, PageDriver, PageState};
use crate::domain::UserProfile;
use crate::error::PipelineError;
use crate::oracle::{DecisionOracle, FitAnalysis, OracleError, TailoredContent};
use crate::queue::StageQueue;

#[derive(Default)]
struct OracleScript {
    fit: Option<FitAnalysis>,
    content: Option<TailoredContent>,
    actions: VecDeque<Action>,
    repeat: Option<Action>,
    evaluate_calls: usize,
    tailor_calls: usize,
    action_calls: usize,
    requirements: Vec<Vec<String>>,
    markup_lengths: Vec<usize>,
}

/// Oracle that replays canned answers and counts calls. Anything not
/// scripted comes back as a malformed reply.
#[derive(Clone, Default)]
pub struct ScriptedOracle {
    script: Arc<Mutex<OracleScript>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_score(score: u8) -> Self {
        let oracle = Self::new();
        oracle.set(|s| {
            s.fit = Some(FitAnalysis {
                score,
                reasoning: format!("scored {score}"),
                matching_skills: vec!["Rust".into(), "PostgreSQL".into()],
                missing_skills: vec!["Go".into()],
            });
            s.content = Some(TailoredContent {
                resume_bullet_points: vec![
                    "Built a Rust ingestion service handling 5k events/s".into(),
                    "Ran PostgreSQL migrations with zero downtime".into(),
                ],
                cover_letter: "Dear hiring team,\n\nI would love to join.".into(),
            });
        });
        oracle
    }

    pub fn with_actions(actions: Vec<Action>) -> Self {
        let oracle = Self::new();
        oracle.set(|s| s.actions = actions.into());
        oracle
    }

    pub fn repeating(action: Action) -> Self {
        let oracle = Self::new();
        oracle.set(|s| s.repeat = Some(action));
        oracle
    }

    pub fn without_content(self) -> Self {
        self.set(|s| s.content = None);
        self
    }

    fn set(&self, f: impl FnOnce(&mut OracleScript)) {
        let mut script = self.script.lock().unwrap();
        f(&mut script);
    }

    fn read<T>(&self, f: impl FnOnce(&OracleScript) -> T) -> T {
        f(&self.script.lock().unwrap())
    }

    pub fn evaluate_calls(&self) -> usize {
        self.read(|s| s.evaluate_calls)
    }

    pub fn tailor_calls(&self) -> usize {
        self.read(|s| s.tailor_calls)
    }

    pub fn action_calls(&self) -> usize {
        self.read(|s| s.action_calls)
    }

    pub fn tailor_requirements(&self) -> Vec<Vec<String>> {
        self.read(|s| s.requirements.clone())
    }

    pub fn seen_markup_lengths(&self) -> Vec<usize> {
        self.read(|s| s.markup_lengths.clone())
    }
}

#[async_trait]
impl DecisionOracle for ScriptedOracle {
    async fn evaluate(&self, _description: &str, _profile: &UserProfile) -> Result<FitAnalysis, OracleError> {
        let mut s = self.script.lock().unwrap();
        s.evaluate_calls += 1;
        s.fit
            .clone()
            .ok_or_else(|| OracleError::malformed("no fit scripted"))?
            .validate()
    }

    async fn tailor(
        &self,
        _description: &str,
        requirements: &[String],
        _resume_text: &str,
    ) -> Result<TailoredContent, OracleError> {
        let mut s = self.script.lock().unwrap();
        s.tailor_calls += 1;
        s.requirements.push(requirements.to_vec());
        s.content
            .clone()
            .ok_or_else(|| OracleError::malformed("no content scripted"))
    }

    async fn next_action(&self, state: &PageState, _context: &str) -> Result<Action, OracleError> {
        let mut s = self.script.lock().unwrap();
        s.action_calls += 1;
        s.markup_lengths.push(state.markup.chars().count());
        if let Some(action) = s.actions.pop_front() {
            return Ok(action);
        }
        s.repeat
            .clone()
            .ok_or_else(|| OracleError::malformed("script exhausted"))
    }
}

#[derive(Default)]
struct DriverLog {
    calls: Vec<String>,
}

/// Driver that records every interaction instead of touching a browser.
#[derive(Clone)]
pub struct RecordingDriver {
    log: Arc<Mutex<DriverLog>>,
    fail_on: Option<&'static str>,
    markup: String,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self {
            log: Arc::default(),
            fail_on: None,
            markup: "<form><button id=\"next\">Next</button></form>".into(),
        }
    }

    /// Make the named operation fail with `NoSuchElement`.
    pub fn failing_on(mut self, op: &'static str) -> Self {
        self.fail_on = Some(op);
        self
    }

    pub fn with_markup(mut self, markup: String) -> Self {
        self.markup = markup;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().calls.clone()
    }

    fn record(&self, op: &'static str, call: String) -> Result<(), DriverError> {
        if self.fail_on == Some(op) {
            return Err(DriverError::NoSuchElement(call));
        }
        self.log.lock().unwrap().calls.push(call);
        Ok(())
    }
}

#[async_trait]
impl PageDriver for RecordingDriver {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.record("navigate", format!("navigate {url}"))
    }

    async fn capture_state(&self) -> Result<PageState, DriverError> {
        if self.fail_on == Some("capture") {
            return Err(DriverError::Session("capture failed".into()));
        }
        Ok(PageState {
            // "png-bytes"
            screenshot: "cG5nLWJ5dGVz".into(),
            markup: self.markup.clone(),
            url: "https://jobs.example.com/1".into(),
        })
    }

    async fn click(&self, selector: &str) -> Result<(), DriverError> {
        self.record("click", format!("click {selector}"))
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<(), DriverError> {
        self.record("fill", format!("fill {selector} {text}"))
    }

    async fn select_option(&self, selector: &str, label: &str) -> Result<(), DriverError> {
        self.record("select", format!("select {selector} {label}"))
    }

    async fn upload_file(&self, selector: &str, path: &str) -> Result<(), DriverError> {
        self.record("upload", format!("upload {selector} {path}"))
    }

    async fn scroll(&self, selector: Option<&str>) -> Result<(), DriverError> {
        self.record("scroll", format!("scroll {}", selector.unwrap_or("-")))
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.record("close", "close".into())
    }
}

/// Hands out clones of one [`RecordingDriver`].
pub struct RecordingFactory {
    pub driver: RecordingDriver,
    pub opened: Arc<Mutex<usize>>,
}

impl RecordingFactory {
    pub fn new(driver: RecordingDriver) -> Self {
        Self {
            driver,
            opened: Arc::default(),
        }
    }

    pub fn opened(&self) -> usize {
        *self.opened.lock().unwrap()
    }
}

#[async_trait]
impl DriverFactory for RecordingFactory {
    async fn open(&self) -> Result<Box<dyn PageDriver>, DriverError> {
        *self.opened.lock().unwrap() += 1;
        Ok(Box::new(self.driver.clone()))
    }
}

/// Queue whose every operation fails, as when its backing store is down.
pub struct DownQueue;

#[async_trait]
impl StageQueue for DownQueue {
    fn name(&self) -> &str {
        "down"
    }

    async fn enqueue(&self, _item: Value) -> Result<(), PipelineError> {
        Err(PipelineError::TransientIo("queue down".into()))
    }

    async fn dequeue(&self, _timeout: Duration) -> Result<Option<Value>, PipelineError> {
        Err(PipelineError::TransientIo("queue down".into()))
    }

    async fn len(&self) -> Result<u64, PipelineError> {
        Err(PipelineError::TransientIo("queue down".into()))
    }
}
