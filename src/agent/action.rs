use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::oracle::OracleError;

/// Artifact an upload field asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Resume,
    CoverLetter,
}

impl DocumentKind {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "resume" | "cv" => Some(DocumentKind::Resume),
            "cover_letter" => Some(DocumentKind::CoverLetter),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    Click { selector: String },
    Type { selector: String, text: String },
    Select { selector: String, label: String },
    Upload { selector: String, document: DocumentKind },
    Scroll { selector: Option<String> },
    Wait,
    Done,
    Fail,
}

/// One step decided by the oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    #[serde(rename = "action")]
    pub kind: ActionKind,
    /// Free text from the model. Logged, never acted on.
    pub reasoning: String,
}

/// Wire shape of an action as the model emits it.
#[derive(Debug, Deserialize)]
struct RawAction {
    action_type: String,
    #[serde(default)]
    selector: Option<String>,
    #[serde(default)]
    text_value: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Action {
    pub fn new(kind: ActionKind, reasoning: impl Into<String>) -> Self {
        Self {
            kind,
            reasoning: reasoning.into(),
        }
    }

    /// Decode a model reply. Unknown action types and actions missing the
    /// selector or value they need are rejected.
    pub fn decode(raw: Value) -> Result<Self, OracleError> {
        let raw: RawAction = serde_json::from_value(raw)?;
        let action_type = raw.action_type.trim().to_ascii_lowercase();
        let selector = non_empty(raw.selector);
        let require_selector = || {
            selector
                .clone()
                .ok_or_else(|| OracleError::malformed(format!("{action_type} action without selector")))
        };

        let kind = match action_type.as_str() {
            "click" => ActionKind::Click {
                selector: require_selector()?,
            },
            "type" => ActionKind::Type {
                selector: require_selector()?,
                text: raw
                    .text_value
                    .ok_or_else(|| OracleError::malformed("type action without text_value"))?,
            },
            "select" => ActionKind::Select {
                selector: require_selector()?,
                label: non_empty(raw.text_value)
                    .ok_or_else(|| OracleError::malformed("select action without option label"))?,
            },
            "upload" => {
                let document = raw
                    .text_value
                    .as_deref()
                    .and_then(DocumentKind::parse)
                    .ok_or_else(|| {
                        OracleError::malformed(format!(
                            "upload action names unknown document {:?}",
                            raw.text_value
                        ))
                    })?;
                ActionKind::Upload {
                    selector: require_selector()?,
                    document,
                }
            }
            "scroll" => ActionKind::Scroll {
                selector: selector.clone(),
            },
            "wait" => ActionKind::Wait,
            "done" => ActionKind::Done,
            "fail" => ActionKind::Fail,
            other => {
                return Err(OracleError::malformed(format!("unknown action type {other:?}")));
            }
        };

        Ok(Self {
            kind,
            reasoning: raw.reasoning.unwrap_or_default(),
        })
    }

    pub fn name(&self) -> &'static str {
        match self.kind {
            ActionKind::Click { .. } => "click",
            ActionKind::Type { .. } => "type",
            ActionKind::Select { .. } => "select",
            ActionKind::Upload { .. } => "upload",
            ActionKind::Scroll { .. } => "scroll",
            ActionKind::Wait => "wait",
            ActionKind::Done => "done",
            ActionKind::Fail => "fail",
        }
    }

    pub fn selector(&self) -> Option<&str> {
        match &self.kind {
            ActionKind::Click { selector }
            | ActionKind::Type { selector, .. }
            | ActionKind::Select { selector, .. }
            | ActionKind::Upload { selector, .. } => Some(selector),
            ActionKind::Scroll { selector } => selector.as_deref(),
            ActionKind::Wait | ActionKind::Done | ActionKind::Fail => None,
        }
    }
}
