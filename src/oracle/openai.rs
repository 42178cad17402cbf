use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::agent::Action;
use crate::browser::PageState;
use crate::domain::UserProfile;
use crate::oracle::error::OracleError;
use crate::oracle::prompts::{self, render};
use crate::oracle::{DecisionOracle, FitAnalysis, TailoredContent};

/// Client for any OpenAI-compatible `/chat/completions` endpoint running in
/// JSON mode.
pub struct OpenAiOracle {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Value>,
    response_format: Value,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiOracle {
    pub fn new(
        api_base: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, OracleError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", api_base.trim_end_matches('/')),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Send one chat turn and return the raw JSON the model produced.
    async fn complete(&self, system: &str, user: Value) -> Result<Value, OracleError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                json!({"role": "system", "content": system}),
                json!({"role": "user", "content": user}),
            ],
            response_format: json!({"type": "json_object"}),
            temperature: 0.0,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(OracleError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.json::<ChatResponse>().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| OracleError::malformed("reply has no message content"))?;
        debug!(model = %self.model, bytes = content.len(), "Oracle replied");

        Ok(serde_json::from_str(&content)?)
    }

    async fn complete_as<T: DeserializeOwned>(
        &self,
        system: &str,
        user: Value,
    ) -> Result<T, OracleError> {
        let value = self.complete(system, user).await?;
        Ok(serde_json::from_value(value)?)
    }
}

#[async_trait]
impl DecisionOracle for OpenAiOracle {
    async fn evaluate(
        &self,
        description: &str,
        profile: &UserProfile,
    ) -> Result<FitAnalysis, OracleError> {
        let profile_json = serde_json::to_string_pretty(profile)?;
        let prompt = render(
            prompts::FIT_TEMPLATE,
            &[("profile", &profile_json), ("description", description)],
        )?;
        let fit: FitAnalysis = self.complete_as(prompts::FIT_SYSTEM, Value::String(prompt)).await?;
        fit.validate()
    }

    async fn tailor(
        &self,
        description: &str,
        requirements: &[String],
        resume_text: &str,
    ) -> Result<TailoredContent, OracleError> {
        let requirements = requirements.join(", ");
        let prompt = render(
            prompts::TAILOR_TEMPLATE,
            &[
                ("resume", resume_text),
                ("requirements", &requirements),
                ("description", description),
            ],
        )?;
        self.complete_as(prompts::TAILOR_SYSTEM, Value::String(prompt)).await
    }

    async fn next_action(&self, state: &PageState, context: &str) -> Result<Action, OracleError> {
        let text = render(
            prompts::ACTION_TEMPLATE,
            &[("context", context), ("url", &state.url), ("markup", &state.markup)],
        )?;
        let mut content = vec![json!({"type": "text", "text": text})];
        if !state.screenshot.is_empty() {
            content.push(json!({
                "type": "image_url",
                "image_url": {"url": format!("data:image/png;base64,{}", state.screenshot)}
            }));
        }

        let raw = self.complete(prompts::ACTION_SYSTEM, Value::Array(content)).await?;
        Action::decode(raw)
    }
}
