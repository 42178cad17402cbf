//! Prompt templates. `{{name}}` placeholders are filled by [`render`].

use std::sync::LazyLock;

use handlebars::{no_escape, Handlebars};
use serde_json::{Map, Value};

use crate::oracle::OracleError;

pub const FIT_SYSTEM: &str = "You are an expert career coach and technical recruiter. \
Answer with a single JSON object and nothing else.";

pub const FIT_TEMPLATE: &str = "Evaluate the job description against the candidate profile.

CANDIDATE PROFILE:
{{profile}}

JOB DESCRIPTION:
{{description}}

Return JSON with these keys:
- \"score\": integer fit score from 0 to 100 (above 80 strong match, below 60 poor match)
- \"reasoning\": one short paragraph explaining the score
- \"matching_skills\": skills present in both the job and the profile
- \"missing_skills\": skills the job requires that the profile lacks";

pub const TAILOR_SYSTEM: &str = "You are an expert resume writer. \
Answer with a single JSON object and nothing else.";

pub const TAILOR_TEMPLATE: &str = "Draft tailored resume bullet points and a cover letter for this application.

CANDIDATE BASE RESUME:
{{resume}}

JOB REQUIREMENTS:
{{requirements}}

JOB DESCRIPTION:
{{description}}

The cover letter must be professional and at most 200 words. The bullet points
must highlight experience relevant to the requirements.

Return JSON with keys \"resume_bullet_points\" (array of strings) and
\"cover_letter\" (string).";

pub const ACTION_SYSTEM: &str = "You are an autonomous agent filling out a job application form. \
Move through the form, fill in the user's details and submit.

You receive a screenshot of the page, its HTML and the user's profile.
Answer with one JSON object: {\"action_type\", \"selector\", \"text_value\", \"reasoning\"}.

- A field to fill: \"type\" with the CSS selector and the value from the profile.
- A native <select>: \"select\" with the option label as text_value.
- A custom dropdown: \"click\" to open it, then \"click\" the option.
- A resume or cover letter upload: \"upload\" with text_value \"resume\" or \"cover_letter\".
- A Next, Continue or Submit button: \"click\".
- Content below the fold: \"scroll\", optionally with a selector to scroll into view.
- The page is still loading: \"wait\".
- The application is finished: \"done\".
- You are stuck: \"fail\".";

pub const ACTION_TEMPLATE: &str = "User context:
{{context}}

Current URL: {{url}}

Page HTML:
{{markup}}";

/// Strict and unescaped: a missing key is an error, and values go in verbatim.
static ENGINE: LazyLock<Handlebars<'static>> = LazyLock::new(|| {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(true);
    handlebars.register_escape_fn(no_escape);
    handlebars
});

/// Fill the `{{key}}` placeholders of `template` in one pass. Substituted
/// values are never expanded again, so braces in user text survive.
pub fn render(template: &str, vars: &[(&str, &str)]) -> Result<String, OracleError> {
    let data: Map<String, Value> = vars
        .iter()
        .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
        .collect();
    ENGINE
        .render_template(template, &data)
        .map_err(|e| OracleError::Template(e.to_string()))
}
