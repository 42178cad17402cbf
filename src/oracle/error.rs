use thiserror::Error;

/// Failures talking to the decision oracle.
#[derive(Debug, Error)]
pub enum OracleError {
    /// Network or transport failure, including client-side timeouts.
    #[error("oracle request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("oracle API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The reply parsed as HTTP but not as the structure we asked for.
    #[error("malformed oracle reply: {0}")]
    Malformed(String),

    /// A prompt template could not be rendered.
    #[error("prompt template error: {0}")]
    Template(String),
}

impl OracleError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        OracleError::Malformed(msg.into())
    }
}

impl From<serde_json::Error> for OracleError {
    fn from(err: serde_json::Error) -> Self {
        OracleError::Malformed(err.to_string())
    }
}
