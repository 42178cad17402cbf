//! Remote page automation.

pub mod chrome;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use chrome::ChromeFactory;

/// What the action loop sees of the page at one step.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PageState {
    /// PNG screenshot, base64 encoded.
    pub screenshot: String,
    pub markup: String,
    pub url: String,
}

impl PageState {
    /// Cut `markup` down to at most `limit` characters.
    pub fn truncate_markup(&mut self, limit: usize) {
        if let Some((idx, _)) = self.markup.char_indices().nth(limit) {
            self.markup.truncate(idx);
        }
    }
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("browser operation failed: {0}")]
    Browser(String),

    #[error("no element matches {0}")]
    NoSuchElement(String),

    #[error("browser session error: {0}")]
    Session(String),
}

#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    async fn capture_state(&self) -> Result<PageState, DriverError>;

    async fn click(&self, selector: &str) -> Result<(), DriverError>;

    /// Replace the contents of an input with `text`.
    async fn fill(&self, selector: &str, text: &str) -> Result<(), DriverError>;

    /// Pick the option of a `<select>` whose visible label is `label`.
    async fn select_option(&self, selector: &str, label: &str) -> Result<(), DriverError>;

    async fn upload_file(&self, selector: &str, path: &str) -> Result<(), DriverError>;

    /// Scroll `selector` into view, or one viewport down when `None`.
    async fn scroll(&self, selector: Option<&str>) -> Result<(), DriverError>;

    async fn close(&self) -> Result<(), DriverError>;
}

/// Opens a fresh browser session per application.
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn open(&self) -> Result<Box<dyn PageDriver>, DriverError>;
}
