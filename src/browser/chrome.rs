//! Local Chrome/Chromium driven over the DevTools protocol.
//!
//! `headless_chrome` is blocking, so every call runs on the blocking pool.

use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::protocol::cdp::DOM;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::browser::{DriverError, DriverFactory, PageDriver, PageState};

/// The browser stays open across the approval wait, which has no upper bound.
const IDLE_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

const WINDOW_SIZE: (u32, u32) = (1280, 1024);

const SELECT_BY_LABEL: &str = "(selector, label) => {
const el = document.querySelector(selector);
if (!el || !el.options) { return false; }
const opt = Array.from(el.options).find(o => o.text.trim() === label);
if (!opt) { return false; }
el.value = opt.value;
el.dispatchEvent(new Event('change', { bubbles: true }));
return true;
}";

const CLEAR_INPUT: &str = "(selector) => {
const el = document.querySelector(selector);
if (!el) { return false; }
el.value = '';
el.dispatchEvent(new Event('input', { bubbles: true }));
return true;
}";

const SCROLL_INTO_VIEW: &str = "(selector) => {
const el = document.querySelector(selector);
if (!el) { return false; }
el.scrollIntoView({ block: 'center' });
return true;
}";

const SCROLL_PAGE: &str = "() => { window.scrollBy(0, window.innerHeight); return true; }";

/// Wrap an arrow function and its arguments into one expression. Arguments
/// are JSON-encoded, so selectors and labels never need escaping by hand.
fn invocation(function: &str, args: &[&str]) -> String {
    let args: Vec<String> = args
        .iter()
        .map(|arg| Value::String(arg.to_string()).to_string())
        .collect();
    format!("({function})({})", args.join(", "))
}

fn browser_error(e: impl std::fmt::Display) -> DriverError {
    DriverError::Browser(e.to_string())
}

/// Launches one Chrome process per application.
pub struct ChromeFactory {
    chrome_path: Option<PathBuf>,
    timeout: Duration,
    headless: bool,
}

impl ChromeFactory {
    /// `chrome_path` of `None` lets the browser be found on the system.
    pub fn new(chrome_path: Option<PathBuf>, timeout: Duration, headless: bool) -> Self {
        Self {
            chrome_path,
            timeout,
            headless,
        }
    }

    fn launch_options(&self) -> Result<LaunchOptions<'static>, DriverError> {
        LaunchOptions::default_builder()
            .headless(self.headless)
            .window_size(Some(WINDOW_SIZE))
            .path(self.chrome_path.clone())
            .idle_browser_timeout(IDLE_TIMEOUT)
            .args(vec![OsStr::new("--disable-blink-features=AutomationControlled")])
            .build()
            .map_err(|e| DriverError::Session(e.to_string()))
    }
}

#[async_trait]
impl DriverFactory for ChromeFactory {
    async fn open(&self) -> Result<Box<dyn PageDriver>, DriverError> {
        let options = self.launch_options()?;
        let timeout = self.timeout;

        let session = tokio::task::spawn_blocking(move || {
            let browser = Browser::new(options)
                .map_err(|e| DriverError::Session(format!("Chrome launch failed: {e}")))?;
            let tab = browser
                .new_tab()
                .map_err(|e| DriverError::Session(format!("Browser tab failed: {e}")))?;
            tab.set_default_timeout(timeout);
            Ok::<_, DriverError>(ChromeSession { _browser: browser, tab })
        })
        .await
        .map_err(|e| DriverError::Session(format!("Task join: {e}")))??;

        info!("Browser session started");
        Ok(Box::new(session))
    }
}

pub struct ChromeSession {
    // Dropping the browser ends the Chrome process.
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeSession {
    /// Run `op` against the tab on the blocking pool.
    async fn with_tab<T, F>(&self, op: F) -> Result<T, DriverError>
    where
        T: Send + 'static,
        F: FnOnce(&Tab) -> Result<T, DriverError> + Send + 'static,
    {
        let tab = self.tab.clone();
        tokio::task::spawn_blocking(move || op(tab.as_ref()))
            .await
            .map_err(|e| DriverError::Session(format!("Task join: {e}")))?
    }

    /// Evaluate `function(args..)` and report whether it returned `true`.
    async fn run_script(&self, function: &'static str, args: &[&str]) -> Result<bool, DriverError> {
        let expression = invocation(function, args);
        self.with_tab(move |tab| {
            let result = tab.evaluate(&expression, false).map_err(browser_error)?;
            Ok(result.value.and_then(|v| v.as_bool()) == Some(true))
        })
        .await
    }
}

#[async_trait]
impl PageDriver for ChromeSession {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        debug!(url, "Navigating");
        let url = url.to_string();
        self.with_tab(move |tab| {
            tab.navigate_to(&url)
                .and_then(|tab| tab.wait_until_navigated())
                .map_err(browser_error)?;
            Ok(())
        })
        .await
    }

    async fn capture_state(&self) -> Result<PageState, DriverError> {
        self.with_tab(|tab| {
            let png = tab
                .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
                .map_err(browser_error)?;
            Ok(PageState {
                screenshot: STANDARD.encode(png),
                markup: tab.get_content().map_err(browser_error)?,
                url: tab.get_url(),
            })
        })
        .await
    }

    async fn click(&self, selector: &str) -> Result<(), DriverError> {
        let selector = selector.to_string();
        self.with_tab(move |tab| {
            let element = tab
                .wait_for_element(&selector)
                .map_err(|_| DriverError::NoSuchElement(selector.clone()))?;
            element.click().map_err(browser_error)?;
            Ok(())
        })
        .await
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<(), DriverError> {
        if !self.run_script(CLEAR_INPUT, &[selector]).await? {
            return Err(DriverError::NoSuchElement(selector.to_string()));
        }
        let selector = selector.to_string();
        let text = text.to_string();
        self.with_tab(move |tab| {
            let element = tab
                .wait_for_element(&selector)
                .map_err(|_| DriverError::NoSuchElement(selector.clone()))?;
            element.type_into(&text).map_err(browser_error)?;
            Ok(())
        })
        .await
    }

    async fn select_option(&self, selector: &str, label: &str) -> Result<(), DriverError> {
        if !self.run_script(SELECT_BY_LABEL, &[selector, label]).await? {
            return Err(DriverError::NoSuchElement(format!("{selector} option {label:?}")));
        }
        Ok(())
    }

    async fn upload_file(&self, selector: &str, path: &str) -> Result<(), DriverError> {
        let selector = selector.to_string();
        let path = path.to_string();
        self.with_tab(move |tab| {
            let element = tab
                .wait_for_element(&selector)
                .map_err(|_| DriverError::NoSuchElement(selector.clone()))?;
            tab.call_method(DOM::SetFileInputFiles {
                files: vec![path],
                node_id: None,
                backend_node_id: None,
                object_id: Some(element.remote_object_id.clone()),
            })
            .map_err(browser_error)?;
            Ok(())
        })
        .await
    }

    async fn scroll(&self, selector: Option<&str>) -> Result<(), DriverError> {
        let found = match selector {
            Some(selector) => self.run_script(SCROLL_INTO_VIEW, &[selector]).await?,
            None => self.run_script(SCROLL_PAGE, &[]).await?,
        };
        if !found {
            warn!(?selector, "Scroll target not found");
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.with_tab(|tab| {
            tab.close(false).map_err(browser_error)?;
            Ok(())
        })
        .await?;
        info!("Browser session closed");
        Ok(())
    }
}
