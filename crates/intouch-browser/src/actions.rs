use crate::error::{BrowserError, Result};
use std::time::Duration;

/// Browser actions for automation
#[async_trait::async_trait]
pub trait BrowserActions: Send + Sync {
    /// Navigate to a URL and wait for the load to finish
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Wait until the element matching `selector` is rendered and visible
    async fn wait_for_visible(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Type `text` into the element matching `selector`
    async fn send_keys(&self, selector: &str, text: &str) -> Result<()>;

    /// Click an element by selector
    async fn click(&self, selector: &str) -> Result<()>;

    /// Number of elements currently matching `selector`
    async fn count_elements(&self, selector: &str) -> Result<usize>;

    /// Serialized outer HTML of the first element matching `selector`
    async fn outer_html(&self, selector: &str) -> Result<String>;
}

/// A browser session owned by one crawl run.
///
/// `shutdown` must leave no browser process behind. Calling it twice is a no-op.
#[async_trait::async_trait]
pub trait BrowserSession: BrowserActions {
    /// Close the browser and wait for it to exit
    async fn shutdown(&mut self) -> Result<()>;
}

/// Validate that `url` is an absolute http(s) URL.
pub fn validate_url(url: &str) -> Result<()> {
    let parsed = url::Url::parse(url)
        .map_err(|e| BrowserError::NavigationError(format!("Invalid URL: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(BrowserError::NavigationError(format!(
                "unsupported scheme: {other}"
            )))
        }
    }

    parsed
        .host_str()
        .ok_or_else(|| BrowserError::NavigationError("No host in URL".to_string()))
        .map(|_| ())
}

/// JavaScript expression that is `true` when `selector` matches a visible element.
pub(crate) fn visibility_script(selector: &str) -> String {
    let quoted = quote_selector(selector);
    format!(
        "(() => {{ const el = document.querySelector({quoted}); \
         if (!el) return false; \
         const style = window.getComputedStyle(el); \
         const rect = el.getBoundingClientRect(); \
         return style.display !== 'none' && style.visibility !== 'hidden' \
         && rect.width > 0 && rect.height > 0; }})()"
    )
}

/// JavaScript expression counting elements matching `selector`.
pub(crate) fn count_script(selector: &str) -> String {
    format!(
        "document.querySelectorAll({}).length",
        quote_selector(selector)
    )
}

fn quote_selector(selector: &str) -> String {
    // A JSON string literal is a valid JavaScript string literal.
    serde_json::Value::String(selector.to_string()).to_string()
}
