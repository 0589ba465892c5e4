use crate::actions::{count_script, validate_url, visibility_script, BrowserActions, BrowserSession};
use crate::error::{BrowserError, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures_util::stream::StreamExt;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

const HANDLER_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Launch settings for [`BrowserEngine`].
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    pub navigation_timeout: Duration,
    /// Delay between visibility checks while waiting for an element
    pub poll_interval: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1366,
            window_height: 768,
            navigation_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Browser automation engine holding one Chromium process and one tab.
pub struct BrowserEngine {
    browser: Option<Browser>,
    handler: Option<JoinHandle<()>>,
    page: Option<Page>,
    options: EngineOptions,
}

impl BrowserEngine {
    /// Launch a browser with default options
    pub async fn new() -> Result<Self> {
        Self::launch(EngineOptions::default()).await
    }

    /// Launch a browser and open a blank working tab
    pub async fn launch(options: EngineOptions) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(options.window_width, options.window_height)
            .request_timeout(options.navigation_timeout);
        if !options.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(BrowserError::ChromiumError)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        // Drive the CDP connection until the browser goes away
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        tracing::info!(headless = options.headless, "Browser session started");

        Ok(Self {
            browser: Some(browser),
            handler: Some(handler),
            page: Some(page),
            options,
        })
    }

    fn page(&self) -> Result<&Page> {
        self.page.as_ref().ok_or(BrowserError::SessionClosed)
    }

    async fn evaluate_bool(&self, script: String) -> Result<bool> {
        self.page()?
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?
            .into_value::<bool>()
            .map_err(|e| BrowserError::Script(e.to_string()))
    }
}

#[async_trait::async_trait]
impl BrowserActions for BrowserEngine {
    async fn navigate(&self, url: &str) -> Result<()> {
        validate_url(url)?;
        let page = self.page()?;

        tokio::time::timeout(self.options.navigation_timeout, page.goto(url))
            .await
            .map_err(|_| {
                BrowserError::Timeout(format!(
                    "navigation to {url} exceeded {:?}",
                    self.options.navigation_timeout
                ))
            })?
            .map_err(|e| BrowserError::NavigationError(format!("{url}: {e}")))?;

        Ok(())
    }

    async fn wait_for_visible(&self, selector: &str, timeout: Duration) -> Result<()> {
        let started = Instant::now();
        let script = visibility_script(selector);
        let mut last_error = None;

        loop {
            // A navigation in flight can tear down the execution context; keep polling.
            match self.evaluate_bool(script.clone()).await {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(BrowserError::SessionClosed) => return Err(BrowserError::SessionClosed),
                Err(e) => last_error = Some(e),
            }

            if started.elapsed() >= timeout {
                let detail = last_error.map(|e| format!(" (last error: {e})")).unwrap_or_default();
                return Err(BrowserError::Timeout(format!(
                    "{selector} not visible after {timeout:?}{detail}"
                )));
            }

            tokio::time::sleep(self.options.poll_interval).await;
        }
    }

    async fn send_keys(&self, selector: &str, text: &str) -> Result<()> {
        let element = self
            .page()?
            .find_element(selector)
            .await
            .map_err(|e| BrowserError::SelectorNotFound(format!("{selector}: {e}")))?;

        element
            .click()
            .await
            .map_err(|e| BrowserError::ChromiumError(format!("focus {selector}: {e}")))?;
        element
            .type_str(text)
            .await
            .map_err(|e| BrowserError::ChromiumError(format!("type into {selector}: {e}")))?;

        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let element = self
            .page()?
            .find_element(selector)
            .await
            .map_err(|e| BrowserError::SelectorNotFound(format!("{selector}: {e}")))?;

        element
            .click()
            .await
            .map_err(|e| BrowserError::ChromiumError(format!("click {selector}: {e}")))?;

        Ok(())
    }

    async fn count_elements(&self, selector: &str) -> Result<usize> {
        let count = self
            .page()?
            .evaluate(count_script(selector))
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?
            .into_value::<u64>()
            .map_err(|e| BrowserError::Script(e.to_string()))?;

        usize::try_from(count).map_err(|e| BrowserError::Script(e.to_string()))
    }

    async fn outer_html(&self, selector: &str) -> Result<String> {
        let element = self
            .page()?
            .find_element(selector)
            .await
            .map_err(|e| BrowserError::SelectorNotFound(format!("{selector}: {e}")))?;

        element
            .outer_html()
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?
            .ok_or_else(|| BrowserError::SelectorNotFound(format!("{selector}: no markup")))
    }
}

#[async_trait::async_trait]
impl BrowserSession for BrowserEngine {
    async fn shutdown(&mut self) -> Result<()> {
        self.page = None;
        let Some(mut browser) = self.browser.take() else {
            return Ok(());
        };

        let closed = browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::ChromiumError(format!("close browser: {e}")));

        // Wait for the process even when close failed, so none is left running.
        let waited = browser
            .wait()
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::ChromiumError(format!("wait for browser exit: {e}")));

        if let Some(mut handler) = self.handler.take() {
            match tokio::time::timeout(HANDLER_JOIN_TIMEOUT, &mut handler).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!("Browser handler task ended abnormally: {}", e),
                Err(_) => {
                    handler.abort();
                    tracing::warn!("Browser handler did not stop after close; aborted");
                }
            }
        }

        closed.and(waited)?;
        tracing::info!("Browser session stopped");
        Ok(())
    }
}

impl Drop for BrowserEngine {
    fn drop(&mut self) {
        if self.browser.is_some() {
            tracing::warn!("BrowserEngine dropped without shutdown; the process is killed on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = EngineOptions::default();
        assert!(options.headless);
        assert!(options.navigation_timeout >= Duration::from_secs(1));
        assert!(options.poll_interval < options.navigation_timeout);
    }
}
