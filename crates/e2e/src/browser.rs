//! WebDriver browser automation

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use serde::{Deserialize, Serialize};
use thirtyfour::prelude::*;
use tracing::{debug, warn};

use crate::error::{E2eError, E2eResult};

/// Configuration for a browser session
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub webdriver_url: String,
    pub headless: bool,
    /// Chrome's download directory; must be absolute
    pub download_dir: PathBuf,
    pub maximize: bool,
    pub poll_interval: Duration,
    /// Fail on expired waits instead of warning
    pub strict_waits: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            headless: true,
            download_dir: PathBuf::from("downloads"),
            maximize: true,
            poll_interval: Duration::from_millis(250),
            strict_waits: true,
        }
    }
}

/// How a bounded wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitOutcome {
    Ready,
    TimedOut,
}

/// Apply the strictness policy to a wait outcome
pub fn require(outcome: WaitOutcome, what: &str, strict: bool) -> E2eResult<()> {
    match outcome {
        WaitOutcome::Ready => Ok(()),
        WaitOutcome::TimedOut if strict => Err(E2eError::Timeout(what.to_string())),
        WaitOutcome::TimedOut => {
            warn!("Gave up waiting for {}, continuing", what);
            Ok(())
        }
    }
}

/// Await a session teardown, logging a failure instead of returning it.
/// Returns whether the session closed cleanly.
pub async fn release<Fut>(close: Fut) -> bool
where
    Fut: Future<Output = E2eResult<()>>,
{
    match close.await {
        Ok(()) => true,
        Err(e) => {
            warn!("Could not close browser session: {}", e);
            false
        }
    }
}

/// Map a possibly negative index onto a list of `len` elements.
///
/// Negative indices count from the end, `-1` being the last element.
pub fn resolve_index(len: usize, index: isize) -> Option<usize> {
    if index >= 0 {
        let i = index as usize;
        (i < len).then_some(i)
    } else {
        len.checked_sub(index.unsigned_abs())
    }
}

/// Whether an element's rendered text names `needle`.
///
/// `exact` compares whole trimmed lines, so a file called `4` does not
/// match a block labelled `16`.
pub fn text_matches(text: &str, needle: &str, exact: bool) -> bool {
    if exact {
        text.lines().any(|line| line.trim() == needle)
    } else {
        text.contains(needle)
    }
}

/// Browser session driven through a WebDriver endpoint
pub struct BrowserHandle {
    driver: WebDriver,
    poll_interval: Duration,
    strict_waits: bool,
}

impl BrowserHandle {
    /// Start a Chrome session
    pub async fn launch(config: &BrowserConfig) -> E2eResult<Self> {
        std::fs::create_dir_all(&config.download_dir)?;
        let download_dir = std::fs::canonicalize(&config.download_dir)?;

        let mut caps = DesiredCapabilities::chrome();
        if config.headless {
            caps.set_headless()?;
            caps.set_disable_gpu()?;
        }
        caps.add_experimental_option(
            "prefs",
            serde_json::json!({
                "download.default_directory": download_dir.to_string_lossy(),
                "download.prompt_for_download": false,
            }),
        )?;

        debug!("Connecting to WebDriver at {}", config.webdriver_url);
        let driver = WebDriver::new(config.webdriver_url.as_str(), caps).await?;
        if config.maximize {
            driver.maximize_window().await?;
        }

        Ok(Self {
            driver,
            poll_interval: config.poll_interval,
            strict_waits: config.strict_waits,
        })
    }

    pub async fn goto(&self, url: &str) -> E2eResult<()> {
        debug!("Navigating to {}", url);
        self.driver.goto(url).await?;
        Ok(())
    }

    pub async fn page_source(&self) -> E2eResult<String> {
        Ok(self.driver.source().await?)
    }

    pub async fn find_all(&self, css: &str) -> E2eResult<Vec<WebElement>> {
        Ok(self.driver.find_all(By::Css(css.to_string())).await?)
    }

    /// The `index`-th element matching `css`; negative counts from the end
    pub async fn nth(&self, css: &str, index: isize) -> E2eResult<WebElement> {
        let mut elements = self.find_all(css).await?;
        let i = resolve_index(elements.len(), index).ok_or_else(|| E2eError::ElementNotFound {
            selector: css.to_string(),
            index,
        })?;
        Ok(elements.swap_remove(i))
    }

    pub async fn click_nth(&self, css: &str, index: isize) -> E2eResult<()> {
        self.nth(css, index).await?.click().await?;
        Ok(())
    }

    pub async fn type_nth(&self, css: &str, index: isize, text: &str) -> E2eResult<()> {
        self.nth(css, index).await?.send_keys(text).await?;
        Ok(())
    }

    /// Clear a field before typing into it
    pub async fn replace_nth(&self, css: &str, index: isize, text: &str) -> E2eResult<()> {
        let element = self.nth(css, index).await?;
        element.clear().await?;
        element.send_keys(text).await?;
        Ok(())
    }

    /// Current `value` of an input
    pub async fn value_nth(&self, css: &str, index: isize) -> E2eResult<String> {
        Ok(self.nth(css, index).await?.value().await?.unwrap_or_default())
    }

    /// Position of the first element whose text names `needle`
    pub async fn position_with_text(&self, css: &str, needle: &str, exact: bool) -> E2eResult<usize> {
        for (i, element) in self.find_all(css).await?.iter().enumerate() {
            if text_matches(&element.text().await?, needle, exact) {
                return Ok(i);
            }
        }
        Err(E2eError::TextNotFound {
            selector: css.to_string(),
            text: needle.to_string(),
        })
    }

    pub async fn with_text(&self, css: &str, needle: &str, exact: bool) -> E2eResult<WebElement> {
        for element in self.find_all(css).await? {
            if text_matches(&element.text().await?, needle, exact) {
                return Ok(element);
            }
        }
        Err(E2eError::TextNotFound {
            selector: css.to_string(),
            text: needle.to_string(),
        })
    }

    pub async fn click_with_text(&self, css: &str, needle: &str) -> E2eResult<()> {
        self.with_text(css, needle, false).await?.click().await?;
        Ok(())
    }

    /// Right-click the element naming `needle` to open its context menu
    pub async fn context_click_with_text(&self, css: &str, needle: &str) -> E2eResult<()> {
        let element = self.with_text(css, needle, true).await?;
        self.driver
            .action_chain()
            .context_click_element(&element)
            .perform()
            .await?;
        Ok(())
    }

    /// Hand a local file to an `<input type="file">`
    pub async fn upload(&self, input_id: &str, path: &Path) -> E2eResult<()> {
        let absolute = std::fs::canonicalize(path)?;
        let input = self.driver.find(By::Id(input_id.to_string())).await?;
        input.send_keys(absolute.to_string_lossy().to_string()).await?;
        Ok(())
    }

    /// Poll until an element matching `css` is present
    pub async fn wait_present(&self, css: &str, timeout: Duration) -> E2eResult<WaitOutcome> {
        self.poll(timeout, || async { Ok(!self.find_all(css).await?.is_empty()) })
            .await
    }

    /// Poll until no element matches `css`
    pub async fn wait_gone(&self, css: &str, timeout: Duration) -> E2eResult<WaitOutcome> {
        self.poll(timeout, || async { Ok(self.find_all(css).await?.is_empty()) })
            .await
    }

    /// [`wait_present`](Self::wait_present) under the session's strictness policy
    pub async fn expect_present(&self, css: &str, timeout: Duration, what: &str) -> E2eResult<()> {
        let outcome = self.wait_present(css, timeout).await?;
        require(outcome, what, self.strict_waits)
    }

    /// [`wait_gone`](Self::wait_gone) under the session's strictness policy
    pub async fn expect_gone(&self, css: &str, timeout: Duration, what: &str) -> E2eResult<()> {
        let outcome = self.wait_gone(css, timeout).await?;
        require(outcome, what, self.strict_waits)
    }

    async fn poll<F, Fut>(&self, timeout: Duration, mut check: F) -> E2eResult<WaitOutcome>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = E2eResult<bool>>,
    {
        let start = Instant::now();
        loop {
            if check().await? {
                return Ok(WaitOutcome::Ready);
            }
            if start.elapsed() >= timeout {
                return Ok(WaitOutcome::TimedOut);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Fixed pause for animations that expose no state to poll
    pub async fn settle(&self, pause: Duration) {
        tokio::time::sleep(pause).await;
    }

    pub async fn quit(&self) -> E2eResult<()> {
        self.driver.clone().quit().await?;
        Ok(())
    }
}
