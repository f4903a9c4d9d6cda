// Chromium driven over the DevTools protocol

use crate::{
    Browser, Capture, POLL_INTERVAL, SnapshotWait, fonts_loaded_expression, meta_tags_expression,
    selector_present_expression,
};
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, Viewport};
use chromiumoxide::page::ScreenshotParams;
use folio_core::BrowserSettings;
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// A headless Chromium process plus the task pumping its protocol events
pub struct ChromiumBrowser {
    browser: CdpBrowser,
    handler: Option<JoinHandle<()>>,
    closed: bool,
}

impl ChromiumBrowser {
    pub async fn launch(settings: &BrowserSettings) -> Result<Self> {
        let mut builder = BrowserConfig::builder();
        if settings.no_sandbox {
            builder = builder.no_sandbox().arg("--disable-setuid-sandbox");
        }
        if let Some(executable) = &settings.executable {
            builder = builder.chrome_executable(executable);
        }
        let config = builder
            .build()
            .map_err(|e| anyhow!("Invalid browser configuration: {}", e))?;

        let (browser, mut events) = CdpBrowser::launch(config)
            .await
            .context("Failed to launch headless Chromium")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let Err(e) = event {
                    log::debug!("Browser event error: {}", e);
                }
            }
        });

        Ok(Self {
            browser,
            handler: Some(handler),
            closed: false,
        })
    }

    async fn blank_page(&self) -> Result<Page> {
        self.browser
            .new_page("about:blank")
            .await
            .context("Failed to open browser tab")
    }
}

#[async_trait]
impl Browser for ChromiumBrowser {
    async fn capture_png(&mut self, html: &str, capture: &Capture) -> Result<Vec<u8>> {
        let page = self.blank_page().await?;
        let result = capture_on(&page, html, capture).await;
        close_page(page).await;
        result
    }

    async fn snapshot(&mut self, url: &str, wait: &SnapshotWait) -> Result<String> {
        let page = self.blank_page().await?;
        let result = snapshot_on(&page, url, wait).await;
        close_page(page).await;
        result
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let closed = self.browser.close().await.context("Failed to close browser");
        if let Err(e) = self.browser.wait().await {
            log::warn!("Browser process did not exit cleanly: {}", e);
        }
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        closed.map(|_| ())
    }
}

async fn capture_on(page: &Page, html: &str, capture: &Capture) -> Result<Vec<u8>> {
    page.execute(SetDeviceMetricsOverrideParams::new(
        i64::from(capture.width),
        i64::from(capture.height),
        1.0,
        false,
    ))
    .await
    .context("Failed to size the page")?;

    page.set_content(html)
        .await
        .context("Failed to load template into page")?;

    if !wait_until(page, fonts_loaded_expression(), capture.font_timeout).await {
        log::warn!(
            "Fonts still loading after {:?}, capturing anyway",
            capture.font_timeout
        );
    }
    tokio::time::sleep(capture.settle).await;

    let params = ScreenshotParams::builder()
        .format(CaptureScreenshotFormat::Png)
        .clip(Viewport {
            x: 0.0,
            y: 0.0,
            width: f64::from(capture.width),
            height: f64::from(capture.height),
            scale: 1.0,
        })
        .build();

    page.screenshot(params).await.context("Screenshot failed")
}

async fn snapshot_on(page: &Page, url: &str, wait: &SnapshotWait) -> Result<String> {
    tokio::time::timeout(wait.navigation_timeout, page.goto(url))
        .await
        .with_context(|| {
            format!(
                "Timed out after {:?} navigating to {}",
                wait.navigation_timeout, url
            )
        })?
        .with_context(|| format!("Navigation to {} failed", url))?;

    let root = selector_present_expression(&wait.root_selector);
    if !wait_until(page, &root, wait.root_timeout).await {
        bail!(
            "'{}' did not appear on {} within {:?}",
            wait.root_selector,
            url,
            wait.root_timeout
        );
    }

    // Best effort: the page is still usable without its injected meta tags
    let meta = meta_tags_expression(wait.min_meta_tags);
    if !wait_until(page, &meta, wait.meta_timeout).await {
        log::warn!("Meta tags check timed out on {}, continuing", url);
    }

    tokio::time::sleep(wait.settle).await;

    page.content()
        .await
        .with_context(|| format!("Failed to serialize {}", url))
}

/// Poll a boolean JS expression until it holds or `timeout` elapses.
/// Evaluation errors (e.g. a context torn down mid-navigation) count as "not yet".
async fn wait_until(page: &Page, expression: &str, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        let ready = page
            .evaluate(expression)
            .await
            .ok()
            .and_then(|result| result.into_value::<bool>().ok())
            .unwrap_or(false);
        if ready {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

async fn close_page(page: Page) {
    if let Err(e) = page.close().await {
        log::debug!("Failed to close browser tab: {}", e);
    }
}
