// Headless browser targets (Chromium via the DevTools protocol)

pub mod chromium;

pub use chromium::ChromiumBrowser;

use async_trait::async_trait;
use std::time::Duration;

/// Interval between readiness checks while waiting on a page
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How to turn an HTML document into a raster image
#[derive(Debug, Clone)]
pub struct Capture {
    pub width: u32,
    pub height: u32,
    /// Upper bound on waiting for `document.fonts` to finish loading
    pub font_timeout: Duration,
    /// Fixed pause after fonts are ready, before the screenshot
    pub settle: Duration,
}

/// What to wait for before serializing a navigated page
#[derive(Debug, Clone)]
pub struct SnapshotWait {
    pub navigation_timeout: Duration,
    pub root_selector: String,
    pub root_timeout: Duration,
    /// The page counts as having its meta tags once it has more than this many
    pub min_meta_tags: u32,
    pub meta_timeout: Duration,
    pub settle: Duration,
}

/// The two things the build pipelines need from a headless browser.
///
/// Implementations own an OS process; callers must call [`Browser::close`]
/// on every exit path once they are done.
#[async_trait]
pub trait Browser: Send {
    /// Render `html` on a canvas-sized page and return PNG bytes clipped to the canvas
    async fn capture_png(&mut self, html: &str, capture: &Capture) -> anyhow::Result<Vec<u8>>;

    /// Navigate to `url`, wait for client rendering, return the serialized document
    async fn snapshot(&mut self, url: &str, wait: &SnapshotWait) -> anyhow::Result<String>;

    async fn close(&mut self) -> anyhow::Result<()>;
}

/// JS condition: all fonts of the document have loaded
pub fn fonts_loaded_expression() -> &'static str {
    "document.fonts.status === 'loaded'"
}

/// JS condition: an element matching `selector` is in the DOM
pub fn selector_present_expression(selector: &str) -> String {
    // JSON string literals are valid JS string literals
    let quoted = serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string());
    format!("document.querySelector({}) !== null", quoted)
}

/// JS condition: client code has injected more than `min` meta tags
pub fn meta_tags_expression(min: u32) -> String {
    format!(
        "document.querySelectorAll('meta[property], meta[name]').length > {}",
        min
    )
}
