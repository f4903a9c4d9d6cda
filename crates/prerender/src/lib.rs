// Static HTML snapshots of client-rendered routes

pub mod server;

pub use server::PreviewServer;

use anyhow::{Context, Result};
use folio_browser::{Browser, SnapshotWait};
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Everything a snapshot run needs besides the server and the browser
#[derive(Debug, Clone)]
pub struct SnapshotPlan {
    pub base_url: String,
    pub routes: Vec<String>,
    pub build_dir: PathBuf,
    pub wait: SnapshotWait,
    pub ready_attempts: u32,
    pub ready_interval: Duration,
}

/// "/" → `{build_dir}/index.html`; "/blog/my-post" → `{build_dir}/blog/my-post/index.html`
pub fn route_output_path(build_dir: &Path, route: &str) -> PathBuf {
    let mut path = build_dir.to_path_buf();
    for segment in route.split('/').filter(|segment| !segment.is_empty()) {
        path.push(segment);
    }
    path.join("index.html")
}

/// Snapshot each route in order. The first failure aborts the run.
pub async fn snapshot_routes<B: Browser + ?Sized>(
    browser: &mut B,
    base_url: &str,
    routes: &[String],
    build_dir: &Path,
    wait: &SnapshotWait,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(routes.len());

    for route in routes {
        log::info!("Prerendering {}", route);

        let url = format!("{}{}", base_url.trim_end_matches('/'), route);
        let html = browser
            .snapshot(&url, wait)
            .await
            .with_context(|| format!("Prerendering {} failed", route))?;

        let output = route_output_path(build_dir, route);
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&output, html)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        log::info!("Wrote {}", output.display());

        written.push(output);
    }

    Ok(written)
}

/// Wait for the server, launch the browser, snapshot every route.
///
/// The browser and the server are released on every exit path, whether the
/// run succeeds, the server never comes up, or a route fails.
pub async fn run<B, F, Fut>(
    mut server: PreviewServer,
    launch: F,
    plan: &SnapshotPlan,
) -> Result<Vec<PathBuf>>
where
    B: Browser,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<B>>,
{
    let ready_url = format!("{}/", plan.base_url.trim_end_matches('/'));
    if let Err(e) = server
        .wait_ready(&ready_url, plan.ready_attempts, plan.ready_interval)
        .await
    {
        server.shutdown().await;
        return Err(e);
    }

    let mut browser = match launch().await {
        Ok(browser) => browser,
        Err(e) => {
            server.shutdown().await;
            return Err(e);
        }
    };

    let result = snapshot_routes(
        &mut browser,
        &plan.base_url,
        &plan.routes,
        &plan.build_dir,
        &plan.wait,
    )
    .await;

    if let Err(e) = browser.close().await {
        log::warn!("Failed to close browser: {:#}", e);
    }
    server.shutdown().await;

    result
}
