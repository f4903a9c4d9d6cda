use anyhow::{Context, Result};
use axum::{Router, response::Html, routing::get};
use std::{fs, future, net::SocketAddr, path::Path, path::PathBuf};
use tower_http::services::ServeDir;

/// Serve a built site on 127.0.0.1.
///
/// Unknown paths fall back to `index.html` so client-side routes resolve the
/// way they do in production. This is also the preview server `folio
/// prerender` starts when no `preview_command` is configured.
pub async fn run(dir: PathBuf, port: u16) -> Result<()> {
    if !dir.join("index.html").is_file() {
        anyhow::bail!(
            "No index.html in {}\nHint: build the site first",
            dir.display()
        );
    }

    let app = router(&dir)?;
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to port {}", port))?;

    println!("🚀 Serving {} at http://localhost:{}", dir.display(), port);
    println!("   Press Ctrl+C to stop\n");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Static files from `dir`; anything else gets the `index.html` shell as it
/// was when the router was built. Prerendering overwrites `index.html` with
/// the snapshot of `/`, which must not leak into the routes rendered after it.
pub fn router(dir: &Path) -> Result<Router> {
    let index = dir.join("index.html");
    let shell = fs::read_to_string(&index)
        .with_context(|| format!("Failed to read {}", index.display()))?;
    let fallback = get(move || future::ready(Html(shell.clone())));

    Ok(Router::new().fallback_service(ServeDir::new(dir).fallback(fallback)))
}
