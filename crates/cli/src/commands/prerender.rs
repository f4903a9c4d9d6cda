use anyhow::{Context, Result};
use folio_browser::{ChromiumBrowser, SnapshotWait};
use folio_core::{Post, SiteConfig, extract_posts, load_site_config};
use folio_prerender::{PreviewServer, SnapshotPlan};
use std::fs;
use std::path::{Path, PathBuf};

/// Snapshot every configured route of an already-built site into static HTML.
pub async fn run(config_path: PathBuf) -> Result<()> {
    let config = load_site_config(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    let prerender = &config.prerender;

    println!("🚀 Starting prerender...");

    if !prerender.build_dir.join("index.html").is_file() {
        anyhow::bail!(
            "No index.html in {}\nHint: build the site before prerendering",
            prerender.build_dir.display()
        );
    }
    let build_dir = prerender
        .build_dir
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", prerender.build_dir.display()))?;

    let routes = prerender.routes_for(&listed_posts(&config));
    println!("   ✓ {} route(s) to prerender", routes.len());

    let plan = SnapshotPlan {
        base_url: prerender.base_url(),
        routes,
        build_dir: build_dir.clone(),
        wait: SnapshotWait {
            navigation_timeout: prerender.navigation_timeout,
            root_selector: prerender.root_selector.clone(),
            root_timeout: prerender.root_timeout,
            min_meta_tags: prerender.min_meta_tags,
            meta_timeout: prerender.meta_timeout,
            settle: prerender.settle,
        },
        ready_attempts: prerender.ready_attempts,
        ready_interval: prerender.ready_interval,
    };

    let (program, args) = preview_command(&config, &build_dir)?;
    println!("📦 Starting preview server: {} {}", program, args.join(" "));
    let server = PreviewServer::spawn(&program, &args, &config.root)?;

    let settings = config.browser.clone();
    let written = folio_prerender::run(
        server,
        move || async move { ChromiumBrowser::launch(&settings).await },
        &plan,
    )
    .await?;

    for path in &written {
        println!("✓ Generated: {}", path.display());
    }
    println!("\n✅ Prerender complete!");
    Ok(())
}

/// Posts for the per-post routes. The listing is optional here: without it
/// only the configured routes are snapshotted.
fn listed_posts(config: &SiteConfig) -> Vec<Post> {
    if !config.prerender.include_posts {
        return Vec::new();
    }

    let path = &config.posts.listing;
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("Cannot read {}: {}; prerendering configured routes only", path.display(), e);
            return Vec::new();
        }
    };
    match extract_posts(&text) {
        Ok(listing) => {
            for issue in &listing.issues {
                log::warn!("{}", issue);
            }
            listing.posts
        }
        Err(e) => {
            log::warn!("Cannot parse {}: {}; prerendering configured routes only", path.display(), e);
            Vec::new()
        }
    }
}

/// The configured preview command, or this executable's own `serve` subcommand
fn preview_command(config: &SiteConfig, build_dir: &Path) -> Result<(String, Vec<String>)> {
    if let Some((program, args)) = config
        .prerender
        .preview_command
        .as_ref()
        .and_then(|command| command.split_first())
    {
        return Ok((program.clone(), args.to_vec()));
    }

    let exe = std::env::current_exe().context("Failed to locate the folio executable")?;
    Ok((
        exe.to_string_lossy().into_owned(),
        vec![
            "serve".to_string(),
            build_dir.to_string_lossy().into_owned(),
            "--port".to_string(),
            config.prerender.port.to_string(),
        ],
    ))
}
