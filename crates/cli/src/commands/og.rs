use anyhow::{Context, Result};
use folio_browser::{Browser, Capture, ChromiumBrowser};
use folio_core::{SiteConfig, extract_posts, link_og_images, load_site_config};
use folio_generator::template::missing_placeholders;
use folio_generator::{
    ImageStore, OgImageGenerator, PlannedImage, Resolution, write_file_atomic,
};
use std::collections::HashMap;
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};

/// Generate missing OG images and link every resolved image in the listing.
///
/// Per-post problems are logged and skipped. Only an unreadable or
/// unparsable listing, or a failed listing write, fails the command.
pub async fn run(config_path: PathBuf) -> Result<()> {
    let config = load_site_config(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    let settings = config.browser.clone();

    generate_and_link(&config, move || async move {
        ChromiumBrowser::launch(&settings).await
    })
    .await
}

pub async fn generate_and_link<B, F, Fut>(config: &SiteConfig, launch: F) -> Result<()>
where
    B: Browser,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<B>>,
{
    println!("🖼  Generating OG images...");

    let listing_path = &config.posts.listing;
    let text = fs::read_to_string(listing_path)
        .with_context(|| format!("Failed to read {}", listing_path.display()))?;
    let listing = extract_posts(&text)
        .with_context(|| format!("Failed to parse {}", listing_path.display()))?;
    for issue in &listing.issues {
        log::warn!("{}", issue);
    }
    println!("   ✓ Found {} post(s)", listing.posts.len());

    let store = ImageStore::open(&config.og.output_dir, config.og.public_path.as_str())?;
    let capture = Capture {
        width: config.og.width,
        height: config.og.height,
        font_timeout: config.og.font_timeout,
        settle: config.og.settle,
    };
    let generator = OgImageGenerator::new(store, capture, config.og.reuse_stale_images);
    let plan = generator.plan(&listing.posts)?;

    let mut resolved = HashMap::new();
    for planned in &plan {
        let slug = &planned.post.slug;
        match &planned.resolution {
            Resolution::Current => println!("✓ OG image exists for: {}", slug),
            Resolution::Stale { file_name } => {
                log::warn!("Reusing {} for {}; it may be outdated", file_name, slug)
            }
            Resolution::Render => {}
        }
        if let Some(web_path) = generator.ready_path(planned) {
            resolved.insert(slug.clone(), web_path);
        }
    }

    let pending: Vec<&PlannedImage> = plan.iter().filter(|p| p.needs_render()).collect();
    if !pending.is_empty() {
        render_pending(&generator, &config.og.template, &pending, &mut resolved, launch).await;
    }

    let outcome = link_og_images(&text, &resolved)
        .with_context(|| format!("Failed to update {}", listing_path.display()))?;
    if outcome.changed() {
        write_file_atomic(listing_path, outcome.text.as_bytes())?;
        println!(
            "\n✅ {} updated ({} link(s) changed)",
            listing_path.display(),
            outcome.changes.len()
        );
    } else {
        println!("\n✅ All OG images linked.");
    }

    Ok(())
}

/// Render what is missing. Nothing here is fatal: a missing template or a
/// browser that fails to start only leaves the pending posts unlinked.
async fn render_pending<B, F, Fut>(
    generator: &OgImageGenerator,
    template_path: &Path,
    pending: &[&PlannedImage],
    resolved: &mut HashMap<String, String>,
    launch: F,
) where
    B: Browser,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<B>>,
{
    let template = match fs::read_to_string(template_path) {
        Ok(template) => template,
        Err(e) => {
            log::error!(
                "Cannot read OG template {}: {}; skipping {} post(s)",
                template_path.display(),
                e,
                pending.len()
            );
            return;
        }
    };
    for name in missing_placeholders(&template) {
        log::warn!("OG template {} has no {}", template_path.display(), name);
    }

    let mut browser = match launch().await {
        Ok(browser) => browser,
        Err(e) => {
            log::error!(
                "Failed to launch browser: {:#}; skipping {} post(s)",
                e,
                pending.len()
            );
            return;
        }
    };

    println!("📸 Generating {} OG image(s)...", pending.len());
    let report = generator
        .render_all(&mut browser, &template, pending, resolved)
        .await;
    if let Err(e) = browser.close().await {
        log::warn!("Failed to close browser: {:#}", e);
    }

    for planned in pending {
        if report.rendered.contains(&planned.post.slug) {
            println!("   ✓ Generated: {}", planned.file_name);
        }
    }

    if !report.failed.is_empty() {
        log::warn!(
            "{} of {} OG image(s) failed to render",
            report.failed.len(),
            pending.len()
        );
    }
}
