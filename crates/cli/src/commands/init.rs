use anyhow::{Context, Result};
use chrono::Local;
use folio_core::{DATE_FORMAT, extract_posts, parse_site_config_str};
use std::fs;
use std::path::{Path, PathBuf};

const SITE_TOML: &str = r##"# Generated by folio init
# Every key is optional; the values below are the defaults.

[posts]
listing = "content/posts.toml"

[og]
template = "og/template.html"
output_dir = "public/og-images"
public_path = "/og-images"
width = 1200
height = 630
font_timeout_ms = 5000
settle_ms = 500
# Reuse an older image for a post whose title or date changed
reuse_stale_images = true

[prerender]
build_dir = "build"
port = 4173
routes = ["/"]
include_posts = true
post_route_prefix = "/blog"
# Defaults to the built-in `folio serve <build_dir>`
# preview_command = ["npm", "run", "preview", "--", "--port", "4173", "--host"]
ready_attempts = 30
ready_interval_ms = 1000
navigation_timeout_ms = 30000
root_selector = "#root"
root_timeout_ms = 10000
min_meta_tags = 5
meta_timeout_ms = 5000
settle_ms = 1500

[browser]
# executable = "/usr/bin/chromium"
no_sandbox = true
"##;

const OG_TEMPLATE: &str = include_str!("../../assets/og-template.html");

/// Scaffold a site: `site.toml`, a sample post listing and the OG template.
///
/// Refuses to run when `site.toml` already exists. The listing and the
/// template are only written when absent, so an existing site can adopt
/// folio without losing content.
pub fn run(path: PathBuf) -> Result<()> {
    println!("Initializing site: {}", path.display());

    let site_toml_path = path.join("site.toml");
    if site_toml_path.exists() {
        anyhow::bail!(
            "site.toml already exists at {}\nHint: Delete it first or use a different directory",
            site_toml_path.display()
        );
    }

    fs::create_dir_all(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    // The scaffold must load with the same parser the other commands use
    let config = parse_site_config_str(SITE_TOML, &path)
        .context("Generated site.toml is invalid - this is a bug in folio init")?;

    let listing = sample_listing(&Local::now().format(DATE_FORMAT).to_string());
    extract_posts(&listing)
        .context("Generated listing is invalid - this is a bug in folio init")?;

    write_if_absent(&config.posts.listing, &listing)?;
    write_if_absent(&config.og.template, OG_TEMPLATE)?;
    fs::write(&site_toml_path, SITE_TOML)
        .with_context(|| format!("Failed to write {}", site_toml_path.display()))?;
    println!("✓ Created {}", site_toml_path.display());

    println!("\n✓ Initialization complete!");
    println!("\nNext steps:");
    println!("  1. Add posts to content/posts.toml");
    println!("  2. Adjust the look of og/template.html");
    println!("  3. Generate images: folio --config {} og", site_toml_path.display());

    Ok(())
}

fn sample_listing(today: &str) -> String {
    format!(
        r#"# Blog posts, one [[post]] table each, in display order.
# `og_image` is filled in by `folio og`.

[[post]]
slug = "hello-world"
title = "Hello, World"
hero = "∞"
published = {today}
content = "content/posts/hello-world.md"
"#
    )
}

fn write_if_absent(path: &Path, contents: &str) -> Result<()> {
    if path.exists() {
        println!("⚠ Keeping existing {}", path.display());
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("✓ Created {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::load_site_config;
    use folio_generator::template::missing_placeholders;
    use tempfile::TempDir;

    #[test]
    fn test_scaffold_loads_with_defaults() {
        let dir = TempDir::new().unwrap();
        let site = dir.path().join("blog");

        run(site.clone()).unwrap();

        let config = load_site_config(site.join("site.toml")).unwrap();
        let defaults = parse_site_config_str("", &site).unwrap();
        assert_eq!(config.posts.listing, defaults.posts.listing);
        assert_eq!(config.og.public_path, defaults.og.public_path);
        assert_eq!(config.prerender.routes, defaults.prerender.routes);
        assert_eq!(config.prerender.ready_interval, defaults.prerender.ready_interval);

        let listing = fs::read_to_string(site.join("content/posts.toml")).unwrap();
        let posts = extract_posts(&listing).unwrap();
        assert!(posts.issues.is_empty(), "{:?}", posts.issues);
        assert_eq!(posts.posts[0].slug, "hello-world");
        assert_eq!(posts.posts[0].hero, "∞");

        let template = fs::read_to_string(site.join("og/template.html")).unwrap();
        assert!(missing_placeholders(&template).is_empty());
    }

    #[test]
    fn test_refuses_existing_site_toml() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("site.toml"), "# mine").unwrap();

        let result = run(dir.path().to_path_buf());

        assert!(result.unwrap_err().to_string().contains("already exists"));
        assert_eq!(
            fs::read_to_string(dir.path().join("site.toml")).unwrap(),
            "# mine"
        );
        assert!(!dir.path().join("content").exists());
    }

    #[test]
    fn test_keeps_existing_listing() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("content")).unwrap();
        fs::write(dir.path().join("content/posts.toml"), "# existing\n").unwrap();

        run(dir.path().to_path_buf()).unwrap();

        assert_eq!(
            fs::read_to_string(dir.path().join("content/posts.toml")).unwrap(),
            "# existing\n"
        );
        assert!(dir.path().join("og/template.html").is_file());
    }
}
