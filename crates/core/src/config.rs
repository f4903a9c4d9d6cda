use crate::error::{Error, Result};
use crate::types::*;
use serde::Deserialize;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Raw TOML configuration structure
/// This matches the site.toml file structure exactly; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    posts: RawPosts,
    og: RawOg,
    prerender: RawPrerender,
    browser: RawBrowser,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawPosts {
    listing: String,
}

impl Default for RawPosts {
    fn default() -> Self {
        Self {
            listing: "content/posts.toml".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawOg {
    template: String,
    output_dir: String,
    public_path: String,
    width: u32,
    height: u32,
    font_timeout_ms: u64,
    settle_ms: u64,
    reuse_stale_images: bool,
}

impl Default for RawOg {
    fn default() -> Self {
        Self {
            template: "og/template.html".to_string(),
            output_dir: "public/og-images".to_string(),
            public_path: "/og-images".to_string(),
            width: 1200,
            height: 630,
            font_timeout_ms: 5_000,
            settle_ms: 500,
            reuse_stale_images: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawPrerender {
    build_dir: String,
    port: u16,
    routes: Vec<String>,
    include_posts: bool,
    post_route_prefix: String,
    preview_command: Option<Vec<String>>,
    ready_attempts: u32,
    ready_interval_ms: u64,
    navigation_timeout_ms: u64,
    root_selector: String,
    root_timeout_ms: u64,
    min_meta_tags: u32,
    meta_timeout_ms: u64,
    settle_ms: u64,
}

impl Default for RawPrerender {
    fn default() -> Self {
        Self {
            build_dir: "build".to_string(),
            port: 4173,
            routes: vec!["/".to_string()],
            include_posts: true,
            post_route_prefix: "/blog".to_string(),
            preview_command: None,
            ready_attempts: 30,
            ready_interval_ms: 1_000,
            navigation_timeout_ms: 30_000,
            root_selector: "#root".to_string(),
            root_timeout_ms: 10_000,
            min_meta_tags: 5,
            meta_timeout_ms: 5_000,
            settle_ms: 1_500,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawBrowser {
    executable: Option<String>,
    no_sandbox: bool,
}

impl Default for RawBrowser {
    fn default() -> Self {
        Self {
            executable: None,
            no_sandbox: true,
        }
    }
}

/// Parse site.toml from a file path; relative paths resolve against its directory
pub fn load_site_config<P: AsRef<Path>>(path: P) -> Result<SiteConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let root = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    parse_site_config_str(&content, &root)
}

/// Parse site.toml from a string (useful for testing)
pub fn parse_site_config_str(content: &str, root: &Path) -> Result<SiteConfig> {
    let raw: RawConfig = toml::from_str(content)?;

    let posts = PostsConfig {
        listing: root.join(validate_path(&raw.posts.listing, "posts.listing")?),
    };

    if raw.og.width == 0 || raw.og.height == 0 {
        return Err(Error::ConfigParse(format!(
            "OG canvas must be non-empty, got {}x{}",
            raw.og.width, raw.og.height
        )));
    }

    let og = OgConfig {
        template: root.join(validate_path(&raw.og.template, "og.template")?),
        output_dir: root.join(validate_path(&raw.og.output_dir, "og.output_dir")?),
        public_path: normalize_public_path(&raw.og.public_path)?,
        width: raw.og.width,
        height: raw.og.height,
        font_timeout: Duration::from_millis(raw.og.font_timeout_ms),
        settle: Duration::from_millis(raw.og.settle_ms),
        reuse_stale_images: raw.og.reuse_stale_images,
    };

    let routes = raw
        .prerender
        .routes
        .into_iter()
        .map(|route| validate_route(&route, "prerender.routes").map(|_| route))
        .collect::<Result<Vec<_>>>()?;
    validate_route(&raw.prerender.post_route_prefix, "prerender.post_route_prefix")?;

    if let Some(command) = &raw.prerender.preview_command
        && command.first().is_none_or(|program| program.trim().is_empty())
    {
        return Err(Error::ConfigParse(
            "prerender.preview_command must name a program".to_string(),
        ));
    }

    if raw.prerender.ready_attempts == 0 {
        return Err(Error::ConfigParse(
            "prerender.ready_attempts must be at least 1".to_string(),
        ));
    }

    let prerender = PrerenderConfig {
        build_dir: root.join(validate_path(&raw.prerender.build_dir, "prerender.build_dir")?),
        port: raw.prerender.port,
        routes,
        include_posts: raw.prerender.include_posts,
        post_route_prefix: raw.prerender.post_route_prefix,
        preview_command: raw.prerender.preview_command,
        ready_attempts: raw.prerender.ready_attempts,
        ready_interval: Duration::from_millis(raw.prerender.ready_interval_ms),
        navigation_timeout: Duration::from_millis(raw.prerender.navigation_timeout_ms),
        root_selector: raw.prerender.root_selector,
        root_timeout: Duration::from_millis(raw.prerender.root_timeout_ms),
        min_meta_tags: raw.prerender.min_meta_tags,
        meta_timeout: Duration::from_millis(raw.prerender.meta_timeout_ms),
        settle: Duration::from_millis(raw.prerender.settle_ms),
    };

    let browser = BrowserSettings {
        executable: raw.browser.executable.map(PathBuf::from),
        no_sandbox: raw.browser.no_sandbox,
    };

    Ok(SiteConfig {
        root: root.to_path_buf(),
        posts,
        og,
        prerender,
        browser,
    })
}

/// Validate and convert a path string to PathBuf.
///
/// Rejects absolute paths, parent directory references (`..`) and empty
/// strings, so a site.toml can only point inside the project directory.
///
/// ```text
/// validate_path("content/posts.toml", "posts.listing")  → Ok(PathBuf)
/// validate_path("/etc/passwd", "posts.listing")  → Err("Absolute paths not allowed...")
/// validate_path("../secret", "og.template")  → Err("Parent directory references...")
/// ```
fn validate_path(path_str: &str, field_name: &str) -> Result<PathBuf> {
    let path = Path::new(path_str);

    if path.is_absolute() {
        return Err(Error::ConfigParse(format!(
            "Absolute paths not allowed in '{}': '{}'. Use relative paths only.",
            field_name, path_str
        )));
    }

    for component in path.components() {
        if component == Component::ParentDir {
            return Err(Error::ConfigParse(format!(
                "Parent directory references (..) not allowed in '{}': '{}'",
                field_name, path_str
            )));
        }
    }

    if path_str.trim().is_empty() {
        return Err(Error::ConfigParse(format!(
            "Empty path in '{}' field",
            field_name
        )));
    }

    Ok(path.to_path_buf())
}

/// Check that a route is an absolute URL path that maps cleanly onto the
/// build directory: leading `/`, no `.`/`..` segments, no query or fragment.
pub fn validate_route(route: &str, field_name: &str) -> Result<()> {
    if !route.starts_with('/') {
        return Err(Error::ConfigParse(format!(
            "Route in '{}' must start with '/': '{}'",
            field_name, route
        )));
    }

    if route.contains('?') || route.contains('#') {
        return Err(Error::ConfigParse(format!(
            "Route in '{}' must not carry a query or fragment: '{}'",
            field_name, route
        )));
    }

    if route.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(Error::ConfigParse(format!(
            "Relative segments not allowed in '{}': '{}'",
            field_name, route
        )));
    }

    Ok(())
}

/// "og-images/" → "/og-images"
fn normalize_public_path(public_path: &str) -> Result<String> {
    let trimmed = public_path.trim().trim_matches('/');
    if trimmed.split('/').any(|segment| segment == "..") {
        return Err(Error::ConfigParse(format!(
            "Parent directory references (..) not allowed in 'og.public_path': '{}'",
            public_path
        )));
    }
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    Ok(format!("/{}", trimmed))
}
