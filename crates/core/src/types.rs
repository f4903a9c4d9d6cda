use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Date format used in the listing, in fingerprints and in log output
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One blog post as recovered from the listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub slug: String,
    pub title: String,
    /// Decorative glyph shown before the title; empty when the post has none
    pub hero: String,
    pub published: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub og_image: Option<String>,
    /// Reference to the post body, never interpreted here
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl Post {
    pub fn has_hero(&self) -> bool {
        !self.hero.is_empty()
    }

    /// Publication date as written in the listing (`YYYY-MM-DD`)
    pub fn published_str(&self) -> String {
        self.published.format(DATE_FORMAT).to_string()
    }
}

/// Slugs double as path segments, so only `[A-Za-z0-9_-]` is accepted.
pub fn is_url_safe_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Complete site configuration with every path resolved against the project root
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub root: PathBuf,
    pub posts: PostsConfig,
    pub og: OgConfig,
    pub prerender: PrerenderConfig,
    pub browser: BrowserSettings,
}

/// Where the post listing lives
#[derive(Debug, Clone)]
pub struct PostsConfig {
    pub listing: PathBuf,
}

/// OG image generation settings
#[derive(Debug, Clone)]
pub struct OgConfig {
    pub template: PathBuf,
    pub output_dir: PathBuf,
    /// Web path the output directory is served under (e.g. "/og-images")
    pub public_path: String,
    pub width: u32,
    pub height: u32,
    pub font_timeout: Duration,
    pub settle: Duration,
    /// Reuse an image whose name matches the slug but not the fingerprint
    pub reuse_stale_images: bool,
}

/// Route snapshot settings
#[derive(Debug, Clone)]
pub struct PrerenderConfig {
    pub build_dir: PathBuf,
    pub port: u16,
    pub routes: Vec<String>,
    pub include_posts: bool,
    pub post_route_prefix: String,
    /// Program and arguments of an external preview server
    pub preview_command: Option<Vec<String>>,
    pub ready_attempts: u32,
    pub ready_interval: Duration,
    pub navigation_timeout: Duration,
    pub root_selector: String,
    pub root_timeout: Duration,
    pub min_meta_tags: u32,
    pub meta_timeout: Duration,
    pub settle: Duration,
}

impl PrerenderConfig {
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Configured routes followed by one route per post not already listed
    pub fn routes_for(&self, posts: &[Post]) -> Vec<String> {
        let mut routes = self.routes.clone();
        if self.include_posts {
            let prefix = self.post_route_prefix.trim_end_matches('/');
            for post in posts {
                let route = format!("{}/{}", prefix, post.slug);
                if !routes.contains(&route) {
                    routes.push(route);
                }
            }
        }
        routes
    }
}

/// Headless browser launch settings
#[derive(Debug, Clone, Default)]
pub struct BrowserSettings {
    pub executable: Option<PathBuf>,
    pub no_sandbox: bool,
}
