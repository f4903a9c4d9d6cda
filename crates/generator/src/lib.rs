// OG preview image generation for blog posts

pub mod fingerprint;
pub mod store;
pub mod template;

pub use fingerprint::{fingerprint, image_file_name};
pub use store::{ExistingImage, ImageStore, write_file_atomic};

use anyhow::{Context, Result};
use folio_browser::{Browser, Capture};
use folio_core::Post;
use std::collections::HashMap;

/// How a post's image will be obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// `{slug}-{fingerprint}.png` is already on disk
    Current,
    /// An earlier image for this slug (or one whose name starts with it) is
    /// reused as-is. It may show outdated content.
    Stale { file_name: String },
    /// Nothing usable on disk
    Render,
}

#[derive(Debug, Clone)]
pub struct PlannedImage {
    pub post: Post,
    /// Target file name for a fresh render
    pub file_name: String,
    pub resolution: Resolution,
}

impl PlannedImage {
    pub fn needs_render(&self) -> bool {
        self.resolution == Resolution::Render
    }
}

/// Failed posts are reported, never fatal for the run
#[derive(Debug, Default)]
pub struct RenderReport {
    /// Slugs rendered, in order
    pub rendered: Vec<String>,
    /// Slug and error message
    pub failed: Vec<(String, String)>,
}

pub struct OgImageGenerator {
    store: ImageStore,
    capture: Capture,
    reuse_stale: bool,
}

impl OgImageGenerator {
    pub fn new(store: ImageStore, capture: Capture, reuse_stale: bool) -> Self {
        Self {
            store,
            capture,
            reuse_stale,
        }
    }

    pub fn store(&self) -> &ImageStore {
        &self.store
    }

    /// Decide, per post and in listing order, whether an image exists or must be rendered
    pub fn plan(&self, posts: &[Post]) -> Result<Vec<PlannedImage>> {
        let existing = self.store.existing()?;

        Ok(posts
            .iter()
            .map(|post| {
                let file_name = image_file_name(post);
                let resolution = if self.store.contains(&file_name) {
                    Resolution::Current
                } else if let Some(image) = self
                    .reuse_stale
                    .then(|| stale_candidate(&existing, &post.slug))
                    .flatten()
                {
                    Resolution::Stale {
                        file_name: image.file_name.clone(),
                    }
                } else {
                    Resolution::Render
                };

                PlannedImage {
                    post: post.clone(),
                    file_name,
                    resolution,
                }
            })
            .collect())
    }

    /// Web path for an image that needs no rendering
    pub fn ready_path(&self, planned: &PlannedImage) -> Option<String> {
        match &planned.resolution {
            Resolution::Current => Some(self.store.web_path(&planned.file_name)),
            Resolution::Stale { file_name } => Some(self.store.web_path(file_name)),
            Resolution::Render => None,
        }
    }

    /// Render one post's image and return its web path.
    ///
    /// Returns early without touching the browser when the target already exists.
    pub async fn render<B: Browser + ?Sized>(
        &self,
        browser: &mut B,
        template: &str,
        planned: &PlannedImage,
    ) -> Result<String> {
        let web_path = self.store.web_path(&planned.file_name);
        if self.store.contains(&planned.file_name) {
            return Ok(web_path);
        }

        let post = &planned.post;
        let html = template::render_og_html(template, &post.hero, &post.title);
        let png = browser
            .capture_png(&html, &self.capture)
            .await
            .with_context(|| format!("Rendering failed for {}", post.slug))?;
        self.store.write_atomic(&planned.file_name, &png)?;

        Ok(web_path)
    }

    /// Render every pending image in order, recording successes in `resolved`.
    /// A failing post is logged and skipped.
    pub async fn render_all<B: Browser + ?Sized>(
        &self,
        browser: &mut B,
        template: &str,
        pending: &[&PlannedImage],
        resolved: &mut HashMap<String, String>,
    ) -> RenderReport {
        let mut report = RenderReport::default();

        for planned in pending {
            let slug = &planned.post.slug;
            log::debug!("Rendering OG image for {}", slug);

            match self.render(browser, template, planned).await {
                Ok(web_path) => {
                    resolved.insert(slug.clone(), web_path);
                    report.rendered.push(slug.clone());
                }
                Err(e) => {
                    log::error!("Error processing {}: {:#}", slug, e);
                    report.failed.push((slug.clone(), format!("{:#}", e)));
                }
            }
        }

        report
    }
}

/// An image from an earlier render of the same post. Same slug wins; any
/// file whose name starts with the slug is accepted otherwise, which can
/// pick up another post's image (`foo` matches `foo-bar-…`).
fn stale_candidate<'a>(existing: &'a [ExistingImage], slug: &str) -> Option<&'a ExistingImage> {
    existing
        .iter()
        .find(|image| image.slug == slug)
        .or_else(|| existing.iter().find(|image| image.file_name.starts_with(slug)))
}
