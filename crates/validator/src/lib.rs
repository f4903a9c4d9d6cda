// Site validation: listing, template, linked images and routes

use folio_core::config::validate_route;
use folio_core::{Post, SiteConfig, extract_posts};
use folio_generator::ImageStore;
use folio_generator::template::missing_placeholders;
use std::fs;

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub info: Vec<String>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check everything the build-time commands depend on without launching a browser.
pub fn validate_site(config: &SiteConfig) -> ValidationReport {
    let mut report = ValidationReport::default();

    let posts = check_listing(config, &mut report);
    check_template(config, &mut report);
    if let Some(posts) = &posts {
        check_images(config, posts, &mut report);
    }
    check_routes(config, posts.as_deref().unwrap_or_default(), &mut report);

    report
}

fn check_listing(config: &SiteConfig, report: &mut ValidationReport) -> Option<Vec<Post>> {
    let path = &config.posts.listing;
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            report
                .errors
                .push(format!("Cannot read listing {}: {}", path.display(), e));
            return None;
        }
    };

    match extract_posts(&text) {
        Ok(listing) => {
            report
                .info
                .push(format!("{} post(s) in {}", listing.posts.len(), path.display()));
            report
                .warnings
                .extend(listing.issues.iter().map(|issue| issue.to_string()));
            Some(listing.posts)
        }
        Err(e) => {
            report.errors.push(format!("{}: {}", path.display(), e));
            None
        }
    }
}

fn check_template(config: &SiteConfig, report: &mut ValidationReport) {
    let path = &config.og.template;
    let template = match fs::read_to_string(path) {
        Ok(template) => template,
        Err(e) => {
            report
                .errors
                .push(format!("Cannot read OG template {}: {}", path.display(), e));
            return;
        }
    };

    let missing = missing_placeholders(&template);
    if missing.is_empty() {
        report.info.push(format!("✓ OG template {}", path.display()));
    } else {
        for name in missing {
            report
                .errors
                .push(format!("OG template {} is missing the {}", path.display(), name));
        }
    }
}

fn check_images(config: &SiteConfig, posts: &[Post], report: &mut ValidationReport) {
    let store = ImageStore::at(&config.og.output_dir, config.og.public_path.as_str());
    let expected = (config.og.width, config.og.height);
    let mut linked = 0;

    for post in posts {
        let Some(web_path) = &post.og_image else {
            report
                .warnings
                .push(format!("{}: no og_image linked yet", post.slug));
            continue;
        };
        linked += 1;

        let Some(file) = store.file_for_web_path(web_path) else {
            report.warnings.push(format!(
                "{}: og_image '{}' is outside '{}'",
                post.slug, web_path, config.og.public_path
            ));
            continue;
        };

        if !file.is_file() {
            report.warnings.push(format!(
                "{}: og_image '{}' does not exist ({})",
                post.slug,
                web_path,
                file.display()
            ));
            continue;
        }

        match image::image_dimensions(&file) {
            Ok(size) if size == expected => {}
            Ok((width, height)) => report.warnings.push(format!(
                "{}: og_image is {}x{}, expected {}x{}",
                post.slug, width, height, expected.0, expected.1
            )),
            Err(e) => report.warnings.push(format!(
                "{}: og_image '{}' cannot be decoded: {}",
                post.slug, web_path, e
            )),
        }
    }

    report
        .info
        .push(format!("{}/{} post(s) linked to an OG image", linked, posts.len()));
}

fn check_routes(config: &SiteConfig, posts: &[Post], report: &mut ValidationReport) {
    let routes = config.prerender.routes_for(posts);
    for route in &routes {
        if let Err(e) = validate_route(route, "prerender.routes") {
            report.errors.push(e.to_string());
        }
    }
    report
        .info
        .push(format!("{} route(s) to prerender", routes.len()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::parse_site_config_str;
    use std::path::Path;
    use tempfile::TempDir;

    const TEMPLATE: &str = r#"<div class="hero" id="hero">x</div>
<span class="separator" id="separator">-</span>
<div class="title" id="title">x</div>
<script>
document.getElementById('hero').textContent = 'x';
document.getElementById('separator').textContent = '-';
document.getElementById('title').textContent = 'x';
</script>"#;

    fn site(dir: &Path, listing: &str, template: &str) -> SiteConfig {
        fs::create_dir_all(dir.join("content")).unwrap();
        fs::create_dir_all(dir.join("og")).unwrap();
        fs::create_dir_all(dir.join("public/og-images")).unwrap();
        fs::write(dir.join("content/posts.toml"), listing).unwrap();
        fs::write(dir.join("og/template.html"), template).unwrap();
        parse_site_config_str("", dir).unwrap()
    }

    fn save_png(dir: &Path, name: &str, width: u32, height: u32) {
        image::RgbImage::new(width, height)
            .save(dir.join("public/og-images").join(name))
            .unwrap();
    }

    #[test]
    fn test_valid_site() {
        let dir = TempDir::new().unwrap();
        let config = site(
            dir.path(),
            r#"
[[post]]
slug = "foo"
title = "Foo"
published = 2024-01-01
og_image = "/og-images/foo-1a2b3c4d.png"
"#,
            TEMPLATE,
        );
        save_png(dir.path(), "foo-1a2b3c4d.png", 1200, 630);

        let report = validate_site(&config);
        assert!(report.is_ok(), "{:?}", report.errors);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
        assert!(report.info.iter().any(|i| i.contains("1/1 post(s) linked")));
        assert!(report.info.iter().any(|i| i.contains("2 route(s)")));
    }

    #[test]
    fn test_missing_listing_is_an_error() {
        let dir = TempDir::new().unwrap();
        let config = site(dir.path(), "", TEMPLATE);
        fs::remove_file(dir.path().join("content/posts.toml")).unwrap();

        let report = validate_site(&config);
        assert!(!report.is_ok());
        assert!(report.errors[0].contains("Cannot read listing"));
    }

    #[test]
    fn test_template_placeholders_checked() {
        let dir = TempDir::new().unwrap();
        let config = site(dir.path(), "", &TEMPLATE.replace("id=\"title\"", "id=\"x\""));

        let report = validate_site(&config);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("title element"));
    }

    #[test]
    fn test_listing_issues_become_warnings() {
        let dir = TempDir::new().unwrap();
        let config = site(
            dir.path(),
            r#"
[[post]]
title = "No slug"

[[post]]
slug = "bar"
title = "Bar"
published = "2024-02-30"
"#,
            TEMPLATE,
        );

        let report = validate_site(&config);
        assert!(report.is_ok(), "{:?}", report.errors);
        assert!(report.warnings.iter().any(|w| w.contains("post #1")));
        assert!(report.warnings.iter().any(|w| w.contains("bar")));
    }

    #[test]
    fn test_image_problems_are_warnings() {
        let dir = TempDir::new().unwrap();
        let config = site(
            dir.path(),
            r#"
[[post]]
slug = "small"
title = "Small"
published = 2024-01-01
og_image = "/og-images/small.png"

[[post]]
slug = "gone"
title = "Gone"
published = 2024-01-01
og_image = "/og-images/gone.png"

[[post]]
slug = "elsewhere"
title = "Elsewhere"
published = 2024-01-01
og_image = "/static/elsewhere.png"

[[post]]
slug = "broken"
title = "Broken"
published = 2024-01-01
og_image = "/og-images/broken.png"
"#,
            TEMPLATE,
        );
        save_png(dir.path(), "small.png", 600, 315);
        fs::write(dir.path().join("public/og-images/broken.png"), b"not a png").unwrap();

        let report = validate_site(&config);
        assert!(report.is_ok());
        let warnings = report.warnings.join("\n");
        assert!(warnings.contains("small: og_image is 600x315, expected 1200x630"));
        assert!(warnings.contains("gone: og_image '/og-images/gone.png' does not exist"));
        assert!(warnings.contains("elsewhere: og_image '/static/elsewhere.png' is outside"));
        assert!(warnings.contains("broken: og_image '/og-images/broken.png' cannot be decoded"));
    }
}
