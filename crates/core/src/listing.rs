//! Post listing extraction.
//!
//! The listing is a TOML document with one `[[post]]` table per blog post.
//! Records are read independently: a malformed record is reported as a
//! [`ListingIssue`] and skipped while every other record is still returned.

use crate::error::{Error, Result};
use crate::types::{DATE_FORMAT, Post, is_url_safe_slug};
use chrono::{Local, NaiveDate};
use std::collections::HashSet;
use std::fmt;
use toml::{Table, Value};

/// Ordered posts plus everything that was skipped or defaulted on the way
#[derive(Debug, Default)]
pub struct Listing {
    pub posts: Vec<Post>,
    pub issues: Vec<ListingIssue>,
}

/// A per-record problem; never fatal for the listing as a whole
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingIssue {
    /// Zero-based position of the `[[post]]` entry
    pub index: usize,
    pub slug: Option<String>,
    pub message: String,
}

impl fmt::Display for ListingIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.slug {
            Some(slug) => write!(f, "post #{} ({}): {}", self.index + 1, slug, self.message),
            None => write!(f, "post #{}: {}", self.index + 1, self.message),
        }
    }
}

/// Extract posts, defaulting missing publication dates to today
pub fn extract_posts(text: &str) -> Result<Listing> {
    extract_posts_on(text, Local::now().date_naive())
}

/// Extract posts with an explicit fallback date (useful for testing)
pub fn extract_posts_on(text: &str, today: NaiveDate) -> Result<Listing> {
    let document: Table = text
        .parse()
        .map_err(|e: toml::de::Error| Error::Listing(e.to_string()))?;

    let entries = match document.get("post") {
        None => return Ok(Listing::default()),
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            return Err(Error::Listing(
                "`post` must be an array of tables ([[post]])".to_string(),
            ));
        }
    };

    let mut listing = Listing::default();
    let mut seen = HashSet::new();

    for (index, entry) in entries.iter().enumerate() {
        let Value::Table(record) = entry else {
            listing.issues.push(ListingIssue {
                index,
                slug: None,
                message: "entry is not a table; skipped".to_string(),
            });
            continue;
        };

        let slug = match record.get("slug") {
            Some(Value::String(slug)) => slug.clone(),
            Some(_) => {
                listing.issues.push(ListingIssue {
                    index,
                    slug: None,
                    message: "`slug` is not a string; skipped".to_string(),
                });
                continue;
            }
            None => {
                listing.issues.push(ListingIssue {
                    index,
                    slug: None,
                    message: "missing `slug`; skipped".to_string(),
                });
                continue;
            }
        };

        if !is_url_safe_slug(&slug) {
            listing.issues.push(ListingIssue {
                index,
                slug: Some(slug),
                message: "slug is not URL-safe (use A-Z, a-z, 0-9, '-', '_'); skipped"
                    .to_string(),
            });
            continue;
        }

        if !seen.insert(slug.clone()) {
            listing.issues.push(ListingIssue {
                index,
                slug: Some(slug),
                message: "duplicate slug; skipped".to_string(),
            });
            continue;
        }

        let mut record_issues = Vec::new();
        let title = string_field(record, "title", &mut record_issues).unwrap_or_default();
        let hero = string_field(record, "hero", &mut record_issues).unwrap_or_default();
        let og_image = string_field(record, "og_image", &mut record_issues);
        let content = string_field(record, "content", &mut record_issues);

        let published = match record.get("published") {
            None => {
                record_issues.push(format!("missing `published`; using {}", today));
                today
            }
            Some(value) => parse_published(value).unwrap_or_else(|| {
                record_issues.push(format!("unparsable `published`; using {}", today));
                today
            }),
        };

        listing
            .issues
            .extend(record_issues.into_iter().map(|message| ListingIssue {
                index,
                slug: Some(slug.clone()),
                message,
            }));

        listing.posts.push(Post {
            slug,
            title,
            hero,
            published,
            og_image,
            content,
        });
    }

    Ok(listing)
}

/// Optional string field; a value of the wrong type is reported and ignored
fn string_field(record: &Table, key: &str, issues: &mut Vec<String>) -> Option<String> {
    match record.get(key)? {
        Value::String(value) => Some(value.clone()),
        _ => {
            issues.push(format!("`{}` is not a string; ignored", key));
            None
        }
    }
}

/// Accepts a TOML date (`2024-01-01`) or a `"YYYY-MM-DD"` string
fn parse_published(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Datetime(datetime) => {
            let date = datetime.date?;
            NaiveDate::from_ymd_opt(
                i32::from(date.year),
                u32::from(date.month),
                u32::from(date.day),
            )
        }
        Value::String(text) => NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_extract_posts_in_source_order() {
        let text = r#"
[[post]]
slug = "the-prison-of-career-mediocrity"
title = "The Prison of Career Mediocrity"
hero = "∞"
published = 2026-01-08
content = "content/posts/the-prison-of-career-mediocrity.html"

[[post]]
slug = "implementing-eip-7702"
title = "Implementing EIP-7702"
published = "2025-05-20"
og_image = "/og-images/implementing-eip-7702-0123abcd.png"
"#;

        let listing = extract_posts_on(text, today()).unwrap();
        assert!(listing.issues.is_empty(), "{:?}", listing.issues);
        assert_eq!(listing.posts.len(), 2);

        let first = &listing.posts[0];
        assert_eq!(first.slug, "the-prison-of-career-mediocrity");
        assert_eq!(first.hero, "∞");
        assert_eq!(first.published, date(2026, 1, 8));
        assert_eq!(
            first.content.as_deref(),
            Some("content/posts/the-prison-of-career-mediocrity.html")
        );
        assert!(first.og_image.is_none());

        let second = &listing.posts[1];
        assert_eq!(second.slug, "implementing-eip-7702");
        assert_eq!(second.hero, "");
        assert!(!second.has_hero());
        assert_eq!(second.published, date(2025, 5, 20));
        assert_eq!(
            second.og_image.as_deref(),
            Some("/og-images/implementing-eip-7702-0123abcd.png")
        );
    }

    #[test]
    fn test_escaped_quotes_are_unescaped() {
        let text = r#"
[[post]]
slug = "foo"
title = "Hello \"World\""
hero = "\\o/"
published = 2024-01-01
"#;
        let listing = extract_posts_on(text, today()).unwrap();
        assert_eq!(listing.posts[0].title, "Hello \"World\"");
        assert_eq!(listing.posts[0].hero, "\\o/");
    }

    #[test]
    fn test_nested_structures_do_not_end_record() {
        let text = r#"
[[post]]
slug = "nested"
title = "Braces { inside } strings"
tags = [{ name = "rust" }, { name = "web" }]

[post.extra]
note = "}"

[[post]]
slug = "after"
title = "After"
published = 2024-02-02
"#;
        let listing = extract_posts_on(text, today()).unwrap();
        let slugs: Vec<_> = listing.posts.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["nested", "after"]);
        assert_eq!(listing.posts[0].title, "Braces { inside } strings");
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let text = "[[post]]\nslug = \"bare\"\n";
        let listing = extract_posts_on(text, today()).unwrap();
        let post = &listing.posts[0];
        assert_eq!(post.title, "");
        assert_eq!(post.hero, "");
        assert_eq!(post.published, today());
        assert_eq!(listing.issues.len(), 1);
        assert!(listing.issues[0].message.contains("missing `published`"));
    }

    #[test]
    fn test_unparsable_published_defaults_to_today() {
        let text = "[[post]]\nslug = \"a\"\npublished = \"yesterday\"\n\n[[post]]\nslug = \"b\"\npublished = 42\n";
        let listing = extract_posts_on(text, today()).unwrap();
        assert_eq!(listing.posts.len(), 2);
        assert!(listing.posts.iter().all(|p| p.published == today()));
        assert_eq!(listing.issues.len(), 2);
    }

    #[test]
    fn test_malformed_records_are_skipped_not_fatal() {
        let text = r#"
[[post]]
title = "No slug"

[[post]]
slug = 7

[[post]]
slug = "../escape"

[[post]]
slug = "good"
title = 12
published = 2024-03-03
"#;
        let listing = extract_posts_on(text, today()).unwrap();
        assert_eq!(listing.posts.len(), 1);
        assert_eq!(listing.posts[0].slug, "good");
        assert_eq!(listing.posts[0].title, "");
        assert_eq!(listing.issues.len(), 4);
        assert_eq!(listing.issues[2].slug.as_deref(), Some("../escape"));
    }

    #[test]
    fn test_count_equals_distinct_slugs() {
        let text = r#"
[[post]]
slug = "a"
published = 2024-01-01

[[post]]
slug = "b"
published = 2024-01-01

[[post]]
slug = "a"
title = "Duplicate"
published = 2024-01-01
"#;
        let listing = extract_posts_on(text, today()).unwrap();
        assert_eq!(listing.posts.len(), 2);
        assert_eq!(listing.posts[0].title, "");
        assert!(listing.issues[0].message.contains("duplicate"));
    }

    #[test]
    fn test_empty_listing() {
        let listing = extract_posts_on("# nothing yet\n", today()).unwrap();
        assert!(listing.posts.is_empty());
        assert!(listing.issues.is_empty());
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let result = extract_posts_on("[[post]\nslug = ", today());
        assert!(matches!(result, Err(Error::Listing(_))));
    }

    #[test]
    fn test_post_must_be_array() {
        let result = extract_posts_on("post = \"nope\"\n", today());
        assert!(matches!(result, Err(Error::Listing(_))));
    }

    #[test]
    fn test_issue_display() {
        let issue = ListingIssue {
            index: 0,
            slug: Some("foo".to_string()),
            message: "duplicate slug; skipped".to_string(),
        };
        assert_eq!(issue.to_string(), "post #1 (foo): duplicate slug; skipped");
    }
}
