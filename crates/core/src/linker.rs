//! Write resolved OG image paths back into the post listing.
//!
//! Edits go through `toml_edit` so everything outside the touched values
//! (comments, ordering, spacing) survives byte for byte. All edits are made
//! in memory; callers write the returned text once, and only when
//! [`LinkOutcome::changed`] is true.

use crate::error::{Error, Result};
use std::collections::{HashMap, HashSet};
use toml_edit::{DocumentMut, Item, TableLike};

pub const OG_IMAGE_KEY: &str = "og_image";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkChange {
    Added { slug: String, path: String },
    Updated { slug: String, previous: String, path: String },
}

#[derive(Debug)]
pub struct LinkOutcome {
    pub text: String,
    pub changes: Vec<LinkChange>,
}

impl LinkOutcome {
    pub fn changed(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// Set `og_image` on every record whose slug has a resolved path.
///
/// Records already carrying the resolved value are left alone, so running
/// twice with the same mapping returns the input text unchanged.
pub fn link_og_images(text: &str, resolved: &HashMap<String, String>) -> Result<LinkOutcome> {
    let mut document: DocumentMut = text.parse()?;
    let mut changes = Vec::new();
    let mut seen = HashSet::new();

    match document.get_mut("post") {
        None => {}
        Some(Item::ArrayOfTables(records)) => {
            for record in records.iter_mut() {
                link_record(record, resolved, &mut seen, &mut changes);
            }
        }
        Some(item) => {
            let Some(records) = item.as_array_mut() else {
                return Err(Error::Listing(
                    "`post` must be an array of tables ([[post]])".to_string(),
                ));
            };
            for record in records.iter_mut() {
                if let Some(record) = record.as_inline_table_mut() {
                    link_record(record, resolved, &mut seen, &mut changes);
                }
            }
        }
    }

    let text = if changes.is_empty() {
        text.to_string()
    } else {
        document.to_string()
    };

    Ok(LinkOutcome { text, changes })
}

fn link_record(
    record: &mut dyn TableLike,
    resolved: &HashMap<String, String>,
    seen: &mut HashSet<String>,
    changes: &mut Vec<LinkChange>,
) {
    let Some(slug) = record.get("slug").and_then(Item::as_str).map(str::to_string) else {
        return;
    };
    // Later duplicates are skipped by extraction too
    if !seen.insert(slug.clone()) {
        return;
    }
    let Some(path) = resolved.get(&slug) else {
        return;
    };

    match record.get_mut(OG_IMAGE_KEY) {
        Some(item) => {
            let previous = item.as_str().map(str::to_string);
            if previous.as_deref() == Some(path.as_str()) {
                return;
            }

            let decor = item.as_value().map(|value| value.decor().clone());
            *item = toml_edit::value(path.as_str());
            if let (Some(decor), Some(value)) = (decor, item.as_value_mut()) {
                *value.decor_mut() = decor;
            }

            changes.push(LinkChange::Updated {
                slug,
                previous: previous.unwrap_or_default(),
                path: path.clone(),
            });
        }
        None => {
            record.insert(OG_IMAGE_KEY, toml_edit::value(path.as_str()));
            changes.push(LinkChange::Added {
                slug,
                path: path.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::extract_posts;

    const LISTING: &str = r#"# Blog posts, newest last

[[post]]
slug = "first"
title = "Hello \"World\""
published = 2024-01-01

[[post]]
slug = "second"
title = "Second"
og_image = "/og-images/second-00000000.png" # generated
published = 2024-02-01
"#;

    fn mapping(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(slug, path)| (slug.to_string(), path.to_string()))
            .collect()
    }

    #[test]
    fn test_inserts_missing_field_as_last_key() {
        let outcome =
            link_og_images(LISTING, &mapping(&[("first", "/og-images/first-abcdef12.png")]))
                .unwrap();

        assert_eq!(
            outcome.changes,
            vec![LinkChange::Added {
                slug: "first".to_string(),
                path: "/og-images/first-abcdef12.png".to_string(),
            }]
        );
        assert!(outcome.text.contains(
            "published = 2024-01-01\nog_image = \"/og-images/first-abcdef12.png\"\n"
        ));
        // Everything else is untouched
        assert!(outcome.text.starts_with("# Blog posts, newest last\n"));
        assert!(outcome.text.contains("title = \"Hello \\\"World\\\"\""));
        assert!(outcome.text.contains("og_image = \"/og-images/second-00000000.png\" # generated"));
    }

    #[test]
    fn test_replaces_only_the_value() {
        let outcome =
            link_og_images(LISTING, &mapping(&[("second", "/og-images/second-12345678.png")]))
                .unwrap();

        assert_eq!(
            outcome.changes,
            vec![LinkChange::Updated {
                slug: "second".to_string(),
                previous: "/og-images/second-00000000.png".to_string(),
                path: "/og-images/second-12345678.png".to_string(),
            }]
        );
        let expected = LISTING.replace(
            "/og-images/second-00000000.png",
            "/og-images/second-12345678.png",
        );
        assert_eq!(outcome.text, expected);
    }

    #[test]
    fn test_second_run_is_byte_identical() {
        let resolved = mapping(&[
            ("first", "/og-images/first-abcdef12.png"),
            ("second", "/og-images/second-12345678.png"),
        ]);

        let once = link_og_images(LISTING, &resolved).unwrap();
        assert_eq!(once.changes.len(), 2);

        let twice = link_og_images(&once.text, &resolved).unwrap();
        assert!(!twice.changed());
        assert_eq!(twice.text, once.text);
    }

    #[test]
    fn test_unresolved_and_unknown_slugs_are_ignored() {
        let outcome = link_og_images(LISTING, &mapping(&[("missing", "/x.png")])).unwrap();
        assert!(!outcome.changed());
        assert_eq!(outcome.text, LISTING);
    }

    #[test]
    fn test_linked_listing_still_extracts() {
        let resolved = mapping(&[("first", "/og-images/first-abcdef12.png")]);
        let outcome = link_og_images(LISTING, &resolved).unwrap();
        let listing = extract_posts(&outcome.text).unwrap();
        assert_eq!(listing.posts[0].title, "Hello \"World\"");
        assert_eq!(
            listing.posts[0].og_image.as_deref(),
            Some("/og-images/first-abcdef12.png")
        );
    }

    #[test]
    fn test_only_first_duplicate_is_linked() {
        let text = "[[post]]\nslug = \"a\"\n\n[[post]]\nslug = \"a\"\n";
        let outcome = link_og_images(text, &mapping(&[("a", "/a.png")])).unwrap();
        assert_eq!(outcome.changes.len(), 1);
        assert_eq!(outcome.text.matches("og_image").count(), 1);
    }

    #[test]
    fn test_inline_array_of_records() {
        let text = "post = [{ slug = \"a\", title = \"A\" }]\n";
        let outcome = link_og_images(text, &mapping(&[("a", "/a.png")])).unwrap();
        assert!(outcome.changed());
        let listing = extract_posts(&outcome.text).unwrap();
        assert_eq!(listing.posts[0].og_image.as_deref(), Some("/a.png"));
    }

    #[test]
    fn test_post_must_be_records() {
        let result = link_og_images("post = 3\n", &mapping(&[]));
        assert!(result.is_err());
    }
}
