//! OG image HTML template substitution.
//!
//! The template carries three placeholder elements (`id="hero"`,
//! `id="separator"`, `id="title"`) and an inline script assigning the same
//! text at runtime. Both copies are rewritten so static markup and script
//! always agree.

use regex::{NoExpand, Regex};
use std::sync::LazyLock;

static HERO_ELEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<div class="hero" id="hero"[^>]*>.*?</div>"#).unwrap());
static SEPARATOR_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<span class="separator" id="separator"[^>]*>.*?</span>"#).unwrap()
});
static TITLE_ELEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<div class="title" id="title"[^>]*>.*?</div>"#).unwrap());
static HERO_SCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"document\.getElementById\('hero'\)\.textContent = .*?;"#).unwrap()
});
static SEPARATOR_SCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"document\.getElementById\('separator'\)\.textContent = .*?;"#).unwrap()
});
static TITLE_SCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"document\.getElementById\('title'\)\.textContent = .*?;"#).unwrap()
});

fn placeholders() -> [(&'static str, &'static Regex); 6] {
    [
        ("hero element", &*HERO_ELEMENT),
        ("separator element", &*SEPARATOR_ELEMENT),
        ("title element", &*TITLE_ELEMENT),
        ("hero script assignment", &*HERO_SCRIPT),
        ("separator script assignment", &*SEPARATOR_SCRIPT),
        ("title script assignment", &*TITLE_SCRIPT),
    ]
}

/// Names of placeholders the template lacks; empty when the template is usable
pub fn missing_placeholders(template: &str) -> Vec<&'static str> {
    placeholders()
        .into_iter()
        .filter(|(_, pattern)| !pattern.is_match(template))
        .map(|(name, _)| name)
        .collect()
}

/// Fill the template with a post's hero and title.
///
/// An empty hero hides both the hero and the separator instead of rendering
/// them empty.
pub fn render_og_html(template: &str, hero: &str, title: &str) -> String {
    let has_hero = !hero.is_empty();

    let hero_element = if has_hero {
        format!(r#"<div class="hero" id="hero">{}</div>"#, html_escape(hero))
    } else {
        r#"<div class="hero" id="hero" style="display: none;"></div>"#.to_string()
    };
    let separator_element = if has_hero {
        r#"<span class="separator" id="separator">-</span>"#
    } else {
        r#"<span class="separator" id="separator" style="display: none;">-</span>"#
    };
    let title_element = format!(r#"<div class="title" id="title">{}</div>"#, html_escape(title));

    let hero_script = format!(
        "document.getElementById('hero').textContent = {};",
        script_string(hero)
    );
    let separator_script = if has_hero {
        "document.getElementById('separator').textContent = '-';"
    } else {
        "document.getElementById('separator').style.display = 'none';"
    };
    let title_script = format!(
        "document.getElementById('title').textContent = {};",
        script_string(title)
    );

    let html = HERO_ELEMENT.replace(template, NoExpand(&hero_element));
    let html = SEPARATOR_ELEMENT.replace(&html, NoExpand(separator_element));
    let html = TITLE_ELEMENT.replace(&html, NoExpand(&title_element));
    let html = HERO_SCRIPT.replace(&html, NoExpand(&hero_script));
    let html = SEPARATOR_SCRIPT.replace(&html, NoExpand(separator_script));
    let html = TITLE_SCRIPT.replace(&html, NoExpand(&title_script));
    html.into_owned()
}

/// HTML-escape a string for element content
///
/// Escapes: & < > " '
pub fn html_escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// JS string literal safe to place inside an inline `<script>`
fn script_string(s: &str) -> String {
    serde_json::to_string(s)
        .unwrap_or_else(|_| "\"\"".to_string())
        .replace("</", "<\\/")
}
