use crate::request::Request;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

const HTML_SUFFIXES: &[&str] = &[".html", ".htm"];
const SCRIPT_SUFFIXES: &[&str] = &[".js", ".mjs"];
const STYLESHEET_SUFFIXES: &[&str] = &[".css", ".scss"];
const IMAGE_SUFFIXES: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".webp", ".svg", ".ico", ".bmp", ".avif",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Html,
    Script,
    Stylesheet,
    Image,
    Unknown,
}

impl Category {
    /// Unknown resources are fetched but never written.
    pub fn is_persisted(self) -> bool {
        !matches!(self, Category::Unknown)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Html => "html",
            Category::Script => "script",
            Category::Stylesheet => "stylesheet",
            Category::Image => "image",
            Category::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decide what a fetched resource is.
///
/// A `text/html` response is markup whatever its URL says. Otherwise the
/// URL path suffix wins, and the declared content type is only consulted
/// when no suffix matches. The request's label is not consulted.
pub fn classify(request: &Request, content_type: Option<&str>) -> Category {
    let content_type = content_type.map(str::to_ascii_lowercase);

    if content_type
        .as_deref()
        .is_some_and(|ct| ct.contains("text/html"))
    {
        return Category::Html;
    }

    if let Some(category) = category_from_suffix(&request.url) {
        return category;
    }

    content_type
        .as_deref()
        .map(category_from_content_type)
        .unwrap_or(Category::Unknown)
}

pub fn category_from_suffix(url: &Url) -> Option<Category> {
    let path = url.path().to_ascii_lowercase();
    let matches = |suffixes: &[&str]| suffixes.iter().any(|s| path.ends_with(s));

    if matches(HTML_SUFFIXES) {
        Some(Category::Html)
    } else if matches(SCRIPT_SUFFIXES) {
        Some(Category::Script)
    } else if matches(STYLESHEET_SUFFIXES) {
        Some(Category::Stylesheet)
    } else if matches(IMAGE_SUFFIXES) {
        Some(Category::Image)
    } else {
        None
    }
}

fn category_from_content_type(content_type: &str) -> Category {
    if content_type.contains("text/html") {
        Category::Html
    } else if content_type.contains("javascript") || content_type.contains("ecmascript") {
        Category::Script
    } else if content_type.contains("css") {
        Category::Stylesheet
    } else if content_type.starts_with("image/") {
        Category::Image
    } else {
        Category::Unknown
    }
}

/// Whether a path ends in an HTML-like suffix.
pub fn has_html_suffix(url: &Url) -> bool {
    matches!(category_from_suffix(url), Some(Category::Html))
}
