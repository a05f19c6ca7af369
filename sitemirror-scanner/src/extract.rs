use crate::classify::{Category, has_html_suffix};
use crate::normalize::{hostname, normalize};
use crate::request::Label;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, warn};
use url::Url;

static SCRIPT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script[src]").expect("valid selector"));
static STYLESHEET_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("link[rel~=stylesheet][href]").expect("valid selector"));
static IMAGE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img[src]").expect("valid selector"));
static STYLE_BLOCK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("style").expect("valid selector"));
static STYLE_ATTR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[style]").expect("valid selector"));
static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

/// How strictly an anchor must look like a page before it is traversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkMatch {
    /// Path suffix match, or `.html`/`.htm` anywhere in the decoded href.
    #[default]
    Loose,
    /// Path suffix match only.
    Strict,
}

/// A newly discovered reference, already absolute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Discovery {
    pub url: Url,
    pub label: Label,
}

/// Turns one fetched body into the resources it references.
///
/// Holds only immutable configuration, so repeated calls on the same body
/// give the same result.
#[derive(Debug, Clone)]
pub struct Extractor {
    scope: String,
    link_match: LinkMatch,
}

impl Extractor {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            link_match: LinkMatch::default(),
        }
    }

    pub fn with_link_match(mut self, link_match: LinkMatch) -> Self {
        self.link_match = link_match;
        self
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn extract(&self, category: Category, body: &str, source: &Url) -> Vec<Discovery> {
        let mut found = Discoveries::default();
        match category {
            Category::Html => self.extract_html(body, source, &mut found),
            Category::Stylesheet => {
                for reference in style_urls(body) {
                    found.push_resolved(&reference, source, Label::Image);
                }
            }
            Category::Script | Category::Image | Category::Unknown => {}
        }
        found.items
    }

    fn extract_html(&self, body: &str, source: &Url, found: &mut Discoveries) {
        let document = Html::parse_document(body);

        for element in document.select(&SCRIPT_SELECTOR) {
            if let Some(src) = element.value().attr("src") {
                found.push_resolved(src, source, Label::Js);
            }
        }

        for element in document.select(&STYLESHEET_SELECTOR) {
            if let Some(href) = element.value().attr("href") {
                found.push_resolved(href, source, Label::Css);
            }
        }

        for element in document.select(&IMAGE_SELECTOR) {
            if let Some(src) = element.value().attr("src") {
                found.push_resolved(src, source, Label::Image);
            }
        }

        for element in document.select(&STYLE_BLOCK_SELECTOR) {
            let text: String = element.text().collect();
            for reference in style_urls(&text) {
                found.push_resolved(&reference, source, Label::Image);
            }
        }

        for element in document.select(&STYLE_ATTR_SELECTOR) {
            if let Some(style) = element.value().attr("style") {
                for reference in style_urls(style) {
                    found.push_resolved(&reference, source, Label::Image);
                }
            }
        }

        for element in document.select(&ANCHOR_SELECTOR) {
            if let Some(href) = element.value().attr("href")
                && let Some(url) = self.page_link(href, source)
            {
                found.push(url, Label::Html);
            }
        }
    }

    /// Resolve an anchor and keep it only when it is an in-scope page.
    fn page_link(&self, href: &str, source: &Url) -> Option<Url> {
        if is_skipped_reference(href) {
            return None;
        }

        let url = match normalize(href, source) {
            Ok(url) => url,
            Err(e) => {
                warn!("Skipping invalid page link: {}", e);
                return None;
            }
        };

        if hostname(&url) != Some(self.scope.as_str()) {
            debug!("Skipping out-of-scope link {}", url);
            return None;
        }

        if !self.looks_like_page(href, &url) {
            debug!("Skipping non-page link {}", url);
            return None;
        }

        Some(url)
    }

    fn looks_like_page(&self, href: &str, url: &Url) -> bool {
        if has_html_suffix(url) {
            return true;
        }
        match self.link_match {
            LinkMatch::Strict => false,
            LinkMatch::Loose => {
                let decoded = urlencoding::decode(href)
                    .map(|d| d.into_owned())
                    .unwrap_or_else(|_| href.to_string());
                decoded.contains(".htm")
            }
        }
    }
}

#[derive(Default)]
struct Discoveries {
    seen: HashSet<String>,
    items: Vec<Discovery>,
}

impl Discoveries {
    fn push(&mut self, url: Url, label: Label) {
        if self.seen.insert(url.as_str().to_string()) {
            self.items.push(Discovery { url, label });
        }
    }

    fn push_resolved(&mut self, reference: &str, base: &Url, label: Label) {
        if is_skipped_reference(reference) {
            return;
        }
        match normalize(reference, base) {
            Ok(url) => self.push(url, label),
            Err(e) => warn!("Skipping invalid reference: {}", e),
        }
    }
}

/// References that name no fetchable resource.
fn is_skipped_reference(reference: &str) -> bool {
    let reference = reference.trim();
    let lower = reference.to_ascii_lowercase();
    reference.is_empty()
        || reference.starts_with('#')
        || lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
}

/// Arguments of every `url(...)` in a chunk of CSS, in source order.
///
/// Rules:
/// - the function name is matched case-insensitively and must not be the
///   tail of a longer identifier (`myurl(` is ignored);
/// - whitespace between `(` and the argument, and between the argument and
///   `)`, is ignored;
/// - a quoted argument (`'...'` or `"..."`) runs to the matching quote and
///   the quotes are stripped; a quoted argument with no closing quote ends
///   the scan;
/// - an unquoted argument runs to the next `)` and is trimmed;
/// - empty arguments are dropped.
pub fn style_urls(css: &str) -> Vec<String> {
    let bytes = css.as_bytes();
    let mut urls = Vec::new();
    let mut pos = 0;

    while let Some(offset) = find_url_function(&bytes[pos..]) {
        let start = pos + offset;
        let preceded_by_ident = start > 0 && is_ident_byte(bytes[start - 1]);
        let mut cursor = start + 4;
        if preceded_by_ident {
            pos = cursor;
            continue;
        }

        cursor = skip_whitespace(bytes, cursor);
        let Some(&first) = bytes.get(cursor) else {
            break;
        };

        if first == b'\'' || first == b'"' {
            let open = cursor + 1;
            let Some(len) = bytes[open..].iter().position(|&b| b == first) else {
                break;
            };
            let argument = &css[open..open + len];
            cursor = skip_whitespace(bytes, open + len + 1);
            if bytes.get(cursor) == Some(&b')') {
                push_argument(&mut urls, argument);
                cursor += 1;
            }
        } else {
            let Some(len) = bytes[cursor..].iter().position(|&b| b == b')') else {
                break;
            };
            push_argument(&mut urls, &css[cursor..cursor + len]);
            cursor += len + 1;
        }

        pos = cursor;
    }

    urls
}

fn push_argument(urls: &mut Vec<String>, argument: &str) {
    let argument = argument.trim();
    if !argument.is_empty() {
        urls.push(argument.to_string());
    }
}

fn find_url_function(haystack: &[u8]) -> Option<usize> {
    haystack
        .windows(4)
        .position(|w| w[..3].eq_ignore_ascii_case(b"url") && w[3] == b'(')
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

fn skip_whitespace(bytes: &[u8], mut cursor: usize) -> usize {
    while bytes.get(cursor).is_some_and(|b| b.is_ascii_whitespace()) {
        cursor += 1;
    }
    cursor
}
