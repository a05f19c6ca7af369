use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Routing hint attached when a resource is discovered.
///
/// The label never decides where a fetched body ends up; classification
/// looks at the URL suffix and the response content type instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Html,
    Js,
    Css,
    Image,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Label::Html => "html",
            Label::Js => "js",
            Label::Css => "css",
            Label::Image => "image",
        };
        f.write_str(name)
    }
}

/// A pending fetch. Identity is the normalized URL alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: Url,
    pub label: Label,
}

impl Request {
    pub fn new(url: Url, label: Label) -> Self {
        Self { url, label }
    }

    /// Key used by the frontier's seen-set.
    pub fn key(&self) -> &str {
        self.url.as_str()
    }
}
