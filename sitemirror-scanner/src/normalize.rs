use crate::error::{Result, ScanError};
use sha2::{Digest, Sha256};
use url::Url;

/// Resolve `reference` against `base` into an absolute http(s) URL.
///
/// Handles protocol-relative (`//cdn/x.js`), path-relative (`../a.css`),
/// root-relative and fragment-only references. The fragment is dropped so
/// `page.html#top` and `page.html` share one identity.
pub fn normalize(reference: &str, base: &Url) -> Result<Url> {
    let reference = reference.trim();
    let mut resolved = base.join(reference).map_err(|e| ScanError::Normalization {
        reference: reference.to_string(),
        base: base.to_string(),
        reason: e.to_string(),
    })?;

    match resolved.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ScanError::Normalization {
                reference: reference.to_string(),
                base: base.to_string(),
                reason: format!("unsupported scheme '{}'", other),
            });
        }
    }

    resolved.set_fragment(None);
    Ok(resolved)
}

/// Hostname of an absolute URL, used as the crawl's domain scope.
pub fn hostname(url: &Url) -> Option<&str> {
    url.host_str()
}

/// Derive the on-disk name for a fetched resource.
///
/// The path is percent-decoded and its final segment is used as-is, so
/// `/img/%E8%83%8C%E6%99%AF.png` becomes `背景.png`. An empty segment, a
/// dot segment, or a path that does not decode to UTF-8 falls back to a
/// synthesized `file-<token>` name whose token is derived from the URL.
pub fn derive_file_name(url: &Url) -> String {
    let decoded = match urlencoding::decode(url.path()) {
        Ok(decoded) => decoded,
        Err(_) => return synthesized_name(url),
    };

    match decoded.rsplit('/').next() {
        Some(segment) if is_usable_segment(segment) => segment.to_string(),
        _ => synthesized_name(url),
    }
}

fn is_usable_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['\0', '\\'])
}

fn synthesized_name(url: &Url) -> String {
    format!("file-{}", &url_digest(url)[..12])
}

/// Hex SHA-256 of the full URL string.
pub fn url_digest(url: &Url) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_str().as_bytes());
    hex::encode(hasher.finalize())
}
