use crate::report::MirrorSummary;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use sitemirror_scanner::crawler::{DEFAULT_MAX_RETRIES, DEFAULT_WORKERS};
use sitemirror_scanner::frontier::DEFAULT_BUDGET;
use sitemirror_scanner::transport::{DEFAULT_TIMEOUT_SECS, HttpTransport};
use sitemirror_scanner::{CollisionPolicy, CrawlResult, Crawler, LinkMatch, OutputLayout};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

/// Options for configuring a mirror run
pub struct MirrorOptions {
    pub url: String,
    pub output: PathBuf,
    pub threads: usize,
    pub max_requests: usize,
    pub timeout_secs: u64,
    pub max_retries: usize,
    pub link_match: LinkMatch,
    pub collision_policy: CollisionPolicy,
    /// Spinner to drive during the run, usually from [`mirror_spinner`].
    pub progress_bar: Option<ProgressBar>,
}

impl MirrorOptions {
    pub fn new(url: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            output: output.into(),
            threads: DEFAULT_WORKERS,
            max_requests: DEFAULT_BUDGET,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            link_match: LinkMatch::default(),
            collision_policy: CollisionPolicy::default(),
            progress_bar: None,
        }
    }
}

/// The run's spinner, not yet ticking. Created up front so the log writer
/// can suspend it around each line.
pub fn mirror_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb
}

/// Callback for reporting individual results as they come in
pub type MirrorResultCallback = Arc<dyn Fn(CrawlResult) + Send + Sync>;

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

/// Run one mirror to completion.
///
/// Fails only when the run cannot start (bad seed, HTTP client setup).
/// Individual fetch, extract and write failures end up in the summary.
pub async fn execute_mirror(
    options: MirrorOptions,
    result_callback: Option<MirrorResultCallback>,
) -> Result<MirrorSummary> {
    let MirrorOptions {
        url,
        output,
        threads,
        max_requests,
        timeout_secs,
        max_retries,
        link_match,
        collision_policy,
        progress_bar,
    } = options;

    let transport = HttpTransport::with_timeout(timeout_secs)
        .context("Failed to create HTTP client")?;

    if let Some(ref pb) = progress_bar {
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Starting mirror...");
    }

    let processed_count = Arc::new(AtomicUsize::new(0));

    let mut crawler = Crawler::with_transport(OutputLayout::new(output.clone()), Arc::new(transport))
        .with_budget(max_requests)
        .with_max_retries(max_retries)
        .with_link_match(link_match)
        .with_collision_policy(collision_policy);

    if let Some(pb) = progress_bar.clone() {
        let count = processed_count.clone();
        crawler = crawler.with_progress_callback(Arc::new(move |_worker_id: usize, url: String| {
            let processed = count.fetch_add(1, Ordering::Relaxed) + 1;
            pb.set_message(format!(
                "Mirroring... {} requests dispatched ({})",
                processed,
                extract_url_path(&url)
            ));
        }));
    }

    if let Some(cb) = result_callback {
        crawler = crawler.with_result_callback(cb);
    }

    let crawled = crawler.crawl(&url, threads).await;

    if let Some(ref pb) = progress_bar {
        match crawled {
            Ok(ref results) => pb.finish_with_message(format!(
                "Mirror complete! {} requests processed",
                results.len()
            )),
            Err(_) => pb.finish_and_clear(),
        }
    }

    let results = crawled.with_context(|| format!("Failed to mirror {}", url))?;

    Ok(MirrorSummary::new(url, output, results))
}
