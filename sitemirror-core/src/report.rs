// Run summary and its text / JSON renderings

use crate::crawl::extract_url_path;
use anyhow::Result;
use serde::Serialize;
use sitemirror_scanner::{Category, CrawlResult};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SummaryTotals {
    pub requests: usize,
    pub pages: usize,
    pub scripts: usize,
    pub stylesheets: usize,
    pub images: usize,
    pub unknown: usize,
    pub saved: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl SummaryTotals {
    fn from_results(results: &[CrawlResult]) -> Self {
        let mut totals = SummaryTotals {
            requests: results.len(),
            ..Default::default()
        };
        for result in results {
            match result.category {
                Some(Category::Html) => totals.pages += 1,
                Some(Category::Script) => totals.scripts += 1,
                Some(Category::Stylesheet) => totals.stylesheets += 1,
                Some(Category::Image) => totals.images += 1,
                Some(Category::Unknown) => totals.unknown += 1,
                None => {}
            }
            if result.saved_to.is_some() {
                totals.saved += 1;
            }
            if result.fetch_failed() {
                totals.failed += 1;
            } else if result.error.is_some() {
                totals.skipped += 1;
            }
        }
        totals
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MirrorSummary {
    pub seed: String,
    pub output: PathBuf,
    pub totals: SummaryTotals,
    pub results: Vec<CrawlResult>,
}

impl MirrorSummary {
    pub fn new(seed: impl Into<String>, output: impl Into<PathBuf>, results: Vec<CrawlResult>) -> Self {
        Self {
            seed: seed.into(),
            output: output.into(),
            totals: SummaryTotals::from_results(&results),
            results,
        }
    }
}

pub fn render_report(summary: &MirrorSummary, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Text => Ok(generate_mirror_report(summary)),
        ReportFormat::Json => Ok(serde_json::to_string_pretty(summary)?),
    }
}

/// Plain-text summary: totals, then saved artifacts per category, then
/// failures and skips.
pub fn generate_mirror_report(summary: &MirrorSummary) -> String {
    let totals = &summary.totals;
    let mut report = String::new();
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    report.push_str("# Summary:\n");
    report.push_str(&format!("  Seed: {}\n", summary.seed));
    report.push_str(&format!("  Output: {}\n", summary.output.display()));
    report.push_str(&format!("  Requests processed: {}\n", totals.requests));
    report.push_str(&format!("  Artifacts saved: {}\n", totals.saved));
    report.push_str(&format!(
        "  Pages: {}  Scripts: {}  Stylesheets: {}  Images: {}  Other: {}\n",
        totals.pages, totals.scripts, totals.stylesheets, totals.images, totals.unknown
    ));
    report.push_str(&format!("  Failed requests: {}\n", totals.failed));
    report.push_str(&format!("  Skipped artifacts: {}\n", totals.skipped));

    report.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    for category in [
        Category::Html,
        Category::Script,
        Category::Stylesheet,
        Category::Image,
    ] {
        let saved: Vec<&CrawlResult> = summary
            .results
            .iter()
            .filter(|r| r.category == Some(category) && r.saved_to.is_some())
            .collect();
        if saved.is_empty() {
            continue;
        }

        report.push_str(&format!("## {} ({})\n", category, saved.len()));
        for result in saved {
            if let Some(ref path) = result.saved_to {
                report.push_str(&format!(
                    "  {} -> {}\n",
                    extract_url_path(&result.url),
                    path.display()
                ));
            }
        }
        report.push('\n');
    }

    let problems: Vec<&CrawlResult> = summary
        .results
        .iter()
        .filter(|r| r.error.is_some())
        .collect();
    if !problems.is_empty() {
        report.push_str(&format!("## problems ({})\n", problems.len()));
        for result in problems {
            let kind = if result.fetch_failed() { "failed" } else { "skipped" };
            report.push_str(&format!(
                "  [{}] {}: {}\n",
                kind,
                result.url,
                result.error.as_deref().unwrap_or_default()
            ));
        }
        report.push('\n');
    }

    report
}
