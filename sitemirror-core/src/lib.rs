use colored::Colorize;

pub mod crawl;
pub mod report;

pub use crawl::{
    MirrorOptions, MirrorResultCallback, execute_mirror, extract_url_path, mirror_spinner,
};
pub use report::{MirrorSummary, ReportFormat, SummaryTotals, generate_mirror_report, render_report};

pub fn print_banner() {
    println!(
        "{} {}",
        "sitemirror".bright_cyan().bold(),
        env!("CARGO_PKG_VERSION").bright_black()
    );
    println!("{}", "pages, scripts, stylesheets and images, saved locally".bright_black());
    println!();
}
