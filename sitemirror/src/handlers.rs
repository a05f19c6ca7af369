use clap::ArgMatches;
use colored::Colorize;
use indicatif::ProgressBar;
use sitemirror_core::crawl::{MirrorOptions, execute_mirror, mirror_spinner};
use sitemirror_core::report::{ReportFormat, render_report};
use sitemirror_scanner::{CollisionPolicy, LinkMatch, parse_seed};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;
use url::Url;

/// clap value parser for the seed URL; rejects anything that is not an
/// absolute http(s) URL with a host.
pub fn parse_seed_arg(value: &str) -> Result<Url, String> {
    parse_seed(value).map_err(|e| e.to_string())
}

/// Expand `~` in the output directory
pub fn resolve_output_dir(value: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(value).as_ref())
}

pub fn log_level(quiet: bool, verbose: bool) -> Level {
    if verbose {
        Level::DEBUG
    } else if quiet {
        Level::WARN
    } else {
        Level::INFO
    }
}

/// Log writer for stderr that hides the spinner while a line prints, so
/// log output and spinner frames do not interleave.
#[derive(Clone, Default)]
pub struct SpinnerAwareWriter {
    spinner: Option<ProgressBar>,
}

impl SpinnerAwareWriter {
    pub fn new(spinner: Option<ProgressBar>) -> Self {
        Self { spinner }
    }
}

impl Write for SpinnerAwareWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.spinner {
            Some(ref pb) => pb.suspend(|| io::stderr().write(buf)),
            None => io::stderr().write(buf),
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self.spinner {
            Some(ref pb) => pb.suspend(|| io::stderr().write_all(buf)),
            None => io::stderr().write_all(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

impl<'a> MakeWriter<'a> for SpinnerAwareWriter {
    type Writer = SpinnerAwareWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn init_logging(level: Level, spinner: Option<ProgressBar>) {
    // Logs go to stderr so a JSON report on stdout stays parseable
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(SpinnerAwareWriter::new(spinner))
        .init();
}

pub async fn handle_mirror(matches: &ArgMatches) {
    let quiet = matches.get_flag("quiet");
    let verbose = matches.get_flag("verbose");
    let spinner = (!quiet && !matches.get_flag("no-progress")).then(mirror_spinner);
    init_logging(log_level(quiet, verbose), spinner.clone());

    let Some(seed) = matches.get_one::<Url>("URL") else {
        eprintln!("{} a seed URL is required", "✗".red());
        std::process::exit(2);
    };
    let output = matches
        .get_one::<String>("output")
        .map(|o| resolve_output_dir(o))
        .unwrap_or_else(|| PathBuf::from("output"));
    let format = matches
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::parse(f))
        .unwrap_or(ReportFormat::Text);

    let mut options = MirrorOptions::new(seed.as_str(), output);
    if let Some(threads) = matches.get_one::<usize>("threads") {
        options.threads = *threads;
    }
    if let Some(max_requests) = matches.get_one::<usize>("max-requests") {
        options.max_requests = *max_requests;
    }
    if let Some(timeout) = matches.get_one::<u64>("timeout") {
        options.timeout_secs = *timeout;
    }
    if let Some(retries) = matches.get_one::<usize>("retries") {
        options.max_retries = *retries;
    }
    if matches.get_flag("strict-links") {
        options.link_match = LinkMatch::Strict;
    }
    if matches.get_flag("no-clobber") {
        options.collision_policy = CollisionPolicy::Suffix;
    }
    options.progress_bar = spinner;

    if !quiet && format == ReportFormat::Text {
        println!("Mirroring {}", seed.as_str().bright_white().bold());
        println!("Output: {}", options.output.display());
        println!(
            "Workers: {}  Budget: {} requests\n",
            options.threads, options.max_requests
        );
    }

    let summary = match execute_mirror(options, None).await {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("{} Mirror failed: {:#}", "✗".red(), e);
            std::process::exit(1);
        }
    };

    match render_report(&summary, format) {
        Ok(report) => print!("{}", report),
        Err(e) => eprintln!("{} Could not render report: {}", "✗".red(), e),
    }
    if format == ReportFormat::Json {
        println!();
    }

    eprintln!(
        "{} Mirror complete: {} saved, {} failed, {} skipped",
        "✓".green(),
        summary.totals.saved,
        summary.totals.failed,
        summary.totals.skipped
    );
}
