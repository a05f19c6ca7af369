pub mod handlers;

pub use handlers::{SpinnerAwareWriter, log_level, parse_seed_arg, resolve_output_dir};

pub use sitemirror_core::crawl::{MirrorOptions, execute_mirror, extract_url_path};
pub use sitemirror_core::report::{ReportFormat, generate_mirror_report};
