use commands::command_argument_builder;
use sitemirror::handlers::handle_mirror;
use sitemirror_core::print_banner;

mod commands;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let matches = cmd.get_matches();
    let quiet = matches.get_flag("quiet");
    let json = matches
        .get_one::<String>("format")
        .is_some_and(|f| f == "json");

    // Keep stdout clean for machine-readable output
    if !quiet && !json {
        print_banner();
    }

    handle_mirror(&matches).await;
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
