use crate::CLAP_STYLING;
use clap::arg;
use sitemirror::handlers::parse_seed_arg;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("sitemirror")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("sitemirror")
        .about("Mirror a website's pages, scripts, stylesheets and images to a local directory")
        .styles(CLAP_STYLING)
        .arg(
            arg!([URL])
                .required(false)
                .help("The seed URL to start mirroring from")
                .value_parser(parse_seed_arg)
                .default_value("https://example.com"),
        )
        .arg(
            arg!(-o --"output" <DIR>)
                .required(false)
                .help("Directory to write the mirror into")
                .default_value("output"),
        )
        .arg(
            arg!(-t --"threads" <NUM_WORKERS>)
                .required(false)
                .help("The number of async worker 'threads' in the worker pool.")
                .value_parser(clap::value_parser!(usize))
                .default_value("10"),
        )
        .arg(
            arg!(-m --"max-requests" <NUM>)
                .required(false)
                .help("Maximum number of requests accepted for the whole run")
                .value_parser(clap::value_parser!(usize))
                .default_value("500"),
        )
        .arg(
            arg!(--"timeout" <SECS>)
                .required(false)
                .help("Per-request timeout in seconds")
                .value_parser(clap::value_parser!(u64))
                .default_value("30"),
        )
        .arg(
            arg!(--"retries" <NUM>)
                .required(false)
                .help("Extra attempts for transport errors and 5xx responses")
                .value_parser(clap::value_parser!(usize))
                .default_value("3"),
        )
        .arg(
            arg!(--"strict-links")
                .required(false)
                .help("Only follow anchors whose path ends in .html or .htm")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(--"no-clobber")
                .required(false)
                .help("Add a suffix instead of overwriting when two URLs map to the same file")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(-f --"format" <FORMAT>)
                .required(false)
                .help("Report format: text, json")
                .value_parser(["text", "json"])
                .default_value("text"),
        )
        .arg(
            arg!(-q --"quiet" "Suppress banner and non-essential output")
                .required(false)
                .conflicts_with("verbose"),
        )
        .arg(arg!(-v --"verbose" "Enable debug logging").required(false))
        .arg(arg!(--"no-progress" "Disable the progress spinner").required(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[test]
    fn test_defaults() {
        let matches = command_argument_builder()
            .try_get_matches_from(["sitemirror"])
            .unwrap();
        assert_eq!(
            matches.get_one::<Url>("URL").unwrap().as_str(),
            "https://example.com/"
        );
        assert_eq!(matches.get_one::<String>("output").unwrap(), "output");
        assert_eq!(*matches.get_one::<usize>("threads").unwrap(), 10);
        assert_eq!(*matches.get_one::<usize>("max-requests").unwrap(), 500);
        assert_eq!(*matches.get_one::<u64>("timeout").unwrap(), 30);
        assert_eq!(*matches.get_one::<usize>("retries").unwrap(), 3);
        assert!(!matches.get_flag("strict-links"));
        assert!(!matches.get_flag("no-clobber"));
        assert_eq!(matches.get_one::<String>("format").unwrap(), "text");
    }

    #[test]
    fn test_explicit_arguments() {
        let matches = command_argument_builder()
            .try_get_matches_from([
                "sitemirror",
                "http://site.test/start.html",
                "-o",
                "mirror",
                "-t",
                "4",
                "-m",
                "20",
                "--strict-links",
                "--no-clobber",
                "-f",
                "json",
            ])
            .unwrap();
        assert_eq!(
            matches.get_one::<Url>("URL").unwrap().as_str(),
            "http://site.test/start.html"
        );
        assert_eq!(*matches.get_one::<usize>("threads").unwrap(), 4);
        assert_eq!(*matches.get_one::<usize>("max-requests").unwrap(), 20);
        assert!(matches.get_flag("strict-links"));
        assert!(matches.get_flag("no-clobber"));
        assert_eq!(matches.get_one::<String>("format").unwrap(), "json");
    }

    #[test]
    fn test_invalid_seed_is_usage_error() {
        let err = command_argument_builder()
            .try_get_matches_from(["sitemirror", "ftp://site.test/"])
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(command_argument_builder()
            .try_get_matches_from(["sitemirror", "-q", "-v"])
            .is_err());
    }
}
