//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use bundler_core::{DEFAULT_CONCURRENCY, DEFAULT_MAX_ATTEMPTS};

/// Bundle remote resources into a single zip archive.
///
/// Bundler reads an archive request (a named tree of files and folders,
/// each file backed by a URL), fetches all files concurrently, and writes
/// a zip whose layout mirrors the requested hierarchy. Files that cannot
/// be fetched are skipped and counted, never fatal.
#[derive(Parser, Debug)]
#[command(name = "bundler")]
#[command(author, version, about)]
pub struct Args {
    /// Request JSON file to read, or URLs in --flat mode; stdin is used
    /// when no inputs are given
    pub inputs: Vec<String>,

    /// Treat inputs as a flat list of URLs instead of a request JSON
    #[arg(short = 'f', long)]
    pub flat: bool,

    /// Archive base name used in --flat mode (the output is {name}.zip)
    #[arg(short = 'n', long, default_value = "bundle")]
    pub name: String,

    /// Directory to write the archive into
    #[arg(short = 'o', long, default_value = ".")]
    pub output: PathBuf,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Maximum concurrent fetches (1-100)
    #[arg(short = 'c', long, default_value_t = DEFAULT_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: u8,

    /// Maximum fetch attempts per file including the first (1-10)
    #[arg(short = 'r', long, default_value_t = DEFAULT_MAX_ATTEMPTS as u8, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub max_attempts: u8,

    /// Per-request timeout in seconds (1-3600)
    #[arg(short = 't', long, default_value_t = 300, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = Args::try_parse_from(["bundler"]).unwrap();
        assert!(args.inputs.is_empty());
        assert!(!args.flat);
        assert_eq!(args.name, "bundle");
        assert_eq!(args.output, PathBuf::from("."));
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert_eq!(args.concurrency, 10); // DEFAULT_CONCURRENCY
        assert_eq!(args.max_attempts, 3); // DEFAULT_MAX_ATTEMPTS
        assert_eq!(args.timeout_secs, 300);
    }

    #[test]
    fn test_cli_positional_inputs_collected() {
        let args =
            Args::try_parse_from(["bundler", "--flat", "http://x/a.txt", "http://x/b.txt"])
                .unwrap();
        assert!(args.flat);
        assert_eq!(args.inputs, ["http://x/a.txt", "http://x/b.txt"]);
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["bundler", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_name_flag() {
        let args = Args::try_parse_from(["bundler", "-n", "reports"]).unwrap();
        assert_eq!(args.name, "reports");
    }

    #[test]
    fn test_cli_output_flag() {
        let args = Args::try_parse_from(["bundler", "-o", "/tmp/out"]).unwrap();
        assert_eq!(args.output, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_cli_concurrency_bounds() {
        assert_eq!(
            Args::try_parse_from(["bundler", "-c", "1"]).unwrap().concurrency,
            1
        );
        assert_eq!(
            Args::try_parse_from(["bundler", "-c", "100"])
                .unwrap()
                .concurrency,
            100
        );

        let result = Args::try_parse_from(["bundler", "-c", "0"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ValueValidation
        );
        let result = Args::try_parse_from(["bundler", "-c", "101"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ValueValidation
        );
    }

    #[test]
    fn test_cli_max_attempts_zero_rejected() {
        let result = Args::try_parse_from(["bundler", "-r", "0"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ValueValidation
        );
    }

    #[test]
    fn test_cli_timeout_bounds() {
        assert_eq!(
            Args::try_parse_from(["bundler", "-t", "30"])
                .unwrap()
                .timeout_secs,
            30
        );
        let result = Args::try_parse_from(["bundler", "-t", "0"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ValueValidation
        );
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let result = Args::try_parse_from(["bundler", "--help"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::DisplayHelp
        );
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let result = Args::try_parse_from(["bundler", "--version"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::DisplayVersion
        );
    }
}
