//! CLI argument definitions using clap derive macros.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Rewrites a bare-URL invocation into the `fetch` subcommand, so
/// `firmgrab <URL>` works without naming the subcommand explicitly.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut argv: Vec<OsString> = args.into_iter().map(Into::into).collect();
    let bare_url = argv
        .get(1)
        .and_then(|arg| arg.to_str())
        .is_some_and(|arg| arg.starts_with("http://") || arg.starts_with("https://"));
    if bare_url {
        argv.insert(1, OsString::from("fetch"));
    }
    argv
}

/// Locate and retrieve vendor firmware images from product-support pages.
///
/// Firmgrab drives a headless browser through per-vendor heuristics to
/// find a firmware download on a support page, persists it, and prints a
/// JSON result record.
#[derive(Parser, Debug)]
#[command(name = "firmgrab")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve a support-page URL and download the firmware it publishes
    Fetch {
        /// Target support-page URL (tp-link.com or netgear.com)
        url: String,

        /// Directory receiving downloaded firmware
        #[arg(short, long, default_value = "firmware_downloads")]
        output_dir: PathBuf,

        /// Run the browser with a visible window (debugging)
        #[arg(long)]
        headful: bool,

        /// Explicit Chrome/Chromium executable to launch
        #[arg(long)]
        chrome: Option<PathBuf>,
    },

    /// Scan a local firmware image for known crypto signatures
    Analyze {
        /// Firmware file to scan
        file: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_fetch_parses_url_and_defaults() {
        let args = Args::try_parse_from(["firmgrab", "fetch", "https://tp-link.com/x"]).unwrap();
        match args.command {
            Command::Fetch {
                url,
                output_dir,
                headful,
                chrome,
            } => {
                assert_eq!(url, "https://tp-link.com/x");
                assert_eq!(output_dir, PathBuf::from("firmware_downloads"));
                assert!(!headful);
                assert!(chrome.is_none());
            }
            Command::Analyze { .. } => panic!("expected fetch"),
        }
    }

    #[test]
    fn test_cli_fetch_output_dir_flag() {
        let args = Args::try_parse_from([
            "firmgrab", "fetch", "https://x.com", "-o", "/tmp/fw",
        ])
        .unwrap();
        match args.command {
            Command::Fetch { output_dir, .. } => assert_eq!(output_dir, PathBuf::from("/tmp/fw")),
            Command::Analyze { .. } => panic!("expected fetch"),
        }
    }

    #[test]
    fn test_cli_analyze_parses_file() {
        let args = Args::try_parse_from(["firmgrab", "analyze", "image.bin"]).unwrap();
        match args.command {
            Command::Analyze { file } => assert_eq!(file, PathBuf::from("image.bin")),
            Command::Fetch { .. } => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args =
            Args::try_parse_from(["firmgrab", "fetch", "https://x.com", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_missing_subcommand_rejected() {
        let result = Args::try_parse_from(normalize_args(["firmgrab"]));
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_bare_url_defaults_to_fetch() {
        let argv = normalize_args(["firmgrab", "https://tp-link.com/x", "-o", "/tmp/fw"]);
        let args = Args::try_parse_from(argv).unwrap();
        match args.command {
            Command::Fetch { url, output_dir, .. } => {
                assert_eq!(url, "https://tp-link.com/x");
                assert_eq!(output_dir, PathBuf::from("/tmp/fw"));
            }
            Command::Analyze { .. } => panic!("expected fetch"),
        }
    }

    #[test]
    fn test_normalize_args_leaves_subcommands_alone() {
        let argv = normalize_args(["firmgrab", "analyze", "image.bin"]);
        assert_eq!(argv[1], OsString::from("analyze"));

        let argv = normalize_args(["firmgrab", "--help"]);
        assert_eq!(argv.len(), 2);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let result = Args::try_parse_from(["firmgrab", "--help"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
