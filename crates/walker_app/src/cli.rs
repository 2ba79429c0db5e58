//! Command-line interface of the `walker` binary.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

/// Resumable walk over the CID-10 category table.
#[derive(Debug, Parser)]
#[command(name = "walker")]
#[command(about = "Resumable traversal of a paginated category table and its detail views")]
#[command(version)]
pub(crate) struct Cli {
    /// RON settings file; flags given here take precedence over it
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Page holding the category table
    #[arg(long)]
    pub start_url: Option<String>,

    /// Output CSV, appended to across runs
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Checkpoint file, rewritten after every row
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,

    /// WebDriver endpoint (chromedriver)
    #[arg(long, env = "WEBDRIVER_URL")]
    pub webdriver: Option<String>,

    /// Rows per page to select before walking
    #[arg(long)]
    pub page_size: Option<String>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Where log lines go
    #[arg(long, value_enum, default_value_t = LogTarget::Terminal)]
    pub log: LogTarget,

    /// -v for debug, -vv for trace
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogTarget {
    Terminal,
    File,
    Both,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_parse() {
        let cli = Cli::try_parse_from([
            "walker",
            "--output",
            "out/cid10.csv",
            "--page-size",
            "50",
            "--headed",
            "--log",
            "both",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.output, Some(PathBuf::from("out/cid10.csv")));
        assert_eq!(cli.page_size.as_deref(), Some("50"));
        assert!(cli.headed);
        assert_eq!(cli.log, LogTarget::Both);
        assert_eq!(cli.verbose, 2);
        assert!(cli.config.is_none());
    }

    #[test]
    fn unknown_log_target_is_rejected() {
        assert!(Cli::try_parse_from(["walker", "--log", "syslog"]).is_err());
    }
}
