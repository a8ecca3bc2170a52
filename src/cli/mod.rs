//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "jobsift",
    version,
    author = "neur0map",
    about = "Hide job listings below your spend and proposal thresholds",
    long_about = "Jobsift classifies job-list items by client spend and proposal count, hides the ones \
                  that fail your thresholds, and keeps the list consistent as the page re-renders. \
                  The commands below run the engine against saved pages."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/jobsift/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one filtering pass over a saved page and report what was hidden
    Check {
        /// Saved HTML page
        page: PathBuf,

        /// URL the page was served from
        #[arg(short, long, default_value = "https://www.upwork.com/nx/find-work/")]
        url: String,

        /// Stored settings JSON file (defaults apply when absent)
        #[arg(short, long)]
        settings: Option<PathBuf>,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Deliver one inbound message to an engine running on a saved page
    Send {
        /// Saved HTML page
        page: PathBuf,

        /// Message JSON, e.g. '{"type":"GET_STATUS"}'
        message: String,

        /// URL the page was served from
        #[arg(short, long, default_value = "https://www.upwork.com/nx/find-work/")]
        url: String,

        /// Stored settings JSON file (defaults apply when absent)
        #[arg(short, long)]
        settings: Option<PathBuf>,
    },

    /// Run a text parser on a fragment
    Parse {
        #[command(subcommand)]
        target: ParseTarget,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ParseTarget {
    /// Client spend text, e.g. "$10k+ spent"
    Spend { text: String },

    /// Proposal count text, e.g. "20 to 50"
    Proposals { text: String },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_check_args() {
        let cli = Cli::try_parse_from(["jobsift", "check", "page.html", "--json"]).unwrap();
        match cli.command {
            Commands::Check { page, url, json, .. } => {
                assert_eq!(page, PathBuf::from("page.html"));
                assert_eq!(url, "https://www.upwork.com/nx/find-work/");
                assert!(json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
