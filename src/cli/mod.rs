//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "telescope",
    version,
    author = "neur0map",
    about = "Pilot intel lookups with a synchronized overlay window",
    long_about = "Telescope looks up combat intel for a list of pilot names, streams the results \
                  into a threat-sorted table and mirrors results and filters into an overlay window."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/telescope/config.toml)
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
    /// Look up pilots and print the resulting table
    Lookup {
        /// JSON file with the intel records the replay engine answers from
        #[arg(short, long, value_name = "FILE")]
        fixture: PathBuf,

        /// Read pilot names from a file, one per line
        #[arg(short = 'n', long, value_name = "FILE")]
        names_file: Option<PathBuf>,

        /// Pilot names (joined one per line)
        names: Vec<String>,

        /// Also open the overlay and report what it converged on
        #[arg(long)]
        overlay: bool,

        /// Only show pilots of this threat level
        #[arg(long, value_name = "LEVEL")]
        threat: Option<String>,

        /// Only show pilots with this tag (repeatable, any match)
        #[arg(long, value_name = "TAG")]
        tag: Vec<String>,

        /// Only show pilots of this corporation ticker
        #[arg(long, value_name = "TICKER")]
        corp: Option<String>,

        /// Only show pilots of this alliance ticker
        #[arg(long, value_name = "TICKER")]
        alliance: Option<String>,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Manage user settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
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

#[derive(Subcommand, Debug)]
pub enum SettingsAction {
    /// Show current settings
    Show,

    /// Restore default settings
    Reset,

    /// Click a column header: same column flips, a new column sorts descending
    Sort {
        /// Column key (threat, pilot, tags, corp, alliance, kd, isk, ...)
        key: String,

        /// Set the direction explicitly instead of flipping
        #[arg(short, long, value_parser = ["asc", "desc"])]
        direction: Option<String>,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
