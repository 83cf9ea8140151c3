//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

use crate::core::BuildMode;

/// Vapid: a content management system for websites
#[derive(Parser, Debug, Clone)]
#[command(name = "vapid", version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Framework root (dashboard assets and node_modules).
    ///
    /// Defaults to $VAPID_ROOT, then to `.vapid/` inside the site.
    #[arg(long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub framework: Option<PathBuf>,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create a new site
    #[command(visible_alias = "n")]
    New {
        /// Directory to create (must not exist)
        #[arg(value_hint = clap::ValueHint::DirPath)]
        target: PathBuf,
    },

    /// Build assets and start the local server
    #[command(visible_alias = "s")]
    Server {
        /// Site directory
        #[arg(default_value = ".", value_hint = clap::ValueHint::DirPath)]
        target: PathBuf,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Build site assets once
    #[command(visible_alias = "b")]
    Build {
        /// Site directory
        #[arg(default_value = ".", value_hint = clap::ValueHint::DirPath)]
        target: PathBuf,

        /// Requested build mode (default: $VAPID_ENV / $NODE_ENV)
        #[arg(short, long, value_enum)]
        mode: Option<BuildMode>,
    },

    /// Deploy the site using the `deploy` script in package.json
    #[command(visible_alias = "d")]
    Deploy {
        /// Site directory
        #[arg(default_value = ".", value_hint = clap::ValueHint::DirPath)]
        target: PathBuf,
    },

    /// Show the version number
    Version,
}
