//! Vapid - build and serve sites with a dashboard.

mod bundler;
mod cli;
mod config;
mod core;
mod embed;
mod logger;
mod pipeline;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::SiteConfig;

fn main() {
    if let Err(e) = run() {
        log!("error"; "{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let framework = cli.framework.as_deref();
    match &cli.command {
        Commands::Version => {
            logger::extra(&[format!("Vapid {}", env!("CARGO_PKG_VERSION"))]);
            Ok(())
        }
        Commands::New { target } => cli::new::new_site(target),
        Commands::Server { target, port } => {
            let mut config = SiteConfig::load(target, false, framework)?;
            if let Some(port) = port {
                config.port = *port;
            }
            cli::server::serve_site(&config)
        }
        Commands::Build { target, mode } => {
            let config = SiteConfig::load(target, false, framework)?;
            let mode = mode.unwrap_or(config.requested_mode);
            cli::build::build_assets(&config, mode, false).map(|_| ())
        }
        Commands::Deploy { target } => {
            let config = SiteConfig::load(target, true, framework)?;
            cli::deploy::deploy_site(&config)
        }
    }
}
