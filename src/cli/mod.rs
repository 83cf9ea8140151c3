//! Command-line interface module.

mod args;
pub mod build;
pub mod deploy;
pub mod new;
pub mod server;

pub use args::{Cli, Commands};
