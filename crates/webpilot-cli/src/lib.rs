//! webpilot CLI library
//!
//! Runs the fixture server outside a test binary and seeds profile
//! directories for manual runs of the application under test.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

mod commands;
mod config;
mod error;
pub mod handlers;
mod output;

pub use commands::{
    Cli, ColorArg, Commands, InstallWebappArgs, MockBrowserArgs, SeedArgs, ServeArgs,
};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
