//! webpilot CLI
//!
//! ## Usage
//!
//! ```bash
//! webpilot serve --map-host www.test.com         # Fixture server in the foreground
//! webpilot seed-bookmarks marks.json -d ./data   # Populate a bookmarks database
//! webpilot seed-history visits.json -d ./data    # Populate a history database
//! webpilot install-webapp manifest.json -f ./apps
//! ```

use clap::Parser;
use std::process::ExitCode;
use webpilot::telemetry::{init_stderr_tracing, LogFormat};
use webpilot_cli::{handlers, Cli, CliConfig, CliResult, ColorChoice, Commands, Verbosity};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    config.color.apply();
    init_stderr_tracing(LogFormat::from_env(), config.verbosity.log_filter());

    match cli.command {
        Commands::Serve(args) => handlers::run_serve(&config, &args),
        Commands::SeedBookmarks(args) => handlers::run_seed_bookmarks(&config, &args).map(drop),
        Commands::SeedHistory(args) => handlers::run_seed_history(&config, &args).map(drop),
        Commands::InstallWebapp(args) => handlers::run_install_webapp(&config, &args).map(drop),
        Commands::MockBrowser(args) => handlers::run_mock_browser(&args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let color: ColorChoice = cli.color.clone().into();
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(color)
}
