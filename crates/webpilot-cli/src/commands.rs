//! CLI command definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;

/// webpilot: fixtures and profiles for browser UI tests
#[derive(Parser, Debug)]
#[command(name = "webpilot", version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the fixture HTTP server in the foreground
    Serve(ServeArgs),

    /// Seed a profile's bookmarks database from a JSON file
    SeedBookmarks(SeedArgs),

    /// Seed a profile's history database from a JSON file
    SeedHistory(SeedArgs),

    /// Install a web app manifest into an install folder
    InstallWebapp(InstallWebappArgs),

    /// Run the simulated browser behind an introspection endpoint
    #[command(hide = true)]
    MockBrowser(MockBrowserArgs),
}

/// Arguments for `serve`
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address to listen on (port 0 picks a free port)
    #[arg(short, long, default_value = "127.0.0.1:0")]
    pub addr: SocketAddr,

    /// Theme color advertised by the web app manifest
    #[arg(long)]
    pub manifest_color: Option<String>,

    /// Host to route to the server; prints a host mapping rule for each
    #[arg(long = "map-host", value_name = "HOST")]
    pub map_hosts: Vec<String>,

    /// Canned search suggestions, as TERM=first,second
    #[arg(long = "suggest", value_name = "TERM=LIST")]
    pub suggestions: Vec<String>,

    /// Stop after this many seconds instead of running until killed
    #[arg(long = "for", value_name = "SECS")]
    pub duration_secs: Option<u64>,
}

/// Arguments for `seed-bookmarks` and `seed-history`
#[derive(Args, Debug, Clone)]
pub struct SeedArgs {
    /// JSON array of entries
    pub file: PathBuf,

    /// Profile data home (`XDG_DATA_HOME` of the application)
    #[arg(short, long)]
    pub data_home: PathBuf,
}

/// Arguments for `install-webapp`
#[derive(Args, Debug, Clone)]
pub struct InstallWebappArgs {
    /// Manifest JSON (name, homepage, includes)
    pub manifest: PathBuf,

    /// Install folder
    #[arg(short, long)]
    pub folder: PathBuf,

    /// User script to install alongside the manifest
    #[arg(long = "script", value_name = "FILE")]
    pub scripts: Vec<PathBuf>,

    /// Write a bare model directory (`webapp-properties.json`) instead
    #[arg(long)]
    pub model: bool,
}

/// Arguments for the hidden `mock-browser` command
#[derive(Args, Debug, Clone)]
pub struct MockBrowserArgs {
    /// Simulate the web app container instead of the browser
    #[arg(long)]
    pub container: bool,

    /// Device class (desktop, phone, tablet)
    #[arg(long, default_value = "desktop")]
    pub device: String,

    /// Arguments passed to the simulated application, after `--`
    #[arg(last = true)]
    pub app_args: Vec<String>,
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_serve_defaults() {
        let cli = Cli::try_parse_from(["webpilot", "serve"]).unwrap();
        let Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.addr.ip().to_string(), "127.0.0.1");
        assert_eq!(args.addr.port(), 0);
        assert!(args.map_hosts.is_empty());
        assert!(args.duration_secs.is_none());
    }

    #[test]
    fn test_parse_serve_repeated_options() {
        let cli = Cli::try_parse_from([
            "webpilot",
            "serve",
            "--map-host",
            "www.test.com",
            "--map-host",
            "test.com",
            "--suggest",
            "ubuntu=ubuntu,ubuntu touch",
            "--for",
            "2",
        ])
        .unwrap();
        let Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.map_hosts, vec!["www.test.com", "test.com"]);
        assert_eq!(args.suggestions.len(), 1);
        assert_eq!(args.duration_secs, Some(2));
    }

    #[test]
    fn test_parse_seed_requires_data_home() {
        assert!(Cli::try_parse_from(["webpilot", "seed-history", "h.json"]).is_err());
        let cli =
            Cli::try_parse_from(["webpilot", "seed-history", "h.json", "-d", "/tmp/p"]).unwrap();
        assert!(matches!(cli.command, Commands::SeedHistory(_)));
    }

    #[test]
    fn test_mock_browser_keeps_app_flags() {
        let cli = Cli::try_parse_from([
            "webpilot",
            "mock-browser",
            "--container",
            "--",
            "--enable-addressbar",
            "http://localhost/",
            "-testability",
        ])
        .unwrap();
        let Commands::MockBrowser(args) = cli.command else {
            panic!("expected mock-browser");
        };
        assert!(args.container);
        assert_eq!(
            args.app_args,
            vec!["--enable-addressbar", "http://localhost/", "-testability"]
        );
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["webpilot", "-vv", "--color", "never", "serve"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.color, ColorArg::Never));
    }
}
