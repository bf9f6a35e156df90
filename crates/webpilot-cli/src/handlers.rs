//! Subcommand implementations

use crate::commands::{InstallWebappArgs, MockBrowserArgs, SeedArgs, ServeArgs};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use webpilot::mock::{Endpoint, MockBrowser};
use webpilot::profile::{
    self, Bookmark, HistoryEntry, WebappInstall, WebappManifest, APP_DIR, BOOKMARKS_DB,
    HISTORY_DB, HOST_MAPPING_RULES_ENV, WEBAPP_PROPERTIES,
};
use webpilot::{DeviceClass, FixtureConfig, FixtureServer};

// =============================================================================
// SERVE
// =============================================================================

/// Split `TERM=first,second` into the term and its suggestions
pub fn parse_suggestion(spec: &str) -> CliResult<(String, Vec<String>)> {
    let (term, list) = spec
        .split_once('=')
        .filter(|(term, _)| !term.is_empty())
        .ok_or_else(|| CliError::invalid_argument(format!("--suggest {spec}: expected TERM=a,b")))?;
    let suggestions = list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    Ok((term.to_string(), suggestions))
}

/// Fixture configuration named by `serve` arguments
pub fn fixture_config(args: &ServeArgs) -> CliResult<FixtureConfig> {
    let mut config = FixtureConfig::default().with_addr(args.addr);
    if let Some(color) = &args.manifest_color {
        config = config.with_manifest_color(color.clone());
    }
    for spec in &args.suggestions {
        let (term, suggestions) = parse_suggestion(spec)?;
        config = config.with_suggestions(term, suggestions);
    }
    Ok(config)
}

/// Run the fixture server until killed, or for `--for` seconds
pub fn run_serve(config: &CliConfig, args: &ServeArgs) -> CliResult<()> {
    let server = FixtureServer::start_with(fixture_config(args)?)?;
    let quiet = config.verbosity.is_quiet();
    output::status(quiet, "Serving", "fixture pages");

    println!("{}", server.base_url());
    if !args.map_hosts.is_empty() {
        let rules: Vec<String> = args
            .map_hosts
            .iter()
            .map(|host| server.host_mapping_rule(host))
            .collect();
        println!("{HOST_MAPPING_RULES_ENV}={}", rules.join(","));
    }

    match args.duration_secs {
        Some(secs) => {
            std::thread::sleep(Duration::from_secs(secs));
            server.shutdown();
            output::status(quiet, "Stopped", "fixture server");
        }
        None => loop {
            std::thread::park();
        },
    }
    Ok(())
}

// =============================================================================
// PROFILE SEEDING
// =============================================================================

fn read_json<T: DeserializeOwned>(path: &Path) -> CliResult<T> {
    let contents = fs::read_to_string(path).map_err(|e| CliError::input_file(path, e))?;
    serde_json::from_str(&contents).map_err(|e| CliError::input_file(path, e))
}

fn warn_if_empty(count: usize, path: &Path) {
    if count == 0 {
        output::warning(format!("{} holds no entries", path.display()));
    }
}

fn data_location(data_home: &Path) -> CliResult<PathBuf> {
    let dir = data_home.join(APP_DIR);
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Seed bookmarks; returns the database path
pub fn run_seed_bookmarks(config: &CliConfig, args: &SeedArgs) -> CliResult<PathBuf> {
    let bookmarks: Vec<Bookmark> = read_json(&args.file)?;
    let db = data_location(&args.data_home)?.join(BOOKMARKS_DB);
    let count = profile::seed_bookmarks(&db, &bookmarks)?;
    warn_if_empty(count, &args.file);
    output::status(
        config.verbosity.is_quiet(),
        "Seeded",
        format!("{count} bookmarks into {}", db.display()),
    );
    Ok(db)
}

/// Seed history; returns the database path
pub fn run_seed_history(config: &CliConfig, args: &SeedArgs) -> CliResult<PathBuf> {
    let entries: Vec<HistoryEntry> = read_json(&args.file)?;
    let db = data_location(&args.data_home)?.join(HISTORY_DB);
    let count = profile::seed_history(&db, &entries)?;
    warn_if_empty(count, &args.file);
    output::status(
        config.verbosity.is_quiet(),
        "Seeded",
        format!("{count} history entries into {}", db.display()),
    );
    Ok(db)
}

/// Install a web app; returns the written manifest path
pub fn run_install_webapp(config: &CliConfig, args: &InstallWebappArgs) -> CliResult<PathBuf> {
    let manifest = WebappManifest::load(&args.manifest)?;
    let mut install = WebappInstall::new(manifest);
    for script in &args.scripts {
        let name = script
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                CliError::invalid_argument(format!("--script {}: not a file", script.display()))
            })?;
        install = install.user_script(name, fs::read_to_string(script)?);
    }
    let path = if args.model {
        install.write_to(&args.folder, WEBAPP_PROPERTIES)?
    } else {
        profile::install_webapp(&args.folder, &install)?
    };
    output::status(config.verbosity.is_quiet(), "Installed", path.display());
    println!("{}", path.display());
    Ok(path)
}

// =============================================================================
// SIMULATED APPLICATION
// =============================================================================

/// Run the simulated browser until the process is killed. The endpoint
/// address comes from `WEBPILOT_TESTABILITY_ADDR`, as set by the launcher.
pub fn run_mock_browser(args: &MockBrowserArgs) -> CliResult<()> {
    let device = DeviceClass::parse(&args.device).ok_or_else(|| {
        CliError::invalid_argument(format!(
            "--device {}: expected desktop, phone or tablet",
            args.device
        ))
    })?;
    let builder = if args.container {
        MockBrowser::container()
    } else {
        MockBrowser::browser()
    };
    let process = builder
        .device_class(device)
        .args(args.app_args.iter().cloned())
        .envs(std::env::vars())
        .current_dir(std::env::current_dir()?)
        .start()?;
    let endpoint = Endpoint::bind_from_env(Arc::clone(process.app()))?;
    tracing::info!(addr = %endpoint.local_addr(), kind = ?process.kind(), "simulated application ready");
    endpoint.join();
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use webpilot::profile::{BookmarkStore, HistoryStore};

    fn quiet() -> CliConfig {
        CliConfig::new().with_verbosity(crate::config::Verbosity::Quiet)
    }

    mod suggestion_tests {
        use super::*;

        #[test]
        fn test_parse_suggestion() {
            let (term, list) = parse_suggestion("ubuntu=ubuntu, ubuntu touch,").unwrap();
            assert_eq!(term, "ubuntu");
            assert_eq!(list, vec!["ubuntu", "ubuntu touch"]);
        }

        #[test]
        fn test_parse_suggestion_rejects_missing_term() {
            assert!(matches!(
                parse_suggestion("no-equals"),
                Err(CliError::InvalidArgument { .. })
            ));
            assert!(parse_suggestion("=a,b").is_err());
        }
    }

    mod seed_tests {
        use super::*;

        #[test]
        fn test_seed_bookmarks_from_json() {
            let dir = TempDir::new().unwrap();
            let file = dir.path().join("bookmarks.json");
            fs::write(
                &file,
                r#"[{"url":"http://example.org/","title":"Example"},
                   {"url":"http://example.org/u","title":"U","folder":"Actinide"}]"#,
            )
            .unwrap();
            let args = SeedArgs {
                file,
                data_home: dir.path().join("data"),
            };
            let db = run_seed_bookmarks(&quiet(), &args).unwrap();
            assert!(db.ends_with(Path::new(APP_DIR).join(BOOKMARKS_DB)));

            let store = BookmarkStore::open(&db).unwrap();
            assert_eq!(store.list().unwrap().len(), 2);
            assert!(store.folders().unwrap().contains(&"Actinide".to_string()));
        }

        #[test]
        fn test_seed_history_from_json() {
            let dir = TempDir::new().unwrap();
            let file = dir.path().join("history.json");
            fs::write(&file, r#"[{"url":"http://example.org/a","title":"A","visits":3}]"#).unwrap();
            let args = SeedArgs {
                file,
                data_home: dir.path().to_path_buf(),
            };
            let db = run_seed_history(&quiet(), &args).unwrap();
            let entries = HistoryStore::open(&db).unwrap().list().unwrap();
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].visits, 3);
        }

        #[test]
        fn test_seed_rejects_malformed_json() {
            let dir = TempDir::new().unwrap();
            let file = dir.path().join("broken.json");
            fs::write(&file, "{]").unwrap();
            let args = SeedArgs {
                file,
                data_home: dir.path().to_path_buf(),
            };
            assert!(matches!(
                run_seed_history(&quiet(), &args),
                Err(CliError::InputFile { .. })
            ));
        }
    }

    mod webapp_tests {
        use super::*;

        fn manifest_file(dir: &Path) -> PathBuf {
            let path = dir.join("manifest.json");
            fs::write(
                &path,
                r#"{"name":"fixture","homepage":"http://www.test.com/","includes":["http://www.test.com:*/*"]}"#,
            )
            .unwrap();
            path
        }

        #[test]
        fn test_install_webapp_with_script() {
            let dir = TempDir::new().unwrap();
            let script = dir.path().join("hello.js");
            fs::write(&script, "console.log('hi');").unwrap();
            let args = InstallWebappArgs {
                manifest: manifest_file(dir.path()),
                folder: dir.path().join("webapps"),
                scripts: vec![script],
                model: false,
            };
            let path = run_install_webapp(&quiet(), &args).unwrap();
            assert!(path.starts_with(dir.path().join("webapps").join("unity-webapps-fixture")));
            let installed = WebappManifest::load(&path).unwrap();
            assert_eq!(installed.scripts, vec!["hello.js"]);
            assert!(path.with_file_name("hello.js").is_file());
        }

        #[test]
        fn test_install_webapp_model() {
            let dir = TempDir::new().unwrap();
            let args = InstallWebappArgs {
                manifest: manifest_file(dir.path()),
                folder: dir.path().join("model"),
                scripts: Vec::new(),
                model: true,
            };
            let path = run_install_webapp(&quiet(), &args).unwrap();
            assert_eq!(path, dir.path().join("model").join(WEBAPP_PROPERTIES));
        }
    }

    #[test]
    fn test_mock_browser_rejects_unknown_device() {
        let args = MockBrowserArgs {
            container: false,
            device: "watch".into(),
            app_args: Vec::new(),
        };
        assert!(matches!(
            run_mock_browser(&args),
            Err(CliError::InvalidArgument { .. })
        ));
    }
}
