//! Scoped scenario setup and teardown.
//!
//! A [`Scenario`] owns everything one test needs: a temporary profile, an
//! optional fixture server, and the application session. Setup runs in
//! that order; teardown runs in reverse when the scenario is dropped, so a
//! failed assertion still kills the application, stops the server and
//! removes the profile.
//!
//! ```no_run
//! use webpilot::scenario::ScenarioBuilder;
//!
//! let scenario = ScenarioBuilder::browser()
//!     .with_fixture_server()
//!     .open_fixture("/loremipsum")
//!     .build()?;
//! let browser = scenario.browser()?;
//! browser.wait_until_page_loaded(&scenario.fixture_url("/loremipsum")?)?;
//! # Ok::<(), webpilot::PilotError>(())
//! ```

use crate::config::PilotConfig;
use crate::emulators::{Browser, WebappContainer};
use crate::fixture_server::{FixtureConfig, FixtureServer};
use crate::mock::{MockBrowser, MockProcess};
use crate::profile::{
    Bookmark, HistoryEntry, TemporaryProfile, WebappInstall, HOST_MAPPING_RULES_ENV,
};
use crate::query::Query;
use crate::result::{PilotError, PilotResult};
use crate::session::{DeviceClass, Launcher, Session};
use std::fmt;
use std::path::PathBuf;

/// What a scenario launches
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Application {
    /// Simulated browser
    MockBrowser,
    /// Simulated web app container
    MockContainer,
    /// A real executable speaking the wire protocol
    Executable(PathBuf),
}

/// Positional argument that is resolved against the fixture server
#[derive(Debug, Clone, PartialEq, Eq)]
enum Arg {
    Plain(String),
    Fixture(String),
}

/// Assembles a [`Scenario`]
#[derive(Debug, Clone)]
pub struct ScenarioBuilder {
    application: Application,
    args: Vec<Arg>,
    env: Vec<(String, String)>,
    config: PilotConfig,
    device_class: DeviceClass,
    fixture: Option<FixtureConfig>,
    mapped_hosts: Vec<String>,
    bookmarks: Vec<Bookmark>,
    history: Vec<HistoryEntry>,
    homepage: Option<String>,
    webapps: Vec<WebappInstall>,
    webapp_model: Option<WebappInstall>,
    url_patterns: Option<Option<Vec<String>>>,
}

impl ScenarioBuilder {
    fn new(application: Application) -> Self {
        Self {
            application,
            args: Vec::new(),
            env: Vec::new(),
            config: PilotConfig::from_env(),
            device_class: DeviceClass::default(),
            fixture: None,
            mapped_hosts: Vec::new(),
            bookmarks: Vec::new(),
            history: Vec::new(),
            homepage: None,
            webapps: Vec::new(),
            webapp_model: None,
            url_patterns: None,
        }
    }

    /// Scenario against the simulated browser
    #[must_use]
    pub fn browser() -> Self {
        Self::new(Application::MockBrowser)
    }

    /// Scenario against the simulated web app container
    #[must_use]
    pub fn container() -> Self {
        Self::new(Application::MockContainer)
    }

    /// Scenario against a real executable
    #[must_use]
    pub fn executable(path: impl Into<PathBuf>) -> Self {
        Self::new(Application::Executable(path.into()))
    }

    /// Append an argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(Arg::Plain(arg.into()));
        self
    }

    /// Append arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args
            .extend(args.into_iter().map(|a| Arg::Plain(a.into())));
        self
    }

    /// Append the fixture server URL of `path` as an argument
    #[must_use]
    pub fn open_fixture(mut self, path: impl Into<String>) -> Self {
        self.args.push(Arg::Fixture(path.into()));
        self
    }

    /// Set an environment variable for the application
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Configuration for the session
    #[must_use]
    pub fn with_config(mut self, config: PilotConfig) -> Self {
        self.config = config;
        self
    }

    /// Device class of the session
    #[must_use]
    pub const fn with_device_class(mut self, device_class: DeviceClass) -> Self {
        self.device_class = device_class;
        self
    }

    /// Start a fixture server with the default configuration
    #[must_use]
    pub fn with_fixture_server(self) -> Self {
        self.with_fixture_config(FixtureConfig::default())
    }

    /// Start a fixture server with `config`
    #[must_use]
    pub fn with_fixture_config(mut self, config: FixtureConfig) -> Self {
        self.fixture = Some(config);
        self
    }

    /// Route `host` (e.g. `*.test.com`) to the fixture server
    #[must_use]
    pub fn map_host(mut self, host: impl Into<String>) -> Self {
        self.mapped_hosts.push(host.into());
        self
    }

    /// Seed bookmarks
    #[must_use]
    pub fn bookmarks(mut self, bookmarks: impl IntoIterator<Item = Bookmark>) -> Self {
        self.bookmarks.extend(bookmarks);
        self
    }

    /// Seed history
    #[must_use]
    pub fn history(mut self, entries: impl IntoIterator<Item = HistoryEntry>) -> Self {
        self.history.extend(entries);
        self
    }

    /// Seed the homepage setting
    #[must_use]
    pub fn homepage(mut self, url: impl Into<String>) -> Self {
        self.homepage = Some(url.into());
        self
    }

    /// Install a web app into the profile's install folder
    #[must_use]
    pub fn install_webapp(mut self, install: WebappInstall) -> Self {
        self.webapps.push(install);
        self
    }

    /// Write a model directory and pass `--webappModelSearchPath`
    #[must_use]
    pub fn webapp_model(mut self, install: WebappInstall) -> Self {
        self.webapp_model = Some(install);
        self
    }

    /// Pre-seed the generated URL pattern file; `None` writes an invalid one
    #[must_use]
    pub fn url_patterns(mut self, patterns: Option<Vec<String>>) -> Self {
        self.url_patterns = Some(patterns);
        self
    }

    fn seed(&self, profile: &TemporaryProfile) -> PilotResult<Vec<String>> {
        let mut extra_args = Vec::new();
        if !self.bookmarks.is_empty() {
            profile.populate_bookmarks(&self.bookmarks)?;
        }
        if !self.history.is_empty() {
            profile.populate_history(&self.history)?;
        }
        if let Some(homepage) = &self.homepage {
            profile.set_homepage(homepage)?;
        }
        for install in &self.webapps {
            profile.install_webapp(install)?;
        }
        if let Some(model) = &self.webapp_model {
            let dir = profile.write_webapp_model(model)?;
            extra_args.push(format!("--webappModelSearchPath={}", dir.display()));
        }
        if let Some(patterns) = &self.url_patterns {
            let borrowed: Option<Vec<&str>> = patterns
                .as_ref()
                .map(|p| p.iter().map(String::as_str).collect());
            profile.write_url_patterns(borrowed.as_deref())?;
        }
        Ok(extra_args)
    }

    fn resolve_args(&self, server: Option<&FixtureServer>) -> PilotResult<Vec<String>> {
        self.args
            .iter()
            .map(|arg| match (arg, server) {
                (Arg::Plain(a), _) => Ok(a.clone()),
                (Arg::Fixture(path), Some(server)) => Ok(server.url(path)),
                (Arg::Fixture(path), None) => Err(PilotError::fixture(format!(
                    "{path} needs a fixture server; call with_fixture_server()"
                ))),
            })
            .collect()
    }

    /// Run setup: profile, fixture server, then the application.
    ///
    /// # Errors
    ///
    /// Any setup failure. Whatever was already set up is torn down before
    /// the error is returned.
    pub fn build(self) -> PilotResult<Scenario> {
        let profile = TemporaryProfile::new()?;
        let mut args = self.seed(&profile)?;

        let server = self.fixture.clone().map(FixtureServer::start_with).transpose()?;
        args.extend(self.resolve_args(server.as_ref())?);

        let mut env = profile.env();
        if let Some(server) = &server {
            let rules: Vec<String> = self
                .mapped_hosts
                .iter()
                .map(|host| server.host_mapping_rule(host))
                .collect();
            if !rules.is_empty() {
                env.push((HOST_MAPPING_RULES_ENV.to_string(), rules.join(",")));
            }
        } else if !self.mapped_hosts.is_empty() {
            return Err(PilotError::fixture("host mapping needs a fixture server"));
        }
        env.extend(self.env.iter().cloned());

        let (session, process) = match &self.application {
            Application::MockBrowser | Application::MockContainer => {
                let builder = if self.application == Application::MockBrowser {
                    MockBrowser::browser()
                } else {
                    MockBrowser::container()
                };
                let process = builder
                    .args(args)
                    .envs(env)
                    .device_class(self.device_class)
                    .current_dir(profile.root())
                    .start()?;
                (process.attach(self.config.clone()), Some(process))
            }
            Application::Executable(path) => {
                let session = Launcher::new(path)
                    .args(args)
                    .envs(env)
                    .with_config(self.config.clone())
                    .with_device_class(self.device_class)
                    .launch()?;
                (session, None)
            }
        };
        tracing::info!(application = ?self.application, session = %session.id(), "scenario ready");
        Ok(Scenario {
            session,
            process,
            server,
            profile,
        })
    }
}

/// One running scenario. Dropping it tears everything down in reverse
/// setup order.
pub struct Scenario {
    session: Session,
    process: Option<MockProcess>,
    server: Option<FixtureServer>,
    profile: TemporaryProfile,
}

impl fmt::Debug for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("session", &self.session)
            .field("server", &self.server.as_ref().map(FixtureServer::addr))
            .field("profile", &self.profile.root())
            .finish_non_exhaustive()
    }
}

impl Scenario {
    /// The application session
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// The application session, mutably (for `terminate`)
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// The temporary profile
    #[must_use]
    pub const fn profile(&self) -> &TemporaryProfile {
        &self.profile
    }

    /// The fixture server, if one was requested
    #[must_use]
    pub const fn server(&self) -> Option<&FixtureServer> {
        self.server.as_ref()
    }

    /// The simulated application, if one was launched
    #[must_use]
    pub const fn process(&self) -> Option<&MockProcess> {
        self.process.as_ref()
    }

    /// Absolute fixture URL of `path`
    pub fn fixture_url(&self, path: &str) -> PilotResult<String> {
        self.server
            .as_ref()
            .map(|s| s.url(path))
            .ok_or_else(|| PilotError::fixture("scenario has no fixture server"))
    }

    /// The browser main window
    pub fn browser(&self) -> PilotResult<Browser> {
        self.session.wait_select_single_as(Query::any())
    }

    /// The web app container window
    pub fn container(&self) -> PilotResult<WebappContainer> {
        self.session.wait_select_single_as(Query::any())
    }
}

impl Drop for Scenario {
    fn drop(&mut self) {
        self.session.terminate();
        drop(self.process.take());
        if let Some(server) = self.server.take() {
            server.shutdown();
        }
        tracing::debug!(profile = %self.profile.root().display(), "scenario torn down");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn quick() -> PilotConfig {
        PilotConfig::default()
            .with_timeout(2_000)
            .with_poll_interval(10)
            .with_select_retry(500)
    }

    mod build_tests {
        use super::*;

        #[test]
        fn test_fixture_arg_without_server_fails() {
            let err = ScenarioBuilder::browser()
                .open_fixture("/ping")
                .build()
                .unwrap_err();
            assert!(matches!(err, PilotError::Fixture { .. }));
        }

        #[test]
        fn test_host_mapping_without_server_fails() {
            let err = ScenarioBuilder::container()
                .map_host("*.test.com")
                .arg("http://www.test.com/")
                .build()
                .unwrap_err();
            assert!(matches!(err, PilotError::Fixture { .. }));
        }

        #[test]
        fn test_container_without_url_fails() {
            let err = ScenarioBuilder::container().build().unwrap_err();
            assert!(matches!(err, PilotError::Launch { .. }));
        }

        #[test]
        fn test_browser_loads_fixture() {
            let scenario = ScenarioBuilder::browser()
                .with_config(quick())
                .with_fixture_server()
                .open_fixture("/loremipsum")
                .build()
                .unwrap();
            let url = scenario.fixture_url("/loremipsum").unwrap();
            let browser = scenario.browser().unwrap();
            browser.wait_until_page_loaded(&url).unwrap();
            assert_eq!(browser.current_webview().unwrap().title().unwrap(), "Lorem Ipsum");
        }
    }

    mod teardown_tests {
        use super::*;

        #[test]
        fn test_drop_releases_everything() {
            let scenario = ScenarioBuilder::browser()
                .with_config(quick())
                .with_fixture_server()
                .build()
                .unwrap();
            let root = scenario.profile().root().to_path_buf();
            let addr = scenario.server().unwrap().addr();
            assert!(root.is_dir());
            drop(scenario);
            assert!(!root.exists());
            assert!(std::net::TcpStream::connect(addr).is_err());
        }

        #[test]
        fn test_failed_launch_removes_profile() {
            let err = ScenarioBuilder::executable("/nonexistent/webbrowser-app")
                .with_config(quick().with_launch_timeout(200))
                .build()
                .unwrap_err();
            assert!(matches!(err, PilotError::Launch { .. }));
        }
    }
}
