//! Embedded fixture HTTP server.
//!
//! Serves canned pages (dialogs, redirects, theme colors, downloads,
//! suggestion data) on an ephemeral loopback port so scenarios never touch
//! the network. The server runs its own tokio runtime on a background
//! thread; the test thread stays synchronous.
//!
//! ```no_run
//! use webpilot::fixture_server::FixtureServer;
//!
//! let server = FixtureServer::start()?;
//! let url = server.url("/js-confirm-dialog");
//! # Ok::<(), webpilot::PilotError>(())
//! ```

pub mod pages;
mod routes;

pub use routes::{router, FixtureState, Suggestions};

use crate::result::{PilotError, PilotResult};
use std::future::IntoFuture;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::{oneshot, Notify};
use tower_http::trace::TraceLayer;

/// How long shutdown lets in-flight requests finish
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Theme color the manifest route reports unless configured otherwise
pub const DEFAULT_MANIFEST_COLOR: &str = "#FF0000";

/// Server configuration, fixed before start
#[derive(Debug, Clone)]
pub struct FixtureConfig {
    /// Listen address; port 0 picks a free one
    pub addr: SocketAddr,
    /// `/suggest` table
    pub suggestions: Suggestions,
    /// `theme_color` in `/theme-color/manifest.json`
    pub manifest_color: String,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            suggestions: Suggestions::new(),
            manifest_color: DEFAULT_MANIFEST_COLOR.to_string(),
        }
    }
}

impl FixtureConfig {
    /// Listen on a fixed address
    #[must_use]
    pub const fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    /// Answer `/suggest?q=<term>` with `suggestions`
    #[must_use]
    pub fn with_suggestions<I, S>(mut self, term: impl Into<String>, suggestions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggestions
            .insert(term.into(), suggestions.into_iter().map(Into::into).collect());
        self
    }

    /// Manifest theme color
    #[must_use]
    pub fn with_manifest_color(mut self, color: impl Into<String>) -> Self {
        self.manifest_color = color.into();
        self
    }
}

/// A running fixture server. Dropping it shuts the server down.
#[derive(Debug)]
pub struct FixtureServer {
    addr: SocketAddr,
    state: FixtureState,
    stop: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl FixtureServer {
    /// Start with the default configuration
    pub fn start() -> PilotResult<Self> {
        Self::start_with(FixtureConfig::default())
    }

    /// Start and block until the listener is bound
    pub fn start_with(config: FixtureConfig) -> PilotResult<Self> {
        let state = FixtureState::new(config.suggestions, &config.manifest_color);
        let app = router(state.clone()).layer(TraceLayer::new_for_http());
        let (ready_tx, ready_rx) = mpsc::channel::<PilotResult<SocketAddr>>();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let bind = config.addr;

        let thread = std::thread::Builder::new()
            .name("webpilot-fixture".into())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(2)
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err.into()));
                        return;
                    }
                };
                runtime.block_on(async move {
                    let listener = match tokio::net::TcpListener::bind(bind).await {
                        Ok(listener) => listener,
                        Err(err) => {
                            let _ = ready_tx.send(Err(err.into()));
                            return;
                        }
                    };
                    match listener.local_addr() {
                        Ok(addr) => {
                            let _ = ready_tx.send(Ok(addr));
                        }
                        Err(err) => {
                            let _ = ready_tx.send(Err(err.into()));
                            return;
                        }
                    }
                    let drain = Arc::new(Notify::new());
                    let signal = Arc::clone(&drain);
                    let mut served = tokio::spawn(
                        axum::serve(listener, app)
                            .with_graceful_shutdown(async move { signal.notified().await })
                            .into_future(),
                    );
                    tokio::select! {
                        result = &mut served => match result {
                            Ok(Err(err)) => tracing::warn!(%err, "fixture server stopped with error"),
                            Err(err) => tracing::warn!(%err, "fixture server task failed"),
                            Ok(Ok(())) => {}
                        },
                        () = async {
                            let _ = stop_rx.await;
                            drain.notify_one();
                            tokio::time::sleep(SHUTDOWN_GRACE).await;
                        } => {
                            tracing::debug!("grace period over, dropping open connections");
                            served.abort();
                        }
                    }
                });
            })?;

        let addr = ready_rx
            .recv()
            .map_err(|_| PilotError::fixture("fixture server exited before binding"))??;
        tracing::info!(%addr, "fixture server listening");
        Ok(Self {
            addr,
            state,
            stop: Some(stop_tx),
            thread: Some(thread),
        })
    }

    /// Bound address
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Bound port
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.addr.port()
    }

    /// `http://127.0.0.1:<port>`
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Absolute URL of `path`
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url())
        } else {
            format!("{}/{path}", self.base_url())
        }
    }

    /// Host mapping rule sending `host` port 80 to this server, in the form
    /// the web engine reads from `UBUNTU_WEBVIEW_HOST_MAPPING_RULES`
    #[must_use]
    pub fn host_mapping_rule(&self, host: &str) -> String {
        format!("MAP {host}:80 {}", self.addr)
    }

    /// Replace the `/suggest` table. Requests already being served see
    /// either the old or the new table, never a mix.
    pub fn set_suggestions(&self, suggestions: Suggestions) {
        match self.state.suggestions.write() {
            Ok(mut table) => *table = suggestions,
            Err(poisoned) => *poisoned.into_inner() = suggestions,
        }
    }

    /// Stop serving and wait for the server thread
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("fixture server thread panicked");
            }
            tracing::debug!(addr = %self.addr, "fixture server stopped");
        }
    }
}

impl Drop for FixtureServer {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn fetch(url: &str) -> (u16, String) {
        let response = reqwest::blocking::get(url).unwrap();
        let status = response.status().as_u16();
        (status, response.text().unwrap())
    }

    mod lifecycle_tests {
        use super::*;

        #[test]
        fn test_serves_ping() {
            let server = FixtureServer::start().unwrap();
            assert_ne!(server.port(), 0);
            assert_eq!(fetch(&server.url("/ping")), (200, "pong".to_string()));
        }

        #[test]
        fn test_url_joins_paths() {
            let server = FixtureServer::start().unwrap();
            assert_eq!(server.url("ping"), server.url("/ping"));
            assert!(server.base_url().starts_with("http://127.0.0.1:"));
        }

        #[test]
        fn test_shutdown_releases_port() {
            let server = FixtureServer::start().unwrap();
            let addr = server.addr();
            server.shutdown();
            assert!(std::net::TcpStream::connect(addr).is_err());
        }

        #[test]
        fn test_shutdown_does_not_wait_for_slow_requests() {
            let server = FixtureServer::start().unwrap();
            let slow = server.url("/wait/4");
            let client = std::thread::spawn(move || {
                let _ = reqwest::blocking::get(slow);
            });
            std::thread::sleep(Duration::from_millis(200));

            let started = std::time::Instant::now();
            server.shutdown();
            assert!(started.elapsed() < Duration::from_secs(2));
            client.join().unwrap();
        }

        #[test]
        fn test_host_mapping_rule_names_port() {
            let server = FixtureServer::start().unwrap();
            assert_eq!(
                server.host_mapping_rule("*.test.com"),
                format!("MAP *.test.com:80 127.0.0.1:{}", server.port())
            );
        }
    }

    mod suggestion_tests {
        use super::*;

        #[test]
        fn test_configured_suggestions() {
            let server =
                FixtureServer::start_with(FixtureConfig::default().with_suggestions("foo", ["food"]))
                    .unwrap();
            let (status, body) = fetch(&server.url("/suggest?q=foo"));
            assert_eq!(status, 200);
            assert_eq!(body, r#"["foo",["food"]]"#);
        }

        #[test]
        fn test_replacing_table() {
            let server = FixtureServer::start().unwrap();
            assert_eq!(fetch(&server.url("/suggest?q=bar")).0, 404);
            let mut table = Suggestions::new();
            table.insert("bar".into(), vec!["barn".into()]);
            server.set_suggestions(table);
            assert_eq!(fetch(&server.url("/suggest?q=bar")).0, 200);
        }
    }

    mod isolation_tests {
        use super::*;

        #[test]
        fn test_servers_do_not_share_tables() {
            let a = FixtureServer::start_with(FixtureConfig::default().with_suggestions("x", ["xa"]))
                .unwrap();
            let b = FixtureServer::start().unwrap();
            assert_eq!(fetch(&a.url("/suggest?q=x")).0, 200);
            assert_eq!(fetch(&b.url("/suggest?q=x")).0, 404);
        }
    }
}
