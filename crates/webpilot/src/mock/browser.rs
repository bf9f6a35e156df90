//! Simulated browser and web app container.
//!
//! [`MockBrowser`] lays out the object tree the emulators expect on a
//! [`MockApp`] and scripts its behavior: tabs, navigation through a
//! [`PageLoader`], chrome colors, dialogs, context menus, crash recovery.
//! Launch arguments and environment follow the real executables
//! (`--chromeless`, `--webapp=<b64>`, `--enable-addressbar`, XDG paths,
//! host mapping rules), so scenario code runs unchanged against either.
//!
//! Behavior runs on the thread that dispatched the input event; page loads
//! run on background threads and are applied only if no newer navigation
//! of the same tab started in the meantime. Engine state is always locked
//! before the tree, never the other way round.

mod dialogs;
mod views;

use super::app::{Gesture, MockApp, NodeSpec};
use super::filters::UriFilters;
use super::page::{
    manifest_theme_color, HostRule, HttpPageLoader, Page, PageLink, PageLoader, PageRequest,
    PageScript,
};
use crate::config::PilotConfig;
use crate::profile::{
    find_webapp, read_setting, Bookmark, BookmarkStore, HistoryEntry, HistoryStore,
    WebappManifest, APP_DIR, BOOKMARKS_DB, CONFIG_FILE, GENERATED_URL_PATTERNS, HISTORY_DB,
    HOST_MAPPING_RULES_ENV, WEBAPPS_INSTALL_FOLDER_ENV, WEBAPP_PROPERTIES,
};
use crate::result::{PilotError, PilotResult};
use crate::session::{DeviceClass, ProcessControl, Session};
use crate::transport::NodeId;
use crate::value::{Color, Rect, Value};
use base64::Engine as _;
use regex::Regex;
use reqwest::Url;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// User agent reported when none is given on the command line
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Linux; Ubuntu 16.04) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/65.0 Safari/537.36";

/// Search used for address bar input that is not a URL
pub const SEARCH_URL: &str = "https://duckduckgo.com/";

/// Name shown for [`SEARCH_URL`] in settings
pub const SEARCH_ENGINE_NAME: &str = "DuckDuckGo";

/// A second renderer crash within this window shows the sad tab
const CRASH_WINDOW: Duration = Duration::from_secs(10);

const WINDOW: Rect = Rect::new(0, 0, 800, 600);
const CONTENT: Rect = Rect::new(0, 48, 800, 552);

/// Which executable is simulated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppKind {
    /// `webbrowser-app`
    Browser,
    /// `webapp-container`
    Container,
}

impl AppKind {
    const fn executable(self) -> &'static str {
        match self {
            Self::Browser => "webbrowser-app",
            Self::Container => "webapp-container",
        }
    }
}

// =============================================================================
// LAUNCH
// =============================================================================

#[derive(Debug, Clone, Default)]
struct LaunchOptions {
    url: Option<String>,
    chromeless: bool,
    incognito: bool,
    user_agent: Option<String>,
    suggestions_url: Option<String>,
    enable_addressbar: bool,
    enable_back_forward: bool,
    webapp: Option<String>,
    model_search_path: Option<PathBuf>,
    url_patterns: Vec<String>,
    use_local_intent_filter: bool,
}

fn decode_webapp_name(value: &str) -> String {
    base64::engine::general_purpose::STANDARD
        .decode(value)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| value.to_string())
}

impl LaunchOptions {
    fn parse(args: &[String]) -> Self {
        let mut options = Self::default();
        for arg in args {
            let (flag, value) = match arg.split_once('=') {
                Some((flag, value)) => (flag, Some(value)),
                None => (arg.as_str(), None),
            };
            match (flag, value) {
                ("--chromeless", _) => options.chromeless = true,
                ("--incognito", _) => options.incognito = true,
                ("--enable-addressbar", _) => options.enable_addressbar = true,
                ("--enable-back-forward", _) => options.enable_back_forward = true,
                ("--use-local-intent-filter", _) => options.use_local_intent_filter = true,
                ("--user-agent-string", Some(ua)) => options.user_agent = Some(ua.to_string()),
                ("--suggestions-url", Some(url)) => options.suggestions_url = Some(url.to_string()),
                ("--webapp", name) => {
                    options.webapp = Some(name.map(decode_webapp_name).unwrap_or_default());
                }
                ("--webappModelSearchPath", Some(path)) => {
                    options.model_search_path = Some(PathBuf::from(path));
                }
                ("--webappUrlPatterns", Some(patterns)) => options.url_patterns.extend(
                    patterns
                        .split(',')
                        .map(str::trim)
                        .filter(|p| !p.is_empty())
                        .map(str::to_string),
                ),
                (flag, _) if flag.starts_with('-') => {
                    tracing::debug!(%arg, "ignoring unknown argument");
                }
                _ => options.url = Some(arg.clone()),
            }
        }
        options
    }
}

/// Where the simulated application keeps its files
#[derive(Debug, Clone, Default)]
struct ProfilePaths {
    data: Option<PathBuf>,
    config: Option<PathBuf>,
    cwd: Option<PathBuf>,
}

impl ProfilePaths {
    fn bookmarks(&self) -> Option<PathBuf> {
        self.data.as_ref().map(|d| d.join(BOOKMARKS_DB))
    }

    fn history(&self) -> Option<PathBuf> {
        self.data.as_ref().map(|d| d.join(HISTORY_DB))
    }

    fn settings(&self) -> Option<PathBuf> {
        self.config.as_ref().map(|c| c.join(CONFIG_FILE))
    }

    fn url_patterns(&self) -> Option<PathBuf> {
        self.cwd.as_ref().map(|c| c.join(GENERATED_URL_PATTERNS))
    }
}

/// Builder for a simulated `webbrowser-app` or `webapp-container`
pub struct MockBrowser {
    kind: AppKind,
    args: Vec<String>,
    envs: Vec<(String, String)>,
    device_class: DeviceClass,
    loader: Option<Arc<dyn PageLoader>>,
    cwd: Option<PathBuf>,
}

impl fmt::Debug for MockBrowser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockBrowser")
            .field("kind", &self.kind)
            .field("args", &self.args)
            .field("device_class", &self.device_class)
            .finish_non_exhaustive()
    }
}

impl MockBrowser {
    fn new(kind: AppKind) -> Self {
        Self {
            kind,
            args: Vec::new(),
            envs: Vec::new(),
            device_class: DeviceClass::default(),
            loader: None,
            cwd: None,
        }
    }

    /// Simulated browser
    #[must_use]
    pub fn browser() -> Self {
        Self::new(AppKind::Browser)
    }

    /// Simulated web app container
    #[must_use]
    pub fn container() -> Self {
        Self::new(AppKind::Container)
    }

    /// Add a command-line argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add command-line arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Set environment variables
    #[must_use]
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.envs
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Form factor (wide layout and touch input)
    #[must_use]
    pub const fn device_class(mut self, device_class: DeviceClass) -> Self {
        self.device_class = device_class;
        self
    }

    /// Replace the HTTP page loader
    #[must_use]
    pub fn loader(mut self, loader: impl PageLoader + 'static) -> Self {
        self.loader = Some(Arc::new(loader));
        self
    }

    /// Working directory (where generated URL patterns are kept)
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    fn var(&self, key: &str) -> Option<&str> {
        self.envs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn launch_error(&self, message: impl Into<String>) -> PilotError {
        PilotError::Launch {
            executable: self.kind.executable().to_string(),
            message: message.into(),
        }
    }

    /// The web app manifest to run and the directory it was found in
    fn find_manifest(&self, options: &LaunchOptions) -> Option<(WebappManifest, PathBuf)> {
        if let Some(dir) = &options.model_search_path {
            let properties = dir.join(WEBAPP_PROPERTIES);
            if properties.is_file() {
                return WebappManifest::load(&properties)
                    .ok()
                    .map(|manifest| (manifest, dir.clone()));
            }
        }
        let name = options.webapp.as_deref().filter(|n| !n.is_empty())?;
        let folder = options
            .model_search_path
            .clone()
            .or_else(|| self.var(WEBAPPS_INSTALL_FOLDER_ENV).map(PathBuf::from))?;
        let path = find_webapp(&folder, name)?;
        match WebappManifest::load(&path) {
            Ok(manifest) => Some((manifest, path.parent()?.to_path_buf())),
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "unreadable web app manifest");
                None
            }
        }
    }

    fn profile_paths(&self) -> PilotResult<ProfilePaths> {
        let app_dir = |var: &str| -> PilotResult<Option<PathBuf>> {
            match self.var(var) {
                Some(base) => {
                    let dir = PathBuf::from(base).join(APP_DIR);
                    fs::create_dir_all(&dir)?;
                    Ok(Some(dir))
                }
                None => Ok(None),
            }
        };
        Ok(ProfilePaths {
            data: app_dir("XDG_DATA_HOME")?,
            config: app_dir("XDG_CONFIG_HOME")?,
            cwd: self.cwd.clone(),
        })
    }

    /// Build the tree and load the first page. Fails, leaving nothing
    /// running, when the container has neither a web app nor a URL.
    pub fn start(self) -> PilotResult<MockProcess> {
        let options = LaunchOptions::parse(&self.args);
        let paths = self.profile_paths()?;
        let loader: Arc<dyn PageLoader> = match &self.loader {
            Some(loader) => Arc::clone(loader),
            None => {
                let rules = self.var(HOST_MAPPING_RULES_ENV).map(HostRule::parse_list);
                Arc::new(HttpPageLoader::new()?.with_rules(rules.unwrap_or_default()))
            }
        };

        let mut state = State::default();
        let mut filters = UriFilters::default();
        let (manifest, first_url) = match self.kind {
            AppKind::Browser => {
                state.homepage = paths
                    .settings()
                    .and_then(|p| read_setting(&p, "homepage"))
                    .filter(|h| !h.is_empty());
                let url = options.url.clone().or_else(|| state.homepage.clone());
                (None, url)
            }
            AppKind::Container => {
                let found = self.find_manifest(&options);
                filters = UriFilters::load(
                    found.as_ref().map(|(_, dir)| dir.as_path()),
                    options.use_local_intent_filter,
                );
                let manifest = found.map(|(manifest, _)| manifest);
                let url = options.url.clone().or_else(|| {
                    manifest
                        .as_ref()
                        .map(|m| m.homepage.clone())
                        .filter(|h| !h.is_empty())
                });
                if url.is_none() {
                    return Err(self.launch_error("no web app to run and no URL to load"));
                }
                (manifest, url)
            }
        };
        if let Some(manifest) = &manifest {
            state.patterns.extend(manifest.includes.iter().cloned());
        }
        state.patterns.extend(options.url_patterns.iter().cloned());
        if self.kind == AppKind::Container {
            state.generated_patterns = load_generated_patterns(&paths);
        }
        if self.kind == AppKind::Browser {
            load_profile_data(&paths, &mut state);
        }

        let wide = !matches!(self.device_class, DeviceClass::Phone);
        let app = MockApp::new();
        let layout = match self.kind {
            AppKind::Browser => Layout::browser(&app, &options, wide),
            AppKind::Container => Layout::container(
                &app,
                &options,
                wide,
                manifest.as_ref().map(|m| m.name.as_str()).unwrap_or_default(),
                first_url.as_deref().unwrap_or_default(),
            ),
        };
        let engine = Arc::new(Engine {
            kind: self.kind,
            options,
            wide,
            touch: self.device_class.is_touch(),
            loader,
            paths,
            layout,
            filters,
            state: Mutex::new(state),
        });
        engine.wire(&app)?;
        {
            let mut state = engine.lock();
            engine.open_tab(&mut state, &app, first_url, true);
        }
        tracing::info!(kind = ?self.kind, "simulated application started");
        Ok(MockProcess {
            app,
            engine,
            device_class: self.device_class,
        })
    }

    /// [`start`](Self::start), discarding the error
    pub fn try_start(self) -> Option<MockProcess> {
        match self.start() {
            Ok(process) => Some(process),
            Err(err) => {
                tracing::info!(%err, "simulated application did not start");
                None
            }
        }
    }
}

fn load_profile_data(paths: &ProfilePaths, state: &mut State) {
    let bookmarks = paths
        .bookmarks()
        .filter(|p| p.is_file())
        .map(|p| BookmarkStore::open(&p).and_then(|s| s.list()));
    match bookmarks {
        Some(Ok(bookmarks)) => state.bookmarks = bookmarks,
        Some(Err(err)) => tracing::warn!(%err, "could not read bookmarks"),
        None => {}
    }
    let history = paths
        .history()
        .filter(|p| p.is_file())
        .map(|p| HistoryStore::open(&p).and_then(|s| s.list()));
    match history {
        Some(Ok(visits)) => state.visits = visits,
        Some(Err(err)) => tracing::warn!(%err, "could not read history"),
        None => {}
    }
}

fn load_generated_patterns(paths: &ProfilePaths) -> Vec<String> {
    let Some(path) = paths.url_patterns().filter(|p| p.is_file()) else {
        return Vec::new();
    };
    let parsed = fs::read_to_string(&path)
        .map_err(PilotError::from)
        .and_then(|s| serde_json::from_str::<Vec<String>>(&s).map_err(PilotError::from));
    match parsed {
        Ok(patterns) => patterns,
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "ignoring generated URL patterns");
            Vec::new()
        }
    }
}

/// Turn address bar input into a URL: schemes are kept, host-like input
/// gets `http://`, anything else becomes a search
#[must_use]
pub fn fixup_url(input: &str) -> String {
    let text = input.trim();
    if text.is_empty() {
        return String::new();
    }
    if text.contains("://") || text.starts_with("data:") || text.starts_with("about:") {
        return text.to_string();
    }
    if !text.contains(' ') && (text.contains('.') || text.contains(':') || text == "localhost") {
        return format!("http://{text}");
    }
    search_url(text)
}

fn search_url(terms: &str) -> String {
    match Url::parse(SEARCH_URL) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair("q", terms);
            url.to_string()
        }
        Err(_) => SEARCH_URL.to_string(),
    }
}

/// Compile a wildcard URL pattern (`http://*.example.com/*`, `https?://...`)
fn compile_pattern(pattern: &str) -> Option<Regex> {
    let escaped = regex::escape(pattern)
        .replace(r"\*", "[^ ]*")
        .replace(r"s\?:", "s?:");
    Regex::new(&format!("^{escaped}$")).ok()
}

fn matches_any(patterns: &[String], url: &str) -> bool {
    patterns
        .iter()
        .filter_map(|p| compile_pattern(p))
        .any(|re| re.is_match(url))
}

// =============================================================================
// RUNNING PROCESS
// =============================================================================

/// A started simulated application
pub struct MockProcess {
    app: Arc<MockApp>,
    engine: Arc<Engine>,
    device_class: DeviceClass,
}

impl fmt::Debug for MockProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockProcess")
            .field("kind", &self.engine.kind)
            .field("device_class", &self.device_class)
            .finish_non_exhaustive()
    }
}

impl MockProcess {
    /// The object tree
    #[must_use]
    pub const fn app(&self) -> &Arc<MockApp> {
        &self.app
    }

    /// Which executable is simulated
    #[must_use]
    pub fn kind(&self) -> AppKind {
        self.engine.kind
    }

    /// Simulated renderer processes, for crash scenarios
    #[must_use]
    pub fn process_control(&self) -> Arc<dyn ProcessControl> {
        Arc::new(Renderer {
            app: Arc::clone(&self.app),
            engine: Arc::clone(&self.engine),
        })
    }

    /// Attach a session. A configured long press shorter than the
    /// simulated threshold lowers the threshold to half the hold time.
    #[must_use]
    pub fn attach(&self, config: PilotConfig) -> Session {
        let hold = config.long_press();
        if hold <= self.app.long_press_threshold() {
            self.app.set_long_press_threshold(hold / 2);
        }
        Session::attach_as(self.app.clone(), self.app.clone(), config, self.device_class)
            .with_process_control(self.process_control())
    }
}

/// The single web-content process shared by every tab
struct Renderer {
    app: Arc<MockApp>,
    engine: Arc<Engine>,
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer").finish_non_exhaustive()
    }
}

impl ProcessControl for Renderer {
    fn signal_web_processes(&self, signal: i32) -> PilotResult<usize> {
        if signal != 0 {
            self.engine.renderer_killed(&self.app);
        }
        Ok(1)
    }
}

// =============================================================================
// LAYOUT
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct AddressBarNodes {
    bar: NodeId,
    field: NodeId,
    clear: NodeId,
    action: NodeId,
    bookmark: NodeId,
}

#[derive(Debug, Clone, Copy)]
struct ChromeNodes {
    chrome: NodeId,
    back: NodeId,
    forward: Option<NodeId>,
    reload: NodeId,
    tabs: Option<NodeId>,
    drawer: Option<NodeId>,
    label: Option<NodeId>,
    address: Option<AddressBarNodes>,
}

#[derive(Debug, Clone, Copy)]
struct Layout {
    root: NodeId,
    chrome: Option<ChromeNodes>,
    views: NodeId,
    error_sheet: Option<NodeId>,
    suggestions: Option<(NodeId, NodeId)>,
}

fn chrome_button(app: &MockApp, parent: NodeId, name: &str, x: i32) -> NodeId {
    app.insert(
        Some(parent),
        NodeSpec::new("ChromeButton")
            .name(name)
            .prop("iconColor", Color::BLACK)
            .rect(Rect::new(x, 0, 48, 48)),
    )
}

impl AddressBarNodes {
    fn build(app: &MockApp, parent: NodeId) -> Self {
        let bar = app.insert(
            Some(parent),
            NodeSpec::new("AddressBar")
                .name("addressBar")
                .prop("bookmarked", false)
                .rect(Rect::new(144, 4, 512, 40)),
        );
        let action = app.insert(
            Some(bar),
            NodeSpec::new("QQuickMouseArea")
                .name("actionButton")
                .rect(Rect::new(144, 4, 40, 40)),
        );
        let field = app.insert(
            Some(bar),
            NodeSpec::new("TextField")
                .name("addressBarTextField")
                .editable()
                .rect(Rect::new(184, 4, 392, 40)),
        );
        let clear = app.insert(
            Some(bar),
            NodeSpec::new("AbstractButton")
                .name("clearButton")
                .visible(false)
                .rect(Rect::new(576, 4, 40, 40)),
        );
        let bookmark = app.insert(
            Some(bar),
            NodeSpec::new("QQuickMouseArea")
                .name("bookmarkToggle")
                .rect(Rect::new(616, 4, 40, 40)),
        );
        Self {
            bar,
            field,
            clear,
            action,
            bookmark,
        }
    }
}

impl Layout {
    fn browser(app: &MockApp, options: &LaunchOptions, wide: bool) -> Self {
        let root = app.insert(
            None,
            NodeSpec::new("Browser")
                .name("browser")
                .prop("wide", wide)
                .prop("incognito", options.incognito)
                .rect(WINDOW),
        );
        let views = app.insert(
            Some(root),
            NodeSpec::new("QQuickItem").name("webviewContainer").rect(CONTENT),
        );
        let error_sheet = app.insert(
            Some(root),
            NodeSpec::new("ErrorSheet")
                .name("errorSheet")
                .visible(false)
                .text("")
                .rect(CONTENT),
        );
        let chrome = (!options.chromeless).then(|| {
            let chrome = app.insert(
                Some(root),
                NodeSpec::new("Chrome")
                    .name("chrome")
                    .prop("bookmarked", false)
                    .prop("backgroundColor", Color::WHITE)
                    .rect(Rect::new(0, 0, 800, 48)),
            );
            let back = chrome_button(app, chrome, "backButton", 0);
            let forward = chrome_button(app, chrome, "forwardButton", 48);
            let reload = chrome_button(app, chrome, "reloadButton", 96);
            let address = AddressBarNodes::build(app, chrome);
            let tabs = chrome_button(app, chrome, "tabsButton", 704);
            app.set(tabs, "visible", wide);
            let drawer = chrome_button(app, chrome, "drawerButton", 752);
            ChromeNodes {
                chrome,
                back,
                forward: Some(forward),
                reload,
                tabs: Some(tabs),
                drawer: Some(drawer),
                label: None,
                address: Some(address),
            }
        });
        let popup = app.insert(
            Some(root),
            NodeSpec::new("Suggestions")
                .name("suggestionsList")
                .visible(false)
                .rect(Rect::new(144, 48, 512, 320)),
        );
        let list = app.insert(
            Some(popup),
            NodeSpec::new("QQuickListView").rect(Rect::new(144, 48, 512, 320)),
        );
        Self {
            root,
            chrome,
            views,
            error_sheet: Some(error_sheet),
            suggestions: Some((popup, list)),
        }
    }

    fn container(
        app: &MockApp,
        options: &LaunchOptions,
        wide: bool,
        webapp_name: &str,
        url: &str,
    ) -> Self {
        let root = app.insert(
            None,
            NodeSpec::new("WebappContainer")
                .name("webappContainer")
                .prop("wide", wide)
                .prop("webappName", webapp_name)
                .prop("url", url)
                .prop("filteredIntentUri", "")
                .prop("filteredSchemeUri", "")
                .rect(WINDOW),
        );
        let chrome = (options.enable_addressbar || options.enable_back_forward).then(|| {
            let panel = app.insert(
                Some(root),
                NodeSpec::new("QQuickItem")
                    .name("panel")
                    .rect(Rect::new(0, 0, 800, 48)),
            );
            let chrome = app.insert(
                Some(panel),
                NodeSpec::new("Chrome")
                    .name("chromeBase")
                    .prop("backgroundColor", Color::WHITE)
                    .prop("bookmarked", false)
                    .rect(Rect::new(0, 0, 800, 48)),
            );
            let back = chrome_button(app, chrome, "backButton", 0);
            app.set(back, "visible", options.enable_back_forward);
            let reload = chrome_button(app, chrome, "reloadButton", 48);
            let address = options
                .enable_addressbar
                .then(|| AddressBarNodes::build(app, chrome));
            let label = app.insert(
                Some(chrome),
                NodeSpec::new("Label")
                    .name("chromeTextLabel")
                    .text("")
                    .prop("color", Color::BLACK)
                    .rect(Rect::new(660, 0, 140, 48)),
            );
            ChromeNodes {
                chrome,
                back,
                forward: None,
                reload,
                tabs: None,
                drawer: None,
                label: Some(label),
                address,
            }
        });
        Self {
            root,
            chrome,
            views: root,
            error_sheet: None,
            suggestions: None,
        }
    }

    fn address(&self) -> Option<AddressBarNodes> {
        self.chrome.and_then(|c| c.address)
    }
}

// =============================================================================
// STATE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NavKind {
    /// New history entry
    Fresh,
    /// Same entry again
    Reload,
    /// Back/forward to an existing entry
    History,
}

#[derive(Debug)]
struct Tab {
    key: u64,
    webview: NodeId,
    overlay: Option<NodeId>,
    url: String,
    title: String,
    history: Vec<String>,
    index: usize,
    script: PageScript,
    credentials: Option<(String, String)>,
    seq: u64,
    loading: bool,
    error: Option<String>,
    theme: Option<Color>,
    last_crash: Option<Instant>,
    sad: bool,
}

impl Tab {
    fn new(key: u64, webview: NodeId, overlay: Option<NodeId>) -> Self {
        Self {
            key,
            webview,
            overlay,
            url: String::new(),
            title: String::new(),
            history: Vec::new(),
            index: 0,
            script: PageScript::default(),
            credentials: None,
            seq: 0,
            loading: false,
            error: None,
            theme: None,
            last_crash: None,
            sad: false,
        }
    }

    fn can_go_back(&self) -> bool {
        self.index > 0
    }

    fn can_go_forward(&self) -> bool {
        self.index + 1 < self.history.len()
    }
}

/// A navigation waiting on a dialog answer
#[derive(Debug, Clone)]
struct Pending {
    key: u64,
    url: String,
    kind: NavKind,
}

#[derive(Debug, Default)]
struct Views {
    new_tab: Option<views::NewTabNodes>,
    sad_tab: Option<NodeId>,
    menu: Option<NodeId>,
    drawer: Option<NodeId>,
    tabs: Option<NodeId>,
    settings: Option<NodeId>,
    history: Option<NodeId>,
    find_bar: Option<views::FindBar>,
}

#[derive(Debug, Default)]
struct State {
    tabs: Vec<Tab>,
    current: u64,
    next_key: u64,
    next_z: i64,
    homepage: Option<String>,
    bookmarks: Vec<Bookmark>,
    visits: Vec<HistoryEntry>,
    patterns: Vec<String>,
    generated_patterns: Vec<String>,
    views: Views,
    pending: Option<Pending>,
    suggest_seq: u64,
}

impl State {
    fn tab(&self, key: u64) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.key == key)
    }

    fn tab_mut(&mut self, key: u64) -> Option<&mut Tab> {
        self.tabs.iter_mut().find(|t| t.key == key)
    }

    fn current_tab(&self) -> Option<&Tab> {
        self.tab(self.current)
    }

    /// Browser tabs (not popups), in order
    fn tab_keys(&self) -> Vec<u64> {
        self.tabs
            .iter()
            .filter(|t| t.overlay.is_none())
            .map(|t| t.key)
            .collect()
    }

    fn is_bookmarked(&self, url: &str) -> bool {
        !url.is_empty() && self.bookmarks.iter().any(|b| b.url == url)
    }
}

/// Result of a background page fetch
struct Loaded {
    page: Page,
    script: PageScript,
    manifest_color: Option<Color>,
    frame_link: Option<PageLink>,
}

// =============================================================================
// ENGINE
// =============================================================================

struct Engine {
    kind: AppKind,
    options: LaunchOptions,
    wide: bool,
    touch: bool,
    loader: Arc<dyn PageLoader>,
    paths: ProfilePaths,
    layout: Layout,
    filters: UriFilters,
    state: Mutex<State>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("kind", &self.kind)
            .field("wide", &self.wide)
            .finish_non_exhaustive()
    }
}

type Action = fn(&Arc<Engine>, &MockApp);

impl Engine {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn on(
        self: &Arc<Self>,
        app: &MockApp,
        id: NodeId,
        gesture: Gesture,
        f: impl Fn(&Arc<Self>, &MockApp, NodeId) + Send + Sync + 'static,
    ) {
        let engine = Arc::clone(self);
        app.on(id, gesture, move |app, node| f(&engine, app, node));
    }

    fn on_click(self: &Arc<Self>, app: &MockApp, id: NodeId, action: Action) {
        self.on(app, id, Gesture::Click, move |engine, app, _| action(engine, app));
    }

    fn user_agent(&self) -> &str {
        self.options
            .user_agent
            .as_deref()
            .unwrap_or(DEFAULT_USER_AGENT)
    }

    fn wire(self: &Arc<Self>, app: &MockApp) -> PilotResult<()> {
        if let Some(chrome) = self.layout.chrome {
            self.on_click(app, chrome.back, Self::go_back);
            self.on_click(app, chrome.reload, Self::reload);
            if let Some(forward) = chrome.forward {
                self.on_click(app, forward, Self::go_forward);
            }
            if let Some(tabs) = chrome.tabs {
                self.on_click(app, tabs, Self::open_tabs_view);
            }
            if let Some(drawer) = chrome.drawer {
                self.on_click(app, drawer, Self::open_drawer);
            }
        }
        if let Some(bar) = self.layout.address() {
            self.on_click(app, bar.action, Self::action_button);
            self.on_click(app, bar.clear, Self::clear_address_bar);
            self.on_click(app, bar.bookmark, Self::toggle_bookmark);
            self.on(app, bar.field, Gesture::Edit, |engine, app, _| {
                engine.address_edited(app);
            });
            self.on(app, bar.field, Gesture::Submit, |engine, app, _| {
                engine.address_submitted(app);
            });
        }
        if self.kind == AppKind::Container {
            let root = self.layout.root;
            let filters = [
                ("intentUriToFilter", "filteredIntentUri"),
                ("schemeUriToFilter", "filteredSchemeUri"),
            ];
            for (input, output) in filters {
                let engine = Arc::clone(self);
                app.on_write(root, input, move |app, node, value| {
                    let uri = value.as_str().unwrap_or_default();
                    let filtered = if input == "intentUriToFilter" {
                        engine.filters.intent.apply(uri)
                    } else {
                        engine.filters.scheme.apply(uri)
                    };
                    app.set(node, output, filtered.unwrap_or_default());
                });
            }
        }
        if self.kind == AppKind::Browser {
            let shortcuts: [(&str, Action); 10] = [
                ("Ctrl+T", Self::new_tab),
                ("Ctrl+W", Self::close_current_tab),
                ("Ctrl+L", Self::focus_address_bar),
                ("Ctrl+R", Self::reload),
                ("F5", Self::reload),
                ("Alt+Left", Self::go_back),
                ("Alt+Right", Self::go_forward),
                ("Ctrl+F", Self::open_find_bar),
                ("Ctrl+D", Self::toggle_bookmark),
                ("Ctrl+Tab", Self::next_tab),
            ];
            for (combo, action) in shortcuts {
                let engine = Arc::clone(self);
                app.on_shortcut(combo, move |app, _| action(&engine, app))?;
            }
        }
        Ok(())
    }

    fn wire_webview(self: &Arc<Self>, app: &MockApp, key: u64, webview: NodeId) {
        self.on(app, webview, Gesture::Click, move |engine, app, _| {
            engine.webview_clicked(app, key);
        });
        let menu = move |engine: &Arc<Self>, app: &MockApp, _: NodeId| {
            engine.open_context_menu(app, key);
        };
        self.on(app, webview, Gesture::RightClick, menu);
        self.on(app, webview, Gesture::LongPress, menu);
        let engine = Arc::clone(self);
        app.on_write(webview, "url", move |app, _, value| {
            if let Some(url) = value.as_str() {
                engine.navigate(app, key, url.to_string());
            }
        });
    }

    // =========================================================================
    // TABS
    // =========================================================================

    fn open_tab(
        self: &Arc<Self>,
        state: &mut State,
        app: &MockApp,
        url: Option<String>,
        switch: bool,
    ) -> u64 {
        let key = state.next_key;
        state.next_key += 1;
        let name = match self.kind {
            AppKind::Browser => "webview",
            AppKind::Container => "webappBrowserView",
        };
        let webview = app.insert(
            Some(self.layout.views),
            NodeSpec::new("WebViewImpl")
                .name(name)
                .prop("url", "")
                .prop("title", "")
                .prop("loading", false)
                .prop("current", false)
                .prop("incognito", self.options.incognito)
                .visible(false)
                .rect(CONTENT),
        );
        self.wire_webview(app, key, webview);
        state.tabs.push(Tab::new(key, webview, None));
        if switch || state.tab_keys().len() == 1 {
            state.current = key;
        }
        if let Some(url) = url.filter(|u| !u.is_empty()) {
            self.start_load(state, app, key, url, NavKind::Fresh, true);
        }
        self.sync(state, app);
        key
    }

    fn open_popup(self: &Arc<Self>, state: &mut State, app: &MockApp, url: String) {
        let key = state.next_key;
        state.next_key += 1;
        state.next_z += 1;
        let overlay = app.insert(
            Some(self.layout.root),
            NodeSpec::new("PopupWindowOverlay")
                .name("popupWindowOverlay")
                .prop("z", state.next_z)
                .rect(WINDOW),
        );
        let close = app.insert(
            Some(overlay),
            NodeSpec::new("AbstractButton")
                .name("overlayCloseButton")
                .rect(Rect::new(752, 0, 48, 48)),
        );
        let webview = app.insert(
            Some(overlay),
            NodeSpec::new("WebViewImpl")
                .name("overlayWebview")
                .prop("url", "")
                .prop("title", "")
                .prop("loading", false)
                .prop("current", false)
                .prop("incognito", self.options.incognito)
                .rect(CONTENT),
        );
        self.wire_webview(app, key, webview);
        self.on(app, close, Gesture::Click, move |engine, app, _| {
            let mut state = engine.lock();
            engine.close_tab(&mut state, app, key);
        });
        state.tabs.push(Tab::new(key, webview, Some(overlay)));
        tracing::debug!(%url, "opening popup overlay");
        self.start_load(state, app, key, url, NavKind::Fresh, true);
    }

    fn close_tab(self: &Arc<Self>, state: &mut State, app: &MockApp, key: u64) {
        let keys = state.tab_keys();
        let Some(pos) = state.tabs.iter().position(|t| t.key == key) else {
            return;
        };
        let tab = state.tabs.remove(pos);
        app.destroy(tab.overlay.unwrap_or(tab.webview));
        if tab.overlay.is_some() {
            return;
        }
        let remaining = state.tab_keys();
        if remaining.is_empty() {
            self.open_tab(state, app, None, true);
            return;
        }
        if state.current == key {
            let old = keys.iter().position(|k| *k == key).unwrap_or_default();
            state.current = remaining
                .get(old)
                .or_else(|| remaining.last())
                .copied()
                .unwrap_or_default();
        }
        self.sync(state, app);
    }

    fn select_tab(self: &Arc<Self>, state: &mut State, app: &MockApp, key: u64) {
        if state.tab(key).is_some() {
            state.current = key;
            self.sync(state, app);
        }
    }

    fn new_tab(self: &Arc<Self>, app: &MockApp) {
        let mut state = self.lock();
        self.open_tab(&mut state, app, None, true);
        if let Some(bar) = self.layout.address() {
            app.set(bar.field, "text", "");
            app.focus(Some(bar.field));
        }
    }

    fn close_current_tab(self: &Arc<Self>, app: &MockApp) {
        let mut state = self.lock();
        let key = state.current;
        self.close_tab(&mut state, app, key);
    }

    fn next_tab(self: &Arc<Self>, app: &MockApp) {
        let mut state = self.lock();
        let keys = state.tab_keys();
        let pos = keys.iter().position(|k| *k == state.current).unwrap_or_default();
        if let Some(next) = keys.get((pos + 1) % keys.len().max(1)).copied() {
            self.select_tab(&mut state, app, next);
        }
    }

    // =========================================================================
    // NAVIGATION
    // =========================================================================

    /// Load `url` in a tab as a new history entry
    fn navigate(self: &Arc<Self>, app: &MockApp, key: u64, url: String) {
        let mut state = self.lock();
        self.start_load(&mut state, app, key, url, NavKind::Fresh, false);
    }

    fn start_load(
        self: &Arc<Self>,
        state: &mut State,
        app: &MockApp,
        key: u64,
        url: String,
        kind: NavKind,
        force: bool,
    ) {
        let Some(tab) = state.tab_mut(key) else {
            return;
        };
        if !force && kind == NavKind::Fresh && tab.script.before_unload && !tab.loading {
            state.pending = Some(Pending { key, url, kind });
            self.show_before_unload(app);
            return;
        }
        tab.seq += 1;
        tab.loading = true;
        tab.error = None;
        tab.url.clone_from(&url);
        let seq = tab.seq;
        let webview = tab.webview;
        let request = PageRequest {
            url: url.clone(),
            user_agent: Some(self.user_agent().to_string()),
            credentials: tab.credentials.clone(),
        };
        app.set(webview, "url", url.as_str());
        app.set(webview, "loading", true);
        tracing::debug!(tab = key, %url, ?kind, "navigating");
        if url.starts_with("data:") || url.starts_with("about:") {
            let loaded = Loaded {
                page: Page::ok(url.as_str(), ""),
                script: PageScript::default(),
                manifest_color: None,
                frame_link: None,
            };
            self.commit(state, app, key, kind, &url, loaded);
            return;
        }
        self.sync(state, app);
        let engine = Arc::clone(self);
        app.spawn(Duration::ZERO, move |app| {
            let loaded = engine.fetch(&request);
            engine.finish(app, key, seq, kind, &request.url, loaded);
        });
    }

    fn fetch(&self, request: &PageRequest) -> PilotResult<Loaded> {
        let page = self.loader.load(request)?;
        let script = PageScript::parse(&page.url, &page.body);
        let manifest_color = script
            .manifest
            .as_ref()
            .and_then(|url| self.loader.load(&PageRequest::get(url.as_str())).ok())
            .and_then(|manifest| manifest_theme_color(&manifest.body));
        let frame_link = match (&script.full_page_link, &script.iframe) {
            (None, Some(src)) => self
                .loader
                .load(&PageRequest::get(src.as_str()))
                .ok()
                .and_then(|frame| PageScript::parse(&frame.url, &frame.body).full_page_link),
            _ => None,
        };
        Ok(Loaded {
            page,
            script,
            manifest_color,
            frame_link,
        })
    }

    fn finish(
        self: &Arc<Self>,
        app: &MockApp,
        key: u64,
        seq: u64,
        kind: NavKind,
        requested: &str,
        loaded: PilotResult<Loaded>,
    ) {
        let mut state = self.lock();
        if state.tab(key).map(|t| t.seq) != Some(seq) {
            return;
        }
        match loaded {
            Ok(loaded) if loaded.page.status == 401 => {
                if let Some(tab) = state.tab_mut(key) {
                    tab.loading = false;
                    app.set(tab.webview, "loading", false);
                }
                state.pending = Some(Pending {
                    key,
                    url: requested.to_string(),
                    kind,
                });
                self.show_http_auth(app);
            }
            Ok(loaded) => self.commit(&mut state, app, key, kind, requested, loaded),
            Err(err) => {
                tracing::debug!(tab = key, %err, "page failed to load");
                if let Some(tab) = state.tab_mut(key) {
                    tab.loading = false;
                    tab.error = Some(err.to_string());
                    app.set(tab.webview, "loading", false);
                }
                self.sync(&mut state, app);
            }
        }
    }

    fn commit(
        self: &Arc<Self>,
        state: &mut State,
        app: &MockApp,
        key: u64,
        kind: NavKind,
        requested: &str,
        loaded: Loaded,
    ) {
        let Loaded {
            page,
            mut script,
            manifest_color,
            frame_link,
        } = loaded;
        if script.full_page_link.is_none() {
            script.full_page_link = frame_link;
        }
        let title = if script.shows_user_agent {
            self.user_agent().to_string()
        } else {
            script.title.clone().unwrap_or_default()
        };
        let Some(tab) = state.tab_mut(key) else {
            return;
        };
        tab.url.clone_from(&page.url);
        tab.title.clone_from(&title);
        tab.loading = false;
        tab.error = None;
        tab.theme = script.theme_color.or(manifest_color);
        match kind {
            NavKind::Fresh => {
                if !tab.history.is_empty() {
                    tab.history.truncate(tab.index + 1);
                }
                tab.history.push(page.url.clone());
                tab.index = tab.history.len() - 1;
            }
            NavKind::Reload | NavKind::History => match tab.history.get_mut(tab.index) {
                Some(entry) => entry.clone_from(&page.url),
                None => {
                    tab.history.push(page.url.clone());
                    tab.index = tab.history.len() - 1;
                }
            },
        }
        let webview = tab.webview;
        let seq = tab.seq;
        let popup = tab.overlay.is_some();
        let dialog = script.dialog.clone();
        let permission = script.permission.clone();
        let delayed = script.delayed_color;
        tab.script = script;

        app.set(webview, "url", page.url.as_str());
        app.set(webview, "title", title.as_str());
        app.set(webview, "loading", false);
        tracing::debug!(tab = key, url = %page.url, status = page.status, "page loaded");

        if self.kind == AppKind::Browser && !self.options.incognito && !popup {
            self.record_visit(state, &page.url, &title);
        }
        if self.kind == AppKind::Container && page.redirects > 0 && requested.contains("SAMLRequest")
        {
            self.learn_saml_pattern(state, app, webview, &page.url);
        }
        if let Some(dialog) = dialog {
            self.show_js_dialog(app, key, dialog);
        }
        if let Some(permission) = permission {
            self.show_permission(app, key, permission);
        }
        if let Some((color, delay)) = delayed {
            let engine = Arc::clone(self);
            app.spawn(Duration::from_millis(delay), move |app| {
                let mut state = engine.lock();
                match state.tab_mut(key) {
                    Some(tab) if tab.seq == seq => tab.theme = Some(color),
                    _ => return,
                }
                engine.sync(&mut state, app);
            });
        }
        self.sync(state, app);
    }

    fn record_visit(&self, state: &mut State, url: &str, title: &str) {
        if url.is_empty() || url.starts_with("data:") {
            return;
        }
        let now = chrono::Utc::now().timestamp();
        match state.visits.iter_mut().find(|e| e.url == url) {
            Some(entry) => {
                entry.visits += 1;
                entry.last_visit = now;
                entry.title = title.to_string();
            }
            None => state
                .visits
                .push(HistoryEntry::new(url, title).visited_at(now)),
        }
        if let Some(path) = self.paths.history() {
            if let Err(err) = HistoryStore::open(&path).and_then(|s| s.record_visit(url, title, now)) {
                tracing::warn!(%err, "could not record visit");
            }
        }
    }

    /// Allow the host a SAML login redirected to, and persist it
    fn learn_saml_pattern(&self, state: &mut State, app: &MockApp, webview: NodeId, url: &str) {
        let Some(host) = Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_string)) else {
            return;
        };
        let pattern = format!("https?://{host}/*");
        if state.generated_patterns.contains(&pattern) {
            return;
        }
        state.generated_patterns.push(pattern);
        let Some(path) = self.paths.url_patterns() else {
            return;
        };
        let written = serde_json::to_string(&state.generated_patterns)
            .map_err(PilotError::from)
            .and_then(|json| fs::write(&path, json).map_err(PilotError::from));
        match written {
            Ok(()) => app.emit(
                webview,
                "generatedUrlPatternsFileUpdated(QString)",
                vec![Value::from(path.to_string_lossy().into_owned())],
            ),
            Err(err) => tracing::warn!(%err, "could not save generated URL patterns"),
        }
    }

    fn allowed(&self, state: &State, url: &str) -> bool {
        let configured = state.patterns.iter().chain(&state.generated_patterns);
        let patterns: Vec<String> = configured.cloned().collect();
        patterns.is_empty() || matches_any(&patterns, url)
    }

    fn go_back(self: &Arc<Self>, app: &MockApp) {
        self.step_history(app, -1);
    }

    fn go_forward(self: &Arc<Self>, app: &MockApp) {
        self.step_history(app, 1);
    }

    fn step_history(self: &Arc<Self>, app: &MockApp, step: isize) {
        let mut state = self.lock();
        let key = state.current;
        let Some(tab) = state.tab_mut(key) else {
            return;
        };
        let allowed = if step < 0 {
            tab.can_go_back()
        } else {
            tab.can_go_forward()
        };
        if !allowed {
            return;
        }
        tab.index = tab.index.saturating_add_signed(step);
        let Some(url) = tab.history.get(tab.index).cloned() else {
            return;
        };
        self.start_load(&mut state, app, key, url, NavKind::History, true);
    }

    fn reload(self: &Arc<Self>, app: &MockApp) {
        let mut state = self.lock();
        let key = state.current;
        let Some(url) = state.tab(key).map(|t| t.url.clone()).filter(|u| !u.is_empty()) else {
            return;
        };
        self.start_load(&mut state, app, key, url, NavKind::Reload, true);
    }

    fn stop(&self, state: &mut State, app: &MockApp) {
        let key = state.current;
        if let Some(tab) = state.tab_mut(key) {
            tab.seq += 1;
            tab.loading = false;
            app.set(tab.webview, "loading", false);
        }
    }

    fn webview_clicked(self: &Arc<Self>, app: &MockApp, key: u64) {
        let mut state = self.lock();
        if let Some(menu) = state.views.menu.take() {
            app.destroy(menu);
            return;
        }
        self.blur_address_bar(&mut state, app);
        let Some(tab) = state.tab(key) else {
            return;
        };
        let Some(mut link) = tab.script.full_page_link.clone() else {
            return;
        };
        let (webview, popup) = (tab.webview, tab.overlay.is_some());
        if self.kind == AppKind::Container {
            link.href = self.filters.dispatch_target(&link.href);
        }
        match self.kind {
            AppKind::Browser if link.new_window => {
                self.open_tab(&mut state, app, Some(link.href), true);
            }
            AppKind::Browser => {
                self.start_load(&mut state, app, key, link.href, NavKind::Fresh, false);
            }
            AppKind::Container if !self.allowed(&state, &link.href) => {
                tracing::debug!(url = %link.href, "opening external URL");
                app.emit(
                    webview,
                    "openExternalUrlTriggered(QString)",
                    vec![Value::from(link.href)],
                );
            }
            AppKind::Container if link.new_window && !popup => {
                self.open_popup(&mut state, app, link.href);
            }
            AppKind::Container => {
                self.start_load(&mut state, app, key, link.href, NavKind::Fresh, false);
            }
        }
    }

    // =========================================================================
    // CRASHES
    // =========================================================================

    /// The renderer died: reload every tab once, show the sad tab if it
    /// dies again soon after
    fn renderer_killed(self: &Arc<Self>, app: &MockApp) {
        let mut state = self.lock();
        let now = Instant::now();
        let keys: Vec<u64> = state
            .tabs
            .iter()
            .filter(|t| !t.url.is_empty())
            .map(|t| t.key)
            .collect();
        tracing::info!(tabs = keys.len(), "renderer killed");
        for key in keys {
            let Some(tab) = state.tab_mut(key) else {
                continue;
            };
            tab.seq += 1;
            tab.loading = false;
            app.set(tab.webview, "loading", false);
            if tab.last_crash.is_some_and(|at| now.duration_since(at) < CRASH_WINDOW) {
                tab.sad = true;
                tab.last_crash = None;
            } else {
                tab.last_crash = Some(now);
                let url = tab.url.clone();
                self.start_load(&mut state, app, key, url, NavKind::Reload, true);
            }
        }
        self.sync(&mut state, app);
    }

    fn sad_tab_reload(self: &Arc<Self>, app: &MockApp) {
        let mut state = self.lock();
        let key = state.current;
        let Some(tab) = state.tab_mut(key) else {
            return;
        };
        tab.sad = false;
        let url = tab.url.clone();
        self.start_load(&mut state, app, key, url, NavKind::Reload, true);
        self.sync(&mut state, app);
    }

    // =========================================================================
    // ADDRESS BAR
    // =========================================================================

    fn address_edited(self: &Arc<Self>, app: &MockApp) {
        let Some(bar) = self.layout.address() else {
            return;
        };
        let text = app.get_string(bar.field, "text");
        app.set(bar.clear, "visible", !text.is_empty());
        let mut state = self.lock();
        self.update_suggestions(&mut state, app, &text);
    }

    fn address_submitted(self: &Arc<Self>, app: &MockApp) {
        let Some(bar) = self.layout.address() else {
            return;
        };
        let url = fixup_url(&app.get_string(bar.field, "text"));
        if url.is_empty() {
            return;
        }
        app.focus(None);
        app.set(bar.field, "text", url.as_str());
        let mut state = self.lock();
        self.hide_suggestions(&mut state, app);
        let key = state.current;
        self.start_load(&mut state, app, key, url, NavKind::Fresh, false);
    }

    fn focus_address_bar(self: &Arc<Self>, app: &MockApp) {
        if let Some(bar) = self.layout.address() {
            app.focus(Some(bar.field));
        }
    }

    fn clear_address_bar(self: &Arc<Self>, app: &MockApp) {
        let Some(bar) = self.layout.address() else {
            return;
        };
        app.set(bar.field, "text", "");
        app.set(bar.clear, "visible", false);
        let mut state = self.lock();
        self.hide_suggestions(&mut state, app);
    }

    fn blur_address_bar(&self, state: &mut State, app: &MockApp) {
        let Some(bar) = self.layout.address() else {
            return;
        };
        if app.focused() == Some(bar.field) {
            app.focus(None);
            self.hide_suggestions(state, app);
        }
    }

    fn action_button(self: &Arc<Self>, app: &MockApp) {
        let loading = self.lock().current_tab().is_some_and(|t| t.loading);
        if loading {
            let mut state = self.lock();
            self.stop(&mut state, app);
            self.sync(&mut state, app);
        } else {
            self.reload(app);
        }
    }

    fn toggle_bookmark(self: &Arc<Self>, app: &MockApp) {
        let mut state = self.lock();
        let Some((url, title)) = state
            .current_tab()
            .map(|t| (t.url.clone(), t.title.clone()))
            .filter(|(url, _)| !url.is_empty())
        else {
            return;
        };
        if state.is_bookmarked(&url) {
            state.bookmarks.retain(|b| b.url != url);
            if let Some(path) = self.paths.bookmarks() {
                if let Err(err) = BookmarkStore::open(&path).and_then(|s| s.remove(&url)) {
                    tracing::warn!(%err, "could not remove bookmark");
                }
            }
        } else {
            self.add_bookmark(&mut state, app, &url, &title);
        }
        self.sync(&mut state, app);
    }

    fn add_bookmark(self: &Arc<Self>, state: &mut State, app: &MockApp, url: &str, title: &str) {
        let bookmark = Bookmark::new(url, title);
        if let Some(path) = self.paths.bookmarks() {
            if let Err(err) = BookmarkStore::open(&path).and_then(|s| s.insert(&bookmark)) {
                tracing::warn!(%err, "could not save bookmark");
            }
        }
        state.bookmarks.insert(0, bookmark);
        self.show_bookmark_options(app, url, title);
    }

    // =========================================================================
    // SYNC
    // =========================================================================

    /// Bring every surface in line with the current tab
    fn sync(self: &Arc<Self>, state: &mut State, app: &MockApp) {
        for tab in &state.tabs {
            if tab.overlay.is_none() {
                let current = tab.key == state.current;
                app.set(tab.webview, "current", current);
                app.set(tab.webview, "visible", current);
            }
        }
        let Some(tab) = state.current_tab() else {
            return;
        };
        let (url, title, error, sad) = (
            tab.url.clone(),
            tab.title.clone(),
            tab.error.clone(),
            tab.sad,
        );
        let (back, forward) = (tab.can_go_back(), tab.can_go_forward());
        let background = tab.theme.unwrap_or(Color::WHITE);
        let foreground = background.contrasting_foreground();
        let bookmarked = state.is_bookmarked(&url);

        if let Some(chrome) = self.layout.chrome {
            app.set(chrome.chrome, "backgroundColor", background);
            app.set(chrome.chrome, "bookmarked", bookmarked);
            app.set(chrome.back, "enabled", back);
            app.set(chrome.back, "iconColor", foreground);
            app.set(chrome.reload, "iconColor", foreground);
            if let Some(button) = chrome.forward {
                app.set(button, "enabled", forward);
            }
            if let Some(label) = chrome.label {
                app.set(label, "text", title.as_str());
                app.set(label, "color", foreground);
            }
            if let Some(bar) = chrome.address {
                app.set(bar.bar, "bookmarked", bookmarked);
                if app.focused() != Some(bar.field) {
                    app.set(bar.field, "text", url.as_str());
                    app.set(bar.clear, "visible", !url.is_empty());
                }
            }
        }
        if let Some(sheet) = self.layout.error_sheet {
            app.set(sheet, "visible", error.is_some());
            app.set(sheet, "text", error.unwrap_or_default());
        }
        if self.kind == AppKind::Browser {
            self.sync_new_tab_view(state, app, url.is_empty());
        }
        self.sync_sad_tab(state, app, sad);
    }
}
