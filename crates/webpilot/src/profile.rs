//! Temporary profiles for the application under test.
//!
//! A [`TemporaryProfile`] is a throwaway set of XDG directories. Scenarios
//! pre-seed it (bookmarks, history, homepage, installed web apps), pass
//! [`TemporaryProfile::env`] to the launcher, and drop it afterwards; the
//! directories are removed with it.
//!
//! On-disk layout, relative to the XDG homes:
//!
//! ```text
//! $XDG_DATA_HOME/webbrowser-app/bookmarks.sqlite
//! $XDG_DATA_HOME/webbrowser-app/history.sqlite
//! $XDG_CONFIG_HOME/webbrowser-app/webbrowser-app.conf
//! <webapps>/unity-webapps-<name>/manifest.json
//! ```

use crate::result::{PilotError, PilotResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Per-application directory under each XDG home
pub const APP_DIR: &str = "webbrowser-app";

/// Bookmarks database file name
pub const BOOKMARKS_DB: &str = "bookmarks.sqlite";

/// History database file name
pub const HISTORY_DB: &str = "history.sqlite";

/// Settings file name
pub const CONFIG_FILE: &str = "webbrowser-app.conf";

/// Manifest file inside an installed web app directory
pub const WEBAPP_MANIFEST: &str = "manifest.json";

/// Manifest file in a bare `--webappModelSearchPath` directory
pub const WEBAPP_PROPERTIES: &str = "webapp-properties.json";

/// Prefix of installed web app directories
pub const WEBAPP_DIR_PREFIX: &str = "unity-webapps-";

/// Environment variable overriding the web app install folder
pub const WEBAPPS_INSTALL_FOLDER_ENV: &str = "WEBAPP_QML_DEFAULT_WEBAPPS_INSTALL_FOLDER";

/// Environment variable carrying host mapping rules (`MAP *.test.com:80 127.0.0.1:8000`)
pub const HOST_MAPPING_RULES_ENV: &str = "UBUNTU_WEBVIEW_HOST_MAPPING_RULES";

/// Intent filter function shipped with a web app
pub const LOCAL_INTENT_FILTER: &str = "local-intent-filter.js";

/// Per-scheme filter functions shipped with a web app
pub const LOCAL_SCHEME_FILTER: &str = "local-scheme-filter.js";

/// File the container writes SAML-derived URL patterns to
pub const GENERATED_URL_PATTERNS: &str = "generated-url-patterns.json";

// =============================================================================
// RECORDS
// =============================================================================

/// One bookmark row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    /// Target URL
    pub url: String,
    /// Title
    pub title: String,
    /// Icon URL
    #[serde(default)]
    pub icon: String,
    /// Creation time, seconds since the epoch
    #[serde(default)]
    pub created: i64,
    /// Folder name, `""` for the default folder
    #[serde(default)]
    pub folder: String,
}

impl Bookmark {
    /// Bookmark in the default folder, created now
    #[must_use]
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            icon: String::new(),
            created: chrono::Utc::now().timestamp(),
            folder: String::new(),
        }
    }

    /// Put the bookmark in a named folder
    #[must_use]
    pub fn in_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = folder.into();
        self
    }

    /// Override the creation time
    #[must_use]
    pub const fn created_at(mut self, created: i64) -> Self {
        self.created = created;
        self
    }
}

/// One history row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Visited URL
    pub url: String,
    /// Host part of the URL
    #[serde(default)]
    pub domain: String,
    /// Page title
    #[serde(default)]
    pub title: String,
    /// Icon URL
    #[serde(default)]
    pub icon: String,
    /// Number of visits
    #[serde(default = "one")]
    pub visits: i64,
    /// Last visit, seconds since the epoch
    #[serde(default)]
    pub last_visit: i64,
}

const fn one() -> i64 {
    1
}

impl HistoryEntry {
    /// Single visit, now
    #[must_use]
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            domain: domain_of(&url),
            url,
            title: title.into(),
            icon: String::new(),
            visits: 1,
            last_visit: chrono::Utc::now().timestamp(),
        }
    }

    /// Set the visit count
    #[must_use]
    pub const fn with_visits(mut self, visits: i64) -> Self {
        self.visits = visits;
        self
    }

    /// Set the last visit time
    #[must_use]
    pub const fn visited_at(mut self, last_visit: i64) -> Self {
        self.last_visit = last_visit;
        self
    }

    fn normalized(&self) -> Self {
        let mut entry = self.clone();
        if entry.domain.is_empty() {
            entry.domain = domain_of(&entry.url);
        }
        entry
    }
}

/// Host of a URL (`""` when it has none)
#[must_use]
pub fn domain_of(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}

// =============================================================================
// STORES
// =============================================================================

/// Bookmarks database
#[derive(Debug)]
pub struct BookmarkStore {
    conn: Connection,
}

impl BookmarkStore {
    /// Open (creating tables if needed)
    pub fn open(path: &Path) -> PilotResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS folders (folderId INTEGER PRIMARY KEY, folder VARCHAR);
             CREATE TABLE IF NOT EXISTS bookmarks (url VARCHAR, title VARCHAR, icon VARCHAR,
                                                   created INTEGER, folderId INTEGER);",
        )?;
        Ok(Self { conn })
    }

    /// Id of a named folder, creating it on first use. The default folder
    /// has no row.
    pub fn folder_id(&self, folder: &str) -> PilotResult<Option<i64>> {
        if folder.is_empty() {
            return Ok(None);
        }
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT folderId FROM folders WHERE folder = ?1",
                params![folder],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(Some(id));
        }
        self.conn
            .execute("INSERT INTO folders (folder) VALUES (?1)", params![folder])?;
        Ok(Some(self.conn.last_insert_rowid()))
    }

    /// Insert one bookmark
    pub fn insert(&self, bookmark: &Bookmark) -> PilotResult<()> {
        let folder_id = self.folder_id(&bookmark.folder)?;
        self.conn.execute(
            "INSERT INTO bookmarks (url, title, icon, created, folderId) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                bookmark.url,
                bookmark.title,
                bookmark.icon,
                bookmark.created,
                folder_id
            ],
        )?;
        Ok(())
    }

    /// Remove every bookmark for `url`
    pub fn remove(&self, url: &str) -> PilotResult<()> {
        self.conn
            .execute("DELETE FROM bookmarks WHERE url = ?1", params![url])?;
        Ok(())
    }

    /// Every bookmark, newest first
    pub fn list(&self) -> PilotResult<Vec<Bookmark>> {
        let mut stmt = self.conn.prepare(
            "SELECT b.url, b.title, b.icon, b.created, COALESCE(f.folder, '')
             FROM bookmarks b LEFT JOIN folders f ON b.folderId = f.folderId
             ORDER BY b.created DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Bookmark {
                url: row.get(0)?,
                title: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                icon: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                created: row.get::<_, Option<i64>>(3)?.unwrap_or_default(),
                folder: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Named folders, alphabetically
    pub fn folders(&self) -> PilotResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT folder FROM folders ORDER BY folder")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<Result<_, _>>()?)
    }
}

/// History database
#[derive(Debug)]
pub struct HistoryStore {
    conn: Connection,
}

impl HistoryStore {
    /// Open (creating the table if needed)
    pub fn open(path: &Path) -> PilotResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS history (url VARCHAR, domain VARCHAR, title VARCHAR,
                                                 icon VARCHAR, visits INTEGER, lastVisit DATETIME);",
        )?;
        Ok(Self { conn })
    }

    /// Insert one row as given
    pub fn insert(&self, entry: &HistoryEntry) -> PilotResult<()> {
        let entry = entry.normalized();
        self.conn.execute(
            "INSERT INTO history (url, domain, title, icon, visits, lastVisit)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.url,
                entry.domain,
                entry.title,
                entry.icon,
                entry.visits,
                entry.last_visit
            ],
        )?;
        Ok(())
    }

    /// Count a visit to `url`, creating the row on first visit
    pub fn record_visit(&self, url: &str, title: &str, at: i64) -> PilotResult<()> {
        let updated = self.conn.execute(
            "UPDATE history SET visits = visits + 1, title = ?2, lastVisit = ?3 WHERE url = ?1",
            params![url, title, at],
        )?;
        if updated == 0 {
            self.insert(&HistoryEntry::new(url, title).visited_at(at))?;
        }
        Ok(())
    }

    /// Every row, most recent first
    pub fn list(&self) -> PilotResult<Vec<HistoryEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, domain, title, icon, visits, lastVisit FROM history
             ORDER BY lastVisit DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(HistoryEntry {
                url: row.get(0)?,
                domain: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                title: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                icon: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                visits: row.get::<_, Option<i64>>(4)?.unwrap_or(1),
                last_visit: row.get::<_, Option<i64>>(5)?.unwrap_or_default(),
            })
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }
}

/// Seed a bookmarks database
pub fn seed_bookmarks(path: &Path, bookmarks: &[Bookmark]) -> PilotResult<usize> {
    let store = BookmarkStore::open(path)?;
    for bookmark in bookmarks {
        store.insert(bookmark)?;
    }
    tracing::debug!(path = %path.display(), count = bookmarks.len(), "seeded bookmarks");
    Ok(bookmarks.len())
}

/// Seed a history database
pub fn seed_history(path: &Path, entries: &[HistoryEntry]) -> PilotResult<usize> {
    let store = HistoryStore::open(path)?;
    for entry in entries {
        store.insert(entry)?;
    }
    tracing::debug!(path = %path.display(), count = entries.len(), "seeded history");
    Ok(entries.len())
}

// =============================================================================
// SETTINGS FILE
// =============================================================================

/// Read `key` from the `[General]` section of a settings file
#[must_use]
pub fn read_setting(path: &Path, key: &str) -> Option<String> {
    let contents = fs::read_to_string(path).ok()?;
    let mut in_general = false;
    for line in contents.lines().map(str::trim) {
        if line.starts_with('[') {
            in_general = line == "[General]";
        } else if in_general {
            if let Some((k, v)) = line.split_once('=') {
                if k.trim() == key {
                    return Some(v.trim().to_string());
                }
            }
        }
    }
    None
}

/// Write `[General]` settings, replacing the file
pub fn write_settings(path: &Path, settings: &[(&str, &str)]) -> PilotResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut contents = String::from("[General]\n");
    for (key, value) in settings {
        contents.push_str(&format!("{key}={value}\n"));
    }
    fs::write(path, contents)?;
    Ok(())
}

// =============================================================================
// WEB APPS
// =============================================================================

/// Web app manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebappManifest {
    /// URL patterns (`http://*.example.com/*`) that stay inside the app
    #[serde(default)]
    pub includes: Vec<String>,
    /// Display name
    pub name: String,
    /// Domain
    #[serde(default)]
    pub domain: String,
    /// Start URL
    #[serde(default)]
    pub homepage: String,
    /// User script file names
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scripts: Vec<String>,
}

impl WebappManifest {
    /// Manifest with a name and homepage
    #[must_use]
    pub fn new(name: impl Into<String>, homepage: impl Into<String>) -> Self {
        Self {
            includes: Vec::new(),
            name: name.into(),
            domain: String::new(),
            homepage: homepage.into(),
            scripts: Vec::new(),
        }
    }

    /// Add an include pattern
    #[must_use]
    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.includes.push(pattern.into());
        self
    }

    /// Load from a JSON file
    pub fn load(path: &Path) -> PilotResult<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

/// Everything written into a web app install directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebappInstall {
    /// The manifest
    pub manifest: WebappManifest,
    /// User scripts: (file name, contents). Names are added to the manifest.
    pub user_scripts: Vec<(String, String)>,
    /// `local-intent-filter.js` contents
    pub intent_filter: Option<String>,
    /// `local-scheme-filter.js` contents
    pub scheme_filter: Option<String>,
}

impl WebappInstall {
    /// Install with only a manifest
    #[must_use]
    pub const fn new(manifest: WebappManifest) -> Self {
        Self {
            manifest,
            user_scripts: Vec::new(),
            intent_filter: None,
            scheme_filter: None,
        }
    }

    /// Add a user script
    #[must_use]
    pub fn user_script(mut self, name: impl Into<String>, contents: impl Into<String>) -> Self {
        self.user_scripts.push((name.into(), contents.into()));
        self
    }

    /// Set the intent filter script
    #[must_use]
    pub fn intent_filter(mut self, contents: impl Into<String>) -> Self {
        self.intent_filter = Some(contents.into());
        self
    }

    /// Set the scheme filter script
    #[must_use]
    pub fn scheme_filter(mut self, contents: impl Into<String>) -> Self {
        self.scheme_filter = Some(contents.into());
        self
    }

    /// Write into `dir` (created if missing) under `manifest_name`
    pub fn write_to(&self, dir: &Path, manifest_name: &str) -> PilotResult<PathBuf> {
        fs::create_dir_all(dir)?;
        let mut manifest = self.manifest.clone();
        for (name, contents) in &self.user_scripts {
            fs::write(dir.join(name), contents)?;
            if !manifest.scripts.contains(name) {
                manifest.scripts.push(name.clone());
            }
        }
        if let Some(filter) = &self.intent_filter {
            fs::write(dir.join(LOCAL_INTENT_FILTER), filter)?;
        }
        if let Some(filter) = &self.scheme_filter {
            fs::write(dir.join(LOCAL_SCHEME_FILTER), filter)?;
        }
        let path = dir.join(manifest_name);
        fs::write(&path, serde_json::to_string_pretty(&manifest)?)?;
        tracing::debug!(path = %path.display(), name = %manifest.name, "installed web app");
        Ok(path)
    }
}

/// Install a web app into `install_folder/unity-webapps-<name>/`
pub fn install_webapp(install_folder: &Path, install: &WebappInstall) -> PilotResult<PathBuf> {
    if install.manifest.name.is_empty() {
        return Err(PilotError::profile("web app manifest needs a name"));
    }
    let dir = install_folder.join(format!("{WEBAPP_DIR_PREFIX}{}", install.manifest.name));
    install.write_to(&dir, WEBAPP_MANIFEST)
}

/// Find an installed web app's manifest by name
#[must_use]
pub fn find_webapp(install_folder: &Path, name: &str) -> Option<PathBuf> {
    [format!("{WEBAPP_DIR_PREFIX}{name}"), name.to_string()]
        .into_iter()
        .map(|dir| install_folder.join(dir).join(WEBAPP_MANIFEST))
        .find(|path| path.is_file())
}

// =============================================================================
// TEMPORARY PROFILE
// =============================================================================

/// Throwaway XDG directories, removed on drop
#[derive(Debug)]
pub struct TemporaryProfile {
    root: TempDir,
}

impl TemporaryProfile {
    /// Create empty data, config, cache and web app directories
    pub fn new() -> PilotResult<Self> {
        let root = tempfile::Builder::new().prefix("webpilot-profile-").tempdir()?;
        for dir in ["data", "config", "cache", "webapps"] {
            fs::create_dir_all(root.path().join(dir))?;
        }
        tracing::debug!(root = %root.path().display(), "temporary profile created");
        Ok(Self { root })
    }

    /// Profile root
    #[must_use]
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// `XDG_DATA_HOME`
    #[must_use]
    pub fn data_home(&self) -> PathBuf {
        self.root().join("data")
    }

    /// `XDG_CONFIG_HOME`
    #[must_use]
    pub fn config_home(&self) -> PathBuf {
        self.root().join("config")
    }

    /// `XDG_CACHE_HOME`
    #[must_use]
    pub fn cache_home(&self) -> PathBuf {
        self.root().join("cache")
    }

    /// Web app install folder
    #[must_use]
    pub fn webapps_folder(&self) -> PathBuf {
        self.root().join("webapps")
    }

    /// The application's data directory
    pub fn data_location(&self) -> PilotResult<PathBuf> {
        let dir = self.data_home().join(APP_DIR);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// The application's config directory
    pub fn config_location(&self) -> PilotResult<PathBuf> {
        let dir = self.config_home().join(APP_DIR);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Environment for a launched application
    #[must_use]
    pub fn env(&self) -> Vec<(String, String)> {
        let path = |p: PathBuf| p.to_string_lossy().into_owned();
        vec![
            ("XDG_DATA_HOME".into(), path(self.data_home())),
            ("XDG_CONFIG_HOME".into(), path(self.config_home())),
            ("XDG_CACHE_HOME".into(), path(self.cache_home())),
            (WEBAPPS_INSTALL_FOLDER_ENV.into(), path(self.webapps_folder())),
        ]
    }

    /// Seed bookmarks (folders are created as needed)
    pub fn populate_bookmarks(&self, bookmarks: &[Bookmark]) -> PilotResult<usize> {
        seed_bookmarks(&self.data_location()?.join(BOOKMARKS_DB), bookmarks)
    }

    /// Seed history
    pub fn populate_history(&self, entries: &[HistoryEntry]) -> PilotResult<usize> {
        seed_history(&self.data_location()?.join(HISTORY_DB), entries)
    }

    /// Write the homepage setting
    pub fn set_homepage(&self, url: &str) -> PilotResult<()> {
        write_settings(&self.config_location()?.join(CONFIG_FILE), &[("homepage", url)])
    }

    /// Write an arbitrary file under the application's config directory
    pub fn write_config_file(&self, name: &str, contents: &str) -> PilotResult<PathBuf> {
        let path = self.config_location()?.join(name);
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Install a web app into the profile's install folder
    pub fn install_webapp(&self, install: &WebappInstall) -> PilotResult<PathBuf> {
        install_webapp(&self.webapps_folder(), install)
    }

    /// Write a bare `webapp-properties.json` model directory, for
    /// `--webappModelSearchPath`
    pub fn write_webapp_model(&self, install: &WebappInstall) -> PilotResult<PathBuf> {
        let dir = self.root().join("webapp-model");
        install.write_to(&dir, WEBAPP_PROPERTIES)?;
        Ok(dir)
    }

    /// Write a SAML URL pattern file; `None` writes invalid JSON
    pub fn write_url_patterns(&self, patterns: Option<&[&str]>) -> PilotResult<PathBuf> {
        let path = self.root().join(GENERATED_URL_PATTERNS);
        let contents = match patterns {
            Some(patterns) => serde_json::to_string(patterns)?,
            None => "{]".to_string(),
        };
        fs::write(&path, contents)?;
        Ok(path)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    mod bookmark_tests {
        use super::*;

        #[test]
        fn test_folders_created_once() {
            let profile = TemporaryProfile::new().unwrap();
            profile
                .populate_bookmarks(&[
                    Bookmark::new("http://a/", "A"),
                    Bookmark::new("http://u/", "Uranium").in_folder("Actinide"),
                    Bookmark::new("http://p/", "Plutonium").in_folder("Actinide"),
                    Bookmark::new("http://n/", "Neon").in_folder("NobleGas"),
                ])
                .unwrap();
            let store = BookmarkStore::open(&profile.data_location().unwrap().join(BOOKMARKS_DB))
                .unwrap();
            assert_eq!(store.folders().unwrap(), vec!["Actinide", "NobleGas"]);
            let all = store.list().unwrap();
            assert_eq!(all.len(), 4);
            assert_eq!(all.iter().filter(|b| b.folder.is_empty()).count(), 1);
        }

        #[test]
        fn test_remove() {
            let dir = tempfile::tempdir().unwrap();
            let store = BookmarkStore::open(&dir.path().join(BOOKMARKS_DB)).unwrap();
            store.insert(&Bookmark::new("http://a/", "A")).unwrap();
            store.remove("http://a/").unwrap();
            assert!(store.list().unwrap().is_empty());
        }

        #[test]
        fn test_newest_first() {
            let dir = tempfile::tempdir().unwrap();
            let store = BookmarkStore::open(&dir.path().join(BOOKMARKS_DB)).unwrap();
            store.insert(&Bookmark::new("http://old/", "Old").created_at(10)).unwrap();
            store.insert(&Bookmark::new("http://new/", "New").created_at(20)).unwrap();
            let urls: Vec<_> = store.list().unwrap().into_iter().map(|b| b.url).collect();
            assert_eq!(urls, vec!["http://new/", "http://old/"]);
        }
    }

    mod history_tests {
        use super::*;

        #[test]
        fn test_domain_filled_in() {
            let entry = HistoryEntry::new("http://www.example.org/a", "A");
            assert_eq!(entry.domain, "www.example.org");
            assert_eq!(domain_of("not a url"), "");
        }

        #[test]
        fn test_record_visit_upserts() {
            let dir = tempfile::tempdir().unwrap();
            let store = HistoryStore::open(&dir.path().join(HISTORY_DB)).unwrap();
            store.record_visit("http://a/", "A", 100).unwrap();
            store.record_visit("http://a/", "A2", 200).unwrap();
            let rows = store.list().unwrap();
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].visits, 2);
            assert_eq!(rows[0].title, "A2");
            assert_eq!(rows[0].last_visit, 200);
        }
    }

    mod settings_tests {
        use super::*;

        #[test]
        fn test_homepage_round_trip() {
            let profile = TemporaryProfile::new().unwrap();
            profile.set_homepage("http://home/").unwrap();
            let path = profile.config_location().unwrap().join(CONFIG_FILE);
            assert_eq!(read_setting(&path, "homepage").as_deref(), Some("http://home/"));
            assert_eq!(read_setting(&path, "missing"), None);
        }

        #[test]
        fn test_other_sections_ignored() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join(CONFIG_FILE);
            fs::write(&path, "[Other]\nhomepage=x\n[General]\nhomepage = y\n").unwrap();
            assert_eq!(read_setting(&path, "homepage").as_deref(), Some("y"));
        }
    }

    mod webapp_tests {
        use super::*;

        #[test]
        fn test_install_and_find() {
            let profile = TemporaryProfile::new().unwrap();
            let install = WebappInstall::new(
                WebappManifest::new("test", "http://test.com/").include("http://test.com:*/*"),
            )
            .user_script("test.user.js", "");
            profile.install_webapp(&install).unwrap();
            let path = find_webapp(&profile.webapps_folder(), "test").unwrap();
            let manifest = WebappManifest::load(&path).unwrap();
            assert_eq!(manifest.homepage, "http://test.com/");
            assert_eq!(manifest.scripts, vec!["test.user.js"]);
            assert!(find_webapp(&profile.webapps_folder(), "other").is_none());
        }

        #[test]
        fn test_unnamed_rejected() {
            let profile = TemporaryProfile::new().unwrap();
            let install = WebappInstall::new(WebappManifest::new("", "http://x/"));
            assert!(matches!(
                profile.install_webapp(&install),
                Err(PilotError::Profile { .. })
            ));
        }

        #[test]
        fn test_invalid_url_patterns_file() {
            let profile = TemporaryProfile::new().unwrap();
            let path = profile.write_url_patterns(None).unwrap();
            assert!(serde_json::from_str::<Vec<String>>(&fs::read_to_string(path).unwrap()).is_err());
        }
    }

    #[test]
    fn test_env_points_into_profile() {
        let profile = TemporaryProfile::new().unwrap();
        let env = profile.env();
        assert!(env
            .iter()
            .all(|(_, v)| Path::new(v).starts_with(profile.root())));
        let root = profile.root().to_path_buf();
        drop(profile);
        assert!(!root.exists());
    }
}
