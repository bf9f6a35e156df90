//! Timing and launch configuration.
//!
//! Every blocking wait in webpilot takes its budget from [`PilotConfig`]:
//! 10s for an `eventually` assertion and 20s for a page load by default.

use crate::result::PilotResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default `eventually` timeout (10 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Default page-load timeout (20 seconds)
pub const DEFAULT_PAGE_LOAD_TIMEOUT_MS: u64 = 20_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Default internal retry budget for `select_single` (1 second)
pub const DEFAULT_SELECT_RETRY_MS: u64 = 1_000;

/// Default wait for the introspection endpoint after spawn (30 seconds)
pub const DEFAULT_LAUNCH_TIMEOUT_MS: u64 = 30_000;

/// Default long-press hold (1.5 seconds)
pub const DEFAULT_LONG_PRESS_MS: u64 = 1_500;

/// Default number of intermediate moves in a drag
pub const DEFAULT_DRAG_STEPS: u32 = 10;

/// Name of the renderer subprocess backing web content
pub const DEFAULT_WEB_PROCESS_NAME: &str = "oxide-renderer";

/// Session-wide configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PilotConfig {
    /// `eventually` timeout in milliseconds
    pub timeout_ms: u64,
    /// Page-load timeout in milliseconds
    pub page_load_timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
    /// Internal retry budget for single-node selection
    pub select_retry_ms: u64,
    /// How long to wait for the endpoint after spawning
    pub launch_timeout_ms: u64,
    /// Press duration that counts as a long press
    pub long_press_ms: u64,
    /// Intermediate pointer moves per drag
    pub drag_steps: u32,
    /// Process name of the web-content renderer
    pub web_process_name: String,
}

impl Default for PilotConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            page_load_timeout_ms: DEFAULT_PAGE_LOAD_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            select_retry_ms: DEFAULT_SELECT_RETRY_MS,
            launch_timeout_ms: DEFAULT_LAUNCH_TIMEOUT_MS,
            long_press_ms: DEFAULT_LONG_PRESS_MS,
            drag_steps: DEFAULT_DRAG_STEPS,
            web_process_name: DEFAULT_WEB_PROCESS_NAME.to_string(),
        }
    }
}

impl PilotConfig {
    /// Create a config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with `WEBPILOT_*` environment variables
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().overlay_env(|key| std::env::var(key).ok())
    }

    /// Load from a JSON file; missing fields take defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> PilotResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Overlay values from a variable lookup. Malformed numbers are
    /// ignored with a warning.
    #[must_use]
    pub fn overlay_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str, slot: &mut u64| {
            if let Some(raw) = lookup(key) {
                match raw.trim().parse::<u64>() {
                    Ok(v) => *slot = v,
                    Err(_) => tracing::warn!(key, value = %raw, "ignoring malformed setting"),
                }
            }
        };
        read("WEBPILOT_TIMEOUT_MS", &mut self.timeout_ms);
        read("WEBPILOT_PAGE_LOAD_TIMEOUT_MS", &mut self.page_load_timeout_ms);
        read("WEBPILOT_POLL_INTERVAL_MS", &mut self.poll_interval_ms);
        read("WEBPILOT_SELECT_RETRY_MS", &mut self.select_retry_ms);
        read("WEBPILOT_LAUNCH_TIMEOUT_MS", &mut self.launch_timeout_ms);
        read("WEBPILOT_LONG_PRESS_MS", &mut self.long_press_ms);
        if let Some(name) = lookup("WEBPILOT_WEB_PROCESS_NAME") {
            self.web_process_name = name;
        }
        self
    }

    /// Set the `eventually` timeout
    #[must_use]
    pub const fn with_timeout(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    /// Set the page-load timeout
    #[must_use]
    pub const fn with_page_load_timeout(mut self, ms: u64) -> Self {
        self.page_load_timeout_ms = ms;
        self
    }

    /// Set the polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set the select retry budget
    #[must_use]
    pub const fn with_select_retry(mut self, ms: u64) -> Self {
        self.select_retry_ms = ms;
        self
    }

    /// Set the launch attach timeout
    #[must_use]
    pub const fn with_launch_timeout(mut self, ms: u64) -> Self {
        self.launch_timeout_ms = ms;
        self
    }

    /// Set the long-press hold
    #[must_use]
    pub const fn with_long_press(mut self, ms: u64) -> Self {
        self.long_press_ms = ms;
        self
    }

    /// Set drag steps
    #[must_use]
    pub const fn with_drag_steps(mut self, steps: u32) -> Self {
        self.drag_steps = steps;
        self
    }

    /// Set the renderer process name
    #[must_use]
    pub fn with_web_process_name(mut self, name: impl Into<String>) -> Self {
        self.web_process_name = name.into();
        self
    }

    /// Polling interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Long-press hold as Duration
    #[must_use]
    pub const fn long_press(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }
}

/// Prefer a locally built executable, fall back to the installed name
/// (resolved through `PATH` at spawn time).
#[must_use]
pub fn resolve_executable(local_build: impl AsRef<Path>, installed_name: &str) -> PathBuf {
    let local = local_build.as_ref();
    if local.exists() {
        local.to_path_buf()
    } else {
        PathBuf::from(installed_name)
    }
}
