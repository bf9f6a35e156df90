//! webpilot: drive and assert against browser-like GUI applications.
//!
//! The application under test exposes its object tree over an
//! introspection transport. webpilot attaches to it, hides the tree behind
//! semantic accessors ("emulators"), synthesizes pointer and keyboard
//! input, and verifies outcomes with polling assertions.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         Scenario layer                            │
//! │   TemporaryProfile ─► FixtureServer ─► Launcher / MockBrowser     │
//! ├───────────────┬───────────────────────┬──────────────────────────┤
//! │  emulators    │  input (Pointer,      │  wait + matcher          │
//! │  Browser,     │  Keyboard)            │  eventually(...)         │
//! │  Chrome, ...  │                       │                          │
//! ├───────────────┴───────────┬───────────┴──────────────────────────┤
//! │  Session ─► UiNode ─► Transport / InputBackend                    │
//! ├───────────────────────────┴──────────────────────────────────────┤
//! │  TcpTransport (JSON lines)          │  MockApp (in memory)        │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use webpilot::prelude::*;
//!
//! let scenario = ScenarioBuilder::browser()
//!     .with_fixture_server()
//!     .open_fixture("/js-confirm-dialog")
//!     .build()?;
//! let browser = scenario.browser()?;
//! let dialog = browser.confirm_dialog()?;
//! dialog.click_cancel()?;
//! eventually(|| browser.current_webview()?.title(), equals("CANCEL"))?;
//! # Ok::<(), PilotError>(())
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

pub mod config;
pub mod emulators;
pub mod fixture_server;
pub mod input;
pub mod matcher;
// the simulated browser's handlers hold the engine lock across tree updates
#[allow(clippy::too_many_lines, clippy::significant_drop_tightening)]
pub mod mock;
pub mod node;
pub mod profile;
pub mod query;
mod result;
pub mod scenario;
pub mod session;
pub mod telemetry;
pub mod transport;
pub mod value;
pub mod wait;
pub mod wire;

pub use config::{resolve_executable, PilotConfig};
pub use emulators::Emulator;
pub use fixture_server::{FixtureConfig, FixtureServer};
pub use input::{InputEvent, Key, KeyCombo, Keyboard, Modifier, MouseButton, Pointer};
pub use node::{SignalWatcher, UiNode};
pub use profile::{Bookmark, HistoryEntry, TemporaryProfile, WebappInstall, WebappManifest};
pub use query::Query;
pub use result::{PilotError, PilotResult};
pub use scenario::{Scenario, ScenarioBuilder};
pub use session::{DeviceClass, Launcher, ProcessControl, Session};
pub use telemetry::init_tracing;
pub use transport::{InputBackend, NodeId, TcpTransport, Transport};
pub use value::{Color, Point, Rect, Value};
pub use wait::{eventually, eventually_with, WaitOptions};

/// Everything a scenario usually needs
pub mod prelude {
    pub use super::config::PilotConfig;
    pub use super::emulators::*;
    pub use super::fixture_server::{FixtureConfig, FixtureServer};
    pub use super::matcher::{
        contains, ends_with, equals, greater_than, has_length, is_false, is_true, less_than, not,
        satisfies, starts_with, Matcher,
    };
    pub use super::profile::{Bookmark, HistoryEntry, TemporaryProfile, WebappInstall, WebappManifest};
    pub use super::query::Query;
    pub use super::result::{PilotError, PilotResult};
    pub use super::scenario::{Scenario, ScenarioBuilder};
    pub use super::session::{DeviceClass, Session};
    pub use super::node::{SignalWatcher, UiNode};
    pub use super::value::{Color, Point, Rect, Value};
    pub use super::wait::{eventually, eventually_with, WaitOptions};
}
