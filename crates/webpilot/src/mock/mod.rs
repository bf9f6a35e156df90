//! Simulated applications for hermetic tests.
//!
//! [`MockApp`] is an in-memory object tree implementing both transport
//! traits. [`MockBrowser`] scripts a browser or web app container on top
//! of it, loading pages through a [`PageLoader`]. [`endpoint`] serves any
//! `MockApp` over the TCP wire binding.

mod app;
mod browser;
pub mod endpoint;
mod filters;
mod page;

pub use app::{Gesture, Handler, MockApp, NodeSpec, WriteHandler, DEFAULT_LONG_PRESS_THRESHOLD_MS};
pub use browser::{fixup_url, AppKind, MockBrowser, MockProcess, DEFAULT_USER_AGENT, SEARCH_URL};
pub use endpoint::Endpoint;
pub use filters::{encode_uri_component, IntentFilter, IntentUri, SchemeFilter, UriFilters};
pub use page::{
    count_matches, image_data_uri, resolve, visible_text, ContentKind, HostRule, HttpPageLoader,
    Page, PageLoader, PageRequest,
};
