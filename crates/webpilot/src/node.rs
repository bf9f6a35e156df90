//! Handles to live object-tree nodes.
//!
//! A [`UiNode`] holds only an identifier, its type tag and a weak
//! reference to the session that resolved it. Properties are read through
//! the transport on every call, never cached. Once the underlying element
//! is destroyed every read fails with `StaleNode`.

use crate::emulators::Emulator;
use crate::input::{Keyboard, Pointer};
use crate::matcher::{equals, is_false, is_true};
use crate::query::{Query, ENABLED, OBJECT_NAME, VISIBLE};
use crate::result::{PilotError, PilotResult};
use crate::session::{DeviceClass, SessionCore};
use crate::transport::{NodeId, NodeRef, WatchId};
use crate::value::{FromValue, Rect, Value};
use crate::wait::{eventually_with, WaitOptions};
use crate::config::PilotConfig;
use std::fmt;
use std::sync::{Arc, Weak};

/// Property holding a node's screen rectangle
pub const GLOBAL_RECT: &str = "globalRect";

/// Handle to one element of the application's object tree
#[derive(Clone)]
pub struct UiNode {
    id: NodeId,
    type_name: String,
    session: Weak<SessionCore>,
}

impl fmt::Debug for UiNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiNode")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

impl UiNode {
    pub(crate) fn new(node: NodeRef, session: Weak<SessionCore>) -> Self {
        Self {
            id: node.id,
            type_name: node.type_name,
            session,
        }
    }

    /// Node identifier
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// Type tag
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    fn core(&self) -> PilotResult<Arc<SessionCore>> {
        self.session
            .upgrade()
            .ok_or_else(|| PilotError::transport("session closed"))
    }

    /// Session services reachable from this node
    pub fn session(&self) -> PilotResult<SessionRef> {
        Ok(SessionRef(self.core()?))
    }

    // =========================================================================
    // PROPERTIES
    // =========================================================================

    /// Raw property value
    pub fn property(&self, name: &str) -> PilotResult<Value> {
        self.core()?.transport.get_property(self.id, name)
    }

    /// Property converted to `T`
    ///
    /// # Errors
    ///
    /// `StaleNode` if the node is gone, `UnknownProperty` if it has no such
    /// property, `TypeMismatch` if the value has the wrong shape.
    pub fn get<T: FromValue>(&self, name: &str) -> PilotResult<T> {
        let value = self.property(name)?;
        T::from_value(&value).ok_or_else(|| PilotError::TypeMismatch {
            name: name.to_string(),
            expected: T::EXPECTED,
            actual: value.kind().to_string(),
        })
    }

    /// Write a property
    pub fn set(&self, name: &str, value: impl Into<Value>) -> PilotResult<()> {
        self.core()?.transport.set_property(self.id, name, value.into())
    }

    /// `objectName`
    pub fn object_name(&self) -> PilotResult<String> {
        self.get(OBJECT_NAME)
    }

    /// `visible`
    pub fn visible(&self) -> PilotResult<bool> {
        self.get(VISIBLE)
    }

    /// `enabled`
    pub fn enabled(&self) -> PilotResult<bool> {
        self.get(ENABLED)
    }

    /// `text`
    pub fn text(&self) -> PilotResult<String> {
        self.get("text")
    }

    /// `globalRect`
    pub fn global_rect(&self) -> PilotResult<Rect> {
        self.get(GLOBAL_RECT)
    }

    /// Whether the element still exists
    pub fn is_alive(&self) -> PilotResult<bool> {
        self.core()?.transport.is_alive(self.id)
    }

    // =========================================================================
    // SELECTION
    // =========================================================================

    /// Exactly one descendant matching `query`, after the session's short
    /// retry budget
    pub fn select_single(&self, query: &Query) -> PilotResult<UiNode> {
        self.core()?.select_single(Some(self.id), query)
    }

    /// All descendants matching `query`; empty is not an error
    pub fn select_many(&self, query: &Query) -> PilotResult<Vec<UiNode>> {
        self.core()?.select_many(Some(self.id), query)
    }

    /// Like [`select_single`](Self::select_single) but retries for the
    /// session's `eventually` budget
    pub fn wait_select_single(&self, query: &Query) -> PilotResult<UiNode> {
        let core = self.core()?;
        let timeout = core.config.timeout_ms;
        core.wait_select_single(Some(self.id), query, timeout)
    }

    /// Like [`wait_select_single`](Self::wait_select_single) with an
    /// explicit timeout
    pub fn wait_select_single_within(&self, query: &Query, timeout_ms: u64) -> PilotResult<UiNode> {
        self.core()?.wait_select_single(Some(self.id), query, timeout_ms)
    }

    /// Select one descendant and wrap it in an emulator. The query's type
    /// tag is replaced with the emulator's.
    pub fn select_single_as<T: Emulator>(&self, query: Query) -> PilotResult<T> {
        self.select_single(&query.with_type(T::TYPE_NAME))
            .map(T::from_node)
    }

    /// Select many descendants as emulators
    pub fn select_many_as<T: Emulator>(&self, query: Query) -> PilotResult<Vec<T>> {
        Ok(self
            .select_many(&query.with_type(T::TYPE_NAME))?
            .into_iter()
            .map(T::from_node)
            .collect())
    }

    /// Wait for one descendant and wrap it in an emulator
    pub fn wait_select_single_as<T: Emulator>(&self, query: Query) -> PilotResult<T> {
        self.wait_select_single(&query.with_type(T::TYPE_NAME))
            .map(T::from_node)
    }

    // =========================================================================
    // WAITING
    // =========================================================================

    fn wait_options(&self) -> PilotResult<WaitOptions> {
        Ok(WaitOptions::from_config(&self.core()?.config))
    }

    /// Block until the element is destroyed
    pub fn wait_until_destroyed(&self) -> PilotResult<()> {
        let options = self.wait_options()?;
        self.wait_until_destroyed_within(options.timeout_ms)
    }

    /// Block until the element is destroyed, with an explicit timeout
    pub fn wait_until_destroyed_within(&self, timeout_ms: u64) -> PilotResult<()> {
        let options = self.wait_options()?.with_timeout(timeout_ms);
        eventually_with(&options, || self.is_alive(), is_false())
            .map(|_| ())
            .map_err(|e| self.describe_timeout(e, "destroyed"))
    }

    /// Block until `name` equals `expected` (`node.visible.wait_for(True)`)
    pub fn wait_for_property(&self, name: &str, expected: impl Into<Value>) -> PilotResult<()> {
        let expected = expected.into();
        let options = self.wait_options()?;
        eventually_with(&options, || self.property(name), equals(expected.clone()))
            .map(|_| ())
            .map_err(|e| self.describe_timeout(e, &format!("{name} == {expected}")))
    }

    /// Block until the node is visible
    pub fn wait_until_visible(&self) -> PilotResult<()> {
        let options = self.wait_options()?;
        eventually_with(&options, || self.visible(), is_true())
            .map(|_| ())
            .map_err(|e| self.describe_timeout(e, "visible"))
    }

    fn describe_timeout(&self, err: PilotError, what: &str) -> PilotError {
        match err {
            PilotError::AssertionTimeout {
                last_observed, ms, ..
            } => PilotError::AssertionTimeout {
                description: format!("{} #{} {what}", self.type_name, self.id),
                last_observed,
                ms,
            },
            other => other,
        }
    }

    // =========================================================================
    // SIGNALS
    // =========================================================================

    /// Start recording a signal, e.g. `openExternalUrlTriggered(QString)`
    pub fn watch_signal(&self, signal: &str) -> PilotResult<SignalWatcher> {
        let core = self.core()?;
        let watch = core.transport.watch_signal(self.id, signal)?;
        Ok(SignalWatcher {
            watch,
            node: self.id,
            signal: signal.to_string(),
            session: Arc::downgrade(&core),
        })
    }
}

/// Strong handle to a session's services, borrowed from a node
#[derive(Debug, Clone)]
pub struct SessionRef(Arc<SessionCore>);

impl SessionRef {
    /// Pointing device
    #[must_use]
    pub fn pointer(&self) -> &Pointer {
        &self.0.pointer
    }

    /// Keyboard
    #[must_use]
    pub fn keyboard(&self) -> &Keyboard {
        &self.0.keyboard
    }

    /// Session configuration
    #[must_use]
    pub fn config(&self) -> &PilotConfig {
        &self.0.config
    }

    /// Device class of the session
    #[must_use]
    pub fn device_class(&self) -> DeviceClass {
        self.0.device_class
    }

    /// Select from the application root
    pub fn select_single(&self, query: &Query) -> PilotResult<UiNode> {
        self.0.select_single(None, query)
    }

    /// Select many from the application root
    pub fn select_many(&self, query: &Query) -> PilotResult<Vec<UiNode>> {
        self.0.select_many(None, query)
    }

    /// Wait for one node under the application root
    pub fn wait_select_single(&self, query: &Query) -> PilotResult<UiNode> {
        self.0.wait_select_single(None, query, self.0.config.timeout_ms)
    }
}

// =============================================================================
// SIGNAL WATCHER
// =============================================================================

/// Records emissions of one signal on one node
#[derive(Clone)]
pub struct SignalWatcher {
    watch: WatchId,
    node: NodeId,
    signal: String,
    session: Weak<SessionCore>,
}

impl fmt::Debug for SignalWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalWatcher")
            .field("node", &self.node)
            .field("signal", &self.signal)
            .finish_non_exhaustive()
    }
}

impl SignalWatcher {
    fn core(&self) -> PilotResult<Arc<SessionCore>> {
        self.session
            .upgrade()
            .ok_or_else(|| PilotError::transport("session closed"))
    }

    /// Signal signature being watched
    #[must_use]
    pub fn signal(&self) -> &str {
        &self.signal
    }

    /// Argument list of every emission since the watch started
    pub fn emissions(&self) -> PilotResult<Vec<Vec<Value>>> {
        self.core()?.transport.signal_emissions(self.watch)
    }

    /// Number of emissions
    pub fn num_emissions(&self) -> PilotResult<usize> {
        Ok(self.emissions()?.len())
    }

    /// Whether the signal fired at least once
    pub fn was_emitted(&self) -> PilotResult<bool> {
        Ok(self.num_emissions()? > 0)
    }

    /// Block until at least `count` emissions were recorded
    pub fn wait_for_emissions(&self, count: usize) -> PilotResult<usize> {
        let options = WaitOptions::from_config(&self.core()?.config);
        eventually_with(
            &options,
            || self.num_emissions(),
            crate::matcher::satisfies(format!("{} emitted {count} times", self.signal), |n: &usize| {
                *n >= count
            }),
        )
    }
}
