//! Sessions and process launch.
//!
//! A [`Session`] is one running instance of the application under test:
//! the transport connection, the input devices, and (when webpilot spawned
//! it) the child process. Dropping the session kills the process, so
//! teardown runs on every exit path including a failed assertion.
//!
//! ```text
//! ┌──────────┐  spawn + env   ┌─────────────────────┐
//! │ Launcher │ ─────────────► │ application process │
//! └────┬─────┘                └──────────┬──────────┘
//!      │ poll connect                    │ listens on
//!      ▼                                 ▼
//! ┌──────────────┐   JSON lines   WEBPILOT_TESTABILITY_ADDR
//! │ TcpTransport │ ◄───────────────────────┘
//! └──────┬───────┘
//!        ▼
//!   Session ──► UiNode ──► emulators
//! ```

use crate::config::PilotConfig;
use crate::emulators::Emulator;
use crate::input::{Keyboard, Pointer};
use crate::matcher::Matcher;
use crate::node::UiNode;
use crate::query::Query;
use crate::result::{PilotError, PilotResult};
use crate::transport::{InputBackend, NodeId, TcpTransport, Transport};
use crate::wait::{eventually_with, WaitOptions};
use crate::wire::{TESTABILITY_ADDR_ENV, TESTABILITY_FLAG};
use std::ffi::OsString;
use std::fmt;
use std::net::{SocketAddr, TcpListener};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

// =============================================================================
// DEVICE CLASS
// =============================================================================

/// Form factor the application runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeviceClass {
    /// Mouse and keyboard
    #[default]
    Desktop,
    /// Touch, narrow
    Phone,
    /// Touch, wide
    Tablet,
}

impl DeviceClass {
    /// Whether input is touch-first (long-press instead of right click)
    #[must_use]
    pub const fn is_touch(&self) -> bool {
        matches!(self, Self::Phone | Self::Tablet)
    }

    /// Parse `desktop`, `phone` or `tablet`
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "desktop" => Some(Self::Desktop),
            "phone" => Some(Self::Phone),
            "tablet" => Some(Self::Tablet),
            _ => None,
        }
    }
}

// =============================================================================
// PROCESS CONTROL
// =============================================================================

/// Signals the web-content processes behind the application
pub trait ProcessControl: Send + Sync + fmt::Debug {
    /// Send `signal` to every web-content process; returns how many were hit
    fn signal_web_processes(&self, signal: i32) -> PilotResult<usize>;
}

/// Finds renderer processes by name among the descendants of a root pid
#[derive(Debug, Clone)]
pub struct ProcessTree {
    root: u32,
    process_name: String,
}

impl ProcessTree {
    /// Descendants of `root` whose command name is `process_name`
    #[must_use]
    pub fn new(root: u32, process_name: impl Into<String>) -> Self {
        Self {
            root,
            process_name: process_name.into(),
        }
    }

    /// Matching descendant pids
    #[cfg(target_os = "linux")]
    pub fn find(&self) -> PilotResult<Vec<u32>> {
        use std::collections::HashMap;

        let mut children: HashMap<u32, Vec<(u32, String)>> = HashMap::new();
        for entry in std::fs::read_dir("/proc")? {
            let entry = entry?;
            let Some(pid) = entry.file_name().to_str().and_then(|s| s.parse::<u32>().ok()) else {
                continue;
            };
            // Processes may exit between listing and reading
            let Ok(stat) = std::fs::read_to_string(entry.path().join("stat")) else {
                continue;
            };
            if let Some((comm, ppid)) = parse_stat(&stat) {
                children.entry(ppid).or_default().push((pid, comm));
            }
        }
        // The kernel truncates comm to 15 bytes
        let wanted: String = self.process_name.chars().take(15).collect();
        let mut found = Vec::new();
        let mut stack = vec![self.root];
        while let Some(parent) = stack.pop() {
            for (pid, comm) in children.get(&parent).into_iter().flatten() {
                if *comm == wanted {
                    found.push(*pid);
                }
                stack.push(*pid);
            }
        }
        Ok(found)
    }

    /// Matching descendant pids
    #[cfg(not(target_os = "linux"))]
    pub fn find(&self) -> PilotResult<Vec<u32>> {
        Err(PilotError::transport(
            "process tree inspection is only supported on Linux",
        ))
    }
}

/// `comm` and `ppid` from a `/proc/<pid>/stat` line
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_stat(stat: &str) -> Option<(String, u32)> {
    let open = stat.find('(')?;
    let close = stat.rfind(')')?;
    let comm = stat.get(open + 1..close)?.to_string();
    let mut rest = stat.get(close + 1..)?.split_whitespace();
    let _state = rest.next()?;
    let ppid = rest.next()?.parse().ok()?;
    Some((comm, ppid))
}

impl ProcessControl for ProcessTree {
    #[cfg(unix)]
    fn signal_web_processes(&self, signal: i32) -> PilotResult<usize> {
        let pids = self.find()?;
        let mut hit = 0;
        for pid in pids {
            let Ok(raw) = libc::pid_t::try_from(pid) else {
                continue;
            };
            // SAFETY: kill(2) has no memory-safety preconditions
            #[allow(unsafe_code)]
            let rc = unsafe { libc::kill(raw, signal) };
            if rc == 0 {
                hit += 1;
                tracing::info!(pid, signal, "signalled web process");
            } else {
                tracing::warn!(pid, signal, error = %std::io::Error::last_os_error(), "kill failed");
            }
        }
        Ok(hit)
    }

    #[cfg(not(unix))]
    fn signal_web_processes(&self, _signal: i32) -> PilotResult<usize> {
        Err(PilotError::transport("signals are only supported on Unix"))
    }
}

// =============================================================================
// SESSION CORE
// =============================================================================

/// Shared state behind a session; nodes hold it weakly
#[derive(Debug)]
pub(crate) struct SessionCore {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) pointer: Pointer,
    pub(crate) keyboard: Keyboard,
    pub(crate) config: PilotConfig,
    pub(crate) device_class: DeviceClass,
}

impl SessionCore {
    pub(crate) fn select_many(
        self: &Arc<Self>,
        scope: Option<NodeId>,
        query: &Query,
    ) -> PilotResult<Vec<UiNode>> {
        let weak = Arc::downgrade(self);
        Ok(self
            .transport
            .select(scope, query)?
            .into_iter()
            .map(|n| UiNode::new(n, weak.clone()))
            .collect())
    }

    fn select_exactly_one(
        self: &Arc<Self>,
        scope: Option<NodeId>,
        query: &Query,
    ) -> PilotResult<UiNode> {
        let mut nodes = self.select_many(scope, query)?;
        match nodes.len() {
            1 => Ok(nodes.remove(0)),
            0 => Err(PilotError::NotFound {
                query: query.to_selector(),
            }),
            count => Err(PilotError::Ambiguous {
                query: query.to_selector(),
                count,
            }),
        }
    }

    pub(crate) fn select_single(
        self: &Arc<Self>,
        scope: Option<NodeId>,
        query: &Query,
    ) -> PilotResult<UiNode> {
        self.wait_select_single(scope, query, self.config.select_retry_ms)
    }

    pub(crate) fn wait_select_single(
        self: &Arc<Self>,
        scope: Option<NodeId>,
        query: &Query,
        timeout_ms: u64,
    ) -> PilotResult<UiNode> {
        let start = Instant::now();
        let timeout = Duration::from_millis(timeout_ms);
        loop {
            match self.select_exactly_one(scope, query) {
                Ok(node) => return Ok(node),
                Err(err @ (PilotError::NotFound { .. } | PilotError::Ambiguous { .. })) => {
                    if start.elapsed() >= timeout {
                        tracing::debug!(query = %query, error = %err, "select gave up");
                        return Err(err);
                    }
                }
                Err(err) => return Err(err),
            }
            std::thread::sleep(self.config.poll_interval());
        }
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// One running instance of the application under test
pub struct Session {
    id: Uuid,
    core: Arc<SessionCore>,
    child: Option<Child>,
    process_control: Option<Arc<dyn ProcessControl>>,
    label: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("pid", &self.process_id())
            .field("device_class", &self.core.device_class)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Attach to an already running application
    #[must_use]
    pub fn attach(
        transport: Arc<dyn Transport>,
        input: Arc<dyn InputBackend>,
        config: PilotConfig,
    ) -> Self {
        Self::attach_as(transport, input, config, DeviceClass::default())
    }

    /// Attach to an already running application on a given form factor
    #[must_use]
    pub fn attach_as(
        transport: Arc<dyn Transport>,
        input: Arc<dyn InputBackend>,
        config: PilotConfig,
        device_class: DeviceClass,
    ) -> Self {
        Self::build(transport, input, config, device_class, None, "attached")
    }

    fn build(
        transport: Arc<dyn Transport>,
        input: Arc<dyn InputBackend>,
        config: PilotConfig,
        device_class: DeviceClass,
        child: Option<Child>,
        label: &str,
    ) -> Self {
        let pointer = Pointer::new(Arc::clone(&input), config.long_press(), config.drag_steps);
        let keyboard = Keyboard::new(input);
        let id = Uuid::new_v4();
        tracing::info!(session = %id, label, "session started");
        Self {
            id,
            core: Arc::new(SessionCore {
                transport,
                pointer,
                keyboard,
                config,
                device_class,
            }),
            child,
            process_control: None,
            label: label.to_string(),
        }
    }

    /// Set the process control used by [`kill_web_processes`](Self::kill_web_processes)
    #[must_use]
    pub fn with_process_control(mut self, control: Arc<dyn ProcessControl>) -> Self {
        self.process_control = Some(control);
        self
    }

    /// Unique session identifier (appears in logs)
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Configuration in effect
    #[must_use]
    pub fn config(&self) -> &PilotConfig {
        &self.core.config
    }

    /// Device class
    #[must_use]
    pub fn device_class(&self) -> DeviceClass {
        self.core.device_class
    }

    /// Pointing device
    #[must_use]
    pub fn pointer(&self) -> &Pointer {
        &self.core.pointer
    }

    /// Keyboard
    #[must_use]
    pub fn keyboard(&self) -> &Keyboard {
        &self.core.keyboard
    }

    /// Exactly one node matching `query` anywhere in the tree
    pub fn select_single(&self, query: &Query) -> PilotResult<UiNode> {
        self.core.select_single(None, query)
    }

    /// All nodes matching `query`
    pub fn select_many(&self, query: &Query) -> PilotResult<Vec<UiNode>> {
        self.core.select_many(None, query)
    }

    /// Wait up to the `eventually` budget for exactly one match
    pub fn wait_select_single(&self, query: &Query) -> PilotResult<UiNode> {
        self.core
            .wait_select_single(None, query, self.core.config.timeout_ms)
    }

    /// Wait up to `timeout_ms` for exactly one match
    pub fn wait_select_single_within(&self, query: &Query, timeout_ms: u64) -> PilotResult<UiNode> {
        self.core.wait_select_single(None, query, timeout_ms)
    }

    /// Select one node as an emulator
    pub fn select_single_as<T: Emulator>(&self, query: Query) -> PilotResult<T> {
        self.select_single(&query.with_type(T::TYPE_NAME))
            .map(T::from_node)
    }

    /// Select many nodes as emulators
    pub fn select_many_as<T: Emulator>(&self, query: Query) -> PilotResult<Vec<T>> {
        Ok(self
            .select_many(&query.with_type(T::TYPE_NAME))?
            .into_iter()
            .map(T::from_node)
            .collect())
    }

    /// Wait for one node as an emulator
    pub fn wait_select_single_as<T: Emulator>(&self, query: Query) -> PilotResult<T> {
        self.wait_select_single(&query.with_type(T::TYPE_NAME))
            .map(T::from_node)
    }

    /// Poll `accessor` until `matcher` accepts its value, within this
    /// session's configured timeout and poll interval
    pub fn eventually<T, A, M>(&self, accessor: A, matcher: M) -> PilotResult<T>
    where
        T: fmt::Debug,
        A: FnMut() -> PilotResult<T>,
        M: Matcher<T>,
    {
        eventually_with(&WaitOptions::from_config(&self.core.config), accessor, matcher)
    }

    /// Child process id, when webpilot spawned the application
    #[must_use]
    pub fn process_id(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Whether the spawned process is still running (attached sessions
    /// report `true`)
    pub fn is_running(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => true,
        }
    }

    /// Signal the web-content processes (e.g. `libc::SIGKILL`) and return
    /// how many were hit
    pub fn kill_web_processes(&self, signal: i32) -> PilotResult<usize> {
        let control = self
            .process_control
            .as_ref()
            .ok_or_else(|| PilotError::transport("session has no process control"))?;
        control.signal_web_processes(signal)
    }

    /// Kill and reap the child process. Idempotent.
    pub fn terminate(&mut self) {
        if let Some(mut child) = self.child.take() {
            let pid = child.id();
            if let Err(e) = child.kill() {
                tracing::warn!(pid, error = %e, "kill failed");
            }
            if let Err(e) = child.wait() {
                tracing::warn!(pid, error = %e, "wait failed");
            }
            tracing::info!(session = %self.id, pid, "application terminated");
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.terminate();
    }
}

// =============================================================================
// LAUNCHER
// =============================================================================

/// Spawns the application and attaches to its introspection endpoint
#[derive(Debug, Clone)]
pub struct Launcher {
    executable: PathBuf,
    args: Vec<OsString>,
    env: Vec<(OsString, OsString)>,
    config: PilotConfig,
    device_class: DeviceClass,
    testability_flag: Option<String>,
}

impl Launcher {
    /// Launch `executable`
    #[must_use]
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            args: Vec::new(),
            env: Vec::new(),
            config: PilotConfig::default(),
            device_class: DeviceClass::default(),
            testability_flag: Some(TESTABILITY_FLAG.to_string()),
        }
    }

    /// Append one argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set one environment variable
    #[must_use]
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Set environment variables
    #[must_use]
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Use a specific configuration
    #[must_use]
    pub fn with_config(mut self, config: PilotConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the session's device class
    #[must_use]
    pub const fn with_device_class(mut self, device_class: DeviceClass) -> Self {
        self.device_class = device_class;
        self
    }

    /// Replace (or drop, with `None`) the trailing testability argument
    #[must_use]
    pub fn with_testability_flag(mut self, flag: Option<String>) -> Self {
        self.testability_flag = flag;
        self
    }

    fn launch_error(&self, message: impl Into<String>) -> PilotError {
        PilotError::Launch {
            executable: self.executable.display().to_string(),
            message: message.into(),
        }
    }

    fn free_port() -> PilotResult<SocketAddr> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        Ok(listener.local_addr()?)
    }

    /// Spawn and attach.
    ///
    /// # Errors
    ///
    /// `Launch` if the executable cannot be spawned, exits before the
    /// endpoint is reachable, or the attach timeout elapses. The child is
    /// killed before the error is returned.
    pub fn launch(self) -> PilotResult<Session> {
        let addr = Self::free_port()?;
        let mut command = Command::new(&self.executable);
        command
            .args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .env(TESTABILITY_ADDR_ENV, addr.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null());
        if let Some(flag) = &self.testability_flag {
            command.arg(flag);
        }
        let mut child = command
            .spawn()
            .map_err(|e| self.launch_error(format!("spawn failed: {e}")))?;
        tracing::info!(
            executable = %self.executable.display(),
            pid = child.id(),
            %addr,
            "launched application"
        );

        let start = Instant::now();
        let timeout = Duration::from_millis(self.config.launch_timeout_ms);
        let transport = loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    return Err(self.launch_error(format!(
                        "exited with {status} before the introspection endpoint came up"
                    )));
                }
                Ok(None) => {}
                Err(e) => {
                    kill_quietly(&mut child);
                    return Err(self.launch_error(format!("wait failed: {e}")));
                }
            }
            if let Ok(transport) = TcpTransport::connect(addr, Duration::from_millis(200)) {
                break transport;
            }
            if start.elapsed() >= timeout {
                kill_quietly(&mut child);
                return Err(self.launch_error(format!(
                    "no introspection endpoint on {addr} after {}ms",
                    self.config.launch_timeout_ms
                )));
            }
            std::thread::sleep(self.config.poll_interval());
        };

        let pid = child.id();
        let transport = Arc::new(transport);
        let label = self
            .executable
            .file_name()
            .map_or_else(|| self.executable.display().to_string(), |n| n.to_string_lossy().into_owned());
        let session = Session::build(
            Arc::clone(&transport) as Arc<dyn Transport>,
            transport as Arc<dyn InputBackend>,
            self.config.clone(),
            self.device_class,
            Some(child),
            &label,
        )
        .with_process_control(Arc::new(ProcessTree::new(
            pid,
            self.config.web_process_name.clone(),
        )));
        Ok(session)
    }

    /// Spawn and attach; `None` on any launch failure, never a
    /// half-initialized session
    #[must_use]
    pub fn try_launch(self) -> Option<Session> {
        match self.launch() {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::info!(error = %e, "launch produced no session");
                None
            }
        }
    }
}

fn kill_quietly(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
