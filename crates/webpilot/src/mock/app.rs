//! In-memory object tree.
//!
//! [`MockApp`] is a stand-in for an application's introspection endpoint:
//! a tree of typed nodes with properties, per-node gesture handlers,
//! keyboard shortcuts, focus routing for editable nodes, and hit-testing by
//! `globalRect`. It implements both [`Transport`] and [`InputBackend`], so a
//! [`Session`](crate::Session) can attach to it directly.
//!
//! Handlers run after the tree lock is released and may freely mutate the
//! tree, including destroying the node they were attached to.

use crate::input::{InputEvent, Key, KeyCombo, Modifier, MouseButton};
use crate::node::GLOBAL_RECT;
use crate::query::{Query, ENABLED, OBJECT_NAME, VISIBLE};
use crate::result::{PilotError, PilotResult};
use crate::transport::{InputBackend, NodeId, NodeRef, Transport, WatchId};
use crate::value::{Point, Rect, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

/// Default hold time after which a primary press counts as a long press
pub const DEFAULT_LONG_PRESS_THRESHOLD_MS: u64 = 800;

/// A press that moves further than this is a drag, not a click
const CLICK_SLOP: i32 = 8;

/// Pointer or keyboard gesture a node can react to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gesture {
    /// Primary press and release
    Click,
    /// Secondary button click
    RightClick,
    /// Primary press held past the long-press threshold
    LongPress,
    /// Enter pressed in a focused editable node
    Submit,
    /// Text of a focused editable node changed
    Edit,
}

/// Gesture or shortcut callback
pub type Handler = Arc<dyn Fn(&MockApp, NodeId) + Send + Sync>;

/// Callback for a property written through the transport
pub type WriteHandler = Arc<dyn Fn(&MockApp, NodeId, &Value) + Send + Sync>;

/// Description of a node to insert
#[derive(Debug, Clone)]
pub struct NodeSpec {
    type_name: String,
    props: BTreeMap<String, Value>,
    editable: bool,
}

impl NodeSpec {
    /// Node of the given type, no properties
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            props: BTreeMap::new(),
            editable: false,
        }
    }

    /// Set `objectName`
    #[must_use]
    pub fn name(self, object_name: &str) -> Self {
        self.prop(OBJECT_NAME, object_name)
    }

    /// Set any property
    #[must_use]
    pub fn prop(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.props.insert(name.to_string(), value.into());
        self
    }

    /// Set `visible`
    #[must_use]
    pub fn visible(self, visible: bool) -> Self {
        self.prop(VISIBLE, visible)
    }

    /// Set `enabled`
    #[must_use]
    pub fn enabled(self, enabled: bool) -> Self {
        self.prop(ENABLED, enabled)
    }

    /// Set `globalRect`
    #[must_use]
    pub fn rect(self, rect: Rect) -> Self {
        self.prop(GLOBAL_RECT, rect)
    }

    /// Set `text`
    #[must_use]
    pub fn text(self, text: &str) -> Self {
        self.prop("text", text)
    }

    /// Accept keyboard focus and text input
    #[must_use]
    pub fn editable(mut self) -> Self {
        self.editable = true;
        self.props
            .entry("text".to_string())
            .or_insert_with(|| Value::from(""));
        self.props.insert("activeFocus".to_string(), Value::Bool(false));
        self
    }
}

struct MockNode {
    type_name: String,
    props: BTreeMap<String, Value>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    editable: bool,
}

struct Press {
    at: Point,
    button: MouseButton,
    since: Instant,
}

struct Watch {
    node: NodeId,
    signal: String,
    emissions: Vec<Vec<Value>>,
}

struct Tree {
    nodes: BTreeMap<NodeId, MockNode>,
    roots: Vec<NodeId>,
    next_id: NodeId,
    handlers: HashMap<(NodeId, Gesture), Handler>,
    shortcuts: HashMap<String, Handler>,
    writes: HashMap<(NodeId, String), WriteHandler>,
    modifiers: Vec<Modifier>,
    focus: Option<NodeId>,
    pointer: Point,
    press: Option<Press>,
    watches: BTreeMap<WatchId, Watch>,
    next_watch: WatchId,
    long_press_threshold: Duration,
}

impl Tree {
    fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            roots: Vec::new(),
            next_id: 1,
            handlers: HashMap::new(),
            shortcuts: HashMap::new(),
            writes: HashMap::new(),
            modifiers: Vec::new(),
            focus: None,
            pointer: Point::default(),
            press: None,
            watches: BTreeMap::new(),
            next_watch: 1,
            long_press_threshold: Duration::from_millis(DEFAULT_LONG_PRESS_THRESHOLD_MS),
        }
    }

    fn node(&self, id: NodeId) -> PilotResult<&MockNode> {
        self.nodes.get(&id).ok_or(PilotError::StaleNode { id })
    }

    fn flag(&self, id: NodeId, name: &str) -> bool {
        self.nodes
            .get(&id)
            .and_then(|n| n.props.get(name))
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }

    /// Visible only if every ancestor is visible too
    fn effectively_visible(&self, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if !self.flag(current, VISIBLE) {
                return false;
            }
            cursor = self.nodes.get(&current).and_then(|n| n.parent);
        }
        true
    }

    fn snapshot(&self, id: NodeId) -> PilotResult<BTreeMap<String, Value>> {
        let mut props = self.node(id)?.props.clone();
        props.insert(VISIBLE.to_string(), Value::Bool(self.effectively_visible(id)));
        Ok(props)
    }

    /// Depth-first, parents before children, siblings in insertion order
    fn walk(&self, start: &[NodeId], out: &mut Vec<NodeId>) {
        for id in start {
            if let Some(node) = self.nodes.get(id) {
                out.push(*id);
                self.walk(&node.children, out);
            }
        }
    }

    fn descendants(&self, scope: Option<NodeId>) -> PilotResult<Vec<NodeId>> {
        let mut out = Vec::new();
        match scope {
            Some(id) => {
                let children = self.node(id)?.children.clone();
                self.walk(&children, &mut out);
            }
            None => self.walk(&self.roots, &mut out),
        }
        Ok(out)
    }

    fn find(&self, scope: Option<NodeId>, query: &Query) -> PilotResult<Vec<NodeId>> {
        let mut found = Vec::new();
        for id in self.descendants(scope)? {
            let node = self.node(id)?;
            if query.matches(&node.type_name, &self.snapshot(id)?) {
                found.push(id);
            }
        }
        Ok(found)
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.nodes.get(&current).and_then(|n| n.parent);
        }
        false
    }

    /// Topmost visible node under `point`: the last one in paint order
    fn hit(&self, point: Point) -> Option<NodeId> {
        let mut order = Vec::new();
        self.walk(&self.roots, &mut order);
        order.into_iter().rev().find(|id| {
            self.effectively_visible(*id)
                && self
                    .nodes
                    .get(id)
                    .and_then(|n| n.props.get(GLOBAL_RECT))
                    .is_some_and(|v| matches!(v, Value::Rect(r) if r.contains(point)))
        })
    }

    /// Nearest ancestor-or-self with a handler for `gesture`
    fn handler_for(&self, id: NodeId, gesture: Gesture) -> Option<(NodeId, Handler)> {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if let Some(handler) = self.handlers.get(&(current, gesture)) {
                return Some((current, Arc::clone(handler)));
            }
            cursor = self.nodes.get(&current).and_then(|n| n.parent);
        }
        None
    }

    fn set_focus(&mut self, id: Option<NodeId>) {
        if self.focus == id {
            return;
        }
        if let Some(old) = self.focus.take() {
            if let Some(node) = self.nodes.get_mut(&old) {
                node.props.insert("activeFocus".into(), Value::Bool(false));
            }
        }
        if let Some(new) = id {
            if let Some(node) = self.nodes.get_mut(&new) {
                node.props.insert("activeFocus".into(), Value::Bool(true));
                self.focus = Some(new);
            }
        }
    }

    fn record(&mut self, id: NodeId, signal: &str, args: &[Value]) {
        for watch in self.watches.values_mut() {
            if watch.node == id && watch.signal == signal {
                watch.emissions.push(args.to_vec());
            }
        }
    }

    fn remove_subtree(&mut self, id: NodeId, removed: &mut HashSet<NodeId>) {
        if let Some(node) = self.nodes.remove(&id) {
            removed.insert(id);
            for child in node.children {
                self.remove_subtree(child, removed);
            }
        }
    }
}

/// Canonical shortcut key: modifiers in fixed order, letters lower-cased
fn canonical_combo(modifiers: &[Modifier], key: Key) -> String {
    let rank = |m: &Modifier| match m {
        Modifier::Ctrl => 0,
        Modifier::Shift => 1,
        Modifier::Alt => 2,
        Modifier::Super => 3,
    };
    let mut modifiers = modifiers.to_vec();
    modifiers.sort_by_key(rank);
    modifiers.dedup();
    let key = match key {
        Key::Char(c) => Key::Char(c.to_ascii_lowercase()),
        other => other,
    };
    KeyCombo { modifiers, key }.to_string()
}

// =============================================================================
// MOCK APP
// =============================================================================

/// In-memory application exposing an object tree
pub struct MockApp {
    me: Weak<MockApp>,
    tree: Mutex<Tree>,
}

impl fmt::Debug for MockApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tree = self.lock();
        f.debug_struct("MockApp")
            .field("nodes", &tree.nodes.len())
            .field("focus", &tree.focus)
            .finish_non_exhaustive()
    }
}

impl MockApp {
    /// Empty application
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            tree: Mutex::new(Tree::new()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Tree> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Strong handle to this application, if still alive
    #[must_use]
    pub fn handle(&self) -> Option<Arc<Self>> {
        self.me.upgrade()
    }

    /// Hold time after which a primary press is a long press
    pub fn set_long_press_threshold(&self, threshold: Duration) {
        self.lock().long_press_threshold = threshold;
    }

    /// Current long-press threshold
    #[must_use]
    pub fn long_press_threshold(&self) -> Duration {
        self.lock().long_press_threshold
    }

    // =========================================================================
    // TREE
    // =========================================================================

    /// Insert a node under `parent` (top level when `None` or when the
    /// parent is gone). Identifiers are never reused.
    pub fn insert(&self, parent: Option<NodeId>, spec: NodeSpec) -> NodeId {
        let mut tree = self.lock();
        let id = tree.next_id;
        tree.next_id += 1;
        let parent = parent.filter(|p| tree.nodes.contains_key(p));
        tree.nodes.insert(
            id,
            MockNode {
                type_name: spec.type_name,
                props: spec.props,
                parent,
                children: Vec::new(),
                editable: spec.editable,
            },
        );
        match parent.and_then(|p| tree.nodes.get_mut(&p)) {
            Some(parent) => parent.children.push(id),
            None => tree.roots.push(id),
        }
        id
    }

    /// Remove a node and its subtree
    pub fn destroy(&self, id: NodeId) {
        let mut tree = self.lock();
        let Some(parent) = tree.nodes.get(&id).map(|n| n.parent) else {
            return;
        };
        match parent.and_then(|p| tree.nodes.get_mut(&p)) {
            Some(parent) => parent.children.retain(|c| *c != id),
            None => tree.roots.retain(|c| *c != id),
        }
        let mut removed = HashSet::new();
        tree.remove_subtree(id, &mut removed);
        tree.handlers.retain(|(node, _), _| !removed.contains(node));
        tree.writes.retain(|(node, _), _| !removed.contains(node));
        if tree.focus.is_some_and(|f| removed.contains(&f)) {
            tree.focus = None;
        }
    }

    /// Remove every child of a node
    pub fn clear_children(&self, id: NodeId) {
        for child in self.children(id) {
            self.destroy(child);
        }
    }

    /// Whether the node exists
    #[must_use]
    pub fn exists(&self, id: NodeId) -> bool {
        self.lock().nodes.contains_key(&id)
    }

    /// Children in insertion order
    #[must_use]
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.lock()
            .nodes
            .get(&id)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// Parent node
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.lock().nodes.get(&id).and_then(|n| n.parent)
    }

    /// Set a property; ignored if the node is gone
    pub fn set(&self, id: NodeId, name: &str, value: impl Into<Value>) {
        if let Some(node) = self.lock().nodes.get_mut(&id) {
            node.props.insert(name.to_string(), value.into());
        }
    }

    /// Raw property value
    #[must_use]
    pub fn get(&self, id: NodeId, name: &str) -> Option<Value> {
        self.lock().nodes.get(&id).and_then(|n| n.props.get(name).cloned())
    }

    /// String property, empty when missing
    #[must_use]
    pub fn get_string(&self, id: NodeId, name: &str) -> String {
        self.get(id, name)
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default()
    }

    /// Nodes matching `query` below `scope`; empty if the scope is gone
    #[must_use]
    pub fn find(&self, scope: Option<NodeId>, query: &Query) -> Vec<NodeId> {
        self.lock().find(scope, query).unwrap_or_default()
    }

    /// Whether `ancestor` is `id` or one of its ancestors
    #[must_use]
    pub fn contains(&self, ancestor: NodeId, id: NodeId) -> bool {
        self.lock().is_ancestor_or_self(ancestor, id)
    }

    /// First node matching `query` anywhere
    #[must_use]
    pub fn find_one(&self, query: &Query) -> Option<NodeId> {
        self.find(None, query).into_iter().next()
    }

    // =========================================================================
    // BEHAVIOR
    // =========================================================================

    /// React to a gesture on a node (or any of its descendants without a
    /// handler of their own)
    pub fn on(
        &self,
        id: NodeId,
        gesture: Gesture,
        handler: impl Fn(&Self, NodeId) + Send + Sync + 'static,
    ) {
        self.lock().handlers.insert((id, gesture), Arc::new(handler));
    }

    /// React to a key combo such as `"Ctrl+T"`, wherever focus is
    pub fn on_shortcut(
        &self,
        combo: &str,
        handler: impl Fn(&Self, NodeId) + Send + Sync + 'static,
    ) -> PilotResult<()> {
        let parsed = KeyCombo::parse(combo)?;
        let key = canonical_combo(&parsed.modifiers, parsed.key);
        self.lock().shortcuts.insert(key, Arc::new(handler));
        Ok(())
    }

    /// React to `name` being written through the transport. In-process
    /// [`set`](Self::set) calls do not trigger it.
    pub fn on_write(
        &self,
        id: NodeId,
        name: &str,
        handler: impl Fn(&Self, NodeId, &Value) + Send + Sync + 'static,
    ) {
        self.lock()
            .writes
            .insert((id, name.to_string()), Arc::new(handler));
    }

    /// Record a signal emission
    pub fn emit(&self, id: NodeId, signal: &str, args: Vec<Value>) {
        self.lock().record(id, signal, &args);
    }

    /// Give keyboard focus to a node (`None` clears focus)
    pub fn focus(&self, id: Option<NodeId>) {
        self.lock().set_focus(id);
    }

    /// Node with keyboard focus
    #[must_use]
    pub fn focused(&self) -> Option<NodeId> {
        self.lock().focus
    }

    /// Run `f` on a background thread after `delay`
    pub fn spawn(&self, delay: Duration, f: impl FnOnce(&Self) + Send + 'static) {
        let Some(app) = self.handle() else {
            return;
        };
        std::thread::spawn(move || {
            std::thread::sleep(delay);
            f(&app);
        });
    }

    fn run(&self, target: Option<(NodeId, Handler)>) {
        if let Some((id, handler)) = target {
            handler(self, id);
        }
    }

    fn pointer_release(&self, at: Point, button: MouseButton) {
        let target = {
            let mut tree = self.lock();
            let Some(press) = tree.press.take() else {
                return;
            };
            if press.button != button
                || (press.at.x - at.x).abs() > CLICK_SLOP
                || (press.at.y - at.y).abs() > CLICK_SLOP
            {
                return;
            }
            let gesture = match button {
                MouseButton::Right => Gesture::RightClick,
                MouseButton::Left if press.since.elapsed() >= tree.long_press_threshold => {
                    Gesture::LongPress
                }
                MouseButton::Left => Gesture::Click,
                MouseButton::Middle => return,
            };
            let Some(hit) = tree.hit(press.at) else {
                return;
            };
            if gesture == Gesture::Click && tree.nodes.get(&hit).is_some_and(|n| n.editable) {
                tree.set_focus(Some(hit));
            }
            let target = tree.handler_for(hit, gesture);
            if let Some((id, _)) = &target {
                if !tree.flag(*id, ENABLED) {
                    return;
                }
                if gesture == Gesture::Click {
                    tree.record(*id, "clicked()", &[]);
                }
            }
            target
        };
        self.run(target);
    }

    fn key_press(&self, key: Key) {
        let target = {
            let mut tree = self.lock();
            if let Key::Modifier(m) = key {
                if !tree.modifiers.contains(&m) {
                    tree.modifiers.push(m);
                }
                return;
            }
            let combo = canonical_combo(&tree.modifiers, key);
            let focus = tree.focus;
            if let Some(handler) = tree.shortcuts.get(&combo).cloned() {
                Some((focus.unwrap_or_default(), handler))
            } else {
                let chorded = tree
                    .modifiers
                    .iter()
                    .any(|m| matches!(m, Modifier::Ctrl | Modifier::Alt | Modifier::Super));
                let Some(focus) = focus.filter(|f| tree.nodes.get(f).is_some_and(|n| n.editable))
                else {
                    return;
                };
                if chorded {
                    return;
                }
                let edited = match key {
                    Key::Char(c) => {
                        edit_text(&mut tree, focus, |t| t.push(c));
                        true
                    }
                    Key::Backspace => {
                        edit_text(&mut tree, focus, |t| {
                            t.pop();
                        });
                        true
                    }
                    _ => false,
                };
                if edited {
                    tree.handler_for(focus, Gesture::Edit)
                } else if key == Key::Enter {
                    tree.handler_for(focus, Gesture::Submit)
                } else {
                    None
                }
            }
        };
        self.run(target);
    }
}

fn edit_text(tree: &mut Tree, id: NodeId, f: impl FnOnce(&mut String)) {
    if let Some(node) = tree.nodes.get_mut(&id) {
        let mut text = node
            .props
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        f(&mut text);
        node.props.insert("text".into(), Value::String(text));
    }
}

impl Transport for MockApp {
    fn select(&self, scope: Option<NodeId>, query: &Query) -> PilotResult<Vec<NodeRef>> {
        let tree = self.lock();
        tree.find(scope, query)?
            .into_iter()
            .map(|id| {
                Ok(NodeRef {
                    id,
                    type_name: tree.node(id)?.type_name.clone(),
                })
            })
            .collect()
    }

    fn get_property(&self, id: NodeId, name: &str) -> PilotResult<Value> {
        let tree = self.lock();
        tree.node(id)?;
        if name == VISIBLE {
            return Ok(Value::Bool(tree.effectively_visible(id)));
        }
        tree.node(id)?
            .props
            .get(name)
            .cloned()
            .ok_or_else(|| PilotError::UnknownProperty {
                id,
                name: name.to_string(),
            })
    }

    fn set_property(&self, id: NodeId, name: &str, value: Value) -> PilotResult<()> {
        let hook = {
            let mut tree = self.lock();
            let node = tree.nodes.get_mut(&id).ok_or(PilotError::StaleNode { id })?;
            node.props.insert(name.to_string(), value.clone());
            tree.writes.get(&(id, name.to_string())).cloned()
        };
        if let Some(hook) = hook {
            hook(self, id, &value);
        }
        Ok(())
    }

    fn watch_signal(&self, id: NodeId, signal: &str) -> PilotResult<WatchId> {
        let mut tree = self.lock();
        tree.node(id)?;
        let watch = tree.next_watch;
        tree.next_watch += 1;
        tree.watches.insert(
            watch,
            Watch {
                node: id,
                signal: signal.to_string(),
                emissions: Vec::new(),
            },
        );
        Ok(watch)
    }

    fn signal_emissions(&self, watch: WatchId) -> PilotResult<Vec<Vec<Value>>> {
        self.lock()
            .watches
            .get(&watch)
            .map(|w| w.emissions.clone())
            .ok_or_else(|| PilotError::transport(format!("unknown signal watch {watch}")))
    }

    fn is_alive(&self, id: NodeId) -> PilotResult<bool> {
        Ok(self.exists(id))
    }
}

impl InputBackend for MockApp {
    fn dispatch(&self, event: &InputEvent) -> PilotResult<()> {
        match *event {
            InputEvent::PointerMove { x, y } => self.lock().pointer = Point::new(x, y),
            InputEvent::PointerPress { x, y, button } => {
                let mut tree = self.lock();
                tree.pointer = Point::new(x, y);
                tree.press = Some(Press {
                    at: Point::new(x, y),
                    button,
                    since: Instant::now(),
                });
            }
            InputEvent::PointerRelease { x, y, button } => {
                self.pointer_release(Point::new(x, y), button);
            }
            InputEvent::KeyPress { key } => self.key_press(key),
            InputEvent::KeyRelease { key } => {
                if let Key::Modifier(m) = key {
                    self.lock().modifiers.retain(|held| *held != m);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn click_at(app: &MockApp, x: i32, y: i32) {
        app.dispatch(&InputEvent::PointerPress {
            x,
            y,
            button: MouseButton::Left,
        })
        .unwrap();
        app.dispatch(&InputEvent::PointerRelease {
            x,
            y,
            button: MouseButton::Left,
        })
        .unwrap();
    }

    fn key(app: &MockApp, key: Key) {
        app.dispatch(&InputEvent::KeyPress { key }).unwrap();
        app.dispatch(&InputEvent::KeyRelease { key }).unwrap();
    }

    mod tree_tests {
        use super::*;

        #[test]
        fn test_select_in_discovery_order() {
            let app = MockApp::new();
            let root = app.insert(None, NodeSpec::new("Window"));
            let a = app.insert(Some(root), NodeSpec::new("Button").name("a"));
            let inner = app.insert(Some(a), NodeSpec::new("Button").name("inner"));
            let b = app.insert(Some(root), NodeSpec::new("Button").name("b"));
            let found: Vec<_> = app
                .select(None, &Query::of_type("Button"))
                .unwrap()
                .into_iter()
                .map(|n| n.id)
                .collect();
            assert_eq!(found, vec![a, inner, b]);
        }

        #[test]
        fn test_scope_excludes_itself() {
            let app = MockApp::new();
            let panel = app.insert(None, NodeSpec::new("Panel"));
            app.insert(Some(panel), NodeSpec::new("Panel"));
            assert_eq!(app.select(Some(panel), &Query::of_type("Panel")).unwrap().len(), 1);
        }

        #[test]
        fn test_stale_scope() {
            let app = MockApp::new();
            let panel = app.insert(None, NodeSpec::new("Panel"));
            app.destroy(panel);
            assert!(matches!(
                app.select(Some(panel), &Query::any()),
                Err(PilotError::StaleNode { id }) if id == panel
            ));
        }

        #[test]
        fn test_visibility_inherits_from_ancestors() {
            let app = MockApp::new();
            let sheet = app.insert(None, NodeSpec::new("Sheet").visible(false));
            let label = app.insert(Some(sheet), NodeSpec::new("Label"));
            assert_eq!(app.get_property(label, VISIBLE).unwrap(), Value::Bool(false));
            assert!(app.select(None, &Query::of_type("Label").visible()).unwrap().is_empty());
            app.set(sheet, VISIBLE, true);
            assert_eq!(app.select(None, &Query::of_type("Label").visible()).unwrap().len(), 1);
        }

        #[test]
        fn test_ids_never_reused() {
            let app = MockApp::new();
            let first = app.insert(None, NodeSpec::new("Dialog"));
            app.destroy(first);
            let second = app.insert(None, NodeSpec::new("Dialog"));
            assert_ne!(first, second);
            assert!(!app.is_alive(first).unwrap());
        }

        #[test]
        fn test_destroy_removes_subtree() {
            let app = MockApp::new();
            let dialog = app.insert(None, NodeSpec::new("Dialog"));
            let ok = app.insert(Some(dialog), NodeSpec::new("Button"));
            app.destroy(dialog);
            assert!(!app.exists(ok));
            assert!(matches!(
                app.get_property(ok, "text"),
                Err(PilotError::StaleNode { .. })
            ));
        }
    }

    mod input_tests {
        use super::*;

        #[test]
        fn test_click_hits_topmost_and_bubbles() {
            let app = MockApp::new();
            let window = app.insert(None, NodeSpec::new("Window").rect(Rect::new(0, 0, 100, 100)));
            let button = app.insert(
                Some(window),
                NodeSpec::new("Button").rect(Rect::new(10, 10, 20, 20)),
            );
            app.insert(
                Some(button),
                NodeSpec::new("Icon").rect(Rect::new(12, 12, 5, 5)),
            );
            let hits = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&hits);
            app.on(button, Gesture::Click, move |_, id| {
                assert_eq!(id, button);
                counter.fetch_add(1, Ordering::SeqCst);
            });
            click_at(&app, 14, 14);
            click_at(&app, 50, 50);
            assert_eq!(hits.load(Ordering::SeqCst), 1);
        }

        #[test]
        fn test_disabled_node_ignores_clicks() {
            let app = MockApp::new();
            let button = app.insert(
                None,
                NodeSpec::new("Button")
                    .rect(Rect::new(0, 0, 10, 10))
                    .enabled(false),
            );
            let hits = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&hits);
            app.on(button, Gesture::Click, move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
            click_at(&app, 5, 5);
            assert_eq!(hits.load(Ordering::SeqCst), 0);
        }

        #[test]
        fn test_handler_may_destroy_its_node() {
            let app = MockApp::new();
            let dialog = app.insert(None, NodeSpec::new("Dialog").rect(Rect::new(0, 0, 10, 10)));
            app.on(dialog, Gesture::Click, |app, id| app.destroy(id));
            click_at(&app, 5, 5);
            assert!(!app.exists(dialog));
        }

        #[test]
        fn test_long_press_threshold() {
            let app = MockApp::new();
            app.set_long_press_threshold(Duration::from_millis(20));
            let view = app.insert(None, NodeSpec::new("View").rect(Rect::new(0, 0, 10, 10)));
            let long = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&long);
            app.on(view, Gesture::LongPress, move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
            app.dispatch(&InputEvent::PointerPress {
                x: 5,
                y: 5,
                button: MouseButton::Left,
            })
            .unwrap();
            std::thread::sleep(Duration::from_millis(40));
            app.dispatch(&InputEvent::PointerRelease {
                x: 5,
                y: 5,
                button: MouseButton::Left,
            })
            .unwrap();
            click_at(&app, 5, 5);
            assert_eq!(long.load(Ordering::SeqCst), 1);
        }

        #[test]
        fn test_typing_goes_to_focused_field() {
            let app = MockApp::new();
            let field = app.insert(
                None,
                NodeSpec::new("TextField")
                    .rect(Rect::new(0, 0, 50, 10))
                    .editable(),
            );
            let submitted = Arc::new(Mutex::new(String::new()));
            let sink = Arc::clone(&submitted);
            app.on(field, Gesture::Submit, move |app, id| {
                *sink.lock().unwrap() = app.get_string(id, "text");
            });
            key(&app, Key::Char('x'));
            assert_eq!(app.get_string(field, "text"), "");
            click_at(&app, 5, 5);
            assert_eq!(app.get(field, "activeFocus"), Some(Value::Bool(true)));
            for c in "abc".chars() {
                key(&app, Key::Char(c));
            }
            key(&app, Key::Backspace);
            key(&app, Key::Enter);
            assert_eq!(*submitted.lock().unwrap(), "ab");
        }

        #[test]
        fn test_shortcut_with_modifiers() {
            let app = MockApp::new();
            let hits = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&hits);
            app.on_shortcut("Ctrl+Shift+o", move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
            for m in [Modifier::Shift, Modifier::Ctrl] {
                app.dispatch(&InputEvent::KeyPress {
                    key: Key::Modifier(m),
                })
                .unwrap();
            }
            key(&app, Key::Char('O'));
            for m in [Modifier::Ctrl, Modifier::Shift] {
                app.dispatch(&InputEvent::KeyRelease {
                    key: Key::Modifier(m),
                })
                .unwrap();
            }
            key(&app, Key::Char('o'));
            assert_eq!(hits.load(Ordering::SeqCst), 1);
        }
    }

    mod signal_tests {
        use super::*;

        #[test]
        fn test_watch_records_after_subscription_only() {
            let app = MockApp::new();
            let view = app.insert(None, NodeSpec::new("WebView"));
            app.emit(view, "loaded()", vec![]);
            let watch = app.watch_signal(view, "urlChanged(QString)").unwrap();
            app.emit(view, "urlChanged(QString)", vec![Value::from("http://a/")]);
            app.emit(view, "loaded()", vec![]);
            assert_eq!(
                app.signal_emissions(watch).unwrap(),
                vec![vec![Value::from("http://a/")]]
            );
        }

        #[test]
        fn test_click_emits_clicked() {
            let app = MockApp::new();
            let button = app.insert(None, NodeSpec::new("Button").rect(Rect::new(0, 0, 10, 10)));
            app.on(button, Gesture::Click, |_, _| {});
            let watch = app.watch_signal(button, "clicked()").unwrap();
            click_at(&app, 1, 1);
            assert_eq!(app.signal_emissions(watch).unwrap().len(), 1);
        }

        #[test]
        fn test_transport_write_runs_hook() {
            let app = MockApp::new();
            let view = app.insert(None, NodeSpec::new("WebView").prop("url", ""));
            let seen = Arc::new(Mutex::new(Vec::new()));
            let log = Arc::clone(&seen);
            app.on_write(view, "url", move |_, _, value| {
                log.lock().unwrap().push(value.clone());
            });
            app.set(view, "url", "http://in-process/");
            app.set_property(view, "url", Value::from("http://a/")).unwrap();
            assert_eq!(*seen.lock().unwrap(), vec![Value::from("http://a/")]);
            assert_eq!(app.get(view, "url"), Some(Value::from("http://a/")));
        }
    }
}
