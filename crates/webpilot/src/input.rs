//! Input simulation facade.
//!
//! Pointer and keyboard primitives in global screen coordinates. Node
//! addressing (`click_object`, `move_to`, `drag_object`) resolves a node's
//! `globalRect` and targets its center. Nothing here waits for the UI to
//! react; callers assert on the resulting state through the polling layer.
//!
//! Key combos use a platform-neutral `Modifier+...+Key` grammar:
//!
//! ```text
//! Ctrl+Shift+o      Alt+Left      Ctrl+L      Enter      Ctrl++
//! ```

use crate::node::UiNode;
use crate::result::{PilotError, PilotResult};
use crate::transport::InputBackend;
use crate::value::Point;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

// =============================================================================
// EVENTS
// =============================================================================

/// Mouse button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    /// Primary button (1)
    #[default]
    Left,
    /// Middle button (2)
    Middle,
    /// Secondary button (3), opens context menus on desktop
    Right,
}

impl MouseButton {
    /// Map X11-style button numbers (1, 2, 3)
    #[must_use]
    pub const fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::Left),
            2 => Some(Self::Middle),
            3 => Some(Self::Right),
            _ => None,
        }
    }
}

/// Keyboard modifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modifier {
    /// Control
    Ctrl,
    /// Shift
    Shift,
    /// Alt
    Alt,
    /// Super / Meta / Cmd
    Super,
}

impl Modifier {
    fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "ctrl" | "control" => Some(Self::Ctrl),
            "shift" => Some(Self::Shift),
            "alt" => Some(Self::Alt),
            "super" | "meta" | "cmd" | "win" => Some(Self::Super),
            _ => None,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Ctrl => "Ctrl",
            Self::Shift => "Shift",
            Self::Alt => "Alt",
            Self::Super => "Super",
        }
    }
}

/// A single key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    /// Printable character
    Char(char),
    /// Enter / Return
    Enter,
    /// Escape
    Escape,
    /// Backspace
    Backspace,
    /// Tab
    Tab,
    /// Delete
    Delete,
    /// Arrow up
    Up,
    /// Arrow down
    Down,
    /// Arrow left
    Left,
    /// Arrow right
    Right,
    /// Home
    Home,
    /// End
    End,
    /// Page up
    PageUp,
    /// Page down
    PageDown,
    /// Function key F1..F12
    F(u8),
    /// A modifier pressed as a key
    Modifier(Modifier),
}

impl Key {
    /// Parse a key name. Single characters keep their case.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let mut chars = name.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Some(Self::Char(c));
        }
        if let Some(m) = Modifier::parse(name) {
            return Some(Self::Modifier(m));
        }
        let lower = name.to_ascii_lowercase();
        let key = match lower.as_str() {
            "enter" | "return" => Self::Enter,
            "escape" | "esc" => Self::Escape,
            "backspace" => Self::Backspace,
            "tab" => Self::Tab,
            "delete" | "del" => Self::Delete,
            "space" => Self::Char(' '),
            "up" => Self::Up,
            "down" => Self::Down,
            "left" => Self::Left,
            "right" => Self::Right,
            "home" => Self::Home,
            "end" => Self::End,
            "pageup" | "page_up" | "prior" => Self::PageUp,
            "pagedown" | "page_down" | "next" => Self::PageDown,
            other => {
                let n: u8 = other.strip_prefix('f')?.parse().ok()?;
                if !(1..=12).contains(&n) {
                    return None;
                }
                Self::F(n)
            }
        };
        Some(key)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Char(' ') => f.write_str("Space"),
            Self::Char(c) => write!(f, "{c}"),
            Self::Enter => f.write_str("Enter"),
            Self::Escape => f.write_str("Escape"),
            Self::Backspace => f.write_str("Backspace"),
            Self::Tab => f.write_str("Tab"),
            Self::Delete => f.write_str("Delete"),
            Self::Up => f.write_str("Up"),
            Self::Down => f.write_str("Down"),
            Self::Left => f.write_str("Left"),
            Self::Right => f.write_str("Right"),
            Self::Home => f.write_str("Home"),
            Self::End => f.write_str("End"),
            Self::PageUp => f.write_str("PageUp"),
            Self::PageDown => f.write_str("PageDown"),
            Self::F(n) => write!(f, "F{n}"),
            Self::Modifier(m) => f.write_str(m.name()),
        }
    }
}

/// Modifiers plus one key, e.g. `Ctrl+Shift+o`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyCombo {
    /// Modifiers, in press order
    pub modifiers: Vec<Modifier>,
    /// The key pressed while modifiers are held
    pub key: Key,
}

impl KeyCombo {
    /// Parse a combo string
    pub fn parse(combo: &str) -> PilotResult<Self> {
        let invalid = || PilotError::InvalidKeyCombo {
            combo: combo.to_string(),
        };
        if combo.is_empty() {
            return Err(invalid());
        }
        let (prefix, key_name) = match combo.rsplit_once('+') {
            None => ("", combo),
            // "+" and "Ctrl++" name the plus key itself
            Some(("", "")) => ("", "+"),
            Some((head, "")) => match head.strip_suffix('+') {
                Some(prefix) if !prefix.is_empty() => (prefix, "+"),
                _ => return Err(invalid()),
            },
            Some((head, tail)) => (head, tail),
        };
        let key = Key::parse(key_name).ok_or_else(invalid)?;
        let modifiers = if prefix.is_empty() {
            Vec::new()
        } else {
            prefix
                .split('+')
                .map(|m| Modifier::parse(m.trim()).ok_or_else(invalid))
                .collect::<PilotResult<Vec<_>>>()?
        };
        Ok(Self { modifiers, key })
    }

    /// Whether the combo has the given modifier
    #[must_use]
    pub fn has(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(&modifier)
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in &self.modifiers {
            write!(f, "{}+", m.name())?;
        }
        write!(f, "{}", self.key)
    }
}

/// Low-level input event delivered to the application under test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InputEvent {
    /// Move the pointer
    PointerMove {
        /// X coordinate
        x: i32,
        /// Y coordinate
        y: i32,
    },
    /// Press a pointer button
    PointerPress {
        /// X coordinate
        x: i32,
        /// Y coordinate
        y: i32,
        /// Button
        button: MouseButton,
    },
    /// Release a pointer button
    PointerRelease {
        /// X coordinate
        x: i32,
        /// Y coordinate
        y: i32,
        /// Button
        button: MouseButton,
    },
    /// Press a key
    KeyPress {
        /// Key
        key: Key,
    },
    /// Release a key
    KeyRelease {
        /// Key
        key: Key,
    },
}

// =============================================================================
// POINTER
// =============================================================================

/// Pointing device bound to one session
pub struct Pointer {
    backend: Arc<dyn InputBackend>,
    position: Mutex<Point>,
    long_press: Duration,
    drag_steps: u32,
}

impl fmt::Debug for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pointer")
            .field("position", &self.position())
            .field("long_press", &self.long_press)
            .finish_non_exhaustive()
    }
}

impl Pointer {
    /// Create a pointer over an input backend
    #[must_use]
    pub fn new(backend: Arc<dyn InputBackend>, long_press: Duration, drag_steps: u32) -> Self {
        Self {
            backend,
            position: Mutex::new(Point::default()),
            long_press,
            drag_steps: drag_steps.max(1),
        }
    }

    fn send(&self, event: InputEvent) -> PilotResult<()> {
        tracing::debug!(?event, "pointer");
        self.backend.dispatch(&event)
    }

    /// Current pointer position
    #[must_use]
    pub fn position(&self) -> Point {
        *self.position.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move to absolute screen coordinates
    pub fn move_xy(&self, x: i32, y: i32) -> PilotResult<()> {
        self.send(InputEvent::PointerMove { x, y })?;
        *self.position.lock().unwrap_or_else(PoisonError::into_inner) = Point::new(x, y);
        Ok(())
    }

    /// Move to the center of a node
    pub fn move_to(&self, node: &UiNode) -> PilotResult<()> {
        let center = node.global_rect()?.center();
        self.move_xy(center.x, center.y)
    }

    /// Press the primary button at the current position
    pub fn press(&self) -> PilotResult<()> {
        self.press_button(MouseButton::Left)
    }

    /// Release the primary button at the current position
    pub fn release(&self) -> PilotResult<()> {
        self.release_button(MouseButton::Left)
    }

    /// Press a specific button
    pub fn press_button(&self, button: MouseButton) -> PilotResult<()> {
        let Point { x, y } = self.position();
        self.send(InputEvent::PointerPress { x, y, button })
    }

    /// Release a specific button
    pub fn release_button(&self, button: MouseButton) -> PilotResult<()> {
        let Point { x, y } = self.position();
        self.send(InputEvent::PointerRelease { x, y, button })
    }

    /// Primary click at the current position
    pub fn click(&self) -> PilotResult<()> {
        self.click_button(MouseButton::Left)
    }

    /// Click with a specific button
    pub fn click_button(&self, button: MouseButton) -> PilotResult<()> {
        self.press_button(button)?;
        self.release_button(button)
    }

    /// Move to a node's center and click it
    pub fn click_object(&self, node: &UiNode) -> PilotResult<()> {
        self.move_to(node)?;
        self.click()
    }

    /// Press, hold for the configured long-press duration, release.
    ///
    /// The hold is a calibrated sleep: touch UIs expose no signal for
    /// "long press recognized".
    pub fn long_press(&self) -> PilotResult<()> {
        self.press()?;
        std::thread::sleep(self.long_press);
        self.release()
    }

    /// Long-press a node's center
    pub fn long_press_object(&self, node: &UiNode) -> PilotResult<()> {
        self.move_to(node)?;
        self.long_press()
    }

    /// Drag from one point to another with the primary button held
    pub fn drag(&self, x0: i32, y0: i32, x1: i32, y1: i32) -> PilotResult<()> {
        self.move_xy(x0, y0)?;
        self.press()?;
        let steps = i64::from(self.drag_steps);
        for step in 1..=steps {
            let lerp = |a: i32, b: i32| {
                (i64::from(a) + (i64::from(b) - i64::from(a)) * step / steps) as i32
            };
            self.move_xy(lerp(x0, x1), lerp(y0, y1))?;
        }
        self.release()
    }

    /// Swipe gesture between two points
    pub fn swipe(&self, from: Point, to: Point) -> PilotResult<()> {
        self.drag(from.x, from.y, to.x, to.y)
    }

    /// Drag from the center of one node to the center of another
    pub fn drag_object(&self, from: &UiNode, to: &UiNode) -> PilotResult<()> {
        let a = from.global_rect()?.center();
        let b = to.global_rect()?.center();
        self.drag(a.x, a.y, b.x, b.y)
    }
}

// =============================================================================
// KEYBOARD
// =============================================================================

/// Keyboard bound to one session
pub struct Keyboard {
    backend: Arc<dyn InputBackend>,
}

impl fmt::Debug for Keyboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keyboard").finish_non_exhaustive()
    }
}

impl Keyboard {
    /// Create a keyboard over an input backend
    #[must_use]
    pub fn new(backend: Arc<dyn InputBackend>) -> Self {
        Self { backend }
    }

    fn send(&self, event: InputEvent) -> PilotResult<()> {
        tracing::debug!(?event, "keyboard");
        self.backend.dispatch(&event)
    }

    /// Press and release a combo string such as `"Ctrl+Shift+o"`
    pub fn press_key(&self, combo: &str) -> PilotResult<()> {
        self.press_combo(&KeyCombo::parse(combo)?)
    }

    /// Press modifiers, tap the key, release modifiers in reverse order
    ///
    /// Modifiers already pressed are released even when a later event
    /// fails; the first error is returned.
    pub fn press_combo(&self, combo: &KeyCombo) -> PilotResult<()> {
        let mut held = Vec::with_capacity(combo.modifiers.len());
        let mut result = Ok(());
        for m in &combo.modifiers {
            result = self.send(InputEvent::KeyPress {
                key: Key::Modifier(*m),
            });
            if result.is_err() {
                break;
            }
            held.push(*m);
        }
        if result.is_ok() {
            result = self
                .send(InputEvent::KeyPress { key: combo.key })
                .and_then(|()| self.send(InputEvent::KeyRelease { key: combo.key }));
        }
        for m in held.into_iter().rev() {
            let released = self.send(InputEvent::KeyRelease {
                key: Key::Modifier(m),
            });
            if let Err(err) = released {
                if result.is_ok() {
                    result = Err(err);
                } else {
                    tracing::warn!(%err, modifier = m.name(), "release failed");
                }
            }
        }
        result
    }

    /// Type text one character at a time; `\n` becomes Enter
    pub fn type_text(&self, text: &str) -> PilotResult<()> {
        for c in text.chars() {
            let key = if c == '\n' { Key::Enter } else { Key::Char(c) };
            self.send(InputEvent::KeyPress { key })?;
            self.send(InputEvent::KeyRelease { key })?;
        }
        Ok(())
    }
}
