//! Property values read from the live object tree.
//!
//! The introspection endpoint is dynamically typed: every node is a bag of
//! named properties discovered at runtime. [`Value`] is the wire
//! representation, and [`FromValue`] converts it into the static type an
//! accessor asked for, failing with a `TypeMismatch` instead of guessing.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

// =============================================================================
// GEOMETRY
// =============================================================================

/// A point in global screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: i32,
    /// Y coordinate
    pub y: i32,
}

impl Point {
    /// Create a new point
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A rectangle in global screen coordinates (a node's `globalRect`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub x: i32,
    /// Top edge
    pub y: i32,
    /// Width
    pub width: i32,
    /// Height
    pub height: i32,
}

impl Rect {
    /// Create a new rectangle
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Center point, rounded down like integer pixel math
    #[must_use]
    pub const fn center(&self) -> Point {
        Point::new(self.x + self.width / 2, self.y + self.height / 2)
    }

    /// Whether the point lies inside (right and bottom edges exclusive)
    #[must_use]
    pub const fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.y >= self.y
            && point.x < self.x + self.width
            && point.y < self.y + self.height
    }
}

// =============================================================================
// COLOR
// =============================================================================

/// An RGBA color as rendered by the toolkit (`Color(255, 0, 0, 255)`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    /// Red
    pub r: u8,
    /// Green
    pub g: u8,
    /// Blue
    pub b: u8,
    /// Alpha
    pub a: u8,
}

impl Color {
    /// Opaque white
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    /// Opaque black
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    /// Create an opaque color
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Create a color with alpha
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse a CSS-ish color: `#rgb`, `#rrggbb`, `#rrggbbaa`, a handful of
    /// named colors, or the toolkit's own `Color(r, g, b, a)` rendering.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let s = input.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return Self::parse_hex(hex);
        }
        if let Some(caps) = color_literal_re().and_then(|re| re.captures(s)) {
            let channel = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u8>().ok());
            return Some(Self::rgba(channel(1)?, channel(2)?, channel(3)?, channel(4)?));
        }
        match s.to_ascii_lowercase().as_str() {
            "red" => Some(Self::rgb(255, 0, 0)),
            "green" => Some(Self::rgb(0, 128, 0)),
            "lime" => Some(Self::rgb(0, 255, 0)),
            "blue" => Some(Self::rgb(0, 0, 255)),
            "white" => Some(Self::WHITE),
            "black" => Some(Self::BLACK),
            "yellow" => Some(Self::rgb(255, 255, 0)),
            "gray" | "grey" => Some(Self::rgb(128, 128, 128)),
            "transparent" => Some(Self::rgba(0, 0, 0, 0)),
            // Bare hex without '#', as passed in fixture query strings
            other => Self::parse_hex(other),
        }
    }

    fn parse_hex(hex: &str) -> Option<Self> {
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        match hex.len() {
            3 => {
                let nibble = |i: usize| {
                    u8::from_str_radix(&hex[i..=i], 16)
                        .ok()
                        .map(|n| n * 17)
                };
                Some(Self::rgb(nibble(0)?, nibble(1)?, nibble(2)?))
            }
            6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }

    /// Perceived luminance in `0.0..=1.0`
    #[must_use]
    pub fn luminance(&self) -> f64 {
        (0.299 * f64::from(self.r) + 0.587 * f64::from(self.g) + 0.114 * f64::from(self.b))
            / 255.0
    }

    /// Foreground that stays readable on this background
    #[must_use]
    pub fn contrasting_foreground(&self) -> Self {
        if self.luminance() > 0.6 {
            Self::rgb(51, 51, 51)
        } else {
            Self::WHITE
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Color({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

fn color_literal_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^Color\(\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})\s*\)$").ok()
    })
    .as_ref()
}

// =============================================================================
// VALUE
// =============================================================================

/// A dynamically typed property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Absent / null
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// String
    String(String),
    /// Color
    Color(Color),
    /// Rectangle
    Rect(Rect),
    /// Point
    Point(Point),
    /// List of values (signal arguments, list models)
    List(Vec<Value>),
}

impl Value {
    /// Name of the value's kind, used in type-mismatch errors
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Color(_) => "color",
            Self::Rect(_) => "rect",
            Self::Point(_) => "point",
            Self::List(_) => "list",
        }
    }

    /// Borrow as a string slice
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Read as bool
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Read as integer (floats with no fractional part convert)
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            // Booleans render the way the object-tree query syntax spells them
            Self::Bool(true) => write!(f, "True"),
            Self::Bool(false) => write!(f, "False"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Color(c) => write!(f, "{c}"),
            Self::Rect(r) => write!(f, "Rect({}, {}, {}, {})", r.x, r.y, r.width, r.height),
            Self::Point(p) => write!(f, "Point({}, {})", p.x, p.y),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Color> for Value {
    fn from(v: Color) -> Self {
        Self::Color(v)
    }
}

impl From<Rect> for Value {
    fn from(v: Rect) -> Self {
        Self::Rect(v)
    }
}

impl From<Point> for Value {
    fn from(v: Point) -> Self {
        Self::Point(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::List(v)
    }
}

// =============================================================================
// TYPED CONVERSION
// =============================================================================

/// Conversion from a dynamic [`Value`] into a static type
pub trait FromValue: Sized {
    /// Kind name reported when conversion fails
    const EXPECTED: &'static str;

    /// Convert, or `None` when the value has the wrong shape
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for Value {
    const EXPECTED: &'static str = "any";

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromValue for bool {
    const EXPECTED: &'static str = "bool";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromValue for i64 {
    const EXPECTED: &'static str = "int";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_i64()
    }
}

impl FromValue for i32 {
    const EXPECTED: &'static str = "int";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_i64().and_then(|i| i32::try_from(i).ok())
    }
}

impl FromValue for usize {
    const EXPECTED: &'static str = "unsigned int";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_i64().and_then(|i| usize::try_from(i).ok())
    }
}

impl FromValue for f64 {
    const EXPECTED: &'static str = "float";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl FromValue for String {
    const EXPECTED: &'static str = "string";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromValue for Color {
    const EXPECTED: &'static str = "color";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Color(c) => Some(*c),
            Value::String(s) => Self::parse(s),
            _ => None,
        }
    }
}

impl FromValue for Rect {
    const EXPECTED: &'static str = "rect";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Rect(r) => Some(*r),
            _ => None,
        }
    }
}

impl FromValue for Point {
    const EXPECTED: &'static str = "point";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Point(p) => Some(*p),
            _ => None,
        }
    }
}

impl FromValue for Vec<Value> {
    const EXPECTED: &'static str = "list";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::List(items) => Some(items.clone()),
            _ => None,
        }
    }
}

impl FromValue for Vec<String> {
    const EXPECTED: &'static str = "list of strings";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::List(items) => items.iter().map(String::from_value).collect(),
            _ => None,
        }
    }
}
