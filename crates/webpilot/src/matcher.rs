//! Matchers for `eventually` assertions.
//!
//! A [`Matcher`] decides whether an observed value is acceptable and
//! describes its expectation for timeout reports:
//!
//! ```ignore
//! eventually(|| webview.title(), equals("OK"))?;
//! eventually(|| menu.title_label().text(), starts_with("data:image/png;base64,"))?;
//! eventually(|| watcher.was_emitted(), is_true())?;
//! ```

use std::fmt::Debug;

/// Acceptance test for an observed value
pub trait Matcher<T: ?Sized> {
    /// Whether `actual` satisfies the expectation
    fn matches(&self, actual: &T) -> bool;

    /// Human-readable expectation
    fn describe(&self) -> String;
}

// =============================================================================
// EQUALITY AND ORDERING
// =============================================================================

/// Equal to an expected value
#[derive(Debug, Clone)]
pub struct Equals<V>(V);

/// Match values equal to `expected`
#[must_use]
pub const fn equals<V>(expected: V) -> Equals<V> {
    Equals(expected)
}

/// Match `true`
#[must_use]
pub const fn is_true() -> Equals<bool> {
    Equals(true)
}

/// Match `false`
#[must_use]
pub const fn is_false() -> Equals<bool> {
    Equals(false)
}

impl<T, V> Matcher<T> for Equals<V>
where
    T: PartialEq<V> + ?Sized,
    V: Debug,
{
    fn matches(&self, actual: &T) -> bool {
        *actual == self.0
    }

    fn describe(&self) -> String {
        format!("equals {:?}", self.0)
    }
}

/// Strictly greater than a bound
#[derive(Debug, Clone)]
pub struct GreaterThan<V>(V);

/// Match values greater than `bound`
#[must_use]
pub const fn greater_than<V>(bound: V) -> GreaterThan<V> {
    GreaterThan(bound)
}

impl<T, V> Matcher<T> for GreaterThan<V>
where
    T: PartialOrd<V>,
    V: Debug,
{
    fn matches(&self, actual: &T) -> bool {
        *actual > self.0
    }

    fn describe(&self) -> String {
        format!("greater than {:?}", self.0)
    }
}

/// Strictly less than a bound
#[derive(Debug, Clone)]
pub struct LessThan<V>(V);

/// Match values less than `bound`
#[must_use]
pub const fn less_than<V>(bound: V) -> LessThan<V> {
    LessThan(bound)
}

impl<T, V> Matcher<T> for LessThan<V>
where
    T: PartialOrd<V>,
    V: Debug,
{
    fn matches(&self, actual: &T) -> bool {
        *actual < self.0
    }

    fn describe(&self) -> String {
        format!("less than {:?}", self.0)
    }
}

// =============================================================================
// STRINGS
// =============================================================================

/// String containment and affix checks
#[derive(Debug, Clone)]
pub enum TextMatch {
    /// Contains substring
    Contains(String),
    /// Starts with prefix
    StartsWith(String),
    /// Ends with suffix
    EndsWith(String),
}

/// Match strings containing `needle`
#[must_use]
pub fn contains(needle: impl Into<String>) -> TextMatch {
    TextMatch::Contains(needle.into())
}

/// Match strings starting with `prefix`
#[must_use]
pub fn starts_with(prefix: impl Into<String>) -> TextMatch {
    TextMatch::StartsWith(prefix.into())
}

/// Match strings ending with `suffix`
#[must_use]
pub fn ends_with(suffix: impl Into<String>) -> TextMatch {
    TextMatch::EndsWith(suffix.into())
}

impl Matcher<String> for TextMatch {
    fn matches(&self, actual: &String) -> bool {
        match self {
            Self::Contains(s) => actual.contains(s.as_str()),
            Self::StartsWith(s) => actual.starts_with(s.as_str()),
            Self::EndsWith(s) => actual.ends_with(s.as_str()),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Contains(s) => format!("contains {s:?}"),
            Self::StartsWith(s) => format!("starts with {s:?}"),
            Self::EndsWith(s) => format!("ends with {s:?}"),
        }
    }
}

// =============================================================================
// COLLECTIONS
// =============================================================================

/// Collection length check
#[derive(Debug, Clone, Copy)]
pub struct HasLength(usize);

/// Match collections with exactly `len` items
#[must_use]
pub const fn has_length(len: usize) -> HasLength {
    HasLength(len)
}

impl<X> Matcher<Vec<X>> for HasLength {
    fn matches(&self, actual: &Vec<X>) -> bool {
        actual.len() == self.0
    }

    fn describe(&self) -> String {
        format!("has length {}", self.0)
    }
}

// =============================================================================
// COMBINATORS
// =============================================================================

/// Negation of another matcher
#[derive(Debug, Clone)]
pub struct Not<M>(M);

/// Match values the inner matcher rejects
#[must_use]
pub const fn not<M>(inner: M) -> Not<M> {
    Not(inner)
}

impl<T: ?Sized, M: Matcher<T>> Matcher<T> for Not<M> {
    fn matches(&self, actual: &T) -> bool {
        !self.0.matches(actual)
    }

    fn describe(&self) -> String {
        format!("not {}", self.0.describe())
    }
}

/// Arbitrary predicate with a description
pub struct Satisfies<F> {
    description: String,
    predicate: F,
}

impl<F> std::fmt::Debug for Satisfies<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Satisfies")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Match values accepted by `predicate`
pub fn satisfies<T: ?Sized, F: Fn(&T) -> bool>(
    description: impl Into<String>,
    predicate: F,
) -> Satisfies<F> {
    Satisfies {
        description: description.into(),
        predicate,
    }
}

impl<T: ?Sized, F: Fn(&T) -> bool> Matcher<T> for Satisfies<F> {
    fn matches(&self, actual: &T) -> bool {
        (self.predicate)(actual)
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}
