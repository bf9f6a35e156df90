//! Queries against the live object tree.
//!
//! A [`Query`] is an immutable filter: optional type tag, optional object
//! name, property constraints, and visibility/enabled constraints. It is
//! sent structurally over the wire and rendered in an xpath-like form for
//! logs and error messages:
//!
//! ```text
//! //AddressBar[objectName="addressBar",visible=True]
//! ```
//!
//! Only the emulator layer builds queries; scenario code calls named
//! accessor methods instead.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Property name carrying a node's object name
pub const OBJECT_NAME: &str = "objectName";

/// Property name carrying a node's visibility
pub const VISIBLE: &str = "visible";

/// Property name carrying a node's enabled state
pub const ENABLED: &str = "enabled";

/// Immutable node filter
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Query {
    /// Type tag (class name), any type when `None`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// Required object name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_name: Option<String>,
    /// Required property values
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Value>,
    /// Required visibility
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    /// Required enabled state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl Query {
    /// Match any node
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Match nodes of the given type
    #[must_use]
    pub fn of_type(type_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            ..Self::default()
        }
    }

    /// Match nodes with the given object name, any type
    #[must_use]
    pub fn named(object_name: impl Into<String>) -> Self {
        Self::any().with_name(object_name)
    }

    /// Replace the type tag
    #[must_use]
    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Require an object name
    #[must_use]
    pub fn with_name(mut self, object_name: impl Into<String>) -> Self {
        self.object_name = Some(object_name.into());
        self
    }

    /// Require a property value
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Require visibility
    #[must_use]
    pub const fn with_visible(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }

    /// Require `visible=True`
    #[must_use]
    pub const fn visible(self) -> Self {
        self.with_visible(true)
    }

    /// Require `enabled=True`
    #[must_use]
    pub const fn enabled(mut self) -> Self {
        self.enabled = Some(true);
        self
    }

    /// Evaluate against a node's type and property snapshot.
    ///
    /// Missing `visible`/`enabled` properties count as `true`; missing
    /// constrained properties never match.
    #[must_use]
    pub fn matches(&self, type_name: &str, properties: &BTreeMap<String, Value>) -> bool {
        if let Some(expected) = &self.type_name {
            if expected != type_name {
                return false;
            }
        }
        if let Some(expected) = &self.object_name {
            match properties.get(OBJECT_NAME).and_then(Value::as_str) {
                Some(actual) if actual == expected => {}
                _ => return false,
            }
        }
        let flag = |name: &str| {
            properties
                .get(name)
                .and_then(Value::as_bool)
                .unwrap_or(true)
        };
        if self.visible.is_some_and(|v| flag(VISIBLE) != v) {
            return false;
        }
        if self.enabled.is_some_and(|v| flag(ENABLED) != v) {
            return false;
        }
        self.properties
            .iter()
            .all(|(name, expected)| properties.get(name) == Some(expected))
    }

    /// Render the xpath-like selector string
    #[must_use]
    pub fn to_selector(&self) -> String {
        let mut constraints = Vec::new();
        if let Some(name) = &self.object_name {
            constraints.push(format!("{OBJECT_NAME}={name:?}"));
        }
        for (name, value) in &self.properties {
            constraints.push(format!("{name}={value}"));
        }
        if let Some(visible) = self.visible {
            constraints.push(format!("{VISIBLE}={}", Value::Bool(visible)));
        }
        if let Some(enabled) = self.enabled {
            constraints.push(format!("{ENABLED}={}", Value::Bool(enabled)));
        }
        let type_name = self.type_name.as_deref().unwrap_or("*");
        if constraints.is_empty() {
            format!("//{type_name}")
        } else {
            format!("//{type_name}[{}]", constraints.join(","))
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_selector())
    }
}
