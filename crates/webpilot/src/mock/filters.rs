//! Intent and scheme filtering for the simulated web app container.
//!
//! A web app may ship `local-intent-filter.js` (one function) and
//! `local-scheme-filter.js` (a JSON object mapping a scheme to a function
//! source). The container rewrites non-web URIs through them before
//! handing them off. Without a JavaScript engine, the filter sources are
//! recognized in the shape web apps write them:
//!
//! ```text
//! (function(r) { return { 'scheme': 'https', 'host': 'maps.test.com', 'uri': r.uri }; })
//! (function(r) { return { 'scheme': 'https', 'path': '?to=' + encodeURIComponent(r.path) }; })
//! (function(intent) { return intent; })
//! ```
//!
//! Values are string literals, fields of the argument, `+` concatenations
//! and `encodeURIComponent(...)`. Anything else is an invalid filter.

use regex::Regex;
use url::Url;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Object passed to and returned from a filter function
pub type Fields = BTreeMap<String, String>;

const INTENT_SCHEME: &str = "intent";

// =============================================================================
// INTENT URIS
// =============================================================================

/// Parts of an `intent://host/path#Intent;key=value;...;end` URI
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IntentUri {
    /// Target scheme (`scheme=`)
    pub scheme: String,
    /// Host, without surrounding slashes
    pub host: String,
    /// Path plus query; slashes trimmed when a query is present
    pub uri_path: String,
    /// `package=`
    pub package: String,
    /// `action=`
    pub action: String,
    /// `category=`
    pub category: String,
    /// `component=`
    pub component: String,
}

impl IntentUri {
    /// Parse an intent URI. Anything that is not `intent:` with an
    /// `Intent...;end` fragment yields the empty description.
    #[must_use]
    pub fn parse(uri: &str) -> Self {
        let Ok(url) = Url::parse(uri.trim()) else {
            return Self::default();
        };
        let fragment = url.fragment().unwrap_or_default();
        if url.scheme() != INTENT_SCHEME
            || !fragment.starts_with("Intent")
            || !fragment.ends_with(";end")
        {
            return Self::default();
        }

        let mut uri_path = url.path().to_string();
        if let Some(query) = url.query() {
            uri_path = format!("{uri_path}?{query}")
                .trim_matches('/')
                .to_string();
        }
        let mut intent = Self {
            host: url.host_str().unwrap_or_default().trim_matches('/').to_string(),
            uri_path,
            ..Self::default()
        };
        for info in fragment.split(';') {
            let Some((key, value)) = info.split_once('=') else {
                continue;
            };
            let slot = match key {
                "scheme" => &mut intent.scheme,
                "package" => &mut intent.package,
                "action" => &mut intent.action,
                "category" => &mut intent.category,
                "component" => &mut intent.component,
                _ => continue,
            };
            *slot = value.to_string();
        }
        intent
    }

    /// Whether the URI names anything to dispatch
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.uri_path.is_empty() || !self.package.is_empty()
    }
}

/// `encodeURIComponent`
#[must_use]
pub fn encode_uri_component(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for byte in text.bytes() {
        if byte.is_ascii_alphanumeric() || b"-_.!~*'()".contains(&byte) {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

/// `scheme://host/path`, or `scheme:path` without a host
fn compose(fields: &Fields, path_key: &str) -> Option<String> {
    let scheme = fields.get("scheme").filter(|s| !s.is_empty())?;
    let host = fields.get("host").map(String::as_str).unwrap_or_default();
    let path = fields.get(path_key).map(String::as_str).unwrap_or_default();
    if host.is_empty() {
        Some(format!("{scheme}:{path}"))
    } else {
        Some(format!("{scheme}://{host}/{}", path.trim_start_matches('/')))
    }
}

// =============================================================================
// FILTER FUNCTIONS
// =============================================================================

/// One operand of a `+` concatenation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    /// Quoted string
    Literal(String),
    /// `param.field`
    Field(String),
    /// `encodeURIComponent(...)`
    Encode(Vec<Term>),
}

/// A recognized filter function
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterFn {
    /// `function(x) { return x; }`
    Identity,
    /// `function(x) { return { key: expr, ... }; }`
    Object(Vec<(String, Vec<Term>)>),
}

fn function_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?s)^\s*\(?\s*function\s*\(\s*([A-Za-z_$][\w$]*)\s*\)\s*\{\s*return\s+(.*?)\s*;?\s*\}\s*\)?\s*;?\s*$",
        )
        .ok()
    })
    .as_ref()
}

/// Split on `separator` outside quotes, parentheses and braces
fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0_i32;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(' | '{' | '[') => depth += 1,
            (None, ')' | '}' | ']') => depth -= 1,
            (None, c) if c == separator && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

fn unquote(text: &str) -> Option<&str> {
    let text = text.trim();
    ['\'', '"'].into_iter().find_map(|q| {
        text.strip_prefix(q)
            .and_then(|rest| rest.strip_suffix(q))
            .filter(|inner| !inner.contains(q))
    })
}

fn parse_expr(text: &str, param: &str) -> Option<Vec<Term>> {
    split_top_level(text, '+')
        .into_iter()
        .map(|term| parse_term(term.trim(), param))
        .collect()
}

fn parse_term(term: &str, param: &str) -> Option<Term> {
    if let Some(literal) = unquote(term) {
        return Some(Term::Literal(literal.to_string()));
    }
    if let Some(inner) = term
        .strip_prefix("encodeURIComponent")
        .map(str::trim_start)
        .and_then(|rest| rest.strip_prefix('('))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return parse_expr(inner, param).map(Term::Encode);
    }
    let field = term.strip_prefix(param)?.strip_prefix('.')?;
    (!field.is_empty() && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
        .then(|| Term::Field(field.to_string()))
}

fn eval(terms: &[Term], input: &Fields) -> Option<String> {
    let mut out = String::new();
    for term in terms {
        match term {
            Term::Literal(text) => out.push_str(text),
            Term::Field(name) => out.push_str(input.get(name)?),
            Term::Encode(inner) => out.push_str(&encode_uri_component(&eval(inner, input)?)),
        }
    }
    Some(out)
}

impl FilterFn {
    /// Recognize a filter function source
    #[must_use]
    pub fn parse(source: &str) -> Option<Self> {
        let caps = function_re()?.captures(source)?;
        let param = caps.get(1)?.as_str();
        let body = caps.get(2)?.as_str().trim();
        if body == param {
            return Some(Self::Identity);
        }
        let inner = body.strip_prefix('{')?.strip_suffix('}')?;
        let mut entries = Vec::new();
        for entry in split_top_level(inner, ',') {
            if entry.trim().is_empty() {
                continue;
            }
            let (key, value) = match split_top_level(entry, ':').as_slice() {
                [key, value] => (*key, *value),
                _ => return None,
            };
            let key = unquote(key).unwrap_or_else(|| key.trim());
            entries.push((key.to_string(), parse_expr(value, param)?));
        }
        Some(Self::Object(entries))
    }

    /// Call the function. `None` when it reads a field the input lacks.
    #[must_use]
    pub fn apply(&self, input: &Fields) -> Option<Fields> {
        match self {
            Self::Identity => Some(input.clone()),
            Self::Object(entries) => entries
                .iter()
                .map(|(key, terms)| Some((key.clone(), eval(terms, input)?)))
                .collect(),
        }
    }
}

// =============================================================================
// INTENT FILTER
// =============================================================================

/// Rewrites intent URIs; the argument carries `scheme`, `uri` and `host`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentFilter {
    function: FilterFn,
}

impl Default for IntentFilter {
    fn default() -> Self {
        Self {
            function: FilterFn::Identity,
        }
    }
}

impl IntentFilter {
    /// Filter from a function source; unrecognized sources pass through
    #[must_use]
    pub fn from_source(source: &str) -> Self {
        match FilterFn::parse(source) {
            Some(function) => Self { function },
            None => {
                tracing::warn!("invalid intent filter, using pass-through");
                Self::default()
            }
        }
    }

    /// Rewrite `uri`; `None` when it is not a dispatchable intent
    #[must_use]
    pub fn apply(&self, uri: &str) -> Option<String> {
        let intent = IntentUri::parse(uri);
        if !intent.is_valid() {
            return None;
        }
        let input = Fields::from([
            ("scheme".to_string(), intent.scheme),
            ("uri".to_string(), intent.uri_path),
            ("host".to_string(), intent.host),
        ]);
        let output = self
            .function
            .apply(&input)
            .filter(|r| ["scheme", "uri", "host"].iter().all(|k| r.contains_key(*k)))
            .unwrap_or(input);
        compose(&output, "uri")
    }
}

// =============================================================================
// SCHEME FILTER
// =============================================================================

/// Per-scheme rewrites; the argument carries `scheme`, `path` and `host`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SchemeFilter {
    per_scheme: BTreeMap<String, FilterFn>,
}

impl SchemeFilter {
    /// Parse the JSON file contents. Non-string values are skipped; a
    /// string that is not a function invalidates the whole file.
    #[must_use]
    pub fn parse(contents: &str) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_str(contents).ok()?;
        let serde_json::Value::Object(map) = value else {
            return None;
        };
        let mut per_scheme = BTreeMap::new();
        for (scheme, source) in map {
            if let serde_json::Value::String(source) = source {
                per_scheme.insert(scheme, FilterFn::parse(&source)?);
            }
        }
        Some(Self { per_scheme })
    }

    /// Whether a function is registered for `scheme`
    #[must_use]
    pub fn has_filter_for(&self, scheme: &str) -> bool {
        self.per_scheme.contains_key(scheme)
    }

    /// Rewrite `uri`. Web URIs are returned unchanged.
    #[must_use]
    pub fn apply(&self, uri: &str) -> Option<String> {
        let url = Url::parse(uri.trim()).ok()?;
        if matches!(url.scheme(), "http" | "https") {
            return Some(uri.to_string());
        }
        let input = if url.scheme() == INTENT_SCHEME {
            let intent = IntentUri::parse(uri);
            Fields::from([
                ("scheme".to_string(), intent.scheme),
                ("path".to_string(), intent.uri_path),
                ("host".to_string(), intent.host),
            ])
        } else {
            Fields::from([
                ("scheme".to_string(), url.scheme().to_string()),
                ("path".to_string(), url.path().to_string()),
                ("host".to_string(), url.host_str().unwrap_or_default().to_string()),
            ])
        };
        let output = match self.per_scheme.get(url.scheme()) {
            Some(function) => function.apply(&input)?,
            None => input,
        };
        compose(&output, "path")
    }
}

// =============================================================================
// BOTH
// =============================================================================

/// The filters a container runs with
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UriFilters {
    /// Intent filter (pass-through unless the local one is enabled)
    pub intent: IntentFilter,
    /// Scheme filter
    pub scheme: SchemeFilter,
}

impl UriFilters {
    /// Load from a web app directory. The local intent filter is only read
    /// when `use_local_intent_filter` is set.
    #[must_use]
    pub fn load(dir: Option<&Path>, use_local_intent_filter: bool) -> Self {
        let Some(dir) = dir else {
            return Self::default();
        };
        let read = |name: &str| fs::read_to_string(dir.join(name)).ok();
        let intent = use_local_intent_filter
            .then(|| read(crate::profile::LOCAL_INTENT_FILTER))
            .flatten()
            .map(|source| IntentFilter::from_source(&source))
            .unwrap_or_default();
        let scheme = read(crate::profile::LOCAL_SCHEME_FILTER)
            .and_then(|contents| {
                let parsed = SchemeFilter::parse(&contents);
                if parsed.is_none() {
                    tracing::warn!(dir = %dir.display(), "invalid scheme filter file, ignoring it");
                }
                parsed
            })
            .unwrap_or_default();
        Self { intent, scheme }
    }

    /// Where a clicked link is handed off: intents through the intent
    /// filter, other non-web schemes through the scheme filter
    #[must_use]
    pub fn dispatch_target(&self, href: &str) -> String {
        let filtered = if href.starts_with("intent:") {
            self.intent.apply(href)
        } else {
            self.scheme.apply(href)
        };
        filtered.unwrap_or_else(|| href.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    const MAPS_INTENT: &str =
        "intent://maps.google.es/maps?ie=utf-8&gl=es#Intent;scheme=http;package=com.google.android.apps.maps;end";

    mod intent_uri_tests {
        use super::*;

        #[test]
        fn test_host_only() {
            let intent = IntentUri::parse(
                "intent://scan/#Intent;component=com;scheme=zxing;category=BROWSABLE;action=com;package=com.google.zxing.client.android;end",
            );
            assert_eq!(intent.scheme, "zxing");
            assert_eq!(intent.package, "com.google.zxing.client.android");
            assert_eq!(intent.uri_path, "/");
            assert_eq!(intent.host, "scan");
            assert_eq!(intent.category, "BROWSABLE");
            assert!(intent.is_valid());
        }

        #[test]
        fn test_query_trims_slashes() {
            let intent = IntentUri::parse(
                "intent://host/my/long/path?a=1/#Intent;scheme=zxing;package=p;end",
            );
            assert_eq!(intent.host, "host");
            assert_eq!(intent.uri_path, "my/long/path?a=1");
        }

        #[test]
        fn test_without_host_or_path() {
            let intent = IntentUri::parse(
                "intent://#Intent;scheme=trusper.referrertests;package=trusper.referrertests;end",
            );
            assert_eq!(intent.host, "");
            assert_eq!(intent.uri_path, "");
            assert_eq!(intent.package, "trusper.referrertests");
            assert!(intent.is_valid());
        }

        #[test]
        fn test_misspelled_fragment_is_empty() {
            let intent = IntentUri::parse("intent:///#Inttent;scheme=zxing;package=p;end");
            assert_eq!(intent, IntentUri::default());
            assert!(!intent.is_valid());
            assert!(!IntentUri::parse("http://example.org/#Intent;end").is_valid());
        }
    }

    mod filter_fn_tests {
        use super::*;

        fn fields(pairs: &[(&str, &str)]) -> Fields {
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect()
        }

        #[test]
        fn test_identity() {
            assert_eq!(
                FilterFn::parse("(function(intent) { return intent; })"),
                Some(FilterFn::Identity)
            );
        }

        #[test]
        fn test_concatenation() {
            let f = FilterFn::parse(
                "(function(result) {return {'scheme': result.scheme+'custom', 'path': result.path+'custom' }; })",
            )
            .unwrap();
            let out = f
                .apply(&fields(&[("scheme", "zxing"), ("path", "/"), ("host", "scan")]))
                .unwrap();
            assert_eq!(out["scheme"], "zxingcustom");
            assert_eq!(out["path"], "/custom");
            assert!(!out.contains_key("host"));
        }

        #[test]
        fn test_encode_uri_component() {
            let f = FilterFn::parse(
                "(function(r) {   return {   'scheme': 'https',   'host': 'mail.google.com',   'path': '?to='+encodeURIComponent(r.path) }; })",
            )
            .unwrap();
            let out = f.apply(&fields(&[("path", "blabla@ubuntu.com")])).unwrap();
            assert_eq!(out["path"], "?to=blabla%40ubuntu.com");
            assert_eq!(encode_uri_component("a b&c/d~"), "a%20b%26c%2Fd~");
        }

        #[test]
        fn test_rejects_non_functions() {
            assert_eq!(FilterFn::parse("1"), None);
            assert_eq!(FilterFn::parse("(function(r) { return r.path.toUpperCase(); })"), None);
            assert_eq!(FilterFn::parse("(function(r) { return { 'scheme': other.x }; })"), None);
        }

        #[test]
        fn test_missing_field_fails_the_call() {
            let f = FilterFn::parse("(function(r) { return { 'scheme': r.nope }; })").unwrap();
            assert_eq!(f.apply(&Fields::new()), None);
        }
    }

    mod intent_filter_tests {
        use super::*;

        #[test]
        fn test_default_rebuilds_target_url() {
            assert_eq!(
                IntentFilter::default().apply(MAPS_INTENT).as_deref(),
                Some("http://maps.google.es/maps?ie=utf-8&gl=es")
            );
        }

        #[test]
        fn test_local_filter_rewrites_scheme_and_host() {
            let filter = IntentFilter::from_source(
                "(function(r) { return { 'scheme': 'https', 'host': 'maps.test.com', 'uri': r.uri }; })",
            );
            assert_eq!(
                filter
                    .apply("intent://www.test.com/maps?ie=utf-8&gl=es#Intent;scheme=http;package=p;end")
                    .as_deref(),
                Some("https://maps.test.com/maps?ie=utf-8&gl=es")
            );
        }

        #[test]
        fn test_incomplete_result_falls_back() {
            let filter = IntentFilter::from_source("(function(r) { return { 'scheme': 'https' }; })");
            assert_eq!(
                filter.apply(MAPS_INTENT).as_deref(),
                Some("http://maps.google.es/maps?ie=utf-8&gl=es")
            );
        }

        #[test]
        fn test_invalid_source_passes_through() {
            assert_eq!(IntentFilter::from_source("1"), IntentFilter::default());
        }

        #[test]
        fn test_not_an_intent() {
            assert_eq!(IntentFilter::default().apply("http://www.test.com/"), None);
        }
    }

    mod scheme_filter_tests {
        use super::*;

        #[test]
        fn test_default_handles_intents() {
            assert_eq!(
                SchemeFilter::default().apply(MAPS_INTENT).as_deref(),
                Some("http://maps.google.es/maps?ie=utf-8&gl=es")
            );
        }

        #[test]
        fn test_intent_entry() {
            let filter = SchemeFilter::parse(
                r#"{ "intent": "(function(r) { return { 'scheme': 'https', 'host': 'maps.test.com', 'path': r.path }; })" }"#,
            )
            .unwrap();
            assert!(filter.has_filter_for("intent"));
            assert_eq!(
                filter
                    .apply("intent://www.test.com/maps?ie=utf-8&gl=es#Intent;scheme=http;package=p;end")
                    .as_deref(),
                Some("https://maps.test.com/maps?ie=utf-8&gl=es")
            );
        }

        #[test]
        fn test_web_uris_are_untouched() {
            let filter = SchemeFilter::parse(
                r#"{ "http": "(function(r) { return { 'scheme': 'https', 'host': 'maps.test.com', 'path': r.path }; })" }"#,
            )
            .unwrap();
            let uri = "http://www.test.com/maps?ie=utf-8&gl=es";
            assert_eq!(filter.apply(uri).as_deref(), Some(uri));
        }

        #[test]
        fn test_mailto() {
            let filter = SchemeFilter::parse(
                r#"{ "mailto": "(function(r) { return { 'scheme': 'https', 'host': 'mail.google.com', 'path': '?to='+encodeURIComponent(r.path) }; })" }"#,
            )
            .unwrap();
            assert_eq!(
                filter.apply("mailto:blabla@ubuntu.com").as_deref(),
                Some("https://mail.google.com/?to=blabla%40ubuntu.com")
            );
        }

        #[test]
        fn test_file_validity() {
            assert_eq!(SchemeFilter::parse(r#"{ "intent": 1 }"#), Some(SchemeFilter::default()));
            assert_eq!(SchemeFilter::parse(r#"{ "intent": "1" }"#), None);
            assert_eq!(SchemeFilter::parse("[]"), None);
            assert_eq!(SchemeFilter::parse("not json"), None);
        }
    }

    mod loading_tests {
        use super::*;
        use crate::profile::{LOCAL_INTENT_FILTER, LOCAL_SCHEME_FILTER};
        use tempfile::TempDir;

        #[test]
        fn test_local_intent_filter_needs_flag() {
            let dir = TempDir::new().unwrap();
            fs::write(
                dir.path().join(LOCAL_INTENT_FILTER),
                "(function(r) { return { 'scheme': 'https', 'host': 'maps.test.com', 'uri': r.uri }; })",
            )
            .unwrap();
            assert_eq!(UriFilters::load(Some(dir.path()), false).intent, IntentFilter::default());
            let filters = UriFilters::load(Some(dir.path()), true);
            assert_eq!(
                filters.dispatch_target(MAPS_INTENT),
                "https://maps.test.com/maps?ie=utf-8&gl=es"
            );
        }

        #[test]
        fn test_invalid_scheme_file_is_ignored() {
            let dir = TempDir::new().unwrap();
            fs::write(dir.path().join(LOCAL_SCHEME_FILTER), r#"{ "mailto": "1" }"#).unwrap();
            let filters = UriFilters::load(Some(dir.path()), false);
            assert_eq!(filters.scheme, SchemeFilter::default());
            assert_eq!(filters.dispatch_target("mailto:a@b.c"), "mailto:a@b.c");
        }
    }
}
