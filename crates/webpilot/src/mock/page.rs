//! Page loading and page-script interpretation for the simulated browser.
//!
//! The simulated browser does not run JavaScript. It fetches a page through
//! a [`PageLoader`] and recognizes a small vocabulary of markers in the
//! source (title, `theme-color`, `alert`/`confirm`/`prompt`,
//! `onbeforeunload`, media and location requests, links, images, text
//! areas) that the fixture pages are written in.

use crate::result::{PilotError, PilotResult};
use crate::value::Color;
use base64::Engine as _;
use regex::{Captures, Regex};
use reqwest::header::{LOCATION, USER_AGENT};
use reqwest::Url;
use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

/// Redirect hops followed before giving up
pub const MAX_REDIRECTS: u32 = 16;

/// Prefix of the `data:` URIs images are rendered as
pub const IMAGE_DATA_URI_PREFIX: &str = "data:image/png;base64,";

// =============================================================================
// LOADING
// =============================================================================

/// One page fetch
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageRequest {
    /// Absolute URL
    pub url: String,
    /// `User-Agent` override
    pub user_agent: Option<String>,
    /// HTTP Basic credentials
    pub credentials: Option<(String, String)>,
}

impl PageRequest {
    /// Plain GET
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

/// A fetched page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// HTTP status of the final response
    pub status: u16,
    /// URL after redirects
    pub url: String,
    /// Response body
    pub body: String,
    /// Redirect hops followed
    pub redirects: u32,
}

impl Page {
    /// 200 page with a body, no redirects
    #[must_use]
    pub fn ok(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status: 200,
            url: url.into(),
            body: body.into(),
            redirects: 0,
        }
    }
}

/// Source of page content
pub trait PageLoader: Send + Sync {
    /// Fetch a page. Non-2xx statuses are returned, not errors.
    fn load(&self, request: &PageRequest) -> PilotResult<Page>;
}

impl<F> PageLoader for F
where
    F: Fn(&PageRequest) -> PilotResult<Page> + Send + Sync,
{
    fn load(&self, request: &PageRequest) -> PilotResult<Page> {
        self(request)
    }
}

/// `MAP <host pattern>[:port] <target host:port>` rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRule {
    host: String,
    port: Option<u16>,
    target_host: String,
    target_port: Option<u16>,
}

fn split_port(s: &str) -> (String, Option<u16>) {
    match s.rsplit_once(':') {
        Some((host, port)) => match port.parse() {
            Ok(port) => (host.to_string(), Some(port)),
            Err(_) => (s.to_string(), None),
        },
        None => (s.to_string(), None),
    }
}

impl HostRule {
    /// Parse a comma-separated rule list; malformed rules are skipped
    #[must_use]
    pub fn parse_list(rules: &str) -> Vec<Self> {
        rules
            .split(',')
            .filter_map(|rule| {
                let mut words = rule.split_whitespace();
                if !words.next()?.eq_ignore_ascii_case("MAP") {
                    return None;
                }
                let (host, port) = split_port(words.next()?);
                let (target_host, target_port) = split_port(words.next()?);
                Some(Self {
                    host,
                    port,
                    target_host,
                    target_port,
                })
            })
            .collect()
    }

    /// Whether the rule covers `url`. `*.example.com` also covers the bare
    /// domain.
    #[must_use]
    pub fn matches(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host_ok = match self.host.strip_prefix("*.") {
            Some(domain) => host == domain || host.ends_with(&format!(".{domain}")),
            None => self.host == "*" || host == self.host,
        };
        host_ok && self.port.map_or(true, |p| url.port_or_known_default() == Some(p))
    }

    fn apply(&self, url: &Url) -> Url {
        let mut mapped = url.clone();
        if mapped.set_host(Some(&self.target_host)).is_ok() {
            let _ = mapped.set_port(self.target_port);
        }
        mapped
    }
}

/// Loads pages over HTTP with reqwest, applying host mapping rules and
/// following redirects by hand so the reported URL keeps the logical host
pub struct HttpPageLoader {
    client: reqwest::blocking::Client,
    rules: Vec<HostRule>,
}

impl fmt::Debug for HttpPageLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpPageLoader")
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

impl HttpPageLoader {
    /// Loader with no host mapping
    pub fn new() -> PilotResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| PilotError::transport(format!("http client: {e}")))?;
        Ok(Self {
            client,
            rules: Vec::new(),
        })
    }

    /// Add host mapping rules
    #[must_use]
    pub fn with_rules(mut self, rules: Vec<HostRule>) -> Self {
        self.rules.extend(rules);
        self
    }

    fn physical(&self, url: &Url) -> Url {
        self.rules
            .iter()
            .find(|rule| rule.matches(url))
            .map_or_else(|| url.clone(), |rule| rule.apply(url))
    }
}

impl PageLoader for HttpPageLoader {
    fn load(&self, request: &PageRequest) -> PilotResult<Page> {
        let mut logical = Url::parse(&request.url)
            .map_err(|e| PilotError::transport(format!("bad url {}: {e}", request.url)))?;
        let mut redirects = 0;
        loop {
            let mut builder = self.client.get(self.physical(&logical));
            if let Some(agent) = &request.user_agent {
                builder = builder.header(USER_AGENT, agent);
            }
            if let Some((user, password)) = &request.credentials {
                builder = builder.basic_auth(user, Some(password));
            }
            let response = builder
                .send()
                .map_err(|e| PilotError::transport(format!("GET {logical}: {e}")))?;
            let status = response.status();
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            if let (true, Some(location)) = (status.is_redirection(), location) {
                if redirects >= MAX_REDIRECTS {
                    return Err(PilotError::transport(format!(
                        "too many redirects loading {}",
                        request.url
                    )));
                }
                logical = logical
                    .join(&location)
                    .map_err(|e| PilotError::transport(format!("bad redirect {location}: {e}")))?;
                redirects += 1;
                tracing::debug!(to = %logical, redirects, "following redirect");
                continue;
            }
            let body = response
                .text()
                .map_err(|e| PilotError::transport(format!("read {logical}: {e}")))?;
            return Ok(Page {
                status: status.as_u16(),
                url: logical.to_string(),
                body,
                redirects,
            });
        }
    }
}

/// Resolve `href` against `base`
#[must_use]
pub fn resolve(base: &str, href: &str) -> String {
    Url::parse(base)
        .and_then(|b| b.join(href))
        .map_or_else(|_| href.to_string(), |u| u.to_string())
}

// =============================================================================
// PAGE SCRIPT
// =============================================================================

/// What the page does in response to a dialog or permission answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    /// `window.location = "..."`
    Navigate(String),
    /// `document.title = "..."`
    SetTitle(String),
}

/// JavaScript dialog opened on load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsDialog {
    /// `alert(message)`
    Alert {
        /// Message
        message: String,
    },
    /// `if (confirm(message)) {..} else {..}`
    Confirm {
        /// Message
        message: String,
        /// Reaction to OK
        on_ok: Option<Reaction>,
        /// Reaction to Cancel
        on_cancel: Option<Reaction>,
    },
    /// `prompt(message, default)`; OK sets the title to the input
    Prompt {
        /// Message
        message: String,
        /// Prefilled input
        default: String,
        /// Title set on Cancel
        cancel_title: String,
    },
}

/// Permission asked for on load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionKind {
    /// Camera and/or microphone
    Media,
    /// Location
    Geolocation,
}

/// A permission request and the page's reactions to the answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRequest {
    /// What is asked for
    pub kind: PermissionKind,
    /// Reaction to Allow
    pub on_allow: Option<Reaction>,
    /// Reaction to Deny
    pub on_deny: Option<Reaction>,
}

/// What is under the pointer when a context menu opens
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ContentKind {
    /// Plain text
    #[default]
    Text,
    /// A link
    Link {
        /// Absolute target
        href: String,
    },
    /// An image
    Image {
        /// Absolute source
        src: String,
    },
    /// An image inside a link
    ImageLink {
        /// Absolute source
        src: String,
        /// Absolute target
        href: String,
    },
    /// An editable field
    Editable,
}

const LINK_ACTIONS: &[&str] = &[
    "openLinkInNewTabContextualAction",
    "openLinkInNewBackgroundTabContextualAction",
    "bookmarkLinkContextualAction",
    "copyLinkContextualAction",
];

const IMAGE_ACTIONS: &[&str] = &[
    "OpenImageInNewTabContextualAction",
    "CopyImageContextualAction",
    "SaveImageContextualAction",
];

const EDIT_ACTIONS: &[&str] = &[
    "UndoContextualAction",
    "RedoContextualAction",
    "CutContextualAction",
    "CopyContextualAction",
    "PasteContextualAction",
    "EraseContextualAction",
    "SelectAllContextualAction",
];

const TEXT_ACTIONS: &[&str] = &["CopyContextualAction", "SelectAllContextualAction"];

impl ContentKind {
    /// Context menu actions, top to bottom
    #[must_use]
    pub fn actions(&self, touch: bool) -> Vec<&'static str> {
        let mut actions = match self {
            Self::Text => TEXT_ACTIONS.to_vec(),
            Self::Editable => EDIT_ACTIONS.to_vec(),
            Self::Link { .. } => LINK_ACTIONS.to_vec(),
            Self::Image { .. } => IMAGE_ACTIONS.to_vec(),
            Self::ImageLink { .. } => [LINK_ACTIONS, IMAGE_ACTIONS].concat(),
        };
        if touch && matches!(self, Self::Link { .. } | Self::ImageLink { .. }) {
            actions.push("ShareLinkContextualAction");
        }
        actions
    }

    /// Menu header: the image as a `data:` URI, else the link target.
    /// `None` hides the header.
    #[must_use]
    pub fn title(&self) -> Option<String> {
        match self {
            Self::Image { src } | Self::ImageLink { src, .. } => Some(image_data_uri(src)),
            Self::Link { href } => Some(href.clone()),
            Self::Text | Self::Editable => None,
        }
    }

    /// Link target, if any
    #[must_use]
    pub fn link(&self) -> Option<&str> {
        match self {
            Self::Link { href } | Self::ImageLink { href, .. } => Some(href),
            _ => None,
        }
    }
}

/// Render an image reference as a `data:` URI
#[must_use]
pub fn image_data_uri(src: &str) -> String {
    format!(
        "{IMAGE_DATA_URI_PREFIX}{}",
        base64::engine::general_purpose::STANDARD.encode(src.as_bytes())
    )
}

/// A link covering the whole page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    /// Absolute target
    pub href: String,
    /// `target="_blank"`
    pub new_window: bool,
}

/// Behaviors recognized in a page's source
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageScript {
    /// `<title>`
    pub title: Option<String>,
    /// `<meta name="theme-color">`
    pub theme_color: Option<Color>,
    /// `<link rel="manifest">`, absolute
    pub manifest: Option<String>,
    /// Theme color set later by script, with its delay in milliseconds
    pub delayed_color: Option<(Color, u64)>,
    /// Dialog opened on load
    pub dialog: Option<JsDialog>,
    /// Whether leaving the page asks for confirmation
    pub before_unload: bool,
    /// Permission requested on load
    pub permission: Option<PermissionRequest>,
    /// Whether the title shows `navigator.userAgent`
    pub shows_user_agent: bool,
    /// Content the context menu acts on
    pub content: ContentKind,
    /// Whole-page link
    pub full_page_link: Option<PageLink>,
    /// Framed document, absolute
    pub iframe: Option<String>,
    /// Visible text
    pub text: String,
}

fn cached(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

macro_rules! pattern {
    ($name:ident, $re:literal) => {
        fn $name() -> Option<&'static Regex> {
            static RE: OnceLock<Option<Regex>> = OnceLock::new();
            cached(&RE, $re)
        }
    };
}

pattern!(title_re, r"(?is)<title>(.*?)</title>");
pattern!(theme_re, r#"(?i)<meta\s+name=["']theme-color["']\s+content=["']([^"']+)["']"#);
pattern!(manifest_re, r#"(?i)<link\s+rel=["']manifest["']\s+href=["']([^"']+)["']"#);
pattern!(
    delayed_color_re,
    r#"(?s)setAttribute\(\s*["']content["']\s*,\s*["']([^"']+)["']\s*\)\s*;?\s*\}\s*,\s*(\d+)\s*\)"#
);
pattern!(alert_re, r#"\balert\(\s*["']([^"']*)["']\s*\)"#);
pattern!(
    confirm_re,
    r#"(?s)if\s*\(\s*confirm\(\s*["']([^"']*)["']\s*\)\s*\)\s*\{(.*?)\}\s*else\s*\{(.*?)\}"#
);
pattern!(
    prompt_re,
    r#"\bprompt\(\s*["']([^"']*)["']\s*(?:,\s*["']([^"']*)["']\s*)?\)"#
);
pattern!(prompt_cancel_re, r#"===\s*null\s*\)\s*\?\s*["']([^"']*)["']"#);
pattern!(
    permission_re,
    r"(?s)(getUserMedia|getCurrentPosition)\(.*?function\s*\(\)\s*\{(.*?)\}\s*,\s*function\s*\(\)\s*\{(.*?)\}"
);
pattern!(location_re, r#"window\.location\s*=\s*["']([^"']+)["']"#);
pattern!(set_title_re, r#"document\.title\s*=\s*["']([^"']*)["']"#);
pattern!(
    image_link_re,
    r#"(?is)<a\s+[^>]*href=["']([^"']+)["'][^>]*>\s*<img\s+[^>]*src=["']([^"']+)["']"#
);
pattern!(image_re, r#"(?i)<img\s+[^>]*src=["']([^"']+)["']"#);
pattern!(link_re, r#"(?i)<a\s+[^>]*href=["']([^"']+)["']"#);
pattern!(
    full_page_link_re,
    r#"(?is)<a\s+href=["']([^"']+)["'](\s+target=["']_blank["'])?\s*>\s*<div\s+style=["']height:\s*100%"#
);
pattern!(iframe_re, r#"(?i)<iframe\s+[^>]*src=["']([^"']+)["']"#);
pattern!(
    hidden_re,
    r"(?is)<script[^>]*>.*?</script>|<style[^>]*>.*?</style>|<title[^>]*>.*?</title>"
);
pattern!(tag_re, r"<[^>]+>");

fn capture<'h>(re: Option<&'static Regex>, haystack: &'h str) -> Option<Captures<'h>> {
    re.and_then(|re| re.captures(haystack))
}

fn group(caps: &Captures<'_>, i: usize) -> Option<String> {
    caps.get(i).map(|m| m.as_str().to_string())
}

fn reaction(body: &str) -> Option<Reaction> {
    if let Some(caps) = capture(location_re(), body) {
        return group(&caps, 1).map(Reaction::Navigate);
    }
    capture(set_title_re(), body)
        .and_then(|caps| group(&caps, 1))
        .map(Reaction::SetTitle)
}

fn resolve_reaction(base: &str, reaction: Option<Reaction>) -> Option<Reaction> {
    reaction.map(|r| match r {
        Reaction::Navigate(href) => Reaction::Navigate(resolve(base, &href)),
        other => other,
    })
}

impl PageScript {
    /// Recognize behaviors in `body`, resolving relative URLs against `url`
    #[must_use]
    pub fn parse(url: &str, body: &str) -> Self {
        let mut script = Self {
            title: capture(title_re(), body)
                .and_then(|c| group(&c, 1))
                .map(|t| t.trim().to_string()),
            theme_color: capture(theme_re(), body)
                .and_then(|c| c.get(1).and_then(|m| Color::parse(m.as_str()))),
            manifest: capture(manifest_re(), body)
                .and_then(|c| group(&c, 1))
                .map(|href| resolve(url, &href)),
            delayed_color: capture(delayed_color_re(), body).and_then(|c| {
                let color = Color::parse(c.get(1)?.as_str())?;
                let delay = c.get(2)?.as_str().parse().ok()?;
                Some((color, delay))
            }),
            before_unload: body.contains("onbeforeunload"),
            shows_user_agent: body.contains("navigator.userAgent"),
            iframe: capture(iframe_re(), body)
                .and_then(|c| group(&c, 1))
                .map(|src| resolve(url, &src)),
            text: visible_text(body),
            ..Self::default()
        };
        script.dialog = Self::parse_dialog(url, body);
        script.permission = capture(permission_re(), body).map(|c| PermissionRequest {
            kind: if c.get(1).is_some_and(|m| m.as_str() == "getUserMedia") {
                PermissionKind::Media
            } else {
                PermissionKind::Geolocation
            },
            on_allow: resolve_reaction(url, c.get(2).and_then(|m| reaction(m.as_str()))),
            on_deny: resolve_reaction(url, c.get(3).and_then(|m| reaction(m.as_str()))),
        });
        script.full_page_link = capture(full_page_link_re(), body).and_then(|c| {
            Some(PageLink {
                href: resolve(url, c.get(1)?.as_str()),
                new_window: c.get(2).is_some(),
            })
        });
        script.content = Self::parse_content(url, body);
        script
    }

    fn parse_dialog(url: &str, body: &str) -> Option<JsDialog> {
        if let Some(c) = capture(confirm_re(), body) {
            return Some(JsDialog::Confirm {
                message: group(&c, 1)?,
                on_ok: resolve_reaction(url, c.get(2).and_then(|m| reaction(m.as_str()))),
                on_cancel: resolve_reaction(url, c.get(3).and_then(|m| reaction(m.as_str()))),
            });
        }
        if let Some(c) = capture(prompt_re(), body) {
            return Some(JsDialog::Prompt {
                message: group(&c, 1)?,
                default: group(&c, 2).unwrap_or_default(),
                cancel_title: capture(prompt_cancel_re(), body)
                    .and_then(|c| group(&c, 1))
                    .unwrap_or_else(|| "null".to_string()),
            });
        }
        capture(alert_re(), body).and_then(|c| {
            Some(JsDialog::Alert {
                message: group(&c, 1)?,
            })
        })
    }

    fn parse_content(url: &str, body: &str) -> ContentKind {
        if let Some(c) = capture(image_link_re(), body) {
            if let (Some(href), Some(src)) = (c.get(1), c.get(2)) {
                return ContentKind::ImageLink {
                    src: resolve(url, src.as_str()),
                    href: resolve(url, href.as_str()),
                };
            }
        }
        if let Some(src) = capture(image_re(), body).and_then(|c| group(&c, 1)) {
            return ContentKind::Image {
                src: resolve(url, &src),
            };
        }
        if body.to_ascii_lowercase().contains("<textarea") {
            return ContentKind::Editable;
        }
        if let Some(href) = capture(link_re(), body).and_then(|c| group(&c, 1)) {
            return ContentKind::Link {
                href: resolve(url, &href),
            };
        }
        ContentKind::Text
    }
}

/// Text a reader would see, whitespace collapsed
#[must_use]
pub fn visible_text(body: &str) -> String {
    let Some((hidden, tags)) = hidden_re().zip(tag_re()) else {
        return String::new();
    };
    let stripped = hidden.replace_all(body, " ");
    let stripped = tags.replace_all(&stripped, " ");
    stripped
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Case-insensitive, non-overlapping occurrences of `term`
#[must_use]
pub fn count_matches(text: &str, term: &str) -> u32 {
    if term.is_empty() {
        return 0;
    }
    let count = text
        .to_lowercase()
        .matches(term.to_lowercase().as_str())
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Read `theme_color` from a web app manifest
#[must_use]
pub fn manifest_theme_color(body: &str) -> Option<Color> {
    let manifest: serde_json::Value = serde_json::from_str(body).ok()?;
    Color::parse(manifest.get("theme_color")?.as_str()?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    const BASE: &str = "http://localhost:8000/page";

    mod script_tests {
        use super::*;

        #[test]
        fn test_title_and_theme() {
            let s = PageScript::parse(
                BASE,
                r#"<html><head><title> Hello </title><meta name="theme-color" content="red"></head></html>"#,
            );
            assert_eq!(s.title.as_deref(), Some("Hello"));
            assert_eq!(s.theme_color, Some(Color::rgb(255, 0, 0)));
        }

        #[test]
        fn test_delayed_color() {
            let body = r#"<script>setTimeout(function() {
                document.querySelector('meta[name="theme-color"]').setAttribute("content", "black");
            }, 1000);</script>"#;
            assert_eq!(
                PageScript::parse(BASE, body).delayed_color,
                Some((Color::BLACK, 1000))
            );
        }

        #[test]
        fn test_manifest_resolved() {
            let s = PageScript::parse(BASE, r#"<link rel="manifest" href="/theme-color/manifest.json">"#);
            assert_eq!(
                s.manifest.as_deref(),
                Some("http://localhost:8000/theme-color/manifest.json")
            );
            assert_eq!(
                manifest_theme_color(r##"{"theme_color": "#FF0000"}"##),
                Some(Color::rgb(255, 0, 0))
            );
        }

        #[test]
        fn test_confirm_reactions() {
            let body = r#"<script>if (confirm("Confirm Dialog")) { document.title = "OK"; } else { document.title = "CANCEL"; }</script>"#;
            assert_eq!(
                PageScript::parse(BASE, body).dialog,
                Some(JsDialog::Confirm {
                    message: "Confirm Dialog".into(),
                    on_ok: Some(Reaction::SetTitle("OK".into())),
                    on_cancel: Some(Reaction::SetTitle("CANCEL".into())),
                })
            );
        }

        #[test]
        fn test_prompt_default_and_cancel() {
            let body = r#"<script>var r = prompt("Prompt Dialog", "Default"); document.title = (r === null) ? "CANCEL" : r;</script>"#;
            assert_eq!(
                PageScript::parse(BASE, body).dialog,
                Some(JsDialog::Prompt {
                    message: "Prompt Dialog".into(),
                    default: "Default".into(),
                    cancel_title: "CANCEL".into(),
                })
            );
        }

        #[test]
        fn test_alert() {
            let s = PageScript::parse(BASE, r#"<script>alert("Alert Dialog");</script>"#);
            assert_eq!(
                s.dialog,
                Some(JsDialog::Alert {
                    message: "Alert Dialog".into()
                })
            );
        }

        #[test]
        fn test_media_permission_navigates() {
            let body = r#"<script>navigator.mediaDevices.getUserMedia({audio: true}).then(
                function() { window.location = "/test1"; },
                function() { window.location = "/test2"; });</script>"#;
            let p = PageScript::parse(BASE, body).permission.unwrap();
            assert_eq!(p.kind, PermissionKind::Media);
            assert_eq!(
                p.on_allow,
                Some(Reaction::Navigate("http://localhost:8000/test1".into()))
            );
            assert_eq!(
                p.on_deny,
                Some(Reaction::Navigate("http://localhost:8000/test2".into()))
            );
        }

        #[test]
        fn test_full_page_blank_link() {
            let body = r#"<body style="margin: 0"><a href="/aleaiactaest" target="_blank"><div style="height: 100%"></div></a></body>"#;
            let link = PageScript::parse(BASE, body).full_page_link.unwrap();
            assert!(link.new_window);
            assert_eq!(link.href, "http://localhost:8000/aleaiactaest");
        }

        #[test]
        fn test_visible_text_skips_script_and_title() {
            let text = visible_text(
                "<html><title>T</title><script>var x = 1;</script><p>Lorem &amp; <b>ipsum</b></p></html>",
            );
            assert_eq!(text, "Lorem & ipsum");
        }
    }

    mod content_tests {
        use super::*;

        #[test]
        fn test_image_title_is_data_uri() {
            let s = PageScript::parse(BASE, r#"<img src="/assets/image.png">"#);
            assert!(matches!(s.content, ContentKind::Image { .. }));
            assert!(s
                .content
                .title()
                .unwrap()
                .starts_with(IMAGE_DATA_URI_PREFIX));
        }

        #[test]
        fn test_image_link_prefers_image_title() {
            let s = PageScript::parse(BASE, r#"<a href="/test1"><img src="/i.png"></a>"#);
            assert_eq!(s.content.link(), Some("http://localhost:8000/test1"));
            assert!(s.content.title().unwrap().starts_with("data:"));
            assert!(s
                .content
                .actions(false)
                .contains(&"OpenImageInNewTabContextualAction"));
        }

        #[test]
        fn test_link_title_is_target() {
            let s = PageScript::parse(BASE, r#"<a href="/test1">link</a>"#);
            assert_eq!(s.content.title().as_deref(), Some("http://localhost:8000/test1"));
            assert!(!s.content.actions(false).contains(&"ShareLinkContextualAction"));
            assert!(s.content.actions(true).contains(&"ShareLinkContextualAction"));
        }

        #[test]
        fn test_text_and_textarea_hide_title() {
            assert_eq!(PageScript::parse(BASE, "<p>hi</p>").content.title(), None);
            let s = PageScript::parse(BASE, "<textarea></textarea>");
            assert_eq!(s.content, ContentKind::Editable);
            assert_eq!(s.content.title(), None);
        }

        #[test]
        fn test_count_matches() {
            assert_eq!(count_matches("Hello hello HELLO", "hello"), 3);
            assert_eq!(count_matches("abc", ""), 0);
        }
    }

    mod host_rule_tests {
        use super::*;

        #[test]
        fn test_wildcard_covers_bare_domain() {
            let rules = HostRule::parse_list("MAP *.test.com:80 127.0.0.1:8123");
            assert_eq!(rules.len(), 1);
            let bare = Url::parse("http://test.com/x").unwrap();
            let sub = Url::parse("http://www.test.com/").unwrap();
            let other = Url::parse("http://example.com/").unwrap();
            assert!(rules[0].matches(&bare));
            assert!(rules[0].matches(&sub));
            assert!(!rules[0].matches(&other));
            assert_eq!(rules[0].apply(&sub).as_str(), "http://127.0.0.1:8123/");
        }

        #[test]
        fn test_malformed_rules_skipped() {
            assert!(HostRule::parse_list("garbage, MAP onlyhost").is_empty());
        }

        #[test]
        fn test_closure_loader() {
            let loader = |req: &PageRequest| Ok(Page::ok(req.url.clone(), "<title>x</title>"));
            let page = loader.load(&PageRequest::get("http://a/")).unwrap();
            assert_eq!(page.status, 200);
        }
    }
}
