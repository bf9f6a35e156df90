//! Route table for the fixture server.

use super::pages;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use base64::Engine as _;
use reqwest::Url;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Query string as a flat map
type Params = Query<HashMap<String, String>>;

/// Target of the `/with-intent-link` page
pub const INTENT_LINK: &str =
    "intent://maps.google.es/maps?ie=utf-8&gl=es#Intent;scheme=http;package=com.google.android.apps.maps;end";

/// Suggestion table: search term to suggestions
pub type Suggestions = HashMap<String, Vec<String>>;

/// Shared state behind every handler
#[derive(Debug, Clone)]
pub struct FixtureState {
    pub(super) suggestions: Arc<RwLock<Suggestions>>,
    pub(super) manifest_color: Arc<str>,
}

impl FixtureState {
    /// Fresh state owning its own tables
    #[must_use]
    pub fn new(suggestions: Suggestions, manifest_color: &str) -> Self {
        Self {
            suggestions: Arc::new(RwLock::new(suggestions)),
            manifest_color: Arc::from(manifest_color),
        }
    }

    fn suggestions_for(&self, term: &str) -> Option<Vec<String>> {
        match self.suggestions.read() {
            Ok(table) => table.get(term).cloned(),
            Err(poisoned) => poisoned.into_inner().get(term).cloned(),
        }
    }
}

/// Build the router
pub fn router(state: FixtureState) -> Router {
    Router::new()
        .route("/", get(|| async { Html(pages::basic_content()) }))
        .route("/ping", get(|| async { "pong" }))
        .route("/loremipsum", get(|| async { Html(pages::lorem_ipsum()) }))
        .route("/aleaiactaest", get(|| async { Html(pages::alea_iacta_est()) }))
        .route("/test1", get(|| async { Html(pages::numbered_test(1)) }))
        .route("/test2", get(|| async { Html(pages::numbered_test(2)) }))
        .route("/wait/{seconds}", get(wait))
        .route("/clickanywherethenwait/{seconds}", get(click_then_wait))
        .route(
            "/blanktargetlink",
            get(|| async { Html(pages::full_page_link("blank target link", "/aleaiactaest", true)) }),
        )
        .route(
            "/fulliframewithblanktargetlink",
            get(|| async { Html(pages::full_iframe("/blanktargetlink")) }),
        )
        .route("/link", get(|| async { Html(pages::link()) }))
        .route("/js-alert-dialog", get(|| async { Html(pages::alert_dialog()) }))
        .route("/js-confirm-dialog", get(|| async { Html(pages::confirm_dialog()) }))
        .route("/js-prompt-dialog", get(|| async { Html(pages::prompt_dialog()) }))
        .route(
            "/js-before-unload-dialog",
            get(|| async { Html(pages::before_unload_dialog()) }),
        )
        .route("/basicauth", get(basic_auth))
        .route("/media/{kind}", get(media))
        .route("/geolocation", get(|| async { Html(pages::geolocation()) }))
        .route("/show-user-agent", get(|| async { Html(pages::show_user_agent()) }))
        .route("/image", get(|| async { Html(pages::image()) }))
        .route("/imagelink", get(|| async { Html(pages::image_link()) }))
        .route("/textarea", get(|| async { Html(pages::textarea()) }))
        .route(
            "/with-external-link",
            get(|| async {
                Html(pages::full_page_link("external link", "https://www.ubuntu.com/", false))
            }),
        )
        .route(
            "/with-intent-link",
            get(|| async { Html(pages::full_page_link("intent link", INTENT_LINK, false)) }),
        )
        .route(
            "/open-close-content",
            get(|| async {
                Html(pages::full_page_link("open close content", "/open-close-content", true))
            }),
        )
        .route("/local-browse-link-chain/{n}", get(link_chain))
        .route("/theme-color/", get(theme_color))
        .route("/theme-color/manifest.json", get(theme_color_manifest))
        .route("/downloadpdf", get(|| async { download("application/pdf") }))
        .route(
            "/downloadpdfgenericmime",
            get(|| async { download("application/octet-stream") }),
        )
        .route("/tab/{n}", get(tab))
        .route("/findinpage", get(|| async { Html(pages::find_in_page()) }))
        .route("/redirect-to-saml/", get(redirect_to_saml))
        .route("/suggest", get(suggest))
        .fallback(not_found)
        .with_state(state)
}

async fn not_found(uri: Uri) -> Response {
    tracing::debug!(path = uri.path(), "no fixture route");
    (StatusCode::NOT_FOUND, Html(pages::not_found(uri.path()))).into_response()
}

fn missing(what: &str) -> Response {
    (StatusCode::NOT_FOUND, Html(pages::not_found(what))).into_response()
}

fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

async fn wait(Path(seconds): Path<String>) -> Response {
    let Ok(seconds) = seconds.parse::<u64>() else {
        return missing(&format!("/wait/{seconds}"));
    };
    tokio::time::sleep(Duration::from_secs(seconds)).await;
    Html(pages::waited(seconds)).into_response()
}

async fn click_then_wait(Path(seconds): Path<String>) -> Response {
    let Ok(seconds) = seconds.parse::<u64>() else {
        return missing(&format!("/clickanywherethenwait/{seconds}"));
    };
    Html(pages::full_page_link(
        "click anywhere",
        &format!("/wait/{seconds}"),
        false,
    ))
    .into_response()
}

fn credentials_match(headers: &HeaderMap) -> bool {
    let expected = format!("{}:{}", pages::BASIC_AUTH_USER, pages::BASIC_AUTH_PASSWORD);
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
        .and_then(|encoded| base64::engine::general_purpose::STANDARD.decode(encoded.trim()).ok())
        .and_then(|decoded| String::from_utf8(decoded).ok())
        .is_some_and(|given| given == expected)
}

async fn basic_auth(headers: HeaderMap) -> Response {
    if credentials_match(&headers) {
        return Html(pages::authenticated()).into_response();
    }
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, r#"Basic realm="webpilot""#)],
        Html(pages::unauthorized()),
    )
        .into_response()
}

async fn media(Path(kind): Path<String>) -> Response {
    let (audio, video) = match kind.as_str() {
        "a" => (true, false),
        "v" => (false, true),
        "av" => (true, true),
        _ => return missing(&format!("/media/{kind}")),
    };
    Html(pages::media_access(audio, video)).into_response()
}

/// Path plus query of a link inside the chain
fn chain_href(n: u32, color_url_part: Option<&str>) -> String {
    let Ok(mut url) = Url::parse(&format!("http://fixture/local-browse-link-chain/{n}")) else {
        return format!("/local-browse-link-chain/{n}");
    };
    if let Some(part) = color_url_part {
        url.query_pairs_mut().append_pair("color_url_part", part);
    }
    match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_string(),
    }
}

async fn link_chain(Path(n): Path<String>, Query(params): Params) -> Response {
    let Ok(n) = n.parse::<u32>() else {
        return missing(&format!("/local-browse-link-chain/{n}"));
    };
    let part = params.get("color_url_part").map(String::as_str);
    let next = match (n, part) {
        (0, Some(part)) => part.to_string(),
        (0, None) => "/aleaiactaest".to_string(),
        (n, part) => chain_href(n - 1, part),
    };
    Html(pages::full_page_link(&format!("link chain {n}"), &next, false)).into_response()
}

async fn theme_color(Query(params): Params) -> Html<String> {
    let manifest = params.get("manifest").is_some_and(|v| v == "true");
    Html(pages::theme_color(
        params.get("color").map(String::as_str),
        manifest,
        params.get("delaycolorupdate").map(String::as_str),
    ))
}

async fn theme_color_manifest(State(state): State<FixtureState>) -> Response {
    (
        [(header::CONTENT_TYPE, "application/manifest+json")],
        pages::theme_color_manifest(&state.manifest_color),
    )
        .into_response()
}

/// Smallest well-formed PDF
const PDF: &[u8] = b"%PDF-1.4\n1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n\
2 0 obj << /Type /Pages /Kids [] /Count 0 >> endobj\n\
trailer << /Root 1 0 R >>\n%%EOF\n";

fn download(mime: &'static str) -> Response {
    (
        [
            (header::CONTENT_TYPE, mime),
            (header::CONTENT_DISPOSITION, r#"attachment; filename="test.pdf""#),
        ],
        PDF,
    )
        .into_response()
}

async fn tab(Path(n): Path<String>) -> Response {
    match n.parse::<u32>() {
        Ok(n) => Html(pages::tab(n)).into_response(),
        Err(_) => missing(&format!("/tab/{n}")),
    }
}

async fn redirect_to_saml(Query(params): Params) -> Response {
    let loopcount = params
        .get("loopcount")
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(0);
    if loopcount == 0 {
        return Html(pages::basic_content()).into_response();
    }
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("loopcount", &(loopcount - 1).to_string());
    if let Some(saml) = params.get("SAMLRequest") {
        query.append_pair("SAMLRequest", saml);
    }
    let location = format!("/redirect-to-saml/?{}", query.finish());
    tracing::debug!(loopcount, %location, "saml redirect");
    found(&location)
}

async fn suggest(State(state): State<FixtureState>, Query(params): Params) -> Response {
    let Some(term) = params.get("q") else {
        return missing("/suggest");
    };
    match state.suggestions_for(term) {
        Some(list) => Json(serde_json::json!([term, list])).into_response(),
        None => missing(&format!("/suggest?q={term}")),
    }
}
