//! HTML served by the fixture routes.
//!
//! Pages are small and scripted in the plainest possible way so both a
//! real web engine and the simulated browser react to them identically.

/// Title used by `/` and the container's default content
pub const BASIC_CONTENT_TITLE: &str = "Some content";

/// Credentials accepted by `/basicauth`
pub const BASIC_AUTH_USER: &str = "user";
/// Password accepted by `/basicauth`
pub const BASIC_AUTH_PASSWORD: &str = "pass";

/// Word repeated on `/findinpage`
pub const FIND_IN_PAGE_TERM: &str = "hello";

/// `<html>` document with a title and body
#[must_use]
pub fn html(title: &str, body: &str) -> String {
    format!("<html><head><title>{title}</title></head><body>{body}</body></html>")
}

fn script_page(title: &str, script: &str) -> String {
    html(title, &format!("<script>{script}</script>"))
}

/// `/`
#[must_use]
pub fn basic_content() -> String {
    html(BASIC_CONTENT_TITLE, "This is some content")
}

/// `/loremipsum`
#[must_use]
pub fn lorem_ipsum() -> String {
    html("Lorem Ipsum", "<p>Lorem ipsum dolor sit amet.</p>")
}

/// `/aleaiactaest`
#[must_use]
pub fn alea_iacta_est() -> String {
    html("Alea Iacta Est", "<p>De vita Caesarum libri VIII</p>")
}

/// `/test1`, `/test2`
#[must_use]
pub fn numbered_test(n: u32) -> String {
    html(&format!("test{n}"), &format!("<p>test page {n}</p>"))
}

/// `/wait/<s>`
#[must_use]
pub fn waited(seconds: u64) -> String {
    html(
        &format!("waiting {seconds} seconds"),
        &format!("<p>this page took {seconds} seconds to load</p>"),
    )
}

/// A page whose whole surface is one link
#[must_use]
pub fn full_page_link(title: &str, href: &str, blank_target: bool) -> String {
    let target = if blank_target { r#" target="_blank""# } else { "" };
    format!(
        r#"<html><head><title>{title}</title></head><body style="margin: 0"><a href="{href}"{target}><div style="height: 100%"></div></a></body></html>"#
    )
}

/// `/fulliframewithblanktargetlink`
#[must_use]
pub fn full_iframe(src: &str) -> String {
    format!(
        r#"<html><body style="margin: 0"><iframe height="100%" width="100%" src="{src}" /></body></html>"#
    )
}

/// `/js-alert-dialog`
#[must_use]
pub fn alert_dialog() -> String {
    script_page("JS Alert", r#"alert("Alert Dialog");"#)
}

/// `/js-confirm-dialog`: OK and Cancel set different titles
#[must_use]
pub fn confirm_dialog() -> String {
    script_page(
        "JS Confirm",
        r#"if (confirm("Confirm Dialog")) { document.title = "OK"; } else { document.title = "CANCEL"; }"#,
    )
}

/// `/js-prompt-dialog`: the title becomes the answer
#[must_use]
pub fn prompt_dialog() -> String {
    script_page(
        "JS Prompt",
        r#"var r = prompt("Prompt Dialog", "Default"); document.title = (r === null) ? "CANCEL" : r;"#,
    )
}

/// `/js-before-unload-dialog`
#[must_use]
pub fn before_unload_dialog() -> String {
    script_page(
        "JS BeforeUnload",
        r#"window.onbeforeunload = function() { return "Before Unload Dialog"; };"#,
    )
}

/// `/basicauth` once authenticated
#[must_use]
pub fn authenticated() -> String {
    html("Authenticated", "<p>Basic authentication succeeded</p>")
}

/// `/basicauth` without valid credentials
#[must_use]
pub fn unauthorized() -> String {
    html("Unauthorized", "<p>Authentication required</p>")
}

/// `/media/<a|v|av>`: navigates to `/test1` when allowed, `/test2` when denied
#[must_use]
pub fn media_access(audio: bool, video: bool) -> String {
    script_page(
        "Media Access",
        &format!(
            r#"navigator.mediaDevices.getUserMedia({{audio: {audio}, video: {video}}}).then(function() {{ window.location = "/test1"; }}, function() {{ window.location = "/test2"; }});"#
        ),
    )
}

/// `/geolocation`
#[must_use]
pub fn geolocation() -> String {
    script_page(
        "Geolocation",
        r#"navigator.geolocation.getCurrentPosition(function() {document.title="ALLOWED";}, function(){document.title="DENIED";});"#,
    )
}

/// `/show-user-agent`
#[must_use]
pub fn show_user_agent() -> String {
    script_page("user agent", "document.title = navigator.userAgent;")
}

/// `/image`
#[must_use]
pub fn image() -> String {
    html("Image", r#"<img src="/assets/logo.png" width="100%" height="100%">"#)
}

/// `/imagelink`
#[must_use]
pub fn image_link() -> String {
    html(
        "Image Link",
        r#"<a href="/aleaiactaest"><img src="/assets/logo.png" width="100%" height="100%"></a>"#,
    )
}

/// `/textarea`
#[must_use]
pub fn textarea() -> String {
    html("Text Area", r#"<textarea style="width: 100%; height: 100%"></textarea>"#)
}

/// `/link`
#[must_use]
pub fn link() -> String {
    html("Link", r#"<a href="/aleaiactaest">Alea Iacta Est</a>"#)
}

/// `/findinpage`
#[must_use]
pub fn find_in_page() -> String {
    let term = FIND_IN_PAGE_TERM;
    html(
        "Find in page",
        &format!("<p>{term} world</p><p>say {term} again</p><p>and {term} once more</p>"),
    )
}

/// `/theme-color/`: static color, optional manifest, optional later update
#[must_use]
pub fn theme_color(color: Option<&str>, manifest: bool, delayed: Option<&str>) -> String {
    let mut head = String::from("<title>theme-color</title>");
    if let Some(color) = color {
        head.push_str(&format!(r#"<meta name="theme-color" content="{color}">"#));
    }
    if manifest {
        head.push_str(r#"<link rel="manifest" href="/theme-color/manifest.json">"#);
    }
    let body = delayed.map_or_else(String::new, |later| {
        format!(
            r#"<script>setTimeout(function(){{ document.querySelector('meta[name="theme-color"]').setAttribute("content","{later}"); }}, 1000)</script>"#
        )
    });
    format!("<html><head>{head}</head><body>{body}</body></html>")
}

/// `/theme-color/manifest.json`
#[must_use]
pub fn theme_color_manifest(color: &str) -> String {
    serde_json::json!({
        "name": "theme-color",
        "theme_color": color,
    })
    .to_string()
}

/// `/tab/<n>`
#[must_use]
pub fn tab(n: u32) -> String {
    html(&format!("tab {n}"), &format!("<p>tab {n}</p>"))
}

/// Not-found page
#[must_use]
pub fn not_found(path: &str) -> String {
    html("404 Not Found", &format!("<p>No fixture at {path}</p>"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::mock::{count_matches, visible_text};

    #[test]
    fn test_html_has_title_and_body() {
        let page = html("T", "<p>b</p>");
        assert!(page.contains("<title>T</title>"));
        assert!(page.contains("<p>b</p>"));
    }

    #[test]
    fn test_full_page_link_target() {
        assert!(full_page_link("x", "/a", true).contains(r#"target="_blank""#));
        assert!(!full_page_link("x", "/a", false).contains("target"));
    }

    #[test]
    fn test_find_in_page_term_count() {
        let text = visible_text(&find_in_page());
        assert_eq!(count_matches(&text, FIND_IN_PAGE_TERM), 3);
    }

    #[test]
    fn test_theme_color_parts_are_optional() {
        let bare = theme_color(None, false, None);
        assert!(!bare.contains("theme-color\" content"));
        assert!(!bare.contains("manifest"));
        let full = theme_color(Some("#FF0000"), true, Some("#00FF00"));
        assert!(full.contains(r##"content="#FF0000""##));
        assert!(full.contains("manifest.json"));
        assert!(full.contains("setTimeout"));
    }

    #[test]
    fn test_manifest_is_json() {
        let value: serde_json::Value = serde_json::from_str(&theme_color_manifest("#123456")).unwrap();
        assert_eq!(value["theme_color"], "#123456");
    }
}
