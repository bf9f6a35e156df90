//! Fixture server over real HTTP.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use webpilot::fixture_server::pages::BASIC_CONTENT_TITLE;
use webpilot::mock::{HostRule, HttpPageLoader, PageLoader, PageRequest};
use webpilot::FixtureServer;

fn no_redirects() -> Client {
    Client::builder().redirect(Policy::none()).build().unwrap()
}

#[test]
fn test_saml_redirect_decrements_once_then_serves_content() {
    let server = FixtureServer::start().unwrap();
    let client = no_redirects();

    let first = client
        .get(server.url("/redirect-to-saml/?loopcount=1&SAMLRequest=1"))
        .send()
        .unwrap();
    assert_eq!(first.status(), StatusCode::FOUND);
    let location = first
        .headers()
        .get(reqwest::header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(location, "/redirect-to-saml/?loopcount=0&SAMLRequest=1");

    let second = client.get(server.url(&location)).send().unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert!(second.text().unwrap().contains(BASIC_CONTENT_TITLE));
}

#[test]
fn test_loader_follows_redirects_and_counts_them() {
    let server = FixtureServer::start().unwrap();
    let loader = HttpPageLoader::new().unwrap();
    let page = loader
        .load(&PageRequest::get(
            server.url("/redirect-to-saml/?loopcount=2&SAMLRequest=x"),
        ))
        .unwrap();
    assert_eq!(page.status, 200);
    assert_eq!(page.redirects, 2);
    assert!(page.url.contains("loopcount=0"));
}

#[test]
fn test_host_mapping_keeps_logical_url() {
    let server = FixtureServer::start().unwrap();
    let rules = HostRule::parse_list(&server.host_mapping_rule("*.test.com"));
    let loader = HttpPageLoader::new().unwrap().with_rules(rules);
    let page = loader
        .load(&PageRequest::get("http://www.test.com/loremipsum"))
        .unwrap();
    assert_eq!(page.url, "http://www.test.com/loremipsum");
    assert!(page.body.contains("Lorem Ipsum"));
}

#[test]
fn test_downloads_are_attachments() {
    let server = FixtureServer::start().unwrap();
    let response = reqwest::blocking::get(server.url("/downloadpdf")).unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[reqwest::header::CONTENT_TYPE],
        "application/pdf"
    );
    assert!(response.headers()[reqwest::header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .starts_with("attachment"));
}
