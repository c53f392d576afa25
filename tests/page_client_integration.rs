//! Integration tests for the Telegraph page client against a mock API.

#![allow(clippy::unwrap_used)]

mod support;

use std::time::Duration;

use serde_json::json;
use support::socket_guard::start_mock_server_or_skip;
use tele_dl::extract::MediaExtractor;
use tele_dl::page::{FetchError, PageSource, TelegraphClient};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

macro_rules! require_mock_server {
    () => {
        match start_mock_server_or_skip().await {
            Some(server) => server,
            None => return,
        }
    };
}

fn client_for(server: &MockServer) -> TelegraphClient {
    TelegraphClient::new(format!("{}/getPage/", server.uri()), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_fetch_page_parses_content_tree() {
    let server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path("/getPage/Sample-01-01"))
        .and(query_param("return_content", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": {
                "path": "Sample-01-01",
                "url": "https://telegra.ph/Sample-01-01",
                "title": "Sample",
                "author_name": "Someone",
                "views": 12,
                "content": [
                    "Intro text",
                    {"tag": "figure", "children": [
                        {"tag": "img", "attrs": {"src": "/file/a.jpg"}},
                        {"tag": "figcaption", "children": ["caption"]}
                    ]},
                    {"tag": "p", "children": [
                        {"tag": "video", "attrs": {"src": "/file/b.mp4"}}
                    ]}
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = client_for(&server).fetch_page("Sample-01-01").await.unwrap();

    assert_eq!(page.title, "Sample");
    assert_eq!(page.author_name.as_deref(), Some("Someone"));
    assert_eq!(page.nodes.len(), 3);

    let items = MediaExtractor::new().extract(&page.nodes);
    let names: Vec<&str> = items.iter().map(|i| i.filename.as_str()).collect();
    assert_eq!(names, vec!["0_a.jpg", "1_b.mp4"]);
}

#[tokio::test]
async fn test_fetch_page_without_content_is_empty() {
    let server = require_mock_server!();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": {"path": "Empty", "url": "https://telegra.ph/Empty", "title": "Empty"}
        })))
        .mount(&server)
        .await;

    let page = client_for(&server).fetch_page("Empty").await.unwrap();

    assert!(page.nodes.is_empty());
}

#[tokio::test]
async fn test_api_error_is_reported() {
    let server = require_mock_server!();
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ok": false, "error": "PAGE_NOT_FOUND"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server).fetch_page("Nope").await.unwrap_err();

    match err {
        FetchError::Api { message } => assert_eq!(message, "PAGE_NOT_FOUND"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_http_error_status_is_reported() {
    let server = require_mock_server!();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let err = client_for(&server).fetch_page("Sample").await.unwrap_err();

    assert!(matches!(err, FetchError::HttpStatus { status: 502, .. }));
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let server = require_mock_server!();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server).fetch_page("Sample").await.unwrap_err();

    assert!(matches!(err, FetchError::Decode { .. }));
}

#[tokio::test]
async fn test_deeply_nested_page_is_fully_extracted() {
    let server = require_mock_server!();
    let depth = 500;
    let body = format!(
        r#"{{"ok":true,"result":{{"path":"Deep","title":"Deep","content":[{}{}{}]}}}}"#,
        r#"{"tag":"div","children":["text","#.repeat(depth),
        r#"{"tag":"img","attrs":{"src":"/file/inner.jpg"}}"#,
        "]}".repeat(depth)
    );
    Mock::given(method("GET"))
        .and(path("/getPage/Deep"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
        .mount(&server)
        .await;

    let page = client_for(&server).fetch_page("Deep").await.unwrap();

    let items = MediaExtractor::new().extract(&page.nodes);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].url, "/file/inner.jpg");
    assert_eq!(items[0].filename, "0_inner.jpg");
}
