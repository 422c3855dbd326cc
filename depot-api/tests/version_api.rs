//! Version API routes exercised in process with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use depot_api::create_router;
use depot_api::routes::objects::VERSION_HEADER;
use depot_core::{ChangeToken, StoreError};
use depot_storage::{InMemoryContentStore, InMemoryMetadataStore, VersionController};
use depot_test_utils::fixtures::{controller_config, faulty_controller, in_memory_controller};
use serde_json::Value;
use tower::ServiceExt; // for `oneshot`

struct Reply {
    status: StatusCode,
    headers: axum::http::HeaderMap,
    body: Vec<u8>,
}

impl Reply {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("body should be JSON")
    }
}

async fn send(app: &Router, method: Method, uri: &str, body: &[u8]) -> Reply {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::from(body.to_vec()))
        .expect("request should build");
    let response = app.clone().oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should collect")
        .to_vec();
    Reply {
        status,
        headers,
        body,
    }
}

fn app() -> Router {
    let (controller, _content, _metadata) = in_memory_controller();
    create_router(Arc::new(controller))
}

#[tokio::test]
async fn test_up_is_happy() {
    let reply = send(&app(), Method::GET, "/up", b"").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, b"Happy");
}

#[tokio::test]
async fn test_dev_then_prod_promotion_flow() {
    let app = app();

    let reply = send(&app, Method::POST, "/team/app.bin/v1?dev=true", b"hello").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json(), serde_json::json!({"status": "ok"}));

    let dev = send(&app, Method::GET, "/team/app.bin?dev=true", b"").await;
    assert_eq!(dev.status, StatusCode::OK);
    assert_eq!(dev.body, b"hello");
    assert_eq!(dev.headers[VERSION_HEADER], "v1");
    assert_eq!(
        dev.headers[header::ETAG],
        ChangeToken::for_content(b"hello").to_etag().as_str()
    );

    let prod = send(&app, Method::GET, "/team/app.bin", b"").await;
    assert_eq!(prod.status, StatusCode::NOT_FOUND);
    let body = prod.json();
    assert_eq!(body["status"], "error");
    assert!(body["error"].as_str().expect("message").contains("No prod version set"));

    send(&app, Method::POST, "/team/app.bin/v2?prod=true", b"world").await;
    let prod = send(&app, Method::GET, "/team/app.bin", b"").await;
    assert_eq!(prod.body, b"world");
    let dev = send(&app, Method::GET, "/team/app.bin?dev=true", b"").await;
    assert_eq!(dev.body, b"world", "prod promotion also advances dev");

    let pinned = send(&app, Method::GET, "/team/app.bin/v1", b"").await;
    assert_eq!(pinned.body, b"hello");
}

#[tokio::test]
async fn test_duplicate_publish_is_conflict() {
    let app = app();
    send(&app, Method::POST, "/team/app.bin/v1", b"hello").await;

    let reply = send(&app, Method::POST, "/team/app.bin/v1", b"other").await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert_eq!(reply.json()["code"], "VERSION_CONFLICT");

    let pinned = send(&app, Method::GET, "/team/app.bin/v1", b"").await;
    assert_eq!(pinned.body, b"hello");
}

#[tokio::test]
async fn test_put_moves_one_pointer() {
    let app = app();
    send(&app, Method::POST, "/team/app.bin/v1", b"one").await;
    send(&app, Method::POST, "/team/app.bin/v2", b"two").await;

    let reply = send(&app, Method::PUT, "/team/app.bin/v1", b"").await;
    assert_eq!(reply.status, StatusCode::OK);
    let reply = send(&app, Method::PUT, "/team/app.bin/v2?dev=true", b"").await;
    assert_eq!(reply.status, StatusCode::OK);

    assert_eq!(send(&app, Method::GET, "/team/app.bin", b"").await.body, b"one");
    assert_eq!(send(&app, Method::GET, "/team/app.bin?dev=TRUE", b"").await.body, b"two");
}

#[tokio::test]
async fn test_head_reports_token_without_body() {
    let app = app();
    send(&app, Method::POST, "/team/app.bin/v1?prod=true", b"hello").await;

    let reply = send(&app, Method::HEAD, "/team/app.bin", b"").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.is_empty());
    assert_eq!(reply.headers[VERSION_HEADER], "v1");
    assert_eq!(
        reply.headers[header::ETAG],
        ChangeToken::for_content(b"hello").to_etag().as_str()
    );

    let missing = send(&app, Method::HEAD, "/team/app.bin/v9", b"").await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_listing_pages_with_tokens() {
    let content = Arc::new(InMemoryContentStore::new());
    let controller = VersionController::new(
        controller_config().with_list_page_size(1),
        content,
        InMemoryMetadataStore::new(),
    );
    let app = create_router(Arc::new(controller));
    for uri in ["/team/app.bin/v1", "/team/app.bin/v2", "/team/lib.so/v1", "/tools/cli/v1"] {
        assert_eq!(send(&app, Method::POST, uri, b"x").await.status, StatusCode::OK);
    }

    let first = send(&app, Method::GET, "/", b"").await.json();
    assert_eq!(first["items"], serde_json::json!(["team"]));
    let token = first["nextToken"].as_str().expect("more categories");

    let second = send(&app, Method::GET, &format!("/?token={}", token), b"").await.json();
    assert_eq!(second["items"], serde_json::json!(["tools"]));
    assert!(second.get("nextToken").is_none());

    let objects = send(&app, Method::GET, "/team", b"").await.json();
    assert_eq!(objects["items"], serde_json::json!(["app.bin"]));

    let mut versions = Vec::new();
    let mut uri = "/team/app.bin/versions".to_string();
    loop {
        let page = send(&app, Method::GET, &uri, b"").await.json();
        for item in page["items"].as_array().expect("items") {
            versions.push(item.as_str().expect("label").to_string());
        }
        match page.get("nextToken").and_then(Value::as_str) {
            Some(token) => uri = format!("/team/app.bin/versions?token={}", token),
            None => break,
        }
    }
    assert_eq!(versions, vec!["v1", "v2"]);
}

#[tokio::test]
async fn test_foreign_token_is_bad_request() {
    let app = app();
    send(&app, Method::POST, "/team/app.bin/v1", b"x").await;

    let reply = send(&app, Method::GET, "/team?token=other/zzz", b"").await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json()["status"], "error");
}

#[tokio::test]
async fn test_reserved_segment_is_bad_request() {
    let reply = send(&app(), Method::POST, "/team/app.bin/..", b"x").await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_pointer_store_outage_is_unavailable() {
    let (controller, _content, metadata) = faulty_controller();
    let app = create_router(Arc::new(controller));
    metadata.fail_gets((0..3).map(|_| StoreError::Throttled {
        reason: "ProvisionedThroughputExceeded".into(),
    }));

    let reply = send(&app, Method::GET, "/team/app.bin", b"").await;
    assert_eq!(reply.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(metadata.get_calls(), 3);
}
