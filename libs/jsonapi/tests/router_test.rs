use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use jsonapi::{FormField, FormValidator, MemoryProvider, Resource, ResourceDescriptor, ResourceRouter};
use serde_json::{json, Value};
use tower::util::ServiceExt; // for `oneshot`

fn router() -> Router {
    let provider = MemoryProvider::from_json(&json!([
        {"id": 1, "title": "first"},
        {"id": 2, "title": "second"},
    ]))
    .unwrap();
    let notes = Resource::new(ResourceDescriptor::new("notes").fields(["id", "title"]), provider)
        .with_create_validator(FormValidator::new([FormField::char("title", Some(20))]));
    ResourceRouter::new()
        .resource("/notes", Arc::new(notes))
        .into_router()
}

async fn send(router: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            req = req.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let response = router.oneshot(req.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn index_and_item_paths_with_and_without_slash() {
    for uri in ["/notes/", "/notes"] {
        let (status, body) = send(router(), Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        let v: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["meta"]["total"], 2);
    }
    for uri in ["/notes/2/", "/notes/2"] {
        let (status, body) = send(router(), Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        let v: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v, json!({"notes": {"id": 2, "title": "second"}}));
    }
}

#[tokio::test]
async fn query_string_reaches_the_translator() {
    let (status, body) = send(router(), Method::GET, "/notes/?per_page=1&page=2", None).await;
    assert_eq!(status, StatusCode::OK);
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["notes"], json!([{"id": 2, "title": "second"}]));
    assert_eq!(v["meta"]["per_page"], 1);
}

#[tokio::test]
async fn rejected_requests_have_empty_bodies() {
    let (status, body) = send(router(), Method::PUT, "/notes/", None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert!(body.is_empty());

    // no update validator configured
    let (status, body) =
        send(router(), Method::PUT, "/notes/1/", Some(json!({"notes": {"title": "x"}}))).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert!(body.is_empty());

    let (status, body) = send(router(), Method::DELETE, "/notes/9/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.is_empty());
}

#[tokio::test]
async fn validation_errors_are_json() {
    let (status, body) = send(
        router(),
        Method::POST,
        "/notes/",
        Some(json!({"notes": {"title": "a title that is far too long"}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        v,
        json!([{"title": ["Ensure this value has at most 20 characters (it has 28)."]}])
    );
}
