#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use etudiants_api::app::app;
use etudiants_api::store::memory::MemoryEtudiantStore;

/// Full application wired to a fresh in-memory store. Each test builds its
/// own so state never leaks between tests.
pub fn test_app() -> Router {
    app(Arc::new(MemoryEtudiantStore::new()))
}

/// Send one request through the router and decode the JSON body (Null when
/// the body is empty).
pub async fn send(
    app: &Router,
    method: &str,
    path: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(path);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();

    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

/// The record from the original test fixtures.
pub fn etudiant_valide() -> Value {
    json!({
        "nom": "Dupont",
        "prenom": "Alice",
        "moyenne": 15,
        "filiere": "Informatique",
        "annee": 2,
        "email": "alice.dupont@test.com"
    })
}

/// Create a student and return its assigned id.
pub async fn create_etudiant(app: &Router, body: Value) -> String {
    let (status, body) = send(app, "POST", "/api/etudiants", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
    body["data"]["id"]
        .as_str()
        .expect("created record has an id")
        .to_string()
}
