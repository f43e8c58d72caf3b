//! HTTP adapter tests: in-process through the axum router, and over a real socket.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use route_dispatch::config::FrameworkConfig;
use route_dispatch::http::HttpServer;
use route_dispatch::lifecycle::Application;
use tokio::net::TcpListener;
use tower::ServiceExt;

mod common;

use common::RecordingLogger;

fn server(config: &FrameworkConfig) -> HttpServer {
    let framework = common::framework();
    framework.register_route("items/%", "params", Vec::<String>::new()).unwrap();
    framework.register_route("broken", "failing", Vec::<String>::new()).unwrap();
    let dispatcher = Arc::new(framework.dispatcher(Arc::new(RecordingLogger::default())));
    HttpServer::new(dispatcher, config)
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_router_dispatches_and_sets_request_id() {
    let app = server(&FrameworkConfig::default()).router();

    let response = app
        .oneshot(Request::builder().uri("/items/widget?color=red").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(body_string(response).await, "widget");
}

#[tokio::test]
async fn test_incoming_request_id_is_propagated() {
    let app = server(&FrameworkConfig::default()).router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/items/1")
                .header("x-request-id", "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["x-request-id"], "req-123");
}

#[tokio::test]
async fn test_failures_never_reach_the_transport() {
    let app = server(&FrameworkConfig::default()).router();

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/broken").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(Request::builder().uri("/nothing/here").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let mut config = FrameworkConfig::default();
    config.listener.max_body_bytes = 16;
    let app = server(&config).router();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/items/1")
                .body(Body::from(vec![b'x'; 64]))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_application_serves_over_tcp() {
    let app = Application::bootstrap(
        FrameworkConfig::default(),
        Application::default_modules(),
        Arc::new(RecordingLogger::default()),
    )
    .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = app.shutdown_handle();
    let handle = tokio::spawn(app.serve(listener));

    let client = reqwest::Client::new();

    let response = client
        .get(format!("http://{addr}/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "ok");

    let response = client.get(format!("http://{addr}/")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE.as_str())
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("SESSID="));
    assert!(cookie.contains("HttpOnly"));
    assert!(response.text().await.unwrap().contains("<html>"));

    let response = client.get(format!("http://{addr}/missing")).send().await.unwrap();
    assert_eq!(response.status(), 404);

    drop(client);
    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server should stop")
        .unwrap()
        .unwrap();
}
