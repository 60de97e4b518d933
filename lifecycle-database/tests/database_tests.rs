use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use lifecycle_common::{
    Binding, Host, LifecycleContext, Service, ServiceHealth, StartError,
};
use lifecycle_database::{
    ConnectError, DatabaseConfig, DatabaseError, DatabaseService, FAILURE_URL, UNRESPONSIVE_URL,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn config(pairs: &[(&str, &str)]) -> DatabaseConfig {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    DatabaseConfig::load_from(&vars).expect("invalid test config")
}

fn service(pairs: &[(&str, &str)]) -> Arc<DatabaseService> {
    Arc::new(DatabaseService::new(config(pairs)))
}

fn app(service: &Arc<DatabaseService>) -> Router {
    Host::new("test")
        .with_service(service.clone())
        .router(Router::new())
        .expect("failed to mount routes")
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, value)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(http::Method::POST)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn start_then_stop_closes_the_connection() {
    let service = service(&[]);
    let ctx = LifecycleContext::new();

    service.start(&ctx).await.unwrap();
    let connection = service.connection().await.expect("connection missing");
    assert!(connection.is_connected());
    assert_eq!(service.health().await, ServiceHealth::Healthy);

    service.stop(&ctx).await.unwrap();

    assert!(!service.is_connected().await);
    assert!(!connection.is_connected());
    assert_eq!(connection.ping().await, Err(DatabaseError::NotConnected));
    assert_eq!(connection.users().await, Err(DatabaseError::NotConnected));
    assert_eq!(
        connection.create_user("Carol", "carol@example.com").await,
        Err(DatabaseError::NotConnected)
    );
    assert!(!service.health().await.is_live());
}

#[tokio::test]
async fn stop_without_start_is_a_no_op() {
    let service = service(&[]);
    let ctx = LifecycleContext::new();

    service.stop(&ctx).await.unwrap();
    service.stop(&ctx).await.unwrap();

    assert!(!service.is_connected().await);
}

#[tokio::test]
async fn second_start_is_rejected() {
    let service = service(&[]);
    let ctx = LifecycleContext::new();
    service.start(&ctx).await.unwrap();

    let result = service.start(&ctx).await;

    assert!(matches!(result, Err(StartError::AlreadyStarted)));
    assert!(service.is_connected().await);
}

#[tokio::test]
async fn refused_connection_leaves_service_not_running() {
    let service = service(&[("DATABASE_URL", FAILURE_URL)]);
    let app = app(&service);

    let result = service.start(&LifecycleContext::new()).await;

    match result {
        Err(StartError::Resource(source)) => {
            let connect = source.downcast_ref::<ConnectError>();
            assert!(matches!(connect, Some(ConnectError::Refused { .. })));
        }
        other => panic!("unexpected start result: {other:?}"),
    }
    assert!(!service.is_connected().await);
    assert!(service.connection().await.is_none());

    let (status, body) = send(&app, get("/api/database/users")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, json!({"error": "database not connected"}));

    let (status, _) = send(&app, get("/api/database/health")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn unresponsive_connection_times_out() {
    let service = service(&[
        ("DATABASE_URL", UNRESPONSIVE_URL),
        ("DATABASE_CONNECT_TIMEOUT", "1s"),
    ]);

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        service.start(&LifecycleContext::new()),
    )
    .await
    .expect("start ignored its connect timeout");

    match result {
        Err(StartError::Resource(source)) => {
            let connect = source.downcast_ref::<ConnectError>();
            assert!(matches!(connect, Some(ConnectError::Timeout { .. })));
        }
        other => panic!("unexpected start result: {other:?}"),
    }
    assert!(!service.is_connected().await);
}

#[tokio::test]
async fn cancelled_start_fails_without_connecting() {
    let service = service(&[]);
    let ctx = LifecycleContext::new();
    ctx.cancel();

    let result = service.start(&ctx).await;

    assert!(matches!(result, Err(StartError::Resource(_))));
    assert!(!service.is_connected().await);
}

// ---------------------------------------------------------------------------
// HTTP surface
// ---------------------------------------------------------------------------

#[tokio::test]
async fn requests_before_start_report_not_connected() {
    let service = service(&[]);
    let app = app(&service);

    let (status, body) = send(
        &app,
        post_json(
            "/api/database/users",
            json!({"name": "Carol", "email": "carol@example.com"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "database not connected");
}

#[tokio::test]
async fn lists_and_creates_users() {
    let service = service(&[]);
    let app = app(&service);
    service.start(&LifecycleContext::new()).await.unwrap();

    let (status, body) = send(&app, get("/api/database/users")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["users"][0]["name"], "Alice");

    let (status, body) = send(
        &app,
        post_json(
            "/api/database/users",
            json!({"name": "Carol", "email": "carol@example.com"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "user": {"id": 3, "name": "Carol", "email": "carol@example.com"},
            "message": "User created successfully",
        })
    );

    let (_, body) = send(&app, get("/api/database/users")).await;
    assert_eq!(body["count"], 3);

    let (status, body) = send(&app, get("/api/database/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "metrics": {"users_fetched": 2, "users_created": 1},
            "config": {"max_connections": 10, "database_url": "[REDACTED]"},
        })
    );
}

#[tokio::test]
async fn create_user_requires_name_and_email() {
    let service = service(&[]);
    let app = app(&service);
    service.start(&LifecycleContext::new()).await.unwrap();

    let (status, body) = send(
        &app,
        post_json("/api/database/users", json!({"name": "Carol"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "name and email are required");
    assert_eq!(service.counters().get("users_created").await, 0);
}

#[tokio::test]
async fn health_reflects_the_connection() {
    let service = service(&[]);
    let app = app(&service);
    let ctx = LifecycleContext::new();

    service.start(&ctx).await.unwrap();
    let (status, body) = send(&app, get("/api/database/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["connection"], "active");

    service.stop(&ctx).await.unwrap();
    let (status, _) = send(&app, get("/api/database/health")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn metrics_can_be_disabled() {
    let service = service(&[("DATABASE_ENABLE_METRICS", "false")]);
    let app = app(&service);
    service.start(&LifecycleContext::new()).await.unwrap();

    let (status, _) = send(&app, get("/api/database/users")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, get("/api/database/metrics")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(service.counters().snapshot().await.is_empty());
}
