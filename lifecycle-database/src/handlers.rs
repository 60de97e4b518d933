use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use lifecycle_common::ApiError;
use serde_derive::{Deserialize, Serialize};
use tracing::debug;

use crate::connection::User;
use crate::error::DatabaseError;
use crate::service::DatabaseState;

pub fn router(state: Arc<DatabaseState>) -> Router {
    Router::new()
        .route("/users", get(get_users).post(create_user))
        .route("/health", get(health_check))
        .route("/metrics", get(get_metrics))
        .with_state(state)
}

impl From<DatabaseError> for ApiError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::NotConnected => ApiError::unavailable(error.to_string()),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct UsersResponse {
    pub users: Vec<User>,
    pub count: usize,
}

#[derive(Deserialize, Serialize, Debug, Default)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct CreateUserResponse {
    pub user: User,
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub connection: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct MetricsResponse {
    pub metrics: BTreeMap<String, u64>,
    pub config: MetricsConfig,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct MetricsConfig {
    pub max_connections: u32,
    pub database_url: String,
}

async fn get_users(
    State(state): State<Arc<DatabaseState>>,
) -> Result<Json<UsersResponse>, ApiError> {
    let connection = state.connection().await?;
    let users = connection.users().await?;

    state.record("users_fetched").await;
    Ok(Json(UsersResponse {
        count: users.len(),
        users,
    }))
}

async fn create_user(
    State(state): State<Arc<DatabaseState>>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<Json<CreateUserResponse>, ApiError> {
    let connection = state.connection().await?;

    if payload.name.is_empty() || payload.email.is_empty() {
        return Err(ApiError::bad_request("name and email are required"));
    }

    let user = connection
        .create_user(&payload.name, &payload.email)
        .await?;
    debug!(user_id = user.id, "created user through api");

    state.record("users_created").await;
    Ok(Json(CreateUserResponse {
        user,
        message: "User created successfully".to_owned(),
    }))
}

async fn health_check(
    State(state): State<Arc<DatabaseState>>,
) -> Result<Json<HealthResponse>, ApiError> {
    let connection = state.connection().await?;
    connection.ping().await?;

    Ok(Json(HealthResponse {
        status: "healthy".to_owned(),
        connection: "active".to_owned(),
        timestamp: Utc::now(),
    }))
}

async fn get_metrics(
    State(state): State<Arc<DatabaseState>>,
) -> Result<Json<MetricsResponse>, ApiError> {
    if !*state.config.enable_metrics {
        return Err(ApiError::new(StatusCode::NOT_FOUND, "metrics are disabled"));
    }

    Ok(Json(MetricsResponse {
        metrics: state.counters.snapshot().await,
        config: MetricsConfig {
            max_connections: state.config.max_connections,
            // Never expose connection credentials.
            database_url: "[REDACTED]".to_owned(),
        },
    }))
}
