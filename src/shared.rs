use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::admission::AdmissionConfig;
use crate::config::Environment;
use crate::store::KeyValueStore;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn KeyValueStore + Send + Sync>,
    pub admission_config: AdmissionConfig,
    pub environment: Environment,
}

impl AppState {
    pub fn new(
        store: Arc<dyn KeyValueStore + Send + Sync>,
        admission_config: AdmissionConfig,
        environment: Environment,
    ) -> Self {
        Self {
            store,
            admission_config,
            environment,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Write contention: {0}")]
    Contention(String),

    #[error("Randomness unavailable: {0}")]
    RandomnessUnavailable(String),

    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::StoreUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("Store unavailable: {}", msg),
            ),
            AppError::Contention(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("Room is busy, retry shortly: {}", msg),
            ),
            AppError::RandomnessUnavailable(_) | AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}
