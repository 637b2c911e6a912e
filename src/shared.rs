use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

use crate::league::repository::LeagueRepository;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub league_repository: Arc<dyn LeagueRepository>,
    /// Optional token required by the db_status probe (X-Download-Token header)
    pub status_token: Option<String>,
}

impl AppState {
    pub fn new(league_repository: Arc<dyn LeagueRepository>, status_token: Option<String>) -> Self {
        Self {
            league_repository,
            status_token,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::DatabaseError(msg) => {
                // Full detail stays in the logs; the caller only sees a generic message
                error!(detail = %msg, "Store failure surfaced as internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "message": error_message
        }));

        (status, body).into_response()
    }
}
