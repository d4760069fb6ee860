use axum::{
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use serde::Serialize;
use serve::upstream::UpstreamError;
use std::io;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Settings error: {0}")]
    Settings(#[from] domain::Error),

    #[error("Upstream client error: {0}")]
    Adapt(#[from] adapt::Error),

    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Database ID not configured (use --database-id or NOTION_DATABASE_ID)")]
    MissingDatabase,
}

/// Body of every non-2xx relay response.
#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

/// Relay-boundary error: a status plus the `{error, details?}` envelope.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    details: Option<String>,
}

impl ApiError {
    pub fn bad_request(error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Wrap a failed operation; logs it and keeps the underlying message as
    /// `details`.
    pub fn failed(context: &str, err: impl Into<serve::Error>) -> Self {
        let err = err.into();
        error!("{}: {}", context, err);
        Self {
            status: err.to_status(),
            error: context.to_owned(),
            details: Some(err.details()),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorEnvelope {
            error: self.error,
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}
