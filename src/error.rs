use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::models::ErrorEnvelope;

/// Failures of the certification workflow store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No record exists for the `(user_id, level)` pair.
    #[error("no workflow record found for user_id={user_id} level={level}")]
    NotFound { user_id: String, level: String },

    /// More than one record matched; nothing was committed.
    #[error("{count} workflow records matched user_id={user_id} level={level}")]
    MultipleMatches {
        user_id: String,
        level: String,
        count: usize,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The store could not be reached at all.
    #[error("workflow store unavailable: {0}")]
    Unavailable(String),
}

/// Every way the exam webhook can fail. All of them surface as HTTP 500.
#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("Invalid JSON payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("Missing required fields: user_id and level")]
    MissingRequiredField,

    #[error("Failed to update workflow: {0}")]
    WorkflowUpdateFailed(#[from] StoreError),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        match &self {
            WebhookError::MalformedPayload(e) => {
                tracing::warn!(error = %e, "exam webhook payload is not valid JSON");
            }
            WebhookError::MissingRequiredField => {
                tracing::warn!("exam webhook payload is missing user_id or level");
            }
            WebhookError::WorkflowUpdateFailed(e) => {
                tracing::error!(error = ?e, "exam webhook workflow update failed");
            }
        }

        // Client and server faults share one status on this endpoint.
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
            Json(ErrorEnvelope {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
