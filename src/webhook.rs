//! Exam-submission webhook.
//!
//! Called by the third-party exam/form provider once a candidate submits. The payload
//! is validated at the boundary and the rest of it is treated as opaque JSON.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::Value;

use crate::{
    error::WebhookError,
    models::WebhookAck,
    workflow::{ExamSubmissionUpdate, WorkflowKey, WorkflowState},
};

/// Both the Supabase client spellings and the plain ones are accepted.
pub const ALLOWED_HEADERS: &str =
    "authorization, x-client-info, client-info, apikey, api-key, content-type";
pub const SUCCESS_MESSAGE: &str = "Exam results processed successfully";

/// ExamResults
///
/// Where the stored results came from. When the provider omits `exam_results`, the
/// whole payload is kept so nothing it sent is lost.
#[derive(Debug, Clone, PartialEq)]
pub enum ExamResults {
    Reported(Value),
    RawPayload(Value),
}

impl ExamResults {
    pub fn into_json(self) -> Value {
        match self {
            ExamResults::Reported(value) | ExamResults::RawPayload(value) => value,
        }
    }
}

/// ExamSubmission
///
/// A webhook payload that passed the required-field check.
#[derive(Debug, Clone, PartialEq)]
pub struct ExamSubmission {
    pub key: WorkflowKey,
    pub results: ExamResults,
    pub submission_url: Option<String>,
}

impl ExamSubmission {
    /// from_payload
    ///
    /// `user_id` must be a non-empty string. `level` may be a number or a non-empty
    /// string; a whole number such as `2.0` is read as `2`. Anything else counts as
    /// missing.
    pub fn from_payload(payload: Value) -> Result<Self, WebhookError> {
        let user_id = payload
            .get("user_id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_owned);

        let level = match payload.get("level") {
            Some(Value::Number(n)) => Some(level_text(n)),
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        };

        let (Some(user_id), Some(level)) = (user_id, level) else {
            return Err(WebhookError::MissingRequiredField);
        };

        let submission_url = payload
            .get("submission_url")
            .and_then(Value::as_str)
            .map(str::to_owned);

        let results = match payload.get("exam_results") {
            Some(results) if !results.is_null() => ExamResults::Reported(results.clone()),
            _ => ExamResults::RawPayload(payload),
        };

        Ok(Self {
            key: WorkflowKey { user_id, level },
            results,
            submission_url,
        })
    }

    pub fn into_update(self) -> (WorkflowKey, ExamSubmissionUpdate) {
        let update = ExamSubmissionUpdate {
            exam_results_json: self.results.into_json(),
            exam_submission_url: self.submission_url,
            updated_at: Utc::now(),
        };
        (self.key, update)
    }
}

/// Integer text for whole numbers, whatever JSON spelling they arrived in.
fn level_text(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => (f as i64).to_string(),
        _ => n.to_string(),
    }
}

/// exam_webhook_preflight
///
/// CORS preflight. Always an empty 200, regardless of what was sent.
pub async fn exam_webhook_preflight() -> impl IntoResponse {
    (
        StatusCode::OK,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, ALLOWED_HEADERS),
        ],
    )
}

/// exam_webhook
///
/// [Public Route] Ingests exam results into the caller's certification workflow:
/// marks the exam as submitted and moves the workflow to the approval step.
/// Every failure is answered with 500 and `{ "error": ... }`.
#[utoipa::path(
    post,
    path = "/functions/v1/exam-webhook",
    request_body = crate::models::ExamWebhookPayload,
    responses(
        (status = 200, description = "Workflow updated", body = WebhookAck),
        (status = 500, description = "Rejected or failed", body = crate::models::ErrorEnvelope)
    )
)]
pub async fn exam_webhook(
    State(workflows): State<WorkflowState>,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookError> {
    tracing::info!("exam webhook invoked");

    let payload: Value = serde_json::from_slice(&body)?;
    tracing::info!(payload = %payload, "exam webhook payload received");

    let submission = ExamSubmission::from_payload(payload)?;
    tracing::info!(
        user_id = %submission.key.user_id,
        level = %submission.key.level,
        has_exam_results = matches!(submission.results, ExamResults::Reported(_)),
        submission_url = ?submission.submission_url,
        "exam webhook fields extracted"
    );

    let (key, update) = submission.into_update();
    let record = workflows.record_exam_submission(&key, update).await?;
    tracing::info!(
        workflow_id = %record.id,
        current_step = %record.current_step,
        "certification workflow updated"
    );

    Ok((
        StatusCode::OK,
        [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
        Json(WebhookAck {
            success: true,
            message: SUCCESS_MESSAGE.to_string(),
        }),
    ))
}
