use crate::{AppState, handlers, webhook};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session: health, registration, the published
/// course catalogue, route resolution, and the exam provider's webhook.
///
/// Course and comment reads only ever return published content; the repository
/// enforces `is_published = true`.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        .route("/health", get(|| async { "ok" }))
        // POST /register
        // Supabase Auth signup mirrored into `public.profiles`.
        .route("/register", post(handlers::register_user))
        // GET /navigation/resolve?path=...
        // Same guard decisions the client applies, for the optional caller.
        .route("/navigation/resolve", get(handlers::resolve_navigation))
        // GET /courses
        .route("/courses", get(handlers::get_courses))
        // GET /courses/{id}
        // Course outline: sections and subsections in order.
        .route("/courses/{id}", get(handlers::get_course_outline))
        // GET /subsections/{id}/comments
        .route("/subsections/{id}/comments", get(handlers::get_comments))
        // POST|OPTIONS /functions/v1/exam-webhook
        // Called by the third-party exam provider; answers its own preflight.
        .route(
            "/functions/v1/exam-webhook",
            post(webhook::exam_webhook).options(webhook::exam_webhook_preflight),
        )
}
