use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, put},
};

/// Admin Router Module
///
/// Routes exclusively for the 'admin' role. Nested under `/admin` and wrapped in the
/// `admin_middleware`, which rejects anonymous callers with 401 and non-admins with 403.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/stats
        .route("/stats", get(handlers::get_admin_stats))
        // GET /admin/courses
        // Every course, including unpublished drafts.
        .route("/courses", get(handlers::get_admin_courses))
        // GET /admin/courses/{id}
        // Outline of a course whether or not it is published.
        .route("/courses/{id}", get(handlers::get_admin_course_outline))
        // PUT /admin/courses/{id}/status
        // Publish or hide a course.
        .route("/courses/{id}/status", put(handlers::update_course_status))
        // GET /admin/certifications?step=approval
        // Review queue fed by the exam webhook.
        .route("/certifications", get(handlers::get_admin_certifications))
}
