use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post},
};

/// Authenticated Router Module
///
/// Routes for any signed-in user (normally the 'student' role). The `auth_middleware`
/// layered above this router guarantees a valid `AuthUser` before a handler runs;
/// ownership checks (e.g. deleting a comment) happen in the handlers.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        .route("/me", get(handlers::get_me))
        // GET /me/progress
        .route("/me/progress", get(handlers::get_my_progress))
        // GET /me/certifications
        // Certification workflow per level, including exam status.
        .route("/me/certifications", get(handlers::get_my_certifications))
        // POST /subsections/{id}/comments
        .route("/subsections/{id}/comments", post(handlers::add_comment))
        // POST /subsections/{id}/complete
        // Idempotent: completing twice keeps the first timestamp.
        .route("/subsections/{id}/complete", post(handlers::complete_subsection))
        // DELETE /comments/{id}
        // Owners delete their own comments; admins may delete any.
        .route("/comments/{id}", delete(handlers::delete_comment))
}
