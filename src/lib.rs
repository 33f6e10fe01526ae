use axum::{
    Router,
    extract::{FromRef, Request},
    http::{HeaderName, StatusCode},
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod guards;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod webhook;
pub mod workflow;

// Routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use repository::{PostgresRepository, RepositoryState};
pub use workflow::{InMemoryWorkflowStore, PostgresWorkflowStore, WorkflowState};

/// ApiDoc
///
/// OpenAPI document aggregated from the `#[utoipa::path]` handlers and
/// `#[derive(ToSchema)]` models, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::resolve_navigation, handlers::get_courses, handlers::get_course_outline,
        handlers::get_comments, handlers::add_comment, handlers::delete_comment,
        handlers::complete_subsection, handlers::get_my_progress, handlers::get_my_certifications,
        handlers::get_me, handlers::register_user, handlers::get_admin_stats,
        handlers::get_admin_courses, handlers::get_admin_course_outline,
        handlers::update_course_status,
        handlers::get_admin_certifications, webhook::exam_webhook
    ),
    components(
        schemas(
            models::Course, models::Section, models::Subsection, models::SectionOutline,
            models::CourseOutline, models::Comment, models::CreateCommentRequest,
            models::Progress, models::CertificationWorkflow, models::AdminDashboardStats,
            models::UserProfile, models::User, models::RegisterUserRequest,
            models::ExamWebhookPayload, models::WebhookAck, models::ErrorEnvelope,
            guards::GuardOutcome, guards::Navigation, guards::View, guards::Role,
        )
    ),
    tags(
        (name = "learning-portal", description = "Learning Portal API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Single, cloneable container of every shared service, handed to all requests.
#[derive(Clone)]
pub struct AppState {
    /// Content, comments, progress and profiles.
    pub repo: RepositoryState,
    /// Certification workflow records, updated by the exam webhook.
    pub workflows: WorkflowState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for WorkflowState {
    fn from_ref(app_state: &AppState) -> WorkflowState {
        app_state.workflows.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Enforces authentication for the `authenticated_routes`. Extracting `AuthUser`
/// rejects with 401 before the handler runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// admin_middleware
///
/// Enforces the 'admin' role for everything nested under `/admin`:
/// 401 without a session, 403 for any other role.
async fn admin_middleware(
    auth_user: AuthUser,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if !auth_user.is_admin() {
        tracing::warn!(user_id = %auth_user.id, role = %auth_user.role, "admin route denied");
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(next.run(request).await)
}

/// create_router
///
/// Assembles the routing structure, applies global and scoped middleware, and
/// registers the application state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .nest(
            "/admin",
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                admin_middleware,
            )),
        )
        .with_state(state);

    // Observability and correlation layers, outermost first.
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Request span carrying method, URI and the `x-request-id`, so every log line of one
/// request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
