use crate::{
    AppState,
    auth::{AuthUser, MaybeAuthUser},
    guards::{GuardOutcome, RouteTable},
    models::{
        self, AdminDashboardStats, CertificationWorkflow, Comment, Course, CourseOutline,
        CreateCommentRequest, Progress, RegisterUserRequest, User, UserProfile,
    },
    workflow::STEP_APPROVAL,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

// --- Query Structs ---

/// NavigationQuery
///
/// Query parameters for GET /navigation/resolve.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct NavigationQuery {
    /// Client-side path to resolve, e.g. `/admin/courses`.
    pub path: String,
}

/// WorkflowFilter
///
/// Query parameters for GET /admin/certifications.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct WorkflowFilter {
    /// Workflow step to list; defaults to `approval`.
    pub step: Option<String>,
}

/// Minimal view of the Supabase /auth/v1/signup response.
#[derive(Deserialize)]
struct SupabaseAuthResponse {
    id: Uuid,
}

// --- Handlers ---

/// resolve_navigation
///
/// [Public Route] Applies the client route guards to `path` for the calling identity.
/// The session is always resolved here, so the answer is never `loading`.
#[utoipa::path(
    get,
    path = "/navigation/resolve",
    params(NavigationQuery),
    responses((status = 200, description = "Guard decision", body = GuardOutcome))
)]
pub async fn resolve_navigation(
    caller: MaybeAuthUser,
    Query(query): Query<NavigationQuery>,
) -> Json<GuardOutcome> {
    let session = caller.session();
    let outcome = RouteTable::default().resolve(&session, &query.path);
    tracing::debug!(path = %query.path, view = ?outcome.view, "navigation resolved");
    Json(outcome)
}

/// get_courses
///
/// [Public Route] Lists published courses.
#[utoipa::path(
    get,
    path = "/courses",
    responses((status = 200, description = "Published courses", body = [Course]))
)]
pub async fn get_courses(State(state): State<AppState>) -> Json<Vec<models::Course>> {
    Json(state.repo.get_courses().await)
}

/// get_course_outline
///
/// [Public Route] A published course with its ordered sections and subsections.
#[utoipa::path(
    get,
    path = "/courses/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Found", body = CourseOutline),
        (status = 404, description = "Not found or not published")
    )
)]
pub async fn get_course_outline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<models::CourseOutline>, StatusCode> {
    match state.repo.get_course_outline(id, false).await {
        Some(outline) => Ok(Json(outline)),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// get_comments
///
/// [Public Route] Comments on a subsection of a published course, oldest first.
#[utoipa::path(
    get,
    path = "/subsections/{id}/comments",
    params(("id" = Uuid, Path, description = "Subsection ID")),
    responses((status = 200, description = "Comments", body = [Comment]))
)]
pub async fn get_comments(
    State(state): State<AppState>,
    Path(subsection_id): Path<Uuid>,
) -> Json<Vec<models::Comment>> {
    Json(state.repo.get_comments(subsection_id).await)
}

/// add_comment
///
/// [Authenticated Route] Posts a comment on a subsection. Blank comments are rejected.
#[utoipa::path(
    post,
    path = "/subsections/{id}/comments",
    params(("id" = Uuid, Path, description = "Subsection ID")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment Added", body = Comment),
        (status = 400, description = "Empty comment")
    )
)]
pub async fn add_comment(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(subsection_id): Path<Uuid>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<models::Comment>), StatusCode> {
    let text = payload.text.trim();
    if text.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    match state
        .repo
        .add_comment(subsection_id, user_id, text.to_string())
        .await
    {
        Some(comment) => Ok((StatusCode::CREATED, Json(comment))),
        None => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

/// delete_comment
///
/// [Authenticated Route] Admins may delete any comment; everyone else only their own.
#[utoipa::path(
    delete,
    path = "/comments/{id}",
    params(("id" = i64, Path, description = "Comment ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_comment(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> StatusCode {
    let deleted = if user.is_admin() {
        state.repo.delete_comment_admin(id).await
    } else {
        state.repo.delete_comment(id, user.id).await
    };
    // Not found and not yours look the same from outside.
    if deleted {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// complete_subsection
///
/// [Authenticated Route] Records that the caller finished a subsection. Idempotent.
#[utoipa::path(
    post,
    path = "/subsections/{id}/complete",
    params(("id" = Uuid, Path, description = "Subsection ID")),
    responses((status = 200, description = "Progress recorded", body = Progress))
)]
pub async fn complete_subsection(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(subsection_id): Path<Uuid>,
) -> Result<Json<models::Progress>, StatusCode> {
    state
        .repo
        .mark_complete(user_id, subsection_id)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// get_my_progress
///
/// [Authenticated Route] Every subsection the caller has completed.
#[utoipa::path(
    get,
    path = "/me/progress",
    responses((status = 200, description = "My progress", body = [Progress]))
)]
pub async fn get_my_progress(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Json<Vec<models::Progress>> {
    Json(state.repo.get_progress(id).await)
}

/// get_my_certifications
///
/// [Authenticated Route] The caller's certification workflows, one per level.
#[utoipa::path(
    get,
    path = "/me/certifications",
    responses((status = 200, description = "My workflows", body = [CertificationWorkflow]))
)]
pub async fn get_my_certifications(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<models::CertificationWorkflow>>, StatusCode> {
    state
        .workflows
        .workflows_for_user(id)
        .await
        .map(Json)
        .map_err(|e| {
            tracing::error!("workflows_for_user error: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

/// get_me
///
/// [Authenticated Route] The caller's profile.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Profile", body = UserProfile),
        (status = 404, description = "Profile missing")
    )
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>, StatusCode> {
    let user = state.repo.get_user(id).await.ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(UserProfile {
        id: user.id,
        email: user.email,
        role: user.role,
        // Stable generated avatar seeded by the user id.
        avatar_url: Some(format!(
            "https://api.dicebear.com/7.x/avataaars/svg?seed={}",
            user.id
        )),
    }))
}

/// register_user
///
/// [Public Route] Signs the user up with Supabase Auth, then mirrors the returned
/// `auth.users.id` into `public.profiles` so both tables share one primary key.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterUserRequest,
    responses(
        (status = 200, description = "Registered", body = User),
        (status = 400, description = "Rejected by Supabase Auth")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterUserRequest>,
) -> Result<Json<User>, StatusCode> {
    // Self-registration never grants admin.
    if payload.role != "student" {
        return Err(StatusCode::BAD_REQUEST);
    }

    let auth_url = format!("{}/auth/v1/signup", state.config.supabase_url);
    let response = reqwest::Client::new()
        .post(auth_url)
        .header("apikey", &state.config.supabase_key)
        .json(&serde_json::json!({ "email": payload.email, "password": payload.password }))
        .send()
        .await
        .map_err(|e| {
            tracing::error!("supabase signup request failed: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    if !response.status().is_success() {
        tracing::warn!(status = %response.status(), "supabase rejected signup");
        return Err(StatusCode::BAD_REQUEST);
    }

    let supabase_user = response
        .json::<SupabaseAuthResponse>()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let new_user = User {
        id: supabase_user.id,
        email: payload.email,
        role: payload.role,
    };

    state
        .repo
        .create_user(new_user)
        .await
        .map(Json)
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
}

// --- Admin Handlers ---
// The admin middleware has already rejected non-admins before these run.

/// get_admin_stats
///
/// [Admin Route] Dashboard counters.
#[utoipa::path(
    get,
    path = "/admin/stats",
    responses((status = 200, description = "Stats", body = AdminDashboardStats))
)]
pub async fn get_admin_stats(State(state): State<AppState>) -> Json<AdminDashboardStats> {
    Json(state.repo.get_stats().await)
}

/// get_admin_courses
///
/// [Admin Route] Every course, unpublished first.
#[utoipa::path(
    get,
    path = "/admin/courses",
    responses((status = 200, description = "All courses", body = [Course]))
)]
pub async fn get_admin_courses(State(state): State<AppState>) -> Json<Vec<models::Course>> {
    Json(state.repo.get_all_courses().await)
}

/// get_admin_course_outline
///
/// [Admin Route] Outline of any course, drafts included, for review before publishing.
#[utoipa::path(
    get,
    path = "/admin/courses/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Found", body = CourseOutline),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_admin_course_outline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<models::CourseOutline>, StatusCode> {
    state
        .repo
        .get_course_outline(id, true)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// update_course_status
///
/// [Admin Route] Publish (`true`) or hide (`false`) a course.
#[utoipa::path(
    put,
    path = "/admin/courses/{id}/status",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = bool,
    responses(
        (status = 200, description = "Updated", body = Course),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_course_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(is_published): Json<bool>,
) -> Result<Json<models::Course>, StatusCode> {
    match state.repo.set_course_status(id, is_published).await {
        Some(course) => Ok(Json(course)),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// get_admin_certifications
///
/// [Admin Route] Workflow records at a given step (default: awaiting approval).
#[utoipa::path(
    get,
    path = "/admin/certifications",
    params(WorkflowFilter),
    responses((status = 200, description = "Workflows", body = [CertificationWorkflow]))
)]
pub async fn get_admin_certifications(
    State(state): State<AppState>,
    Query(filter): Query<WorkflowFilter>,
) -> Result<Json<Vec<models::CertificationWorkflow>>, StatusCode> {
    let step = filter.step.as_deref().unwrap_or(STEP_APPROVAL);
    state
        .workflows
        .workflows_at_step(step)
        .await
        .map(Json)
        .map_err(|e| {
            tracing::error!("workflows_at_step error: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
}
