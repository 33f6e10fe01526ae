use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// The user's canonical identity record stored in `public.profiles`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    // Primary Key, also the Foreign Key to the external auth.users table.
    pub id: Uuid,
    pub email: String,
    // The RBAC field: 'student' or 'admin'.
    pub role: String,
}

/// Course
///
/// Top-level unit of learning content (`public.courses`). Only published courses are
/// visible outside the admin area.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    // Certification level the course prepares for.
    pub level: i32,
    pub is_published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Section
///
/// Ordered chapter of a course (`public.sections`).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Section {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub position: i32,
}

/// Subsection
///
/// Smallest piece of content a student completes (`public.subsections`).
/// Comments and progress entries hang off a subsection.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Subsection {
    pub id: Uuid,
    pub section_id: Uuid,
    pub title: String,
    pub content: Option<String>,
    pub video_url: Option<String>,
    pub position: i32,
}

/// SectionOutline
///
/// A section together with its subsections, ordered by `position`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SectionOutline {
    #[serde(flatten)]
    pub section: Section,
    pub subsections: Vec<Subsection>,
}

/// CourseOutline
///
/// Output schema for GET /courses/{id}: the course and its full content tree.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CourseOutline {
    pub course: Course,
    pub sections: Vec<SectionOutline>,
}

/// Comment
///
/// A comment on a subsection (`public.subsection_comments`), augmented with the
/// author's email via a join.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Comment {
    pub id: i64,
    pub user_id: Uuid,
    pub subsection_id: Uuid,
    pub comment: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[sqlx(default)]
    pub author_email: Option<String>,
}

/// Progress
///
/// One completed subsection for one user (`public.subsection_progress`).
/// The pair `(user_id, subsection_id)` is the primary key.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Progress {
    pub user_id: Uuid,
    pub subsection_id: Uuid,
    #[ts(type = "string")]
    pub completed_at: DateTime<Utc>,
}

/// CertificationWorkflow
///
/// Per-user, per-level record tracking progress through the exam/certification
/// process (`public.certification_workflows`). Created elsewhere; the exam webhook
/// only ever updates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct CertificationWorkflow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub level: i32,
    // e.g. "exam", "approval"
    pub current_step: String,
    pub exam_status: Option<String>,
    /// Whatever the exam provider reported, stored verbatim.
    #[schema(value_type = Option<Object>)]
    pub exam_results_json: Option<Value>,
    pub exam_submission_url: Option<String>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterUserRequest
///
/// Input payload for POST /register. The password is only forwarded to Supabase Auth.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterUserRequest {
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCommentRequest {
    pub text: String,
}

// --- Dashboard & Profile Schemas (Output) ---

/// AdminDashboardStats
///
/// Output schema for GET /admin/stats.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AdminDashboardStats {
    pub total_courses: i64,
    pub total_users: i64,
    pub total_comments: i64,
    /// Workflow records waiting at the `approval` step.
    pub pending_approvals: i64,
}

/// UserProfile
///
/// Output schema for GET /me.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub avatar_url: Option<String>,
}

// --- Webhook Envelopes ---

/// ExamWebhookPayload
///
/// Documented shape of the exam provider's request. The handler does not deserialize
/// into this type; it validates `user_id` and `level` and keeps the rest verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExamWebhookPayload {
    pub user_id: String,
    /// Number or string; matched against the workflow level as text.
    #[schema(value_type = String, example = "2")]
    pub level: Value,
    #[schema(value_type = Option<Object>)]
    pub exam_results: Option<Value>,
    pub submission_url: Option<String>,
}

/// WebhookAck
///
/// Success envelope returned to the exam provider.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct WebhookAck {
    pub success: bool,
    pub message: String,
}

/// ErrorEnvelope
///
/// Uniform `{ "error": ... }` body for every webhook failure.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ErrorEnvelope {
    pub error: String,
}
