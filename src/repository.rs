use crate::models::{AdminDashboardStats, Comment, Course, CourseOutline, Progress, Section, SectionOutline, Subsection, User};
use async_trait::async_trait;
use sqlx::PgPool;
use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

/// Repository Trait
///
/// Abstract contract for the learning-content persistence operations. Handlers only
/// see this trait, so tests swap in hand-written mocks.
///
/// **Send + Sync + async_trait** are required to share `Arc<dyn Repository>` across
/// Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- User/Auth ---
    async fn get_user(&self, id: Uuid) -> Option<User>;
    async fn create_user(&self, user: User) -> Option<User>;
    async fn get_stats(&self) -> AdminDashboardStats;

    // --- Course Content ---
    // Published courses only.
    async fn get_courses(&self) -> Vec<Course>;
    // Admin access: every course regardless of status.
    async fn get_all_courses(&self) -> Vec<Course>;
    // Full outline; unpublished courses only when `include_unpublished` is set.
    async fn get_course_outline(&self, id: Uuid, include_unpublished: bool) -> Option<CourseOutline>;
    // Admin action: publish or hide a course.
    async fn set_course_status(&self, id: Uuid, is_published: bool) -> Option<Course>;

    // --- Comments & Moderation ---
    async fn add_comment(&self, subsection_id: Uuid, user_id: Uuid, text: String) -> Option<Comment>;
    async fn get_comments(&self, subsection_id: Uuid) -> Vec<Comment>;
    /// User: delete their OWN comment.
    async fn delete_comment(&self, id: i64, user_id: Uuid) -> bool;
    /// Admin: delete ANY comment.
    async fn delete_comment_admin(&self, id: i64) -> bool;

    // --- Progress Tracking ---
    // Idempotent: completing a subsection twice keeps the first timestamp.
    async fn mark_complete(&self, user_id: Uuid, subsection_id: Uuid) -> Option<Progress>;
    async fn get_progress(&self, user_id: Uuid) -> Vec<Progress>;
}

pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// `Repository` backed by the Supabase Postgres database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn count(&self, sql: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(sql)
            .fetch_one(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("count error ({}): {:?}", sql, e);
                0
            })
    }
}

const COURSE_COLUMNS: &str = "id, title, description, level, is_published, created_at, updated_at";

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> Option<User> {
        sqlx::query_as::<_, User>("SELECT id, email, role FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_user error: {:?}", e);
                None
            })
    }

    /// create_user
    ///
    /// Creates the mirroring profile record after Supabase Auth accepted the signup.
    async fn create_user(&self, user: User) -> Option<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO profiles (id, email, role) VALUES ($1, $2, $3) RETURNING id, email, role",
        )
        .bind(user.id)
        .bind(user.email)
        .bind(user.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| tracing::error!("create_user error: {:?}", e))
        .ok()
    }

    async fn get_stats(&self) -> AdminDashboardStats {
        AdminDashboardStats {
            total_courses: self.count("SELECT COUNT(*) FROM courses").await,
            total_users: self.count("SELECT COUNT(*) FROM profiles").await,
            total_comments: self.count("SELECT COUNT(*) FROM subsection_comments").await,
            pending_approvals: self
                .count("SELECT COUNT(*) FROM certification_workflows WHERE current_step = 'approval'")
                .await,
        }
    }

    async fn get_courses(&self) -> Vec<Course> {
        let sql = format!("SELECT {COURSE_COLUMNS} FROM courses WHERE is_published = true ORDER BY level ASC, title ASC");
        match sqlx::query_as::<_, Course>(&sql).fetch_all(&self.pool).await {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("get_courses error: {:?}", e);
                vec![]
            }
        }
    }

    async fn get_all_courses(&self) -> Vec<Course> {
        let sql = format!("SELECT {COURSE_COLUMNS} FROM courses ORDER BY is_published ASC, level ASC, title ASC");
        match sqlx::query_as::<_, Course>(&sql).fetch_all(&self.pool).await {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("get_all_courses error: {:?}", e);
                vec![]
            }
        }
    }

    /// get_course_outline
    ///
    /// Three round trips: the course, its sections, then every subsection of those
    /// sections. Subsections are grouped in memory.
    async fn get_course_outline(&self, id: Uuid, include_unpublished: bool) -> Option<CourseOutline> {
        let sql = format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1 AND (is_published = true OR $2)");
        let course = sqlx::query_as::<_, Course>(&sql)
            .bind(id)
            .bind(include_unpublished)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_course_outline error: {:?}", e);
                None
            })?;

        let sections = sqlx::query_as::<_, Section>(
            "SELECT id, course_id, title, position FROM sections WHERE course_id = $1 ORDER BY position ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_course_outline sections error: {:?}", e);
            vec![]
        });

        let section_ids: Vec<Uuid> = sections.iter().map(|s| s.id).collect();
        let subsections = sqlx::query_as::<_, Subsection>(
            r#"
            SELECT id, section_id, title, content, video_url, position
            FROM subsections
            WHERE section_id = ANY($1)
            ORDER BY position ASC
            "#,
        )
        .bind(&section_ids)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_course_outline subsections error: {:?}", e);
            vec![]
        });

        let mut by_section: HashMap<Uuid, Vec<Subsection>> = HashMap::new();
        for sub in subsections {
            by_section.entry(sub.section_id).or_default().push(sub);
        }

        let sections = sections
            .into_iter()
            .map(|section| SectionOutline {
                subsections: by_section.remove(&section.id).unwrap_or_default(),
                section,
            })
            .collect();

        Some(CourseOutline { course, sections })
    }

    async fn set_course_status(&self, id: Uuid, is_published: bool) -> Option<Course> {
        let sql = format!("UPDATE courses SET is_published = $1, updated_at = NOW() WHERE id = $2 RETURNING {COURSE_COLUMNS}");
        sqlx::query_as::<_, Course>(&sql)
            .bind(is_published)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("status error: {:?}", e);
                None
            })
    }

    /// add_comment
    ///
    /// Inserts and joins with `profiles` in one CTE so the author's email comes back
    /// with the new row.
    async fn add_comment(&self, subsection_id: Uuid, user_id: Uuid, text: String) -> Option<Comment> {
        sqlx::query_as::<_, Comment>(
            r#"
            WITH inserted AS (
                INSERT INTO subsection_comments (subsection_id, user_id, comment) VALUES ($1, $2, $3)
                RETURNING id, user_id, subsection_id, comment, created_at
            )
            SELECT i.id, i.user_id, i.subsection_id, i.comment, i.created_at, p.email as author_email
            FROM inserted i JOIN profiles p ON i.user_id = p.id
            "#,
        )
        .bind(subsection_id)
        .bind(user_id)
        .bind(text)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| tracing::error!("add_comment error: {:?}", e))
        .ok()
    }

    /// get_comments
    ///
    /// Only returns comments whose subsection belongs to a published course.
    async fn get_comments(&self, subsection_id: Uuid) -> Vec<Comment> {
        sqlx::query_as::<_, Comment>(
            r#"
            SELECT c.id, c.user_id, c.subsection_id, c.comment, c.created_at, p.email as author_email
            FROM subsection_comments c
            JOIN profiles p ON c.user_id = p.id
            JOIN subsections sub ON c.subsection_id = sub.id
            JOIN sections s ON sub.section_id = s.id
            JOIN courses co ON s.course_id = co.id
            WHERE c.subsection_id = $1 AND co.is_published = true
            ORDER BY c.created_at ASC
            "#,
        )
        .bind(subsection_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_comments error: {:?}", e);
            vec![]
        })
    }

    async fn delete_comment(&self, id: i64, user_id: Uuid) -> bool {
        match sqlx::query("DELETE FROM subsection_comments WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete comment error: {:?}", e);
                false
            }
        }
    }

    async fn delete_comment_admin(&self, id: i64) -> bool {
        match sqlx::query("DELETE FROM subsection_comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("admin delete comment error: {:?}", e);
                false
            }
        }
    }

    /// mark_complete
    ///
    /// `ON CONFLICT` keeps the original completion time; the no-op update makes
    /// `RETURNING` yield the existing row.
    async fn mark_complete(&self, user_id: Uuid, subsection_id: Uuid) -> Option<Progress> {
        sqlx::query_as::<_, Progress>(
            r#"
            INSERT INTO subsection_progress (user_id, subsection_id, completed_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_id, subsection_id) DO UPDATE SET completed_at = subsection_progress.completed_at
            RETURNING user_id, subsection_id, completed_at
            "#,
        )
        .bind(user_id)
        .bind(subsection_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| tracing::error!("mark_complete error: {:?}", e))
        .ok()
    }

    async fn get_progress(&self, user_id: Uuid) -> Vec<Progress> {
        sqlx::query_as::<_, Progress>(
            "SELECT user_id, subsection_id, completed_at FROM subsection_progress WHERE user_id = $1 ORDER BY completed_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_progress error: {:?}", e);
            vec![]
        })
    }
}
