use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{error::StoreError, models::CertificationWorkflow};

/// Status written to `exam_status` once results arrive.
pub const EXAM_STATUS_SUBMITTED: &str = "submitted";
/// Step a workflow moves to once the exam has been submitted.
pub const STEP_APPROVAL: &str = "approval";

/// WorkflowKey
///
/// Identifies one certification workflow record, as sent by the exam provider.
/// `user_id` is compared as a UUID (so case and hyphenation do not matter); a value
/// that is not a UUID matches nothing. `level` is compared against the integer column
/// as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowKey {
    pub user_id: String,
    pub level: String,
}

impl WorkflowKey {
    fn not_found(&self) -> StoreError {
        StoreError::NotFound {
            user_id: self.user_id.clone(),
            level: self.level.clone(),
        }
    }

    fn multiple(&self, count: usize) -> StoreError {
        StoreError::MultipleMatches {
            user_id: self.user_id.clone(),
            level: self.level.clone(),
            count,
        }
    }

    fn parsed_user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.user_id).ok()
    }

    fn matches(&self, record: &CertificationWorkflow) -> bool {
        self.parsed_user_id() == Some(record.user_id) && record.level.to_string() == self.level
    }
}

/// ExamSubmissionUpdate
///
/// The field set applied by the exam webhook. `exam_status` and `current_step` are fixed
/// by the store, so only the variable parts travel here.
#[derive(Debug, Clone, PartialEq)]
pub struct ExamSubmissionUpdate {
    pub exam_results_json: Value,
    pub exam_submission_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// WorkflowStore
///
/// Contract over the certification workflow table. The update never creates a record:
/// exactly one row must match the key, otherwise nothing is changed and an error is returned.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Marks the exam as submitted and moves the workflow to the approval step,
    /// returning the updated record.
    async fn record_exam_submission(
        &self,
        key: &WorkflowKey,
        update: ExamSubmissionUpdate,
    ) -> Result<CertificationWorkflow, StoreError>;

    /// Workflows of one user, lowest level first.
    async fn workflows_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<CertificationWorkflow>, StoreError>;

    /// Workflows sitting at `step`, most recently updated first.
    async fn workflows_at_step(&self, step: &str)
    -> Result<Vec<CertificationWorkflow>, StoreError>;
}

pub type WorkflowState = Arc<dyn WorkflowStore>;

const WORKFLOW_COLUMNS: &str = "id, user_id, level, current_step, exam_status, \
     exam_results_json, exam_submission_url, updated_at";

/// PostgresWorkflowStore
///
/// Workflow store backed by the Supabase Postgres database.
pub struct PostgresWorkflowStore {
    pool: PgPool,
}

impl PostgresWorkflowStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkflowStore for PostgresWorkflowStore {
    /// record_exam_submission
    ///
    /// Runs the UPDATE inside a transaction and only commits when exactly one row came
    /// back. Dropping the transaction on any other outcome rolls the update back.
    async fn record_exam_submission(
        &self,
        key: &WorkflowKey,
        update: ExamSubmissionUpdate,
    ) -> Result<CertificationWorkflow, StoreError> {
        let Some(user_id) = key.parsed_user_id() else {
            return Err(key.not_found());
        };

        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE certification_workflows \
             SET exam_status = $3, exam_results_json = $4, exam_submission_url = $5, \
                 current_step = $6, updated_at = $7 \
             WHERE user_id = $1 AND level::text = $2 \
             RETURNING {WORKFLOW_COLUMNS}"
        );

        let mut rows = sqlx::query_as::<_, CertificationWorkflow>(&sql)
            .bind(user_id)
            .bind(&key.level)
            .bind(EXAM_STATUS_SUBMITTED)
            .bind(&update.exam_results_json)
            .bind(&update.exam_submission_url)
            .bind(STEP_APPROVAL)
            .bind(update.updated_at)
            .fetch_all(&mut *tx)
            .await?;

        match rows.len() {
            0 => Err(key.not_found()),
            1 => {
                tx.commit().await?;
                rows.pop().ok_or_else(|| key.not_found())
            }
            count => Err(key.multiple(count)),
        }
    }

    async fn workflows_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<CertificationWorkflow>, StoreError> {
        let sql = format!(
            "SELECT {WORKFLOW_COLUMNS} FROM certification_workflows \
             WHERE user_id = $1 ORDER BY level ASC"
        );
        Ok(sqlx::query_as::<_, CertificationWorkflow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn workflows_at_step(
        &self,
        step: &str,
    ) -> Result<Vec<CertificationWorkflow>, StoreError> {
        let sql = format!(
            "SELECT {WORKFLOW_COLUMNS} FROM certification_workflows \
             WHERE current_step = $1 ORDER BY updated_at DESC"
        );
        Ok(sqlx::query_as::<_, CertificationWorkflow>(&sql)
            .bind(step)
            .fetch_all(&self.pool)
            .await?)
    }
}

/// InMemoryWorkflowStore
///
/// Workflow store kept in process memory. Used by the test suite and for running the
/// webhook locally without a database.
#[derive(Clone, Default)]
pub struct InMemoryWorkflowStore {
    records: Arc<Mutex<Vec<CertificationWorkflow>>>,
    /// When true, every operation fails as if the database were down.
    pub should_fail: bool,
}

impl InMemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<CertificationWorkflow>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
            should_fail: false,
        }
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Copy of every stored record, in insertion order.
    pub async fn snapshot(&self) -> Vec<CertificationWorkflow> {
        self.records.lock().await.clone()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.should_fail {
            return Err(StoreError::Unavailable(
                "in-memory store set to fail".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
    async fn record_exam_submission(
        &self,
        key: &WorkflowKey,
        update: ExamSubmissionUpdate,
    ) -> Result<CertificationWorkflow, StoreError> {
        self.check_available()?;
        let mut records = self.records.lock().await;

        let matching: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, record)| key.matches(record))
            .map(|(idx, _)| idx)
            .collect();

        let idx = match matching.as_slice() {
            [] => return Err(key.not_found()),
            [idx] => *idx,
            many => return Err(key.multiple(many.len())),
        };

        let record = records.get_mut(idx).ok_or_else(|| key.not_found())?;
        record.exam_status = Some(EXAM_STATUS_SUBMITTED.to_string());
        record.exam_results_json = Some(update.exam_results_json);
        record.exam_submission_url = update.exam_submission_url;
        record.current_step = STEP_APPROVAL.to_string();
        record.updated_at = update.updated_at;
        Ok(record.clone())
    }

    async fn workflows_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<CertificationWorkflow>, StoreError> {
        self.check_available()?;
        let mut found: Vec<_> = self
            .records
            .lock()
            .await
            .iter()
            .filter(|record| record.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by_key(|record| record.level);
        Ok(found)
    }

    async fn workflows_at_step(
        &self,
        step: &str,
    ) -> Result<Vec<CertificationWorkflow>, StoreError> {
        self.check_available()?;
        let mut found: Vec<_> = self
            .records
            .lock()
            .await
            .iter()
            .filter(|record| record.current_step == step)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(found)
    }
}
