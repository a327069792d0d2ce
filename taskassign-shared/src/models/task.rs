/// Task model and database operations
///
/// A task is either claimed by an existing account or pending on an email
/// address that has no account yet.
///
/// # State Machine
///
/// ```text
/// pending → claimed      (deferred claim after the assignee registers)
/// claimed                (created directly, or assigned to a known account)
/// ```
///
/// A claimed task never returns to pending.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id BIGSERIAL PRIMARY KEY,
///     owner_id BIGINT REFERENCES users(id) ON DELETE CASCADE,
///     detail TEXT NOT NULL DEFAULT '',
///     complete_by TIMESTAMPTZ,
///     assigned_to TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// `owner_id IS NULL` is the storage form of [`TaskOwner::Pending`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Ownership state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum TaskOwner {
    /// Owned by an existing user
    Claimed { owner_id: i64 },

    /// Waiting for the assignee to register
    Pending,
}

impl TaskOwner {
    /// Builds the state from the nullable `owner_id` column
    pub fn from_column(owner_id: Option<i64>) -> Self {
        match owner_id {
            Some(owner_id) => TaskOwner::Claimed { owner_id },
            None => TaskOwner::Pending,
        }
    }

    /// Owner ID, if claimed
    pub fn owner_id(&self) -> Option<i64> {
        match self {
            TaskOwner::Claimed { owner_id } => Some(*owner_id),
            TaskOwner::Pending => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, TaskOwner::Pending)
    }
}

/// A task as seen by callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Store-assigned identifier
    pub id: i64,

    /// Claimed or pending
    #[serde(flatten)]
    pub owner: TaskOwner,

    /// Free-form description
    pub detail: String,

    /// Deadline
    pub complete_by: Option<DateTime<Utc>>,

    /// Invitee email, independent of whether an account exists for it
    pub assigned_to: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// True when the task is still waiting for its assignee to register
    pub fn is_pending(&self) -> bool {
        self.owner.is_pending()
    }
}

/// Raw `tasks` row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaskRow {
    pub id: i64,
    pub owner_id: Option<i64>,
    pub detail: String,
    pub complete_by: Option<DateTime<Utc>>,
    pub assigned_to: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Task {
            id: row.id,
            owner: TaskOwner::from_column(row.owner_id),
            detail: row.detail,
            complete_by: row.complete_by,
            assigned_to: row.assigned_to,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Task fields supplied by a client on creation or assignment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    #[serde(default)]
    pub detail: String,

    #[serde(default)]
    pub complete_by: Option<DateTime<Utc>>,

    #[serde(default)]
    pub assigned_to: Option<String>,
}

/// Input for inserting a task row
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub owner: TaskOwner,
    pub detail: String,
    pub complete_by: Option<DateTime<Utc>>,
    pub assigned_to: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Mutable task fields. `None` leaves the current value in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default)]
    pub owner_id: Option<i64>,

    #[serde(default)]
    pub detail: Option<String>,

    #[serde(default)]
    pub complete_by: Option<DateTime<Utc>>,
}

const TASK_COLUMNS: &str =
    "id, owner_id, detail, complete_by, assigned_to, created_at, updated_at";

impl Task {
    /// Inserts a new task
    ///
    /// # Errors
    ///
    /// Fails with a foreign key violation when a claimed owner does not exist.
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            INSERT INTO tasks (owner_id, detail, complete_by, assigned_to, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(data.owner.owner_id())
        .bind(data.detail)
        .bind(data.complete_by)
        .bind(data.assigned_to)
        .bind(data.created_at)
        .bind(data.updated_at)
        .fetch_one(pool)
        .await?;

        Ok(row.into())
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(Task::from))
    }

    /// Writes the mutable fields of `task` back to its row
    ///
    /// Returns `None` if the row no longer exists. `assigned_to` and
    /// `created_at` are never rewritten.
    pub async fn update(pool: &PgPool, task: &Task) -> Result<Option<Self>, sqlx::Error> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            UPDATE tasks
            SET owner_id = $2,
                detail = $3,
                complete_by = $4,
                updated_at = $5
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(task.id)
        .bind(task.owner.owner_id())
        .bind(&task.detail)
        .bind(task.complete_by)
        .bind(task.updated_at)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(Task::from))
    }

    /// Claims a pending task for `owner_id` in a single conditional write
    ///
    /// Only matches a row that is still pending and assigned to exactly
    /// `assigned_to`. `updated_at` becomes the later of `now` and one
    /// microsecond past the stored value. Returns `None` when no row matched.
    pub async fn claim(
        pool: &PgPool,
        id: i64,
        owner_id: i64,
        assigned_to: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            UPDATE tasks
            SET owner_id = $2,
                updated_at = GREATEST($4, updated_at + INTERVAL '1 microsecond')
            WHERE id = $1
              AND owner_id IS NULL
              AND assigned_to = $3
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(owner_id)
        .bind(assigned_to)
        .bind(now)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(Task::from))
    }

    /// Deletes a task, returning whether a row was removed
    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists tasks claimed by a user, oldest first
    pub async fn list_by_owner(pool: &PgPool, owner_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE owner_id = $1 ORDER BY id"
        ))
        .bind(owner_id)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(Task::from).collect())
    }
}
