//! Credential store port for users and tasks.
//!
//! Lookups report absence with `None`/`false`. [`StoreError`] is reserved for
//! constraint rejections and backend failures, so callers can tell "not there"
//! apart from "could not ask".

use crate::models::{
    task::{CreateTask, Task},
    user::{CreateUser, User, UserCredentials},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Durable user and task records keyed by numeric ID.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Inserts a user.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UniqueViolation`] when the email is taken.
    async fn create_user(&self, user: CreateUser) -> StoreResult<User>;

    /// Finds a user and their digest by exact email match.
    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<UserCredentials>>;

    /// Inserts a task.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ForeignKeyViolation`] when a claimed owner does
    /// not exist.
    async fn create_task(&self, task: CreateTask) -> StoreResult<Task>;

    /// Finds a task by ID.
    async fn get_task_by_id(&self, id: i64) -> StoreResult<Option<Task>>;

    /// Persists the owner, detail, deadline and `updated_at` of an existing task.
    ///
    /// Returns `None` when the task does not exist.
    async fn update_task(&self, task: &Task) -> StoreResult<Option<Task>>;

    /// Atomically claims a task that is still pending on `assigned_to`
    ///
    /// `updated_at` becomes `max(now, stored + 1µs)`. Returns `None` when the
    /// task is missing, already owned, or assigned to another address.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ForeignKeyViolation`] when `owner_id` does not
    /// exist.
    async fn claim_task(
        &self,
        id: i64,
        owner_id: i64,
        assigned_to: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Task>>;

    /// Deletes a task. Returns `false` when nothing was deleted.
    async fn delete_task(&self, id: i64) -> StoreResult<bool>;

    /// Lists tasks claimed by `owner_id`, oldest first.
    async fn list_tasks_by_owner(&self, owner_id: i64) -> StoreResult<Vec<Task>>;

    /// Verifies the backend is reachable.
    async fn health_check(&self) -> StoreResult<()>;
}

/// Errors returned by store implementations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// A write referenced a row that does not exist.
    #[error("referenced row does not exist: {0}")]
    ForeignKeyViolation(String),

    /// Connectivity or other backend failure.
    #[error("store backend error: {0}")]
    Backend(Arc<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wraps a backend error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Arc::new(err))
    }
}
