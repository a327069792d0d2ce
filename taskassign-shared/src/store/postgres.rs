//! Postgres-backed credential store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{CredentialStore, StoreError, StoreResult};
use crate::{
    db::pool::health_check,
    models::{
        task::{CreateTask, Task},
        user::{CreateUser, User, UserCredentials},
    },
};

/// Credential store over a sqlx connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wraps an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let constraint = db_err.constraint().unwrap_or("unknown").to_string();
            if db_err.is_unique_violation() {
                return StoreError::UniqueViolation(constraint);
            }
            if db_err.is_foreign_key_violation() {
                return StoreError::ForeignKeyViolation(constraint);
            }
        }
        StoreError::backend(err)
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn create_user(&self, user: CreateUser) -> StoreResult<User> {
        Ok(User::create(&self.pool, user).await?)
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<UserCredentials>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn create_task(&self, task: CreateTask) -> StoreResult<Task> {
        Ok(Task::create(&self.pool, task).await?)
    }

    async fn get_task_by_id(&self, id: i64) -> StoreResult<Option<Task>> {
        Ok(Task::find_by_id(&self.pool, id).await?)
    }

    async fn update_task(&self, task: &Task) -> StoreResult<Option<Task>> {
        Ok(Task::update(&self.pool, task).await?)
    }

    async fn claim_task(
        &self,
        id: i64,
        owner_id: i64,
        assigned_to: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Task>> {
        Ok(Task::claim(&self.pool, id, owner_id, assigned_to, now).await?)
    }

    async fn delete_task(&self, id: i64) -> StoreResult<bool> {
        Ok(Task::delete(&self.pool, id).await?)
    }

    async fn list_tasks_by_owner(&self, owner_id: i64) -> StoreResult<Vec<Task>> {
        Ok(Task::list_by_owner(&self.pool, owner_id).await?)
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(health_check(&self.pool).await?)
    }
}
