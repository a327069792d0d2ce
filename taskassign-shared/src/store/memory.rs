//! In-memory credential store for tests and local runs.
//!
//! Mirrors the constraints of the Postgres schema: unique email, and claimed
//! tasks must reference an existing user.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use super::{CredentialStore, StoreError, StoreResult};
use crate::models::{
    task::{CreateTask, Task, TaskOwner},
    user::{CreateUser, User, UserCredentials},
};

/// Thread-safe in-memory store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<InMemoryState>>,
}

#[derive(Debug, Default)]
struct InMemoryState {
    users: BTreeMap<i64, UserCredentials>,
    email_index: HashMap<String, i64>,
    tasks: BTreeMap<i64, Task>,
    next_user_id: i64,
    next_task_id: i64,
}

impl InMemoryState {
    fn check_owner(&self, owner: &TaskOwner) -> StoreResult<()> {
        match owner.owner_id() {
            Some(owner_id) if !self.users.contains_key(&owner_id) => Err(
                StoreError::ForeignKeyViolation("tasks_owner_id_fkey".to_string()),
            ),
            _ => Ok(()),
        }
    }
}

fn poisoned(err: impl ToString) -> StoreError {
    StoreError::backend(std::io::Error::other(err.to_string()))
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub fn user_count(&self) -> usize {
        self.state.read().map(|s| s.users.len()).unwrap_or(0)
    }

    /// Number of stored tasks.
    pub fn task_count(&self) -> usize {
        self.state.read().map(|s| s.tasks.len()).unwrap_or(0)
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn create_user(&self, user: CreateUser) -> StoreResult<User> {
        let mut state = self.state.write().map_err(poisoned)?;
        if state.email_index.contains_key(&user.email) {
            return Err(StoreError::UniqueViolation("users_email_key".to_string()));
        }

        state.next_user_id += 1;
        let id = state.next_user_id;
        let stored = User {
            id,
            name: user.name,
            email: user.email,
            created_at: user.created_at,
            updated_at: user.updated_at,
        };

        state.email_index.insert(stored.email.clone(), id);
        state.users.insert(
            id,
            UserCredentials {
                user: stored.clone(),
                password_hash: user.password_hash,
            },
        );
        Ok(stored)
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<UserCredentials>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .email_index
            .get(email)
            .and_then(|id| state.users.get(id))
            .cloned())
    }

    async fn create_task(&self, task: CreateTask) -> StoreResult<Task> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.check_owner(&task.owner)?;

        state.next_task_id += 1;
        let stored = Task {
            id: state.next_task_id,
            owner: task.owner,
            detail: task.detail,
            complete_by: task.complete_by,
            assigned_to: task.assigned_to,
            created_at: task.created_at,
            updated_at: task.updated_at,
        };
        state.tasks.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_task_by_id(&self, id: i64) -> StoreResult<Option<Task>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn update_task(&self, task: &Task) -> StoreResult<Option<Task>> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.check_owner(&task.owner)?;

        let Some(existing) = state.tasks.get_mut(&task.id) else {
            return Ok(None);
        };
        existing.owner = task.owner;
        existing.detail = task.detail.clone();
        existing.complete_by = task.complete_by;
        existing.updated_at = task.updated_at;
        Ok(Some(existing.clone()))
    }

    async fn claim_task(
        &self,
        id: i64,
        owner_id: i64,
        assigned_to: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Task>> {
        let mut state = self.state.write().map_err(poisoned)?;
        let owner = TaskOwner::Claimed { owner_id };
        state.check_owner(&owner)?;

        let Some(existing) = state.tasks.get_mut(&id) else {
            return Ok(None);
        };
        if !existing.is_pending() || existing.assigned_to.as_deref() != Some(assigned_to) {
            return Ok(None);
        }
        existing.owner = owner;
        existing.updated_at = now.max(existing.updated_at + Duration::microseconds(1));
        Ok(Some(existing.clone()))
    }

    async fn delete_task(&self, id: i64) -> StoreResult<bool> {
        let mut state = self.state.write().map_err(poisoned)?;
        Ok(state.tasks.remove(&id).is_some())
    }

    async fn list_tasks_by_owner(&self, owner_id: i64) -> StoreResult<Vec<Task>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .tasks
            .values()
            .filter(|task| task.owner.owner_id() == Some(owner_id))
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.state.read().map(|_| ()).map_err(poisoned)
    }
}
