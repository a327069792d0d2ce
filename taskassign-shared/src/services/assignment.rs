/// Assignment coordinator
///
/// Tasks are created either claimed by a known account or pending on an
/// email address. A pending task is claimed later, when someone registers
/// with the matching address through the invitation link.
///
/// # Flow
///
/// ```text
/// assign_task(bob@…)
///   ├─ bob has an account → Claimed { owner_id: bob }
///   └─ no account         → Pending, invite sent with ?tid=<id>
///
/// register(bob@…, tid)    → claim_pending_task → Claimed { owner_id: bob }
/// ```

use chrono::{DateTime, Duration, Utc};
use mockable::Clock;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::identity::IdentityManager;
use crate::error::ServiceError;
use crate::models::{
    task::{CreateTask, NewTask, Task, TaskOwner, TaskPatch},
    user::{normalize_email, validate_email, User},
};
use crate::notify::{register_link, InviteEmail, InviteNotifier};
use crate::store::{CredentialStore, StoreError};

/// Result of attempting a deferred claim
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The task now belongs to the registering user
    Claimed(Task),

    /// The task was assigned to a different address; nothing changed
    EmailMismatch,

    /// The task already had an owner; nothing changed
    AlreadyClaimed,
}

#[derive(Clone)]
pub struct AssignmentCoordinator {
    store: Arc<dyn CredentialStore>,
    identity: Arc<IdentityManager>,
    notifier: Arc<dyn InviteNotifier>,
    clock: Arc<dyn Clock + Send + Sync>,
    public_base_url: String,
}

impl std::fmt::Debug for AssignmentCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssignmentCoordinator")
            .field("public_base_url", &self.public_base_url)
            .finish_non_exhaustive()
    }
}

impl AssignmentCoordinator {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        identity: Arc<IdentityManager>,
        notifier: Arc<dyn InviteNotifier>,
        clock: Arc<dyn Clock + Send + Sync>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            identity,
            notifier,
            clock,
            public_base_url: public_base_url.into(),
        }
    }

    /// Creates a task owned by `owner_id`
    #[tracing::instrument(skip(self, task))]
    pub async fn create_task(&self, owner_id: i64, task: NewTask) -> Result<Task, ServiceError> {
        let now = self.clock.utc();
        let created = self
            .store
            .create_task(CreateTask {
                owner: TaskOwner::Claimed { owner_id },
                detail: task.detail,
                complete_by: task.complete_by,
                assigned_to: task.assigned_to.map(|email| normalize_email(&email)),
                created_at: now,
                updated_at: now,
            })
            .await
            .map_err(owner_error)?;

        info!(task_id = created.id, "Task created");
        Ok(created)
    }

    /// Creates a task for the address in `assigned_to`
    ///
    /// If an account with that address exists the task is born claimed by
    /// it. Otherwise the task is stored as pending and one invitation is
    /// sent; a failed send is logged and does not fail the call.
    #[tracing::instrument(skip(self, task), fields(assigned_to = ?task.assigned_to))]
    pub async fn assign_task(&self, task: NewTask) -> Result<Task, ServiceError> {
        let assignee = task
            .assigned_to
            .as_deref()
            .map(normalize_email)
            .filter(|email| !email.is_empty())
            .ok_or_else(|| ServiceError::validation("assignee email is required"))?;
        validate_email(&assignee).map_err(ServiceError::Validation)?;

        let owner = match self.identity.resolve_by_email(&assignee).await {
            Ok(user) => TaskOwner::Claimed { owner_id: user.id },
            Err(ServiceError::NotFound) => TaskOwner::Pending,
            Err(e) => return Err(e),
        };

        let now = self.clock.utc();
        let created = self
            .store
            .create_task(CreateTask {
                owner,
                detail: task.detail,
                complete_by: task.complete_by,
                assigned_to: Some(assignee.clone()),
                created_at: now,
                updated_at: now,
            })
            .await
            .map_err(owner_error)?;

        match created.owner {
            TaskOwner::Claimed { owner_id } => {
                info!(task_id = created.id, owner_id, "Task assigned to existing user");
            }
            TaskOwner::Pending => {
                info!(task_id = created.id, "Task pending, inviting assignee");
                let link = register_link(&self.public_base_url, created.id);
                let invite = InviteEmail::task_invite(assignee, &link);
                if let Err(e) = self.notifier.send(&invite).await {
                    warn!(task_id = created.id, error = %e, "Failed to send task invite");
                }
            }
        }

        Ok(created)
    }

    /// Applies `patch` to an existing task
    ///
    /// `assigned_to` cannot be changed. Setting an owner on a pending task
    /// claims it. `updated_at` always moves forward.
    #[tracing::instrument(skip(self, patch))]
    pub async fn edit_task(&self, id: i64, patch: TaskPatch) -> Result<Task, ServiceError> {
        let mut task = self.get_task(id).await?;

        if let Some(owner_id) = patch.owner_id {
            if owner_id <= 0 {
                return Err(ServiceError::validation("owner_id must be a positive user id"));
            }
            task.owner = TaskOwner::Claimed { owner_id };
        }
        if let Some(detail) = patch.detail {
            task.detail = detail;
        }
        if let Some(complete_by) = patch.complete_by {
            task.complete_by = Some(complete_by);
        }
        task.updated_at = self.next_update_time(task.updated_at);

        let updated = self
            .store
            .update_task(&task)
            .await
            .map_err(owner_error)?
            .ok_or(ServiceError::NotFound)?;

        debug!(task_id = id, "Task updated");
        Ok(updated)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_task(&self, id: i64) -> Result<(), ServiceError> {
        if !self.store.delete_task(id).await? {
            return Err(ServiceError::NotFound);
        }
        info!(task_id = id, "Task deleted");
        Ok(())
    }

    pub async fn get_task(&self, id: i64) -> Result<Task, ServiceError> {
        self.store
            .get_task_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound)
    }

    pub async fn list_tasks_for_owner(&self, owner_id: i64) -> Result<Vec<Task>, ServiceError> {
        Ok(self.store.list_tasks_by_owner(owner_id).await?)
    }

    /// Hands a pending task to a freshly registered user
    ///
    /// Succeeds only when the task is pending and its `assigned_to` equals
    /// the user's email exactly. A task is claimed at most once.
    #[tracing::instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn claim_pending_task(
        &self,
        user: &User,
        task_id: i64,
    ) -> Result<ClaimOutcome, ServiceError> {
        let task = self.get_task(task_id).await?;
        if let Some(outcome) = unclaimable(&task, user) {
            return Ok(outcome);
        }

        let claimed = self
            .store
            .claim_task(task_id, user.id, &user.email, self.clock.utc())
            .await
            .map_err(owner_error)?;

        let Some(claimed) = claimed else {
            // Lost a race with another writer; report what won.
            let current = self.get_task(task_id).await?;
            return Ok(unclaimable(&current, user).unwrap_or(ClaimOutcome::AlreadyClaimed));
        };

        info!(task_id, "Pending task claimed");
        Ok(ClaimOutcome::Claimed(claimed))
    }

    /// Current time, bumped past `previous` when the clock has not moved
    fn next_update_time(&self, previous: DateTime<Utc>) -> DateTime<Utc> {
        self.clock.utc().max(previous + Duration::microseconds(1))
    }
}

/// Why `user` cannot claim `task`, or `None` when the claim may proceed
fn unclaimable(task: &Task, user: &User) -> Option<ClaimOutcome> {
    if !task.is_pending() {
        debug!(task_id = task.id, "Task already claimed");
        return Some(ClaimOutcome::AlreadyClaimed);
    }
    if task.assigned_to.as_deref() != Some(user.email.as_str()) {
        debug!(task_id = task.id, "Task was assigned to a different address");
        return Some(ClaimOutcome::EmailMismatch);
    }
    None
}

fn owner_error(err: StoreError) -> ServiceError {
    match err {
        StoreError::ForeignKeyViolation(_) => ServiceError::validation("owner does not exist"),
        other => other.into(),
    }
}
