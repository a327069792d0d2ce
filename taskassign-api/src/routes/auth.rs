/// Authentication endpoints
///
/// - `POST /api/auth/register[?tid=N]` - create an account, optionally
///   claiming the pending task `N` from an invitation link
/// - `POST /api/auth/login` - exchange credentials for an access token

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use taskassign_shared::{
    auth::jwt::AccessToken,
    models::{
        task::Task,
        user::{NewUser, User},
    },
    services::ClaimOutcome,
};
use validator::Validate;

/// Register request
///
/// `email` may be empty; a non-empty one must be a well-formed address.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 320, message = "Email must be at most 320 characters"))]
    pub email: String,

    #[validate(length(
        min = 1,
        max = 1024,
        message = "Password must be between 1 and 1024 characters"
    ))]
    pub password: String,
}

/// Invitation link parameters
#[derive(Debug, Default, Deserialize)]
pub struct RegisterQuery {
    /// Pending task to claim once the account exists
    pub tid: Option<i64>,
}

/// Register response
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user: User,

    /// The task claimed through the invitation link, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed_task: Option<Task>,
}

/// Login request
///
/// Not validated here: empty or malformed fields fail the same way as a
/// wrong password.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Register a new user
///
/// ```text
/// POST /api/auth/register?tid=12
/// Content-Type: application/json
///
/// { "name": "Bob", "email": "bob@example.com", "password": "hunter2" }
/// ```
///
/// Responds `201` with the user. A failed or inapplicable claim never fails
/// the registration.
///
/// # Errors
///
/// - `400 Bad Request`: validation failed
/// - `409 Conflict`: email already exists
pub async fn register(
    State(state): State<AppState>,
    Query(query): Query<RegisterQuery>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    req.validate()?;

    let user = state
        .identity
        .register(NewUser {
            name: req.name,
            email: req.email,
            password: req.password,
        })
        .await?;

    let mut claimed_task = None;
    if let Some(task_id) = query.tid {
        match state.assignments.claim_pending_task(&user, task_id).await {
            Ok(ClaimOutcome::Claimed(task)) => claimed_task = Some(task),
            Ok(outcome) => {
                tracing::info!(user_id = user.id, task_id, ?outcome, "Invitation task not claimed");
            }
            Err(e) => {
                tracing::error!(user_id = user.id, task_id, error = %e, "Failed to claim invitation task");
            }
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse { user, claimed_task }),
    ))
}

/// Login
///
/// ```text
/// POST /api/auth/login
///
/// { "email": "bob@example.com", "password": "hunter2" }
/// ```
///
/// ```json
/// {
///   "access_token": "eyJ...",
///   "token_type": "Bearer",
///   "expires_in": 3600,
///   "expires_at": 1735736400
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: unknown email or wrong password (indistinguishable)
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AccessToken>> {
    let token = state.identity.login(&req.email, &req.password).await?;
    Ok(Json(token))
}
