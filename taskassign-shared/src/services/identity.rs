/// Identity manager
///
/// Owns everything that touches password digests. Callers get a [`User`]
/// back, never a [`UserCredentials`].

use mockable::Clock;
use std::sync::Arc;
use tracing::{debug, info};

use crate::auth::{
    jwt::{AccessToken, TokenIssuer},
    middleware::Identity,
    password::{hash_password, verify_password},
};
use crate::error::ServiceError;
use crate::models::user::{
    normalize_email, validate_email, CreateUser, NewUser, User, UserCredentials,
};
use crate::store::{CredentialStore, StoreError};

const INVALID_CREDENTIALS: &str = "invalid email or password";

#[derive(Clone)]
pub struct IdentityManager {
    store: Arc<dyn CredentialStore>,
    issuer: TokenIssuer,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl std::fmt::Debug for IdentityManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityManager")
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

impl IdentityManager {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        issuer: TokenIssuer,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            store,
            issuer,
            clock,
        }
    }

    /// Creates an account
    ///
    /// An empty email is stored as-is; a non-empty one must look like an
    /// address. Registering an email that already exists fails with
    /// [`ServiceError::Conflict`].
    #[tracing::instrument(skip(self, candidate), fields(email = %candidate.email.trim()))]
    pub async fn register(&self, candidate: NewUser) -> Result<User, ServiceError> {
        let name = candidate.name.trim().to_string();
        let email = normalize_email(&candidate.email);

        if !email.is_empty() {
            validate_email(&email).map_err(ServiceError::Validation)?;
        }
        if candidate.password.is_empty() {
            return Err(ServiceError::validation("password must not be empty"));
        }

        let password = candidate.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| ServiceError::internal("password hashing task failed", e))??;

        let now = self.clock.utc();
        let created = self
            .store
            .create_user(CreateUser {
                name,
                email: email.clone(),
                password_hash,
                created_at: now,
                updated_at: now,
            })
            .await;

        match created {
            Ok(_) => {}
            Err(StoreError::UniqueViolation(_)) => {
                debug!("Email already registered");
                return Err(ServiceError::Conflict);
            }
            Err(e) => return Err(e.into()),
        }

        // Read back so the caller sees exactly what the store holds
        let user = self
            .store
            .get_user_by_email(&email)
            .await?
            .map(|credentials| credentials.user)
            .ok_or_else(|| {
                ServiceError::internal("registered user missing on read-back", email.clone())
            })?;

        info!(user_id = user.id, "User registered");
        Ok(user)
    }

    /// Checks credentials and issues an access token
    ///
    /// Unknown email, malformed email and wrong password all produce the same
    /// [`ServiceError::Unauthorized`].
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AccessToken, ServiceError> {
        let user = match self.resolve_credentials(email).await {
            Ok(credentials) => {
                let digest = credentials.password_hash;
                let password = password.to_string();
                let verified =
                    tokio::task::spawn_blocking(move || verify_password(&password, &digest))
                        .await
                        .map_err(|e| ServiceError::internal("password verification task failed", e))?;

                if !verified {
                    debug!(reason = INVALID_CREDENTIALS, "Login rejected");
                    return Err(ServiceError::Unauthorized);
                }
                credentials.user
            }
            Err(ServiceError::NotFound | ServiceError::Validation(_)) => {
                debug!(reason = INVALID_CREDENTIALS, "Login rejected");
                return Err(ServiceError::Unauthorized);
            }
            Err(e) => return Err(e),
        };

        let token = self.issuer.issue(&user)?;
        info!(user_id = user.id, "User logged in");
        Ok(token)
    }

    /// Looks up an account by exact email
    pub async fn resolve_by_email(&self, email: &str) -> Result<User, ServiceError> {
        self.resolve_credentials(email)
            .await
            .map(|credentials| credentials.user)
    }

    /// Verifies a bearer token and returns the identity it asserts
    pub fn verify_token(&self, token: &str) -> Result<Identity, ServiceError> {
        let claims = self.issuer.verify(token)?;
        Ok(claims.identity()?)
    }

    async fn resolve_credentials(
        &self,
        email: &str,
    ) -> Result<UserCredentials, ServiceError> {
        let email = normalize_email(email);
        validate_email(&email).map_err(ServiceError::Validation)?;

        self.store
            .get_user_by_email(&email)
            .await?
            .ok_or(ServiceError::NotFound)
    }
}
