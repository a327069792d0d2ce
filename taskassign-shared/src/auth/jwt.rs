/// JWT issuance and verification
///
/// Tokens are HS256-signed and live for 60 minutes. A token is accepted if and
/// only if its signature verifies under the configured secret, its header names
/// HS256, and the issuer's clock reads a time before `exp`. There is no
/// revocation list.
///
/// The secret is handed to [`TokenIssuer::new`] by the caller. Nothing in this
/// module reads the environment.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use chrono::Utc;
/// use mockable::DefaultClock;
/// use taskassign_shared::auth::jwt::TokenIssuer;
/// use taskassign_shared::models::user::User;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let issuer = TokenIssuer::new("a-secret-that-is-at-least-32-bytes", Arc::new(DefaultClock))?;
/// let user = User {
///     id: 42,
///     name: "Jane".to_string(),
///     email: "jane@example.com".to_string(),
///     created_at: Utc::now(),
///     updated_at: Utc::now(),
/// };
///
/// let token = issuer.issue(&user)?;
/// let claims = issuer.verify(&token.access_token)?;
/// assert_eq!(claims.sub, "42");
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

use super::middleware::Identity;
use crate::models::user::User;

/// Lifetime of every issued token
pub const TOKEN_LIFETIME_MINUTES: i64 = 60;

/// Signing algorithm for every issued token
pub const TOKEN_ALGORITHM: Algorithm = Algorithm::HS256;

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// No signing secret configured
    #[error("JWT signing secret is missing")]
    MissingSecret,

    /// Signing failed
    #[error("Failed to sign token: {0}")]
    Signing(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Signature does not verify under the configured secret
    #[error("Token signature is invalid")]
    InvalidSignature,

    /// Header names an algorithm other than HS256
    #[error("Token algorithm is not accepted")]
    InvalidAlgorithm,

    /// Token cannot be decoded, or its subject is not a user ID
    #[error("Invalid token format: {0}")]
    Malformed(String),
}

/// Claims carried by an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - user ID rendered as a string
    pub sub: String,

    /// Display name of the subject
    pub name: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Builds claims for `user`, issued at `now`
    pub fn for_user(user: &User, now: DateTime<Utc>) -> Self {
        let expiration = now + Duration::minutes(TOKEN_LIFETIME_MINUTES);

        Self {
            sub: user.id.to_string(),
            name: user.name.clone(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
        }
    }

    /// Checks expiry against the given instant
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }

    /// Converts verified claims into the identity passed to core operations
    pub fn identity(&self) -> Result<Identity, JwtError> {
        let user_id = self
            .sub
            .parse::<i64>()
            .map_err(|_| JwtError::Malformed("subject is not a user id".to_string()))?;

        Ok(Identity {
            user_id,
            name: self.name.clone(),
        })
    }
}

/// Bearer credential returned by a successful login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    /// Encoded JWT
    pub access_token: String,

    /// Always "Bearer"
    pub token_type: String,

    /// Seconds until expiry, counted from issuance
    pub expires_in: i64,

    /// Absolute expiry (Unix timestamp)
    pub expires_at: i64,
}

/// Mints and validates access tokens with an injected secret and clock
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer").finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Creates an issuer for the given HMAC secret
    ///
    /// # Errors
    ///
    /// Returns `JwtError::MissingSecret` if `secret` is empty.
    pub fn new(secret: &str, clock: Arc<dyn Clock + Send + Sync>) -> Result<Self, JwtError> {
        if secret.is_empty() {
            return Err(JwtError::MissingSecret);
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            clock,
        })
    }

    /// Issues a 60-minute token for `user`
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Signing` if encoding fails.
    pub fn issue(&self, user: &User) -> Result<AccessToken, JwtError> {
        let claims = Claims::for_user(user, self.clock.utc());
        let access_token = encode(&Header::new(TOKEN_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| JwtError::Signing(e.to_string()))?;

        Ok(AccessToken {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: claims.exp - claims.iat,
            expires_at: claims.exp,
        })
    }

    /// Validates a token and returns its claims
    ///
    /// Expiry is checked against the issuer's clock rather than the system
    /// time, with no leeway.
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(TOKEN_ALGORITHM);
        validation.validate_exp = false;
        validation.leeway = 0;

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                ErrorKind::InvalidAlgorithm => JwtError::InvalidAlgorithm,
                ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::Malformed(e.to_string()),
            }
        })?;

        if token_data.claims.is_expired_at(self.clock.utc()) {
            return Err(JwtError::Expired);
        }

        Ok(token_data.claims)
    }
}
