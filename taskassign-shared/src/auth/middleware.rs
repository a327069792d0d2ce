/// Request authentication primitives for Axum
///
/// The API's auth layer pulls the token out with [`bearer_token`], verifies
/// it, and inserts the resulting [`Identity`] into request extensions.
/// Handlers take it with `Extension<Identity>`; they never look at raw claims.

use axum::{extract::Request, http::header};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Verified identity of the caller
///
/// Built once from token claims by the boundary and passed explicitly into
/// core operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Authenticated user ID
    pub user_id: i64,

    /// Display name carried in the token
    pub name: String,
}

/// Why a request carried no usable credentials
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing authorization header
    #[error("Authorization token is missing")]
    MissingCredentials,

    /// Header present but not a bearer token
    #[error("{0}")]
    InvalidFormat(String),
}

/// Extracts the bearer token from request headers
pub fn bearer_token(req: &Request) -> Result<&str, AuthError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_bearer_token_extraction() {
        let req = Request::builder()
            .header(header::AUTHORIZATION, "Bearer abc.def.ghi")
            .body(Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&req).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_bearer_token_missing_or_wrong_scheme() {
        let req = Request::builder().body(Body::empty()).unwrap();
        assert!(matches!(bearer_token(&req), Err(AuthError::MissingCredentials)));

        let req = Request::builder()
            .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
            .body(Body::empty())
            .unwrap();
        assert!(matches!(bearer_token(&req), Err(AuthError::InvalidFormat(_))));

        let req = Request::builder()
            .header(header::AUTHORIZATION, "Bearer ")
            .body(Body::empty())
            .unwrap();
        assert!(matches!(bearer_token(&req), Err(AuthError::InvalidFormat(_))));
    }
}
