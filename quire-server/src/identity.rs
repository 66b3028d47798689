//! Request identity extraction.
//!
//! Authentication is an external collaborator: a fronting auth layer
//! verifies the session and forwards the resulting `{userId, role}` on
//! trusted headers. This extractor turns those headers into an explicit
//! [`Identity`] parameter; there is no ambient session state anywhere in
//! the workflow. Requests without the headers fail with `Unauthorized`.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use quire_core::{Identity, Role};

use crate::error::ApiError;

/// Header carrying the verified user id.
pub const USER_HEADER: &str = "x-quire-user";
/// Header carrying the verified role.
pub const ROLE_HEADER: &str = "x-quire-role";

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct Caller(pub Identity);

impl std::ops::Deref for Caller {
    type Target = Identity;

    fn deref(&self) -> &Identity {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(ApiError::unauthorized)?;

        let role = parts
            .headers
            .get(ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .ok_or_else(ApiError::unauthorized)?
            .parse::<Role>()
            .map_err(|_| ApiError::unauthorized())?;

        Ok(Caller(Identity::new(user, role)))
    }
}
