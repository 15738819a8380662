use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::AppError;

/// Header carrying the caller's user id, set by the auth layer upstream
pub const USER_ID_HEADER: &str = "x-user-id";

/// Caller identity for a request.
///
/// Session management lives outside this service; by the time a request
/// arrives here the upstream auth layer has resolved it to a user id header.
/// A missing or unparsable header is `NotAuthenticated`.
#[derive(Debug, Clone, Copy)]
pub struct CallerIdentity(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .map(CallerIdentity)
            .ok_or(AppError::NotAuthenticated)
    }
}
