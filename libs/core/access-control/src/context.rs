//! Axum integration: the request-scoped context extractor.

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{AbilitySet, AccessError, UserPayload};

/// Identity + ability for one request, threaded explicitly through handlers
/// instead of looked up from ambient global state.
///
/// The app's ability middleware builds one per request and inserts it into
/// request extensions; handlers extract it with `FromRequestParts`. Requests
/// that never passed the middleware fall back to a guest context, so nothing
/// is ever authorized off stale identity.
#[derive(Clone)]
pub struct RequestContext {
    pub user: Option<UserPayload>,
    pub ability: Arc<AbilitySet>,
}

impl RequestContext {
    pub fn guest() -> Self {
        Self {
            user: None,
            ability: Arc::new(AbilitySet::guest()),
        }
    }

    pub fn authenticated(user: UserPayload, ability: AbilitySet) -> Self {
        Self {
            user: Some(user),
            ability: Arc::new(ability),
        }
    }

    /// The requester's identity, or `NotAuthorized` for guests (HTTP 401).
    pub fn require_user(&self) -> Result<&UserPayload, AccessError> {
        self.user.as_ref().ok_or(AccessError::NotAuthorized)
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_else(RequestContext::guest))
    }
}
