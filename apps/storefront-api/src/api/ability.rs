//! Per-request identity resolution.
//!
//! Runs in front of every API route: verifies the bearer token (when one is
//! present), loads the role's permissions and attaches a [`RequestContext`]
//! to the request. Anonymous requests pass through with the guest rule set,
//! so public catalog browsing needs no token.

use std::sync::Arc;

use access_control::{AbilitySet, RequestContext};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_helpers::{AppError, JwtAuth, extract_token_from_request};
use domain_users::PgRoleRepository;

/// State for the ability middleware: token verification plus the
/// role-to-permission lookup.
#[derive(Clone)]
pub struct AbilityState {
    pub jwt: JwtAuth,
    pub roles: Arc<PgRoleRepository>,
}

/// Resolve the requester's ability set and stash it in request extensions.
///
/// A present-but-invalid token is rejected outright rather than downgraded
/// to guest, so a client never silently loses its identity.
pub async fn resolve_ability(
    State(state): State<AbilityState>,
    mut request: Request,
    next: Next,
) -> Response {
    let context = match build_context(&state, &request).await {
        Ok(context) => context,
        Err(err) => return err.into_response(),
    };

    request.extensions_mut().insert(context);
    next.run(request).await
}

async fn build_context(state: &AbilityState, request: &Request) -> Result<RequestContext, AppError> {
    let Some(token) = extract_token_from_request(request.headers()) else {
        return Ok(RequestContext::guest());
    };

    let payload = state
        .jwt
        .verify_token(&token)
        .map_err(|_| AppError::NotAuthorized("Invalid or expired token".to_string()))?;

    let ability = AbilitySet::for_request(Some(&payload), state.roles.as_ref()).await?;

    Ok(RequestContext::authenticated(payload, ability))
}
