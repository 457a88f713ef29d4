//! Attribute-based access control for the storefront API.
//!
//! A fresh [`AbilitySet`] is built for every request from the requester's
//! role permissions (or the fixed guest rule set) and gates every resource
//! operation through [`AbilitySet::authorize`]. Rules are explicit tagged
//! variants evaluated by plain functions; there is no runtime reflection on
//! arbitrary objects.
//!
//! # Features
//!
//! - `axum` - request-scoped [`RequestContext`] extractor for Axum handlers

pub mod ability;
pub mod rule;

#[cfg(feature = "axum")]
mod context;

pub use ability::{AbilitySet, RolePermissions};
#[cfg(feature = "axum")]
pub use context::RequestContext;
pub use rule::{
    ownership_field, parse_permission, Rule, RuleParseError, Scope, SubjectRecord,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Supplier affiliation embedded in the session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierProfile {
    pub id: Uuid,
}

/// Decoded identity claims from the session token. Immutable once decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPayload {
    pub id: Uuid,
    pub role_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier: Option<SupplierProfile>,
    pub iat: i64,
    pub exp: i64,
}

/// Failures of the access-control layer.
#[derive(Debug, Error)]
pub enum AccessError {
    /// The resolved rule set does not permit the operation. Always fatal to
    /// the current request (HTTP 403).
    #[error("operation is not permitted")]
    Forbidden,

    /// The operation requires an authenticated requester (HTTP 401).
    #[error("authentication required")]
    NotAuthorized,

    /// The role permission lookup failed.
    #[error("permission lookup failed: {0}")]
    Lookup(String),
}
