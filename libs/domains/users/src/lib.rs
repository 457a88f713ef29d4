//! Users Domain
//!
//! Accounts, authentication and role administration for the storefront API.
//! Signup and login issue stateless JWT access tokens; roles map to
//! permission rows that the access-control layer resolves into per-request
//! ability sets.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use axum_helpers::{JwtAuth, JwtConfig};
//! use domain_users::{
//!     handlers::{self, UsersState},
//!     repository::{InMemoryRoleRepository, InMemoryUserRepository},
//!     service::UserService,
//! };
//! use query_options::ResourceRegistry;
//!
//! let jwt = JwtAuth::new(&JwtConfig::new("a-secret-of-at-least-32-characters!!"));
//! let service = UserService::new(
//!     InMemoryUserRepository::new(),
//!     InMemoryRoleRepository::new(),
//!     jwt,
//! );
//! let registry = Arc::new(ResourceRegistry::new(handlers::resource_configs()));
//! let state = Arc::new(UsersState { service, registry });
//!
//! let router = handlers::router(state.clone()).merge(handlers::auth_router(state));
//! ```

pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;

// Re-export commonly used types
pub use error::{UserError, UserResult};
pub use models::{
    AuthResponse, CreateRole, CreateUser, LoginRequest, Permission, Role, RoleWithPermissions,
    UpdateRole, UpdateUser, User,
};
pub use postgres::{PgRoleRepository, PgUserRepository};
pub use repository::{
    InMemoryRoleRepository, InMemoryUserRepository, RoleRepository, UserRepository,
};
pub use service::{UserService, DEFAULT_ROLE};
