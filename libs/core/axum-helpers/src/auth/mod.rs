//! Authentication module.
//!
//! Stateless JWT session tokens carrying the identity claims the
//! access-control layer consumes.
//!
//! # Example
//!
//! ```ignore
//! use axum_helpers::auth::{JwtAuth, JwtConfig};
//! use core_config::FromEnv;
//!
//! let config = JwtConfig::from_env()?;
//! let auth = JwtAuth::new(&config);
//!
//! let token = auth.create_access_token(user_id, role_id, None)?;
//! let payload = auth.verify_token(&token)?;
//! ```

pub mod config;
pub mod jwt;

pub use config::JwtConfig;
pub use jwt::{ACCESS_TOKEN_TTL, JwtAuth, extract_token_from_request};
