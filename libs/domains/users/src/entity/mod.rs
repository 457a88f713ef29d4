//! Sea-ORM entities for the users domain.

pub mod permissions;
pub mod role_permissions;
pub mod roles;
pub mod users;
