use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// A user account, as exposed by the API (never carries the password hash)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier_id: Option<Uuid>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

/// Internal creation payload carrying an already-hashed password
#[derive(Clone, Debug)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role_id: Uuid,
    pub supplier_id: Option<Uuid>,
}

/// Signup / admin-create request body
#[derive(Clone, Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, max = 120, message = "must be 1-120 characters"))]
    pub name: String,
    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    pub password: String,
}

/// Partial update of a user's profile
#[derive(Clone, Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUser {
    #[validate(email(message = "must be a valid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 120, message = "must be 1-120 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    pub password: Option<String>,
    pub role_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
}

/// Credentials for the login endpoint
#[derive(Clone, Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub password: String,
}

/// Issued on successful signup or login
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Permission {
    pub id: i32,
    pub name: String,
}

/// Role creation request
///
/// `permissions_ids` arrives as strings on the wire and is parsed to the
/// integer ids of existing permission rows.
#[derive(Clone, Debug, Deserialize, Validate, ToSchema)]
pub struct CreateRole {
    #[validate(length(min = 1, max = 60, message = "must be 1-60 characters"))]
    pub name: String,
    #[serde(default)]
    pub permissions_ids: Vec<String>,
}

/// Partial role update
#[derive(Clone, Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateRole {
    #[validate(length(min = 1, max = 60, message = "must be 1-60 characters"))]
    pub name: Option<String>,
    pub permissions_ids: Option<Vec<String>>,
}

/// Repository-level role creation payload with parsed permission ids
#[derive(Clone, Debug)]
pub struct NewRole {
    pub name: String,
    pub permission_ids: Vec<i32>,
}

/// Repository-level role update payload
#[derive(Clone, Debug, Default)]
pub struct RoleChanges {
    pub name: Option<String>,
    pub permission_ids: Option<Vec<i32>>,
}

/// A role with its resolved permission list, ordered by permission id
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct RoleWithPermissions {
    pub id: Uuid,
    pub name: String,
    pub permissions: Vec<Permission>,
}

/// Repository-level update payload; the password is already hashed here
#[derive(Clone, Debug, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password_hash: Option<String>,
    pub role_id: Option<Uuid>,
    pub supplier_id: Option<Option<Uuid>>,
}

/// Repository-internal view used by the login flow
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user: User,
    pub password_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_rejects_bad_email() {
        let dto = CreateUser {
            email: "not-an-email".into(),
            name: "Alice".into(),
            password: "supersecret".into(),
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn create_user_rejects_short_password() {
        let dto = CreateUser {
            email: "alice@example.com".into(),
            name: "Alice".into(),
            password: "short".into(),
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn create_user_accepts_valid_payload() {
        let dto = CreateUser {
            email: "alice@example.com".into(),
            name: "Alice".into(),
            password: "supersecret".into(),
        };
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn user_serialization_skips_absent_supplier() {
        let user = User {
            id: Uuid::now_v7(),
            email: "alice@example.com".into(),
            name: "Alice".into(),
            role_id: Uuid::now_v7(),
            supplier_id: None,
            created_at: chrono::Utc::now().into(),
            updated_at: chrono::Utc::now().into(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("supplier_id").is_none());
        assert!(json.get("password_hash").is_none());
    }
}
