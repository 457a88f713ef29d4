use std::collections::HashMap;
use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use serde_json::Value;
use uuid::Uuid;

use access_control::SupplierProfile;
use axum_helpers::JwtAuth;
use query_options::{project_value, QueryDescriptor};

use crate::error::{UserError, UserResult};
use crate::models::{
    AuthResponse, CreateRole, CreateUser, LoginRequest, NewRole, NewUser, Permission, RoleChanges,
    RoleWithPermissions, UpdateRole, UpdateUser, User, UserChanges,
};
use crate::repository::{RoleRepository, UserRepository};

/// Role assigned to accounts created through the public signup endpoint.
pub const DEFAULT_ROLE: &str = "customer";

/// Service layer for accounts, authentication and role administration
#[derive(Clone)]
pub struct UserService<U: UserRepository, R: RoleRepository> {
    users: Arc<U>,
    roles: Arc<R>,
    jwt: JwtAuth,
}

fn hash_password(password: &str) -> UserResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| UserError::Internal(format!("Password hashing failed: {e}")))
}

/// Permission ids arrive as strings on the wire; anything non-numeric is a
/// validation error naming the offending value.
fn parse_permission_ids(ids: &[String]) -> UserResult<Vec<i32>> {
    ids.iter()
        .map(|raw| {
            raw.trim()
                .parse::<i32>()
                .map_err(|_| UserError::InvalidPermissionId(raw.clone()))
        })
        .collect()
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

impl<U: UserRepository, R: RoleRepository> UserService<U, R> {
    pub fn new(users: U, roles: R, jwt: JwtAuth) -> Self {
        Self {
            users: Arc::new(users),
            roles: Arc::new(roles),
            jwt,
        }
    }

    fn issue_token(&self, user: &User) -> UserResult<String> {
        self.jwt
            .create_access_token(
                user.id,
                user.role_id,
                user.supplier_id.map(|id| SupplierProfile { id }),
            )
            .map_err(|e| UserError::Internal(format!("Token creation failed: {e}")))
    }

    /// Register a new account with the default role and log it in.
    pub async fn signup(&self, input: CreateUser) -> UserResult<AuthResponse> {
        let role = self
            .roles
            .get_by_name(DEFAULT_ROLE)
            .await?
            .ok_or_else(|| {
                UserError::Internal(format!("Default role '{DEFAULT_ROLE}' is not seeded"))
            })?;

        let user = self
            .users
            .create(NewUser {
                email: input.email,
                name: input.name,
                password_hash: hash_password(&input.password)?,
                role_id: role.id,
                supplier_id: None,
            })
            .await?;

        tracing::info!(user_id = %user.id, "User signed up");
        let token = self.issue_token(&user)?;
        Ok(AuthResponse { token, user })
    }

    /// Verify credentials and issue a fresh access token.
    pub async fn login(&self, input: LoginRequest) -> UserResult<AuthResponse> {
        let Some(auth) = self.users.get_by_email(&input.email).await? else {
            return Err(UserError::InvalidCredentials);
        };
        if !verify_password(&input.password, &auth.password_hash) {
            return Err(UserError::InvalidCredentials);
        }

        tracing::info!(user_id = %auth.user.id, "User logged in");
        let token = self.issue_token(&auth.user)?;
        Ok(AuthResponse {
            token,
            user: auth.user,
        })
    }

    pub async fn get(&self, id: Uuid) -> UserResult<User> {
        self.users.get_by_id(id).await?.ok_or(UserError::NotFound)
    }

    pub async fn list(&self, descriptor: &QueryDescriptor) -> UserResult<(Vec<User>, u64)> {
        self.users.list(descriptor).await
    }

    /// List users as JSON documents with includes and sparse fieldsets applied.
    ///
    /// Supported relations are `role` and `supplier`; each is embedded under
    /// the user with its own projection. A user without a supplier profile
    /// embeds `null`.
    pub async fn list_documents(
        &self,
        descriptor: &QueryDescriptor,
    ) -> UserResult<(Vec<Value>, u64)> {
        let (users, total) = self.users.list(descriptor).await?;

        let include_role = descriptor
            .include
            .iter()
            .find(|entry| entry.relation == "role");
        let include_supplier = descriptor
            .include
            .iter()
            .find(|entry| entry.relation == "supplier");
        let mut role_cache: HashMap<Uuid, Value> = HashMap::new();
        let mut supplier_cache: HashMap<Uuid, Value> = HashMap::new();

        let mut documents = Vec::with_capacity(users.len());
        for user in users {
            let role_id = user.role_id;
            let supplier_id = user.supplier_id;
            let mut doc = serde_json::to_value(&user)
                .map_err(|e| UserError::Internal(e.to_string()))?;
            doc = project_value(doc, descriptor.attributes.as_deref());

            if let Some(entry) = include_role {
                let embedded = match role_cache.get(&role_id) {
                    Some(cached) => cached.clone(),
                    None => {
                        let value = match self.roles.get_by_id(role_id).await? {
                            Some(role) => serde_json::to_value(&role)
                                .map_err(|e| UserError::Internal(e.to_string()))?,
                            None => Value::Null,
                        };
                        let value =
                            project_value(value, entry.attributes.as_deref());
                        role_cache.insert(role_id, value.clone());
                        value
                    }
                };
                if let Some(object) = doc.as_object_mut() {
                    object.insert(entry.relation.clone(), embedded);
                }
            }

            if let Some(entry) = include_supplier {
                let embedded = match supplier_id {
                    None => Value::Null,
                    Some(supplier_id) => match supplier_cache.get(&supplier_id) {
                        Some(cached) => cached.clone(),
                        None => {
                            let value = match self.users.get_supplier(supplier_id).await? {
                                Some(supplier) => serde_json::to_value(&supplier)
                                    .map_err(|e| UserError::Internal(e.to_string()))?,
                                None => Value::Null,
                            };
                            let value = project_value(value, entry.attributes.as_deref());
                            supplier_cache.insert(supplier_id, value.clone());
                            value
                        }
                    },
                };
                if let Some(object) = doc.as_object_mut() {
                    object.insert(entry.relation.clone(), embedded);
                }
            }
            documents.push(doc);
        }
        Ok((documents, total))
    }

    pub async fn update(&self, id: Uuid, input: UpdateUser) -> UserResult<User> {
        let password_hash = match input.password {
            Some(password) => Some(hash_password(&password)?),
            None => None,
        };
        if let Some(role_id) = input.role_id {
            if self.roles.get_by_id(role_id).await?.is_none() {
                return Err(UserError::RoleNotFound);
            }
        }
        self.users
            .update(
                id,
                UserChanges {
                    email: input.email,
                    name: input.name,
                    password_hash,
                    role_id: input.role_id,
                    supplier_id: input.supplier_id.map(Some),
                },
            )
            .await
    }

    pub async fn delete(&self, id: Uuid) -> UserResult<bool> {
        let deleted = self.users.delete(id).await?;
        if deleted {
            tracing::info!(user_id = %id, "Deleted user");
        }
        Ok(deleted)
    }

    pub async fn create_role(&self, input: CreateRole) -> UserResult<RoleWithPermissions> {
        let role = self
            .roles
            .create(NewRole {
                name: input.name,
                permission_ids: parse_permission_ids(&input.permissions_ids)?,
            })
            .await?;
        tracing::info!(role_id = %role.id, role_name = %role.name, "Created role");
        Ok(role)
    }

    pub async fn get_role(&self, id: Uuid) -> UserResult<RoleWithPermissions> {
        self.roles
            .get_by_id(id)
            .await?
            .ok_or(UserError::RoleNotFound)
    }

    pub async fn list_roles(&self) -> UserResult<Vec<RoleWithPermissions>> {
        self.roles.list().await
    }

    pub async fn update_role(&self, id: Uuid, input: UpdateRole) -> UserResult<RoleWithPermissions> {
        let permission_ids = match &input.permissions_ids {
            Some(ids) => Some(parse_permission_ids(ids)?),
            None => None,
        };
        self.roles
            .update(
                id,
                RoleChanges {
                    name: input.name,
                    permission_ids,
                },
            )
            .await
    }

    pub async fn delete_role(&self, id: Uuid) -> UserResult<bool> {
        self.roles.delete(id).await
    }

    pub async fn list_permissions(&self) -> UserResult<Vec<Permission>> {
        self.roles.list_permissions().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::repository::{MockRoleRepository, MockUserRepository};
    use axum_helpers::JwtConfig;

    fn jwt() -> JwtAuth {
        JwtAuth::new(&JwtConfig::new("test-secret-with-enough-entropy-123456"))
    }

    fn sample_user(role_id: Uuid) -> User {
        User {
            id: Uuid::now_v7(),
            email: "alice@example.com".into(),
            name: "Alice".into(),
            role_id,
            supplier_id: None,
            created_at: chrono::Utc::now().into(),
            updated_at: chrono::Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn signup_assigns_default_role_and_hashes_password() {
        let role_id = Uuid::now_v7();
        let mut users = MockUserRepository::new();
        let mut roles = MockRoleRepository::new();

        roles
            .expect_get_by_name()
            .with(mockall::predicate::eq(DEFAULT_ROLE))
            .returning(move |_| {
                Ok(Some(Role {
                    id: role_id,
                    name: DEFAULT_ROLE.into(),
                }))
            });
        users.expect_create().returning(move |input| {
            assert_eq!(input.role_id, role_id);
            assert_ne!(input.password_hash, "supersecret");
            assert!(verify_password("supersecret", &input.password_hash));
            Ok(User {
                id: Uuid::now_v7(),
                email: input.email,
                name: input.name,
                role_id: input.role_id,
                supplier_id: input.supplier_id,
                created_at: chrono::Utc::now().into(),
                updated_at: chrono::Utc::now().into(),
            })
        });

        let service = UserService::new(users, roles, jwt());
        let response = service
            .signup(CreateUser {
                email: "alice@example.com".into(),
                name: "Alice".into(),
                password: "supersecret".into(),
            })
            .await
            .unwrap();
        assert!(!response.token.is_empty());
        assert_eq!(response.user.email, "alice@example.com");
    }

    #[tokio::test]
    async fn login_rejects_wrong_password() {
        let mut users = MockUserRepository::new();
        let roles = MockRoleRepository::new();
        let role_id = Uuid::now_v7();

        users.expect_get_by_email().returning(move |_| {
            Ok(Some(crate::models::AuthUser {
                user: sample_user(role_id),
                password_hash: hash_password("correct-horse").unwrap(),
            }))
        });

        let service = UserService::new(users, roles, jwt());
        let result = service
            .login(LoginRequest {
                email: "alice@example.com".into(),
                password: "wrong-horse".into(),
            })
            .await;
        assert!(matches!(result, Err(UserError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn login_rejects_unknown_email() {
        let mut users = MockUserRepository::new();
        let roles = MockRoleRepository::new();

        users.expect_get_by_email().returning(|_| Ok(None));

        let service = UserService::new(users, roles, jwt());
        let result = service
            .login(LoginRequest {
                email: "nobody@example.com".into(),
                password: "whatever".into(),
            })
            .await;
        assert!(matches!(result, Err(UserError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn login_token_carries_supplier_profile() {
        let mut users = MockUserRepository::new();
        let roles = MockRoleRepository::new();
        let role_id = Uuid::now_v7();
        let supplier_id = Uuid::now_v7();

        users.expect_get_by_email().returning(move |_| {
            let mut user = sample_user(role_id);
            user.supplier_id = Some(supplier_id);
            Ok(Some(crate::models::AuthUser {
                user,
                password_hash: hash_password("correct-horse").unwrap(),
            }))
        });

        let service = UserService::new(users, roles, jwt());
        let response = service
            .login(LoginRequest {
                email: "alice@example.com".into(),
                password: "correct-horse".into(),
            })
            .await
            .unwrap();

        let payload = jwt().verify_token(&response.token).unwrap();
        assert_eq!(payload.supplier.map(|s| s.id), Some(supplier_id));
    }

    #[tokio::test]
    async fn list_documents_embeds_role() {
        let mut users = MockUserRepository::new();
        let mut roles = MockRoleRepository::new();
        let role_id = Uuid::now_v7();

        users
            .expect_list()
            .returning(move |_| Ok((vec![sample_user(role_id)], 1)));
        roles.expect_get_by_id().returning(move |id| {
            Ok(Some(RoleWithPermissions {
                id,
                name: "customer".into(),
                permissions: vec![],
            }))
        });

        let descriptor = QueryDescriptor {
            include: vec![query_options::IncludeEntry {
                relation: "role".into(),
                target: "roles".into(),
                attributes: Some(vec!["name".into()]),
            }],
            ..Default::default()
        };
        let service = UserService::new(users, roles, jwt());
        let (documents, total) = service.list_documents(&descriptor).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(documents[0]["role"]["name"], "customer");
        assert!(documents[0]["role"].get("permissions").is_none());
    }

    #[tokio::test]
    async fn list_documents_embeds_supplier() {
        let mut users = MockUserRepository::new();
        let roles = MockRoleRepository::new();
        let role_id = Uuid::now_v7();
        let supplier_id = Uuid::now_v7();

        let mut linked = sample_user(role_id);
        linked.supplier_id = Some(supplier_id);
        let plain = sample_user(role_id);
        users
            .expect_list()
            .returning(move |_| Ok((vec![linked.clone(), plain.clone()], 2)));
        users.expect_get_supplier().returning(|id| {
            Ok(Some(domain_catalog::Supplier {
                id,
                name: "Acme Tools".into(),
                email: "sales@acme.example".into(),
                user_id: Uuid::now_v7(),
                created_at: chrono::Utc::now().into(),
                updated_at: chrono::Utc::now().into(),
            }))
        });

        let descriptor = QueryDescriptor {
            include: vec![query_options::IncludeEntry {
                relation: "supplier".into(),
                target: "suppliers".into(),
                attributes: Some(vec!["name".into()]),
            }],
            ..Default::default()
        };
        let service = UserService::new(users, roles, jwt());
        let (documents, total) = service.list_documents(&descriptor).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(documents[0]["supplier"]["name"], "Acme Tools");
        assert!(documents[0]["supplier"].get("email").is_none());
        assert_eq!(documents[1]["supplier"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn update_rejects_unknown_role() {
        let users = MockUserRepository::new();
        let mut roles = MockRoleRepository::new();
        roles.expect_get_by_id().returning(|_| Ok(None));

        let service = UserService::new(users, roles, jwt());
        let result = service
            .update(
                Uuid::now_v7(),
                UpdateUser {
                    role_id: Some(Uuid::now_v7()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(UserError::RoleNotFound)));
    }
}
