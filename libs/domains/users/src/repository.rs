use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use access_control::{AccessError, RolePermissions};
use domain_catalog::Supplier;
use query_options::{apply_descriptor, QueryDescriptor};

use crate::error::{UserError, UserResult};
use crate::models::{
    AuthUser, NewRole, NewUser, Permission, Role, RoleChanges, RoleWithPermissions, User,
    UserChanges,
};

/// Repository trait for user persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user; fails with [`UserError::EmailTaken`] on a duplicate email
    async fn create(&self, input: NewUser) -> UserResult<User>;

    /// Get a user by ID
    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>>;

    /// Look a user up by email for the login flow, hash included
    async fn get_by_email(&self, email: &str) -> UserResult<Option<AuthUser>>;

    /// List users honoring the request's query descriptor, returning the
    /// page plus the filtered total
    async fn list(&self, descriptor: &QueryDescriptor) -> UserResult<(Vec<User>, u64)>;

    /// Apply a partial update to an existing user
    async fn update(&self, id: Uuid, changes: UserChanges) -> UserResult<User>;

    /// Delete a user by ID, returning whether a row was removed
    async fn delete(&self, id: Uuid) -> UserResult<bool>;

    /// Supplier profile a user is linked to, for the `supplier` include
    async fn get_supplier(&self, id: Uuid) -> UserResult<Option<Supplier>>;
}

/// Repository trait for roles and their permission assignments
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Create a role with the given permission assignments; unknown
    /// permission ids fail the whole call
    async fn create(&self, input: NewRole) -> UserResult<RoleWithPermissions>;

    /// Get a role with its permissions, ordered by permission id
    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<RoleWithPermissions>>;

    /// Look a role up by its unique name
    async fn get_by_name(&self, name: &str) -> UserResult<Option<Role>>;

    /// List all roles with their permissions
    async fn list(&self) -> UserResult<Vec<RoleWithPermissions>>;

    /// Rename a role and/or replace its permission assignments
    async fn update(&self, id: Uuid, changes: RoleChanges) -> UserResult<RoleWithPermissions>;

    /// Delete a role by ID, returning whether a row was removed
    async fn delete(&self, id: Uuid) -> UserResult<bool>;

    /// List the full permission catalog, ordered by id
    async fn list_permissions(&self) -> UserResult<Vec<Permission>>;
}

/// In-memory implementation of UserRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<Uuid, AuthUser>>>,
    suppliers: Arc<RwLock<HashMap<Uuid, Supplier>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a supplier profile so `get_supplier` can resolve it.
    pub async fn add_supplier(&self, supplier: Supplier) {
        self.suppliers.write().await.insert(supplier.id, supplier);
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, input: NewUser) -> UserResult<User> {
        let mut users = self.users.write().await;

        let email_taken = users
            .values()
            .any(|u| u.user.email.eq_ignore_ascii_case(&input.email));
        if email_taken {
            return Err(UserError::EmailTaken);
        }

        let now: chrono::DateTime<chrono::FixedOffset> = chrono::Utc::now().into();
        let user = User {
            id: Uuid::now_v7(),
            email: input.email,
            name: input.name,
            role_id: input.role_id,
            supplier_id: input.supplier_id,
            created_at: now,
            updated_at: now,
        };
        users.insert(
            user.id,
            AuthUser {
                user: user.clone(),
                password_hash: input.password_hash,
            },
        );

        tracing::info!(user_id = %user.id, "Created user");
        Ok(user)
    }

    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&id).map(|u| u.user.clone()))
    }

    async fn get_by_email(&self, email: &str) -> UserResult<Option<AuthUser>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list(&self, descriptor: &QueryDescriptor) -> UserResult<(Vec<User>, u64)> {
        let users = self.users.read().await;
        let records = users
            .values()
            .map(|u| serde_json::to_value(&u.user))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| UserError::Internal(e.to_string()))?;
        drop(users);

        let (page, total) = apply_descriptor(records, descriptor);
        let page = page
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<User>, _>>()
            .map_err(|e| UserError::Internal(e.to_string()))?;
        Ok((page, total))
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> UserResult<User> {
        let mut users = self.users.write().await;

        if let Some(email) = &changes.email {
            let email_taken = users
                .values()
                .any(|u| u.user.id != id && u.user.email.eq_ignore_ascii_case(email));
            if email_taken {
                return Err(UserError::EmailTaken);
            }
        }

        let entry = users.get_mut(&id).ok_or(UserError::NotFound)?;
        if let Some(email) = changes.email {
            entry.user.email = email;
        }
        if let Some(name) = changes.name {
            entry.user.name = name;
        }
        if let Some(hash) = changes.password_hash {
            entry.password_hash = hash;
        }
        if let Some(role_id) = changes.role_id {
            entry.user.role_id = role_id;
        }
        if let Some(supplier_id) = changes.supplier_id {
            entry.user.supplier_id = supplier_id;
        }
        entry.user.updated_at = chrono::Utc::now().into();
        Ok(entry.user.clone())
    }

    async fn delete(&self, id: Uuid) -> UserResult<bool> {
        let mut users = self.users.write().await;
        Ok(users.remove(&id).is_some())
    }

    async fn get_supplier(&self, id: Uuid) -> UserResult<Option<Supplier>> {
        let suppliers = self.suppliers.read().await;
        Ok(suppliers.get(&id).cloned())
    }
}

/// In-memory implementation of RoleRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryRoleRepository {
    inner: Arc<RwLock<RoleStore>>,
}

#[derive(Debug, Default)]
struct RoleStore {
    roles: HashMap<Uuid, Role>,
    permissions: HashMap<i32, Permission>,
    assignments: HashMap<Uuid, Vec<i32>>,
    next_permission_id: i32,
}

impl InMemoryRoleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a permission in the catalog, returning its assigned id.
    pub async fn add_permission(&self, name: impl Into<String>) -> Permission {
        let mut store = self.inner.write().await;
        store.next_permission_id += 1;
        let permission = Permission {
            id: store.next_permission_id,
            name: name.into(),
        };
        store.permissions.insert(permission.id, permission.clone());
        permission
    }
}

fn resolve_permissions(store: &RoleStore, role: &Role) -> RoleWithPermissions {
    let mut permissions: Vec<Permission> = store
        .assignments
        .get(&role.id)
        .into_iter()
        .flatten()
        .filter_map(|id| store.permissions.get(id).cloned())
        .collect();
    permissions.sort_by_key(|p| p.id);
    RoleWithPermissions {
        id: role.id,
        name: role.name.clone(),
        permissions,
    }
}

fn check_permission_ids(store: &RoleStore, ids: &[i32]) -> UserResult<()> {
    let unknown: Vec<i32> = ids
        .iter()
        .copied()
        .filter(|id| !store.permissions.contains_key(id))
        .collect();
    if unknown.is_empty() {
        Ok(())
    } else {
        Err(UserError::UnknownPermissionIds(unknown))
    }
}

#[async_trait]
impl RoleRepository for InMemoryRoleRepository {
    async fn create(&self, input: NewRole) -> UserResult<RoleWithPermissions> {
        let mut store = self.inner.write().await;
        check_permission_ids(&store, &input.permission_ids)?;

        let role = Role {
            id: Uuid::now_v7(),
            name: input.name,
        };
        store.roles.insert(role.id, role.clone());
        store.assignments.insert(role.id, input.permission_ids);
        Ok(resolve_permissions(&store, &role))
    }

    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<RoleWithPermissions>> {
        let store = self.inner.read().await;
        Ok(store
            .roles
            .get(&id)
            .map(|role| resolve_permissions(&store, role)))
    }

    async fn get_by_name(&self, name: &str) -> UserResult<Option<Role>> {
        let store = self.inner.read().await;
        Ok(store.roles.values().find(|r| r.name == name).cloned())
    }

    async fn list(&self) -> UserResult<Vec<RoleWithPermissions>> {
        let store = self.inner.read().await;
        let mut roles: Vec<RoleWithPermissions> = store
            .roles
            .values()
            .map(|role| resolve_permissions(&store, role))
            .collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn update(&self, id: Uuid, changes: RoleChanges) -> UserResult<RoleWithPermissions> {
        let mut store = self.inner.write().await;
        if let Some(ids) = &changes.permission_ids {
            check_permission_ids(&store, ids)?;
        }

        let role = store.roles.get_mut(&id).ok_or(UserError::RoleNotFound)?;
        if let Some(name) = changes.name {
            role.name = name;
        }
        let role = role.clone();
        if let Some(ids) = changes.permission_ids {
            store.assignments.insert(id, ids);
        }
        Ok(resolve_permissions(&store, &role))
    }

    async fn delete(&self, id: Uuid) -> UserResult<bool> {
        let mut store = self.inner.write().await;
        store.assignments.remove(&id);
        Ok(store.roles.remove(&id).is_some())
    }

    async fn list_permissions(&self) -> UserResult<Vec<Permission>> {
        let store = self.inner.read().await;
        let mut permissions: Vec<Permission> = store.permissions.values().cloned().collect();
        permissions.sort_by_key(|p| p.id);
        Ok(permissions)
    }
}

#[async_trait]
impl RolePermissions for InMemoryRoleRepository {
    async fn permissions_for_role(&self, role_id: Uuid) -> Result<Vec<String>, AccessError> {
        let store = self.inner.read().await;
        let mut permissions: Vec<&Permission> = store
            .assignments
            .get(&role_id)
            .into_iter()
            .flatten()
            .filter_map(|id| store.permissions.get(id))
            .collect();
        permissions.sort_by_key(|p| p.id);
        Ok(permissions.into_iter().map(|p| p.name.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            name: "Test User".into(),
            password_hash: "$argon2id$fake".into(),
            role_id: Uuid::now_v7(),
            supplier_id: None,
        }
    }

    #[tokio::test]
    async fn create_rejects_duplicate_email() {
        let repo = InMemoryUserRepository::new();
        repo.create(new_user("alice@example.com")).await.unwrap();

        let result = repo.create(new_user("ALICE@example.com")).await;
        assert!(matches!(result, Err(UserError::EmailTaken)));
    }

    #[tokio::test]
    async fn get_by_email_returns_hash() {
        let repo = InMemoryUserRepository::new();
        repo.create(new_user("bob@example.com")).await.unwrap();

        let found = repo.get_by_email("bob@example.com").await.unwrap().unwrap();
        assert_eq!(found.password_hash, "$argon2id$fake");
        assert_eq!(found.user.email, "bob@example.com");
    }

    #[tokio::test]
    async fn list_filters_and_paginates() {
        let repo = InMemoryUserRepository::new();
        for i in 0..5 {
            repo.create(new_user(&format!("user{i}@example.com")))
                .await
                .unwrap();
        }

        let descriptor = QueryDescriptor {
            limit: 2,
            offset: 2,
            order: vec![("email".into(), query_options::SortDirection::Asc)],
            ..Default::default()
        };
        let (page, total) = repo.list(&descriptor).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].email, "user2@example.com");
    }

    #[tokio::test]
    async fn update_missing_user_is_not_found() {
        let repo = InMemoryUserRepository::new();
        let result = repo
            .update(Uuid::now_v7(), UserChanges::default())
            .await;
        assert!(matches!(result, Err(UserError::NotFound)));
    }

    #[tokio::test]
    async fn role_create_rejects_unknown_permission_ids() {
        let repo = InMemoryRoleRepository::new();
        let known = repo.add_permission("read:product").await;

        let result = repo
            .create(NewRole {
                name: "manager".into(),
                permission_ids: vec![known.id, 9999],
            })
            .await;
        assert!(matches!(
            result,
            Err(UserError::UnknownPermissionIds(ids)) if ids == vec![9999]
        ));
    }

    #[tokio::test]
    async fn role_permissions_come_back_ordered() {
        let repo = InMemoryRoleRepository::new();
        let a = repo.add_permission("read:product").await;
        let b = repo.add_permission("create:order").await;

        let role = repo
            .create(NewRole {
                name: "customer".into(),
                permission_ids: vec![b.id, a.id],
            })
            .await
            .unwrap();
        assert_eq!(role.permissions[0].id, a.id);

        let names = repo.permissions_for_role(role.id).await.unwrap();
        assert_eq!(names, vec!["read:product", "create:order"]);
    }
}
