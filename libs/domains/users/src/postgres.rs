//! Postgres-backed repositories for users, roles and permissions

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use access_control::{AccessError, RolePermissions};
use database::BaseRepository;
use domain_catalog::entity::suppliers;
use domain_catalog::Supplier;
use query_options::{QueryDescriptor, SortDirection};

use crate::entity::{permissions, role_permissions, roles, users};
use crate::error::{UserError, UserResult};
use crate::models::{
    AuthUser, NewRole, NewUser, Permission, Role, RoleChanges, RoleWithPermissions, User,
    UserChanges,
};
use crate::repository::{RoleRepository, UserRepository};

/// Coerce a raw filter value to the narrowest SQL value so equality works
/// against uuid, numeric and boolean columns as well as text.
fn filter_value(raw: &str) -> sea_orm::Value {
    if let Ok(id) = Uuid::parse_str(raw) {
        return id.into();
    }
    if let Ok(n) = raw.parse::<i64>() {
        return n.into();
    }
    if let Ok(b) = raw.parse::<bool>() {
        return b.into();
    }
    raw.into()
}

#[derive(Clone)]
pub struct PgUserRepository {
    base: BaseRepository<users::Entity>,
}

impl PgUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, input: NewUser) -> UserResult<User> {
        let active: users::ActiveModel = input.into();
        let model = self.base.insert(active).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                UserError::EmailTaken
            } else {
                UserError::Database(e)
            }
        })?;
        Ok(model.into())
    }

    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>> {
        Ok(self.base.find_by_id(id).await?.map(Into::into))
    }

    async fn get_by_email(&self, email: &str) -> UserResult<Option<AuthUser>> {
        let model = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(self.base.db())
            .await?;
        Ok(model.map(|m| AuthUser {
            password_hash: m.password_hash.clone(),
            user: m.into(),
        }))
    }

    async fn list(&self, descriptor: &QueryDescriptor) -> UserResult<(Vec<User>, u64)> {
        let mut query = users::Entity::find();
        for (field, value) in &descriptor.filter {
            if let Ok(column) = field.parse::<users::Column>() {
                query = query.filter(column.eq(filter_value(value)));
            }
        }
        let total = query.clone().count(self.base.db()).await?;

        for (field, direction) in &descriptor.order {
            if let Ok(column) = field.parse::<users::Column>() {
                query = match direction {
                    SortDirection::Asc => query.order_by_asc(column),
                    SortDirection::Desc => query.order_by_desc(column),
                };
            }
        }
        let models = query
            .offset(descriptor.offset)
            .limit(descriptor.limit)
            .all(self.base.db())
            .await?;
        Ok((models.into_iter().map(Into::into).collect(), total))
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> UserResult<User> {
        let model = self.base.find_by_id(id).await?.ok_or(UserError::NotFound)?;
        let mut active = model.into_active_model();
        if let Some(email) = changes.email {
            active.email = Set(email);
        }
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(hash) = changes.password_hash {
            active.password_hash = Set(hash);
        }
        if let Some(role_id) = changes.role_id {
            active.role_id = Set(role_id);
        }
        if let Some(supplier_id) = changes.supplier_id {
            active.supplier_id = Set(supplier_id);
        }
        active.updated_at = Set(chrono::Utc::now().into());

        let model = self.base.update(active).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                UserError::EmailTaken
            } else {
                UserError::Database(e)
            }
        })?;
        Ok(model.into())
    }

    async fn delete(&self, id: Uuid) -> UserResult<bool> {
        Ok(self.base.delete_by_id(id).await?)
    }

    async fn get_supplier(&self, id: Uuid) -> UserResult<Option<Supplier>> {
        let model = suppliers::Entity::find_by_id(id).one(self.base.db()).await?;
        Ok(model.map(Into::into))
    }
}

#[derive(Clone)]
pub struct PgRoleRepository {
    base: BaseRepository<roles::Entity>,
}

impl PgRoleRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    async fn permissions_of(&self, role_id: Uuid) -> UserResult<Vec<Permission>> {
        let models = permissions::Entity::find()
            .inner_join(role_permissions::Entity)
            .filter(role_permissions::Column::RoleId.eq(role_id))
            .order_by_asc(permissions::Column::Id)
            .all(self.base.db())
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    /// Verify every id exists in the permission catalog.
    async fn check_permission_ids(&self, ids: &[i32]) -> UserResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let known: Vec<i32> = permissions::Entity::find()
            .filter(permissions::Column::Id.is_in(ids.to_vec()))
            .all(self.base.db())
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();
        let unknown: Vec<i32> = ids
            .iter()
            .copied()
            .filter(|id| !known.contains(id))
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(UserError::UnknownPermissionIds(unknown))
        }
    }
}

#[async_trait]
impl RoleRepository for PgRoleRepository {
    async fn create(&self, input: NewRole) -> UserResult<RoleWithPermissions> {
        self.check_permission_ids(&input.permission_ids).await?;

        let txn = self.base.db().begin().await?;
        let role = roles::ActiveModel {
            id: Set(Uuid::now_v7()),
            name: Set(input.name),
        }
        .insert(&txn)
        .await?;
        for permission_id in &input.permission_ids {
            role_permissions::ActiveModel {
                role_id: Set(role.id),
                permission_id: Set(*permission_id),
            }
            .insert(&txn)
            .await?;
        }
        txn.commit().await?;

        let permissions = self.permissions_of(role.id).await?;
        Ok(RoleWithPermissions {
            id: role.id,
            name: role.name,
            permissions,
        })
    }

    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<RoleWithPermissions>> {
        let Some(role) = self.base.find_by_id(id).await? else {
            return Ok(None);
        };
        let permissions = self.permissions_of(role.id).await?;
        Ok(Some(RoleWithPermissions {
            id: role.id,
            name: role.name,
            permissions,
        }))
    }

    async fn get_by_name(&self, name: &str) -> UserResult<Option<Role>> {
        let model = roles::Entity::find()
            .filter(roles::Column::Name.eq(name))
            .one(self.base.db())
            .await?;
        Ok(model.map(Into::into))
    }

    async fn list(&self) -> UserResult<Vec<RoleWithPermissions>> {
        let roles = roles::Entity::find()
            .order_by_asc(roles::Column::Name)
            .all(self.base.db())
            .await?;
        let mut result = Vec::with_capacity(roles.len());
        for role in roles {
            let permissions = self.permissions_of(role.id).await?;
            result.push(RoleWithPermissions {
                id: role.id,
                name: role.name,
                permissions,
            });
        }
        Ok(result)
    }

    async fn update(&self, id: Uuid, changes: RoleChanges) -> UserResult<RoleWithPermissions> {
        if let Some(ids) = &changes.permission_ids {
            self.check_permission_ids(ids).await?;
        }
        let role = self
            .base
            .find_by_id(id)
            .await?
            .ok_or(UserError::RoleNotFound)?;

        let txn = self.base.db().begin().await?;
        let role = if let Some(name) = changes.name {
            let mut active = role.into_active_model();
            active.name = Set(name);
            active.update(&txn).await?
        } else {
            role
        };
        if let Some(ids) = changes.permission_ids {
            role_permissions::Entity::delete_many()
                .filter(role_permissions::Column::RoleId.eq(id))
                .exec(&txn)
                .await?;
            for permission_id in ids {
                role_permissions::ActiveModel {
                    role_id: Set(id),
                    permission_id: Set(permission_id),
                }
                .insert(&txn)
                .await?;
            }
        }
        txn.commit().await?;

        let permissions = self.permissions_of(id).await?;
        Ok(RoleWithPermissions {
            id: role.id,
            name: role.name,
            permissions,
        })
    }

    async fn delete(&self, id: Uuid) -> UserResult<bool> {
        let txn = self.base.db().begin().await?;
        role_permissions::Entity::delete_many()
            .filter(role_permissions::Column::RoleId.eq(id))
            .exec(&txn)
            .await?;
        let result = roles::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    async fn list_permissions(&self) -> UserResult<Vec<Permission>> {
        let models = permissions::Entity::find()
            .order_by_asc(permissions::Column::Id)
            .all(self.base.db())
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl RolePermissions for PgRoleRepository {
    async fn permissions_for_role(&self, role_id: Uuid) -> Result<Vec<String>, AccessError> {
        let permissions = self
            .permissions_of(role_id)
            .await
            .map_err(|e| AccessError::Lookup(e.to_string()))?;
        Ok(permissions.into_iter().map(|p| p.name).collect())
    }
}
