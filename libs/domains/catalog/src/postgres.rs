//! Postgres-backed repositories for the catalog

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, ExprTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use database::BaseRepository;
use query_options::{QueryDescriptor, SortDirection};

use crate::entity::{categories, products, suppliers};
use crate::error::{CatalogError, CatalogResult};
use crate::models::{
    Category, CreateCategory, NewProduct, NewSupplier, Product, Supplier, UpdateCategory,
    UpdateProduct, UpdateSupplier,
};
use crate::repository::{CategoryRepository, ProductRepository, SupplierRepository};

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

macro_rules! descriptor_query {
    ($entity:path, $column:ty, $descriptor:expr, $db:expr) => {{
        let descriptor = $descriptor;
        let mut query = <$entity>::find();
        for (field, value) in &descriptor.filter {
            if let Ok(column) = field.parse::<$column>() {
                query = query.filter(column.eq(filter_value(value)));
            }
        }
        let total = query.clone().count($db).await?;
        for (field, direction) in &descriptor.order {
            if let Ok(column) = field.parse::<$column>() {
                query = match direction {
                    SortDirection::Asc => query.order_by_asc(column),
                    SortDirection::Desc => query.order_by_desc(column),
                };
            }
        }
        let models = query
            .offset(descriptor.offset)
            .limit(descriptor.limit)
            .all($db)
            .await?;
        (models, total)
    }};
}

#[derive(Clone)]
pub struct PgProductRepository {
    base: BaseRepository<products::Entity>,
}

impl PgProductRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Run one decrement line inside the surrounding transaction.
    async fn decrement_line(
        txn: &DatabaseTransaction,
        product_id: Uuid,
        quantity: i32,
    ) -> CatalogResult<()> {
        let result = products::Entity::update_many()
            .col_expr(
                products::Column::Stock,
                Expr::col(products::Column::Stock).sub(quantity),
            )
            .col_expr(
                products::Column::UpdatedAt,
                Expr::value(chrono::Utc::now()),
            )
            .filter(products::Column::Id.eq(product_id))
            .filter(products::Column::Stock.gte(quantity))
            .exec(txn)
            .await?;
        if result.rows_affected > 0 {
            return Ok(());
        }

        // Distinguish a missing product from an insufficient one.
        match products::Entity::find_by_id(product_id).one(txn).await? {
            Some(product) => Err(CatalogError::InsufficientStock {
                product_id,
                requested: quantity,
                available: product.stock,
            }),
            None => Err(CatalogError::ProductNotFound),
        }
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn create(&self, input: NewProduct) -> CatalogResult<Product> {
        let active: products::ActiveModel = input.into();
        Ok(self.base.insert(active).await?.into())
    }

    async fn get_by_id(&self, id: Uuid) -> CatalogResult<Option<Product>> {
        Ok(self.base.find_by_id(id).await?.map(Into::into))
    }

    async fn list(&self, descriptor: &QueryDescriptor) -> CatalogResult<(Vec<Product>, u64)> {
        let (models, total) = descriptor_query!(
            products::Entity,
            products::Column,
            descriptor,
            self.base.db()
        );
        Ok((models.into_iter().map(Into::into).collect(), total))
    }

    async fn update(&self, id: Uuid, input: UpdateProduct) -> CatalogResult<Product> {
        let model = self
            .base
            .find_by_id(id)
            .await?
            .ok_or(CatalogError::ProductNotFound)?;
        let mut active = model.into_active_model();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(price_cents) = input.price_cents {
            active.price_cents = Set(price_cents);
        }
        if let Some(stock) = input.stock {
            active.stock = Set(stock);
        }
        if let Some(category_id) = input.category_id {
            active.category_id = Set(category_id);
        }
        active.updated_at = Set(chrono::Utc::now().into());
        Ok(self.base.update(active).await?.into())
    }

    async fn delete(&self, id: Uuid) -> CatalogResult<bool> {
        Ok(self.base.delete_by_id(id).await?)
    }

    async fn decrement_stock(&self, lines: &[(Uuid, i32)]) -> CatalogResult<()> {
        let txn = self.base.db().begin().await?;
        for (product_id, quantity) in lines {
            Self::decrement_line(&txn, *product_id, *quantity).await?;
        }
        txn.commit().await?;
        Ok(())
    }

    async fn restore_stock(&self, lines: &[(Uuid, i32)]) -> CatalogResult<()> {
        let txn = self.base.db().begin().await?;
        for (product_id, quantity) in lines {
            let result = products::Entity::update_many()
                .col_expr(
                    products::Column::Stock,
                    Expr::col(products::Column::Stock).add(*quantity),
                )
                .col_expr(
                    products::Column::UpdatedAt,
                    Expr::value(chrono::Utc::now()),
                )
                .filter(products::Column::Id.eq(*product_id))
                .exec(&txn)
                .await?;
            if result.rows_affected == 0 {
                return Err(CatalogError::ProductNotFound);
            }
        }
        txn.commit().await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgCategoryRepository {
    base: BaseRepository<categories::Entity>,
}

impl PgCategoryRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

#[async_trait]
impl CategoryRepository for PgCategoryRepository {
    async fn create(&self, input: CreateCategory) -> CatalogResult<Category> {
        let active: categories::ActiveModel = input.into();
        let model = self.base.insert(active).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                CatalogError::SlugTaken
            } else {
                CatalogError::Database(e)
            }
        })?;
        Ok(model.into())
    }

    async fn get_by_id(&self, id: Uuid) -> CatalogResult<Option<Category>> {
        Ok(self.base.find_by_id(id).await?.map(Into::into))
    }

    async fn list(&self, descriptor: &QueryDescriptor) -> CatalogResult<(Vec<Category>, u64)> {
        let (models, total) = descriptor_query!(
            categories::Entity,
            categories::Column,
            descriptor,
            self.base.db()
        );
        Ok((models.into_iter().map(Into::into).collect(), total))
    }

    async fn update(&self, id: Uuid, input: UpdateCategory) -> CatalogResult<Category> {
        let model = self
            .base
            .find_by_id(id)
            .await?
            .ok_or(CatalogError::CategoryNotFound)?;
        let mut active = model.into_active_model();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(slug) = input.slug {
            active.slug = Set(slug);
        }
        let model = self.base.update(active).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                CatalogError::SlugTaken
            } else {
                CatalogError::Database(e)
            }
        })?;
        Ok(model.into())
    }

    async fn delete(&self, id: Uuid) -> CatalogResult<bool> {
        Ok(self.base.delete_by_id(id).await?)
    }
}

#[derive(Clone)]
pub struct PgSupplierRepository {
    base: BaseRepository<suppliers::Entity>,
}

impl PgSupplierRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

#[async_trait]
impl SupplierRepository for PgSupplierRepository {
    async fn create(&self, input: NewSupplier) -> CatalogResult<Supplier> {
        let active: suppliers::ActiveModel = input.into();
        let model = self.base.insert(active).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                CatalogError::SupplierEmailTaken
            } else {
                CatalogError::Database(e)
            }
        })?;
        Ok(model.into())
    }

    async fn get_by_id(&self, id: Uuid) -> CatalogResult<Option<Supplier>> {
        Ok(self.base.find_by_id(id).await?.map(Into::into))
    }

    async fn list(&self, descriptor: &QueryDescriptor) -> CatalogResult<(Vec<Supplier>, u64)> {
        let (models, total) = descriptor_query!(
            suppliers::Entity,
            suppliers::Column,
            descriptor,
            self.base.db()
        );
        Ok((models.into_iter().map(Into::into).collect(), total))
    }

    async fn update(&self, id: Uuid, input: UpdateSupplier) -> CatalogResult<Supplier> {
        let model = self
            .base
            .find_by_id(id)
            .await?
            .ok_or(CatalogError::SupplierNotFound)?;
        let mut active = model.into_active_model();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(email) = input.email {
            active.email = Set(email);
        }
        active.updated_at = Set(chrono::Utc::now().into());
        let model = self.base.update(active).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                CatalogError::SupplierEmailTaken
            } else {
                CatalogError::Database(e)
            }
        })?;
        Ok(model.into())
    }

    async fn delete(&self, id: Uuid) -> CatalogResult<bool> {
        Ok(self.base.delete_by_id(id).await?)
    }
}
