use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use query_options::{apply_descriptor, QueryDescriptor};

use crate::error::{CatalogError, CatalogResult};
use crate::models::{
    Category, CreateCategory, NewProduct, NewSupplier, Product, Supplier, UpdateCategory,
    UpdateProduct, UpdateSupplier,
};

/// Repository trait for product persistence and stock accounting
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn create(&self, input: NewProduct) -> CatalogResult<Product>;

    async fn get_by_id(&self, id: Uuid) -> CatalogResult<Option<Product>>;

    /// List products honoring the request's query descriptor, returning the
    /// page plus the filtered total
    async fn list(&self, descriptor: &QueryDescriptor) -> CatalogResult<(Vec<Product>, u64)>;

    async fn update(&self, id: Uuid, input: UpdateProduct) -> CatalogResult<Product>;

    async fn delete(&self, id: Uuid) -> CatalogResult<bool>;

    /// Decrement stock for every line, all-or-nothing. A line whose product
    /// is missing or would go negative fails the whole batch with no stock
    /// changed.
    async fn decrement_stock(&self, lines: &[(Uuid, i32)]) -> CatalogResult<()>;

    /// Add stock back for every line (order cancellation).
    async fn restore_stock(&self, lines: &[(Uuid, i32)]) -> CatalogResult<()>;
}

/// Repository trait for category persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn create(&self, input: CreateCategory) -> CatalogResult<Category>;
    async fn get_by_id(&self, id: Uuid) -> CatalogResult<Option<Category>>;
    async fn list(&self, descriptor: &QueryDescriptor) -> CatalogResult<(Vec<Category>, u64)>;
    async fn update(&self, id: Uuid, input: UpdateCategory) -> CatalogResult<Category>;
    async fn delete(&self, id: Uuid) -> CatalogResult<bool>;
}

/// Repository trait for supplier persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SupplierRepository: Send + Sync {
    async fn create(&self, input: NewSupplier) -> CatalogResult<Supplier>;
    async fn get_by_id(&self, id: Uuid) -> CatalogResult<Option<Supplier>>;
    async fn list(&self, descriptor: &QueryDescriptor) -> CatalogResult<(Vec<Supplier>, u64)>;
    async fn update(&self, id: Uuid, input: UpdateSupplier) -> CatalogResult<Supplier>;
    async fn delete(&self, id: Uuid) -> CatalogResult<bool>;
}

fn list_page<T>(
    records: impl Iterator<Item = T>,
    descriptor: &QueryDescriptor,
) -> CatalogResult<(Vec<T>, u64)>
where
    T: serde::Serialize + serde::de::DeserializeOwned,
{
    let values = records
        .map(|r| serde_json::to_value(&r))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CatalogError::Internal(e.to_string()))?;
    let (page, total) = apply_descriptor(values, descriptor);
    let page = page
        .into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| CatalogError::Internal(e.to_string()))?;
    Ok((page, total))
}

/// In-memory implementation of ProductRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryProductRepository {
    products: Arc<RwLock<HashMap<Uuid, Product>>>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn create(&self, input: NewProduct) -> CatalogResult<Product> {
        let mut products = self.products.write().await;
        let now: chrono::DateTime<chrono::FixedOffset> = chrono::Utc::now().into();
        let product = Product {
            id: Uuid::now_v7(),
            name: input.name,
            description: input.description,
            price_cents: input.price_cents,
            stock: input.stock,
            supplier_id: input.supplier_id,
            category_id: input.category_id,
            created_at: now,
            updated_at: now,
        };
        products.insert(product.id, product.clone());
        tracing::info!(product_id = %product.id, "Created product");
        Ok(product)
    }

    async fn get_by_id(&self, id: Uuid) -> CatalogResult<Option<Product>> {
        let products = self.products.read().await;
        Ok(products.get(&id).cloned())
    }

    async fn list(&self, descriptor: &QueryDescriptor) -> CatalogResult<(Vec<Product>, u64)> {
        let products = self.products.read().await;
        list_page(products.values().cloned(), descriptor)
    }

    async fn update(&self, id: Uuid, input: UpdateProduct) -> CatalogResult<Product> {
        let mut products = self.products.write().await;
        let product = products.get_mut(&id).ok_or(CatalogError::ProductNotFound)?;
        if let Some(name) = input.name {
            product.name = name;
        }
        if let Some(description) = input.description {
            product.description = description;
        }
        if let Some(price_cents) = input.price_cents {
            product.price_cents = price_cents;
        }
        if let Some(stock) = input.stock {
            product.stock = stock;
        }
        if let Some(category_id) = input.category_id {
            product.category_id = category_id;
        }
        product.updated_at = chrono::Utc::now().into();
        Ok(product.clone())
    }

    async fn delete(&self, id: Uuid) -> CatalogResult<bool> {
        let mut products = self.products.write().await;
        Ok(products.remove(&id).is_some())
    }

    async fn decrement_stock(&self, lines: &[(Uuid, i32)]) -> CatalogResult<()> {
        let mut products = self.products.write().await;

        // Validate the whole batch before touching anything.
        for (product_id, quantity) in lines {
            let product = products
                .get(product_id)
                .ok_or(CatalogError::ProductNotFound)?;
            if product.stock < *quantity {
                return Err(CatalogError::InsufficientStock {
                    product_id: *product_id,
                    requested: *quantity,
                    available: product.stock,
                });
            }
        }
        for (product_id, quantity) in lines {
            let product = products.get_mut(product_id).expect("validated above");
            product.stock -= quantity;
            product.updated_at = chrono::Utc::now().into();
        }
        Ok(())
    }

    async fn restore_stock(&self, lines: &[(Uuid, i32)]) -> CatalogResult<()> {
        let mut products = self.products.write().await;
        for (product_id, quantity) in lines {
            let product = products
                .get_mut(product_id)
                .ok_or(CatalogError::ProductNotFound)?;
            product.stock += quantity;
            product.updated_at = chrono::Utc::now().into();
        }
        Ok(())
    }
}

/// In-memory implementation of CategoryRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryCategoryRepository {
    categories: Arc<RwLock<HashMap<Uuid, Category>>>,
}

impl InMemoryCategoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CategoryRepository for InMemoryCategoryRepository {
    async fn create(&self, input: CreateCategory) -> CatalogResult<Category> {
        let mut categories = self.categories.write().await;
        if categories.values().any(|c| c.slug == input.slug) {
            return Err(CatalogError::SlugTaken);
        }
        let category = Category {
            id: Uuid::now_v7(),
            name: input.name,
            slug: input.slug,
        };
        categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn get_by_id(&self, id: Uuid) -> CatalogResult<Option<Category>> {
        let categories = self.categories.read().await;
        Ok(categories.get(&id).cloned())
    }

    async fn list(&self, descriptor: &QueryDescriptor) -> CatalogResult<(Vec<Category>, u64)> {
        let categories = self.categories.read().await;
        list_page(categories.values().cloned(), descriptor)
    }

    async fn update(&self, id: Uuid, input: UpdateCategory) -> CatalogResult<Category> {
        let mut categories = self.categories.write().await;
        if let Some(slug) = &input.slug {
            if categories.values().any(|c| c.id != id && c.slug == *slug) {
                return Err(CatalogError::SlugTaken);
            }
        }
        let category = categories
            .get_mut(&id)
            .ok_or(CatalogError::CategoryNotFound)?;
        if let Some(name) = input.name {
            category.name = name;
        }
        if let Some(slug) = input.slug {
            category.slug = slug;
        }
        Ok(category.clone())
    }

    async fn delete(&self, id: Uuid) -> CatalogResult<bool> {
        let mut categories = self.categories.write().await;
        Ok(categories.remove(&id).is_some())
    }
}

/// In-memory implementation of SupplierRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemorySupplierRepository {
    suppliers: Arc<RwLock<HashMap<Uuid, Supplier>>>,
}

impl InMemorySupplierRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SupplierRepository for InMemorySupplierRepository {
    async fn create(&self, input: NewSupplier) -> CatalogResult<Supplier> {
        let mut suppliers = self.suppliers.write().await;
        if suppliers
            .values()
            .any(|s| s.email.eq_ignore_ascii_case(&input.email))
        {
            return Err(CatalogError::SupplierEmailTaken);
        }
        let now: chrono::DateTime<chrono::FixedOffset> = chrono::Utc::now().into();
        let supplier = Supplier {
            id: Uuid::now_v7(),
            name: input.name,
            email: input.email,
            user_id: input.user_id,
            created_at: now,
            updated_at: now,
        };
        suppliers.insert(supplier.id, supplier.clone());
        Ok(supplier)
    }

    async fn get_by_id(&self, id: Uuid) -> CatalogResult<Option<Supplier>> {
        let suppliers = self.suppliers.read().await;
        Ok(suppliers.get(&id).cloned())
    }

    async fn list(&self, descriptor: &QueryDescriptor) -> CatalogResult<(Vec<Supplier>, u64)> {
        let suppliers = self.suppliers.read().await;
        list_page(suppliers.values().cloned(), descriptor)
    }

    async fn update(&self, id: Uuid, input: UpdateSupplier) -> CatalogResult<Supplier> {
        let mut suppliers = self.suppliers.write().await;
        if let Some(email) = &input.email {
            if suppliers
                .values()
                .any(|s| s.id != id && s.email.eq_ignore_ascii_case(email))
            {
                return Err(CatalogError::SupplierEmailTaken);
            }
        }
        let supplier = suppliers
            .get_mut(&id)
            .ok_or(CatalogError::SupplierNotFound)?;
        if let Some(name) = input.name {
            supplier.name = name;
        }
        if let Some(email) = input.email {
            supplier.email = email;
        }
        supplier.updated_at = chrono::Utc::now().into();
        Ok(supplier.clone())
    }

    async fn delete(&self, id: Uuid) -> CatalogResult<bool> {
        let mut suppliers = self.suppliers.write().await;
        Ok(suppliers.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_product(stock: i32) -> NewProduct {
        NewProduct {
            name: "Trowel".into(),
            description: "Hand trowel".into(),
            price_cents: 1299,
            stock,
            supplier_id: Uuid::now_v7(),
            category_id: Uuid::now_v7(),
        }
    }

    #[tokio::test]
    async fn decrement_stock_is_all_or_nothing() {
        let repo = InMemoryProductRepository::new();
        let a = repo.create(new_product(10)).await.unwrap();
        let b = repo.create(new_product(1)).await.unwrap();

        let result = repo.decrement_stock(&[(a.id, 5), (b.id, 2)]).await;
        assert!(matches!(
            result,
            Err(CatalogError::InsufficientStock { requested: 2, available: 1, .. })
        ));

        // First line must not have been applied.
        assert_eq!(repo.get_by_id(a.id).await.unwrap().unwrap().stock, 10);
        assert_eq!(repo.get_by_id(b.id).await.unwrap().unwrap().stock, 1);
    }

    #[tokio::test]
    async fn decrement_then_restore_round_trip() {
        let repo = InMemoryProductRepository::new();
        let product = repo.create(new_product(7)).await.unwrap();

        repo.decrement_stock(&[(product.id, 3)]).await.unwrap();
        assert_eq!(repo.get_by_id(product.id).await.unwrap().unwrap().stock, 4);

        repo.restore_stock(&[(product.id, 3)]).await.unwrap();
        assert_eq!(repo.get_by_id(product.id).await.unwrap().unwrap().stock, 7);
    }

    #[tokio::test]
    async fn category_slug_must_be_unique() {
        let repo = InMemoryCategoryRepository::new();
        repo.create(CreateCategory {
            name: "Garden".into(),
            slug: "garden".into(),
        })
        .await
        .unwrap();

        let result = repo
            .create(CreateCategory {
                name: "Gardening".into(),
                slug: "garden".into(),
            })
            .await;
        assert!(matches!(result, Err(CatalogError::SlugTaken)));
    }

    #[tokio::test]
    async fn product_list_filters_by_supplier() {
        let repo = InMemoryProductRepository::new();
        let mine = repo.create(new_product(1)).await.unwrap();
        repo.create(new_product(1)).await.unwrap();

        let descriptor = QueryDescriptor {
            filter: vec![("supplier_id".into(), mine.supplier_id.to_string())],
            ..Default::default()
        };
        let (page, total) = repo.list(&descriptor).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(page[0].id, mine.id);
    }
}
