use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use query_options::{project_value, IncludeEntry, QueryDescriptor};

use crate::error::{CatalogError, CatalogResult};
use crate::models::{
    Category, CreateCategory, CreateProduct, CreateSupplier, NewProduct, NewSupplier, Product,
    Supplier, UpdateCategory, UpdateProduct, UpdateSupplier,
};
use crate::repository::{CategoryRepository, ProductRepository, SupplierRepository};

/// Service layer for the product catalog
#[derive(Clone)]
pub struct CatalogService<P, C, S>
where
    P: ProductRepository,
    C: CategoryRepository,
    S: SupplierRepository,
{
    products: Arc<P>,
    categories: Arc<C>,
    suppliers: Arc<S>,
}

impl<P, C, S> CatalogService<P, C, S>
where
    P: ProductRepository,
    C: CategoryRepository,
    S: SupplierRepository,
{
    pub fn new(products: P, categories: C, suppliers: S) -> Self {
        Self {
            products: Arc::new(products),
            categories: Arc::new(categories),
            suppliers: Arc::new(suppliers),
        }
    }

    /// Shared handle to the product repository, for collaborators that need
    /// stock accounting (order placement and cancellation).
    pub fn products(&self) -> Arc<P> {
        self.products.clone()
    }

    /// Create a product owned by the requester's supplier profile.
    pub async fn create_product(
        &self,
        supplier_id: Uuid,
        input: CreateProduct,
    ) -> CatalogResult<Product> {
        if self.categories.get_by_id(input.category_id).await?.is_none() {
            return Err(CatalogError::CategoryNotFound);
        }
        let product = self
            .products
            .create(NewProduct {
                name: input.name,
                description: input.description,
                price_cents: input.price_cents,
                stock: input.stock,
                supplier_id,
                category_id: input.category_id,
            })
            .await?;
        tracing::info!(product_id = %product.id, supplier_id = %supplier_id, "Created product");
        Ok(product)
    }

    pub async fn get_product(&self, id: Uuid) -> CatalogResult<Product> {
        self.products
            .get_by_id(id)
            .await?
            .ok_or(CatalogError::ProductNotFound)
    }

    /// List products as JSON documents with includes and sparse fieldsets.
    ///
    /// Supported relations are `supplier` and `category`, each embedded under
    /// its relation name with its own projection.
    pub async fn list_product_documents(
        &self,
        descriptor: &QueryDescriptor,
    ) -> CatalogResult<(Vec<Value>, u64)> {
        let (products, total) = self.products.list(descriptor).await?;

        let mut supplier_cache: HashMap<Uuid, Value> = HashMap::new();
        let mut category_cache: HashMap<Uuid, Value> = HashMap::new();

        let mut documents = Vec::with_capacity(products.len());
        for product in products {
            let supplier_id = product.supplier_id;
            let category_id = product.category_id;
            let mut doc = serde_json::to_value(&product)
                .map_err(|e| CatalogError::Internal(e.to_string()))?;
            doc = project_value(doc, descriptor.attributes.as_deref());

            for entry in &descriptor.include {
                let embedded = match entry.relation.as_str() {
                    "supplier" => {
                        self.embed_supplier(entry, supplier_id, &mut supplier_cache)
                            .await?
                    }
                    "category" => {
                        self.embed_category(entry, category_id, &mut category_cache)
                            .await?
                    }
                    _ => continue,
                };
                if let Some(object) = doc.as_object_mut() {
                    object.insert(entry.relation.clone(), embedded);
                }
            }
            documents.push(doc);
        }
        Ok((documents, total))
    }

    async fn embed_supplier(
        &self,
        entry: &IncludeEntry,
        id: Uuid,
        cache: &mut HashMap<Uuid, Value>,
    ) -> CatalogResult<Value> {
        if let Some(cached) = cache.get(&id) {
            return Ok(cached.clone());
        }
        let value = match self.suppliers.get_by_id(id).await? {
            Some(supplier) => serde_json::to_value(&supplier)
                .map_err(|e| CatalogError::Internal(e.to_string()))?,
            None => Value::Null,
        };
        let value = project_value(value, entry.attributes.as_deref());
        cache.insert(id, value.clone());
        Ok(value)
    }

    async fn embed_category(
        &self,
        entry: &IncludeEntry,
        id: Uuid,
        cache: &mut HashMap<Uuid, Value>,
    ) -> CatalogResult<Value> {
        if let Some(cached) = cache.get(&id) {
            return Ok(cached.clone());
        }
        let value = match self.categories.get_by_id(id).await? {
            Some(category) => serde_json::to_value(&category)
                .map_err(|e| CatalogError::Internal(e.to_string()))?,
            None => Value::Null,
        };
        let value = project_value(value, entry.attributes.as_deref());
        cache.insert(id, value.clone());
        Ok(value)
    }

    pub async fn update_product(&self, id: Uuid, input: UpdateProduct) -> CatalogResult<Product> {
        if let Some(category_id) = input.category_id {
            if self.categories.get_by_id(category_id).await?.is_none() {
                return Err(CatalogError::CategoryNotFound);
            }
        }
        self.products.update(id, input).await
    }

    pub async fn delete_product(&self, id: Uuid) -> CatalogResult<bool> {
        self.products.delete(id).await
    }

    pub async fn create_category(&self, input: CreateCategory) -> CatalogResult<Category> {
        self.categories.create(input).await
    }

    pub async fn get_category(&self, id: Uuid) -> CatalogResult<Category> {
        self.categories
            .get_by_id(id)
            .await?
            .ok_or(CatalogError::CategoryNotFound)
    }

    pub async fn list_categories(
        &self,
        descriptor: &QueryDescriptor,
    ) -> CatalogResult<(Vec<Category>, u64)> {
        self.categories.list(descriptor).await
    }

    pub async fn update_category(
        &self,
        id: Uuid,
        input: UpdateCategory,
    ) -> CatalogResult<Category> {
        self.categories.update(id, input).await
    }

    pub async fn delete_category(&self, id: Uuid) -> CatalogResult<bool> {
        self.categories.delete(id).await
    }

    /// Create a supplier profile owned by the requesting account.
    pub async fn create_supplier(
        &self,
        user_id: Uuid,
        input: CreateSupplier,
    ) -> CatalogResult<Supplier> {
        let supplier = self
            .suppliers
            .create(NewSupplier {
                name: input.name,
                email: input.email,
                user_id,
            })
            .await?;
        tracing::info!(supplier_id = %supplier.id, user_id = %user_id, "Created supplier");
        Ok(supplier)
    }

    pub async fn get_supplier(&self, id: Uuid) -> CatalogResult<Supplier> {
        self.suppliers
            .get_by_id(id)
            .await?
            .ok_or(CatalogError::SupplierNotFound)
    }

    pub async fn list_suppliers(
        &self,
        descriptor: &QueryDescriptor,
    ) -> CatalogResult<(Vec<Supplier>, u64)> {
        self.suppliers.list(descriptor).await
    }

    pub async fn update_supplier(
        &self,
        id: Uuid,
        input: UpdateSupplier,
    ) -> CatalogResult<Supplier> {
        self.suppliers.update(id, input).await
    }

    pub async fn delete_supplier(&self, id: Uuid) -> CatalogResult<bool> {
        self.suppliers.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{
        MockCategoryRepository, MockProductRepository, MockSupplierRepository,
    };

    fn sample_product(supplier_id: Uuid, category_id: Uuid) -> Product {
        Product {
            id: Uuid::now_v7(),
            name: "Trowel".into(),
            description: "Hand trowel".into(),
            price_cents: 1299,
            stock: 5,
            supplier_id,
            category_id,
            created_at: chrono::Utc::now().into(),
            updated_at: chrono::Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn create_product_requires_existing_category() {
        let products = MockProductRepository::new();
        let mut categories = MockCategoryRepository::new();
        let suppliers = MockSupplierRepository::new();
        categories.expect_get_by_id().returning(|_| Ok(None));

        let service = CatalogService::new(products, categories, suppliers);
        let result = service
            .create_product(
                Uuid::now_v7(),
                CreateProduct {
                    name: "Trowel".into(),
                    description: String::new(),
                    price_cents: 1299,
                    stock: 5,
                    category_id: Uuid::now_v7(),
                },
            )
            .await;
        assert!(matches!(result, Err(CatalogError::CategoryNotFound)));
    }

    #[tokio::test]
    async fn product_documents_embed_supplier_and_category() {
        let mut products = MockProductRepository::new();
        let mut categories = MockCategoryRepository::new();
        let mut suppliers = MockSupplierRepository::new();
        let supplier_id = Uuid::now_v7();
        let category_id = Uuid::now_v7();

        products
            .expect_list()
            .returning(move |_| Ok((vec![sample_product(supplier_id, category_id)], 1)));
        suppliers.expect_get_by_id().returning(|id| {
            Ok(Some(Supplier {
                id,
                name: "Acme".into(),
                email: "sales@acme.test".into(),
                user_id: Uuid::now_v7(),
                created_at: chrono::Utc::now().into(),
                updated_at: chrono::Utc::now().into(),
            }))
        });
        categories.expect_get_by_id().returning(|id| {
            Ok(Some(Category {
                id,
                name: "Garden".into(),
                slug: "garden".into(),
            }))
        });

        let descriptor = QueryDescriptor {
            include: vec![
                IncludeEntry {
                    relation: "supplier".into(),
                    target: "suppliers".into(),
                    attributes: Some(vec!["name".into()]),
                },
                IncludeEntry {
                    relation: "category".into(),
                    target: "categories".into(),
                    attributes: None,
                },
            ],
            ..Default::default()
        };
        let service = CatalogService::new(products, categories, suppliers);
        let (documents, total) = service.list_product_documents(&descriptor).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(documents[0]["supplier"]["name"], "Acme");
        assert!(documents[0]["supplier"].get("email").is_none());
        assert_eq!(documents[0]["category"]["slug"], "garden");
    }
}
