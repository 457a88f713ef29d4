use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use domain_catalog::repository::ProductRepository;
use query_options::{apply_descriptor, QueryDescriptor};

use crate::error::{OrderError, OrderResult};
use crate::models::{Order, OrderDetail, OrderItem, OrderStatus, Payment, PaymentStatus};

/// One requested order line, quantity already validated.
#[derive(Clone, Debug)]
pub struct NewOrderLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Repository trait for order persistence
///
/// The state-changing operations are transactional: stock, payment and order
/// status always move together or not at all.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Place an order: decrement stock per line, compute the total from
    /// current catalog prices, create the order, its lines and a pending
    /// payment. All-or-nothing.
    async fn create(&self, user_id: Uuid, lines: Vec<NewOrderLine>) -> OrderResult<OrderDetail>;

    async fn get(&self, id: Uuid) -> OrderResult<Option<OrderDetail>>;

    async fn list(&self, descriptor: &QueryDescriptor) -> OrderResult<(Vec<Order>, u64)>;

    /// Mark a pending order paid and its payment charged.
    async fn mark_paid(&self, id: Uuid, gateway_ref: String) -> OrderResult<OrderDetail>;

    /// Mark a paid order shipped.
    async fn mark_shipped(&self, id: Uuid) -> OrderResult<OrderDetail>;

    /// Cancel a pending or paid order: restore every line's stock, mark the
    /// payment refunded and the order canceled, atomically.
    async fn cancel(&self, id: Uuid) -> OrderResult<OrderDetail>;

    /// Order lines for products belonging to one supplier.
    async fn list_sales(
        &self,
        supplier_id: Uuid,
        descriptor: &QueryDescriptor,
    ) -> OrderResult<(Vec<OrderItem>, u64)>;
}

#[derive(Debug, Default)]
struct OrderStore {
    orders: HashMap<Uuid, Order>,
    items: HashMap<Uuid, Vec<OrderItem>>,
    payments: HashMap<Uuid, Payment>,
}

impl OrderStore {
    fn detail(&self, id: Uuid) -> Option<OrderDetail> {
        let order = self.orders.get(&id)?.clone();
        Some(OrderDetail {
            items: self.items.get(&id).cloned().unwrap_or_default(),
            payment: self.payments.get(&id)?.clone(),
            order,
        })
    }
}

/// In-memory implementation of OrderRepository (for development/testing)
///
/// Shares the product repository with the catalog so stock accounting stays
/// consistent across domains.
#[derive(Clone)]
pub struct InMemoryOrderRepository {
    products: Arc<dyn ProductRepository>,
    inner: Arc<RwLock<OrderStore>>,
}

impl InMemoryOrderRepository {
    pub fn new(products: Arc<dyn ProductRepository>) -> Self {
        Self {
            products,
            inner: Arc::new(RwLock::new(OrderStore::default())),
        }
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create(&self, user_id: Uuid, lines: Vec<NewOrderLine>) -> OrderResult<OrderDetail> {
        // Resolve prices first; a missing product fails before any stock
        // moves.
        let mut priced = Vec::with_capacity(lines.len());
        for line in &lines {
            let product = self
                .products
                .get_by_id(line.product_id)
                .await?
                .ok_or(OrderError::Catalog(
                    domain_catalog::CatalogError::ProductNotFound,
                ))?;
            priced.push((line.product_id, line.quantity, product.price_cents));
        }

        let stock_lines: Vec<(Uuid, i32)> =
            lines.iter().map(|l| (l.product_id, l.quantity)).collect();
        self.products.decrement_stock(&stock_lines).await?;

        let mut store = self.inner.write().await;
        let now: chrono::DateTime<chrono::FixedOffset> = chrono::Utc::now().into();
        let order_id = Uuid::now_v7();
        let total_cents: i64 = priced
            .iter()
            .map(|(_, quantity, price)| price * i64::from(*quantity))
            .sum();

        let order = Order {
            id: order_id,
            user_id,
            status: OrderStatus::Pending,
            total_cents,
            created_at: now,
            updated_at: now,
        };
        let items: Vec<OrderItem> = priced
            .into_iter()
            .map(|(product_id, quantity, unit_price_cents)| OrderItem {
                id: Uuid::now_v7(),
                order_id,
                product_id,
                quantity,
                unit_price_cents,
            })
            .collect();
        let payment = Payment {
            id: Uuid::now_v7(),
            order_id,
            status: PaymentStatus::Pending,
            amount_cents: total_cents,
            gateway_ref: None,
            created_at: now,
        };

        store.orders.insert(order_id, order.clone());
        store.items.insert(order_id, items.clone());
        store.payments.insert(order_id, payment.clone());

        tracing::info!(order_id = %order_id, user_id = %user_id, total_cents, "Created order");
        Ok(OrderDetail {
            order,
            items,
            payment,
        })
    }

    async fn get(&self, id: Uuid) -> OrderResult<Option<OrderDetail>> {
        let store = self.inner.read().await;
        Ok(store.detail(id))
    }

    async fn list(&self, descriptor: &QueryDescriptor) -> OrderResult<(Vec<Order>, u64)> {
        let store = self.inner.read().await;
        let records = store
            .orders
            .values()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| OrderError::Internal(e.to_string()))?;
        drop(store);

        let (page, total) = apply_descriptor(records, descriptor);
        let page = page
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Order>, _>>()
            .map_err(|e| OrderError::Internal(e.to_string()))?;
        Ok((page, total))
    }

    async fn mark_paid(&self, id: Uuid, gateway_ref: String) -> OrderResult<OrderDetail> {
        let mut store = self.inner.write().await;
        let order = store.orders.get_mut(&id).ok_or(OrderError::NotFound)?;
        if order.status != OrderStatus::Pending {
            return Err(OrderError::InvalidState {
                status: order.status,
                action: "pay",
            });
        }
        order.status = OrderStatus::Paid;
        order.updated_at = chrono::Utc::now().into();

        let payment = store.payments.get_mut(&id).ok_or(OrderError::NotFound)?;
        payment.status = PaymentStatus::Charged;
        payment.gateway_ref = Some(gateway_ref);

        store.detail(id).ok_or(OrderError::NotFound)
    }

    async fn mark_shipped(&self, id: Uuid) -> OrderResult<OrderDetail> {
        let mut store = self.inner.write().await;
        let order = store.orders.get_mut(&id).ok_or(OrderError::NotFound)?;
        if order.status != OrderStatus::Paid {
            return Err(OrderError::InvalidState {
                status: order.status,
                action: "ship",
            });
        }
        order.status = OrderStatus::Shipped;
        order.updated_at = chrono::Utc::now().into();
        store.detail(id).ok_or(OrderError::NotFound)
    }

    async fn cancel(&self, id: Uuid) -> OrderResult<OrderDetail> {
        let mut store = self.inner.write().await;
        let order = store.orders.get(&id).ok_or(OrderError::NotFound)?;
        if !matches!(order.status, OrderStatus::Pending | OrderStatus::Paid) {
            return Err(OrderError::InvalidState {
                status: order.status,
                action: "cancel",
            });
        }

        let stock_lines: Vec<(Uuid, i32)> = store
            .items
            .get(&id)
            .into_iter()
            .flatten()
            .map(|item| (item.product_id, item.quantity))
            .collect();
        self.products.restore_stock(&stock_lines).await?;

        let order = store.orders.get_mut(&id).ok_or(OrderError::NotFound)?;
        order.status = OrderStatus::Canceled;
        order.updated_at = chrono::Utc::now().into();
        let payment = store.payments.get_mut(&id).ok_or(OrderError::NotFound)?;
        payment.status = PaymentStatus::Refunded;

        tracing::info!(order_id = %id, "Canceled order");
        store.detail(id).ok_or(OrderError::NotFound)
    }

    // The in-memory store has no supplier table; a supplier id nothing was
    // sold for yields an empty page.
    async fn list_sales(
        &self,
        supplier_id: Uuid,
        descriptor: &QueryDescriptor,
    ) -> OrderResult<(Vec<OrderItem>, u64)> {
        let items: Vec<OrderItem> = {
            let store = self.inner.read().await;
            store.items.values().flatten().cloned().collect()
        };

        let mut sales = Vec::new();
        for item in items {
            if let Some(product) = self.products.get_by_id(item.product_id).await? {
                if product.supplier_id == supplier_id {
                    sales.push(item);
                }
            }
        }

        let records = sales
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| OrderError::Internal(e.to_string()))?;
        let (page, total) = apply_descriptor(records, descriptor);
        let page = page
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<OrderItem>, _>>()
            .map_err(|e| OrderError::Internal(e.to_string()))?;
        Ok((page, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_catalog::models::NewProduct;
    use domain_catalog::InMemoryProductRepository;

    async fn seeded_products() -> (Arc<InMemoryProductRepository>, Uuid, Uuid) {
        let products = Arc::new(InMemoryProductRepository::new());
        let a = products
            .create(NewProduct {
                name: "Trowel".into(),
                description: String::new(),
                price_cents: 1000,
                stock: 10,
                supplier_id: Uuid::now_v7(),
                category_id: Uuid::now_v7(),
            })
            .await
            .unwrap();
        let b = products
            .create(NewProduct {
                name: "Rake".into(),
                description: String::new(),
                price_cents: 2500,
                stock: 1,
                supplier_id: Uuid::now_v7(),
                category_id: Uuid::now_v7(),
            })
            .await
            .unwrap();
        (products, a.id, b.id)
    }

    #[tokio::test]
    async fn create_computes_total_and_decrements_stock() {
        let (products, a, b) = seeded_products().await;
        let repo = InMemoryOrderRepository::new(products.clone());

        let detail = repo
            .create(
                Uuid::now_v7(),
                vec![
                    NewOrderLine {
                        product_id: a,
                        quantity: 2,
                    },
                    NewOrderLine {
                        product_id: b,
                        quantity: 1,
                    },
                ],
            )
            .await
            .unwrap();

        assert_eq!(detail.order.total_cents, 2 * 1000 + 2500);
        assert_eq!(detail.order.status, OrderStatus::Pending);
        assert_eq!(detail.payment.status, PaymentStatus::Pending);
        assert_eq!(detail.payment.amount_cents, detail.order.total_cents);
        assert_eq!(products.get_by_id(a).await.unwrap().unwrap().stock, 8);
        assert_eq!(products.get_by_id(b).await.unwrap().unwrap().stock, 0);
    }

    #[tokio::test]
    async fn create_with_insufficient_stock_changes_nothing() {
        let (products, a, b) = seeded_products().await;
        let repo = InMemoryOrderRepository::new(products.clone());

        let result = repo
            .create(
                Uuid::now_v7(),
                vec![
                    NewOrderLine {
                        product_id: a,
                        quantity: 2,
                    },
                    NewOrderLine {
                        product_id: b,
                        quantity: 5,
                    },
                ],
            )
            .await;
        assert!(matches!(
            result,
            Err(OrderError::Catalog(
                domain_catalog::CatalogError::InsufficientStock { .. }
            ))
        ));

        // Neither stock nor the order store moved.
        assert_eq!(products.get_by_id(a).await.unwrap().unwrap().stock, 10);
        assert_eq!(products.get_by_id(b).await.unwrap().unwrap().stock, 1);
        let (orders, total) = repo.list(&QueryDescriptor::default()).await.unwrap();
        assert!(orders.is_empty());
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn cancel_restores_stock_and_refunds() {
        let (products, a, _) = seeded_products().await;
        let repo = InMemoryOrderRepository::new(products.clone());

        let detail = repo
            .create(
                Uuid::now_v7(),
                vec![NewOrderLine {
                    product_id: a,
                    quantity: 4,
                }],
            )
            .await
            .unwrap();
        assert_eq!(products.get_by_id(a).await.unwrap().unwrap().stock, 6);

        let canceled = repo.cancel(detail.order.id).await.unwrap();
        assert_eq!(canceled.order.status, OrderStatus::Canceled);
        assert_eq!(canceled.payment.status, PaymentStatus::Refunded);
        assert_eq!(products.get_by_id(a).await.unwrap().unwrap().stock, 10);
    }

    #[tokio::test]
    async fn sales_are_scoped_to_one_supplier() {
        let products = Arc::new(InMemoryProductRepository::new());
        let supplier = Uuid::now_v7();
        let other_supplier = Uuid::now_v7();
        let mine = products
            .create(NewProduct {
                name: "Trowel".into(),
                description: String::new(),
                price_cents: 1000,
                stock: 10,
                supplier_id: supplier,
                category_id: Uuid::now_v7(),
            })
            .await
            .unwrap();
        let theirs = products
            .create(NewProduct {
                name: "Rake".into(),
                description: String::new(),
                price_cents: 2500,
                stock: 10,
                supplier_id: other_supplier,
                category_id: Uuid::now_v7(),
            })
            .await
            .unwrap();
        let repo = InMemoryOrderRepository::new(products);

        repo.create(
            Uuid::now_v7(),
            vec![
                NewOrderLine {
                    product_id: mine.id,
                    quantity: 3,
                },
                NewOrderLine {
                    product_id: theirs.id,
                    quantity: 1,
                },
            ],
        )
        .await
        .unwrap();

        let (sales, total) = repo
            .list_sales(supplier, &QueryDescriptor::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(sales[0].product_id, mine.id);
        assert_eq!(sales[0].quantity, 3);

        let (none, total) = repo
            .list_sales(Uuid::now_v7(), &QueryDescriptor::default())
            .await
            .unwrap();
        assert!(none.is_empty());
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn shipped_orders_cannot_be_canceled() {
        let (products, a, _) = seeded_products().await;
        let repo = InMemoryOrderRepository::new(products);

        let detail = repo
            .create(
                Uuid::now_v7(),
                vec![NewOrderLine {
                    product_id: a,
                    quantity: 1,
                }],
            )
            .await
            .unwrap();
        repo.mark_paid(detail.order.id, "ref-1".into()).await.unwrap();
        repo.mark_shipped(detail.order.id).await.unwrap();

        let result = repo.cancel(detail.order.id).await;
        assert!(matches!(
            result,
            Err(OrderError::InvalidState {
                status: OrderStatus::Shipped,
                ..
            })
        ));
    }
}
