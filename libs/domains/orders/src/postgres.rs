//! Postgres-backed order repository
//!
//! Every state transition runs in a single transaction spanning the order,
//! its payment and the catalog's stock columns. A dropped transaction rolls
//! everything back.

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use database::BaseRepository;
use domain_catalog::entity::{products, suppliers};
use domain_catalog::CatalogError;
use query_options::{QueryDescriptor, SortDirection};

use crate::entity::{order_items, orders, payments};
use crate::error::{OrderError, OrderResult};
use crate::models::{Order, OrderDetail, OrderItem, OrderStatus, PaymentStatus};
use crate::repository::{NewOrderLine, OrderRepository};

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
pub struct PgOrderRepository {
    base: BaseRepository<orders::Entity>,
}

impl PgOrderRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Take stock for one line and return the product it came from.
    ///
    /// The decrement is guarded by `stock >= quantity` so concurrent orders
    /// cannot oversell; zero affected rows means the product is missing or
    /// short on stock.
    async fn take_stock(
        txn: &DatabaseTransaction,
        product_id: Uuid,
        quantity: i32,
    ) -> OrderResult<products::Model> {
        let product = products::Entity::find_by_id(product_id)
            .one(txn)
            .await?
            .ok_or(OrderError::Catalog(CatalogError::ProductNotFound))?;

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
        if result.rows_affected == 0 {
            return Err(OrderError::Catalog(CatalogError::InsufficientStock {
                product_id,
                requested: quantity,
                available: product.stock,
            }));
        }
        Ok(product)
    }

    async fn detail_in(
        txn: &DatabaseTransaction,
        order: orders::Model,
    ) -> OrderResult<OrderDetail> {
        let items = order_items::Entity::find()
            .filter(order_items::Column::OrderId.eq(order.id))
            .all(txn)
            .await?;
        let payment = payments::Entity::find()
            .filter(payments::Column::OrderId.eq(order.id))
            .one(txn)
            .await?
            .ok_or_else(|| OrderError::Internal(format!("Order {} has no payment", order.id)))?;
        Ok(OrderDetail {
            order: order.into(),
            items: items.into_iter().map(Into::into).collect(),
            payment: payment.into(),
        })
    }

    async fn find_in(txn: &DatabaseTransaction, id: Uuid) -> OrderResult<orders::Model> {
        orders::Entity::find_by_id(id)
            .one(txn)
            .await?
            .ok_or(OrderError::NotFound)
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn create(&self, user_id: Uuid, lines: Vec<NewOrderLine>) -> OrderResult<OrderDetail> {
        let txn = self.base.db().begin().await?;
        let now: chrono::DateTime<chrono::FixedOffset> = chrono::Utc::now().into();
        let order_id = Uuid::now_v7();

        let mut total_cents: i64 = 0;
        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            let product = Self::take_stock(&txn, line.product_id, line.quantity).await?;
            total_cents += product.price_cents * i64::from(line.quantity);
            items.push(order_items::ActiveModel {
                id: Set(Uuid::now_v7()),
                order_id: Set(order_id),
                product_id: Set(line.product_id),
                quantity: Set(line.quantity),
                unit_price_cents: Set(product.price_cents),
            });
        }

        let order = orders::ActiveModel {
            id: Set(order_id),
            user_id: Set(user_id),
            status: Set(OrderStatus::Pending),
            total_cents: Set(total_cents),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        order_items::Entity::insert_many(items).exec(&txn).await?;
        payments::ActiveModel {
            id: Set(Uuid::now_v7()),
            order_id: Set(order_id),
            status: Set(PaymentStatus::Pending),
            amount_cents: Set(total_cents),
            gateway_ref: Set(None),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let detail = Self::detail_in(&txn, order).await?;
        txn.commit().await?;
        tracing::info!(order_id = %order_id, user_id = %user_id, total_cents, "Created order");
        Ok(detail)
    }

    async fn get(&self, id: Uuid) -> OrderResult<Option<OrderDetail>> {
        let txn = self.base.db().begin().await?;
        let Some(order) = orders::Entity::find_by_id(id).one(&txn).await? else {
            return Ok(None);
        };
        let detail = Self::detail_in(&txn, order).await?;
        txn.commit().await?;
        Ok(Some(detail))
    }

    async fn list(&self, descriptor: &QueryDescriptor) -> OrderResult<(Vec<Order>, u64)> {
        let mut query = orders::Entity::find();
        for (field, value) in &descriptor.filter {
            // Status is a Postgres enum, a plain string equality would not
            // typecheck against it.
            if field == "status" {
                if let Ok(status) = value.parse::<OrderStatus>() {
                    query = query.filter(orders::Column::Status.eq(status));
                }
                continue;
            }
            if let Ok(column) = field.parse::<orders::Column>() {
                query = query.filter(column.eq(filter_value(value)));
            }
        }
        let total = query.clone().count(self.base.db()).await?;
        for (field, direction) in &descriptor.order {
            if let Ok(column) = field.parse::<orders::Column>() {
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

    async fn mark_paid(&self, id: Uuid, gateway_ref: String) -> OrderResult<OrderDetail> {
        let txn = self.base.db().begin().await?;
        let order = Self::find_in(&txn, id).await?;
        if order.status != OrderStatus::Pending {
            return Err(OrderError::InvalidState {
                status: order.status,
                action: "pay",
            });
        }

        let mut active = order.into_active_model();
        active.status = Set(OrderStatus::Paid);
        active.updated_at = Set(chrono::Utc::now().into());
        let order = active.update(&txn).await?;

        payments::Entity::update_many()
            .col_expr(payments::Column::Status, Expr::value(PaymentStatus::Charged))
            .col_expr(payments::Column::GatewayRef, Expr::value(gateway_ref))
            .filter(payments::Column::OrderId.eq(id))
            .exec(&txn)
            .await?;

        let detail = Self::detail_in(&txn, order).await?;
        txn.commit().await?;
        tracing::info!(order_id = %id, "Order paid");
        Ok(detail)
    }

    async fn mark_shipped(&self, id: Uuid) -> OrderResult<OrderDetail> {
        let txn = self.base.db().begin().await?;
        let order = Self::find_in(&txn, id).await?;
        if order.status != OrderStatus::Paid {
            return Err(OrderError::InvalidState {
                status: order.status,
                action: "ship",
            });
        }

        let mut active = order.into_active_model();
        active.status = Set(OrderStatus::Shipped);
        active.updated_at = Set(chrono::Utc::now().into());
        let order = active.update(&txn).await?;

        let detail = Self::detail_in(&txn, order).await?;
        txn.commit().await?;
        tracing::info!(order_id = %id, "Order shipped");
        Ok(detail)
    }

    async fn cancel(&self, id: Uuid) -> OrderResult<OrderDetail> {
        let txn = self.base.db().begin().await?;
        let order = Self::find_in(&txn, id).await?;
        if !matches!(order.status, OrderStatus::Pending | OrderStatus::Paid) {
            return Err(OrderError::InvalidState {
                status: order.status,
                action: "cancel",
            });
        }

        let items = order_items::Entity::find()
            .filter(order_items::Column::OrderId.eq(id))
            .all(&txn)
            .await?;
        for item in &items {
            products::Entity::update_many()
                .col_expr(
                    products::Column::Stock,
                    Expr::col(products::Column::Stock).add(item.quantity),
                )
                .col_expr(
                    products::Column::UpdatedAt,
                    Expr::value(chrono::Utc::now()),
                )
                .filter(products::Column::Id.eq(item.product_id))
                .exec(&txn)
                .await?;
        }

        payments::Entity::update_many()
            .col_expr(
                payments::Column::Status,
                Expr::value(PaymentStatus::Refunded),
            )
            .filter(payments::Column::OrderId.eq(id))
            .exec(&txn)
            .await?;

        let mut active = order.into_active_model();
        active.status = Set(OrderStatus::Canceled);
        active.updated_at = Set(chrono::Utc::now().into());
        let order = active.update(&txn).await?;

        let detail = Self::detail_in(&txn, order).await?;
        txn.commit().await?;
        tracing::info!(order_id = %id, "Canceled order");
        Ok(detail)
    }

    async fn list_sales(
        &self,
        supplier_id: Uuid,
        descriptor: &QueryDescriptor,
    ) -> OrderResult<(Vec<OrderItem>, u64)> {
        suppliers::Entity::find_by_id(supplier_id)
            .one(self.base.db())
            .await?
            .ok_or(OrderError::Catalog(CatalogError::SupplierNotFound))?;

        let product_ids: Vec<Uuid> = products::Entity::find()
            .filter(products::Column::SupplierId.eq(supplier_id))
            .all(self.base.db())
            .await?
            .into_iter()
            .map(|product| product.id)
            .collect();

        let mut query =
            order_items::Entity::find().filter(order_items::Column::ProductId.is_in(product_ids));
        for (field, value) in &descriptor.filter {
            if let Ok(column) = field.parse::<order_items::Column>() {
                query = query.filter(column.eq(filter_value(value)));
            }
        }
        let total = query.clone().count(self.base.db()).await?;
        for (field, direction) in &descriptor.order {
            if let Ok(column) = field.parse::<order_items::Column>() {
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
}
