//! Order service: business rules and the payment state machine.

use std::sync::Arc;

use uuid::Uuid;

use query_options::QueryDescriptor;

use crate::error::{OrderError, OrderResult};
use crate::gateway::PaymentGateway;
use crate::models::{CreateOrder, Order, OrderDetail, OrderItem, OrderStatus, PaymentStatus};
use crate::repository::{NewOrderLine, OrderRepository};

/// Service layer for order operations
#[derive(Clone)]
pub struct OrderService<R, G> {
    repository: Arc<R>,
    gateway: Arc<G>,
}

impl<R: OrderRepository, G: PaymentGateway> OrderService<R, G> {
    pub fn new(repository: Arc<R>, gateway: Arc<G>) -> Self {
        Self {
            repository,
            gateway,
        }
    }

    /// Place an order for the requester. Prices are snapshotted and stock is
    /// taken atomically by the repository.
    pub async fn place(&self, user_id: Uuid, input: CreateOrder) -> OrderResult<OrderDetail> {
        let lines = input
            .items
            .into_iter()
            .map(|item| NewOrderLine {
                product_id: item.product_id,
                quantity: item.quantity,
            })
            .collect();
        self.repository.create(user_id, lines).await
    }

    pub async fn get(&self, id: Uuid) -> OrderResult<OrderDetail> {
        self.repository.get(id).await?.ok_or(OrderError::NotFound)
    }

    pub async fn list(&self, descriptor: &QueryDescriptor) -> OrderResult<(Vec<Order>, u64)> {
        self.repository.list(descriptor).await
    }

    /// Charge a pending order through the gateway, then record the result.
    pub async fn pay(&self, id: Uuid) -> OrderResult<OrderDetail> {
        let detail = self.get(id).await?;
        if detail.order.status != OrderStatus::Pending {
            return Err(OrderError::InvalidState {
                status: detail.order.status,
                action: "pay",
            });
        }

        let reference = self
            .gateway
            .charge(detail.order.id, detail.payment.amount_cents)
            .await?;
        self.repository.mark_paid(id, reference).await
    }

    /// Cancel a pending or paid order. A charged payment is refunded through
    /// the gateway before anything is written, so a gateway failure leaves
    /// the order untouched.
    pub async fn cancel(&self, id: Uuid) -> OrderResult<OrderDetail> {
        let detail = self.get(id).await?;
        if !matches!(detail.order.status, OrderStatus::Pending | OrderStatus::Paid) {
            return Err(OrderError::InvalidState {
                status: detail.order.status,
                action: "cancel",
            });
        }

        if detail.payment.status == PaymentStatus::Charged {
            let reference = detail.payment.gateway_ref.as_deref().ok_or_else(|| {
                OrderError::Internal(format!("Charged payment for order {id} has no reference"))
            })?;
            self.gateway
                .refund(reference, detail.payment.amount_cents)
                .await?;
        }
        self.repository.cancel(id).await
    }

    pub async fn ship(&self, id: Uuid) -> OrderResult<OrderDetail> {
        self.repository.mark_shipped(id).await
    }

    /// Order lines sold by one supplier, a 404 if the supplier is unknown.
    pub async fn supplier_sales(
        &self,
        supplier_id: Uuid,
        descriptor: &QueryDescriptor,
    ) -> OrderResult<(Vec<OrderItem>, u64)> {
        self.repository.list_sales(supplier_id, descriptor).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockPaymentGateway;
    use crate::models::{OrderItem, Payment};
    use crate::repository::MockOrderRepository;
    use mockall::predicate::eq;

    fn detail(status: OrderStatus, payment_status: PaymentStatus) -> OrderDetail {
        let now: chrono::DateTime<chrono::FixedOffset> = chrono::Utc::now().into();
        let order_id = Uuid::now_v7();
        OrderDetail {
            order: Order {
                id: order_id,
                user_id: Uuid::now_v7(),
                status,
                total_cents: 3500,
                created_at: now,
                updated_at: now,
            },
            items: vec![OrderItem {
                id: Uuid::now_v7(),
                order_id,
                product_id: Uuid::now_v7(),
                quantity: 2,
                unit_price_cents: 1750,
            }],
            payment: Payment {
                id: Uuid::now_v7(),
                order_id,
                status: payment_status,
                amount_cents: 3500,
                gateway_ref: matches!(payment_status, PaymentStatus::Charged)
                    .then(|| "ch_123".to_string()),
                created_at: now,
            },
        }
    }

    #[tokio::test]
    async fn pay_charges_the_payment_amount() {
        let pending = detail(OrderStatus::Pending, PaymentStatus::Pending);
        let id = pending.order.id;
        let paid = detail(OrderStatus::Paid, PaymentStatus::Charged);

        let mut repo = MockOrderRepository::new();
        let lookup = pending.clone();
        repo.expect_get()
            .with(eq(id))
            .returning(move |_| Ok(Some(lookup.clone())));
        repo.expect_mark_paid()
            .with(eq(id), eq("ch_123".to_string()))
            .returning(move |_, _| Ok(paid.clone()));

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_charge()
            .with(eq(id), eq(3500))
            .returning(|_, _| Ok("ch_123".to_string()));

        let service = OrderService::new(Arc::new(repo), Arc::new(gateway));
        let result = service.pay(id).await.unwrap();
        assert_eq!(result.order.status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn pay_rejects_already_paid_orders_without_charging() {
        let paid = detail(OrderStatus::Paid, PaymentStatus::Charged);
        let id = paid.order.id;

        let mut repo = MockOrderRepository::new();
        repo.expect_get().returning(move |_| Ok(Some(paid.clone())));

        let mut gateway = MockPaymentGateway::new();
        gateway.expect_charge().never();

        let service = OrderService::new(Arc::new(repo), Arc::new(gateway));
        let result = service.pay(id).await;
        assert!(matches!(
            result,
            Err(OrderError::InvalidState {
                status: OrderStatus::Paid,
                action: "pay",
            })
        ));
    }

    #[tokio::test]
    async fn cancel_refunds_a_charged_payment_first() {
        let paid = detail(OrderStatus::Paid, PaymentStatus::Charged);
        let id = paid.order.id;
        let canceled = detail(OrderStatus::Canceled, PaymentStatus::Refunded);

        let mut repo = MockOrderRepository::new();
        let lookup = paid.clone();
        repo.expect_get().returning(move |_| Ok(Some(lookup.clone())));
        repo.expect_cancel()
            .with(eq(id))
            .returning(move |_| Ok(canceled.clone()));

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_refund()
            .with(eq("ch_123"), eq(3500))
            .returning(|_, _| Ok(()));

        let service = OrderService::new(Arc::new(repo), Arc::new(gateway));
        let result = service.cancel(id).await.unwrap();
        assert_eq!(result.payment.status, PaymentStatus::Refunded);
    }

    #[tokio::test]
    async fn cancel_of_pending_order_skips_the_gateway() {
        let pending = detail(OrderStatus::Pending, PaymentStatus::Pending);
        let id = pending.order.id;
        let canceled = detail(OrderStatus::Canceled, PaymentStatus::Refunded);

        let mut repo = MockOrderRepository::new();
        repo.expect_get().returning(move |_| Ok(Some(pending.clone())));
        repo.expect_cancel().returning(move |_| Ok(canceled.clone()));

        let mut gateway = MockPaymentGateway::new();
        gateway.expect_refund().never();

        let service = OrderService::new(Arc::new(repo), Arc::new(gateway));
        service.cancel(id).await.unwrap();
    }

    #[tokio::test]
    async fn cancel_aborts_when_the_refund_fails() {
        let paid = detail(OrderStatus::Paid, PaymentStatus::Charged);
        let id = paid.order.id;

        let mut repo = MockOrderRepository::new();
        repo.expect_get().returning(move |_| Ok(Some(paid.clone())));
        repo.expect_cancel().never();

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_refund()
            .returning(|_, _| Err(OrderError::Gateway("declined".to_string())));

        let service = OrderService::new(Arc::new(repo), Arc::new(gateway));
        let result = service.cancel(id).await;
        assert!(matches!(result, Err(OrderError::Gateway(_))));
    }
}
