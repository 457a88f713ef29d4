use chrono::{DateTime, FixedOffset};
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Order lifecycle: pending → paid → shipped, with cancellation possible
/// from pending or paid.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "order_status")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "shipped")]
    Shipped,
    #[sea_orm(string_value = "canceled")]
    Canceled,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "payment_status")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "charged")]
    Charged,
    #[sea_orm(string_value = "refunded")]
    Refunded,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub total_cents: i64,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price_cents: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub status: PaymentStatus,
    pub amount_cents: i64,
    pub gateway_ref: Option<String>,
    pub created_at: DateTime<FixedOffset>,
}

/// An order with its lines and payment, the shape most endpoints return
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub payment: Payment,
}

#[derive(Clone, Debug, Deserialize, Validate, ToSchema)]
pub struct OrderItemInput {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub quantity: i32,
}

/// Order creation request; the owner is the authenticated requester.
#[derive(Clone, Debug, Deserialize, Validate, ToSchema)]
pub struct CreateOrder {
    #[validate(length(min = 1, message = "must contain at least one item"))]
    #[validate(nested)]
    pub items: Vec<OrderItemInput>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_order_rejects_empty_items() {
        let dto = CreateOrder { items: vec![] };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn create_order_rejects_zero_quantity() {
        let dto = CreateOrder {
            items: vec![OrderItemInput {
                product_id: Uuid::now_v7(),
                quantity: 0,
            }],
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(OrderStatus::Canceled).unwrap(),
            serde_json::json!("canceled")
        );
        assert_eq!(
            serde_json::to_value(PaymentStatus::Charged).unwrap(),
            serde_json::json!("charged")
        );
    }
}
