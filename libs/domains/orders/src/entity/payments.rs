use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::PaymentStatus;

/// Sea-ORM Entity for the payments table
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub order_id: Uuid,
    pub status: PaymentStatus,
    pub amount_cents: i64,
    /// Reference returned by the payment gateway once charged.
    pub gateway_ref: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::orders::Entity",
        from = "Column::OrderId",
        to = "super::orders::Column::Id"
    )]
    Order,
}

impl Related<super::orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::Payment {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            status: model.status,
            amount_cents: model.amount_cents,
            gateway_ref: model.gateway_ref,
            created_at: model.created_at,
        }
    }
}
