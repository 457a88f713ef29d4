use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sea-ORM Entity for the reviews table
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reviews")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub rating: i32,
    #[sea_orm(column_type = "Text")]
    pub comment: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::Review {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            product_id: model.product_id,
            rating: model.rating,
            comment: model.comment,
            created_at: model.created_at,
        }
    }
}

impl From<crate::models::NewReview> for ActiveModel {
    fn from(input: crate::models::NewReview) -> Self {
        use sea_orm::Set;
        Self {
            id: Set(Uuid::now_v7()),
            user_id: Set(input.user_id),
            product_id: Set(input.product_id),
            rating: Set(input.rating),
            comment: Set(input.comment),
            created_at: Set(chrono::Utc::now().into()),
        }
    }
}
