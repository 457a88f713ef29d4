use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sea-ORM Entity for the media_objects table
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "media_objects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: Uuid,
    #[sea_orm(unique)]
    pub object_key: String,
    pub content_type: String,
    pub byte_size: i64,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::MediaObject {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            owner_id: model.owner_id,
            object_key: model.object_key,
            content_type: model.content_type,
            byte_size: model.byte_size,
            created_at: model.created_at,
        }
    }
}

impl From<crate::models::NewMediaObject> for ActiveModel {
    fn from(input: crate::models::NewMediaObject) -> Self {
        use sea_orm::Set;
        Self {
            id: Set(Uuid::now_v7()),
            owner_id: Set(input.owner_id),
            object_key: Set(input.object_key),
            content_type: Set(input.content_type),
            byte_size: Set(input.byte_size),
            created_at: Set(chrono::Utc::now().into()),
        }
    }
}
