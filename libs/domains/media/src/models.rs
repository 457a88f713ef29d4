use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MediaObject {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub object_key: String,
    pub content_type: String,
    pub byte_size: i64,
    pub created_at: DateTime<FixedOffset>,
}

/// Metadata row for an uploaded object, assembled server-side.
#[derive(Clone, Debug)]
pub struct NewMediaObject {
    pub owner_id: Uuid,
    pub object_key: String,
    pub content_type: String,
    pub byte_size: i64,
}

/// Upload response: the metadata row plus a URL for the stored object.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct MediaDocument {
    #[serde(flatten)]
    pub object: MediaObject,
    pub url: String,
}
