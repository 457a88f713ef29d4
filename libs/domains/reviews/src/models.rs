use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Review {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<FixedOffset>,
}

/// Review creation request; the author is the authenticated requester.
#[derive(Clone, Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReview {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 5, message = "must be between 1 and 5"))]
    pub rating: i32,
    #[serde(default)]
    pub comment: String,
}

/// CreateReview plus the author, assembled server-side.
#[derive(Clone, Debug)]
pub struct NewReview {
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub rating: i32,
    pub comment: String,
}

#[derive(Clone, Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateReview {
    #[validate(range(min = 1, max = 5, message = "must be between 1 and 5"))]
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_must_be_within_range() {
        let dto = CreateReview {
            product_id: Uuid::now_v7(),
            rating: 6,
            comment: String::new(),
        };
        assert!(dto.validate().is_err());

        let dto = CreateReview { rating: 5, ..dto };
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn update_rating_is_validated_when_present() {
        let dto = UpdateReview {
            rating: Some(0),
            comment: None,
        };
        assert!(dto.validate().is_err());
        assert!(UpdateReview::default().validate().is_ok());
    }
}
