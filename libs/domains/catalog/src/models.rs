use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub stock: i32,
    pub supplier_id: Uuid,
    pub category_id: Uuid,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

/// Product creation request; the owning supplier is derived from the
/// requester's supplier profile, not the body.
#[derive(Clone, Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProduct {
    #[validate(length(min = 1, max = 200, message = "must be 1-200 characters"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub price_cents: i64,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub stock: i32,
    pub category_id: Uuid,
}

/// Repository-level product creation payload with the resolved supplier
#[derive(Clone, Debug)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub stock: i32,
    pub supplier_id: Uuid,
    pub category_id: Uuid,
}

#[derive(Clone, Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProduct {
    #[validate(length(min = 1, max = 200, message = "must be 1-200 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub price_cents: Option<i64>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub stock: Option<i32>,
    pub category_id: Option<Uuid>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

#[derive(Clone, Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCategory {
    #[validate(length(min = 1, max = 120, message = "must be 1-120 characters"))]
    pub name: String,
    #[validate(regex(path = *SLUG_RE, message = "must be lowercase letters, digits and hyphens"))]
    pub slug: String,
}

#[derive(Clone, Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCategory {
    #[validate(length(min = 1, max = 120, message = "must be 1-120 characters"))]
    pub name: Option<String>,
    #[validate(regex(path = *SLUG_RE, message = "must be lowercase letters, digits and hyphens"))]
    pub slug: Option<String>,
}

pub static SLUG_RE: std::sync::LazyLock<regex::Regex> =
    std::sync::LazyLock::new(|| regex::Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap());

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Supplier {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub user_id: Uuid,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

#[derive(Clone, Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSupplier {
    #[validate(length(min = 1, max = 200, message = "must be 1-200 characters"))]
    pub name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
}

/// Repository-level supplier creation payload with the owning account
#[derive(Clone, Debug)]
pub struct NewSupplier {
    pub name: String,
    pub email: String,
    pub user_id: Uuid,
}

#[derive(Clone, Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateSupplier {
    #[validate(length(min = 1, max = 200, message = "must be 1-200 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "must be a valid email address"))]
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_pattern() {
        assert!(SLUG_RE.is_match("garden-tools"));
        assert!(SLUG_RE.is_match("books"));
        assert!(!SLUG_RE.is_match("Garden Tools"));
        assert!(!SLUG_RE.is_match("-leading"));
        assert!(!SLUG_RE.is_match(""));
    }

    #[test]
    fn create_product_rejects_negative_price() {
        let dto = CreateProduct {
            name: "Trowel".into(),
            description: String::new(),
            price_cents: -1,
            stock: 3,
            category_id: Uuid::now_v7(),
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn create_category_rejects_bad_slug() {
        let dto = CreateCategory {
            name: "Garden Tools".into(),
            slug: "Garden Tools".into(),
        };
        assert!(dto.validate().is_err());
    }
}
