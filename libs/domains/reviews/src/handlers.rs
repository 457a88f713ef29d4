use axum::{
    extract::{OriginalUri, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use axum_helpers::{
    extract_ip_from_headers, extract_user_agent, AppError, AuditEvent, AuditOutcome,
    ErrorDocument, UuidPath, ValidatedJson,
};
use serde_json::json;
use std::sync::Arc;
use utoipa::OpenApi;
use uuid::Uuid;

use access_control::{RequestContext, SubjectRecord};
use query_options::{PageLinks, PageMeta, RawQuery, ResourceRegistry, ResourceTypeConfig};

use crate::models::{CreateReview, Review, UpdateReview};
use crate::repository::ReviewRepository;
use crate::service::ReviewService;

pub const REVIEWS_TAG: &str = "reviews";

/// Query-options configuration for the review resource.
pub fn resource_configs() -> Vec<ResourceTypeConfig> {
    vec![ResourceTypeConfig {
        name: "review",
        collection: "reviews",
        accessible_fields: &[
            "id",
            "user_id",
            "product_id",
            "rating",
            "comment",
            "created_at",
        ],
        required_fields: &["id", "user_id", "product_id"],
        relations: &[],
    }]
}

/// OpenAPI documentation for the reviews API
#[derive(OpenApi)]
#[openapi(
    paths(list_reviews, create_review, get_review, update_review, delete_review),
    components(schemas(Review, CreateReview, UpdateReview, ErrorDocument)),
    tags(
        (name = REVIEWS_TAG, description = "Product reviews"),
    )
)]
pub struct ApiDoc;

/// Shared state for the reviews router.
pub struct ReviewsState<R>
where
    R: ReviewRepository,
{
    pub service: ReviewService<R>,
    pub registry: Arc<ResourceRegistry>,
}

type SharedState<R> = Arc<ReviewsState<R>>;

/// Router for `/reviews`.
pub fn router<R>(state: SharedState<R>) -> Router
where
    R: ReviewRepository + 'static,
{
    Router::new()
        .route("/", get(list_reviews).post(create_review))
        .route(
            "/{id}",
            get(get_review).put(update_review).delete(delete_review),
        )
        .with_state(state)
}

/// List reviews
///
/// Public. Filter by product with `filter[product_id]=...`.
#[utoipa::path(
    get,
    path = "",
    tag = REVIEWS_TAG,
    responses(
        (status = 200, description = "Paginated review list"),
        (status = 404, description = "Page out of bounds", body = ErrorDocument),
        (status = 422, description = "Invalid Query", body = ErrorDocument),
    )
)]
async fn list_reviews<R>(
    State(state): State<SharedState<R>>,
    ctx: RequestContext,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<serde_json::Value>, AppError>
where
    R: ReviewRepository,
{
    ctx.ability.authorize(|a| a.can("read", "review"))?;

    let raw = RawQuery::parse(uri.query().unwrap_or(""));
    let descriptor = state.registry.builder("review")?.build(&raw)?;
    let (reviews, total) = state.service.list(&descriptor).await?;
    let links = PageLinks::build(uri.path(), &raw, total)?;
    Ok(Json(json!({
        "data": reviews,
        "meta": PageMeta::new(total, links),
    })))
}

/// Create a review
#[utoipa::path(
    post,
    path = "",
    tag = REVIEWS_TAG,
    request_body = CreateReview,
    responses(
        (status = 201, description = "Review created", body = Review),
        (status = 401, description = "Unauthorized", body = ErrorDocument),
        (status = 404, description = "Unknown product", body = ErrorDocument),
        (status = 422, description = "Invalid Body", body = ErrorDocument),
    )
)]
async fn create_review<R>(
    State(state): State<SharedState<R>>,
    ctx: RequestContext,
    headers: HeaderMap,
    ValidatedJson(input): ValidatedJson<CreateReview>,
) -> Result<impl IntoResponse, AppError>
where
    R: ReviewRepository,
{
    ctx.ability.authorize(|a| a.can("create", "review"))?;
    let payload = ctx.require_user()?;

    let review = state.service.create(payload.id, input).await?;

    AuditEvent::new(
        Some(payload.id.to_string()),
        "review.create",
        Some(format!("review:{}", review.id)),
        AuditOutcome::Success,
    )
    .with_ip(extract_ip_from_headers(&headers))
    .with_user_agent(extract_user_agent(&headers))
    .log();

    Ok((StatusCode::CREATED, Json(review)))
}

/// Get a review by ID
#[utoipa::path(
    get,
    path = "/{id}",
    tag = REVIEWS_TAG,
    params(("id" = Uuid, Path, description = "Review ID")),
    responses(
        (status = 200, description = "Review found", body = Review),
        (status = 404, description = "Not found", body = ErrorDocument),
    )
)]
async fn get_review<R>(
    State(state): State<SharedState<R>>,
    ctx: RequestContext,
    UuidPath(id): UuidPath,
) -> Result<Json<Review>, AppError>
where
    R: ReviewRepository,
{
    ctx.ability.authorize(|a| a.can("read", "review"))?;
    Ok(Json(state.service.get(id).await?))
}

/// Update a review
///
/// Authors may only touch their own reviews; `update:review:all` reaches
/// every record.
#[utoipa::path(
    put,
    path = "/{id}",
    tag = REVIEWS_TAG,
    params(("id" = Uuid, Path, description = "Review ID")),
    request_body = UpdateReview,
    responses(
        (status = 200, description = "Review updated", body = Review),
        (status = 403, description = "Forbidden", body = ErrorDocument),
        (status = 404, description = "Not found", body = ErrorDocument),
        (status = 422, description = "Invalid Body", body = ErrorDocument),
    )
)]
async fn update_review<R>(
    State(state): State<SharedState<R>>,
    ctx: RequestContext,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdateReview>,
) -> Result<Json<Review>, AppError>
where
    R: ReviewRepository,
{
    let review = state.service.get(id).await?;
    ctx.ability.authorize(|a| {
        a.can_record(
            "update",
            &SubjectRecord::new("review").owned_by("user_id", review.user_id),
        )
    })?;
    Ok(Json(state.service.update(id, input).await?))
}

/// Delete a review
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = REVIEWS_TAG,
    params(("id" = Uuid, Path, description = "Review ID")),
    responses(
        (status = 204, description = "Review deleted"),
        (status = 403, description = "Forbidden", body = ErrorDocument),
        (status = 404, description = "Not found", body = ErrorDocument),
    )
)]
async fn delete_review<R>(
    State(state): State<SharedState<R>>,
    ctx: RequestContext,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
) -> Result<StatusCode, AppError>
where
    R: ReviewRepository,
{
    let review = state.service.get(id).await?;
    ctx.ability.authorize(|a| {
        a.can_record(
            "delete",
            &SubjectRecord::new("review").owned_by("user_id", review.user_id),
        )
    })?;

    if !state.service.delete(id).await? {
        return Err(AppError::NotFound("Review not found".to_string()));
    }

    AuditEvent::new(
        ctx.ability.requester().map(|id| id.to_string()),
        "review.delete",
        Some(format!("review:{id}")),
        AuditOutcome::Success,
    )
    .with_ip(extract_ip_from_headers(&headers))
    .with_user_agent(extract_user_agent(&headers))
    .log();

    Ok(StatusCode::NO_CONTENT)
}
