use axum::{
    body::Bytes,
    extract::{OriginalUri, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use axum_helpers::{
    extract_ip_from_headers, extract_user_agent, AppError, AuditEvent, AuditOutcome,
    ErrorDocument, UuidPath,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use utoipa::OpenApi;
use uuid::Uuid;

use access_control::{RequestContext, SubjectRecord};
use query_options::{PageLinks, PageMeta, RawQuery, ResourceRegistry, ResourceTypeConfig};

use crate::models::{MediaDocument, MediaObject};
use crate::repository::MediaRepository;
use crate::service::MediaService;
use crate::store::ObjectStore;

pub const MEDIA_TAG: &str = "media";

/// Query-options configuration for the media resource.
pub fn resource_configs() -> Vec<ResourceTypeConfig> {
    vec![ResourceTypeConfig {
        name: "media",
        collection: "media",
        accessible_fields: &[
            "id",
            "owner_id",
            "object_key",
            "content_type",
            "byte_size",
            "created_at",
        ],
        required_fields: &["id", "owner_id"],
        relations: &[],
    }]
}

/// OpenAPI documentation for the media API
#[derive(OpenApi)]
#[openapi(
    paths(list_media, upload_media, get_media, delete_media),
    components(schemas(MediaObject, MediaDocument, ErrorDocument)),
    tags(
        (name = MEDIA_TAG, description = "Uploaded media objects"),
    )
)]
pub struct ApiDoc;

/// Shared state for the media router.
pub struct MediaState<R, S>
where
    R: MediaRepository,
    S: ObjectStore,
{
    pub service: MediaService<R, S>,
    pub registry: Arc<ResourceRegistry>,
}

type SharedState<R, S> = Arc<MediaState<R, S>>;

/// Router for `/media`.
pub fn router<R, S>(state: SharedState<R, S>) -> Router
where
    R: MediaRepository + 'static,
    S: ObjectStore + 'static,
{
    Router::new()
        .route("/", get(list_media).post(upload_media))
        .route("/{id}", get(get_media).delete(delete_media))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct UploadParams {
    filename: Option<String>,
}

/// List media objects
///
/// Owners see their own uploads; `read:media:all` reaches every record.
#[utoipa::path(
    get,
    path = "",
    tag = MEDIA_TAG,
    responses(
        (status = 200, description = "Paginated media list"),
        (status = 403, description = "Forbidden", body = ErrorDocument),
        (status = 404, description = "Page out of bounds", body = ErrorDocument),
        (status = 422, description = "Invalid Query", body = ErrorDocument),
    )
)]
async fn list_media<R, S>(
    State(state): State<SharedState<R, S>>,
    ctx: RequestContext,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<serde_json::Value>, AppError>
where
    R: MediaRepository,
    S: ObjectStore,
{
    ctx.ability.authorize(|a| a.can("read", "media"))?;

    let raw = RawQuery::parse(uri.query().unwrap_or(""));
    let mut descriptor = state.registry.builder("media")?.build(&raw)?;
    if !ctx.ability.can_all("read", "media") {
        let requester = ctx.require_user()?;
        descriptor
            .filter
            .push(("owner_id".to_string(), requester.id.to_string()));
    }

    let (objects, total) = state.service.list(&descriptor).await?;
    let links = PageLinks::build(uri.path(), &raw, total)?;
    Ok(Json(json!({
        "data": objects,
        "meta": PageMeta::new(total, links),
    })))
}

/// Upload a media object
///
/// The raw body is the blob; `Content-Type` decides acceptance. Types outside
/// the allow-list are rejected with 415.
#[utoipa::path(
    post,
    path = "",
    tag = MEDIA_TAG,
    params(("filename" = Option<String>, Query, description = "Original file name")),
    responses(
        (status = 201, description = "Object stored", body = MediaDocument),
        (status = 401, description = "Unauthorized", body = ErrorDocument),
        (status = 403, description = "Forbidden", body = ErrorDocument),
        (status = 415, description = "Unsupported media type", body = ErrorDocument),
    )
)]
async fn upload_media<R, S>(
    State(state): State<SharedState<R, S>>,
    ctx: RequestContext,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError>
where
    R: MediaRepository,
    S: ObjectStore,
{
    ctx.ability.authorize(|a| a.can("create", "media"))?;
    let payload = ctx.require_user()?;

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
        .ok_or_else(|| AppError::UnsupportedMediaType("missing Content-Type".to_string()))?;
    let file_name = params.filename.unwrap_or_else(|| "upload".to_string());

    let document = state
        .service
        .upload(payload.id, &file_name, &content_type, body.to_vec())
        .await?;

    AuditEvent::new(
        Some(payload.id.to_string()),
        "media.upload",
        Some(format!("media:{}", document.object.id)),
        AuditOutcome::Success,
    )
    .with_ip(extract_ip_from_headers(&headers))
    .with_user_agent(extract_user_agent(&headers))
    .log();

    Ok((StatusCode::CREATED, Json(document)))
}

/// Get a media object by ID
#[utoipa::path(
    get,
    path = "/{id}",
    tag = MEDIA_TAG,
    params(("id" = Uuid, Path, description = "Media object ID")),
    responses(
        (status = 200, description = "Media object found", body = MediaDocument),
        (status = 403, description = "Forbidden", body = ErrorDocument),
        (status = 404, description = "Not found", body = ErrorDocument),
    )
)]
async fn get_media<R, S>(
    State(state): State<SharedState<R, S>>,
    ctx: RequestContext,
    UuidPath(id): UuidPath,
) -> Result<Json<MediaDocument>, AppError>
where
    R: MediaRepository,
    S: ObjectStore,
{
    let document = state.service.get(id).await?;
    ctx.ability.authorize(|a| {
        a.can_record(
            "read",
            &SubjectRecord::new("media").owned_by("owner_id", document.object.owner_id),
        )
    })?;
    Ok(Json(document))
}

/// Delete a media object
///
/// Owners may only remove their own uploads; `delete:media:all` reaches
/// every record.
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = MEDIA_TAG,
    params(("id" = Uuid, Path, description = "Media object ID")),
    responses(
        (status = 204, description = "Media object deleted"),
        (status = 403, description = "Forbidden", body = ErrorDocument),
        (status = 404, description = "Not found", body = ErrorDocument),
    )
)]
async fn delete_media<R, S>(
    State(state): State<SharedState<R, S>>,
    ctx: RequestContext,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
) -> Result<StatusCode, AppError>
where
    R: MediaRepository,
    S: ObjectStore,
{
    let document = state.service.get(id).await?;
    ctx.ability.authorize(|a| {
        a.can_record(
            "delete",
            &SubjectRecord::new("media").owned_by("owner_id", document.object.owner_id),
        )
    })?;

    state.service.remove(id).await?;

    AuditEvent::new(
        ctx.ability.requester().map(|id| id.to_string()),
        "media.delete",
        Some(format!("media:{id}")),
        AuditOutcome::Success,
    )
    .with_ip(extract_ip_from_headers(&headers))
    .with_user_agent(extract_user_agent(&headers))
    .log();

    Ok(StatusCode::NO_CONTENT)
}
