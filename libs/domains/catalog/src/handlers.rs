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
use query_options::{
    PageLinks, PageMeta, RawQuery, RelationConfig, ResourceRegistry, ResourceTypeConfig,
};

use crate::models::{
    Category, CreateCategory, CreateProduct, CreateSupplier, Product, Supplier, UpdateCategory,
    UpdateProduct, UpdateSupplier,
};
use crate::repository::{CategoryRepository, ProductRepository, SupplierRepository};
use crate::service::CatalogService;

pub const PRODUCTS_TAG: &str = "products";
pub const CATEGORIES_TAG: &str = "categories";
pub const SUPPLIERS_TAG: &str = "suppliers";

/// Query-options configuration for the resource types this domain owns.
pub fn resource_configs() -> Vec<ResourceTypeConfig> {
    vec![
        ResourceTypeConfig {
            name: "product",
            collection: "products",
            accessible_fields: &[
                "id",
                "name",
                "description",
                "price_cents",
                "stock",
                "supplier_id",
                "category_id",
                "created_at",
                "updated_at",
            ],
            required_fields: &["id", "supplier_id", "category_id"],
            relations: &[
                RelationConfig {
                    name: "supplier",
                    target: "suppliers",
                },
                RelationConfig {
                    name: "category",
                    target: "categories",
                },
            ],
        },
        ResourceTypeConfig {
            name: "category",
            collection: "categories",
            accessible_fields: &["id", "name", "slug"],
            required_fields: &["id"],
            relations: &[],
        },
        ResourceTypeConfig {
            name: "supplier",
            collection: "suppliers",
            accessible_fields: &["id", "name", "email", "user_id", "created_at", "updated_at"],
            required_fields: &["id"],
            relations: &[],
        },
    ]
}

/// OpenAPI documentation for the catalog API
#[derive(OpenApi)]
#[openapi(
    paths(
        list_products,
        create_product,
        get_product,
        update_product,
        delete_product,
        list_categories,
        create_category,
        get_category,
        update_category,
        delete_category,
        list_suppliers,
        create_supplier,
        get_supplier,
        update_supplier,
        delete_supplier,
    ),
    components(schemas(
        Product,
        CreateProduct,
        UpdateProduct,
        Category,
        CreateCategory,
        UpdateCategory,
        Supplier,
        CreateSupplier,
        UpdateSupplier,
        ErrorDocument,
    )),
    tags(
        (name = PRODUCTS_TAG, description = "Product catalog"),
        (name = CATEGORIES_TAG, description = "Product categories"),
        (name = SUPPLIERS_TAG, description = "Supplier profiles"),
    )
)]
pub struct ApiDoc;

/// Shared state for the catalog routers.
pub struct CatalogState<P, C, S>
where
    P: ProductRepository,
    C: CategoryRepository,
    S: SupplierRepository,
{
    pub service: CatalogService<P, C, S>,
    pub registry: Arc<ResourceRegistry>,
}

type SharedState<P, C, S> = Arc<CatalogState<P, C, S>>;

/// Router for `/products`.
pub fn products_router<P, C, S>(state: SharedState<P, C, S>) -> Router
where
    P: ProductRepository + 'static,
    C: CategoryRepository + 'static,
    S: SupplierRepository + 'static,
{
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .with_state(state)
}

/// Router for `/categories`.
pub fn categories_router<P, C, S>(state: SharedState<P, C, S>) -> Router
where
    P: ProductRepository + 'static,
    C: CategoryRepository + 'static,
    S: SupplierRepository + 'static,
{
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route(
            "/{id}",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
        .with_state(state)
}

/// Router for `/suppliers`.
pub fn suppliers_router<P, C, S>(state: SharedState<P, C, S>) -> Router
where
    P: ProductRepository + 'static,
    C: CategoryRepository + 'static,
    S: SupplierRepository + 'static,
{
    Router::new()
        .route("/", get(list_suppliers).post(create_supplier))
        .route(
            "/{id}",
            get(get_supplier)
                .put(update_supplier)
                .delete(delete_supplier),
        )
        .with_state(state)
}

/// List products
///
/// Public. Supports `page`/`limit`, `sort`, `include=supplier,category`,
/// `fields[...]` and `filter[...]`.
#[utoipa::path(
    get,
    path = "/products",
    tag = PRODUCTS_TAG,
    responses(
        (status = 200, description = "Paginated product list"),
        (status = 404, description = "Page out of bounds", body = ErrorDocument),
        (status = 422, description = "Invalid Query", body = ErrorDocument),
    )
)]
async fn list_products<P, C, S>(
    State(state): State<SharedState<P, C, S>>,
    ctx: RequestContext,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<serde_json::Value>, AppError>
where
    P: ProductRepository,
    C: CategoryRepository,
    S: SupplierRepository,
{
    ctx.ability.authorize(|a| a.can("read", "product"))?;

    let raw = RawQuery::parse(uri.query().unwrap_or(""));
    let descriptor = state.registry.builder("product")?.build(&raw)?;
    let (data, total) = state.service.list_product_documents(&descriptor).await?;
    let links = PageLinks::build(uri.path(), &raw, total)?;
    Ok(Json(json!({
        "data": data,
        "meta": PageMeta::new(total, links),
    })))
}

/// Create a product
///
/// The product is owned by the requester's supplier profile.
#[utoipa::path(
    post,
    path = "/products",
    tag = PRODUCTS_TAG,
    request_body = CreateProduct,
    responses(
        (status = 201, description = "Product created", body = Product),
        (status = 401, description = "Unauthorized", body = ErrorDocument),
        (status = 403, description = "Forbidden", body = ErrorDocument),
        (status = 422, description = "Invalid Body", body = ErrorDocument),
    )
)]
async fn create_product<P, C, S>(
    State(state): State<SharedState<P, C, S>>,
    ctx: RequestContext,
    headers: HeaderMap,
    ValidatedJson(input): ValidatedJson<CreateProduct>,
) -> Result<impl IntoResponse, AppError>
where
    P: ProductRepository,
    C: CategoryRepository,
    S: SupplierRepository,
{
    ctx.ability.authorize(|a| a.can("create", "product"))?;
    let payload = ctx.require_user()?;
    let supplier = payload
        .supplier
        .as_ref()
        .ok_or_else(|| AppError::Forbidden("A supplier profile is required".to_string()))?;

    let product = state.service.create_product(supplier.id, input).await?;

    AuditEvent::new(
        Some(payload.id.to_string()),
        "product.create",
        Some(format!("product:{}", product.id)),
        AuditOutcome::Success,
    )
    .with_ip(extract_ip_from_headers(&headers))
    .with_user_agent(extract_user_agent(&headers))
    .log();

    Ok((StatusCode::CREATED, Json(product)))
}

/// Get a product by ID
#[utoipa::path(
    get,
    path = "/products/{id}",
    tag = PRODUCTS_TAG,
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product found", body = Product),
        (status = 404, description = "Not found", body = ErrorDocument),
        (status = 422, description = "Invalid Query", body = ErrorDocument),
    )
)]
async fn get_product<P, C, S>(
    State(state): State<SharedState<P, C, S>>,
    ctx: RequestContext,
    UuidPath(id): UuidPath,
) -> Result<Json<Product>, AppError>
where
    P: ProductRepository,
    C: CategoryRepository,
    S: SupplierRepository,
{
    ctx.ability.authorize(|a| a.can("read", "product"))?;
    Ok(Json(state.service.get_product(id).await?))
}

/// Update a product
///
/// Suppliers may only touch their own products; `update:product:all`
/// reaches every record.
#[utoipa::path(
    put,
    path = "/products/{id}",
    tag = PRODUCTS_TAG,
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProduct,
    responses(
        (status = 200, description = "Product updated", body = Product),
        (status = 403, description = "Forbidden", body = ErrorDocument),
        (status = 404, description = "Not found", body = ErrorDocument),
        (status = 422, description = "Invalid Body", body = ErrorDocument),
    )
)]
async fn update_product<P, C, S>(
    State(state): State<SharedState<P, C, S>>,
    ctx: RequestContext,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdateProduct>,
) -> Result<Json<Product>, AppError>
where
    P: ProductRepository,
    C: CategoryRepository,
    S: SupplierRepository,
{
    let product = state.service.get_product(id).await?;
    ctx.ability.authorize(|a| {
        a.can_record(
            "update",
            &SubjectRecord::new("product").owned_by("supplier_id", product.supplier_id),
        )
    })?;
    Ok(Json(state.service.update_product(id, input).await?))
}

/// Delete a product
#[utoipa::path(
    delete,
    path = "/products/{id}",
    tag = PRODUCTS_TAG,
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 403, description = "Forbidden", body = ErrorDocument),
        (status = 404, description = "Not found", body = ErrorDocument),
    )
)]
async fn delete_product<P, C, S>(
    State(state): State<SharedState<P, C, S>>,
    ctx: RequestContext,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
) -> Result<StatusCode, AppError>
where
    P: ProductRepository,
    C: CategoryRepository,
    S: SupplierRepository,
{
    let product = state.service.get_product(id).await?;
    ctx.ability.authorize(|a| {
        a.can_record(
            "delete",
            &SubjectRecord::new("product").owned_by("supplier_id", product.supplier_id),
        )
    })?;

    if !state.service.delete_product(id).await? {
        return Err(AppError::NotFound("Product not found".to_string()));
    }

    AuditEvent::new(
        ctx.ability.requester().map(|id| id.to_string()),
        "product.delete",
        Some(format!("product:{id}")),
        AuditOutcome::Success,
    )
    .with_ip(extract_ip_from_headers(&headers))
    .with_user_agent(extract_user_agent(&headers))
    .log();

    Ok(StatusCode::NO_CONTENT)
}

/// List categories
#[utoipa::path(
    get,
    path = "/categories",
    tag = CATEGORIES_TAG,
    responses(
        (status = 200, description = "Paginated category list"),
        (status = 404, description = "Page out of bounds", body = ErrorDocument),
        (status = 422, description = "Invalid Query", body = ErrorDocument),
    )
)]
async fn list_categories<P, C, S>(
    State(state): State<SharedState<P, C, S>>,
    ctx: RequestContext,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<serde_json::Value>, AppError>
where
    P: ProductRepository,
    C: CategoryRepository,
    S: SupplierRepository,
{
    ctx.ability.authorize(|a| a.can("read", "category"))?;

    let raw = RawQuery::parse(uri.query().unwrap_or(""));
    let descriptor = state.registry.builder("category")?.build(&raw)?;
    let (categories, total) = state.service.list_categories(&descriptor).await?;
    let links = PageLinks::build(uri.path(), &raw, total)?;
    Ok(Json(json!({
        "data": categories,
        "meta": PageMeta::new(total, links),
    })))
}

/// Create a category
#[utoipa::path(
    post,
    path = "/categories",
    tag = CATEGORIES_TAG,
    request_body = CreateCategory,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 403, description = "Forbidden", body = ErrorDocument),
        (status = 422, description = "Invalid Body", body = ErrorDocument),
    )
)]
async fn create_category<P, C, S>(
    State(state): State<SharedState<P, C, S>>,
    ctx: RequestContext,
    ValidatedJson(input): ValidatedJson<CreateCategory>,
) -> Result<impl IntoResponse, AppError>
where
    P: ProductRepository,
    C: CategoryRepository,
    S: SupplierRepository,
{
    ctx.ability.authorize(|a| a.can("create", "category"))?;
    let category = state.service.create_category(input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// Get a category by ID
#[utoipa::path(
    get,
    path = "/categories/{id}",
    tag = CATEGORIES_TAG,
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category found", body = Category),
        (status = 404, description = "Not found", body = ErrorDocument),
    )
)]
async fn get_category<P, C, S>(
    State(state): State<SharedState<P, C, S>>,
    ctx: RequestContext,
    UuidPath(id): UuidPath,
) -> Result<Json<Category>, AppError>
where
    P: ProductRepository,
    C: CategoryRepository,
    S: SupplierRepository,
{
    ctx.ability.authorize(|a| a.can("read", "category"))?;
    Ok(Json(state.service.get_category(id).await?))
}

/// Update a category
#[utoipa::path(
    put,
    path = "/categories/{id}",
    tag = CATEGORIES_TAG,
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = UpdateCategory,
    responses(
        (status = 200, description = "Category updated", body = Category),
        (status = 403, description = "Forbidden", body = ErrorDocument),
        (status = 404, description = "Not found", body = ErrorDocument),
        (status = 422, description = "Invalid Body", body = ErrorDocument),
    )
)]
async fn update_category<P, C, S>(
    State(state): State<SharedState<P, C, S>>,
    ctx: RequestContext,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdateCategory>,
) -> Result<Json<Category>, AppError>
where
    P: ProductRepository,
    C: CategoryRepository,
    S: SupplierRepository,
{
    ctx.ability.authorize(|a| a.can("update", "category"))?;
    Ok(Json(state.service.update_category(id, input).await?))
}

/// Delete a category
#[utoipa::path(
    delete,
    path = "/categories/{id}",
    tag = CATEGORIES_TAG,
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 403, description = "Forbidden", body = ErrorDocument),
        (status = 404, description = "Not found", body = ErrorDocument),
    )
)]
async fn delete_category<P, C, S>(
    State(state): State<SharedState<P, C, S>>,
    ctx: RequestContext,
    UuidPath(id): UuidPath,
) -> Result<StatusCode, AppError>
where
    P: ProductRepository,
    C: CategoryRepository,
    S: SupplierRepository,
{
    ctx.ability.authorize(|a| a.can("delete", "category"))?;
    if !state.service.delete_category(id).await? {
        return Err(AppError::NotFound("Category not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// List suppliers
#[utoipa::path(
    get,
    path = "/suppliers",
    tag = SUPPLIERS_TAG,
    responses(
        (status = 200, description = "Paginated supplier list"),
        (status = 404, description = "Page out of bounds", body = ErrorDocument),
        (status = 422, description = "Invalid Query", body = ErrorDocument),
    )
)]
async fn list_suppliers<P, C, S>(
    State(state): State<SharedState<P, C, S>>,
    ctx: RequestContext,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<serde_json::Value>, AppError>
where
    P: ProductRepository,
    C: CategoryRepository,
    S: SupplierRepository,
{
    ctx.ability.authorize(|a| a.can("read", "supplier"))?;

    let raw = RawQuery::parse(uri.query().unwrap_or(""));
    let descriptor = state.registry.builder("supplier")?.build(&raw)?;
    let (suppliers, total) = state.service.list_suppliers(&descriptor).await?;
    let links = PageLinks::build(uri.path(), &raw, total)?;
    Ok(Json(json!({
        "data": suppliers,
        "meta": PageMeta::new(total, links),
    })))
}

/// Create a supplier profile for the requesting account
#[utoipa::path(
    post,
    path = "/suppliers",
    tag = SUPPLIERS_TAG,
    request_body = CreateSupplier,
    responses(
        (status = 201, description = "Supplier created", body = Supplier),
        (status = 401, description = "Unauthorized", body = ErrorDocument),
        (status = 422, description = "Invalid Body", body = ErrorDocument),
    )
)]
async fn create_supplier<P, C, S>(
    State(state): State<SharedState<P, C, S>>,
    ctx: RequestContext,
    headers: HeaderMap,
    ValidatedJson(input): ValidatedJson<CreateSupplier>,
) -> Result<impl IntoResponse, AppError>
where
    P: ProductRepository,
    C: CategoryRepository,
    S: SupplierRepository,
{
    ctx.ability.authorize(|a| a.can("create", "supplier"))?;
    let payload = ctx.require_user()?;
    let supplier = state.service.create_supplier(payload.id, input).await?;

    AuditEvent::new(
        Some(payload.id.to_string()),
        "supplier.create",
        Some(format!("supplier:{}", supplier.id)),
        AuditOutcome::Success,
    )
    .with_ip(extract_ip_from_headers(&headers))
    .with_user_agent(extract_user_agent(&headers))
    .log();

    Ok((StatusCode::CREATED, Json(supplier)))
}

/// Get a supplier by ID
#[utoipa::path(
    get,
    path = "/suppliers/{id}",
    tag = SUPPLIERS_TAG,
    params(("id" = Uuid, Path, description = "Supplier ID")),
    responses(
        (status = 200, description = "Supplier found", body = Supplier),
        (status = 404, description = "Not found", body = ErrorDocument),
    )
)]
async fn get_supplier<P, C, S>(
    State(state): State<SharedState<P, C, S>>,
    ctx: RequestContext,
    UuidPath(id): UuidPath,
) -> Result<Json<Supplier>, AppError>
where
    P: ProductRepository,
    C: CategoryRepository,
    S: SupplierRepository,
{
    ctx.ability.authorize(|a| a.can("read", "supplier"))?;
    Ok(Json(state.service.get_supplier(id).await?))
}

/// Update a supplier
///
/// Suppliers may update their own profile; `update:supplier:all` reaches
/// every record.
#[utoipa::path(
    put,
    path = "/suppliers/{id}",
    tag = SUPPLIERS_TAG,
    params(("id" = Uuid, Path, description = "Supplier ID")),
    request_body = UpdateSupplier,
    responses(
        (status = 200, description = "Supplier updated", body = Supplier),
        (status = 403, description = "Forbidden", body = ErrorDocument),
        (status = 404, description = "Not found", body = ErrorDocument),
        (status = 422, description = "Invalid Body", body = ErrorDocument),
    )
)]
async fn update_supplier<P, C, S>(
    State(state): State<SharedState<P, C, S>>,
    ctx: RequestContext,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdateSupplier>,
) -> Result<Json<Supplier>, AppError>
where
    P: ProductRepository,
    C: CategoryRepository,
    S: SupplierRepository,
{
    let supplier = state.service.get_supplier(id).await?;
    ctx.ability.authorize(|a| {
        a.can_record(
            "update",
            &SubjectRecord::new("supplier").owned_by("id", supplier.id),
        )
    })?;
    Ok(Json(state.service.update_supplier(id, input).await?))
}

/// Delete a supplier
#[utoipa::path(
    delete,
    path = "/suppliers/{id}",
    tag = SUPPLIERS_TAG,
    params(("id" = Uuid, Path, description = "Supplier ID")),
    responses(
        (status = 204, description = "Supplier deleted"),
        (status = 403, description = "Forbidden", body = ErrorDocument),
        (status = 404, description = "Not found", body = ErrorDocument),
    )
)]
async fn delete_supplier<P, C, S>(
    State(state): State<SharedState<P, C, S>>,
    ctx: RequestContext,
    UuidPath(id): UuidPath,
) -> Result<StatusCode, AppError>
where
    P: ProductRepository,
    C: CategoryRepository,
    S: SupplierRepository,
{
    let supplier = state.service.get_supplier(id).await?;
    ctx.ability.authorize(|a| {
        a.can_record(
            "delete",
            &SubjectRecord::new("supplier").owned_by("id", supplier.id),
        )
    })?;
    if !state.service.delete_supplier(id).await? {
        return Err(AppError::NotFound("Supplier not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}
