use axum::{
    extract::{OriginalUri, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
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

use crate::gateway::PaymentGateway;
use crate::models::{CreateOrder, Order, OrderDetail, OrderItem, OrderItemInput, Payment};
use crate::repository::OrderRepository;
use crate::service::OrderService;

pub const ORDERS_TAG: &str = "orders";

/// Query-options configuration for the order and sale resources.
pub fn resource_configs() -> Vec<ResourceTypeConfig> {
    vec![
        ResourceTypeConfig {
            name: "order",
            collection: "orders",
            accessible_fields: &[
                "id",
                "user_id",
                "status",
                "total_cents",
                "created_at",
                "updated_at",
            ],
            required_fields: &["id", "user_id"],
            relations: &[],
        },
        ResourceTypeConfig {
            name: "sale",
            collection: "order_items",
            accessible_fields: &["id", "order_id", "product_id", "quantity", "unit_price_cents"],
            required_fields: &["id"],
            relations: &[],
        },
    ]
}

/// OpenAPI documentation for the orders API
#[derive(OpenApi)]
#[openapi(
    paths(
        list_orders,
        create_order,
        get_order,
        pay_order,
        cancel_order,
        ship_order,
        list_supplier_sales,
    ),
    components(schemas(
        Order,
        OrderItem,
        Payment,
        OrderDetail,
        OrderItemInput,
        CreateOrder,
        ErrorDocument,
    )),
    tags(
        (name = ORDERS_TAG, description = "Orders and payments"),
    )
)]
pub struct ApiDoc;

/// Shared state for the orders router.
pub struct OrdersState<R, G>
where
    R: OrderRepository,
    G: PaymentGateway,
{
    pub service: OrderService<R, G>,
    pub registry: Arc<ResourceRegistry>,
}

type SharedState<R, G> = Arc<OrdersState<R, G>>;

/// Router for `/orders`.
pub fn router<R, G>(state: SharedState<R, G>) -> Router
where
    R: OrderRepository + 'static,
    G: PaymentGateway + 'static,
{
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/{id}", get(get_order))
        .route("/{id}/pay", post(pay_order))
        .route("/{id}/cancel", post(cancel_order))
        .route("/{id}/ship", post(ship_order))
        .with_state(state)
}

/// Router for the sales listing, mounted under `/suppliers`.
pub fn sales_router<R, G>(state: SharedState<R, G>) -> Router
where
    R: OrderRepository + 'static,
    G: PaymentGateway + 'static,
{
    Router::new()
        .route("/{id}/sales", get(list_supplier_sales))
        .with_state(state)
}

/// List orders
///
/// Customers see their own orders; `read:order:all` reaches every record.
#[utoipa::path(
    get,
    path = "/orders",
    tag = ORDERS_TAG,
    responses(
        (status = 200, description = "Paginated order list"),
        (status = 403, description = "Forbidden", body = ErrorDocument),
        (status = 404, description = "Page out of bounds", body = ErrorDocument),
        (status = 422, description = "Invalid Query", body = ErrorDocument),
    )
)]
async fn list_orders<R, G>(
    State(state): State<SharedState<R, G>>,
    ctx: RequestContext,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<serde_json::Value>, AppError>
where
    R: OrderRepository,
    G: PaymentGateway,
{
    ctx.ability.authorize(|a| a.can("read", "order"))?;

    let raw = RawQuery::parse(uri.query().unwrap_or(""));
    let mut descriptor = state.registry.builder("order")?.build(&raw)?;
    if !ctx.ability.can_all("read", "order") {
        let requester = ctx.require_user()?;
        descriptor
            .filter
            .push(("user_id".to_string(), requester.id.to_string()));
    }

    let (orders, total) = state.service.list(&descriptor).await?;
    let links = PageLinks::build(uri.path(), &raw, total)?;
    Ok(Json(json!({
        "data": orders,
        "meta": PageMeta::new(total, links),
    })))
}

/// Place an order
///
/// Snapshots current prices, decrements stock and opens a pending payment,
/// all-or-nothing.
#[utoipa::path(
    post,
    path = "/orders",
    tag = ORDERS_TAG,
    request_body = CreateOrder,
    responses(
        (status = 201, description = "Order placed", body = OrderDetail),
        (status = 401, description = "Unauthorized", body = ErrorDocument),
        (status = 404, description = "Unknown product", body = ErrorDocument),
        (status = 422, description = "Invalid Body", body = ErrorDocument),
    )
)]
async fn create_order<R, G>(
    State(state): State<SharedState<R, G>>,
    ctx: RequestContext,
    headers: HeaderMap,
    ValidatedJson(input): ValidatedJson<CreateOrder>,
) -> Result<impl IntoResponse, AppError>
where
    R: OrderRepository,
    G: PaymentGateway,
{
    ctx.ability.authorize(|a| a.can("create", "order"))?;
    let payload = ctx.require_user()?;

    let detail = state.service.place(payload.id, input).await?;

    AuditEvent::new(
        Some(payload.id.to_string()),
        "order.create",
        Some(format!("order:{}", detail.order.id)),
        AuditOutcome::Success,
    )
    .with_ip(extract_ip_from_headers(&headers))
    .with_user_agent(extract_user_agent(&headers))
    .log();

    Ok((StatusCode::CREATED, Json(detail)))
}

/// Get an order with its lines and payment
#[utoipa::path(
    get,
    path = "/orders/{id}",
    tag = ORDERS_TAG,
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order found", body = OrderDetail),
        (status = 403, description = "Forbidden", body = ErrorDocument),
        (status = 404, description = "Not found", body = ErrorDocument),
    )
)]
async fn get_order<R, G>(
    State(state): State<SharedState<R, G>>,
    ctx: RequestContext,
    UuidPath(id): UuidPath,
) -> Result<Json<OrderDetail>, AppError>
where
    R: OrderRepository,
    G: PaymentGateway,
{
    let detail = state.service.get(id).await?;
    ctx.ability.authorize(|a| {
        a.can_record(
            "read",
            &SubjectRecord::new("order").owned_by("user_id", detail.order.user_id),
        )
    })?;
    Ok(Json(detail))
}

/// Pay a pending order
#[utoipa::path(
    post,
    path = "/orders/{id}/pay",
    tag = ORDERS_TAG,
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order paid", body = OrderDetail),
        (status = 403, description = "Forbidden", body = ErrorDocument),
        (status = 404, description = "Not found", body = ErrorDocument),
        (status = 419, description = "Order not pending", body = ErrorDocument),
    )
)]
async fn pay_order<R, G>(
    State(state): State<SharedState<R, G>>,
    ctx: RequestContext,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
) -> Result<Json<OrderDetail>, AppError>
where
    R: OrderRepository,
    G: PaymentGateway,
{
    let detail = state.service.get(id).await?;
    ctx.ability.authorize(|a| {
        a.can_record(
            "update",
            &SubjectRecord::new("order").owned_by("user_id", detail.order.user_id),
        )
    })?;

    let detail = state.service.pay(id).await?;

    AuditEvent::new(
        ctx.ability.requester().map(|id| id.to_string()),
        "order.pay",
        Some(format!("order:{id}")),
        AuditOutcome::Success,
    )
    .with_ip(extract_ip_from_headers(&headers))
    .with_user_agent(extract_user_agent(&headers))
    .log();

    Ok(Json(detail))
}

/// Cancel a pending or paid order
///
/// Restores stock and refunds the payment if it was charged.
#[utoipa::path(
    post,
    path = "/orders/{id}/cancel",
    tag = ORDERS_TAG,
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order canceled", body = OrderDetail),
        (status = 403, description = "Forbidden", body = ErrorDocument),
        (status = 404, description = "Not found", body = ErrorDocument),
        (status = 419, description = "Order already shipped or canceled", body = ErrorDocument),
    )
)]
async fn cancel_order<R, G>(
    State(state): State<SharedState<R, G>>,
    ctx: RequestContext,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
) -> Result<Json<OrderDetail>, AppError>
where
    R: OrderRepository,
    G: PaymentGateway,
{
    let detail = state.service.get(id).await?;
    ctx.ability.authorize(|a| {
        a.can_record(
            "update",
            &SubjectRecord::new("order").owned_by("user_id", detail.order.user_id),
        )
    })?;

    let detail = state.service.cancel(id).await?;

    AuditEvent::new(
        ctx.ability.requester().map(|id| id.to_string()),
        "order.cancel",
        Some(format!("order:{id}")),
        AuditOutcome::Success,
    )
    .with_ip(extract_ip_from_headers(&headers))
    .with_user_agent(extract_user_agent(&headers))
    .log();

    Ok(Json(detail))
}

/// Mark a paid order shipped
///
/// Fulfilment is staff-only: requires `update:order:all`.
#[utoipa::path(
    post,
    path = "/orders/{id}/ship",
    tag = ORDERS_TAG,
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order shipped", body = OrderDetail),
        (status = 403, description = "Forbidden", body = ErrorDocument),
        (status = 404, description = "Not found", body = ErrorDocument),
        (status = 419, description = "Order not paid", body = ErrorDocument),
    )
)]
async fn ship_order<R, G>(
    State(state): State<SharedState<R, G>>,
    ctx: RequestContext,
    UuidPath(id): UuidPath,
) -> Result<Json<OrderDetail>, AppError>
where
    R: OrderRepository,
    G: PaymentGateway,
{
    ctx.ability.authorize(|a| a.can_all("update", "order"))?;
    Ok(Json(state.service.ship(id).await?))
}

/// List a supplier's sales
///
/// Order lines for the supplier's products. Suppliers reach their own sales,
/// `read:sale:all` reaches every supplier's.
#[utoipa::path(
    get,
    path = "/suppliers/{id}/sales",
    tag = ORDERS_TAG,
    params(("id" = Uuid, Path, description = "Supplier ID")),
    responses(
        (status = 200, description = "Paginated sales list"),
        (status = 403, description = "Forbidden", body = ErrorDocument),
        (status = 404, description = "Supplier not found", body = ErrorDocument),
        (status = 422, description = "Invalid Query", body = ErrorDocument),
    )
)]
async fn list_supplier_sales<R, G>(
    State(state): State<SharedState<R, G>>,
    ctx: RequestContext,
    UuidPath(id): UuidPath,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<serde_json::Value>, AppError>
where
    R: OrderRepository,
    G: PaymentGateway,
{
    ctx.ability.authorize(|a| {
        a.can_all("read", "sale")
            || a.can_record("read", &SubjectRecord::new("sale").owned_by("supplier_id", id))
    })?;

    let raw = RawQuery::parse(uri.query().unwrap_or(""));
    let descriptor = state.registry.builder("sale")?.build(&raw)?;
    let (sales, total) = state.service.supplier_sales(id, &descriptor).await?;
    let links = PageLinks::build(uri.path(), &raw, total)?;
    Ok(Json(json!({
        "data": sales,
        "meta": PageMeta::new(total, links),
    })))
}
