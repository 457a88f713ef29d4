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
use query_options::{
    PageLinks, PageMeta, RawQuery, RelationConfig, ResourceRegistry, ResourceTypeConfig,
};

use crate::models::{
    AuthResponse, CreateRole, CreateUser, LoginRequest, Permission, Role, RoleWithPermissions,
    UpdateRole, UpdateUser, User,
};
use crate::repository::{RoleRepository, UserRepository};
use crate::service::UserService;

pub const USERS_TAG: &str = "users";
pub const AUTH_TAG: &str = "auth";
pub const ROLES_TAG: &str = "roles";

/// Query-options configuration for the resource types this domain owns.
pub fn resource_configs() -> Vec<ResourceTypeConfig> {
    vec![
        ResourceTypeConfig {
            name: "user",
            collection: "users",
            accessible_fields: &[
                "id",
                "email",
                "name",
                "role_id",
                "supplier_id",
                "created_at",
                "updated_at",
            ],
            required_fields: &["id", "role_id"],
            relations: &[
                RelationConfig {
                    name: "role",
                    target: "roles",
                },
                RelationConfig {
                    name: "supplier",
                    target: "suppliers",
                },
            ],
        },
        ResourceTypeConfig {
            name: "role",
            collection: "roles",
            accessible_fields: &["id", "name"],
            required_fields: &["id"],
            relations: &[],
        },
    ]
}

/// OpenAPI documentation for the accounts API
#[derive(OpenApi)]
#[openapi(
    paths(
        signup,
        login,
        me,
        list_users,
        get_user,
        update_user,
        delete_user,
        list_roles,
        create_role,
        get_role,
        update_role,
        delete_role,
        list_permissions,
    ),
    components(schemas(
        User,
        CreateUser,
        UpdateUser,
        LoginRequest,
        AuthResponse,
        Role,
        CreateRole,
        UpdateRole,
        Permission,
        RoleWithPermissions,
        ErrorDocument,
    )),
    tags(
        (name = AUTH_TAG, description = "Signup, login and session introspection"),
        (name = USERS_TAG, description = "User account management"),
        (name = ROLES_TAG, description = "Role and permission administration"),
    )
)]
pub struct ApiDoc;

/// Shared state for the users routers.
pub struct UsersState<U: UserRepository, R: RoleRepository> {
    pub service: UserService<U, R>,
    pub registry: Arc<ResourceRegistry>,
}

/// Router for `/auth`: public signup and login, `GET /me` for the session.
pub fn auth_router<U, R>(state: Arc<UsersState<U, R>>) -> Router
where
    U: UserRepository + 'static,
    R: RoleRepository + 'static,
{
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/me", get(me))
        .with_state(state)
}

/// Router for `/users`.
pub fn router<U, R>(state: Arc<UsersState<U, R>>) -> Router
where
    U: UserRepository + 'static,
    R: RoleRepository + 'static,
{
    Router::new()
        .route("/", get(list_users))
        .route(
            "/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .with_state(state)
}

/// Router for `/roles` (admin surface).
pub fn roles_router<U, R>(state: Arc<UsersState<U, R>>) -> Router
where
    U: UserRepository + 'static,
    R: RoleRepository + 'static,
{
    Router::new()
        .route("/", get(list_roles).post(create_role))
        .route(
            "/{id}",
            get(get_role).put(update_role).delete(delete_role),
        )
        .route("/permissions", get(list_permissions))
        .with_state(state)
}

/// Register a new account and log it in
#[utoipa::path(
    post,
    path = "/auth/signup",
    tag = AUTH_TAG,
    request_body = CreateUser,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 422, description = "Invalid Body", body = ErrorDocument),
    )
)]
async fn signup<U: UserRepository, R: RoleRepository>(
    State(state): State<Arc<UsersState<U, R>>>,
    ctx: RequestContext,
    headers: HeaderMap,
    ValidatedJson(input): ValidatedJson<CreateUser>,
) -> Result<impl IntoResponse, AppError> {
    ctx.ability.authorize(|a| a.can("create", "user"))?;
    let response = state.service.signup(input).await?;

    AuditEvent::new(
        Some(response.user.id.to_string()),
        "user.signup",
        Some(format!("user:{}", response.user.id)),
        AuditOutcome::Success,
    )
    .with_ip(extract_ip_from_headers(&headers))
    .with_user_agent(extract_user_agent(&headers))
    .log();

    Ok((StatusCode::CREATED, Json(response)))
}

/// Exchange credentials for an access token
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = AUTH_TAG,
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = AuthResponse),
        (status = 401, description = "Unauthorized", body = ErrorDocument),
        (status = 422, description = "Invalid Body", body = ErrorDocument),
    )
)]
async fn login<U: UserRepository, R: RoleRepository>(
    State(state): State<Arc<UsersState<U, R>>>,
    headers: HeaderMap,
    ValidatedJson(input): ValidatedJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = input.email.clone();
    let response = state.service.login(input).await.inspect_err(|_| {
        AuditEvent::new(None, "user.login", Some(email), AuditOutcome::Failure)
            .with_ip(extract_ip_from_headers(&headers))
            .with_user_agent(extract_user_agent(&headers))
            .log();
    })?;
    Ok(Json(response))
}

/// The authenticated user's own account
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = AUTH_TAG,
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Unauthorized", body = ErrorDocument),
    )
)]
async fn me<U: UserRepository, R: RoleRepository>(
    State(state): State<Arc<UsersState<U, R>>>,
    ctx: RequestContext,
) -> Result<Json<User>, AppError> {
    let payload = ctx.require_user()?;
    let user = state.service.get(payload.id).await?;
    Ok(Json(user))
}

/// List users
///
/// Supports `page`/`limit`, `sort`, `include=role,supplier`, `fields[user]`,
/// `fields[role]` and `filter[...]`. Requesters without the elevated
/// `read:user:all` permission only ever see their own record.
#[utoipa::path(
    get,
    path = "/users",
    tag = USERS_TAG,
    responses(
        (status = 200, description = "Paginated user list"),
        (status = 403, description = "Forbidden", body = ErrorDocument),
        (status = 404, description = "Page out of bounds", body = ErrorDocument),
        (status = 422, description = "Invalid Query", body = ErrorDocument),
    )
)]
async fn list_users<U: UserRepository, R: RoleRepository>(
    State(state): State<Arc<UsersState<U, R>>>,
    ctx: RequestContext,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<serde_json::Value>, AppError> {
    ctx.ability.authorize(|a| a.can("read", "user"))?;

    let raw = RawQuery::parse(uri.query().unwrap_or(""));
    let mut descriptor = state.registry.builder("user")?.build(&raw)?;
    if !ctx.ability.can_all("read", "user") {
        let requester = ctx.require_user()?;
        descriptor
            .filter
            .push(("id".to_string(), requester.id.to_string()));
    }

    let (data, total) = state.service.list_documents(&descriptor).await?;
    let links = PageLinks::build(uri.path(), &raw, total)?;
    Ok(Json(json!({
        "data": data,
        "meta": PageMeta::new(total, links),
    })))
}

/// Get a user by ID
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = USERS_TAG,
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = User),
        (status = 403, description = "Forbidden", body = ErrorDocument),
        (status = 404, description = "Not found", body = ErrorDocument),
        (status = 422, description = "Invalid Query", body = ErrorDocument),
    )
)]
async fn get_user<U: UserRepository, R: RoleRepository>(
    State(state): State<Arc<UsersState<U, R>>>,
    ctx: RequestContext,
    UuidPath(id): UuidPath,
) -> Result<Json<User>, AppError> {
    let user = state.service.get(id).await?;
    ctx.ability.authorize(|a| {
        a.can_record("read", &SubjectRecord::new("user").owned_by("id", user.id))
    })?;
    Ok(Json(user))
}

/// Update a user
///
/// Role and supplier assignment require the elevated `update:user:all`
/// permission; own-scope requesters may only edit their profile fields.
#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = USERS_TAG,
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 403, description = "Forbidden", body = ErrorDocument),
        (status = 404, description = "Not found", body = ErrorDocument),
        (status = 422, description = "Invalid Body", body = ErrorDocument),
    )
)]
async fn update_user<U: UserRepository, R: RoleRepository>(
    State(state): State<Arc<UsersState<U, R>>>,
    ctx: RequestContext,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdateUser>,
) -> Result<Json<User>, AppError> {
    let existing = state.service.get(id).await?;
    ctx.ability.authorize(|a| {
        a.can_record(
            "update",
            &SubjectRecord::new("user").owned_by("id", existing.id),
        )
    })?;
    if input.role_id.is_some() || input.supplier_id.is_some() {
        ctx.ability.authorize(|a| a.can_all("update", "user"))?;
    }

    let user = state.service.update(id, input).await?;

    AuditEvent::new(
        ctx.ability.requester().map(|id| id.to_string()),
        "user.update",
        Some(format!("user:{id}")),
        AuditOutcome::Success,
    )
    .with_ip(extract_ip_from_headers(&headers))
    .with_user_agent(extract_user_agent(&headers))
    .log();

    Ok(Json(user))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = USERS_TAG,
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Forbidden", body = ErrorDocument),
        (status = 404, description = "Not found", body = ErrorDocument),
    )
)]
async fn delete_user<U: UserRepository, R: RoleRepository>(
    State(state): State<Arc<UsersState<U, R>>>,
    ctx: RequestContext,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
) -> Result<StatusCode, AppError> {
    let existing = state.service.get(id).await?;
    ctx.ability.authorize(|a| {
        a.can_record(
            "delete",
            &SubjectRecord::new("user").owned_by("id", existing.id),
        )
    })?;

    if !state.service.delete(id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    AuditEvent::new(
        ctx.ability.requester().map(|id| id.to_string()),
        "user.delete",
        Some(format!("user:{id}")),
        AuditOutcome::Success,
    )
    .with_ip(extract_ip_from_headers(&headers))
    .with_user_agent(extract_user_agent(&headers))
    .log();

    Ok(StatusCode::NO_CONTENT)
}

/// List roles with their permissions
#[utoipa::path(
    get,
    path = "/roles",
    tag = ROLES_TAG,
    responses(
        (status = 200, description = "Role list", body = Vec<RoleWithPermissions>),
        (status = 403, description = "Forbidden", body = ErrorDocument),
    )
)]
async fn list_roles<U: UserRepository, R: RoleRepository>(
    State(state): State<Arc<UsersState<U, R>>>,
    ctx: RequestContext,
) -> Result<Json<Vec<RoleWithPermissions>>, AppError> {
    ctx.ability.authorize(|a| a.can("read", "role"))?;
    Ok(Json(state.service.list_roles().await?))
}

/// Create a role
#[utoipa::path(
    post,
    path = "/roles",
    tag = ROLES_TAG,
    request_body = CreateRole,
    responses(
        (status = 201, description = "Role created", body = RoleWithPermissions),
        (status = 403, description = "Forbidden", body = ErrorDocument),
        (status = 422, description = "Invalid Body", body = ErrorDocument),
    )
)]
async fn create_role<U: UserRepository, R: RoleRepository>(
    State(state): State<Arc<UsersState<U, R>>>,
    ctx: RequestContext,
    ValidatedJson(input): ValidatedJson<CreateRole>,
) -> Result<impl IntoResponse, AppError> {
    ctx.ability.authorize(|a| a.can("create", "role"))?;
    let role = state.service.create_role(input).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

/// Get a role by ID
#[utoipa::path(
    get,
    path = "/roles/{id}",
    tag = ROLES_TAG,
    params(("id" = Uuid, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Role found", body = RoleWithPermissions),
        (status = 403, description = "Forbidden", body = ErrorDocument),
        (status = 404, description = "Not found", body = ErrorDocument),
    )
)]
async fn get_role<U: UserRepository, R: RoleRepository>(
    State(state): State<Arc<UsersState<U, R>>>,
    ctx: RequestContext,
    UuidPath(id): UuidPath,
) -> Result<Json<RoleWithPermissions>, AppError> {
    ctx.ability.authorize(|a| a.can("read", "role"))?;
    Ok(Json(state.service.get_role(id).await?))
}

/// Update a role
#[utoipa::path(
    put,
    path = "/roles/{id}",
    tag = ROLES_TAG,
    params(("id" = Uuid, Path, description = "Role ID")),
    request_body = UpdateRole,
    responses(
        (status = 200, description = "Role updated", body = RoleWithPermissions),
        (status = 403, description = "Forbidden", body = ErrorDocument),
        (status = 404, description = "Not found", body = ErrorDocument),
        (status = 422, description = "Invalid Body", body = ErrorDocument),
    )
)]
async fn update_role<U: UserRepository, R: RoleRepository>(
    State(state): State<Arc<UsersState<U, R>>>,
    ctx: RequestContext,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdateRole>,
) -> Result<Json<RoleWithPermissions>, AppError> {
    ctx.ability.authorize(|a| a.can("update", "role"))?;
    Ok(Json(state.service.update_role(id, input).await?))
}

/// Delete a role
#[utoipa::path(
    delete,
    path = "/roles/{id}",
    tag = ROLES_TAG,
    params(("id" = Uuid, Path, description = "Role ID")),
    responses(
        (status = 204, description = "Role deleted"),
        (status = 403, description = "Forbidden", body = ErrorDocument),
        (status = 404, description = "Not found", body = ErrorDocument),
    )
)]
async fn delete_role<U: UserRepository, R: RoleRepository>(
    State(state): State<Arc<UsersState<U, R>>>,
    ctx: RequestContext,
    UuidPath(id): UuidPath,
) -> Result<StatusCode, AppError> {
    ctx.ability.authorize(|a| a.can("delete", "role"))?;
    if !state.service.delete_role(id).await? {
        return Err(AppError::NotFound("Role not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// List the permission catalog
#[utoipa::path(
    get,
    path = "/roles/permissions",
    tag = ROLES_TAG,
    responses(
        (status = 200, description = "Permission catalog", body = Vec<Permission>),
        (status = 403, description = "Forbidden", body = ErrorDocument),
    )
)]
async fn list_permissions<U: UserRepository, R: RoleRepository>(
    State(state): State<Arc<UsersState<U, R>>>,
    ctx: RequestContext,
) -> Result<Json<Vec<Permission>>, AppError> {
    ctx.ability.authorize(|a| a.can("read", "role"))?;
    Ok(Json(state.service.list_permissions().await?))
}
