//! API routes module

pub mod ability;

use axum::{Router, middleware};

use crate::state::AppState;

/// Create all API routes, with the ability middleware in front.
pub fn routes(state: &AppState) -> Router {
    let ability_state = ability::AbilityState {
        jwt: state.jwt.clone(),
        roles: state.role_lookup.clone(),
    };

    Router::new()
        .nest("/auth", domain_users::handlers::auth_router(state.users.clone()))
        .nest("/users", domain_users::handlers::router(state.users.clone()))
        .nest("/roles", domain_users::handlers::roles_router(state.users.clone()))
        .nest(
            "/products",
            domain_catalog::handlers::products_router(state.catalog.clone()),
        )
        .nest(
            "/categories",
            domain_catalog::handlers::categories_router(state.catalog.clone()),
        )
        .nest(
            "/suppliers",
            domain_catalog::handlers::suppliers_router(state.catalog.clone())
                .merge(domain_orders::handlers::sales_router(state.orders.clone())),
        )
        .nest("/orders", domain_orders::handlers::router(state.orders.clone()))
        .nest("/reviews", domain_reviews::handlers::router(state.reviews.clone()))
        .nest("/media", domain_media::handlers::router(state.media.clone()))
        .layer(middleware::from_fn_with_state(
            ability_state,
            ability::resolve_ability,
        ))
}
