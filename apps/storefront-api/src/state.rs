//! Application state: one shared registry, one repository stack per domain.

use std::sync::Arc;

use axum_helpers::JwtAuth;
use domain_catalog::{
    CatalogService, PgCategoryRepository, PgProductRepository, PgSupplierRepository,
    handlers::CatalogState,
};
use domain_media::{InMemoryObjectStore, MediaService, PgMediaRepository, handlers::MediaState};
use domain_orders::{HttpPaymentGateway, OrderService, PgOrderRepository, handlers::OrdersState};
use domain_reviews::{PgReviewRepository, ReviewService, handlers::ReviewsState};
use domain_users::{PgRoleRepository, PgUserRepository, UserService, handlers::UsersState};
use query_options::ResourceRegistry;
use sea_orm::DatabaseConnection;

use crate::config::Config;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub jwt: JwtAuth,
    /// Role-to-permission lookup used by the ability middleware.
    pub role_lookup: Arc<PgRoleRepository>,
    pub users: Arc<UsersState<PgUserRepository, PgRoleRepository>>,
    pub catalog: Arc<CatalogState<PgProductRepository, PgCategoryRepository, PgSupplierRepository>>,
    pub orders: Arc<OrdersState<PgOrderRepository, HttpPaymentGateway>>,
    pub reviews: Arc<ReviewsState<PgReviewRepository>>,
    pub media: Arc<MediaState<PgMediaRepository, InMemoryObjectStore>>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: &Config) -> Self {
        let jwt = JwtAuth::new(&config.jwt);

        // Every domain registers its resource types into one registry so
        // query strings are validated the same way on every collection.
        let registry = Arc::new(ResourceRegistry::new(
            domain_users::handlers::resource_configs()
                .into_iter()
                .chain(domain_catalog::handlers::resource_configs())
                .chain(domain_orders::handlers::resource_configs())
                .chain(domain_reviews::handlers::resource_configs())
                .chain(domain_media::handlers::resource_configs()),
        ));

        let users = Arc::new(UsersState {
            service: UserService::new(
                PgUserRepository::new(db.clone()),
                PgRoleRepository::new(db.clone()),
                jwt.clone(),
            ),
            registry: registry.clone(),
        });

        let catalog = Arc::new(CatalogState {
            service: CatalogService::new(
                PgProductRepository::new(db.clone()),
                PgCategoryRepository::new(db.clone()),
                PgSupplierRepository::new(db.clone()),
            ),
            registry: registry.clone(),
        });

        let orders = Arc::new(OrdersState {
            service: OrderService::new(
                Arc::new(PgOrderRepository::new(db.clone())),
                Arc::new(HttpPaymentGateway::new(config.payment_gateway_url.clone())),
            ),
            registry: registry.clone(),
        });

        let reviews = Arc::new(ReviewsState {
            service: ReviewService::new(Arc::new(PgReviewRepository::new(db.clone()))),
            registry: registry.clone(),
        });

        let media = Arc::new(MediaState {
            service: MediaService::new(
                Arc::new(PgMediaRepository::new(db.clone())),
                Arc::new(InMemoryObjectStore::new(config.media_base_url.clone())),
            ),
            registry,
        });

        Self {
            role_lookup: Arc::new(PgRoleRepository::new(db.clone())),
            db,
            jwt,
            users,
            catalog,
            orders,
            reviews,
            media,
        }
    }
}
