//! Repository tests for the orders domain
//!
//! Exercise the Postgres-backed repository against a real container. The
//! focus is the transactional state machine: placing an order takes stock,
//! canceling restores it and refunds the payment, and an invalid transition
//! leaves every row untouched.

use test_utils::{TestDatabase, TestDataBuilder};
use uuid::Uuid;

use domain_catalog::models::{NewProduct, NewSupplier};
use domain_catalog::repository::{CategoryRepository, ProductRepository, SupplierRepository};
use domain_catalog::{
    CatalogError, CreateCategory, PgCategoryRepository, PgProductRepository,
    PgSupplierRepository, Product,
};
use domain_orders::{
    NewOrderLine, OrderError, OrderRepository, OrderStatus, PaymentStatus, PgOrderRepository,
};
use domain_users::models::NewUser;
use domain_users::repository::{RoleRepository, UserRepository};
use domain_users::{PgRoleRepository, PgUserRepository, DEFAULT_ROLE};
use query_options::QueryDescriptor;

struct Seed {
    buyer_id: Uuid,
    supplier_id: Uuid,
    product: Product,
}

/// Seed the foreign-key chain an order needs: a user with the default role,
/// a supplier owned by that user, a category and one product with stock 10.
async fn seed(db: &TestDatabase, builder: &TestDataBuilder) -> Seed {
    let roles = PgRoleRepository::new(db.connection());
    let role = roles
        .get_by_name(DEFAULT_ROLE)
        .await
        .unwrap()
        .expect("default role is seeded by the migrations");

    let users = PgUserRepository::new(db.connection());
    let buyer = users
        .create(NewUser {
            email: builder.email("buyer"),
            name: "Buyer".into(),
            password_hash: "unused-in-this-test".into(),
            role_id: role.id,
            supplier_id: None,
        })
        .await
        .unwrap();

    let suppliers = PgSupplierRepository::new(db.connection());
    let supplier = suppliers
        .create(NewSupplier {
            name: builder.name("supplier", "main"),
            email: builder.email("supplier"),
            user_id: buyer.id,
        })
        .await
        .unwrap();

    let categories = PgCategoryRepository::new(db.connection());
    let category = categories
        .create(CreateCategory {
            name: builder.name("category", "main"),
            slug: builder.name("category", "main"),
        })
        .await
        .unwrap();

    let products = PgProductRepository::new(db.connection());
    let product = products
        .create(NewProduct {
            name: builder.name("product", "main"),
            description: "A sturdy test product".into(),
            price_cents: 1000,
            stock: 10,
            supplier_id: supplier.id,
            category_id: category.id,
        })
        .await
        .unwrap();

    Seed {
        buyer_id: buyer.id,
        supplier_id: supplier.id,
        product,
    }
}

async fn stock_of(db: &TestDatabase, product_id: Uuid) -> i32 {
    let products = PgProductRepository::new(db.connection());
    products
        .get_by_id(product_id)
        .await
        .unwrap()
        .expect("product exists")
        .stock
}

#[tokio::test]
async fn cancel_restores_stock_and_refunds_the_payment() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("cancel_restores");
    let seed = seed(&db, &builder).await;
    let repo = PgOrderRepository::new(db.connection());

    let detail = repo
        .create(
            seed.buyer_id,
            vec![NewOrderLine {
                product_id: seed.product.id,
                quantity: 4,
            }],
        )
        .await
        .unwrap();
    assert_eq!(stock_of(&db, seed.product.id).await, 6);
    assert_eq!(detail.payment.status, PaymentStatus::Pending);

    repo.mark_paid(detail.order.id, "ch_test_ref".into())
        .await
        .unwrap();

    let canceled = repo.cancel(detail.order.id).await.unwrap();
    assert_eq!(canceled.order.status, OrderStatus::Canceled);
    assert_eq!(canceled.payment.status, PaymentStatus::Refunded);
    assert_eq!(stock_of(&db, seed.product.id).await, 10);
}

#[tokio::test]
async fn cancel_of_shipped_order_changes_nothing() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("cancel_shipped");
    let seed = seed(&db, &builder).await;
    let repo = PgOrderRepository::new(db.connection());

    let detail = repo
        .create(
            seed.buyer_id,
            vec![NewOrderLine {
                product_id: seed.product.id,
                quantity: 2,
            }],
        )
        .await
        .unwrap();
    repo.mark_paid(detail.order.id, "ch_test_ref".into())
        .await
        .unwrap();
    repo.mark_shipped(detail.order.id).await.unwrap();

    let result = repo.cancel(detail.order.id).await;
    assert!(matches!(
        result,
        Err(OrderError::InvalidState {
            status: OrderStatus::Shipped,
            action: "cancel",
        })
    ));

    let after = repo.get(detail.order.id).await.unwrap().unwrap();
    assert_eq!(after.order.status, OrderStatus::Shipped);
    assert_eq!(after.payment.status, PaymentStatus::Charged);
    assert_eq!(stock_of(&db, seed.product.id).await, 8);
}

#[tokio::test]
async fn supplier_sales_cover_only_that_suppliers_products() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("supplier_sales");
    let seed = seed(&db, &builder).await;
    let repo = PgOrderRepository::new(db.connection());

    repo.create(
        seed.buyer_id,
        vec![NewOrderLine {
            product_id: seed.product.id,
            quantity: 3,
        }],
    )
    .await
    .unwrap();

    let (sales, total) = repo
        .list_sales(seed.supplier_id, &QueryDescriptor::default())
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(sales[0].product_id, seed.product.id);
    assert_eq!(sales[0].quantity, 3);

    let missing = repo
        .list_sales(Uuid::now_v7(), &QueryDescriptor::default())
        .await;
    assert!(matches!(
        missing,
        Err(OrderError::Catalog(CatalogError::SupplierNotFound))
    ));
}
