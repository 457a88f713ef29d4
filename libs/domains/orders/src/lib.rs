//! Orders Domain
//!
//! Order placement, payments and the order state machine. Placement snapshots
//! catalog prices and takes stock atomically; payment and refund go through an
//! external gateway behind the [`gateway::PaymentGateway`] seam. Orders are
//! owned by their customer (`user_id` ownership); fulfilment requires
//! `update:order:all`.

pub mod entity;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;

// Re-export commonly used types
pub use error::{OrderError, OrderResult};
pub use gateway::{HttpPaymentGateway, PaymentGateway};
pub use models::{CreateOrder, Order, OrderDetail, OrderItem, OrderStatus, Payment, PaymentStatus};
pub use postgres::PgOrderRepository;
pub use repository::{InMemoryOrderRepository, NewOrderLine, OrderRepository};
pub use service::OrderService;
