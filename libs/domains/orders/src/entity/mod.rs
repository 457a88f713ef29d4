pub mod order_items;
pub mod orders;
pub mod payments;
