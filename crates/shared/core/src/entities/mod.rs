mod fill;
mod order;
mod order_status;
mod side;

pub use fill::Fill;
pub use order::{Order, OrderId};
pub use order_status::OrderStatus;
pub use side::Side;
