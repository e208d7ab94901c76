pub mod order_no;
pub mod validation;

pub use order_no::generate_order_no;
pub use validation::*;
