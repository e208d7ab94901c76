pub mod common;
pub mod order;
pub mod pagination;
pub mod payment;
pub mod promo_code;

pub use common::*;
pub use order::*;
pub use pagination::*;
pub use payment::*;
pub use promo_code::*;
