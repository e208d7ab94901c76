pub mod order_event_service;
pub mod order_service;
pub mod payment_service;
pub mod price_calculator;
pub mod promo_code_service;

pub use order_event_service::*;
pub use order_service::*;
pub use payment_service::*;
pub use price_calculator::{PriceBreakdown, PromoLookup, calculate_price};
pub use promo_code_service::*;
