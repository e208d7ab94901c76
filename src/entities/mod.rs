pub mod course_access_grants;
pub mod events;
pub mod order_events;
pub mod orders;
pub mod promo_codes;
pub mod video_courses;

pub use course_access_grants as course_access_grant_entity;
pub use events as event_entity;
pub use order_events as order_event_entity;
pub use orders as order_entity;
pub use promo_codes as promo_code_entity;
pub use video_courses as video_course_entity;

pub use events::EventStatus;
pub use order_events::OrderEventKind;
pub use orders::{PaymentStatus, SubjectType};
pub use promo_codes::DiscountType;
pub use video_courses::CourseStatus;
