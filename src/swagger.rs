use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{DiscountType, PaymentStatus, SubjectType};
use crate::handlers;
use crate::models::*;
use crate::services::PriceBreakdown;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::order::create_order,
        handlers::order::get_order_status,
        handlers::promo_code::validate_promo_code,
        handlers::webhook::payment_notify,
        handlers::admin::list_promo_codes,
        handlers::admin::create_promo_code,
        handlers::admin::get_promo_code,
        handlers::admin::set_promo_code_active,
        handlers::admin::list_orders,
        handlers::admin::get_order,
        handlers::admin::update_order_notes,
    ),
    components(
        schemas(
            SubjectType,
            PaymentStatus,
            DiscountType,
            PriceBreakdown,
            CreateOrderRequest,
            CreateOrderResponse,
            PaymentRedirectParams,
            OrderStatusResponse,
            OrderResponse,
            OrderQuery,
            UpdateOrderNotesRequest,
            PromoCodeResponse,
            CreatePromoCodeRequest,
            SetPromoCodeActiveRequest,
            PromoCodeQuery,
            ValidatePromoCodeRequest,
            ValidatePromoCodeResponse,
            PaginationParams,
            ApiError,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "order", description = "Order checkout API"),
        (name = "promo_code", description = "Promo code preview API"),
        (name = "payment", description = "Payment gateway notifications"),
        (name = "admin", description = "Promo code and order administration"),
        (name = "health", description = "Service health"),
    ),
    info(
        title = "Checkout Backend API",
        version = "1.0.0",
        description = "Event registration and video course checkout REST API",
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
