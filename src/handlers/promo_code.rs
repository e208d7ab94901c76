use crate::models::*;
use crate::services::OrderService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/api/v1/promo-codes/validate",
    tag = "promo_code",
    request_body = ValidatePromoCodeRequest,
    responses(
        (status = 200, description = "优惠码可用，返回试算价格", body = ValidatePromoCodeResponse),
        (status = 400, description = "优惠码无效或不适用"),
        (status = 409, description = "优惠码已达使用上限")
    )
)]
pub async fn validate_promo_code(
    order_service: web::Data<OrderService>,
    req: web::Json<ValidatePromoCodeRequest>,
) -> Result<HttpResponse> {
    match order_service.preview_price(&req).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn promo_code_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/promo-codes").route("/validate", web::post().to(validate_promo_code)),
    );
}
