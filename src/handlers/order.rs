use crate::error::AppResult;
use crate::models::*;
use crate::services::{OrderService, PaymentService};
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/api/v1/orders",
    tag = "order",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "订单已建立", body = CreateOrderResponse),
        (status = 400, description = "参数或优惠码无效"),
        (status = 404, description = "活动或课程不存在"),
        (status = 409, description = "优惠码已达使用上限")
    )
)]
pub async fn create_order(
    order_service: web::Data<OrderService>,
    payment_service: web::Data<PaymentService>,
    req: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse> {
    let result: AppResult<CreateOrderResponse> = async {
        let placed = order_service.create_order(req.into_inner()).await?;
        payment_service.begin_payment(placed).await
    }
    .await;

    match result {
        Ok(response) => Ok(HttpResponse::Created().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{order_no}",
    tag = "order",
    params(
        ("order_no" = String, Path, description = "订单编号")
    ),
    responses(
        (status = 200, description = "订单状态", body = OrderStatusResponse),
        (status = 404, description = "订单不存在")
    )
)]
pub async fn get_order_status(
    order_service: web::Data<OrderService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match order_service.get_status(&path.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn order_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/orders")
            .route("", web::post().to(create_order))
            .route("/{order_no}", web::get().to(get_order_status)),
    );
}
