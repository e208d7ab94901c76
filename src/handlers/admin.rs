use crate::models::*;
use crate::services::{OrderService, PromoCodeService};
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/api/v1/admin/promo-codes",
    tag = "admin",
    params(
        ("page" = Option<u32>, Query, description = "页码"),
        ("per_page" = Option<u32>, Query, description = "每页数量"),
        ("is_active" = Option<bool>, Query, description = "是否启用"),
        ("event_id" = Option<i32>, Query, description = "限定活动")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "优惠码列表"),
        (status = 401, description = "未授权")
    )
)]
pub async fn list_promo_codes(
    promo_service: web::Data<PromoCodeService>,
    query: web::Query<PromoCodeQuery>,
) -> Result<HttpResponse> {
    match promo_service.list(&query).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/promo-codes",
    tag = "admin",
    request_body = CreatePromoCodeRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "优惠码已建立", body = PromoCodeResponse),
        (status = 400, description = "参数无效或优惠码重复"),
        (status = 401, description = "未授权")
    )
)]
pub async fn create_promo_code(
    promo_service: web::Data<PromoCodeService>,
    req: web::Json<CreatePromoCodeRequest>,
) -> Result<HttpResponse> {
    match promo_service.create(req.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Created().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/promo-codes/{id}",
    tag = "admin",
    params(
        ("id" = i32, Path, description = "优惠码 ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "优惠码详情", body = PromoCodeResponse),
        (status = 404, description = "优惠码不存在")
    )
)]
pub async fn get_promo_code(
    promo_service: web::Data<PromoCodeService>,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    match promo_service.get(path.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/promo-codes/{id}/active",
    tag = "admin",
    params(
        ("id" = i32, Path, description = "优惠码 ID")
    ),
    request_body = SetPromoCodeActiveRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "已更新", body = PromoCodeResponse),
        (status = 404, description = "优惠码不存在")
    )
)]
pub async fn set_promo_code_active(
    promo_service: web::Data<PromoCodeService>,
    path: web::Path<i32>,
    req: web::Json<SetPromoCodeActiveRequest>,
) -> Result<HttpResponse> {
    match promo_service
        .set_active(path.into_inner(), req.is_active)
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/orders",
    tag = "admin",
    params(
        ("page" = Option<u32>, Query, description = "页码"),
        ("per_page" = Option<u32>, Query, description = "每页数量"),
        ("payment_status" = Option<String>, Query, description = "pending / paid / failed / refunded"),
        ("subject_type" = Option<String>, Query, description = "event / video_course"),
        ("email" = Option<String>, Query, description = "报名人 Email")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "订单列表"),
        (status = 401, description = "未授权")
    )
)]
pub async fn list_orders(
    order_service: web::Data<OrderService>,
    query: web::Query<OrderQuery>,
) -> Result<HttpResponse> {
    match order_service.list(&query).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/orders/{order_no}",
    tag = "admin",
    params(
        ("order_no" = String, Path, description = "订单编号")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "订单详情", body = OrderResponse),
        (status = 404, description = "订单不存在")
    )
)]
pub async fn get_order(
    order_service: web::Data<OrderService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match order_service.get(&path.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/orders/{order_no}/notes",
    tag = "admin",
    params(
        ("order_no" = String, Path, description = "订单编号")
    ),
    request_body = UpdateOrderNotesRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "备注已更新", body = OrderResponse),
        (status = 404, description = "订单不存在")
    )
)]
pub async fn update_order_notes(
    order_service: web::Data<OrderService>,
    path: web::Path<String>,
    req: web::Json<UpdateOrderNotesRequest>,
) -> Result<HttpResponse> {
    match order_service
        .update_notes(&path.into_inner(), req.into_inner().notes)
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/promo-codes", web::get().to(list_promo_codes))
            .route("/promo-codes", web::post().to(create_promo_code))
            .route("/promo-codes/{id}", web::get().to(get_promo_code))
            .route("/promo-codes/{id}/active", web::put().to(set_promo_code_active))
            .route("/orders", web::get().to(list_orders))
            .route("/orders/{order_no}", web::get().to(get_order))
            .route("/orders/{order_no}/notes", web::put().to(update_order_notes)),
    );
}
