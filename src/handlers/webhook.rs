use crate::services::PaymentService;
use actix_web::{HttpRequest, HttpResponse, Result, web};

pub const CHECKSUM_HEADER: &str = "X-Payment-Checksum";

/// 金流网关异步回调
///
/// 回复 `1|OK` 表示已收到；`0|RETRY`（503）请网关稍后重送。
#[utoipa::path(
    post,
    path = "/api/payment/notify",
    tag = "payment",
    params(
        ("X-Payment-Checksum" = String, Header, description = "HMAC-SHA256(hash_key, 原始 body)")
    ),
    responses(
        (status = 200, description = "1|OK"),
        (status = 503, description = "0|RETRY")
    )
)]
pub async fn payment_notify(
    req: HttpRequest,
    body: web::Bytes,
    payment_service: web::Data<PaymentService>,
) -> Result<HttpResponse> {
    let checksum = req
        .headers()
        .get(CHECKSUM_HEADER)
        .and_then(|v| v.to_str().ok());
    if checksum.is_none() {
        log::warn!("Payment notification without {CHECKSUM_HEADER} header");
    }

    let ack = payment_service.handle_notification(&body, checksum).await;

    Ok(HttpResponse::build(ack.status_code())
        .content_type("text/plain; charset=utf-8")
        .body(ack.body()))
}

pub fn webhook_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/payment").route("/notify", web::post().to(payment_notify)));
}
