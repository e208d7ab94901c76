use crate::database::DbPool;
use actix_web::{HttpResponse, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "服务正常"),
        (status = 503, description = "数据库不可用")
    )
)]
pub async fn health(pool: web::Data<DbPool>) -> Result<HttpResponse> {
    match pool.ping().await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": { "status": "ok" }
        }))),
        Err(e) => {
            log::error!("Health check failed: {e}");
            Ok(HttpResponse::ServiceUnavailable().json(json!({
                "success": false,
                "data": { "status": "database unavailable" }
            })))
        }
    }
}

pub fn health_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health));
}
