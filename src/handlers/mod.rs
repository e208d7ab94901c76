pub mod admin;
pub mod health;
pub mod order;
pub mod promo_code;
pub mod webhook;

pub use admin::admin_config;
pub use health::health_config;
pub use order::order_config;
pub use promo_code::promo_code_config;
pub use webhook::webhook_config;

use actix_web::web;

/// 挂载全部 `/api` 路由
pub fn api_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .configure(health_config)
            .configure(webhook_config)
            .service(
                web::scope("/v1")
                    .configure(order_config)
                    .configure(promo_code_config)
                    .configure(admin_config),
            ),
    );
}
