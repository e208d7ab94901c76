use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter

use checkout_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    external::PaymentGateway,
    handlers,
    middlewares::{AdminAuth, create_cors},
    services::*,
    swagger::swagger_config,
    tasks,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config = Config::from_toml().expect("Failed to load configuration file");

    // 创建数据库连接池
    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    // 运行数据库迁移
    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    if config.admin.api_token.is_empty() {
        log::warn!("admin.api_token is empty, admin endpoints are disabled");
    }

    // 创建服务
    let gateway = PaymentGateway::new(config.gateway.clone());
    let promo_code_service = PromoCodeService::new(pool.clone());
    let order_service = OrderService::new(pool.clone(), promo_code_service.clone());
    let payment_service = PaymentService::new(order_service.clone(), gateway);
    let order_event_service = OrderEventService::new(pool.clone(), &config.notifier)
        .expect("Failed to create order event notifier");

    // 后台投递订单事件
    tasks::spawn_all(order_event_service, config.notifier.interval_secs);

    // 启动HTTP服务器
    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    let allowed_origins = config.server.allowed_origins.clone();
    let admin_token = config.admin.api_token.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(AdminAuth::new(&admin_token))
            .wrap(create_cors(&allowed_origins))
            .wrap(Logger::default())
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(promo_code_service.clone()))
            .app_data(web::Data::new(order_service.clone()))
            .app_data(web::Data::new(payment_service.clone()))
            .configure(swagger_config)
            .configure(handlers::api_config)
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
