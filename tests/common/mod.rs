//! Shared fixtures: in-memory SQLite, seeded catalog, signed notifications.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use checkout_backend::config::GatewayConfig;
use checkout_backend::entities::{
    CourseStatus, DiscountType, EventStatus, SubjectType, event_entity, promo_code_entity,
    video_course_entity,
};
use checkout_backend::external::PaymentGateway;
use checkout_backend::models::CreateOrderRequest;
use checkout_backend::services::{OrderService, PaymentService, PromoCodeService};
use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use serde_json::json;

pub const HASH_KEY: &str = "test-hash-key";
pub const ADMIN_TOKEN: &str = "admin-test-token";

/// 单连接的内存数据库，所有查询共享同一个库
pub async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:".to_string());
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("Failed to connect to SQLite");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

/// 文件型 SQLite，多个连接，用于并发场景
pub async fn setup_file_db() -> (tempfile::TempDir, DatabaseConnection) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("checkout.db").display());
    let mut options = ConnectOptions::new(url);
    options.max_connections(4).sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("Failed to connect to SQLite");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    (dir, db)
}

pub fn gateway_config() -> GatewayConfig {
    GatewayConfig {
        merchant_id: "MS100".to_string(),
        hash_key: HASH_KEY.to_string(),
        endpoint: "https://gateway.test/mpg".to_string(),
        notify_url: "https://shop.test/api/payment/notify".to_string(),
        return_url: "https://shop.test/payment/result".to_string(),
        version: "2.0".to_string(),
    }
}

#[derive(Clone)]
pub struct Services {
    pub db: DatabaseConnection,
    pub promo_codes: PromoCodeService,
    pub orders: OrderService,
    pub payments: PaymentService,
}

pub fn services(db: &DatabaseConnection) -> Services {
    let promo_codes = PromoCodeService::new(db.clone());
    let orders = OrderService::new(db.clone(), promo_codes.clone());
    let payments = PaymentService::new(orders.clone(), PaymentGateway::new(gateway_config()));
    Services {
        db: db.clone(),
        promo_codes,
        orders,
        payments,
    }
}

pub async fn seed_event(db: &DatabaseConnection, price: i64) -> event_entity::Model {
    let now = Utc::now();
    event_entity::ActiveModel {
        title: Set("Rust Meetup".to_string()),
        price: Set(price),
        status: Set(EventStatus::Published),
        registration_enabled: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn seed_course(db: &DatabaseConnection, price: i64) -> video_course_entity::Model {
    let now = Utc::now();
    video_course_entity::ActiveModel {
        title: Set("Async Rust in Depth".to_string()),
        price: Set(price),
        status: Set(CourseStatus::Published),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn seed_promo(
    db: &DatabaseConnection,
    code: &str,
    discount_type: DiscountType,
    discount_value: i64,
    max_uses: Option<i32>,
    event_id: Option<i32>,
) -> promo_code_entity::Model {
    let now = Utc::now();
    promo_code_entity::ActiveModel {
        code: Set(code.to_string()),
        description: Set(None),
        discount_type: Set(discount_type),
        discount_value: Set(discount_value),
        min_amount: Set(0),
        max_uses: Set(max_uses),
        used_count: Set(0),
        event_id: Set(event_id),
        valid_from: Set(None),
        valid_until: Set(None),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub fn order_request(
    subject_type: SubjectType,
    subject_id: i32,
    promo_code: Option<&str>,
) -> CreateOrderRequest {
    CreateOrderRequest {
        subject_type,
        subject_id,
        name: "Chen Yi".to_string(),
        email: "chen@example.com".to_string(),
        phone: "0912-345-678".to_string(),
        company: Some("Acme".to_string()),
        job_title: None,
        promo_code: promo_code.map(str::to_string),
        need_invoice: false,
        tax_id: None,
        invoice_title: None,
    }
}

pub fn notification(trade_no: &str, order_no: Option<&str>, amount: i64, status: &str) -> Vec<u8> {
    let mut body = json!({
        "trade_no": trade_no,
        "amount": amount,
        "status": status,
        "payment_method": "CREDIT",
    });
    if let Some(order_no) = order_no {
        body["order_no"] = json!(order_no);
    }
    serde_json::to_vec(&body).unwrap()
}

pub fn sign(body: &[u8]) -> String {
    PaymentGateway::new(gateway_config()).sign(body).unwrap()
}
