//! Outbox dispatcher bookkeeping.

mod common;

use checkout_backend::config::NotifierConfig;
use checkout_backend::entities::{SubjectType, order_event_entity};
use checkout_backend::services::OrderEventService;
use common::*;
use sea_orm::EntityTrait;

async fn paid_order_with_event(svc: &Services) {
    let event = seed_event(&svc.db, 500).await;
    let order = svc
        .orders
        .create_order(order_request(SubjectType::Event, event.id, None))
        .await
        .unwrap()
        .order;
    let body = notification("T-1", Some(order.order_no.as_str()), 500, "SUCCESS");
    svc.payments.reconcile(&body, Some(sign(&body).as_str())).await.unwrap();
}

#[tokio::test]
async fn test_without_endpoint_events_stay_in_outbox() {
    let db = setup_db().await;
    let svc = services(&db);
    paid_order_with_event(&svc).await;

    let dispatcher = OrderEventService::new(db.clone(), &NotifierConfig::default()).unwrap();
    assert_eq!(dispatcher.dispatch_pending().await.unwrap(), 0);

    let pending = dispatcher.pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].attempts, 0);
    let payload: serde_json::Value = serde_json::from_str(&pending[0].payload).unwrap();
    assert_eq!(payload["final_amount"], 500);
    assert_eq!(payload["trade_no"], "T-1");
}

#[tokio::test]
async fn test_failed_delivery_is_retried_until_limit() {
    let db = setup_db().await;
    let svc = services(&db);
    paid_order_with_event(&svc).await;

    let config = NotifierConfig {
        // 没有服务监听的端口
        endpoint: Some("http://127.0.0.1:9/order-events".to_string()),
        interval_secs: 1,
        batch_size: 10,
        max_attempts: 2,
    };
    let dispatcher = OrderEventService::new(db.clone(), &config).unwrap();

    assert_eq!(dispatcher.dispatch_pending().await.unwrap(), 0);
    assert_eq!(dispatcher.dispatch_pending().await.unwrap(), 0);

    let stored = order_event_entity::Entity::find()
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.attempts, 2);
    assert!(stored.delivered_at.is_none());
    assert!(stored.last_error.is_some());

    // 达到上限后不再尝试
    assert!(dispatcher.pending().await.unwrap().is_empty());
}
