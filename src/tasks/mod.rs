//! Background tasks.
//!
//! Call `spawn_all` once during startup.

use crate::services::OrderEventService;
use std::time::Duration;

/// Spawn the outbox dispatcher loop.
///
/// Delivery is at-least-once: an event is marked delivered only after the
/// collaborator acknowledges it, so a crash between send and mark resends it.
pub fn spawn_all(order_event_service: OrderEventService, interval_secs: u64) {
    // 订单事件投递
    tokio::spawn(async move {
        let interval = Duration::from_secs(interval_secs.max(1));
        loop {
            match order_event_service.dispatch_pending().await {
                Ok(n) if n > 0 => log::info!("Order events delivered: {n}"),
                Ok(_) => {}
                Err(e) => log::error!("Failed to dispatch order events: {e:?}"),
            }
            tokio::time::sleep(interval).await;
        }
    });
}
