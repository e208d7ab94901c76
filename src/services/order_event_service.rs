use crate::config::NotifierConfig;
use crate::entities::order_event_entity as outbox;
use crate::error::AppResult;
use crate::external::EventNotifier;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

/// outbox 投递：至少一次，超过重试上限后停止并保留 last_error
#[derive(Clone)]
pub struct OrderEventService {
    pool: DatabaseConnection,
    notifier: Option<EventNotifier>,
    batch_size: u64,
    max_attempts: i32,
}

impl OrderEventService {
    pub fn new(pool: DatabaseConnection, config: &NotifierConfig) -> AppResult<Self> {
        let notifier = match config.endpoint.as_deref().filter(|e| !e.is_empty()) {
            Some(endpoint) => Some(EventNotifier::new(endpoint.to_string())?),
            None => None,
        };
        Ok(Self {
            pool,
            notifier,
            batch_size: config.batch_size.max(1),
            max_attempts: config.max_attempts.max(1),
        })
    }

    pub async fn pending(&self) -> AppResult<Vec<outbox::Model>> {
        Ok(outbox::Entity::find()
            .filter(outbox::Column::DeliveredAt.is_null())
            .filter(outbox::Column::Attempts.lt(self.max_attempts))
            .order_by_asc(outbox::Column::Id)
            .limit(self.batch_size)
            .all(&self.pool)
            .await?)
    }

    /// 投递一批待发送事件，返回成功条数
    pub async fn dispatch_pending(&self) -> AppResult<usize> {
        let Some(notifier) = self.notifier.as_ref() else {
            return Ok(0);
        };

        let mut delivered = 0;
        for event in self.pending().await? {
            let attempts = event.attempts + 1;
            let result = notifier.deliver(&event).await;

            let mut am: outbox::ActiveModel = event.clone().into();
            am.attempts = Set(attempts);
            match result {
                Ok(()) => {
                    am.delivered_at = Set(Some(Utc::now()));
                    am.last_error = Set(None);
                    delivered += 1;
                }
                Err(e) => {
                    if attempts >= self.max_attempts {
                        log::error!(
                            "Order event {} ({}) gave up after {attempts} attempts: {e}",
                            event.id,
                            event.kind
                        );
                    } else {
                        log::warn!("Order event {} delivery failed: {e}", event.id);
                    }
                    am.last_error = Set(Some(e.to_string()));
                }
            }
            am.update(&self.pool).await?;
        }
        Ok(delivered)
    }
}
