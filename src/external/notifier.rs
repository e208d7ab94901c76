use crate::entities::order_event_entity;
use crate::error::{AppError, AppResult};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

/// 将 outbox 中的订单事件推送给下游（报名确认信、课程开通等）
#[derive(Clone)]
pub struct EventNotifier {
    client: Client,
    endpoint: String,
}

impl EventNotifier {
    pub fn new(endpoint: String) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, endpoint })
    }

    pub async fn deliver(&self, event: &order_event_entity::Model) -> AppResult<()> {
        let payload: serde_json::Value = serde_json::from_str(&event.payload)?;
        let body = json!({
            "id": event.id,
            "kind": event.kind,
            "order_no": event.order_no,
            "created_at": event.created_at,
            "data": payload,
        });

        let response = self.client.post(&self.endpoint).json(&body).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "未知错误".to_string());
            Err(AppError::ExternalApiError(format!(
                "事件投递失败 ({status}): {error_text}"
            )))
        }
    }
}
