use crate::entities::PaymentStatus;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 跳转托管付款页所需参数，前端以表单 POST 到 `gateway_url`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct PaymentRedirectParams {
    pub gateway_url: String,
    pub merchant_id: String,
    pub merchant_order_no: String,
    pub amount: i64,
    pub item_desc: String,
    pub email: String,
    pub timestamp: i64,
    pub version: String,
    pub notify_url: String,
    pub return_url: String,
    /// HMAC-SHA256(hash_key, 规范化参数串)，十六进制大写
    pub check_value: String,
}

/// 网关回调中声明的付款结果
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotifiedStatus {
    Success,
    Failed,
    Refunded,
}

impl From<NotifiedStatus> for PaymentStatus {
    fn from(status: NotifiedStatus) -> Self {
        match status {
            NotifiedStatus::Success => PaymentStatus::Paid,
            NotifiedStatus::Failed => PaymentStatus::Failed,
            NotifiedStatus::Refunded => PaymentStatus::Refunded,
        }
    }
}

/// 验签通过后的回调内容
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentNotification {
    pub trade_no: String,
    /// 退款回调可能只带交易编号
    #[serde(default)]
    pub order_no: Option<String>,
    pub amount: i64,
    pub status: NotifiedStatus,
    #[serde(default)]
    pub payment_method: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_notification() {
        let body = r#"{"trade_no":"T1","order_no":"ORD1","amount":800,"status":"SUCCESS","payment_method":"CREDIT"}"#;
        let n: PaymentNotification = serde_json::from_str(body).unwrap();
        assert_eq!(n.status, NotifiedStatus::Success);
        assert_eq!(PaymentStatus::from(n.status), PaymentStatus::Paid);
        assert_eq!(n.order_no.as_deref(), Some("ORD1"));
    }

    #[test]
    fn test_refund_notification_without_order_no() {
        let body = r#"{"trade_no":"T1","amount":800,"status":"REFUNDED"}"#;
        let n: PaymentNotification = serde_json::from_str(body).unwrap();
        assert!(n.order_no.is_none());
        assert_eq!(PaymentStatus::from(n.status), PaymentStatus::Refunded);
    }
}
