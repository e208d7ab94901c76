//! 付款对账
//!
//! 处理网关的异步回调：先验签，再定位订单、核对金额，最后交给
//! [`OrderService::transition_payment_status`] 做幂等状态变更。

use crate::entities::{PaymentStatus, order_entity as order};
use crate::error::{AppError, AppResult};
use crate::external::PaymentGateway;
use crate::models::*;
use crate::services::order_service::{
    OrderService, PlacedOrder, TransitionEvidence, TransitionOutcome,
};
use actix_web::http::StatusCode;
use chrono::Utc;

/// 回复网关的确认结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acknowledgement {
    /// 已收到，网关不必重送
    Accepted,
    /// 暂时无法处理，请网关稍后重送
    Retry,
}

impl Acknowledgement {
    pub fn status_code(self) -> StatusCode {
        match self {
            Acknowledgement::Accepted => StatusCode::OK,
            Acknowledgement::Retry => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn body(self) -> &'static str {
        match self {
            Acknowledgement::Accepted => "1|OK",
            Acknowledgement::Retry => "0|RETRY",
        }
    }
}

#[derive(Clone)]
pub struct PaymentService {
    orders: OrderService,
    gateway: PaymentGateway,
}

impl PaymentService {
    pub fn new(orders: OrderService, gateway: PaymentGateway) -> Self {
        Self { orders, gateway }
    }

    /// 下单后的付款安排：已结清的免费订单直接返回，否则生成付款页参数
    pub async fn begin_payment(&self, placed: PlacedOrder) -> AppResult<CreateOrderResponse> {
        let PlacedOrder { order, item_desc } = placed;

        let payment_redirect_params = if order.payment_status == PaymentStatus::Pending {
            Some(self.gateway.checkout_params(&order, &item_desc)?)
        } else {
            None
        };

        Ok(CreateOrderResponse {
            order_no: order.order_no,
            original_amount: order.original_amount,
            discount_amount: order.discount_amount,
            final_amount: order.final_amount,
            payment_status: order.payment_status,
            payment_redirect_params,
        })
    }

    /// 验签并执行对账，返回变更后的订单
    pub async fn reconcile(
        &self,
        raw_body: &[u8],
        checksum: Option<&str>,
    ) -> AppResult<(order::Model, TransitionOutcome)> {
        let checksum = checksum.ok_or(AppError::InvalidSignature)?;
        self.gateway.verify(raw_body, checksum)?;

        let notification: PaymentNotification = serde_json::from_slice(raw_body)?;

        let found = match notification.order_no.as_deref() {
            Some(order_no) => self.orders.find_by_order_no(order_no).await?,
            None => {
                self.orders
                    .find_by_gateway_trade_no(&notification.trade_no)
                    .await?
            }
        };
        // 回调可能早于订单可见，按可重试处理
        let order = found.ok_or_else(|| {
            AppError::NotFound(format!(
                "No order for notification {}",
                notification.trade_no
            ))
        })?;

        if notification.amount != order.final_amount {
            return Err(AppError::AmountMismatch {
                order_no: order.order_no,
                expected: order.final_amount,
                claimed: notification.amount,
            });
        }

        let evidence = TransitionEvidence {
            trade_no: notification.trade_no,
            payment_method: notification.payment_method,
            occurred_at: Utc::now(),
        };
        self.orders
            .transition_payment_status(&order.order_no, notification.status.into(), &evidence)
            .await
    }

    /// 处理一次回调并决定如何回复网关
    pub async fn handle_notification(
        &self,
        raw_body: &[u8],
        checksum: Option<&str>,
    ) -> Acknowledgement {
        match self.reconcile(raw_body, checksum).await {
            Ok((order, outcome)) => {
                log::info!(
                    "Payment notification for {} accepted ({outcome:?}, status {})",
                    order.order_no,
                    order.payment_status
                );
                Acknowledgement::Accepted
            }
            Err(e) if e.is_retriable() => {
                log::warn!("Payment notification deferred: {e}");
                Acknowledgement::Retry
            }
            Err(e) => {
                log::error!("Payment notification rejected: {e}");
                Acknowledgement::Accepted
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acknowledgement_wire_format() {
        assert_eq!(Acknowledgement::Accepted.body(), "1|OK");
        assert_eq!(Acknowledgement::Accepted.status_code(), StatusCode::OK);
        assert_eq!(Acknowledgement::Retry.body(), "0|RETRY");
        assert_eq!(
            Acknowledgement::Retry.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
