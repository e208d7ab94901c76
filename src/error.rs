use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::entities::PaymentStatus;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid promo code: {0}")]
    InvalidPromoCode(String),

    #[error("Promo code has reached its usage limit")]
    PromoCodeExhausted,

    #[error("Promo code cannot be applied to this item")]
    PromoCodeScopeMismatch,

    #[error("Invalid payment notification signature")]
    InvalidSignature,

    #[error("Amount mismatch for order {order_no}: expected {expected}, claimed {claimed}")]
    AmountMismatch {
        order_no: String,
        expected: i64,
        claimed: i64,
    },

    #[error("Invalid payment status transition {from} -> {to}")]
    InvalidTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    #[error("External API error: {0}")]
    ExternalApiError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl AppError {
    /// 是否属于暂时性错误（支付回调应让网关重试）
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            AppError::DatabaseError(_) | AppError::NotFound(_) | AppError::ReqwestError(_)
        )
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::InvalidPromoCode(_)
            | AppError::PromoCodeScopeMismatch => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PromoCodeExhausted | AppError::InvalidTransition { .. } => {
                StatusCode::CONFLICT
            }
            AppError::ExternalApiError(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let (error_code, message) = match self {
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                ("VALIDATION_ERROR", msg.clone())
            }
            AppError::AuthError(msg) => {
                log::warn!("Authentication error: {msg}");
                ("AUTH_ERROR", msg.clone())
            }
            AppError::NotFound(msg) => ("NOT_FOUND", msg.clone()),
            AppError::InvalidPromoCode(msg) => {
                log::warn!("Invalid promo code: {msg}");
                ("INVALID_PROMO_CODE", msg.clone())
            }
            AppError::PromoCodeExhausted => ("PROMO_CODE_EXHAUSTED", self.to_string()),
            AppError::PromoCodeScopeMismatch => ("PROMO_CODE_SCOPE_MISMATCH", self.to_string()),
            AppError::InvalidTransition { .. } => {
                log::error!("{self}");
                (
                    "INVALID_TRANSITION",
                    "Order cannot change to the requested status".to_string(),
                )
            }
            AppError::ExternalApiError(msg) => {
                log::error!("External API error: {msg}");
                ("EXTERNAL_API_ERROR", msg.clone())
            }
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                ("DATABASE_ERROR", "Database error".to_string())
            }
            // 签名/金额类错误不对外暴露细节
            _ => {
                log::error!("Internal error: {self}");
                ("INTERNAL_ERROR", "Internal server error".to_string())
            }
        };

        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": message
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retriable_classification() {
        assert!(AppError::NotFound("order".into()).is_retriable());
        assert!(AppError::DatabaseError(sea_orm::DbErr::Custom("down".into())).is_retriable());
        assert!(AppError::DatabaseError(sea_orm::DbErr::RecordNotUpdated).is_retriable());
        assert!(!AppError::InvalidSignature.is_retriable());
        assert!(
            !AppError::AmountMismatch {
                order_no: "ORD1".into(),
                expected: 100,
                claimed: 1,
            }
            .is_retriable()
        );
        assert!(
            !AppError::InvalidTransition {
                from: PaymentStatus::Failed,
                to: PaymentStatus::Paid,
            }
            .is_retriable()
        );
    }

    #[test]
    fn test_integrity_errors_are_not_surfaced() {
        let resp = AppError::AmountMismatch {
            order_no: "ORD1".into(),
            expected: 100,
            claimed: 1,
        }
        .error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_status_code_matches_response() {
        let cases = [
            (AppError::AuthError("missing token".into()), StatusCode::UNAUTHORIZED),
            (AppError::PromoCodeExhausted, StatusCode::CONFLICT),
            (AppError::InvalidPromoCode("expired".into()), StatusCode::BAD_REQUEST),
            (AppError::NotFound("order".into()), StatusCode::NOT_FOUND),
            (AppError::InvalidSignature, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(err.status_code(), expected);
            assert_eq!(err.error_response().status(), expected);
        }
    }
}
