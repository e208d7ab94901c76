//! 订单金额计算（纯函数，不读写数据库）
//!
//! 优惠码的使用次数由 [`crate::services::PromoCodeService`] 负责扣减，
//! 这里只根据传入的优惠码快照计算折扣。

use crate::entities::{DiscountType, promo_code_entity as promo};
use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 优惠码查询结果
#[derive(Debug, Clone, Copy)]
pub enum PromoLookup<'a> {
    /// 未填写优惠码
    NotApplied,
    /// 填写了优惠码但不存在
    NotFound,
    Found(&'a promo::Model),
}

impl<'a> From<Option<&'a promo::Model>> for PromoLookup<'a> {
    fn from(found: Option<&'a promo::Model>) -> Self {
        match found {
            Some(code) => PromoLookup::Found(code),
            None => PromoLookup::NotFound,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PriceBreakdown {
    pub original_amount: i64,
    pub discount_amount: i64,
    pub final_amount: i64,
}

/// 计算折扣与应付金额
///
/// - 百分比：`floor(base * value / 100)`，value 超过 100 按 100 计
/// - 固定金额：`min(value, base)`
/// - 应付金额 = 原价 - 折扣，永远不小于 0
pub fn calculate_price(
    base_price: i64,
    promo: PromoLookup<'_>,
    now: DateTime<Utc>,
) -> AppResult<PriceBreakdown> {
    if base_price < 0 {
        return Err(AppError::ValidationError(
            "Base price must not be negative".to_string(),
        ));
    }

    let code = match promo {
        PromoLookup::NotApplied => {
            return Ok(PriceBreakdown {
                original_amount: base_price,
                discount_amount: 0,
                final_amount: base_price,
            });
        }
        PromoLookup::NotFound => {
            return Err(AppError::InvalidPromoCode(
                "Promo code does not exist".to_string(),
            ));
        }
        PromoLookup::Found(code) => code,
    };

    check_redeemable(code, base_price, now)?;

    let discount_amount = discount_for(code.discount_type, code.discount_value, base_price);

    Ok(PriceBreakdown {
        original_amount: base_price,
        discount_amount,
        final_amount: (base_price - discount_amount).max(0),
    })
}

/// 校验优惠码当前是否可用（不含适用范围，范围由账本校验）
pub fn check_redeemable(code: &promo::Model, base_price: i64, now: DateTime<Utc>) -> AppResult<()> {
    if !code.is_active {
        return Err(AppError::InvalidPromoCode(
            "Promo code is not active".to_string(),
        ));
    }
    if !code.is_within_window(now) {
        return Err(AppError::InvalidPromoCode(
            "Promo code is expired or not yet valid".to_string(),
        ));
    }
    if code.discount_value < 0 {
        return Err(AppError::InvalidPromoCode(
            "Promo code has an invalid discount".to_string(),
        ));
    }
    if base_price < code.min_amount {
        return Err(AppError::InvalidPromoCode(format!(
            "Order amount must be at least {}",
            code.min_amount
        )));
    }
    if code.is_exhausted() {
        return Err(AppError::PromoCodeExhausted);
    }
    Ok(())
}

fn discount_for(kind: DiscountType, value: i64, base_price: i64) -> i64 {
    match kind {
        DiscountType::Percentage => {
            let pct = value.clamp(0, 100) as i128;
            (base_price as i128 * pct / 100) as i64
        }
        DiscountType::Fixed => value.clamp(0, base_price),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn code(kind: DiscountType, value: i64) -> promo::Model {
        promo::Model {
            id: 1,
            code: "SPRING".to_string(),
            description: None,
            discount_type: kind,
            discount_value: value,
            min_amount: 0,
            max_uses: None,
            used_count: 0,
            event_id: None,
            valid_from: None,
            valid_until: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_no_promo_code() {
        let price = calculate_price(1200, PromoLookup::NotApplied, Utc::now()).unwrap();
        assert_eq!(price.discount_amount, 0);
        assert_eq!(price.final_amount, 1200);
    }

    #[test]
    fn test_full_percentage_discount() {
        let c = code(DiscountType::Percentage, 100);
        let price = calculate_price(1000, PromoLookup::Found(&c), Utc::now()).unwrap();
        assert_eq!(price.discount_amount, 1000);
        assert_eq!(price.final_amount, 0);
    }

    #[test]
    fn test_percentage_rounds_down() {
        let c = code(DiscountType::Percentage, 15);
        let price = calculate_price(999, PromoLookup::Found(&c), Utc::now()).unwrap();
        // 999 * 15 / 100 = 149.85
        assert_eq!(price.discount_amount, 149);
        assert_eq!(price.final_amount, 850);
    }

    #[test]
    fn test_fixed_discount_capped_at_base_price() {
        let c = code(DiscountType::Fixed, 1500);
        let price = calculate_price(1000, PromoLookup::Found(&c), Utc::now()).unwrap();
        assert_eq!(price.discount_amount, 1000);
        assert_eq!(price.final_amount, 0);
    }

    #[test]
    fn test_final_amount_identity() {
        let now = Utc::now();
        for (kind, value) in [
            (DiscountType::Percentage, 0),
            (DiscountType::Percentage, 33),
            (DiscountType::Percentage, 250),
            (DiscountType::Fixed, 1),
            (DiscountType::Fixed, 10_000),
        ] {
            let c = code(kind, value);
            for base in [0, 1, 7, 1000, 123_457] {
                let p = calculate_price(base, PromoLookup::Found(&c), now).unwrap();
                assert_eq!(p.final_amount, p.original_amount - p.discount_amount);
                assert!(p.discount_amount <= p.original_amount);
                assert!(p.final_amount >= 0);
            }
        }
    }

    #[test]
    fn test_unknown_code_is_invalid() {
        let err = calculate_price(1000, PromoLookup::NotFound, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidPromoCode(_)));
    }

    #[test]
    fn test_inactive_code_is_invalid() {
        let mut c = code(DiscountType::Fixed, 100);
        c.is_active = false;
        let err = calculate_price(1000, PromoLookup::Found(&c), Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidPromoCode(_)));
    }

    #[test]
    fn test_code_outside_window_is_invalid() {
        let now = Utc::now();
        let mut expired = code(DiscountType::Fixed, 100);
        expired.valid_until = Some(now - Duration::hours(1));
        assert!(matches!(
            calculate_price(1000, PromoLookup::Found(&expired), now),
            Err(AppError::InvalidPromoCode(_))
        ));

        let mut upcoming = code(DiscountType::Fixed, 100);
        upcoming.valid_from = Some(now + Duration::hours(1));
        assert!(matches!(
            calculate_price(1000, PromoLookup::Found(&upcoming), now),
            Err(AppError::InvalidPromoCode(_))
        ));
    }

    #[test]
    fn test_below_minimum_amount_is_invalid() {
        let mut c = code(DiscountType::Fixed, 100);
        c.min_amount = 2000;
        let err = calculate_price(1999, PromoLookup::Found(&c), Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidPromoCode(_)));
        assert!(calculate_price(2000, PromoLookup::Found(&c), Utc::now()).is_ok());
    }

    #[test]
    fn test_exhausted_code() {
        let mut c = code(DiscountType::Percentage, 10);
        c.max_uses = Some(3);
        c.used_count = 3;
        let err = calculate_price(1000, PromoLookup::Found(&c), Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::PromoCodeExhausted));
    }

    #[test]
    fn test_inactive_takes_precedence_over_exhausted() {
        let mut c = code(DiscountType::Percentage, 10);
        c.max_uses = Some(1);
        c.used_count = 1;
        c.is_active = false;
        let err = calculate_price(1000, PromoLookup::Found(&c), Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidPromoCode(_)));
    }
}
