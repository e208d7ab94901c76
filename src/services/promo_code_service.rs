//! 优惠码账本
//!
//! 使用次数只通过一条条件 UPDATE 扣减（`used_count < max_uses` 时才 +1），
//! 并发兑换由数据库保证不会超过上限。账本不关心订单，下单失败时由调用方
//! 用 [`PromoCodeService::release`] 归还。

use crate::entities::{DiscountType, SubjectType, event_entity, promo_code_entity as promo};
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::price_calculator::{PriceBreakdown, PromoLookup, calculate_price};
use crate::utils::normalize_code;
use chrono::{DateTime, Utc};
use regex::Regex;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

/// 兑换的适用对象
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedemptionScope {
    pub subject_type: SubjectType,
    pub subject_id: i32,
}

/// 一次成功兑换的凭证，只能被归还一次
#[derive(Debug)]
#[must_use = "a redeemed promo code must be attached to an order or released"]
pub struct RedemptionToken {
    promo_code_id: i32,
    code: String,
}

impl RedemptionToken {
    pub fn promo_code_id(&self) -> i32 {
        self.promo_code_id
    }

    pub fn code(&self) -> &str {
        &self.code
    }
}

#[derive(Clone)]
pub struct PromoCodeService {
    pool: DatabaseConnection,
}

impl PromoCodeService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn find_by_code<C: ConnectionTrait>(
        &self,
        db: &C,
        code: &str,
    ) -> AppResult<Option<promo::Model>> {
        let code = normalize_code(code);
        if code.is_empty() {
            return Ok(None);
        }
        Ok(promo::Entity::find()
            .filter(promo::Column::Code.eq(code))
            .one(db)
            .await?)
    }

    /// 绑定了活动的优惠码只能用于该活动
    pub fn check_scope(code: &promo::Model, scope: &RedemptionScope) -> AppResult<()> {
        match code.event_id {
            None => Ok(()),
            Some(event_id)
                if scope.subject_type == SubjectType::Event && scope.subject_id == event_id =>
            {
                Ok(())
            }
            Some(_) => Err(AppError::PromoCodeScopeMismatch),
        }
    }

    /// 查找优惠码并试算价格，不扣减次数
    pub async fn quote(
        &self,
        code: &str,
        scope: &RedemptionScope,
        base_price: i64,
        now: DateTime<Utc>,
    ) -> AppResult<(promo::Model, PriceBreakdown)> {
        let found = self.find_by_code(&self.pool, code).await?;
        let Some(code) = found else {
            return Err(AppError::InvalidPromoCode(
                "Promo code does not exist".to_string(),
            ));
        };
        Self::check_scope(&code, scope)?;
        let price = calculate_price(base_price, PromoLookup::Found(&code), now)?;
        Ok((code, price))
    }

    /// 原子地占用一次使用额度
    pub async fn try_redeem<C: ConnectionTrait>(
        &self,
        db: &C,
        code: &promo::Model,
        scope: &RedemptionScope,
        now: DateTime<Utc>,
    ) -> AppResult<RedemptionToken> {
        Self::check_scope(code, scope)?;
        if !code.is_active || !code.is_within_window(now) {
            return Err(AppError::InvalidPromoCode(
                "Promo code is not currently valid".to_string(),
            ));
        }

        let result = promo::Entity::update_many()
            .col_expr(
                promo::Column::UsedCount,
                Expr::col(promo::Column::UsedCount).add(1),
            )
            .col_expr(promo::Column::UpdatedAt, Expr::value(now))
            .filter(promo::Column::Id.eq(code.id))
            .filter(promo::Column::IsActive.eq(true))
            .filter(
                Condition::any()
                    .add(promo::Column::MaxUses.is_null())
                    .add(Expr::col(promo::Column::UsedCount).lt(Expr::col(promo::Column::MaxUses))),
            )
            .exec(db)
            .await?;

        if result.rows_affected == 0 {
            // 区分被停用 / 被删除 / 额度用尽
            let current = promo::Entity::find_by_id(code.id).one(db).await?;
            return Err(match current {
                None => AppError::InvalidPromoCode("Promo code does not exist".to_string()),
                Some(c) if !c.is_active => {
                    AppError::InvalidPromoCode("Promo code is not active".to_string())
                }
                Some(_) => AppError::PromoCodeExhausted,
            });
        }

        log::info!("Promo code {} redeemed", code.code);
        Ok(RedemptionToken {
            promo_code_id: code.id,
            code: code.code.clone(),
        })
    }

    /// 归还一次使用额度（补偿下单失败），计数不会低于 0
    pub async fn release<C: ConnectionTrait>(&self, db: &C, token: RedemptionToken) -> AppResult<()> {
        let result = promo::Entity::update_many()
            .col_expr(
                promo::Column::UsedCount,
                Expr::col(promo::Column::UsedCount).sub(1),
            )
            .col_expr(promo::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(promo::Column::Id.eq(token.promo_code_id))
            .filter(promo::Column::UsedCount.gt(0))
            .exec(db)
            .await?;

        if result.rows_affected == 0 {
            log::warn!(
                "Promo code {} release had nothing to return",
                token.code
            );
        } else {
            log::info!("Promo code {} released", token.code);
        }
        Ok(())
    }

    pub async fn create(&self, req: CreatePromoCodeRequest) -> AppResult<PromoCodeResponse> {
        let code = normalize_code(&req.code);
        let code_regex = Regex::new(r"^[A-Z0-9_-]{3,50}$")
            .map_err(|e| AppError::InternalError(format!("正则表达式无效: {e}")))?;
        if !code_regex.is_match(&code) {
            return Err(AppError::ValidationError(
                "Code must be 3-50 letters, digits, '-' or '_'".to_string(),
            ));
        }
        if req.discount_value <= 0 {
            return Err(AppError::ValidationError(
                "Discount value must be positive".to_string(),
            ));
        }
        if req.discount_type == DiscountType::Percentage && req.discount_value > 100 {
            return Err(AppError::ValidationError(
                "Percentage discount must not exceed 100".to_string(),
            ));
        }
        if req.min_amount < 0 {
            return Err(AppError::ValidationError(
                "Minimum amount must not be negative".to_string(),
            ));
        }
        if let Some(max) = req.max_uses
            && max < 1
        {
            return Err(AppError::ValidationError(
                "Usage limit must be at least 1".to_string(),
            ));
        }
        if let (Some(from), Some(until)) = (req.valid_from, req.valid_until)
            && from >= until
        {
            return Err(AppError::ValidationError(
                "valid_from must be earlier than valid_until".to_string(),
            ));
        }
        if let Some(event_id) = req.event_id
            && event_entity::Entity::find_by_id(event_id)
                .one(&self.pool)
                .await?
                .is_none()
        {
            return Err(AppError::ValidationError(format!(
                "Event {event_id} does not exist"
            )));
        }
        if self.find_by_code(&self.pool, &code).await?.is_some() {
            return Err(AppError::ValidationError(format!(
                "Promo code {code} already exists"
            )));
        }

        let now = Utc::now();
        let model = promo::ActiveModel {
            code: Set(code),
            description: Set(req.description),
            discount_type: Set(req.discount_type),
            discount_value: Set(req.discount_value),
            min_amount: Set(req.min_amount),
            max_uses: Set(req.max_uses),
            used_count: Set(0),
            event_id: Set(req.event_id),
            valid_from: Set(req.valid_from),
            valid_until: Set(req.valid_until),
            is_active: Set(req.is_active),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        log::info!("Promo code {} created", model.code);
        Ok(PromoCodeResponse::from(model))
    }

    pub async fn list(
        &self,
        query: &PromoCodeQuery,
    ) -> AppResult<PaginatedResponse<PromoCodeResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);

        let mut select = promo::Entity::find();
        if let Some(active) = query.is_active {
            select = select.filter(promo::Column::IsActive.eq(active));
        }
        if let Some(event_id) = query.event_id {
            select = select.filter(promo::Column::EventId.eq(event_id));
        }

        let total = select.clone().count(&self.pool).await?;
        let items = select
            .order_by_desc(promo::Column::CreatedAt)
            .order_by_desc(promo::Column::Id)
            .offset(params.get_offset())
            .limit(params.get_limit())
            .all(&self.pool)
            .await?
            .into_iter()
            .map(PromoCodeResponse::from)
            .collect();

        Ok(PaginatedResponse::new(items, &params, total))
    }

    pub async fn get(&self, id: i32) -> AppResult<PromoCodeResponse> {
        promo::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .map(PromoCodeResponse::from)
            .ok_or_else(|| AppError::NotFound("Promo code not found".into()))
    }

    pub async fn set_active(&self, id: i32, is_active: bool) -> AppResult<PromoCodeResponse> {
        let found = promo::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Promo code not found".into()))?;

        let mut am: promo::ActiveModel = found.into();
        am.is_active = Set(is_active);
        am.updated_at = Set(Utc::now());
        let model = am.update(&self.pool).await?;

        log::info!("Promo code {} set active={is_active}", model.code);
        Ok(PromoCodeResponse::from(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(event_id: Option<i32>) -> promo::Model {
        promo::Model {
            id: 1,
            code: "EARLY".to_string(),
            description: None,
            discount_type: DiscountType::Fixed,
            discount_value: 100,
            min_amount: 0,
            max_uses: None,
            used_count: 0,
            event_id,
            valid_from: None,
            valid_until: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_unbound_code_applies_everywhere() {
        let c = code(None);
        for scope in [
            RedemptionScope { subject_type: SubjectType::Event, subject_id: 3 },
            RedemptionScope { subject_type: SubjectType::VideoCourse, subject_id: 3 },
        ] {
            assert!(PromoCodeService::check_scope(&c, &scope).is_ok());
        }
    }

    #[test]
    fn test_event_bound_code_scope() {
        let c = code(Some(7));
        let same = RedemptionScope { subject_type: SubjectType::Event, subject_id: 7 };
        let other = RedemptionScope { subject_type: SubjectType::Event, subject_id: 8 };
        let course = RedemptionScope { subject_type: SubjectType::VideoCourse, subject_id: 7 };
        assert!(PromoCodeService::check_scope(&c, &same).is_ok());
        assert!(matches!(
            PromoCodeService::check_scope(&c, &other),
            Err(AppError::PromoCodeScopeMismatch)
        ));
        assert!(matches!(
            PromoCodeService::check_scope(&c, &course),
            Err(AppError::PromoCodeScopeMismatch)
        ));
    }
}
