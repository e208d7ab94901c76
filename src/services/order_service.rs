use crate::entities::{
    CourseStatus, EventStatus, OrderEventKind, PaymentStatus, SubjectType,
    course_access_grant_entity as grant, event_entity, order_entity as order,
    order_event_entity as outbox, video_course_entity,
};
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::PromoCodeService;
use crate::services::price_calculator::{PriceBreakdown, PromoLookup, calculate_price};
use crate::services::promo_code_service::{RedemptionScope, RedemptionToken};
use crate::utils::{
    generate_order_no, validate_email, validate_name, validate_phone, validate_tax_id,
};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use serde_json::json;

pub const FREE_ORDER_METHOD: &str = "promo_code";
pub const FREE_TRADE_NO_PREFIX: &str = "FREE-";

/// 可购买的对象（活动报名或视频课程）
#[derive(Debug, Clone)]
pub struct Subject {
    pub subject_type: SubjectType,
    pub id: i32,
    pub title: String,
    pub price: i64,
}

/// 刚创建的订单及付款页商品描述
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: order::Model,
    pub item_desc: String,
}

/// 网关提供的状态变更依据
#[derive(Debug, Clone)]
pub struct TransitionEvidence {
    pub trade_no: String,
    pub payment_method: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied,
    /// 重复通知，状态与交易编号均相同
    Idempotent,
}

#[derive(Clone)]
pub struct OrderService {
    pool: DatabaseConnection,
    promo_codes: PromoCodeService,
}

impl OrderService {
    pub fn new(pool: DatabaseConnection, promo_codes: PromoCodeService) -> Self {
        Self { pool, promo_codes }
    }

    pub fn validate_contact(req: &CreateOrderRequest) -> AppResult<()> {
        validate_name(&req.name)?;
        validate_email(req.email.trim())?;
        validate_phone(req.phone.trim())?;

        if req.need_invoice {
            let tax_id = req.tax_id.as_deref().map(str::trim).unwrap_or_default();
            validate_tax_id(tax_id)?;
            let title = req
                .invoice_title
                .as_deref()
                .map(str::trim)
                .unwrap_or_default();
            if title.is_empty() || title.chars().count() > 100 {
                return Err(AppError::ValidationError(
                    "Invoice title is required when an invoice is requested".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// 读取对象价格，只有已发布且价格大于 0 的对象可下单
    pub async fn find_subject(&self, subject_type: SubjectType, id: i32) -> AppResult<Subject> {
        let (title, price) = match subject_type {
            SubjectType::Event => {
                let event = event_entity::Entity::find_by_id(id)
                    .one(&self.pool)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Event not found".into()))?;
                if event.status != EventStatus::Published || !event.registration_enabled {
                    return Err(AppError::ValidationError(
                        "Event is not open for registration".into(),
                    ));
                }
                (event.title, event.price)
            }
            SubjectType::VideoCourse => {
                let course = video_course_entity::Entity::find_by_id(id)
                    .one(&self.pool)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Video course not found".into()))?;
                if course.status != CourseStatus::Published {
                    return Err(AppError::ValidationError(
                        "Video course is not available".into(),
                    ));
                }
                (course.title, course.price)
            }
        };

        if price <= 0 {
            return Err(AppError::ValidationError(
                "This item is free and does not need an order".into(),
            ));
        }

        Ok(Subject {
            subject_type,
            id,
            title,
            price,
        })
    }

    /// 试算优惠后的价格，不占用优惠码额度
    pub async fn preview_price(
        &self,
        req: &ValidatePromoCodeRequest,
    ) -> AppResult<ValidatePromoCodeResponse> {
        let subject = self.find_subject(req.subject_type, req.subject_id).await?;
        let scope = RedemptionScope {
            subject_type: subject.subject_type,
            subject_id: subject.id,
        };
        let (code, price) = self
            .promo_codes
            .quote(&req.code, &scope, subject.price, Utc::now())
            .await?;

        Ok(ValidatePromoCodeResponse {
            code: code.code,
            discount_type: code.discount_type,
            discount_value: code.discount_value,
            price,
        })
    }

    /// 创建订单
    ///
    /// 占用优惠码额度与写入订单在同一事务内完成；应付为 0 的订单在同一事务内
    /// 直接结清为已付款。
    pub async fn create_order(&self, req: CreateOrderRequest) -> AppResult<PlacedOrder> {
        Self::validate_contact(&req)?;
        let subject = self.find_subject(req.subject_type, req.subject_id).await?;
        let now = Utc::now();
        let scope = RedemptionScope {
            subject_type: subject.subject_type,
            subject_id: subject.id,
        };

        let promo_input = req
            .promo_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());

        let (price, promo_code) = match promo_input {
            None => (
                calculate_price(subject.price, PromoLookup::NotApplied, now)?,
                None,
            ),
            Some(code) => {
                let (promo_code, price) =
                    self.promo_codes.quote(code, &scope, subject.price, now).await?;
                (price, Some(promo_code))
            }
        };

        let txn = self.pool.begin().await?;

        let token = match &promo_code {
            Some(code) => Some(self.promo_codes.try_redeem(&txn, code, &scope, now).await?),
            None => None,
        };

        let mut order =
            Self::insert_order(&txn, &req, &subject, price, token.as_ref(), now).await?;

        if order.final_amount == 0 {
            let evidence = TransitionEvidence {
                trade_no: format!("{FREE_TRADE_NO_PREFIX}{}", order.order_no),
                payment_method: Some(FREE_ORDER_METHOD.to_string()),
                occurred_at: now,
            };
            let (settled, _) =
                Self::transition_within(&txn, &order.order_no, PaymentStatus::Paid, &evidence)
                    .await?;
            order = settled;
        }

        txn.commit().await?;

        log::info!(
            "Order {} created for {} {} (final amount {}, status {})",
            order.order_no,
            subject.subject_type,
            subject.id,
            order.final_amount,
            order.payment_status
        );
        Ok(PlacedOrder {
            order,
            item_desc: subject.title,
        })
    }

    async fn insert_order<C: ConnectionTrait>(
        db: &C,
        req: &CreateOrderRequest,
        subject: &Subject,
        price: PriceBreakdown,
        token: Option<&RedemptionToken>,
        now: DateTime<Utc>,
    ) -> AppResult<order::Model> {
        let non_empty = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let (tax_id, invoice_title) = if req.need_invoice {
            (non_empty(&req.tax_id), non_empty(&req.invoice_title))
        } else {
            (None, None)
        };

        let model = order::ActiveModel {
            order_no: Set(generate_order_no()),
            subject_type: Set(subject.subject_type),
            subject_id: Set(subject.id),
            name: Set(req.name.trim().to_string()),
            email: Set(req.email.trim().to_string()),
            phone: Set(req.phone.trim().to_string()),
            company: Set(non_empty(&req.company)),
            job_title: Set(non_empty(&req.job_title)),
            original_amount: Set(price.original_amount),
            discount_amount: Set(price.discount_amount),
            final_amount: Set(price.final_amount),
            promo_code_id: Set(token.map(RedemptionToken::promo_code_id)),
            promo_code: Set(token.map(|t| t.code().to_string())),
            payment_status: Set(PaymentStatus::Pending),
            payment_method: Set(None),
            gateway_trade_no: Set(None),
            paid_at: Set(None),
            effects_applied_at: Set(None),
            access_granted_at: Set(None),
            need_invoice: Set(req.need_invoice),
            tax_id: Set(tax_id),
            invoice_title: Set(invoice_title),
            invoice_eligible: Set(false),
            notes: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;

        Ok(model)
    }

    pub async fn find_by_order_no(&self, order_no: &str) -> AppResult<Option<order::Model>> {
        Ok(order::Entity::find()
            .filter(order::Column::OrderNo.eq(order_no))
            .one(&self.pool)
            .await?)
    }

    pub async fn find_by_gateway_trade_no(&self, trade_no: &str) -> AppResult<Option<order::Model>> {
        Ok(order::Entity::find()
            .filter(order::Column::GatewayTradeNo.eq(trade_no))
            .order_by_desc(order::Column::Id)
            .one(&self.pool)
            .await?)
    }

    /// 变更付款状态
    ///
    /// 在事务内锁定订单行，按原状态做条件更新；副作用由 `effects_applied_at`
    /// 把关，每次状态变更只执行一次。
    pub async fn transition_payment_status(
        &self,
        order_no: &str,
        to: PaymentStatus,
        evidence: &TransitionEvidence,
    ) -> AppResult<(order::Model, TransitionOutcome)> {
        let txn = self.pool.begin().await?;
        let (updated, outcome) = Self::transition_within(&txn, order_no, to, evidence).await?;
        txn.commit().await?;

        match outcome {
            TransitionOutcome::Applied => {
                log::info!("Order {order_no} payment status -> {to}")
            }
            TransitionOutcome::Idempotent => {
                log::info!("Order {order_no} already {to}, duplicate ignored")
            }
        }
        Ok((updated, outcome))
    }

    async fn transition_within(
        txn: &DatabaseTransaction,
        order_no: &str,
        to: PaymentStatus,
        evidence: &TransitionEvidence,
    ) -> AppResult<(order::Model, TransitionOutcome)> {
        // 先写后读：SQLite 没有 FOR UPDATE，空更新让事务一开始就取得写锁
        order::Entity::update_many()
            .col_expr(
                order::Column::UpdatedAt,
                Expr::col(order::Column::UpdatedAt).into(),
            )
            .filter(order::Column::OrderNo.eq(order_no))
            .exec(txn)
            .await?;

        let current = order::Entity::find()
            .filter(order::Column::OrderNo.eq(order_no))
            .lock_exclusive()
            .one(txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {order_no} not found")))?;
        let from = current.payment_status;

        // 退款沿用付款时的交易编号，状态不变时交易编号必须一致
        let same_trade = current.gateway_trade_no.as_deref() == Some(evidence.trade_no.as_str());

        let outcome = if from == to {
            if !same_trade {
                return Err(AppError::InvalidTransition { from, to });
            }
            TransitionOutcome::Idempotent
        } else {
            if !from.can_transition_to(to) {
                return Err(AppError::InvalidTransition { from, to });
            }
            if to == PaymentStatus::Refunded && !same_trade {
                log::warn!(
                    "Refund for {order_no} carries trade number {}, expected {:?}",
                    evidence.trade_no,
                    current.gateway_trade_no
                );
                return Err(AppError::InvalidTransition { from, to });
            }

            let mut update = order::Entity::update_many()
                .col_expr(order::Column::PaymentStatus, Expr::value(to))
                .col_expr(
                    order::Column::EffectsAppliedAt,
                    Expr::value(Option::<DateTime<Utc>>::None),
                )
                .col_expr(order::Column::UpdatedAt, Expr::value(evidence.occurred_at));
            if to != PaymentStatus::Refunded {
                update = update
                    .col_expr(
                        order::Column::GatewayTradeNo,
                        Expr::value(evidence.trade_no.clone()),
                    )
                    .col_expr(
                        order::Column::PaymentMethod,
                        Expr::value(evidence.payment_method.clone()),
                    );
            }
            if to == PaymentStatus::Paid {
                update = update.col_expr(order::Column::PaidAt, Expr::value(evidence.occurred_at));
            }

            let result = update
                .filter(order::Column::Id.eq(current.id))
                .filter(order::Column::PaymentStatus.eq(from))
                .exec(txn)
                .await?;
            if result.rows_affected == 0 {
                // 状态已被并发修改，交给网关重送后按幂等处理
                log::warn!("Order {order_no} changed during transition {from} -> {to}");
                return Err(AppError::DatabaseError(DbErr::RecordNotUpdated));
            }
            TransitionOutcome::Applied
        };

        Self::apply_effects(txn, current.id, to, evidence).await?;

        let updated = order::Entity::find_by_id(current.id)
            .one(txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {order_no} not found")))?;

        Ok((updated, outcome))
    }

    /// 标记副作用已执行；标记成功的那一次才真正执行
    async fn apply_effects(
        txn: &DatabaseTransaction,
        order_id: i32,
        status: PaymentStatus,
        evidence: &TransitionEvidence,
    ) -> AppResult<()> {
        let now = Utc::now();
        let claimed = order::Entity::update_many()
            .col_expr(order::Column::EffectsAppliedAt, Expr::value(now))
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::PaymentStatus.eq(status))
            .filter(order::Column::EffectsAppliedAt.is_null())
            .exec(txn)
            .await?;
        if claimed.rows_affected == 0 {
            return Ok(());
        }

        let order = order::Entity::find_by_id(order_id)
            .one(txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".into()))?;

        let kind = match status {
            PaymentStatus::Paid => {
                let mut am: order::ActiveModel = order.clone().into();
                if order.subject_type == SubjectType::VideoCourse {
                    grant::ActiveModel {
                        order_id: Set(order.id),
                        course_id: Set(order.subject_id),
                        email: Set(order.email.clone()),
                        granted_at: Set(now),
                        revoked_at: Set(None),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await?;
                    am.access_granted_at = Set(Some(now));
                }
                if order.need_invoice {
                    am.invoice_eligible = Set(true);
                }
                am.update(txn).await?;
                OrderEventKind::PaymentSucceeded
            }
            PaymentStatus::Failed => OrderEventKind::PaymentFailed,
            PaymentStatus::Refunded => {
                grant::Entity::update_many()
                    .col_expr(grant::Column::RevokedAt, Expr::value(Some(now)))
                    .filter(grant::Column::OrderId.eq(order.id))
                    .filter(grant::Column::RevokedAt.is_null())
                    .exec(txn)
                    .await?;
                let mut am: order::ActiveModel = order.clone().into();
                am.invoice_eligible = Set(false);
                am.update(txn).await?;
                OrderEventKind::OrderRefunded
            }
            PaymentStatus::Pending => return Ok(()),
        };

        let payload = json!({
            "order_no": order.order_no,
            "status": status,
            "subject_type": order.subject_type,
            "subject_id": order.subject_id,
            "name": order.name,
            "email": order.email,
            "final_amount": order.final_amount,
            "promo_code": order.promo_code,
            "trade_no": evidence.trade_no,
            "payment_method": evidence.payment_method,
            "need_invoice": order.need_invoice,
        });

        outbox::ActiveModel {
            order_id: Set(order.id),
            order_no: Set(order.order_no.clone()),
            kind: Set(kind),
            payload: Set(serde_json::to_string(&payload)?),
            attempts: Set(0),
            last_error: Set(None),
            delivered_at: Set(None),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(txn)
        .await?;

        log::info!("Order {} effects applied for {kind}", order.order_no);
        Ok(())
    }

    pub async fn get_status(&self, order_no: &str) -> AppResult<OrderStatusResponse> {
        self.find_by_order_no(order_no)
            .await?
            .map(OrderStatusResponse::from)
            .ok_or_else(|| AppError::NotFound("Order not found".into()))
    }

    pub async fn get(&self, order_no: &str) -> AppResult<OrderResponse> {
        self.find_by_order_no(order_no)
            .await?
            .map(OrderResponse::from)
            .ok_or_else(|| AppError::NotFound("Order not found".into()))
    }

    pub async fn list(&self, query: &OrderQuery) -> AppResult<PaginatedResponse<OrderResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);

        let mut select = order::Entity::find();
        if let Some(status) = query.payment_status {
            select = select.filter(order::Column::PaymentStatus.eq(status));
        }
        if let Some(subject_type) = query.subject_type {
            select = select.filter(order::Column::SubjectType.eq(subject_type));
        }
        if let Some(email) = query.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            select = select.filter(order::Column::Email.eq(email));
        }

        let total = select.clone().count(&self.pool).await?;
        let items = select
            .order_by_desc(order::Column::CreatedAt)
            .order_by_desc(order::Column::Id)
            .offset(params.get_offset())
            .limit(params.get_limit())
            .all(&self.pool)
            .await?
            .into_iter()
            .map(OrderResponse::from)
            .collect();

        Ok(PaginatedResponse::new(items, &params, total))
    }

    /// 备注在任何状态下都可修改
    pub async fn update_notes(&self, order_no: &str, notes: Option<String>) -> AppResult<OrderResponse> {
        let found = self
            .find_by_order_no(order_no)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".into()))?;

        let mut am: order::ActiveModel = found.into();
        am.notes = Set(notes.filter(|n| !n.trim().is_empty()));
        am.updated_at = Set(Utc::now());
        let model = am.update(&self.pool).await?;

        Ok(OrderResponse::from(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateOrderRequest {
        CreateOrderRequest {
            subject_type: SubjectType::Event,
            subject_id: 1,
            name: "Lin".to_string(),
            email: "lin@example.com".to_string(),
            phone: "0912-345-678".to_string(),
            company: None,
            job_title: None,
            promo_code: None,
            need_invoice: false,
            tax_id: None,
            invoice_title: None,
        }
    }

    #[test]
    fn test_contact_validation() {
        assert!(OrderService::validate_contact(&request()).is_ok());

        let mut bad_email = request();
        bad_email.email = "lin@".to_string();
        assert!(OrderService::validate_contact(&bad_email).is_err());

        let mut empty_name = request();
        empty_name.name = " ".to_string();
        assert!(OrderService::validate_contact(&empty_name).is_err());
    }

    #[test]
    fn test_invoice_requires_tax_id_and_title() {
        let mut req = request();
        req.need_invoice = true;
        assert!(OrderService::validate_contact(&req).is_err());

        req.tax_id = Some("12345678".to_string());
        assert!(OrderService::validate_contact(&req).is_err());

        req.invoice_title = Some("Acme Ltd.".to_string());
        assert!(OrderService::validate_contact(&req).is_ok());
    }
}
