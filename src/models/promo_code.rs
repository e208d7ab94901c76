use crate::entities::{DiscountType, SubjectType, promo_code_entity as promo};
use crate::services::PriceBreakdown;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PromoCodeResponse {
    pub id: i32,
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub min_amount: i64,
    pub max_uses: Option<i32>,
    pub used_count: i32,
    pub remaining_uses: Option<i32>,
    pub event_id: Option<i32>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<promo::Model> for PromoCodeResponse {
    fn from(m: promo::Model) -> Self {
        let remaining_uses = m.remaining_uses();
        Self {
            id: m.id,
            code: m.code,
            description: m.description,
            discount_type: m.discount_type,
            discount_value: m.discount_value,
            min_amount: m.min_amount,
            max_uses: m.max_uses,
            used_count: m.used_count,
            remaining_uses,
            event_id: m.event_id,
            valid_from: m.valid_from,
            valid_until: m.valid_until,
            is_active: m.is_active,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatePromoCodeRequest {
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    #[serde(default)]
    pub min_amount: i64,
    pub max_uses: Option<i32>,
    /// 限定活动，不填为通用
    pub event_id: Option<i32>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SetPromoCodeActiveRequest {
    pub is_active: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PromoCodeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub is_active: Option<bool>,
    pub event_id: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ValidatePromoCodeRequest {
    pub code: String,
    pub subject_type: SubjectType,
    pub subject_id: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ValidatePromoCodeResponse {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub price: PriceBreakdown,
}
