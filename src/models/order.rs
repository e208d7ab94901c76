use crate::entities::{PaymentStatus, SubjectType, order_entity};
use crate::models::PaymentRedirectParams;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub subject_type: SubjectType,
    pub subject_id: i32,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub promo_code: Option<String>,
    /// 是否需要三联式发票
    #[serde(default)]
    pub need_invoice: bool,
    pub tax_id: Option<String>,
    pub invoice_title: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderResponse {
    pub order_no: String,
    pub original_amount: i64,
    pub discount_amount: i64,
    pub final_amount: i64,
    pub payment_status: PaymentStatus,
    /// 应付金额为 0 时无需跳转付款页
    pub payment_redirect_params: Option<PaymentRedirectParams>,
}

/// 对外公开的订单状态（不含联系人信息）
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderStatusResponse {
    pub order_no: String,
    pub subject_type: SubjectType,
    pub subject_id: i32,
    pub original_amount: i64,
    pub discount_amount: i64,
    pub final_amount: i64,
    pub promo_code: Option<String>,
    pub payment_status: PaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
}

impl From<order_entity::Model> for OrderStatusResponse {
    fn from(m: order_entity::Model) -> Self {
        Self {
            order_no: m.order_no,
            subject_type: m.subject_type,
            subject_id: m.subject_id,
            original_amount: m.original_amount,
            discount_amount: m.discount_amount,
            final_amount: m.final_amount,
            promo_code: m.promo_code,
            payment_status: m.payment_status,
            paid_at: m.paid_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: i32,
    pub order_no: String,
    pub subject_type: SubjectType,
    pub subject_id: i32,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub original_amount: i64,
    pub discount_amount: i64,
    pub final_amount: i64,
    pub promo_code_id: Option<i32>,
    pub promo_code: Option<String>,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<String>,
    pub gateway_trade_no: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub access_granted_at: Option<DateTime<Utc>>,
    pub need_invoice: bool,
    pub tax_id: Option<String>,
    pub invoice_title: Option<String>,
    pub invoice_eligible: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<order_entity::Model> for OrderResponse {
    fn from(m: order_entity::Model) -> Self {
        Self {
            id: m.id,
            order_no: m.order_no,
            subject_type: m.subject_type,
            subject_id: m.subject_id,
            name: m.name,
            email: m.email,
            phone: m.phone,
            company: m.company,
            job_title: m.job_title,
            original_amount: m.original_amount,
            discount_amount: m.discount_amount,
            final_amount: m.final_amount,
            promo_code_id: m.promo_code_id,
            promo_code: m.promo_code,
            payment_status: m.payment_status,
            payment_method: m.payment_method,
            gateway_trade_no: m.gateway_trade_no,
            paid_at: m.paid_at,
            access_granted_at: m.access_granted_at,
            need_invoice: m.need_invoice,
            tax_id: m.tax_id,
            invoice_title: m.invoice_title,
            invoice_eligible: m.invoice_eligible,
            notes: m.notes,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub payment_status: Option<PaymentStatus>,
    pub subject_type: Option<SubjectType>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateOrderNotesRequest {
    pub notes: Option<String>,
}
