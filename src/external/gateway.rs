use crate::config::GatewayConfig;
use crate::entities::order_entity;
use crate::error::{AppError, AppResult};
use crate::models::PaymentRedirectParams;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// 托管付款页网关：生成跳转参数、校验异步回调签名
#[derive(Clone)]
pub struct PaymentGateway {
    config: GatewayConfig,
}

impl PaymentGateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self { config }
    }

    fn mac(&self) -> AppResult<HmacSha256> {
        HmacSha256::new_from_slice(self.config.hash_key.as_bytes())
            .map_err(|e| AppError::ConfigError(format!("网关签名密钥无效: {e}")))
    }

    /// 对原始回调内容签名，返回小写十六进制
    pub fn sign(&self, payload: &[u8]) -> AppResult<String> {
        let mut mac = self.mac()?;
        mac.update(payload);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// 常量时间比对回调签名，不通过时返回 [`AppError::InvalidSignature`]
    pub fn verify(&self, payload: &[u8], checksum: &str) -> AppResult<()> {
        let expected = hex::decode(checksum.trim()).map_err(|_| AppError::InvalidSignature)?;
        let mut mac = self.mac()?;
        mac.update(payload);
        mac.verify_slice(&expected)
            .map_err(|_| AppError::InvalidSignature)
    }

    /// 生成前端跳转付款页所需的表单参数
    pub fn checkout_params(
        &self,
        order: &order_entity::Model,
        item_desc: &str,
    ) -> AppResult<PaymentRedirectParams> {
        let timestamp = order.created_at.timestamp();
        let canonical = format!(
            "Amt={}&MerchantID={}&MerchantOrderNo={}&TimeStamp={}&Version={}",
            order.final_amount, self.config.merchant_id, order.order_no, timestamp, self.config.version
        );
        let check_value = self.sign(canonical.as_bytes())?.to_uppercase();

        Ok(PaymentRedirectParams {
            gateway_url: self.config.endpoint.clone(),
            merchant_id: self.config.merchant_id.clone(),
            merchant_order_no: order.order_no.clone(),
            amount: order.final_amount,
            item_desc: item_desc.chars().take(50).collect(),
            email: order.email.clone(),
            timestamp,
            version: self.config.version.clone(),
            notify_url: self.config.notify_url.clone(),
            return_url: self.config.return_url.clone(),
            check_value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> PaymentGateway {
        PaymentGateway::new(GatewayConfig {
            merchant_id: "MS100".to_string(),
            hash_key: "test-hash-key".to_string(),
            endpoint: "https://gateway.test/mpg".to_string(),
            notify_url: "https://shop.test/api/payment/notify".to_string(),
            return_url: "https://shop.test/result".to_string(),
            version: "2.0".to_string(),
        })
    }

    #[test]
    fn test_verify_accepts_own_signature() {
        let gw = gateway();
        let body = br#"{"trade_no":"T1","amount":100,"status":"SUCCESS"}"#;
        let sig = gw.sign(body).unwrap();
        assert!(gw.verify(body, &sig).is_ok());
        assert!(gw.verify(body, &sig.to_uppercase()).is_ok());
    }

    #[test]
    fn test_verify_rejects_tampered_body() {
        let gw = gateway();
        let sig = gw.sign(br#"{"amount":100}"#).unwrap();
        assert!(matches!(
            gw.verify(br#"{"amount":1}"#, &sig),
            Err(AppError::InvalidSignature)
        ));
    }

    #[test]
    fn test_verify_rejects_garbage_checksum() {
        let gw = gateway();
        assert!(matches!(
            gw.verify(b"{}", "not-hex"),
            Err(AppError::InvalidSignature)
        ));
        assert!(matches!(gw.verify(b"{}", ""), Err(AppError::InvalidSignature)));
    }
}
