use crate::error::{AppError, AppResult};
use regex::Regex;

fn pattern(re: &str) -> AppResult<Regex> {
    Regex::new(re).map_err(|e| AppError::InternalError(format!("正则表达式无效: {e}")))
}

/// 校验报名人姓名（1-100 个字符）
pub fn validate_name(name: &str) -> AppResult<()> {
    let len = name.trim().chars().count();
    if len == 0 || len > 100 {
        return Err(AppError::ValidationError(
            "Name must be between 1 and 100 characters".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> AppResult<()> {
    let email_regex = pattern(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")?;

    if email.len() > 255 || !email_regex.is_match(email) {
        return Err(AppError::ValidationError("Invalid email address".to_string()));
    }
    Ok(())
}

/// 电话允许数字与 `+-() `，长度 6-20
pub fn validate_phone(phone: &str) -> AppResult<()> {
    let phone_regex = pattern(r"^[0-9+\-() ]{6,20}$")?;

    if !phone_regex.is_match(phone) || !phone.chars().any(|c| c.is_ascii_digit()) {
        return Err(AppError::ValidationError("Invalid phone number".to_string()));
    }
    Ok(())
}

/// 统一编号为 8 位数字
pub fn validate_tax_id(tax_id: &str) -> AppResult<()> {
    let tax_id_regex = pattern(r"^\d{8}$")?;

    if !tax_id_regex.is_match(tax_id) {
        return Err(AppError::ValidationError(
            "Tax ID must be exactly 8 digits".to_string(),
        ));
    }
    Ok(())
}

/// 优惠码统一去空白并转大写
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("王小明").is_ok());
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"a".repeat(101)).is_err());
        assert!(validate_name(&"a".repeat(100)).is_ok());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("someone@example.com").is_ok());
        assert!(validate_email("someone@example").is_err());
        assert!(validate_email("some one@example.com").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("0912-345-678").is_ok());
        assert!(validate_phone("+886 (2) 2345 6789").is_ok());
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("0912abc678").is_err());
        assert!(validate_phone("--------").is_err());
    }

    #[test]
    fn test_validate_tax_id() {
        assert!(validate_tax_id("12345678").is_ok());
        assert!(validate_tax_id("1234567").is_err());
        assert!(validate_tax_id("1234567a").is_err());
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  spring25 "), "SPRING25");
    }
}
