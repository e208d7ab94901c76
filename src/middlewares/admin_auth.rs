use crate::error::AppError;
use actix_web::http::Method;
use actix_web::{
    Error,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};
use std::rc::Rc;

const ADMIN_PREFIX: &str = "/api/v1/admin";

/// 管理接口认证：`Authorization: Bearer <admin.api_token>`
///
/// 未配置 token 时所有管理接口都拒绝访问。
pub struct AdminAuth {
    api_token: Rc<str>,
}

impl AdminAuth {
    pub fn new(api_token: &str) -> Self {
        Self {
            api_token: Rc::from(api_token),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AdminAuthService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdminAuthService {
            service,
            api_token: self.api_token.clone(),
        }))
    }
}

pub struct AdminAuthService<S> {
    service: S,
    api_token: Rc<str>,
}

fn is_admin_path(path: &str) -> bool {
    path == ADMIN_PREFIX || path.starts_with(&format!("{ADMIN_PREFIX}/"))
}

fn token_matches(expected: &str, given: &str) -> bool {
    if expected.is_empty() || expected.len() != given.len() {
        return false;
    }
    expected
        .bytes()
        .zip(given.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

impl<S, B> Service<ServiceRequest> for AdminAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // 放行 CORS 预检与非管理路径
        if req.method() == Method::OPTIONS || !is_admin_path(req.path()) {
            let fut = self.service.call(req);
            return Box::pin(fut);
        }

        let token = req
            .headers()
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        match token {
            Some(token) if token_matches(&self.api_token, token.trim()) => {
                let fut = self.service.call(req);
                Box::pin(fut)
            }
            Some(_) => {
                log::warn!("Rejected admin request to {}", req.path());
                let error = AppError::AuthError("Invalid admin token".to_string());
                Box::pin(async move { Err(error.into()) })
            }
            None => {
                let error = AppError::AuthError("Missing admin token".to_string());
                Box::pin(async move { Err(error.into()) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_paths() {
        assert!(is_admin_path("/api/v1/admin/orders"));
        assert!(is_admin_path("/api/v1/admin"));
        assert!(!is_admin_path("/api/v1/administrator"));
        assert!(!is_admin_path("/api/v1/orders"));
        assert!(!is_admin_path("/api/payment/notify"));
    }

    #[test]
    fn test_token_matches() {
        assert!(token_matches("s3cret", "s3cret"));
        assert!(!token_matches("s3cret", "s3cre7"));
        assert!(!token_matches("s3cret", "s3cret!"));
        assert!(!token_matches("", ""));
    }
}
