//! Promo code ledger: usage ceiling under concurrency, release, admin rules.

mod common;

use checkout_backend::entities::{DiscountType, SubjectType, promo_code_entity};
use checkout_backend::error::AppError;
use checkout_backend::models::{CreatePromoCodeRequest, PromoCodeQuery};
use checkout_backend::services::RedemptionScope;
use chrono::Utc;
use common::*;
use futures_util::future::join_all;
use sea_orm::EntityTrait;

fn event_scope(event_id: i32) -> RedemptionScope {
    RedemptionScope {
        subject_type: SubjectType::Event,
        subject_id: event_id,
    }
}

async fn used_count(db: &sea_orm::DatabaseConnection, id: i32) -> i32 {
    promo_code_entity::Entity::find_by_id(id)
        .one(db)
        .await
        .unwrap()
        .unwrap()
        .used_count
}

#[tokio::test]
async fn test_concurrent_redemptions_respect_ceiling() {
    let db = setup_db().await;
    let svc = services(&db);
    let event = seed_event(&db, 1000).await;
    let code = seed_promo(&db, "LIMITED", DiscountType::Fixed, 100, Some(3), None).await;
    let scope = event_scope(event.id);
    let now = Utc::now();

    let attempts = (0..10).map(|_| svc.promo_codes.try_redeem(&db, &code, &scope, now));
    let results = join_all(attempts).await;

    let redeemed = results.iter().filter(|r| r.is_ok()).count();
    let exhausted = results
        .iter()
        .filter(|r| matches!(r, Err(AppError::PromoCodeExhausted)))
        .count();
    assert_eq!(redeemed, 3);
    assert_eq!(exhausted, 7);
    assert_eq!(used_count(&db, code.id).await, 3);
}

#[tokio::test]
async fn test_release_returns_usage_and_floors_at_zero() {
    let db = setup_db().await;
    let svc = services(&db);
    let event = seed_event(&db, 1000).await;
    let code = seed_promo(&db, "ONCE", DiscountType::Percentage, 10, Some(1), None).await;
    let scope = event_scope(event.id);

    let token = svc
        .promo_codes
        .try_redeem(&db, &code, &scope, Utc::now())
        .await
        .unwrap();
    assert_eq!(used_count(&db, code.id).await, 1);

    let second = svc
        .promo_codes
        .try_redeem(&db, &code, &scope, Utc::now())
        .await;
    assert!(matches!(second, Err(AppError::PromoCodeExhausted)));

    svc.promo_codes.release(&db, token).await.unwrap();
    assert_eq!(used_count(&db, code.id).await, 0);

    // 已归零时再次占用后归还仍然正确
    let again = svc
        .promo_codes
        .try_redeem(&db, &code, &scope, Utc::now())
        .await
        .unwrap();
    svc.promo_codes.release(&db, again).await.unwrap();
    assert_eq!(used_count(&db, code.id).await, 0);
}

#[tokio::test]
async fn test_deactivated_code_cannot_be_redeemed() {
    let db = setup_db().await;
    let svc = services(&db);
    let event = seed_event(&db, 1000).await;
    let code = seed_promo(&db, "PAUSED", DiscountType::Fixed, 100, None, None).await;

    // 快照仍是启用状态，但数据库中已停用
    svc.promo_codes.set_active(code.id, false).await.unwrap();
    let result = svc
        .promo_codes
        .try_redeem(&db, &code, &event_scope(event.id), Utc::now())
        .await;

    assert!(matches!(result, Err(AppError::InvalidPromoCode(_))));
    assert_eq!(used_count(&db, code.id).await, 0);
}

#[tokio::test]
async fn test_event_bound_code_rejects_other_subjects() {
    let db = setup_db().await;
    let svc = services(&db);
    let event = seed_event(&db, 1000).await;
    let other = seed_event(&db, 1000).await;
    let course = seed_course(&db, 1000).await;
    let code = seed_promo(&db, "VIPONLY", DiscountType::Fixed, 100, None, Some(event.id)).await;

    let wrong_event = svc
        .promo_codes
        .try_redeem(&db, &code, &event_scope(other.id), Utc::now())
        .await;
    assert!(matches!(wrong_event, Err(AppError::PromoCodeScopeMismatch)));

    let course_scope = RedemptionScope {
        subject_type: SubjectType::VideoCourse,
        subject_id: course.id,
    };
    let wrong_kind = svc
        .promo_codes
        .quote("viponly", &course_scope, 1000, Utc::now())
        .await;
    assert!(matches!(wrong_kind, Err(AppError::PromoCodeScopeMismatch)));

    assert_eq!(used_count(&db, code.id).await, 0);
}

#[tokio::test]
async fn test_lookup_is_case_insensitive() {
    let db = setup_db().await;
    let svc = services(&db);
    seed_promo(&db, "SPRING25", DiscountType::Percentage, 25, None, None).await;

    let found = svc.promo_codes.find_by_code(&db, "  spring25 ").await.unwrap();
    assert!(found.is_some());
    assert!(svc.promo_codes.find_by_code(&db, "").await.unwrap().is_none());
}

fn create_request(code: &str) -> CreatePromoCodeRequest {
    CreatePromoCodeRequest {
        code: code.to_string(),
        description: Some("Autumn campaign".to_string()),
        discount_type: DiscountType::Percentage,
        discount_value: 20,
        min_amount: 0,
        max_uses: Some(50),
        event_id: None,
        valid_from: None,
        valid_until: None,
        is_active: true,
    }
}

#[tokio::test]
async fn test_admin_create_normalizes_and_rejects_duplicates() {
    let db = setup_db().await;
    let svc = services(&db);

    let created = svc.promo_codes.create(create_request(" autumn20 ")).await.unwrap();
    assert_eq!(created.code, "AUTUMN20");
    assert_eq!(created.used_count, 0);
    assert_eq!(created.remaining_uses, Some(50));

    let duplicate = svc.promo_codes.create(create_request("AUTUMN20")).await;
    assert!(matches!(duplicate, Err(AppError::ValidationError(_))));
}

#[tokio::test]
async fn test_admin_create_rejects_invalid_rules() {
    let db = setup_db().await;
    let svc = services(&db);

    let mut over_hundred = create_request("TOOMUCH");
    over_hundred.discount_value = 120;
    assert!(matches!(
        svc.promo_codes.create(over_hundred).await,
        Err(AppError::ValidationError(_))
    ));

    let mut zero_uses = create_request("NOUSE");
    zero_uses.max_uses = Some(0);
    assert!(matches!(
        svc.promo_codes.create(zero_uses).await,
        Err(AppError::ValidationError(_))
    ));

    let mut missing_event = create_request("GHOST");
    missing_event.event_id = Some(999);
    assert!(matches!(
        svc.promo_codes.create(missing_event).await,
        Err(AppError::ValidationError(_))
    ));
}

#[tokio::test]
async fn test_admin_list_filters_by_active_flag() {
    let db = setup_db().await;
    let svc = services(&db);
    let a = svc.promo_codes.create(create_request("CODEA")).await.unwrap();
    svc.promo_codes.create(create_request("CODEB")).await.unwrap();
    svc.promo_codes.set_active(a.id, false).await.unwrap();

    let active = svc
        .promo_codes
        .list(&PromoCodeQuery {
            page: None,
            per_page: None,
            is_active: Some(true),
            event_id: None,
        })
        .await
        .unwrap();
    assert_eq!(active.total, 1);
    assert_eq!(active.data[0].code, "CODEB");

    let fetched = svc.promo_codes.get(a.id).await.unwrap();
    assert!(!fetched.is_active);
    assert!(matches!(
        svc.promo_codes.get(9999).await,
        Err(AppError::NotFound(_))
    ));
}
