use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

use tikiti::{
    auth::AuthService,
    config::Settings,
    domain::*,
    error::AppError,
    events::{EventBus, InMemoryEventBus},
    repository::{AccessCodeRepository, SqliteAccessCodeRepository},
    service::ServiceContext,
};

async fn setup() -> anyhow::Result<Arc<ServiceContext>> {
    let pool = SqlitePool::connect(":memory:").await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let auth_service = Arc::new(AuthService::new(pool.clone(), "test-secret".to_string()));
    let event_bus: Arc<dyn EventBus> = Arc::new(InMemoryEventBus::new());
    Ok(Arc::new(ServiceContext::new(
        pool,
        event_bus,
        auth_service,
        &Settings::default(),
    )))
}

struct Fixture {
    patron: User,
    caissier: User,
}

async fn seed(ctx: &ServiceContext) -> anyhow::Result<Fixture> {
    let (patron, company) = ctx
        .company_service
        .register(RegisterCompanyRequest {
            company_name: format!("Express {}", Uuid::new_v4()),
            full_name: "Awa Patron".to_string(),
            phone: format!("6{}", &Uuid::new_v4().simple().to_string()[..8]),
            country_code: "+237".to_string(),
            email: format!("{}@example.com", Uuid::new_v4().simple()),
            password: "secret-password".to_string(),
        })
        .await?;

    let admin = ctx
        .user_repo
        .create(User {
            id: Uuid::new_v4(),
            full_name: "Platform Admin".to_string(),
            phone: format!("5{}", &Uuid::new_v4().simple().to_string()[..8]),
            country_code: "+237".to_string(),
            email: None,
            password_hash: None,
            role: Role::Admin,
            company_id: None,
            status: UserStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .await?;
    ctx.company_service.approve(company.id, &admin).await?;

    let caissier = ctx
        .company_service
        .create_employee(
            CreateEmployeeRequest {
                full_name: "Brice Caissier".to_string(),
                phone: format!("7{}", &Uuid::new_v4().simple().to_string()[..8]),
                country_code: "+237".to_string(),
                role: Role::Caissier,
            },
            &patron,
        )
        .await?;

    Ok(Fixture { patron, caissier })
}

#[tokio::test]
async fn generated_code_signs_the_employee_in_exactly_once() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let fx = seed(&ctx).await?;

    let generated = ctx
        .employee_auth_service
        .generate_code(fx.caissier.id, &fx.patron)
        .await?;
    assert!(generated.code.starts_with("EMP"));
    assert_eq!(generated.code.len(), 9);
    assert!(generated.expires_at > Utc::now());

    let verified = ctx
        .employee_auth_service
        .verify_code(&fx.caissier.phone, &fx.caissier.country_code, &generated.code)
        .await?;
    assert_eq!(verified.user.id, fx.caissier.id);
    assert!(!verified.token.is_empty());

    // The credential decodes back to the employee and their company.
    let claims = ctx.auth_service.verify_employee_token(&verified.token)?;
    assert_eq!(claims.sub, fx.caissier.id.to_string());
    assert_eq!(claims.company_id, fx.caissier.company_id.unwrap().to_string());

    // The code is one-time: a second exchange is rejected.
    let replay = ctx
        .employee_auth_service
        .verify_code(&fx.caissier.phone, &fx.caissier.country_code, &generated.code)
        .await;
    assert!(matches!(replay, Err(AppError::Unauthorized)));

    Ok(())
}

#[tokio::test]
async fn wrong_code_or_wrong_phone_is_unauthorized() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let fx = seed(&ctx).await?;

    let generated = ctx
        .employee_auth_service
        .generate_code(fx.caissier.id, &fx.patron)
        .await?;

    let wrong_code = ctx
        .employee_auth_service
        .verify_code(&fx.caissier.phone, &fx.caissier.country_code, "EMPXXXXXX")
        .await;
    assert!(matches!(wrong_code, Err(AppError::Unauthorized)));

    let wrong_phone = ctx
        .employee_auth_service
        .verify_code("600000000", "+237", &generated.code)
        .await;
    assert!(matches!(wrong_phone, Err(AppError::Unauthorized)));

    // Neither failure burned the code.
    let verified = ctx
        .employee_auth_service
        .verify_code(&fx.caissier.phone, &fx.caissier.country_code, &generated.code)
        .await?;
    assert_eq!(verified.user.id, fx.caissier.id);

    Ok(())
}

#[tokio::test]
async fn expired_codes_are_rejected() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let fx = seed(&ctx).await?;

    let repo = SqliteAccessCodeRepository::new(ctx.db_pool.clone());
    let now = Utc::now();
    repo.insert(AccessCode {
        id: Uuid::new_v4(),
        employee_id: fx.caissier.id,
        company_id: fx.caissier.company_id.unwrap(),
        code: "EMPSTALE1".to_string(),
        expires_at: now - Duration::minutes(1),
        consumed_at: None,
        created_at: now - Duration::minutes(20),
    })
    .await?;

    let result = ctx
        .employee_auth_service
        .verify_code(&fx.caissier.phone, &fx.caissier.country_code, "EMPSTALE1")
        .await;
    assert!(matches!(result, Err(AppError::Unauthorized)));

    Ok(())
}

#[tokio::test]
async fn only_the_owning_patron_may_generate_codes() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let fx = seed(&ctx).await?;

    // Staff below patron cannot mint codes.
    let by_caissier = ctx
        .employee_auth_service
        .generate_code(fx.caissier.id, &fx.caissier)
        .await;
    assert!(matches!(by_caissier, Err(AppError::Forbidden)));

    // A patron of a different company cannot either.
    let other = seed(&ctx).await?;
    let cross_company = ctx
        .employee_auth_service
        .generate_code(fx.caissier.id, &other.patron)
        .await;
    assert!(matches!(cross_company, Err(AppError::Forbidden)));

    Ok(())
}

#[tokio::test]
async fn codes_cannot_be_issued_to_clients() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let fx = seed(&ctx).await?;

    let client = ctx
        .user_repo
        .create(User {
            id: Uuid::new_v4(),
            full_name: "Chantal Client".to_string(),
            phone: format!("9{}", &Uuid::new_v4().simple().to_string()[..8]),
            country_code: "+237".to_string(),
            email: None,
            password_hash: None,
            role: Role::Client,
            company_id: None,
            status: UserStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .await?;

    let result = ctx
        .employee_auth_service
        .generate_code(client.id, &fx.patron)
        .await;
    assert!(matches!(result, Err(AppError::InvalidState(_))));

    Ok(())
}

#[tokio::test]
async fn suspended_company_staff_cannot_sign_in() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let fx = seed(&ctx).await?;

    let generated = ctx
        .employee_auth_service
        .generate_code(fx.caissier.id, &fx.patron)
        .await?;

    let admin = ctx
        .user_repo
        .create(User {
            id: Uuid::new_v4(),
            full_name: "Platform Admin".to_string(),
            phone: format!("4{}", &Uuid::new_v4().simple().to_string()[..8]),
            country_code: "+237".to_string(),
            email: None,
            password_hash: None,
            role: Role::Admin,
            company_id: None,
            status: UserStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .await?;
    ctx.company_service
        .suspend(fx.caissier.company_id.unwrap(), &admin)
        .await?;

    let result = ctx
        .employee_auth_service
        .verify_code(&fx.caissier.phone, &fx.caissier.country_code, &generated.code)
        .await;
    assert!(matches!(result, Err(AppError::Unauthorized)));

    Ok(())
}
