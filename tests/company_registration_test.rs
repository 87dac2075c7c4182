use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

use tikiti::{
    auth::AuthService,
    config::Settings,
    domain::*,
    error::AppError,
    events::{EventBus, InMemoryEventBus},
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

fn registration(name: &str, email: &str, phone: &str) -> RegisterCompanyRequest {
    RegisterCompanyRequest {
        company_name: name.to_string(),
        full_name: "Awa Patron".to_string(),
        phone: phone.to_string(),
        country_code: "+237".to_string(),
        email: email.to_string(),
        password: "secret-password".to_string(),
    }
}

async fn make_admin(ctx: &ServiceContext) -> anyhow::Result<User> {
    Ok(ctx
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
        .await?)
}

#[tokio::test]
async fn registration_creates_patron_and_pending_company_together() -> anyhow::Result<()> {
    let ctx = setup().await?;

    let (patron, company) = ctx
        .company_service
        .register(registration("Garanti Express", "awa@example.com", "690111222"))
        .await?;

    assert_eq!(patron.role, Role::Patron);
    assert_eq!(patron.company_id, Some(company.id));
    assert_eq!(company.owner_id, patron.id);
    assert_eq!(company.status, CompanyStatus::Pending);
    assert!(patron.password_hash.is_some());

    let stored = ctx
        .user_repo
        .find_by_email("awa@example.com")
        .await?
        .expect("patron persisted");
    assert_eq!(stored.id, patron.id);
    assert!(ctx.company_repo.find_by_id(company.id).await?.is_some());

    Ok(())
}

#[tokio::test]
async fn duplicate_email_phone_or_name_is_rejected() -> anyhow::Result<()> {
    let ctx = setup().await?;

    ctx.company_service
        .register(registration("Garanti Express", "awa@example.com", "690111222"))
        .await?;

    let email = ctx
        .company_service
        .register(registration("Autre Express", "awa@example.com", "690999888"))
        .await;
    assert!(matches!(email, Err(AppError::Conflict(_))));

    let phone = ctx
        .company_service
        .register(registration("Autre Express", "autre@example.com", "690111222"))
        .await;
    assert!(matches!(phone, Err(AppError::Conflict(_))));

    let name = ctx
        .company_service
        .register(registration("Garanti Express", "autre@example.com", "690999888"))
        .await;
    assert!(matches!(name, Err(AppError::Conflict(_))));

    // Failed attempts left no orphan accounts behind.
    let users = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(&ctx.db_pool)
        .await?;
    assert_eq!(users, 1);

    Ok(())
}

#[tokio::test]
async fn approval_is_admin_only_and_idempotence_is_rejected() -> anyhow::Result<()> {
    let ctx = setup().await?;

    let (patron, company) = ctx
        .company_service
        .register(registration("Garanti Express", "awa@example.com", "690111222"))
        .await?;

    // The patron cannot approve their own company.
    let by_patron = ctx.company_service.approve(company.id, &patron).await;
    assert!(matches!(by_patron, Err(AppError::Forbidden)));

    let admin = make_admin(&ctx).await?;
    let approved = ctx.company_service.approve(company.id, &admin).await?;
    assert_eq!(approved.status, CompanyStatus::Approved);

    let again = ctx.company_service.approve(company.id, &admin).await;
    assert!(matches!(again, Err(AppError::InvalidState(_))));

    Ok(())
}

#[tokio::test]
async fn suspension_blocks_and_audit_trail_records_the_lifecycle() -> anyhow::Result<()> {
    let ctx = setup().await?;

    let (_, company) = ctx
        .company_service
        .register(registration("Garanti Express", "awa@example.com", "690111222"))
        .await?;
    let admin = make_admin(&ctx).await?;

    ctx.company_service.approve(company.id, &admin).await?;
    let suspended = ctx.company_service.suspend(company.id, &admin).await?;
    assert_eq!(suspended.status, CompanyStatus::Suspended);

    let trail = ctx.audit_repo.list(Some(company.id), 50, 0).await?;
    let actions: Vec<AuditAction> = trail.iter().map(|r| r.action).collect();
    assert!(actions.contains(&AuditAction::CompanyRegistered));
    assert!(actions.contains(&AuditAction::CompanyApproved));
    assert!(actions.contains(&AuditAction::CompanySuspended));

    Ok(())
}

#[tokio::test]
async fn login_works_with_registered_credentials() -> anyhow::Result<()> {
    let ctx = setup().await?;

    let (patron, _) = ctx
        .company_service
        .register(registration("Garanti Express", "awa@example.com", "690111222"))
        .await?;

    let hash = patron.password_hash.as_deref().expect("patron has a password");
    assert!(AuthService::verify_password("secret-password", hash).await?);
    assert!(!AuthService::verify_password("wrong-password", hash).await?);

    let (session, token) = ctx.auth_service.create_session(patron.id, 24).await?;
    assert_eq!(session.user_id, patron.id);

    let found = ctx
        .auth_service
        .validate_session(&token)
        .await?
        .expect("session resolves");
    assert_eq!(found.user_id, patron.id);

    ctx.auth_service.invalidate_session(&token).await?;
    assert!(ctx.auth_service.validate_session(&token).await?.is_none());

    Ok(())
}
