use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    auth::AuthService,
    domain::*,
    error::{AppError, Result},
    events::{self, EventBus},
    repository::{AuditRepository, CompanyRepository, UserRepository},
    service::reservation_service::insert_audit,
};

/// Company onboarding and administration: registration (patron account and
/// pending company created as one transaction), admin approval/suspension,
/// and staff account creation.
pub struct CompanyService {
    pool: SqlitePool,
    user_repo: Arc<dyn UserRepository>,
    company_repo: Arc<dyn CompanyRepository>,
    audit_repo: Arc<dyn AuditRepository>,
    event_bus: Arc<dyn EventBus>,
}

impl CompanyService {
    pub fn new(
        pool: SqlitePool,
        user_repo: Arc<dyn UserRepository>,
        company_repo: Arc<dyn CompanyRepository>,
        audit_repo: Arc<dyn AuditRepository>,
        event_bus: Arc<dyn EventBus>,
    ) -> Self {
        Self {
            pool,
            user_repo,
            company_repo,
            audit_repo,
            event_bus,
        }
    }

    pub async fn register(&self, request: RegisterCompanyRequest) -> Result<(User, Company)> {
        if self.user_repo.find_by_email(&request.email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }
        if self
            .user_repo
            .find_by_phone(&request.country_code, &request.phone)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Phone already registered".to_string()));
        }
        if self
            .company_repo
            .find_by_name(&request.company_name)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Company name already taken".to_string()));
        }

        let password_hash = AuthService::hash_password(&request.password).await?;
        let now = Utc::now();
        let user_id = Uuid::new_v4();
        let company_id = Uuid::new_v4();

        let user = User {
            id: user_id,
            full_name: request.full_name,
            phone: request.phone,
            country_code: request.country_code,
            email: Some(request.email),
            password_hash: Some(password_hash),
            role: Role::Patron,
            company_id: Some(company_id),
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
        };
        let company = Company {
            id: company_id,
            name: request.company_name,
            owner_id: user_id,
            status: CompanyStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        // Patron and company land together or not at all.
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (
                id, full_name, phone, country_code, email, password_hash,
                role, company_id, status, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.full_name)
        .bind(&user.phone)
        .bind(&user.country_code)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(company_id.to_string())
        .bind(user.status.as_str())
        .bind(now.naive_utc())
        .bind(now.naive_utc())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO companies (id, name, owner_id, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(company.id.to_string())
        .bind(&company.name)
        .bind(user.id.to_string())
        .bind(company.status.as_str())
        .bind(now.naive_utc())
        .bind(now.naive_utc())
        .execute(&mut *tx)
        .await?;

        insert_audit(
            &mut tx,
            user_id,
            Some(company_id),
            AuditAction::CompanyRegistered,
            &format!("Company {} registered", company.name),
            json!({"company_id": company_id, "owner_id": user_id}),
        )
        .await?;

        tx.commit().await?;

        tracing::info!("Company {} registered, awaiting approval", company.id);

        Ok((user, company))
    }

    pub async fn approve(&self, company_id: Uuid, actor: &User) -> Result<Company> {
        if actor.role != Role::Admin {
            return Err(AppError::Forbidden);
        }

        let company = self
            .company_repo
            .find_by_id(company_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Company not found".to_string()))?;
        if company.status == CompanyStatus::Approved {
            return Err(AppError::InvalidState("Company is already approved".to_string()));
        }

        let updated = self
            .company_repo
            .update_status(company_id, CompanyStatus::Approved)
            .await?;

        self.record_status_change(actor, &updated, AuditAction::CompanyApproved)
            .await?;
        self.notify_status_change(&updated, "approved").await;

        Ok(updated)
    }

    pub async fn suspend(&self, company_id: Uuid, actor: &User) -> Result<Company> {
        if actor.role != Role::Admin {
            return Err(AppError::Forbidden);
        }

        let company = self
            .company_repo
            .find_by_id(company_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Company not found".to_string()))?;
        if company.status == CompanyStatus::Suspended {
            return Err(AppError::InvalidState("Company is already suspended".to_string()));
        }

        let updated = self
            .company_repo
            .update_status(company_id, CompanyStatus::Suspended)
            .await?;

        self.record_status_change(actor, &updated, AuditAction::CompanySuspended)
            .await?;
        self.notify_status_change(&updated, "suspended").await;

        Ok(updated)
    }

    /// Patron (owner) or gestionnaire adds staff to their own company.
    pub async fn create_employee(
        &self,
        request: CreateEmployeeRequest,
        actor: &User,
    ) -> Result<User> {
        if !matches!(actor.role, Role::Patron | Role::Gestionnaire) {
            return Err(AppError::Forbidden);
        }
        let company_id = actor.company_id.ok_or(AppError::Forbidden)?;

        if !matches!(request.role, Role::Gestionnaire | Role::Caissier) {
            return Err(AppError::BadRequest(
                "Employees can only be gestionnaire or caissier".to_string(),
            ));
        }
        if self
            .user_repo
            .find_by_phone(&request.country_code, &request.phone)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Phone already registered".to_string()));
        }

        let now = Utc::now();
        let employee = self
            .user_repo
            .create(User {
                id: Uuid::new_v4(),
                full_name: request.full_name,
                phone: request.phone,
                country_code: request.country_code,
                email: None,
                password_hash: None,
                role: request.role,
                company_id: Some(company_id),
                status: UserStatus::Active,
                created_at: now,
                updated_at: now,
            })
            .await?;

        self.audit_repo
            .record(AuditRecord {
                id: Uuid::new_v4(),
                actor_id: actor.id,
                company_id: Some(company_id),
                action: AuditAction::EmployeeCreated,
                description: format!(
                    "{} {} added to company",
                    employee.role.as_str(),
                    employee.full_name
                ),
                metadata: json!({"employee_id": employee.id, "role": employee.role}),
                created_at: now,
            })
            .await?;

        Ok(employee)
    }

    async fn record_status_change(
        &self,
        actor: &User,
        company: &Company,
        action: AuditAction,
    ) -> Result<()> {
        self.audit_repo
            .record(AuditRecord {
                id: Uuid::new_v4(),
                actor_id: actor.id,
                company_id: Some(company.id),
                action,
                description: format!("Company {} is now {}", company.name, company.status.as_str()),
                metadata: json!({"company_id": company.id, "status": company.status}),
                created_at: Utc::now(),
            })
            .await
    }

    async fn notify_status_change(&self, company: &Company, verb: &str) {
        self.event_bus
            .publish(
                &events::company_room(company.id),
                events::NOTIFICATION,
                json!({
                    "company_id": company.id,
                    "status": company.status,
                    "message": format!("Your company has been {}", verb),
                }),
            )
            .await;
    }
}
