use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    auth::AuthService,
    domain::*,
    error::{AppError, Result},
    repository::{AccessCodeRepository, AuditRepository, CompanyRepository, UserRepository},
};

const CODE_PREFIX: &str = "EMP";
const CODE_LEN: usize = 6;
const MAX_GENERATION_ATTEMPTS: usize = 10;

#[derive(Debug, Serialize)]
pub struct GeneratedCode {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

pub struct VerifiedEmployee {
    pub user: User,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Staff sign-in without passwords: the patron generates a short-lived
/// one-time code for an employee, the employee exchanges it (with their
/// phone number) for a signed session credential.
pub struct EmployeeAuthService {
    user_repo: Arc<dyn UserRepository>,
    company_repo: Arc<dyn CompanyRepository>,
    access_code_repo: Arc<dyn AccessCodeRepository>,
    audit_repo: Arc<dyn AuditRepository>,
    auth_service: Arc<AuthService>,
    code_ttl: Duration,
    token_ttl: Duration,
}

impl EmployeeAuthService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        company_repo: Arc<dyn CompanyRepository>,
        access_code_repo: Arc<dyn AccessCodeRepository>,
        audit_repo: Arc<dyn AuditRepository>,
        auth_service: Arc<AuthService>,
        code_ttl_minutes: i64,
        token_ttl_hours: i64,
    ) -> Self {
        Self {
            user_repo,
            company_repo,
            access_code_repo,
            audit_repo,
            auth_service,
            code_ttl: Duration::minutes(code_ttl_minutes),
            token_ttl: Duration::hours(token_ttl_hours),
        }
    }

    pub async fn generate_code(&self, employee_id: Uuid, actor: &User) -> Result<GeneratedCode> {
        if actor.role != Role::Patron {
            return Err(AppError::Forbidden);
        }

        let employee = self
            .user_repo
            .find_by_id(employee_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Employee not found".to_string()))?;

        if !employee.role.is_staff() || employee.status != UserStatus::Active {
            return Err(AppError::InvalidState(
                "Employee cannot receive access codes".to_string(),
            ));
        }
        let company_id = employee
            .company_id
            .ok_or_else(|| AppError::InvalidState("Employee has no company".to_string()))?;

        let company = self
            .company_repo
            .find_by_id(company_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Company not found".to_string()))?;
        if company.owner_id != actor.id {
            return Err(AppError::Forbidden);
        }

        // Regenerate on collision with a live code of the same company.
        let mut code = None;
        for _ in 0..MAX_GENERATION_ATTEMPTS {
            let candidate = format!("{}{}", CODE_PREFIX, super::codes::random_code(CODE_LEN));
            if !self
                .access_code_repo
                .active_code_exists(company_id, &candidate)
                .await?
            {
                code = Some(candidate);
                break;
            }
        }
        let code = code.ok_or_else(|| {
            AppError::Internal("Could not generate a unique access code".to_string())
        })?;

        let now = Utc::now();
        let access_code = AccessCode {
            id: Uuid::new_v4(),
            employee_id,
            company_id,
            code: code.clone(),
            expires_at: now + self.code_ttl,
            consumed_at: None,
            created_at: now,
        };
        self.access_code_repo.insert(access_code.clone()).await?;

        self.audit_repo
            .record(AuditRecord {
                id: Uuid::new_v4(),
                actor_id: actor.id,
                company_id: Some(company_id),
                action: AuditAction::CodeGenerated,
                description: format!("Access code generated for {}", employee.full_name),
                metadata: serde_json::json!({
                    "employee_id": employee_id,
                    "expires_at": access_code.expires_at,
                }),
                created_at: now,
            })
            .await?;

        Ok(GeneratedCode {
            code,
            expires_at: access_code.expires_at,
        })
    }

    /// Any mismatch (unknown phone, wrong code, expired, already used,
    /// suspended account or company) is the same Unauthorized to the caller.
    pub async fn verify_code(
        &self,
        phone: &str,
        country_code: &str,
        code: &str,
    ) -> Result<VerifiedEmployee> {
        let user = self
            .user_repo
            .find_by_phone(country_code, phone)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !user.role.is_staff() || user.status != UserStatus::Active {
            return Err(AppError::Unauthorized);
        }
        let company_id = user.company_id.ok_or(AppError::Unauthorized)?;

        let company = self
            .company_repo
            .find_by_id(company_id)
            .await?
            .ok_or(AppError::Unauthorized)?;
        if company.status == CompanyStatus::Suspended {
            return Err(AppError::Unauthorized);
        }

        // Consumption is the one-time gate; checked last so a rejected
        // sign-in never burns a still-valid code.
        if !self.access_code_repo.consume(user.id, code).await? {
            return Err(AppError::Unauthorized);
        }

        let (token, expires_at) =
            self.auth_service
                .issue_employee_token(user.id, user.role, company_id, self.token_ttl)?;

        tracing::info!("Employee {} signed in with access code", user.id);

        Ok(VerifiedEmployee {
            user,
            token,
            expires_at,
        })
    }
}
