use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    domain::Role,
    error::{AppError, Result},
};

/// Claims of the signed credential handed out by access-code sign-in.
/// Scoped to the employee, their role, and their company.
#[derive(Debug, Serialize, Deserialize)]
pub struct EmployeeClaims {
    pub sub: String,
    pub role: String,
    pub company_id: String,
    pub exp: usize,
}

pub fn issue_employee_token(
    secret: &str,
    employee_id: Uuid,
    role: Role,
    company_id: Uuid,
    valid_for: Duration,
) -> Result<(String, DateTime<Utc>)> {
    let expires_at = Utc::now() + valid_for;
    let claims = EmployeeClaims {
        sub: employee_id.to_string(),
        role: role.as_str().to_string(),
        company_id: company_id.to_string(),
        exp: expires_at.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token signing failed: {}", e)))?;

    Ok((token, expires_at))
}

/// Expired or tampered tokens come back as Unauthorized, never as an
/// internal error.
pub fn verify_employee_token(secret: &str, token: &str) -> Result<EmployeeClaims> {
    let data = decode::<EmployeeClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?;

    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_claims() {
        let employee = Uuid::new_v4();
        let company = Uuid::new_v4();
        let (token, _expires) = issue_employee_token(
            "test-secret",
            employee,
            Role::Caissier,
            company,
            Duration::hours(8),
        )
        .unwrap();

        let claims = verify_employee_token("test-secret", &token).unwrap();
        assert_eq!(claims.sub, employee.to_string());
        assert_eq!(claims.role, "Caissier");
        assert_eq!(claims.company_id, company.to_string());
    }

    #[test]
    fn rejects_wrong_secret() {
        let (token, _) = issue_employee_token(
            "test-secret",
            Uuid::new_v4(),
            Role::Patron,
            Uuid::new_v4(),
            Duration::hours(8),
        )
        .unwrap();

        assert!(verify_employee_token("other-secret", &token).is_err());
    }
}
