use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    domain::AccessCode,
    error::{AppError, Result},
    repository::AccessCodeRepository,
};

pub struct SqliteAccessCodeRepository {
    pool: SqlitePool,
}

impl SqliteAccessCodeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessCodeRepository for SqliteAccessCodeRepository {
    async fn insert(&self, code: AccessCode) -> Result<AccessCode> {
        let id_str = code.id.to_string();
        let employee_id_str = code.employee_id.to_string();
        let company_id_str = code.company_id.to_string();

        sqlx::query(
            r#"
            INSERT INTO access_codes (
                id, employee_id, company_id, code, expires_at, consumed_at, created_at
            ) VALUES (?, ?, ?, ?, ?, NULL, ?)
            "#,
        )
        .bind(&id_str)
        .bind(&employee_id_str)
        .bind(&company_id_str)
        .bind(&code.code)
        .bind(code.expires_at.naive_utc())
        .bind(code.created_at.naive_utc())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(code)
    }

    async fn active_code_exists(&self, company_id: Uuid, code: &str) -> Result<bool> {
        let company_id_str = company_id.to_string();
        let now = Utc::now().naive_utc();

        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM access_codes
            WHERE company_id = ? AND code = ? AND consumed_at IS NULL AND expires_at > ?
            "#,
        )
        .bind(&company_id_str)
        .bind(code)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(count > 0)
    }

    async fn consume(&self, employee_id: Uuid, code: &str) -> Result<bool> {
        let employee_id_str = employee_id.to_string();
        let now = Utc::now().naive_utc();

        // The WHERE clause is the whole one-time guarantee: a second caller
        // finds consumed_at already set and affects zero rows.
        let result = sqlx::query(
            r#"
            UPDATE access_codes
            SET consumed_at = ?
            WHERE employee_id = ? AND code = ? AND consumed_at IS NULL AND expires_at > ?
            "#,
        )
        .bind(now)
        .bind(&employee_id_str)
        .bind(code)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
