use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{Company, CompanyStatus},
    error::{AppError, Result},
    repository::CompanyRepository,
};

#[derive(FromRow)]
struct CompanyRow {
    id: String,
    name: String,
    owner_id: String,
    status: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqliteCompanyRepository {
    pool: SqlitePool,
}

impl SqliteCompanyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_company(row: CompanyRow) -> Result<Company> {
        Ok(Company {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            name: row.name,
            owner_id: Uuid::parse_str(&row.owner_id)
                .map_err(|e| AppError::Database(e.to_string()))?,
            status: CompanyStatus::parse(&row.status).ok_or_else(|| {
                AppError::Database(format!("Invalid company status: {}", row.status))
            })?,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }
}

#[async_trait]
impl CompanyRepository for SqliteCompanyRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Company>> {
        let id_str = id.to_string();
        let row = sqlx::query_as::<_, CompanyRow>(
            "SELECT id, name, owner_id, status, created_at, updated_at FROM companies WHERE id = ?",
        )
        .bind(id_str)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_company(r)?)),
            None => Ok(None),
        }
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Company>> {
        let row = sqlx::query_as::<_, CompanyRow>(
            "SELECT id, name, owner_id, status, created_at, updated_at FROM companies WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_company(r)?)),
            None => Ok(None),
        }
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Company>> {
        let rows = sqlx::query_as::<_, CompanyRow>(
            r#"
            SELECT id, name, owner_id, status, created_at, updated_at
            FROM companies
            ORDER BY created_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_company).collect()
    }

    async fn update_status(&self, id: Uuid, status: CompanyStatus) -> Result<Company> {
        let id_str = id.to_string();
        let now = Utc::now().naive_utc();

        let result = sqlx::query("UPDATE companies SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(now)
            .bind(&id_str)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Company not found".to_string()));
        }

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated company".to_string())
        })
    }
}
