use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{AuditAction, AuditRecord},
    error::{AppError, Result},
    repository::AuditRepository,
};

#[derive(FromRow)]
struct AuditRow {
    id: String,
    actor_id: String,
    company_id: Option<String>,
    action: String,
    description: String,
    metadata: String,
    created_at: NaiveDateTime,
}

pub struct SqliteAuditRepository {
    pool: SqlitePool,
}

impl SqliteAuditRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_record(row: AuditRow) -> Result<AuditRecord> {
        Ok(AuditRecord {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            actor_id: Uuid::parse_str(&row.actor_id)
                .map_err(|e| AppError::Database(e.to_string()))?,
            company_id: row
                .company_id
                .map(|id| Uuid::parse_str(&id))
                .transpose()
                .map_err(|e| AppError::Database(e.to_string()))?,
            action: AuditAction::parse(&row.action)
                .ok_or_else(|| AppError::Database(format!("Invalid audit action: {}", row.action)))?,
            description: row.description,
            metadata: serde_json::from_str(&row.metadata)
                .map_err(|e| AppError::Database(e.to_string()))?,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        })
    }
}

#[async_trait]
impl AuditRepository for SqliteAuditRepository {
    async fn record(&self, record: AuditRecord) -> Result<()> {
        let id_str = record.id.to_string();
        let actor_id_str = record.actor_id.to_string();
        let company_id_str = record.company_id.map(|id| id.to_string());
        let metadata_str = record.metadata.to_string();

        sqlx::query(
            r#"
            INSERT INTO audit_log (id, actor_id, company_id, action, description, metadata, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id_str)
        .bind(&actor_id_str)
        .bind(&company_id_str)
        .bind(record.action.as_str())
        .bind(&record.description)
        .bind(&metadata_str)
        .bind(record.created_at.naive_utc())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    async fn list(
        &self,
        company_id: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AuditRecord>> {
        let company_id_str = company_id.map(|id| id.to_string());
        let rows = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT id, actor_id, company_id, action, description, metadata, created_at
            FROM audit_log
            WHERE (? IS NULL OR company_id = ?)
            ORDER BY created_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(&company_id_str)
        .bind(&company_id_str)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_record).collect()
    }
}
