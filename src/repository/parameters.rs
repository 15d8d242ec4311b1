//! System parameters repository

use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use crate::{error::AppResult, models::settings::SystemParameter};

#[derive(Clone)]
pub struct ParametersRepository {
    pool: Pool<Postgres>,
}

impl ParametersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// All stored parameters
    pub async fn list(&self) -> AppResult<Vec<SystemParameter>> {
        let rows = sqlx::query_as::<_, SystemParameter>(
            "SELECT key, value, updated_at FROM system_parameters ORDER BY key",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Insert or replace a parameter
    pub async fn upsert(&self, key: &str, value: &str) -> AppResult<SystemParameter> {
        let row = sqlx::query_as::<_, SystemParameter>(
            r#"
            INSERT INTO system_parameters (key, value, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
            RETURNING key, value, updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Remove a stored value so the configured default applies again
    pub async fn delete(&self, key: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM system_parameters WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Claim today's run of a job; false when it already ran
    pub async fn claim_job_run(&self, job: &str, today: NaiveDate) -> AppResult<bool> {
        let claimed = sqlx::query_scalar::<_, String>(
            r#"
            INSERT INTO scheduler_runs (job, last_run) VALUES ($1, $2)
            ON CONFLICT (job) DO UPDATE SET last_run = EXCLUDED.last_run
            WHERE scheduler_runs.last_run < EXCLUDED.last_run
            RETURNING job
            "#,
        )
        .bind(job)
        .bind(today)
        .fetch_optional(&self.pool)
        .await?;
        Ok(claimed.is_some())
    }
}
