//! Resource collections repository

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{map_unique_violation, AppError, AppResult},
    models::{
        catalog::ReferenceQuery,
        resource::{Resource, ResourceInput, ResourceUsage},
    },
};

use super::like_pattern;

const RESOURCE_SELECT: &str = r#"
    SELECT r.id, r.name, r.code, r.sequence, r.description, r.policy,
           r.max_books_per_borrower, r.default_borrowing_days, r.allow_borrowing,
           r.color, r.icon, r.active, r.created_at,
           (SELECT COUNT(*) FROM resource_books rb JOIN books b ON b.id = rb.book_id
             WHERE rb.resource_id = r.id AND b.active) AS book_count,
           (SELECT COUNT(*) FROM resource_books rb JOIN book_quants q ON q.book_id = rb.book_id
             WHERE rb.resource_id = r.id AND q.active AND q.state = 'available'
               AND q.registration_number IS NOT NULL) AS available_copies,
           (SELECT COUNT(*) FROM resource_books rb JOIN book_quants q ON q.book_id = rb.book_id
             WHERE rb.resource_id = r.id AND q.active AND q.state = 'borrowed') AS borrowed_copies
    FROM resources r
"#;

/// Copies of the resource a borrower has out, `$1` borrower, `r` the resource
const CURRENT_COPIES: &str = r#"
    (SELECT COUNT(*) FROM borrowing_quant_lines ql
       JOIN borrowings br ON br.id = ql.borrowing_id
       JOIN book_quants q ON q.id = ql.quant_id
       JOIN resource_books rb ON rb.book_id = q.book_id AND rb.resource_id = r.id
      WHERE br.borrower_id = $1 AND ql.state IN ('borrowed', 'overdue'))
"#;

/// Usage of every active resource holding one of `book_ids`, one entry in
/// `book_ids` per copy being lent
pub(crate) async fn usage_for_loan(
    conn: &mut PgConnection,
    borrower_id: i32,
    book_ids: &[i32],
) -> AppResult<Vec<ResourceUsage>> {
    let sql = format!(
        r#"
        SELECT r.id AS resource_id, r.name AS resource_name, r.allow_borrowing,
               r.max_books_per_borrower AS max_books,
               {} AS current,
               (SELECT COUNT(*) FROM UNNEST($2::int[]) AS lent(book_id)
                  JOIN resource_books rb ON rb.book_id = lent.book_id AND rb.resource_id = r.id)
                 AS requested
        FROM resources r
        WHERE r.active
          AND EXISTS (SELECT 1 FROM resource_books rb
                      WHERE rb.resource_id = r.id AND rb.book_id = ANY($2))
        ORDER BY r.sequence, r.name
        "#,
        CURRENT_COPIES
    );
    let rows = sqlx::query_as::<_, ResourceUsage>(&sql)
        .bind(borrower_id)
        .bind(book_ids)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows)
}

#[derive(Clone)]
pub struct ResourcesRepository {
    pool: Pool<Postgres>,
}

impl ResourcesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn list(&self, query: &ReferenceQuery) -> AppResult<Vec<Resource>> {
        let sql = format!(
            "{} WHERE ($1::text IS NULL OR r.name ILIKE $1 OR r.code ILIKE $1) AND ($2 OR r.active) ORDER BY r.sequence, r.name",
            RESOURCE_SELECT
        );
        let rows = sqlx::query_as::<_, Resource>(&sql)
            .bind(query.name.as_deref().map(like_pattern))
            .bind(query.include_inactive.unwrap_or(false))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Resource> {
        let sql = format!("{} WHERE r.id = $1", RESOURCE_SELECT);
        sqlx::query_as::<_, Resource>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Resource with id {} not found", id)))
    }

    pub async fn create(&self, data: &ResourceInput) -> AppResult<Resource> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO resources (
                name, code, sequence, description, policy, max_books_per_borrower,
                default_borrowing_days, allow_borrowing, color, icon
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, COALESCE($10, 'fa-book'))
            RETURNING id
            "#,
        )
        .bind(data.name.trim())
        .bind(data.code.trim().to_uppercase())
        .bind(data.sequence)
        .bind(&data.description)
        .bind(&data.policy)
        .bind(data.max_books_per_borrower)
        .bind(data.default_borrowing_days)
        .bind(data.allow_borrowing)
        .bind(data.color)
        .bind(&data.icon)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, format!("Resource code '{}' already exists", data.code)))?;
        self.get_by_id(id).await
    }

    pub async fn update(&self, id: i32, data: &ResourceInput) -> AppResult<Resource> {
        let result = sqlx::query(
            r#"
            UPDATE resources
            SET name = $2, code = $3, sequence = $4, description = $5, policy = $6,
                max_books_per_borrower = $7, default_borrowing_days = $8, allow_borrowing = $9,
                color = $10, icon = COALESCE($11, icon)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(data.name.trim())
        .bind(data.code.trim().to_uppercase())
        .bind(data.sequence)
        .bind(&data.description)
        .bind(&data.policy)
        .bind(data.max_books_per_borrower)
        .bind(data.default_borrowing_days)
        .bind(data.allow_borrowing)
        .bind(data.color)
        .bind(&data.icon)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, format!("Resource code '{}' already exists", data.code)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Resource with id {} not found", id)));
        }
        self.get_by_id(id).await
    }

    pub async fn archive(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("UPDATE resources SET active = FALSE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Resource with id {} not found", id)));
        }
        Ok(())
    }

    /// Ids of the books assigned to a resource
    pub async fn book_ids(&self, id: i32) -> AppResult<Vec<i32>> {
        let ids = sqlx::query_scalar::<_, i32>(
            "SELECT book_id FROM resource_books WHERE resource_id = $1 ORDER BY book_id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// Attach books, ignoring those already assigned; returns the number added
    pub async fn add_books(&self, id: i32, book_ids: &[i32]) -> AppResult<u64> {
        let mut tx = self.pool.begin().await?;

        let known: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books WHERE id = ANY($1)")
            .bind(book_ids)
            .fetch_one(&mut *tx)
            .await?;
        let mut distinct = book_ids.to_vec();
        distinct.sort_unstable();
        distinct.dedup();
        if known != distinct.len() as i64 {
            return Err(AppError::NotFound("One or more books do not exist".to_string()));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO resource_books (resource_id, book_id)
            SELECT $1, UNNEST($2::int[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(id)
        .bind(&distinct)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(result.rows_affected())
    }

    /// Detach books; returns the number removed
    pub async fn remove_books(&self, id: i32, book_ids: &[i32]) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM resource_books WHERE resource_id = $1 AND book_id = ANY($2)")
            .bind(id)
            .bind(book_ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Copies a borrower holds from one resource
    pub async fn usage(&self, id: i32, borrower_id: i32) -> AppResult<ResourceUsage> {
        let sql = format!(
            r#"
            SELECT r.id AS resource_id, r.name AS resource_name, r.allow_borrowing,
                   r.max_books_per_borrower AS max_books,
                   {} AS current,
                   0::bigint AS requested
            FROM resources r
            WHERE r.id = $2
            "#,
            CURRENT_COPIES
        );
        sqlx::query_as::<_, ResourceUsage>(&sql)
            .bind(borrower_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Resource with id {} not found", id)))
    }
}
