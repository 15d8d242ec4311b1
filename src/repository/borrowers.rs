//! Borrowers repository

use chrono::NaiveDate;
use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::borrower::{Borrower, BorrowerQuery, BorrowerStats, CreateBorrower, UpdateBorrower},
};

use super::{like_pattern, next_sequence};

/// Borrower code from its sequence number
pub fn borrower_code(sequence: i32) -> String {
    format!("DG{:05}", sequence)
}

/// Insert a borrower with the next code, inside a caller transaction
pub(crate) async fn insert_borrower(
    conn: &mut PgConnection,
    data: &CreateBorrower,
    membership_date: NaiveDate,
    membership_expiry: NaiveDate,
) -> AppResult<Borrower> {
    let code = borrower_code(next_sequence(conn, "borrower").await?);

    let borrower = sqlx::query_as::<_, Borrower>(
        r#"
        INSERT INTO borrowers (
            name, borrower_code, email, phone, address, id_card, date_of_birth,
            borrower_type_id, membership_date, membership_expiry,
            max_books_override, max_days_override, notes
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING *
        "#,
    )
    .bind(data.name.trim())
    .bind(&code)
    .bind(&data.email)
    .bind(&data.phone)
    .bind(&data.address)
    .bind(&data.id_card)
    .bind(data.date_of_birth)
    .bind(data.borrower_type_id)
    .bind(membership_date)
    .bind(membership_expiry)
    .bind(data.max_books_override)
    .bind(data.max_days_override)
    .bind(&data.notes)
    .fetch_one(&mut *conn)
    .await?;

    Ok(borrower)
}

/// Copies currently out (borrowed or overdue) for a borrower
pub(crate) async fn count_active_copies(conn: &mut PgConnection, borrower_id: i32) -> AppResult<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM borrowing_quant_lines ql
        JOIN borrowings br ON br.id = ql.borrowing_id
        WHERE br.borrower_id = $1 AND ql.state IN ('borrowed', 'overdue')
        "#,
    )
    .bind(borrower_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count)
}

#[derive(Clone)]
pub struct BorrowersRepository {
    pool: Pool<Postgres>,
}

impl BorrowersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        query: &BorrowerQuery,
        today: NaiveDate,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<Borrower>, i64)> {
        let search = query.search.as_deref().filter(|s| !s.trim().is_empty()).map(like_pattern);
        let filter = r#"
            active
            AND ($1::text IS NULL OR name ILIKE $1 OR borrower_code ILIKE $1
                 OR email ILIKE $1 OR phone ILIKE $1)
            AND ($2::int IS NULL OR borrower_type_id = $2)
            AND ($3::boolean IS NULL
                 OR $3 = (membership_expiry IS NOT NULL AND membership_expiry >= $4))
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM borrowers WHERE {}",
            filter
        ))
        .bind(&search)
        .bind(query.borrower_type_id)
        .bind(query.active_membership)
        .bind(today)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, Borrower>(&format!(
            "SELECT * FROM borrowers WHERE {} ORDER BY name, id LIMIT $5 OFFSET $6",
            filter
        ))
        .bind(&search)
        .bind(query.borrower_type_id)
        .bind(query.active_membership)
        .bind(today)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((rows, total))
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Borrower> {
        sqlx::query_as::<_, Borrower>("SELECT * FROM borrowers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrower with id {} not found", id)))
    }

    pub async fn create(
        &self,
        data: &CreateBorrower,
        membership_date: NaiveDate,
        membership_expiry: NaiveDate,
    ) -> AppResult<Borrower> {
        let mut tx = self.pool.begin().await?;
        let borrower = insert_borrower(&mut tx, data, membership_date, membership_expiry).await?;
        tx.commit().await?;
        Ok(borrower)
    }

    /// Update a borrower; absent fields are kept
    pub async fn update(&self, id: i32, data: &UpdateBorrower) -> AppResult<Borrower> {
        sqlx::query_as::<_, Borrower>(
            r#"
            UPDATE borrowers SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone),
                address = COALESCE($5, address),
                id_card = COALESCE($6, id_card),
                date_of_birth = COALESCE($7, date_of_birth),
                borrower_type_id = COALESCE($8, borrower_type_id),
                membership_date = COALESCE($9, membership_date),
                membership_expiry = COALESCE($10, membership_expiry),
                max_books_override = COALESCE($11, max_books_override),
                max_days_override = COALESCE($12, max_days_override),
                notes = COALESCE($13, notes)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.name.as_deref().map(str::trim))
        .bind(&data.email)
        .bind(&data.phone)
        .bind(&data.address)
        .bind(&data.id_card)
        .bind(data.date_of_birth)
        .bind(data.borrower_type_id)
        .bind(data.membership_date)
        .bind(data.membership_expiry)
        .bind(data.max_books_override)
        .bind(data.max_days_override)
        .bind(&data.notes)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Borrower with id {} not found", id)))
    }

    pub async fn set_membership_expiry(&self, id: i32, expiry: NaiveDate) -> AppResult<Borrower> {
        sqlx::query_as::<_, Borrower>(
            "UPDATE borrowers SET membership_expiry = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(expiry)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Borrower with id {} not found", id)))
    }

    /// Soft delete, refused while the borrower holds copies
    pub async fn archive(&self, id: i32) -> AppResult<()> {
        let mut conn = self.pool.acquire().await?;
        if count_active_copies(&mut conn, id).await? > 0 {
            return Err(AppError::BusinessRule(
                "Borrower still has borrowed copies".to_string(),
            ));
        }
        let result = sqlx::query("UPDATE borrowers SET active = FALSE WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Borrower with id {} not found", id)));
        }
        Ok(())
    }

    pub async fn active_copies(&self, borrower_id: i32) -> AppResult<i64> {
        let mut conn = self.pool.acquire().await?;
        count_active_copies(&mut conn, borrower_id).await
    }

    /// Stored figures; `open_fines` only holds fines frozen on returned or lost copies
    pub async fn stats(&self, borrower_id: i32, today: NaiveDate) -> AppResult<BorrowerStats> {
        let stats = sqlx::query_as::<_, BorrowerStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM borrowings
                  WHERE borrower_id = $1 AND state <> 'cancelled') AS borrowing_count,
                (SELECT COUNT(*) FROM borrowing_quant_lines ql JOIN borrowings br ON br.id = ql.borrowing_id
                  WHERE br.borrower_id = $1 AND ql.state IN ('borrowed', 'overdue')) AS current_copies,
                (SELECT COUNT(*) FROM borrowing_quant_lines ql JOIN borrowings br ON br.id = ql.borrowing_id
                  WHERE br.borrower_id = $1 AND ql.state IN ('borrowed', 'overdue')
                    AND ql.due_date < $2) AS overdue_copies,
                (SELECT COUNT(*) FROM reservations
                  WHERE borrower_id = $1 AND state IN ('draft', 'active', 'available')) AS open_reservations,
                (SELECT COALESCE(SUM(ql.fine_amount), 0) FROM borrowing_quant_lines ql
                   JOIN borrowings br ON br.id = ql.borrowing_id
                  WHERE br.borrower_id = $1 AND ql.state IN ('returned', 'lost')) AS open_fines
            "#,
        )
        .bind(borrower_id)
        .bind(today)
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_borrower_code_padding() {
        assert_eq!(borrower_code(1), "DG00001");
        assert_eq!(borrower_code(12345), "DG12345");
        assert_eq!(borrower_code(123456), "DG123456");
    }
}
