//! Book quants (physical copies) repository

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{map_unique_violation, AppError, AppResult},
    models::quant::{Quant, QuantState, UpdateQuant},
};

/// Select clause for `Quant`, `q` is the copies alias
pub(crate) const QUANT_SELECT: &str = r#"
    SELECT q.id, q.book_id, b.title AS book_title, q.registration_number,
           q.location_id, l.complete_name AS location_name, l.is_borrow_location,
           q.quant_type_id, t.name AS quant_type_name, t.can_borrow,
           q.state, q.quantity, q.acquisition_date, q.price, q.note, q.active,
           q.created_at, q.updated_at
    FROM book_quants q
    JOIN books b ON b.id = q.book_id
    LEFT JOIN locations l ON l.id = q.location_id
    LEFT JOIN quant_types t ON t.id = q.quant_type_id
"#;

/// Condition for copies that can be allocated to a loan
pub(crate) const LENDABLE: &str = r#"
    q.active AND q.state = 'available' AND q.registration_number IS NOT NULL
    AND COALESCE(t.can_borrow, FALSE) AND COALESCE(l.is_borrow_location, FALSE)
"#;

/// Fields common to single and batch creation
#[derive(Debug, Clone)]
pub struct NewQuant {
    pub registration_number: String,
    pub location_id: Option<i32>,
    pub quant_type_id: Option<i32>,
    pub quantity: i32,
    pub acquisition_date: Option<NaiveDate>,
    pub price: Option<Decimal>,
    pub note: Option<String>,
}

#[derive(Clone)]
pub struct QuantsRepository {
    pool: Pool<Postgres>,
}

/// Set the state of a copy inside a transaction
pub(crate) async fn set_state(conn: &mut PgConnection, id: i32, state: QuantState) -> AppResult<()> {
    sqlx::query("UPDATE book_quants SET state = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(state)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

impl QuantsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Copies of a book, archived ones on request
    pub async fn list_for_book(&self, book_id: i32, include_inactive: bool) -> AppResult<Vec<Quant>> {
        let sql = format!(
            "{} WHERE q.book_id = $1 AND ($2 OR q.active) ORDER BY q.registration_number NULLS LAST, q.id",
            QUANT_SELECT
        );
        let rows = sqlx::query_as::<_, Quant>(&sql)
            .bind(book_id)
            .bind(include_inactive)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Lendable copies of a book, borrow locations first then registration number
    pub async fn lendable_for_book(&self, book_id: i32) -> AppResult<Vec<Quant>> {
        let sql = format!(
            "{} WHERE q.book_id = $1 AND {} ORDER BY l.parent_path, q.registration_number, q.id",
            QUANT_SELECT, LENDABLE
        );
        let rows = sqlx::query_as::<_, Quant>(&sql)
            .bind(book_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Quant> {
        let sql = format!("{} WHERE q.id = $1", QUANT_SELECT);
        sqlx::query_as::<_, Quant>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Copy with id {} not found", id)))
    }

    /// Registration number of the most recent active copy of a book
    pub async fn last_registration_number(&self, book_id: i32) -> AppResult<Option<String>> {
        let last = sqlx::query_scalar::<_, String>(
            r#"
            SELECT registration_number FROM book_quants
            WHERE book_id = $1 AND registration_number IS NOT NULL AND active
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(last)
    }

    /// Registration numbers already used by active copies
    pub async fn existing_registration_numbers(
        &self,
        numbers: &[String],
        exclude_id: Option<i32>,
    ) -> AppResult<Vec<String>> {
        let rows = sqlx::query_scalar::<_, String>(
            r#"
            SELECT registration_number FROM book_quants
            WHERE active AND registration_number = ANY($1)
              AND ($2::int IS NULL OR id <> $2)
            "#,
        )
        .bind(numbers)
        .bind(exclude_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Insert copies of a book in one transaction
    pub async fn create_many(&self, book_id: i32, items: &[NewQuant]) -> AppResult<Vec<Quant>> {
        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(items.len());

        for item in items {
            let id = sqlx::query_scalar::<_, i32>(
                r#"
                INSERT INTO book_quants (
                    book_id, registration_number, location_id, quant_type_id, quantity,
                    acquisition_date, price, note
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING id
                "#,
            )
            .bind(book_id)
            .bind(&item.registration_number)
            .bind(item.location_id)
            .bind(item.quant_type_id)
            .bind(item.quantity)
            .bind(item.acquisition_date)
            .bind(item.price)
            .bind(&item.note)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                map_unique_violation(
                    e,
                    &format!("Registration number {} already exists", item.registration_number),
                )
            })?;
            ids.push(id);
        }

        tx.commit().await?;

        let sql = format!("{} WHERE q.id = ANY($1) ORDER BY q.id", QUANT_SELECT);
        let rows = sqlx::query_as::<_, Quant>(&sql)
            .bind(&ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn update(&self, id: i32, data: &UpdateQuant) -> AppResult<Quant> {
        let result = sqlx::query(
            r#"
            UPDATE book_quants SET
                registration_number = COALESCE($2, registration_number),
                location_id = COALESCE($3, location_id),
                quant_type_id = COALESCE($4, quant_type_id),
                state = COALESCE($5, state),
                note = COALESCE($6, note),
                price = COALESCE($7, price),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(data.registration_number.as_deref().map(str::trim))
        .bind(data.location_id)
        .bind(data.quant_type_id)
        .bind(data.state)
        .bind(&data.note)
        .bind(data.price)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "Registration number already exists"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Copy with id {} not found", id)));
        }
        self.get_by_id(id).await
    }

    /// Soft delete, refused while the copy is lent or held for a reservation
    pub async fn archive(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        let state = sqlx::query_scalar::<_, QuantState>(
            "SELECT state FROM book_quants WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Copy with id {} not found", id)))?;

        if state.is_in_circulation() {
            return Err(AppError::BusinessRule(format!(
                "Cannot archive a copy that is {}",
                state
            )));
        }
        sqlx::query("UPDATE book_quants SET active = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}
