//! Reservations repository

use chrono::{Duration, NaiveDate};
use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    circulation::{reservation_expired, EXPIRING_STATE},
    error::{AppError, AppResult},
    models::{
        quant::QuantState,
        reservation::{CreateReservation, Reservation, ReservationQuery, ReservationState},
    },
};

use super::{next_sequence, quants};

const RESERVATION_SELECT: &str = r#"
    SELECT r.id, r.name, r.borrower_id, p.name AS borrower_name, r.book_id, b.title AS book_title,
           r.quant_id, q.registration_number, r.reservation_date, r.expiry_date, r.state,
           r.priority, r.notes, r.borrowing_id, r.notified_at, r.created_at
    FROM reservations r
    JOIN borrowers p ON p.id = r.borrower_id
    JOIN books b ON b.id = r.book_id
    LEFT JOIN book_quants q ON q.id = r.quant_id
"#;

/// Queue order shared by every "next reservation" lookup
const QUEUE_ORDER: &str = "r.priority DESC, r.reservation_date, r.id";

pub fn reservation_name(sequence: i32) -> String {
    format!("RSV/{:05}", sequence)
}

async fn load_state(conn: &mut PgConnection, id: i32) -> AppResult<(ReservationState, i32, Option<i32>)> {
    sqlx::query_as::<_, (ReservationState, i32, Option<i32>)>(
        "SELECT state, book_id, quant_id FROM reservations WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Reservation with id {} not found", id)))
}

/// Hold a freed copy for the first active reservation of its book.
/// Returns the reservation moved to available.
pub(crate) async fn hold_for_next(
    conn: &mut PgConnection,
    quant_id: i32,
    book_id: i32,
    hold_days: i32,
    today: NaiveDate,
) -> AppResult<Option<i32>> {
    let sql = format!(
        r#"
        SELECT r.id FROM reservations r
        WHERE r.book_id = $1 AND r.state = 'active' AND (r.quant_id IS NULL OR r.quant_id = $2)
        ORDER BY {}
        LIMIT 1
        FOR UPDATE SKIP LOCKED
        "#,
        QUEUE_ORDER
    );
    let next = sqlx::query_scalar::<_, i32>(&sql)
        .bind(book_id)
        .bind(quant_id)
        .fetch_optional(&mut *conn)
        .await?;

    let Some(reservation_id) = next else {
        return Ok(None);
    };

    mark_available(conn, reservation_id, quant_id, hold_days, today).await?;
    Ok(Some(reservation_id))
}

async fn mark_available(
    conn: &mut PgConnection,
    reservation_id: i32,
    quant_id: i32,
    hold_days: i32,
    today: NaiveDate,
) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE reservations
        SET state = 'available', quant_id = $2, expiry_date = $3, notified_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(reservation_id)
    .bind(quant_id)
    .bind(today + Duration::days(hold_days as i64))
    .execute(&mut *conn)
    .await?;
    quants::set_state(conn, quant_id, QuantState::Reserved).await
}

/// Reservation of `borrower_id` holding `quant_id`, if any
pub(crate) async fn held_for(
    conn: &mut PgConnection,
    quant_id: i32,
    borrower_id: i32,
) -> AppResult<Option<i32>> {
    let id = sqlx::query_scalar::<_, i32>(
        r#"
        SELECT id FROM reservations
        WHERE quant_id = $1 AND borrower_id = $2 AND state = 'available'
        LIMIT 1
        "#,
    )
    .bind(quant_id)
    .bind(borrower_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(id)
}

/// Close the reservation once its copy is lent
pub(crate) async fn mark_fulfilled(
    conn: &mut PgConnection,
    reservation_id: i32,
    borrowing_id: i32,
) -> AppResult<()> {
    sqlx::query("UPDATE reservations SET state = 'fulfilled', borrowing_id = $2 WHERE id = $1")
        .bind(reservation_id)
        .bind(borrowing_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Give a reserved copy back to the shelf, or to the next reservation in queue
async fn release_copy(
    conn: &mut PgConnection,
    quant_id: i32,
    book_id: i32,
    hold_days: i32,
    today: NaiveDate,
) -> AppResult<Option<i32>> {
    let state = sqlx::query_scalar::<_, QuantState>("SELECT state FROM book_quants WHERE id = $1 FOR UPDATE")
        .bind(quant_id)
        .fetch_one(&mut *conn)
        .await?;
    if state != QuantState::Reserved {
        return Ok(None);
    }
    quants::set_state(conn, quant_id, QuantState::Available).await?;
    hold_for_next(conn, quant_id, book_id, hold_days, today).await
}

#[derive(Clone)]
pub struct ReservationsRepository {
    pool: Pool<Postgres>,
}

impl ReservationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        query: &ReservationQuery,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<Reservation>, i64)> {
        let filter = r#"
            ($1::int IS NULL OR r.borrower_id = $1)
            AND ($2::int IS NULL OR r.book_id = $2)
            AND ($3::text IS NULL OR r.state = $3)
        "#;
        let state = query.state.map(|s| s.as_str());

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM reservations r WHERE {}",
            filter
        ))
        .bind(query.borrower_id)
        .bind(query.book_id)
        .bind(state)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, Reservation>(&format!(
            "{} WHERE {} ORDER BY r.reservation_date DESC, r.id DESC LIMIT $4 OFFSET $5",
            RESERVATION_SELECT, filter
        ))
        .bind(query.borrower_id)
        .bind(query.book_id)
        .bind(state)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((rows, total))
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>(&format!("{} WHERE r.id = $1", RESERVATION_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reservation with id {} not found", id)))
    }

    pub async fn get_many(&self, ids: &[i32]) -> AppResult<Vec<Reservation>> {
        let rows = sqlx::query_as::<_, Reservation>(&format!(
            "{} WHERE r.id = ANY($1) ORDER BY r.id",
            RESERVATION_SELECT
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// First reservation waiting for a book
    pub async fn next_in_queue(&self, book_id: i32) -> AppResult<Option<Reservation>> {
        let row = sqlx::query_as::<_, Reservation>(&format!(
            "{} WHERE r.book_id = $1 AND r.state = 'active' ORDER BY {} LIMIT 1",
            RESERVATION_SELECT, QUEUE_ORDER
        ))
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Create a draft reservation after the duplicate and current-loan checks
    pub async fn create(
        &self,
        data: &CreateReservation,
        reservation_date: NaiveDate,
        expiry_date: NaiveDate,
    ) -> AppResult<Reservation> {
        let mut tx = self.pool.begin().await?;

        let book_active: Option<bool> = sqlx::query_scalar("SELECT active FROM books WHERE id = $1")
            .bind(data.book_id)
            .fetch_optional(&mut *tx)
            .await?;
        match book_active {
            None => return Err(AppError::NotFound(format!("Book with id {} not found", data.book_id))),
            Some(false) => return Err(AppError::BusinessRule("Book is archived".to_string())),
            Some(true) => {}
        }

        if let Some(quant_id) = data.quant_id {
            let belongs: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM book_quants WHERE id = $1 AND book_id = $2 AND active)",
            )
            .bind(quant_id)
            .bind(data.book_id)
            .fetch_one(&mut *tx)
            .await?;
            if !belongs {
                return Err(AppError::Validation("Copy does not belong to this book".to_string()));
            }
        }

        let duplicate: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM reservations
                WHERE borrower_id = $1 AND book_id = $2
                  AND state IN ('draft', 'active', 'available')
                  AND ($3::int IS NULL OR quant_id IS NULL OR quant_id = $3)
            )
            "#,
        )
        .bind(data.borrower_id)
        .bind(data.book_id)
        .bind(data.quant_id)
        .fetch_one(&mut *tx)
        .await?;
        if duplicate {
            return Err(AppError::Conflict(
                "An open reservation already exists for this book".to_string(),
            ));
        }

        let borrowing_it: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM borrowing_quant_lines ql
                JOIN borrowings br ON br.id = ql.borrowing_id
                JOIN book_quants q ON q.id = ql.quant_id
                WHERE br.borrower_id = $1 AND q.book_id = $2 AND ql.state IN ('borrowed', 'overdue')
            )
            "#,
        )
        .bind(data.borrower_id)
        .bind(data.book_id)
        .fetch_one(&mut *tx)
        .await?;
        if borrowing_it {
            return Err(AppError::BusinessRule(
                "The borrower already has this book on loan".to_string(),
            ));
        }

        let name = reservation_name(next_sequence(&mut tx, "reservation").await?);

        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO reservations (
                name, borrower_id, book_id, quant_id, reservation_date, expiry_date, priority, notes
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&name)
        .bind(data.borrower_id)
        .bind(data.book_id)
        .bind(data.quant_id)
        .bind(reservation_date)
        .bind(expiry_date)
        .bind(data.priority.unwrap_or(0))
        .bind(&data.notes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        self.get_by_id(id).await
    }

    /// draft → active
    pub async fn confirm(&self, id: i32) -> AppResult<Reservation> {
        let mut tx = self.pool.begin().await?;
        let (state, _, _) = load_state(&mut tx, id).await?;
        if state != ReservationState::Draft {
            return Err(AppError::BusinessRule(format!(
                "Only draft reservations can be confirmed (current state: {})",
                state
            )));
        }
        sqlx::query("UPDATE reservations SET state = 'active' WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        self.get_by_id(id).await
    }

    /// active → available: hold a copy and restart the pickup window
    pub async fn notify_available(&self, id: i32, hold_days: i32, today: NaiveDate) -> AppResult<Reservation> {
        let mut tx = self.pool.begin().await?;
        let (state, book_id, quant_id) = load_state(&mut tx, id).await?;
        if state != ReservationState::Active {
            return Err(AppError::BusinessRule(format!(
                "Only active reservations can be notified (current state: {})",
                state
            )));
        }

        let sql = format!(
            r#"
            SELECT q.id FROM book_quants q
            LEFT JOIN locations l ON l.id = q.location_id
            LEFT JOIN quant_types t ON t.id = q.quant_type_id
            WHERE q.book_id = $1 AND ($2::int IS NULL OR q.id = $2) AND {}
            ORDER BY l.parent_path, q.registration_number, q.id
            LIMIT 1
            FOR UPDATE OF q SKIP LOCKED
            "#,
            quants::LENDABLE
        );
        let copy = sqlx::query_scalar::<_, i32>(&sql)
            .bind(book_id)
            .bind(quant_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::BusinessRule("No copy of this book is available".to_string()))?;

        mark_available(&mut tx, id, copy, hold_days, today).await?;
        tx.commit().await?;
        self.get_by_id(id).await
    }

    /// Cancel an open reservation; a held copy goes to the next in queue.
    /// Returns the cancelled reservation and the one that received the copy.
    pub async fn cancel(&self, id: i32, hold_days: i32, today: NaiveDate) -> AppResult<(Reservation, Option<i32>)> {
        let mut tx = self.pool.begin().await?;
        let (state, book_id, quant_id) = load_state(&mut tx, id).await?;
        if !state.is_open() {
            return Err(AppError::BusinessRule(format!(
                "Reservation cannot be cancelled (current state: {})",
                state
            )));
        }

        sqlx::query("UPDATE reservations SET state = 'cancelled' WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let next = match (state, quant_id) {
            (ReservationState::Available, Some(quant_id)) => {
                release_copy(&mut tx, quant_id, book_id, hold_days, today).await?
            }
            _ => None,
        };

        tx.commit().await?;
        Ok((self.get_by_id(id).await?, next))
    }

    /// cancelled/expired → draft
    pub async fn set_draft(&self, id: i32) -> AppResult<Reservation> {
        let mut tx = self.pool.begin().await?;
        let (state, _, _) = load_state(&mut tx, id).await?;
        if !matches!(state, ReservationState::Cancelled | ReservationState::Expired) {
            return Err(AppError::BusinessRule(format!(
                "Only cancelled or expired reservations can be reset (current state: {})",
                state
            )));
        }
        sqlx::query("UPDATE reservations SET state = 'draft', notified_at = NULL WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        self.get_by_id(id).await
    }

    /// Expire held reservations past their pickup window; waiting ones stay
    /// in the queue. Returns the reservations that received a freed copy.
    pub async fn expire_overdue(&self, today: NaiveDate, hold_days: i32) -> AppResult<(u64, Vec<i32>)> {
        let mut tx = self.pool.begin().await?;

        let held = sqlx::query_as::<_, (i32, i32, Option<i32>, ReservationState, NaiveDate)>(
            r#"
            SELECT id, book_id, quant_id, state, expiry_date FROM reservations
            WHERE state = $1
            ORDER BY id
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(EXPIRING_STATE)
        .fetch_all(&mut *tx)
        .await?;

        let mut expired = 0;
        let mut notified = Vec::new();
        for (id, book_id, quant_id, state, expiry_date) in held {
            if !reservation_expired(state, expiry_date, today) {
                continue;
            }
            sqlx::query("UPDATE reservations SET state = 'expired' WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            expired += 1;

            if let Some(quant_id) = quant_id {
                if let Some(next) = release_copy(&mut tx, quant_id, book_id, hold_days, today).await? {
                    notified.push(next);
                }
            }
        }

        tx.commit().await?;
        Ok((expired, notified))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reservation_name() {
        assert_eq!(reservation_name(7), "RSV/00007");
        assert_eq!(reservation_name(100000), "RSV/100000");
    }
}
