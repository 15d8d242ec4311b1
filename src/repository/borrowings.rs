//! Borrowings repository: headers, per-book lines and per-copy quant lines

use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::Decimal;
use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    circulation::{
        self, borrowing_state, check_book_limit, check_renewal, check_resource_limit,
        days_late_on_return, line_state, EffectiveLimits,
    },
    error::{map_unique_violation, AppError, AppResult},
    models::{
        borrowing::{
            Borrowing, BorrowingDetails, BorrowingLine, BorrowingQuery, BorrowingState,
            BorrowingSummary, LineDetails, LineState, QuantLine, QuantLineState,
        },
        quant::QuantState,
    },
};

use super::{borrowers, like_pattern, next_sequence, quants, reservations, resources};

pub(crate) const SUMMARY_SELECT: &str = r#"
    SELECT br.id, br.name, br.borrower_id, p.name AS borrower_name, br.borrow_date,
           br.due_date, br.return_date, br.state,
           (SELECT COUNT(*) FROM borrowing_quant_lines ql
             WHERE ql.borrowing_id = br.id AND ql.state <> 'cancelled') AS book_count
    FROM borrowings br
    JOIN borrowers p ON p.id = br.borrower_id
"#;

const LINE_SELECT: &str = r#"
    SELECT l.id, l.borrowing_id, l.book_id, b.title AS book_title, l.requested_quantity,
           l.due_date, l.state, l.notes
    FROM borrowing_lines l
    JOIN books b ON b.id = l.book_id
"#;

const QUANT_LINE_SELECT: &str = r#"
    SELECT ql.id, ql.line_id, ql.borrowing_id, ql.quant_id, q.registration_number, q.book_id,
           ql.state, ql.borrow_date, ql.due_date, ql.return_date, ql.late_days,
           ql.fine_amount, ql.extension_count
    FROM borrowing_quant_lines ql
    JOIN book_quants q ON q.id = ql.quant_id
"#;

/// Copies a borrower may take: lendable ones, or ones held for them
const ALLOCATABLE: &str = r#"
    q.active AND q.registration_number IS NOT NULL
    AND COALESCE(t.can_borrow, FALSE) AND COALESCE(l.is_borrow_location, FALSE)
    AND (q.state = 'available'
         OR (q.state = 'reserved' AND EXISTS (
                SELECT 1 FROM reservations r
                WHERE r.quant_id = q.id AND r.borrower_id = $2 AND r.state = 'available')))
"#;

/// Fine settings applied to one borrowing
#[derive(Debug, Clone, Copy)]
pub struct FinePolicy {
    pub grace_days: i32,
    pub rate: Decimal,
}

/// Result of a return inside the repository
#[derive(Debug, Clone)]
pub struct ReturnResult {
    pub returned: usize,
    pub total_fine: Decimal,
    pub state: BorrowingState,
    pub notified_reservations: Vec<i32>,
}

/// `PM/YYYY/MM/NNNNN`, numbered per month of the borrow date
pub fn borrowing_name(borrow_date: NaiveDate, sequence: i32) -> String {
    format!(
        "PM/{}/{:02}/{:05}",
        borrow_date.year(),
        borrow_date.month(),
        sequence
    )
}

fn sequence_scope(borrow_date: NaiveDate) -> String {
    format!("borrowing/{}/{:02}", borrow_date.year(), borrow_date.month())
}

async fn lock_header(conn: &mut PgConnection, id: i32) -> AppResult<Borrowing> {
    sqlx::query_as::<_, Borrowing>("SELECT * FROM borrowings WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Borrowing with id {} not found", id)))
}

fn require_draft(borrowing: &Borrowing) -> AppResult<()> {
    if borrowing.state != BorrowingState::Draft {
        return Err(AppError::BusinessRule(format!(
            "Borrowing must be in draft (current state: {})",
            borrowing.state
        )));
    }
    Ok(())
}

async fn quant_lines_of(conn: &mut PgConnection, borrowing_id: i32) -> AppResult<Vec<QuantLine>> {
    let rows = sqlx::query_as::<_, QuantLine>(&format!(
        "{} WHERE ql.borrowing_id = $1 ORDER BY ql.line_id, ql.id",
        QUANT_LINE_SELECT
    ))
    .bind(borrowing_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

async fn lines_of(conn: &mut PgConnection, borrowing_id: i32) -> AppResult<Vec<BorrowingLine>> {
    let rows = sqlx::query_as::<_, BorrowingLine>(&format!(
        "{} WHERE l.borrowing_id = $1 ORDER BY l.id",
        LINE_SELECT
    ))
    .bind(borrowing_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

/// Recompute line states, header state, header due date and return date
pub(crate) async fn refresh_derived(conn: &mut PgConnection, borrowing_id: i32) -> AppResult<BorrowingState> {
    let lines = lines_of(conn, borrowing_id).await?;
    let copies = quant_lines_of(conn, borrowing_id).await?;

    let mut line_states = Vec::with_capacity(lines.len());
    for line in &lines {
        let states: Vec<QuantLineState> = copies
            .iter()
            .filter(|c| c.line_id == line.id)
            .map(|c| c.state)
            .collect();
        let state = if states.is_empty() && line.state == LineState::Cancelled {
            LineState::Cancelled
        } else {
            line_state(line.requested_quantity, &states)
        };
        if state != line.state {
            sqlx::query("UPDATE borrowing_lines SET state = $2 WHERE id = $1")
                .bind(line.id)
                .bind(state)
                .execute(&mut *conn)
                .await?;
        }
        line_states.push(state);
    }

    let state = borrowing_state(&line_states);
    let due_date = lines
        .iter()
        .zip(&line_states)
        .filter(|(_, s)| **s != LineState::Cancelled)
        .map(|(l, _)| l.due_date)
        .max();
    let return_date = if state == BorrowingState::Returned {
        copies.iter().filter_map(|c| c.return_date).max()
    } else {
        None
    };

    sqlx::query(
        r#"
        UPDATE borrowings SET state = $2, due_date = $3, return_date = $4, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(borrowing_id)
    .bind(state)
    .bind(due_date)
    .bind(return_date)
    .execute(&mut *conn)
    .await?;

    Ok(state)
}

/// Copies of the line still needed to reach the requested quantity
async fn remaining_for_line(conn: &mut PgConnection, line: &BorrowingLine) -> AppResult<i64> {
    let allocated = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM borrowing_quant_lines WHERE line_id = $1 AND state <> 'cancelled'",
    )
    .bind(line.id)
    .fetch_one(&mut *conn)
    .await?;
    Ok((line.requested_quantity as i64 - allocated).max(0))
}

/// Attach copies to a draft line, picking them when `quant_ids` is None
async fn allocate_line(
    conn: &mut PgConnection,
    borrowing: &Borrowing,
    line: &BorrowingLine,
    quant_ids: Option<&[i32]>,
) -> AppResult<usize> {
    let remaining = remaining_for_line(conn, line).await?;

    let selected: Vec<i32> = match quant_ids {
        Some(ids) => {
            if ids.len() as i64 > remaining {
                return Err(AppError::BusinessRule(format!(
                    "Only {} more copies can be allocated to this line",
                    remaining
                )));
            }
            let sql = format!(
                r#"
                SELECT q.id FROM book_quants q
                LEFT JOIN locations l ON l.id = q.location_id
                LEFT JOIN quant_types t ON t.id = q.quant_type_id
                WHERE q.book_id = $1 AND q.id = ANY($3) AND {}
                "#,
                ALLOCATABLE
            );
            let valid = sqlx::query_scalar::<_, i32>(&sql)
                .bind(line.book_id)
                .bind(borrowing.borrower_id)
                .bind(ids)
                .fetch_all(&mut *conn)
                .await?;
            if let Some(bad) = ids.iter().find(|id| !valid.contains(*id)) {
                return Err(AppError::BusinessRule(format!(
                    "Copy {} cannot be lent for this line",
                    bad
                )));
            }
            ids.to_vec()
        }
        None => {
            if remaining == 0 {
                return Ok(0);
            }
            let sql = format!(
                r#"
                SELECT q.id FROM book_quants q
                LEFT JOIN locations l ON l.id = q.location_id
                LEFT JOIN quant_types t ON t.id = q.quant_type_id
                WHERE q.book_id = $1 AND {}
                  AND NOT EXISTS (SELECT 1 FROM borrowing_quant_lines x
                                   WHERE x.borrowing_id = $3 AND x.quant_id = q.id)
                ORDER BY (q.state = 'reserved') DESC, l.parent_path, q.registration_number, q.id
                LIMIT $4
                "#,
                ALLOCATABLE
            );
            sqlx::query_scalar::<_, i32>(&sql)
                .bind(line.book_id)
                .bind(borrowing.borrower_id)
                .bind(borrowing.id)
                .bind(remaining)
                .fetch_all(&mut *conn)
                .await?
        }
    };

    for quant_id in &selected {
        sqlx::query(
            r#"
            INSERT INTO borrowing_quant_lines (line_id, borrowing_id, quant_id, due_date)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(line.id)
        .bind(borrowing.id)
        .bind(quant_id)
        .bind(line.due_date)
        .execute(&mut *conn)
        .await
        .map_err(|e| map_unique_violation(e, "Copy is already part of this borrowing"))?;
    }

    Ok(selected.len())
}

/// Draft → borrowed: allocation, checks, naming, copy and reservation updates.
/// Returns the reservations fulfilled by the loan.
async fn confirm_in_tx(
    conn: &mut PgConnection,
    borrowing_id: i32,
    limits: &EffectiveLimits,
    today: NaiveDate,
) -> AppResult<Vec<i32>> {
    let borrowing = lock_header(conn, borrowing_id).await?;
    require_draft(&borrowing)?;

    let (active, expiry): (bool, Option<NaiveDate>) = sqlx::query_as(
        "SELECT active, membership_expiry FROM borrowers WHERE id = $1 FOR UPDATE",
    )
    .bind(borrowing.borrower_id)
    .fetch_one(&mut *conn)
    .await?;
    if !active {
        return Err(AppError::BusinessRule("Borrower is archived".to_string()));
    }
    if !expiry.map(|d| d >= today).unwrap_or(false) {
        return Err(AppError::BusinessRule(
            "Borrower membership is not active".to_string(),
        ));
    }

    let lines = lines_of(conn, borrowing_id).await?;
    let lines: Vec<BorrowingLine> = lines
        .into_iter()
        .filter(|l| l.state != LineState::Cancelled)
        .collect();
    if lines.is_empty() {
        return Err(AppError::BusinessRule(
            "Add at least one book before confirming".to_string(),
        ));
    }

    for line in &lines {
        allocate_line(conn, &borrowing, line, None).await?;
    }

    let copies: Vec<QuantLine> = quant_lines_of(conn, borrowing_id)
        .await?
        .into_iter()
        .filter(|c| c.state == QuantLineState::Draft)
        .collect();
    for line in &lines {
        if !copies.iter().any(|c| c.line_id == line.id) {
            return Err(AppError::BusinessRule(format!(
                "No copy of \"{}\" is available",
                line.book_title
            )));
        }
    }

    let current = borrowers::count_active_copies(conn, borrowing.borrower_id).await?;
    check_book_limit(current, copies.len() as i64, limits.max_books).map_err(AppError::BusinessRule)?;

    let lent_books: Vec<i32> = copies.iter().map(|c| c.book_id).collect();
    for usage in resources::usage_for_loan(conn, borrowing.borrower_id, &lent_books).await? {
        check_resource_limit(&usage).map_err(AppError::BusinessRule)?;
    }

    let mut fulfilled = Vec::new();
    for copy in &copies {
        let state = sqlx::query_scalar::<_, QuantState>(
            "SELECT state FROM book_quants WHERE id = $1 FOR UPDATE",
        )
        .bind(copy.quant_id)
        .fetch_one(&mut *conn)
        .await?;

        let held = reservations::held_for(conn, copy.quant_id, borrowing.borrower_id).await?;
        let label = copy.registration_number.clone().unwrap_or_else(|| copy.quant_id.to_string());
        match (state, held) {
            (QuantState::Available, _) | (QuantState::Reserved, Some(_)) => {}
            (QuantState::Reserved, None) => {
                return Err(AppError::BusinessRule(format!(
                    "Copy {} is reserved for another borrower",
                    label
                )));
            }
            (other, _) => {
                return Err(AppError::BusinessRule(format!(
                    "Copy {} is not available (state: {})",
                    label, other
                )));
            }
        }

        sqlx::query(
            r#"
            UPDATE borrowing_quant_lines SET state = 'borrowed', borrow_date = $2
            WHERE id = $1
            "#,
        )
        .bind(copy.id)
        .bind(borrowing.borrow_date)
        .execute(&mut *conn)
        .await
        .map_err(|e| map_unique_violation(e, &format!("Copy {} is already on loan", label)))?;

        quants::set_state(conn, copy.quant_id, QuantState::Borrowed).await?;

        if let Some(reservation_id) = held {
            reservations::mark_fulfilled(conn, reservation_id, borrowing_id).await?;
            fulfilled.push(reservation_id);
        }
    }

    if borrowing.name.is_none() {
        let sequence = next_sequence(conn, &sequence_scope(borrowing.borrow_date)).await?;
        sqlx::query("UPDATE borrowings SET name = $2 WHERE id = $1")
            .bind(borrowing_id)
            .bind(borrowing_name(borrowing.borrow_date, sequence))
            .execute(&mut *conn)
            .await?;
    }

    refresh_derived(conn, borrowing_id).await?;
    Ok(fulfilled)
}

#[derive(Clone)]
pub struct BorrowingsRepository {
    pool: Pool<Postgres>,
}

impl BorrowingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        query: &BorrowingQuery,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<BorrowingSummary>, i64)> {
        let search = query.search.as_deref().filter(|s| !s.trim().is_empty()).map(like_pattern);
        let state = query.state.map(|s| s.as_str());
        let filter = r#"
            ($1::int IS NULL OR br.borrower_id = $1)
            AND ($2::text IS NULL OR br.state = $2)
            AND ($3::text IS NULL OR br.name ILIKE $3 OR p.name ILIKE $3)
            AND ($4::date IS NULL OR br.borrow_date >= $4)
            AND ($5::date IS NULL OR br.borrow_date <= $5)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM borrowings br JOIN borrowers p ON p.id = br.borrower_id WHERE {}",
            filter
        ))
        .bind(query.borrower_id)
        .bind(state)
        .bind(&search)
        .bind(query.from_date)
        .bind(query.to_date)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, BorrowingSummary>(&format!(
            "{} WHERE {} ORDER BY br.borrow_date DESC, br.id DESC LIMIT $6 OFFSET $7",
            SUMMARY_SELECT, filter
        ))
        .bind(query.borrower_id)
        .bind(state)
        .bind(&search)
        .bind(query.from_date)
        .bind(query.to_date)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((rows, total))
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Borrowing> {
        sqlx::query_as::<_, Borrowing>("SELECT * FROM borrowings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrowing with id {} not found", id)))
    }

    /// Header with lines, copies and totals; late days and fines of copies
    /// still out are computed for `today`
    pub async fn details(&self, id: i32, fines: FinePolicy, today: NaiveDate) -> AppResult<BorrowingDetails> {
        let borrowing = self.get_by_id(id).await?;
        let (borrower_name, borrower_code): (String, String) =
            sqlx::query_as("SELECT name, borrower_code FROM borrowers WHERE id = $1")
                .bind(borrowing.borrower_id)
                .fetch_one(&self.pool)
                .await?;

        let mut conn = self.pool.acquire().await?;
        let lines = lines_of(&mut conn, id).await?;
        let copies: Vec<QuantLine> = quant_lines_of(&mut conn, id)
            .await?
            .into_iter()
            .map(|mut c| {
                if c.state.is_active() {
                    c.late_days = circulation::late_days(c.state, c.due_date, today);
                    c.fine_amount = circulation::fine_amount(c.late_days, fines.grace_days, fines.rate);
                }
                c
            })
            .collect();

        let late_days = copies.iter().map(|c| c.late_days).max().unwrap_or(0);
        let fine_amount = copies.iter().map(|c| c.fine_amount).sum();
        let book_count = copies
            .iter()
            .filter(|c| c.state != QuantLineState::Cancelled)
            .count() as i64;

        let lines = lines
            .into_iter()
            .map(|line| {
                let quant_lines: Vec<QuantLine> =
                    copies.iter().filter(|c| c.line_id == line.id).cloned().collect();
                let fulfilled_quantity = quant_lines
                    .iter()
                    .filter(|c| c.state != QuantLineState::Cancelled)
                    .count() as i32;
                LineDetails {
                    line,
                    fulfilled_quantity,
                    quant_lines,
                }
            })
            .collect();

        Ok(BorrowingDetails {
            borrowing,
            borrower_name,
            borrower_code,
            lines,
            late_days,
            fine_amount,
            book_count,
        })
    }

    /// The borrower's draft borrowing (member cart)
    pub async fn draft_for_borrower(&self, borrower_id: i32) -> AppResult<Option<Borrowing>> {
        let row = sqlx::query_as::<_, Borrowing>(
            r#"
            SELECT * FROM borrowings
            WHERE borrower_id = $1 AND state = 'draft'
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(borrower_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn create(
        &self,
        borrower_id: i32,
        borrow_date: NaiveDate,
        notes: Option<&str>,
        created_by: Option<i32>,
    ) -> AppResult<Borrowing> {
        let borrowing = sqlx::query_as::<_, Borrowing>(
            r#"
            INSERT INTO borrowings (borrower_id, borrow_date, notes, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(borrower_id)
        .bind(borrow_date)
        .bind(notes)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(borrowing)
    }

    /// Add a per-book line to a draft; a book appears once per borrowing
    pub async fn add_line(
        &self,
        borrowing_id: i32,
        book_id: i32,
        requested_quantity: i32,
        due_date: NaiveDate,
        notes: Option<&str>,
    ) -> AppResult<BorrowingLine> {
        let mut tx = self.pool.begin().await?;
        let borrowing = lock_header(&mut tx, borrowing_id).await?;
        require_draft(&borrowing)?;

        if due_date < borrowing.borrow_date {
            return Err(AppError::Validation(
                "Due date cannot be before the borrow date".to_string(),
            ));
        }

        let book_active: Option<bool> = sqlx::query_scalar("SELECT active FROM books WHERE id = $1")
            .bind(book_id)
            .fetch_optional(&mut *tx)
            .await?;
        match book_active {
            None => return Err(AppError::NotFound(format!("Book with id {} not found", book_id))),
            Some(false) => return Err(AppError::BusinessRule("Book is archived".to_string())),
            Some(true) => {}
        }

        let duplicate: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(SELECT 1 FROM borrowing_lines
                          WHERE borrowing_id = $1 AND book_id = $2 AND state <> 'cancelled')
            "#,
        )
        .bind(borrowing_id)
        .bind(book_id)
        .fetch_one(&mut *tx)
        .await?;
        if duplicate {
            return Err(AppError::Conflict(
                "This book is already part of the borrowing".to_string(),
            ));
        }

        let line_id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO borrowing_lines (borrowing_id, book_id, requested_quantity, due_date, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(borrowing_id)
        .bind(book_id)
        .bind(requested_quantity)
        .bind(due_date)
        .bind(notes)
        .fetch_one(&mut *tx)
        .await?;

        refresh_derived(&mut tx, borrowing_id).await?;

        let line = sqlx::query_as::<_, BorrowingLine>(&format!("{} WHERE l.id = $1", LINE_SELECT))
            .bind(line_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(line)
    }

    /// Remove a line of a draft together with its draft allocations
    pub async fn remove_line(&self, borrowing_id: i32, line_id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        let borrowing = lock_header(&mut tx, borrowing_id).await?;
        require_draft(&borrowing)?;

        let result = sqlx::query("DELETE FROM borrowing_lines WHERE id = $1 AND borrowing_id = $2")
            .bind(line_id)
            .bind(borrowing_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Line {} not found in borrowing {}",
                line_id, borrowing_id
            )));
        }

        refresh_derived(&mut tx, borrowing_id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Allocate copies to a draft line
    pub async fn allocate(&self, borrowing_id: i32, line_id: i32, quant_ids: Option<&[i32]>) -> AppResult<usize> {
        let mut tx = self.pool.begin().await?;
        let borrowing = lock_header(&mut tx, borrowing_id).await?;
        require_draft(&borrowing)?;

        let line = sqlx::query_as::<_, BorrowingLine>(&format!(
            "{} WHERE l.id = $1 AND l.borrowing_id = $2",
            LINE_SELECT
        ))
        .bind(line_id)
        .bind(borrowing_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Line {} not found in borrowing {}", line_id, borrowing_id))
        })?;

        let count = allocate_line(&mut tx, &borrowing, &line, quant_ids).await?;
        if count == 0 && quant_ids.is_none() && remaining_for_line(&mut tx, &line).await? > 0 {
            return Err(AppError::BusinessRule(format!(
                "No copy of \"{}\" is available",
                line.book_title
            )));
        }

        refresh_derived(&mut tx, borrowing_id).await?;
        tx.commit().await?;
        Ok(count)
    }

    /// Drop every draft allocation of a draft borrowing
    pub async fn clear_allocations(&self, borrowing_id: i32) -> AppResult<u64> {
        let mut tx = self.pool.begin().await?;
        let borrowing = lock_header(&mut tx, borrowing_id).await?;
        require_draft(&borrowing)?;

        let result = sqlx::query(
            "DELETE FROM borrowing_quant_lines WHERE borrowing_id = $1 AND state = 'draft'",
        )
        .bind(borrowing_id)
        .execute(&mut *tx)
        .await?;

        refresh_derived(&mut tx, borrowing_id).await?;
        tx.commit().await?;
        Ok(result.rows_affected())
    }

    /// Confirm a draft; returns the reservations fulfilled by the loan
    pub async fn confirm(&self, borrowing_id: i32, limits: &EffectiveLimits, today: NaiveDate) -> AppResult<Vec<i32>> {
        let mut tx = self.pool.begin().await?;
        let fulfilled = confirm_in_tx(&mut tx, borrowing_id, limits, today).await?;
        tx.commit().await?;
        Ok(fulfilled)
    }

    /// Lend the copy held by an available reservation: creates and confirms a borrowing
    pub async fn fulfill_reservation(
        &self,
        reservation_id: i32,
        limits: &EffectiveLimits,
        created_by: Option<i32>,
        today: NaiveDate,
    ) -> AppResult<i32> {
        let mut tx = self.pool.begin().await?;

        let (state, borrower_id, book_id, quant_id): (String, i32, i32, Option<i32>) = sqlx::query_as(
            "SELECT state, borrower_id, book_id, quant_id FROM reservations WHERE id = $1 FOR UPDATE",
        )
        .bind(reservation_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Reservation with id {} not found", reservation_id)))?;

        let quant_id = match (state.as_str(), quant_id) {
            ("available", Some(quant_id)) => quant_id,
            _ => {
                return Err(AppError::BusinessRule(
                    "Only reservations holding an available copy can be fulfilled".to_string(),
                ))
            }
        };

        let borrowing_id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO borrowings (borrower_id, borrow_date, created_by)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(borrower_id)
        .bind(today)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        let due_date = today + Duration::days(limits.loan_days as i64);
        let line_id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO borrowing_lines (borrowing_id, book_id, requested_quantity, due_date)
            VALUES ($1, $2, 1, $3)
            RETURNING id
            "#,
        )
        .bind(borrowing_id)
        .bind(book_id)
        .bind(due_date)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO borrowing_quant_lines (line_id, borrowing_id, quant_id, due_date)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(line_id)
        .bind(borrowing_id)
        .bind(quant_id)
        .bind(due_date)
        .execute(&mut *tx)
        .await?;

        confirm_in_tx(&mut tx, borrowing_id, limits, today).await?;
        tx.commit().await?;
        Ok(borrowing_id)
    }

    /// Return all, or the selected, copies still out
    pub async fn return_copies(
        &self,
        borrowing_id: i32,
        quant_line_ids: Option<&[i32]>,
        return_date: NaiveDate,
        fines: FinePolicy,
        hold_days: i32,
    ) -> AppResult<ReturnResult> {
        let mut tx = self.pool.begin().await?;
        let borrowing = lock_header(&mut tx, borrowing_id).await?;

        let copies = quant_lines_of(&mut tx, borrowing_id).await?;
        let targets: Vec<&QuantLine> = match quant_line_ids {
            Some(ids) => {
                let mut selected = Vec::with_capacity(ids.len());
                for id in ids {
                    let copy = copies.iter().find(|c| c.id == *id).ok_or_else(|| {
                        AppError::NotFound(format!("Copy line {} not found in this borrowing", id))
                    })?;
                    if !copy.state.is_active() {
                        return Err(AppError::BusinessRule(format!(
                            "Copy {} is not on loan (state: {})",
                            copy.registration_number.as_deref().unwrap_or("-"),
                            copy.state
                        )));
                    }
                    selected.push(copy);
                }
                selected
            }
            None => copies.iter().filter(|c| c.state.is_active()).collect(),
        };
        if targets.is_empty() {
            return Err(AppError::BusinessRule(format!(
                "Nothing to return on borrowing {}",
                borrowing.name.as_deref().unwrap_or("(draft)")
            )));
        }
        if let Some(copy) = targets.iter().find(|c| c.borrow_date.map(|d| return_date < d).unwrap_or(false)) {
            return Err(AppError::Validation(format!(
                "Return date is before the borrow date of copy {}",
                copy.registration_number.as_deref().unwrap_or("-")
            )));
        }

        let mut total_fine = Decimal::ZERO;
        let mut notified = Vec::new();
        for copy in &targets {
            let late = days_late_on_return(copy.due_date, return_date);
            let fine = circulation::fine_amount(late, fines.grace_days, fines.rate);
            total_fine += fine;

            sqlx::query(
                r#"
                UPDATE borrowing_quant_lines
                SET state = 'returned', return_date = $2, late_days = $3, fine_amount = $4
                WHERE id = $1
                "#,
            )
            .bind(copy.id)
            .bind(return_date)
            .bind(late)
            .bind(fine)
            .execute(&mut *tx)
            .await?;

            quants::set_state(&mut tx, copy.quant_id, QuantState::Available).await?;
            if let Some(reservation_id) =
                reservations::hold_for_next(&mut tx, copy.quant_id, copy.book_id, hold_days, return_date).await?
            {
                notified.push(reservation_id);
            }
        }

        let state = refresh_derived(&mut tx, borrowing_id).await?;
        tx.commit().await?;

        Ok(ReturnResult {
            returned: targets.len(),
            total_fine,
            state,
            notified_reservations: notified,
        })
    }

    /// Extend one copy by the borrower's loan days
    pub async fn renew(
        &self,
        borrowing_id: i32,
        quant_line_id: i32,
        limits: &EffectiveLimits,
        today: NaiveDate,
    ) -> AppResult<QuantLine> {
        let mut tx = self.pool.begin().await?;
        let borrowing = lock_header(&mut tx, borrowing_id).await?;

        let copy = quant_lines_of(&mut tx, borrowing_id)
            .await?
            .into_iter()
            .find(|c| c.id == quant_line_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("Copy line {} not found in this borrowing", quant_line_id))
            })?;

        let others_waiting: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(SELECT 1 FROM reservations
                          WHERE book_id = $1 AND state IN ('active', 'available') AND borrower_id <> $2)
            "#,
        )
        .bind(copy.book_id)
        .bind(borrowing.borrower_id)
        .fetch_one(&mut *tx)
        .await?;
        check_renewal(
            limits,
            copy.state,
            copy.due_date,
            copy.extension_count,
            others_waiting,
            today,
        )
        .map_err(AppError::BusinessRule)?;

        let new_due = copy.due_date + Duration::days(limits.loan_days as i64);
        sqlx::query(
            r#"
            UPDATE borrowing_quant_lines
            SET due_date = $2, extension_count = extension_count + 1
            WHERE id = $1
            "#,
        )
        .bind(copy.id)
        .bind(new_due)
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE borrowing_lines SET due_date = GREATEST(due_date, $2) WHERE id = $1")
            .bind(copy.line_id)
            .bind(new_due)
            .execute(&mut *tx)
            .await?;

        refresh_derived(&mut tx, borrowing_id).await?;

        let renewed = sqlx::query_as::<_, QuantLine>(&format!("{} WHERE ql.id = $1", QUANT_LINE_SELECT))
            .bind(copy.id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(renewed)
    }

    /// Mark all, or the selected, copies still out as lost
    pub async fn mark_lost(&self, borrowing_id: i32, quant_line_ids: Option<&[i32]>) -> AppResult<BorrowingState> {
        let mut tx = self.pool.begin().await?;
        lock_header(&mut tx, borrowing_id).await?;

        let lost = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE borrowing_quant_lines SET state = 'lost'
            WHERE borrowing_id = $1 AND state IN ('borrowed', 'overdue')
              AND ($2::int[] IS NULL OR id = ANY($2))
            RETURNING quant_id
            "#,
        )
        .bind(borrowing_id)
        .bind(quant_line_ids)
        .fetch_all(&mut *tx)
        .await?;
        if lost.is_empty() {
            return Err(AppError::BusinessRule("No copy on loan to mark as lost".to_string()));
        }
        for quant_id in lost {
            quants::set_state(&mut tx, quant_id, QuantState::Lost).await?;
        }

        let state = refresh_derived(&mut tx, borrowing_id).await?;
        tx.commit().await?;
        Ok(state)
    }

    /// Cancel a borrowing, borrowed copies go back to the shelf
    pub async fn cancel(&self, borrowing_id: i32) -> AppResult<BorrowingState> {
        let mut tx = self.pool.begin().await?;
        let borrowing = lock_header(&mut tx, borrowing_id).await?;
        if matches!(
            borrowing.state,
            BorrowingState::Returned | BorrowingState::Lost | BorrowingState::Cancelled
        ) {
            return Err(AppError::BusinessRule(format!(
                "Borrowing cannot be cancelled (current state: {})",
                borrowing.state
            )));
        }

        let released = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE borrowing_quant_lines SET state = 'cancelled'
            WHERE borrowing_id = $1 AND state IN ('draft', 'borrowed', 'overdue')
            RETURNING quant_id
            "#,
        )
        .bind(borrowing_id)
        .fetch_all(&mut *tx)
        .await?;
        for quant_id in released {
            sqlx::query(
                "UPDATE book_quants SET state = 'available', updated_at = NOW() WHERE id = $1 AND state = 'borrowed'",
            )
            .bind(quant_id)
            .execute(&mut *tx)
            .await?;
        }
        sqlx::query(
            "UPDATE borrowing_lines SET state = 'cancelled' WHERE borrowing_id = $1 AND state NOT IN ('returned', 'lost')",
        )
        .bind(borrowing_id)
        .execute(&mut *tx)
        .await?;

        let state = refresh_derived(&mut tx, borrowing_id).await?;
        tx.commit().await?;
        Ok(state)
    }

    /// cancelled → draft; cancelled allocations are dropped
    pub async fn set_draft(&self, borrowing_id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        let borrowing = lock_header(&mut tx, borrowing_id).await?;
        if borrowing.state != BorrowingState::Cancelled {
            return Err(AppError::BusinessRule(
                "Only cancelled borrowings can be reset to draft".to_string(),
            ));
        }

        sqlx::query("DELETE FROM borrowing_quant_lines WHERE borrowing_id = $1 AND state = 'cancelled'")
            .bind(borrowing_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE borrowing_lines SET state = 'draft' WHERE borrowing_id = $1 AND state = 'cancelled'")
            .bind(borrowing_id)
            .execute(&mut *tx)
            .await?;

        refresh_derived(&mut tx, borrowing_id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Flip borrowed copies past due to overdue; returns the affected borrowings
    pub async fn mark_overdue(&self, today: NaiveDate) -> AppResult<Vec<i32>> {
        let mut tx = self.pool.begin().await?;
        let mut affected = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE borrowing_quant_lines SET state = 'overdue'
            WHERE state = 'borrowed' AND due_date < $1
            RETURNING borrowing_id
            "#,
        )
        .bind(today)
        .fetch_all(&mut *tx)
        .await?;
        affected.sort_unstable();
        affected.dedup();

        for borrowing_id in &affected {
            refresh_derived(&mut tx, *borrowing_id).await?;
        }
        tx.commit().await?;
        Ok(affected)
    }

    /// Borrowings with copies due on a date, for reminders
    pub async fn due_on(&self, due_date: NaiveDate) -> AppResult<Vec<i32>> {
        let ids = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT DISTINCT borrowing_id FROM borrowing_quant_lines
            WHERE state = 'borrowed' AND due_date = $1
            ORDER BY borrowing_id
            "#,
        )
        .bind(due_date)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// Copies currently out for a borrower, all borrowings
    pub async fn active_copies_for_borrower(&self, borrower_id: i32) -> AppResult<Vec<QuantLine>> {
        let rows = sqlx::query_as::<_, QuantLine>(&format!(
            "{} JOIN borrowings br ON br.id = ql.borrowing_id WHERE br.borrower_id = $1 AND ql.state IN ('borrowed', 'overdue') ORDER BY ql.due_date",
            QUANT_LINE_SELECT
        ))
        .bind(borrower_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_borrowing_name_format() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 17).unwrap();
        assert_eq!(borrowing_name(date, 42), "PM/2024/05/00042");
        assert_eq!(sequence_scope(date), "borrowing/2024/05");
    }
}
