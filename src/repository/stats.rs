//! Dashboard and member history queries

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        borrowing::BorrowingSummary,
        stats::{
            CategoryShare, DailyTrend, DashboardStats, HistoryEntry, OverdueCopy, PopularBook,
            TopBorrower,
        },
    },
};

use super::borrowings::SUMMARY_SELECT;

/// Member totals before category and history lists are attached
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HistoryTotals {
    pub total_borrowings: i64,
    pub total_books: i64,
    pub current_books: i64,
    pub overdue_books: i64,
    pub total_fines: Decimal,
}

#[derive(Clone)]
pub struct StatsRepository {
    pool: Pool<Postgres>,
}

impl StatsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Headline figures; period counts cover `from..=to`
    pub async fn headline(&self, from: NaiveDate, to: NaiveDate, today: NaiveDate) -> AppResult<DashboardStats> {
        let stats = sqlx::query_as::<_, DashboardStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM books WHERE active) AS total_titles,
                (SELECT COALESCE(SUM(quantity), 0)::bigint FROM book_quants WHERE active) AS total_copies,
                (SELECT COUNT(*) FROM book_quants WHERE active AND state = 'borrowed') AS borrowed_copies,
                (SELECT COUNT(*) FROM book_quants WHERE active AND state = 'available') AS available_copies,
                (SELECT COUNT(*) FROM borrowers
                  WHERE active AND membership_expiry >= $3) AS active_members,
                (SELECT COUNT(*) FROM borrowing_quant_lines
                  WHERE state = 'overdue' OR (state = 'borrowed' AND due_date < $3)) AS overdue_copies,
                (SELECT COALESCE(SUM(fine_amount), 0) FROM borrowing_quant_lines
                  WHERE state IN ('returned', 'lost')) AS open_fines,
                (SELECT COUNT(*) FROM borrowing_quant_lines
                  WHERE borrow_date BETWEEN $1 AND $2 AND state <> 'cancelled') AS borrowed_in_period,
                (SELECT COUNT(*) FROM borrowing_quant_lines
                  WHERE return_date BETWEEN $1 AND $2 AND state = 'returned') AS returned_in_period
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(today)
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }

    pub async fn popular_books(&self, from: NaiveDate, to: NaiveDate, limit: i64) -> AppResult<Vec<PopularBook>> {
        let rows = sqlx::query_as::<_, PopularBook>(
            r#"
            SELECT b.id AS book_id, b.title, COUNT(ql.id) AS borrow_count
            FROM borrowing_quant_lines ql
            JOIN book_quants q ON q.id = ql.quant_id
            JOIN books b ON b.id = q.book_id
            WHERE ql.borrow_date BETWEEN $1 AND $2 AND ql.state <> 'cancelled'
            GROUP BY b.id, b.title
            ORDER BY borrow_count DESC, b.title
            LIMIT $3
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Loans per category in the period
    pub async fn category_distribution(&self, from: NaiveDate, to: NaiveDate) -> AppResult<Vec<CategoryShare>> {
        let rows = sqlx::query_as::<_, CategoryShare>(
            r#"
            SELECT c.id AS category_id, COALESCE(c.complete_name, 'Uncategorized') AS category_name,
                   COUNT(ql.id) AS count
            FROM borrowing_quant_lines ql
            JOIN book_quants q ON q.id = ql.quant_id
            JOIN books b ON b.id = q.book_id
            LEFT JOIN categories c ON c.id = b.category_id
            WHERE ql.borrow_date BETWEEN $1 AND $2 AND ql.state <> 'cancelled'
            GROUP BY c.id, c.complete_name
            ORDER BY count DESC, category_name
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn recent_borrowings(&self, limit: i64) -> AppResult<Vec<BorrowingSummary>> {
        let rows = sqlx::query_as::<_, BorrowingSummary>(&format!(
            "{} WHERE br.state <> 'draft' ORDER BY br.created_at DESC, br.id DESC LIMIT $1",
            SUMMARY_SELECT
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn overdue(&self, today: NaiveDate, limit: i64) -> AppResult<Vec<OverdueCopy>> {
        let rows = sqlx::query_as::<_, OverdueCopy>(
            r#"
            SELECT ql.id AS quant_line_id, br.id AS borrowing_id, br.name AS borrowing_name,
                   p.id AS borrower_id, p.name AS borrower_name, b.title AS book_title,
                   q.registration_number, ql.due_date,
                   ($1::date - ql.due_date) AS late_days
            FROM borrowing_quant_lines ql
            JOIN borrowings br ON br.id = ql.borrowing_id
            JOIN borrowers p ON p.id = br.borrower_id
            JOIN book_quants q ON q.id = ql.quant_id
            JOIN books b ON b.id = q.book_id
            WHERE ql.state IN ('borrowed', 'overdue') AND ql.due_date < $1
            ORDER BY ql.due_date, ql.id
            LIMIT $2
            "#,
        )
        .bind(today)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Borrowed and returned copies per day over the last `days` days, oldest first
    pub async fn trends(&self, today: NaiveDate, days: i64) -> AppResult<Vec<DailyTrend>> {
        let start = today - Duration::days(days - 1);
        let rows = sqlx::query_as::<_, DailyTrend>(
            r#"
            SELECT d::date AS day,
                   (SELECT COUNT(*) FROM borrowing_quant_lines
                     WHERE borrow_date = d::date AND state <> 'cancelled') AS borrowed,
                   (SELECT COUNT(*) FROM borrowing_quant_lines
                     WHERE return_date = d::date AND state = 'returned') AS returned
            FROM generate_series($1::date, $2::date, INTERVAL '1 day') AS d
            ORDER BY day
            "#,
        )
        .bind(start)
        .bind(today)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn top_borrowers(&self, from: NaiveDate, to: NaiveDate, limit: i64) -> AppResult<Vec<TopBorrower>> {
        let rows = sqlx::query_as::<_, TopBorrower>(
            r#"
            SELECT p.id AS borrower_id, p.name, p.borrower_code, COUNT(ql.id) AS borrow_count
            FROM borrowing_quant_lines ql
            JOIN borrowings br ON br.id = ql.borrowing_id
            JOIN borrowers p ON p.id = br.borrower_id
            WHERE ql.borrow_date BETWEEN $1 AND $2 AND ql.state <> 'cancelled'
            GROUP BY p.id, p.name, p.borrower_code
            ORDER BY borrow_count DESC, p.name
            LIMIT $3
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Totals of one member; `total_fines` holds fines frozen on return
    pub async fn history_totals(&self, borrower_id: i32, today: NaiveDate) -> AppResult<HistoryTotals> {
        let totals = sqlx::query_as::<_, HistoryTotals>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM borrowings
                  WHERE borrower_id = $1 AND state NOT IN ('draft', 'cancelled')) AS total_borrowings,
                COUNT(ql.id) FILTER (WHERE ql.state NOT IN ('draft', 'cancelled')) AS total_books,
                COUNT(ql.id) FILTER (WHERE ql.state IN ('borrowed', 'overdue')) AS current_books,
                COUNT(ql.id) FILTER (WHERE ql.state IN ('borrowed', 'overdue') AND ql.due_date < $2) AS overdue_books,
                COALESCE(SUM(ql.fine_amount) FILTER (WHERE ql.state IN ('returned', 'lost')), 0) AS total_fines
            FROM borrowing_quant_lines ql
            JOIN borrowings br ON br.id = ql.borrowing_id
            WHERE br.borrower_id = $1
            "#,
        )
        .bind(borrower_id)
        .bind(today)
        .fetch_one(&self.pool)
        .await?;
        Ok(totals)
    }

    pub async fn member_top_categories(&self, borrower_id: i32, limit: i64) -> AppResult<Vec<CategoryShare>> {
        let rows = sqlx::query_as::<_, CategoryShare>(
            r#"
            SELECT c.id AS category_id, COALESCE(c.complete_name, 'Uncategorized') AS category_name,
                   COUNT(ql.id) AS count
            FROM borrowing_quant_lines ql
            JOIN borrowings br ON br.id = ql.borrowing_id
            JOIN book_quants q ON q.id = ql.quant_id
            JOIN books b ON b.id = q.book_id
            LEFT JOIN categories c ON c.id = b.category_id
            WHERE br.borrower_id = $1 AND ql.state NOT IN ('draft', 'cancelled')
            GROUP BY c.id, c.complete_name
            ORDER BY count DESC, category_name
            LIMIT $2
            "#,
        )
        .bind(borrower_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn recently_returned(&self, borrower_id: i32, limit: i64) -> AppResult<Vec<HistoryEntry>> {
        let rows = sqlx::query_as::<_, HistoryEntry>(
            r#"
            SELECT br.id AS borrowing_id, br.name AS borrowing_name, b.id AS book_id,
                   b.title AS book_title, ql.return_date
            FROM borrowing_quant_lines ql
            JOIN borrowings br ON br.id = ql.borrowing_id
            JOIN book_quants q ON q.id = ql.quant_id
            JOIN books b ON b.id = q.book_id
            WHERE br.borrower_id = $1 AND ql.state = 'returned'
            ORDER BY ql.return_date DESC, ql.id DESC
            LIMIT $2
            "#,
        )
        .bind(borrower_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
