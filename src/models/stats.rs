//! Dashboard and history statistics

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::{book::BookShort, borrowing::BorrowingSummary};

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct StatsQuery {
    /// Defaults to 30 days before `to_date`
    pub from_date: Option<NaiveDate>,
    /// Defaults to today
    pub to_date: Option<NaiveDate>,
    /// Rows per ranking (default 10)
    pub limit: Option<i64>,
}

/// Headline figures
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct DashboardStats {
    pub total_titles: i64,
    pub total_copies: i64,
    pub borrowed_copies: i64,
    pub available_copies: i64,
    pub active_members: i64,
    pub overdue_copies: i64,
    #[schema(value_type = String)]
    pub open_fines: Decimal,
    pub borrowed_in_period: i64,
    pub returned_in_period: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PopularBook {
    pub book_id: i32,
    pub title: String,
    pub borrow_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CategoryShare {
    pub category_id: Option<i32>,
    pub category_name: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct OverdueCopy {
    pub quant_line_id: i32,
    pub borrowing_id: i32,
    pub borrowing_name: Option<String>,
    pub borrower_id: i32,
    pub borrower_name: String,
    pub book_title: String,
    pub registration_number: Option<String>,
    pub due_date: NaiveDate,
    pub late_days: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct DailyTrend {
    pub day: NaiveDate,
    pub borrowed: i64,
    pub returned: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TopBorrower {
    pub borrower_id: i32,
    pub name: String,
    pub borrower_code: String,
    pub borrow_count: i64,
}

/// Everything shown on the librarian dashboard
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Dashboard {
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub stats: DashboardStats,
    pub popular_books: Vec<PopularBook>,
    pub category_distribution: Vec<CategoryShare>,
    pub recent_borrowings: Vec<BorrowingSummary>,
    pub overdue: Vec<OverdueCopy>,
    /// Last seven days, oldest first
    pub trends: Vec<DailyTrend>,
    pub top_borrowers: Vec<TopBorrower>,
    pub new_books_this_month: Vec<BookShort>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct HistoryEntry {
    pub borrowing_id: i32,
    pub borrowing_name: Option<String>,
    pub book_id: i32,
    pub book_title: String,
    pub return_date: Option<NaiveDate>,
}

/// Borrowing history of one member
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HistoryStats {
    pub total_borrowings: i64,
    pub total_books: i64,
    pub current_books: i64,
    pub overdue_books: i64,
    #[schema(value_type = String)]
    pub total_fines: Decimal,
    pub top_categories: Vec<CategoryShare>,
    pub recently_returned: Vec<HistoryEntry>,
}
