//! Borrowing header, per-book lines and per-copy quant lines

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

db_enum! {
    /// State of a borrowing header, derived from its lines
    BorrowingState {
        Draft => "draft",
        Borrowed => "borrowed",
        Returned => "returned",
        Overdue => "overdue",
        Lost => "lost",
        Cancelled => "cancelled",
    }
}

db_enum! {
    /// State of a per-book line, derived from its quant lines
    LineState {
        Draft => "draft",
        Partial => "partial",
        Allocated => "allocated",
        Borrowed => "borrowed",
        PartialReturn => "partial_return",
        Returned => "returned",
        Overdue => "overdue",
        Lost => "lost",
        Cancelled => "cancelled",
    }
}

db_enum! {
    /// State of one copy inside a borrowing
    QuantLineState {
        Draft => "draft",
        Borrowed => "borrowed",
        Returned => "returned",
        Overdue => "overdue",
        Lost => "lost",
        Cancelled => "cancelled",
    }
}

impl QuantLineState {
    /// Copy is out of the library for this borrowing
    pub fn is_active(&self) -> bool {
        matches!(self, QuantLineState::Borrowed | QuantLineState::Overdue)
    }
}

/// Borrowing header from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Borrowing {
    pub id: i32,
    /// PM/YYYY/MM/NNNNN, assigned on confirmation
    pub name: Option<String>,
    pub borrower_id: i32,
    pub borrow_date: NaiveDate,
    /// Latest due date of the lines
    pub due_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
    pub state: BorrowingState,
    pub notes: Option<String>,
    pub created_by: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-book demand line
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowingLine {
    pub id: i32,
    pub borrowing_id: i32,
    pub book_id: i32,
    pub book_title: String,
    pub requested_quantity: i32,
    pub due_date: NaiveDate,
    pub state: LineState,
    pub notes: Option<String>,
}

/// Per-copy fulfilment line
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct QuantLine {
    pub id: i32,
    pub line_id: i32,
    pub borrowing_id: i32,
    pub quant_id: i32,
    pub registration_number: Option<String>,
    pub book_id: i32,
    pub state: QuantLineState,
    pub borrow_date: Option<NaiveDate>,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    /// Frozen on return, computed on read while the copy is out
    pub late_days: i32,
    #[schema(value_type = String)]
    pub fine_amount: Decimal,
    pub extension_count: i32,
}

/// Line with its copies
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LineDetails {
    #[serde(flatten)]
    pub line: BorrowingLine,
    /// Copies allocated and not cancelled
    pub fulfilled_quantity: i32,
    pub quant_lines: Vec<QuantLine>,
}

/// Borrowing with lines and derived totals
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BorrowingDetails {
    #[serde(flatten)]
    pub borrowing: Borrowing,
    pub borrower_name: String,
    pub borrower_code: String,
    pub lines: Vec<LineDetails>,
    /// Maximum late days over the copies
    pub late_days: i32,
    /// Sum of the copy fines
    #[schema(value_type = String)]
    pub fine_amount: Decimal,
    /// Copies not cancelled
    pub book_count: i64,
}

/// Short borrowing representation for lists
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowingSummary {
    pub id: i32,
    pub name: Option<String>,
    pub borrower_id: i32,
    pub borrower_name: String,
    pub borrow_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
    pub state: BorrowingState,
    pub book_count: i64,
}

/// Borrowing list filters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct BorrowingQuery {
    pub borrower_id: Option<i32>,
    pub state: Option<BorrowingState>,
    /// Search in name and borrower name
    pub search: Option<String>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBorrowing {
    pub borrower_id: i32,
    /// Defaults to today
    pub borrow_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddLine {
    pub book_id: i32,
    #[validate(range(min = 1, max = 50, message = "Requested quantity must be at least 1"))]
    pub requested_quantity: Option<i32>,
    /// Defaults to borrow date + loan days of the borrower
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Allocate copies to a line, automatic selection when no ids are given
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AllocateRequest {
    pub quant_ids: Option<Vec<i32>>,
}

/// Select copies of a borrowing, all active copies when empty
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct QuantLineSelection {
    pub quant_line_ids: Option<Vec<i32>>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReturnRequest {
    pub quant_line_ids: Option<Vec<i32>>,
    /// Defaults to today
    pub return_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReturnOutcome {
    pub returned: usize,
    #[schema(value_type = String)]
    pub total_fine: Decimal,
    pub state: BorrowingState,
    /// Reservations moved to available by the returned copies
    pub notified_reservations: Vec<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_text() {
        assert_eq!(LineState::PartialReturn.as_str(), "partial_return");
        assert_eq!(
            serde_json::to_string(&LineState::PartialReturn).unwrap(),
            "\"partial_return\""
        );
        assert!(QuantLineState::Overdue.is_active());
        assert!(!QuantLineState::Returned.is_active());
    }
}
