//! Borrowers (library members) and borrower types

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::catalog::default_true;

/// Category of member controlling limits and fine rates
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowerType {
    pub id: i32,
    pub name: String,
    pub code: String,
    pub max_books: i32,
    pub max_days: i32,
    #[schema(value_type = String)]
    pub daily_fine_amount: Decimal,
    pub can_reserve: bool,
    pub can_extend: bool,
    pub max_extensions: i32,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BorrowerTypeInput {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 32, message = "Code is required"))]
    pub code: String,
    #[validate(range(min = 1, message = "Max books must be at least 1"))]
    #[serde(default = "default_max_books")]
    pub max_books: i32,
    #[validate(range(min = 1, message = "Max days must be at least 1"))]
    #[serde(default = "default_max_days")]
    pub max_days: i32,
    #[schema(value_type = Option<String>)]
    pub daily_fine_amount: Option<Decimal>,
    #[serde(default = "default_true")]
    pub can_reserve: bool,
    #[serde(default = "default_true")]
    pub can_extend: bool,
    #[validate(range(min = 0, message = "Max extensions cannot be negative"))]
    #[serde(default = "default_max_extensions")]
    pub max_extensions: i32,
    pub description: Option<String>,
}

fn default_max_books() -> i32 {
    5
}

fn default_max_days() -> i32 {
    30
}

fn default_max_extensions() -> i32 {
    2
}

/// Borrower from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Borrower {
    pub id: i32,
    pub name: String,
    /// Sequential code such as DG00001
    pub borrower_code: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub id_card: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub borrower_type_id: Option<i32>,
    pub membership_date: Option<NaiveDate>,
    pub membership_expiry: Option<NaiveDate>,
    /// Personal override of the borrower type limit
    pub max_books_override: Option<i32>,
    pub max_days_override: Option<i32>,
    pub notes: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Borrower {
    pub fn is_membership_active(&self, today: NaiveDate) -> bool {
        self.membership_expiry.map(|d| d >= today).unwrap_or(false)
    }
}

/// Computed borrowing figures for one borrower
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowerStats {
    pub borrowing_count: i64,
    /// Copies currently borrowed or overdue
    pub current_copies: i64,
    pub overdue_copies: i64,
    pub open_reservations: i64,
    /// Fines of returned copies plus fines accrued on late active copies
    #[schema(value_type = String)]
    pub open_fines: Decimal,
}

/// Borrower with type, membership status and statistics
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BorrowerDetails {
    #[serde(flatten)]
    pub borrower: Borrower,
    pub borrower_type: Option<BorrowerType>,
    pub is_membership_active: bool,
    pub max_books: i32,
    pub max_days: i32,
    pub stats: BorrowerStats,
}

/// Borrower list filters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct BorrowerQuery {
    /// Search in name, code, email, phone
    pub search: Option<String>,
    pub borrower_type_id: Option<i32>,
    /// Only borrowers with an active membership
    pub active_membership: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBorrower {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub id_card: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub borrower_type_id: Option<i32>,
    /// Defaults to today
    pub membership_date: Option<NaiveDate>,
    /// Defaults to membership date + default membership months
    pub membership_expiry: Option<NaiveDate>,
    #[validate(range(min = 1, message = "Max books must be at least 1"))]
    pub max_books_override: Option<i32>,
    #[validate(range(min = 1, message = "Max days must be at least 1"))]
    pub max_days_override: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBorrower {
    #[validate(length(min = 1, max = 255, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub id_card: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub borrower_type_id: Option<i32>,
    pub membership_date: Option<NaiveDate>,
    pub membership_expiry: Option<NaiveDate>,
    #[validate(range(min = 1, message = "Max books must be at least 1"))]
    pub max_books_override: Option<i32>,
    #[validate(range(min = 1, message = "Max days must be at least 1"))]
    pub max_days_override: Option<i32>,
    pub notes: Option<String>,
}

/// Extend a membership by a number of months (defaults to the library setting)
#[derive(Debug, Deserialize, ToSchema)]
pub struct RenewMembership {
    pub months: Option<i32>,
}
