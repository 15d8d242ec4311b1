//! Resource collections (rare books, reference shelf, ...) with their own
//! lending policy

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::catalog::default_true;

/// Resource with its book and copy counts
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Resource {
    pub id: i32,
    pub name: String,
    pub code: String,
    pub sequence: i32,
    pub description: Option<String>,
    /// Usage rules shown to borrowers
    pub policy: Option<String>,
    /// Copies of this resource one borrower may hold at once
    pub max_books_per_borrower: i32,
    pub default_borrowing_days: i32,
    /// False for on-site only collections
    pub allow_borrowing: bool,
    pub color: i32,
    pub icon: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub book_count: i64,
    pub available_copies: i64,
    pub borrowed_copies: i64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResourceInput {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 32, message = "Code is required"))]
    pub code: String,
    #[serde(default = "default_sequence")]
    pub sequence: i32,
    pub description: Option<String>,
    pub policy: Option<String>,
    #[serde(default = "default_max_books")]
    #[validate(range(min = 1, message = "Maximum books must be at least 1"))]
    pub max_books_per_borrower: i32,
    #[serde(default = "default_borrowing_days")]
    #[validate(range(min = 1, message = "Borrowing days must be at least 1"))]
    pub default_borrowing_days: i32,
    #[serde(default = "default_true")]
    pub allow_borrowing: bool,
    #[serde(default)]
    pub color: i32,
    pub icon: Option<String>,
}

fn default_sequence() -> i32 {
    10
}

fn default_max_books() -> i32 {
    3
}

fn default_borrowing_days() -> i32 {
    14
}

/// Books to attach to or detach from a resource
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResourceBooks {
    #[validate(length(min = 1, message = "At least one book is required"))]
    pub book_ids: Vec<i32>,
}

/// Holdings of one borrower in one resource
#[derive(Debug, Clone, FromRow)]
pub struct ResourceUsage {
    pub resource_id: i32,
    pub resource_name: String,
    pub allow_borrowing: bool,
    pub max_books: i32,
    /// Copies of the resource the borrower has out
    pub current: i64,
    /// Copies of the resource being lent now
    pub requested: i64,
}

/// Borrower standing in a resource
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ResourceBorrowerStats {
    pub resource_id: i32,
    pub resource_name: String,
    pub max_books: i32,
    pub current_books: i64,
    pub remaining_slots: i64,
    pub can_borrow: bool,
    pub message: Option<String>,
    pub allow_borrowing: bool,
}
