//! Book (title) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::cutter::CutterScheme;

/// Book from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub subtitle: Option<String>,
    pub isbn: Option<String>,
    pub publisher_id: Option<i32>,
    pub category_id: Option<i32>,
    pub series_id: Option<i32>,
    /// ISO 639-1 language code, selects the Cutter table
    pub language: String,
    pub publication_year: Option<i32>,
    pub pages: Option<i32>,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub cutter_number: Option<String>,
    /// Visible on the public catalog
    pub is_published: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Author reference inside a book
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookAuthor {
    pub id: i32,
    pub name: String,
}

/// Copy counts of a book
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookAvailability {
    /// Sum of copy quantities
    pub quant_count: i64,
    /// Registered copies ready to lend
    pub available_count: i64,
    pub borrowed_count: i64,
    /// Active or available reservations
    pub reservation_count: i64,
}

/// Book with resolved references and copy counts
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookDetails {
    #[serde(flatten)]
    pub book: Book,
    pub authors: Vec<BookAuthor>,
    pub publisher_name: Option<String>,
    pub category_name: Option<String>,
    pub series_name: Option<String>,
    /// Borrower types allowed to see the book, empty = everybody
    pub allowed_borrower_type_ids: Vec<i32>,
    pub availability: BookAvailability,
}

/// Website book page
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WebsiteBook {
    #[serde(flatten)]
    pub details: BookDetails,
    /// Same category or shared author
    pub related: Vec<BookShort>,
}

/// Short book representation for lists
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookShort {
    pub id: i32,
    pub title: String,
    pub cutter_number: Option<String>,
    pub category_id: Option<i32>,
    pub category_name: Option<String>,
    /// Comma separated author names
    pub author_names: Option<String>,
    pub publication_year: Option<i32>,
    pub quant_count: i64,
    pub available_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Sort options for the public catalog
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BookSort {
    #[default]
    DateDesc,
    DateAsc,
    NameAsc,
    NameDesc,
    Author,
}

impl BookSort {
    pub fn order_clause(&self) -> &'static str {
        match self {
            BookSort::DateDesc => "b.created_at DESC, b.id DESC",
            BookSort::DateAsc => "b.created_at ASC, b.id ASC",
            BookSort::NameAsc => "b.title ASC, b.id ASC",
            BookSort::NameDesc => "b.title DESC, b.id DESC",
            BookSort::Author => "author_names ASC NULLS LAST, b.title ASC",
        }
    }
}

/// Book query parameters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Search in title, author names and keywords
    pub search: Option<String>,
    /// Category filter, descendants included
    pub category_id: Option<i32>,
    pub publisher_id: Option<i32>,
    pub series_id: Option<i32>,
    pub author_id: Option<i32>,
    pub sort: Option<BookSort>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 500, message = "Title is required"))]
    pub title: String,
    pub subtitle: Option<String>,
    #[validate(length(max = 20, message = "ISBN is too long"))]
    pub isbn: Option<String>,
    pub publisher_id: Option<i32>,
    pub category_id: Option<i32>,
    pub series_id: Option<i32>,
    /// Defaults to "vi"
    pub language: Option<String>,
    #[validate(range(min = 0, max = 3000, message = "Invalid publication year"))]
    pub publication_year: Option<i32>,
    #[validate(range(min = 0, message = "Pages cannot be negative"))]
    pub pages: Option<i32>,
    pub description: Option<String>,
    pub keywords: Option<String>,
    #[serde(default)]
    pub author_ids: Vec<i32>,
    #[serde(default)]
    pub allowed_borrower_type_ids: Vec<i32>,
    /// Defaults to true
    pub is_published: Option<bool>,
    /// Manual Cutter number, computed when absent
    pub cutter_number: Option<String>,
}

/// Update book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, max = 500, message = "Title cannot be empty"))]
    pub title: Option<String>,
    pub subtitle: Option<String>,
    #[validate(length(max = 20, message = "ISBN is too long"))]
    pub isbn: Option<String>,
    pub publisher_id: Option<i32>,
    pub category_id: Option<i32>,
    pub series_id: Option<i32>,
    pub language: Option<String>,
    #[validate(range(min = 0, max = 3000, message = "Invalid publication year"))]
    pub publication_year: Option<i32>,
    #[validate(range(min = 0, message = "Pages cannot be negative"))]
    pub pages: Option<i32>,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub author_ids: Option<Vec<i32>>,
    pub allowed_borrower_type_ids: Option<Vec<i32>>,
    pub is_published: Option<bool>,
    pub cutter_number: Option<String>,
}

/// Row of the `book_statistics` report view
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookStatistics {
    pub book_id: i32,
    pub title: String,
    pub category_name: Option<String>,
    pub author_names: Option<String>,
    pub available_quants: i64,
    pub borrowed_quants: i64,
    pub total_quants: i64,
}

/// Cutter preview request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CutterPreviewRequest {
    #[validate(length(min = 1, message = "Text is required"))]
    pub text: String,
    /// Forces a scheme, otherwise chosen from the language tables
    pub scheme: Option<CutterScheme>,
    pub language: Option<String>,
    /// Cutter-Sanborn only
    pub include_second_letter: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CutterPreview {
    pub scheme: CutterScheme,
    pub code: String,
    pub normalized: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_parsing() {
        let sort: BookSort = serde_json::from_str("\"name_desc\"").unwrap();
        assert_eq!(sort, BookSort::NameDesc);
        assert_eq!(BookSort::default(), BookSort::DateDesc);
        assert!(BookSort::Author.order_clause().starts_with("author_names"));
    }
}
