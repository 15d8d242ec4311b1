//! Reference entities: authors, publishers, series, quant types,
//! character mappings and the two hierarchies (categories, locations)

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

db_enum! {
    /// Who may see a category on the website
    AccessLevel {
        Public => "public",
        Members => "members",
        Staff => "staff",
    }
}

db_enum! {
    /// Kind of location
    LocationType {
        Library => "library",
        Room => "room",
        Shelf => "shelf",
        Storage => "storage",
    }
}

/// Filter for reference lists
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct ReferenceQuery {
    /// Case-insensitive name search
    pub name: Option<String>,
    /// Include archived records
    pub include_inactive: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Author {
    pub id: i32,
    pub name: String,
    pub birth_date: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
    pub nationality: Option<String>,
    pub biography: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AuthorInput {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    pub birth_date: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
    pub nationality: Option<String>,
    pub biography: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Publisher {
    pub id: i32,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PublisherInput {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Series {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SeriesInput {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    pub description: Option<String>,
}

/// Tag on a copy deciding whether it leaves the building
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct QuantType {
    pub id: i32,
    pub name: String,
    pub code: String,
    /// Display color (hex)
    pub color: Option<String>,
    pub can_borrow: bool,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct QuantTypeInput {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 32, message = "Code is required"))]
    pub code: String,
    pub color: Option<String>,
    #[serde(default = "default_true")]
    pub can_borrow: bool,
    pub description: Option<String>,
}

/// One rhyme → code row of a Cutter table
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CharacterMapping {
    pub id: i32,
    pub rhyme: String,
    pub code: String,
    pub language: String,
    pub active: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CharacterMappingInput {
    #[validate(length(min = 1, max = 16, message = "Rhyme is required"))]
    pub rhyme: String,
    #[validate(length(min = 1, max = 16, message = "Code is required"))]
    pub code: String,
    #[validate(length(min = 2, max = 8, message = "Language code must be 2-8 characters"))]
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub slug: Option<String>,
    pub parent_id: Option<i32>,
    /// Materialized path of ids, e.g. "1/4/9/"
    pub parent_path: String,
    /// "Parent / Child"
    pub complete_name: String,
    pub sequence: i32,
    pub access_level: AccessLevel,
    pub is_website_menu: bool,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CategoryInput {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    pub slug: Option<String>,
    pub parent_id: Option<i32>,
    #[serde(default)]
    pub sequence: i32,
    pub access_level: Option<AccessLevel>,
    #[serde(default)]
    pub is_website_menu: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Location {
    pub id: i32,
    pub name: String,
    pub code: Option<String>,
    pub location_type: LocationType,
    pub parent_id: Option<i32>,
    pub parent_path: String,
    pub complete_name: String,
    pub capacity: Option<i32>,
    /// Copies stored here may be lent
    pub is_borrow_location: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LocationInput {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    pub code: Option<String>,
    pub location_type: Option<LocationType>,
    pub parent_id: Option<i32>,
    #[validate(range(min = 0, message = "Capacity cannot be negative"))]
    pub capacity: Option<i32>,
    #[serde(default = "default_true")]
    pub is_borrow_location: bool,
}

/// Category with its children, for the website menu
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CategoryNode {
    pub id: i32,
    pub name: String,
    pub slug: Option<String>,
    pub children: Vec<CategoryNode>,
}

pub(crate) fn default_true() -> bool {
    true
}
