//! Book quant (physical copy) model

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

db_enum! {
    /// Lifecycle state of a physical copy
    QuantState {
        Available => "available",
        Borrowed => "borrowed",
        Reserved => "reserved",
        Maintenance => "maintenance",
        Lost => "lost",
        Damaged => "damaged",
    }
}

impl QuantState {
    /// States a librarian may set by hand
    pub fn is_manual(&self) -> bool {
        matches!(
            self,
            QuantState::Available | QuantState::Maintenance | QuantState::Damaged | QuantState::Lost
        )
    }

    /// Lent or held copies stay until they come back to the shelf
    pub fn is_in_circulation(&self) -> bool {
        matches!(self, QuantState::Borrowed | QuantState::Reserved)
    }
}

/// Copy with book, location and type details
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Quant {
    pub id: i32,
    pub book_id: i32,
    pub book_title: String,
    pub registration_number: Option<String>,
    pub location_id: Option<i32>,
    pub location_name: Option<String>,
    pub is_borrow_location: Option<bool>,
    pub quant_type_id: Option<i32>,
    pub quant_type_name: Option<String>,
    pub can_borrow: Option<bool>,
    pub state: QuantState,
    pub quantity: i32,
    pub acquisition_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub note: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quant {
    /// Copy that can be allocated to a borrowing line
    pub fn is_lendable(&self) -> bool {
        self.active
            && self.state == QuantState::Available
            && self.registration_number.is_some()
            && self.can_borrow.unwrap_or(false)
            && self.is_borrow_location.unwrap_or(false)
    }
}

/// Create copy request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateQuant {
    /// Suggested from the last copy when absent
    #[validate(length(min = 1, max = 64, message = "Invalid registration number"))]
    pub registration_number: Option<String>,
    pub location_id: Option<i32>,
    pub quant_type_id: Option<i32>,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: Option<i32>,
    pub acquisition_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub note: Option<String>,
}

/// Create several copies at once
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateQuantBatch {
    #[validate(range(min = 1, max = 500, message = "Count must be between 1 and 500"))]
    pub count: i32,
    /// Explicit numbers, must hold `count` entries when given
    pub registration_numbers: Option<Vec<String>>,
    pub location_id: Option<i32>,
    pub quant_type_id: Option<i32>,
    pub acquisition_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub note: Option<String>,
}

/// Update copy request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateQuant {
    #[validate(length(min = 1, max = 64, message = "Invalid registration number"))]
    pub registration_number: Option<String>,
    pub location_id: Option<i32>,
    pub quant_type_id: Option<i32>,
    /// One of available, maintenance, damaged, lost
    pub state: Option<QuantState>,
    pub note: Option<String>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
}

/// Next registration numbers for a book
#[derive(Debug, Serialize, ToSchema)]
pub struct RegistrationSuggestion {
    pub last: Option<String>,
    pub suggestions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_states() {
        assert!(QuantState::Maintenance.is_manual());
        assert!(!QuantState::Borrowed.is_manual());
        assert!(!QuantState::Reserved.is_manual());
        assert_eq!("damaged".parse::<QuantState>().unwrap(), QuantState::Damaged);
    }

    #[test]
    fn test_held_copy_is_in_circulation() {
        assert!(QuantState::Borrowed.is_in_circulation());
        assert!(QuantState::Reserved.is_in_circulation());
        assert!(!QuantState::Maintenance.is_in_circulation());
        assert!(!QuantState::Available.is_in_circulation());
    }
}
