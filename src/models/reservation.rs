//! Reservation model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

db_enum! {
    /// Reservation lifecycle
    ReservationState {
        Draft => "draft",
        Active => "active",
        Available => "available",
        Fulfilled => "fulfilled",
        Cancelled => "cancelled",
        Expired => "expired",
    }
}

impl ReservationState {
    /// Still waiting for, or holding, a copy
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            ReservationState::Draft | ReservationState::Active | ReservationState::Available
        )
    }
}

/// Reservation with borrower and book names
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Reservation {
    pub id: i32,
    /// RSV/NNNNN
    pub name: String,
    pub borrower_id: i32,
    pub borrower_name: String,
    pub book_id: i32,
    pub book_title: String,
    /// Specific copy, set when reserved for a copy or when one is held
    pub quant_id: Option<i32>,
    pub registration_number: Option<String>,
    pub reservation_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub state: ReservationState,
    /// 0 (normal) to 3 (very urgent)
    pub priority: i16,
    pub notes: Option<String>,
    pub borrowing_id: Option<i32>,
    pub notified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct ReservationQuery {
    pub borrower_id: Option<i32>,
    pub book_id: Option<i32>,
    pub state: Option<ReservationState>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReservation {
    pub borrower_id: i32,
    pub book_id: i32,
    pub quant_id: Option<i32>,
    #[validate(range(min = 0, max = 3, message = "Priority must be between 0 and 3"))]
    pub priority: Option<i16>,
    /// Defaults to today
    pub reservation_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Member-side reservation request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReserveBook {
    pub book_id: i32,
    pub notes: Option<String>,
}
