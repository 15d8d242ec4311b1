//! Member signup requests

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

db_enum! {
    SignupState {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SignupRequest {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub id_card: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub borrower_type_id: Option<i32>,
    pub notes: Option<String>,
    pub state: SignupState,
    pub rejection_reason: Option<String>,
    /// Borrower created on approval
    pub borrower_id: Option<i32>,
    pub processed_by: Option<i32>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct SignupQuery {
    pub state: Option<SignupState>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Public signup form
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSignup {
    #[validate(length(min = 2, max = 255, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub id_card: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub borrower_type_id: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RejectSignup {
    #[validate(length(min = 1, message = "A rejection reason is required"))]
    pub reason: String,
}

/// Result of an approval
#[derive(Debug, Serialize, ToSchema)]
pub struct SignupApproval {
    pub signup: SignupRequest,
    pub borrower_id: i32,
    pub user_id: i32,
    pub login: String,
}
