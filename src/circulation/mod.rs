//! Circulation rules: fines, state aggregation, limits, registration numbers,
//! renewals and reservation expiry

pub mod aggregate;
pub mod fines;
pub mod limits;
pub mod registration;
pub mod renewal;

pub use aggregate::{borrowing_state, line_state};
pub use fines::{days_late_on_return, fine_amount, late_days};
pub use limits::{
    check_book_limit, check_resource_limit, effective_limits, resource_stats, EffectiveLimits,
    LimitDefaults,
};
pub use registration::{find_duplicate, next_registration_number, suggest_registration_numbers};
pub use renewal::{check_renewal, reservation_expired, EXPIRING_STATE};
