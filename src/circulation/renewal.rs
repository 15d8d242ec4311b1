//! Loan renewal and reservation expiry rules

use chrono::NaiveDate;

use crate::models::{borrowing::QuantLineState, reservation::ReservationState};

use super::EffectiveLimits;

/// Only a copy held for pickup can lapse; waiting reservations stay queued
pub const EXPIRING_STATE: ReservationState = ReservationState::Available;

/// Whether a reservation lapses on `today`
pub fn reservation_expired(state: ReservationState, expiry_date: NaiveDate, today: NaiveDate) -> bool {
    state == EXPIRING_STATE && expiry_date < today
}

/// Check that one copy may be extended, returns the refusal message otherwise
pub fn check_renewal(
    limits: &EffectiveLimits,
    state: QuantLineState,
    due_date: NaiveDate,
    extension_count: i32,
    others_waiting: bool,
    today: NaiveDate,
) -> Result<(), String> {
    if !limits.can_extend {
        return Err("This borrower type cannot extend loans".to_string());
    }
    if state != QuantLineState::Borrowed || due_date < today {
        return Err("Only copies on loan and not overdue can be renewed".to_string());
    }
    if extension_count >= limits.max_extensions {
        return Err(format!(
            "Maximum number of extensions reached ({})",
            limits.max_extensions
        ));
    }
    if others_waiting {
        return Err("Another borrower is waiting for this book".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn limits(can_extend: bool, max_extensions: i32) -> EffectiveLimits {
        EffectiveLimits {
            max_books: 5,
            loan_days: 14,
            fine_rate: Decimal::from(5000),
            can_reserve: true,
            can_extend,
            max_extensions,
        }
    }

    #[test]
    fn test_waiting_reservation_never_expires() {
        let today = date("2024-01-10");
        assert!(!reservation_expired(ReservationState::Active, date("2024-01-04"), today));
        assert!(!reservation_expired(ReservationState::Draft, date("2024-01-04"), today));
    }

    #[test]
    fn test_held_copy_expires_after_window() {
        let today = date("2024-01-10");
        assert!(reservation_expired(ReservationState::Available, date("2024-01-09"), today));
        assert!(!reservation_expired(ReservationState::Available, date("2024-01-10"), today));
    }

    #[test]
    fn test_renewal_allowed() {
        let today = date("2024-03-01");
        let result = check_renewal(&limits(true, 2), QuantLineState::Borrowed, date("2024-03-01"), 1, false, today);
        assert!(result.is_ok());
    }

    #[test]
    fn test_renewal_refusals() {
        let today = date("2024-03-01");
        let due = date("2024-03-05");

        let err = check_renewal(&limits(false, 2), QuantLineState::Borrowed, due, 0, false, today).unwrap_err();
        assert!(err.contains("cannot extend"));

        let err = check_renewal(&limits(true, 2), QuantLineState::Borrowed, date("2024-02-28"), 0, false, today)
            .unwrap_err();
        assert!(err.contains("not overdue"));

        let err = check_renewal(&limits(true, 2), QuantLineState::Overdue, due, 0, false, today).unwrap_err();
        assert!(err.contains("not overdue"));

        let err = check_renewal(&limits(true, 2), QuantLineState::Borrowed, due, 2, false, today).unwrap_err();
        assert!(err.contains("Maximum number of extensions reached (2)"));

        let err = check_renewal(&limits(true, 2), QuantLineState::Borrowed, due, 0, true, today).unwrap_err();
        assert!(err.contains("waiting"));
    }
}
