//! Late days and fines

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::borrowing::QuantLineState;

/// Days past due for a copy that is still out, 0 otherwise
pub fn late_days(state: QuantLineState, due_date: NaiveDate, today: NaiveDate) -> i32 {
    if !state.is_active() {
        return 0;
    }
    let days = (today - due_date).num_days();
    days.clamp(0, i32::MAX as i64) as i32
}

/// Days between due date and an actual return date
pub fn days_late_on_return(due_date: NaiveDate, return_date: NaiveDate) -> i32 {
    (return_date - due_date).num_days().clamp(0, i32::MAX as i64) as i32
}

/// `max(0, late_days - grace) * rate`
pub fn fine_amount(late_days: i32, grace_days: i32, rate: Decimal) -> Decimal {
    let billable = late_days.saturating_sub(grace_days.max(0));
    if billable <= 0 {
        Decimal::ZERO
    } else {
        Decimal::from(billable) * rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_fine_zero_within_grace() {
        let rate = Decimal::from(5000);
        assert_eq!(fine_amount(0, 0, rate), Decimal::ZERO);
        assert_eq!(fine_amount(2, 2, rate), Decimal::ZERO);
        assert_eq!(fine_amount(1, 3, rate), Decimal::ZERO);
    }

    #[test]
    fn test_fine_after_grace() {
        let rate = Decimal::from(5000);
        assert_eq!(fine_amount(5, 0, rate), Decimal::from(25000));
        assert_eq!(fine_amount(5, 2, rate), Decimal::from(15000));
    }

    #[test]
    fn test_fine_monotonic() {
        let rate = Decimal::new(1250, 2);
        let mut previous = Decimal::ZERO;
        for days in 0..60 {
            let fine = fine_amount(days, 3, rate);
            assert!(fine >= previous);
            previous = fine;
        }
    }

    #[test]
    fn test_late_days_only_for_active_copies() {
        let due = date(2024, 3, 1);
        let today = date(2024, 3, 11);
        assert_eq!(late_days(QuantLineState::Borrowed, due, today), 10);
        assert_eq!(late_days(QuantLineState::Overdue, due, today), 10);
        assert_eq!(late_days(QuantLineState::Returned, due, today), 0);
        assert_eq!(late_days(QuantLineState::Borrowed, today, due), 0);
    }

    #[test]
    fn test_days_late_on_return() {
        assert_eq!(days_late_on_return(date(2024, 1, 10), date(2024, 1, 9)), 0);
        assert_eq!(days_late_on_return(date(2024, 1, 10), date(2024, 2, 1)), 22);
    }
}
