//! Borrowing limits resolved per borrower

use rust_decimal::Decimal;

use crate::models::{
    borrower::{Borrower, BorrowerType},
    resource::{ResourceBorrowerStats, ResourceUsage},
};

/// Limits that apply to one borrower
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveLimits {
    pub max_books: i32,
    pub loan_days: i32,
    pub fine_rate: Decimal,
    pub can_reserve: bool,
    pub can_extend: bool,
    pub max_extensions: i32,
}

/// Library-wide fallbacks taken from the system parameters
#[derive(Debug, Clone, Copy)]
pub struct LimitDefaults {
    pub max_books: i32,
    pub loan_days: i32,
    pub fine_rate: Decimal,
}

/// Personal override, then borrower type, then library default
pub fn effective_limits(
    borrower: &Borrower,
    borrower_type: Option<&BorrowerType>,
    defaults: LimitDefaults,
) -> EffectiveLimits {
    let max_books = borrower
        .max_books_override
        .or(borrower_type.map(|t| t.max_books))
        .unwrap_or(defaults.max_books);
    let loan_days = borrower
        .max_days_override
        .or(borrower_type.map(|t| t.max_days))
        .unwrap_or(defaults.loan_days);
    let fine_rate = borrower_type
        .map(|t| t.daily_fine_amount)
        .unwrap_or(defaults.fine_rate);

    EffectiveLimits {
        max_books,
        loan_days,
        fine_rate,
        can_reserve: borrower_type.map(|t| t.can_reserve).unwrap_or(true),
        can_extend: borrower_type.map(|t| t.can_extend).unwrap_or(true),
        max_extensions: borrower_type.map(|t| t.max_extensions).unwrap_or(2),
    }
}

/// Check `current + requested <= max`, returns the error message otherwise
pub fn check_book_limit(current: i64, requested: i64, max_books: i32) -> Result<(), String> {
    if current + requested > max_books as i64 {
        Err(format!(
            "Borrowing limit exceeded: {} copies out, {} requested, limit is {}",
            current, requested, max_books
        ))
    } else {
        Ok(())
    }
}

/// Resource rules for the copies being lent: on-site collections refuse home
/// loans, the others cap the copies one borrower holds
pub fn check_resource_limit(usage: &ResourceUsage) -> Result<(), String> {
    if usage.requested == 0 {
        return Ok(());
    }
    if !usage.allow_borrowing {
        return Err(format!(
            "Resource \"{}\" does not allow home loans",
            usage.resource_name
        ));
    }
    if usage.current + usage.requested > usage.max_books as i64 {
        return Err(format!(
            "Limit of {} copies from resource \"{}\" reached: {} out, {} requested",
            usage.max_books, usage.resource_name, usage.current, usage.requested
        ));
    }
    Ok(())
}

/// Standing of a borrower in a resource before any new loan
pub fn resource_stats(usage: &ResourceUsage) -> ResourceBorrowerStats {
    let remaining_slots = (usage.max_books as i64 - usage.current).max(0);
    let message = if !usage.allow_borrowing {
        Some(format!("Resource \"{}\" does not allow home loans", usage.resource_name))
    } else if remaining_slots == 0 {
        Some(format!(
            "Limit of {} copies from resource \"{}\" reached",
            usage.max_books, usage.resource_name
        ))
    } else {
        None
    };

    ResourceBorrowerStats {
        resource_id: usage.resource_id,
        resource_name: usage.resource_name.clone(),
        max_books: usage.max_books,
        current_books: usage.current,
        remaining_slots,
        can_borrow: message.is_none(),
        message,
        allow_borrowing: usage.allow_borrowing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn borrower(max_books: Option<i32>, max_days: Option<i32>) -> Borrower {
        Borrower {
            id: 1,
            name: "Minh".to_string(),
            borrower_code: "DG00001".to_string(),
            email: None,
            phone: None,
            address: None,
            id_card: None,
            date_of_birth: None,
            borrower_type_id: Some(1),
            membership_date: None,
            membership_expiry: None,
            max_books_override: max_books,
            max_days_override: max_days,
            notes: None,
            active: true,
            created_at: Utc::now(),
        }
    }

    fn borrower_type() -> BorrowerType {
        BorrowerType {
            id: 1,
            name: "Student".to_string(),
            code: "STUDENT".to_string(),
            max_books: 3,
            max_days: 21,
            daily_fine_amount: Decimal::from(2000),
            can_reserve: true,
            can_extend: false,
            max_extensions: 0,
            description: None,
            active: true,
            created_at: Utc::now(),
        }
    }

    fn defaults() -> LimitDefaults {
        LimitDefaults {
            max_books: 5,
            loan_days: 14,
            fine_rate: Decimal::from(5000),
        }
    }

    #[test]
    fn test_resolution_order() {
        let t = borrower_type();

        let limits = effective_limits(&borrower(None, None), None, defaults());
        assert_eq!((limits.max_books, limits.loan_days), (5, 14));
        assert_eq!(limits.fine_rate, Decimal::from(5000));

        let limits = effective_limits(&borrower(None, None), Some(&t), defaults());
        assert_eq!((limits.max_books, limits.loan_days), (3, 21));
        assert_eq!(limits.fine_rate, Decimal::from(2000));
        assert!(!limits.can_extend);

        let limits = effective_limits(&borrower(Some(8), Some(7)), Some(&t), defaults());
        assert_eq!((limits.max_books, limits.loan_days), (8, 7));
    }

    #[test]
    fn test_book_limit() {
        assert!(check_book_limit(3, 2, 5).is_ok());
        assert!(check_book_limit(4, 2, 5).is_err());
        assert!(check_book_limit(0, 6, 5).is_err());
    }

    fn usage(allow_borrowing: bool, max_books: i32, current: i64, requested: i64) -> ResourceUsage {
        ResourceUsage {
            resource_id: 4,
            resource_name: "Rare books".to_string(),
            allow_borrowing,
            max_books,
            current,
            requested,
        }
    }

    #[test]
    fn test_resource_limit() {
        assert!(check_resource_limit(&usage(true, 1, 0, 1)).is_ok());
        let err = check_resource_limit(&usage(true, 1, 1, 1)).unwrap_err();
        assert!(err.contains("Limit of 1 copies"));
        assert!(check_resource_limit(&usage(true, 3, 1, 3)).is_err());
    }

    #[test]
    fn test_on_site_resource() {
        let err = check_resource_limit(&usage(false, 5, 0, 1)).unwrap_err();
        assert!(err.contains("does not allow home loans"));
        // Nothing from the resource in this loan
        assert!(check_resource_limit(&usage(false, 5, 0, 0)).is_ok());
    }

    #[test]
    fn test_resource_stats() {
        let stats = resource_stats(&usage(true, 3, 1, 0));
        assert_eq!(stats.remaining_slots, 2);
        assert!(stats.can_borrow);
        assert!(stats.message.is_none());

        let stats = resource_stats(&usage(true, 2, 3, 0));
        assert_eq!(stats.remaining_slots, 0);
        assert!(!stats.can_borrow);

        let stats = resource_stats(&usage(false, 2, 0, 0));
        assert!(!stats.can_borrow);
        assert!(!stats.allow_borrowing);
    }
}
