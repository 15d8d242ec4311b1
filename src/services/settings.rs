//! Runtime business parameters: stored values over configuration defaults

use std::collections::HashMap;

use indexmap::IndexMap;
use rust_decimal::Decimal;

use crate::{
    config::LibraryConfig,
    error::{AppError, AppResult},
    models::settings::ParameterEntry,
    repository::Repository,
};

pub const DEFAULT_BORROWING_DAYS: &str = "library.default_borrowing_days";
pub const MAX_BOOKS_PER_BORROWER: &str = "library.max_books_per_borrower";
pub const FINE_RATE_PER_DAY: &str = "library.fine_rate_per_day";
pub const GRACE_PERIOD_DAYS: &str = "library.grace_period_days";
pub const REMINDER_DAYS_BEFORE: &str = "library.reminder_days_before";
pub const ENABLE_EMAIL_NOTIFICATIONS: &str = "library.enable_email_notifications";
pub const RESERVATION_HOLD_DAYS: &str = "library.reservation_hold_days";
pub const DEFAULT_MEMBERSHIP_MONTHS: &str = "library.default_membership_months";

/// Every known key, in display order
pub const PARAMETER_KEYS: [&str; 8] = [
    DEFAULT_BORROWING_DAYS,
    MAX_BOOKS_PER_BORROWER,
    FINE_RATE_PER_DAY,
    GRACE_PERIOD_DAYS,
    REMINDER_DAYS_BEFORE,
    ENABLE_EMAIL_NOTIFICATIONS,
    RESERVATION_HOLD_DAYS,
    DEFAULT_MEMBERSHIP_MONTHS,
];

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_days(value: &str) -> Option<i32> {
    value.trim().parse::<i32>().ok().filter(|v| *v >= 0)
}

fn parse_positive(value: &str) -> Option<i32> {
    value.trim().parse::<i32>().ok().filter(|v| *v > 0)
}

fn parse_amount(value: &str) -> Option<Decimal> {
    value.trim().parse::<Decimal>().ok().filter(|v| !v.is_sign_negative())
}

/// Check a value against the type of its key
fn validate(key: &str, value: &str) -> Result<(), String> {
    let ok = match key {
        DEFAULT_BORROWING_DAYS | MAX_BOOKS_PER_BORROWER | DEFAULT_MEMBERSHIP_MONTHS => {
            parse_positive(value).is_some()
        }
        GRACE_PERIOD_DAYS | REMINDER_DAYS_BEFORE | RESERVATION_HOLD_DAYS => parse_days(value).is_some(),
        FINE_RATE_PER_DAY => parse_amount(value).is_some(),
        ENABLE_EMAIL_NOTIFICATIONS => parse_bool(value).is_some(),
        _ => return Err(format!("Unknown parameter: {}", key)),
    };
    if ok {
        Ok(())
    } else {
        Err(format!("Invalid value '{}' for {}", value, key))
    }
}

/// Apply stored values over the defaults; unparsable values are ignored
pub fn resolve(defaults: &LibraryConfig, stored: &HashMap<String, String>) -> LibraryConfig {
    let get = |key: &str| stored.get(key).map(String::as_str);
    LibraryConfig {
        default_borrowing_days: get(DEFAULT_BORROWING_DAYS)
            .and_then(parse_positive)
            .unwrap_or(defaults.default_borrowing_days),
        max_books_per_borrower: get(MAX_BOOKS_PER_BORROWER)
            .and_then(parse_positive)
            .unwrap_or(defaults.max_books_per_borrower),
        fine_rate_per_day: get(FINE_RATE_PER_DAY)
            .and_then(parse_amount)
            .unwrap_or(defaults.fine_rate_per_day),
        grace_period_days: get(GRACE_PERIOD_DAYS)
            .and_then(parse_days)
            .unwrap_or(defaults.grace_period_days),
        reminder_days_before: get(REMINDER_DAYS_BEFORE)
            .and_then(parse_days)
            .unwrap_or(defaults.reminder_days_before),
        enable_email_notifications: get(ENABLE_EMAIL_NOTIFICATIONS)
            .and_then(parse_bool)
            .unwrap_or(defaults.enable_email_notifications),
        reservation_hold_days: get(RESERVATION_HOLD_DAYS)
            .and_then(parse_days)
            .unwrap_or(defaults.reservation_hold_days),
        default_membership_months: get(DEFAULT_MEMBERSHIP_MONTHS)
            .and_then(parse_positive)
            .unwrap_or(defaults.default_membership_months),
    }
}

/// Text form of each parameter, in key order
fn as_text(params: &LibraryConfig) -> [String; 8] {
    [
        params.default_borrowing_days.to_string(),
        params.max_books_per_borrower.to_string(),
        params.fine_rate_per_day.to_string(),
        params.grace_period_days.to_string(),
        params.reminder_days_before.to_string(),
        params.enable_email_notifications.to_string(),
        params.reservation_hold_days.to_string(),
        params.default_membership_months.to_string(),
    ]
}

#[derive(Clone)]
pub struct SettingsService {
    repository: Repository,
    defaults: LibraryConfig,
}

impl SettingsService {
    pub fn new(repository: Repository, defaults: LibraryConfig) -> Self {
        Self { repository, defaults }
    }

    /// Effective parameters for business rules
    pub async fn parameters(&self) -> AppResult<LibraryConfig> {
        let stored = self.stored().await?;
        Ok(resolve(&self.defaults, &stored))
    }

    async fn stored(&self) -> AppResult<HashMap<String, String>> {
        Ok(self
            .repository
            .parameters
            .list()
            .await?
            .into_iter()
            .map(|p| (p.key, p.value))
            .collect())
    }

    /// All parameters with their defaults, in key order
    pub async fn list(&self) -> AppResult<IndexMap<String, ParameterEntry>> {
        let stored = self.stored().await?;
        let effective = as_text(&resolve(&self.defaults, &stored));
        let defaults = as_text(&self.defaults);

        Ok(PARAMETER_KEYS
            .iter()
            .zip(effective)
            .zip(defaults)
            .map(|((key, value), default)| {
                let overridden = stored
                    .get(*key)
                    .map(|v| validate(key, v).is_ok())
                    .unwrap_or(false);
                (
                    key.to_string(),
                    ParameterEntry {
                        value,
                        default,
                        overridden,
                    },
                )
            })
            .collect())
    }

    /// Store a value after checking it parses for its key
    pub async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        if !PARAMETER_KEYS.contains(&key) {
            return Err(AppError::NotFound(format!("Unknown parameter: {}", key)));
        }
        validate(key, value).map_err(AppError::Validation)?;
        self.repository.parameters.upsert(key, value.trim()).await?;
        tracing::info!("Parameter {} set to {}", key, value.trim());
        Ok(())
    }

    /// Drop a stored value so the default applies again
    pub async fn reset(&self, key: &str) -> AppResult<()> {
        if !PARAMETER_KEYS.contains(&key) {
            return Err(AppError::NotFound(format!("Unknown parameter: {}", key)));
        }
        self.repository.parameters.delete(key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_stored_values_win() {
        let defaults = LibraryConfig::default();
        let params = resolve(
            &defaults,
            &stored(&[
                (DEFAULT_BORROWING_DAYS, "21"),
                (FINE_RATE_PER_DAY, "2500.50"),
                (ENABLE_EMAIL_NOTIFICATIONS, "False"),
            ]),
        );
        assert_eq!(params.default_borrowing_days, 21);
        assert_eq!(params.fine_rate_per_day, "2500.50".parse::<Decimal>().unwrap());
        assert!(!params.enable_email_notifications);
        assert_eq!(params.max_books_per_borrower, defaults.max_books_per_borrower);
    }

    #[test]
    fn test_unparsable_values_fall_back() {
        let defaults = LibraryConfig::default();
        let params = resolve(
            &defaults,
            &stored(&[
                (MAX_BOOKS_PER_BORROWER, "many"),
                (GRACE_PERIOD_DAYS, "-3"),
                (FINE_RATE_PER_DAY, "-1"),
            ]),
        );
        assert_eq!(params.max_books_per_borrower, defaults.max_books_per_borrower);
        assert_eq!(params.grace_period_days, defaults.grace_period_days);
        assert_eq!(params.fine_rate_per_day, defaults.fine_rate_per_day);
    }

    #[test]
    fn test_validate() {
        assert!(validate(RESERVATION_HOLD_DAYS, "0").is_ok());
        assert!(validate(DEFAULT_BORROWING_DAYS, "0").is_err());
        assert!(validate(ENABLE_EMAIL_NOTIFICATIONS, "yes").is_ok());
        assert!(validate("library.unknown", "1").is_err());
    }
}
