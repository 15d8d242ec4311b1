//! Borrowers service: membership dates, limits and statistics

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;

use crate::{
    circulation::{effective_limits, fine_amount, late_days, EffectiveLimits, LimitDefaults},
    config::LibraryConfig,
    error::{AppError, AppResult},
    models::{
        borrower::{Borrower, BorrowerDetails, BorrowerQuery, CreateBorrower, UpdateBorrower},
        Page, PageQuery,
    },
    repository::Repository,
    services::settings::SettingsService,
};

/// End of a membership starting on `start` and lasting `months`
pub fn membership_expiry(start: NaiveDate, months: i32) -> NaiveDate {
    start
        .checked_add_months(Months::new(months.max(0) as u32))
        .unwrap_or(NaiveDate::MAX)
}

/// Library-wide fallbacks from the business parameters
pub fn limit_defaults(params: &LibraryConfig) -> LimitDefaults {
    LimitDefaults {
        max_books: params.max_books_per_borrower,
        loan_days: params.default_borrowing_days,
        fine_rate: params.fine_rate_per_day,
    }
}

#[derive(Clone)]
pub struct BorrowersService {
    repository: Repository,
    settings: SettingsService,
}

impl BorrowersService {
    pub fn new(repository: Repository, settings: SettingsService) -> Self {
        Self { repository, settings }
    }

    pub async fn list(&self, query: &BorrowerQuery, today: NaiveDate) -> AppResult<Page<Borrower>> {
        let page = PageQuery {
            page: query.page,
            per_page: query.per_page,
        };
        let (items, total) = self
            .repository
            .borrowers
            .list(query, today, page.per_page(), page.offset())
            .await?;
        Ok(Page::new(items, total, &page))
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Borrower> {
        self.repository.borrowers.get_by_id(id).await
    }

    /// Limits of a borrower resolved against its type and the parameters
    pub async fn limits(&self, borrower: &Borrower) -> AppResult<EffectiveLimits> {
        let params = self.settings.parameters().await?;
        let borrower_type = match borrower.borrower_type_id {
            Some(type_id) => Some(self.repository.references.get_borrower_type(type_id).await?),
            None => None,
        };
        Ok(effective_limits(borrower, borrower_type.as_ref(), limit_defaults(&params)))
    }

    /// Borrower with type, limits and statistics; open fines include
    /// fines accrued on copies still out
    pub async fn details(&self, id: i32, today: NaiveDate) -> AppResult<BorrowerDetails> {
        let borrower = self.repository.borrowers.get_by_id(id).await?;
        let params = self.settings.parameters().await?;
        let borrower_type = match borrower.borrower_type_id {
            Some(type_id) => Some(self.repository.references.get_borrower_type(type_id).await?),
            None => None,
        };
        let limits = effective_limits(&borrower, borrower_type.as_ref(), limit_defaults(&params));

        let mut stats = self.repository.borrowers.stats(id, today).await?;
        let accrued: Decimal = self
            .repository
            .borrowings
            .active_copies_for_borrower(id)
            .await?
            .iter()
            .map(|c| {
                fine_amount(
                    late_days(c.state, c.due_date, today),
                    params.grace_period_days,
                    limits.fine_rate,
                )
            })
            .sum();
        stats.open_fines += accrued;

        Ok(BorrowerDetails {
            is_membership_active: borrower.is_membership_active(today),
            max_books: limits.max_books,
            max_days: limits.loan_days,
            borrower,
            borrower_type,
            stats,
        })
    }

    pub async fn create(&self, data: &CreateBorrower, today: NaiveDate) -> AppResult<Borrower> {
        let params = self.settings.parameters().await?;
        let start = data.membership_date.unwrap_or(today);
        let expiry = data
            .membership_expiry
            .unwrap_or_else(|| membership_expiry(start, params.default_membership_months));
        if expiry < start {
            return Err(AppError::Validation(
                "Membership expiry cannot be before the membership date".to_string(),
            ));
        }
        if let Some(type_id) = data.borrower_type_id {
            self.repository.references.get_borrower_type(type_id).await?;
        }

        let borrower = self.repository.borrowers.create(data, start, expiry).await?;
        tracing::info!("Created borrower {} ({})", borrower.borrower_code, borrower.name);
        Ok(borrower)
    }

    pub async fn update(&self, id: i32, data: &UpdateBorrower) -> AppResult<Borrower> {
        let current = self.repository.borrowers.get_by_id(id).await?;
        let start = data.membership_date.or(current.membership_date);
        let expiry = data.membership_expiry.or(current.membership_expiry);
        if let (Some(start), Some(expiry)) = (start, expiry) {
            if expiry < start {
                return Err(AppError::Validation(
                    "Membership expiry cannot be before the membership date".to_string(),
                ));
            }
        }
        if let Some(type_id) = data.borrower_type_id {
            self.repository.references.get_borrower_type(type_id).await?;
        }
        self.repository.borrowers.update(id, data).await
    }

    /// Extend the membership from its expiry, or from today when it lapsed
    pub async fn renew_membership(&self, id: i32, months: Option<i32>, today: NaiveDate) -> AppResult<Borrower> {
        let borrower = self.repository.borrowers.get_by_id(id).await?;
        let months = match months {
            Some(m) if m > 0 => m,
            Some(_) => {
                return Err(AppError::Validation("Months must be positive".to_string()));
            }
            None => self.settings.parameters().await?.default_membership_months,
        };
        let from = borrower
            .membership_expiry
            .filter(|expiry| *expiry >= today)
            .unwrap_or(today);
        let expiry = membership_expiry(from, months);

        let borrower = self.repository.borrowers.set_membership_expiry(id, expiry).await?;
        tracing::info!("Membership of {} renewed until {}", borrower.borrower_code, expiry);
        Ok(borrower)
    }

    pub async fn archive(&self, id: i32) -> AppResult<()> {
        self.repository.borrowers.archive(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_membership_expiry() {
        assert_eq!(membership_expiry(date(2024, 1, 15), 12), date(2025, 1, 15));
        // clamped to the end of a shorter month
        assert_eq!(membership_expiry(date(2024, 1, 31), 1), date(2024, 2, 29));
        assert_eq!(membership_expiry(date(2024, 3, 1), 0), date(2024, 3, 1));
    }

    #[test]
    fn test_limit_defaults_follow_parameters() {
        let mut params = LibraryConfig::default();
        params.max_books_per_borrower = 8;
        params.default_borrowing_days = 21;
        let defaults = limit_defaults(&params);
        assert_eq!(defaults.max_books, 8);
        assert_eq!(defaults.loan_days, 21);
        assert_eq!(defaults.fine_rate, params.fine_rate_per_day);
    }
}
