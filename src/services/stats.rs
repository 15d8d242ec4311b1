//! Dashboard and member history statistics

use chrono::{Datelike, Duration, NaiveDate};

use crate::{
    error::{AppError, AppResult},
    models::stats::{Dashboard, HistoryStats, StatsQuery},
    repository::Repository,
};

/// Default length of the dashboard period
pub const DEFAULT_PERIOD_DAYS: i64 = 30;
/// Default rows per ranking
pub const DEFAULT_LIMIT: i64 = 10;
/// Days covered by the trend chart
pub const TREND_DAYS: i64 = 7;

/// Period of a dashboard query: `to` defaults to today, `from` to 30 days before `to`
pub fn resolve_period(query: &StatsQuery, today: NaiveDate) -> AppResult<(NaiveDate, NaiveDate)> {
    let to = query.to_date.unwrap_or(today);
    let from = query
        .from_date
        .unwrap_or(to - Duration::days(DEFAULT_PERIOD_DAYS));
    if from > to {
        return Err(AppError::Validation(
            "from_date must not be after to_date".to_string(),
        ));
    }
    Ok((from, to))
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
}

impl StatsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn dashboard(&self, query: &StatsQuery, today: NaiveDate) -> AppResult<Dashboard> {
        let (from, to) = resolve_period(query, today)?;
        let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, 100);
        let stats = &self.repository.stats;

        Ok(Dashboard {
            from_date: from,
            to_date: to,
            stats: stats.headline(from, to, today).await?,
            popular_books: stats.popular_books(from, to, limit).await?,
            category_distribution: stats.category_distribution(from, to).await?,
            recent_borrowings: stats.recent_borrowings(limit).await?,
            overdue: stats.overdue(today, limit).await?,
            trends: stats.trends(today, TREND_DAYS).await?,
            top_borrowers: stats.top_borrowers(from, to, limit).await?,
            new_books_this_month: self
                .repository
                .books
                .created_since(first_of_month(today), limit)
                .await?,
        })
    }

    /// Borrowing history of one member
    pub async fn history(&self, borrower_id: i32, today: NaiveDate) -> AppResult<HistoryStats> {
        let totals = self.repository.stats.history_totals(borrower_id, today).await?;
        Ok(HistoryStats {
            total_borrowings: totals.total_borrowings,
            total_books: totals.total_books,
            current_books: totals.current_books,
            overdue_books: totals.overdue_books,
            total_fines: totals.total_fines,
            top_categories: self
                .repository
                .stats
                .member_top_categories(borrower_id, 5)
                .await?,
            recently_returned: self
                .repository
                .stats
                .recently_returned(borrower_id, DEFAULT_LIMIT)
                .await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_default_period() {
        let today = date(2024, 6, 30);
        let (from, to) = resolve_period(&StatsQuery::default(), today).unwrap();
        assert_eq!(to, today);
        assert_eq!(from, date(2024, 5, 31));
    }

    #[test]
    fn test_inverted_period_rejected() {
        let query = StatsQuery {
            from_date: Some(date(2024, 6, 10)),
            to_date: Some(date(2024, 6, 1)),
            limit: None,
        };
        assert!(resolve_period(&query, date(2024, 6, 30)).is_err());
    }

    #[test]
    fn test_first_of_month() {
        assert_eq!(first_of_month(date(2024, 2, 29)), date(2024, 2, 1));
    }
}
