//! Daily circulation jobs: overdue marking, due-date reminders and
//! reservation expiry.
//!
//! The loop wakes up every `tick_seconds`; each job runs at most once per
//! calendar day, the day being claimed in the database so several server
//! instances do not repeat it.

use std::future::Future;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::{
    config::SchedulerConfig,
    error::AppResult,
    repository::Repository,
    services::{borrowings::BorrowingsService, reservations::ReservationsService},
};

pub const JOB_MARK_OVERDUE: &str = "mark_overdue";
pub const JOB_DUE_REMINDERS: &str = "due_reminders";
pub const JOB_EXPIRE_RESERVATIONS: &str = "expire_reservations";

/// Run `job` when `claim` grants today's slot; `None` when already done
pub async fn run_guarded<C, J>(claim: C, job: J) -> AppResult<Option<u64>>
where
    C: Future<Output = AppResult<bool>>,
    J: Future<Output = AppResult<u64>>,
{
    if !claim.await? {
        return Ok(None);
    }
    job.await.map(Some)
}

#[derive(Clone)]
pub struct Scheduler {
    repository: Repository,
    borrowings: BorrowingsService,
    reservations: ReservationsService,
    tick: Duration,
}

impl Scheduler {
    pub fn new(
        repository: Repository,
        borrowings: BorrowingsService,
        reservations: ReservationsService,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            repository,
            borrowings,
            reservations,
            tick: Duration::from_secs(config.tick_seconds.max(1)),
        }
    }

    /// Start the background loop; the first pass runs immediately
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("circulation scheduler started (interval={:?})", self.tick);
            loop {
                self.run_daily(Local::now().date_naive()).await;
                tokio::time::sleep(self.tick).await;
            }
        })
    }

    /// Run every job not yet done for `today`. Failures are logged and
    /// retried on the next day.
    pub async fn run_daily(&self, today: NaiveDate) {
        debug!("scheduler pass for {}", today);

        self.run_job(JOB_MARK_OVERDUE, today, async {
            self.borrowings.mark_overdue(today).await.map(|n| n as u64)
        })
        .await;

        self.run_job(JOB_DUE_REMINDERS, today, async {
            self.borrowings.send_due_reminders(today).await.map(|n| n as u64)
        })
        .await;

        self.run_job(JOB_EXPIRE_RESERVATIONS, today, self.reservations.expire(today))
            .await;
    }

    async fn run_job<J>(&self, name: &str, today: NaiveDate, job: J)
    where
        J: Future<Output = AppResult<u64>>,
    {
        let claim = self.repository.parameters.claim_job_run(name, today);
        match run_guarded(claim, job).await {
            Ok(None) => debug!("job {} already ran on {}", name, today),
            Ok(Some(0)) => info!("job {}: nothing to do", name),
            Ok(Some(n)) => info!("job {}: processed {} records", name, n),
            Err(e) => error!("job {} failed: {}", name, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn test_job_runs_when_claimed() {
        let result = tokio_test::block_on(run_guarded(async { Ok::<_, AppError>(true) }, async {
            Ok::<u64, AppError>(3)
        }));
        assert_eq!(result.unwrap(), Some(3));
    }

    #[test]
    fn test_job_skipped_when_already_run() {
        let result = tokio_test::block_on(run_guarded(async { Ok::<_, AppError>(false) }, async {
            Err::<u64, _>(AppError::Internal("must not run".to_string()))
        }));
        assert_eq!(result.unwrap(), None);
    }

    #[test]
    fn test_job_error_is_returned() {
        let result = tokio_test::block_on(run_guarded(async { Ok::<_, AppError>(true) }, async {
            Err::<u64, _>(AppError::Internal("boom".to_string()))
        }));
        assert!(result.is_err());
    }
}
