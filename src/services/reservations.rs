//! Reservations service: queueing, holds and member requests

use chrono::{Duration, NaiveDate};

use crate::{
    error::{AppError, AppResult},
    models::{
        reservation::{CreateReservation, Reservation, ReservationQuery, ReservationState, ReserveBook},
        Page, PageQuery,
    },
    repository::Repository,
    services::{
        borrowers::BorrowersService,
        email::{self, EmailService},
        settings::SettingsService,
    },
};

#[derive(Clone)]
pub struct ReservationsService {
    repository: Repository,
    settings: SettingsService,
    borrowers: BorrowersService,
    email: EmailService,
}

impl ReservationsService {
    pub fn new(
        repository: Repository,
        settings: SettingsService,
        borrowers: BorrowersService,
        email: EmailService,
    ) -> Self {
        Self {
            repository,
            settings,
            borrowers,
            email,
        }
    }

    pub async fn list(&self, query: &ReservationQuery) -> AppResult<Page<Reservation>> {
        let page = PageQuery {
            page: query.page,
            per_page: query.per_page,
        };
        let (items, total) = self
            .repository
            .reservations
            .list(query, page.per_page(), page.offset())
            .await?;
        Ok(Page::new(items, total, &page))
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Reservation> {
        self.repository.reservations.get_by_id(id).await
    }

    /// Create a draft reservation; the pickup window starts at the reservation date
    pub async fn create(&self, data: &CreateReservation, today: NaiveDate) -> AppResult<Reservation> {
        let borrower = self.repository.borrowers.get_by_id(data.borrower_id).await?;
        if !borrower.active || !borrower.is_membership_active(today) {
            return Err(AppError::BusinessRule(format!(
                "Membership of {} is not active",
                borrower.borrower_code
            )));
        }
        let limits = self.borrowers.limits(&borrower).await?;
        if !limits.can_reserve {
            return Err(AppError::BusinessRule(
                "This borrower type is not allowed to reserve books".to_string(),
            ));
        }

        let params = self.settings.parameters().await?;
        let reservation_date = data.reservation_date.unwrap_or(today);
        let expiry_date = reservation_date + Duration::days(params.reservation_hold_days as i64);

        let reservation = self
            .repository
            .reservations
            .create(data, reservation_date, expiry_date)
            .await?;
        tracing::info!(
            "Reservation {} created for {} on '{}'",
            reservation.name,
            reservation.borrower_name,
            reservation.book_title
        );
        Ok(reservation)
    }

    pub async fn confirm(&self, id: i32) -> AppResult<Reservation> {
        self.repository.reservations.confirm(id).await
    }

    /// Hold a copy for an active reservation and tell the borrower
    pub async fn notify_available(&self, id: i32, today: NaiveDate) -> AppResult<Reservation> {
        let params = self.settings.parameters().await?;
        let reservation = self
            .repository
            .reservations
            .notify_available(id, params.reservation_hold_days, today)
            .await?;
        self.send_available_notices(&[reservation.id]).await;
        Ok(reservation)
    }

    /// Cancel; a held copy passes to the next reservation in queue
    pub async fn cancel(&self, id: i32, today: NaiveDate) -> AppResult<Reservation> {
        let params = self.settings.parameters().await?;
        let (reservation, next) = self
            .repository
            .reservations
            .cancel(id, params.reservation_hold_days, today)
            .await?;
        if let Some(next) = next {
            self.send_available_notices(&[next]).await;
        }
        Ok(reservation)
    }

    pub async fn set_draft(&self, id: i32) -> AppResult<Reservation> {
        self.repository.reservations.set_draft(id).await
    }

    /// Member request: created and queued at once
    pub async fn reserve_for_member(&self, borrower_id: i32, data: &ReserveBook, today: NaiveDate) -> AppResult<Reservation> {
        let reservation = self
            .create(
                &CreateReservation {
                    borrower_id,
                    book_id: data.book_id,
                    quant_id: None,
                    priority: None,
                    reservation_date: None,
                    notes: data.notes.clone(),
                },
                today,
            )
            .await?;
        self.repository.reservations.confirm(reservation.id).await
    }

    /// Members may only cancel their own active or available reservations
    pub async fn cancel_for_member(&self, borrower_id: i32, id: i32, today: NaiveDate) -> AppResult<Reservation> {
        let reservation = self.repository.reservations.get_by_id(id).await?;
        if reservation.borrower_id != borrower_id {
            return Err(AppError::NotFound(format!("Reservation with id {} not found", id)));
        }
        if !matches!(
            reservation.state,
            ReservationState::Active | ReservationState::Available
        ) {
            return Err(AppError::BusinessRule(format!(
                "Reservation cannot be cancelled (current state: {})",
                reservation.state
            )));
        }
        self.cancel(id, today).await
    }

    /// Expire reservations past their window; returns the number expired
    pub async fn expire(&self, today: NaiveDate) -> AppResult<u64> {
        let params = self.settings.parameters().await?;
        let (expired, notified) = self
            .repository
            .reservations
            .expire_overdue(today, params.reservation_hold_days)
            .await?;
        self.send_available_notices(&notified).await;
        Ok(expired)
    }

    /// Email the borrowers of reservations now holding a copy
    pub async fn send_available_notices(&self, reservation_ids: &[i32]) {
        if reservation_ids.is_empty() {
            return;
        }
        let enabled = match self.settings.parameters().await {
            Ok(params) => params.enable_email_notifications,
            Err(e) => {
                tracing::error!("Cannot read parameters for reservation notices: {}", e);
                return;
            }
        };
        let reservations = match self.repository.reservations.get_many(reservation_ids).await {
            Ok(list) => list,
            Err(e) => {
                tracing::error!("Cannot load reservations {:?}: {}", reservation_ids, e);
                return;
            }
        };

        for reservation in reservations {
            let to = match self.repository.borrowers.get_by_id(reservation.borrower_id).await {
                Ok(borrower) => borrower.email,
                Err(e) => {
                    tracing::error!("Cannot load borrower {}: {}", reservation.borrower_id, e);
                    continue;
                }
            };
            self.email
                .notify(enabled, to.as_deref(), email::reservation_available(&reservation))
                .await;
        }
    }
}
