//! Borrowings service: drafts, confirmation, returns, renewals and the member cart

use chrono::{Duration, NaiveDate};

use crate::{
    error::{AppError, AppResult},
    models::{
        borrower::Borrower,
        borrowing::{
            AddLine, Borrowing, BorrowingDetails, BorrowingLine, BorrowingQuery, BorrowingState,
            BorrowingSummary, CreateBorrowing, QuantLine, ReturnOutcome, ReturnRequest,
        },
        Page, PageQuery,
    },
    repository::{borrowings::FinePolicy, Repository},
    services::{
        borrowers::BorrowersService,
        email::{self, EmailService, Notification},
        reservations::ReservationsService,
        settings::SettingsService,
    },
};

#[derive(Clone)]
pub struct BorrowingsService {
    repository: Repository,
    settings: SettingsService,
    borrowers: BorrowersService,
    reservations: ReservationsService,
    email: EmailService,
}

impl BorrowingsService {
    pub fn new(
        repository: Repository,
        settings: SettingsService,
        borrowers: BorrowersService,
        reservations: ReservationsService,
        email: EmailService,
    ) -> Self {
        Self {
            repository,
            settings,
            borrowers,
            reservations,
            email,
        }
    }

    pub async fn list(&self, query: &BorrowingQuery) -> AppResult<Page<BorrowingSummary>> {
        let page = PageQuery {
            page: query.page,
            per_page: query.per_page,
        };
        let (items, total) = self
            .repository
            .borrowings
            .list(query, page.per_page(), page.offset())
            .await?;
        Ok(Page::new(items, total, &page))
    }

    /// Fine settings for a borrower: grace from the parameters, rate from its limits
    async fn fine_policy(&self, borrower: &Borrower) -> AppResult<FinePolicy> {
        let params = self.settings.parameters().await?;
        let limits = self.borrowers.limits(borrower).await?;
        Ok(FinePolicy {
            grace_days: params.grace_period_days,
            rate: limits.fine_rate,
        })
    }

    pub async fn details(&self, id: i32, today: NaiveDate) -> AppResult<BorrowingDetails> {
        let borrowing = self.repository.borrowings.get_by_id(id).await?;
        let borrower = self.repository.borrowers.get_by_id(borrowing.borrower_id).await?;
        let policy = self.fine_policy(&borrower).await?;
        self.repository.borrowings.details(id, policy, today).await
    }

    /// Details of a borrowing owned by a member, hidden otherwise
    pub async fn details_for_member(&self, borrower_id: i32, id: i32, today: NaiveDate) -> AppResult<BorrowingDetails> {
        let borrowing = self.repository.borrowings.get_by_id(id).await?;
        if borrowing.borrower_id != borrower_id {
            return Err(AppError::NotFound(format!("Borrowing with id {} not found", id)));
        }
        self.details(id, today).await
    }

    pub async fn create(&self, data: &CreateBorrowing, created_by: Option<i32>, today: NaiveDate) -> AppResult<Borrowing> {
        let borrower = self.repository.borrowers.get_by_id(data.borrower_id).await?;
        if !borrower.active {
            return Err(AppError::BusinessRule(format!(
                "Borrower {} is archived",
                borrower.borrower_code
            )));
        }
        let borrow_date = data.borrow_date.unwrap_or(today);
        self.repository
            .borrowings
            .create(borrower.id, borrow_date, data.notes.as_deref(), created_by)
            .await
    }

    /// Add a book line; the due date defaults to the borrower's loan period
    pub async fn add_line(&self, borrowing_id: i32, data: &AddLine) -> AppResult<BorrowingLine> {
        let borrowing = self.repository.borrowings.get_by_id(borrowing_id).await?;
        let due_date = match data.due_date {
            Some(date) => date,
            None => {
                let borrower = self.repository.borrowers.get_by_id(borrowing.borrower_id).await?;
                let limits = self.borrowers.limits(&borrower).await?;
                borrowing.borrow_date + Duration::days(limits.loan_days as i64)
            }
        };
        self.repository
            .borrowings
            .add_line(
                borrowing_id,
                data.book_id,
                data.requested_quantity.unwrap_or(1),
                due_date,
                data.notes.as_deref(),
            )
            .await
    }

    pub async fn remove_line(&self, borrowing_id: i32, line_id: i32) -> AppResult<()> {
        self.repository.borrowings.remove_line(borrowing_id, line_id).await
    }

    pub async fn allocate(&self, borrowing_id: i32, line_id: i32, quant_ids: Option<&[i32]>) -> AppResult<usize> {
        self.repository
            .borrowings
            .allocate(borrowing_id, line_id, quant_ids)
            .await
    }

    pub async fn clear_allocations(&self, borrowing_id: i32) -> AppResult<u64> {
        self.repository.borrowings.clear_allocations(borrowing_id).await
    }

    /// Confirm a draft and send the confirmation email
    pub async fn confirm(&self, borrowing_id: i32, today: NaiveDate) -> AppResult<BorrowingDetails> {
        let borrowing = self.repository.borrowings.get_by_id(borrowing_id).await?;
        let borrower = self.repository.borrowers.get_by_id(borrowing.borrower_id).await?;
        let limits = self.borrowers.limits(&borrower).await?;

        let fulfilled = self
            .repository
            .borrowings
            .confirm(borrowing_id, &limits, today)
            .await?;
        if !fulfilled.is_empty() {
            tracing::info!("Borrowing {} fulfilled reservations {:?}", borrowing_id, fulfilled);
        }

        let details = self.details(borrowing_id, today).await?;
        tracing::info!(
            "Borrowing {} confirmed for {}",
            details.borrowing.name.as_deref().unwrap_or("-"),
            borrower.borrower_code
        );
        self.notify_borrower(&borrower, email::borrowing_confirmed(&details))
            .await;
        Ok(details)
    }

    /// Lend the copy held by an available reservation
    pub async fn fulfill_reservation(
        &self,
        reservation_id: i32,
        created_by: Option<i32>,
        today: NaiveDate,
    ) -> AppResult<BorrowingDetails> {
        let reservation = self.repository.reservations.get_by_id(reservation_id).await?;
        let borrower = self.repository.borrowers.get_by_id(reservation.borrower_id).await?;
        let limits = self.borrowers.limits(&borrower).await?;

        let borrowing_id = self
            .repository
            .borrowings
            .fulfill_reservation(reservation_id, &limits, created_by, today)
            .await?;

        let details = self.details(borrowing_id, today).await?;
        self.notify_borrower(&borrower, email::borrowing_confirmed(&details))
            .await;
        Ok(details)
    }

    /// Return copies, freeze their fines and pass them to waiting reservations
    pub async fn return_copies(&self, borrowing_id: i32, data: &ReturnRequest, today: NaiveDate) -> AppResult<ReturnOutcome> {
        let borrowing = self.repository.borrowings.get_by_id(borrowing_id).await?;
        let borrower = self.repository.borrowers.get_by_id(borrowing.borrower_id).await?;
        let policy = self.fine_policy(&borrower).await?;
        let params = self.settings.parameters().await?;
        let return_date = data.return_date.unwrap_or(today);
        if return_date < borrowing.borrow_date {
            return Err(AppError::Validation(
                "Return date cannot be before the borrow date".to_string(),
            ));
        }

        let result = self
            .repository
            .borrowings
            .return_copies(
                borrowing_id,
                data.quant_line_ids.as_deref(),
                return_date,
                policy,
                params.reservation_hold_days,
            )
            .await?;
        tracing::info!(
            "Returned {} copies of borrowing {} (fine {})",
            result.returned,
            borrowing_id,
            result.total_fine
        );

        self.reservations
            .send_available_notices(&result.notified_reservations)
            .await;

        Ok(ReturnOutcome {
            returned: result.returned,
            total_fine: result.total_fine,
            state: result.state,
            notified_reservations: result.notified_reservations,
        })
    }

    pub async fn renew(&self, borrowing_id: i32, quant_line_id: i32, today: NaiveDate) -> AppResult<QuantLine> {
        let borrowing = self.repository.borrowings.get_by_id(borrowing_id).await?;
        let borrower = self.repository.borrowers.get_by_id(borrowing.borrower_id).await?;
        let limits = self.borrowers.limits(&borrower).await?;
        let copy = self
            .repository
            .borrowings
            .renew(borrowing_id, quant_line_id, &limits, today)
            .await?;
        tracing::info!(
            "Copy {} of borrowing {} renewed until {}",
            copy.registration_number.as_deref().unwrap_or("-"),
            borrowing_id,
            copy.due_date
        );
        Ok(copy)
    }

    /// Members renew copies of their own borrowings
    pub async fn renew_for_member(
        &self,
        borrower_id: i32,
        borrowing_id: i32,
        quant_line_id: i32,
        today: NaiveDate,
    ) -> AppResult<QuantLine> {
        let borrowing = self.repository.borrowings.get_by_id(borrowing_id).await?;
        if borrowing.borrower_id != borrower_id {
            return Err(AppError::NotFound(format!("Borrowing with id {} not found", borrowing_id)));
        }
        self.renew(borrowing_id, quant_line_id, today).await
    }

    pub async fn mark_lost(&self, borrowing_id: i32, quant_line_ids: Option<&[i32]>) -> AppResult<BorrowingState> {
        self.repository.borrowings.mark_lost(borrowing_id, quant_line_ids).await
    }

    pub async fn cancel(&self, borrowing_id: i32) -> AppResult<BorrowingState> {
        let state = self.repository.borrowings.cancel(borrowing_id).await?;
        tracing::info!("Borrowing {} cancelled", borrowing_id);
        Ok(state)
    }

    pub async fn set_draft(&self, borrowing_id: i32) -> AppResult<()> {
        self.repository.borrowings.set_draft(borrowing_id).await
    }

    // Member cart: the member's draft borrowing

    pub async fn cart(&self, borrower_id: i32, today: NaiveDate) -> AppResult<Option<BorrowingDetails>> {
        match self.repository.borrowings.draft_for_borrower(borrower_id).await? {
            Some(draft) => Ok(Some(self.details(draft.id, today).await?)),
            None => Ok(None),
        }
    }

    /// Add a book to the cart, creating the draft when needed
    pub async fn cart_add(&self, borrower_id: i32, book_id: i32, today: NaiveDate) -> AppResult<BorrowingDetails> {
        let borrower = self.repository.borrowers.get_by_id(borrower_id).await?;
        let book = self.repository.books.get_by_id(book_id).await?;
        let allowed = self.repository.books.allowed_borrower_types(book_id).await?;
        let visible = book.active
            && book.is_published
            && (allowed.is_empty()
                || borrower
                    .borrower_type_id
                    .map(|t| allowed.contains(&t))
                    .unwrap_or(false));
        if !visible {
            return Err(AppError::NotFound(format!("Book with id {} not found", book_id)));
        }

        let draft = match self.repository.borrowings.draft_for_borrower(borrower_id).await? {
            Some(draft) => draft,
            None => {
                self.repository
                    .borrowings
                    .create(borrower_id, today, None, None)
                    .await?
            }
        };
        self.add_line(
            draft.id,
            &AddLine {
                book_id,
                requested_quantity: Some(1),
                due_date: None,
                notes: None,
            },
        )
        .await?;
        self.details(draft.id, today).await
    }

    pub async fn cart_remove(&self, borrower_id: i32, line_id: i32, today: NaiveDate) -> AppResult<Option<BorrowingDetails>> {
        let draft = self
            .repository
            .borrowings
            .draft_for_borrower(borrower_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Cart is empty".to_string()))?;
        self.repository.borrowings.remove_line(draft.id, line_id).await?;
        self.cart(borrower_id, today).await
    }

    /// Confirm the cart as a borrowing
    pub async fn checkout(&self, borrower_id: i32, today: NaiveDate) -> AppResult<BorrowingDetails> {
        let draft = self
            .repository
            .borrowings
            .draft_for_borrower(borrower_id)
            .await?
            .ok_or_else(|| AppError::BusinessRule("Cart is empty".to_string()))?;
        self.confirm(draft.id, today).await
    }

    // Scheduled work

    /// Flip copies past due to overdue and send overdue notices
    pub async fn mark_overdue(&self, today: NaiveDate) -> AppResult<usize> {
        let affected = self.repository.borrowings.mark_overdue(today).await?;
        for borrowing_id in &affected {
            self.notify_borrowing(*borrowing_id, today, email::overdue_notice)
                .await;
        }
        Ok(affected.len())
    }

    /// Remind borrowers whose copies are due `reminder_days_before` days from today
    pub async fn send_due_reminders(&self, today: NaiveDate) -> AppResult<usize> {
        let params = self.settings.parameters().await?;
        let due = today + Duration::days(params.reminder_days_before as i64);
        let ids = self.repository.borrowings.due_on(due).await?;
        for borrowing_id in &ids {
            self.notify_borrowing(*borrowing_id, today, email::due_reminder)
                .await;
        }
        Ok(ids.len())
    }

    async fn notify_borrowing(
        &self,
        borrowing_id: i32,
        today: NaiveDate,
        template: fn(&BorrowingDetails) -> Notification,
    ) {
        let details = match self.details(borrowing_id, today).await {
            Ok(details) => details,
            Err(e) => {
                tracing::error!("Cannot load borrowing {} for notification: {}", borrowing_id, e);
                return;
            }
        };
        match self.repository.borrowers.get_by_id(details.borrowing.borrower_id).await {
            Ok(borrower) => self.notify_borrower(&borrower, template(&details)).await,
            Err(e) => tracing::error!("Cannot load borrower {}: {}", details.borrowing.borrower_id, e),
        }
    }

    async fn notify_borrower(&self, borrower: &Borrower, notification: Notification) {
        let enabled = match self.settings.parameters().await {
            Ok(params) => params.enable_email_notifications,
            Err(e) => {
                tracing::error!("Cannot read parameters for notification: {}", e);
                return;
            }
        };
        self.email
            .notify(enabled, borrower.email.as_deref(), notification)
            .await;
    }
}
