//! Borrowing endpoints: drafts, allocation, confirmation, returns and renewals

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        borrowing::{
            AddLine, AllocateRequest, Borrowing, BorrowingDetails, BorrowingLine, BorrowingQuery,
            BorrowingSummary, CreateBorrowing, QuantLine, QuantLineSelection, ReturnOutcome,
            ReturnRequest,
        },
        Page,
    },
};

use super::{today, AuthenticatedUser};

/// Number of copies touched by an allocation change
#[derive(Serialize, ToSchema)]
pub struct AllocationResponse {
    pub count: u64,
    pub borrowing: BorrowingDetails,
}

/// List borrowings
#[utoipa::path(
    get,
    path = "/borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(BorrowingQuery),
    responses(
        (status = 200, description = "List of borrowings", body = Page<BorrowingSummary>)
    )
)]
pub async fn list_borrowings(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BorrowingQuery>,
) -> AppResult<Json<Page<BorrowingSummary>>> {
    claims.require_staff()?;

    let page = state.services.borrowings.list(&query).await?;
    Ok(Json(page))
}

/// Borrowing with lines, copies, late days and fines
#[utoipa::path(
    get,
    path = "/borrowings/{id}",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing ID")
    ),
    responses(
        (status = 200, description = "Borrowing details", body = BorrowingDetails),
        (status = 404, description = "Borrowing not found")
    )
)]
pub async fn get_borrowing(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowingDetails>> {
    claims.require_staff()?;

    let details = state.services.borrowings.details(id, today()).await?;
    Ok(Json(details))
}

/// Create a draft borrowing
#[utoipa::path(
    post,
    path = "/borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    request_body = CreateBorrowing,
    responses(
        (status = 201, description = "Draft created", body = Borrowing),
        (status = 404, description = "Borrower not found")
    )
)]
pub async fn create_borrowing(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateBorrowing>,
) -> AppResult<(StatusCode, Json<Borrowing>)> {
    claims.require_staff()?;
    data.validate()?;

    let borrowing = state
        .services
        .borrowings
        .create(&data, Some(claims.user_id), today())
        .await?;
    Ok((StatusCode::CREATED, Json(borrowing)))
}

/// Add a book line to a draft
#[utoipa::path(
    post,
    path = "/borrowings/{id}/lines",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing ID")
    ),
    request_body = AddLine,
    responses(
        (status = 201, description = "Line added", body = BorrowingLine),
        (status = 409, description = "Borrowing is not a draft")
    )
)]
pub async fn add_line(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<AddLine>,
) -> AppResult<(StatusCode, Json<BorrowingLine>)> {
    claims.require_staff()?;
    data.validate()?;

    let line = state.services.borrowings.add_line(id, &data).await?;
    Ok((StatusCode::CREATED, Json(line)))
}

/// Remove a draft line
#[utoipa::path(
    delete,
    path = "/borrowings/{id}/lines/{line_id}",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing ID"),
        ("line_id" = i32, Path, description = "Line ID")
    ),
    responses(
        (status = 204, description = "Line removed"),
        (status = 409, description = "Line is not a draft")
    )
)]
pub async fn remove_line(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((id, line_id)): Path<(i32, i32)>,
) -> AppResult<StatusCode> {
    claims.require_staff()?;

    state.services.borrowings.remove_line(id, line_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Allocate copies to a line, automatically when no ids are given
#[utoipa::path(
    post,
    path = "/borrowings/{id}/lines/{line_id}/allocate",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing ID"),
        ("line_id" = i32, Path, description = "Line ID")
    ),
    request_body = AllocateRequest,
    responses(
        (status = 200, description = "Copies allocated", body = AllocationResponse),
        (status = 409, description = "Copy not available")
    )
)]
pub async fn allocate(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((id, line_id)): Path<(i32, i32)>,
    Json(request): Json<AllocateRequest>,
) -> AppResult<Json<AllocationResponse>> {
    claims.require_staff()?;

    let count = state
        .services
        .borrowings
        .allocate(id, line_id, request.quant_ids.as_deref())
        .await?;
    let borrowing = state.services.borrowings.details(id, today()).await?;
    Ok(Json(AllocationResponse {
        count: count as u64,
        borrowing,
    }))
}

/// Drop the copies allocated to a draft
#[utoipa::path(
    post,
    path = "/borrowings/{id}/clear-allocations",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing ID")
    ),
    responses(
        (status = 200, description = "Allocations cleared", body = AllocationResponse)
    )
)]
pub async fn clear_allocations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<AllocationResponse>> {
    claims.require_staff()?;

    let count = state.services.borrowings.clear_allocations(id).await?;
    let borrowing = state.services.borrowings.details(id, today()).await?;
    Ok(Json(AllocationResponse { count, borrowing }))
}

/// Confirm a draft: copies leave the library
#[utoipa::path(
    post,
    path = "/borrowings/{id}/confirm",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing ID")
    ),
    responses(
        (status = 200, description = "Borrowing confirmed", body = BorrowingDetails),
        (status = 409, description = "Limit exceeded, membership expired or copy unavailable")
    )
)]
pub async fn confirm_borrowing(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowingDetails>> {
    claims.require_staff()?;

    let details = state.services.borrowings.confirm(id, today()).await?;
    Ok(Json(details))
}

/// Return all or selected copies
#[utoipa::path(
    post,
    path = "/borrowings/{id}/return",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing ID")
    ),
    request_body = ReturnRequest,
    responses(
        (status = 200, description = "Copies returned", body = ReturnOutcome),
        (status = 409, description = "Nothing to return")
    )
)]
pub async fn return_borrowing(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<ReturnRequest>,
) -> AppResult<Json<ReturnOutcome>> {
    claims.require_staff()?;

    let outcome = state
        .services
        .borrowings
        .return_copies(id, &request, today())
        .await?;
    Ok(Json(outcome))
}

/// Extend the due date of one copy
#[utoipa::path(
    post,
    path = "/borrowings/{id}/copies/{quant_line_id}/renew",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing ID"),
        ("quant_line_id" = i32, Path, description = "Copy line ID")
    ),
    responses(
        (status = 200, description = "Copy renewed", body = QuantLine),
        (status = 409, description = "Renewal not allowed")
    )
)]
pub async fn renew_copy(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((id, quant_line_id)): Path<(i32, i32)>,
) -> AppResult<Json<QuantLine>> {
    claims.require_staff()?;

    let copy = state
        .services
        .borrowings
        .renew(id, quant_line_id, today())
        .await?;
    Ok(Json(copy))
}

/// Mark all or selected copies as lost
#[utoipa::path(
    post,
    path = "/borrowings/{id}/lost",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing ID")
    ),
    request_body = QuantLineSelection,
    responses(
        (status = 200, description = "Copies marked lost", body = BorrowingDetails)
    )
)]
pub async fn mark_lost(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(selection): Json<QuantLineSelection>,
) -> AppResult<Json<BorrowingDetails>> {
    claims.require_staff()?;

    state
        .services
        .borrowings
        .mark_lost(id, selection.quant_line_ids.as_deref())
        .await?;
    let details = state.services.borrowings.details(id, today()).await?;
    Ok(Json(details))
}

/// Cancel a borrowing, copies go back on the shelf
#[utoipa::path(
    post,
    path = "/borrowings/{id}/cancel",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing ID")
    ),
    responses(
        (status = 200, description = "Borrowing cancelled", body = BorrowingDetails),
        (status = 409, description = "Borrowing already closed")
    )
)]
pub async fn cancel_borrowing(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowingDetails>> {
    claims.require_staff()?;

    state.services.borrowings.cancel(id).await?;
    let details = state.services.borrowings.details(id, today()).await?;
    Ok(Json(details))
}

/// Reopen a cancelled borrowing as a draft
#[utoipa::path(
    post,
    path = "/borrowings/{id}/draft",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing ID")
    ),
    responses(
        (status = 200, description = "Borrowing back to draft", body = BorrowingDetails),
        (status = 409, description = "Only cancelled borrowings can be reopened")
    )
)]
pub async fn set_draft(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowingDetails>> {
    claims.require_staff()?;

    state.services.borrowings.set_draft(id).await?;
    let details = state.services.borrowings.details(id, today()).await?;
    Ok(Json(details))
}
