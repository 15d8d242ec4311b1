//! Member portal: own borrowings, reservations, cart and history.
//!
//! Every handler works on the borrower linked to the token; records of other
//! borrowers answer 404.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        borrower::BorrowerDetails,
        borrowing::{BorrowingDetails, BorrowingQuery, BorrowingState, BorrowingSummary, QuantLine},
        reservation::{Reservation, ReservationQuery, ReservationState, ReserveBook},
        stats::HistoryStats,
        Page,
    },
};

use super::{today, AuthenticatedUser};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct MyBorrowingsQuery {
    pub state: Option<BorrowingState>,
    /// Search in the borrowing name
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct MyReservationsQuery {
    pub state: Option<ReservationState>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CartItem {
    pub book_id: i32,
}

/// Own borrower record with limits and statistics
#[utoipa::path(
    get,
    path = "/my/profile",
    tag = "portal",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Borrower details", body = BorrowerDetails),
        (status = 403, description = "Not a member account")
    )
)]
pub async fn my_profile(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<BorrowerDetails>> {
    let borrower_id = claims.require_member()?;

    let details = state.services.borrowers.details(borrower_id, today()).await?;
    Ok(Json(details))
}

#[utoipa::path(
    get,
    path = "/my/borrowings",
    tag = "portal",
    security(("bearer_auth" = [])),
    params(MyBorrowingsQuery),
    responses(
        (status = 200, description = "Own borrowings", body = Page<BorrowingSummary>)
    )
)]
pub async fn my_borrowings(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<MyBorrowingsQuery>,
) -> AppResult<Json<Page<BorrowingSummary>>> {
    let borrower_id = claims.require_member()?;

    let page = state
        .services
        .borrowings
        .list(&BorrowingQuery {
            borrower_id: Some(borrower_id),
            state: query.state,
            search: query.search,
            from_date: None,
            to_date: None,
            page: query.page,
            per_page: query.per_page,
        })
        .await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/my/borrowings/{id}",
    tag = "portal",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing ID")
    ),
    responses(
        (status = 200, description = "Borrowing details", body = BorrowingDetails),
        (status = 404, description = "Borrowing not found")
    )
)]
pub async fn my_borrowing(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowingDetails>> {
    let borrower_id = claims.require_member()?;

    let details = state
        .services
        .borrowings
        .details_for_member(borrower_id, id, today())
        .await?;
    Ok(Json(details))
}

/// Renew one of my copies
#[utoipa::path(
    post,
    path = "/my/borrowings/{id}/copies/{quant_line_id}/renew",
    tag = "portal",
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
pub async fn renew_my_copy(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((id, quant_line_id)): Path<(i32, i32)>,
) -> AppResult<Json<QuantLine>> {
    let borrower_id = claims.require_member()?;

    let copy = state
        .services
        .borrowings
        .renew_for_member(borrower_id, id, quant_line_id, today())
        .await?;
    Ok(Json(copy))
}

#[utoipa::path(
    get,
    path = "/my/reservations",
    tag = "portal",
    security(("bearer_auth" = [])),
    params(MyReservationsQuery),
    responses(
        (status = 200, description = "Own reservations", body = Page<Reservation>)
    )
)]
pub async fn my_reservations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<MyReservationsQuery>,
) -> AppResult<Json<Page<Reservation>>> {
    let borrower_id = claims.require_member()?;

    let page = state
        .services
        .reservations
        .list(&ReservationQuery {
            borrower_id: Some(borrower_id),
            book_id: None,
            state: query.state,
            page: query.page,
            per_page: query.per_page,
        })
        .await?;
    Ok(Json(page))
}

/// Reserve a book; the request joins the queue at once
#[utoipa::path(
    post,
    path = "/my/reservations",
    tag = "portal",
    security(("bearer_auth" = [])),
    request_body = ReserveBook,
    responses(
        (status = 201, description = "Reservation queued", body = Reservation),
        (status = 409, description = "Already reserved or borrowed")
    )
)]
pub async fn reserve_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<ReserveBook>,
) -> AppResult<(StatusCode, Json<Reservation>)> {
    let borrower_id = claims.require_member()?;
    data.validate()?;

    let reservation = state
        .services
        .reservations
        .reserve_for_member(borrower_id, &data, today())
        .await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

#[utoipa::path(
    post,
    path = "/my/reservations/{id}/cancel",
    tag = "portal",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 200, description = "Reservation cancelled", body = Reservation),
        (status = 409, description = "Reservation cannot be cancelled")
    )
)]
pub async fn cancel_my_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Reservation>> {
    let borrower_id = claims.require_member()?;

    let reservation = state
        .services
        .reservations
        .cancel_for_member(borrower_id, id, today())
        .await?;
    Ok(Json(reservation))
}

/// Current cart, `null` when empty
#[utoipa::path(
    get,
    path = "/my/cart",
    tag = "portal",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Draft borrowing of the member", body = Option<BorrowingDetails>)
    )
)]
pub async fn my_cart(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Option<BorrowingDetails>>> {
    let borrower_id = claims.require_member()?;

    let cart = state.services.borrowings.cart(borrower_id, today()).await?;
    Ok(Json(cart))
}

#[utoipa::path(
    post,
    path = "/my/cart/lines",
    tag = "portal",
    security(("bearer_auth" = [])),
    request_body = CartItem,
    responses(
        (status = 200, description = "Book added", body = BorrowingDetails),
        (status = 404, description = "Book not found")
    )
)]
pub async fn add_to_cart(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(item): Json<CartItem>,
) -> AppResult<Json<BorrowingDetails>> {
    let borrower_id = claims.require_member()?;

    let cart = state
        .services
        .borrowings
        .cart_add(borrower_id, item.book_id, today())
        .await?;
    Ok(Json(cart))
}

#[utoipa::path(
    delete,
    path = "/my/cart/lines/{line_id}",
    tag = "portal",
    security(("bearer_auth" = [])),
    params(
        ("line_id" = i32, Path, description = "Line ID")
    ),
    responses(
        (status = 200, description = "Line removed", body = Option<BorrowingDetails>)
    )
)]
pub async fn remove_from_cart(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(line_id): Path<i32>,
) -> AppResult<Json<Option<BorrowingDetails>>> {
    let borrower_id = claims.require_member()?;

    let cart = state
        .services
        .borrowings
        .cart_remove(borrower_id, line_id, today())
        .await?;
    Ok(Json(cart))
}

/// Confirm the cart as a borrowing
#[utoipa::path(
    post,
    path = "/my/cart/checkout",
    tag = "portal",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Borrowing confirmed", body = BorrowingDetails),
        (status = 409, description = "Cart is empty or limits exceeded")
    )
)]
pub async fn checkout(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<BorrowingDetails>> {
    let borrower_id = claims.require_member()?;

    let details = state.services.borrowings.checkout(borrower_id, today()).await?;
    Ok(Json(details))
}

#[utoipa::path(
    get,
    path = "/my/history",
    tag = "portal",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Borrowing history", body = HistoryStats)
    )
)]
pub async fn my_history(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<HistoryStats>> {
    let borrower_id = claims.require_member()?;

    let history = state.services.stats.history(borrower_id, today()).await?;
    Ok(Json(history))
}
