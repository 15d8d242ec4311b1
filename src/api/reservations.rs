//! Reservation endpoints for staff

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        borrowing::BorrowingDetails,
        reservation::{CreateReservation, Reservation, ReservationQuery},
        Page,
    },
};

use super::{today, AuthenticatedUser};

/// List reservations
#[utoipa::path(
    get,
    path = "/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(ReservationQuery),
    responses(
        (status = 200, description = "List of reservations", body = Page<Reservation>)
    )
)]
pub async fn list_reservations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ReservationQuery>,
) -> AppResult<Json<Page<Reservation>>> {
    claims.require_staff()?;

    let page = state.services.reservations.list(&query).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/reservations/{id}",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 200, description = "Reservation", body = Reservation),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn get_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Reservation>> {
    claims.require_staff()?;

    let reservation = state.services.reservations.get_by_id(id).await?;
    Ok(Json(reservation))
}

/// Create a draft reservation
#[utoipa::path(
    post,
    path = "/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    request_body = CreateReservation,
    responses(
        (status = 201, description = "Reservation created", body = Reservation),
        (status = 409, description = "Already reserved or borrowed")
    )
)]
pub async fn create_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateReservation>,
) -> AppResult<(StatusCode, Json<Reservation>)> {
    claims.require_staff()?;
    data.validate()?;

    let reservation = state.services.reservations.create(&data, today()).await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// Queue a draft reservation
#[utoipa::path(
    post,
    path = "/reservations/{id}/confirm",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 200, description = "Reservation active", body = Reservation)
    )
)]
pub async fn confirm_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Reservation>> {
    claims.require_staff()?;

    let reservation = state.services.reservations.confirm(id).await?;
    Ok(Json(reservation))
}

/// Hold a copy and tell the borrower
#[utoipa::path(
    post,
    path = "/reservations/{id}/notify",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 200, description = "Copy held for the borrower", body = Reservation),
        (status = 409, description = "No copy available")
    )
)]
pub async fn notify_available(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Reservation>> {
    claims.require_staff()?;

    let reservation = state
        .services
        .reservations
        .notify_available(id, today())
        .await?;
    Ok(Json(reservation))
}

/// Lend the held copy
#[utoipa::path(
    post,
    path = "/reservations/{id}/fulfill",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 201, description = "Borrowing created", body = BorrowingDetails),
        (status = 409, description = "Reservation holds no copy")
    )
)]
pub async fn fulfill_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<(StatusCode, Json<BorrowingDetails>)> {
    claims.require_staff()?;

    let details = state
        .services
        .borrowings
        .fulfill_reservation(id, Some(claims.user_id), today())
        .await?;
    Ok((StatusCode::CREATED, Json(details)))
}

#[utoipa::path(
    post,
    path = "/reservations/{id}/cancel",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 200, description = "Reservation cancelled", body = Reservation)
    )
)]
pub async fn cancel_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Reservation>> {
    claims.require_staff()?;

    let reservation = state.services.reservations.cancel(id, today()).await?;
    Ok(Json(reservation))
}

#[utoipa::path(
    post,
    path = "/reservations/{id}/draft",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 200, description = "Reservation back to draft", body = Reservation)
    )
)]
pub async fn set_draft(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Reservation>> {
    claims.require_staff()?;

    let reservation = state.services.reservations.set_draft(id).await?;
    Ok(Json(reservation))
}
