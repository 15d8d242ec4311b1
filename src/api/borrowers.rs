//! Borrower endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        borrower::{
            Borrower, BorrowerDetails, BorrowerQuery, CreateBorrower, RenewMembership,
            UpdateBorrower,
        },
        Page,
    },
};

use super::{today, AuthenticatedUser};

/// List borrowers with search and pagination
#[utoipa::path(
    get,
    path = "/borrowers",
    tag = "borrowers",
    security(("bearer_auth" = [])),
    params(BorrowerQuery),
    responses(
        (status = 200, description = "List of borrowers", body = Page<Borrower>),
        (status = 403, description = "Librarian privileges required")
    )
)]
pub async fn list_borrowers(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BorrowerQuery>,
) -> AppResult<Json<Page<Borrower>>> {
    claims.require_staff()?;

    let page = state.services.borrowers.list(&query, today()).await?;
    Ok(Json(page))
}

/// Borrower with type, limits and statistics
#[utoipa::path(
    get,
    path = "/borrowers/{id}",
    tag = "borrowers",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrower ID")
    ),
    responses(
        (status = 200, description = "Borrower details", body = BorrowerDetails),
        (status = 404, description = "Borrower not found")
    )
)]
pub async fn get_borrower(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowerDetails>> {
    claims.require_staff()?;

    let details = state.services.borrowers.details(id, today()).await?;
    Ok(Json(details))
}

/// Register a borrower
#[utoipa::path(
    post,
    path = "/borrowers",
    tag = "borrowers",
    security(("bearer_auth" = [])),
    request_body = CreateBorrower,
    responses(
        (status = 201, description = "Borrower created", body = Borrower),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn create_borrower(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateBorrower>,
) -> AppResult<(StatusCode, Json<Borrower>)> {
    claims.require_staff()?;
    data.validate()?;

    let borrower = state.services.borrowers.create(&data, today()).await?;
    Ok((StatusCode::CREATED, Json(borrower)))
}

/// Update a borrower
#[utoipa::path(
    put,
    path = "/borrowers/{id}",
    tag = "borrowers",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrower ID")
    ),
    request_body = UpdateBorrower,
    responses(
        (status = 200, description = "Borrower updated", body = Borrower),
        (status = 404, description = "Borrower not found")
    )
)]
pub async fn update_borrower(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateBorrower>,
) -> AppResult<Json<Borrower>> {
    claims.require_staff()?;
    data.validate()?;

    let borrower = state.services.borrowers.update(id, &data).await?;
    Ok(Json(borrower))
}

/// Extend a membership
#[utoipa::path(
    post,
    path = "/borrowers/{id}/renew-membership",
    tag = "borrowers",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrower ID")
    ),
    request_body = RenewMembership,
    responses(
        (status = 200, description = "Membership extended", body = Borrower)
    )
)]
pub async fn renew_membership(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<RenewMembership>,
) -> AppResult<Json<Borrower>> {
    claims.require_staff()?;

    let borrower = state
        .services
        .borrowers
        .renew_membership(id, data.months, today())
        .await?;
    Ok(Json(borrower))
}

/// Archive a borrower
#[utoipa::path(
    delete,
    path = "/borrowers/{id}",
    tag = "borrowers",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrower ID")
    ),
    responses(
        (status = 204, description = "Borrower archived"),
        (status = 409, description = "Borrower still has copies")
    )
)]
pub async fn delete_borrower(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_staff()?;

    state.services.borrowers.archive(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
