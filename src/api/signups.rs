//! Member signup endpoints: public form and librarian review

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        signup::{CreateSignup, RejectSignup, SignupApproval, SignupQuery, SignupRequest},
        Page,
    },
};

use super::{today, AuthenticatedUser};

/// Submit a membership request (no authentication)
#[utoipa::path(
    post,
    path = "/signups",
    tag = "signups",
    request_body = CreateSignup,
    responses(
        (status = 201, description = "Request received", body = SignupRequest),
        (status = 409, description = "Email already used")
    )
)]
pub async fn submit_signup(
    State(state): State<crate::AppState>,
    Json(data): Json<CreateSignup>,
) -> AppResult<(StatusCode, Json<SignupRequest>)> {
    data.validate()?;

    let signup = state.services.signups.submit(&data).await?;
    Ok((StatusCode::CREATED, Json(signup)))
}

#[utoipa::path(
    get,
    path = "/signups",
    tag = "signups",
    security(("bearer_auth" = [])),
    params(SignupQuery),
    responses(
        (status = 200, description = "Signup requests", body = Page<SignupRequest>)
    )
)]
pub async fn list_signups(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<SignupQuery>,
) -> AppResult<Json<Page<SignupRequest>>> {
    claims.require_staff()?;

    let page = state.services.signups.list(&query).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/signups/{id}",
    tag = "signups",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Signup ID")
    ),
    responses(
        (status = 200, description = "Signup request", body = SignupRequest),
        (status = 404, description = "Signup not found")
    )
)]
pub async fn get_signup(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<SignupRequest>> {
    claims.require_staff()?;

    let signup = state.services.signups.get_by_id(id).await?;
    Ok(Json(signup))
}

/// Approve: creates the borrower and a member account
#[utoipa::path(
    post,
    path = "/signups/{id}/approve",
    tag = "signups",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Signup ID")
    ),
    responses(
        (status = 200, description = "Request approved", body = SignupApproval),
        (status = 409, description = "Request is not pending")
    )
)]
pub async fn approve_signup(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<SignupApproval>> {
    claims.require_staff()?;

    let approval = state
        .services
        .signups
        .approve(id, claims.user_id, today())
        .await?;
    Ok(Json(approval))
}

#[utoipa::path(
    post,
    path = "/signups/{id}/reject",
    tag = "signups",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Signup ID")
    ),
    request_body = RejectSignup,
    responses(
        (status = 200, description = "Request rejected", body = SignupRequest),
        (status = 409, description = "Request is not pending")
    )
)]
pub async fn reject_signup(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<RejectSignup>,
) -> AppResult<Json<SignupRequest>> {
    claims.require_staff()?;
    data.validate()?;

    let signup = state
        .services
        .signups
        .reject(id, &data.reason, claims.user_id)
        .await?;
    Ok(Json(signup))
}

/// Put a rejected request back to pending
#[utoipa::path(
    post,
    path = "/signups/{id}/reset",
    tag = "signups",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Signup ID")
    ),
    responses(
        (status = 200, description = "Request pending again", body = SignupRequest)
    )
)]
pub async fn reset_signup(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<SignupRequest>> {
    claims.require_staff()?;

    let signup = state.services.signups.reset(id).await?;
    Ok(Json(signup))
}
