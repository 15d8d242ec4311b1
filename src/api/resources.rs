//! Resource collection endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        catalog::ReferenceQuery,
        resource::{Resource, ResourceBooks, ResourceBorrowerStats, ResourceInput},
    },
};

use super::AuthenticatedUser;

#[utoipa::path(
    get,
    path = "/resources",
    tag = "resources",
    security(("bearer_auth" = [])),
    params(ReferenceQuery),
    responses(
        (status = 200, description = "Resources with book and copy counts", body = Vec<Resource>)
    )
)]
pub async fn list_resources(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<ReferenceQuery>,
) -> AppResult<Json<Vec<Resource>>> {
    let list = state.services.resources.list(&query).await?;
    Ok(Json(list))
}

#[utoipa::path(
    get,
    path = "/resources/{id}",
    tag = "resources",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Resource ID")
    ),
    responses(
        (status = 200, description = "Resource", body = Resource),
        (status = 404, description = "Resource not found")
    )
)]
pub async fn get_resource(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Resource>> {
    let record = state.services.resources.get(id).await?;
    Ok(Json(record))
}

#[utoipa::path(
    post,
    path = "/resources",
    tag = "resources",
    security(("bearer_auth" = [])),
    request_body = ResourceInput,
    responses(
        (status = 201, description = "Resource created", body = Resource),
        (status = 409, description = "Duplicate code")
    )
)]
pub async fn create_resource(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<ResourceInput>,
) -> AppResult<(StatusCode, Json<Resource>)> {
    claims.require_staff()?;
    data.validate()?;

    let record = state.services.resources.create(&data).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    put,
    path = "/resources/{id}",
    tag = "resources",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Resource ID")
    ),
    request_body = ResourceInput,
    responses(
        (status = 200, description = "Resource updated", body = Resource),
        (status = 404, description = "Resource not found"),
        (status = 409, description = "Duplicate code")
    )
)]
pub async fn update_resource(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<ResourceInput>,
) -> AppResult<Json<Resource>> {
    claims.require_staff()?;
    data.validate()?;

    let record = state.services.resources.update(id, &data).await?;
    Ok(Json(record))
}

#[utoipa::path(
    delete,
    path = "/resources/{id}",
    tag = "resources",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Resource ID")
    ),
    responses(
        (status = 204, description = "Resource archived"),
        (status = 404, description = "Resource not found")
    )
)]
pub async fn delete_resource(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_staff()?;

    state.services.resources.archive(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/resources/{id}/books",
    tag = "resources",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Resource ID")
    ),
    responses(
        (status = 200, description = "Ids of the books in the resource", body = Vec<i32>),
        (status = 404, description = "Resource not found")
    )
)]
pub async fn list_resource_books(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<i32>>> {
    let ids = state.services.resources.book_ids(id).await?;
    Ok(Json(ids))
}

#[utoipa::path(
    post,
    path = "/resources/{id}/books",
    tag = "resources",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Resource ID")
    ),
    request_body = ResourceBooks,
    responses(
        (status = 200, description = "Books attached", body = Resource),
        (status = 404, description = "Resource or book not found")
    )
)]
pub async fn add_resource_books(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<ResourceBooks>,
) -> AppResult<Json<Resource>> {
    claims.require_staff()?;
    data.validate()?;

    let record = state.services.resources.add_books(id, &data.book_ids).await?;
    Ok(Json(record))
}

#[utoipa::path(
    delete,
    path = "/resources/{id}/books",
    tag = "resources",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Resource ID")
    ),
    request_body = ResourceBooks,
    responses(
        (status = 200, description = "Books detached", body = Resource),
        (status = 404, description = "Resource not found")
    )
)]
pub async fn remove_resource_books(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<ResourceBooks>,
) -> AppResult<Json<Resource>> {
    claims.require_staff()?;
    data.validate()?;

    let record = state.services.resources.remove_books(id, &data.book_ids).await?;
    Ok(Json(record))
}

#[utoipa::path(
    get,
    path = "/resources/{id}/borrowers/{borrower_id}",
    tag = "resources",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Resource ID"),
        ("borrower_id" = i32, Path, description = "Borrower ID")
    ),
    responses(
        (status = 200, description = "Borrower standing in the resource", body = ResourceBorrowerStats),
        (status = 404, description = "Resource or borrower not found")
    )
)]
pub async fn borrower_stats(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((id, borrower_id)): Path<(i32, i32)>,
) -> AppResult<Json<ResourceBorrowerStats>> {
    claims.require_staff()?;

    let stats = state.services.resources.borrower_stats(id, borrower_id).await?;
    Ok(Json(stats))
}
