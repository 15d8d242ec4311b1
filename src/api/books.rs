//! Book and copy (quant) endpoints for staff

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        book::{
            Book, BookDetails, BookQuery, BookShort, BookStatistics, CreateBook, CutterPreview,
            CutterPreviewRequest, UpdateBook,
        },
        quant::{CreateQuant, CreateQuantBatch, Quant, RegistrationSuggestion, UpdateQuant},
        Page, PageQuery,
    },
};

use super::AuthenticatedUser;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct QuantListQuery {
    /// Include archived copies
    pub include_inactive: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SuggestionQuery {
    /// Number of registration numbers to suggest (default 1)
    pub count: Option<usize>,
}

/// List books with search and pagination
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    params(BookQuery),
    responses(
        (status = 200, description = "List of books", body = Page<BookShort>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<Page<BookShort>>> {
    claims.require_staff()?;

    let page = state.services.catalog.list_books(&query).await?;
    Ok(Json(page))
}

/// Get book details by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = BookDetails),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BookDetails>> {
    claims.require_staff()?;

    let book = state.services.catalog.get_book_details(id).await?;
    Ok(Json(book))
}

/// Create a book; the Cutter number is computed unless given
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateBook>,
) -> AppResult<(StatusCode, Json<Book>)> {
    claims.require_staff()?;
    data.validate()?;

    let book = state.services.catalog.create_book(&data).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// Update a book
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateBook>,
) -> AppResult<Json<Book>> {
    claims.require_staff()?;
    data.validate()?;

    let book = state.services.catalog.update_book(id, &data).await?;
    Ok(Json(book))
}

/// Archive a book
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 204, description = "Book archived"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Copies still on loan")
    )
)]
pub async fn delete_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_staff()?;

    state.services.catalog.archive_book(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Copy counts per book
#[utoipa::path(
    get,
    path = "/books/statistics",
    tag = "books",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Book statistics", body = Page<BookStatistics>)
    )
)]
pub async fn book_statistics(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Page<BookStatistics>>> {
    claims.require_staff()?;

    let page = state.services.catalog.book_statistics(&query).await?;
    Ok(Json(page))
}

/// Compute a Cutter number for arbitrary text
#[utoipa::path(
    post,
    path = "/cutter/preview",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = CutterPreviewRequest,
    responses(
        (status = 200, description = "Cutter number", body = CutterPreview)
    )
)]
pub async fn preview_cutter(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CutterPreviewRequest>,
) -> AppResult<Json<CutterPreview>> {
    claims.require_staff()?;
    request.validate()?;

    let preview = state.services.catalog.preview_cutter(&request).await?;
    Ok(Json(preview))
}

/// List copies of a book
#[utoipa::path(
    get,
    path = "/books/{id}/quants",
    tag = "quants",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID"),
        QuantListQuery
    ),
    responses(
        (status = 200, description = "Copies of the book", body = Vec<Quant>)
    )
)]
pub async fn list_quants(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i32>,
    Query(query): Query<QuantListQuery>,
) -> AppResult<Json<Vec<Quant>>> {
    claims.require_staff()?;

    let quants = state
        .services
        .catalog
        .list_quants(book_id, query.include_inactive.unwrap_or(false))
        .await?;
    Ok(Json(quants))
}

/// Suggest the next registration numbers of a book
#[utoipa::path(
    get,
    path = "/books/{id}/quants/suggestions",
    tag = "quants",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID"),
        SuggestionQuery
    ),
    responses(
        (status = 200, description = "Suggested registration numbers", body = RegistrationSuggestion)
    )
)]
pub async fn suggest_registrations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i32>,
    Query(query): Query<SuggestionQuery>,
) -> AppResult<Json<RegistrationSuggestion>> {
    claims.require_staff()?;

    let count = query.count.unwrap_or(1).clamp(1, 500);
    let suggestion = state.services.catalog.suggest_registrations(book_id, count).await?;
    Ok(Json(suggestion))
}

/// Add a copy to a book
#[utoipa::path(
    post,
    path = "/books/{id}/quants",
    tag = "quants",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    request_body = CreateQuant,
    responses(
        (status = 201, description = "Copy created", body = Quant),
        (status = 409, description = "Registration number already used")
    )
)]
pub async fn create_quant(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i32>,
    Json(data): Json<CreateQuant>,
) -> AppResult<(StatusCode, Json<Quant>)> {
    claims.require_staff()?;
    data.validate()?;

    let quant = state.services.catalog.create_quant(book_id, &data).await?;
    Ok((StatusCode::CREATED, Json(quant)))
}

/// Add several copies to a book
#[utoipa::path(
    post,
    path = "/books/{id}/quants/batch",
    tag = "quants",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    request_body = CreateQuantBatch,
    responses(
        (status = 201, description = "Copies created", body = Vec<Quant>),
        (status = 409, description = "Duplicate registration numbers")
    )
)]
pub async fn create_quant_batch(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i32>,
    Json(data): Json<CreateQuantBatch>,
) -> AppResult<(StatusCode, Json<Vec<Quant>>)> {
    claims.require_staff()?;
    data.validate()?;

    let quants = state.services.catalog.create_quant_batch(book_id, &data).await?;
    Ok((StatusCode::CREATED, Json(quants)))
}

/// Get a copy
#[utoipa::path(
    get,
    path = "/quants/{id}",
    tag = "quants",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Copy ID")
    ),
    responses(
        (status = 200, description = "Copy details", body = Quant),
        (status = 404, description = "Copy not found")
    )
)]
pub async fn get_quant(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Quant>> {
    claims.require_staff()?;

    let quant = state.services.catalog.get_quant(id).await?;
    Ok(Json(quant))
}

/// Update a copy
#[utoipa::path(
    put,
    path = "/quants/{id}",
    tag = "quants",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Copy ID")
    ),
    request_body = UpdateQuant,
    responses(
        (status = 200, description = "Copy updated", body = Quant),
        (status = 409, description = "State cannot be changed while on loan")
    )
)]
pub async fn update_quant(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateQuant>,
) -> AppResult<Json<Quant>> {
    claims.require_staff()?;
    data.validate()?;

    let quant = state.services.catalog.update_quant(id, &data).await?;
    Ok(Json(quant))
}

/// Archive a copy
#[utoipa::path(
    delete,
    path = "/quants/{id}",
    tag = "quants",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Copy ID")
    ),
    responses(
        (status = 204, description = "Copy archived"),
        (status = 409, description = "Copy is on loan")
    )
)]
pub async fn delete_quant(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_staff()?;

    state.services.catalog.archive_quant(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
