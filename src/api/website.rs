//! Public website catalog. Visitors see published books open to everybody;
//! members also see the books restricted to their borrower type.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::{
        book::{BookQuery, BookShort, WebsiteBook},
        catalog::CategoryNode,
        user::UserClaims,
        Page,
    },
    repository::books::Visibility,
};

use super::OptionalUser;

async fn visibility(state: &crate::AppState, claims: Option<&UserClaims>) -> AppResult<Visibility> {
    let borrower_id = claims.and_then(|c| c.borrower_id);
    state.services.catalog.visibility_for(borrower_id).await
}

/// Published books
#[utoipa::path(
    get,
    path = "/catalog/books",
    tag = "website",
    params(BookQuery),
    responses(
        (status = 200, description = "Published books", body = Page<BookShort>)
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    OptionalUser(claims): OptionalUser,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<Page<BookShort>>> {
    let visibility = visibility(&state, claims.as_ref()).await?;

    let page = state.services.catalog.search_books(&query, visibility).await?;
    Ok(Json(page))
}

/// Book page with availability and related books
#[utoipa::path(
    get,
    path = "/catalog/books/{id}",
    tag = "website",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book page", body = WebsiteBook),
        (status = 404, description = "Book not found or not visible")
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    OptionalUser(claims): OptionalUser,
    Path(id): Path<i32>,
) -> AppResult<Json<WebsiteBook>> {
    let visibility = visibility(&state, claims.as_ref()).await?;

    let book = state.services.catalog.website_book(id, visibility).await?;
    Ok(Json(book))
}

/// Category menu
#[utoipa::path(
    get,
    path = "/catalog/categories",
    tag = "website",
    responses(
        (status = 200, description = "Category tree", body = Vec<CategoryNode>)
    )
)]
pub async fn categories(
    State(state): State<crate::AppState>,
    OptionalUser(claims): OptionalUser,
) -> AppResult<Json<Vec<CategoryNode>>> {
    let member = claims.is_some();

    let tree = state.services.references.website_categories(member).await?;
    Ok(Json(tree))
}
