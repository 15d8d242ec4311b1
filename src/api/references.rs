//! Reference data endpoints: authors, publishers, series, copy types,
//! borrower types, categories, locations and Cutter tables

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
        borrower::{BorrowerType, BorrowerTypeInput},
        catalog::{
            Author, AuthorInput, Category, CategoryInput, CharacterMapping, CharacterMappingInput,
            Location, LocationInput, Publisher, PublisherInput, QuantType, QuantTypeInput,
            ReferenceQuery, Series, SeriesInput,
        },
    },
};

use super::AuthenticatedUser;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct MappingQuery {
    /// Language code of the table
    pub language: Option<String>,
    pub include_inactive: Option<bool>,
}

// Authors

#[utoipa::path(
    get,
    path = "/authors",
    tag = "references",
    security(("bearer_auth" = [])),
    params(ReferenceQuery),
    responses(
        (status = 200, description = "Author list", body = Vec<Author>)
    )
)]
pub async fn list_authors(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<ReferenceQuery>,
) -> AppResult<Json<Vec<Author>>> {
    let list = state.services.references.list_authors(&query).await?;
    Ok(Json(list))
}

#[utoipa::path(
    get,
    path = "/authors/{id}",
    tag = "references",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Author ID")
    ),
    responses(
        (status = 200, description = "Author", body = Author),
        (status = 404, description = "Author not found")
    )
)]
pub async fn get_author(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Author>> {
    let record = state.services.references.get_author(id).await?;
    Ok(Json(record))
}

#[utoipa::path(
    post,
    path = "/authors",
    tag = "references",
    security(("bearer_auth" = [])),
    request_body = AuthorInput,
    responses(
        (status = 201, description = "Author created", body = Author),
        (status = 409, description = "Duplicate code or name")
    )
)]
pub async fn create_author(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<AuthorInput>,
) -> AppResult<(StatusCode, Json<Author>)> {
    claims.require_staff()?;
    data.validate()?;

    let record = state.services.references.create_author(&data).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    put,
    path = "/authors/{id}",
    tag = "references",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Author ID")
    ),
    request_body = AuthorInput,
    responses(
        (status = 200, description = "Author updated", body = Author),
        (status = 404, description = "Author not found")
    )
)]
pub async fn update_author(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<AuthorInput>,
) -> AppResult<Json<Author>> {
    claims.require_staff()?;
    data.validate()?;

    let record = state.services.references.update_author(id, &data).await?;
    Ok(Json(record))
}

#[utoipa::path(
    delete,
    path = "/authors/{id}",
    tag = "references",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Author ID")
    ),
    responses(
        (status = 204, description = "Author archived"),
        (status = 404, description = "Author not found")
    )
)]
pub async fn delete_author(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_staff()?;

    state.services.references.archive_author(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Publishers

#[utoipa::path(
    get,
    path = "/publishers",
    tag = "references",
    security(("bearer_auth" = [])),
    params(ReferenceQuery),
    responses(
        (status = 200, description = "Publisher list", body = Vec<Publisher>)
    )
)]
pub async fn list_publishers(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<ReferenceQuery>,
) -> AppResult<Json<Vec<Publisher>>> {
    let list = state.services.references.list_publishers(&query).await?;
    Ok(Json(list))
}

#[utoipa::path(
    get,
    path = "/publishers/{id}",
    tag = "references",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Publisher ID")
    ),
    responses(
        (status = 200, description = "Publisher", body = Publisher),
        (status = 404, description = "Publisher not found")
    )
)]
pub async fn get_publisher(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Publisher>> {
    let record = state.services.references.get_publisher(id).await?;
    Ok(Json(record))
}

#[utoipa::path(
    post,
    path = "/publishers",
    tag = "references",
    security(("bearer_auth" = [])),
    request_body = PublisherInput,
    responses(
        (status = 201, description = "Publisher created", body = Publisher),
        (status = 409, description = "Duplicate code or name")
    )
)]
pub async fn create_publisher(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<PublisherInput>,
) -> AppResult<(StatusCode, Json<Publisher>)> {
    claims.require_staff()?;
    data.validate()?;

    let record = state.services.references.create_publisher(&data).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    put,
    path = "/publishers/{id}",
    tag = "references",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Publisher ID")
    ),
    request_body = PublisherInput,
    responses(
        (status = 200, description = "Publisher updated", body = Publisher),
        (status = 404, description = "Publisher not found")
    )
)]
pub async fn update_publisher(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<PublisherInput>,
) -> AppResult<Json<Publisher>> {
    claims.require_staff()?;
    data.validate()?;

    let record = state.services.references.update_publisher(id, &data).await?;
    Ok(Json(record))
}

#[utoipa::path(
    delete,
    path = "/publishers/{id}",
    tag = "references",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Publisher ID")
    ),
    responses(
        (status = 204, description = "Publisher archived"),
        (status = 404, description = "Publisher not found")
    )
)]
pub async fn delete_publisher(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_staff()?;

    state.services.references.archive_publisher(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Series

#[utoipa::path(
    get,
    path = "/series",
    tag = "references",
    security(("bearer_auth" = [])),
    params(ReferenceQuery),
    responses(
        (status = 200, description = "Series list", body = Vec<Series>)
    )
)]
pub async fn list_series(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<ReferenceQuery>,
) -> AppResult<Json<Vec<Series>>> {
    let list = state.services.references.list_series(&query).await?;
    Ok(Json(list))
}

#[utoipa::path(
    get,
    path = "/series/{id}",
    tag = "references",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Series ID")
    ),
    responses(
        (status = 200, description = "Series", body = Series),
        (status = 404, description = "Series not found")
    )
)]
pub async fn get_series(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Series>> {
    let record = state.services.references.get_series(id).await?;
    Ok(Json(record))
}

#[utoipa::path(
    post,
    path = "/series",
    tag = "references",
    security(("bearer_auth" = [])),
    request_body = SeriesInput,
    responses(
        (status = 201, description = "Series created", body = Series),
        (status = 409, description = "Duplicate code or name")
    )
)]
pub async fn create_series(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<SeriesInput>,
) -> AppResult<(StatusCode, Json<Series>)> {
    claims.require_staff()?;
    data.validate()?;

    let record = state.services.references.create_series(&data).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    put,
    path = "/series/{id}",
    tag = "references",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Series ID")
    ),
    request_body = SeriesInput,
    responses(
        (status = 200, description = "Series updated", body = Series),
        (status = 404, description = "Series not found")
    )
)]
pub async fn update_series(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<SeriesInput>,
) -> AppResult<Json<Series>> {
    claims.require_staff()?;
    data.validate()?;

    let record = state.services.references.update_series(id, &data).await?;
    Ok(Json(record))
}

#[utoipa::path(
    delete,
    path = "/series/{id}",
    tag = "references",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Series ID")
    ),
    responses(
        (status = 204, description = "Series archived"),
        (status = 404, description = "Series not found")
    )
)]
pub async fn delete_series(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_staff()?;

    state.services.references.archive_series(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Copy types

#[utoipa::path(
    get,
    path = "/quant-types",
    tag = "references",
    security(("bearer_auth" = [])),
    params(ReferenceQuery),
    responses(
        (status = 200, description = "Copy type list", body = Vec<QuantType>)
    )
)]
pub async fn list_quant_types(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<ReferenceQuery>,
) -> AppResult<Json<Vec<QuantType>>> {
    let list = state.services.references.list_quant_types(&query).await?;
    Ok(Json(list))
}

#[utoipa::path(
    get,
    path = "/quant-types/{id}",
    tag = "references",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Copy type ID")
    ),
    responses(
        (status = 200, description = "Copy type", body = QuantType),
        (status = 404, description = "Copy type not found")
    )
)]
pub async fn get_quant_type(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<QuantType>> {
    let record = state.services.references.get_quant_type(id).await?;
    Ok(Json(record))
}

#[utoipa::path(
    post,
    path = "/quant-types",
    tag = "references",
    security(("bearer_auth" = [])),
    request_body = QuantTypeInput,
    responses(
        (status = 201, description = "Copy type created", body = QuantType),
        (status = 409, description = "Duplicate code or name")
    )
)]
pub async fn create_quant_type(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<QuantTypeInput>,
) -> AppResult<(StatusCode, Json<QuantType>)> {
    claims.require_staff()?;
    data.validate()?;

    let record = state.services.references.create_quant_type(&data).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    put,
    path = "/quant-types/{id}",
    tag = "references",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Copy type ID")
    ),
    request_body = QuantTypeInput,
    responses(
        (status = 200, description = "Copy type updated", body = QuantType),
        (status = 404, description = "Copy type not found")
    )
)]
pub async fn update_quant_type(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<QuantTypeInput>,
) -> AppResult<Json<QuantType>> {
    claims.require_staff()?;
    data.validate()?;

    let record = state.services.references.update_quant_type(id, &data).await?;
    Ok(Json(record))
}

#[utoipa::path(
    delete,
    path = "/quant-types/{id}",
    tag = "references",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Copy type ID")
    ),
    responses(
        (status = 204, description = "Copy type archived"),
        (status = 404, description = "Copy type not found")
    )
)]
pub async fn delete_quant_type(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_staff()?;

    state.services.references.archive_quant_type(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Borrower types

#[utoipa::path(
    get,
    path = "/borrower-types",
    tag = "references",
    security(("bearer_auth" = [])),
    params(ReferenceQuery),
    responses(
        (status = 200, description = "Borrower type list", body = Vec<BorrowerType>)
    )
)]
pub async fn list_borrower_types(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<ReferenceQuery>,
) -> AppResult<Json<Vec<BorrowerType>>> {
    let list = state.services.references.list_borrower_types(&query).await?;
    Ok(Json(list))
}

#[utoipa::path(
    get,
    path = "/borrower-types/{id}",
    tag = "references",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrower type ID")
    ),
    responses(
        (status = 200, description = "Borrower type", body = BorrowerType),
        (status = 404, description = "Borrower type not found")
    )
)]
pub async fn get_borrower_type(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowerType>> {
    let record = state.services.references.get_borrower_type(id).await?;
    Ok(Json(record))
}

#[utoipa::path(
    post,
    path = "/borrower-types",
    tag = "references",
    security(("bearer_auth" = [])),
    request_body = BorrowerTypeInput,
    responses(
        (status = 201, description = "Borrower type created", body = BorrowerType),
        (status = 409, description = "Duplicate code or name")
    )
)]
pub async fn create_borrower_type(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<BorrowerTypeInput>,
) -> AppResult<(StatusCode, Json<BorrowerType>)> {
    claims.require_staff()?;
    data.validate()?;

    let record = state.services.references.create_borrower_type(&data).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    put,
    path = "/borrower-types/{id}",
    tag = "references",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrower type ID")
    ),
    request_body = BorrowerTypeInput,
    responses(
        (status = 200, description = "Borrower type updated", body = BorrowerType),
        (status = 404, description = "Borrower type not found")
    )
)]
pub async fn update_borrower_type(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<BorrowerTypeInput>,
) -> AppResult<Json<BorrowerType>> {
    claims.require_staff()?;
    data.validate()?;

    let record = state.services.references.update_borrower_type(id, &data).await?;
    Ok(Json(record))
}

#[utoipa::path(
    delete,
    path = "/borrower-types/{id}",
    tag = "references",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrower type ID")
    ),
    responses(
        (status = 204, description = "Borrower type archived"),
        (status = 404, description = "Borrower type not found")
    )
)]
pub async fn delete_borrower_type(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_staff()?;

    state.services.references.archive_borrower_type(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Categories

#[utoipa::path(
    get,
    path = "/categories",
    tag = "references",
    security(("bearer_auth" = [])),
    params(ReferenceQuery),
    responses(
        (status = 200, description = "Category list", body = Vec<Category>)
    )
)]
pub async fn list_categories(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<ReferenceQuery>,
) -> AppResult<Json<Vec<Category>>> {
    let list = state.services.references.list_categories(&query).await?;
    Ok(Json(list))
}

#[utoipa::path(
    get,
    path = "/categories/{id}",
    tag = "references",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Category ID")
    ),
    responses(
        (status = 200, description = "Category", body = Category),
        (status = 404, description = "Category not found")
    )
)]
pub async fn get_category(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Category>> {
    let record = state.services.references.get_category(id).await?;
    Ok(Json(record))
}

#[utoipa::path(
    post,
    path = "/categories",
    tag = "references",
    security(("bearer_auth" = [])),
    request_body = CategoryInput,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 409, description = "Duplicate code or name")
    )
)]
pub async fn create_category(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CategoryInput>,
) -> AppResult<(StatusCode, Json<Category>)> {
    claims.require_staff()?;
    data.validate()?;

    let record = state.services.references.create_category(&data).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    put,
    path = "/categories/{id}",
    tag = "references",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Category ID")
    ),
    request_body = CategoryInput,
    responses(
        (status = 200, description = "Category updated", body = Category),
        (status = 404, description = "Category not found")
    )
)]
pub async fn update_category(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<CategoryInput>,
) -> AppResult<Json<Category>> {
    claims.require_staff()?;
    data.validate()?;

    let record = state.services.references.update_category(id, &data).await?;
    Ok(Json(record))
}

#[utoipa::path(
    delete,
    path = "/categories/{id}",
    tag = "references",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Category ID")
    ),
    responses(
        (status = 204, description = "Category archived"),
        (status = 404, description = "Category not found")
    )
)]
pub async fn delete_category(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_staff()?;

    state.services.references.archive_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Locations

#[utoipa::path(
    get,
    path = "/locations",
    tag = "references",
    security(("bearer_auth" = [])),
    params(ReferenceQuery),
    responses(
        (status = 200, description = "Location list", body = Vec<Location>)
    )
)]
pub async fn list_locations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<ReferenceQuery>,
) -> AppResult<Json<Vec<Location>>> {
    let list = state.services.references.list_locations(&query).await?;
    Ok(Json(list))
}

#[utoipa::path(
    get,
    path = "/locations/{id}",
    tag = "references",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Location ID")
    ),
    responses(
        (status = 200, description = "Location", body = Location),
        (status = 404, description = "Location not found")
    )
)]
pub async fn get_location(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Location>> {
    let record = state.services.references.get_location(id).await?;
    Ok(Json(record))
}

#[utoipa::path(
    post,
    path = "/locations",
    tag = "references",
    security(("bearer_auth" = [])),
    request_body = LocationInput,
    responses(
        (status = 201, description = "Location created", body = Location),
        (status = 409, description = "Duplicate code or name")
    )
)]
pub async fn create_location(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<LocationInput>,
) -> AppResult<(StatusCode, Json<Location>)> {
    claims.require_staff()?;
    data.validate()?;

    let record = state.services.references.create_location(&data).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    put,
    path = "/locations/{id}",
    tag = "references",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Location ID")
    ),
    request_body = LocationInput,
    responses(
        (status = 200, description = "Location updated", body = Location),
        (status = 404, description = "Location not found")
    )
)]
pub async fn update_location(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<LocationInput>,
) -> AppResult<Json<Location>> {
    claims.require_staff()?;
    data.validate()?;

    let record = state.services.references.update_location(id, &data).await?;
    Ok(Json(record))
}

#[utoipa::path(
    delete,
    path = "/locations/{id}",
    tag = "references",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Location ID")
    ),
    responses(
        (status = 204, description = "Location archived"),
        (status = 404, description = "Location not found")
    )
)]
pub async fn delete_location(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_staff()?;

    state.services.references.archive_location(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Cutter tables

/// Rhyme codes of the Cutter tables
#[utoipa::path(
    get,
    path = "/character-mappings",
    tag = "references",
    security(("bearer_auth" = [])),
    params(MappingQuery),
    responses(
        (status = 200, description = "Rhyme codes", body = Vec<CharacterMapping>)
    )
)]
pub async fn list_mappings(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<MappingQuery>,
) -> AppResult<Json<Vec<CharacterMapping>>> {
    claims.require_staff()?;

    let list = state
        .services
        .references
        .list_mappings(query.language.as_deref(), query.include_inactive.unwrap_or(false))
        .await?;
    Ok(Json(list))
}

#[utoipa::path(
    post,
    path = "/character-mappings",
    tag = "references",
    security(("bearer_auth" = [])),
    request_body = CharacterMappingInput,
    responses(
        (status = 201, description = "Rhyme code created", body = CharacterMapping),
        (status = 409, description = "Rhyme already mapped for this language")
    )
)]
pub async fn create_mapping(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CharacterMappingInput>,
) -> AppResult<(StatusCode, Json<CharacterMapping>)> {
    claims.require_staff()?;
    data.validate()?;

    let record = state.services.references.create_mapping(&data).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    put,
    path = "/character-mappings/{id}",
    tag = "references",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Mapping ID")
    ),
    request_body = CharacterMappingInput,
    responses(
        (status = 200, description = "Rhyme code updated", body = CharacterMapping),
        (status = 404, description = "Mapping not found")
    )
)]
pub async fn update_mapping(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<CharacterMappingInput>,
) -> AppResult<Json<CharacterMapping>> {
    claims.require_staff()?;
    data.validate()?;

    let record = state.services.references.update_mapping(id, &data).await?;
    Ok(Json(record))
}

#[utoipa::path(
    delete,
    path = "/character-mappings/{id}",
    tag = "references",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Mapping ID")
    ),
    responses(
        (status = 204, description = "Rhyme code archived")
    )
)]
pub async fn delete_mapping(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_staff()?;

    state.services.references.archive_mapping(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
