//! Business parameter endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use indexmap::IndexMap;

use crate::{
    error::AppResult,
    models::settings::{ParameterEntry, SetParameter},
};

use super::AuthenticatedUser;

/// Effective parameters with their defaults
#[utoipa::path(
    get,
    path = "/settings",
    tag = "settings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Parameters by key", body = Object)
    )
)]
pub async fn get_settings(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<IndexMap<String, ParameterEntry>>> {
    claims.require_staff()?;

    let settings = state.services.settings.list().await?;
    Ok(Json(settings))
}

/// Store a parameter value
#[utoipa::path(
    put,
    path = "/settings/{key}",
    tag = "settings",
    security(("bearer_auth" = [])),
    params(
        ("key" = String, Path, description = "Parameter key, e.g. library.fine_rate_per_day")
    ),
    request_body = SetParameter,
    responses(
        (status = 204, description = "Parameter stored"),
        (status = 400, description = "Invalid value"),
        (status = 404, description = "Unknown parameter")
    )
)]
pub async fn set_setting(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(key): Path<String>,
    Json(data): Json<SetParameter>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.settings.set(&key, &data.value).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Go back to the configured default
#[utoipa::path(
    delete,
    path = "/settings/{key}",
    tag = "settings",
    security(("bearer_auth" = [])),
    params(
        ("key" = String, Path, description = "Parameter key")
    ),
    responses(
        (status = 204, description = "Parameter reset"),
        (status = 404, description = "Unknown parameter")
    )
)]
pub async fn reset_setting(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(key): Path<String>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.settings.reset(&key).await?;
    Ok(StatusCode::NO_CONTENT)
}
