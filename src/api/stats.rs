//! Dashboard statistics endpoint

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::stats::{Dashboard, StatsQuery},
};

use super::{today, AuthenticatedUser};

/// Library dashboard for a period (default: last 30 days)
#[utoipa::path(
    get,
    path = "/stats/dashboard",
    tag = "stats",
    security(("bearer_auth" = [])),
    params(StatsQuery),
    responses(
        (status = 200, description = "Dashboard", body = Dashboard),
        (status = 400, description = "Invalid period")
    )
)]
pub async fn dashboard(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<StatsQuery>,
) -> AppResult<Json<Dashboard>> {
    claims.require_staff()?;

    let dashboard = state.services.stats.dashboard(&query, today()).await?;
    Ok(Json(dashboard))
}
