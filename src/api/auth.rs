//! Authentication endpoints

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::user::{PasswordSetup, User, UserRole},
};

use super::AuthenticatedUser;

/// Login request
#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

/// Login response with JWT token
#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    /// Token lifetime in seconds
    pub expires_in: i64,
    pub user: UserInfo,
}

/// Account summary returned at login and by `/auth/me`
#[derive(Serialize, ToSchema)]
pub struct UserInfo {
    pub id: i32,
    pub login: String,
    pub role: UserRole,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub borrower_id: Option<i32>,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            login: user.login,
            role: user.role,
            display_name: user.display_name,
            email: user.email,
            borrower_id: user.borrower_id,
        }
    }
}

/// Authenticate with login and password
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<crate::AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let (token, user) = state
        .services
        .users
        .authenticate(&request.login, &request.password)
        .await?;

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: state.config.auth.jwt_expiration_hours as i64 * 3600,
        user: user.into(),
    }))
}

/// Current account
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = UserInfo),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<UserInfo>> {
    let user = state.services.users.get_by_id(claims.user_id).await?;
    Ok(Json(user.into()))
}

/// Choose a password with the one-time token sent on signup approval
#[utoipa::path(
    post,
    path = "/auth/setup-password",
    tag = "auth",
    request_body = PasswordSetup,
    responses(
        (status = 200, description = "Password set", body = UserInfo),
        (status = 400, description = "Invalid or expired token")
    )
)]
pub async fn setup_password(
    State(state): State<crate::AppState>,
    Json(request): Json<PasswordSetup>,
) -> AppResult<Json<UserInfo>> {
    request.validate()?;

    let user = state.services.users.setup_password(&request).await?;
    Ok(Json(user.into()))
}
