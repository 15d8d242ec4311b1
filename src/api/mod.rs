//! API handlers for the library REST endpoints

pub mod auth;
pub mod books;
pub mod borrowers;
pub mod borrowings;
pub mod health;
pub mod openapi;
pub mod portal;
pub mod references;
pub mod reservations;
pub mod resources;
pub mod settings;
pub mod signups;
pub mod stats;
pub mod users;
pub mod website;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{Local, NaiveDate};

use crate::{error::AppError, models::user::UserClaims, AppState};

/// Business date of a request
pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn bearer_token(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = header
        .to_str()
        .map_err(|_| AppError::Authentication("Invalid authorization header".to_string()))?;
    value
        .strip_prefix("Bearer ")
        .map(Some)
        .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))
}

fn decode_claims(token: &str, state: &AppState) -> Result<UserClaims, AppError> {
    UserClaims::from_token(token, &state.config.auth.jwt_secret)
        .map_err(|e| AppError::Authentication(e.to_string()))
}

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;
        Ok(AuthenticatedUser(decode_claims(token, state)?))
    }
}

/// Claims when a valid token is sent, for pages open to visitors
pub struct OptionalUser(pub Option<UserClaims>);

#[async_trait]
impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            Some(token) => Ok(OptionalUser(Some(decode_claims(token, state)?))),
            None => Ok(OptionalUser(None)),
        }
    }
}
