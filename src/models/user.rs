//! User accounts, roles and JWT claims

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;

db_enum! {
    /// Account role
    UserRole {
        Admin => "admin",
        Librarian => "librarian",
        Member => "member",
    }
}

impl UserRole {
    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Librarian)
    }
}

/// User account from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub login: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub role: UserRole,
    pub display_name: Option<String>,
    pub email: Option<String>,
    /// Borrower record of a member account
    pub borrower_id: Option<i32>,
    pub active: bool,
    #[serde(skip_serializing)]
    pub password_setup_token: Option<String>,
    #[serde(skip_serializing)]
    pub password_setup_expires: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Create staff or member account request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(length(min = 3, message = "Login must be at least 3 characters"))]
    pub login: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub role: UserRole,
    pub display_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    /// Required for member accounts
    pub borrower_id: Option<i32>,
}

/// Update account request (admin only)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUser {
    pub display_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub role: Option<UserRole>,
    pub active: Option<bool>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
}

/// One-time password setup for accounts created from a signup
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PasswordSetup {
    #[validate(length(min = 16, message = "Invalid setup token"))]
    pub token: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub role: UserRole,
    pub borrower_id: Option<i32>,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Require administrator privileges
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization("Administrator privileges required".to_string()))
        }
    }

    /// Require a librarian or administrator
    pub fn require_staff(&self) -> Result<(), AppError> {
        if self.role.is_staff() {
            Ok(())
        } else {
            Err(AppError::Authorization("Librarian privileges required".to_string()))
        }
    }

    /// Require a member account linked to a borrower, returns the borrower id
    pub fn require_member(&self) -> Result<i32, AppError> {
        self.borrower_id.ok_or_else(|| {
            AppError::Authorization("This account is not linked to a borrower".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: UserRole, borrower_id: Option<i32>) -> UserClaims {
        UserClaims {
            sub: "someone".to_string(),
            user_id: 1,
            role,
            borrower_id,
            exp: Utc::now().timestamp() + 3600,
            iat: Utc::now().timestamp(),
        }
    }

    #[test]
    fn test_role_checks() {
        assert!(claims(UserRole::Admin, None).require_staff().is_ok());
        assert!(claims(UserRole::Librarian, None).require_staff().is_ok());
        assert!(claims(UserRole::Librarian, None).require_admin().is_err());
        assert!(claims(UserRole::Member, Some(4)).require_staff().is_err());
        assert_eq!(claims(UserRole::Member, Some(4)).require_member().unwrap(), 4);
        assert!(claims(UserRole::Member, None).require_member().is_err());
    }

    #[test]
    fn test_token_roundtrip() {
        let original = claims(UserRole::Member, Some(9));
        let token = original.create_token("secret").unwrap();
        let decoded = UserClaims::from_token(&token, "secret").unwrap();
        assert_eq!(decoded.user_id, 1);
        assert_eq!(decoded.role, UserRole::Member);
        assert_eq!(decoded.borrower_id, Some(9));
        assert!(UserClaims::from_token(&token, "other").is_err());
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("librarian".parse::<UserRole>().unwrap(), UserRole::Librarian);
        assert!("guest".parse::<UserRole>().is_err());
        assert_eq!(serde_json::to_string(&UserRole::Admin).unwrap(), "\"admin\"");
    }
}
