//! Authentication and user account service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{CreateUser, PasswordSetup, UpdateUser, User, UserClaims, UserRole},
    repository::{users::NewUser, Repository},
};

/// Length of one-time password setup tokens
pub const SETUP_TOKEN_LEN: usize = 32;

/// Hours a password setup token stays valid
pub const SETUP_TOKEN_HOURS: i64 = 72;

/// Random alphanumeric token for password setup
pub fn generate_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

fn verify_password(user: &User, password: &str) -> AppResult<bool> {
    let Some(hash) = user.password_hash.as_deref() else {
        return Ok(false);
    };
    let parsed_hash =
        PasswordHash::new(hash).map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Authenticate by login and password, returns a JWT and the account
    pub async fn authenticate(&self, login: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .get_by_login(login)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid login or password".to_string()))?;

        if !verify_password(&user, password)? {
            return Err(AppError::Authentication("Invalid login or password".to_string()));
        }

        let token = self.create_token_for_user(&user)?;
        self.repository.users.touch_last_login(user.id).await?;
        tracing::info!("User {} logged in", user.login);
        Ok((token, user))
    }

    /// Create JWT token for a user
    fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: user.login.clone(),
            user_id: user.id,
            role: user.role,
            borrower_id: user.borrower_id,
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Create the administrator account when the users table is empty.
    /// Returns the generated password when none is configured.
    pub async fn bootstrap_admin(&self) -> AppResult<Option<String>> {
        if self.repository.users.count().await? > 0 {
            return Ok(None);
        }

        let (password, generated) = match self.config.bootstrap_admin_password.as_deref() {
            Some(p) if !p.is_empty() => (p.to_string(), false),
            _ => (generate_token(16), true),
        };
        let hash = hash_password(&password)?;

        let user = self
            .repository
            .users
            .create(&NewUser {
                login: &self.config.bootstrap_admin_login,
                password_hash: Some(&hash),
                role: UserRole::Admin,
                display_name: Some("Administrator"),
                email: None,
                borrower_id: None,
                setup_token: None,
                setup_expires: None,
            })
            .await?;
        tracing::info!("Created bootstrap administrator '{}'", user.login);

        Ok(generated.then_some(password))
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    pub async fn list(&self) -> AppResult<Vec<User>> {
        self.repository.users.list().await
    }

    /// Create a staff or member account
    pub async fn create_user(&self, data: &CreateUser) -> AppResult<User> {
        match (data.role, data.borrower_id) {
            (UserRole::Member, None) => {
                return Err(AppError::Validation(
                    "Member accounts must be linked to a borrower".to_string(),
                ))
            }
            (UserRole::Member, Some(borrower_id)) => {
                self.repository.borrowers.get_by_id(borrower_id).await?;
            }
            (_, Some(_)) => {
                return Err(AppError::Validation(
                    "Only member accounts can be linked to a borrower".to_string(),
                ))
            }
            _ => {}
        }

        if self.repository.users.login_exists(&data.login).await? {
            return Err(AppError::Conflict(format!("Login '{}' already exists", data.login.trim())));
        }

        let hash = hash_password(&data.password)?;
        self.repository
            .users
            .create(&NewUser {
                login: &data.login,
                password_hash: Some(&hash),
                role: data.role,
                display_name: data.display_name.as_deref(),
                email: data.email.as_deref(),
                borrower_id: data.borrower_id,
                setup_token: None,
                setup_expires: None,
            })
            .await
    }

    pub async fn update_user(&self, id: i32, data: &UpdateUser) -> AppResult<User> {
        let current = self.repository.users.get_by_id(id).await?;
        if let Some(role) = data.role {
            if (role == UserRole::Member) != current.borrower_id.is_some() {
                return Err(AppError::Validation(
                    "Member role requires a linked borrower".to_string(),
                ));
            }
        }
        let hash = data.password.as_deref().map(hash_password).transpose()?;
        self.repository.users.update(id, data, hash.as_deref()).await
    }

    /// Choose the first password of an account created from a signup
    pub async fn setup_password(&self, data: &PasswordSetup) -> AppResult<User> {
        let user = self
            .repository
            .users
            .get_by_setup_token(data.token.trim())
            .await?
            .ok_or_else(|| AppError::BadRequest("Invalid or already used setup token".to_string()))?;

        let expired = user
            .password_setup_expires
            .map(|exp| exp < Utc::now())
            .unwrap_or(true);
        if expired {
            return Err(AppError::BadRequest("Setup token has expired".to_string()));
        }

        let hash = hash_password(&data.password)?;
        let user = self.repository.users.complete_setup(user.id, &hash).await?;
        tracing::info!("Password set for {}", user.login);
        Ok(user)
    }

    /// Expiry of a setup token issued now
    pub fn setup_expiry() -> chrono::DateTime<Utc> {
        Utc::now() + Duration::hours(SETUP_TOKEN_HOURS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with(hash: Option<String>) -> User {
        User {
            id: 1,
            login: "librarian".to_string(),
            password_hash: hash,
            role: UserRole::Librarian,
            display_name: None,
            email: None,
            borrower_id: None,
            active: true,
            password_setup_token: None,
            password_setup_expires: None,
            last_login: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_password_roundtrip() {
        let hash = hash_password("s3cret!").unwrap();
        let user = user_with(Some(hash));
        assert!(verify_password(&user, "s3cret!").unwrap());
        assert!(!verify_password(&user, "wrong").unwrap());
    }

    #[test]
    fn test_account_without_password_cannot_login() {
        assert!(!verify_password(&user_with(None), "").unwrap());
    }

    #[test]
    fn test_generate_token() {
        let a = generate_token(SETUP_TOKEN_LEN);
        let b = generate_token(SETUP_TOKEN_LEN);
        assert_eq!(a.len(), SETUP_TOKEN_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
