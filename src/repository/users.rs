//! Users repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{map_unique_violation, AppError, AppResult},
    models::user::{UpdateUser, User, UserRole},
};

/// Account fields resolved by the service (password already hashed)
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub login: &'a str,
    pub password_hash: Option<&'a str>,
    pub role: UserRole,
    pub display_name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub borrower_id: Option<i32>,
    pub setup_token: Option<&'a str>,
    pub setup_expires: Option<DateTime<Utc>>,
}

/// Insert an account inside a caller transaction
pub(crate) async fn insert_user(conn: &mut PgConnection, user: &NewUser<'_>) -> AppResult<User> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (
            login, password_hash, role, display_name, email, borrower_id,
            password_setup_token, password_setup_expires
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(user.login.trim())
    .bind(user.password_hash)
    .bind(user.role)
    .bind(user.display_name)
    .bind(user.email)
    .bind(user.borrower_id)
    .bind(user.setup_token)
    .bind(user.setup_expires)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| map_unique_violation(e, &format!("Login '{}' already exists", user.login)))
}

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Get active user by login (case-insensitive)
    pub async fn get_by_login(&self, login: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE LOWER(login) = LOWER($1) AND active",
        )
        .bind(login.trim())
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Account waiting for its first password
    pub async fn get_by_setup_token(&self, token: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE password_setup_token = $1 AND active",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Check if a login is already taken
    pub async fn login_exists(&self, login: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(login) = LOWER($1))",
        )
        .bind(login.trim())
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn count(&self) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn list(&self) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY role, login")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    pub async fn create(&self, user: &NewUser<'_>) -> AppResult<User> {
        let mut conn = self.pool.acquire().await?;
        insert_user(&mut conn, user).await
    }

    /// Update an account; `password_hash` replaces the password when given
    pub async fn update(&self, id: i32, data: &UpdateUser, password_hash: Option<&str>) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                display_name = COALESCE($2, display_name),
                email = COALESCE($3, email),
                role = COALESCE($4, role),
                active = COALESCE($5, active),
                password_hash = COALESCE($6, password_hash)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&data.display_name)
        .bind(&data.email)
        .bind(data.role)
        .bind(data.active)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Store the first password and burn the setup token
    pub async fn complete_setup(&self, id: i32, password_hash: &str) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET password_hash = $2, password_setup_token = NULL, password_setup_expires = NULL
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    pub async fn touch_last_login(&self, id: i32) -> AppResult<()> {
        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
