//! Member signup requests repository

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{map_unique_violation, AppError, AppResult},
    models::{
        borrower::CreateBorrower,
        signup::{CreateSignup, SignupApproval, SignupQuery, SignupRequest, SignupState},
        user::UserRole,
    },
};

use super::{
    borrowers::insert_borrower,
    users::{insert_user, NewUser},
};

/// Member account settings applied on approval
#[derive(Debug, Clone)]
pub struct ApprovalTerms<'a> {
    pub processed_by: i32,
    pub membership_date: NaiveDate,
    pub membership_expiry: NaiveDate,
    pub login: &'a str,
    pub setup_token: &'a str,
    pub setup_expires: DateTime<Utc>,
}

async fn lock_signup(conn: &mut PgConnection, id: i32) -> AppResult<SignupRequest> {
    sqlx::query_as::<_, SignupRequest>("SELECT * FROM signup_requests WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Signup request with id {} not found", id)))
}

#[derive(Clone)]
pub struct SignupsRepository {
    pool: Pool<Postgres>,
}

impl SignupsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn list(&self, query: &SignupQuery, limit: i64, offset: i64) -> AppResult<(Vec<SignupRequest>, i64)> {
        let state = query.state.map(|s| s.as_str());
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM signup_requests WHERE ($1::text IS NULL OR state = $1)",
        )
        .bind(state)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, SignupRequest>(
            r#"
            SELECT * FROM signup_requests
            WHERE ($1::text IS NULL OR state = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(state)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((rows, total))
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<SignupRequest> {
        sqlx::query_as::<_, SignupRequest>("SELECT * FROM signup_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Signup request with id {} not found", id)))
    }

    pub async fn create(&self, data: &CreateSignup) -> AppResult<SignupRequest> {
        sqlx::query_as::<_, SignupRequest>(
            r#"
            INSERT INTO signup_requests (
                name, email, phone, address, id_card, date_of_birth, borrower_type_id, notes
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(data.name.trim())
        .bind(data.email.trim())
        .bind(&data.phone)
        .bind(&data.address)
        .bind(&data.id_card)
        .bind(data.date_of_birth)
        .bind(data.borrower_type_id)
        .bind(&data.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "A signup request already exists for this email"))
    }

    /// pending → approved: creates the borrower and its member account
    pub async fn approve(&self, id: i32, terms: &ApprovalTerms<'_>) -> AppResult<SignupApproval> {
        let mut tx = self.pool.begin().await?;
        let signup = lock_signup(&mut tx, id).await?;
        if signup.state != SignupState::Pending {
            return Err(AppError::BusinessRule(format!(
                "Only pending requests can be approved (current state: {})",
                signup.state
            )));
        }

        let borrower = insert_borrower(
            &mut tx,
            &CreateBorrower {
                name: signup.name.clone(),
                email: Some(signup.email.clone()),
                phone: signup.phone.clone(),
                address: signup.address.clone(),
                id_card: signup.id_card.clone(),
                date_of_birth: signup.date_of_birth,
                borrower_type_id: signup.borrower_type_id,
                membership_date: Some(terms.membership_date),
                membership_expiry: Some(terms.membership_expiry),
                max_books_override: None,
                max_days_override: None,
                notes: signup.notes.clone(),
            },
            terms.membership_date,
            terms.membership_expiry,
        )
        .await?;

        let user = insert_user(
            &mut tx,
            &NewUser {
                login: terms.login,
                password_hash: None,
                role: UserRole::Member,
                display_name: Some(&signup.name),
                email: Some(&signup.email),
                borrower_id: Some(borrower.id),
                setup_token: Some(terms.setup_token),
                setup_expires: Some(terms.setup_expires),
            },
        )
        .await?;

        let signup = sqlx::query_as::<_, SignupRequest>(
            r#"
            UPDATE signup_requests
            SET state = 'approved', borrower_id = $2, processed_by = $3, processed_at = NOW(),
                rejection_reason = NULL
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(borrower.id)
        .bind(terms.processed_by)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(SignupApproval {
            signup,
            borrower_id: borrower.id,
            user_id: user.id,
            login: user.login,
        })
    }

    /// pending → rejected with a reason
    pub async fn reject(&self, id: i32, reason: &str, processed_by: i32) -> AppResult<SignupRequest> {
        let mut tx = self.pool.begin().await?;
        let signup = lock_signup(&mut tx, id).await?;
        if signup.state != SignupState::Pending {
            return Err(AppError::BusinessRule(format!(
                "Only pending requests can be rejected (current state: {})",
                signup.state
            )));
        }
        let signup = sqlx::query_as::<_, SignupRequest>(
            r#"
            UPDATE signup_requests
            SET state = 'rejected', rejection_reason = $2, processed_by = $3, processed_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(reason.trim())
        .bind(processed_by)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(signup)
    }

    /// rejected → pending
    pub async fn reset(&self, id: i32) -> AppResult<SignupRequest> {
        let mut tx = self.pool.begin().await?;
        let signup = lock_signup(&mut tx, id).await?;
        if signup.state != SignupState::Rejected {
            return Err(AppError::BusinessRule(
                "Only rejected requests can be reset to pending".to_string(),
            ));
        }
        let signup = sqlx::query_as::<_, SignupRequest>(
            r#"
            UPDATE signup_requests
            SET state = 'pending', rejection_reason = NULL, processed_by = NULL, processed_at = NULL
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(signup)
    }
}
