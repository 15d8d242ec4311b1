//! Member signup requests: public form, approval and rejection

use chrono::NaiveDate;

use crate::{
    error::{AppError, AppResult},
    models::{
        signup::{CreateSignup, SignupApproval, SignupQuery, SignupRequest},
        Page, PageQuery,
    },
    repository::{signups::ApprovalTerms, Repository},
    services::{
        borrowers::membership_expiry,
        email::{self, EmailService},
        settings::SettingsService,
        users::{generate_token, UsersService, SETUP_TOKEN_LEN},
    },
};

/// Login candidate from an email: local part, lowercase, `[a-z0-9._-]` only
pub fn login_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default().trim().to_lowercase();
    let cleaned: String = local
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    if cleaned.len() < 3 {
        format!("member.{}", cleaned)
    } else {
        cleaned
    }
}

#[derive(Clone)]
pub struct SignupsService {
    repository: Repository,
    settings: SettingsService,
    email: EmailService,
}

impl SignupsService {
    pub fn new(repository: Repository, settings: SettingsService, email: EmailService) -> Self {
        Self {
            repository,
            settings,
            email,
        }
    }

    pub async fn list(&self, query: &SignupQuery) -> AppResult<Page<SignupRequest>> {
        let page = PageQuery {
            page: query.page,
            per_page: query.per_page,
        };
        let (items, total) = self
            .repository
            .signups
            .list(query, page.per_page(), page.offset())
            .await?;
        Ok(Page::new(items, total, &page))
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<SignupRequest> {
        self.repository.signups.get_by_id(id).await
    }

    /// Public request; the librarian is told about it
    pub async fn submit(&self, data: &CreateSignup) -> AppResult<SignupRequest> {
        if let Some(type_id) = data.borrower_type_id {
            self.repository.references.get_borrower_type(type_id).await?;
        }
        let signup = self.repository.signups.create(data).await?;
        tracing::info!("Signup request {} received from {}", signup.id, signup.email);

        let enabled = self.settings.parameters().await?.enable_email_notifications;
        self.email
            .notify(enabled, self.email.librarian_address(), email::signup_received(&signup))
            .await;
        Ok(signup)
    }

    /// First free login derived from the email
    async fn free_login(&self, email: &str) -> AppResult<String> {
        let base = login_from_email(email);
        if !self.repository.users.login_exists(&base).await? {
            return Ok(base);
        }
        for n in 2..1000 {
            let candidate = format!("{}{}", base, n);
            if !self.repository.users.login_exists(&candidate).await? {
                return Ok(candidate);
            }
        }
        Err(AppError::Conflict(format!("No free login for {}", email)))
    }

    /// Create the borrower and its member account, then email the setup token
    pub async fn approve(&self, id: i32, processed_by: i32, today: NaiveDate) -> AppResult<SignupApproval> {
        let signup = self.repository.signups.get_by_id(id).await?;
        let params = self.settings.parameters().await?;
        let login = self.free_login(&signup.email).await?;
        let token = generate_token(SETUP_TOKEN_LEN);

        let approval = self
            .repository
            .signups
            .approve(
                id,
                &ApprovalTerms {
                    processed_by,
                    membership_date: today,
                    membership_expiry: membership_expiry(today, params.default_membership_months),
                    login: &login,
                    setup_token: &token,
                    setup_expires: UsersService::setup_expiry(),
                },
            )
            .await?;
        tracing::info!(
            "Signup {} approved: borrower {} with login {}",
            id,
            approval.borrower_id,
            approval.login
        );

        self.email
            .notify(
                params.enable_email_notifications,
                Some(&approval.signup.email),
                email::signup_approved(&approval.signup, &approval.login, &token),
            )
            .await;
        Ok(approval)
    }

    pub async fn reject(&self, id: i32, reason: &str, processed_by: i32) -> AppResult<SignupRequest> {
        if reason.trim().is_empty() {
            return Err(AppError::Validation("A rejection reason is required".to_string()));
        }
        let signup = self.repository.signups.reject(id, reason, processed_by).await?;
        tracing::info!("Signup {} rejected", id);

        let enabled = self.settings.parameters().await?.enable_email_notifications;
        self.email
            .notify(enabled, Some(&signup.email), email::signup_rejected(&signup))
            .await;
        Ok(signup)
    }

    pub async fn reset(&self, id: i32) -> AppResult<SignupRequest> {
        self.repository.signups.reset(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_from_email() {
        assert_eq!(login_from_email("Nguyen.An@example.org"), "nguyen.an");
        assert_eq!(login_from_email("an+lib@example.org"), "anlib");
        assert_eq!(login_from_email("ab@example.org"), "member.ab");
    }
}
