//! Email service for member and librarian notifications

use lettre::{
    message::{header::ContentType, Mailbox, Message, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use std::str::FromStr;

use crate::{
    config::EmailConfig,
    error::{AppError, AppResult},
    models::{
        borrowing::BorrowingDetails, reservation::Reservation, signup::SignupRequest,
    },
};

/// Subject and plain-text body of a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
}

fn copy_list(details: &BorrowingDetails) -> String {
    details
        .lines
        .iter()
        .flat_map(|line| {
            line.quant_lines
                .iter()
                .filter(|c| c.state.is_active())
                .map(move |c| {
                    format!(
                        "  - {} [{}] due {}",
                        line.line.book_title,
                        c.registration_number.as_deref().unwrap_or("-"),
                        c.due_date
                    )
                })
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn borrowing_confirmed(details: &BorrowingDetails) -> Notification {
    let name = details.borrowing.name.as_deref().unwrap_or("");
    Notification {
        subject: format!("Borrowing {} confirmed", name),
        body: format!(
            r#"
Dear {borrower},

Your borrowing {name} has been confirmed. You borrowed:

{copies}

Please return the books before their due date.
"#,
            borrower = details.borrower_name,
            name = name,
            copies = copy_list(details),
        ),
    }
}

pub fn due_reminder(details: &BorrowingDetails) -> Notification {
    let name = details.borrowing.name.as_deref().unwrap_or("");
    Notification {
        subject: format!("Reminder: books of {} are due soon", name),
        body: format!(
            r#"
Dear {borrower},

The following books of borrowing {name} are due soon:

{copies}

You can renew them from your account if no one is waiting for them.
"#,
            borrower = details.borrower_name,
            name = name,
            copies = copy_list(details),
        ),
    }
}

pub fn overdue_notice(details: &BorrowingDetails) -> Notification {
    let name = details.borrowing.name.as_deref().unwrap_or("");
    Notification {
        subject: format!("Overdue books on borrowing {}", name),
        body: format!(
            r#"
Dear {borrower},

The following books of borrowing {name} are overdue ({late} days late):

{copies}

Current fine: {fine}. Please return them as soon as possible.
"#,
            borrower = details.borrower_name,
            name = name,
            late = details.late_days,
            copies = copy_list(details),
            fine = details.fine_amount,
        ),
    }
}

pub fn reservation_available(reservation: &Reservation) -> Notification {
    Notification {
        subject: format!("Your reserved book is available ({})", reservation.name),
        body: format!(
            r#"
Dear {borrower},

"{title}" (copy {copy}) is waiting for you at the library.
It is held for you until {expiry}.
"#,
            borrower = reservation.borrower_name,
            title = reservation.book_title,
            copy = reservation.registration_number.as_deref().unwrap_or("-"),
            expiry = reservation.expiry_date,
        ),
    }
}

pub fn signup_received(signup: &SignupRequest) -> Notification {
    Notification {
        subject: format!("New membership request from {}", signup.name),
        body: format!(
            r#"
A new membership request is waiting for review.

Name:  {name}
Email: {email}
Phone: {phone}
"#,
            name = signup.name,
            email = signup.email,
            phone = signup.phone.as_deref().unwrap_or("-"),
        ),
    }
}

pub fn signup_approved(signup: &SignupRequest, login: &str, setup_token: &str) -> Notification {
    Notification {
        subject: "Your library membership is approved".to_string(),
        body: format!(
            r#"
Dear {name},

Your membership request has been approved.

Login: {login}
Password setup code: {token}

Use this code to choose your password. It can only be used once.
"#,
            name = signup.name,
            login = login,
            token = setup_token,
        ),
    }
}

pub fn signup_rejected(signup: &SignupRequest) -> Notification {
    Notification {
        subject: "Your library membership request".to_string(),
        body: format!(
            r#"
Dear {name},

We are sorry, your membership request could not be accepted.

Reason: {reason}
"#,
            name = signup.name,
            reason = signup.rejection_reason.as_deref().unwrap_or("-"),
        ),
    }
}

#[derive(Clone)]
pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    pub fn librarian_address(&self) -> Option<&str> {
        self.config.librarian_address.as_deref()
    }

    /// Send a notification; skipped when disabled or without recipient,
    /// failures are logged and never returned
    pub async fn notify(&self, enabled: bool, to: Option<&str>, notification: Notification) {
        if !enabled {
            tracing::debug!("Email notifications disabled, skipping '{}'", notification.subject);
            return;
        }
        let Some(to) = to.map(str::trim).filter(|t| !t.is_empty()) else {
            tracing::debug!("No recipient address, skipping '{}'", notification.subject);
            return;
        };
        match self.send_email(to, &notification.subject, &notification.body).await {
            Ok(()) => tracing::info!("Sent '{}' to {}", notification.subject, to),
            Err(e) => tracing::error!("Failed to send '{}' to {}: {}", notification.subject, to, e),
        }
    }

    /// Generic email sending function
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> AppResult<()> {
        let from_name = self
            .config
            .smtp_from_name
            .as_deref()
            .unwrap_or("Library");
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
            .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))?;

        let to_mailbox = Mailbox::from_str(to)
            .map_err(|e| AppError::Internal(format!("Invalid to address: {}", e)))?;

        let email = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(body.trim().to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body(body)),
                    ),
            )
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))?;

        let mailer_builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| AppError::Internal(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer_builder = if let (Some(username), Some(password)) = (
            &self.config.smtp_username,
            &self.config.smtp_password,
        ) {
            mailer_builder.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            mailer_builder
        };

        let mailer = mailer_builder.build();

        // SMTP transport is blocking
        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::Internal(format!("Email task failed: {}", e)))?
            .map_err(|e| AppError::Internal(format!("Failed to send email: {}", e)))?;

        Ok(())
    }
}

/// HTML alternative of a plain-text body
fn html_body(body: &str) -> String {
    let escaped = body
        .trim()
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\n', "<br>");
    format!("<html><body><p>{}</p></body></html>", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::signup::SignupState;
    use chrono::Utc;

    fn signup() -> SignupRequest {
        SignupRequest {
            id: 1,
            name: "Nguyen Van An".to_string(),
            email: "an@example.org".to_string(),
            phone: None,
            address: None,
            id_card: None,
            date_of_birth: None,
            borrower_type_id: None,
            notes: None,
            state: SignupState::Rejected,
            rejection_reason: Some("Incomplete identity data".to_string()),
            borrower_id: None,
            processed_by: None,
            processed_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_signup_templates() {
        let s = signup();
        let approved = signup_approved(&s, "an", "tok123");
        assert!(approved.body.contains("Login: an"));
        assert!(approved.body.contains("tok123"));

        let rejected = signup_rejected(&s);
        assert!(rejected.body.contains("Incomplete identity data"));

        let received = signup_received(&s);
        assert!(received.subject.contains("Nguyen Van An"));
        assert!(received.body.contains("Phone: -"));
    }

    #[test]
    fn test_html_body_escapes() {
        assert_eq!(
            html_body("\n<b>A & B</b>\nnext\n"),
            "<html><body><p>&lt;b&gt;A &amp; B&lt;/b&gt;<br>next</p></body></html>"
        );
    }
}
