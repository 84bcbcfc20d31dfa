//! Outbound email seam.
//!
//! Delivery itself is delegated: [`HttpMailer`] posts to a transactional email
//! API, [`LogMailer`] only records the send in the logs (used when no mail API
//! is configured).

use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Serialize;
use thiserror::Error;

use crate::config::MailSettings;

/// A rendered email ready to hand to a [`Mailer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub subject: String,
    pub recipients: Vec<String>,
    pub html_body: String,
}

impl OutgoingEmail {
    pub fn new(subject: impl Into<String>, recipients: Vec<String>, html_body: String) -> Self {
        Self {
            subject: subject.into(),
            recipients,
            html_body,
        }
    }
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("mail provider rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

pub trait Mailer: Send + Sync {
    fn send<'a>(&'a self, email: &'a OutgoingEmail) -> BoxFuture<'a, Result<(), MailError>>;
}

/// Sends through an HTTP email API that accepts `{from, to, subject, html}`.
pub struct HttpMailer {
    client: reqwest::Client,
    settings: MailSettings,
}

#[derive(Serialize)]
struct MailPayload<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    html: &'a str,
}

impl HttpMailer {
    pub fn new(settings: MailSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            settings,
        }
    }
}

impl Mailer for HttpMailer {
    fn send<'a>(&'a self, email: &'a OutgoingEmail) -> BoxFuture<'a, Result<(), MailError>> {
        Box::pin(async move {
            let res = self
                .client
                .post(&self.settings.api_url)
                .bearer_auth(&self.settings.api_key)
                .json(&MailPayload {
                    from: &self.settings.from,
                    to: &email.recipients,
                    subject: &email.subject,
                    html: &email.html_body,
                })
                .send()
                .await?;

            let status = res.status();
            if !status.is_success() {
                let body = res.text().await.unwrap_or_default();
                return Err(MailError::Rejected {
                    status: status.as_u16(),
                    body,
                });
            }

            tracing::info!(
                subject = %email.subject,
                recipients = email.recipients.len(),
                "Email sent"
            );
            Ok(())
        })
    }
}

/// Logs the email instead of delivering it.
#[derive(Debug, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send<'a>(&'a self, email: &'a OutgoingEmail) -> BoxFuture<'a, Result<(), MailError>> {
        Box::pin(async move {
            tracing::info!(
                subject = %email.subject,
                recipients = ?email.recipients,
                body_len = email.html_body.len(),
                "Mail delivery not configured, email logged only"
            );
            Ok(())
        })
    }
}

/// Picks the HTTP mailer when mail settings are present, the logging one otherwise.
pub fn mailer_from_settings(settings: Option<MailSettings>) -> Arc<dyn Mailer> {
    match settings {
        Some(settings) => Arc::new(HttpMailer::new(settings)),
        None => Arc::new(LogMailer),
    }
}

/// Sends on a detached task so the request is not held up by delivery.
pub fn send_in_background(mailer: Arc<dyn Mailer>, email: OutgoingEmail) {
    tokio::spawn(async move {
        if let Err(e) = mailer.send(&email).await {
            tracing::error!(subject = %email.subject, error = %e, "Failed to send email");
        }
    });
}
