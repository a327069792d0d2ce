//! Outbound invitations for assignees who have no account yet.
//!
//! Delivery is fire-and-forget from the caller's point of view: the
//! assignment service logs a failed send and carries on.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

pub const INVITE_SUBJECT: &str = "New Task Assigned";

/// Default SendGrid v3 endpoint.
pub const SENDGRID_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";

/// A rendered invitation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

impl InviteEmail {
    /// Builds the task invitation pointing at `register_link`.
    pub fn task_invite(to: impl Into<String>, register_link: &str) -> Self {
        Self {
            to: to.into(),
            subject: INVITE_SUBJECT.to_string(),
            html_body: format!(
                "<p>Hello</p><p>You've been assigned a new task. Please follow the link to \
                 register a new account and see your tasks.</p>\
                 <p><a href=\"{link}\">Register ({link})</a></p>",
                link = register_link
            ),
        }
    }
}

/// Registration link that claims task `task_id` once the account exists.
pub fn register_link(public_base_url: &str, task_id: i64) -> String {
    format!(
        "{}/api/auth/register?tid={}",
        public_base_url.trim_end_matches('/'),
        task_id
    )
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to reach mail provider: {0}")]
    Transport(String),

    #[error("mail provider rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Sends invitation emails.
#[async_trait]
pub trait InviteNotifier: Send + Sync {
    async fn send(&self, email: &InviteEmail) -> Result<(), NotifyError>;
}

/// Notifier that only logs; used when no mail provider is configured.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl InviteNotifier for LogNotifier {
    async fn send(&self, email: &InviteEmail) -> Result<(), NotifyError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            "Mail provider not configured, invite not delivered"
        );
        Ok(())
    }
}

/// Sender identity for outgoing mail
#[derive(Debug, Clone)]
pub struct Sender {
    pub email: String,
    pub name: String,
}

/// SendGrid v3 `mail/send` client
#[derive(Clone)]
pub struct SendGridNotifier {
    client: reqwest::Client,
    endpoint: Arc<str>,
    api_key: Arc<str>,
    sender: Sender,
}

impl std::fmt::Debug for SendGridNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendGridNotifier")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("sender", &self.sender)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct MailRequest<'a> {
    personalizations: [Personalization<'a>; 1],
    from: Address<'a>,
    subject: &'a str,
    content: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: [Address<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    value: &'a str,
}

impl SendGridNotifier {
    pub fn new(api_key: &str, sender: Sender) -> Self {
        Self::with_endpoint(SENDGRID_ENDPOINT, api_key, sender)
    }

    /// Points the client at a different endpoint, e.g. a local stub.
    pub fn with_endpoint(endpoint: &str, api_key: &str, sender: Sender) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: Arc::from(endpoint),
            api_key: Arc::from(api_key),
            sender,
        }
    }

    fn request_body<'a>(&'a self, email: &'a InviteEmail) -> MailRequest<'a> {
        MailRequest {
            personalizations: [Personalization {
                to: [Address {
                    email: &email.to,
                    name: None,
                }],
            }],
            from: Address {
                email: &self.sender.email,
                name: Some(&self.sender.name),
            },
            subject: &email.subject,
            content: [Content {
                kind: "text/html",
                value: &email.html_body,
            }],
        }
    }
}

#[async_trait]
impl InviteNotifier for SendGridNotifier {
    #[tracing::instrument(skip(self, email), fields(to = %email.to))]
    async fn send(&self, email: &InviteEmail) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&*self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(email))
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read body".to_string());
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(status = status.as_u16(), "Invite accepted by mail provider");
        Ok(())
    }
}
