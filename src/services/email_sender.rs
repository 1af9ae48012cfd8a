//! Transactional email sending abstraction.
//!
//! `EmailSender` is the core trait — `ResendEmailSender` in production,
//! `LogEmailSender` in dev/staging (logs to tracing), `FakeEmailSender` in tests.
//!
//! The trait is object-safe so callers can hold `Arc<dyn EmailSender>`.

use anyhow::Result;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::info;

// =============================================================================
// Core trait
// =============================================================================

/// A file carried with the message.
#[derive(Debug, Clone)]
pub struct EmailAttachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

/// Represents a rendered email message ready to send.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
    pub attachments: Vec<EmailAttachment>,
}

/// Abstraction over an email transport.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, msg: EmailMessage) -> Result<()>;
}

// =============================================================================
// LogEmailSender — writes to tracing (dev / staging)
// =============================================================================

pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, msg: EmailMessage) -> Result<()> {
        let attachments: Vec<&str> = msg.attachments.iter().map(|a| a.filename.as_str()).collect();
        info!(
            to = %msg.to,
            subject = %msg.subject,
            ?attachments,
            "[LogEmailSender] Would send email\n---TEXT---\n{}",
            msg.text,
        );
        Ok(())
    }
}

// =============================================================================
// FakeEmailSender — captures sent messages in a Vec (tests)
// =============================================================================

#[cfg(test)]
use std::sync::Mutex;

/// Collects sent messages in memory for assertion in tests.
#[cfg(test)]
#[derive(Default)]
pub struct FakeEmailSender {
    pub sent: Mutex<Vec<EmailMessage>>,
    /// When set, every send fails after recording nothing.
    pub fail: bool,
}

#[cfg(test)]
impl FakeEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent_messages(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last_message(&self) -> Option<EmailMessage> {
        self.sent.lock().unwrap().last().cloned()
    }
}

#[cfg(test)]
#[async_trait]
impl EmailSender for FakeEmailSender {
    async fn send(&self, msg: EmailMessage) -> Result<()> {
        if self.fail {
            anyhow::bail!("SMTP relay unavailable");
        }
        self.sent.lock().unwrap().push(msg);
        Ok(())
    }
}

// =============================================================================
// ResendEmailSender — live Resend.com API
// =============================================================================

pub struct ResendEmailSender {
    api_key: String,
    from: String,
    client: reqwest::Client,
}

impl ResendEmailSender {
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            from: from.into(),
            client: reqwest::Client::new(),
        }
    }
}

fn resend_body(from: &str, msg: &EmailMessage) -> serde_json::Value {
    let attachments: Vec<serde_json::Value> = msg
        .attachments
        .iter()
        .map(|a| {
            serde_json::json!({
                "filename": a.filename,
                "content": STANDARD.encode(&a.content),
                "content_type": a.content_type,
            })
        })
        .collect();

    serde_json::json!({
        "from": from,
        "to": msg.to,
        "subject": msg.subject,
        "html": msg.html,
        "text": msg.text,
        "attachments": attachments,
    })
}

#[async_trait]
impl EmailSender for ResendEmailSender {
    async fn send(&self, msg: EmailMessage) -> Result<()> {
        let response = self
            .client
            .post("https://api.resend.com/emails")
            .bearer_auth(&self.api_key)
            .json(&resend_body(&self.from, &msg))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Resend API error {}: {}", status, body));
        }

        info!(to = %msg.to, subject = %msg.subject, "Email sent via Resend");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
