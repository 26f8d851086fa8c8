//! Outbound mail.
//!
//! Delivery goes through an HTTP relay; the relay address comes from config.
//! Senders treat a failed send as a reported error, never as a reason to roll
//! back the state change that triggered it.

use async_trait::async_trait;

use crate::domain::DomainError;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DomainError>;
}

/// Posts messages as JSON to an HTTP mail relay.
pub struct HttpMailer {
    client: reqwest::Client,
    relay_url: String,
    sender: String,
}

impl HttpMailer {
    pub fn new(relay_url: String, sender: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            relay_url,
            sender,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DomainError> {
        let res = self
            .client
            .post(&self.relay_url)
            .json(&serde_json::json!({
                "from": self.sender,
                "to": to,
                "subject": subject,
                "body": body,
            }))
            .send()
            .await
            .map_err(|e| DomainError::External(format!("Mail relay unreachable: {}", e)))?;

        if res.status().is_success() {
            tracing::info!("Mail sent to {}: {}", to, subject);
            Ok(())
        } else {
            Err(DomainError::External(format!(
                "Mail relay returned status {}",
                res.status()
            )))
        }
    }
}

/// Fallback when no relay is configured: logs the message and reports success.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DomainError> {
        tracing::info!("Mail (log only) to {}: {} / {} bytes", to, subject, body.len());
        Ok(())
    }
}
