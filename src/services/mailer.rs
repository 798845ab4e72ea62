// src/services/mailer.rs

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::{config::EmailSettings, models::reminders::OutboundEmail};

// Timeout de cada envio
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Falha na requisição ao provedor de e-mail: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Provedor de e-mail recusou a mensagem (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Envio de e-mail transacional. Cada chamada é uma mensagem, sem retry.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError>;
}

// ---
// Resend (HTTP JSON)
// ---
pub struct ResendMailer {
    client: reqwest::Client,
    settings: EmailSettings,
}

impl ResendMailer {
    pub fn new(settings: EmailSettings) -> Result<Self, MailError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, settings })
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        let response = self
            .client
            .post(&self.settings.api_url)
            .bearer_auth(&self.settings.api_key)
            .json(&json!({
                "from": self.settings.from_address,
                "to": email.to,
                "subject": email.subject,
                "html": email.html,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_builds_from_settings() {
        let mailer = ResendMailer::new(EmailSettings {
            api_key: "re_test".into(),
            from_address: "no-reply@gear-ops.local".into(),
            api_url: "https://api.resend.com/emails".into(),
        });
        assert!(mailer.is_ok());
    }

    #[test]
    fn rejection_message_carries_status() {
        let err = MailError::Rejected {
            status: 422,
            body: "invalid `to`".into(),
        };
        assert!(err.to_string().contains("HTTP 422"));
    }
}
