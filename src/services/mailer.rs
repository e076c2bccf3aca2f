use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::BrevoConfig;

const BREVO_SEND_URL: &str = "https://api.brevo.com/v3/smtp/email";

/// Email sortant (texte brut)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail transport error: {0}")]
    Transport(String),

    #[error("mail provider rejected message (status={status}): {body}")]
    Rejected { status: u16, body: String },
}

//trait = Interface vers le transport d'emails
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError>;
}

/// Transport de développement: écrit l'email dans les logs
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            "outbound email (not delivered, no transport configured)\n{}",
            email.body
        );
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BrevoAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BrevoSendBody {
    sender: BrevoAddress,
    to: Vec<BrevoAddress>,
    subject: String,
    text_content: String,
}

/// Envoi via l'API transactionnelle de Brevo
pub struct BrevoMailer {
    client: reqwest::Client,
    config: BrevoConfig,
}

impl BrevoMailer {
    pub fn new(config: BrevoConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl Mailer for BrevoMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        let body = BrevoSendBody {
            sender: BrevoAddress {
                email: self.config.sender_email.clone(),
                name: self.config.sender_name.clone(),
            },
            to: vec![BrevoAddress {
                email: email.to.clone(),
                name: None,
            }],
            subject: email.subject.clone(),
            text_content: email.body.clone(),
        };

        let response = self
            .client
            .post(BREVO_SEND_URL)
            .header("api-key", &self.config.api_key)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(to = %email.to, "email accepted by Brevo");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(MailError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
