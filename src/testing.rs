// ============================================================================
// OUTILS DE TEST
// ============================================================================
//
// BD SQLite en mémoire et mailers qui enregistrent ou échouent.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Duration;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use crate::config::AppConfig;
use crate::db;
use crate::services::mailer::{MailError, Mailer, OutboundEmail};
use crate::state::AppState;
use crate::utils::signing::{SigningAlgorithm, SigningKey};

pub const PUBLIC_URL: &str = "https://canvas.test";

/// Garde les emails envoyés pour inspection
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutboundEmail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last(&self) -> OutboundEmail {
        self.sent().pop().expect("no email sent")
    }

    /// Extrait le token du dernier lien envoyé
    pub fn last_token(&self) -> String {
        let body = self.last().body;
        body.lines()
            .find(|line| line.starts_with(PUBLIC_URL))
            .and_then(|line| line.rsplit('/').next())
            .expect("no link in email")
            .to_string()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Mailer toujours en échec
pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _email: &OutboundEmail) -> Result<(), MailError> {
        Err(MailError::Transport("connection refused".to_string()))
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        database_url: "sqlite::memory:".to_string(),
        public_url: PUBLIC_URL.to_string(),
        signing: SigningKey::new("test-secret-key", SigningAlgorithm::HmacSha256),
        signup_max_age: Duration::hours(6),
        email_change_max_age: Duration::hours(24),
        password_reset_max_age: Duration::days(3),
        session_ttl: Duration::hours(24),
        brevo: None,
    }
}

pub fn test_state() -> (AppState, Arc<RecordingMailer>) {
    let mailer = Arc::new(RecordingMailer::default());
    (AppState::new(test_config(), mailer.clone()), mailer)
}

/// Une seule connexion: chaque connexion SQLite en mémoire est une BD distincte
pub async fn memory_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options).await.unwrap();
    db::create_schema(&db).await.unwrap();
    db
}
