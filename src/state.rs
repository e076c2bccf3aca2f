use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::mailer::{BrevoMailer, LogMailer, Mailer};
use crate::utils::signing::{
    EMAIL_CHANGE_SALT, PASSWORD_RESET_SALT, SIGNUP_SALT, TokenCodec,
};

/// Un codec par usage, tous dérivés du même SigningKey
#[derive(Clone, Debug)]
pub struct Tokens {
    pub signup: TokenCodec,
    pub email_change: TokenCodec,
    pub password_reset: TokenCodec,
}

/// État partagé entre les handlers (web::Data<AppState>)
pub struct AppState {
    pub config: AppConfig,
    pub tokens: Tokens,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(config: AppConfig, mailer: Arc<dyn Mailer>) -> Self {
        let tokens = Tokens {
            signup: TokenCodec::new(&config.signing, SIGNUP_SALT),
            email_change: TokenCodec::new(&config.signing, EMAIL_CHANGE_SALT),
            password_reset: TokenCodec::new(&config.signing, PASSWORD_RESET_SALT),
        };

        Self {
            config,
            tokens,
            mailer,
        }
    }

    /// Choisit le transport selon la config: Brevo si configuré, sinon logs
    pub fn from_config(config: AppConfig) -> Self {
        let mailer: Arc<dyn Mailer> = match &config.brevo {
            Some(brevo) => Arc::new(BrevoMailer::new(brevo.clone())),
            None => {
                tracing::warn!("BREVO_API_KEY not set, emails will only be logged");
                Arc::new(LogMailer)
            }
        };

        Self::new(config, mailer)
    }

    /// Secret utilisé pour les JWT de session
    pub fn session_secret(&self) -> &[u8] {
        self.config.signing.secret()
    }
}
