// ============================================================================
// CONFIGURATION
// ============================================================================
//
// Lue depuis l'environnement (après `dotenv`).

use std::env;

use chrono::Duration;
use thiserror::Error;

use crate::utils::signing::{SigningAlgorithm, SigningKey};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in .env file")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Identifiants Brevo pour l'envoi des emails
#[derive(Clone, Debug)]
pub struct BrevoConfig {
    pub api_key: String,
    pub sender_email: String,
    pub sender_name: Option<String>,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Adresse d'écoute HTTP (ex: "127.0.0.1:8080")
    pub bind_addr: String,
    pub database_url: String,
    /// Préfixe des liens envoyés par email (protocole + domaine)
    pub public_url: String,
    pub signing: SigningKey,
    /// Validité du lien d'activation
    pub signup_max_age: Duration,
    pub email_change_max_age: Duration,
    pub password_reset_max_age: Duration,
    /// Durée de vie des JWT de session
    pub session_ttl: Duration,
    /// Sans Brevo, les emails sont seulement journalisés
    pub brevo: Option<BrevoConfig>,
}

impl AppConfig {
    /// Lit la configuration depuis les variables d'environnement
    ///
    /// | Variable                         | Défaut                  |
    /// |----------------------------------|-------------------------|
    /// | `DATABASE_URL`                   | requis                  |
    /// | `SECRET_KEY`                     | requis                  |
    /// | `BIND_ADDR`                      | `127.0.0.1:8080`        |
    /// | `PUBLIC_URL`                     | `http://127.0.0.1:8080` |
    /// | `SIGNING_ALGORITHM`              | `sha256`                |
    /// | `EMAIL_CHANGE_TIMEOUT_SECONDS`   | `86400`                 |
    /// | `PASSWORD_RESET_TIMEOUT_SECONDS` | `259200`                |
    /// | `BREVO_API_KEY` / `BREVO_SENDER_EMAIL` / `BREVO_SENDER_NAME` | - |
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = required("DATABASE_URL")?;
        let secret = required("SECRET_KEY")?;

        let algorithm = match optional("SIGNING_ALGORITHM") {
            Some(value) => value
                .parse::<SigningAlgorithm>()
                .map_err(|message| ConfigError::Invalid {
                    key: "SIGNING_ALGORITHM",
                    message,
                })?,
            None => SigningAlgorithm::default(),
        };

        let brevo = match (optional("BREVO_API_KEY"), optional("BREVO_SENDER_EMAIL")) {
            (Some(api_key), Some(sender_email)) => Some(BrevoConfig {
                api_key,
                sender_email,
                sender_name: optional("BREVO_SENDER_NAME"),
            }),
            _ => None,
        };

        Ok(Self {
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:8080".to_string()),
            database_url,
            public_url: optional("PUBLIC_URL")
                .unwrap_or_else(|| "http://127.0.0.1:8080".to_string())
                .trim_end_matches('/')
                .to_string(),
            signing: SigningKey::new(secret, algorithm),
            signup_max_age: Duration::hours(6),
            email_change_max_age: seconds("EMAIL_CHANGE_TIMEOUT_SECONDS", 60 * 60 * 24)?,
            password_reset_max_age: seconds("PASSWORD_RESET_TIMEOUT_SECONDS", 60 * 60 * 24 * 3)?,
            session_ttl: Duration::hours(24),
            brevo,
        })
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    optional(key).ok_or(ConfigError::Missing(key))
}

fn seconds(key: &'static str, default: i64) -> Result<Duration, ConfigError> {
    let Some(value) = optional(key) else {
        return Ok(Duration::seconds(default));
    };

    match value.parse::<i64>() {
        Ok(secs) if secs > 0 => Ok(Duration::seconds(secs)),
        _ => Err(ConfigError::Invalid {
            key,
            message: format!("expected a positive number of seconds, got {:?}", value),
        }),
    }
}
