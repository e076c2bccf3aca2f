// ============================================================================
// ERREURS : COMPTES
// ============================================================================
//
// Erreurs des flux de compte et leur traduction HTTP.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

use crate::services::mailer::MailError;
use crate::utils::signing::TokenError;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("token rejected: {0}")]
    Token(#[from] TokenError),

    #[error("account not found")]
    NotFound,

    #[error("account already active")]
    AlreadyActive,

    #[error("token belongs to another account")]
    AccountMismatch,

    #[error("token superseded by a later account change")]
    Superseded,

    #[error("email already in use")]
    EmailTaken,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error("database error: {0}")]
    Db(DbErr),
}

impl From<DbErr> for AccountError {
    fn from(e: DbErr) -> Self {
        // Course entre deux requêtes sur le même email: l'index unique tranche
        match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => AccountError::EmailTaken,
            _ => AccountError::Db(e),
        }
    }
}

impl From<validator::ValidationErrors> for AccountError {
    fn from(e: validator::ValidationErrors) -> Self {
        AccountError::Validation(e.to_string())
    }
}

impl ResponseError for AccountError {
    fn status_code(&self) -> StatusCode {
        match self {
            AccountError::Token(_)
            | AccountError::NotFound
            | AccountError::AlreadyActive
            | AccountError::AccountMismatch
            | AccountError::Superseded
            | AccountError::Validation(_) => StatusCode::BAD_REQUEST,
            AccountError::EmailTaken => StatusCode::CONFLICT,
            AccountError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AccountError::Internal(_) | AccountError::Mail(_) | AccountError::Db(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        // Les échecs de vérification restent indifférenciés pour le client
        let message = match self {
            AccountError::Validation(m) => m.clone(),
            AccountError::EmailTaken | AccountError::InvalidCredentials => self.to_string(),
            _ if status == StatusCode::BAD_REQUEST => "Bad request".to_string(),
            _ => "Internal server error".to_string(),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::info!(error = %self, status = status.as_u16(), "request rejected");
        }

        HttpResponse::build(status).json(serde_json::json!({
            "error": message
        }))
    }
}
