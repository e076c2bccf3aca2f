//pour les requêtes et réponses structurées
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::accounts;

// ----------------------------------------------------------------------------
// Requêtes
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 10, message = "Make sure your password has at least 10 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "The two password fields didn't match"))]
    pub password_confirm: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProfileUpdateRequest {
    #[validate(length(max = 150, message = "Name is too long"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PasswordChangeRequest {
    pub current_password: String,
    #[validate(length(min = 10, message = "Make sure your password has at least 10 characters"))]
    pub new_password: String,
    #[validate(must_match(other = "new_password", message = "The two password fields didn't match"))]
    pub new_password_confirm: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PasswordResetRequest {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PasswordResetConfirmRequest {
    #[validate(length(min = 10, message = "Make sure your password has at least 10 characters"))]
    pub new_password: String,
    #[validate(must_match(other = "new_password", message = "The two password fields didn't match"))]
    pub new_password_confirm: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct EmailChangeRequest {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
}

// ----------------------------------------------------------------------------
// Réponses
// ----------------------------------------------------------------------------

/// Vue publique d'un compte (jamais le hash du mot de passe)
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<accounts::Model> for AccountResponse {
    fn from(account: accounts::Model) -> Self {
        Self {
            id: account.id,
            email: account.email,
            name: account.name,
            is_active: account.is_active,
            last_login: account.last_login,
            created_at: account.created_at,
        }
    }
}

// Réponse après login
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub account: AccountResponse,
}

// Réponse quand un email de sécurité a été envoyé
#[derive(Debug, Serialize)]
pub struct EmailSentResponse {
    pub success: bool,
    pub message: String,
}

impl EmailSentResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}
