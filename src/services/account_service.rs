use chrono::{DateTime, Utc};
use sea_orm::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::AccountError;
use crate::models::accounts;
use crate::models::dto::{
    LoginRequest, PasswordChangeRequest, PasswordResetConfirmRequest, PasswordResetRequest,
    ProfileUpdateRequest, SignupRequest,
};
use crate::services::mail_templates;
use crate::state::AppState;
use crate::utils::signing::TokenError;
use crate::utils::{jwt, password};

pub struct AccountService;

/// Contenu du token de reset: le compte + l'empreinte de son état actuel
#[derive(Debug, Serialize, Deserialize)]
struct PasswordResetClaim {
    account: Uuid,
    fingerprint: String,
}

impl AccountService {
    /// Inscription: crée un compte inactif et envoie le lien d'activation
    ///
    /// Un compte inactif existant sur le même email est supprimé d'abord,
    /// ce qui invalide son ancien lien d'activation.
    pub async fn signup(
        db: &DatabaseConnection,
        state: &AppState,
        mut request: SignupRequest,
    ) -> Result<accounts::Model, AccountError> {
        // Normaliser avant validation: " a@x.com " est accepté
        request.email = normalize_email(&request.email);
        request.validate()?;

        let email = request.email.clone();
        let password_hash =
            password::hash_password(&request.password).map_err(AccountError::Internal)?;

        let txn = db.begin().await?;

        // 1. Libérer l'email s'il appartient à un compte jamais activé
        let purged = delete_inactive_with_email(&txn, &email, None).await?;
        if purged > 0 {
            tracing::info!(email = %email, purged, "removed pending signup for reused email");
        }

        // 2. Refuser si un compte actif utilise déjà cet email
        if find_by_email(&txn, &email).await?.is_some() {
            return Err(AccountError::EmailTaken);
        }

        // 3. Créer le compte inactif
        let new_account = accounts::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email),
            name: Set(String::new()),
            password_hash: Set(password_hash),
            is_active: Set(false),
            last_login: Set(None),
            created_at: Set(Utc::now()),
        };
        let account = new_account.insert(&txn).await?;

        txn.commit().await?;

        // 4. Envoyer le lien d'activation
        let token = state.tokens.signup.issue(&account.id.simple().to_string());
        let email = mail_templates::signup_verification(
            &account.email,
            &state.config.public_url,
            &token,
        );
        state.mailer.send(&email).await?;

        tracing::info!(account_id = %account.id, "signup pending email verification");

        Ok(account)
    }

    /// Active le compte désigné par le token d'inscription
    pub async fn verify_signup(
        db: &DatabaseConnection,
        state: &AppState,
        token: &str,
    ) -> Result<accounts::Model, AccountError> {
        // 1. Signature + expiration (6h)
        let payload = state
            .tokens
            .signup
            .verify(token, state.config.signup_max_age)?;

        // 2. Retrouver le compte
        let account_id = Uuid::parse_str(&payload).map_err(|_| AccountError::NotFound)?;
        let account = accounts::Entity::find_by_id(account_id)
            .one(db)
            .await?
            .ok_or(AccountError::NotFound)?;

        if account.is_active {
            return Err(AccountError::AlreadyActive);
        }

        // 3. Activer
        let mut active_model: accounts::ActiveModel = account.into();
        active_model.is_active = Set(true);
        let account = active_model.update(db).await?;

        tracing::info!(account_id = %account.id, "account activated");

        Ok(account)
    }

    /// Connexion: retourne un JWT de session et le compte
    ///
    /// Email inconnu, compte inactif et mauvais mot de passe donnent
    /// tous la même erreur.
    pub async fn login(
        db: &DatabaseConnection,
        state: &AppState,
        request: LoginRequest,
    ) -> Result<(String, accounts::Model), AccountError> {
        let email = normalize_email(&request.email);

        let account = match find_by_email(db, &email).await? {
            Some(account) if account.is_active => account,
            _ => return Err(AccountError::InvalidCredentials),
        };

        let is_valid = password::verify_password(&request.password, &account.password_hash)
            .map_err(AccountError::Internal)?;
        if !is_valid {
            return Err(AccountError::InvalidCredentials);
        }

        let mut active_model: accounts::ActiveModel = account.into();
        active_model.last_login = Set(Some(Utc::now()));
        let account = active_model.update(db).await?;

        let token = jwt::generate_token(
            account.id,
            &account.email,
            state.session_secret(),
            state.config.session_ttl,
        )
        .map_err(AccountError::Internal)?;

        tracing::info!(account_id = %account.id, "login");

        Ok((token, account))
    }

    pub async fn get_account(
        db: &DatabaseConnection,
        account_id: Uuid,
    ) -> Result<accounts::Model, AccountError> {
        accounts::Entity::find_by_id(account_id)
            .one(db)
            .await?
            .ok_or(AccountError::NotFound)
    }

    pub async fn update_profile(
        db: &DatabaseConnection,
        account_id: Uuid,
        request: ProfileUpdateRequest,
    ) -> Result<accounts::Model, AccountError> {
        request.validate()?;

        let account = Self::get_account(db, account_id).await?;

        let mut active_model: accounts::ActiveModel = account.into();
        active_model.name = Set(request.name.trim().to_string());

        Ok(active_model.update(db).await?)
    }

    /// Changement de mot de passe pour un utilisateur connecté
    pub async fn change_password(
        db: &DatabaseConnection,
        account_id: Uuid,
        request: PasswordChangeRequest,
    ) -> Result<accounts::Model, AccountError> {
        request.validate()?;

        let account = Self::get_account(db, account_id).await?;

        // 1. Vérifier l'ancien mot de passe
        let is_valid = password::verify_password(&request.current_password, &account.password_hash)
            .map_err(AccountError::Internal)?;
        if !is_valid {
            return Err(AccountError::Validation(
                "Current password is incorrect".to_string(),
            ));
        }

        // 2. Enregistrer le nouveau
        let new_hash =
            password::hash_password(&request.new_password).map_err(AccountError::Internal)?;

        let mut active_model: accounts::ActiveModel = account.into();
        active_model.password_hash = Set(new_hash);
        let account = active_model.update(db).await?;

        tracing::info!(account_id = %account.id, "password changed");

        Ok(account)
    }

    /// Demande de reset: envoie un lien si un compte actif a cet email
    ///
    /// Ne révèle jamais si l'email existe.
    pub async fn request_password_reset(
        db: &DatabaseConnection,
        state: &AppState,
        mut request: PasswordResetRequest,
    ) -> Result<(), AccountError> {
        request.email = normalize_email(&request.email);
        request.validate()?;

        let account = match find_by_email(db, &request.email).await? {
            Some(account) if account.is_active => account,
            _ => {
                tracing::info!("password reset requested for unknown or inactive email");
                return Ok(());
            }
        };

        let claim = PasswordResetClaim {
            account: account.id,
            fingerprint: reset_fingerprint(&account),
        };
        let payload = serde_json::to_string(&claim)
            .map_err(|e| AccountError::Internal(format!("reset claim: {}", e)))?;

        let token = state.tokens.password_reset.issue(&payload);
        let email = mail_templates::password_reset(&account.email, &state.config.public_url, &token);
        state.mailer.send(&email).await?;

        tracing::info!(account_id = %account.id, "password reset email sent");

        Ok(())
    }

    /// Applique le nouveau mot de passe si le token de reset est encore valable
    pub async fn confirm_password_reset(
        db: &DatabaseConnection,
        state: &AppState,
        token: &str,
        request: PasswordResetConfirmRequest,
    ) -> Result<accounts::Model, AccountError> {
        // 1. Signature + expiration
        let payload = state
            .tokens
            .password_reset
            .verify(token, state.config.password_reset_max_age)?;
        let claim: PasswordResetClaim =
            serde_json::from_str(&payload).map_err(|_| TokenError::BadSignature)?;

        request.validate()?;

        // 2. Le compte doit être dans l'état où le token a été émis
        let account = Self::get_account(db, claim.account).await?;
        if reset_fingerprint(&account) != claim.fingerprint {
            return Err(AccountError::Superseded);
        }

        // 3. Nouveau mot de passe (ce qui invalide le token)
        let new_hash =
            password::hash_password(&request.new_password).map_err(AccountError::Internal)?;

        let mut active_model: accounts::ActiveModel = account.into();
        active_model.password_hash = Set(new_hash);
        let account = active_model.update(db).await?;

        tracing::info!(account_id = %account.id, "password reset");

        Ok(account)
    }

    /// Supprime les comptes jamais activés créés avant `cutoff`
    pub async fn purge_stale_signups(
        db: &DatabaseConnection,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, AccountError> {
        let result = accounts::Entity::delete_many()
            .filter(accounts::Column::IsActive.eq(false))
            .filter(accounts::Column::CreatedAt.lt(cutoff))
            .exec(db)
            .await?;

        Ok(result.rows_affected)
    }
}

/// Normalise un email: espaces retirés, domaine en minuscules
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

pub(crate) async fn find_by_email<C: ConnectionTrait>(
    conn: &C,
    email: &str,
) -> Result<Option<accounts::Model>, DbErr> {
    accounts::Entity::find()
        .filter(accounts::Column::Email.eq(email))
        .one(conn)
        .await
}

/// Supprime les comptes inactifs qui détiennent `email` (sauf `keep`)
pub(crate) async fn delete_inactive_with_email<C: ConnectionTrait>(
    conn: &C,
    email: &str,
    keep: Option<Uuid>,
) -> Result<u64, DbErr> {
    let mut query = accounts::Entity::delete_many()
        .filter(accounts::Column::Email.eq(email))
        .filter(accounts::Column::IsActive.eq(false));

    if let Some(id) = keep {
        query = query.filter(accounts::Column::Id.ne(id));
    }

    Ok(query.exec(conn).await?.rows_affected)
}

fn reset_fingerprint(account: &accounts::Model) -> String {
    password::fingerprint(
        &account.password_hash,
        account.last_login.map(|ts| ts.timestamp()),
    )
}
