use sea_orm::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::AccountError;
use crate::models::accounts;
use crate::models::dto::EmailChangeRequest;
use crate::services::account_service::{delete_inactive_with_email, find_by_email, normalize_email};
use crate::services::mail_templates;
use crate::state::AppState;
use crate::utils::signing::TokenError;

pub struct EmailChangeService;

/// Demande de changement d'email, portée entièrement par le token
///
/// `previous` rend le token inutilisable une fois l'email changé.
#[derive(Debug, Serialize, Deserialize)]
struct EmailChangeClaim {
    account: Uuid,
    email: String,
    previous: String,
}

impl EmailChangeService {
    /// Envoie un lien de confirmation à la NOUVELLE adresse
    pub async fn request_change(
        db: &DatabaseConnection,
        state: &AppState,
        account_id: Uuid,
        mut request: EmailChangeRequest,
    ) -> Result<(), AccountError> {
        request.email = normalize_email(&request.email);
        request.validate()?;

        let new_email = request.email.clone();

        let account = accounts::Entity::find_by_id(account_id)
            .one(db)
            .await?
            .ok_or(AccountError::NotFound)?;

        if account.email == new_email {
            return Err(AccountError::Validation(
                "New email must differ from the current one".to_string(),
            ));
        }

        // 1. Un signup jamais confirmé ne bloque pas l'adresse
        delete_inactive_with_email(db, &new_email, None).await?;

        // 2. Adresse déjà utilisée par un compte actif
        if find_by_email(db, &new_email).await?.is_some() {
            return Err(AccountError::EmailTaken);
        }

        // 3. Token lié au compte demandeur
        let claim = EmailChangeClaim {
            account: account.id,
            email: new_email.clone(),
            previous: account.email.clone(),
        };
        let payload = serde_json::to_string(&claim)
            .map_err(|e| AccountError::Internal(format!("email change claim: {}", e)))?;
        let token = state.tokens.email_change.issue(&payload);

        let email = mail_templates::email_change_verification(
            &new_email,
            &state.config.public_url,
            &token,
        );
        state.mailer.send(&email).await?;

        tracing::info!(account_id = %account.id, "email change requested");

        Ok(())
    }

    /// Applique le changement si le token appartient au compte connecté
    pub async fn confirm_change(
        db: &DatabaseConnection,
        state: &AppState,
        account_id: Uuid,
        token: &str,
    ) -> Result<accounts::Model, AccountError> {
        // 1. Signature + expiration (EMAIL_CHANGE_TIMEOUT_SECONDS)
        let payload = state
            .tokens
            .email_change
            .verify(token, state.config.email_change_max_age)?;
        let claim: EmailChangeClaim =
            serde_json::from_str(&payload).map_err(|_| TokenError::BadSignature)?;

        // 2. Le lien ne vaut que pour le compte qui l'a demandé
        if claim.account != account_id {
            tracing::warn!(
                account_id = %account_id,
                requested_by = %claim.account,
                "email change token presented by another account"
            );
            return Err(AccountError::AccountMismatch);
        }

        let txn = db.begin().await?;

        let account = accounts::Entity::find_by_id(account_id)
            .one(&txn)
            .await?
            .ok_or(AccountError::NotFound)?;

        // 3. Déjà appliqué, ou un autre changement est passé entre-temps
        if account.email != claim.previous {
            return Err(AccountError::Superseded);
        }

        // 4. Récupérer l'adresse si un compte inactif la détient
        let purged = delete_inactive_with_email(&txn, &claim.email, Some(account_id)).await?;
        if purged > 0 {
            tracing::info!(purged, "removed pending signup holding the new email");
        }

        let taken = accounts::Entity::find()
            .filter(accounts::Column::Email.eq(claim.email.as_str()))
            .filter(accounts::Column::Id.ne(account_id))
            .one(&txn)
            .await?;
        if taken.is_some() {
            return Err(AccountError::EmailTaken);
        }

        // 5. Remplacer l'email
        let mut active_model: accounts::ActiveModel = account.into();
        active_model.email = Set(claim.email);
        let account = active_model.update(&txn).await?;

        txn.commit().await?;

        tracing::info!(account_id = %account.id, "email changed");

        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    use crate::models::dto::SignupRequest;
    use crate::services::account_service::AccountService;
    use crate::testing::{memory_db, test_state, RecordingMailer};

    async fn active_account(
        db: &DatabaseConnection,
        state: &AppState,
        mailer: &RecordingMailer,
        email: &str,
    ) -> accounts::Model {
        AccountService::signup(
            db,
            state,
            SignupRequest {
                email: email.to_string(),
                password: "correct horse battery".to_string(),
                password_confirm: "correct horse battery".to_string(),
            },
        )
        .await
        .unwrap();
        AccountService::verify_signup(db, state, &mailer.last_token())
            .await
            .unwrap()
    }

    async fn pending_account(
        db: &DatabaseConnection,
        state: &AppState,
        email: &str,
    ) -> accounts::Model {
        AccountService::signup(
            db,
            state,
            SignupRequest {
                email: email.to_string(),
                password: "another password".to_string(),
                password_confirm: "another password".to_string(),
            },
        )
        .await
        .unwrap()
    }

    fn change_to(email: &str) -> EmailChangeRequest {
        EmailChangeRequest {
            email: email.to_string(),
        }
    }

    #[tokio::test]
    async fn test_email_change_flow() {
        let db = memory_db().await;
        let (state, mailer) = test_state();
        let account = active_account(&db, &state, &mailer, "a@x.com").await;

        EmailChangeService::request_change(&db, &state, account.id, change_to("new@x.com"))
            .await
            .unwrap();

        // Le lien part vers la nouvelle adresse
        assert_eq!(mailer.last().to, "new@x.com");

        let updated =
            EmailChangeService::confirm_change(&db, &state, account.id, &mailer.last_token())
                .await
                .unwrap();
        assert_eq!(updated.email, "new@x.com");

        let stored = AccountService::get_account(&db, account.id).await.unwrap();
        assert_eq!(stored.email, "new@x.com");
    }

    #[tokio::test]
    async fn test_confirm_reclaims_email_from_pending_signup() {
        let db = memory_db().await;
        let (state, mailer) = test_state();
        let account = active_account(&db, &state, &mailer, "a@x.com").await;

        EmailChangeService::request_change(&db, &state, account.id, change_to("new@x.com"))
            .await
            .unwrap();
        let token = mailer.last_token();

        // Quelqu'un s'inscrit avec new@x.com sans confirmer
        let squatter = pending_account(&db, &state, "new@x.com").await;

        EmailChangeService::confirm_change(&db, &state, account.id, &token)
            .await
            .unwrap();

        assert!(
            accounts::Entity::find_by_id(squatter.id)
                .one(&db)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_confirm_rejects_email_taken_by_active_account() {
        let db = memory_db().await;
        let (state, mailer) = test_state();
        let account = active_account(&db, &state, &mailer, "a@x.com").await;

        EmailChangeService::request_change(&db, &state, account.id, change_to("new@x.com"))
            .await
            .unwrap();
        let token = mailer.last_token();

        // new@x.com est activé par quelqu'un d'autre avant la confirmation
        let other = active_account(&db, &state, &mailer, "new@x.com").await;

        let result = EmailChangeService::confirm_change(&db, &state, account.id, &token).await;
        assert!(matches!(result, Err(AccountError::EmailTaken)));

        let stored = AccountService::get_account(&db, account.id).await.unwrap();
        assert_eq!(stored.email, "a@x.com");
        let other = AccountService::get_account(&db, other.id).await.unwrap();
        assert_eq!(other.email, "new@x.com");
    }

    #[tokio::test]
    async fn test_request_accepts_padded_email() {
        let db = memory_db().await;
        let (state, mailer) = test_state();
        let account = active_account(&db, &state, &mailer, "a@x.com").await;

        EmailChangeService::request_change(&db, &state, account.id, change_to(" new@X.com "))
            .await
            .unwrap();
        assert_eq!(mailer.last().to, "new@x.com");

        let updated =
            EmailChangeService::confirm_change(&db, &state, account.id, &mailer.last_token())
                .await
                .unwrap();
        assert_eq!(updated.email, "new@x.com");
    }

    #[tokio::test]
    async fn test_request_rejects_email_of_active_account() {
        let db = memory_db().await;
        let (state, mailer) = test_state();
        let account = active_account(&db, &state, &mailer, "a@x.com").await;
        active_account(&db, &state, &mailer, "b@x.com").await;
        let sent_before = mailer.sent().len();

        let result =
            EmailChangeService::request_change(&db, &state, account.id, change_to("b@x.com")).await;

        assert!(matches!(result, Err(AccountError::EmailTaken)));
        assert_eq!(mailer.sent().len(), sent_before);
    }

    #[tokio::test]
    async fn test_request_rejects_same_email() {
        let db = memory_db().await;
        let (state, mailer) = test_state();
        let account = active_account(&db, &state, &mailer, "a@x.com").await;

        let result =
            EmailChangeService::request_change(&db, &state, account.id, change_to("a@x.com")).await;
        assert!(matches!(result, Err(AccountError::Validation(_))));
    }

    #[tokio::test]
    async fn test_token_of_another_account_is_rejected() {
        let db = memory_db().await;
        let (state, mailer) = test_state();
        let alice = active_account(&db, &state, &mailer, "alice@x.com").await;
        let bob = active_account(&db, &state, &mailer, "bob@x.com").await;

        EmailChangeService::request_change(&db, &state, alice.id, change_to("new@x.com"))
            .await
            .unwrap();

        let result =
            EmailChangeService::confirm_change(&db, &state, bob.id, &mailer.last_token()).await;
        assert!(matches!(result, Err(AccountError::AccountMismatch)));

        let bob = AccountService::get_account(&db, bob.id).await.unwrap();
        assert_eq!(bob.email, "bob@x.com");
    }

    #[tokio::test]
    async fn test_replayed_token_is_rejected() {
        let db = memory_db().await;
        let (state, mailer) = test_state();
        let account = active_account(&db, &state, &mailer, "a@x.com").await;

        EmailChangeService::request_change(&db, &state, account.id, change_to("new@x.com"))
            .await
            .unwrap();
        let first = mailer.last_token();

        EmailChangeService::request_change(&db, &state, account.id, change_to("other@x.com"))
            .await
            .unwrap();
        let second = mailer.last_token();

        EmailChangeService::confirm_change(&db, &state, account.id, &second)
            .await
            .unwrap();

        // Le premier lien date d'avant le changement
        let result = EmailChangeService::confirm_change(&db, &state, account.id, &first).await;
        assert!(matches!(result, Err(AccountError::Superseded)));

        let result = EmailChangeService::confirm_change(&db, &state, account.id, &second).await;
        assert!(matches!(result, Err(AccountError::Superseded)));

        let stored = AccountService::get_account(&db, account.id).await.unwrap();
        assert_eq!(stored.email, "other@x.com");
    }

    #[tokio::test]
    async fn test_expired_token_changes_nothing() {
        let db = memory_db().await;
        let (state, mailer) = test_state();
        let account = active_account(&db, &state, &mailer, "a@x.com").await;

        let claim = EmailChangeClaim {
            account: account.id,
            email: "new@x.com".to_string(),
            previous: "a@x.com".to_string(),
        };
        let stale = state.tokens.email_change.issue_at(
            &serde_json::to_string(&claim).unwrap(),
            Utc::now() - Duration::hours(25),
        );

        let result = EmailChangeService::confirm_change(&db, &state, account.id, &stale).await;
        assert!(matches!(
            result,
            Err(AccountError::Token(TokenError::Expired))
        ));

        let stored = AccountService::get_account(&db, account.id).await.unwrap();
        assert_eq!(stored.email, "a@x.com");
    }

    #[tokio::test]
    async fn test_signup_token_is_not_an_email_change_token() {
        let db = memory_db().await;
        let (state, mailer) = test_state();
        let account = pending_account(&db, &state, "a@x.com").await;

        let result =
            EmailChangeService::confirm_change(&db, &state, account.id, &mailer.last_token()).await;
        assert!(matches!(
            result,
            Err(AccountError::Token(TokenError::BadSignature))
        ));
    }
}
