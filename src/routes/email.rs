use actix_web::{get, post, web, HttpResponse};
use sea_orm::DatabaseConnection;

use crate::error::AccountError;
use crate::middleware::AuthUser;
use crate::models::dto::{AccountResponse, EmailChangeRequest, EmailSentResponse};
use crate::services::email_change_service::EmailChangeService;
use crate::state::AppState;

/// POST /users/email/change - Demander un changement d'email (PROTÉGÉE)
#[post("/email/change")]
pub async fn email_change(
    auth_user: AuthUser,
    body: web::Json<EmailChangeRequest>,
    db: web::Data<DatabaseConnection>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AccountError> {
    EmailChangeService::request_change(
        db.get_ref(),
        state.get_ref(),
        auth_user.account_id,
        body.into_inner(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(EmailSentResponse::new(
        "Check the new inbox to confirm the change",
    )))
}

/// GET /users/email/change/verification/{token} - Confirmer (PROTÉGÉE)
/// Le token doit avoir été demandé par le compte connecté
#[get("/email/change/verification/{token}")]
pub async fn email_change_verification(
    auth_user: AuthUser,
    path: web::Path<String>,
    db: web::Data<DatabaseConnection>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AccountError> {
    let account = EmailChangeService::confirm_change(
        db.get_ref(),
        state.get_ref(),
        auth_user.account_id,
        &path,
    )
    .await?;

    Ok(HttpResponse::Ok().json(AccountResponse::from(account)))
}

pub fn email_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(email_change).service(email_change_verification);
}
