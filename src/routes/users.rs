use actix_web::{get, patch, post, web, HttpResponse};
use sea_orm::DatabaseConnection;

use crate::error::AccountError;
use crate::middleware::AuthUser;
use crate::models::dto::{
    AccountResponse, EmailSentResponse, LoginRequest, PasswordChangeRequest,
    PasswordResetConfirmRequest, PasswordResetRequest, ProfileUpdateRequest, SessionResponse,
    SignupRequest,
};
use crate::services::account_service::AccountService;
use crate::state::AppState;

/// POST /users/signup - Créer un compte inactif et envoyer le lien (PUBLIC)
#[post("/signup")]
pub async fn signup(
    body: web::Json<SignupRequest>,
    db: web::Data<DatabaseConnection>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AccountError> {
    AccountService::signup(db.get_ref(), state.get_ref(), body.into_inner()).await?;

    Ok(HttpResponse::Created().json(EmailSentResponse::new(
        "Check your inbox to confirm your email address",
    )))
}

/// GET /users/signup/verification/{token} - Activer le compte (PUBLIC)
#[get("/signup/verification/{token}")]
pub async fn signup_verification(
    path: web::Path<String>,
    db: web::Data<DatabaseConnection>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AccountError> {
    let account = AccountService::verify_signup(db.get_ref(), state.get_ref(), &path).await?;

    Ok(HttpResponse::Ok().json(AccountResponse::from(account)))
}

/// POST /users/login - Se connecter (PUBLIC)
#[post("/login")]
pub async fn login(
    body: web::Json<LoginRequest>,
    db: web::Data<DatabaseConnection>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AccountError> {
    let (token, account) =
        AccountService::login(db.get_ref(), state.get_ref(), body.into_inner()).await?;

    Ok(HttpResponse::Ok().json(SessionResponse {
        token,
        account: account.into(),
    }))
}

/// GET /users/profile - Compte connecté (PROTÉGÉE)
#[get("/profile")]
pub async fn profile(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AccountError> {
    let account = AccountService::get_account(db.get_ref(), auth_user.account_id).await?;

    Ok(HttpResponse::Ok().json(AccountResponse::from(account)))
}

/// PATCH /users/profile - Modifier le nom (PROTÉGÉE)
#[patch("/profile")]
pub async fn profile_change(
    auth_user: AuthUser,
    body: web::Json<ProfileUpdateRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AccountError> {
    let account =
        AccountService::update_profile(db.get_ref(), auth_user.account_id, body.into_inner())
            .await?;

    Ok(HttpResponse::Ok().json(AccountResponse::from(account)))
}

/// POST /users/password/change - Changer son mot de passe (PROTÉGÉE)
#[post("/password/change")]
pub async fn password_change(
    auth_user: AuthUser,
    body: web::Json<PasswordChangeRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AccountError> {
    AccountService::change_password(db.get_ref(), auth_user.account_id, body.into_inner()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Password changed successfully"
    })))
}

/// POST /users/password/reset - Demander un lien de reset (PUBLIC)
#[post("/password/reset")]
pub async fn password_reset(
    body: web::Json<PasswordResetRequest>,
    db: web::Data<DatabaseConnection>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AccountError> {
    AccountService::request_password_reset(db.get_ref(), state.get_ref(), body.into_inner())
        .await?;

    // Même réponse que l'email existe ou non
    Ok(HttpResponse::Ok().json(EmailSentResponse::new(
        "If an account uses this address, a reset link has been sent",
    )))
}

/// POST /users/password/reset/verification/{token} - Nouveau mot de passe (PUBLIC)
#[post("/password/reset/verification/{token}")]
pub async fn password_reset_confirm(
    path: web::Path<String>,
    body: web::Json<PasswordResetConfirmRequest>,
    db: web::Data<DatabaseConnection>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AccountError> {
    AccountService::confirm_password_reset(
        db.get_ref(),
        state.get_ref(),
        &path,
        body.into_inner(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Password has been reset"
    })))
}

pub fn users_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(signup)
        .service(signup_verification)
        .service(login)
        .service(profile)
        .service(profile_change)
        .service(password_change)
        .service(password_reset)
        .service(password_reset_confirm);
}
