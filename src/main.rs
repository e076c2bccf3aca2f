mod config;
mod db;
mod error;
mod middleware;
mod models;
mod routes;
mod services;
mod state;
mod utils;
#[cfg(test)]
mod testing;

use actix_web::{middleware::Logger, web, App, HttpServer};
use chrono::Utc;

use crate::config::AppConfig;
use crate::services::account_service::AccountService;
use crate::state::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "canvas_accounts=info,actix_web=info".into()),
        )
        .init();

    let config = AppConfig::from_env().map_err(std::io::Error::other)?;

    tracing::info!("Connecting to database...");
    let db = db::establish_connection(&config.database_url)
        .await
        .map_err(std::io::Error::other)?;
    db::create_schema(&db).await.map_err(std::io::Error::other)?;
    tracing::info!("Database connected");

    // Les comptes jamais activés dont le lien a expiré
    let cutoff = Utc::now() - config.signup_max_age;
    match AccountService::purge_stale_signups(&db, cutoff).await {
        Ok(purged) => tracing::info!(purged, "purged stale signups"),
        Err(e) => tracing::warn!(error = %e, "failed to purge stale signups"),
    }

    let bind_addr = config.bind_addr.clone();
    tracing::info!(
        bind_addr = %bind_addr,
        algorithm = ?config.signing.algorithm(),
        "Starting server"
    );

    let state = web::Data::new(AppState::from_config(config));
    let db = web::Data::new(db);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(db.clone())
            .app_data(state.clone())
            .configure(routes::configure_routes)
    })
        .bind(bind_addr)?
        .run()
        .await
}
