pub mod health;
pub mod users;
pub mod email;

use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(health::health_check)
            .service(
                web::scope("/users")
                    .configure(users::users_routes)
                    .configure(email::email_routes)
            )
    );
}
