use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{AuthService, TokenIssuer};
use crate::configuration::{JwtSettings, PasswordSettings};
use crate::error::{AppError, ValidationError};
use crate::middleware::{AdminMiddleware, JwtMiddleware, RequestLogger};
use crate::routes::{get_current_user, get_user, health_check, login, refresh, register};
use crate::store::{RefreshTokenStore, UserStore};

pub fn run(
    listener: TcpListener,
    users: Arc<dyn UserStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    jwt_config: JwtSettings,
    password_config: PasswordSettings,
) -> Result<Server, std::io::Error> {
    let issuer = TokenIssuer::new(&jwt_config);
    let auth_service = AuthService::new(
        users.clone(),
        refresh_tokens,
        issuer.clone(),
        password_config.hash_cost,
    )
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
    let auth_service = web::Data::new(auth_service);
    let user_store: web::Data<dyn UserStore> = web::Data::from(users.clone());

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(RequestLogger)

            // Shared state
            .app_data(json_config())
            .app_data(path_config())
            .app_data(auth_service.clone())
            .app_data(user_store.clone())

            // Public routes (no authentication required)
            .route("/health_check", web::get().to(health_check))
            .route("/auth/register", web::post().to(register))
            .route("/auth/login", web::post().to(login))
            .route("/auth/refresh", web::post().to(refresh))

            // Protected routes (require JWT authentication)
            .service(
                web::scope("/api")
                    .wrap(JwtMiddleware::new(issuer.clone(), users.clone()))
                    .route("/me", web::get().to(get_current_user)),
            )

            // Admin routes; the last `wrap` runs first, so JWT precedes the gate
            .service(
                web::scope("/admin")
                    .wrap(AdminMiddleware)
                    .wrap(JwtMiddleware::new(issuer.clone(), users.clone()))
                    .route("/users/{id}", web::get().to(get_user)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}

/// Malformed JSON bodies become 400 validation errors in the usual error shape
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        AppError::Validation(ValidationError::MalformedBody(err.to_string())).into()
    })
}

/// Unparseable path segments (non-numeric ids) are 400s, not actix's plain 404
fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req| {
        tracing::debug!(error = %err, "Rejected path parameter");
        AppError::Validation(ValidationError::InvalidFormat("id".to_string())).into()
    })
}
