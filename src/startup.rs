use actix_web::dev::Server;
use actix_web::{guard, middleware::DefaultHeaders, middleware::Logger, web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::net::TcpListener;
use std::time::Duration;

use crate::auth::{SecretHasher, TokenService};
use crate::configuration::{DatabaseSettings, Settings};
use crate::logger::LoggerMiddleware;
use crate::middleware::TokenGuard;
use crate::routes::{
    create_position, create_user, delete_position, delete_user, get_current_user, get_position,
    get_user, health_check, list_positions, list_users, login, logout, refresh, register,
    update_position, update_user,
};

/// Bounded pool; callers wait at most `acquire_timeout_seconds` for a connection.
pub fn pool_options(config: &DatabaseSettings) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
}

/// Connect eagerly so an unreachable database fails startup.
pub async fn get_connection_pool(config: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
    pool_options(config).connect_with(config.with_db()).await
}

pub fn token_service(settings: &Settings) -> TokenService {
    TokenService::new(
        settings.jwt.clone(),
        SecretHasher::new(settings.application.hash_cost),
    )
}

fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("X-Frame-Options", "DENY"))
        .add(("Referrer-Policy", "no-referrer"))
        .add(("Cache-Control", "no-store"))
}

pub fn run(
    listener: TcpListener,
    connection: PgPool,
    settings: &Settings,
) -> Result<Server, std::io::Error> {
    let connection = web::Data::new(connection);
    let tokens = token_service(settings);
    let tokens_data = web::Data::new(tokens.clone());

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(LoggerMiddleware)
            .wrap(Logger::default())
            .wrap(security_headers())

            // Shared state
            .app_data(connection.clone())
            .app_data(tokens_data.clone())

            // Public routes
            .route("/health_check", web::get().to(health_check))
            .route("/auth/register", web::post().to(register))
            .route("/auth/login", web::post().to(login))
            .service(
                web::resource("/users")
                    .guard(guard::Post())
                    .to(create_user),
            )

            // Refresh token routes
            .service(
                web::resource("/auth/refresh")
                    .wrap(TokenGuard::refresh(tokens.clone()))
                    .route(web::post().to(refresh)),
            )

            // Access token routes
            .service(
                web::resource("/auth/logout")
                    .wrap(TokenGuard::access(tokens.clone()))
                    .route(web::post().to(logout)),
            )
            .service(
                web::resource("/auth/me")
                    .wrap(TokenGuard::access(tokens.clone()))
                    .route(web::get().to(get_current_user)),
            )
            .service(
                web::scope("/users")
                    .wrap(TokenGuard::access(tokens.clone()))
                    .route("", web::get().to(list_users))
                    .route("/{id}", web::get().to(get_user))
                    .route("/{id}", web::put().to(update_user))
                    .route("/{id}", web::delete().to(delete_user)),
            )
            .service(
                web::scope("/positions")
                    .wrap(TokenGuard::access(tokens.clone()))
                    .route("", web::get().to(list_positions))
                    .route("", web::post().to(create_position))
                    .route("/{id}", web::get().to(get_position))
                    .route("/{id}", web::put().to(update_position))
                    .route("/{id}", web::delete().to(delete_position)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
