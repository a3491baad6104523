use actix_web::HttpResponse;
use actix_web::web;
use sqlx::PgPool;

use crate::error::AppError;

/// Liveness plus a round trip to the database.
pub async fn health_check(pool: web::Data<PgPool>) -> Result<HttpResponse, AppError> {
    sqlx::query("SELECT 1").execute(pool.get_ref()).await?;
    tracing::debug!("Health check endpoint called");
    Ok(HttpResponse::Ok().body("OK"))
}
