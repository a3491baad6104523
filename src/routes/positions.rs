/// Position Routes
///
/// Every position route requires an access token. The creator becomes the
/// owner of the position.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::{AppError, AuthError, ErrorContext, ValidationError};
use crate::middleware::AuthenticatedUser;
use crate::routes::auth::MessageResponse;
use crate::store::positions::{self, Position};
use crate::store::users;
use crate::validators::{is_valid_position_code, is_valid_position_name};

#[derive(Deserialize)]
pub struct CreatePositionRequest {
    #[serde(alias = "position_code")]
    pub code: String,
    #[serde(alias = "position_name")]
    pub name: String,
}

#[derive(Deserialize)]
pub struct UpdatePositionRequest {
    #[serde(alias = "position_code")]
    pub code: Option<String>,
    #[serde(alias = "position_name")]
    pub name: Option<String>,
}

#[derive(Serialize)]
pub struct UpdatePositionResponse {
    pub message: &'static str,
    pub position: Position,
}

fn position_not_found(id: i64) -> AppError {
    AppError::not_found(format!("Position with ID {} not found", id))
}

/// GET /positions
pub async fn list_positions(pool: web::Data<PgPool>) -> Result<HttpResponse, AppError> {
    let positions = positions::list_positions(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(positions))
}

/// GET /positions/{id}
pub async fn get_position(
    path: web::Path<i64>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let position = positions::find_position(pool.get_ref(), id)
        .await?
        .ok_or_else(|| position_not_found(id))?;

    Ok(HttpResponse::Ok().json(position))
}

/// POST /positions
///
/// # Errors
/// - 400: Invalid code or name
/// - 401: The token's user no longer exists
pub async fn create_position(
    form: web::Json<CreatePositionRequest>,
    identity: web::ReqData<AuthenticatedUser>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("position_creation").with_user_id(identity.user_id);

    let code = is_valid_position_code(&form.code)?;
    let name = is_valid_position_name(&form.name)?;

    // Access tokens outlive account deletion
    if users::find_by_id(pool.get_ref(), identity.user_id).await?.is_none() {
        tracing::warn!(user_id = identity.user_id, "Position creation by deleted user");
        return Err(AuthError::Unauthorized.into());
    }

    let position =
        positions::insert_position(pool.get_ref(), &code, &name, context.user_id).await?;

    tracing::info!(
        request_id = %context.request_id,
        position_id = position.id,
        user_id = identity.user_id,
        "Position created"
    );

    Ok(HttpResponse::Ok().json(position))
}

/// PUT /positions/{id}
///
/// # Errors
/// - 400: Neither code nor name given, or either is invalid
/// - 404: Unknown id
pub async fn update_position(
    path: web::Path<i64>,
    form: web::Json<UpdatePositionRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    if form.code.is_none() && form.name.is_none() {
        return Err(ValidationError::EmptyField("code or name".to_string()).into());
    }

    let code = form.code.as_deref().map(is_valid_position_code).transpose()?;
    let name = form.name.as_deref().map(is_valid_position_name).transpose()?;

    let position =
        positions::update_position(pool.get_ref(), id, code.as_deref(), name.as_deref())
            .await?
            .ok_or_else(|| position_not_found(id))?;

    Ok(HttpResponse::Ok().json(UpdatePositionResponse {
        message: "Position updated successfully",
        position,
    }))
}

/// DELETE /positions/{id}
///
/// # Errors
/// - 404: Unknown id; deleting twice is not a silent success
pub async fn delete_position(
    path: web::Path<i64>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    if !positions::delete_position(pool.get_ref(), id).await? {
        return Err(position_not_found(id));
    }

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Position deleted successfully.",
    }))
}
