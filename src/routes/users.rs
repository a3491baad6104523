/// User Routes
///
/// Listing, lookup and modification require an access token; creation is open.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;

use crate::auth::TokenService;
use crate::error::{AppError, ErrorContext};
use crate::middleware::AuthenticatedUser;
use crate::routes::auth::{create_account, MessageResponse, RegisterRequest};
use crate::store::users::{self, UserChanges};
use crate::validators::{
    is_valid_email, is_valid_gender, is_valid_password, is_valid_role, is_valid_username,
};

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub gender: Option<String>,
}

/// GET /users
pub async fn list_users(pool: web::Data<PgPool>) -> Result<HttpResponse, AppError> {
    let users = users::list_users(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(users))
}

/// GET /users/{id}
pub async fn get_user(
    path: web::Path<i64>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let user = users::find_by_id(pool.get_ref(), id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User with ID {} not found", id)))?;

    Ok(HttpResponse::Ok().json(user.summary()))
}

/// POST /users
///
/// Same validation and hashing as registration; returns the bare user.
pub async fn create_user(
    form: web::Json<RegisterRequest>,
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
) -> Result<HttpResponse, AppError> {
    let user = create_account(pool.get_ref(), tokens.get_ref(), &form).await?;
    tracing::info!(user_id = user.id, "User created");
    Ok(HttpResponse::Ok().json(user))
}

/// PUT /users/{id}
///
/// Partial update. Only fields present in the body change; a new password is
/// hashed before it is stored.
///
/// # Errors
/// - 404: Unknown id
/// - 409: New username or email already taken
pub async fn update_user(
    path: web::Path<i64>,
    form: web::Json<UpdateUserRequest>,
    identity: web::ReqData<AuthenticatedUser>,
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let context = ErrorContext::new("user_update").with_user_id(identity.user_id);
    let form = form.into_inner();

    let password_hash = match form.password.as_deref() {
        Some(password) => {
            is_valid_password(password)?;
            Some(tokens.hasher().hash(password).await?)
        }
        None => None,
    };

    let changes = UserChanges {
        username: form.username.as_deref().map(is_valid_username).transpose()?,
        email: form.email.as_deref().map(is_valid_email).transpose()?,
        password_hash,
        role: match form.role.as_deref() {
            Some(role) => Some(is_valid_role(Some(role))?.as_str().to_string()),
            None => None,
        },
        gender: match form.gender.as_deref() {
            Some(gender) => Some(is_valid_gender(Some(gender))?),
            None => None,
        },
    };

    let user = users::update_user(pool.get_ref(), id, changes)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User with ID {} not found", id)))?;

    tracing::info!(
        request_id = %context.request_id,
        actor = ?context.user_id,
        user_id = id,
        "User updated"
    );

    Ok(HttpResponse::Ok().json(user))
}

/// DELETE /users/{id}
pub async fn delete_user(
    path: web::Path<i64>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    if !users::delete_user(pool.get_ref(), id).await? {
        return Err(AppError::not_found(format!("User with ID {} not found", id)));
    }

    tracing::info!(user_id = id, "User deleted");
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "User deleted",
    }))
}
