/// Authentication Routes
///
/// Registration, login, token refresh, logout and current user information.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::auth::TokenService;
use crate::error::{AppError, AuthError, ErrorContext};
use crate::middleware::{AuthenticatedUser, PresentedRefreshToken};
use crate::store::users::{self, NewUser, User, UserSummary};
use crate::validators::{
    is_valid_email, is_valid_gender, is_valid_password, is_valid_role, is_valid_username,
    MAX_PASSWORD_BYTES,
};

/// User registration request
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Option<String>,
    pub gender: Option<String>,
}

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user: UserSummary,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub user: UserSummary,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub id: i64,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Validate and persist a new account. Shared with `POST /users`.
pub(crate) async fn create_account(
    pool: &PgPool,
    tokens: &TokenService,
    form: &RegisterRequest,
) -> Result<UserSummary, AppError> {
    let username = is_valid_username(&form.username)?;
    let email = is_valid_email(&form.email)?;
    is_valid_password(&form.password)?;
    let role = is_valid_role(form.role.as_deref())?;
    let gender = is_valid_gender(form.gender.as_deref())?;

    let password_hash = tokens.hasher().hash(&form.password).await?;

    users::insert_user(
        pool,
        NewUser {
            username: &username,
            email: &email,
            password_hash: &password_hash,
            role: role.as_str(),
            gender: &gender,
        },
    )
    .await
}

/// POST /auth/register
///
/// # Errors
/// - 400: Validation errors
/// - 409: Username or email already taken
pub async fn register(
    form: web::Json<RegisterRequest>,
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_registration");

    let user = create_account(pool.get_ref(), tokens.get_ref(), &form).await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = user.id,
        "User registered successfully"
    );

    Ok(HttpResponse::Ok().json(RegisterResponse {
        message: "User registered successfully!",
        user,
    }))
}

/// POST /auth/login
///
/// Verifies the password, issues a token pair and stores the refresh token
/// hash, replacing any earlier session.
///
/// # Errors
/// - 401: Unknown username or wrong password (same response for both)
pub async fn login(
    form: web::Json<LoginRequest>,
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");

    // bcrypt ignores bytes past the limit; such a password can never be the stored one
    if form.password.len() > MAX_PASSWORD_BYTES {
        return Err(AuthError::InvalidCredentials.into());
    }

    let user = users::find_by_username(pool.get_ref(), form.username.trim())
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if !tokens.hasher().verify(&form.password, &user.password_hash).await? {
        return Err(AuthError::InvalidCredentials.into());
    }

    let pair = tokens.issue_token_pair(user.id, &user.email)?;
    tokens
        .complete_login(pool.get_ref(), user.id, &pair.refresh_token)
        .await?;

    let context = context.with_user_id(user.id);
    tracing::info!(
        request_id = %context.request_id,
        user_id = ?context.user_id,
        "User logged in successfully"
    );

    Ok(HttpResponse::Ok().json(LoginResponse {
        message: "Login successful!",
        user: user.summary(),
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        token_type: "Bearer",
        expires_in: tokens.settings().access_token_expiry,
    }))
}

/// POST /auth/refresh
///
/// **Requires the refresh guard**, which has already matched the presented
/// token against the stored hash. Rotation consumes that token: replaying it
/// afterwards fails.
///
/// # Errors
/// - 401: Any refresh token check failed
pub async fn refresh(
    user: web::ReqData<User>,
    presented: web::ReqData<PresentedRefreshToken>,
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh").with_user_id(user.id);

    let pair = tokens
        .rotate_refresh_token(pool.get_ref(), user.id, &presented.0)
        .await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = user.id,
        "Token refreshed successfully"
    );

    Ok(HttpResponse::Ok().json(RefreshResponse {
        id: user.id,
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        token_type: "Bearer",
        expires_in: tokens.settings().access_token_expiry,
    }))
}

/// POST /auth/logout
///
/// **Requires a valid access token.** Clears the stored refresh token hash.
pub async fn logout(
    identity: web::ReqData<AuthenticatedUser>,
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
) -> Result<HttpResponse, AppError> {
    tokens.logout(pool.get_ref(), identity.user_id).await?;

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Logged out successfully",
    }))
}

/// GET /auth/me
///
/// **Requires a valid access token.**
///
/// # Errors
/// - 404: The user was deleted after the token was issued
pub async fn get_current_user(
    identity: web::ReqData<AuthenticatedUser>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user = users::find_by_id(pool.get_ref(), identity.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(HttpResponse::Ok().json(user.summary()))
}
