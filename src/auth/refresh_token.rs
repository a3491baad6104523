/// Refresh Token Rotation
///
/// Issues access/refresh pairs and keeps exactly one live refresh token per
/// user. Refresh tokens are:
/// - Signed JWTs carrying only the subject
/// - Stored as `bcrypt(sha256_hex(token))`, never in plaintext
/// - Single-use: rotation swaps the stored hash with a conditional update
/// - Revoked by clearing the stored hash (logout)

use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use std::fmt;

use crate::auth::claims::TokenClaims;
use crate::auth::jwt::{generate_access_token, generate_refresh_token, validate_refresh_token};
use crate::auth::password::SecretHasher;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};
use crate::store::users::{self, User};

/// Freshly issued credentials
#[derive(Serialize, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Why a refresh token was refused. Logged, never sent to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshRejection {
    BadSignature,
    SubjectMismatch,
    NoActiveSession,
    HashMismatch,
    Superseded,
}

impl fmt::Display for RefreshRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshRejection::BadSignature => write!(f, "invalid signature or expired"),
            RefreshRejection::SubjectMismatch => write!(f, "token belongs to another user"),
            RefreshRejection::NoActiveSession => write!(f, "user has no active session"),
            RefreshRejection::HashMismatch => write!(f, "token does not match stored hash"),
            RefreshRejection::Superseded => write!(f, "token consumed by a concurrent refresh"),
        }
    }
}

enum RefreshFailure {
    Rejected(RefreshRejection),
    Failed(AppError),
}

impl From<AppError> for RefreshFailure {
    fn from(err: AppError) -> Self {
        RefreshFailure::Failed(err)
    }
}

impl From<RefreshRejection> for RefreshFailure {
    fn from(reason: RefreshRejection) -> Self {
        RefreshFailure::Rejected(reason)
    }
}

/// Collapse every rejection into the single generic refresh denial.
fn collapse<T>(user_id: i64, outcome: Result<T, RefreshFailure>) -> Result<T, AppError> {
    match outcome {
        Ok(value) => Ok(value),
        Err(RefreshFailure::Rejected(reason)) => {
            tracing::warn!(user_id = user_id, reason = %reason, "Refresh token rejected");
            Err(AppError::Auth(AuthError::CannotRefresh))
        }
        Err(RefreshFailure::Failed(err)) => Err(err),
    }
}

/// Reduce a refresh token to a fixed 64-byte input, below bcrypt's 72-byte
/// limit, so every byte of the JWT participates in the comparison.
fn prehash(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Clone)]
pub struct TokenService {
    jwt: JwtSettings,
    hasher: SecretHasher,
}

impl TokenService {
    pub fn new(jwt: JwtSettings, hasher: SecretHasher) -> Self {
        Self { jwt, hasher }
    }

    pub fn settings(&self) -> &JwtSettings {
        &self.jwt
    }

    pub fn hasher(&self) -> &SecretHasher {
        &self.hasher
    }

    /// Sign a new access/refresh pair. No side effects.
    pub fn issue_token_pair(&self, user_id: i64, email: &str) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access_token: generate_access_token(user_id, email, &self.jwt)?,
            refresh_token: generate_refresh_token(user_id, &self.jwt)?,
        })
    }

    pub async fn hash_refresh_token(&self, refresh_token: &str) -> Result<String, AppError> {
        self.hasher.hash(&prehash(refresh_token)).await
    }

    async fn matches_stored_hash(&self, refresh_token: &str, stored: &str) -> Result<bool, AppError> {
        self.hasher.verify(&prehash(refresh_token), stored).await
    }

    /// Store the hash of `refresh_token`, overwriting any previous session.
    pub async fn complete_login(
        &self,
        pool: &PgPool,
        user_id: i64,
        refresh_token: &str,
    ) -> Result<(), AppError> {
        let hash = self.hash_refresh_token(refresh_token).await?;
        users::set_refresh_token_hash(pool, user_id, Some(&hash)).await?;

        tracing::debug!(user_id = user_id, "Refresh token stored");
        Ok(())
    }

    /// Consume `presented` and return a new pair.
    ///
    /// Checks run in order and the first failure is final: signature and
    /// expiry, subject, active session, stored hash, then an atomic swap of
    /// the stored hash. Check failures all become `AuthError::CannotRefresh`.
    pub async fn rotate_refresh_token(
        &self,
        pool: &PgPool,
        user_id: i64,
        presented: &str,
    ) -> Result<TokenPair, AppError> {
        collapse(user_id, self.try_rotate(pool, user_id, presented).await)
    }

    async fn try_rotate(
        &self,
        pool: &PgPool,
        user_id: i64,
        presented: &str,
    ) -> Result<TokenPair, RefreshFailure> {
        let claims = validate_refresh_token(presented, &self.jwt).map_err(|e| {
            tracing::debug!("Refresh token validation error: {}", e);
            RefreshRejection::BadSignature
        })?;

        if claims.user_id().ok() != Some(user_id) {
            return Err(RefreshRejection::SubjectMismatch.into());
        }

        let (user, observed) = self.load_matching_session(pool, user_id, presented).await?;

        let pair = self.issue_token_pair(user.id, &user.email)?;
        let replacement = self.hash_refresh_token(&pair.refresh_token).await?;

        if !users::swap_refresh_token_hash(pool, user.id, &observed, &replacement).await? {
            return Err(RefreshRejection::Superseded.into());
        }

        tracing::info!(user_id = user.id, "Refresh token rotated");
        Ok(pair)
    }

    /// Resolve the user whose stored hash matches `presented`.
    ///
    /// Assumes the signature was already checked.
    pub async fn verify_stored_refresh_token(
        &self,
        pool: &PgPool,
        user_id: i64,
        presented: &str,
    ) -> Result<User, AppError> {
        let outcome = self
            .load_matching_session(pool, user_id, presented)
            .await
            .map(|(user, _)| user);
        collapse(user_id, outcome)
    }

    /// Returns the user and the stored hash that matched.
    async fn load_matching_session(
        &self,
        pool: &PgPool,
        user_id: i64,
        presented: &str,
    ) -> Result<(User, String), RefreshFailure> {
        let user = users::find_by_id(pool, user_id)
            .await?
            .ok_or(RefreshRejection::NoActiveSession)?;

        let stored = user
            .hashed_refresh_token
            .clone()
            .ok_or(RefreshRejection::NoActiveSession)?;

        if !self.matches_stored_hash(presented, &stored).await? {
            return Err(RefreshRejection::HashMismatch.into());
        }

        Ok((user, stored))
    }

    /// Clear the stored hash. Every outstanding refresh token stops working.
    pub async fn logout(&self, pool: &PgPool, user_id: i64) -> Result<(), AppError> {
        users::set_refresh_token_hash(pool, user_id, None).await?;
        tracing::info!(user_id = user_id, "Refresh token cleared");
        Ok(())
    }
}
