/// JWT Token Generation and Validation
///
/// Access and refresh tokens are signed with separate secrets, so a token of
/// one kind never validates as the other.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Serialize};

use crate::auth::claims::{AccessClaims, RefreshClaims};
use crate::configuration::JwtSettings;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    fn secret<'a>(&self, config: &'a JwtSettings) -> &'a str {
        match self {
            TokenKind::Access => &config.access_secret,
            TokenKind::Refresh => &config.refresh_secret,
        }
    }
}

fn sign<C: Serialize>(claims: &C, kind: TokenKind, config: &JwtSettings) -> Result<String, AppError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(kind.secret(config).as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Checks signature, expiry and issuer. The caller decides how to surface the
/// failure; the jsonwebtoken error is only ever logged.
fn verify<C: DeserializeOwned>(
    token: &str,
    kind: TokenKind,
    config: &JwtSettings,
) -> Result<C, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.issuer]);

    decode::<C>(
        token,
        &DecodingKey::from_secret(kind.secret(config).as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
}

/// Generate a new access token for a user
pub fn generate_access_token(
    user_id: i64,
    email: &str,
    config: &JwtSettings,
) -> Result<String, AppError> {
    let claims = AccessClaims::new(
        user_id,
        email.to_string(),
        config.access_token_expiry,
        config.issuer.clone(),
    );
    sign(&claims, TokenKind::Access, config)
}

/// Generate a new refresh token for a user
pub fn generate_refresh_token(user_id: i64, config: &JwtSettings) -> Result<String, AppError> {
    let claims = RefreshClaims::new(user_id, config.refresh_token_expiry, config.issuer.clone());
    sign(&claims, TokenKind::Refresh, config)
}

pub fn validate_access_token(
    token: &str,
    config: &JwtSettings,
) -> Result<AccessClaims, jsonwebtoken::errors::Error> {
    verify(token, TokenKind::Access, config)
}

pub fn validate_refresh_token(
    token: &str,
    config: &JwtSettings,
) -> Result<RefreshClaims, jsonwebtoken::errors::Error> {
    verify(token, TokenKind::Refresh, config)
}
