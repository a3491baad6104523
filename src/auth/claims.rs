/// JWT Claims structures
///
/// Access tokens carry the subject and email. Refresh tokens carry only the
/// subject, since their sole job is to prove continued possession.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AuthError};

/// Shared view over both claim shapes
pub trait TokenClaims {
    fn subject(&self) -> &str;

    /// Extract the numeric user ID from `sub`
    ///
    /// # Errors
    /// A `sub` that is not an integer means the token was not issued by us.
    fn user_id(&self) -> Result<i64, AppError> {
        self.subject().parse::<i64>().map_err(|_| {
            tracing::warn!(subject = self.subject(), "Non-numeric subject in token");
            AppError::Auth(AuthError::Unauthorized)
        })
    }
}

/// JWT Claims for access tokens
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessClaims {
    /// Subject (user ID)
    pub sub: String,
    /// User email
    pub email: String,
    /// Unique token ID
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    pub iss: String,
}

impl AccessClaims {
    pub fn new(user_id: i64, email: String, expiry_seconds: i64, issuer: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            email,
            jti: uuid::Uuid::new_v4().to_string(),
            iat: now,
            exp: now + expiry_seconds,
            iss: issuer,
        }
    }
}

impl TokenClaims for AccessClaims {
    fn subject(&self) -> &str {
        &self.sub
    }
}

/// JWT Claims for refresh tokens
///
/// `jti` keeps two tokens issued to one user in the same second distinct.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshClaims {
    pub sub: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

impl RefreshClaims {
    pub fn new(user_id: i64, expiry_seconds: i64, issuer: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
            iat: now,
            exp: now + expiry_seconds,
            iss: issuer,
        }
    }
}

impl TokenClaims for RefreshClaims {
    fn subject(&self) -> &str {
        &self.sub
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_claims_creation() {
        let claims = AccessClaims::new(7, "test@example.com".to_string(), 3600, "test".to_string());

        assert_eq!(claims.sub, "7");
        assert_eq!(claims.email, "test@example.com");
        assert_eq!(claims.iss, "test");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_refresh_claims_have_no_email() {
        let claims = RefreshClaims::new(7, 60, "test".to_string());
        let json = serde_json::to_value(&claims).unwrap();

        assert!(json.get("email").is_none());
        assert_eq!(json["sub"], "7");
    }

    #[test]
    fn test_user_id_extraction() {
        let claims = RefreshClaims::new(42, 60, "test".to_string());
        assert_eq!(claims.user_id().unwrap(), 42);
    }

    #[test]
    fn test_invalid_user_id() {
        let mut claims = AccessClaims::new(1, "a@b.com".to_string(), 60, "test".to_string());
        claims.sub = "not-a-number".to_string();

        assert!(claims.user_id().is_err());
    }

    #[test]
    fn test_each_claim_set_gets_a_fresh_jti() {
        let first = RefreshClaims::new(1, 60, "test".to_string());
        let second = RefreshClaims::new(1, 60, "test".to_string());
        assert_ne!(first.jti, second.jti);
    }
}
