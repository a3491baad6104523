/// Password Hashing and Verification
///
/// bcrypt is deliberately slow, so every call is moved off the async worker
/// threads with `spawn_blocking`.

use bcrypt::{hash, verify};

use crate::error::AppError;

#[derive(Debug, Clone, Copy)]
pub struct SecretHasher {
    cost: u32,
}

impl SecretHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash a secret using bcrypt
    ///
    /// # Errors
    /// Returns error if the cost is out of range or the blocking task fails
    pub async fn hash(&self, secret: &str) -> Result<String, AppError> {
        let secret = secret.to_owned();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || hash(secret, cost))
            .await
            .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    }

    /// Verify a secret against its bcrypt hash
    ///
    /// A malformed stored hash counts as a mismatch; it is logged, not surfaced.
    pub async fn verify(&self, secret: &str, hashed: &str) -> Result<bool, AppError> {
        let secret = secret.to_owned();
        let hashed = hashed.to_owned();
        let outcome = tokio::task::spawn_blocking(move || verify(secret, &hashed))
            .await
            .map_err(|e| AppError::Internal(format!("Verification task failed: {}", e)))?;

        match outcome {
            Ok(matches) => Ok(matches),
            Err(e) => {
                tracing::error!("Stored hash could not be parsed: {}", e);
                Ok(false)
            }
        }
    }
}
