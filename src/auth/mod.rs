/// Authentication module
///
/// Handles JWT access/refresh token issuance and validation, bcrypt hashing
/// of passwords and refresh tokens, and refresh token rotation.

pub mod jwt;
mod password;
mod claims;
mod refresh_token;

pub use password::SecretHasher;
pub use claims::{AccessClaims, RefreshClaims, TokenClaims};
pub use refresh_token::{RefreshRejection, TokenPair, TokenService};
