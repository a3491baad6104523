/// Input validators for accounts and positions
/// Features:
/// 1. DoS Protection: Input length limits
/// 2. Email format validation
/// 3. Control character rejection
/// 4. Role whitelisting

use regex::Regex;
use lazy_static::lazy_static;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 5;
const MIN_USERNAME_LENGTH: usize = 3;
const MAX_USERNAME_LENGTH: usize = 64;
/// bcrypt only reads the first 72 bytes
pub const MAX_PASSWORD_BYTES: usize = 72;
const MAX_GENDER_LENGTH: usize = 32;
const MAX_POSITION_CODE_LENGTH: usize = 32;
const MAX_POSITION_NAME_LENGTH: usize = 128;

pub const DEFAULT_GENDER: &str = "unspecified";

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();

    static ref USERNAME_REGEX: Regex = Regex::new(r"^[a-zA-Z0-9._-]+$").unwrap();
}

/// Account role. Stored as lowercase text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

/// Validates email address
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }

    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email".to_string(), MIN_EMAIL_LENGTH));
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH));
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    if has_suspicious_email_patterns(trimmed) {
        return Err(ValidationError::SuspiciousContent("email".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Validates a login name: letters, digits, `.`, `_` and `-`
pub fn is_valid_username(username: &str) -> Result<String, ValidationError> {
    let trimmed = username.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("username".to_string()));
    }

    if trimmed.len() < MIN_USERNAME_LENGTH {
        return Err(ValidationError::TooShort("username".to_string(), MIN_USERNAME_LENGTH));
    }

    if trimmed.len() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::TooLong("username".to_string(), MAX_USERNAME_LENGTH));
    }

    if !USERNAME_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("username".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Passwords are not trimmed; only emptiness and the bcrypt input limit are enforced.
pub fn is_valid_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password".to_string()));
    }

    if password.len() > MAX_PASSWORD_BYTES {
        return Err(ValidationError::TooLong("password".to_string(), MAX_PASSWORD_BYTES));
    }

    Ok(())
}

pub fn is_valid_role(role: Option<&str>) -> Result<Role, ValidationError> {
    match role.map(|r| r.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") | Some("user") => Ok(Role::User),
        Some("admin") => Ok(Role::Admin),
        Some(_) => Err(ValidationError::InvalidFormat("role".to_string())),
    }
}

pub fn is_valid_gender(gender: Option<&str>) -> Result<String, ValidationError> {
    let trimmed = gender.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Ok(DEFAULT_GENDER.to_string());
    }
    free_text("gender", trimmed, MAX_GENDER_LENGTH)
}

pub fn is_valid_position_code(code: &str) -> Result<String, ValidationError> {
    free_text("code", code.trim(), MAX_POSITION_CODE_LENGTH)
}

pub fn is_valid_position_name(name: &str) -> Result<String, ValidationError> {
    free_text("name", name.trim(), MAX_POSITION_NAME_LENGTH)
}

fn free_text(field: &str, value: &str, max: usize) -> Result<String, ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::EmptyField(field.to_string()));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong(field.to_string(), max));
    }

    if value.chars().any(|c| c.is_control()) {
        return Err(ValidationError::SuspiciousContent(field.to_string()));
    }

    Ok(value.to_string())
}

/// Detects suspicious patterns in email addresses
fn has_suspicious_email_patterns(email: &str) -> bool {
    // Local part longer than RFC 5321 allows
    if let Some(at_pos) = email.find('@') {
        if email[..at_pos].len() > 64 {
            return true;
        }
    }

    if email.matches('@').count() != 1 {
        return true;
    }

    email.contains('\0')
}
