/// User persistence
///
/// Plain parameterized queries against the `users` table. Password and refresh
/// token columns only ever hold bcrypt hashes.

use serde::Serialize;
use sqlx::PgPool;
use std::fmt;

use crate::error::AppError;

/// Full user row, including credential hashes. Never serialized.
#[derive(sqlx::FromRow, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub gender: String,
    pub hashed_refresh_token: Option<String>,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role.clone(),
            gender: self.gender.clone(),
        }
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("gender", &self.gender)
            .field("password_hash", &"[REDACTED]")
            .field(
                "hashed_refresh_token",
                &self.hashed_refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Public projection of a user
#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
    pub gender: String,
}

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: &'a str,
    pub gender: &'a str,
}

/// Partial update. `None` leaves the column unchanged.
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<String>,
    pub gender: Option<String>,
}

/// Insert a user. Duplicate username or email surfaces as a conflict through
/// the unique constraints.
pub async fn insert_user(pool: &PgPool, user: NewUser<'_>) -> Result<UserSummary, AppError> {
    let created = sqlx::query_as::<_, UserSummary>(
        r#"
        INSERT INTO users (username, email, password_hash, role, gender)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, username, email, role, gender
        "#,
    )
    .bind(user.username)
    .bind(user.email)
    .bind(user.password_hash)
    .bind(user.role)
    .bind(user.gender)
    .fetch_one(pool)
    .await?;

    Ok(created)
}

pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn list_users(pool: &PgPool) -> Result<Vec<UserSummary>, AppError> {
    let users = sqlx::query_as::<_, UserSummary>(
        "SELECT id, username, email, role, gender FROM users ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    Ok(users)
}

/// Returns `None` when no user has this id
pub async fn update_user(
    pool: &PgPool,
    id: i64,
    changes: UserChanges,
) -> Result<Option<UserSummary>, AppError> {
    let updated = sqlx::query_as::<_, UserSummary>(
        r#"
        UPDATE users SET
            username = COALESCE($2, username),
            email = COALESCE($3, email),
            password_hash = COALESCE($4, password_hash),
            role = COALESCE($5, role),
            gender = COALESCE($6, gender)
        WHERE id = $1
        RETURNING id, username, email, role, gender
        "#,
    )
    .bind(id)
    .bind(changes.username)
    .bind(changes.email)
    .bind(changes.password_hash)
    .bind(changes.role)
    .bind(changes.gender)
    .fetch_optional(pool)
    .await?;

    Ok(updated)
}

/// Returns `false` when no user has this id
pub async fn delete_user(pool: &PgPool, id: i64) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Overwrite the stored refresh token hash. `None` ends the session.
pub async fn set_refresh_token_hash(
    pool: &PgPool,
    id: i64,
    hash: Option<&str>,
) -> Result<(), AppError> {
    sqlx::query("UPDATE users SET hashed_refresh_token = $2 WHERE id = $1")
        .bind(id)
        .bind(hash)
        .execute(pool)
        .await?;
    Ok(())
}

/// Replace the stored refresh token hash only if it still equals `expected`.
///
/// Returns `false` when another request replaced or cleared it first.
pub async fn swap_refresh_token_hash(
    pool: &PgPool,
    id: i64,
    expected: &str,
    replacement: &str,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET hashed_refresh_token = $3
        WHERE id = $1 AND hashed_refresh_token = $2
        "#,
    )
    .bind(id)
    .bind(expected)
    .bind(replacement)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}
