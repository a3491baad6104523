use serde::Serialize;
use sqlx::PgPool;

use crate::error::AppError;

#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct Position {
    pub id: i64,
    pub code: String,
    pub name: String,
    /// Owning user. Null once the owner is deleted.
    pub user_id: Option<i64>,
}

pub async fn insert_position(
    pool: &PgPool,
    code: &str,
    name: &str,
    user_id: Option<i64>,
) -> Result<Position, AppError> {
    let position = sqlx::query_as::<_, Position>(
        r#"
        INSERT INTO positions (code, name, user_id)
        VALUES ($1, $2, $3)
        RETURNING id, code, name, user_id
        "#,
    )
    .bind(code)
    .bind(name)
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(position)
}

pub async fn list_positions(pool: &PgPool) -> Result<Vec<Position>, AppError> {
    let positions =
        sqlx::query_as::<_, Position>("SELECT id, code, name, user_id FROM positions ORDER BY id")
            .fetch_all(pool)
            .await?;
    Ok(positions)
}

pub async fn find_position(pool: &PgPool, id: i64) -> Result<Option<Position>, AppError> {
    let position =
        sqlx::query_as::<_, Position>("SELECT id, code, name, user_id FROM positions WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
    Ok(position)
}

/// Partial update of code and/or name. `None` when the position does not exist.
pub async fn update_position(
    pool: &PgPool,
    id: i64,
    code: Option<&str>,
    name: Option<&str>,
) -> Result<Option<Position>, AppError> {
    let position = sqlx::query_as::<_, Position>(
        r#"
        UPDATE positions SET
            code = COALESCE($2, code),
            name = COALESCE($3, name)
        WHERE id = $1
        RETURNING id, code, name, user_id
        "#,
    )
    .bind(id)
    .bind(code)
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(position)
}

pub async fn delete_position(pool: &PgPool, id: i64) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM positions WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
