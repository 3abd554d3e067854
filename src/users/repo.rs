use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

/// A row of the `users` table. `id` and `created_at` are assigned by the
/// database and never change; `updated_at` stays NULL until the first update.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: Option<OffsetDateTime>,
}

/// Column-level changes for a partial update. `None` leaves the column
/// untouched; none of these columns is nullable, so COALESCE in the update
/// statement gives exact "absent means keep" semantics.
#[derive(Debug, Default, Clone)]
pub struct UserChanges {
    pub email: Option<String>,
    pub username: Option<String>,
    pub hashed_password: Option<String>,
    pub is_active: Option<bool>,
}

const USER_COLUMNS: &str = "id, email, username, hashed_password, is_active, created_at, updated_at";

impl User {
    /// Find a user by primary key.
    pub async fn find_by_id(db: &PgPool, id: i64) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
    }

    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await
    }

    /// Find a user by username.
    pub async fn find_by_username(db: &PgPool, username: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(db)
        .await
    }

    /// List users in insertion order with OFFSET/LIMIT pagination. Bounds are
    /// passed through to Postgres unvalidated.
    pub async fn list(db: &PgPool, skip: i64, limit: i64) -> sqlx::Result<Vec<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(skip)
        .fetch_all(db)
        .await
    }

    /// Insert a new user and return the stored row with generated id and
    /// timestamps.
    pub async fn insert(
        db: &PgPool,
        email: &str,
        username: &str,
        hashed_password: &str,
    ) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, username, hashed_password)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(email)
        .bind(username)
        .bind(hashed_password)
        .fetch_one(db)
        .await
    }

    /// Apply a partial update and refresh `updated_at`. Returns `None` when
    /// no row matches `id`.
    pub async fn update(db: &PgPool, id: i64, changes: &UserChanges) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                email           = COALESCE($2, email),
                username        = COALESCE($3, username),
                hashed_password = COALESCE($4, hashed_password),
                is_active       = COALESCE($5, is_active),
                updated_at      = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.email.as_deref())
        .bind(changes.username.as_deref())
        .bind(changes.hashed_password.as_deref())
        .bind(changes.is_active)
        .fetch_optional(db)
        .await
    }

    /// Hard delete. Returns the number of rows removed (0 or 1).
    pub async fn delete(db: &PgPool, id: i64) -> sqlx::Result<u64> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn serialization_skips_the_password_hash() {
        let user = User {
            id: 1,
            email: "test@example.com".into(),
            username: "tester".into(),
            hashed_password: "$argon2id$secret".into(),
            is_active: true,
            created_at: datetime!(2024-01-01 00:00:00 UTC),
            updated_at: None,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("test@example.com"));
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("hashed_password"));
    }

    #[test]
    fn default_changes_touch_nothing() {
        let changes = UserChanges::default();
        assert!(changes.email.is_none());
        assert!(changes.username.is_none());
        assert!(changes.hashed_password.is_none());
        assert!(changes.is_active.is_none());
    }
}
