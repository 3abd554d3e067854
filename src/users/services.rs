use lazy_static::lazy_static;
use regex::Regex;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::error::ApiError;

use super::dto::{CreateUserRequest, UpdateUserRequest};
use super::password::hash_password;
use super::repo::{User, UserChanges};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Translate a unique-constraint violation into `Conflict`. The service
/// pre-checks catch most duplicates, but a concurrent insert can race past
/// them; the table constraints are the backstop.
fn map_unique_violation(e: sqlx::Error, detail: &str) -> ApiError {
    let is_unique = e
        .as_database_error()
        .map(|d| d.is_unique_violation())
        .unwrap_or(false);
    if is_unique {
        warn!(error = %e, "unique constraint violated past pre-check");
        ApiError::Conflict(detail.to_string())
    } else {
        ApiError::Internal(e.into())
    }
}

pub async fn get_user_by_id(db: &PgPool, id: i64) -> Result<Option<User>, ApiError> {
    Ok(User::find_by_id(db, id).await?)
}

pub async fn get_user_by_email(db: &PgPool, email: &str) -> Result<Option<User>, ApiError> {
    Ok(User::find_by_email(db, email).await?)
}

pub async fn get_user_by_username(db: &PgPool, username: &str) -> Result<Option<User>, ApiError> {
    Ok(User::find_by_username(db, username).await?)
}

pub async fn get_users(db: &PgPool, skip: i64, limit: i64) -> Result<Vec<User>, ApiError> {
    Ok(User::list(db, skip, limit).await?)
}

/// Create a user. Email uniqueness is checked before username uniqueness,
/// so a request that collides on both reports the email conflict.
pub async fn create_user(db: &PgPool, input: &CreateUserRequest) -> Result<User, ApiError> {
    if User::find_by_email(db, &input.email).await?.is_some() {
        warn!(email = %input.email, "email already registered");
        return Err(ApiError::Conflict(
            "User with this email already exists".into(),
        ));
    }
    if User::find_by_username(db, &input.username).await?.is_some() {
        warn!(username = %input.username, "username already taken");
        return Err(ApiError::Conflict(
            "User with this username already exists".into(),
        ));
    }

    let hashed = hash_password(&input.password)?;
    let user = User::insert(db, &input.email, &input.username, &hashed)
        .await
        .map_err(|e| map_unique_violation(e, "User with this email or username already exists"))?;

    info!(user_id = user.id, email = %user.email, "user created");
    Ok(user)
}

/// Apply a partial update. Only fields present in the request change; a new
/// password is hashed before it is stored.
pub async fn update_user(
    db: &PgPool,
    id: i64,
    input: &UpdateUserRequest,
) -> Result<User, ApiError> {
    // An empty body mutates nothing, so `updated_at` stays as it was.
    if input.is_empty() {
        return User::find_by_id(db, id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".into()));
    }

    let changes = UserChanges {
        email: input.email.clone(),
        username: input.username.clone(),
        hashed_password: match &input.password {
            Some(plain) => Some(hash_password(plain)?),
            None => None,
        },
        is_active: input.is_active,
    };

    let user = User::update(db, id, &changes)
        .await
        .map_err(|e| map_unique_violation(e, "User with this email or username already exists"))?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    info!(user_id = user.id, "user updated");
    Ok(user)
}

pub async fn delete_user(db: &PgPool, id: i64) -> Result<(), ApiError> {
    let removed = User::delete(db, id).await?;
    if removed == 0 {
        return Err(ApiError::NotFound("User not found".into()));
    }
    info!(user_id = id, "user deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("first.last@sub.domain.org"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("spaces in@example.com"));
        assert!(!is_valid_email("missing-tld@example"));
        assert!(!is_valid_email(""));
    }
}
