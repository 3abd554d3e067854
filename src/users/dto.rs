use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo::User;

/// Request body for creating a user. All fields are required.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// Request body for a partial update. Absent fields are left untouched.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateUserRequest {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.username.is_none()
            && self.password.is_none()
            && self.is_active.is_none()
    }
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            is_active: user.is_active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

fn default_skip() -> i64 {
    0
}

fn default_limit() -> i64 {
    100
}

/// Query parameters for the list endpoint.
#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    #[serde(default = "default_skip")]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn update_request_absent_fields_deserialize_to_none() {
        let req: UpdateUserRequest = serde_json::from_str(r#"{"username": "new_name"}"#).unwrap();
        assert_eq!(req.username.as_deref(), Some("new_name"));
        assert!(req.email.is_none());
        assert!(req.password.is_none());
        assert!(req.is_active.is_none());
        assert!(!req.is_empty());
    }

    #[test]
    fn empty_update_request_is_empty() {
        let req: UpdateUserRequest = serde_json::from_str("{}").unwrap();
        assert!(req.is_empty());
    }

    #[test]
    fn list_query_defaults() {
        let q: ListUsersQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.skip, 0);
        assert_eq!(q.limit, 100);
    }

    #[test]
    fn response_serializes_null_updated_at() {
        let response = UserResponse {
            id: 1,
            email: "test@example.com".into(),
            username: "tester".into(),
            is_active: true,
            created_at: datetime!(2024-01-01 00:00:00 UTC),
            updated_at: None,
        };
        let json: serde_json::Value = serde_json::to_value(&response).unwrap();
        assert_eq!(json["updated_at"], serde_json::Value::Null);
        assert_eq!(json["created_at"], "2024-01-01T00:00:00Z");
        assert_eq!(json["is_active"], true);
    }
}
