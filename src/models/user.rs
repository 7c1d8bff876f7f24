use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Account row; the password hash belongs to the auth layer and is never read here.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    #[serde(skip_serializing, default)]
    #[sqlx(default)]
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl User {
    pub fn new(user_id: impl Into<String>, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            password: String::new(),
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }
}
