//! Represents an account in `sys_users`.

use super::datetime_format;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// `user_type` value of an administrator.
pub const USER_TYPE_ADMIN: i64 = 1;
/// `user_type` value of a regular account.
pub const USER_TYPE_NORMAL: i64 = 9;

/// A user row. Deleted users stay in the table with `is_deleted = 1`.
#[derive(Clone, FromRow, Debug)]
pub struct User {
    pub user_id: i64,

    /// Unique login name.
    pub user_name: String,

    /// Optional unique email address.
    pub email: Option<String>,

    /// Argon2 PHC string.
    pub hashed_password: String,

    pub full_name: Option<String>,

    /// Disabled users cannot log in.
    pub is_active: bool,

    pub is_deleted: bool,

    /// 1 = administrator, 9 = normal user.
    pub user_type: i64,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.user_type == USER_TYPE_ADMIN
    }
}

/// Values for inserting a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub user_name: String,
    pub email: Option<String>,
    pub hashed_password: String,
    pub full_name: Option<String>,
    pub user_type: i64,
}

/// Column changes for an update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub hashed_password: Option<String>,
    pub is_active: Option<bool>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.full_name.is_none()
            && self.hashed_password.is_none()
            && self.is_active.is_none()
    }
}

/// Registration payload of `POST /users/add`.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserCreate {
    pub user_name: String,
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Payload of `PUT /users/update/{id}`. Absent fields stay unchanged.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
}

/// Public view of a user. Never includes the password hash.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserOut {
    pub user_id: i64,
    pub user_name: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub user_type: i64,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "datetime_format")]
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserOut {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            user_name: user.user_name,
            email: user.email,
            full_name: user.full_name,
            is_active: user.is_active,
            user_type: user.user_type,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}
