//! Field rules for user input.
//!
//! Each check returns the first violated rule as a `ValidationError`.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

pub const USER_NAME_MIN_LEN: usize = 3;
pub const USER_NAME_MAX_LEN: usize = 50;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 128;
pub const EMAIL_MAX_LEN: usize = 100;
pub const FULL_NAME_MAX_LEN: usize = 100;

const SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";
const WEAK_PREFIXES: [&str; 7] = [
    "123456", "password", "admin", "qwerty", "abc123", "111111", "000000",
];

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
        .expect("email pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

pub type ValidationResult = Result<(), ValidationError>;

pub fn validate_user_name(name: &str) -> ValidationResult {
    if name.trim().is_empty() {
        return Err(ValidationError::new("userName", "user name is required"));
    }
    let len = name.chars().count();
    if len < USER_NAME_MIN_LEN {
        return Err(ValidationError::new(
            "userName",
            format!("must be at least {} characters", USER_NAME_MIN_LEN),
        ));
    }
    if len > USER_NAME_MAX_LEN {
        return Err(ValidationError::new(
            "userName",
            format!("must be at most {} characters", USER_NAME_MAX_LEN),
        ));
    }
    if name.contains('#') || name.chars().any(char::is_control) {
        return Err(ValidationError::new(
            "userName",
            "must not contain '#' or control characters",
        ));
    }
    Ok(())
}

/// Length, character classes, and a ban on well-known weak prefixes.
pub fn validate_password(password: &str) -> ValidationResult {
    if password.trim().is_empty() {
        return Err(ValidationError::new("password", "password is required"));
    }
    let len = password.chars().count();
    if len < PASSWORD_MIN_LEN {
        return Err(ValidationError::new(
            "password",
            format!("must be at least {} characters", PASSWORD_MIN_LEN),
        ));
    }
    if len > PASSWORD_MAX_LEN {
        return Err(ValidationError::new(
            "password",
            format!("must be at most {} characters", PASSWORD_MAX_LEN),
        ));
    }
    if !password.chars().any(char::is_uppercase) {
        return Err(ValidationError::new(
            "password",
            "must contain at least one uppercase letter",
        ));
    }
    if !password.chars().any(char::is_lowercase) {
        return Err(ValidationError::new(
            "password",
            "must contain at least one lowercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ValidationError::new(
            "password",
            "must contain at least one digit",
        ));
    }
    if !password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        return Err(ValidationError::new(
            "password",
            "must contain at least one special character",
        ));
    }

    let lowered = password.to_lowercase();
    if WEAK_PREFIXES.iter().any(|weak| lowered.starts_with(weak)) {
        return Err(ValidationError::new(
            "password",
            "must not start with a common weak pattern",
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> ValidationResult {
    if email.len() > EMAIL_MAX_LEN {
        return Err(ValidationError::new(
            "email",
            format!("must be at most {} characters", EMAIL_MAX_LEN),
        ));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(ValidationError::new("email", "is not a valid email address"));
    }
    Ok(())
}

pub fn validate_full_name(full_name: &str) -> ValidationResult {
    if full_name.chars().count() > FULL_NAME_MAX_LEN {
        return Err(ValidationError::new(
            "fullName",
            format!("must be at most {} characters", FULL_NAME_MAX_LEN),
        ));
    }
    Ok(())
}
