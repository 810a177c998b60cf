use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use validator::{Validate, ValidationError};

use super::repo::{Role, User};
use crate::auth::password::is_strong;

fn strong_password(value: &str) -> Result<(), ValidationError> {
    if is_strong(value) {
        return Ok(());
    }
    let mut err = ValidationError::new("password_strength");
    err.message = Some("must be at least 8 characters with a letter and a digit".into());
    Err(err)
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(custom(function = strong_password))]
    pub password: String,
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub display_name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub display_name: Option<String>,
    #[validate(custom(function = strong_password))]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub current_password: String,
    #[validate(custom(function = strong_password))]
    pub new_password: String,
}

/// Outward shape of an account; the password hash never leaves the repo layer.
#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: i64,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<User> for UserView {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            display_name: u.display_name,
            role: u.role,
            is_active: u.is_active,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// Returned by register and login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserView,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_accepts_valid_input() {
        let req = RegisterRequest {
            email: "a@x.com".into(),
            password: "abcdefg1".into(),
            display_name: "Ana".into(),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn register_rejects_bad_email_and_weak_password() {
        let req = RegisterRequest {
            email: "not-an-email".into(),
            password: "short".into(),
            display_name: "Ana".into(),
        };
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn update_validates_only_present_fields() {
        let req = UpdateUserRequest {
            email: None,
            display_name: Some("New Name".into()),
            password: None,
        };
        assert!(req.validate().is_ok());

        let req = UpdateUserRequest {
            email: Some("broken".into()),
            display_name: None,
            password: Some("12345678".into()),
        };
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }
}
