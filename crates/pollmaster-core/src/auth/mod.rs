//! Credential validation and auth request payloads.
//!
//! Everything here runs before the network layer; a failure is always
//! [`Error::Validation`] and never produces a request.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::Role;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const OTP_MIN: u32 = 100_000;
pub const OTP_MAX: u32 = 999_999;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid regex"));
static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z ]{2,100}$").expect("Invalid regex"));

pub fn validate_email(email: &str) -> Result<()> {
    if EMAIL_PATTERN.is_match(email.trim()) {
        Ok(())
    } else {
        Err(Error::Validation(
            "Please enter a valid email address (e.g., user@example.com)".to_string(),
        ))
    }
}

pub fn validate_name(name: &str) -> Result<()> {
    if NAME_PATTERN.is_match(name.trim()) {
        Ok(())
    } else {
        Err(Error::Validation(
            "Name must be 2-100 characters and contain only letters and spaces".to_string(),
        ))
    }
}

/// At least eight characters with a lowercase letter, an uppercase letter,
/// and a digit.
pub fn validate_password_policy(password: &str) -> Result<()> {
    let long_enough = password.chars().count() >= MIN_PASSWORD_LEN;
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if long_enough && has_lower && has_upper && has_digit {
        Ok(())
    } else {
        Err(Error::Validation(
            "Password must be at least 8 characters with one lowercase, one uppercase, and one number"
                .to_string(),
        ))
    }
}

pub fn validate_sign_in(email: &str, password: &str) -> Result<()> {
    validate_email(email)?;
    if password.is_empty() {
        return Err(Error::Validation("Password is required".to_string()));
    }
    Ok(())
}

/// Parse a six-digit one-time passcode.
pub fn parse_otp(code: &str) -> Result<u32> {
    let code = code.trim();
    let invalid = || Error::Validation("OTP must be a 6-digit number".to_string());
    if code.len() != 6 || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let value: u32 = code.parse().map_err(|_| invalid())?;
    if (OTP_MIN..=OTP_MAX).contains(&value) {
        Ok(value)
    } else {
        Err(invalid())
    }
}

/// Registration form contents
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    #[serde(rename = "adminKey", skip_serializing_if = "Option::is_none")]
    pub admin_key: Option<String>,
}

impl fmt::Debug for SignUpRequest {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SignUpRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("role", &self.role)
            .field("admin_key", &self.admin_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl SignUpRequest {
    pub fn user(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            role: Role::User,
            admin_key: None,
        }
    }

    #[must_use]
    pub fn as_admin(mut self, admin_key: impl Into<String>) -> Self {
        self.role = Role::Admin;
        self.admin_key = Some(admin_key.into());
        self
    }

    /// Trimmed copy with every field checked.
    pub fn validated(&self) -> Result<Self> {
        validate_name(&self.name)?;
        validate_email(&self.email)?;
        validate_password_policy(&self.password)?;
        let admin_key = crate::util::normalize_text_option(self.admin_key.clone());
        if self.role.is_admin() && admin_key.is_none() {
            return Err(Error::Unauthorized(
                "An admin key is required to register as admin".to_string(),
            ));
        }
        Ok(Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            role: self.role,
            admin_key: if self.role.is_admin() { admin_key } else { None },
        })
    }
}
