//! Typed request fields. Raw JSON strings are parsed into these at the handler
//! boundary so services only ever see well-formed input.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::AppError;

lazy_static! {
    static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_]+$").unwrap();
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

pub const USERNAME_MIN: usize = 2;
pub const USERNAME_MAX: usize = 20;
pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 128;
pub const MESSAGE_MAX: usize = 300;
pub const CODE_LEN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Username(String);

impl Username {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let name = raw.trim();
        let len = name.chars().count();
        if len < USERNAME_MIN {
            return Err(AppError::Validation(format!(
                "Username must be at least {USERNAME_MIN} characters"
            )));
        }
        if len > USERNAME_MAX {
            return Err(AppError::Validation(format!(
                "Username must be no more than {USERNAME_MAX} characters"
            )));
        }
        if !USERNAME_RE.is_match(name) {
            return Err(AppError::Validation(
                "Username must not contain special characters".into(),
            ));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercased so lookups and the unique constraint agree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let email = raw.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(AppError::Validation("Invalid email address".into()));
        }
        Ok(Self(email))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Plaintext password. No `Display` impl.
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let len = raw.chars().count();
        if len < PASSWORD_MIN {
            return Err(AppError::Validation(format!(
                "Password must be at least {PASSWORD_MIN} characters"
            )));
        }
        if len > PASSWORD_MAX {
            return Err(AppError::Validation(format!(
                "Password must be no more than {PASSWORD_MAX} characters"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationCode(String);

impl VerificationCode {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let code = raw.trim();
        if code.len() != CODE_LEN || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AppError::Validation(format!(
                "Verification code must be {CODE_LEN} digits"
            )));
        }
        Ok(Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageContent(String);

impl MessageContent {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let content = raw.trim();
        if content.is_empty() {
            return Err(AppError::Validation("Message content is required".into()));
        }
        if content.chars().count() > MESSAGE_MAX {
            return Err(AppError::Validation(format!(
                "Message must be no longer than {MESSAGE_MAX} characters"
            )));
        }
        Ok(Self(content.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_is_trimmed_and_checked() {
        assert_eq!(Username::parse("  alice_01 ").unwrap().as_str(), "alice_01");
        assert!(Username::parse("a").is_err());
        assert!(Username::parse("this_name_is_far_too_long").is_err());
        assert!(Username::parse("bad name").is_err());
        assert!(Username::parse("bob!").is_err());
    }

    #[test]
    fn email_is_lowercased() {
        let email = EmailAddress::parse(" Alice@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "alice@example.com");
        assert!(EmailAddress::parse("not-an-email").is_err());
        assert!(EmailAddress::parse("a@b").is_err());
    }

    #[test]
    fn password_length_bounds() {
        assert!(Password::parse("short").is_err());
        assert!(Password::parse("long enough").is_ok());
        assert!(Password::parse(&"x".repeat(PASSWORD_MAX + 1)).is_err());
        assert_eq!(format!("{:?}", Password::parse("long enough").unwrap()), "Password(***)");
    }

    #[test]
    fn code_must_be_six_digits() {
        assert!(VerificationCode::parse("123456").is_ok());
        assert!(VerificationCode::parse("12345").is_err());
        assert!(VerificationCode::parse("12345a").is_err());
        assert!(VerificationCode::parse("1234567").is_err());
    }

    #[test]
    fn message_content_bounds() {
        assert!(MessageContent::parse("   ").is_err());
        assert_eq!(MessageContent::parse(" hi there ").unwrap().as_str(), "hi there");
        assert!(MessageContent::parse(&"m".repeat(MESSAGE_MAX + 1)).is_err());
    }
}
