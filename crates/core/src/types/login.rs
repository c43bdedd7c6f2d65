//! Login identifier type.
//!
//! The backend accepts either an email address or a phone number in the same
//! `email_or_phone` field, for login and for password reset.

use core::fmt;

use serde::{Serialize, Serializer};

/// Errors that can occur when parsing a [`LoginIdentifier`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LoginIdentifierError {
    /// The input string is empty.
    #[error("email or phone number is required")]
    Empty,
    /// The input looks like an email but is malformed.
    #[error("invalid email address: {0}")]
    InvalidEmail(String),
    /// The input looks like a phone number but is malformed.
    #[error("phone number must have {min}-{max} digits")]
    InvalidPhone {
        /// Minimum number of digits.
        min: usize,
        /// Maximum number of digits.
        max: usize,
    },
}

/// Either an email address or a phone number.
///
/// ## Examples
///
/// ```
/// use peelojuice_core::LoginIdentifier;
///
/// assert!(matches!(
///     LoginIdentifier::parse("asha@example.com"),
///     Ok(LoginIdentifier::Email(_))
/// ));
/// assert!(matches!(
///     LoginIdentifier::parse("+91 98765 43210"),
///     Ok(LoginIdentifier::Phone(_))
/// ));
/// assert!(LoginIdentifier::parse("@example.com").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LoginIdentifier {
    /// An email address, stored as entered.
    Email(String),
    /// A phone number with spaces and dashes removed.
    Phone(String),
}

impl LoginIdentifier {
    /// Maximum length of an email address (RFC 5321).
    pub const MAX_EMAIL_LENGTH: usize = 254;
    /// Minimum number of phone digits.
    pub const MIN_PHONE_DIGITS: usize = 10;
    /// Maximum number of phone digits.
    pub const MAX_PHONE_DIGITS: usize = 15;

    /// Parse a `LoginIdentifier` from user input.
    ///
    /// Anything containing `@` is treated as an email; everything else must be
    /// a phone number, optionally prefixed with `+`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty or is neither a structurally
    /// valid email nor a phone number.
    pub fn parse(s: &str) -> Result<Self, LoginIdentifierError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(LoginIdentifierError::Empty);
        }

        if s.contains('@') {
            return Self::parse_email(s);
        }

        Self::parse_phone(s)
    }

    fn parse_email(s: &str) -> Result<Self, LoginIdentifierError> {
        if s.len() > Self::MAX_EMAIL_LENGTH {
            return Err(LoginIdentifierError::InvalidEmail(format!(
                "must be at most {} characters",
                Self::MAX_EMAIL_LENGTH
            )));
        }
        let Some((local, domain)) = s.split_once('@') else {
            return Err(LoginIdentifierError::InvalidEmail(s.to_string()));
        };
        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(LoginIdentifierError::InvalidEmail(s.to_string()));
        }
        Ok(Self::Email(s.to_string()))
    }

    fn parse_phone(s: &str) -> Result<Self, LoginIdentifierError> {
        let (prefix, rest) = s.strip_prefix('+').map_or(("", s), |rest| ("+", rest));
        let cleaned: String = rest
            .chars()
            .filter(|c| !matches!(c, ' ' | '-'))
            .collect();

        let digits = cleaned.chars().count();
        if !cleaned.chars().all(|c| c.is_ascii_digit())
            || digits < Self::MIN_PHONE_DIGITS
            || digits > Self::MAX_PHONE_DIGITS
        {
            return Err(LoginIdentifierError::InvalidPhone {
                min: Self::MIN_PHONE_DIGITS,
                max: Self::MAX_PHONE_DIGITS,
            });
        }

        Ok(Self::Phone(format!("{prefix}{cleaned}")))
    }

    /// Returns the identifier as sent to the backend.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Email(s) | Self::Phone(s) => s,
        }
    }
}

impl fmt::Display for LoginIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for LoginIdentifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
