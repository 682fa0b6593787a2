//! Contact channel value object (email or phone).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// A normalized contact channel an invitation can be addressed to.
///
/// Emails are trimmed and lowercased. Phone numbers keep a leading `+` and
/// digits only, so `+1 (555) 010-2030` and `+15550102030` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Contact {
    Email(String),
    Phone(String),
}

impl Contact {
    /// Creates a normalized email contact.
    pub fn email(raw: impl AsRef<str>) -> Result<Self, ValidationError> {
        let normalized = raw.as_ref().trim().to_lowercase();
        if normalized.is_empty() {
            return Err(ValidationError::empty_field("email"));
        }
        match normalized.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
                Ok(Contact::Email(normalized))
            }
            _ => Err(ValidationError::invalid_format("email", "missing @ symbol")),
        }
    }

    /// Creates a normalized phone contact.
    pub fn phone(raw: impl AsRef<str>) -> Result<Self, ValidationError> {
        let raw = raw.as_ref().trim();
        if raw.is_empty() {
            return Err(ValidationError::empty_field("phone"));
        }

        let mut normalized = String::with_capacity(raw.len());
        for (i, c) in raw.chars().enumerate() {
            match c {
                '+' if i == 0 => normalized.push(c),
                '0'..='9' => normalized.push(c),
                ' ' | '-' | '(' | ')' | '.' => {}
                _ => {
                    return Err(ValidationError::invalid_format(
                        "phone",
                        format!("unexpected character '{}'", c),
                    ))
                }
            }
        }

        let digits = normalized.trim_start_matches('+').len();
        if !(7..=15).contains(&digits) {
            return Err(ValidationError::out_of_range("phone_digits", 7, 15, digits as i32));
        }
        Ok(Contact::Phone(normalized))
    }

    /// Returns the normalized value.
    pub fn value(&self) -> &str {
        match self {
            Contact::Email(v) | Contact::Phone(v) => v,
        }
    }

    pub fn is_email(&self) -> bool {
        matches!(self, Contact::Email(_))
    }
}

impl fmt::Display for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Parses free-form input: anything with an `@` is an email, otherwise a phone.
impl FromStr for Contact {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains('@') {
            Contact::email(s)
        } else {
            Contact::phone(s)
        }
    }
}
