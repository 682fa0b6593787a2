//! Invitation code value object.
//!
//! Short, human-enterable codes handed out with an invitation.
//!
//! # Rules
//!
//! - Exactly 8 ASCII alphanumeric characters
//! - Case-insensitive; stored and compared in uppercase
//! - Issued codes avoid look-alike characters (`0 O 1 I L`)
//!
//! Codes are not secrets. They are always paired with a contact check or a
//! tenant-scoped login.

use crate::domain::foundation::ValidationError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Characters used when issuing codes.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Length of every invitation code.
pub const CODE_LENGTH: usize = 8;

/// A validated, uppercase invitation code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InvitationCode(String);

impl InvitationCode {
    /// Parses user input, normalizing to uppercase.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the trimmed input is empty, not 8
    /// characters long, or contains non-alphanumeric characters.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::empty_field("invitation_code"));
        }

        let len = trimmed.chars().count();
        if len != CODE_LENGTH {
            return Err(ValidationError::out_of_range(
                "invitation_code_length",
                CODE_LENGTH as i32,
                CODE_LENGTH as i32,
                len as i32,
            ));
        }

        if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ValidationError::invalid_format(
                "invitation_code",
                "alphanumeric characters only",
            ));
        }

        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Draws a fresh code from [`CODE_ALPHABET`].
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let code = (0..CODE_LENGTH)
            .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvitationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for InvitationCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for InvitationCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<InvitationCode> for String {
    fn from(code: InvitationCode) -> Self {
        code.0
    }
}
