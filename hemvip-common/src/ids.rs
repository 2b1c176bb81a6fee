//! Participant identifier types
//!
//! Identifiers arrive from the recruitment platform as query/body strings.
//! They are only turned into these types after their lexical shape is checked,
//! so holding a `ParticipantIds` means the triple is well-formed.

use serde::Serialize;
use std::fmt;

use crate::{Error, Result};

/// Length of a platform participant or study identifier
pub const PROLIFIC_ID_LEN: usize = 24;

/// 24-character lowercase hexadecimal identifier (participant id or platform study id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ProlificId(String);

impl ProlificId {
    /// Parse a platform identifier, accepting exactly `^[a-f0-9]{24}$`
    pub fn parse(raw: &str) -> Result<Self> {
        let well_formed = raw.len() == PROLIFIC_ID_LEN
            && raw.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));

        if well_formed {
            Ok(Self(raw.to_string()))
        } else {
            Err(Error::InvalidInput(format!(
                "expected {} lowercase hexadecimal characters",
                PROLIFIC_ID_LEN
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProlificId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Non-empty alphanumeric session identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Parse a session identifier, accepting exactly `^[a-zA-Z0-9]+$`
    pub fn parse(raw: &str) -> Result<Self> {
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_alphanumeric()) {
            Ok(Self(raw.to_string()))
        } else {
            Err(Error::InvalidInput(
                "expected one or more ASCII letters or digits".to_string(),
            ))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier triple that binds a participant to exactly one study
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantIds {
    pub user: ProlificId,
    pub study: ProlificId,
    pub session: SessionId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prolific_id_accepts_lowercase_hex() {
        let id = ProlificId::parse("5f1a2b3c4d5e6f7a8b9c0d1e").unwrap();
        assert_eq!(id.as_str(), "5f1a2b3c4d5e6f7a8b9c0d1e");
    }

    #[test]
    fn test_prolific_id_rejects_bad_shapes() {
        // uppercase, too short, too long, non-hex
        for raw in [
            "5F1A2B3C4D5E6F7A8B9C0D1E",
            "5f1a2b3c",
            "5f1a2b3c4d5e6f7a8b9c0d1e00",
            "5f1a2b3c4d5e6f7a8b9c0d1g",
            "",
        ] {
            assert!(ProlificId::parse(raw).is_err(), "accepted {:?}", raw);
        }
    }

    #[test]
    fn test_session_id_shape() {
        assert!(SessionId::parse("abcXYZ019").is_ok());
        assert!(SessionId::parse("").is_err());
        assert!(SessionId::parse("abc-123").is_err());
        assert!(SessionId::parse("abc 123").is_err());
        // non-ASCII alphanumerics are not allowed
        assert!(SessionId::parse("séance").is_err());
    }
}
