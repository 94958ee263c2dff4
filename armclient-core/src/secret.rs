//! Redacting wrapper for token material.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// An access or refresh token that never shows up in logs.
///
/// `Debug` and `Display` print a placeholder; the value is reachable only
/// through [`expose`](Secret::expose). The buffer is wiped on drop.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw value. Never log it.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatting_hides_value() {
        let secret = Secret::new("eyJ0eXAiOiJKV1QifQ.payload.sig");

        for rendered in [format!("{:?}", secret), secret.to_string()] {
            assert!(!rendered.contains("eyJ0eXAi"));
            assert!(rendered.contains("redacted"));
        }
        assert_eq!(secret.expose(), "eyJ0eXAiOiJKV1QifQ.payload.sig");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let json = serde_json::to_string(&Secret::new("abc")).unwrap();
        assert_eq!(json, "\"abc\"");
    }
}
