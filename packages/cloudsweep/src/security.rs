//! Credential handling with secure memory.
//!
//! Uses the `secrecy` crate to prevent accidental logging of sink tokens.

use secrecy::{ExposeSecret, SecretBox};
use std::fmt;

/// A bearer token that won't be logged or displayed.
///
/// Uses `secrecy::SecretBox` so credentials never leak into logs, debug
/// output, or error messages.
pub struct SecretToken(SecretBox<str>);

impl SecretToken {
    /// Create a new secret token.
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretBox::new(Box::from(value.into().as_str())))
    }

    /// Expose the token for use.
    ///
    /// Only call this when actually using the token (e.g., in a request
    /// header).
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for SecretToken {
    fn clone(&self) -> Self {
        Self::new(self.expose().to_string())
    }
}

impl fmt::Debug for SecretToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for SecretToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for SecretToken {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretToken {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let token = SecretToken::new("super-secret");
        assert_eq!(format!("{:?}", token), "[REDACTED]");
        assert_eq!(format!("{}", token), "[REDACTED]");
        assert_eq!(token.expose(), "super-secret");
    }
}
