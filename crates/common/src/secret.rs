//! Redacting wrapper for client secrets and OAuth tokens

use std::fmt;
use zeroize::Zeroize;

/// Holds the X client secret (and anything else that must stay out of logs).
///
/// Formatting always prints `[REDACTED]`; the buffer is wiped when dropped.
pub struct Secret<T: Zeroize>(T);

impl<T: Zeroize> Secret<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Borrow the inner value. Only call this at the point of use
    /// (building an Authorization header, writing to the store).
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl From<String> for Secret<String> {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Secret<String> {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

const REDACTED: &str = "[REDACTED]";

impl<T: Zeroize> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl<T: Zeroize> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl Secret<String> {
    /// True when the secret is empty or only whitespace, which no token
    /// endpoint will accept.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl<T: Zeroize> Drop for Secret<T> {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl<T: Zeroize + Clone> Clone for Secret<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_secret_is_redacted_in_debug_and_display() {
        let secret = Secret::from("x-client-secret");
        assert_eq!(format!("{secret:?}"), "[REDACTED]");
        assert_eq!(format!("{secret}"), "[REDACTED]");
    }

    #[test]
    fn redaction_holds_inside_derived_debug() {
        #[derive(Debug)]
        #[allow(dead_code)]
        struct Credentials {
            client_id: String,
            client_secret: Secret<String>,
        }

        let creds = Credentials {
            client_id: "abc".into(),
            client_secret: Secret::from("hunter2"),
        };
        let debug = format!("{creds:?}");
        assert!(debug.contains("abc"));
        assert!(!debug.contains("hunter2"), "secret leaked: {debug}");
    }

    #[test]
    fn blank_detection_ignores_whitespace() {
        assert!(Secret::from("").is_blank());
        assert!(Secret::from("  \t\n").is_blank());
        assert!(!Secret::from(" s3cret ").is_blank());
    }

    #[test]
    fn expose_returns_inner_value() {
        let secret = Secret::new(String::from("at_123"));
        assert_eq!(secret.expose(), "at_123");
        assert_eq!(secret.clone().expose(), "at_123");
    }
}
