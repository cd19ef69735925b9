use std::fmt;

/// Provider API key that never shows up in logs or error messages
///
/// Both `Debug` and `Display` print `[REDACTED]`; the request code reads the
/// key through [`SecretString::expose`] or [`SecretString::bearer`].
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Raw key, for the `x-api-key` header
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// `Authorization` header value
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}
