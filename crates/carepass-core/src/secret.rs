//! Server-held signing secrets

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Minimum accepted secret length in bytes
pub const MIN_SECRET_LEN: usize = 32;

/// HMAC key material. Wiped on drop and never printed.
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    /// Wrap raw key bytes
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Key bytes
    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    /// Key length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no key material is configured
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the key is long enough to be used in production
    pub fn is_strong(&self) -> bool {
        self.0.len() >= MIN_SECRET_LEN
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningSecret([REDACTED; {}])", self.0.len())
    }
}

impl From<&str> for SigningSecret {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl Serialize for SigningSecret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("[REDACTED]")
    }
}

impl<'de> Deserialize<'de> for SigningSecret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self(raw.into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_is_redacted() {
        let secret = SigningSecret::from("super-secret-key-material-0123456789");
        let rendered = format!("{secret:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("REDACTED"));
    }

    #[test]
    fn strength_threshold() {
        assert!(!SigningSecret::from("short").is_strong());
        assert!(SigningSecret::new(vec![7u8; MIN_SECRET_LEN]).is_strong());
        assert!(SigningSecret::default().is_empty());
    }
}
