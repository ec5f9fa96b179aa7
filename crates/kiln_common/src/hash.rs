//! Content hashing for cache identity and change detection.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha1::{Digest, Sha1};
use std::fmt;
use std::str::FromStr;

/// A 160-bit content hash computed using SHA-1.
///
/// Two files with the same `ContentHash` are assumed to have identical
/// content. The digest is used purely as a fast fixed-length identity for
/// cache lookups, not for cryptographic security; a collision just means an
/// extremely unlikely false cache hit.
///
/// Serializes as its lowercase hex string, which is also the form stored in
/// persisted cache blobs.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 20]);

impl ContentHash {
    /// Computes a content hash from a byte slice.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

/// Error returned when a string is not a valid hex-encoded content hash.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid content hash {input:?}: expected 40 hex characters")]
pub struct ParseHashError {
    /// The rejected input string.
    pub input: String,
}

impl FromStr for ContentHash {
    type Err = ParseHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 40 || !s.is_ascii() {
            return Err(ParseHashError {
                input: s.to_string(),
            });
        }
        let mut bytes = [0u8; 20];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).map_err(|_| ParseHashError {
                input: s.to_string(),
            })?;
        }
        Ok(Self(bytes))
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let a = ContentHash::from_bytes(b"hello world");
        let b = ContentHash::from_bytes(b"hello world");
        assert_eq!(a, b);
    }

    #[test]
    fn different_inputs_differ() {
        let a = ContentHash::from_bytes(b"hello");
        let b = ContentHash::from_bytes(b"hello!");
        assert_ne!(a, b);
    }

    #[test]
    fn display_format() {
        let h = ContentHash::from_bytes(b"test");
        let s = format!("{h}");
        assert_eq!(s.len(), 40, "Display should be 40 hex chars");
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(s, s.to_lowercase());
    }

    #[test]
    fn known_digest() {
        // SHA-1 of the empty input.
        let h = ContentHash::from_bytes(b"");
        assert_eq!(format!("{h}"), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    }

    #[test]
    fn debug_abbreviated() {
        let h = ContentHash::from_bytes(b"test");
        let s = format!("{h:?}");
        assert!(s.starts_with("ContentHash("));
        assert!(s.ends_with(")"));
    }

    #[test]
    fn parse_roundtrip() {
        let h = ContentHash::from_bytes(b"roundtrip");
        let parsed: ContentHash = format!("{h}").parse().unwrap();
        assert_eq!(h, parsed);
    }

    #[test]
    fn parse_rejects_bad_length() {
        assert!("abc123".parse::<ContentHash>().is_err());
    }

    #[test]
    fn parse_rejects_non_hex() {
        let bad = "z".repeat(40);
        assert!(bad.parse::<ContentHash>().is_err());
    }

    #[test]
    fn serde_roundtrip_as_hex_string() {
        let h = ContentHash::from_bytes(b"serde test");
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{h}\""));
        let back: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(h, back);
    }
}
