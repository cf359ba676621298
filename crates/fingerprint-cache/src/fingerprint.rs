use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fmt::Write as _;

/// Content-derived cache key for a chunk.
///
/// SHA-256 over the prompt template version and the chunk text, each framed
/// with its byte length so `("ab", "c")` and `("a", "bc")` never collide.
/// The file a chunk came from does not participate: identical code in two
/// files shares one fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    #[must_use]
    pub fn compute(template_version: &str, text: &str) -> Self {
        let mut hasher = Sha256::new();
        for part in [template_version, text] {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        let digest = hasher.finalize();

        let mut hex = String::with_capacity(digest.len() * 2);
        for byte in digest {
            let _ = write!(hex, "{byte:02x}");
        }
        Self(hex)
    }

    /// Accept an existing lowercase hex digest (64 chars)
    #[must_use]
    pub fn from_hex(hex: &str) -> Option<Self> {
        let valid = hex.len() == 64
            && hex
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then(|| Self(hex.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_and_hex() {
        let a = Fingerprint::compute("v1", "fn main() {}\n");
        let b = Fingerprint::compute("v1", "fn main() {}\n");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert_eq!(Fingerprint::from_hex(a.as_str()), Some(a));
    }

    #[test]
    fn version_and_text_both_matter() {
        let base = Fingerprint::compute("v1", "code");
        assert_ne!(base, Fingerprint::compute("v2", "code"));
        assert_ne!(base, Fingerprint::compute("v1", "code "));
    }

    #[test]
    fn framing_prevents_boundary_collisions() {
        assert_ne!(
            Fingerprint::compute("ab", "c"),
            Fingerprint::compute("a", "bc")
        );
    }

    #[test]
    fn from_hex_rejects_garbage() {
        assert!(Fingerprint::from_hex("../etc/passwd").is_none());
        assert!(Fingerprint::from_hex(&"A".repeat(64)).is_none());
    }
}
