use sha2::{Digest, Sha256};

/// Derived key uniquely identifying a piece of media content.
///
/// Prefers the transport's own unique-content identifier (stable across
/// re-uploads of the same file); falls back to a SHA-256 digest of the
/// payload when the transport id is unavailable or hash dedup is enabled.
/// Bit-identical media always maps to the same identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MediaIdentity {
    /// Transport-assigned unique content id.
    TransportUnique(String),
    /// Lowercase hex SHA-256 over (a prefix of) the payload.
    ContentHash(String),
}

impl MediaIdentity {
    /// Digest payload bytes into a content-hash identity.
    #[must_use]
    pub fn hash_bytes(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        Self::ContentHash(hex::encode(digest))
    }

    /// Stable key form used by the store (`uid:<id>` / `sha256:<hex>`).
    ///
    /// The prefix keeps the two namespaces from colliding should a transport
    /// ever hand out ids that look like hex digests.
    #[must_use]
    pub fn as_key(&self) -> String {
        match self {
            Self::TransportUnique(id) => format!("uid:{id}"),
            Self::ContentHash(hash) => format!("sha256:{hash}"),
        }
    }
}

impl std::fmt::Display for MediaIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_bytes_hash_identically() {
        let a = MediaIdentity::hash_bytes(b"same payload");
        let b = MediaIdentity::hash_bytes(b"same payload");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_bytes_hash_differently() {
        let a = MediaIdentity::hash_bytes(b"payload one");
        let b = MediaIdentity::hash_bytes(b"payload two");
        assert_ne!(a, b);
    }

    #[test]
    fn key_namespaces_do_not_collide() {
        let digest = MediaIdentity::hash_bytes(b"x");
        let MediaIdentity::ContentHash(hash) = &digest else {
            panic!("expected content hash");
        };
        let spoofed = MediaIdentity::TransportUnique(hash.clone());
        assert_ne!(digest.as_key(), spoofed.as_key());
    }

    #[test]
    fn display_matches_key_form() {
        let id = MediaIdentity::TransportUnique("AgAD".into());
        assert_eq!(id.to_string(), "uid:AgAD");
    }
}
