//! The commit record and its canonical encoding.

use crate::error::{Error, Result};
use crate::hash::Hash;
use serde::{Deserialize, Serialize};

/// A commit: one snapshot of the tracked file, linked to its parent.
///
/// A commit's digest is the BLAKE3 hash of its canonical serialization, so
/// the digest is a pure function of the four fields. The canonical form is
/// compact JSON with the keys in sorted order; serde emits struct fields in
/// declaration order, so the declaration below fixes the key order and any
/// implementation that encodes `{"message":..,"previous":..,"root":..,
/// "timestamp":..}` without whitespace reproduces the same digests.
///
/// `previous` is `null` for the first commit on a branch. Commits are
/// immutable once written and the parent chain points strictly backward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Commit {
    /// Free-text message supplied by the caller.
    pub message: String,
    /// Digest of the parent commit, or None for the first commit.
    pub previous: Option<Hash>,
    /// Digest of the blob this commit snapshots.
    pub root: Hash,
    /// Creation time, Unix seconds.
    pub timestamp: i64,
}

impl Commit {
    /// Create a commit stamped with the current time.
    pub fn new(root: Hash, previous: Option<Hash>, message: impl Into<String>) -> Self {
        Commit {
            message: message.into(),
            previous,
            root,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    /// Canonical serialized form: compact JSON, sorted keys.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// The commit's own digest, computed over the canonical form.
    pub fn digest(&self) -> Result<Hash> {
        Ok(Hash::hash_bytes(&self.canonical_bytes()?))
    }

    /// Decode a commit from its serialized bytes.
    ///
    /// `claimed` is the digest the bytes were stored or advertised under;
    /// it is used only for error context here - callers verify the digest
    /// against the bytes separately.
    pub fn from_bytes(bytes: &[u8], claimed: &Hash) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::malformed_commit(claimed.to_hex(), e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_commit() -> Commit {
        Commit {
            message: "first".to_string(),
            previous: None,
            root: Hash::hash_bytes(b"contents"),
            timestamp: 1_700_000_000,
        }
    }

    #[test]
    fn test_canonical_key_order() {
        let commit = sample_commit();
        let bytes = commit.canonical_bytes().unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.starts_with("{\"message\":"));
        let m = text.find("\"message\"").unwrap();
        let p = text.find("\"previous\"").unwrap();
        let r = text.find("\"root\"").unwrap();
        let t = text.find("\"timestamp\"").unwrap();
        assert!(m < p && p < r && r < t);
        // Compact encoding: no whitespace outside string values.
        assert!(!text.contains(": "));
    }

    #[test]
    fn test_first_commit_previous_is_null() {
        let commit = sample_commit();
        let text = String::from_utf8(commit.canonical_bytes().unwrap()).unwrap();
        assert!(text.contains("\"previous\":null"));
    }

    #[test]
    fn test_digest_is_function_of_fields() {
        let a = sample_commit();
        let b = sample_commit();
        assert_eq!(a.digest().unwrap(), b.digest().unwrap());

        let mut c = sample_commit();
        c.message = "second".to_string();
        assert_ne!(a.digest().unwrap(), c.digest().unwrap());

        let mut d = sample_commit();
        d.timestamp += 1;
        assert_ne!(a.digest().unwrap(), d.digest().unwrap());
    }

    #[test]
    fn test_roundtrip() {
        let commit = Commit {
            message: "with parent".to_string(),
            previous: Some(Hash::hash_bytes(b"parent")),
            root: Hash::hash_bytes(b"root"),
            timestamp: 123,
        };
        let bytes = commit.canonical_bytes().unwrap();
        let digest = commit.digest().unwrap();
        let back = Commit::from_bytes(&bytes, &digest).unwrap();
        assert_eq!(back, commit);
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        let claimed = Hash::hash_bytes(b"x");
        assert!(Commit::from_bytes(b"not json", &claimed).is_err());
        assert!(Commit::from_bytes(b"{\"message\":\"m\"}", &claimed).is_err());
        assert!(
            Commit::from_bytes(
                b"{\"message\":\"m\",\"previous\":null,\"root\":\"ff\",\"timestamp\":0}",
                &claimed
            )
            .is_err()
        );
    }

    #[test]
    fn test_new_links_previous() {
        let root = Hash::hash_bytes(b"v1");
        let parent = Hash::hash_bytes(b"parent commit");
        let commit = Commit::new(root, Some(parent), "msg");
        assert_eq!(commit.previous, Some(parent));
        assert_eq!(commit.root, root);
        assert!(commit.timestamp > 0);
    }
}
