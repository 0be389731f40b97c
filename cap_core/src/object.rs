//! Object identifiers and on-disk naming.
//!
//! Objects live in `objects/` under their digest: a blob's filename is
//! exactly the lowercase hex digest of its bytes, a commit's filename is the
//! digest of its canonical serialization plus a fixed `.json` suffix. The
//! suffix keeps the blob and commit namespaces apart even if a blob and a
//! commit were ever to share a digest.

use crate::error::{Error, Result};
use crate::hash::Hash;
use std::fmt;

/// Filename suffix marking a commit object.
pub const COMMIT_SUFFIX: &str = ".json";

/// Object kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// A blob (tracked file content).
    Blob,
    /// A commit record.
    Commit,
}

impl ObjectKind {
    /// Get the string name of this object kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Blob => "blob",
            ObjectKind::Commit => "commit",
        }
    }
}

/// Identifier of a stored object: its digest plus its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId {
    /// Digest of the object's bytes.
    pub hash: Hash,
    /// Blob or commit.
    pub kind: ObjectKind,
}

impl ObjectId {
    /// Identifier of a blob.
    pub fn blob(hash: Hash) -> Self {
        ObjectId {
            hash,
            kind: ObjectKind::Blob,
        }
    }

    /// Identifier of a commit.
    pub fn commit(hash: Hash) -> Self {
        ObjectId {
            hash,
            kind: ObjectKind::Commit,
        }
    }

    /// Render the on-disk filename for this object.
    pub fn filename(&self) -> String {
        match self.kind {
            ObjectKind::Blob => self.hash.to_hex(),
            ObjectKind::Commit => format!("{}{}", self.hash.to_hex(), COMMIT_SUFFIX),
        }
    }

    /// Parse an object identifier back out of an `objects/` filename.
    pub fn from_filename(name: &str) -> Result<Self> {
        match name.strip_suffix(COMMIT_SUFFIX) {
            Some(hex) => Ok(ObjectId::commit(Hash::from_hex(hex)?)),
            None => Ok(ObjectId::blob(Hash::from_hex(name)?)),
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.as_str(), self.hash)
    }
}

/// Reject filenames that are neither a blob digest nor a commit digest.
pub fn parse_object_filename(name: &str) -> Result<ObjectId> {
    ObjectId::from_filename(name)
        .map_err(|_| Error::invalid_hash(format!("Not an object filename: {}", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_filename_is_bare_hex() {
        let hash = Hash::hash_bytes(b"blob");
        let id = ObjectId::blob(hash);
        assert_eq!(id.filename(), hash.to_hex());
    }

    #[test]
    fn test_commit_filename_has_suffix() {
        let hash = Hash::hash_bytes(b"commit");
        let id = ObjectId::commit(hash);
        assert_eq!(id.filename(), format!("{}.json", hash.to_hex()));
    }

    #[test]
    fn test_filename_roundtrip() {
        let blob = ObjectId::blob(Hash::hash_bytes(b"a"));
        let commit = ObjectId::commit(Hash::hash_bytes(b"b"));

        assert_eq!(ObjectId::from_filename(&blob.filename()).unwrap(), blob);
        assert_eq!(ObjectId::from_filename(&commit.filename()).unwrap(), commit);
    }

    #[test]
    fn test_namespaces_never_collide() {
        // Same digest, different kinds: distinct filenames.
        let hash = Hash::hash_bytes(b"shared");
        assert_ne!(
            ObjectId::blob(hash).filename(),
            ObjectId::commit(hash).filename()
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_object_filename("not-a-digest").is_err());
        assert!(parse_object_filename("abcd.json").is_err());
        assert!(parse_object_filename("").is_err());
    }
}
