//! Error types for cap_core.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using cap_core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during repository and synchronization operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error occurred during file operations.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Object not found in a store.
    #[error("Object not found: {hash}")]
    ObjectNotFound { hash: String },

    /// Fetched or stored bytes do not hash to their claimed digest.
    #[error("Hash mismatch for {claimed}: bytes hash to {actual}")]
    HashMismatch { claimed: String, actual: String },

    /// Cycle or malformed parent chain detected during a history walk.
    #[error("Corrupt history at {hash}: {reason}")]
    CorruptHistory { hash: String, reason: String },

    /// Local and remote tips share history but neither is an ancestor of
    /// the other, or they share no history at all.
    #[error("Diverged history: local {local}, remote {remote}")]
    DivergedHistory { local: String, remote: String },

    /// Transport-level failure reaching the remote.
    #[error("Remote unavailable: {reason}")]
    RemoteUnavailable { reason: String },

    /// Invalid hash format or encoding.
    #[error("Invalid hash: {reason}")]
    InvalidHash { reason: String },

    /// Invalid reference name or format.
    #[error("Invalid reference: {reason}")]
    InvalidRef { reason: String },

    /// Reference not found.
    #[error("Reference not found: {name}")]
    RefNotFound { name: String },

    /// Branch not present on the remote.
    #[error("Branch not found on remote: {name}")]
    BranchNotFound { name: String },

    /// Repository is invalid or not initialized.
    #[error("Invalid repository at {path}: {reason}")]
    InvalidRepository { path: PathBuf, reason: String },

    /// Commit record failed to decode.
    #[error("Malformed commit {hash}: {reason}")]
    MalformedCommit { hash: String, reason: String },

    /// Commit record failed to encode.
    #[error("Commit encoding failed: {source}")]
    CommitEncoding {
        #[from]
        source: serde_json::Error,
    },

    /// Path already exists (repository initialization, materialization).
    #[error("Path already exists: {path}")]
    PathExists { path: PathBuf },
}

impl Error {
    /// Create an ObjectNotFound error.
    pub fn object_not_found(hash: impl Into<String>) -> Self {
        Error::ObjectNotFound { hash: hash.into() }
    }

    /// Create a HashMismatch error.
    pub fn hash_mismatch(claimed: impl Into<String>, actual: impl Into<String>) -> Self {
        Error::HashMismatch {
            claimed: claimed.into(),
            actual: actual.into(),
        }
    }

    /// Create a CorruptHistory error.
    pub fn corrupt_history(hash: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::CorruptHistory {
            hash: hash.into(),
            reason: reason.into(),
        }
    }

    /// Create a DivergedHistory error.
    pub fn diverged_history(local: impl Into<String>, remote: impl Into<String>) -> Self {
        Error::DivergedHistory {
            local: local.into(),
            remote: remote.into(),
        }
    }

    /// Create a RemoteUnavailable error.
    pub fn remote_unavailable(reason: impl Into<String>) -> Self {
        Error::RemoteUnavailable {
            reason: reason.into(),
        }
    }

    /// Create an InvalidHash error.
    pub fn invalid_hash(reason: impl Into<String>) -> Self {
        Error::InvalidHash {
            reason: reason.into(),
        }
    }

    /// Create an InvalidRef error.
    pub fn invalid_ref(reason: impl Into<String>) -> Self {
        Error::InvalidRef {
            reason: reason.into(),
        }
    }

    /// Create a RefNotFound error.
    pub fn ref_not_found(name: impl Into<String>) -> Self {
        Error::RefNotFound { name: name.into() }
    }

    /// Create a BranchNotFound error.
    pub fn branch_not_found(name: impl Into<String>) -> Self {
        Error::BranchNotFound { name: name.into() }
    }

    /// Create an InvalidRepository error.
    pub fn invalid_repository(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::InvalidRepository {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a MalformedCommit error.
    pub fn malformed_commit(hash: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedCommit {
            hash: hash.into(),
            reason: reason.into(),
        }
    }

    /// Create a PathExists error.
    pub fn path_exists(path: impl Into<PathBuf>) -> Self {
        Error::PathExists { path: path.into() }
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error::Io { source: err.error }
    }
}
