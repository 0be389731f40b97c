//! # Cap Core
//!
//! A minimal version control core: a content-addressed object store plus
//! branch refs, with clone/pull/push synchronization between repositories
//! over a filesystem remote.
//!
//! Blobs and commits are stored under their BLAKE3 digest, commits form a
//! backward-pointing chain per branch, and synchronization compares the
//! two chains, classifies the relationship (equal, ahead, behind,
//! diverged) and transfers verified objects accordingly. Every byte that
//! crosses a repository boundary is re-hashed before it is trusted.
//!
//! ## Example
//!
//! ```no_run
//! use cap_core::{FsRemote, Repository, pull};
//! use std::path::Path;
//!
//! # fn main() -> cap_core::Result<()> {
//! // Start tracking a directory's file.txt
//! let repo = Repository::init("./work")?;
//! std::fs::write(repo.tracked_file_path(), "hello")?;
//! repo.commit_file("initial import")?;
//!
//! // Reconcile with another repository on this machine
//! let remote = FsRemote::open(Path::new("../their-work"))?;
//! let report = pull(&repo, &remote, "origin")?;
//! println!("pulled {} objects", report.objects_transferred);
//! # Ok(())
//! # }
//! ```

mod commit;
mod error;
mod hash;
mod history;
mod object;
mod refs;
mod remote;
mod store;
mod sync;
mod worktree;

pub use commit::Commit;
pub use error::{Error, Result};
pub use hash::{HASH_SIZE, Hash};
pub use history::{History, RefRelation, classify};
pub use object::{COMMIT_SUFFIX, ObjectId, ObjectKind};
pub use refs::RefStore;
pub use remote::{BranchLister, FsRemote, ObjectFetcher, ObjectLister, ObjectSink, RefUpdater};
pub use store::{DEFAULT_BRANCH, DEFAULT_REMOTE, REPO_DIR, Repository, TRACKED_FILE};
pub use sync::{SyncReport, clone_repository, pull, push};
