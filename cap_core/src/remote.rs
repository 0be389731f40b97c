//! Remote capability interfaces and the filesystem remote.
//!
//! A remote is whatever can advertise its object inventory, hand over
//! object payloads, and list its branch tips. The synchronizer is written
//! against these capabilities, so a future transport-backed remote slots
//! in without touching it. Payloads from a remote are untrusted: callers
//! re-hash everything before persisting.

use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::object::{ObjectId, parse_object_filename};
use crate::store::REPO_DIR;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Advertise the full object inventory.
pub trait ObjectLister {
    fn list_objects(&self) -> Result<Vec<ObjectId>>;
}

/// Hand over object payloads by identifier.
pub trait ObjectFetcher {
    /// Payloads in request order. Fails without a partial result if any
    /// requested object is missing.
    fn get_objects(&self, ids: &[ObjectId]) -> Result<Vec<Vec<u8>>>;
}

/// List branch names and their tips.
pub trait BranchLister {
    fn list_branches(&self) -> Result<Vec<(String, Hash)>>;
}

/// Write capability: accept objects. Not part of the read-only capability
/// set pull depends on; push requires it.
pub trait ObjectSink {
    /// Persist the given objects, verifying each payload against its
    /// claimed digest before anything is stored.
    fn put_objects(&self, objects: &[(ObjectId, Vec<u8>)]) -> Result<()>;
}

/// Write capability: accept a branch ref update.
pub trait RefUpdater {
    fn set_branch(&self, name: &str, hash: &Hash) -> Result<()>;
}

/// A same-machine repository reachable through the filesystem.
///
/// Reads (and, for push, writes) the standard on-disk layout directly
/// under `<dir>/.cap/`. No verification happens on the read side - this
/// mirrors what a dumb transport would do, and keeps the burden of
/// digest-checking on the synchronizing side where it belongs.
#[derive(Debug)]
pub struct FsRemote {
    cap_dir: PathBuf,
}

impl FsRemote {
    /// Open a filesystem remote rooted at another repository's working
    /// directory.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let cap_dir = dir.as_ref().join(REPO_DIR);
        if !cap_dir.is_dir() {
            return Err(Error::remote_unavailable(format!(
                "no repository at {}",
                dir.as_ref().display()
            )));
        }
        Ok(Self { cap_dir })
    }

    fn objects_dir(&self) -> PathBuf {
        self.cap_dir.join("objects")
    }

    fn heads_dir(&self) -> PathBuf {
        self.cap_dir.join("refs").join("heads")
    }
}

impl ObjectLister for FsRemote {
    fn list_objects(&self) -> Result<Vec<ObjectId>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.objects_dir())
            .map_err(|e| Error::remote_unavailable(e.to_string()))?
        {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();

        names
            .iter()
            .map(|name| parse_object_filename(name))
            .collect()
    }
}

impl ObjectFetcher for FsRemote {
    fn get_objects(&self, ids: &[ObjectId]) -> Result<Vec<Vec<u8>>> {
        let mut payloads = Vec::with_capacity(ids.len());
        for id in ids {
            let path = self.objects_dir().join(id.filename());
            if !path.exists() {
                return Err(Error::object_not_found(id.hash.to_hex()));
            }
            payloads.push(fs::read(&path)?);
        }
        Ok(payloads)
    }
}

impl BranchLister for FsRemote {
    fn list_branches(&self) -> Result<Vec<(String, Hash)>> {
        let heads = self.heads_dir();
        let mut branches = Vec::new();

        if !heads.is_dir() {
            return Err(Error::remote_unavailable(format!(
                "refs/heads missing under {}",
                self.cap_dir.display()
            )));
        }

        for entry in fs::read_dir(&heads)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let content = fs::read_to_string(&path)?;
            let trimmed = content.trim();
            if trimmed.is_empty() {
                continue;
            }
            branches.push((name.to_string(), Hash::from_hex(trimmed)?));
        }

        branches.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(branches)
    }
}

impl ObjectSink for FsRemote {
    fn put_objects(&self, objects: &[(ObjectId, Vec<u8>)]) -> Result<()> {
        // Verify the whole batch before touching the store.
        for (id, bytes) in objects {
            let actual = Hash::hash_bytes(bytes);
            if actual != id.hash {
                return Err(Error::hash_mismatch(id.hash.to_hex(), actual.to_hex()));
            }
        }

        let objects_dir = self.objects_dir();
        for (id, bytes) in objects {
            let path = objects_dir.join(id.filename());
            if path.exists() {
                continue;
            }
            let mut temp = tempfile::NamedTempFile::new_in(&objects_dir)?;
            temp.write_all(bytes)?;
            temp.flush()?;
            temp.persist(&path)?;
        }
        Ok(())
    }
}

impl RefUpdater for FsRemote {
    fn set_branch(&self, name: &str, hash: &Hash) -> Result<()> {
        if name.is_empty() || name.contains("..") || name.contains('/') || name.contains('\\') {
            return Err(Error::invalid_ref(format!("invalid branch name: {}", name)));
        }
        let heads = self.heads_dir();
        fs::create_dir_all(&heads)?;

        let mut temp = tempfile::NamedTempFile::new_in(&heads)?;
        temp.write_all(hash.to_hex().as_bytes())?;
        temp.flush()?;
        temp.persist(heads.join(name))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Repository, TRACKED_FILE};
    use tempfile::TempDir;

    fn seeded_repo(temp: &TempDir) -> Repository {
        let repo = Repository::init(temp.path()).unwrap();
        fs::write(temp.path().join(TRACKED_FILE), b"tracked contents").unwrap();
        repo.commit_file("seed").unwrap();
        repo
    }

    #[test]
    fn test_open_requires_repository() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            FsRemote::open(temp.path()),
            Err(Error::RemoteUnavailable { .. })
        ));
    }

    #[test]
    fn test_list_objects_matches_store() {
        let temp = TempDir::new().unwrap();
        let repo = seeded_repo(&temp);
        let remote = FsRemote::open(temp.path()).unwrap();

        let mut from_remote = remote.list_objects().unwrap();
        let mut from_store = repo.list_objects().unwrap();
        from_remote.sort_by_key(|id| id.filename());
        from_store.sort_by_key(|id| id.filename());
        assert_eq!(from_remote, from_store);
    }

    #[test]
    fn test_get_objects_all_or_nothing() {
        let temp = TempDir::new().unwrap();
        let repo = seeded_repo(&temp);
        let remote = FsRemote::open(temp.path()).unwrap();

        let present = repo.list_objects().unwrap();
        let mut request = present.clone();
        request.push(ObjectId::blob(Hash::hash_bytes(b"absent")));

        assert!(matches!(
            remote.get_objects(&request),
            Err(Error::ObjectNotFound { .. })
        ));

        // Present-only requests succeed, payloads in request order.
        let payloads = remote.get_objects(&present).unwrap();
        assert_eq!(payloads.len(), present.len());
        for (id, bytes) in present.iter().zip(&payloads) {
            assert_eq!(Hash::hash_bytes(bytes), id.hash);
        }
    }

    #[test]
    fn test_list_branches_reads_heads() {
        let temp = TempDir::new().unwrap();
        let repo = seeded_repo(&temp);
        let remote = FsRemote::open(temp.path()).unwrap();

        let branches = remote.list_branches().unwrap();
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].0, "master");
        assert_eq!(
            Some(branches[0].1),
            repo.refs().read_branch("master").unwrap()
        );
    }

    #[test]
    fn test_put_objects_verifies_before_writing() {
        let temp = TempDir::new().unwrap();
        let _repo = seeded_repo(&temp);
        let remote = FsRemote::open(temp.path()).unwrap();

        let good = (
            ObjectId::blob(Hash::hash_bytes(b"good")),
            b"good".to_vec(),
        );
        let bad = (
            ObjectId::blob(Hash::hash_bytes(b"claimed")),
            b"forged".to_vec(),
        );

        let before = remote.list_objects().unwrap().len();
        assert!(matches!(
            remote.put_objects(&[good.clone(), bad]),
            Err(Error::HashMismatch { .. })
        ));
        // Batch rejected wholesale: the valid object was not written either.
        assert_eq!(remote.list_objects().unwrap().len(), before);

        remote.put_objects(&[good.clone()]).unwrap();
        assert!(remote.list_objects().unwrap().contains(&good.0));
    }

    #[test]
    fn test_set_branch() {
        let temp = TempDir::new().unwrap();
        let _repo = seeded_repo(&temp);
        let remote = FsRemote::open(temp.path()).unwrap();

        let tip = Hash::hash_bytes(b"new tip");
        remote.set_branch("feature", &tip).unwrap();

        let reopened = Repository::open(temp.path()).unwrap();
        assert_eq!(reopened.refs().read_branch("feature").unwrap(), Some(tip));

        assert!(remote.set_branch("../escape", &tip).is_err());
    }
}
