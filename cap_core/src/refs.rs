//! Branch refs and remote-tracking refs.
//!
//! A ref file's entire contents are the hex digest of the tip commit, or
//! empty for a branch with no commits yet. Local branch refs live under
//! `refs/heads/`; remote-tracking refs under `refs/remote/<remote>/` record
//! the last-observed remote tips and are written only by clone, pull and
//! push, never by a local commit.

use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::store::Repository;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Ref reader/writer for one repository.
pub struct RefStore<'a> {
    repo: &'a Repository,
}

impl<'a> RefStore<'a> {
    pub(crate) fn new(repo: &'a Repository) -> Self {
        Self { repo }
    }

    /// Validate a ref or remote name - no path traversal.
    fn validate_name(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::invalid_ref("name cannot be empty"));
        }
        if name.contains("..") || name.contains('/') || name.contains('\\') {
            return Err(Error::invalid_ref(format!(
                "invalid name: {} (must not contain .. or path separators)",
                name
            )));
        }
        Ok(())
    }

    fn heads_dir(&self) -> PathBuf {
        self.repo.cap_dir().join("refs").join("heads")
    }

    fn branch_path(&self, name: &str) -> Result<PathBuf> {
        Self::validate_name(name)?;
        Ok(self.heads_dir().join(name))
    }

    fn remote_ref_path(&self, remote: &str, branch: &str) -> Result<PathBuf> {
        Self::validate_name(remote)?;
        Self::validate_name(branch)?;
        Ok(self
            .repo
            .cap_dir()
            .join("refs")
            .join("remote")
            .join(remote)
            .join(branch))
    }

    /// Read a branch tip. `None` means the branch has no commits yet or
    /// does not exist.
    pub fn read_branch(&self, name: &str) -> Result<Option<Hash>> {
        let path = self.branch_path(name)?;
        Self::read_ref_file(&path)
    }

    /// Point a branch at a tip commit. Atomic replace: readers never
    /// observe a half-written value.
    pub fn write_branch(&self, name: &str, hash: &Hash) -> Result<()> {
        let path = self.branch_path(name)?;
        Self::write_ref_file(&path, hash)
    }

    /// Read the last-synchronized tip of a remote branch.
    pub fn read_remote(&self, remote: &str, branch: &str) -> Result<Option<Hash>> {
        let path = self.remote_ref_path(remote, branch)?;
        Self::read_ref_file(&path)
    }

    /// Record the last-synchronized tip of a remote branch.
    pub fn write_remote(&self, remote: &str, branch: &str, hash: &Hash) -> Result<()> {
        let path = self.remote_ref_path(remote, branch)?;
        Self::write_ref_file(&path, hash)
    }

    /// List local branches and their tips, sorted by name.
    ///
    /// Branches with no commits yet are omitted: they have no tip to
    /// advertise when this repository serves as a remote.
    pub fn list_branches(&self) -> Result<Vec<(String, Hash)>> {
        let heads = self.heads_dir();
        let mut branches = Vec::new();

        if !heads.exists() {
            return Ok(branches);
        }

        for entry in fs::read_dir(&heads)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str())
                && let Some(hash) = Self::read_ref_file(&path)?
            {
                branches.push((name.to_string(), hash));
            }
        }

        branches.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(branches)
    }

    /// Name of the current branch, from HEAD.
    pub fn head(&self) -> Result<String> {
        let path = self.repo.cap_dir().join("HEAD");
        let name = fs::read_to_string(&path)?.trim().to_string();
        if name.is_empty() {
            return Err(Error::invalid_ref("HEAD names no branch"));
        }
        Ok(name)
    }

    /// Point HEAD at a branch.
    pub fn set_head(&self, name: &str) -> Result<()> {
        Self::validate_name(name)?;
        let cap_dir = self.repo.cap_dir();
        let mut temp = tempfile::NamedTempFile::new_in(cap_dir)?;
        temp.write_all(format!("{}\n", name).as_bytes())?;
        temp.flush()?;
        temp.persist(cap_dir.join("HEAD"))?;
        Ok(())
    }

    fn read_ref_file(path: &Path) -> Result<Option<Hash>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        Ok(Some(Hash::from_hex(trimmed)?))
    }

    fn write_ref_file(path: &Path, hash: &Hash) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::invalid_ref("ref path has no parent"))?;
        fs::create_dir_all(parent)?;

        let mut temp = tempfile::NamedTempFile::new_in(parent)?;
        temp.write_all(hash.to_hex().as_bytes())?;
        temp.flush()?;
        temp.persist(path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DEFAULT_BRANCH;
    use tempfile::TempDir;

    #[test]
    fn test_fresh_branch_reads_none() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::init(temp_dir.path()).unwrap();

        assert_eq!(repo.refs().read_branch(DEFAULT_BRANCH).unwrap(), None);
        assert_eq!(repo.refs().read_branch("unknown").unwrap(), None);
    }

    #[test]
    fn test_write_then_read_branch() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::init(temp_dir.path()).unwrap();
        let refs = repo.refs();

        let tip = Hash::hash_bytes(b"tip");
        refs.write_branch(DEFAULT_BRANCH, &tip).unwrap();
        assert_eq!(refs.read_branch(DEFAULT_BRANCH).unwrap(), Some(tip));

        // File contents are exactly the hex digest.
        let raw = fs::read_to_string(
            repo.cap_dir().join("refs").join("heads").join(DEFAULT_BRANCH),
        )
        .unwrap();
        assert_eq!(raw, tip.to_hex());
    }

    #[test]
    fn test_write_replaces() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::init(temp_dir.path()).unwrap();
        let refs = repo.refs();

        let first = Hash::hash_bytes(b"first");
        let second = Hash::hash_bytes(b"second");
        refs.write_branch(DEFAULT_BRANCH, &first).unwrap();
        refs.write_branch(DEFAULT_BRANCH, &second).unwrap();
        assert_eq!(refs.read_branch(DEFAULT_BRANCH).unwrap(), Some(second));
    }

    #[test]
    fn test_remote_tracking_refs() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::init(temp_dir.path()).unwrap();
        let refs = repo.refs();

        assert_eq!(refs.read_remote("origin", "master").unwrap(), None);

        let tip = Hash::hash_bytes(b"remote tip");
        refs.write_remote("origin", "master", &tip).unwrap();
        assert_eq!(refs.read_remote("origin", "master").unwrap(), Some(tip));

        assert!(
            repo.cap_dir()
                .join("refs/remote/origin/master")
                .exists()
        );
    }

    #[test]
    fn test_list_branches_skips_empty() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::init(temp_dir.path()).unwrap();
        let refs = repo.refs();

        // Fresh repository: master exists but has no tip.
        assert!(refs.list_branches().unwrap().is_empty());

        let tip = Hash::hash_bytes(b"tip");
        refs.write_branch("feature", &tip).unwrap();
        refs.write_branch(DEFAULT_BRANCH, &tip).unwrap();

        let branches = refs.list_branches().unwrap();
        assert_eq!(branches.len(), 2);
        assert_eq!(branches[0].0, "feature");
        assert_eq!(branches[1].0, DEFAULT_BRANCH);
    }

    #[test]
    fn test_head() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::init(temp_dir.path()).unwrap();
        let refs = repo.refs();

        assert_eq!(refs.head().unwrap(), DEFAULT_BRANCH);
        refs.set_head("feature").unwrap();
        assert_eq!(refs.head().unwrap(), "feature");
    }

    #[test]
    fn test_invalid_names_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::init(temp_dir.path()).unwrap();
        let refs = repo.refs();
        let tip = Hash::hash_bytes(b"tip");

        assert!(refs.write_branch("../etc/passwd", &tip).is_err());
        assert!(refs.write_branch("foo/bar", &tip).is_err());
        assert!(refs.write_branch("", &tip).is_err());
        assert!(refs.write_remote("bad/remote", "master", &tip).is_err());
    }

    #[test]
    fn test_garbage_ref_contents_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::init(temp_dir.path()).unwrap();

        fs::write(
            repo.cap_dir().join("refs/heads/master"),
            "definitely not hex",
        )
        .unwrap();
        assert!(repo.refs().read_branch("master").is_err());
    }

    // Property-based tests
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            max_shrink_iters: 1000,
            ..ProptestConfig::default()
        })]

        /// Valid branch names round-trip through write/read
        #[test]
        fn prop_valid_branch_names_roundtrip(
            name in "[a-zA-Z0-9_-]{1,50}"
                .prop_filter("no traversal", |n| !n.contains(".."))
        ) {
            let temp_dir = TempDir::new().unwrap();
            let repo = Repository::init(temp_dir.path()).unwrap();
            let refs = repo.refs();

            let tip = Hash::hash_bytes(name.as_bytes());
            refs.write_branch(&name, &tip)?;
            prop_assert_eq!(refs.read_branch(&name)?, Some(tip));
        }
    }
}
