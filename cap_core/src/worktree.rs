//! Working-file snapshot and materialization.

use crate::commit::Commit;
use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::store::Repository;
use std::fs;
use std::io::Write;

impl Repository {
    /// Snapshot the tracked file as a new commit on the current branch.
    ///
    /// Stores the file's bytes as a blob, writes a commit pointing at the
    /// blob and the previous branch tip, and advances the branch ref.
    /// Returns the new commit's digest.
    pub fn commit_file(&self, message: &str) -> Result<Hash> {
        let path = self.tracked_file_path();
        if !path.exists() {
            return Err(Error::Io {
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("nothing to commit: {} not found", path.display()),
                ),
            });
        }
        let bytes = fs::read(&path)?;
        let root = self.put_blob(&bytes)?;

        let branch = self.refs().head()?;
        let previous = self.refs().read_branch(&branch)?;
        let commit = Commit::new(root, previous, message);
        let hash = self.put_commit(&commit)?;

        self.refs().write_branch(&branch, &hash)?;
        Ok(hash)
    }

    /// Materialize the current branch tip's snapshot into the tracked
    /// file, replacing it atomically. Returns the tip digest, or `None`
    /// when the branch has no commits yet.
    pub fn checkout_file(&self) -> Result<Option<Hash>> {
        let branch = self.refs().head()?;
        let Some(tip) = self.refs().read_branch(&branch)? else {
            return Ok(None);
        };

        let commit = self.get_commit(&tip)?;
        let bytes = self.get_blob(&commit.root)?;

        let mut temp = tempfile::NamedTempFile::new_in(self.work_dir())?;
        temp.write_all(&bytes)?;
        temp.flush()?;
        temp.persist(self.tracked_file_path())?;
        Ok(Some(tip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DEFAULT_BRANCH, TRACKED_FILE};
    use tempfile::TempDir;

    #[test]
    fn test_commit_file_advances_branch() {
        let temp = TempDir::new().unwrap();
        let repo = Repository::init(temp.path()).unwrap();
        fs::write(temp.path().join(TRACKED_FILE), b"version 1").unwrap();

        let first = repo.commit_file("first").unwrap();
        assert_eq!(repo.refs().read_branch(DEFAULT_BRANCH).unwrap(), Some(first));

        let stored = repo.get_commit(&first).unwrap();
        assert_eq!(stored.previous, None);
        assert_eq!(repo.get_blob(&stored.root).unwrap(), b"version 1");

        fs::write(temp.path().join(TRACKED_FILE), b"version 2").unwrap();
        let second = repo.commit_file("second").unwrap();
        assert_eq!(
            repo.refs().read_branch(DEFAULT_BRANCH).unwrap(),
            Some(second)
        );
        assert_eq!(repo.get_commit(&second).unwrap().previous, Some(first));
    }

    #[test]
    fn test_commit_file_missing_tracked_file() {
        let temp = TempDir::new().unwrap();
        let repo = Repository::init(temp.path()).unwrap();
        assert!(repo.commit_file("nothing there").is_err());
    }

    #[test]
    fn test_checkout_restores_tip_contents() {
        let temp = TempDir::new().unwrap();
        let repo = Repository::init(temp.path()).unwrap();
        fs::write(temp.path().join(TRACKED_FILE), b"committed state").unwrap();
        let tip = repo.commit_file("snapshot").unwrap();

        fs::write(temp.path().join(TRACKED_FILE), b"scribbled over").unwrap();
        let restored = repo.checkout_file().unwrap();
        assert_eq!(restored, Some(tip));
        assert_eq!(
            fs::read(temp.path().join(TRACKED_FILE)).unwrap(),
            b"committed state"
        );
    }

    #[test]
    fn test_checkout_empty_branch_is_noop() {
        let temp = TempDir::new().unwrap();
        let repo = Repository::init(temp.path()).unwrap();
        assert_eq!(repo.checkout_file().unwrap(), None);
        assert!(!temp.path().join(TRACKED_FILE).exists());
    }

    #[test]
    fn test_history_of_local_commits_terminates() {
        let temp = TempDir::new().unwrap();
        let repo = Repository::init(temp.path()).unwrap();

        let mut tips = Vec::new();
        for i in 0..5 {
            fs::write(temp.path().join(TRACKED_FILE), format!("rev {}", i)).unwrap();
            tips.push(repo.commit_file(&format!("rev {}", i)).unwrap());
        }

        let walked: Vec<Hash> = repo
            .history(tips.last().unwrap())
            .map(|step| step.unwrap().0)
            .collect();
        tips.reverse();
        assert_eq!(walked, tips);
    }
}
