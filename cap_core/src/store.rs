//! Repository layout and object store I/O.

use crate::commit::Commit;
use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::object::{ObjectId, parse_object_filename};
use crate::refs::RefStore;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Name of the repository directory inside the working directory.
pub const REPO_DIR: &str = ".cap";

/// The single tracked working file.
pub const TRACKED_FILE: &str = "file.txt";

/// Branch created by `init` and pointed at by the initial HEAD.
pub const DEFAULT_BRANCH: &str = "master";

/// Remote name recorded by clone and assumed by pull/push.
pub const DEFAULT_REMOTE: &str = "origin";

/// A repository: a content-addressed object store plus branch refs,
/// rooted at one working directory.
///
/// On disk, everything lives under `<work-dir>/.cap/`:
///
/// ```text
/// .cap/objects/<hex>          raw blob bytes
/// .cap/objects/<hex>.json     canonical commit record
/// .cap/refs/heads/<branch>    hex digest of the branch tip (empty = none)
/// .cap/refs/remote/<r>/<b>    last-synchronized remote tips
/// .cap/HEAD                   name of the current branch
/// .cap/config                 key=value lines (version, remotes)
/// ```
#[derive(Debug)]
pub struct Repository {
    work_dir: PathBuf,
    cap_dir: PathBuf,
}

impl Repository {
    /// Initialize a new repository under the given working directory.
    ///
    /// Creates the working directory if needed, the `.cap` layout, an
    /// empty default branch, and a HEAD pointing at it. Fails if `.cap`
    /// already exists.
    pub fn init<P: AsRef<Path>>(work_dir: P) -> Result<Self> {
        let work_dir = work_dir.as_ref().to_path_buf();
        let cap_dir = work_dir.join(REPO_DIR);

        if cap_dir.exists() {
            return Err(Error::path_exists(&cap_dir));
        }

        fs::create_dir_all(cap_dir.join("objects"))?;
        fs::create_dir_all(cap_dir.join("refs").join("heads"))?;
        fs::create_dir_all(cap_dir.join("refs").join("remote"))?;

        fs::write(cap_dir.join("config"), "version=1\n")?;
        fs::write(cap_dir.join("HEAD"), format!("{}\n", DEFAULT_BRANCH))?;
        // Branch exists but points at no commit yet.
        fs::write(cap_dir.join("refs").join("heads").join(DEFAULT_BRANCH), "")?;

        Ok(Self { work_dir, cap_dir })
    }

    /// Open an existing repository rooted at the given working directory.
    pub fn open<P: AsRef<Path>>(work_dir: P) -> Result<Self> {
        let work_dir = work_dir.as_ref().to_path_buf();
        let cap_dir = work_dir.join(REPO_DIR);

        if !cap_dir.exists() {
            return Err(Error::invalid_repository(
                &work_dir,
                "no .cap directory (run create first)",
            ));
        }

        let config_path = cap_dir.join("config");
        if !config_path.exists() {
            return Err(Error::invalid_repository(&work_dir, "config file not found"));
        }
        let config = fs::read_to_string(&config_path)?;
        Self::check_config_version(&work_dir, &config)?;

        for dir in ["objects", "refs/heads"] {
            if !cap_dir.join(dir).exists() {
                return Err(Error::invalid_repository(
                    &work_dir,
                    format!("{} directory missing", dir),
                ));
            }
        }

        Ok(Self { work_dir, cap_dir })
    }

    fn check_config_version(work_dir: &Path, config: &str) -> Result<()> {
        let version = config_lines(config)
            .find(|(key, _)| *key == "version")
            .map(|(_, value)| value);
        if version != Some("1") {
            return Err(Error::invalid_repository(
                work_dir,
                format!("unsupported config version: {:?}", version),
            ));
        }
        Ok(())
    }

    /// The working directory holding the tracked file.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// The `.cap` directory.
    pub fn cap_dir(&self) -> &Path {
        &self.cap_dir
    }

    /// Path of the tracked working file.
    pub fn tracked_file_path(&self) -> PathBuf {
        self.work_dir.join(TRACKED_FILE)
    }

    /// The ref store for this repository.
    pub fn refs(&self) -> RefStore<'_> {
        RefStore::new(self)
    }

    /// Path of an object file given its identifier.
    pub fn object_path(&self, id: &ObjectId) -> PathBuf {
        self.cap_dir.join("objects").join(id.filename())
    }

    /// Whether the store holds an object.
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.object_path(id).exists()
    }

    /// Store a blob, returning its digest.
    ///
    /// Writing bytes whose digest is already present is a no-op success:
    /// content addressing guarantees the existing bytes are identical.
    pub fn put_blob(&self, bytes: &[u8]) -> Result<Hash> {
        let hash = Hash::hash_bytes(bytes);
        self.write_object(&ObjectId::blob(hash), bytes)?;
        Ok(hash)
    }

    /// Store a commit record, returning its digest.
    pub fn put_commit(&self, commit: &Commit) -> Result<Hash> {
        let bytes = commit.canonical_bytes()?;
        let hash = Hash::hash_bytes(&bytes);
        self.write_object(&ObjectId::commit(hash), &bytes)?;
        Ok(hash)
    }

    /// Retrieve a blob by digest.
    pub fn get_blob(&self, hash: &Hash) -> Result<Vec<u8>> {
        self.get_object_bytes(&ObjectId::blob(*hash))
    }

    /// Retrieve and decode a commit by digest.
    pub fn get_commit(&self, hash: &Hash) -> Result<Commit> {
        let bytes = self.get_object_bytes(&ObjectId::commit(*hash))?;
        Commit::from_bytes(&bytes, hash)
    }

    /// Retrieve an object's raw bytes, verifying them against the digest.
    ///
    /// The store never returns bytes that do not hash to the requested
    /// digest; a corrupted object file surfaces as `HashMismatch`.
    pub fn get_object_bytes(&self, id: &ObjectId) -> Result<Vec<u8>> {
        let path = self.object_path(id);
        if !path.exists() {
            return Err(Error::object_not_found(id.hash.to_hex()));
        }

        let bytes = fs::read(&path)?;
        let actual = Hash::hash_bytes(&bytes);
        if actual != id.hash {
            return Err(Error::hash_mismatch(id.hash.to_hex(), actual.to_hex()));
        }
        Ok(bytes)
    }

    /// Enumerate all stored object identifiers, sorted by filename.
    pub fn list_objects(&self) -> Result<Vec<ObjectId>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.cap_dir.join("objects"))? {
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

    /// Persist externally supplied bytes under a claimed identifier.
    ///
    /// Re-hashes the bytes and rejects with `HashMismatch` if they do not
    /// hash to the claimed digest; a mismatching object is never stored.
    pub fn ingest_object(&self, id: &ObjectId, bytes: &[u8]) -> Result<()> {
        let actual = Hash::hash_bytes(bytes);
        if actual != id.hash {
            return Err(Error::hash_mismatch(id.hash.to_hex(), actual.to_hex()));
        }
        self.write_object(id, bytes)
    }

    /// Write an object atomically; existing objects are left untouched.
    fn write_object(&self, id: &ObjectId, bytes: &[u8]) -> Result<()> {
        let path = self.object_path(id);
        if path.exists() {
            return Ok(());
        }

        let objects_dir = self.cap_dir.join("objects");
        let mut temp = tempfile::NamedTempFile::new_in(&objects_dir)?;
        temp.write_all(bytes)?;
        temp.flush()?;
        temp.persist(&path)?;
        Ok(())
    }

    /// Look up the recorded path of a named remote, if any.
    pub fn remote_path(&self, name: &str) -> Result<Option<PathBuf>> {
        let config = fs::read_to_string(self.cap_dir.join("config"))?;
        let key = format!("remote.{}", name);
        Ok(config_lines(&config)
            .find(|(k, _)| *k == key)
            .map(|(_, value)| PathBuf::from(value)))
    }

    /// Record (or replace) the path of a named remote in the config.
    pub fn record_remote(&self, name: &str, path: &Path) -> Result<()> {
        let config_path = self.cap_dir.join("config");
        let config = fs::read_to_string(&config_path)?;
        let key = format!("remote.{}", name);

        let mut lines: Vec<String> = config
            .lines()
            .filter(|line| {
                config_lines(line)
                    .next()
                    .is_none_or(|(k, _)| k != key.as_str())
            })
            .map(|line| line.to_string())
            .collect();
        lines.push(format!("{}={}", key, path.display()));

        let mut temp = tempfile::NamedTempFile::new_in(&self.cap_dir)?;
        temp.write_all(lines.join("\n").as_bytes())?;
        temp.write_all(b"\n")?;
        temp.flush()?;
        temp.persist(&config_path)?;
        Ok(())
    }
}

/// Iterate the `key=value` pairs of a config file, skipping blanks and
/// `#` comments.
fn config_lines(content: &str) -> impl Iterator<Item = (&str, &str)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim(), v.trim()))
}
