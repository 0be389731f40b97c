//! Clone, pull and push.
//!
//! All three follow the same discipline: transfer, then verify, then
//! apply. Every byte fetched from a remote is re-hashed against its
//! advertised digest before it is persisted, and refs move only after all
//! required objects are safely in the store. A verification failure
//! leaves the local object store and ref store exactly as they were.

use crate::commit::Commit;
use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::history::{RefRelation, verify_chain};
use crate::object::{ObjectId, ObjectKind};
use crate::remote::{BranchLister, ObjectFetcher, ObjectLister, ObjectSink, RefUpdater};
use crate::store::Repository;
use log::{debug, info};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Outcome of a pull or push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// How the local branch related to the remote branch.
    pub relation: RefRelation,
    /// Objects actually transferred (commits plus blobs).
    pub objects_transferred: usize,
}

impl SyncReport {
    fn no_op(relation: RefRelation) -> Self {
        SyncReport {
            relation,
            objects_transferred: 0,
        }
    }
}

/// Bootstrap a new repository from a remote.
///
/// Initializes an empty repository at `dest`, fetches the remote's entire
/// inventory, verifies every payload against its advertised digest and
/// every branch chain for connectivity and acyclicity, and only then
/// persists objects and writes refs. On any failure the partially created
/// repository is removed, so nothing from the attempt remains.
pub fn clone_repository<R>(remote: &R, dest: &Path, remote_name: &str) -> Result<Repository>
where
    R: ObjectLister + ObjectFetcher + BranchLister,
{
    let repo = Repository::init(dest)?;
    match clone_into(remote, &repo, remote_name) {
        Ok(()) => Ok(repo),
        Err(e) => {
            // Roll the bootstrap back; the attempt must leave no trace.
            let _ = std::fs::remove_dir_all(repo.cap_dir());
            Err(e)
        }
    }
}

fn clone_into<R>(remote: &R, repo: &Repository, remote_name: &str) -> Result<()>
where
    R: ObjectLister + ObjectFetcher + BranchLister,
{
    let ids = remote.list_objects()?;
    debug!("clone: remote advertises {} objects", ids.len());

    let payloads = if ids.is_empty() {
        Vec::new()
    } else {
        remote.get_objects(&ids)?
    };

    // Verify every payload before anything is persisted.
    let mut commits: HashMap<Hash, Commit> = HashMap::new();
    for (id, bytes) in ids.iter().zip(&payloads) {
        let actual = Hash::hash_bytes(bytes);
        if actual != id.hash {
            return Err(Error::hash_mismatch(id.hash.to_hex(), actual.to_hex()));
        }
        if id.kind == ObjectKind::Commit {
            commits.insert(id.hash, Commit::from_bytes(bytes, &id.hash)?);
        }
    }

    // Every commit must snapshot a blob the inventory actually contains,
    // and every branch chain must be connected and acyclic.
    let blobs: HashSet<Hash> = ids
        .iter()
        .filter(|id| id.kind == ObjectKind::Blob)
        .map(|id| id.hash)
        .collect();
    for (hash, commit) in &commits {
        if !blobs.contains(&commit.root) {
            return Err(Error::corrupt_history(
                hash.to_hex(),
                "commit references a missing snapshot",
            ));
        }
    }
    let branches = remote.list_branches()?;
    for (_name, tip) in &branches {
        verify_chain(tip, &commits)?;
    }

    for (id, bytes) in ids.iter().zip(&payloads) {
        repo.ingest_object(id, bytes)?;
    }
    info!("clone: persisted {} verified objects", ids.len());

    for (name, tip) in &branches {
        repo.refs().write_remote(remote_name, name, tip)?;
    }

    // Point the local default branch at its remote-tracking counterpart.
    // If the remote does not have our default branch, adopt its first
    // branch as HEAD.
    let head = repo.refs().head()?;
    let default = branches
        .iter()
        .find(|(name, _)| *name == head)
        .or_else(|| branches.first());
    if let Some((name, tip)) = default {
        repo.refs().set_head(name)?;
        repo.refs().write_branch(name, tip)?;
        repo.checkout_file()?;
        info!("clone: checked out {} at {}", name, tip);
    }

    Ok(())
}

/// Reconcile the current local branch with its counterpart on the remote.
///
/// - `Equal`: nothing to do.
/// - `Ahead`: nothing to transfer; push is what would advance the remote.
/// - `Behind`: fetch the missing objects, verify, persist, fast-forward
///   the branch ref and the remote-tracking ref.
/// - `Diverged`: fail with `DivergedHistory`, mutating nothing. No merge
///   operation exists, so divergence is terminal for pull.
pub fn pull<R>(repo: &Repository, remote: &R, remote_name: &str) -> Result<SyncReport>
where
    R: ObjectFetcher + BranchLister,
{
    let branch = repo.refs().head()?;
    let local_tip = repo.refs().read_branch(&branch)?;
    let remote_tip = remote_branch_tip(remote, &branch)?;

    if local_tip == Some(remote_tip) {
        debug!("pull: {} already at {}", branch, remote_tip);
        return Ok(SyncReport::no_op(RefRelation::Equal));
    }

    let local_chain: HashSet<Hash> = repo.chain(local_tip.as_ref())?.into_iter().collect();
    if local_chain.contains(&remote_tip) {
        debug!("pull: {} is ahead of remote", branch);
        return Ok(SyncReport::no_op(RefRelation::Ahead));
    }

    // Walk the remote chain back from its tip, collecting everything that
    // is missing locally, until we either reach our own tip (behind) or
    // run out of history (diverged).
    let mut incoming: Vec<(ObjectId, Vec<u8>)> = Vec::new();
    let mut seen = HashSet::new();
    let mut cursor = Some(remote_tip);

    while let Some(hash) = cursor {
        if local_tip == Some(hash) {
            // Fast-forward: everything between the tips is in `incoming`.
            return apply_fast_forward(repo, remote_name, &branch, remote_tip, incoming);
        }
        if local_chain.contains(&hash) {
            // Reached shared history without passing our tip: diverged.
            return Err(diverged(&local_tip, &remote_tip));
        }
        if !seen.insert(hash) {
            return Err(Error::corrupt_history(
                hash.to_hex(),
                "digest repeats in parent chain",
            ));
        }

        let commit = fetch_commit(repo, remote, &hash, &mut incoming)?;
        if !repo.contains(&ObjectId::blob(commit.root)) {
            fetch_blob(remote, &commit.root, &mut incoming)?;
        }
        cursor = commit.previous;
    }

    match local_tip {
        // The remote chain bottomed out without meeting ours.
        Some(_) => Err(diverged(&local_tip, &remote_tip)),
        // No local history at all: the whole remote chain fast-forwards.
        None => apply_fast_forward(repo, remote_name, &branch, remote_tip, incoming),
    }
}

/// Mirror of pull with the local and remote roles exchanged.
///
/// Requires the remote's write capabilities (`ObjectSink`, `RefUpdater`),
/// which the read-only capability set does not include; the filesystem
/// remote provides them for same-machine peers. Push fails on divergence
/// exactly as pull does - there is no force variant.
pub fn push<R>(repo: &Repository, remote: &R, remote_name: &str) -> Result<SyncReport>
where
    R: ObjectLister + ObjectFetcher + BranchLister + ObjectSink + RefUpdater,
{
    let branch = repo.refs().head()?;
    let local_tip = repo.refs().read_branch(&branch)?;
    let remote_tip = remote
        .list_branches()?
        .into_iter()
        .find(|(name, _)| *name == branch)
        .map(|(_, tip)| tip);

    let Some(local_tip) = local_tip else {
        // Nothing committed locally; nothing to send.
        let relation = match remote_tip {
            None => RefRelation::Equal,
            Some(_) => RefRelation::Behind,
        };
        return Ok(SyncReport::no_op(relation));
    };

    if remote_tip == Some(local_tip) {
        debug!("push: {} already at {}", branch, local_tip);
        return Ok(SyncReport::no_op(RefRelation::Equal));
    }

    let local_chain = repo.chain(Some(&local_tip))?;
    if let Some(rt) = remote_tip
        && !local_chain.contains(&rt)
    {
        // The remote tip is not ours to extend: either we are behind it,
        // or the histories have diverged.
        let local_set: HashSet<Hash> = local_chain.iter().copied().collect();
        let mut seen = HashSet::new();
        let mut cursor = Some(rt);
        while let Some(hash) = cursor {
            if hash == local_tip {
                debug!("push: {} is behind remote", branch);
                return Ok(SyncReport::no_op(RefRelation::Behind));
            }
            if local_set.contains(&hash) {
                return Err(diverged(&Some(local_tip), &rt));
            }
            if !seen.insert(hash) {
                return Err(Error::corrupt_history(
                    hash.to_hex(),
                    "digest repeats in parent chain",
                ));
            }
            let bytes = fetch_one(remote, &ObjectId::commit(hash))?;
            let actual = Hash::hash_bytes(&bytes);
            if actual != hash {
                return Err(Error::hash_mismatch(hash.to_hex(), actual.to_hex()));
            }
            cursor = Commit::from_bytes(&bytes, &hash)?.previous;
        }
        return Err(diverged(&Some(local_tip), &rt));
    }

    // Remote is strictly behind (or empty): send everything between our
    // tip and theirs that their inventory does not already hold.
    let inventory: HashSet<ObjectId> = remote.list_objects()?.into_iter().collect();
    let mut outgoing: Vec<(ObjectId, Vec<u8>)> = Vec::new();

    for hash in &local_chain {
        if remote_tip == Some(*hash) {
            break;
        }
        let commit_id = ObjectId::commit(*hash);
        let commit = repo.get_commit(hash)?;
        if !inventory.contains(&commit_id) {
            outgoing.push((commit_id, repo.get_object_bytes(&commit_id)?));
        }
        let blob_id = ObjectId::blob(commit.root);
        if !inventory.contains(&blob_id) {
            outgoing.push((blob_id, repo.get_object_bytes(&blob_id)?));
        }
    }

    let transferred = outgoing.len();
    remote.put_objects(&outgoing)?;
    remote.set_branch(&branch, &local_tip)?;
    repo.refs().write_remote(remote_name, &branch, &local_tip)?;
    info!(
        "push: advanced remote {} to {} ({} objects)",
        branch, local_tip, transferred
    );

    Ok(SyncReport {
        relation: RefRelation::Ahead,
        objects_transferred: transferred,
    })
}

/// Resolve the remote's tip for a branch.
fn remote_branch_tip<R: BranchLister>(remote: &R, branch: &str) -> Result<Hash> {
    remote
        .list_branches()?
        .into_iter()
        .find(|(name, _)| name == branch)
        .map(|(_, tip)| tip)
        .ok_or_else(|| Error::branch_not_found(branch))
}

/// Fetch a single object's payload from the remote.
fn fetch_one<R: ObjectFetcher>(remote: &R, id: &ObjectId) -> Result<Vec<u8>> {
    remote
        .get_objects(std::slice::from_ref(id))?
        .into_iter()
        .next()
        .ok_or_else(|| Error::remote_unavailable(format!("remote returned no payload for {}", id)))
}

/// Fetch and verify a commit, queueing its bytes unless already local.
fn fetch_commit<R: ObjectFetcher>(
    repo: &Repository,
    remote: &R,
    hash: &Hash,
    incoming: &mut Vec<(ObjectId, Vec<u8>)>,
) -> Result<Commit> {
    let id = ObjectId::commit(*hash);
    if repo.contains(&id) {
        return repo.get_commit(hash);
    }

    let bytes = fetch_one(remote, &id)?;
    let actual = Hash::hash_bytes(&bytes);
    if actual != *hash {
        return Err(Error::hash_mismatch(hash.to_hex(), actual.to_hex()));
    }
    let commit = Commit::from_bytes(&bytes, hash)?;
    incoming.push((id, bytes));
    Ok(commit)
}

/// Fetch and verify a blob, queueing its bytes.
fn fetch_blob<R: ObjectFetcher>(
    remote: &R,
    hash: &Hash,
    incoming: &mut Vec<(ObjectId, Vec<u8>)>,
) -> Result<()> {
    let id = ObjectId::blob(*hash);
    let bytes = fetch_one(remote, &id)?;
    let actual = Hash::hash_bytes(&bytes);
    if actual != *hash {
        return Err(Error::hash_mismatch(hash.to_hex(), actual.to_hex()));
    }
    incoming.push((id, bytes));
    Ok(())
}

/// Persist verified objects, then move the refs.
fn apply_fast_forward(
    repo: &Repository,
    remote_name: &str,
    branch: &str,
    remote_tip: Hash,
    incoming: Vec<(ObjectId, Vec<u8>)>,
) -> Result<SyncReport> {
    let transferred = incoming.len();
    for (id, bytes) in &incoming {
        repo.ingest_object(id, bytes)?;
    }
    repo.refs().write_branch(branch, &remote_tip)?;
    repo.refs().write_remote(remote_name, branch, &remote_tip)?;
    info!(
        "pull: fast-forwarded {} to {} ({} objects)",
        branch, remote_tip, transferred
    );

    Ok(SyncReport {
        relation: RefRelation::Behind,
        objects_transferred: transferred,
    })
}

fn diverged(local: &Option<Hash>, remote: &Hash) -> Error {
    Error::diverged_history(
        local.map(|h| h.to_hex()).unwrap_or_else(|| "-".to_string()),
        remote.to_hex(),
    )
}
