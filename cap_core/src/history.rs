//! Commit graph walks and branch relationship classification.
//!
//! Each commit points at exactly one parent (or none), so a branch's
//! history is a simple backward chain. Walks still carry a visited set:
//! commit data ingested from a remote is untrusted until proven acyclic,
//! and a repeat digest before the terminal marker is `CorruptHistory`
//! rather than an infinite loop.

use crate::commit::Commit;
use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::store::Repository;
use std::collections::{HashMap, HashSet};

/// Lazy walk over a commit chain, tip first.
///
/// Yields `(digest, commit)` pairs until the first commit's empty parent
/// marker is reached. Fails with `CorruptHistory` on a repeated digest and
/// stops after the first error.
pub struct History<'a> {
    repo: &'a Repository,
    cursor: Option<Hash>,
    seen: HashSet<Hash>,
    failed: bool,
}

impl Iterator for History<'_> {
    type Item = Result<(Hash, Commit)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let hash = self.cursor?;

        if !self.seen.insert(hash) {
            self.failed = true;
            return Some(Err(Error::corrupt_history(
                hash.to_hex(),
                "digest repeats in parent chain",
            )));
        }

        match self.repo.get_commit(&hash) {
            Ok(commit) => {
                self.cursor = commit.previous;
                Some(Ok((hash, commit)))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// How a local branch tip relates to its remote counterpart.
///
/// Terminal: once computed for a pair of tips there is no further
/// transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefRelation {
    /// Same tip on both sides.
    Equal,
    /// Local tip strictly extends the remote tip.
    Ahead,
    /// Remote tip strictly extends the local tip.
    Behind,
    /// Common ancestor at best; neither tip is an ancestor of the other.
    Diverged,
}

impl Repository {
    /// Walk history from a tip, lazily.
    pub fn history(&self, tip: &Hash) -> History<'_> {
        History {
            repo: self,
            cursor: Some(*tip),
            seen: HashSet::new(),
            failed: false,
        }
    }

    /// Collect the digests of a chain, tip first. An absent tip yields an
    /// empty chain.
    pub fn chain(&self, tip: Option<&Hash>) -> Result<Vec<Hash>> {
        let Some(tip) = tip else {
            return Ok(Vec::new());
        };
        let mut digests = Vec::new();
        for step in self.history(tip) {
            let (hash, _) = step?;
            digests.push(hash);
        }
        Ok(digests)
    }

    /// Lowest commit present in both chains by identity, or `None` when
    /// the chains share no history.
    pub fn find_common_ancestor(&self, tip_a: &Hash, tip_b: &Hash) -> Result<Option<Hash>> {
        let in_a: HashSet<Hash> = self.chain(Some(tip_a))?.into_iter().collect();
        for step in self.history(tip_b) {
            let (hash, _) = step?;
            if in_a.contains(&hash) {
                return Ok(Some(hash));
            }
        }
        Ok(None)
    }
}

/// Classify two chains (tip first) against each other.
///
/// Pure over the chains; pull and push both reduce to this.
pub fn classify(local: &[Hash], remote: &[Hash]) -> RefRelation {
    match (local.first(), remote.first()) {
        (None, None) => RefRelation::Equal,
        (None, Some(_)) => RefRelation::Behind,
        (Some(_), None) => RefRelation::Ahead,
        (Some(l), Some(r)) if l == r => RefRelation::Equal,
        (Some(l), Some(r)) => {
            if remote.contains(l) {
                RefRelation::Behind
            } else if local.contains(r) {
                RefRelation::Ahead
            } else {
                RefRelation::Diverged
            }
        }
    }
}

/// Check that the chain from `tip` through an in-memory commit set is
/// acyclic and fully connected.
///
/// Used when ingesting a whole graph from an untrusted remote, before
/// anything is persisted: every parent must be present and no digest may
/// repeat.
pub(crate) fn verify_chain(tip: &Hash, commits: &HashMap<Hash, Commit>) -> Result<()> {
    let mut seen = HashSet::new();
    let mut cursor = Some(*tip);

    while let Some(hash) = cursor {
        if !seen.insert(hash) {
            return Err(Error::corrupt_history(
                hash.to_hex(),
                "digest repeats in parent chain",
            ));
        }
        let commit = commits.get(&hash).ok_or_else(|| {
            Error::corrupt_history(hash.to_hex(), "parent chain references a missing commit")
        })?;
        cursor = commit.previous;
    }
    Ok(())
}
