//! Lazy ancestor traversal.
//!
//! Yields a commit and its transitive parents in reverse-chronological
//! order, ties broken by id. The walk is iterative over an explicit frontier
//! heap of slim commits, pulling each full commit from the store only when
//! yielded, and every [`RevList`] starts a fresh traversal: nothing is
//! shared or cached across calls.

use crate::areas::database::CommitCache;
use crate::areas::repository::Repository;
use crate::artifacts::branch::revision::Revision;
use crate::artifacts::objects::commit::{Commit, SlimCommit};
use crate::artifacts::objects::object_id::ObjectId;
use crate::error::Result;
use derive_new::new;
use std::collections::{BinaryHeap, HashSet};

#[derive(new)]
pub struct RevList<'r> {
    repository: &'r Repository,
    start: Revision,
}

impl<'r> RevList<'r> {
    pub fn into_iter(self) -> Result<RevListIter<'r>> {
        let start_oid = self.start.resolve(self.repository)?;

        let cache = CommitCache::new();
        let slim = cache.get_or_load(self.repository.database(), &start_oid)?;

        let mut frontier = BinaryHeap::new();
        frontier.push(slim);

        Ok(RevListIter {
            repository: self.repository,
            cache,
            frontier,
            enqueued: HashSet::from([start_oid]),
        })
    }
}

pub struct RevListIter<'r> {
    repository: &'r Repository,
    cache: CommitCache,
    /// Max-heap on (timestamp, id): pops the newest commit first
    frontier: BinaryHeap<SlimCommit>,
    /// Ids ever pushed, so diamonds are yielded once
    enqueued: HashSet<ObjectId>,
}

impl Iterator for RevListIter<'_> {
    type Item = Commit;

    fn next(&mut self) -> Option<Self::Item> {
        let slim = self.frontier.pop()?;

        for parent in &slim.parents {
            if self.enqueued.contains(parent) {
                continue;
            }
            match self.cache.get_or_load(self.repository.database(), parent) {
                Ok(parent_slim) => {
                    self.enqueued.insert(parent.clone());
                    self.frontier.push(parent_slim);
                }
                Err(_) => return None, // broken graph ends the walk
            }
        }

        match self.repository.database().parse_object_as_commit(&slim.oid) {
            Ok(Some(commit)) => Some(commit),
            _ => None,
        }
    }
}
