//! Lowest-common-ancestor search over the commit graph.
//!
//! Two breadth-first walks start from the two tips and expand in strict
//! alternation, one commit per turn. Every visited commit is tagged with
//! the side(s) that reached it; the first commit tagged by both walks is
//! the merge base. Alternation is the tie-break when several candidates
//! exist: whichever common commit is reached first wins.
//!
//! The walk is iterative over an explicit frontier, so deep histories do
//! not grow the call stack, and commits are loaded through a caller-supplied
//! closure so the search does not care where commit data lives.

use crate::artifacts::objects::commit::SlimCommit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::error::Result;
use bitflags::bitflags;
use std::collections::{HashMap, VecDeque};

/// Debug logging for the traversal, enabled with the `debug_merge` feature.
macro_rules! debug_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "debug_merge")]
        {
            eprintln!($($arg)*);
        }
    };
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    struct VisitState: u8 {
        const OURS = 0b01;
        const THEIRS = 0b10;
    }
}

pub struct AncestorFinder<CommitLoaderFn>
where
    CommitLoaderFn: Fn(&ObjectId) -> Result<SlimCommit>,
{
    commit_loader: CommitLoaderFn,
}

impl<CommitLoaderFn> AncestorFinder<CommitLoaderFn>
where
    CommitLoaderFn: Fn(&ObjectId) -> Result<SlimCommit>,
{
    pub fn new(commit_loader: CommitLoaderFn) -> Self {
        Self { commit_loader }
    }

    /// Find the merge base of two commits.
    ///
    /// Returns `None` only for histories with no shared root.
    pub fn find_merge_base(
        &self,
        ours: &ObjectId,
        theirs: &ObjectId,
    ) -> Result<Option<ObjectId>> {
        let mut seen: HashMap<ObjectId, VisitState> = HashMap::new();
        let mut our_frontier = VecDeque::from([ours.clone()]);
        let mut their_frontier = VecDeque::from([theirs.clone()]);

        while !our_frontier.is_empty() || !their_frontier.is_empty() {
            if let Some(base) = self.step(&mut our_frontier, VisitState::OURS, &mut seen)? {
                return Ok(Some(base));
            }
            if let Some(base) = self.step(&mut their_frontier, VisitState::THEIRS, &mut seen)? {
                return Ok(Some(base));
            }
        }

        debug_log!("merge base: walks exhausted, histories are unrelated");
        Ok(None)
    }

    /// Expand at most one unvisited commit from one side's frontier.
    fn step(
        &self,
        frontier: &mut VecDeque<ObjectId>,
        side: VisitState,
        seen: &mut HashMap<ObjectId, VisitState>,
    ) -> Result<Option<ObjectId>> {
        while let Some(oid) = frontier.pop_front() {
            let state = seen.entry(oid.clone()).or_default();
            if state.contains(side) {
                continue; // stale frontier entry, already expanded from this side
            }
            state.insert(side);
            debug_log!("merge base: {} visits {} ({:?})", side.bits(), oid, state);

            if state.contains(VisitState::OURS | VisitState::THEIRS) {
                debug_log!("merge base: found {oid}");
                return Ok(Some(oid));
            }

            let commit = (self.commit_loader)(&oid)?;
            for parent in commit.parents {
                frontier.push_back(parent);
            }

            return Ok(None); // expanded exactly one commit this turn
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sha1::{Digest, Sha1};
    use std::collections::HashMap;

    fn oid_of(name: &str) -> ObjectId {
        let mut hasher = Sha1::new();
        hasher.update(name.as_bytes());
        ObjectId::try_parse(format!("{:x}", hasher.finalize())).unwrap()
    }

    /// Build a loader over `(commit, parents)` edges with increasing
    /// timestamps in declaration order.
    fn graph(edges: &[(&str, &[&str])]) -> HashMap<ObjectId, SlimCommit> {
        let start = chrono::DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap();
        edges
            .iter()
            .enumerate()
            .map(|(i, (name, parents))| {
                let oid = oid_of(name);
                let slim = SlimCommit {
                    oid: oid.clone(),
                    parents: parents.iter().map(|p| oid_of(p)).collect(),
                    timestamp: start + chrono::Duration::seconds(i as i64),
                };
                (oid, slim)
            })
            .collect()
    }

    fn find(
        graph: &HashMap<ObjectId, SlimCommit>,
        ours: &str,
        theirs: &str,
    ) -> Option<ObjectId> {
        let finder = AncestorFinder::new(|oid: &ObjectId| Ok(graph[oid].clone()));
        finder
            .find_merge_base(&oid_of(ours), &oid_of(theirs))
            .unwrap()
    }

    #[test]
    fn linear_history_returns_the_older_tip() {
        // a <- b <- c
        let graph = graph(&[("a", &[]), ("b", &["a"]), ("c", &["b"])]);

        assert_eq!(find(&graph, "b", "c"), Some(oid_of("b")));
        assert_eq!(find(&graph, "c", "b"), Some(oid_of("b")));
    }

    #[test]
    fn same_commit_is_its_own_base() {
        let graph = graph(&[("a", &[]), ("b", &["a"])]);
        assert_eq!(find(&graph, "b", "b"), Some(oid_of("b")));
    }

    #[test]
    fn simple_fork_returns_the_fork_point() {
        //     a
        //    / \
        //   b   c
        let graph = graph(&[("a", &[]), ("b", &["a"]), ("c", &["a"])]);
        assert_eq!(find(&graph, "b", "c"), Some(oid_of("a")));
    }

    #[test]
    fn diamond_returns_the_merge_commit() {
        //   a - b - d - e
        //    \   \     /
        //     c - m ---     (e merges m, f continues from m)
        let graph = graph(&[
            ("a", &[]),
            ("b", &["a"]),
            ("c", &["a"]),
            ("m", &["b", "c"]),
            ("e", &["m"]),
            ("f", &["m"]),
        ]);
        assert_eq!(find(&graph, "e", "f"), Some(oid_of("m")));
    }

    #[test]
    fn unrelated_roots_have_no_base() {
        let graph = graph(&[("a", &[]), ("b", &[]), ("c", &["a"]), ("d", &["b"])]);
        assert_eq!(find(&graph, "c", "d"), None);
    }

    #[test]
    fn deep_chain_does_not_recurse() {
        // 500 commits in a line; both tips share the root
        let names: Vec<String> = (0..500).map(|i| format!("c{i}")).collect();
        let mut edges: Vec<(&str, Vec<&str>)> = vec![(names[0].as_str(), vec![])];
        for i in 1..names.len() {
            edges.push((names[i].as_str(), vec![names[i - 1].as_str()]));
        }
        let edges: Vec<(&str, &[&str])> = edges
            .iter()
            .map(|(name, parents)| (*name, parents.as_slice()))
            .collect();
        let graph = graph(&edges);

        assert_eq!(find(&graph, "c499", "c250"), Some(oid_of("c250")));
    }
}
