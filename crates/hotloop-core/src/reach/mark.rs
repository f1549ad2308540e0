//! Cache entries backing the invocation graph
//!
//! One [`MarkInfo`] per method signature key. Entries record the computed
//! verdict, the witness path behind a positive verdict, and back-references
//! to every caller that consulted them, so a change in a callee can flag
//! its transitive callers for recomputation without recomputing them.

use std::collections::HashSet;

use id_arena::{Arena, Id};

use crate::reach::CallSite;
use crate::syntax::TreeId;

pub type MarkId = Id<MarkInfo>;

#[derive(Debug)]
pub struct MarkInfo {
    /// Signature key of the method this entry answers for.
    pub key: String,
    /// Identity of the parse that backed the answer.
    pub tree: TreeId,
    pub verdict: bool,
    /// Root-first call path proving a `true` verdict, empty otherwise.
    pub witness: Vec<CallSite>,
    pub dirty: bool,
    /// Callers that consulted this entry. Back-references only; never
    /// cleared, so later invalidations reach every past caller.
    pub parents: HashSet<MarkId>,
}

impl MarkInfo {
    pub fn new(key: String, tree: TreeId) -> Self {
        Self {
            key,
            tree,
            verdict: false,
            witness: Vec::new(),
            dirty: false,
            parents: HashSet::new(),
        }
    }

    /// Drop the computed answer, keeping identity and parent links.
    pub fn reset(&mut self) {
        self.verdict = false;
        self.dirty = false;
        self.witness.clear();
    }

    /// Re-point the entry at a newer parse and drop the answer.
    pub fn retarget(&mut self, tree: TreeId) {
        self.tree = tree;
        self.reset();
    }
}

/// Flags every transitive caller of `origin` as dirty. Walks the parent
/// back-references with a worklist; an entry's link to itself is skipped at
/// that level, and already-dirty entries stop the walk, which also bounds
/// it on cyclic graphs. The origin itself can be re-flagged through a
/// longer cycle, matching how recomputation discovers such cycles.
pub(crate) fn set_parents_dirty(marks: &mut Arena<MarkInfo>, origin: MarkId) {
    let mut worklist: Vec<(MarkId, MarkId)> = marks[origin]
        .parents
        .iter()
        .map(|&parent| (origin, parent))
        .collect();

    while let Some((owner, parent)) = worklist.pop() {
        if parent == owner || marks[parent].dirty {
            continue;
        }
        marks[parent].dirty = true;
        worklist.extend(marks[parent].parents.iter().map(|&p| (parent, p)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::TreeId;

    fn entry(marks: &mut Arena<MarkInfo>, key: &str) -> MarkId {
        marks.alloc(MarkInfo::new(key.to_string(), TreeId::fresh()))
    }

    fn link(marks: &mut Arena<MarkInfo>, child: MarkId, parent: MarkId) {
        marks[child].parents.insert(parent);
    }

    #[test]
    fn dirty_propagates_up_a_chain() {
        let mut marks = Arena::new();
        let a = entry(&mut marks, "A.M/0");
        let b = entry(&mut marks, "B.M/0");
        let c = entry(&mut marks, "C.M/0");
        link(&mut marks, c, b);
        link(&mut marks, b, a);

        set_parents_dirty(&mut marks, c);

        assert!(!marks[c].dirty);
        assert!(marks[b].dirty);
        assert!(marks[a].dirty);
    }

    #[test]
    fn already_dirty_parent_stops_the_walk() {
        let mut marks = Arena::new();
        let a = entry(&mut marks, "A.M/0");
        let b = entry(&mut marks, "B.M/0");
        let c = entry(&mut marks, "C.M/0");
        link(&mut marks, c, b);
        link(&mut marks, b, a);
        marks[b].dirty = true;

        set_parents_dirty(&mut marks, c);

        assert!(!marks[a].dirty, "walk stops at an already dirty entry");
    }

    #[test]
    fn self_parent_is_skipped() {
        let mut marks = Arena::new();
        let a = entry(&mut marks, "A.M/0");
        link(&mut marks, a, a);

        set_parents_dirty(&mut marks, a);

        assert!(!marks[a].dirty);
    }

    #[test]
    fn cycle_re_flags_the_origin() {
        let mut marks = Arena::new();
        let a = entry(&mut marks, "A.M/0");
        let b = entry(&mut marks, "B.M/0");
        link(&mut marks, a, b);
        link(&mut marks, b, a);

        set_parents_dirty(&mut marks, a);

        assert!(marks[b].dirty);
        assert!(marks[a].dirty, "origin is reachable through the cycle");
    }

    #[test]
    fn reset_keeps_tree_and_parents() {
        let mut marks = Arena::new();
        let a = entry(&mut marks, "A.M/0");
        let b = entry(&mut marks, "B.M/0");
        link(&mut marks, a, b);
        let tree = marks[a].tree;
        marks[a].verdict = true;
        marks[a].dirty = true;

        marks[a].reset();

        assert!(!marks[a].verdict);
        assert!(!marks[a].dirty);
        assert!(marks[a].witness.is_empty());
        assert_eq!(marks[a].tree, tree);
        assert!(marks[a].parents.contains(&b));
    }

    #[test]
    fn retarget_swaps_tree_and_resets() {
        let mut marks = Arena::new();
        let a = entry(&mut marks, "A.M/0");
        let old_tree = marks[a].tree;
        marks[a].verdict = true;
        let new_tree = TreeId::fresh();

        marks[a].retarget(new_tree);

        assert_ne!(marks[a].tree, old_tree);
        assert_eq!(marks[a].tree, new_tree);
        assert!(!marks[a].verdict);
    }
}
