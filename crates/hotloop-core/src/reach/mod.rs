//! Cycle-safe, incrementally invalidated call-graph reachability
//!
//! Frame-path rules keep asking the same expensive question: does this
//! method, or anything it transitively calls, contain a node the rule cares
//! about? An [`InvocationGraph`] memoizes the answer per method signature,
//! together with the call path that proves a positive answer. Edits do not
//! recompute the world: each cache entry carries back-references to its
//! callers, and a changed method flags its transitive callers for lazy
//! recomputation on their next query.
//!
//! Cycles are cut by inserting a `false` entry for a method before its
//! callees are explored; a recursive edge replays that provisional answer
//! instead of descending again. A depth cap backstops pathological chains.

mod mark;

pub use mark::{MarkId, MarkInfo};

use std::collections::{HashMap, VecDeque};

use id_arena::Arena;
use tracing::warn;

use crate::parser::SourceFile;
use crate::rules::RuleCtx;
use crate::sem::{CallTarget, ClassSymId, DeclRef};
use crate::syntax::NodeId;

/// Longest call chain a single query will follow before giving up.
pub const MAX_SEARCH_DEPTH: usize = 32;

/// One hop of a witness path: a call site, or for the innermost hop, the
/// node the predicate matched. Positions and text are materialized at
/// capture time so cached paths survive re-parses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub file: String,
    pub node: NodeId,
    pub line: usize,
    pub column: usize,
    pub text: String,
}

impl CallSite {
    pub fn capture(file: &SourceFile, node: NodeId) -> Self {
        let span = file.tree().node(node).span;
        let (line, column) = file.line_col(span.lo);
        Self {
            file: file.path().to_string(),
            node,
            line,
            column,
            text: file.snippet(span).to_string(),
        }
    }
}

/// Rule-specific match function. Returns the offending node inside the
/// given declaration, if any. Must be pure: same declaration, same answer.
pub type Predicate = Box<dyn Fn(&RuleCtx<'_>, DeclRef) -> Option<NodeId>>;

/// One reachability engine, owned by one rule. Cache entries accumulate for
/// the life of the graph and are never evicted; a host running an unbounded
/// session should drop the rule instance to release them.
pub struct InvocationGraph {
    rule_id: &'static str,
    predicate: Predicate,
    marks: Arena<MarkInfo>,
    by_key: HashMap<String, MarkId>,
    stack: Vec<String>,
}

impl InvocationGraph {
    pub fn new(
        rule_id: &'static str,
        predicate: impl Fn(&RuleCtx<'_>, DeclRef) -> Option<NodeId> + 'static,
    ) -> Self {
        Self {
            rule_id,
            predicate: Box::new(predicate),
            marks: Arena::new(),
            by_key: HashMap::new(),
            stack: Vec::new(),
        }
    }

    pub fn rule_id(&self) -> &'static str {
        self.rule_id
    }

    /// Queries reachability from `decl`. Returns the witness path from the
    /// query root down to the matched node when something is reachable.
    pub fn search(&mut self, ctx: &RuleCtx<'_>, decl: DeclRef) -> Option<Vec<CallSite>> {
        let mut hierarchy = VecDeque::new();
        if self.search_from(ctx, decl, &mut hierarchy, None) {
            Some(hierarchy.into_iter().collect())
        } else {
            None
        }
    }

    /// Invalidates cache entries for the methods of `class` whose backing
    /// parse is out of date, and flags their transitive callers. Run for
    /// every class of a file after the file is re-parsed, before querying.
    pub fn mark_class_dirty(&mut self, ctx: &RuleCtx<'_>, class: ClassSymId) {
        let index = ctx.model().index();
        for &method_id in &index.class(class).methods {
            let method = index.method(method_id);
            let Some(&mark) = self.by_key.get(&method.key) else {
                continue;
            };
            let current_tree = ctx.file(method.primary_decl().file).tree_id();
            if self.marks[mark].tree != current_tree {
                self.marks[mark].retarget(current_tree);
                mark::set_parents_dirty(&mut self.marks, mark);
                self.marks[mark].dirty = true;
            }
        }
    }

    fn search_from(
        &mut self,
        ctx: &RuleCtx<'_>,
        decl: DeclRef,
        hierarchy: &mut VecDeque<CallSite>,
        parent: Option<MarkId>,
    ) -> bool {
        let index = ctx.model().index();

        // Unresolvable declarations answer false without touching the stack.
        let Some(method_id) = index.method_of_decl(decl) else {
            return false;
        };
        let method = index.method(method_id);
        let key = method.key.clone();

        if parent.is_none() {
            self.stack.clear();
            self.stack.push(key.clone());
        } else {
            self.stack.push(key.clone());
            if self.stack.len() > MAX_SEARCH_DEPTH {
                warn!(
                    rule = self.rule_id,
                    method = %key,
                    stack = %self.stack.join(" -> "),
                    "call chain exceeded search depth, treating as unreachable"
                );
                self.stack.pop();
                return false;
            }
        }

        if ctx.is_decl_excluded(self.rule_id, decl) {
            self.stack.pop();
            return false;
        }

        let current_tree = ctx.file(method.primary_decl().file).tree_id();
        let mark = match self.by_key.get(&key) {
            Some(&mark) => {
                if let Some(parent) = parent {
                    self.marks[mark].parents.insert(parent);
                }
                if self.marks[mark].tree != current_tree {
                    self.marks[mark].retarget(current_tree);
                    mark::set_parents_dirty(&mut self.marks, mark);
                } else if self.marks[mark].dirty {
                    self.marks[mark].reset();
                } else {
                    // Clean entry: replay the cached answer. The provisional
                    // `false` inserted below is what recursive edges hit.
                    let verdict = self.marks[mark].verdict;
                    if verdict {
                        hierarchy.extend(self.marks[mark].witness.iter().cloned());
                    }
                    self.stack.pop();
                    return verdict;
                }
                mark
            }
            None => {
                let mark = self.marks.alloc(MarkInfo::new(key.clone(), current_tree));
                self.by_key.insert(key.clone(), mark);
                if let Some(parent) = parent {
                    self.marks[mark].parents.insert(parent);
                }
                mark
            }
        };

        // Direct match in any physical declaration of the method.
        let mut hit: Option<CallSite> = None;
        for &d in &method.decls {
            if let Some(node) = (self.predicate)(ctx, d) {
                hit = Some(CallSite::capture(ctx.file(d.file), node));
                break;
            }
        }

        // Otherwise descend into callees, source order, first find wins.
        if hit.is_none() {
            'decls: for &d in &method.decls {
                let file = ctx.file(d.file);
                let body = file.tree().method(d.decl).body;
                for call in file.tree().invocations_in(body) {
                    if ctx.is_site_excluded(self.rule_id, d.file, call.span) {
                        continue;
                    }
                    let Some(CallTarget::Method(callee)) =
                        ctx.model().resolve_invocation(d, call.id)
                    else {
                        continue;
                    };
                    let callee_decl = index.method(callee).primary_decl();
                    if self.search_from(ctx, callee_decl, hierarchy, Some(mark)) {
                        hit = Some(CallSite::capture(file, call.id));
                        break 'decls;
                    }
                }
            }
        }

        let verdict = if let Some(site) = hit {
            hierarchy.push_front(site);
            let entry = &mut self.marks[mark];
            entry.verdict = true;
            entry.witness = hierarchy.iter().cloned().collect();
            true
        } else {
            false
        };

        self.stack.pop();
        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directives::DirectiveIndex;
    use crate::exclude::PathFilter;
    use crate::syntax::NodeKind;
    use crate::workspace::Workspace;
    use std::cell::Cell;
    use std::rc::Rc;

    fn find_main_access(ctx: &RuleCtx<'_>, decl: DeclRef) -> Option<NodeId> {
        let tree = ctx.file(decl.file).tree();
        let body = tree.method(decl.decl).body;
        tree.descendants(body)
            .find(|n| matches!(&n.kind, NodeKind::Member { name, .. } if name == "main"))
            .map(|n| n.id)
    }

    fn decl_of(ws: &Workspace, class: &str, method: &str) -> DeclRef {
        let index = ws.index();
        let class_id = index.class_named(class).unwrap();
        index
            .class(class_id)
            .methods
            .iter()
            .map(|&m| index.method(m))
            .find(|m| m.name == method)
            .unwrap()
            .primary_decl()
    }

    fn ctx_parts() -> (DirectiveIndex, PathFilter) {
        (DirectiveIndex::new(), PathFilter::empty())
    }

    #[test]
    fn direct_match_yields_single_step_witness() {
        let mut ws = Workspace::new();
        ws.upsert_file(
            "player.arc",
            "class Player : Behaviour {\n  void Update() {\n    var c = Camera.main;\n  }\n}\n",
        );
        let (directives, filter) = ctx_parts();
        let ctx = RuleCtx::new(&ws, &directives, &filter);
        let mut graph = InvocationGraph::new("P001", find_main_access);

        let witness = graph.search(&ctx, decl_of(&ws, "Player", "Update")).unwrap();

        assert_eq!(witness.len(), 1);
        assert_eq!(witness[0].text, "Camera.main");
        assert_eq!(witness[0].line, 3);
    }

    #[test]
    fn indirect_match_traces_the_call_chain() {
        let mut ws = Workspace::new();
        ws.upsert_file(
            "player.arc",
            "class Player : Behaviour {\n  void Update() {\n    Helper();\n  }\n  void Helper() {\n    var c = Camera.main;\n  }\n}\n",
        );
        let (directives, filter) = ctx_parts();
        let ctx = RuleCtx::new(&ws, &directives, &filter);
        let mut graph = InvocationGraph::new("P001", find_main_access);

        let witness = graph.search(&ctx, decl_of(&ws, "Player", "Update")).unwrap();

        assert_eq!(witness.len(), 2);
        assert_eq!(witness[0].text, "Helper()");
        assert_eq!(witness[1].text, "Camera.main");
    }

    #[test]
    fn second_query_replays_the_cache() {
        let mut ws = Workspace::new();
        ws.upsert_file(
            "player.arc",
            "class Player : Behaviour {\n  void Update() {\n    Helper();\n  }\n  void Helper() {\n    var c = Camera.main;\n  }\n}\n",
        );
        let (directives, filter) = ctx_parts();
        let ctx = RuleCtx::new(&ws, &directives, &filter);

        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let mut graph = InvocationGraph::new("P001", move |ctx: &RuleCtx<'_>, decl| {
            counter.set(counter.get() + 1);
            find_main_access(ctx, decl)
        });

        let first = graph.search(&ctx, decl_of(&ws, "Player", "Update"));
        let after_first = calls.get();
        let second = graph.search(&ctx, decl_of(&ws, "Player", "Update"));

        assert_eq!(first, second);
        assert_eq!(calls.get(), after_first, "replay must not re-run the predicate");
    }

    #[test]
    fn recursion_terminates_without_match() {
        let mut ws = Workspace::new();
        ws.upsert_file(
            "loop.arc",
            "class Loop : Behaviour {\n  void Update() {\n    Ping();\n  }\n  void Ping() {\n    Pong();\n  }\n  void Pong() {\n    Ping();\n  }\n}\n",
        );
        let (directives, filter) = ctx_parts();
        let ctx = RuleCtx::new(&ws, &directives, &filter);
        let mut graph = InvocationGraph::new("P001", find_main_access);

        assert!(graph.search(&ctx, decl_of(&ws, "Loop", "Update")).is_none());
    }

    #[test]
    fn match_is_found_past_a_recursive_edge() {
        let mut ws = Workspace::new();
        ws.upsert_file(
            "loop.arc",
            "class Loop : Behaviour {\n  void Ping() {\n    Pong();\n    Target();\n  }\n  void Pong() {\n    Ping();\n  }\n  void Target() {\n    var c = Camera.main;\n  }\n}\n",
        );
        let (directives, filter) = ctx_parts();
        let ctx = RuleCtx::new(&ws, &directives, &filter);
        let mut graph = InvocationGraph::new("P001", find_main_access);

        let witness = graph.search(&ctx, decl_of(&ws, "Loop", "Ping")).unwrap();

        assert_eq!(witness.len(), 2);
        assert_eq!(witness[0].text, "Target()");
        assert_eq!(witness[1].text, "Camera.main");
    }

    #[test]
    fn builtin_calls_are_not_descended_into() {
        let mut ws = Workspace::new();
        ws.upsert_file(
            "player.arc",
            "class Player : Behaviour {\n  void Update() {\n    Debug.Log(1);\n  }\n}\n",
        );
        let (directives, filter) = ctx_parts();
        let ctx = RuleCtx::new(&ws, &directives, &filter);
        let mut graph = InvocationGraph::new("P001", find_main_access);

        assert!(graph.search(&ctx, decl_of(&ws, "Player", "Update")).is_none());
    }

    #[test]
    fn reviewed_call_site_is_not_followed() {
        let mut ws = Workspace::new();
        ws.upsert_file(
            "player.arc",
            "class Player : Behaviour {\n  void Update() {\n    Helper(); // hotloop-reviewed\n  }\n  void Helper() {\n    var c = Camera.main;\n  }\n}\n",
        );
        let (directives, filter) = ctx_parts();
        let ctx = RuleCtx::new(&ws, &directives, &filter);
        let mut graph = InvocationGraph::new("P001", find_main_access);

        assert!(graph.search(&ctx, decl_of(&ws, "Player", "Update")).is_none());
    }

    #[test]
    fn editor_guarded_code_is_skipped() {
        let mut ws = Workspace::new();
        ws.upsert_file(
            "tool.arc",
            "class Tool : Behaviour {\n  void Update() {\n#if ARC_EDITOR\n    Helper();\n#endif\n  }\n  void Helper() {\n    var c = Camera.main;\n  }\n}\n",
        );
        let (directives, filter) = ctx_parts();
        let ctx = RuleCtx::new(&ws, &directives, &filter);
        let mut graph = InvocationGraph::new("P001", find_main_access);

        assert!(graph.search(&ctx, decl_of(&ws, "Tool", "Update")).is_none());
    }
}
