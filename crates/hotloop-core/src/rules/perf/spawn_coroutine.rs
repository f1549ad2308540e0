//! coroutine-start-in-frame-loop rule (P003): Detects StartCoroutine on the frame path
//!
//! Every `StartCoroutine` call allocates a coroutine object and enqueues it
//! with the scheduler. Kicking one off per frame piles up allocations and,
//! usually, overlapping coroutines.

use crate::diagnostic::Diagnostic;
use crate::reach::InvocationGraph;
use crate::rules::helpers::{check_frame_paths, invalidate_classes_in_file};
use crate::rules::{Rule, RuleCategory, RuleCtx, RuleMetadata, Severity};
use crate::sem::{CallTarget, DeclRef};
use crate::syntax::{NodeId, NodeKind};
use crate::workspace::FileId;

/// First `StartCoroutine` call in the declaration body.
fn find_coroutine_start(ctx: &RuleCtx<'_>, decl: DeclRef) -> Option<NodeId> {
    let tree = ctx.file(decl.file).tree();
    let body = tree.method(decl.decl).body;
    for node in tree.descendants(body) {
        if !matches!(node.kind, NodeKind::Invocation { .. }) {
            continue;
        }
        if let Some(CallTarget::Builtin(member)) = ctx.model().resolve_invocation(decl, node.id) {
            if member.owner == "Behaviour" && member.name == "StartCoroutine" {
                return Some(node.id);
            }
        }
    }
    None
}

pub struct CoroutineStartInFrameLoop {
    metadata: RuleMetadata,
    graph: InvocationGraph,
}

impl CoroutineStartInFrameLoop {
    pub fn new() -> Self {
        Self {
            metadata: RuleMetadata {
                id: "P003",
                name: "coroutine-start-in-frame-loop",
                description: "Disallow starting coroutines on the frame path",
                category: RuleCategory::Performance,
                severity: Severity::Warning,
                docs_url: None,
                examples: Some(
                    "// Bad\nvoid Update() {\n    StartCoroutine(Fade());\n}\n\n// Good\nvoid OnTriggered() {\n    StartCoroutine(Fade());\n}",
                ),
            },
            graph: InvocationGraph::new("P003", find_coroutine_start),
        }
    }
}

impl Default for CoroutineStartInFrameLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for CoroutineStartInFrameLoop {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn check(&mut self, ctx: &RuleCtx<'_>, file: FileId) -> Vec<Diagnostic> {
        check_frame_paths(
            &mut self.graph,
            ctx,
            file,
            &self.metadata,
            |callback, witness| {
                if witness.len() == 1 {
                    format!("StartCoroutine called in frame callback {callback}")
                } else {
                    format!("StartCoroutine reached from frame callback {callback}")
                }
            },
            Some("Start coroutines from events or Start, not the frame loop"),
        )
    }

    fn on_file_updated(&mut self, ctx: &RuleCtx<'_>, file: FileId) {
        invalidate_classes_in_file(&mut self.graph, ctx, file);
    }
}
