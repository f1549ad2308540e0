//! cache-array-api rule (P006): Detects array-materializing reads on the frame path
//!
//! Engine properties like `Mesh.vertices` and `Input.touches` copy their
//! backing data into a fresh managed array on every read. Reading them each
//! frame allocates; writing to them is the intended use and is ignored.

use std::collections::HashSet;

use crate::diagnostic::Diagnostic;
use crate::reach::InvocationGraph;
use crate::rules::helpers::{check_frame_paths, invalidate_classes_in_file};
use crate::rules::{Rule, RuleCategory, RuleCtx, RuleMetadata, Severity};
use crate::sem::{DeclRef, MemberKind, MemberTarget};
use crate::syntax::{NodeId, NodeKind};
use crate::workspace::FileId;

/// First read of an array-materializing engine property in the declaration
/// body. Member accesses that are direct assignment targets are setters,
/// not reads, and are skipped.
fn find_array_read(ctx: &RuleCtx<'_>, decl: DeclRef) -> Option<NodeId> {
    let tree = ctx.file(decl.file).tree();
    let body = tree.method(decl.decl).body;

    let mut assign_targets = HashSet::new();
    for node in tree.descendants(body) {
        if let NodeKind::Assign { target, .. } = node.kind {
            assign_targets.insert(target);
        }
    }

    for node in tree.descendants(body) {
        if !matches!(node.kind, NodeKind::Member { .. }) || assign_targets.contains(&node.id) {
            continue;
        }
        if let Some(MemberTarget::Builtin(member)) =
            ctx.model().resolve_member_access(decl, node.id)
        {
            if member.returns_array && member.kind == MemberKind::Property {
                return Some(node.id);
            }
        }
    }
    None
}

pub struct CacheArrayApi {
    metadata: RuleMetadata,
    graph: InvocationGraph,
}

impl CacheArrayApi {
    pub fn new() -> Self {
        Self {
            metadata: RuleMetadata {
                id: "P006",
                name: "cache-array-api",
                description: "Cache array-materializing engine properties instead of re-reading them",
                category: RuleCategory::Performance,
                severity: Severity::Warning,
                docs_url: None,
                examples: Some(
                    "// Bad\nvoid Update() {\n    var first = mesh.vertices;\n}\n\n// Good\nvoid Start() {\n    verts = mesh.vertices;\n}",
                ),
            },
            graph: InvocationGraph::new("P006", find_array_read),
        }
    }
}

impl Default for CacheArrayApi {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for CacheArrayApi {
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
                let site = &witness[witness.len() - 1].text;
                if witness.len() == 1 {
                    format!("{site} copies the array on every read in frame callback {callback}")
                } else {
                    format!("{site} array read reached from frame callback {callback}")
                }
            },
            Some("Read the array once into a cached field"),
        )
    }

    fn on_file_updated(&mut self, ctx: &RuleCtx<'_>, file: FileId) {
        invalidate_classes_in_file(&mut self.graph, ctx, file);
    }
}
