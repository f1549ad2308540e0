//! collection-alloc-in-frame-loop rule (P004): Detects container construction on the frame path
//!
//! `new List()` and the other `Std` containers are heap allocations. One per
//! frame is sixty per second of garbage for the collector to chew on.

use crate::diagnostic::Diagnostic;
use crate::reach::InvocationGraph;
use crate::rules::helpers::{check_frame_paths, invalidate_classes_in_file};
use crate::rules::{Rule, RuleCategory, RuleCtx, RuleMetadata, Severity};
use crate::sem::DeclRef;
use crate::syntax::{NodeId, NodeKind};
use crate::workspace::FileId;

/// First construction of a `Std` container in the declaration body. User
/// classes that happen to share a container name do not count.
fn find_container_alloc(ctx: &RuleCtx<'_>, decl: DeclRef) -> Option<NodeId> {
    let tree = ctx.file(decl.file).tree();
    let body = tree.method(decl.decl).body;
    for node in tree.descendants(body) {
        let NodeKind::New { type_name, .. } = &node.kind else {
            continue;
        };
        if ctx.model().index().class_named(type_name).is_some() {
            continue;
        }
        if ctx.model().builtins().is_container_type(type_name) {
            return Some(node.id);
        }
    }
    None
}

pub struct CollectionAllocInFrameLoop {
    metadata: RuleMetadata,
    graph: InvocationGraph,
}

impl CollectionAllocInFrameLoop {
    pub fn new() -> Self {
        Self {
            metadata: RuleMetadata {
                id: "P004",
                name: "collection-alloc-in-frame-loop",
                description: "Disallow container allocation on the frame path",
                category: RuleCategory::Performance,
                severity: Severity::Warning,
                docs_url: None,
                examples: Some(
                    "// Bad\nvoid Update() {\n    var hits = new List();\n}\n\n// Good\nList hits;\nvoid Start() {\n    hits = new List();\n}\nvoid Update() {\n    hits.Clear();\n}",
                ),
            },
            graph: InvocationGraph::new("P004", find_container_alloc),
        }
    }
}

impl Default for CollectionAllocInFrameLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for CollectionAllocInFrameLoop {
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
                    format!("{site} allocates in frame callback {callback}")
                } else {
                    format!("{site} allocation reached from frame callback {callback}")
                }
            },
            Some("Allocate the collection once and reuse it"),
        )
    }

    fn on_file_updated(&mut self, ctx: &RuleCtx<'_>, file: FileId) {
        invalidate_classes_in_file(&mut self.graph, ctx, file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directives::DirectiveIndex;
    use crate::exclude::PathFilter;
    use crate::workspace::Workspace;

    fn run_collection_alloc(code: &str) -> Vec<Diagnostic> {
        let mut ws = Workspace::new();
        let file = ws.upsert_file("test.arc", code);
        let directives = DirectiveIndex::new();
        let filter = PathFilter::empty();
        let ctx = RuleCtx::new(&ws, &directives, &filter);
        let mut rule = CollectionAllocInFrameLoop::new();
        rule.check(&ctx, file)
    }

    #[test]
    fn detects_list_allocation_in_update() {
        let diagnostics = run_collection_alloc(
            "class Collector : Behaviour {\n  void Update() {\n    var hits = new List();\n  }\n}\n",
        );

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].rule_id, "P004");
        assert_eq!(
            diagnostics[0].message,
            "new List() allocates in frame callback Update"
        );
    }

    #[test]
    fn detects_qualified_container_via_helper() {
        let diagnostics = run_collection_alloc(
            "class Collector : Behaviour {\n  void Update() {\n    Gather();\n  }\n  void Gather() {\n    var seen = new Std.Dict();\n  }\n}\n",
        );

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].message,
            "new Std.Dict() allocation reached from frame callback Update"
        );
    }

    #[test]
    fn ignores_user_type_allocation() {
        let diagnostics = run_collection_alloc(
            "class Bullet {}\nclass Gun : Behaviour {\n  void Update() {\n    var b = new Bullet();\n  }\n}\n",
        );

        assert!(diagnostics.is_empty());
    }

    #[test]
    fn user_class_shadowing_a_container_name_is_ignored() {
        let diagnostics = run_collection_alloc(
            "class List {}\nclass Gun : Behaviour {\n  void Update() {\n    var l = new List();\n  }\n}\n",
        );

        assert!(diagnostics.is_empty());
    }

    #[test]
    fn ignores_allocation_in_start() {
        let diagnostics = run_collection_alloc(
            "class Collector : Behaviour {\n  void Start() {\n    var hits = new List();\n  }\n}\n",
        );

        assert!(diagnostics.is_empty());
    }
}
