//! scene-find-in-frame-loop rule (P002): Detects find-family calls on the frame path
//!
//! `Scene.Find` and friends walk the whole object hierarchy; `GetComponent`
//! walks the component list. Both belong in `Start`, not in code the frame
//! loop reaches.

use crate::diagnostic::Diagnostic;
use crate::reach::InvocationGraph;
use crate::rules::helpers::{check_frame_paths, invalidate_classes_in_file};
use crate::rules::{Rule, RuleCategory, RuleCtx, RuleMetadata, Severity};
use crate::sem::{CallTarget, DeclRef};
use crate::syntax::{NodeId, NodeKind};
use crate::workspace::FileId;

const FIND_APIS: &[(&str, &str)] = &[
    ("Scene", "Find"),
    ("Scene", "FindWithTag"),
    ("Scene", "FindObjectsOfType"),
    ("Behaviour", "GetComponent"),
];

/// First call to a find-family engine API in the declaration body.
fn find_scene_query(ctx: &RuleCtx<'_>, decl: DeclRef) -> Option<NodeId> {
    let tree = ctx.file(decl.file).tree();
    let body = tree.method(decl.decl).body;
    for node in tree.descendants(body) {
        if !matches!(node.kind, NodeKind::Invocation { .. }) {
            continue;
        }
        if let Some(CallTarget::Builtin(member)) = ctx.model().resolve_invocation(decl, node.id) {
            if FIND_APIS.contains(&(member.owner, member.name)) {
                return Some(node.id);
            }
        }
    }
    None
}

pub struct SceneFindInFrameLoop {
    metadata: RuleMetadata,
    graph: InvocationGraph,
}

impl SceneFindInFrameLoop {
    pub fn new() -> Self {
        Self {
            metadata: RuleMetadata {
                id: "P002",
                name: "scene-find-in-frame-loop",
                description: "Disallow Scene.Find-family and GetComponent calls on the frame path",
                category: RuleCategory::Performance,
                severity: Severity::Warning,
                docs_url: None,
                examples: Some(
                    "// Bad\nvoid Update() {\n    var boss = Scene.Find(\"Boss\");\n}\n\n// Good\nObject boss;\nvoid Start() {\n    boss = Scene.Find(\"Boss\");\n}",
                ),
            },
            graph: InvocationGraph::new("P002", find_scene_query),
        }
    }
}

impl Default for SceneFindInFrameLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for SceneFindInFrameLoop {
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
                    format!("{site} called in frame callback {callback}")
                } else {
                    format!("{site} reached from frame callback {callback}")
                }
            },
            Some("Run the lookup once and keep the result"),
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

    fn run_scene_find(code: &str) -> Vec<Diagnostic> {
        let mut ws = Workspace::new();
        let file = ws.upsert_file("test.arc", code);
        let directives = DirectiveIndex::new();
        let filter = PathFilter::empty();
        let ctx = RuleCtx::new(&ws, &directives, &filter);
        let mut rule = SceneFindInFrameLoop::new();
        rule.check(&ctx, file)
    }

    #[test]
    fn detects_scene_find_in_update() {
        let diagnostics = run_scene_find(
            "class Chaser : Behaviour {\n  void Update() {\n    var boss = Scene.Find(\"Boss\");\n  }\n}\n",
        );

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].rule_id, "P002");
        assert_eq!(
            diagnostics[0].message,
            "Scene.Find(\"Boss\") called in frame callback Update"
        );
    }

    #[test]
    fn detects_get_component_via_helper() {
        let diagnostics = run_scene_find(
            "class Chaser : Behaviour {\n  void FixedUpdate() {\n    Steer();\n  }\n  void Steer() {\n    var body = GetComponent(\"RigidBody\");\n  }\n}\n",
        );

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].message,
            "GetComponent(\"RigidBody\") reached from frame callback FixedUpdate"
        );
        assert_eq!(diagnostics[0].trace.len(), 2);
    }

    #[test]
    fn detects_find_with_tag_and_objects_of_type() {
        let diagnostics = run_scene_find(
            "class Scanner : Behaviour {\n  void Update() {\n    var a = Scene.FindWithTag(\"Enemy\");\n  }\n  void LateUpdate() {\n    var b = Scene.FindObjectsOfType(\"Pickup\");\n  }\n}\n",
        );

        assert_eq!(diagnostics.len(), 2);
    }

    #[test]
    fn ignores_find_in_start() {
        let diagnostics = run_scene_find(
            "class Chaser : Behaviour {\n  void Start() {\n    var boss = Scene.Find(\"Boss\");\n  }\n}\n",
        );

        assert!(diagnostics.is_empty());
    }

    #[test]
    fn ignores_user_method_named_find() {
        let diagnostics = run_scene_find(
            "class Registry : Behaviour {\n  void Update() {\n    var entry = Find(\"key\");\n  }\n  Object Find(Text key) {\n    return cached;\n  }\n}\n",
        );

        assert!(diagnostics.is_empty());
    }
}
