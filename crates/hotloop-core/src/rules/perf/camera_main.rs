//! camera-main-in-frame-loop rule (P001): Detects `Camera.main` on the frame path
//!
//! `Camera.main` scans the scene for a tagged camera on every access. Doing
//! that once per frame, directly in a callback or anywhere the callback
//! transitively calls, is a classic hidden cost.

use crate::diagnostic::Diagnostic;
use crate::reach::InvocationGraph;
use crate::rules::helpers::{check_frame_paths, invalidate_classes_in_file};
use crate::rules::{Rule, RuleCategory, RuleCtx, RuleMetadata, Severity};
use crate::sem::{DeclRef, MemberTarget};
use crate::syntax::{NodeId, NodeKind};
use crate::workspace::FileId;

/// First read of `Camera.main` in the declaration body, any spelling that
/// resolves to the engine member.
fn find_camera_main(ctx: &RuleCtx<'_>, decl: DeclRef) -> Option<NodeId> {
    let tree = ctx.file(decl.file).tree();
    let body = tree.method(decl.decl).body;
    for node in tree.descendants(body) {
        if !matches!(node.kind, NodeKind::Member { .. }) {
            continue;
        }
        if let Some(MemberTarget::Builtin(member)) =
            ctx.model().resolve_member_access(decl, node.id)
        {
            if member.qualified_name() == "Arc.Camera.main" {
                return Some(node.id);
            }
        }
    }
    None
}

pub struct CameraMainInFrameLoop {
    metadata: RuleMetadata,
    graph: InvocationGraph,
}

impl CameraMainInFrameLoop {
    pub fn new() -> Self {
        Self {
            metadata: RuleMetadata {
                id: "P001",
                name: "camera-main-in-frame-loop",
                description: "Disallow Camera.main lookups on the frame path",
                category: RuleCategory::Performance,
                severity: Severity::Warning,
                docs_url: None,
                examples: Some(
                    "// Bad\nvoid Update() {\n    var cam = Camera.main;\n}\n\n// Good\nCamera cam;\nvoid Start() {\n    cam = Camera.main;\n}",
                ),
            },
            graph: InvocationGraph::new("P001", find_camera_main),
        }
    }
}

impl Default for CameraMainInFrameLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for CameraMainInFrameLoop {
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
                    format!("Camera.main accessed in frame callback {callback}")
                } else {
                    format!("Camera.main reached from frame callback {callback}")
                }
            },
            Some("Cache the camera in a field during Start"),
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
    use crate::rules::Confidence;
    use crate::workspace::Workspace;

    fn run_camera_main(code: &str) -> Vec<Diagnostic> {
        let mut ws = Workspace::new();
        let file = ws.upsert_file("test.arc", code);
        let directives = DirectiveIndex::new();
        let filter = PathFilter::empty();
        let ctx = RuleCtx::new(&ws, &directives, &filter);
        let mut rule = CameraMainInFrameLoop::new();
        rule.check(&ctx, file)
    }

    #[test]
    fn detects_direct_access_in_update() {
        let diagnostics = run_camera_main(
            "class Player : Behaviour {\n  void Update() {\n    var cam = Camera.main;\n  }\n}\n",
        );

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].rule_id, "P001");
        assert_eq!(
            diagnostics[0].message,
            "Camera.main accessed in frame callback Update"
        );
        assert_eq!(diagnostics[0].line, 3);
        assert_eq!(diagnostics[0].confidence, Confidence::High);
    }

    #[test]
    fn detects_access_through_helper() {
        let diagnostics = run_camera_main(
            "class Player : Behaviour {\n  void Update() {\n    Helper();\n  }\n  void Helper() {\n    var cam = Camera.main;\n  }\n}\n",
        );

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].message,
            "Camera.main reached from frame callback Update"
        );
        assert_eq!(diagnostics[0].confidence, Confidence::Medium);
        assert_eq!(diagnostics[0].trace.len(), 2);
        assert_eq!(diagnostics[0].trace[1].text, "Camera.main");
    }

    #[test]
    fn qualified_spelling_matches() {
        let diagnostics = run_camera_main(
            "class Player : Behaviour {\n  void Update() {\n    var cam = Arc.Camera.main;\n  }\n}\n",
        );

        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn ignores_access_outside_frame_callbacks() {
        let diagnostics = run_camera_main(
            "class Player : Behaviour {\n  void Start() {\n    var cam = Camera.main;\n  }\n}\n",
        );

        assert!(diagnostics.is_empty());
    }

    #[test]
    fn ignores_non_behaviour_classes() {
        let diagnostics = run_camera_main(
            "class Util {\n  void Update() {\n    var cam = Camera.main;\n  }\n}\n",
        );

        assert!(diagnostics.is_empty());
    }

    #[test]
    fn ignores_other_camera_members() {
        let diagnostics = run_camera_main(
            "class Player : Behaviour {\n  Camera cam;\n  void Update() {\n    var t = cam.transform;\n  }\n}\n",
        );

        assert!(diagnostics.is_empty());
    }
}
