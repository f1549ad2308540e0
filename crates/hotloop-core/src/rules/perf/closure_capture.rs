//! closure-capture-in-frame-loop rule (P005): Detects capturing lambdas on the frame path
//!
//! A lambda that reads `this` or a field has to box its environment, so
//! every frame mints a fresh closure object. Lambdas over their own
//! parameters and locals are cheap and are left alone.

use crate::diagnostic::Diagnostic;
use crate::reach::InvocationGraph;
use crate::rules::helpers::{check_frame_paths, invalidate_classes_in_file};
use crate::rules::{Rule, RuleCategory, RuleCtx, RuleMetadata, Severity};
use crate::sem::{Capture, DeclRef};
use crate::syntax::{NodeId, NodeKind};
use crate::workspace::FileId;

/// First lambda in the declaration body whose free variables pin the
/// receiver, either `this` itself or a field read.
fn find_pinning_closure(ctx: &RuleCtx<'_>, decl: DeclRef) -> Option<NodeId> {
    let tree = ctx.file(decl.file).tree();
    let body = tree.method(decl.decl).body;
    for node in tree.descendants(body) {
        if !matches!(node.kind, NodeKind::Lambda { .. }) {
            continue;
        }
        if ctx
            .model()
            .free_variables(decl, node.id)
            .iter()
            .any(Capture::pins_receiver)
        {
            return Some(node.id);
        }
    }
    None
}

pub struct ClosureCaptureInFrameLoop {
    metadata: RuleMetadata,
    graph: InvocationGraph,
}

impl ClosureCaptureInFrameLoop {
    pub fn new() -> Self {
        Self {
            metadata: RuleMetadata {
                id: "P005",
                name: "closure-capture-in-frame-loop",
                description: "Disallow lambdas capturing this or fields on the frame path",
                category: RuleCategory::Performance,
                severity: Severity::Warning,
                docs_url: None,
                examples: Some(
                    "// Bad\nvoid Update() {\n    targets.Each(t => Chase(t, speed));\n}\n\n// Good\nvoid Update() {\n    var s = speed;\n    targets.Each(t => Chase(t, s));\n}",
                ),
            },
            graph: InvocationGraph::new("P005", find_pinning_closure),
        }
    }
}

impl Default for ClosureCaptureInFrameLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for ClosureCaptureInFrameLoop {
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
                    format!("Closure capturing member state allocated in frame callback {callback}")
                } else {
                    format!("Closure capturing member state reached from frame callback {callback}")
                }
            },
            Some("Copy the state into a local before the lambda"),
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

    fn run_closure_capture(code: &str) -> Vec<Diagnostic> {
        let mut ws = Workspace::new();
        let file = ws.upsert_file("test.arc", code);
        let directives = DirectiveIndex::new();
        let filter = PathFilter::empty();
        let ctx = RuleCtx::new(&ws, &directives, &filter);
        let mut rule = ClosureCaptureInFrameLoop::new();
        rule.check(&ctx, file)
    }

    #[test]
    fn detects_field_capture() {
        let diagnostics = run_closure_capture(
            "class Chaser : Behaviour {\n  Num speed;\n  void Update() {\n    Each(t => t + speed);\n  }\n}\n",
        );

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].rule_id, "P005");
    }

    #[test]
    fn detects_explicit_this_capture() {
        let diagnostics = run_closure_capture(
            "class Chaser : Behaviour {\n  Num speed;\n  void Update() {\n    Each(t => this.speed);\n  }\n}\n",
        );

        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn ignores_parameter_only_lambda() {
        let diagnostics = run_closure_capture(
            "class Chaser : Behaviour {\n  void Update() {\n    Each(t => t);\n  }\n}\n",
        );

        assert!(diagnostics.is_empty());
    }

    #[test]
    fn ignores_local_capture() {
        let diagnostics = run_closure_capture(
            "class Chaser : Behaviour {\n  Num speed;\n  void Update() {\n    var s = speed;\n    Each(t => t + s);\n  }\n}\n",
        );

        assert!(diagnostics.is_empty());
    }

    #[test]
    fn detects_capture_behind_a_helper() {
        let diagnostics = run_closure_capture(
            "class Chaser : Behaviour {\n  Num speed;\n  void Update() {\n    Scan();\n  }\n  void Scan() {\n    Each(t => t + speed);\n  }\n}\n",
        );

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].trace.len(), 2);
    }
}
