//! empty-frame-callback rule (P007): Flags frame callbacks with empty bodies
//!
//! The engine dispatches every declared frame callback through its messaging
//! layer whether or not the body does anything. An empty `Update` is pure
//! per-frame overhead and should be deleted.

use crate::behaviour::{is_frame_callback, BehaviourInfo};
use crate::declare_rule;
use crate::diagnostic::Diagnostic;
use crate::rules::{Rule, RuleCtx, RuleMetadata};
use crate::syntax::NodeKind;
use crate::workspace::FileId;

declare_rule!(
    EmptyFrameCallback,
    id = "P007",
    name = "empty-frame-callback",
    description = "Delete empty frame callbacks; the engine still dispatches them every frame",
    category = Performance,
    severity = Info,
    examples = "// Bad\nvoid Update() {}\n\n// Good: no Update declared at all"
);

impl Rule for EmptyFrameCallback {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn check(&mut self, ctx: &RuleCtx<'_>, file: FileId) -> Vec<Diagnostic> {
        let source = ctx.file(file);
        let tree = source.tree();
        let index = ctx.model().index();
        let mut diagnostics = Vec::new();

        for class_decl in tree.classes() {
            let Some(class) = index.class_named(&class_decl.name) else {
                continue;
            };
            if !BehaviourInfo::new(index, class).is_behaviour() {
                continue;
            }

            for &method_id in &class_decl.methods {
                let method = tree.method(method_id);
                if !is_frame_callback(&method.name) {
                    continue;
                }
                let NodeKind::Block { statements } = &tree.node(method.body).kind else {
                    continue;
                };
                if !statements.is_empty() {
                    continue;
                }
                if ctx.is_site_excluded(self.metadata.id, file, method.name_span) {
                    continue;
                }

                let (line, column) = source.line_col(method.name_span.lo);
                diagnostics.push(
                    Diagnostic::new(
                        self.metadata.id,
                        self.metadata.severity,
                        format!(
                            "Empty frame callback {} still costs a dispatch every frame",
                            method.name
                        ),
                        source.path(),
                        line,
                        column,
                    )
                    .with_suggestion("Remove the empty callback"),
                );
            }
        }

        diagnostics
    }
}
