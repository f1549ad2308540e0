//! editor-import-outside-guard rule (E001): Editor API referenced in game code
//!
//! `Arc.Editor` exists only inside the editor process; the game build strips
//! it. Any using directive, member access, or construction that lands on the
//! editor namespace must sit under an `#if ARC_EDITOR` region or the script
//! fails to load in a shipped build.

use crate::declare_rule;
use crate::diagnostic::Diagnostic;
use crate::rules::{Rule, RuleCtx, RuleMetadata, EDITOR_DEFINE};
use crate::sem::builtins::EDITOR_NAMESPACE;
use crate::sem::{DeclRef, MemberTarget, TypeRef};
use crate::syntax::NodeKind;
use crate::workspace::FileId;

const GUARD_HINT: &str = "Wrap the editor-only code in #if ARC_EDITOR";

fn is_editor_path(path: &str) -> bool {
    path == EDITOR_NAMESPACE
        || path
            .strip_prefix(EDITOR_NAMESPACE)
            .is_some_and(|rest| rest.starts_with('.'))
}

declare_rule!(
    EditorImportOutsideGuard,
    id = "E001",
    name = "editor-import-outside-guard",
    description = "Guard references to the Arc.Editor namespace with #if ARC_EDITOR",
    category = Editor,
    severity = Error,
    examples = "// Bad\nusing Arc.Editor;\n\n// Good\n#if ARC_EDITOR\nusing Arc.Editor;\n#endif"
);

impl Rule for EditorImportOutsideGuard {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn check(&mut self, ctx: &RuleCtx<'_>, file: FileId) -> Vec<Diagnostic> {
        let source = ctx.file(file);
        let tree = source.tree();
        let mut diagnostics = Vec::new();

        let report = |span, message: String, diagnostics: &mut Vec<Diagnostic>| {
            if ctx.is_site_excluded(self.metadata.id, file, span) {
                return;
            }
            let (line, column) = source.line_col(span.lo);
            diagnostics.push(
                Diagnostic::new(
                    self.metadata.id,
                    self.metadata.severity,
                    message,
                    source.path(),
                    line,
                    column,
                )
                .with_suggestion(GUARD_HINT),
            );
        };

        for using in &tree.usings {
            if is_editor_path(&using.path) {
                report(
                    using.span,
                    format!(
                        "using {} ships editor-only API into the game build",
                        using.path
                    ),
                    &mut diagnostics,
                );
            }
        }

        let editor_new = |type_name: &str| {
            matches!(
                ctx.model().resolve_type_name(type_name),
                Some(TypeRef::Builtin(ty)) if ty.namespace == EDITOR_NAMESPACE
            )
        };

        for class_decl in tree.classes() {
            for &field_id in &class_decl.fields {
                let Some(init) = tree.field(field_id).init else {
                    continue;
                };
                for node in tree.descendants(init) {
                    if let NodeKind::New { type_name, .. } = &node.kind {
                        if editor_new(type_name) {
                            report(
                                node.span,
                                format!(
                                    "{} constructs an editor-only type in game code",
                                    source.snippet(node.span)
                                ),
                                &mut diagnostics,
                            );
                        }
                    }
                }
            }

            for &method_id in &class_decl.methods {
                let decl = DeclRef {
                    file,
                    decl: method_id,
                };
                for node in tree.descendants(tree.method(method_id).body) {
                    match &node.kind {
                        NodeKind::Member { .. } => {
                            let target = ctx.model().resolve_member_access(decl, node.id);
                            if let Some(MemberTarget::Builtin(member)) = target {
                                if member.is_editor_only() {
                                    report(
                                        node.span,
                                        format!(
                                            "{} is editor-only API referenced outside {}",
                                            source.snippet(node.span),
                                            EDITOR_DEFINE
                                        ),
                                        &mut diagnostics,
                                    );
                                }
                            }
                        }
                        NodeKind::New { type_name, .. } if editor_new(type_name) => {
                            report(
                                node.span,
                                format!(
                                    "{} constructs an editor-only type in game code",
                                    source.snippet(node.span)
                                ),
                                &mut diagnostics,
                            );
                        }
                        _ => {}
                    }
                }
            }
        }

        diagnostics
    }
}
