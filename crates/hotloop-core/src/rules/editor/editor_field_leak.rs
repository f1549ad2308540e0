//! editor-field-escape rule (E002): Fields declared under `#if ARC_EDITOR`
//! referenced from unguarded code
//!
//! A field declared inside an editor guard does not exist in the game build.
//! Any unguarded read or write of it compiles in the editor and fails to
//! load when the guard is stripped, so the reference itself is the bug.

use crate::declare_rule;
use crate::diagnostic::Diagnostic;
use crate::rules::{Rule, RuleCtx, RuleMetadata, EDITOR_DEFINE};
use crate::sem::{ClassSymId, DeclRef, FieldSymbol, MemberTarget, SemanticIndex};
use crate::syntax::NodeKind;
use crate::workspace::FileId;

const GUARD_HINT: &str = "Guard the use with #if ARC_EDITOR or move the field out of the guard";

/// Field lookup through the user base-class chain, own fields first.
fn field_in_chain<'a>(
    index: &'a SemanticIndex,
    start: Option<ClassSymId>,
    name: &str,
) -> Option<&'a FieldSymbol> {
    let mut visited = Vec::new();
    let mut current = start;
    while let Some(id) = current {
        if visited.contains(&id) {
            break;
        }
        visited.push(id);
        let sym = index.class(id);
        if let Some(field) = sym.field(name) {
            return Some(field);
        }
        current = sym.base.as_deref().and_then(|b| index.class_named(b));
    }
    None
}

declare_rule!(
    EditorFieldEscape,
    id = "E002",
    name = "editor-field-escape",
    description = "Do not reference fields declared under #if ARC_EDITOR from unguarded code",
    category = Editor,
    severity = Error,
    examples = "// Bad\n#if ARC_EDITOR\n  string label;\n#endif\n  void Update() { Draw(label); }"
);

impl EditorFieldEscape {
    /// Whether the field's declaration sits inside an `#if ARC_EDITOR`
    /// region of its declaring file.
    fn declared_under_guard(&self, ctx: &RuleCtx<'_>, field: &FieldSymbol) -> bool {
        let source = ctx.file(field.file);
        let span = source.tree().field(field.decl).span;
        ctx.directives()
            .is_within_scope(field.file, source, span, EDITOR_DEFINE)
    }
}

impl Rule for EditorFieldEscape {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn check(&mut self, ctx: &RuleCtx<'_>, file: FileId) -> Vec<Diagnostic> {
        let source = ctx.file(file);
        let tree = source.tree();
        let index = ctx.model().index();
        let mut diagnostics = Vec::new();

        for class_decl in tree.classes() {
            let enclosing = index.class_named(&class_decl.name);

            for &method_id in &class_decl.methods {
                let decl = DeclRef {
                    file,
                    decl: method_id,
                };
                let method = tree.method(method_id);

                for node in tree.descendants(method.body) {
                    let field = match &node.kind {
                        NodeKind::Member { .. } => {
                            match ctx.model().resolve_member_access(decl, node.id) {
                                Some(MemberTarget::Field(field)) => Some(field),
                                _ => None,
                            }
                        }
                        // A bare name is a field read only when nothing
                        // closer shadows it.
                        NodeKind::Ident(name) => {
                            let shadowed = method.params.iter().any(|p| p.name == *name)
                                || tree.descendants(method.body).any(|n| match &n.kind {
                                    NodeKind::VarDecl { name: local, .. } => local == name,
                                    NodeKind::Lambda { params, .. } => params.contains(name),
                                    _ => false,
                                });
                            if shadowed {
                                None
                            } else {
                                field_in_chain(index, enclosing, name)
                            }
                        }
                        _ => None,
                    };

                    let Some(field) = field else {
                        continue;
                    };
                    if !self.declared_under_guard(ctx, field)
                        || ctx.is_site_excluded(self.metadata.id, file, node.span)
                    {
                        continue;
                    }

                    let (line, column) = source.line_col(node.span.lo);
                    diagnostics.push(
                        Diagnostic::new(
                            self.metadata.id,
                            self.metadata.severity,
                            format!(
                                "Field {} exists only under {} but is used in game code",
                                field.name, EDITOR_DEFINE
                            ),
                            source.path(),
                            line,
                            column,
                        )
                        .with_suggestion(GUARD_HINT),
                    );
                }
            }
        }

        diagnostics
    }
}
