//! Shared helper functions for rule implementations.
//!
//! Frame-path rules all follow the same shape: enumerate the frame callbacks
//! of behaviour classes in the analyzed file, query the rule's invocation
//! graph from each, and turn a witness path into a diagnostic. The driver
//! here does that once so the rules stay declarative.

use crate::behaviour::BehaviourInfo;
use crate::diagnostic::{Diagnostic, TraceStep};
use crate::reach::{CallSite, InvocationGraph};
use crate::rules::{Confidence, RuleCtx, RuleMetadata};
use crate::workspace::FileId;

/// Runs a reachability query from every frame callback declared in `file`
/// and builds one diagnostic per positive answer. The diagnostic points at
/// the first witness step, the node inside the frame callback itself;
/// `message` receives the callback name and the full witness path.
pub fn check_frame_paths(
    graph: &mut InvocationGraph,
    ctx: &RuleCtx<'_>,
    file: FileId,
    metadata: &RuleMetadata,
    message: impl Fn(&str, &[CallSite]) -> String,
    suggestion: Option<&str>,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let index = ctx.model().index();

    for class in index.classes() {
        let info = BehaviourInfo::new(index, class.id);
        info.for_each_frame_method(|method| {
            let root = method.primary_decl();
            if root.file != file {
                return;
            }
            let Some(witness) = graph.search(ctx, root) else {
                return;
            };
            let confidence = if witness.len() == 1 {
                Confidence::High
            } else {
                Confidence::Medium
            };
            let head = &witness[0];
            let mut diagnostic = Diagnostic::new(
                metadata.id,
                metadata.severity,
                message(&method.name, &witness),
                &head.file,
                head.line,
                head.column,
            )
            .with_confidence(confidence)
            .with_trace(witness_trace(&witness));
            if let Some(suggestion) = suggestion {
                diagnostic = diagnostic.with_suggestion(suggestion);
            }
            diagnostics.push(diagnostic);
        });
    }

    diagnostics
}

/// Converts a witness path into diagnostic trace steps.
pub fn witness_trace(witness: &[CallSite]) -> Vec<TraceStep> {
    witness
        .iter()
        .map(|site| TraceStep {
            text: site.text.clone(),
            file: site.file.clone(),
            line: site.line,
        })
        .collect()
}

/// Invalidates graph entries for every class declared in `file`. Rules call
/// this when a file changes, before the next query, so cached verdicts that
/// depended on the old parse are flagged instead of replayed.
pub fn invalidate_classes_in_file(graph: &mut InvocationGraph, ctx: &RuleCtx<'_>, file: FileId) {
    let index = ctx.model().index();
    for class_decl in ctx.file(file).tree().classes() {
        if let Some(class_id) = index.class_named(&class_decl.name) {
            graph.mark_class_dirty(ctx, class_id);
        }
    }
}
