//! Analysis session over a workspace of Arc scripts
//!
//! [`Analyzer`] owns the workspace, the rule registry, and the directive
//! index, and is the entry point CLI and editor consumers drive: feed it
//! files with [`Analyzer::upsert_file`], ask for diagnostics with
//! [`Analyzer::analyze_file`]. Updating a file notifies every rule so
//! cached call-graph verdicts that depend on it are invalidated rather
//! than recomputed from scratch.

use tracing::debug;

use crate::config::{Config, ConfigError};
use crate::diagnostic::Diagnostic;
use crate::directives::DirectiveIndex;
use crate::exclude::PathFilter;
use crate::rules::editor::{EditorFieldEscape, EditorImportOutsideGuard};
use crate::rules::perf::{
    CacheArrayApi, CameraMainInFrameLoop, ClosureCaptureInFrameLoop, CollectionAllocInFrameLoop,
    CoroutineStartInFrameLoop, EmptyFrameCallback, SceneFindInFrameLoop,
};
use crate::rules::{Confidence, RuleCtx, RuleRegistry, Severity};
use crate::workspace::{FileId, Workspace};

/// Rule id assigned to syntax errors.
pub const PARSE_RULE_ID: &str = "PARSE";

pub struct Analyzer {
    registry: RuleRegistry,
    workspace: Workspace,
    directives: DirectiveIndex,
    filter: PathFilter,
    min_confidence: Option<Confidence>,
}

impl Analyzer {
    pub fn new() -> Self {
        Self {
            registry: create_default_registry(),
            workspace: Workspace::new(),
            directives: DirectiveIndex::new(),
            filter: PathFilter::empty(),
            min_confidence: None,
        }
    }

    /// Build an analyzer honoring `hotloop.toml` settings. Fails when an
    /// include or exclude pattern is not a valid regex.
    pub fn with_config(config: &Config) -> Result<Self, ConfigError> {
        let filter = PathFilter::new(&config.include, &config.exclude)?;
        let mut registry = create_default_registry();
        registry.configure(&config.rules);
        Ok(Self {
            registry,
            workspace: Workspace::new(),
            directives: DirectiveIndex::new(),
            filter,
            min_confidence: config.rules.min_confidence.map(Confidence::from),
        })
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Add or replace one file, then let every rule react to the change.
    pub fn upsert_file(&mut self, path: &str, source: &str) -> FileId {
        let file = self.workspace.upsert_file(path, source);
        let ctx = RuleCtx::new(&self.workspace, &self.directives, &self.filter);
        self.registry.notify_file_updated(&ctx, file);
        file
    }

    pub fn file_id(&self, path: &str) -> Option<FileId> {
        self.workspace.file_id(path)
    }

    pub fn analyze_file(&mut self, file: FileId) -> Vec<Diagnostic> {
        let source = self.workspace.file(file);
        if self.filter.is_excluded(source.path()) {
            return Vec::new();
        }

        let mut diagnostics = Vec::new();
        for error in source.errors() {
            if source.reviews().is_reviewed(error.line, PARSE_RULE_ID) {
                continue;
            }
            diagnostics.push(Diagnostic::new(
                PARSE_RULE_ID,
                Severity::Error,
                error.message.clone(),
                source.path(),
                error.line,
                error.column,
            ));
        }

        let ctx = RuleCtx::new(&self.workspace, &self.directives, &self.filter);
        let reviews = ctx.file(file).reviews();
        for diagnostic in self.registry.run_all(&ctx, file) {
            if reviews.is_reviewed(diagnostic.line, &diagnostic.rule_id) {
                continue;
            }
            if self
                .min_confidence
                .is_some_and(|min| diagnostic.confidence.level() < min.level())
            {
                continue;
            }
            diagnostics.push(diagnostic);
        }

        debug!(
            file = source.path(),
            diagnostics = diagnostics.len(),
            "analyzed file"
        );
        diagnostics
    }

    /// Diagnostics for every file in the workspace, in file order.
    pub fn analyze_all(&mut self) -> Vec<Diagnostic> {
        let files: Vec<FileId> = self.workspace.files().map(|(id, _)| id).collect();
        let mut diagnostics = Vec::new();
        for file in files {
            diagnostics.extend(self.analyze_file(file));
        }
        diagnostics
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// All shipped rules, in id order. Hosts that want a subset can build
/// their own [`RuleRegistry`] instead.
pub fn create_default_registry() -> RuleRegistry {
    let mut registry = RuleRegistry::new();

    registry.register(Box::new(CameraMainInFrameLoop::new()));
    registry.register(Box::new(SceneFindInFrameLoop::new()));
    registry.register(Box::new(CoroutineStartInFrameLoop::new()));
    registry.register(Box::new(CollectionAllocInFrameLoop::new()));
    registry.register(Box::new(ClosureCaptureInFrameLoop::new()));
    registry.register(Box::new(CacheArrayApi::new()));
    registry.register(Box::new(EmptyFrameCallback::new()));
    registry.register(Box::new(EditorImportOutsideGuard::new()));
    registry.register(Box::new(EditorFieldEscape::new()));

    registry
}
