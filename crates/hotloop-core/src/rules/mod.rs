//! Rule system for script analysis
//!
//! Provides performance and editor-hygiene rules for analyzing Arc scripts.

pub mod editor;
pub mod helpers;
pub mod perf;

use crate::config::RulesConfig;
use crate::diagnostic::Diagnostic;
use crate::directives::DirectiveIndex;
use crate::exclude::PathFilter;
use crate::parser::SourceFile;
use crate::sem::{DeclRef, SemanticModel};
use crate::syntax::Span;
use crate::workspace::{FileId, Workspace};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Conditional-compilation define guarding editor-only code. Code inside
/// `#if ARC_EDITOR` never runs in the shipped frame loop.
pub const EDITOR_DEFINE: &str = "ARC_EDITOR";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

impl Severity {
    pub fn level(&self) -> u8 {
        match self {
            Severity::Error => 4,
            Severity::Warning => 3,
            Severity::Info => 2,
            Severity::Hint => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    #[default]
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn level(&self) -> u8 {
        match self {
            Confidence::High => 3,
            Confidence::Medium => 2,
            Confidence::Low => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleCategory {
    Performance,
    Editor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMetadata {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: RuleCategory,
    pub severity: Severity,
    pub docs_url: Option<&'static str>,
    pub examples: Option<&'static str>,
}

/// Shared facts handed to every rule: the semantic model over the current
/// workspace, the directive scopes, and the path filter.
pub struct RuleCtx<'a> {
    model: SemanticModel<'a>,
    directives: &'a DirectiveIndex,
    filter: &'a PathFilter,
}

impl<'a> RuleCtx<'a> {
    pub fn new(ws: &'a Workspace, directives: &'a DirectiveIndex, filter: &'a PathFilter) -> Self {
        Self {
            model: SemanticModel::new(ws),
            directives,
            filter,
        }
    }

    pub fn model(&self) -> &SemanticModel<'a> {
        &self.model
    }

    pub fn directives(&self) -> &'a DirectiveIndex {
        self.directives
    }

    pub fn filter(&self) -> &'a PathFilter {
        self.filter
    }

    pub fn file(&self, id: FileId) -> &'a SourceFile {
        self.model.workspace().file(id)
    }

    /// Whether a method declaration is out of bounds for `rule_id`: its file
    /// path is filtered out, a review comment covers its declaration line, or
    /// it sits inside editor-only directive scope.
    pub fn is_decl_excluded(&self, rule_id: &str, decl: DeclRef) -> bool {
        let file = self.file(decl.file);
        if self.filter.is_excluded(file.path()) {
            return true;
        }
        let span = file.tree().method(decl.decl).span;
        let (line, _) = file.line_col(span.lo);
        if file.reviews().is_reviewed(line, rule_id) {
            return true;
        }
        self.directives
            .is_within_scope(decl.file, file, span, EDITOR_DEFINE)
    }

    /// Whether an individual node is out of bounds for `rule_id`: a review
    /// comment covers its line, or it sits inside editor-only directive scope.
    pub fn is_site_excluded(&self, rule_id: &str, file_id: FileId, span: Span) -> bool {
        let file = self.file(file_id);
        let (line, _) = file.line_col(span.lo);
        if file.reviews().is_reviewed(line, rule_id) {
            return true;
        }
        self.directives
            .is_within_scope(file_id, file, span, EDITOR_DEFINE)
    }
}

pub trait Rule {
    fn metadata(&self) -> &RuleMetadata;

    fn check(&mut self, ctx: &RuleCtx<'_>, file: FileId) -> Vec<Diagnostic>;

    /// Called when a file's contents changed before the next `check`. Rules
    /// holding cross-file caches invalidate the affected entries here.
    fn on_file_updated(&mut self, _ctx: &RuleCtx<'_>, _file: FileId) {}
}

pub struct RuleRegistry {
    rules: Vec<Box<dyn Rule>>,
    enabled_rules: HashSet<String>,
    disabled_rules: HashSet<String>,
    severity_overrides: HashMap<String, Severity>,
    performance_enabled: bool,
    editor_enabled: bool,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            enabled_rules: HashSet::new(),
            disabled_rules: HashSet::new(),
            severity_overrides: HashMap::new(),
            performance_enabled: true,
            editor_enabled: true,
        }
    }

    pub fn register(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    pub fn configure(&mut self, config: &RulesConfig) {
        self.enabled_rules.clear();
        self.disabled_rules.clear();
        self.severity_overrides.clear();

        for rule_ref in &config.enabled {
            self.enabled_rules.insert(rule_ref.clone());
        }

        for rule_ref in &config.disabled {
            self.disabled_rules.insert(rule_ref.clone());
        }

        for (rule_ref, severity_value) in &config.severity {
            self.severity_overrides
                .insert(rule_ref.clone(), (*severity_value).into());
        }

        self.performance_enabled = config.performance.unwrap_or(true);
        self.editor_enabled = config.editor.unwrap_or(true);
    }

    pub fn rules(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    pub fn run_all(&mut self, ctx: &RuleCtx<'_>, file: FileId) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for index in 0..self.rules.len() {
            if !self.should_run_rule(self.rules[index].as_ref()) {
                continue;
            }
            let (id, name) = {
                let metadata = self.rules[index].metadata();
                (metadata.id, metadata.name)
            };
            let mut rule_diagnostics = self.rules[index].check(ctx, file);
            if let Some(severity) = self
                .severity_overrides
                .get(id)
                .or_else(|| self.severity_overrides.get(name))
            {
                for diag in rule_diagnostics.iter_mut() {
                    diag.severity = *severity;
                }
            }
            diagnostics.extend(rule_diagnostics);
        }
        diagnostics
    }

    /// Forwards a file-changed notification to every registered rule,
    /// including currently disabled ones so their caches never go stale.
    pub fn notify_file_updated(&mut self, ctx: &RuleCtx<'_>, file: FileId) {
        for rule in &mut self.rules {
            rule.on_file_updated(ctx, file);
        }
    }

    fn should_run_rule(&self, rule: &dyn Rule) -> bool {
        let metadata = rule.metadata();

        if !self.enabled_rules.is_empty()
            && !self.enabled_rules.contains(metadata.id)
            && !self.enabled_rules.contains(metadata.name)
        {
            return false;
        }

        if !self.performance_enabled && metadata.category == RuleCategory::Performance {
            return false;
        }
        if !self.editor_enabled && metadata.category == RuleCategory::Editor {
            return false;
        }

        !self.is_rule_disabled(metadata)
    }

    fn is_rule_disabled(&self, metadata: &RuleMetadata) -> bool {
        self.disabled_rules.contains(metadata.id) || self.disabled_rules.contains(metadata.name)
    }

    pub fn is_rule_enabled(&self, id_or_name: &str) -> bool {
        if let Some(rule) = self
            .get_rule(id_or_name)
            .or_else(|| self.get_rule_by_name(id_or_name))
        {
            self.should_run_rule(rule)
        } else {
            false
        }
    }

    pub fn get_rule(&self, id: &str) -> Option<&dyn Rule> {
        self.rules
            .iter()
            .find(|r| r.metadata().id == id)
            .map(|r| r.as_ref())
    }

    pub fn get_rule_by_name(&self, name: &str) -> Option<&dyn Rule> {
        self.rules
            .iter()
            .find(|r| r.metadata().name == name)
            .map(|r| r.as_ref())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[macro_export]
macro_rules! declare_rule {
    (
        $name:ident,
        id = $id:literal,
        name = $rule_name:literal,
        description = $desc:literal,
        category = $cat:ident,
        severity = $sev:ident
        $(, docs_url = $url:literal)?
        $(, examples = $examples:literal)?
    ) => {
        pub struct $name {
            metadata: $crate::rules::RuleMetadata,
        }

        impl $name {
            pub fn new() -> Self {
                Self {
                    metadata: $crate::rules::RuleMetadata {
                        id: $id,
                        name: $rule_name,
                        description: $desc,
                        category: $crate::rules::RuleCategory::$cat,
                        severity: $crate::rules::Severity::$sev,
                        docs_url: declare_rule!(@docs_url $($url)?),
                        examples: declare_rule!(@examples $($examples)?),
                    },
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
    (@docs_url $url:literal) => { Some($url) };
    (@docs_url) => { None };
    (@examples $examples:literal) => { Some($examples) };
    (@examples) => { None };
}
