//! Core analysis engine for the hotloop static analyzer
//!
//! hotloop finds per-frame performance hazards and editor-only API leaks
//! in Arc engine scripts. [`parser`] builds syntax trees, [`workspace`]
//! holds every file plus the cross-file symbol index, and [`reach`]
//! answers whether a frame callback can reach a flagged call through any
//! chain of user methods, caching verdicts and invalidating them when
//! files change. The [`rules`] turn those answers into diagnostics with
//! witness call chains; [`analysis::Analyzer`] ties it all together for
//! CLI and editor consumers.

pub mod analysis;
pub mod behaviour;
pub mod config;
pub mod diagnostic;
pub mod directives;
pub mod exclude;
pub mod parser;
pub mod reach;
pub mod review;
pub mod rules;
pub mod sem;
pub mod syntax;
pub mod workspace;

pub use analysis::{Analyzer, PARSE_RULE_ID, create_default_registry};
pub use config::{Config, ConfigError};
pub use diagnostic::{Diagnostic, TraceStep};
pub use rules::{Confidence, Rule, RuleRegistry, Severity};
pub use workspace::{FileId, Workspace};
