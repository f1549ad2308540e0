//! Diagnostic reporting for analysis results
//!
//! A [`Diagnostic`] carries the rule id, position, message, and for
//! findings proved through a call chain, the trace of call sites from
//! the frame callback down to the offending expression.

use serde::Serialize;

use crate::rules::{Confidence, Severity};

/// One hop of a call chain backing an indirect finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceStep {
    pub text: String,
    pub file: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub rule_id: String,
    pub severity: Severity,
    pub confidence: Confidence,
    pub message: String,
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub end_line: Option<usize>,
    pub end_column: Option<usize>,
    pub suggestion: Option<String>,
    pub trace: Vec<TraceStep>,
}

impl Diagnostic {
    pub fn new(
        rule_id: &str,
        severity: Severity,
        message: impl Into<String>,
        file: &str,
        line: usize,
        column: usize,
    ) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            severity,
            confidence: Confidence::default(),
            message: message.into(),
            file: file.to_string(),
            line,
            column,
            end_line: None,
            end_column: None,
            suggestion: None,
            trace: Vec::new(),
        }
    }

    pub fn with_end(mut self, end_line: usize, end_column: usize) -> Self {
        self.end_line = Some(end_line);
        self.end_column = Some(end_column);
        self
    }

    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_trace(mut self, trace: Vec<TraceStep>) -> Self {
        self.trace = trace;
        self
    }

    /// Human-readable rendering of the call chain, one hop per line.
    pub fn render_trace(&self) -> String {
        self.trace
            .iter()
            .map(|step| format!("-> {} ({}:{})", step.text, step.file, step.line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// JSON report over a whole analysis pass, for embedding hosts.
pub fn to_json(diagnostics: &[Diagnostic]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_fills_optional_fields() {
        let diagnostic = Diagnostic::new(
            "P001",
            Severity::Warning,
            "Camera.main reached from Update",
            "player.arc",
            4,
            8,
        )
        .with_end(4, 19)
        .with_confidence(Confidence::Medium)
        .with_suggestion("Cache the camera in a field");

        assert_eq!(diagnostic.rule_id, "P001");
        assert_eq!(diagnostic.end_line, Some(4));
        assert_eq!(diagnostic.end_column, Some(19));
        assert_eq!(diagnostic.confidence, Confidence::Medium);
        assert_eq!(
            diagnostic.suggestion,
            Some("Cache the camera in a field".to_string())
        );
        assert!(diagnostic.trace.is_empty());
    }

    #[test]
    fn trace_renders_one_hop_per_line() {
        let diagnostic = Diagnostic::new("P001", Severity::Warning, "m", "a.arc", 3, 5).with_trace(
            vec![
                TraceStep {
                    text: "Helper()".to_string(),
                    file: "a.arc".to_string(),
                    line: 3,
                },
                TraceStep {
                    text: "Camera.main".to_string(),
                    file: "a.arc".to_string(),
                    line: 7,
                },
            ],
        );

        assert_eq!(
            diagnostic.render_trace(),
            "-> Helper() (a.arc:3)\n-> Camera.main (a.arc:7)"
        );
    }

    #[test]
    fn serializes_to_json() {
        let diagnostic =
            Diagnostic::new("E001", Severity::Error, "editor import", "tool.arc", 1, 1);
        let json = diagnostic.to_json().unwrap();

        assert!(json.contains("\"rule_id\":\"E001\""));
        assert!(json.contains("\"severity\":\"error\""));
        assert!(json.contains("\"line\":1"));
    }

    #[test]
    fn report_renders_a_json_array() {
        let diagnostics = vec![
            Diagnostic::new("P001", Severity::Warning, "a", "a.arc", 1, 1),
            Diagnostic::new("E001", Severity::Error, "b", "b.arc", 2, 2),
        ];
        let report = to_json(&diagnostics).unwrap();

        assert!(report.starts_with('['));
        assert!(report.contains("\"rule_id\": \"P001\""));
        assert!(report.contains("\"rule_id\": \"E001\""));
    }
}
