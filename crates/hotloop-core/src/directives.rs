//! Conditional-compilation scope queries
//!
//! The parser treats `#`-directive lines as trivia, so region structure
//! is recovered here by scanning the raw source into a flat, ordered
//! marker list. [`DirectiveIndex::is_within_scope`] then answers whether
//! a span lies inside an `#if SYMBOL` region where the symbol appears
//! un-negated. Marker lists are cached per file and rebuilt when the
//! file's tree identity changes.
//!
//! `#else` is deliberately inert: it neither leaves the scope of the
//! `#if` branch nor enters the complement of a negated condition. A span
//! in the `#else` arm of `#if ARC_EDITOR` still reports as in scope.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::parser::SourceFile;
use crate::syntax::{Span, TreeId};
use crate::workspace::FileId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    If,
    Elif,
    Else,
    EndIf,
}

#[derive(Debug, Clone)]
pub struct DirectiveMarker {
    pub kind: DirectiveKind,
    pub span: Span,
    /// Raw condition text for `If`/`Elif`, comment-stripped.
    pub condition: Option<String>,
}

impl DirectiveMarker {
    fn references_unnegated(&self, symbol: &str) -> bool {
        self.condition
            .as_deref()
            .is_some_and(|cond| condition_references(cond, symbol))
    }
}

/// True when `symbol` occurs in `cond` as a whole word whose preceding
/// operator is not `!`.
fn condition_references(cond: &str, symbol: &str) -> bool {
    let bytes = cond.as_bytes();
    let mut i = 0;
    let mut negated = false;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_ascii_alphanumeric() || c == '_' {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            if &cond[start..i] == symbol && !negated {
                return true;
            }
            negated = false;
        } else if c.is_whitespace() {
            i += 1;
        } else {
            negated = c == '!';
            i += 1;
        }
    }
    false
}

/// Scan raw source for directive lines. A directive is a line whose
/// first non-whitespace character is `#`.
pub(crate) fn scan_directives(source: &str) -> Vec<DirectiveMarker> {
    let mut markers = Vec::new();
    let mut offset = 0usize;
    for line in source.split_inclusive('\n') {
        if let Some(marker) = parse_directive_line(line, offset) {
            markers.push(marker);
        }
        offset += line.len();
    }
    markers
}

fn parse_directive_line(line: &str, line_start: usize) -> Option<DirectiveMarker> {
    let trimmed = line.trim_start();
    let rest = trimmed.strip_prefix('#')?;
    let body = rest.trim_start();
    let word_len = body
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .count();
    let (word, tail) = body.split_at(word_len);
    let kind = match word {
        "if" => DirectiveKind::If,
        "elif" => DirectiveKind::Elif,
        "else" => DirectiveKind::Else,
        "endif" => DirectiveKind::EndIf,
        _ => return None,
    };
    let condition = match kind {
        DirectiveKind::If | DirectiveKind::Elif => {
            let cond = match tail.find("//") {
                Some(i) => &tail[..i],
                None => tail,
            };
            Some(cond.trim().to_string())
        }
        _ => None,
    };
    let lo = (line_start + (line.len() - trimmed.len())) as u32;
    let hi = (line_start + line.trim_end().len()) as u32;
    Some(DirectiveMarker {
        kind,
        span: Span::new(lo, hi),
        condition,
    })
}

/// Per-file directive marker cache keyed by tree identity.
#[derive(Debug, Default)]
pub struct DirectiveIndex {
    cache: RefCell<HashMap<FileId, (TreeId, Rc<Vec<DirectiveMarker>>)>>,
}

impl DirectiveIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Is `span` inside an `#if`/`#elif` region whose condition names
    /// `symbol` un-negated, before the region's matching `#endif`?
    pub fn is_within_scope(
        &self,
        file_id: FileId,
        file: &SourceFile,
        span: Span,
        symbol: &str,
    ) -> bool {
        let markers = self.markers_for(file_id, file);
        let mut depth: i32 = 0;
        let mut first_match: Option<i32> = None;
        for marker in markers.iter() {
            match marker.kind {
                DirectiveKind::If => {
                    depth += 1;
                    if first_match.is_none()
                        && marker.span.lo < span.lo
                        && marker.references_unnegated(symbol)
                    {
                        first_match = Some(depth);
                    }
                }
                DirectiveKind::Elif => {
                    if first_match.is_none()
                        && marker.span.lo < span.lo
                        && marker.references_unnegated(symbol)
                    {
                        first_match = Some(depth);
                    }
                }
                DirectiveKind::Else => {}
                DirectiveKind::EndIf => {
                    if let Some(recorded) = first_match {
                        if depth >= recorded && marker.span.lo > span.hi {
                            return true;
                        }
                    }
                    depth -= 1;
                    if first_match.is_some_and(|recorded| depth < recorded) {
                        first_match = None;
                    }
                }
            }
        }
        false
    }

    fn markers_for(&self, file_id: FileId, file: &SourceFile) -> Rc<Vec<DirectiveMarker>> {
        let mut cache = self.cache.borrow_mut();
        match cache.get(&file_id) {
            Some((tree_id, markers)) if *tree_id == file.tree_id() => Rc::clone(markers),
            _ => {
                let markers = Rc::new(scan_directives(file.source()));
                cache.insert(file_id, (file.tree_id(), Rc::clone(&markers)));
                markers
            }
        }
    }
}
