//! Inline review markers for suppressing diagnostics
//!
//! A reviewed line is one a human has audited and accepted. Markers:
//! - `// hotloop-reviewed P001` - suppress P001 on this line
//! - `// hotloop-reviewed-next-line P001` - suppress P001 on the next line
//! - `// hotloop-reviewed` - suppress every rule on this line
//! - `// hotloop-reviewed P001, P004` - suppress several rules
//!
//! The reachability engine also consults these: a reviewed method
//! declaration is excluded from the call-graph search entirely.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

const MARKER: &str = "hotloop-reviewed";
const NEXT_LINE_MARKER: &str = "hotloop-reviewed-next-line";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewMark {
    /// Bare marker: every rule on the line is covered.
    All,
    Rules(Vec<String>),
}

impl ReviewMark {
    pub fn covers(&self, rule_id: &str) -> bool {
        match self {
            ReviewMark::All => true,
            ReviewMark::Rules(ids) => ids.iter().any(|id| id == rule_id),
        }
    }
}

/// All review markers of one file, keyed by the 1-based line they cover.
#[derive(Debug, Clone, Default)]
pub struct ReviewMarks {
    by_line: HashMap<usize, ReviewMark>,
}

impl ReviewMarks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_source(source: &str) -> Self {
        let mut marks = Self::new();

        for (idx, line) in source.lines().enumerate() {
            let line_num = idx + 1;
            let Some(comment_start) = line.find("//") else {
                continue;
            };
            let comment = line[comment_start + 2..].trim();

            // Longest marker first: the short one is its prefix.
            if let Some(rest) = comment.strip_prefix(NEXT_LINE_MARKER) {
                if marker_boundary(rest) {
                    marks.add(line_num + 1, parse_rule_ids(rest));
                }
            } else if let Some(rest) = comment.strip_prefix(MARKER) {
                if marker_boundary(rest) {
                    marks.add(line_num, parse_rule_ids(rest));
                }
            }
        }

        marks
    }

    /// Markers aimed at the same line merge; an all-rules marker wins
    /// over rule-specific ones regardless of order.
    pub fn add(&mut self, line: usize, rule_ids: Vec<String>) {
        let mark = if rule_ids.is_empty() {
            ReviewMark::All
        } else {
            ReviewMark::Rules(rule_ids)
        };

        match self.by_line.entry(line) {
            Entry::Vacant(slot) => {
                slot.insert(mark);
            }
            Entry::Occupied(mut slot) => match (slot.get_mut(), mark) {
                (ReviewMark::All, _) => {}
                (slot_mark, ReviewMark::All) => *slot_mark = ReviewMark::All,
                (ReviewMark::Rules(existing), ReviewMark::Rules(new_ids)) => {
                    existing.extend(new_ids);
                }
            },
        }
    }

    pub fn is_reviewed(&self, line: usize, rule_id: &str) -> bool {
        self.by_line.get(&line).is_some_and(|m| m.covers(rule_id))
    }

    pub fn is_empty(&self) -> bool {
        self.by_line.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_line.len()
    }
}

fn marker_boundary(rest: &str) -> bool {
    rest.is_empty() || rest.starts_with(|c: char| c.is_whitespace())
}

fn parse_rule_ids(rest: &str) -> Vec<String> {
    rest.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
