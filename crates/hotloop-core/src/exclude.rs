//! Path-based file filtering
//!
//! Compiles the `include` and `exclude` patterns from `hotloop.toml` into
//! a [`PathFilter`]. A file is excluded when the include list is non-empty
//! and no include pattern matches, or when any exclude pattern matches.
//! Verdicts are cached per path since rules consult the filter repeatedly.

use regex::Regex;
use std::cell::RefCell;
use std::collections::HashMap;

use crate::config::ConfigError;

#[derive(Debug)]
pub struct PathFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
    cache: RefCell<HashMap<String, bool>>,
}

impl PathFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, ConfigError> {
        Ok(Self {
            include: compile_patterns(include)?,
            exclude: compile_patterns(exclude)?,
            cache: RefCell::new(HashMap::new()),
        })
    }

    /// A filter that excludes nothing.
    pub fn empty() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        if let Some(&cached) = self.cache.borrow().get(path) {
            return cached;
        }

        let outside_include =
            !self.include.is_empty() && !self.include.iter().any(|re| re.is_match(path));
        let excluded = outside_include || self.exclude.iter().any(|re| re.is_match(path));

        self.cache.borrow_mut().insert(path.to_string(), excluded);
        excluded
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })
        })
        .collect()
}
