//! File store for a set of Arc scripts
//!
//! Files keep their [`FileId`] across edits; each re-parse mints a
//! fresh tree id, and the semantic index is rebuilt over all files so
//! cross-file references stay current.

use std::collections::HashMap;

use crate::parser::SourceFile;
use crate::sem::SemanticIndex;

/// Stable handle to a file in the workspace. Survives re-parses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub usize);

#[derive(Debug, Default)]
pub struct Workspace {
    files: Vec<SourceFile>,
    by_path: HashMap<String, FileId>,
    index: SemanticIndex,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, or replace its content if the path is already known.
    /// The file id is stable either way; the tree id is always fresh.
    pub fn upsert_file(&mut self, path: &str, source: &str) -> FileId {
        let parsed = SourceFile::parse(path, source);
        let id = match self.by_path.get(path) {
            Some(&id) => {
                self.files[id.0] = parsed;
                id
            }
            None => {
                let id = FileId(self.files.len());
                self.files.push(parsed);
                self.by_path.insert(path.to_string(), id);
                id
            }
        };
        self.rebind();
        id
    }

    fn rebind(&mut self) {
        self.index = SemanticIndex::bind(
            self.files
                .iter()
                .enumerate()
                .map(|(i, f)| (FileId(i), f)),
        );
    }

    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id.0]
    }

    pub fn file_id(&self, path: &str) -> Option<FileId> {
        self.by_path.get(path).copied()
    }

    pub fn files(&self) -> impl Iterator<Item = (FileId, &SourceFile)> {
        self.files.iter().enumerate().map(|(i, f)| (FileId(i), f))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn index(&self) -> &SemanticIndex {
        &self.index
    }
}
