//! Symbol tables for Arc scripts
//!
//! The binder runs over every parsed file and produces a workspace-wide
//! index: classes merged by name (partial declarations land in one
//! symbol), methods keyed by a stable `Class.Method/arity` signature,
//! fields with their declared type names. Signature keys survive
//! re-parses; arena ids do not, which is why the reachability cache is
//! keyed by signature and never by id.

use std::collections::HashMap;

use id_arena::{Arena, Id};

use crate::parser::SourceFile;
use crate::syntax::{ClassId, FieldDeclId, MethodDeclId};
use crate::workspace::FileId;

pub type ClassSymId = Id<ClassSymbol>;
pub type MethodSymId = Id<MethodSymbol>;

/// One physical method declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclRef {
    pub file: FileId,
    pub decl: MethodDeclId,
}

#[derive(Debug)]
pub struct ClassSymbol {
    pub id: ClassSymId,
    pub name: String,
    pub base: Option<String>,
    /// Physical declarations; more than one for partial classes.
    pub decls: Vec<(FileId, ClassId)>,
    pub methods: Vec<MethodSymId>,
    pub fields: Vec<FieldSymbol>,
}

impl ClassSymbol {
    pub fn field(&self, name: &str) -> Option<&FieldSymbol> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug)]
pub struct FieldSymbol {
    pub name: String,
    pub type_name: String,
    pub file: FileId,
    pub decl: FieldDeclId,
}

#[derive(Debug)]
pub struct MethodSymbol {
    pub id: MethodSymId,
    pub class: ClassSymId,
    pub name: String,
    pub arity: usize,
    /// Stable signature key, `Class.Method/arity`.
    pub key: String,
    /// All physical declarations, workspace order; first is primary.
    pub decls: Vec<DeclRef>,
}

impl MethodSymbol {
    pub fn primary_decl(&self) -> DeclRef {
        self.decls[0]
    }
}

pub fn method_key(class_name: &str, method_name: &str, arity: usize) -> String {
    format!("{class_name}.{method_name}/{arity}")
}

#[derive(Debug, Default)]
pub struct SemanticIndex {
    classes: Arena<ClassSymbol>,
    methods: Arena<MethodSymbol>,
    class_by_name: HashMap<String, ClassSymId>,
    method_by_key: HashMap<String, MethodSymId>,
    method_of_decl: HashMap<DeclRef, MethodSymId>,
}

impl SemanticIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the whole index from the given files. Ids are fresh each
    /// bind; only signature keys are stable.
    pub fn bind<'a>(files: impl Iterator<Item = (FileId, &'a SourceFile)>) -> Self {
        let mut index = Self::new();
        for (file_id, file) in files {
            index.bind_file(file_id, file);
        }
        index
    }

    fn bind_file(&mut self, file_id: FileId, file: &SourceFile) {
        let tree = file.tree();
        for class_decl in tree.classes() {
            let class_sym = self.intern_class(&class_decl.name, class_decl.base.clone());
            self.classes[class_sym]
                .decls
                .push((file_id, class_decl.id));

            for field in tree.fields_of(class_decl.id) {
                if self.classes[class_sym].field(&field.name).is_none() {
                    self.classes[class_sym].fields.push(FieldSymbol {
                        name: field.name.clone(),
                        type_name: field.type_name.clone(),
                        file: file_id,
                        decl: field.id,
                    });
                }
            }

            for method in tree.methods_of(class_decl.id) {
                let key = method_key(&class_decl.name, &method.name, method.params.len());
                let decl_ref = DeclRef {
                    file: file_id,
                    decl: method.id,
                };
                let method_sym = match self.method_by_key.get(&key) {
                    Some(&existing) => {
                        self.methods[existing].decls.push(decl_ref);
                        existing
                    }
                    None => {
                        let id = self.methods.alloc_with_id(|id| MethodSymbol {
                            id,
                            class: class_sym,
                            name: method.name.clone(),
                            arity: method.params.len(),
                            key: key.clone(),
                            decls: vec![decl_ref],
                        });
                        self.method_by_key.insert(key, id);
                        self.classes[class_sym].methods.push(id);
                        id
                    }
                };
                self.method_of_decl.insert(decl_ref, method_sym);
            }
        }
    }

    fn intern_class(&mut self, name: &str, base: Option<String>) -> ClassSymId {
        if let Some(&existing) = self.class_by_name.get(name) {
            if self.classes[existing].base.is_none() {
                self.classes[existing].base = base;
            }
            return existing;
        }
        let id = self.classes.alloc_with_id(|id| ClassSymbol {
            id,
            name: name.to_string(),
            base,
            decls: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
        });
        self.class_by_name.insert(name.to_string(), id);
        id
    }

    pub fn class(&self, id: ClassSymId) -> &ClassSymbol {
        &self.classes[id]
    }

    pub fn method(&self, id: MethodSymId) -> &MethodSymbol {
        &self.methods[id]
    }

    pub fn class_named(&self, name: &str) -> Option<ClassSymId> {
        self.class_by_name.get(name).copied()
    }

    pub fn method_by_key(&self, key: &str) -> Option<MethodSymId> {
        self.method_by_key.get(key).copied()
    }

    /// Declared-symbol-for-declaration lookup.
    pub fn method_of_decl(&self, decl: DeclRef) -> Option<MethodSymId> {
        self.method_of_decl.get(&decl).copied()
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassSymbol> {
        self.classes.iter().map(|(_, c)| c)
    }
}
