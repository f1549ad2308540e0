//! Semantic resolution over Arc scripts
//!
//! [`SemanticModel`] answers the questions rules ask: what does this
//! call land on, what does this member access read, which names does a
//! lambda capture. Resolution is name-based over the workspace index
//! plus the builtin registry. User classes shadow engine types; locals
//! are untyped and resolve to nothing, so chains through a local stay
//! unresolved rather than guessed.

pub mod builtins;
pub mod symbols;

use std::collections::HashSet;
use std::sync::OnceLock;

use crate::syntax::{NodeId, NodeKind, SyntaxTree};
use crate::workspace::Workspace;

pub use builtins::{BuiltinMember, BuiltinRegistry, BuiltinType, MemberKind};
pub use symbols::{
    ClassSymId, ClassSymbol, DeclRef, FieldSymbol, MethodSymId, MethodSymbol, SemanticIndex,
    method_key,
};

/// Process-wide Arc API table.
pub fn arc_registry() -> &'static BuiltinRegistry {
    static REGISTRY: OnceLock<BuiltinRegistry> = OnceLock::new();
    REGISTRY.get_or_init(BuiltinRegistry::arc_engine)
}

/// What an invocation resolves to.
#[derive(Debug, Clone, Copy)]
pub enum CallTarget {
    /// A user method declared somewhere in the workspace.
    Method(MethodSymId),
    /// An engine API member.
    Builtin(&'static BuiltinMember),
}

/// What a member access resolves to.
#[derive(Debug, Clone, Copy)]
pub enum MemberTarget<'a> {
    Builtin(&'static BuiltinMember),
    Field(&'a FieldSymbol),
}

/// How a name read inside a lambda is bound in the enclosing scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capture {
    This,
    Field(String),
    Local(String),
    Param(String),
}

impl Capture {
    /// Captures that root the enclosing object into the closure.
    pub fn pins_receiver(&self) -> bool {
        matches!(self, Capture::This | Capture::Field(_))
    }
}

#[derive(Debug, Clone)]
pub(crate) enum TypeRef {
    User(ClassSymId),
    Builtin(&'static BuiltinType),
    Namespace(String),
}

/// Read-only resolution facade over a [`Workspace`].
pub struct SemanticModel<'a> {
    ws: &'a Workspace,
}

impl<'a> SemanticModel<'a> {
    pub fn new(ws: &'a Workspace) -> Self {
        Self { ws }
    }

    pub fn workspace(&self) -> &'a Workspace {
        self.ws
    }

    pub fn index(&self) -> &'a SemanticIndex {
        self.ws.index()
    }

    pub fn builtins(&self) -> &'static BuiltinRegistry {
        arc_registry()
    }

    /// Resolve the callee of an invocation node inside the given method
    /// declaration. `None` when the receiver cannot be typed.
    pub fn resolve_invocation(&self, decl: DeclRef, node: NodeId) -> Option<CallTarget> {
        let tree = self.ws.file(decl.file).tree();
        let NodeKind::Invocation { callee, args } = &tree.node(node).kind else {
            return None;
        };
        let arity = args.len();
        match &tree.node(*callee).kind {
            NodeKind::Ident(name) => {
                let class = self.enclosing_class_id(decl)?;
                self.lookup_call_in_chain(class, name, arity)
            }
            NodeKind::Member { receiver, name } => match self.type_of_expr(decl, *receiver)? {
                TypeRef::User(class) => self.lookup_call_in_chain(class, name, arity),
                TypeRef::Builtin(ty) => ty.member(name).map(CallTarget::Builtin),
                TypeRef::Namespace(_) => None,
            },
            _ => None,
        }
    }

    /// Resolve `receiver.name` to an engine member or a user field.
    pub fn resolve_member_access(&self, decl: DeclRef, node: NodeId) -> Option<MemberTarget<'a>> {
        let tree = self.ws.file(decl.file).tree();
        let NodeKind::Member { receiver, name } = &tree.node(node).kind else {
            return None;
        };
        match self.type_of_expr(decl, *receiver)? {
            TypeRef::User(class) => self
                .lookup_field_in_chain(class, name)
                .map(MemberTarget::Field),
            TypeRef::Builtin(ty) => ty.member(name).map(MemberTarget::Builtin),
            TypeRef::Namespace(_) => None,
        }
    }

    /// Symbol declared by a physical method declaration.
    pub fn declared_method(&self, decl: DeclRef) -> Option<&'a MethodSymbol> {
        self.index()
            .method_of_decl(decl)
            .map(|id| self.index().method(id))
    }

    pub fn enclosing_class(&self, decl: DeclRef) -> Option<&'a ClassSymbol> {
        self.enclosing_class_id(decl).map(|id| self.index().class(id))
    }

    /// Names a lambda body reads that are bound outside it. Callee and
    /// type names are not captures and are skipped.
    pub fn free_variables(&self, decl: DeclRef, lambda: NodeId) -> Vec<Capture> {
        let tree = self.ws.file(decl.file).tree();
        let NodeKind::Lambda { params, body } = &tree.node(lambda).kind else {
            return Vec::new();
        };

        let mut bound: HashSet<&str> = params.iter().map(String::as_str).collect();
        for node in tree.descendants(*body) {
            match &node.kind {
                NodeKind::VarDecl { name, .. } => {
                    bound.insert(name);
                }
                NodeKind::Lambda { params: nested, .. } => {
                    bound.extend(nested.iter().map(String::as_str));
                }
                _ => {}
            }
        }

        let method = tree.method(decl.decl);
        let class = self.enclosing_class_id(decl);
        let mut captures = Vec::new();
        for node in tree.descendants(*body) {
            let capture = match &node.kind {
                NodeKind::This => Some(Capture::This),
                NodeKind::Ident(name) if !bound.contains(name.as_str()) => {
                    if Self::binds_local(tree, method.body, name) {
                        Some(Capture::Local(name.clone()))
                    } else if method.params.iter().any(|p| p.name == *name) {
                        Some(Capture::Param(name.clone()))
                    } else if class
                        .is_some_and(|c| self.lookup_field_in_chain(c, name).is_some())
                    {
                        Some(Capture::Field(name.clone()))
                    } else {
                        None
                    }
                }
                _ => None,
            };
            if let Some(capture) = capture {
                if !captures.contains(&capture) {
                    captures.push(capture);
                }
            }
        }
        captures
    }

    fn enclosing_class_id(&self, decl: DeclRef) -> Option<ClassSymId> {
        let tree = self.ws.file(decl.file).tree();
        let class_decl = tree.class(tree.method(decl.decl).class);
        self.index().class_named(&class_decl.name)
    }

    fn lookup_call_in_chain(
        &self,
        class: ClassSymId,
        name: &str,
        arity: usize,
    ) -> Option<CallTarget> {
        let index = self.index();
        let mut visited = HashSet::new();
        let mut current = Some(class);
        while let Some(id) = current {
            if !visited.insert(id) {
                break;
            }
            let sym = index.class(id);
            if let Some(found) = index.method_by_key(&method_key(&sym.name, name, arity)) {
                return Some(CallTarget::Method(found));
            }
            current = match sym.base.as_deref().and_then(|b| self.resolve_type_name(b)) {
                Some(TypeRef::User(next)) => Some(next),
                Some(TypeRef::Builtin(ty)) => return ty.member(name).map(CallTarget::Builtin),
                _ => None,
            };
        }
        None
    }

    fn lookup_field_in_chain(&self, class: ClassSymId, name: &str) -> Option<&'a FieldSymbol> {
        let index = self.index();
        let mut visited = HashSet::new();
        let mut current = Some(class);
        while let Some(id) = current {
            if !visited.insert(id) {
                break;
            }
            let sym = index.class(id);
            if let Some(field) = sym.field(name) {
                return Some(field);
            }
            current = match sym.base.as_deref().and_then(|b| self.resolve_type_name(b)) {
                Some(TypeRef::User(next)) => Some(next),
                _ => None,
            };
        }
        None
    }

    pub(crate) fn type_of_expr(&self, decl: DeclRef, node: NodeId) -> Option<TypeRef> {
        let tree = self.ws.file(decl.file).tree();
        match &tree.node(node).kind {
            NodeKind::This => self.enclosing_class_id(decl).map(TypeRef::User),
            NodeKind::Ident(name) => self.type_of_name(decl, name),
            NodeKind::Member { receiver, name } => match self.type_of_expr(decl, *receiver)? {
                TypeRef::Namespace(ns) => {
                    let combined = format!("{ns}.{name}");
                    if self.builtins().is_namespace(&combined) {
                        return Some(TypeRef::Namespace(combined));
                    }
                    self.builtins()
                        .type_in_namespace(&ns, name)
                        .map(TypeRef::Builtin)
                }
                TypeRef::Builtin(ty) => {
                    let member = ty.member(name)?;
                    self.resolve_type_name(member.result_type)
                }
                TypeRef::User(class) => {
                    let field = self.lookup_field_in_chain(class, name)?;
                    self.resolve_type_name(&field.type_name)
                }
            },
            NodeKind::Invocation { .. } => match self.resolve_invocation(decl, node)? {
                CallTarget::Method(m) => {
                    let primary = self.index().method(m).primary_decl();
                    let ret = self
                        .ws
                        .file(primary.file)
                        .tree()
                        .method(primary.decl)
                        .return_type
                        .clone();
                    self.resolve_type_name(&ret)
                }
                CallTarget::Builtin(member) => self.resolve_type_name(member.result_type),
            },
            NodeKind::New { type_name, .. } => self.resolve_type_name(type_name),
            _ => None,
        }
    }

    fn type_of_name(&self, decl: DeclRef, name: &str) -> Option<TypeRef> {
        let tree = self.ws.file(decl.file).tree();
        let method = tree.method(decl.decl);
        // Locals are untyped; a `var`-bound name resolves to nothing.
        if Self::binds_local(tree, method.body, name) {
            return None;
        }
        if let Some(param) = method.params.iter().find(|p| p.name == name) {
            return self.resolve_type_name(&param.type_name);
        }
        if let Some(class) = self.enclosing_class_id(decl) {
            if let Some(field) = self.lookup_field_in_chain(class, name) {
                return self.resolve_type_name(&field.type_name);
            }
        }
        self.resolve_type_name(name)
    }

    /// Resolve a (possibly dotted) type name. User classes shadow engine
    /// types with the same name.
    pub(crate) fn resolve_type_name(&self, name: &str) -> Option<TypeRef> {
        if let Some(class) = self.index().class_named(name) {
            return Some(TypeRef::User(class));
        }
        let builtins = self.builtins();
        if builtins.is_namespace(name) {
            return Some(TypeRef::Namespace(name.to_string()));
        }
        match name.rsplit_once('.') {
            Some((prefix, last)) if builtins.is_namespace(prefix) => builtins
                .type_in_namespace(prefix, last)
                .map(TypeRef::Builtin),
            Some(_) => None,
            None => builtins.type_named(name).map(TypeRef::Builtin),
        }
    }

    fn binds_local(tree: &SyntaxTree, body: NodeId, name: &str) -> bool {
        tree.descendants(body)
            .any(|n| matches!(&n.kind, NodeKind::VarDecl { name: local, .. } if local == name))
    }
}
