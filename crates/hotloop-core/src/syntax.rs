//! Arena-backed syntax trees for Arc scripts
//!
//! Nodes, class/method/field declarations, and using-imports live in
//! per-file arenas. Node identity is stable within one parse; a re-parse
//! of the same path produces a fresh [`TreeId`], which is what the
//! incremental caches compare to detect edits.

use std::sync::atomic::{AtomicU64, Ordering};

use id_arena::{Arena, Id};

pub type NodeId = Id<Node>;
pub type ClassId = Id<ClassDecl>;
pub type MethodDeclId = Id<MethodDecl>;
pub type FieldDeclId = Id<FieldDecl>;

/// Byte range within one file's source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub lo: u32,
    pub hi: u32,
}

impl Span {
    pub fn new(lo: u32, hi: u32) -> Self {
        Self { lo, hi }
    }

    pub fn contains(&self, other: Span) -> bool {
        self.lo <= other.lo && other.hi <= self.hi
    }
}

/// Parse identity. Every successful parse mints a new value, so two
/// parses of the same path never compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeId(u64);

impl TreeId {
    pub fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        TreeId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Ident(String),
    This,
    Literal,
    /// `receiver.name`
    Member {
        receiver: NodeId,
        name: String,
    },
    /// `callee(args)` where callee is an identifier or member access
    Invocation {
        callee: NodeId,
        args: Vec<NodeId>,
    },
    /// `new Type(args)`
    New {
        type_name: String,
        args: Vec<NodeId>,
    },
    Assign {
        target: NodeId,
        value: NodeId,
    },
    /// Flat binary chain; operator semantics are irrelevant to analysis.
    Binary {
        op: String,
        lhs: NodeId,
        rhs: NodeId,
    },
    Not {
        operand: NodeId,
    },
    /// `x => e` or `(a, b) => { ... }`; body is an expression or a block
    Lambda {
        params: Vec<String>,
        body: NodeId,
    },
    Block {
        statements: Vec<NodeId>,
    },
    /// `var name = init;`
    VarDecl {
        name: String,
        init: NodeId,
    },
    If {
        condition: NodeId,
        then_branch: NodeId,
        else_branch: Option<NodeId>,
    },
    While {
        condition: NodeId,
        body: NodeId,
    },
    Return {
        value: Option<NodeId>,
    },
    ExprStmt {
        expr: NodeId,
    },
}

#[derive(Debug)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub type_name: String,
}

#[derive(Debug)]
pub struct ClassDecl {
    pub id: ClassId,
    pub name: String,
    pub base: Option<String>,
    pub span: Span,
    pub name_span: Span,
    pub methods: Vec<MethodDeclId>,
    pub fields: Vec<FieldDeclId>,
}

#[derive(Debug)]
pub struct MethodDecl {
    pub id: MethodDeclId,
    pub class: ClassId,
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: String,
    pub body: NodeId,
    pub span: Span,
    pub name_span: Span,
}

#[derive(Debug)]
pub struct FieldDecl {
    pub id: FieldDeclId,
    pub class: ClassId,
    pub name: String,
    pub type_name: String,
    pub init: Option<NodeId>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct UsingDecl {
    pub path: String,
    pub span: Span,
}

/// One file's syntax arenas plus top-level items.
#[derive(Debug, Default)]
pub struct SyntaxTree {
    nodes: Arena<Node>,
    classes: Arena<ClassDecl>,
    methods: Arena<MethodDecl>,
    fields: Arena<FieldDecl>,
    pub usings: Vec<UsingDecl>,
    class_order: Vec<ClassId>,
}

impl SyntaxTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_node(&mut self, kind: NodeKind, span: Span) -> NodeId {
        self.nodes.alloc_with_id(|id| Node { id, kind, span })
    }

    pub fn alloc_class(&mut self, name: String, base: Option<String>, name_span: Span) -> ClassId {
        let id = self.classes.alloc_with_id(|id| ClassDecl {
            id,
            name,
            base,
            span: name_span,
            name_span,
            methods: Vec::new(),
            fields: Vec::new(),
        });
        self.class_order.push(id);
        id
    }

    pub fn alloc_method(
        &mut self,
        class: ClassId,
        name: String,
        params: Vec<Param>,
        return_type: String,
        body: NodeId,
        span: Span,
        name_span: Span,
    ) -> MethodDeclId {
        let id = self.methods.alloc_with_id(|id| MethodDecl {
            id,
            class,
            name,
            params,
            return_type,
            body,
            span,
            name_span,
        });
        self.classes[class].methods.push(id);
        id
    }

    pub fn alloc_field(
        &mut self,
        class: ClassId,
        name: String,
        type_name: String,
        init: Option<NodeId>,
        span: Span,
    ) -> FieldDeclId {
        let id = self.fields.alloc_with_id(|id| FieldDecl {
            id,
            class,
            name,
            type_name,
            init,
            span,
        });
        self.classes[class].fields.push(id);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn class(&self, id: ClassId) -> &ClassDecl {
        &self.classes[id]
    }

    pub fn class_mut(&mut self, id: ClassId) -> &mut ClassDecl {
        &mut self.classes[id]
    }

    pub fn method(&self, id: MethodDeclId) -> &MethodDecl {
        &self.methods[id]
    }

    pub fn field(&self, id: FieldDeclId) -> &FieldDecl {
        &self.fields[id]
    }

    /// Classes in declaration order.
    pub fn classes(&self) -> impl Iterator<Item = &ClassDecl> {
        self.class_order.iter().map(|&id| &self.classes[id])
    }

    pub fn methods_of(&self, class: ClassId) -> impl Iterator<Item = &MethodDecl> {
        self.classes[class].methods.iter().map(|&id| &self.methods[id])
    }

    pub fn fields_of(&self, class: ClassId) -> impl Iterator<Item = &FieldDecl> {
        self.classes[class].fields.iter().map(|&id| &self.fields[id])
    }

    /// Pre-order walk of `root` and everything below it, in source order.
    pub fn descendants(&self, root: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            stack: vec![root],
        }
    }

    /// Invocation expressions under `root`, in source order.
    pub fn invocations_in(&self, root: NodeId) -> impl Iterator<Item = &Node> {
        self.descendants(root)
            .filter(|n| matches!(n.kind, NodeKind::Invocation { .. }))
    }

    fn children_of(&self, id: NodeId) -> Vec<NodeId> {
        match &self.nodes[id].kind {
            NodeKind::Ident(_) | NodeKind::This | NodeKind::Literal => Vec::new(),
            NodeKind::Member { receiver, .. } => vec![*receiver],
            NodeKind::Invocation { callee, args } => {
                let mut out = vec![*callee];
                out.extend(args.iter().copied());
                out
            }
            NodeKind::New { args, .. } => args.clone(),
            NodeKind::Assign { target, value } => vec![*target, *value],
            NodeKind::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
            NodeKind::Not { operand } => vec![*operand],
            NodeKind::Lambda { body, .. } => vec![*body],
            NodeKind::Block { statements } => statements.clone(),
            NodeKind::VarDecl { init, .. } => vec![*init],
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let mut out = vec![*condition, *then_branch];
                out.extend(else_branch.iter().copied());
                out
            }
            NodeKind::While { condition, body } => vec![*condition, *body],
            NodeKind::Return { value } => value.iter().copied().collect(),
            NodeKind::ExprStmt { expr } => vec![*expr],
        }
    }
}

pub struct Descendants<'a> {
    tree: &'a SyntaxTree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let children = self.tree.children_of(id);
        self.stack.extend(children.into_iter().rev());
        Some(&self.tree.nodes[id])
    }
}
