//! Lexer and recursive-descent parser for Arc scripts
//!
//! The front end is deliberately small: enough of the language to bind
//! classes, methods, fields, and the expressions the rules care about.
//! Parsing never fails outright; syntax errors are recorded on the
//! [`SourceFile`] and the parser re-synchronizes on `;` and `}`.
//!
//! Conditional-compilation lines (`#if` and friends) are trivia here:
//! the lexer drops them and every branch is parsed. The directive
//! analyzer works from the raw source text instead.

use std::sync::OnceLock;

use crate::review::ReviewMarks;
use crate::syntax::{NodeId, NodeKind, Param, Span, SyntaxTree, TreeId};

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message} at {line}:{column}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub span_lo: u32,
    pub span_hi: u32,
    pub message: String,
}

/// One parsed Arc script. Owns the source text, the syntax arenas, any
/// recovered parse errors, and the file's review markers.
pub struct SourceFile {
    path: String,
    source: String,
    tree_id: TreeId,
    tree: SyntaxTree,
    errors: Vec<ParseError>,
    reviews: ReviewMarks,
    line_starts: OnceLock<Vec<u32>>,
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("path", &self.path)
            .field("tree_id", &self.tree_id)
            .field("error_count", &self.errors.len())
            .finish()
    }
}

impl SourceFile {
    pub fn parse(path: &str, source: &str) -> Self {
        let (tokens, mut errors) = Lexer::new(source).tokenize();
        let mut parser = Parser::new(source, tokens);
        parser.parse_file();
        errors.extend(parser.errors);

        Self {
            path: path.to_string(),
            source: source.to_string(),
            tree_id: TreeId::fresh(),
            tree: parser.tree,
            errors,
            reviews: ReviewMarks::from_source(source),
            line_starts: OnceLock::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tree_id(&self) -> TreeId {
        self.tree_id
    }

    pub fn tree(&self) -> &SyntaxTree {
        &self.tree
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn reviews(&self) -> &ReviewMarks {
        &self.reviews
    }

    pub fn line_count(&self) -> usize {
        self.source.lines().count()
    }

    pub fn snippet(&self, span: Span) -> &str {
        &self.source[span.lo as usize..span.hi as usize]
    }

    /// 1-based line and column of a byte offset.
    pub fn line_col(&self, offset: u32) -> (usize, usize) {
        let starts = self.line_starts();
        let line = starts.partition_point(|&s| s <= offset);
        let col = offset - starts[line - 1] + 1;
        (line, col as usize)
    }

    pub fn get_line(&self, line_number: usize) -> Option<&str> {
        if line_number == 0 || self.source.is_empty() {
            return None;
        }
        let starts = self.line_starts();
        let start = *starts.get(line_number - 1)? as usize;
        if start >= self.source.len() {
            return None;
        }
        let end = starts
            .get(line_number)
            .map(|&s| s as usize - 1)
            .unwrap_or(self.source.len());
        Some(self.source[start..end].trim_end_matches('\r'))
    }

    fn line_starts(&self) -> &[u32] {
        self.line_starts.get_or_init(|| {
            let mut starts = vec![0u32];
            for (i, b) in self.source.bytes().enumerate() {
                if b == b'\n' {
                    starts.push(i as u32 + 1);
                }
            }
            starts
        })
    }
}

fn line_col_in(source: &str, offset: u32) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;
    for (i, c) in source.char_indices() {
        if i as u32 >= offset {
            break;
        }
        if c == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Ident(String),
    Number,
    Str,
    LBrace,
    RBrace,
    LParen,
    RParen,
    Comma,
    Semi,
    Dot,
    Colon,
    Arrow,
    Assign,
    Not,
    Op(String),
    Eof,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    span: Span,
}

struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line_has_token: bool,
    tokens: Vec<Token>,
    errors: Vec<ParseError>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            line_has_token: false,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn tokenize(mut self) -> (Vec<Token>, Vec<ParseError>) {
        while self.pos < self.bytes.len() {
            let start = self.pos;
            let b = self.bytes[self.pos];
            match b {
                b'\n' => {
                    self.line_has_token = false;
                    self.pos += 1;
                }
                b' ' | b'\t' | b'\r' => self.pos += 1,
                b'#' if !self.line_has_token => self.skip_line(),
                b'/' if self.peek_byte(1) == Some(b'/') => self.skip_line(),
                b'/' if self.peek_byte(1) == Some(b'*') => self.skip_block_comment(start),
                b'"' => self.lex_string(start),
                b'0'..=b'9' => self.lex_number(start),
                b'A'..=b'Z' | b'a'..=b'z' | b'_' => self.lex_ident(start),
                _ => self.lex_punct(start),
            }
        }
        let end = self.source.len() as u32;
        self.tokens.push(Token {
            kind: TokenKind::Eof,
            span: Span::new(end, end),
        });
        (self.tokens, self.errors)
    }

    fn peek_byte(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn skip_line(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos] != b'\n' {
            self.pos += 1;
        }
    }

    fn skip_block_comment(&mut self, start: usize) {
        self.pos += 2;
        while self.pos < self.bytes.len() {
            if self.bytes[self.pos] == b'*' && self.peek_byte(1) == Some(b'/') {
                self.pos += 2;
                return;
            }
            self.pos += 1;
        }
        self.error(start, self.pos, "unterminated block comment");
    }

    fn lex_string(&mut self, start: usize) {
        self.pos += 1;
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'\\' => self.pos = (self.pos + 2).min(self.bytes.len()),
                b'"' => {
                    self.pos += 1;
                    self.push(TokenKind::Str, start);
                    return;
                }
                b'\n' => break,
                _ => self.pos += 1,
            }
        }
        self.error(start, self.pos, "unterminated string literal");
        self.push(TokenKind::Str, start);
    }

    fn lex_number(&mut self, start: usize) {
        while self
            .peek_byte(0)
            .is_some_and(|b| b.is_ascii_digit() || b == b'.')
        {
            // a trailing `.member` belongs to the expression, not the number
            if self.bytes[self.pos] == b'.'
                && !self.peek_byte(1).is_some_and(|b| b.is_ascii_digit())
            {
                break;
            }
            self.pos += 1;
        }
        self.push(TokenKind::Number, start);
    }

    fn lex_ident(&mut self, start: usize) {
        while self
            .peek_byte(0)
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            self.pos += 1;
        }
        let text = self.source[start..self.pos].to_string();
        self.push(TokenKind::Ident(text), start);
    }

    fn lex_punct(&mut self, start: usize) {
        let b = self.bytes[self.pos];
        let two = self.peek_byte(1);
        let (kind, len) = match (b, two) {
            (b'=', Some(b'>')) => (TokenKind::Arrow, 2),
            (b'=', Some(b'=')) => (TokenKind::Op("==".into()), 2),
            (b'=', _) => (TokenKind::Assign, 1),
            (b'!', Some(b'=')) => (TokenKind::Op("!=".into()), 2),
            (b'!', _) => (TokenKind::Not, 1),
            (b'&', Some(b'&')) => (TokenKind::Op("&&".into()), 2),
            (b'|', Some(b'|')) => (TokenKind::Op("||".into()), 2),
            (b'<', Some(b'=')) => (TokenKind::Op("<=".into()), 2),
            (b'<', _) => (TokenKind::Op("<".into()), 1),
            (b'>', Some(b'=')) => (TokenKind::Op(">=".into()), 2),
            (b'>', _) => (TokenKind::Op(">".into()), 1),
            (b'+', _) => (TokenKind::Op("+".into()), 1),
            (b'-', _) => (TokenKind::Op("-".into()), 1),
            (b'*', _) => (TokenKind::Op("*".into()), 1),
            (b'/', _) => (TokenKind::Op("/".into()), 1),
            (b'%', _) => (TokenKind::Op("%".into()), 1),
            (b'{', _) => (TokenKind::LBrace, 1),
            (b'}', _) => (TokenKind::RBrace, 1),
            (b'(', _) => (TokenKind::LParen, 1),
            (b')', _) => (TokenKind::RParen, 1),
            (b',', _) => (TokenKind::Comma, 1),
            (b';', _) => (TokenKind::Semi, 1),
            (b'.', _) => (TokenKind::Dot, 1),
            (b':', _) => (TokenKind::Colon, 1),
            _ => {
                let c = self.source[start..].chars().next().unwrap_or('?');
                self.pos += c.len_utf8();
                self.error(start, self.pos, &format!("unexpected character `{c}`"));
                return;
            }
        };
        self.pos += len;
        self.push(kind, start);
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.line_has_token = true;
        self.tokens.push(Token {
            kind,
            span: Span::new(start as u32, self.pos as u32),
        });
    }

    fn error(&mut self, start: usize, end: usize, message: &str) {
        let (line, column) = line_col_in(self.source, start as u32);
        self.errors.push(ParseError {
            line,
            column,
            span_lo: start as u32,
            span_hi: end as u32,
            message: message.to_string(),
        });
    }
}

const RESERVED: &[&str] = &[
    "class", "using", "new", "var", "if", "else", "while", "return", "this", "void", "true",
    "false", "null", "public", "private", "static",
];

const MODIFIERS: &[&str] = &["public", "private", "static"];

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    tree: SyntaxTree,
    errors: Vec<ParseError>,
}

type Parsed<T> = Result<T, ()>;

impl<'a> Parser<'a> {
    fn new(source: &'a str, tokens: Vec<Token>) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            tree: SyntaxTree::new(),
            errors: Vec::new(),
        }
    }

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn peek_at(&self, ahead: usize) -> &TokenKind {
        let idx = (self.pos + ahead).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn cur_span(&self) -> Span {
        self.tokens[self.pos].span
    }

    fn bump(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.peek() == kind
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), TokenKind::Eof)
    }

    fn at_kw(&self, kw: &str) -> bool {
        matches!(self.peek(), TokenKind::Ident(s) if s == kw)
    }

    fn eat(&mut self, kind: &TokenKind) -> Option<Token> {
        if self.at(kind) { Some(self.bump()) } else { None }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Parsed<Token> {
        if self.at(kind) {
            Ok(self.bump())
        } else {
            self.error_here(&format!("expected {what}"));
            Err(())
        }
    }

    fn error_here(&mut self, message: &str) {
        let span = self.cur_span();
        let (line, column) = line_col_in(self.source, span.lo);
        self.errors.push(ParseError {
            line,
            column,
            span_lo: span.lo,
            span_hi: span.hi,
            message: message.to_string(),
        });
    }

    fn expect_ident(&mut self, what: &str) -> Parsed<(String, Span)> {
        match self.peek() {
            TokenKind::Ident(s) if !RESERVED.contains(&s.as_str()) => {
                let text = s.clone();
                let tok = self.bump();
                Ok((text, tok.span))
            }
            _ => {
                self.error_here(&format!("expected {what}"));
                Err(())
            }
        }
    }

    /// `Ident ('.' Ident)*` joined with dots; used for types, bases, and
    /// using-paths.
    fn qualified(&mut self) -> Parsed<(String, Span)> {
        let (mut text, mut span) = self.expect_ident("a name")?;
        while self.at(&TokenKind::Dot) {
            self.bump();
            let (seg, seg_span) = self.expect_ident("a name after `.`")?;
            text.push('.');
            text.push_str(&seg);
            span = Span::new(span.lo, seg_span.hi);
        }
        Ok((text, span))
    }

    fn skip_modifiers(&mut self) {
        while matches!(self.peek(), TokenKind::Ident(s) if MODIFIERS.contains(&s.as_str())) {
            self.bump();
        }
    }

    fn parse_file(&mut self) {
        while !self.at_eof() {
            if self.at_kw("using") {
                if self.parse_using().is_err() {
                    self.sync_item();
                }
            } else if self.at_kw("class")
                || matches!(self.peek(), TokenKind::Ident(s) if MODIFIERS.contains(&s.as_str()))
            {
                self.parse_class();
            } else {
                self.error_here("expected `using` or `class` declaration");
                self.bump();
            }
        }
    }

    fn parse_using(&mut self) -> Parsed<()> {
        let lo = self.bump().span.lo;
        let (path, _) = self.qualified()?;
        let semi = self.expect(&TokenKind::Semi, "`;` after using path")?;
        self.tree.usings.push(crate::syntax::UsingDecl {
            path,
            span: Span::new(lo, semi.span.hi),
        });
        Ok(())
    }

    fn parse_class(&mut self) {
        let lo = self.cur_span().lo;
        self.skip_modifiers();
        if !self.at_kw("class") {
            self.error_here("expected `class`");
            self.sync_item();
            return;
        }
        self.bump();
        let Ok((name, name_span)) = self.expect_ident("a class name") else {
            self.sync_item();
            return;
        };
        let base = if self.eat(&TokenKind::Colon).is_some() {
            match self.qualified() {
                Ok((b, _)) => Some(b),
                Err(()) => None,
            }
        } else {
            None
        };
        let class = self.tree.alloc_class(name, base, name_span);
        if self.expect(&TokenKind::LBrace, "`{` to open the class body").is_err() {
            self.sync_item();
            return;
        }
        while !self.at(&TokenKind::RBrace) && !self.at_eof() {
            if self.parse_member(class).is_err() {
                self.sync_member();
            }
        }
        let hi = self.cur_span().hi;
        self.eat(&TokenKind::RBrace);
        self.tree.class_mut(class).span = Span::new(lo, hi);
    }

    fn parse_member(&mut self, class: crate::syntax::ClassId) -> Parsed<()> {
        self.skip_modifiers();
        let lo = self.cur_span().lo;
        let return_type = if self.at_kw("void") {
            self.bump();
            "void".to_string()
        } else {
            self.qualified()?.0
        };
        let (name, name_span) = self.expect_ident("a member name")?;

        if self.at(&TokenKind::LParen) {
            let params = self.parse_params()?;
            let body = self.parse_block()?;
            let hi = self.tree.node(body).span.hi;
            self.tree.alloc_method(
                class,
                name,
                params,
                return_type,
                body,
                Span::new(lo, hi),
                name_span,
            );
        } else {
            let init = if self.eat(&TokenKind::Assign).is_some() {
                Some(self.parse_expr()?)
            } else {
                None
            };
            let semi = self.expect(&TokenKind::Semi, "`;` after field declaration")?;
            self.tree
                .alloc_field(class, name, return_type, init, Span::new(lo, semi.span.hi));
        }
        Ok(())
    }

    fn parse_params(&mut self) -> Parsed<Vec<Param>> {
        self.expect(&TokenKind::LParen, "`(`")?;
        let mut params = Vec::new();
        if !self.at(&TokenKind::RParen) {
            loop {
                let (type_name, _) = self.qualified()?;
                let (name, _) = self.expect_ident("a parameter name")?;
                params.push(Param { name, type_name });
                if self.eat(&TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "`)` after parameters")?;
        Ok(params)
    }

    fn parse_block(&mut self) -> Parsed<NodeId> {
        let open = self.expect(&TokenKind::LBrace, "`{`")?;
        let mut statements = Vec::new();
        while !self.at(&TokenKind::RBrace) && !self.at_eof() {
            match self.parse_stmt() {
                Ok(stmt) => statements.push(stmt),
                Err(()) => self.sync_stmt(),
            }
        }
        let hi = self.cur_span().hi;
        self.eat(&TokenKind::RBrace);
        Ok(self
            .tree
            .alloc_node(NodeKind::Block { statements }, Span::new(open.span.lo, hi)))
    }

    fn parse_stmt(&mut self) -> Parsed<NodeId> {
        if self.at(&TokenKind::LBrace) {
            return self.parse_block();
        }
        if self.at_kw("var") {
            let lo = self.bump().span.lo;
            let (name, _) = self.expect_ident("a variable name")?;
            self.expect(&TokenKind::Assign, "`=` in variable declaration")?;
            let init = self.parse_expr()?;
            let semi = self.expect(&TokenKind::Semi, "`;` after variable declaration")?;
            return Ok(self.tree.alloc_node(
                NodeKind::VarDecl { name, init },
                Span::new(lo, semi.span.hi),
            ));
        }
        if self.at_kw("if") {
            let lo = self.bump().span.lo;
            self.expect(&TokenKind::LParen, "`(` after `if`")?;
            let condition = self.parse_expr()?;
            self.expect(&TokenKind::RParen, "`)` after condition")?;
            let then_branch = self.parse_stmt()?;
            let mut hi = self.tree.node(then_branch).span.hi;
            let else_branch = if self.at_kw("else") {
                self.bump();
                let e = self.parse_stmt()?;
                hi = self.tree.node(e).span.hi;
                Some(e)
            } else {
                None
            };
            return Ok(self.tree.alloc_node(
                NodeKind::If {
                    condition,
                    then_branch,
                    else_branch,
                },
                Span::new(lo, hi),
            ));
        }
        if self.at_kw("while") {
            let lo = self.bump().span.lo;
            self.expect(&TokenKind::LParen, "`(` after `while`")?;
            let condition = self.parse_expr()?;
            self.expect(&TokenKind::RParen, "`)` after condition")?;
            let body = self.parse_stmt()?;
            let hi = self.tree.node(body).span.hi;
            return Ok(self
                .tree
                .alloc_node(NodeKind::While { condition, body }, Span::new(lo, hi)));
        }
        if self.at_kw("return") {
            let lo = self.bump().span.lo;
            let value = if self.at(&TokenKind::Semi) {
                None
            } else {
                Some(self.parse_expr()?)
            };
            let semi = self.expect(&TokenKind::Semi, "`;` after return")?;
            return Ok(self
                .tree
                .alloc_node(NodeKind::Return { value }, Span::new(lo, semi.span.hi)));
        }
        let expr = self.parse_expr()?;
        let lo = self.tree.node(expr).span.lo;
        let semi = self.expect(&TokenKind::Semi, "`;` after expression")?;
        Ok(self
            .tree
            .alloc_node(NodeKind::ExprStmt { expr }, Span::new(lo, semi.span.hi)))
    }

    fn parse_expr(&mut self) -> Parsed<NodeId> {
        let lhs = if self.lambda_ahead() {
            self.parse_lambda()?
        } else {
            self.parse_binary()?
        };
        if self.at(&TokenKind::Assign) {
            self.bump();
            let rhs = self.parse_expr()?;
            let span = Span::new(self.tree.node(lhs).span.lo, self.tree.node(rhs).span.hi);
            return Ok(self.tree.alloc_node(
                NodeKind::Assign {
                    target: lhs,
                    value: rhs,
                },
                span,
            ));
        }
        Ok(lhs)
    }

    fn lambda_ahead(&self) -> bool {
        match self.peek() {
            TokenKind::Ident(s) if !RESERVED.contains(&s.as_str()) => {
                matches!(self.peek_at(1), TokenKind::Arrow)
            }
            TokenKind::LParen => {
                let mut ahead = 1;
                loop {
                    match self.peek_at(ahead) {
                        TokenKind::Ident(_) | TokenKind::Comma => ahead += 1,
                        TokenKind::RParen => {
                            return matches!(self.peek_at(ahead + 1), TokenKind::Arrow);
                        }
                        _ => return false,
                    }
                }
            }
            _ => false,
        }
    }

    fn parse_lambda(&mut self) -> Parsed<NodeId> {
        let lo = self.cur_span().lo;
        let mut params = Vec::new();
        if self.at(&TokenKind::LParen) {
            self.bump();
            if !self.at(&TokenKind::RParen) {
                loop {
                    let (name, _) = self.expect_ident("a lambda parameter")?;
                    params.push(name);
                    if self.eat(&TokenKind::Comma).is_none() {
                        break;
                    }
                }
            }
            self.expect(&TokenKind::RParen, "`)` after lambda parameters")?;
        } else {
            let (name, _) = self.expect_ident("a lambda parameter")?;
            params.push(name);
        }
        self.expect(&TokenKind::Arrow, "`=>`")?;
        let body = if self.at(&TokenKind::LBrace) {
            self.parse_block()?
        } else {
            self.parse_expr()?
        };
        let hi = self.tree.node(body).span.hi;
        Ok(self
            .tree
            .alloc_node(NodeKind::Lambda { params, body }, Span::new(lo, hi)))
    }

    fn parse_binary(&mut self) -> Parsed<NodeId> {
        let mut lhs = self.parse_unary()?;
        while let TokenKind::Op(op) = self.peek() {
            let op = op.clone();
            self.bump();
            let rhs = self.parse_unary()?;
            let span = Span::new(self.tree.node(lhs).span.lo, self.tree.node(rhs).span.hi);
            lhs = self.tree.alloc_node(NodeKind::Binary { op, lhs, rhs }, span);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Parsed<NodeId> {
        if self.at(&TokenKind::Not) {
            let lo = self.bump().span.lo;
            let operand = self.parse_unary()?;
            let hi = self.tree.node(operand).span.hi;
            return Ok(self
                .tree
                .alloc_node(NodeKind::Not { operand }, Span::new(lo, hi)));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Parsed<NodeId> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.at(&TokenKind::Dot) {
                self.bump();
                let (name, name_span) = self.expect_ident("a member name after `.`")?;
                let span = Span::new(self.tree.node(expr).span.lo, name_span.hi);
                expr = self.tree.alloc_node(
                    NodeKind::Member {
                        receiver: expr,
                        name,
                    },
                    span,
                );
            } else if self.at(&TokenKind::LParen) {
                let (args, close) = self.parse_args()?;
                let span = Span::new(self.tree.node(expr).span.lo, close.hi);
                expr = self
                    .tree
                    .alloc_node(NodeKind::Invocation { callee: expr, args }, span);
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_args(&mut self) -> Parsed<(Vec<NodeId>, Span)> {
        self.expect(&TokenKind::LParen, "`(`")?;
        let mut args = Vec::new();
        if !self.at(&TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if self.eat(&TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        let close = self.expect(&TokenKind::RParen, "`)` after arguments")?;
        Ok((args, close.span))
    }

    fn parse_primary(&mut self) -> Parsed<NodeId> {
        if self.at_kw("new") {
            let lo = self.bump().span.lo;
            let (type_name, _) = self.qualified()?;
            let (args, close) = self.parse_args()?;
            return Ok(self.tree.alloc_node(
                NodeKind::New { type_name, args },
                Span::new(lo, close.hi),
            ));
        }
        if self.at_kw("this") {
            let tok = self.bump();
            return Ok(self.tree.alloc_node(NodeKind::This, tok.span));
        }
        if self.at_kw("true") || self.at_kw("false") || self.at_kw("null") {
            let tok = self.bump();
            return Ok(self.tree.alloc_node(NodeKind::Literal, tok.span));
        }
        match self.peek() {
            TokenKind::Number | TokenKind::Str => {
                let tok = self.bump();
                Ok(self.tree.alloc_node(NodeKind::Literal, tok.span))
            }
            TokenKind::Ident(s) if !RESERVED.contains(&s.as_str()) => {
                let text = s.clone();
                let tok = self.bump();
                Ok(self.tree.alloc_node(NodeKind::Ident(text), tok.span))
            }
            TokenKind::LParen => {
                self.bump();
                let inner = self.parse_expr()?;
                self.expect(&TokenKind::RParen, "`)`")?;
                Ok(inner)
            }
            _ => {
                self.error_here("expected an expression");
                Err(())
            }
        }
    }

    /// Skip to the next plausible member start inside a class body.
    fn sync_member(&mut self) {
        loop {
            match self.peek() {
                TokenKind::Semi => {
                    self.bump();
                    return;
                }
                TokenKind::RBrace | TokenKind::Eof => return,
                TokenKind::LBrace => {
                    self.skip_balanced_braces();
                    return;
                }
                _ => {
                    self.bump();
                }
            }
        }
    }

    /// Skip to the next plausible statement start inside a block.
    fn sync_stmt(&mut self) {
        loop {
            match self.peek() {
                TokenKind::Semi => {
                    self.bump();
                    return;
                }
                TokenKind::RBrace | TokenKind::Eof => return,
                TokenKind::LBrace => {
                    self.skip_balanced_braces();
                    return;
                }
                _ => {
                    self.bump();
                }
            }
        }
    }

    /// Skip to the next top-level item start.
    fn sync_item(&mut self) {
        loop {
            if self.at_eof() || self.at_kw("class") || self.at_kw("using") {
                return;
            }
            if self.at(&TokenKind::LBrace) {
                self.skip_balanced_braces();
                continue;
            }
            self.bump();
        }
    }

    fn skip_balanced_braces(&mut self) {
        debug_assert!(self.at(&TokenKind::LBrace));
        self.bump();
        let mut depth = 1usize;
        while depth > 0 && !self.at_eof() {
            match self.peek() {
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => depth -= 1,
                _ => {}
            }
            self.bump();
        }
    }
}
