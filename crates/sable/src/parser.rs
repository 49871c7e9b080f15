//! The parser: token stream to AST.
//!
//! A straightforward recursive descent. Parsing stops at the first error
//! and reports a single located diagnostic naming what was being parsed
//! and which token was expected.

use crate::ast::{Ast, BinOp, DeclId, DeclKind, ExprId, ExprKind, Param, ProjectionKind, TypeExprId, TypeExprKind, UnOp};
use crate::diagnostic::Diagnostic;
use crate::location::Location;
use crate::token::{Token, TokenKind};
use crate::types::Primitive;

/// Parses a whole program: zero or more declarations up to the end of the
/// token stream.
pub fn parse_program(tokens: &[Token<'_>], ast: &mut Ast) -> Result<Vec<DeclId>, Diagnostic> {
    let mut p = Parser::new(tokens, ast);
    let mut decls = Vec::new();
    while p.peek().kind != TokenKind::End {
        decls.push(p.decl()?);
    }
    Ok(decls)
}

/// Parses a single declaration; trailing tokens are an error.
pub fn parse_decl(tokens: &[Token<'_>], ast: &mut Ast) -> Result<DeclId, Diagnostic> {
    let mut p = Parser::new(tokens, ast);
    let decl = p.decl()?;
    p.expect_end()?;
    Ok(decl)
}

/// Parses a single expression; trailing tokens are an error.
pub fn parse_expr(tokens: &[Token<'_>], ast: &mut Ast) -> Result<ExprId, Diagnostic> {
    let mut p = Parser::new(tokens, ast);
    let expr = p.expr()?;
    p.expect_end()?;
    Ok(expr)
}

struct Parser<'t, 's, 'a> {
    tokens: &'t [Token<'s>],
    pos: usize,
    ast: &'a mut Ast,
}

impl<'t, 's, 'a> Parser<'t, 's, 'a> {
    fn new(tokens: &'t [Token<'s>], ast: &'a mut Ast) -> Self {
        debug_assert!(
            matches!(tokens.last(), Some(t) if t.kind == TokenKind::End),
            "token stream must end with an End token"
        );
        Self { tokens, pos: 0, ast }
    }

    fn peek(&self) -> &Token<'s> {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn bump(&mut self) -> Token<'s> {
        let tok = *self.peek();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// "I got stuck parsing X. I was expecting Y next."
    fn stuck(&self, parsing: &'static str, expecting: &'static str) -> Diagnostic {
        Diagnostic::error()
            .text(format!(
                "I got stuck parsing {parsing}. I was expecting {expecting} next.\n"
            ))
            .snippet(self.peek().loc)
    }

    fn expect(&mut self, kind: TokenKind, parsing: &'static str) -> Result<Token<'s>, Diagnostic> {
        if self.at(kind) {
            Ok(self.bump())
        } else {
            Err(self.stuck(parsing, kind.describe()))
        }
    }

    fn expect_end(&self) -> Result<(), Diagnostic> {
        if self.at(TokenKind::End) {
            Ok(())
        } else {
            Err(self.stuck("the end of the input", "the end of the file"))
        }
    }

    /// Byte offset one past the last consumed token.
    fn prev_end(&self) -> u32 {
        if self.pos == 0 {
            0
        } else {
            self.tokens[self.pos - 1].end_offset()
        }
    }

    /// A location spanning from `start` to the last consumed token.
    fn span_from(&self, start: &Token<'s>) -> Location {
        Location::new(start.loc.row, start.loc.col, self.prev_end().saturating_sub(start.offset))
    }

    //========================================================================//
    // Declarations
    //========================================================================//

    fn decl(&mut self) -> Result<DeclId, Diagnostic> {
        match self.peek_kind() {
            TokenKind::KwExtern => self.extern_func(),
            TokenKind::KwFunc => self.func(),
            TokenKind::KwModule => self.module(),
            TokenKind::KwStruct => self.struct_decl(),
            _ => Err(self.stuck("a declaration", "`extern`, `func`, `module`, or `struct`")),
        }
    }

    fn module(&mut self) -> Result<DeclId, Diagnostic> {
        let start = self.bump();
        let name_tok = self.expect(TokenKind::Ident, "a module")?;
        self.expect(TokenKind::LBrace, "a module")?;
        let mut decls = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::End) {
            decls.push(self.decl()?);
        }
        self.expect(TokenKind::RBrace, "a module")?;
        let loc = self.span_from(&start);
        Ok(self.ast.alloc_decl(
            DeclKind::Module {
                name: name_tok.text.to_owned(),
                decls,
            },
            loc,
            name_tok.loc,
        ))
    }

    fn struct_decl(&mut self) -> Result<DeclId, Diagnostic> {
        let start = self.bump();
        let name_tok = self.expect(TokenKind::Ident, "a struct")?;
        self.expect(TokenKind::LBrace, "a struct")?;
        let (fields, variadic) = self.param_list(TokenKind::RBrace, "a struct")?;
        if variadic {
            return Err(self.stuck("a struct", "a field name"));
        }
        self.expect(TokenKind::RBrace, "a struct")?;
        let loc = self.span_from(&start);
        Ok(self.ast.alloc_decl(
            DeclKind::Struct {
                name: name_tok.text.to_owned(),
                fields,
            },
            loc,
            name_tok.loc,
        ))
    }

    fn func(&mut self) -> Result<DeclId, Diagnostic> {
        let start = self.bump();
        let name_tok = self.expect(TokenKind::Ident, "a function")?;
        self.expect(TokenKind::LParen, "a function")?;
        let (params, variadic) = self.param_list(TokenKind::RParen, "a function")?;
        self.expect(TokenKind::RParen, "a function")?;
        self.expect(TokenKind::Colon, "a function")?;
        let return_ty = self.type_expr()?;
        self.expect(TokenKind::Equal, "a function")?;
        let body = self.expr()?;
        self.expect(TokenKind::Semicolon, "a function")?;
        let loc = self.span_from(&start);
        Ok(self.ast.alloc_decl(
            DeclKind::Function {
                name: name_tok.text.to_owned(),
                params,
                variadic,
                return_ty,
                body: Some(body),
            },
            loc,
            name_tok.loc,
        ))
    }

    fn extern_func(&mut self) -> Result<DeclId, Diagnostic> {
        let start = self.bump();
        self.expect(TokenKind::KwFunc, "an extern declaration")?;
        let name_tok = self.expect(TokenKind::Ident, "an extern declaration")?;
        self.expect(TokenKind::LParen, "an extern declaration")?;
        let (params, variadic) = self.param_list(TokenKind::RParen, "an extern declaration")?;
        self.expect(TokenKind::RParen, "an extern declaration")?;
        self.expect(TokenKind::Colon, "an extern declaration")?;
        let return_ty = self.type_expr()?;
        self.expect(TokenKind::Semicolon, "an extern declaration")?;
        let loc = self.span_from(&start);
        Ok(self.ast.alloc_decl(
            DeclKind::Function {
                name: name_tok.text.to_owned(),
                params,
                variadic,
                return_ty,
                body: None,
            },
            loc,
            name_tok.loc,
        ))
    }

    /// Zero or more `name: type` pairs separated by commas, with optional
    /// trailing comma, optionally ending in `...`. Stops before `close`.
    fn param_list(&mut self, close: TokenKind, parsing: &'static str) -> Result<(Vec<Param>, bool), Diagnostic> {
        let mut params = Vec::new();
        let mut variadic = false;
        loop {
            if self.at(close) || self.at(TokenKind::End) {
                break;
            }
            if self.eat(TokenKind::Ellipsis) {
                variadic = true;
                break;
            }
            let name_tok = self.expect(TokenKind::Ident, parsing)?;
            self.expect(TokenKind::Colon, parsing)?;
            let ty = self.type_expr()?;
            params.push(Param {
                name: name_tok.text.to_owned(),
                name_loc: name_tok.loc,
                ty,
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        Ok((params, variadic))
    }

    //========================================================================//
    // Type expressions
    //========================================================================//

    fn type_expr(&mut self) -> Result<TypeExprId, Diagnostic> {
        let start = *self.peek();
        let prim = match self.peek_kind() {
            TokenKind::KwBool => Some(Primitive::Bool),
            TokenKind::KwI8 => Some(Primitive::I8),
            TokenKind::KwI16 => Some(Primitive::I16),
            TokenKind::KwI32 => Some(Primitive::I32),
            TokenKind::KwI64 => Some(Primitive::I64),
            TokenKind::KwF32 => Some(Primitive::F32),
            TokenKind::KwF64 => Some(Primitive::F64),
            TokenKind::KwUnit => Some(Primitive::Unit),
            _ => None,
        };
        if let Some(p) = prim {
            self.bump();
            return Ok(self.ast.alloc_type_expr(TypeExprKind::Prim(p), start.loc));
        }
        match self.peek_kind() {
            TokenKind::Amp | TokenKind::Hash => {
                let unique = self.bump().kind == TokenKind::Hash;
                let pointee = self.type_expr()?;
                let loc = self.span_from(&start);
                Ok(self.ast.alloc_type_expr(TypeExprKind::Ref { pointee, unique }, loc))
            }
            TokenKind::Ident => {
                let name = self.qualified_name()?;
                let loc = self.span_from(&start);
                Ok(self.ast.alloc_type_expr(TypeExprKind::Named(name), loc))
            }
            _ => Err(self.stuck("a type", "a type")),
        }
    }

    /// `ident (:: ident)*` joined with `::`.
    fn qualified_name(&mut self) -> Result<String, Diagnostic> {
        let first = self.expect(TokenKind::Ident, "a name")?;
        let mut name = first.text.to_owned();
        while self.eat(TokenKind::ColonColon) {
            let part = self.expect(TokenKind::Ident, "a name")?;
            name.push_str("::");
            name.push_str(part.text);
        }
        Ok(name)
    }

    //========================================================================//
    // Expressions, one method per precedence level
    //========================================================================//

    fn expr(&mut self) -> Result<ExprId, Diagnostic> {
        let start = *self.peek();
        let lhs = self.ascribe_expr()?;
        if self.eat(TokenKind::Equal) {
            let rhs = self.ascribe_expr()?;
            let loc = self.span_from(&start);
            return Ok(self.ast.alloc_expr(ExprKind::Assign { lhs, rhs }, loc));
        }
        Ok(lhs)
    }

    fn ascribe_expr(&mut self) -> Result<ExprId, Diagnostic> {
        let start = *self.peek();
        let mut e = self.or_expr()?;
        while self.eat(TokenKind::Colon) {
            let ascription = self.type_expr()?;
            let loc = self.span_from(&start);
            e = self.ast.alloc_expr(ExprKind::Ascribe { inner: e, ascription }, loc);
        }
        Ok(e)
    }

    fn or_expr(&mut self) -> Result<ExprId, Diagnostic> {
        let start = *self.peek();
        let mut e = self.and_expr()?;
        while self.eat(TokenKind::PipePipe) {
            let rhs = self.and_expr()?;
            let loc = self.span_from(&start);
            e = self.ast.alloc_expr(ExprKind::Binop { op: BinOp::Or, lhs: e, rhs }, loc);
        }
        Ok(e)
    }

    fn and_expr(&mut self) -> Result<ExprId, Diagnostic> {
        let start = *self.peek();
        let mut e = self.cmp_expr()?;
        while self.eat(TokenKind::AmpAmp) {
            let rhs = self.cmp_expr()?;
            let loc = self.span_from(&start);
            e = self.ast.alloc_expr(ExprKind::Binop { op: BinOp::And, lhs: e, rhs }, loc);
        }
        Ok(e)
    }

    fn cmp_expr(&mut self) -> Result<ExprId, Diagnostic> {
        let start = *self.peek();
        let mut e = self.add_expr()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEq => BinOp::Eq,
                TokenKind::BangEq => BinOp::Ne,
                TokenKind::Lt => BinOp::Lt,
                TokenKind::Le => BinOp::Le,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::Ge => BinOp::Ge,
                _ => break,
            };
            self.bump();
            let rhs = self.add_expr()?;
            let loc = self.span_from(&start);
            e = self.ast.alloc_expr(ExprKind::Binop { op, lhs: e, rhs }, loc);
        }
        Ok(e)
    }

    fn add_expr(&mut self) -> Result<ExprId, Diagnostic> {
        let start = *self.peek();
        let mut e = self.mul_expr()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.bump();
            let rhs = self.mul_expr()?;
            let loc = self.span_from(&start);
            e = self.ast.alloc_expr(ExprKind::Binop { op, lhs: e, rhs }, loc);
        }
        Ok(e)
    }

    fn mul_expr(&mut self) -> Result<ExprId, Diagnostic> {
        let start = *self.peek();
        let mut e = self.prefix_expr()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.bump();
            let rhs = self.prefix_expr()?;
            let loc = self.span_from(&start);
            e = self.ast.alloc_expr(ExprKind::Binop { op, lhs: e, rhs }, loc);
        }
        Ok(e)
    }

    fn prefix_expr(&mut self) -> Result<ExprId, Diagnostic> {
        let start = *self.peek();
        let kind = match self.peek_kind() {
            TokenKind::Bang => {
                self.bump();
                let inner = self.prefix_expr()?;
                ExprKind::Unop { op: UnOp::Not, inner }
            }
            TokenKind::Minus => {
                self.bump();
                let inner = self.prefix_expr()?;
                ExprKind::Unop { op: UnOp::Neg, inner }
            }
            TokenKind::Amp => {
                self.bump();
                let inner = self.prefix_expr()?;
                ExprKind::AddrOf { inner }
            }
            TokenKind::KwBorrow => {
                self.bump();
                let inner = self.prefix_expr()?;
                ExprKind::Borrow { inner }
            }
            TokenKind::KwMove => {
                self.bump();
                let inner = self.prefix_expr()?;
                ExprKind::Move { inner }
            }
            _ => return self.postfix_expr(),
        };
        let loc = self.span_from(&start);
        Ok(self.ast.alloc_expr(kind, loc))
    }

    fn postfix_expr(&mut self) -> Result<ExprId, Diagnostic> {
        let start = *self.peek();
        let mut e = self.primary_expr()?;
        loop {
            match self.peek_kind() {
                TokenKind::Bang => {
                    self.bump();
                    let loc = self.span_from(&start);
                    e = self.ast.alloc_expr(ExprKind::Deref { inner: e }, loc);
                }
                TokenKind::Dot => {
                    self.bump();
                    let field = self.expect(TokenKind::Ident, "a projection")?;
                    let loc = self.span_from(&start);
                    e = self.ast.alloc_expr(
                        ExprKind::Project {
                            base: e,
                            field: field.text.to_owned(),
                            kind: ProjectionKind::Dot,
                        },
                        loc,
                    );
                }
                TokenKind::Arrow => {
                    self.bump();
                    let field = self.expect(TokenKind::Ident, "a projection")?;
                    let loc = self.span_from(&start);
                    e = self.ast.alloc_expr(
                        ExprKind::Project {
                            base: e,
                            field: field.text.to_owned(),
                            kind: ProjectionKind::Arrow,
                        },
                        loc,
                    );
                }
                TokenKind::LBracket => {
                    self.bump();
                    if self.eat(TokenKind::Dot) {
                        let field = self.expect(TokenKind::Ident, "a projection")?;
                        self.expect(TokenKind::RBracket, "a projection")?;
                        let loc = self.span_from(&start);
                        e = self.ast.alloc_expr(
                            ExprKind::Project {
                                base: e,
                                field: field.text.to_owned(),
                                kind: ProjectionKind::Brackets,
                            },
                            loc,
                        );
                    } else {
                        let index = self.expr()?;
                        self.expect(TokenKind::RBracket, "an index expression")?;
                        let loc = self.span_from(&start);
                        e = self.ast.alloc_expr(ExprKind::Index { base: e, index }, loc);
                    }
                }
                _ => break,
            }
        }
        Ok(e)
    }

    fn primary_expr(&mut self) -> Result<ExprId, Diagnostic> {
        let start = *self.peek();
        match self.peek_kind() {
            TokenKind::IntLit => {
                let tok = self.bump();
                let value: i64 = tok
                    .text
                    .parse()
                    .map_err(|_| Diagnostic::error().text("Integer literal is too large.\n").snippet(tok.loc))?;
                Ok(self.ast.alloc_expr(ExprKind::IntLit(value), tok.loc))
            }
            TokenKind::DecimalLit => {
                let tok = self.bump();
                let value: f64 = tok
                    .text
                    .parse()
                    .map_err(|_| Diagnostic::error().text("Malformed decimal literal.\n").snippet(tok.loc))?;
                Ok(self.ast.alloc_expr(ExprKind::DecimalLit(value), tok.loc))
            }
            TokenKind::StringLit => {
                let tok = self.bump();
                let contents = process_escapes(&tok.text[1..tok.text.len() - 1]);
                Ok(self.ast.alloc_expr(ExprKind::StringLit(contents), tok.loc))
            }
            TokenKind::KwTrue | TokenKind::KwFalse => {
                let tok = self.bump();
                let value = tok.kind == TokenKind::KwTrue;
                Ok(self.ast.alloc_expr(ExprKind::BoolLit(value), tok.loc))
            }
            TokenKind::LParen => {
                self.bump();
                let e = self.expr()?;
                self.expect(TokenKind::RParen, "a parenthesized expression")?;
                Ok(e)
            }
            TokenKind::LBrace => self.block(),
            TokenKind::KwIf => {
                self.bump();
                self.expect(TokenKind::LParen, "an if expression")?;
                let cond = self.expr()?;
                self.expect(TokenKind::RParen, "an if expression")?;
                let then_branch = self.expr()?;
                let else_branch = if self.eat(TokenKind::KwElse) {
                    Some(self.expr()?)
                } else {
                    None
                };
                let loc = self.span_from(&start);
                Ok(self.ast.alloc_expr(
                    ExprKind::If {
                        cond,
                        then_branch,
                        else_branch,
                    },
                    loc,
                ))
            }
            TokenKind::KwWhile => {
                self.bump();
                self.expect(TokenKind::LParen, "a while loop")?;
                let cond = self.expr()?;
                self.expect(TokenKind::RParen, "a while loop")?;
                let body = self.expr()?;
                let loc = self.span_from(&start);
                Ok(self.ast.alloc_expr(ExprKind::While { cond, body }, loc))
            }
            TokenKind::Ident => {
                let name = self.qualified_name()?;
                let name_loc = self.span_from(&start);
                if self.eat(TokenKind::LParen) {
                    let args = self.arg_list()?;
                    self.expect(TokenKind::RParen, "a call")?;
                    let loc = self.span_from(&start);
                    Ok(self.ast.alloc_expr(
                        ExprKind::Call {
                            callee: name,
                            callee_loc: name_loc,
                            args,
                        },
                        loc,
                    ))
                } else {
                    Ok(self.ast.alloc_expr(ExprKind::Name(name), name_loc))
                }
            }
            _ => Err(self.stuck("an expression", "an expression")),
        }
    }

    /// Zero or more comma-separated expressions, optional trailing comma.
    fn arg_list(&mut self) -> Result<Vec<ExprId>, Diagnostic> {
        let mut args = Vec::new();
        while !self.at(TokenKind::RParen) && !self.at(TokenKind::End) {
            args.push(self.expr()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        Ok(args)
    }

    fn block(&mut self) -> Result<ExprId, Diagnostic> {
        let start = self.bump();
        let mut stmts = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::End) {
            let stmt = match self.peek_kind() {
                TokenKind::KwLet => self.let_stmt()?,
                TokenKind::KwReturn => self.return_stmt()?,
                _ => self.expr()?,
            };
            stmts.push(stmt);
            // The final expression of a block may omit its semicolon.
            if !self.eat(TokenKind::Semicolon) && !self.at(TokenKind::RBrace) {
                return Err(self.stuck("a block", "`;` or `}`"));
            }
        }
        self.expect(TokenKind::RBrace, "a block")?;
        let loc = self.span_from(&start);
        Ok(self.ast.alloc_expr(ExprKind::Block { stmts }, loc))
    }

    fn let_stmt(&mut self) -> Result<ExprId, Diagnostic> {
        let start = self.bump();
        let name_tok = self.expect(TokenKind::Ident, "a let statement")?;
        let ascription = if self.eat(TokenKind::Colon) {
            Some(self.type_expr()?)
        } else {
            None
        };
        self.expect(TokenKind::Equal, "a let statement")?;
        let init = self.expr()?;
        let loc = self.span_from(&start);
        Ok(self.ast.alloc_expr(
            ExprKind::Let {
                name: name_tok.text.to_owned(),
                name_loc: name_tok.loc,
                ascription,
                init,
            },
            loc,
        ))
    }

    fn return_stmt(&mut self) -> Result<ExprId, Diagnostic> {
        let start = self.bump();
        let value = self.expr()?;
        let loc = self.span_from(&start);
        Ok(self.ast.alloc_expr(ExprKind::Return { value }, loc))
    }
}

fn process_escapes(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}
