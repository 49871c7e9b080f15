//! The abstract syntax tree.
//!
//! Nodes live in a [`Ast`] arena and reference each other through `u32`
//! newtype ids, so passes can mutate one node (type slot, lvalue flag,
//! name rewriting) while holding plain ids to the rest of the tree. The
//! parser allocates nodes; semantic analysis is the only other writer.

use std::fmt::Write as _;

use smallvec::SmallVec;
use strum::IntoStaticStr;

use crate::location::Location;
use crate::types::{Primitive, TypeContext, TypeId};

/// Index of an expression node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(u32);

/// Index of a declaration node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclId(u32);

/// Index of a type-expression node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeExprId(u32);

impl ExprId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl DeclId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl TypeExprId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// An arithmetic or logical prefix operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
pub enum UnOp {
    #[strum(serialize = "!")]
    Not,
    #[strum(serialize = "-")]
    Neg,
}

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
pub enum BinOp {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "*")]
    Mul,
    #[strum(serialize = "/")]
    Div,
    #[strum(serialize = "%")]
    Mod,
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    Ne,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Ge,
    #[strum(serialize = "&&")]
    And,
    #[strum(serialize = "||")]
    Or,
}

impl BinOp {
    /// `+ - * / %`: numeric in, numeric out.
    #[must_use]
    pub fn is_arithmetic(self) -> bool {
        matches!(self, Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Mod)
    }

    /// `== !=`: same type in, bool out.
    #[must_use]
    pub fn is_equality(self) -> bool {
        matches!(self, Self::Eq | Self::Ne)
    }

    /// `< <= > >=`: numeric in, bool out.
    #[must_use]
    pub fn is_ordering(self) -> bool {
        matches!(self, Self::Lt | Self::Le | Self::Gt | Self::Ge)
    }

    /// `&& ||`: bool in, bool out.
    #[must_use]
    pub fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }
}

/// The three projection syntaxes.
///
/// - `base.field` converts a struct value into the field's value
/// - `base[.field]` converts a *reference* to a struct into a *reference*
///   to the field (an address calculation)
/// - `base->field` converts a reference to a struct into the field's value,
///   equivalent to `base!.field`
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
pub enum ProjectionKind {
    #[strum(serialize = "DOT")]
    Dot,
    #[strum(serialize = "BRACKETS")]
    Brackets,
    #[strum(serialize = "ARROW")]
    Arrow,
}

/// A type as written in source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExprKind {
    Prim(Primitive),
    /// A named (struct) type; the canonicalizer rewrites the name to an FQN.
    Named(String),
    /// `&T` when `unique` is false, `#T` when true.
    Ref { pointee: TypeExprId, unique: bool },
}

#[derive(Debug, Clone)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub loc: Location,
}

/// A `(name, type)` pair: one function parameter or one struct field.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub name_loc: Location,
    pub ty: TypeExprId,
}

/// An expression or statement (there is no distinction between the two).
#[derive(Debug, Clone)]
pub enum ExprKind {
    BoolLit(bool),
    IntLit(i64),
    DecimalLit(f64),
    /// Contents with escape sequences already processed.
    StringLit(String),
    /// A name used as an expression; resolves to a local in the unifier.
    Name(String),
    Unop {
        op: UnOp,
        inner: ExprId,
    },
    Binop {
        op: BinOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    If {
        cond: ExprId,
        then_branch: ExprId,
        else_branch: Option<ExprId>,
    },
    While {
        cond: ExprId,
        body: ExprId,
    },
    Block {
        stmts: Vec<ExprId>,
    },
    /// A call; the canonicalizer rewrites `callee` to an FQN, or rewrites
    /// the whole node to [`ExprKind::Ctor`] when the callee names a struct.
    Call {
        callee: String,
        callee_loc: Location,
        args: Vec<ExprId>,
    },
    /// A struct constructor invocation; arguments are the field values in
    /// declaration order.
    Ctor {
        struct_name: String,
        name_loc: Location,
        args: Vec<ExprId>,
    },
    /// `inner: T`
    Ascribe {
        inner: ExprId,
        ascription: TypeExprId,
    },
    /// `let name[: T] = init;`
    Let {
        name: String,
        name_loc: Location,
        ascription: Option<TypeExprId>,
        init: ExprId,
    },
    Return {
        value: ExprId,
    },
    Assign {
        lhs: ExprId,
        rhs: ExprId,
    },
    /// `&inner`
    AddrOf {
        inner: ExprId,
    },
    /// `inner!`
    Deref {
        inner: ExprId,
    },
    Project {
        base: ExprId,
        field: String,
        kind: ProjectionKind,
    },
    /// `base[index]`
    Index {
        base: ExprId,
        index: ExprId,
    },
    /// `borrow inner`: a borrowed reference out of a unique one.
    Borrow {
        inner: ExprId,
    },
    /// `move inner`: extracts a unique reference from behind an lvalue,
    /// obliging the program to restore it.
    Move {
        inner: ExprId,
    },
}

/// An expression node: kind, location, and the two slots semantic analysis
/// fills in (the resolved type and the lvalue flag).
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub loc: Location,
    pub ty: Option<TypeId>,
    pub lvalue: bool,
}

/// A declaration.
#[derive(Debug, Clone)]
pub enum DeclKind {
    /// The basic unit of the namespace hierarchy.
    Module {
        name: String,
        decls: Vec<DeclId>,
    },
    /// A function. No body means `extern`. Variadic functions accept any
    /// number of additional arguments after their declared parameters.
    Function {
        name: String,
        params: Vec<Param>,
        variadic: bool,
        return_ty: TypeExprId,
        body: Option<ExprId>,
    },
    Struct {
        name: String,
        fields: Vec<Param>,
    },
}

#[derive(Debug, Clone)]
pub struct Decl {
    pub kind: DeclKind,
    pub loc: Location,
    pub name_loc: Location,
}

impl Decl {
    /// The declared name (fully qualified after cataloging).
    #[must_use]
    pub fn name(&self) -> &str {
        match &self.kind {
            DeclKind::Module { name, .. } | DeclKind::Function { name, .. } | DeclKind::Struct { name, .. } => name,
        }
    }
}

/// The arena that owns every AST node of one compilation.
#[derive(Debug, Default)]
pub struct Ast {
    exprs: Vec<Expr>,
    decls: Vec<Decl>,
    type_exprs: Vec<TypeExpr>,
}

impl Ast {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_expr(&mut self, kind: ExprKind, loc: Location) -> ExprId {
        let id = ExprId(u32::try_from(self.exprs.len()).expect("ExprId overflow"));
        self.exprs.push(Expr {
            kind,
            loc,
            ty: None,
            lvalue: false,
        });
        id
    }

    pub fn alloc_decl(&mut self, kind: DeclKind, loc: Location, name_loc: Location) -> DeclId {
        let id = DeclId(u32::try_from(self.decls.len()).expect("DeclId overflow"));
        self.decls.push(Decl { kind, loc, name_loc });
        id
    }

    pub fn alloc_type_expr(&mut self, kind: TypeExprKind, loc: Location) -> TypeExprId {
        let id = TypeExprId(u32::try_from(self.type_exprs.len()).expect("TypeExprId overflow"));
        self.type_exprs.push(TypeExpr { kind, loc });
        id
    }

    #[must_use]
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    pub fn expr_mut(&mut self, id: ExprId) -> &mut Expr {
        &mut self.exprs[id.index()]
    }

    #[must_use]
    pub fn decl(&self, id: DeclId) -> &Decl {
        &self.decls[id.index()]
    }

    pub fn decl_mut(&mut self, id: DeclId) -> &mut Decl {
        &mut self.decls[id.index()]
    }

    #[must_use]
    pub fn type_expr(&self, id: TypeExprId) -> &TypeExpr {
        &self.type_exprs[id.index()]
    }

    pub fn type_expr_mut(&mut self, id: TypeExprId) -> &mut TypeExpr {
        &mut self.type_exprs[id.index()]
    }

    /// The direct child expressions of `id`, in source order.
    #[must_use]
    pub fn expr_children(&self, id: ExprId) -> SmallVec<[ExprId; 4]> {
        let mut out = SmallVec::new();
        match &self.expr(id).kind {
            ExprKind::BoolLit(_)
            | ExprKind::IntLit(_)
            | ExprKind::DecimalLit(_)
            | ExprKind::StringLit(_)
            | ExprKind::Name(_) => {}
            ExprKind::Unop { inner, .. }
            | ExprKind::Ascribe { inner, .. }
            | ExprKind::AddrOf { inner }
            | ExprKind::Deref { inner }
            | ExprKind::Borrow { inner }
            | ExprKind::Move { inner } => out.push(*inner),
            ExprKind::Binop { lhs, rhs, .. } | ExprKind::Assign { lhs, rhs } => {
                out.push(*lhs);
                out.push(*rhs);
            }
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                out.push(*cond);
                out.push(*then_branch);
                if let Some(e) = else_branch {
                    out.push(*e);
                }
            }
            ExprKind::While { cond, body } => {
                out.push(*cond);
                out.push(*body);
            }
            ExprKind::Block { stmts } => out.extend(stmts.iter().copied()),
            ExprKind::Call { args, .. } | ExprKind::Ctor { args, .. } => out.extend(args.iter().copied()),
            ExprKind::Let { init, .. } => out.push(*init),
            ExprKind::Return { value } => out.push(*value),
            ExprKind::Project { base, .. } => out.push(*base),
            ExprKind::Index { base, index } => {
                out.push(*base);
                out.push(*index);
            }
        }
        out
    }

    /// Renders a type expression the way it appears in source.
    #[must_use]
    pub fn type_expr_string(&self, id: TypeExprId) -> String {
        match &self.type_expr(id).kind {
            TypeExprKind::Prim(p) => p.as_str().to_owned(),
            TypeExprKind::Named(name) => name.clone(),
            TypeExprKind::Ref { pointee, unique } => {
                let sigil = if *unique { '#' } else { '&' };
                format!("{sigil}{}", self.type_expr_string(*pointee))
            }
        }
    }

    /// Pretty-prints a declaration tree for debugging.
    #[must_use]
    pub fn dump_decl(&self, id: DeclId, types: &TypeContext) -> String {
        let mut out = String::new();
        self.dump_decl_inner(id, types, &mut Vec::new(), &mut out);
        out
    }

    /// Pretty-prints an expression tree for debugging.
    #[must_use]
    pub fn dump_expr(&self, id: ExprId, types: &TypeContext) -> String {
        let mut out = String::new();
        self.dump_expr_inner(id, types, &mut Vec::new(), &mut out);
        out
    }

    fn dump_prefix(indents: &[bool], loc: Location, out: &mut String) {
        let _ = write!(out, "ln{:>4}, col{:>4}, sz{:>4}   ", loc.row, loc.col, loc.size);
        if let Some((last, rest)) = indents.split_last() {
            for more in rest {
                out.push_str(if *more { "\u{2502}   " } else { "    " });
            }
            out.push_str(if *last { "\u{251c}\u{2500}\u{2500} " } else { "\u{2514}\u{2500}\u{2500} " });
        }
    }

    fn dump_children(&self, children: &[ExprId], types: &TypeContext, indents: &mut Vec<bool>, out: &mut String) {
        if let Some((last, rest)) = children.split_last() {
            for child in rest {
                indents.push(true);
                self.dump_expr_inner(*child, types, indents, out);
                indents.pop();
            }
            indents.push(false);
            self.dump_expr_inner(*last, types, indents, out);
            indents.pop();
        }
    }

    fn dump_decl_inner(&self, id: DeclId, types: &TypeContext, indents: &mut Vec<bool>, out: &mut String) {
        let decl = self.decl(id);
        Self::dump_prefix(indents, decl.loc, out);
        match &decl.kind {
            DeclKind::Module { name, decls } => {
                let _ = writeln!(out, "MODULE ({name})");
                if let Some((last, rest)) = decls.split_last() {
                    for child in rest {
                        indents.push(true);
                        self.dump_decl_inner(*child, types, indents, out);
                        indents.pop();
                    }
                    indents.push(false);
                    self.dump_decl_inner(*last, types, indents, out);
                    indents.pop();
                }
            }
            DeclKind::Function {
                name,
                params,
                variadic,
                return_ty,
                body,
            } => {
                let _ = write!(out, "FUNC ({name}) (");
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    let _ = write!(out, "{}: {}", p.name, self.type_expr_string(p.ty));
                }
                if *variadic {
                    if !params.is_empty() {
                        out.push_str(", ");
                    }
                    out.push_str("...");
                }
                let _ = writeln!(out, "): {}", self.type_expr_string(*return_ty));
                if let Some(body) = body {
                    indents.push(false);
                    self.dump_expr_inner(*body, types, indents, out);
                    indents.pop();
                }
            }
            DeclKind::Struct { name, fields } => {
                let _ = write!(out, "STRUCT ({name}) (");
                for (i, f) in fields.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    let _ = write!(out, "{}: {}", f.name, self.type_expr_string(f.ty));
                }
                out.push_str(")\n");
            }
        }
    }

    fn dump_expr_inner(&self, id: ExprId, types: &TypeContext, indents: &mut Vec<bool>, out: &mut String) {
        let expr = self.expr(id);
        Self::dump_prefix(indents, expr.loc, out);
        match &expr.kind {
            ExprKind::BoolLit(v) => {
                let _ = write!(out, "BOOL_LIT ({v})");
            }
            ExprKind::IntLit(v) => {
                let _ = write!(out, "INT_LIT ({v})");
            }
            ExprKind::DecimalLit(v) => {
                let _ = write!(out, "DECIMAL_LIT ({v})");
            }
            ExprKind::StringLit(_) => out.push_str("STRING_LIT"),
            ExprKind::Name(name) => {
                let _ = write!(out, "NAME ({name})");
            }
            ExprKind::Unop { op, .. } => {
                let _ = write!(out, "UNOP ({})", <&str>::from(*op));
            }
            ExprKind::Binop { op, .. } => {
                let _ = write!(out, "BINOP ({})", <&str>::from(*op));
            }
            ExprKind::If { .. } => out.push_str("IF"),
            ExprKind::While { .. } => out.push_str("WHILE"),
            ExprKind::Block { .. } => out.push_str("BLOCK"),
            ExprKind::Call { callee, .. } => {
                let _ = write!(out, "CALL ({callee})");
            }
            ExprKind::Ctor { struct_name, .. } => {
                let _ = write!(out, "CTOR ({struct_name})");
            }
            ExprKind::Ascribe { ascription, .. } => {
                let _ = write!(out, "ASCRIBE ({})", self.type_expr_string(*ascription));
            }
            ExprKind::Let { name, .. } => {
                let _ = write!(out, "LET ({name})");
            }
            ExprKind::Return { .. } => out.push_str("RETURN"),
            ExprKind::Assign { .. } => out.push_str("ASSIGN"),
            ExprKind::AddrOf { .. } => out.push_str("ADDR_OF"),
            ExprKind::Deref { .. } => out.push_str("DEREF"),
            ExprKind::Project { field, kind, .. } => {
                let _ = write!(out, "PROJECT ({field}, {})", <&str>::from(*kind));
            }
            ExprKind::Index { .. } => out.push_str("INDEX"),
            ExprKind::Borrow { .. } => out.push_str("BORROW"),
            ExprKind::Move { .. } => out.push_str("MOVE"),
        }
        if let Some(ty) = expr.ty {
            let _ = write!(out, " : {}", types.display(ty));
        }
        out.push('\n');
        let children = self.expr_children(id);
        self.dump_children(&children, types, indents, out);
    }
}
