//! The borrow checker: proves that every owned reference is consumed
//! exactly once and every moved-out location is restored.
//!
//! Works as a symbolic evaluation over the analyzed AST, using access
//! paths as the symbolic values. Each expression yields the path of its
//! value (or nothing when its type carries no reference content). Control
//! flow clones the borrow state at branches and merges it at joins with
//! consistency diagnostics; loops are checked by evaluating one iteration
//! against the zero-iteration state.

use smallvec::SmallVec;

use crate::access_path::{PathId, PathManager};
use crate::ast::{Ast, DeclId, DeclKind, ExprId, ExprKind, ProjectionKind};
use crate::borrow_state::BorrowState;
use crate::diagnostic::Diagnostic;
use crate::ontology::Ontology;
use crate::types::{Type, TypeContext, TypeId};

/// Borrow-checks declarations. Struct declarations have nothing to check;
/// modules are checked recursively; each function body gets its own path
/// manager and borrow state.
pub struct BorrowChecker<'a> {
    ast: &'a Ast,
    ontology: &'a Ontology,
    types: &'a mut TypeContext,
    /// Append-only list of borrow checking errors.
    pub errors: Vec<Diagnostic>,
}

impl<'a> BorrowChecker<'a> {
    pub fn new(ast: &'a Ast, ontology: &'a Ontology, types: &'a mut TypeContext) -> Self {
        Self {
            ast,
            ontology,
            types,
            errors: Vec::new(),
        }
    }

    pub fn check_decls(&mut self, decls: &[DeclId]) {
        for &decl in decls {
            self.check_decl(decl);
        }
    }

    pub fn check_decl(&mut self, decl: DeclId) {
        match &self.ast.decl(decl).kind {
            DeclKind::Module { decls, .. } => {
                let decls = decls.clone();
                self.check_decls(&decls);
            }
            DeclKind::Function { .. } => self.check_function(decl),
            DeclKind::Struct { .. } => {}
        }
    }

    /// Checks one function body end to end: introduce the parameters'
    /// loose extensions, evaluate the body, consume the body's value, and
    /// report anything still unused or still moved.
    pub fn check_function(&mut self, decl: DeclId) {
        let DeclKind::Function { params, body, .. } = &self.ast.decl(decl).kind else {
            return;
        };
        let Some(body) = *body else { return };
        let params = params.clone();

        let mut fx = FnChecker {
            ast: self.ast,
            ontology: self.ontology,
            types: &mut *self.types,
            errors: &mut self.errors,
            pm: PathManager::new(),
            state: BorrowState::new(),
            next_internal: 0,
        };

        for param in &params {
            let root = fx.pm.get_root(&param.name);
            let ty = fx.types.from_type_expr(fx.ast, param.ty);
            for ext in fx.loose_extensions(Some(root), Some(ty)) {
                fx.state.intro(ext, param.name_loc);
            }
        }

        let ret_path = fx.check(body);

        // The tail of the body is where its final value is consumed.
        let tail_loc = match &fx.ast.expr(body).kind {
            ExprKind::Block { stmts } => stmts.last().map_or(fx.ast.expr(body).loc, |&s| fx.ast.expr(s).loc),
            _ => fx.ast.expr(body).loc,
        };
        for ext in fx.loose_extensions(ret_path, fx.ast.expr(body).ty) {
            fx.state.use_path(ext, tail_loc, &fx.pm, fx.errors);
        }

        for (&path, &loc) in fx.state.unused_paths() {
            fx.errors.push(
                Diagnostic::error()
                    .text(format!("Unique reference {} is never used.\n", fx.pm.display(path)))
                    .snippet(loc),
            );
        }
        for (&path, &loc) in fx.state.moved_paths() {
            fx.errors.push(
                Diagnostic::error()
                    .text(format!("Moved value {} is never replaced.\n", fx.pm.display(path)))
                    .snippet(loc),
            );
        }
    }
}

/// The per-function evaluation state.
struct FnChecker<'a> {
    ast: &'a Ast,
    ontology: &'a Ontology,
    types: &'a mut TypeContext,
    errors: &'a mut Vec<Diagnostic>,
    pm: PathManager,
    state: BorrowState,
    next_internal: u32,
}

impl FnChecker<'_> {
    /// A fresh internal variable root like `$3`, minted per anonymous
    /// intermediate value.
    fn fresh_internal(&mut self) -> PathId {
        self.next_internal += 1;
        self.pm.get_root(&format!("${}", self.next_internal))
    }

    fn ty_of(&self, expr: ExprId) -> Option<TypeId> {
        self.ast.expr(expr).ty
    }

    /// Symbolically evaluates `expr`, returning its access path when its
    /// type has reference content.
    fn check(&mut self, expr: ExprId) -> Option<PathId> {
        let loc = self.ast.expr(expr).loc;
        match self.ast.expr(expr).kind.clone() {
            ExprKind::BoolLit(_) | ExprKind::IntLit(_) | ExprKind::DecimalLit(_) | ExprKind::StringLit(_) => None,
            ExprKind::Unop { inner, .. } => {
                self.check(inner);
                None
            }
            ExprKind::Binop { lhs, rhs, .. } => {
                self.check(lhs);
                self.check(rhs);
                None
            }
            ExprKind::Name(name) => Some(self.pm.get_root(&name)),
            ExprKind::Let { name, init, .. } => {
                let def_path = self.check(init);
                if let Some(path) = def_path {
                    self.pm.alias_root(&name, path);
                }
                def_path
            }
            ExprKind::Block { stmts } => {
                let mut last = None;
                for stmt in stmts {
                    last = self.check(stmt);
                }
                last
            }
            ExprKind::Ascribe { inner, .. } => self.check(inner),
            ExprKind::AddrOf { inner } => {
                let init_path = self.check(inner);
                let ret = self.fresh_internal();
                if let Some(path) = init_path {
                    self.pm.alias_deref(ret, path);
                }
                Some(ret)
            }
            ExprKind::Deref { inner } => {
                let of = self.check(inner);
                of.map(|p| self.pm.get_deref(p))
            }
            ExprKind::Project { base, field, kind } => {
                let base_path = self.check(base)?;
                Some(match kind {
                    ProjectionKind::Dot => self.pm.get_project(base_path, &field, false),
                    ProjectionKind::Brackets => self.pm.get_project(base_path, &field, true),
                    ProjectionKind::Arrow => {
                        let derefed = self.pm.get_deref(base_path);
                        self.pm.get_project(derefed, &field, false)
                    }
                })
            }
            ExprKind::Index { base, index } => {
                let base_path = self.check(base);
                if let ExprKind::IntLit(offset) = self.ast.expr(index).kind {
                    base_path.map(|p| self.pm.get_array_offset(p, offset))
                } else {
                    self.check(index);
                    self.errors.push(
                        Diagnostic::error()
                            .text("The borrow checker only supports constant integer indices.\n")
                            .snippet(self.ast.expr(index).loc),
                    );
                    Some(self.fresh_internal())
                }
            }
            ExprKind::Assign { lhs, rhs } => {
                let lhs_path = self.check(lhs);
                let rhs_path = self.check(rhs);
                let rhs_ty = self.ty_of(rhs);
                let rhs_loc = self.ast.expr(rhs).loc;
                let lhs_loc = self.ast.expr(lhs).loc;
                for ext in self.loose_extensions(rhs_path, rhs_ty) {
                    self.state.use_path(ext, rhs_loc, &self.pm, self.errors);
                }
                for ext in self.loose_extensions(lhs_path, rhs_ty) {
                    self.state.unmove_path(ext, lhs_loc, &self.pm, self.errors);
                }
                None
            }
            ExprKind::Borrow { inner } => {
                let ret = self.check(inner);
                let inner_ty = self.ty_of(inner);
                let inner_loc = self.ast.expr(inner).loc;
                for owner in self.loose_extensions(ret, inner_ty) {
                    if let Some(&(creation_loc, use_loc)) = self.state.used_paths().get(&owner) {
                        self.errors.push(
                            Diagnostic::error()
                                .text(format!("Unique reference {} created here:\n", self.pm.display(owner)))
                                .snippet(creation_loc)
                                .text("is already used here:\n")
                                .snippet(use_loc)
                                .text("so it cannot be borrowed later:\n")
                                .snippet(inner_loc),
                        );
                    }
                }
                ret
            }
            ExprKind::Move { inner } => {
                let inner_path = self.check(inner);
                let move_ty = self.ty_of(expr);
                let inner_loc = self.ast.expr(inner).loc;
                for path in self.loose_extensions(inner_path, move_ty) {
                    self.state.move_path(path, inner_loc, &self.pm, self.errors);
                }
                let ret = self.fresh_internal();
                self.state.intro(ret, loc);
                Some(ret)
            }
            ExprKind::Call { args, .. } => {
                for &arg in &args {
                    let arg_path = self.check(arg);
                    let arg_ty = self.ty_of(arg);
                    let arg_loc = self.ast.expr(arg).loc;
                    for ext in self.loose_extensions(arg_path, arg_ty) {
                        self.state.use_path(ext, arg_loc, &self.pm, self.errors);
                    }
                }
                let ret = self.fresh_internal();
                for ext in self.loose_extensions(Some(ret), self.ty_of(expr)) {
                    self.state.intro(ext, loc);
                }
                Some(ret)
            }
            ExprKind::Ctor { struct_name, args, .. } => {
                let ret = self.fresh_internal();
                let fields: Vec<String> = self
                    .ontology
                    .get_type(&struct_name)
                    .and_then(|decl| match &self.ast.decl(decl).kind {
                        DeclKind::Struct { fields, .. } => Some(fields.iter().map(|f| f.name.clone()).collect()),
                        _ => None,
                    })
                    .unwrap_or_default();
                for (&arg, field) in args.iter().zip(fields.iter()) {
                    let arg_path = self.check(arg);
                    if let Some(path) = arg_path {
                        self.pm.alias_project(ret, field, false, path);
                    }
                }
                Some(ret)
            }
            ExprKind::Return { value } => {
                let path = self.check(value);
                let value_ty = self.ty_of(value);
                let value_loc = self.ast.expr(value).loc;
                for ext in self.loose_extensions(path, value_ty) {
                    self.state.use_path(ext, value_loc, &self.pm, self.errors);
                }
                None
            }
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.check(cond);
                let previous = self.state.clone();
                let if_ty = self.ty_of(expr);

                // Then branch runs on the current state (a copy of the
                // snapshot), consuming the branch's value.
                let then_path = self.check(then_branch);
                let then_loc = self.ast.expr(then_branch).loc;
                for ext in self.loose_extensions(then_path, if_ty) {
                    self.state.use_path(ext, then_loc, &self.pm, self.errors);
                }
                let mut after_then = std::mem::replace(&mut self.state, previous.clone());

                if let Some(else_branch) = else_branch {
                    let else_path = self.check(else_branch);
                    let else_loc = self.ast.expr(else_branch).loc;
                    for ext in self.loose_extensions(else_path, if_ty) {
                        self.state.use_path(ext, else_loc, &self.pm, self.errors);
                    }
                    let after_else = std::mem::replace(&mut self.state, previous.clone());
                    after_then.merge(&after_else, loc, &previous, &self.pm, self.errors);
                } else {
                    after_then.merge(&previous, loc, &previous, &self.pm, self.errors);
                }
                self.state = after_then;

                let ret = self.fresh_internal();
                for ext in self.loose_extensions(Some(ret), if_ty) {
                    self.state.intro(ext, loc);
                }
                Some(ret)
            }
            ExprKind::While { cond, body } => {
                self.check(cond);
                let after_no_iters = self.state.clone();

                // One symbolic iteration (body plus re-evaluated
                // condition) must leave the state consistent with running
                // zero iterations.
                self.check(body);
                self.check(cond);
                let mut after_one_iter = std::mem::replace(&mut self.state, after_no_iters.clone());
                after_one_iter.merge(&after_no_iters, loc, &after_no_iters, &self.pm, self.errors);
                None
            }
        }
    }

    /// All loose extensions of `path` at type `ty`: the owned-reference
    /// obligations that come with introducing a value of that type. These
    /// are the paths reached by following unique references and struct
    /// fields, stopping at borrowed references and non-reference leaves.
    fn loose_extensions(&mut self, path: Option<PathId>, ty: Option<TypeId>) -> SmallVec<[PathId; 4]> {
        let mut out = SmallVec::new();
        if let (Some(path), Some(ty)) = (path, ty) {
            let mut visiting = Vec::new();
            self.collect_loose(path, ty, &mut visiting, &mut out);
        }
        out
    }

    fn collect_loose(&mut self, path: PathId, ty: TypeId, visiting: &mut Vec<String>, out: &mut SmallVec<[PathId; 4]>) {
        match self.types.kind(ty).clone() {
            Type::Prim(_) | Type::Constraint(_) => {}
            Type::Named(fqn) => {
                // A struct already on the walk is not re-entered, so
                // recursive struct types terminate.
                if visiting.iter().any(|v| v == &fqn) {
                    return;
                }
                let Some(decl) = self.ontology.get_type(&fqn) else {
                    return;
                };
                let DeclKind::Struct { fields, .. } = &self.ast.decl(decl).kind else {
                    return;
                };
                let fields = fields.clone();
                visiting.push(fqn);
                for field in &fields {
                    let field_ty = self.types.from_type_expr(self.ast, field.ty);
                    let field_path = self.pm.get_project(path, &field.name, false);
                    self.collect_loose(field_path, field_ty, visiting, out);
                }
                visiting.pop();
            }
            Type::Ref { inner, unique } => {
                if unique {
                    out.push(path);
                    let derefed = self.pm.get_deref(path);
                    self.collect_loose(derefed, inner, visiting, out);
                }
            }
            Type::Var(_) => {
                debug_assert!(false, "type variables cannot reach the borrow checker");
            }
        }
    }
}
