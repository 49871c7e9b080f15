//! Third of the five sema passes: Hindley-Milner type unification.
//!
//! Every inferred type is a fresh type variable bound to its current best
//! known type, so later unifications can refine it (this is how an integer
//! literal's `numeric` narrows to `i32` when it meets one). Variable
//! equivalences and bindings live in union-find maps owned by the sema
//! world and shared with the resolver.

use ahash::AHashMap;

use crate::ast::{Ast, DeclId, DeclKind, ExprId, ExprKind, Param, ProjectionKind, TypeExprId, TypeExprKind, UnOp};
use crate::diagnostic::Diagnostic;
use crate::location::Location;
use crate::ontology::Ontology;
use crate::scope::ScopeStack;
use crate::types::{Constraint, Primitive, Type, TypeContext, TypeId, TypeVarId};

pub struct Unifier<'a> {
    ast: &'a mut Ast,
    ontology: &'a Ontology,
    types: &'a mut TypeContext,
    /// Type variable equivalence classes (union-find parent pointers).
    parents: &'a mut AHashMap<TypeVarId, TypeVarId>,
    /// Bindings from representative variables to non-variable types.
    bindings: &'a mut AHashMap<TypeVarId, TypeId>,
    errors: &'a mut Vec<Diagnostic>,
    /// Maps local variable names to their types.
    locals: ScopeStack<TypeId>,
    /// Declared return type of the function currently being unified.
    current_return: Option<TypeId>,
}

impl<'a> Unifier<'a> {
    pub fn new(
        ast: &'a mut Ast,
        ontology: &'a Ontology,
        types: &'a mut TypeContext,
        parents: &'a mut AHashMap<TypeVarId, TypeVarId>,
        bindings: &'a mut AHashMap<TypeVarId, TypeId>,
        errors: &'a mut Vec<Diagnostic>,
    ) -> Self {
        Self {
            ast,
            ontology,
            types,
            parents,
            bindings,
            errors,
            locals: ScopeStack::new(),
            current_return: None,
        }
    }

    /// Type checks a function or extern function declaration.
    pub fn unify_function(&mut self, decl: DeclId) {
        let DeclKind::Function {
            params,
            return_ty,
            body,
            ..
        } = self.ast.decl(decl).kind.clone()
        else {
            return;
        };
        let Some(body) = body else { return };
        self.locals.push();
        for param in &params {
            let ty = self.fresh_from_type_expr(param.ty);
            self.locals.add(&param.name, ty);
        }
        let ret = self.fresh_from_type_expr(return_ty);
        self.current_return = Some(ret);
        self.expect_ty(body, ret);
        self.current_return = None;
        self.locals.pop();
    }

    /// Infers an expression's type and records it in the node's type slot.
    pub fn unify_expr(&mut self, expr: ExprId) -> TypeId {
        let loc = self.ast.expr(expr).loc;
        let ty = match self.ast.expr(expr).kind.clone() {
            ExprKind::BoolLit(_) => self.fresh_prim(Primitive::Bool),
            ExprKind::IntLit(_) => self.fresh_constraint(Constraint::Numeric),
            ExprKind::DecimalLit(_) => self.fresh_constraint(Constraint::Decimal),
            ExprKind::StringLit(_) => {
                let inner = self.fresh_prim(Primitive::I8);
                let ty = self.types.ref_type(inner, false);
                self.fresh(ty)
            }
            ExprKind::Name(name) => match self.locals.get(&name) {
                Some(ty) => ty,
                None => {
                    self.errors.push(
                        Diagnostic::error()
                            .text(format!("Unbound identifier {name}.\n"))
                            .snippet(loc),
                    );
                    self.types.fresh_var()
                }
            },
            ExprKind::Unop { op: UnOp::Not, inner } => {
                let expected = self.fresh_prim(Primitive::Bool);
                self.expect_ty(inner, expected);
                self.fresh_prim(Primitive::Bool)
            }
            ExprKind::Unop { op: UnOp::Neg, inner } => {
                let expected = self.fresh_constraint(Constraint::Numeric);
                self.expect_ty(inner, expected)
            }
            ExprKind::Binop { op, lhs, rhs } if op.is_arithmetic() => {
                let expected = self.fresh_constraint(Constraint::Numeric);
                let lhs_ty = self.expect_ty(lhs, expected);
                self.expect_ty(rhs, lhs_ty);
                lhs_ty
            }
            ExprKind::Binop { op, lhs, rhs } if op.is_equality() => {
                let lhs_ty = self.unify_expr(lhs);
                self.expect_ty(rhs, lhs_ty);
                self.fresh_prim(Primitive::Bool)
            }
            ExprKind::Binop { op, lhs, rhs } if op.is_ordering() => {
                let expected = self.fresh_constraint(Constraint::Numeric);
                let lhs_ty = self.expect_ty(lhs, expected);
                self.expect_ty(rhs, lhs_ty);
                self.fresh_prim(Primitive::Bool)
            }
            ExprKind::Binop { lhs, rhs, .. } => {
                let expected_l = self.fresh_prim(Primitive::Bool);
                self.expect_ty(lhs, expected_l);
                let expected_r = self.fresh_prim(Primitive::Bool);
                self.expect_ty(rhs, expected_r);
                self.fresh_prim(Primitive::Bool)
            }
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let expected = self.fresh_prim(Primitive::Bool);
                self.expect_ty(cond, expected);
                let then_ty = self.unify_expr(then_branch);
                if let Some(else_branch) = else_branch {
                    self.expect_ty(else_branch, then_ty);
                    then_ty
                } else {
                    self.fresh_prim(Primitive::Unit)
                }
            }
            ExprKind::While { cond, body } => {
                let expected = self.fresh_prim(Primitive::Bool);
                self.expect_ty(cond, expected);
                self.unify_expr(body);
                self.fresh_prim(Primitive::Unit)
            }
            ExprKind::Block { stmts } => {
                self.locals.push();
                let mut last = self.fresh_prim(Primitive::Unit);
                for stmt in stmts {
                    last = self.unify_expr(stmt);
                }
                self.locals.pop();
                last
            }
            ExprKind::Ascribe { inner, ascription } => {
                let ty = self.fresh_from_type_expr(ascription);
                self.expect_ty(inner, ty);
                ty
            }
            ExprKind::Let {
                name, ascription, init, ..
            } => {
                let bound_ty = if let Some(ascription) = ascription {
                    let ty = self.fresh_from_type_expr(ascription);
                    self.expect_ty(init, ty);
                    ty
                } else {
                    self.unify_expr(init)
                };
                self.locals.add(&name, bound_ty);
                self.fresh_prim(Primitive::Unit)
            }
            ExprKind::Return { value } => match self.current_return {
                Some(ret) => {
                    self.expect_ty(value, ret);
                    ret
                }
                None => {
                    self.unify_expr(value);
                    self.fresh_prim(Primitive::Unit)
                }
            },
            ExprKind::Assign { lhs, rhs } => {
                let lhs_ty = self.unify_expr(lhs);
                self.expect_ty(rhs, lhs_ty);
                self.fresh_prim(Primitive::Unit)
            }
            ExprKind::AddrOf { inner } => {
                let inner_ty = self.unify_expr(inner);
                let ty = self.types.ref_type(inner_ty, false);
                self.fresh(ty)
            }
            ExprKind::Deref { inner } => self.unify_deref(inner, loc),
            ExprKind::Project { base, field, kind } => self.unify_project(base, &field, kind, loc),
            ExprKind::Index { base, index } => {
                let base_ty = self.unify_expr(base);
                let expected = self.fresh_constraint(Constraint::Numeric);
                self.expect_ty(index, expected);
                match self.resolved_kind(base_ty) {
                    Type::Ref { .. } => base_ty,
                    _ => {
                        self.type_error("Only references can be indexed.", loc);
                        self.types.fresh_var()
                    }
                }
            }
            ExprKind::Borrow { inner } => {
                let inner_ty = self.unify_expr(inner);
                match self.resolved_kind(inner_ty) {
                    Type::Ref { inner: i, unique: true } => {
                        let ty = self.types.ref_type(i, false);
                        self.fresh(ty)
                    }
                    Type::Var(_) => {
                        let pointee = self.types.fresh_var();
                        let unique_ref = self.types.ref_type(pointee, true);
                        let expected = self.fresh(unique_ref);
                        self.unify_or_report(inner_ty, expected, loc);
                        let ty = self.types.ref_type(pointee, false);
                        self.fresh(ty)
                    }
                    _ => {
                        self.type_error("Only a unique reference can be borrowed.", loc);
                        self.types.fresh_var()
                    }
                }
            }
            ExprKind::Move { inner } => {
                let inner_ty = self.unify_expr(inner);
                match self.resolved_kind(inner_ty) {
                    Type::Ref { inner: i, unique: true } => {
                        let ty = self.types.ref_type(i, true);
                        self.fresh(ty)
                    }
                    Type::Var(_) => {
                        let pointee = self.types.fresh_var();
                        let unique_ref = self.types.ref_type(pointee, true);
                        let expected = self.fresh(unique_ref);
                        self.unify_or_report(inner_ty, expected, loc);
                        self.fresh(unique_ref)
                    }
                    _ => {
                        self.type_error("Only a unique reference can be moved.", loc);
                        self.types.fresh_var()
                    }
                }
            }
            ExprKind::Call { callee, callee_loc, args } => self.unify_call(&callee, callee_loc, &args, loc),
            ExprKind::Ctor {
                struct_name,
                name_loc,
                args,
            } => self.unify_ctor(&struct_name, name_loc, &args),
        };
        self.ast.expr_mut(expr).ty = Some(ty);
        ty
    }

    //========================================================================//
    // Helpers for the larger expression forms
    //========================================================================//

    fn unify_deref(&mut self, inner: ExprId, loc: Location) -> TypeId {
        let inner_ty = self.unify_expr(inner);
        match self.resolved_kind(inner_ty) {
            Type::Ref { inner: pointee, .. } => pointee,
            Type::Var(_) => {
                // Unresolved operand: constrain it to be a borrowed
                // reference to a fresh pointee.
                let pointee = self.types.fresh_var();
                let ref_ty = self.types.ref_type(pointee, false);
                let expected = self.fresh(ref_ty);
                self.unify_or_report(inner_ty, expected, loc);
                pointee
            }
            _ => {
                self.type_error("Only a reference can be dereferenced.", loc);
                self.types.fresh_var()
            }
        }
    }

    fn unify_project(&mut self, base: ExprId, field: &str, kind: ProjectionKind, loc: Location) -> TypeId {
        let base_ty = self.unify_expr(base);
        let resolved = self.resolved_kind(base_ty);
        match kind {
            ProjectionKind::Dot => match resolved {
                Type::Named(fqn) => self.field_type(&fqn, field, loc).unwrap_or_else(|| self.types.fresh_var()),
                _ => {
                    self.type_error("Only a struct value can be projected with `.`.", loc);
                    self.types.fresh_var()
                }
            },
            ProjectionKind::Brackets => match resolved {
                Type::Ref { inner, unique } => match self.resolved_kind(inner) {
                    Type::Named(fqn) => match self.field_type(&fqn, field, loc) {
                        Some(field_ty) => {
                            let ty = self.types.ref_type(field_ty, unique);
                            self.fresh(ty)
                        }
                        None => self.types.fresh_var(),
                    },
                    _ => {
                        self.type_error("Only a reference to a struct can be projected with `[.]`.", loc);
                        self.types.fresh_var()
                    }
                },
                _ => {
                    self.type_error("Only a reference to a struct can be projected with `[.]`.", loc);
                    self.types.fresh_var()
                }
            },
            ProjectionKind::Arrow => match resolved {
                Type::Ref { inner, .. } => match self.resolved_kind(inner) {
                    Type::Named(fqn) => self.field_type(&fqn, field, loc).unwrap_or_else(|| self.types.fresh_var()),
                    _ => {
                        self.type_error("Only a reference to a struct can be projected with `->`.", loc);
                        self.types.fresh_var()
                    }
                },
                _ => {
                    self.type_error("Only a reference to a struct can be projected with `->`.", loc);
                    self.types.fresh_var()
                }
            },
        }
    }

    /// The declared type of `fqn.field`, freshly materialized. Reports an
    /// error and returns `None` when the struct or field does not exist.
    fn field_type(&mut self, fqn: &str, field: &str, loc: Location) -> Option<TypeId> {
        let Some(decl) = self.ontology.get_type(fqn) else {
            self.errors.push(
                Diagnostic::error()
                    .text(format!("Struct {fqn} not found.\n"))
                    .snippet(loc),
            );
            return None;
        };
        let DeclKind::Struct { fields, .. } = &self.ast.decl(decl).kind else {
            return None;
        };
        let Some(param) = fields.iter().find(|f| f.name == field) else {
            self.errors.push(
                Diagnostic::error()
                    .text(format!("Struct {fqn} has no field {field}.\n"))
                    .snippet(loc),
            );
            return None;
        };
        let ty_expr = param.ty;
        Some(self.fresh_from_type_expr(ty_expr))
    }

    fn unify_call(&mut self, callee: &str, callee_loc: Location, args: &[ExprId], loc: Location) -> TypeId {
        let Some(decl) = self.ontology.get_function(callee) else {
            self.errors.push(
                Diagnostic::error()
                    .text(format!("Function {callee} not found.\n"))
                    .snippet(callee_loc),
            );
            return self.types.fresh_var();
        };
        let DeclKind::Function {
            params,
            variadic,
            return_ty,
            ..
        } = self.ast.decl(decl).kind.clone()
        else {
            return self.types.fresh_var();
        };
        if args.len() < params.len() || (!variadic && args.len() > params.len()) {
            self.errors.push(
                Diagnostic::error()
                    .text(format!("Arity mismatch for function {callee}.\n"))
                    .snippet(loc),
            );
        }
        for (i, &arg) in args.iter().enumerate() {
            match params.get(i) {
                Some(param) => {
                    let expected = self.fresh_from_type_expr(param.ty);
                    self.expect_ty(arg, expected);
                }
                // Extra variadic arguments may have any type.
                None => {
                    self.unify_expr(arg);
                }
            }
        }
        self.fresh_from_type_expr(return_ty)
    }

    fn unify_ctor(&mut self, struct_name: &str, name_loc: Location, args: &[ExprId]) -> TypeId {
        let fields: Option<Vec<Param>> = self
            .ontology
            .get_type(struct_name)
            .and_then(|decl| match &self.ast.decl(decl).kind {
                DeclKind::Struct { fields, .. } => Some(fields.clone()),
                _ => None,
            });
        let Some(fields) = fields else {
            self.errors.push(
                Diagnostic::error()
                    .text(format!("Struct {struct_name} not found.\n"))
                    .snippet(name_loc),
            );
            return self.types.fresh_var();
        };
        if args.len() != fields.len() {
            self.errors.push(
                Diagnostic::error()
                    .text(format!(
                        "Struct {struct_name} has {} fields but {} values were provided.\n",
                        fields.len(),
                        args.len()
                    ))
                    .snippet(name_loc),
            );
        }
        for (&arg, field) in args.iter().zip(fields.iter()) {
            let expected = self.fresh_from_type_expr(field.ty);
            self.expect_ty(arg, expected);
        }
        let ty = self.types.named(struct_name);
        self.fresh(ty)
    }

    //========================================================================//
    // Unification machinery
    //========================================================================//

    /// Infers `expr` and unifies its type with `expected`, reporting a
    /// located error on failure. Returns the inferred type.
    fn expect_ty(&mut self, expr: ExprId, expected: TypeId) -> TypeId {
        let inferred = self.unify_expr(expr);
        let loc = self.ast.expr(expr).loc;
        self.unify_or_report(inferred, expected, loc);
        inferred
    }

    fn unify_or_report(&mut self, inferred: TypeId, expected: TypeId, loc: Location) {
        if !self.unify(inferred, expected) {
            let inferred_s = self.display(inferred);
            let expected_s = self.display(expected);
            self.errors.push(
                Diagnostic::error()
                    .text(format!("Inferred type is {inferred_s} but expected {expected_s}.\n"))
                    .snippet(loc),
            );
        }
    }

    fn type_error(&mut self, message: &'static str, loc: Location) {
        self.errors
            .push(Diagnostic::error().text(message).text("\n").snippet(loc));
    }

    /// The representative of a variable's equivalence class.
    fn find(&self, var: TypeVarId) -> TypeVarId {
        let mut var = var;
        while let Some(&parent) = self.parents.get(&var) {
            var = parent;
        }
        var
    }

    /// Resolves one level: a variable becomes its representative plus that
    /// representative's binding, anything else is already concrete.
    fn shallow_resolve(&self, ty: TypeId) -> (Option<TypeVarId>, Option<TypeId>) {
        match self.types.kind(ty) {
            Type::Var(v) => {
                let w = self.find(*v);
                (Some(w), self.bindings.get(&w).copied())
            }
            _ => (None, Some(ty)),
        }
    }

    /// Enforces equality of the two types. Returns false when they cannot
    /// be the same type; no diagnostics are produced here.
    pub fn unify(&mut self, t1: TypeId, t2: TypeId) -> bool {
        let (v1, c1) = self.shallow_resolve(t1);
        let (v2, c2) = self.shallow_resolve(t2);
        if v1.is_some() && v1 == v2 {
            return true;
        }
        match (c1, c2) {
            (None, None) => {
                // Two unbound variables: merge the classes.
                self.parents.insert(v1.expect("unbound side must be a var"), v2.expect("unbound side must be a var"));
                true
            }
            (None, Some(ty)) => {
                let w1 = v1.expect("unbound side must be a var");
                match v2 {
                    Some(w2) => {
                        self.parents.insert(w1, w2);
                    }
                    None => {
                        self.bindings.insert(w1, ty);
                    }
                }
                true
            }
            (Some(ty), None) => {
                let w2 = v2.expect("unbound side must be a var");
                match v1 {
                    Some(w1) => {
                        self.parents.insert(w2, w1);
                    }
                    None => {
                        self.bindings.insert(w2, ty);
                    }
                }
                true
            }
            (Some(a), Some(b)) => self.unify_concrete(v1, a, v2, b),
        }
    }

    fn unify_concrete(&mut self, v1: Option<TypeVarId>, a: TypeId, v2: Option<TypeVarId>, b: TypeId) -> bool {
        let (ka, kb) = (self.types.kind(a).clone(), self.types.kind(b).clone());
        match (ka, kb) {
            (Type::Prim(p), Type::Prim(q)) if p == q => {
                self.merge(v1, v2);
                true
            }
            (Type::Constraint(x), Type::Constraint(y)) if x == y => {
                self.merge(v1, v2);
                true
            }
            (Type::Named(m), Type::Named(n)) if m == n => {
                self.merge(v1, v2);
                true
            }
            (
                Type::Ref { inner: i1, unique: u1 },
                Type::Ref { inner: i2, unique: u2 },
            ) if u1 == u2 => {
                if self.unify(i1, i2) {
                    self.merge(v1, v2);
                    true
                } else {
                    false
                }
            }
            // Constraint widening: the more specific side wins.
            (Type::Constraint(Constraint::Numeric), other) if numeric_member(&other) => {
                self.prefer(v1, v2, b);
                true
            }
            (other, Type::Constraint(Constraint::Numeric)) if numeric_member(&other) => {
                self.prefer(v2, v1, a);
                true
            }
            (Type::Constraint(Constraint::Decimal), other) if decimal_member(&other) => {
                self.prefer(v1, v2, b);
                true
            }
            (other, Type::Constraint(Constraint::Decimal)) if decimal_member(&other) => {
                self.prefer(v2, v1, a);
                true
            }
            _ => false,
        }
    }

    /// Merges the equivalence classes of two equal types.
    fn merge(&mut self, v1: Option<TypeVarId>, v2: Option<TypeVarId>) {
        if let (Some(w1), Some(w2)) = (v1, v2)
            && w1 != w2
        {
            self.parents.insert(w1, w2);
        }
    }

    /// Points the looser side's class at the more specific type `specific`
    /// (and its class, when there is one).
    fn prefer(&mut self, loose: Option<TypeVarId>, specific_var: Option<TypeVarId>, specific: TypeId) {
        if let Some(w) = loose {
            match specific_var {
                Some(w2) if w != w2 => {
                    self.bindings.remove(&w);
                    self.parents.insert(w, w2);
                }
                _ => {
                    self.bindings.insert(w, specific);
                }
            }
        }
    }

    /// Fully resolves a type for inspection or display, leaving any
    /// still-unbound variables in place.
    fn resolved(&mut self, ty: TypeId) -> TypeId {
        match self.types.kind(ty).clone() {
            Type::Var(v) => {
                let w = self.find(v);
                match self.bindings.get(&w).copied() {
                    Some(bound) => self.resolved(bound),
                    None => self.types.var_type(w),
                }
            }
            Type::Ref { inner, unique } => {
                let inner = self.resolved(inner);
                self.types.ref_type(inner, unique)
            }
            _ => ty,
        }
    }

    fn resolved_kind(&mut self, ty: TypeId) -> Type {
        let resolved = self.resolved(ty);
        self.types.kind(resolved).clone()
    }

    /// Renders the resolved form of `ty` for error messages.
    pub fn display(&mut self, ty: TypeId) -> String {
        let resolved = self.resolved(ty);
        self.types.display(resolved)
    }

    /// A fresh variable bound to `ty`, so the expression carrying it can
    /// be refined later.
    fn fresh(&mut self, ty: TypeId) -> TypeId {
        let var_ty = self.types.fresh_var();
        let &Type::Var(v) = self.types.kind(var_ty) else {
            unreachable!("fresh_var must mint a variable");
        };
        self.bindings.insert(v, ty);
        var_ty
    }

    fn fresh_prim(&mut self, p: Primitive) -> TypeId {
        let ty = self.types.prim(p);
        self.fresh(ty)
    }

    fn fresh_constraint(&mut self, c: Constraint) -> TypeId {
        let ty = self.types.constraint(c);
        self.fresh(ty)
    }

    /// Materializes a type expression with a fresh variable at every level,
    /// so each layer can unify independently.
    fn fresh_from_type_expr(&mut self, id: TypeExprId) -> TypeId {
        match self.ast.type_expr(id).kind.clone() {
            TypeExprKind::Prim(p) => self.fresh_prim(p),
            TypeExprKind::Named(name) => {
                let ty = self.types.named(&name);
                self.fresh(ty)
            }
            TypeExprKind::Ref { pointee, unique } => {
                let inner = self.fresh_from_type_expr(pointee);
                let ty = self.types.ref_type(inner, unique);
                self.fresh(ty)
            }
        }
    }
}

/// True for the concrete types (and narrower constraint) that `numeric`
/// may refine to.
fn numeric_member(ty: &Type) -> bool {
    match ty {
        Type::Prim(p) => p.is_numeric(),
        Type::Constraint(Constraint::Decimal) => true,
        _ => false,
    }
}

/// True for the concrete types that `decimal` may refine to.
fn decimal_member(ty: &Type) -> bool {
    match ty {
        Type::Prim(p) => p.is_decimal(),
        _ => false,
    }
}
