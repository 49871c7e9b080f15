//! Second of the five sema passes. Rewrites every name that denotes a use
//! into its fully qualified form.
//!
//! Resolution is innermost-scope-first: a relative name `n` appearing
//! inside `global::A::B` is tried as `global::A::B::n`, then
//! `global::A::n`, then `global::n`, stopping at the first hit in the
//! appropriate name space. Declaration names are not touched (the
//! cataloger already qualified them); a name that already resolves as
//! written is left alone, which makes the pass idempotent.
//!
//! Calls whose callee resolves in the type space rather than the function
//! space are rewritten into struct constructor nodes here; the two spaces
//! are disjoint, so the rewrite is unambiguous.

use crate::ast::{Ast, DeclId, DeclKind, ExprId, ExprKind, TypeExprId, TypeExprKind};
use crate::diagnostic::Diagnostic;
use crate::location::Location;
use crate::ontology::Ontology;

pub struct Canonicalizer<'a> {
    ontology: &'a Ontology,
    errors: &'a mut Vec<Diagnostic>,
}

impl<'a> Canonicalizer<'a> {
    pub fn new(ontology: &'a Ontology, errors: &'a mut Vec<Diagnostic>) -> Self {
        Self { ontology, errors }
    }

    /// Canonicalizes all the uses inside `decl`, which appears in `scope`.
    pub fn run_decl(&mut self, ast: &mut Ast, decl: DeclId, scope: &str) {
        match ast.decl(decl).kind.clone() {
            DeclKind::Module { name, decls } => {
                // The module's own FQN is the scope for its children.
                for child in decls {
                    self.run_decl(ast, child, &name);
                }
            }
            DeclKind::Function {
                params,
                return_ty,
                body,
                ..
            } => {
                for param in &params {
                    self.canonicalize_type_expr(ast, param.ty, scope);
                }
                self.canonicalize_type_expr(ast, return_ty, scope);
                if let Some(body) = body {
                    self.run_expr(ast, body, scope);
                }
            }
            DeclKind::Struct { fields, .. } => {
                for field in &fields {
                    self.canonicalize_type_expr(ast, field.ty, scope);
                }
            }
        }
    }

    /// Canonicalizes all the uses inside `expr`, which appears in `scope`.
    pub fn run_expr(&mut self, ast: &mut Ast, expr: ExprId, scope: &str) {
        match &ast.expr(expr).kind {
            ExprKind::Call { callee, callee_loc, .. } => {
                let (callee, callee_loc) = (callee.clone(), *callee_loc);
                self.canonicalize_call(ast, expr, &callee, callee_loc, scope);
                for child in ast.expr_children(expr) {
                    self.run_expr(ast, child, scope);
                }
            }
            ExprKind::Ctor {
                struct_name, name_loc, ..
            } => {
                let (name, name_loc) = (struct_name.clone(), *name_loc);
                if let Some(fqn) = self.resolve(scope, &name, Space::Type) {
                    if let ExprKind::Ctor { struct_name, .. } = &mut ast.expr_mut(expr).kind {
                        *struct_name = fqn;
                    }
                } else {
                    self.errors.push(
                        Diagnostic::error()
                            .text("Struct not found.\n")
                            .snippet(name_loc),
                    );
                }
                for child in ast.expr_children(expr) {
                    self.run_expr(ast, child, scope);
                }
            }
            ExprKind::Ascribe { ascription, .. } => {
                let ascription = *ascription;
                self.canonicalize_type_expr(ast, ascription, scope);
                for child in ast.expr_children(expr) {
                    self.run_expr(ast, child, scope);
                }
            }
            ExprKind::Let { ascription, .. } => {
                if let Some(ascription) = *ascription {
                    self.canonicalize_type_expr(ast, ascription, scope);
                }
                for child in ast.expr_children(expr) {
                    self.run_expr(ast, child, scope);
                }
            }
            _ => {
                for child in ast.expr_children(expr) {
                    self.run_expr(ast, child, scope);
                }
            }
        }
    }

    /// Qualifies a call's callee through the function space; a hit in the
    /// type space instead rewrites the call into a constructor invocation.
    fn canonicalize_call(&mut self, ast: &mut Ast, expr: ExprId, callee: &str, callee_loc: Location, scope: &str) {
        if let Some(fqn) = self.resolve(scope, callee, Space::Function) {
            if let ExprKind::Call { callee, .. } = &mut ast.expr_mut(expr).kind {
                *callee = fqn;
            }
            return;
        }
        if let Some(fqn) = self.resolve(scope, callee, Space::Type) {
            let node = ast.expr_mut(expr);
            if let ExprKind::Call { args, .. } = &mut node.kind {
                let args = std::mem::take(args);
                node.kind = ExprKind::Ctor {
                    struct_name: fqn,
                    name_loc: callee_loc,
                    args,
                };
            }
            return;
        }
        self.errors.push(
            Diagnostic::error()
                .text("Function not found.\n")
                .snippet(callee_loc),
        );
    }

    fn canonicalize_type_expr(&mut self, ast: &mut Ast, id: TypeExprId, scope: &str) {
        match &ast.type_expr(id).kind {
            TypeExprKind::Prim(_) => {}
            TypeExprKind::Ref { pointee, .. } => {
                let pointee = *pointee;
                self.canonicalize_type_expr(ast, pointee, scope);
            }
            TypeExprKind::Named(name) => {
                let name = name.clone();
                let loc = ast.type_expr(id).loc;
                if let Some(fqn) = self.resolve(scope, &name, Space::Type) {
                    if let TypeExprKind::Named(name) = &mut ast.type_expr_mut(id).kind {
                        *name = fqn;
                    }
                } else {
                    self.errors.push(
                        Diagnostic::error()
                            .text("Struct type not found.\n")
                            .snippet(loc),
                    );
                }
            }
        }
    }

    /// Innermost-scope-first resolution. A name that already resolves as
    /// written wins outright, keeping repeated canonicalization stable.
    fn resolve(&self, scope: &str, name: &str, space: Space) -> Option<String> {
        if self.lookup(name, space) {
            return Some(name.to_owned());
        }
        let mut scope = scope;
        loop {
            let fqn = format!("{scope}::{name}");
            if self.lookup(&fqn, space) {
                return Some(fqn);
            }
            match scope.rfind("::") {
                Some(i) => scope = &scope[..i],
                None => return None,
            }
        }
    }

    fn lookup(&self, fqn: &str, space: Space) -> bool {
        match space {
            Space::Type => self.ontology.get_type(fqn).is_some(),
            Space::Function => self.ontology.get_function(fqn).is_some(),
        }
    }
}

#[derive(Clone, Copy)]
enum Space {
    Type,
    Function,
}
