//! Fifth of the five sema passes. Scrubs type variables from the tree.
//!
//! After unification succeeds, every expression's type slot is replaced
//! with its fully resolved type. Constraint types that were never refined
//! further (`numeric`, `decimal`) are kept as the final type. A variable
//! that is still unbound at this point means the program did not pin the
//! type down, which is reported as a diagnostic rather than treated as an
//! internal invariant violation.

use ahash::AHashMap;

use crate::ast::{Ast, DeclId, DeclKind, ExprId};
use crate::diagnostic::Diagnostic;
use crate::types::{Type, TypeContext, TypeId, TypeVarId};

pub struct Resolver<'a> {
    types: &'a mut TypeContext,
    parents: &'a AHashMap<TypeVarId, TypeVarId>,
    bindings: &'a AHashMap<TypeVarId, TypeId>,
    errors: &'a mut Vec<Diagnostic>,
}

impl<'a> Resolver<'a> {
    pub fn new(
        types: &'a mut TypeContext,
        parents: &'a AHashMap<TypeVarId, TypeVarId>,
        bindings: &'a AHashMap<TypeVarId, TypeId>,
        errors: &'a mut Vec<Diagnostic>,
    ) -> Self {
        Self {
            types,
            parents,
            bindings,
            errors,
        }
    }

    /// Resolves every expression type in a function body.
    pub fn run_decl(&mut self, ast: &mut Ast, decl: DeclId) {
        if let DeclKind::Function { body: Some(body), .. } = &ast.decl(decl).kind {
            let body = *body;
            self.run_expr(ast, body);
        }
    }

    /// Resolves `expr` and its children.
    pub fn run_expr(&mut self, ast: &mut Ast, expr: ExprId) {
        if let Some(ty) = ast.expr(expr).ty {
            match self.resolve_type(ty) {
                Some(resolved) => ast.expr_mut(expr).ty = Some(resolved),
                None => self.errors.push(
                    Diagnostic::error()
                        .text("Could not infer the type of this expression.\n")
                        .snippet(ast.expr(expr).loc),
                ),
            }
        }
        for child in ast.expr_children(expr) {
            self.run_expr(ast, child);
        }
    }

    fn find(&self, var: TypeVarId) -> TypeVarId {
        let mut var = var;
        while let Some(&parent) = self.parents.get(&var) {
            var = parent;
        }
        var
    }

    /// Removes all type variables from `ty`. `None` means a variable was
    /// left unbound by unification.
    pub fn resolve_type(&mut self, ty: TypeId) -> Option<TypeId> {
        match self.types.kind(ty).clone() {
            Type::Var(v) => {
                let bound = self.bindings.get(&self.find(v)).copied()?;
                self.resolve_type(bound)
            }
            Type::Ref { inner, unique } => {
                let inner = self.resolve_type(inner)?;
                Some(self.types.ref_type(inner, unique))
            }
            Type::Prim(_) | Type::Constraint(_) | Type::Named(_) => Some(ty),
        }
    }
}
