//! The semantic analyzer: orchestrates the five passes.
//!
//! 1. Cataloger     -- builds the ontology from declaration names
//! 2. Canonicalizer -- fully qualifies all names
//! 3. Unifier       -- Hindley-Milner type unification
//! 4. LValueMarker  -- distinguishes lvalues from rvalues
//! 5. Resolver      -- scrubs type variables from the tree
//!
//! Cataloging runs over the whole tree and a failure there aborts the
//! pipeline. Canonicalization then runs over every declaration (so a
//! function may reference a struct declared after it). The remaining
//! passes run per declaration, and a pass that produced errors for a
//! declaration short-circuits the later passes for that declaration only.
//!
//! The ontology and the type context are shared, populated here, and
//! read-only to everything downstream. The union-find maps are owned here
//! and shared between the unifier and the resolver.

use ahash::AHashMap;

use crate::ast::{Ast, DeclId, DeclKind, ExprId};
use crate::cataloger::Cataloger;
use crate::canonicalizer::Canonicalizer;
use crate::diagnostic::Diagnostic;
use crate::lvalue::LValueMarker;
use crate::ontology::Ontology;
use crate::resolver::Resolver;
use crate::types::{TypeContext, TypeId, TypeVarId};
use crate::unifier::Unifier;

/// The root scope every compilation starts in.
pub const GLOBAL_SCOPE: &str = "global";

#[derive(Default)]
pub struct Sema {
    pub ontology: Ontology,
    pub types: TypeContext,
    /// Type variable equivalence classes, shared by unifier and resolver.
    parents: AHashMap<TypeVarId, TypeVarId>,
    /// Type variable bindings, shared by unifier and resolver.
    bindings: AHashMap<TypeVarId, TypeId>,
    errors: Vec<Diagnostic>,
}

impl Sema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    #[must_use]
    pub fn take_errors(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.errors)
    }

    /// Consumes the world, releasing the ontology and type context for
    /// downstream consumers.
    #[must_use]
    pub fn into_parts(self) -> (Ontology, TypeContext) {
        (self.ontology, self.types)
    }

    /// Runs all semantic analysis passes over `decls`, which appear in
    /// `scope`.
    pub fn run(&mut self, ast: &mut Ast, decls: &[DeclId], scope: &str) {
        Cataloger::new(&mut self.ontology, &mut self.errors).run(ast, decls, scope);
        if self.has_errors() {
            return;
        }

        // Flatten modules into the list of analyzable declarations with
        // their enclosing scopes.
        let mut units: Vec<(DeclId, String)> = Vec::new();
        for &decl in decls {
            collect_units(ast, decl, scope, &mut units);
        }

        let mut failed = vec![false; units.len()];
        for (i, (decl, decl_scope)) in units.iter().enumerate() {
            let before = self.errors.len();
            Canonicalizer::new(&self.ontology, &mut self.errors).run_decl(ast, *decl, decl_scope);
            failed[i] = self.errors.len() > before;
        }

        for (i, (decl, _)) in units.iter().enumerate() {
            if failed[i] {
                continue;
            }
            self.analyze_decl(ast, *decl);
        }
    }

    /// Runs every pass except cataloging over a standalone expression in
    /// `scope`. Used for expression-level analysis in tests and tooling.
    pub fn analyze_expr(&mut self, ast: &mut Ast, expr: ExprId, scope: &str) {
        let before = self.errors.len();
        Canonicalizer::new(&self.ontology, &mut self.errors).run_expr(ast, expr, scope);
        if self.errors.len() > before {
            return;
        }
        Unifier::new(
            ast,
            &self.ontology,
            &mut self.types,
            &mut self.parents,
            &mut self.bindings,
            &mut self.errors,
        )
        .unify_expr(expr);
        if self.errors.len() > before {
            return;
        }
        LValueMarker::new(&mut self.errors).run_expr(ast, expr);
        if self.errors.len() > before {
            return;
        }
        Resolver::new(&mut self.types, &self.parents, &self.bindings, &mut self.errors).run_expr(ast, expr);
    }

    /// Unify, lvalue-mark, and resolve one declaration, stopping at the
    /// first pass that reports an error for it.
    fn analyze_decl(&mut self, ast: &mut Ast, decl: DeclId) {
        if !matches!(ast.decl(decl).kind, DeclKind::Function { .. }) {
            return;
        }
        let before = self.errors.len();
        Unifier::new(
            ast,
            &self.ontology,
            &mut self.types,
            &mut self.parents,
            &mut self.bindings,
            &mut self.errors,
        )
        .unify_function(decl);
        if self.errors.len() > before {
            return;
        }
        LValueMarker::new(&mut self.errors).run_decl(ast, decl);
        if self.errors.len() > before {
            return;
        }
        Resolver::new(&mut self.types, &self.parents, &self.bindings, &mut self.errors).run_decl(ast, decl);
    }
}

/// Flattens the declaration tree into (declaration, enclosing scope)
/// pairs, skipping the module nodes themselves.
fn collect_units(ast: &Ast, decl: DeclId, scope: &str, out: &mut Vec<(DeclId, String)>) {
    match &ast.decl(decl).kind {
        DeclKind::Module { name, decls } => {
            // After cataloging, the module's name is its FQN and is the
            // scope for its children.
            let child_scope = name.clone();
            for &child in decls {
                collect_units(ast, child, &child_scope, out);
            }
        }
        DeclKind::Function { .. } | DeclKind::Struct { .. } => out.push((decl, scope.to_owned())),
    }
}
