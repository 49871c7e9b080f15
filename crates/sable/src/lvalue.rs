//! Fourth of the five sema passes. Distinguishes lvalues from rvalues.
//!
//! An lvalue is an expression that is certain to have an address. It is
//! precisely one of the following forms:
//!   - a name
//!   - a dereference
//!   - a projection with `->`
//!   - a projection with `.` whose base is an lvalue
//!   - an ascription whose ascriptee is an lvalue
//!
//! Everything else is an rvalue. An rvalue as the operand of `&` or as the
//! left side of an assignment is an error.

use crate::ast::{Ast, DeclId, DeclKind, ExprId, ExprKind, ProjectionKind};
use crate::diagnostic::Diagnostic;

pub struct LValueMarker<'a> {
    errors: &'a mut Vec<Diagnostic>,
}

impl<'a> LValueMarker<'a> {
    pub fn new(errors: &'a mut Vec<Diagnostic>) -> Self {
        Self { errors }
    }

    /// Marks the body of a function declaration.
    pub fn run_decl(&mut self, ast: &mut Ast, decl: DeclId) {
        if let DeclKind::Function { body: Some(body), .. } = &ast.decl(decl).kind {
            let body = *body;
            self.run_expr(ast, body);
        }
    }

    /// Recursively classifies `expr` and its children.
    pub fn run_expr(&mut self, ast: &mut Ast, expr: ExprId) {
        match ast.expr(expr).kind.clone() {
            ExprKind::Ascribe { inner, .. } => {
                self.run_expr(ast, inner);
                if ast.expr(inner).lvalue {
                    ast.expr_mut(expr).lvalue = true;
                }
            }
            ExprKind::AddrOf { inner } => {
                self.run_expr(ast, inner);
                if !ast.expr(inner).lvalue {
                    self.errors.push(
                        Diagnostic::error()
                            .text("Expression must be an lvalue to take its address.\n")
                            .snippet(ast.expr(inner).loc),
                    );
                }
            }
            ExprKind::Assign { lhs, rhs } => {
                self.run_expr(ast, lhs);
                if !ast.expr(lhs).lvalue {
                    self.errors.push(
                        Diagnostic::error()
                            .text("Left side of assignment is not an lvalue.\n")
                            .snippet(ast.expr(lhs).loc),
                    );
                }
                self.run_expr(ast, rhs);
            }
            ExprKind::Deref { inner } => {
                self.run_expr(ast, inner);
                ast.expr_mut(expr).lvalue = true;
            }
            ExprKind::Name(_) => {
                ast.expr_mut(expr).lvalue = true;
            }
            ExprKind::Project { base, kind, .. } => {
                self.run_expr(ast, base);
                match kind {
                    ProjectionKind::Arrow => ast.expr_mut(expr).lvalue = true,
                    ProjectionKind::Dot => {
                        if ast.expr(base).lvalue {
                            ast.expr_mut(expr).lvalue = true;
                        }
                    }
                    ProjectionKind::Brackets => {}
                }
            }
            _ => {
                for child in ast.expr_children(expr) {
                    self.run_expr(ast, child);
                }
            }
        }
    }
}
