//! First of the five sema passes. Fully qualifies all declaration names
//! and builds the [`Ontology`].

use crate::ast::{Ast, DeclId, DeclKind};
use crate::diagnostic::Diagnostic;
use crate::ontology::Ontology;

pub struct Cataloger<'a> {
    ontology: &'a mut Ontology,
    errors: &'a mut Vec<Diagnostic>,
}

impl<'a> Cataloger<'a> {
    pub fn new(ontology: &'a mut Ontology, errors: &'a mut Vec<Diagnostic>) -> Self {
        Self { ontology, errors }
    }

    /// Catalogs every declaration in `decls`, which appear in `scope`.
    pub fn run(&mut self, ast: &mut Ast, decls: &[DeclId], scope: &str) {
        for &decl in decls {
            self.catalog(ast, decl, scope);
        }
    }

    fn catalog(&mut self, ast: &mut Ast, id: DeclId, scope: &str) {
        let decl = ast.decl(id);
        let rel_name = decl.name().to_owned();
        let name_loc = decl.name_loc;
        let fqn = format!("{scope}::{rel_name}");

        match &ast.decl(id).kind {
            DeclKind::Module { decls, .. } => {
                let children = decls.clone();
                if self.ontology.get_module(&fqn).is_some() {
                    self.errors.push(
                        Diagnostic::error()
                            .text(format!("Module is already defined: {fqn}\n"))
                            .snippet(name_loc),
                    );
                } else {
                    set_name(ast, id, &fqn);
                    self.ontology.record_module(&fqn, id);
                }
                for child in children {
                    self.catalog(ast, child, &fqn);
                }
            }
            DeclKind::Struct { .. } => {
                if self.ontology.get_function_or_constructor(&fqn).is_some() {
                    self.errors.push(
                        Diagnostic::error()
                            .text(format!("Struct is already defined: {fqn}\n"))
                            .snippet(name_loc),
                    );
                    return;
                }
                set_name(ast, id, &fqn);
                self.ontology.record_type(&fqn, id);
            }
            DeclKind::Function { body, .. } => {
                let is_extern = body.is_none();
                if self.ontology.get_function_or_constructor(&fqn).is_some() {
                    self.errors.push(
                        Diagnostic::error()
                            .text(format!("Function is already defined: {fqn}\n"))
                            .snippet(name_loc),
                    );
                    return;
                }
                if rel_name == "main" {
                    if self.ontology.entry_point.is_some() {
                        self.errors.push(
                            Diagnostic::error()
                                .text("There are multiple program entry points.\n")
                                .snippet(name_loc),
                        );
                        return;
                    }
                    set_name(ast, id, &fqn);
                    self.ontology.entry_point = Some(fqn.clone());
                    self.ontology.record_function(&fqn, "main", id);
                } else if is_extern {
                    set_name(ast, id, &fqn);
                    self.ontology.record_function(&fqn, &rel_name, id);
                } else {
                    set_name(ast, id, &fqn);
                    self.ontology.record_function(&fqn, &fqn, id);
                }
            }
        }
    }
}

fn set_name(ast: &mut Ast, id: DeclId, fqn: &str) {
    match &mut ast.decl_mut(id).kind {
        DeclKind::Module { name, .. } | DeclKind::Function { name, .. } | DeclKind::Struct { name, .. } => {
            fqn.clone_into(name);
        }
    }
}
