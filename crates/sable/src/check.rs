//! The whole pipeline in one call: lex, parse, analyze, borrow-check.
//!
//! This is the seam the CLI and the end-to-end tests sit on. Diagnostics
//! come back already rendered against the source buffer, so callers never
//! need the row index or the raw fragments.

use crate::ast::{Ast, DeclId};
use crate::borrow_check::BorrowChecker;
use crate::lexer::lex;
use crate::ontology::Ontology;
use crate::parser::parse_program;
use crate::sema::{GLOBAL_SCOPE, Sema};
use crate::types::TypeContext;

/// Everything one analysis run produced. `diagnostics` is empty iff the
/// program passed every phase that ran.
pub struct Analysis {
    pub ast: Ast,
    pub decls: Vec<DeclId>,
    pub types: TypeContext,
    pub ontology: Ontology,
    /// Rendered diagnostics, in the order the phases produced them.
    pub diagnostics: Vec<String>,
}

impl Analysis {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Runs the full static analysis over one source buffer.
///
/// Phases short-circuit: a lexing or parsing failure stops everything, a
/// semantic error skips borrow checking. `skip_borrow_check` corresponds
/// to the driver's `-b` flag.
#[must_use]
pub fn check_source(source: &str, skip_borrow_check: bool) -> Analysis {
    let mut ast = Ast::new();
    let lexed = lex(source);

    if let Some(error) = lexed.error {
        return Analysis {
            ast,
            decls: Vec::new(),
            types: TypeContext::new(),
            ontology: Ontology::new(),
            diagnostics: vec![error.render(source, &lexed.index)],
        };
    }

    let decls = match parse_program(&lexed.tokens, &mut ast) {
        Ok(decls) => decls,
        Err(error) => {
            return Analysis {
                ast,
                decls: Vec::new(),
                types: TypeContext::new(),
                ontology: Ontology::new(),
                diagnostics: vec![error.render(source, &lexed.index)],
            };
        }
    };

    let mut sema = Sema::new();
    sema.run(&mut ast, &decls, GLOBAL_SCOPE);

    let mut diagnostics: Vec<String> = sema
        .take_errors()
        .iter()
        .map(|d| d.render(source, &lexed.index))
        .collect();

    let (ontology, mut types) = sema.into_parts();

    if diagnostics.is_empty() && !skip_borrow_check {
        let mut checker = BorrowChecker::new(&ast, &ontology, &mut types);
        checker.check_decls(&decls);
        diagnostics.extend(checker.errors.iter().map(|d| d.render(source, &lexed.index)));
    }

    Analysis {
        ast,
        decls,
        types,
        ontology,
        diagnostics,
    }
}
