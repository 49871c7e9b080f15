#![doc = include_str!("../../../README.md")]

pub mod access_path;
pub mod ast;
pub mod borrow_check;
pub mod borrow_state;
pub mod cataloger;
pub mod canonicalizer;
pub mod check;
pub mod diagnostic;
pub mod lexer;
pub mod location;
pub mod lvalue;
pub mod ontology;
pub mod parser;
pub mod resolver;
pub mod scope;
pub mod sema;
pub mod token;
pub mod types;
pub mod unifier;

pub use crate::{
    access_path::{Path, PathId, PathManager},
    ast::{Ast, BinOp, DeclId, DeclKind, ExprId, ExprKind, Param, ProjectionKind, TypeExprId, TypeExprKind, UnOp},
    borrow_check::BorrowChecker,
    borrow_state::BorrowState,
    check::{Analysis, check_source},
    diagnostic::Diagnostic,
    lexer::{LexOutput, lex},
    location::{LineIndex, Location},
    ontology::Ontology,
    parser::{parse_decl, parse_expr, parse_program},
    sema::{GLOBAL_SCOPE, Sema},
    token::{Token, TokenKind},
    types::{Constraint, Primitive, Type, TypeContext, TypeId},
};
