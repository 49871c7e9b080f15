use sable::{Ast, BinOp, DeclKind, ExprId, ExprKind, ProjectionKind, TypeExprKind, lex, parse_decl, parse_expr, parse_program};

fn expr(source: &str) -> (Ast, ExprId) {
    let out = lex(source);
    assert!(out.error.is_none(), "lex error in {source:?}");
    let mut ast = Ast::new();
    let id = parse_expr(&out.tokens, &mut ast).unwrap_or_else(|e| panic!("parse error in {source:?}: {}", e.message()));
    (ast, id)
}

fn expr_err(source: &str) -> String {
    let out = lex(source);
    assert!(out.error.is_none(), "lex error in {source:?}");
    let mut ast = Ast::new();
    parse_expr(&out.tokens, &mut ast)
        .expect_err("expected a parse error")
        .message()
}

#[test]
fn precedence_of_arithmetic() {
    let (ast, id) = expr("1 + 2 * 3");
    let ExprKind::Binop { op: BinOp::Add, rhs, .. } = &ast.expr(id).kind else {
        panic!("expected + at the root");
    };
    assert!(matches!(ast.expr(*rhs).kind, ExprKind::Binop { op: BinOp::Mul, .. }));
}

#[test]
fn assignment_is_looser_than_ascription() {
    let (ast, id) = expr("x = 1: i32");
    let ExprKind::Assign { rhs, .. } = &ast.expr(id).kind else {
        panic!("expected = at the root");
    };
    assert!(matches!(ast.expr(*rhs).kind, ExprKind::Ascribe { .. }));
}

#[test]
fn postfix_deref_binds_tighter_than_assignment() {
    let (ast, id) = expr("x! = 1");
    let ExprKind::Assign { lhs, .. } = &ast.expr(id).kind else {
        panic!("expected = at the root");
    };
    assert!(matches!(ast.expr(*lhs).kind, ExprKind::Deref { .. }));
}

#[test]
fn projection_kinds() {
    let (ast, id) = expr("p.name");
    assert!(matches!(
        ast.expr(id).kind,
        ExprKind::Project {
            kind: ProjectionKind::Dot,
            ..
        }
    ));
    let (ast, id) = expr("p[.name]");
    assert!(matches!(
        ast.expr(id).kind,
        ExprKind::Project {
            kind: ProjectionKind::Brackets,
            ..
        }
    ));
    let (ast, id) = expr("p->name");
    assert!(matches!(
        ast.expr(id).kind,
        ExprKind::Project {
            kind: ProjectionKind::Arrow,
            ..
        }
    ));
    let (ast, id) = expr("xs[0]");
    assert!(matches!(ast.expr(id).kind, ExprKind::Index { .. }));
}

#[test]
fn prefix_operators() {
    let (ast, id) = expr("borrow x");
    assert!(matches!(ast.expr(id).kind, ExprKind::Borrow { .. }));
    let (ast, id) = expr("move p->val");
    assert!(matches!(ast.expr(id).kind, ExprKind::Move { .. }));
    let (ast, id) = expr("&x");
    assert!(matches!(ast.expr(id).kind, ExprKind::AddrOf { .. }));
}

#[test]
fn blocks_allow_final_expression_without_semicolon() {
    let (ast, id) = expr("{ let x = 1; x }");
    let ExprKind::Block { stmts } = &ast.expr(id).kind else {
        panic!("expected a block");
    };
    assert_eq!(stmts.len(), 2);
    assert!(matches!(ast.expr(stmts[0]).kind, ExprKind::Let { .. }));
    assert!(matches!(ast.expr(stmts[1]).kind, ExprKind::Name(_)));
}

#[test]
fn if_with_and_without_else() {
    let (ast, id) = expr("if (c) 1 else 2");
    assert!(matches!(
        ast.expr(id).kind,
        ExprKind::If {
            else_branch: Some(_),
            ..
        }
    ));
    let (ast, id) = expr("if (c) { f(); }");
    assert!(matches!(ast.expr(id).kind, ExprKind::If { else_branch: None, .. }));
}

#[test]
fn qualified_names_join_with_double_colon() {
    let (ast, id) = expr("A::B::f(1)");
    let ExprKind::Call { callee, args, .. } = &ast.expr(id).kind else {
        panic!("expected a call");
    };
    assert_eq!(callee, "A::B::f");
    assert_eq!(args.len(), 1);
}

#[test]
fn function_declaration_shape() {
    let out = lex("func foo(a: i32, b: &i8): unit = { };");
    let mut ast = Ast::new();
    let id = parse_decl(&out.tokens, &mut ast).expect("parse failed");
    let DeclKind::Function {
        name,
        params,
        variadic,
        body,
        ..
    } = &ast.decl(id).kind
    else {
        panic!("expected a function");
    };
    assert_eq!(name, "foo");
    assert_eq!(params.len(), 2);
    assert!(!*variadic);
    assert!(body.is_some());
    assert!(matches!(
        ast.type_expr(params[1].ty).kind,
        TypeExprKind::Ref { unique: false, .. }
    ));
}

#[test]
fn extern_and_variadic() {
    let out = lex("extern func printf(fmt: &i8, ...): i32;");
    let mut ast = Ast::new();
    let id = parse_decl(&out.tokens, &mut ast).expect("parse failed");
    let DeclKind::Function { variadic, body, .. } = &ast.decl(id).kind else {
        panic!("expected a function");
    };
    assert!(*variadic);
    assert!(body.is_none());
}

#[test]
fn unique_reference_type_expression() {
    let out = lex("extern func malloc(size: i64): #i8;");
    let mut ast = Ast::new();
    let id = parse_decl(&out.tokens, &mut ast).expect("parse failed");
    let DeclKind::Function { return_ty, .. } = &ast.decl(id).kind else {
        panic!("expected a function");
    };
    assert_eq!(ast.type_expr_string(*return_ty), "#i8");
}

#[test]
fn modules_nest() {
    let out = lex("module A { module B { extern func f(): unit; } }");
    let mut ast = Ast::new();
    let decls = parse_program(&out.tokens, &mut ast).expect("parse failed");
    assert_eq!(decls.len(), 1);
    let DeclKind::Module { name, decls: inner } = &ast.decl(decls[0]).kind else {
        panic!("expected a module");
    };
    assert_eq!(name, "A");
    assert!(matches!(&ast.decl(inner[0]).kind, DeclKind::Module { .. }));
}

#[test]
fn parse_errors_name_the_expected_token() {
    let msg = expr_err("{ let x = 1 2; }");
    assert!(msg.contains("I got stuck parsing"), "got: {msg}");
    let msg = expr_err("(1 + 2");
    assert!(msg.contains("I was expecting )"), "got: {msg}");
}

#[test]
fn struct_declaration_shape() {
    let out = lex("struct Person { name: &i8, age: i8 }");
    let mut ast = Ast::new();
    let id = parse_decl(&out.tokens, &mut ast).expect("parse failed");
    let DeclKind::Struct { name, fields } = &ast.decl(id).kind else {
        panic!("expected a struct");
    };
    assert_eq!(name, "Person");
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0].name, "name");
}
