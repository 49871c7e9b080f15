use sable::{Ast, GLOBAL_SCOPE, Sema, canonicalizer::Canonicalizer, check_source, lex, parse_expr, parse_program};

/// Runs expression-level analysis and asserts the final rendered type.
fn exp_should_have_type(source: &str, expected: &str) {
    let out = lex(source);
    assert!(out.error.is_none(), "lex error in {source:?}");
    let mut ast = Ast::new();
    let expr = parse_expr(&out.tokens, &mut ast).unwrap_or_else(|e| panic!("parse error in {source:?}: {}", e.message()));
    let mut sema = Sema::new();
    sema.analyze_expr(&mut ast, expr, GLOBAL_SCOPE);
    let messages: Vec<String> = sema.errors().iter().map(sable::Diagnostic::message).collect();
    assert!(!sema.has_errors(), "analysis of {source:?} failed: {messages:?}");
    let ty = ast.expr(expr).ty.expect("type slot not filled");
    assert_eq!(sema.types.display(ty), expected, "for {source:?}");
}

fn exp_should_fail(source: &str) {
    let out = lex(source);
    assert!(out.error.is_none(), "lex error in {source:?}");
    let mut ast = Ast::new();
    let expr = parse_expr(&out.tokens, &mut ast).unwrap_or_else(|e| panic!("parse error in {source:?}: {}", e.message()));
    let mut sema = Sema::new();
    sema.analyze_expr(&mut ast, expr, GLOBAL_SCOPE);
    assert!(sema.has_errors(), "expected {source:?} to fail analysis");
}

/// Full-program analysis without borrow checking.
fn decls_should_pass(source: &str) {
    let analysis = check_source(source, true);
    assert!(
        analysis.passed(),
        "expected {source:?} to pass, got: {:?}",
        analysis.diagnostics
    );
}

fn decls_should_fail(source: &str) -> String {
    let analysis = check_source(source, true);
    assert!(!analysis.passed(), "expected {source:?} to fail analysis");
    analysis.diagnostics.join("")
}

//==========================================================================//

#[test]
fn types_of_literals() {
    exp_should_have_type("true", "bool");
    exp_should_have_type("false", "bool");
    exp_should_have_type("42", "numeric");
    exp_should_have_type("3.14", "decimal");
    exp_should_have_type("\"hello\\n\"", "&i8");
}

#[test]
fn type_ascription() {
    exp_should_have_type("42: i32", "i32");
}

#[test]
fn let_bindings() {
    exp_should_have_type("{ let x = 42; x; }", "numeric");
    exp_should_have_type("{ let x = 42; true; }", "bool");
    exp_should_have_type("{ let x = 42; }", "unit");
    exp_should_have_type("{ let x = 42; let y = x + 1; y; }", "numeric");
}

#[test]
fn let_shadowing() {
    exp_should_have_type("{ let x = 42; let x = true; x; }", "bool");
}

#[test]
fn literal_refinement_through_ascription() {
    exp_should_have_type("{ let x: i32 = 0; x + 1; }", "i32");
    exp_should_have_type("{ let x = 1.5; x + 1.0; }", "decimal");
}

#[test]
fn unbound_identifier() {
    exp_should_fail("foobar");
}

#[test]
fn references() {
    exp_should_have_type("{ let x = 0; &x }", "&numeric");
}

#[test]
fn deref_expression() {
    exp_should_have_type("{ let x = 0; (&x)! }", "numeric");
}

#[test]
fn assign_expression() {
    exp_should_have_type("{ let x: i32 = 0; x = x + 42 }", "unit");
}

#[test]
fn comparison_and_logic() {
    exp_should_have_type("1 < 2", "bool");
    exp_should_have_type("true && 1 == 1", "bool");
    exp_should_fail("1 && true");
}

#[test]
fn cannot_unify_disjoint_types() {
    exp_should_fail("{ let x = true; x + 1; }");
    exp_should_fail("true: i32");
    exp_should_fail("3.14: i32");
}

#[test]
fn assign_to_rvalue_should_fail() {
    let rendered = decls_should_fail(
        "func testing(): unit = {\
           let x: i32 = 0;\
           x + 1 = 1;\
         };",
    );
    assert!(rendered.contains("not an lvalue"), "got: {rendered}");
}

#[test]
fn address_of_rvalue_should_fail() {
    exp_should_fail("&42");
}

#[test]
fn decls_and_call_expressions() {
    decls_should_pass(
        "module Testing {\
           extern func f(x: i32): i32;\
           extern func p(y: i8): bool;\
           func g(x: i32): i32 = f(2*x) + 1;\
           func h(z: i8): i32 = if (p(z)) 0 else 1;\
         }",
    );
}

#[test]
fn decls_with_references() {
    decls_should_pass(
        "module Testing {\
           extern func f(x: &i32): unit;\
           func h(): unit = { let x = 42; f(&x); };\
         }",
    );
}

#[test]
fn indexing() {
    exp_should_have_type("(\"hello\")[0]", "&i8");
}

#[test]
fn structs_and_field_access() {
    decls_should_pass(
        "module Testing {\
           struct Person { name: &i8, age: i8 }\
           func blah(p: &Person): unit = {\
             let n1: &&i8 = p[.name];\
             let n2: &i8  = p!.name;\
             let n3: &i8  = p->name;\
           };\
         }",
    );
}

#[test]
fn arrow_projection_type() {
    decls_should_pass(
        "struct Person { name: &i8, age: i8 }\
         func f(p: &Person): &i8 = p->name;",
    );
}

#[test]
fn unknown_field_fails() {
    let rendered = decls_should_fail(
        "struct Person { name: &i8 }\
         func f(p: &Person): &i8 = p->surname;",
    );
    assert!(rendered.contains("no field"), "got: {rendered}");
}

#[test]
fn variadic_function() {
    decls_should_pass(
        "module Testing {\
           extern func foo(x: i32, y: &i8, ...): i32;\
           func bar(): i32 = foo(0, \"hi\", true, 42);\
         }",
    );
}

#[test]
fn arity_mismatch_fails() {
    let rendered = decls_should_fail(
        "extern func f(x: i32, y: i32): i32;\
         func g(): i32 = f(1);",
    );
    assert!(rendered.contains("Arity mismatch"), "got: {rendered}");
}

#[test]
fn constructor_shares_call_syntax() {
    decls_should_pass(
        "struct Pair { a: i32, b: i32 }\
         func make(): Pair = Pair(1, 2);",
    );
}

#[test]
fn constructor_field_count_checked() {
    let rendered = decls_should_fail(
        "struct Pair { a: i32, b: i32 }\
         func make(): Pair = Pair(1);",
    );
    assert!(rendered.contains("fields"), "got: {rendered}");
}

#[test]
fn innermost_scope_wins_name_resolution() {
    decls_should_pass(
        "extern func f(): i32;\
         module M {\
           extern func f(): bool;\
           func g(): bool = f();\
         }\
         func h(): i32 = f();",
    );
}

#[test]
fn duplicate_function_fails() {
    let rendered = decls_should_fail(
        "extern func f(): unit;\
         extern func f(): unit;",
    );
    assert!(rendered.contains("already defined"), "got: {rendered}");
}

#[test]
fn struct_and_function_share_a_namespace() {
    let rendered = decls_should_fail(
        "struct S { a: i32 }\
         extern func S(): unit;",
    );
    assert!(rendered.contains("already defined"), "got: {rendered}");
}

#[test]
fn multiple_entry_points_fail() {
    let rendered = decls_should_fail(
        "func main(): unit = { };\
         module M { func main(): unit = { }; }",
    );
    assert!(rendered.contains("entry points"), "got: {rendered}");
}

#[test]
fn entry_point_is_recorded() {
    let analysis = check_source("func main(): unit = { };", true);
    assert!(analysis.passed());
    assert_eq!(analysis.ontology.entry_point.as_deref(), Some("global::main"));
    assert_eq!(analysis.ontology.short_name("global::main"), Some("main"));
}

#[test]
fn unknown_function_fails() {
    let rendered = decls_should_fail("func g(): unit = { nosuch(); };");
    assert!(rendered.contains("not found"), "got: {rendered}");
}

#[test]
fn canonicalization_is_idempotent() {
    let source = "module M {\
                    struct Person { name: &i8 }\
                    extern func f(p: &Person): unit;\
                    func g(p: &Person): unit = f(p);\
                  }";
    let out = lex(source);
    assert!(out.error.is_none());
    let mut ast = Ast::new();
    let decls = parse_program(&out.tokens, &mut ast).expect("parse failed");
    let mut sema = Sema::new();
    sema.run(&mut ast, &decls, GLOBAL_SCOPE);
    assert!(!sema.has_errors());
    let once = ast.dump_decl(decls[0], &sema.types);

    // A second canonicalization pass must leave the tree unchanged.
    let mut errors = Vec::new();
    Canonicalizer::new(&sema.ontology, &mut errors).run_decl(&mut ast, decls[0], GLOBAL_SCOPE);
    assert!(errors.is_empty(), "second canonicalization errored");
    let twice = ast.dump_decl(decls[0], &sema.types);
    assert_eq!(once, twice);
}

#[test]
fn resolved_types_are_variable_free() {
    let source = "extern func malloc(size: i64): #i8;\
                  func f(): #i8 = malloc(8);";
    let out = lex(source);
    assert!(out.error.is_none());
    let mut ast = Ast::new();
    let decls = parse_program(&out.tokens, &mut ast).expect("parse failed");
    let mut sema = Sema::new();
    sema.run(&mut ast, &decls, GLOBAL_SCOPE);
    assert!(!sema.has_errors());
    let dumped = ast.dump_decl(decls[1], &sema.types);
    assert!(!dumped.contains("$var"), "unresolved type variable in:\n{dumped}");
    assert!(dumped.contains("#i8"), "expected #i8 in:\n{dumped}");
}
