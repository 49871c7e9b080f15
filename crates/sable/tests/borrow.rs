use sable::check_source;

fn decls_should_pass(source: &str) {
    let analysis = check_source(source, false);
    assert!(
        analysis.passed(),
        "expected {source:?} to pass, got: {:?}",
        analysis.diagnostics
    );
}

fn decls_should_fail(source: &str) -> String {
    let analysis = check_source(source, false);
    assert!(!analysis.passed(), "expected {source:?} to fail borrow checking");
    analysis.diagnostics.join("")
}

const MALLOC_FREE: &str = "extern func malloc(size: i64): #i8;\n\
                           extern func free(ptr: #i8): unit;\n";

//==========================================================================//

#[test]
fn malloc_then_free() {
    decls_should_pass(&format!(
        "{MALLOC_FREE}\
         func foo(): unit = {{\n\
           let x = malloc(10);\n\
           free(x);\n\
         }};"
    ));
}

#[test]
fn unfreed_owned_reference() {
    let rendered = decls_should_fail(&format!(
        "{MALLOC_FREE}\
         func foo(): unit = {{\n\
           let x = malloc(10);\n\
         }};"
    ));
    assert!(rendered.contains("is never used"), "got: {rendered}");
}

#[test]
fn double_freed_owned_reference() {
    let rendered = decls_should_fail(&format!(
        "{MALLOC_FREE}\
         func foo(): unit = {{\n\
           let x = malloc(10);\n\
           free(x);\n\
           free(x);\n\
         }};"
    ));
    assert!(rendered.contains("already used"), "got: {rendered}");
    assert!(rendered.contains("cannot be used later"), "got: {rendered}");
}

#[test]
fn immediately_borrowed_malloc() {
    let rendered = decls_should_fail(
        "extern func malloc(size: i64): #i8;\n\
         func foo(): &i8 = borrow malloc(10);",
    );
    assert!(rendered.contains("is never used"), "got: {rendered}");
}

#[test]
fn borrow_after_use() {
    let rendered = decls_should_fail(&format!(
        "{MALLOC_FREE}\
         func foo(): unit = {{\n\
           let x = malloc(10);\n\
           free(x);\n\
           let y = borrow x;\n\
         }};"
    ));
    assert!(rendered.contains("cannot be borrowed later"), "got: {rendered}");
}

#[test]
fn borrowing_before_use_is_fine() {
    decls_should_pass(&format!(
        "{MALLOC_FREE}\
         extern func strlen(s: &i8): i64;\n\
         func foo(): i64 = {{\n\
           let x = malloc(10);\n\
           let n = strlen(borrow x);\n\
           free(x);\n\
           n\n\
         }};"
    ));
}

#[test]
fn returning_consumes_the_reference() {
    decls_should_pass(&format!(
        "{MALLOC_FREE}\
         func alloc_one(): #i8 = {{\n\
           let x = malloc(1);\n\
           return x;\n\
         }};"
    ));
}

#[test]
fn tail_value_consumes_the_reference() {
    decls_should_pass(&format!(
        "{MALLOC_FREE}\
         func alloc_one(): #i8 = {{\n\
           let x = malloc(1);\n\
           x\n\
         }};"
    ));
}

#[test]
fn owned_parameter_must_be_consumed() {
    let rendered = decls_should_fail(&format!(
        "{MALLOC_FREE}\
         func drop_it(p: #i8): unit = {{ }};"
    ));
    assert!(rendered.contains("is never used"), "got: {rendered}");
}

#[test]
fn passing_an_owned_parameter_along_passes() {
    decls_should_pass(&format!(
        "{MALLOC_FREE}\
         func forward(p: #i8): unit = free(p);"
    ));
}

#[test]
fn branch_consumes_in_only_one_arm() {
    let rendered = decls_should_fail(&format!(
        "{MALLOC_FREE}\
         func foo(c: bool): unit = {{\n\
           if (c) {{\n\
             let x = malloc(1);\n\
             free(x);\n\
           }} else {{\n\
             let x = malloc(1);\n\
           }};\n\
         }};"
    ));
    assert!(rendered.contains("not used in both branches"), "got: {rendered}");
}

#[test]
fn both_branches_consume() {
    decls_should_pass(&format!(
        "{MALLOC_FREE}\
         func foo(c: bool, p: #i8): unit = {{\n\
           if (c) {{\n\
             free(p);\n\
           }} else {{\n\
             free(p);\n\
           }};\n\
         }};"
    ));
}

#[test]
fn conditional_consumption_of_outer_reference() {
    let rendered = decls_should_fail(&format!(
        "{MALLOC_FREE}\
         func foo(c: bool, p: #i8): unit = {{\n\
           if (c) {{\n\
             free(p);\n\
           }};\n\
         }};"
    ));
    assert!(rendered.contains("not used in both branches"), "got: {rendered}");
}

//==========================================================================//
// move / restore

const BOX_DECLS: &str = "extern func malloc(size: i64): #i8;\n\
                         extern func free(ptr: #i8): unit;\n\
                         struct Box { val: #i8 }\n";

#[test]
fn move_and_restore() {
    decls_should_pass(&format!(
        "{BOX_DECLS}\
         func swap(b: &Box, fresh: #i8): #i8 = {{\n\
           let old = move b->val;\n\
           b->val = fresh;\n\
           old\n\
         }};"
    ));
}

#[test]
fn moved_value_never_restored() {
    let rendered = decls_should_fail(&format!(
        "{BOX_DECLS}\
         func steal(b: &Box): #i8 = {{\n\
           let old = move b->val;\n\
           old\n\
         }};"
    ));
    assert!(rendered.contains("never replaced"), "got: {rendered}");
}

#[test]
fn moving_a_reference_created_in_scope_fails() {
    let rendered = decls_should_fail(&format!(
        "{MALLOC_FREE}\
         func foo(): unit = {{\n\
           let x = malloc(10);\n\
           let y = move x;\n\
           free(y);\n\
         }};"
    ));
    assert!(rendered.contains("cannot be moved in the same scope"), "got: {rendered}");
}

#[test]
fn restore_in_only_one_branch() {
    let rendered = decls_should_fail(&format!(
        "{BOX_DECLS}\
         func g(c: bool, b: &Box, n: #i8): unit = {{\n\
           free(move b->val);\n\
           if (c) {{\n\
             b->val = n;\n\
           }} else {{\n\
             free(n);\n\
           }};\n\
         }};"
    ));
    assert!(rendered.contains("not replaced by both branches"), "got: {rendered}");
}

#[test]
fn restore_in_both_branches() {
    decls_should_pass(&format!(
        "{BOX_DECLS}\
         func g(c: bool, b: &Box, n1: #i8, n2: #i8): unit = {{\n\
           free(move b->val);\n\
           if (c) {{\n\
             b->val = n1;\n\
             free(n2);\n\
           }} else {{\n\
             b->val = n2;\n\
             free(n1);\n\
           }};\n\
         }};"
    ));
}

//==========================================================================//
// loops

#[test]
fn loop_body_that_balances_is_fine() {
    decls_should_pass(&format!(
        "{MALLOC_FREE}\
         func foo(c: bool): unit = {{\n\
           while (c) {{\n\
             let x = malloc(1);\n\
             free(x);\n\
           }};\n\
         }};"
    ));
}

#[test]
fn loop_body_that_leaks_fails() {
    decls_should_fail(&format!(
        "{MALLOC_FREE}\
         func foo(c: bool): unit = {{\n\
           while (c) {{\n\
             let x = malloc(1);\n\
           }};\n\
         }};"
    ));
}

#[test]
fn loop_that_conditionally_consumes_fails() {
    let rendered = decls_should_fail(&format!(
        "{MALLOC_FREE}\
         func foo(c: bool, p: #i8): unit = {{\n\
           while (c) {{\n\
             free(p);\n\
           }};\n\
         }};"
    ));
    assert!(rendered.contains("not used in both branches"), "got: {rendered}");
}

//==========================================================================//
// structs and aliasing

#[test]
fn constructor_aliases_fields_to_arguments() {
    decls_should_pass(&format!(
        "{BOX_DECLS}\
         func pack(p: #i8): unit = {{\n\
           let b = Box(p);\n\
           free(b.val);\n\
         }};"
    ));
}

#[test]
fn struct_with_owned_field_as_parameter() {
    let rendered = decls_should_fail(&format!(
        "{BOX_DECLS}\
         func consume(b: Box): unit = {{ }};"
    ));
    assert!(rendered.contains("is never used"), "got: {rendered}");
}

/// A struct type that refers to itself does not send the obligation walk
/// into infinite recursion.
#[test]
fn recursive_struct_obligations_terminate() {
    decls_should_pass(
        "struct Node { next: #Node }\n\
         extern func drop_node(n: #Node): unit;\n\
         func f(n: Node): unit = drop_node(n.next);",
    );
}

#[test]
fn skipping_borrow_checking_suppresses_the_errors() {
    let source = format!(
        "{MALLOC_FREE}\
         func foo(): unit = {{\n\
           let x = malloc(10);\n\
         }};"
    );
    assert!(!check_source(&source, false).passed());
    assert!(check_source(&source, true).passed());
}

#[test]
fn index_paths_track_constant_offsets() {
    let rendered = decls_should_fail(&format!(
        "{MALLOC_FREE}\
         func foo(p: &i8, i: i32): unit = {{\n\
           let q = p[i];\n\
         }};"
    ));
    assert!(
        rendered.contains("constant integer indices"),
        "got: {rendered}"
    );
}

#[test]
fn constant_index_is_supported() {
    decls_should_pass(&format!(
        "{MALLOC_FREE}\
         func foo(p: &i8): &i8 = p[3];"
    ));
}
