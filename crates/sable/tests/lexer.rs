use pretty_assertions::assert_eq;
use sable::{TokenKind, lex};

fn kinds(source: &str) -> Vec<TokenKind> {
    let out = lex(source);
    assert!(out.error.is_none(), "unexpected lex error");
    out.tokens.iter().map(|t| t.kind).collect()
}

#[test]
fn keywords_and_idents() {
    use TokenKind::*;
    assert_eq!(
        kinds("func foo(x: i32): unit"),
        vec![KwFunc, Ident, LParen, Ident, Colon, KwI32, RParen, Colon, KwUnit, End]
    );
}

#[test]
fn reference_sigils_and_deref() {
    use TokenKind::*;
    assert_eq!(
        kinds("extern func malloc(size: i64): #i8;"),
        vec![KwExtern, KwFunc, Ident, LParen, Ident, Colon, KwI64, RParen, Colon, Hash, KwI8, Semicolon, End]
    );
    assert_eq!(kinds("p!.name"), vec![Ident, Bang, Dot, Ident, End]);
    assert_eq!(kinds("p[.name]"), vec![Ident, LBracket, Dot, Ident, RBracket, End]);
    assert_eq!(kinds("p->name"), vec![Ident, Arrow, Ident, End]);
}

#[test]
fn two_char_operators_use_maximal_munch() {
    use TokenKind::*;
    assert_eq!(kinds("a != b"), vec![Ident, BangEq, Ident, End]);
    assert_eq!(kinds("a! = b"), vec![Ident, Bang, Equal, Ident, End]);
    assert_eq!(kinds("a <= b >= c == d"), vec![Ident, Le, Ident, Ge, Ident, EqEq, Ident, End]);
    assert_eq!(kinds("a && b || c"), vec![Ident, AmpAmp, Ident, PipePipe, Ident, End]);
    assert_eq!(kinds("A::B::c"), vec![Ident, ColonColon, Ident, ColonColon, Ident, End]);
    assert_eq!(kinds("x: i32, ..."), vec![Ident, Colon, KwI32, Comma, Ellipsis, End]);
}

#[test]
fn numeric_literals() {
    use TokenKind::*;
    assert_eq!(kinds("42 3.14"), vec![IntLit, DecimalLit, End]);
    // A dot not followed by a digit belongs to a projection, not the number.
    assert_eq!(kinds("xs[0].f"), vec![Ident, LBracket, IntLit, RBracket, Dot, Ident, End]);
}

#[test]
fn comments_are_skipped() {
    use TokenKind::*;
    assert_eq!(
        kinds("1 // trailing\n/* block\ncomment */ 2"),
        vec![IntLit, IntLit, End]
    );
}

#[test]
fn locations_track_rows_and_columns() {
    let out = lex("let x = 1;\nlet y = 2;\n");
    assert!(out.error.is_none());
    let y_tok = out
        .tokens
        .iter()
        .find(|t| t.text == "y")
        .expect("token for y");
    assert_eq!(y_tok.loc.row, 2);
    assert_eq!(y_tok.loc.col, 5);
    assert_eq!(y_tok.loc.size, 1);
    // One entry per row, rows starting where the source says.
    assert_eq!(out.index.row_start(1), Some(0));
    assert_eq!(out.index.row_start(2), Some(11));
}

#[test]
fn string_literals_span_their_quotes() {
    let out = lex("\"hello\\n\"");
    assert!(out.error.is_none());
    assert_eq!(out.tokens[0].kind, TokenKind::StringLit);
    assert_eq!(out.tokens[0].text, "\"hello\\n\"");
}

#[test]
fn unterminated_string_is_an_error() {
    let out = lex("\"oops\nmore");
    assert!(out.error.is_some());
    assert!(out.error.unwrap().message().contains("Unterminated string"));
}

#[test]
fn unexpected_character_is_an_error() {
    let out = lex("let x = @;");
    assert!(out.error.is_some());
}
