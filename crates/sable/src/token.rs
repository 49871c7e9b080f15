//! Tokens produced by the lexer.

use strum::IntoStaticStr;

use crate::location::Location;

/// Every unit of meaning the lexer can produce. The `strum` serialization is
/// the token's spelling (or a description for the open-ended kinds), used by
/// parser error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
pub enum TokenKind {
    #[strum(serialize = "an identifier")]
    Ident,
    #[strum(serialize = "an integer literal")]
    IntLit,
    #[strum(serialize = "a decimal literal")]
    DecimalLit,
    #[strum(serialize = "a string literal")]
    StringLit,

    #[strum(serialize = "bool")]
    KwBool,
    #[strum(serialize = "borrow")]
    KwBorrow,
    #[strum(serialize = "else")]
    KwElse,
    #[strum(serialize = "extern")]
    KwExtern,
    #[strum(serialize = "f32")]
    KwF32,
    #[strum(serialize = "f64")]
    KwF64,
    #[strum(serialize = "false")]
    KwFalse,
    #[strum(serialize = "func")]
    KwFunc,
    #[strum(serialize = "i8")]
    KwI8,
    #[strum(serialize = "i16")]
    KwI16,
    #[strum(serialize = "i32")]
    KwI32,
    #[strum(serialize = "i64")]
    KwI64,
    #[strum(serialize = "if")]
    KwIf,
    #[strum(serialize = "let")]
    KwLet,
    #[strum(serialize = "module")]
    KwModule,
    #[strum(serialize = "move")]
    KwMove,
    #[strum(serialize = "return")]
    KwReturn,
    #[strum(serialize = "struct")]
    KwStruct,
    #[strum(serialize = "true")]
    KwTrue,
    #[strum(serialize = "unit")]
    KwUnit,
    #[strum(serialize = "while")]
    KwWhile,

    #[strum(serialize = "+")]
    Plus,
    #[strum(serialize = "-")]
    Minus,
    #[strum(serialize = "*")]
    Star,
    #[strum(serialize = "/")]
    Slash,
    #[strum(serialize = "%")]
    Percent,
    #[strum(serialize = "==")]
    EqEq,
    #[strum(serialize = "!=")]
    BangEq,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Ge,
    #[strum(serialize = "&&")]
    AmpAmp,
    #[strum(serialize = "||")]
    PipePipe,
    #[strum(serialize = "!")]
    Bang,
    #[strum(serialize = "&")]
    Amp,
    #[strum(serialize = "#")]
    Hash,
    #[strum(serialize = "->")]
    Arrow,

    #[strum(serialize = "(")]
    LParen,
    #[strum(serialize = ")")]
    RParen,
    #[strum(serialize = "{")]
    LBrace,
    #[strum(serialize = "}")]
    RBrace,
    #[strum(serialize = "[")]
    LBracket,
    #[strum(serialize = "]")]
    RBracket,
    #[strum(serialize = ".")]
    Dot,
    #[strum(serialize = ",")]
    Comma,
    #[strum(serialize = ":")]
    Colon,
    #[strum(serialize = "::")]
    ColonColon,
    #[strum(serialize = ";")]
    Semicolon,
    #[strum(serialize = "=")]
    Equal,
    #[strum(serialize = "...")]
    Ellipsis,

    #[strum(serialize = "the end of the file")]
    End,
}

impl TokenKind {
    /// The spelling (or description) used in parser error messages.
    #[must_use]
    pub fn describe(self) -> &'static str {
        self.into()
    }
}

/// A token: its kind, the source text it covers, its location, and its
/// byte offset into the source (used to compute multi-token spans).
#[derive(Debug, Clone, Copy)]
pub struct Token<'s> {
    pub kind: TokenKind,
    pub text: &'s str,
    pub loc: Location,
    pub offset: u32,
}

impl Token<'_> {
    /// Byte offset one past the end of this token.
    #[must_use]
    pub fn end_offset(&self) -> u32 {
        self.offset + self.loc.size
    }
}
