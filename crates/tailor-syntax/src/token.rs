//! Token kinds produced by the lexer.

use std::fmt;

use serde::Serialize;

use crate::span::Span;

/// The kind of a lexed token.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    // Literals and names
    Ident,
    Int,
    Long,
    Double,
    Str,
    CharLit,

    // Keywords
    KwBoolean,
    KwBreak,
    KwByte,
    KwCatch,
    KwChar,
    KwContinue,
    KwDo,
    KwDouble,
    KwElse,
    KwFalse,
    KwFinally,
    KwFloat,
    KwFor,
    KwIf,
    KwInstanceof,
    KwInt,
    KwLong,
    KwNew,
    KwNull,
    KwReturn,
    KwShort,
    KwThrow,
    KwTrue,
    KwTry,
    KwVoid,
    KwWhile,

    // Punctuation
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    EqEq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    AmpAmp,
    PipePipe,
    PlusPlus,
    MinusMinus,
    Question,
    Colon,
    Semi,
    Comma,
    Dot,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    Eof,
}

impl TokenKind {
    /// The keyword kind for an identifier-shaped word, if it is reserved.
    pub fn keyword(word: &str) -> Option<TokenKind> {
        Some(match word {
            "boolean" => TokenKind::KwBoolean,
            "break" => TokenKind::KwBreak,
            "byte" => TokenKind::KwByte,
            "catch" => TokenKind::KwCatch,
            "char" => TokenKind::KwChar,
            "continue" => TokenKind::KwContinue,
            "do" => TokenKind::KwDo,
            "double" => TokenKind::KwDouble,
            "else" => TokenKind::KwElse,
            "false" => TokenKind::KwFalse,
            "finally" => TokenKind::KwFinally,
            "float" => TokenKind::KwFloat,
            "for" => TokenKind::KwFor,
            "if" => TokenKind::KwIf,
            "instanceof" => TokenKind::KwInstanceof,
            "int" => TokenKind::KwInt,
            "long" => TokenKind::KwLong,
            "new" => TokenKind::KwNew,
            "null" => TokenKind::KwNull,
            "return" => TokenKind::KwReturn,
            "short" => TokenKind::KwShort,
            "throw" => TokenKind::KwThrow,
            "true" => TokenKind::KwTrue,
            "try" => TokenKind::KwTry,
            "void" => TokenKind::KwVoid,
            "while" => TokenKind::KwWhile,
            _ => return None,
        })
    }

    /// Whether this is a primitive type keyword.
    pub fn is_primitive(self) -> bool {
        matches!(
            self,
            TokenKind::KwBoolean
                | TokenKind::KwByte
                | TokenKind::KwChar
                | TokenKind::KwDouble
                | TokenKind::KwFloat
                | TokenKind::KwInt
                | TokenKind::KwLong
                | TokenKind::KwShort
                | TokenKind::KwVoid
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A lexed token: kind, source text, and span.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}
