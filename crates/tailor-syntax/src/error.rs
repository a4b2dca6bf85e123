//! Front-end errors: lexing, parsing, and resolution.
//!
//! Errors are collected rather than aborting at the first problem, so a
//! caller sees every issue in a compilation unit at once.

use std::fmt;

use serde::Serialize;

use crate::span::Span;

/// A lexer error with location information.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub span: Span,
}

impl LexError {
    pub fn new(kind: LexErrorKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// The specific kind of lexer error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LexErrorKind {
    /// An unexpected character was encountered.
    UnexpectedCharacter(char),
    /// A string literal was not closed before end of input.
    UnterminatedString,
    /// A character literal was not closed before end of input.
    UnterminatedChar,
    /// A block comment was not closed before end of input.
    UnterminatedBlockComment,
    /// An invalid escape sequence was encountered.
    InvalidEscapeSequence(char),
    /// A number literal could not be parsed.
    InvalidNumberLiteral(String),
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedCharacter(c) => write!(f, "unexpected character: {c:?}"),
            Self::UnterminatedString => write!(f, "unterminated string literal"),
            Self::UnterminatedChar => write!(f, "unterminated character literal"),
            Self::UnterminatedBlockComment => write!(f, "unterminated block comment"),
            Self::InvalidEscapeSequence(c) => write!(f, "invalid escape sequence: \\{c}"),
            Self::InvalidNumberLiteral(s) => write!(f, "invalid number literal: {s}"),
        }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for LexError {}

/// A parser error with location information.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// The specific kind of parser error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ParseErrorKind {
    /// A token other than the expected one was found.
    UnexpectedToken { found: String, expected: &'static str },
    /// The input ended in the middle of a construct.
    UnexpectedEof,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedToken { found, expected } => {
                write!(f, "expected {expected}, found {found}")
            }
            Self::UnexpectedEof => write!(f, "unexpected end of input"),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for ParseError {}

/// A resolution error with location information.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolveError {
    pub kind: ResolveErrorKind,
    pub span: Span,
}

impl ResolveError {
    pub fn new(kind: ResolveErrorKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// The specific kind of resolution error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ResolveErrorKind {
    /// An identifier that names neither a variable nor a class.
    UnknownIdentifier(String),
    /// A member access with no registered signature.
    UnknownMember { on: String, name: String },
    /// A type name that is not registered.
    UnknownType(String),
    /// Call arguments incompatible with the resolved signature.
    ArgumentMismatch { name: String },
}

impl fmt::Display for ResolveErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownIdentifier(name) => write!(f, "unknown identifier: {name}"),
            Self::UnknownMember { on, name } => write!(f, "unknown member {name} on {on}"),
            Self::UnknownType(name) => write!(f, "unknown type: {name}"),
            Self::ArgumentMismatch { name } => {
                write!(f, "arguments do not match the signature of {name}")
            }
        }
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for ResolveError {}

/// Any front-end error, for callers that run the whole pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SyntaxError {
    Lex(LexError),
    Parse(ParseError),
    Resolve(ResolveError),
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lex(e) => write!(f, "{e}"),
            Self::Parse(e) => write!(f, "{e}"),
            Self::Resolve(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SyntaxError {}

impl From<LexError> for SyntaxError {
    fn from(e: LexError) -> Self {
        SyntaxError::Lex(e)
    }
}

impl From<ParseError> for SyntaxError {
    fn from(e: ParseError) -> Self {
        SyntaxError::Parse(e)
    }
}

impl From<ResolveError> for SyntaxError {
    fn from(e: ResolveError) -> Self {
        SyntaxError::Resolve(e)
    }
}
