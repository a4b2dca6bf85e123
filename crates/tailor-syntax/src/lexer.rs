//! Hand-rolled lexer for the target language.
//!
//! Errors are collected rather than aborting, so a caller sees every
//! problem in one pass. `>` is always lexed as a single token; the
//! language subset has no shift operators, which keeps nested generics
//! like `Map<String, List<String>>` trivial to lex.

use crate::error::{LexError, LexErrorKind};
use crate::span::Span;
use crate::token::{Token, TokenKind};

/// Lex `src` into a token stream terminated by `Eof`.
pub fn lex(src: &str) -> (Vec<Token>, Vec<LexError>) {
    Lexer { src, bytes: src.as_bytes(), pos: 0, tokens: Vec::new(), errors: Vec::new() }.run()
}

struct Lexer<'s> {
    src: &'s str,
    bytes: &'s [u8],
    pos: usize,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
}

impl<'s> Lexer<'s> {
    fn run(mut self) -> (Vec<Token>, Vec<LexError>) {
        loop {
            self.skip_trivia();
            let start = self.pos;
            let Some(c) = self.peek() else {
                self.push(TokenKind::Eof, start);
                break;
            };
            match c {
                c if c.is_ascii_alphabetic() || c == '_' => self.word(start),
                c if c.is_ascii_digit() => self.number(start),
                '"' => self.string(start),
                '\'' => self.char_lit(start),
                _ => self.punct(start),
            }
        }
        (self.tokens, self.errors)
    }

    fn peek(&self) -> Option<char> {
        self.bytes.get(self.pos).map(|&b| b as char)
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.bytes.get(self.pos + offset).map(|&b| b as char)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_ascii_whitespace() => {
                    self.pos += 1;
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    let start = self.pos;
                    self.pos += 2;
                    let mut closed = false;
                    while self.pos < self.bytes.len() {
                        if self.peek() == Some('*') && self.peek_at(1) == Some('/') {
                            self.pos += 2;
                            closed = true;
                            break;
                        }
                        self.pos += 1;
                    }
                    if !closed {
                        self.error(LexErrorKind::UnterminatedBlockComment, start);
                    }
                }
                _ => break,
            }
        }
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        let span = Span::new(start as u32, self.pos as u32);
        self.tokens.push(Token { kind, text: self.src[start..self.pos].to_owned(), span });
    }

    fn error(&mut self, kind: LexErrorKind, start: usize) {
        self.errors.push(LexError::new(kind, Span::new(start as u32, self.pos as u32)));
    }

    fn word(&mut self, start: usize) {
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let kind = TokenKind::keyword(&self.src[start..self.pos]).unwrap_or(TokenKind::Ident);
        self.push(kind, start);
    }

    fn number(&mut self, start: usize) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let mut kind = TokenKind::Int;
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
            kind = TokenKind::Double;
        }
        if matches!(self.peek(), Some('L' | 'l')) {
            if kind == TokenKind::Double {
                self.pos += 1;
                self.error(
                    LexErrorKind::InvalidNumberLiteral(self.src[start..self.pos].to_owned()),
                    start,
                );
            } else {
                self.pos += 1;
                kind = TokenKind::Long;
            }
        }
        self.push(kind, start);
    }

    fn string(&mut self, start: usize) {
        self.pos += 1;
        loop {
            match self.bump() {
                None | Some('\n') => {
                    self.error(LexErrorKind::UnterminatedString, start);
                    break;
                }
                Some('"') => break,
                Some('\\') => self.escape(),
                Some(_) => {}
            }
        }
        self.push(TokenKind::Str, start);
    }

    fn char_lit(&mut self, start: usize) {
        self.pos += 1;
        match self.bump() {
            None | Some('\n') => {
                self.error(LexErrorKind::UnterminatedChar, start);
            }
            Some('\\') => self.escape(),
            Some(_) => {}
        }
        if !self.eat('\'') {
            self.error(LexErrorKind::UnterminatedChar, start);
        }
        self.push(TokenKind::CharLit, start);
    }

    fn escape(&mut self) {
        match self.bump() {
            Some('n' | 't' | 'r' | '0' | '\\' | '\'' | '"') => {}
            Some(c) => self.error(LexErrorKind::InvalidEscapeSequence(c), self.pos - 1),
            None => {}
        }
    }

    fn punct(&mut self, start: usize) {
        let c = self.bump().expect("punct called at end of input");
        let kind = match c {
            '+' => {
                if self.eat('+') {
                    TokenKind::PlusPlus
                } else if self.eat('=') {
                    TokenKind::PlusAssign
                } else {
                    TokenKind::Plus
                }
            }
            '-' => {
                if self.eat('-') {
                    TokenKind::MinusMinus
                } else if self.eat('=') {
                    TokenKind::MinusAssign
                } else {
                    TokenKind::Minus
                }
            }
            '*' => {
                if self.eat('=') {
                    TokenKind::StarAssign
                } else {
                    TokenKind::Star
                }
            }
            '/' => {
                if self.eat('=') {
                    TokenKind::SlashAssign
                } else {
                    TokenKind::Slash
                }
            }
            '%' => {
                if self.eat('=') {
                    TokenKind::PercentAssign
                } else {
                    TokenKind::Percent
                }
            }
            '!' => {
                if self.eat('=') {
                    TokenKind::NotEq
                } else {
                    TokenKind::Bang
                }
            }
            '=' => {
                if self.eat('=') {
                    TokenKind::EqEq
                } else {
                    TokenKind::Assign
                }
            }
            '<' => {
                if self.eat('=') {
                    TokenKind::LtEq
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.eat('=') {
                    TokenKind::GtEq
                } else {
                    TokenKind::Gt
                }
            }
            '&' => {
                if self.eat('&') {
                    TokenKind::AmpAmp
                } else {
                    self.error(LexErrorKind::UnexpectedCharacter('&'), start);
                    return;
                }
            }
            '|' => {
                if self.eat('|') {
                    TokenKind::PipePipe
                } else {
                    self.error(LexErrorKind::UnexpectedCharacter('|'), start);
                    return;
                }
            }
            '?' => TokenKind::Question,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semi,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            other => {
                self.error(LexErrorKind::UnexpectedCharacter(other), start);
                return;
            }
        };
        self.push(kind, start);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let (tokens, errors) = lex(src);
        assert!(errors.is_empty(), "unexpected lex errors: {errors:?}");
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_operators_and_calls() {
        assert_eq!(
            kinds("a.b(x + 2L, \"s\");"),
            vec![
                TokenKind::Ident,
                TokenKind::Dot,
                TokenKind::Ident,
                TokenKind::LParen,
                TokenKind::Ident,
                TokenKind::Plus,
                TokenKind::Long,
                TokenKind::Comma,
                TokenKind::Str,
                TokenKind::RParen,
                TokenKind::Semi,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn keywords_and_generics() {
        assert_eq!(
            kinds("List<String> xs = new ArrayList<String>();"),
            vec![
                TokenKind::Ident,
                TokenKind::Lt,
                TokenKind::Ident,
                TokenKind::Gt,
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::KwNew,
                TokenKind::Ident,
                TokenKind::Lt,
                TokenKind::Ident,
                TokenKind::Gt,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::Semi,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comments_are_trivia() {
        assert_eq!(
            kinds("x // line\n + /* block */ y"),
            vec![TokenKind::Ident, TokenKind::Plus, TokenKind::Ident, TokenKind::Eof]
        );
    }

    #[test]
    fn unterminated_string_is_reported() {
        let (_, errors) = lex("\"abc");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, LexErrorKind::UnterminatedString);
    }
}
