//! Recursive-descent parser with Pratt expression parsing.
//!
//! Expressions use binding-power tables; statements are plain recursion.
//! Variable declarations are disambiguated from expression statements by
//! speculative parsing: attempt a type followed by a name, roll the
//! position (and any speculative errors) back on failure.
//!
//! Casts are supported for primitive types only -- `(int) x` is
//! unambiguous at the `(` because a primitive keyword can start nothing
//! else. Class-type casts must be built programmatically.

use tailor_types::{Prim, Ty};

use crate::ast::{
    BinaryOp, Block, Catch, Expr, ExprKind, Ident, Lit, LocalId, Resolution, Stmt, StmtKind,
    TyRef, TySyntax, UnaryOp, VarDecl,
};
use crate::error::{ParseError, ParseErrorKind, SyntaxError};
use crate::lexer;
use crate::span::Span;
use crate::token::{Token, TokenKind};

/// Parse a statement sequence (the contents of a method body).
pub fn parse_stmts(src: &str) -> Result<Vec<Stmt>, Vec<SyntaxError>> {
    let (tokens, lex_errors) = lexer::lex(src);
    if !lex_errors.is_empty() {
        return Err(lex_errors.into_iter().map(SyntaxError::Lex).collect());
    }
    let mut parser = Parser { src, tokens, pos: 0, errors: Vec::new() };
    let stmts = parser.stmt_list(TokenKind::Eof);
    if parser.errors.is_empty() {
        Ok(stmts)
    } else {
        Err(parser.errors.into_iter().map(SyntaxError::Parse).collect())
    }
}

/// Parse a single expression (the whole input must be one expression).
pub fn parse_expr(src: &str) -> Result<Expr, Vec<SyntaxError>> {
    let (tokens, lex_errors) = lexer::lex(src);
    if !lex_errors.is_empty() {
        return Err(lex_errors.into_iter().map(SyntaxError::Lex).collect());
    }
    let mut parser = Parser { src, tokens, pos: 0, errors: Vec::new() };
    let expr = parser.expr();
    if !parser.at(TokenKind::Eof) {
        parser.error_here("end of input");
    }
    match (expr, parser.errors.is_empty()) {
        (Some(e), true) => Ok(e),
        _ => Err(parser.errors.into_iter().map(SyntaxError::Parse).collect()),
    }
}

// ── Binding power tables ───────────────────────────────────────────────

/// Returns (left_bp, right_bp) for infix operators.
///
/// Left < right means left-associative; left > right right-associative.
fn infix_binding_power(op: TokenKind) -> Option<(u8, u8)> {
    match op {
        // Assignment (simple and compound): right-associative
        TokenKind::Assign
        | TokenKind::PlusAssign
        | TokenKind::MinusAssign
        | TokenKind::StarAssign
        | TokenKind::SlashAssign
        | TokenKind::PercentAssign => Some((2, 1)),

        // Logical OR / AND: left-associative
        TokenKind::PipePipe => Some((5, 6)),
        TokenKind::AmpAmp => Some((7, 8)),

        // Equality
        TokenKind::EqEq | TokenKind::NotEq => Some((9, 10)),

        // Comparison
        TokenKind::Lt | TokenKind::Gt | TokenKind::LtEq | TokenKind::GtEq => Some((11, 12)),

        // Additive
        TokenKind::Plus | TokenKind::Minus => Some((17, 18)),

        // Multiplicative
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Some((19, 20)),

        _ => None,
    }
}

/// Binding power of prefix operators.
const PREFIX_BP: u8 = 23;

/// Postfix operations (call, select, index, `++`/`--`) bind tighter than
/// every prefix and infix operator.
const POSTFIX_BP: u8 = 25;

/// Left binding power of the conditional `? :`; its arms restart at 3,
/// making it right-associative.
const COND_BP: u8 = 4;

struct Parser<'s> {
    src: &'s str,
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<ParseError>,
}

impl<'s> Parser<'s> {
    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn kind(&self) -> TokenKind {
        self.current().kind
    }

    fn nth_kind(&self, n: usize) -> TokenKind {
        self.tokens.get(self.pos + n).map_or(TokenKind::Eof, |t| t.kind)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    fn bump(&mut self) -> Token {
        let tok = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &'static str) -> bool {
        if self.eat(kind) {
            true
        } else {
            self.error_here(what);
            false
        }
    }

    fn error_here(&mut self, expected: &'static str) {
        let tok = self.current();
        let kind = if tok.kind == TokenKind::Eof {
            ParseErrorKind::UnexpectedEof
        } else {
            ParseErrorKind::UnexpectedToken { found: tok.text.clone(), expected }
        };
        self.errors.push(ParseError::new(kind, tok.span));
    }

    fn span_from(&self, start: Span) -> Span {
        let prev = &self.tokens[self.pos.saturating_sub(1).min(self.tokens.len() - 1)];
        start.join(prev.span)
    }

    // ── Statements ─────────────────────────────────────────────────────

    fn stmt_list(&mut self, terminator: TokenKind) -> Vec<Stmt> {
        let mut stmts = Vec::new();
        while !self.at(terminator) && !self.at(TokenKind::Eof) {
            let before = self.pos;
            if let Some(stmt) = self.stmt() {
                stmts.push(stmt);
            }
            if self.pos == before {
                // Error recovery: make progress past the offending token.
                self.bump();
            }
        }
        stmts
    }

    fn stmt(&mut self) -> Option<Stmt> {
        let start = self.current().span;
        match self.kind() {
            TokenKind::LBrace => {
                let block = self.block()?;
                let span = block.span;
                Some(Stmt::new(StmtKind::Block(block), span))
            }
            TokenKind::KwIf => {
                self.bump();
                self.expect(TokenKind::LParen, "`(`");
                let cond = self.expr()?;
                self.expect(TokenKind::RParen, "`)`");
                let then_stmt = Box::new(self.stmt()?);
                let else_stmt = if self.eat(TokenKind::KwElse) {
                    Some(Box::new(self.stmt()?))
                } else {
                    None
                };
                Some(Stmt::new(StmtKind::If { cond, then_stmt, else_stmt }, self.span_from(start)))
            }
            TokenKind::KwWhile => {
                self.bump();
                self.expect(TokenKind::LParen, "`(`");
                let cond = self.expr()?;
                self.expect(TokenKind::RParen, "`)`");
                let body = Box::new(self.stmt()?);
                Some(Stmt::new(StmtKind::While { cond, body }, self.span_from(start)))
            }
            TokenKind::KwDo => {
                self.bump();
                let body = Box::new(self.stmt()?);
                self.expect(TokenKind::KwWhile, "`while`");
                self.expect(TokenKind::LParen, "`(`");
                let cond = self.expr()?;
                self.expect(TokenKind::RParen, "`)`");
                self.expect(TokenKind::Semi, "`;`");
                Some(Stmt::new(StmtKind::DoWhile { body, cond }, self.span_from(start)))
            }
            TokenKind::KwFor => {
                self.bump();
                self.expect(TokenKind::LParen, "`(`");
                let init = if self.eat(TokenKind::Semi) {
                    Vec::new()
                } else if let Some(decl) = self.try_var_decl() {
                    vec![decl]
                } else {
                    let exprs = self.expr_list()?;
                    self.expect(TokenKind::Semi, "`;`");
                    exprs
                        .into_iter()
                        .map(|e| {
                            let span = e.span;
                            Stmt::new(StmtKind::Expr(e), span)
                        })
                        .collect()
                };
                let cond = if self.at(TokenKind::Semi) { None } else { Some(self.expr()?) };
                self.expect(TokenKind::Semi, "`;`");
                let update = if self.at(TokenKind::RParen) {
                    Vec::new()
                } else {
                    self.expr_list()?
                };
                self.expect(TokenKind::RParen, "`)`");
                let body = Box::new(self.stmt()?);
                Some(Stmt::new(StmtKind::For { init, cond, update, body }, self.span_from(start)))
            }
            TokenKind::KwTry => {
                self.bump();
                let body = self.block()?;
                let mut catches = Vec::new();
                while self.at(TokenKind::KwCatch) {
                    self.bump();
                    self.expect(TokenKind::LParen, "`(`");
                    let ty = self.type_ref()?;
                    let name_tok = self.bump();
                    if name_tok.kind != TokenKind::Ident {
                        self.error_here("a parameter name");
                        return None;
                    }
                    self.expect(TokenKind::RParen, "`)`");
                    let block = self.block()?;
                    catches.push(Catch {
                        param: VarDecl {
                            name: name_tok.text,
                            sym: LocalId(0),
                            ty,
                            init: None,
                        },
                        body: block,
                    });
                }
                let finally =
                    if self.eat(TokenKind::KwFinally) { Some(self.block()?) } else { None };
                Some(Stmt::new(
                    StmtKind::Try { body, catches, finally },
                    self.span_from(start),
                ))
            }
            TokenKind::KwReturn => {
                self.bump();
                let value = if self.at(TokenKind::Semi) { None } else { Some(self.expr()?) };
                self.expect(TokenKind::Semi, "`;`");
                Some(Stmt::new(StmtKind::Return(value), self.span_from(start)))
            }
            TokenKind::KwThrow => {
                self.bump();
                let value = self.expr()?;
                self.expect(TokenKind::Semi, "`;`");
                Some(Stmt::new(StmtKind::Throw(value), self.span_from(start)))
            }
            TokenKind::KwBreak => {
                self.bump();
                let label = self.at(TokenKind::Ident).then(|| self.bump().text);
                self.expect(TokenKind::Semi, "`;`");
                Some(Stmt::new(StmtKind::Break { label }, self.span_from(start)))
            }
            TokenKind::KwContinue => {
                self.bump();
                let label = self.at(TokenKind::Ident).then(|| self.bump().text);
                self.expect(TokenKind::Semi, "`;`");
                Some(Stmt::new(StmtKind::Continue { label }, self.span_from(start)))
            }
            TokenKind::Ident if self.nth_kind(1) == TokenKind::Colon => {
                let label = self.bump().text;
                self.bump();
                let stmt = Box::new(self.stmt()?);
                Some(Stmt::new(StmtKind::Labeled { label, stmt }, self.span_from(start)))
            }
            _ => {
                if let Some(decl) = self.try_var_decl() {
                    return Some(decl);
                }
                let expr = self.expr()?;
                self.expect(TokenKind::Semi, "`;`");
                Some(Stmt::new(StmtKind::Expr(expr), self.span_from(start)))
            }
        }
    }

    fn block(&mut self) -> Option<Block> {
        let start = self.current().span;
        if !self.expect(TokenKind::LBrace, "`{`") {
            return None;
        }
        let stmts = self.stmt_list(TokenKind::RBrace);
        self.expect(TokenKind::RBrace, "`}`");
        Some(Block { stmts, span: self.span_from(start) })
    }

    /// Speculatively parse `Type name [= init] ;`. Rolls back the token
    /// position and any errors recorded during speculation on failure.
    fn try_var_decl(&mut self) -> Option<Stmt> {
        let save_pos = self.pos;
        let save_errors = self.errors.len();
        let start = self.current().span;
        let speculation = (|| {
            let ty = self.type_ref()?;
            if !self.at(TokenKind::Ident) {
                return None;
            }
            let name = self.bump().text;
            if !(self.at(TokenKind::Assign) || self.at(TokenKind::Semi)) {
                return None;
            }
            Some((ty, name))
        })();
        let Some((ty, name)) = speculation else {
            self.pos = save_pos;
            self.errors.truncate(save_errors);
            return None;
        };
        let init = if self.eat(TokenKind::Assign) { Some(self.expr()?) } else { None };
        self.expect(TokenKind::Semi, "`;`");
        Some(Stmt::new(
            StmtKind::VarDecl(VarDecl { name, sym: LocalId(0), ty, init }),
            self.span_from(start),
        ))
    }

    // ── Types ──────────────────────────────────────────────────────────

    fn type_ref(&mut self) -> Option<TyRef> {
        let start = self.current().span;
        let syntax = self.type_syntax()?;
        let span = self.span_from(start);
        Some(TyRef {
            ty: Ty::Error,
            written: self.src[span.start as usize..span.end as usize].to_owned(),
            syntax: Some(syntax),
            span,
        })
    }

    fn type_syntax(&mut self) -> Option<TySyntax> {
        if let Some(prim) = self.primitive() {
            self.bump();
            let array_dims = self.array_dims();
            return Some(TySyntax { prim: Some(prim), name: String::new(), args: Vec::new(), array_dims });
        }
        if !self.at(TokenKind::Ident) {
            self.error_here("a type");
            return None;
        }
        let mut name = self.bump().text;
        while self.at(TokenKind::Dot) && self.nth_kind(1) == TokenKind::Ident {
            self.bump();
            name.push('.');
            name.push_str(&self.bump().text);
        }
        let mut args = Vec::new();
        if self.eat(TokenKind::Lt) {
            loop {
                args.push(self.type_syntax()?);
                if self.eat(TokenKind::Comma) {
                    continue;
                }
                if !self.expect(TokenKind::Gt, "`>`") {
                    return None;
                }
                break;
            }
        }
        let array_dims = self.array_dims();
        Some(TySyntax { prim: None, name, args, array_dims })
    }

    fn array_dims(&mut self) -> u32 {
        let mut dims = 0;
        while self.at(TokenKind::LBracket) && self.nth_kind(1) == TokenKind::RBracket {
            self.bump();
            self.bump();
            dims += 1;
        }
        dims
    }

    fn primitive(&self) -> Option<Prim> {
        Some(match self.kind() {
            TokenKind::KwBoolean => Prim::Boolean,
            TokenKind::KwByte => Prim::Byte,
            TokenKind::KwChar => Prim::Char,
            TokenKind::KwDouble => Prim::Double,
            TokenKind::KwFloat => Prim::Float,
            TokenKind::KwInt => Prim::Int,
            TokenKind::KwLong => Prim::Long,
            TokenKind::KwShort => Prim::Short,
            TokenKind::KwVoid => Prim::Void,
            _ => return None,
        })
    }

    // ── Expressions ────────────────────────────────────────────────────

    fn expr(&mut self) -> Option<Expr> {
        self.expr_bp(0)
    }

    fn expr_list(&mut self) -> Option<Vec<Expr>> {
        let mut exprs = vec![self.expr()?];
        while self.eat(TokenKind::Comma) {
            exprs.push(self.expr()?);
        }
        Some(exprs)
    }

    fn expr_bp(&mut self, min_bp: u8) -> Option<Expr> {
        let mut lhs = self.lhs()?;
        loop {
            let kind = self.kind();

            // ── Postfix: call, select, index, increment ──
            if POSTFIX_BP >= min_bp {
                match kind {
                    TokenKind::Dot => {
                        self.bump();
                        let name_tok = self.bump();
                        if name_tok.kind != TokenKind::Ident {
                            self.error_here("a member name");
                            return None;
                        }
                        let span = lhs.span.join(name_tok.span);
                        lhs = Expr::new(
                            ExprKind::Select { base: Box::new(lhs), name: name_tok.text },
                            span,
                        );
                        continue;
                    }
                    TokenKind::LParen => {
                        self.bump();
                        let args = if self.at(TokenKind::RParen) {
                            Vec::new()
                        } else {
                            self.expr_list()?
                        };
                        self.expect(TokenKind::RParen, "`)`");
                        let span = self.span_from(lhs.span);
                        lhs = Expr::new(ExprKind::Call { callee: Box::new(lhs), args }, span);
                        continue;
                    }
                    TokenKind::LBracket => {
                        self.bump();
                        let index = self.expr()?;
                        self.expect(TokenKind::RBracket, "`]`");
                        let span = self.span_from(lhs.span);
                        lhs = Expr::new(
                            ExprKind::ArrayAccess { array: Box::new(lhs), index: Box::new(index) },
                            span,
                        );
                        continue;
                    }
                    TokenKind::PlusPlus | TokenKind::MinusMinus => {
                        let op = if kind == TokenKind::PlusPlus {
                            UnaryOp::PostInc
                        } else {
                            UnaryOp::PostDec
                        };
                        let tok = self.bump();
                        let span = lhs.span.join(tok.span);
                        lhs = Expr::new(ExprKind::Unary { op, operand: Box::new(lhs) }, span);
                        continue;
                    }
                    _ => {}
                }
            }

            // ── instanceof ──
            if kind == TokenKind::KwInstanceof && 11 >= min_bp {
                self.bump();
                let ty = self.type_ref()?;
                let span = self.span_from(lhs.span);
                lhs = Expr::new(ExprKind::InstanceOf { expr: Box::new(lhs), ty }, span);
                continue;
            }

            // ── Conditional ──
            if kind == TokenKind::Question && COND_BP >= min_bp {
                self.bump();
                let then_expr = self.expr_bp(0)?;
                self.expect(TokenKind::Colon, "`:`");
                let else_expr = self.expr_bp(COND_BP - 1)?;
                let span = self.span_from(lhs.span);
                lhs = Expr::new(
                    ExprKind::Conditional {
                        cond: Box::new(lhs),
                        then_expr: Box::new(then_expr),
                        else_expr: Box::new(else_expr),
                    },
                    span,
                );
                continue;
            }

            // ── Infix operators ──
            let Some((l_bp, r_bp)) = infix_binding_power(kind) else {
                break;
            };
            if l_bp < min_bp {
                break;
            }
            self.bump();
            let rhs = self.expr_bp(r_bp)?;
            let span = lhs.span.join(rhs.span);
            lhs = match kind {
                TokenKind::Assign => {
                    Expr::new(ExprKind::Assign { lhs: Box::new(lhs), rhs: Box::new(rhs) }, span)
                }
                TokenKind::PlusAssign
                | TokenKind::MinusAssign
                | TokenKind::StarAssign
                | TokenKind::SlashAssign
                | TokenKind::PercentAssign => {
                    let op = match kind {
                        TokenKind::PlusAssign => BinaryOp::Add,
                        TokenKind::MinusAssign => BinaryOp::Sub,
                        TokenKind::StarAssign => BinaryOp::Mul,
                        TokenKind::SlashAssign => BinaryOp::Div,
                        _ => BinaryOp::Rem,
                    };
                    Expr::new(
                        ExprKind::CompoundAssign { op, lhs: Box::new(lhs), rhs: Box::new(rhs) },
                        span,
                    )
                }
                _ => {
                    let op = match kind {
                        TokenKind::PipePipe => BinaryOp::Or,
                        TokenKind::AmpAmp => BinaryOp::And,
                        TokenKind::EqEq => BinaryOp::Eq,
                        TokenKind::NotEq => BinaryOp::Ne,
                        TokenKind::Lt => BinaryOp::Lt,
                        TokenKind::Gt => BinaryOp::Gt,
                        TokenKind::LtEq => BinaryOp::Le,
                        TokenKind::GtEq => BinaryOp::Ge,
                        TokenKind::Plus => BinaryOp::Add,
                        TokenKind::Minus => BinaryOp::Sub,
                        TokenKind::Star => BinaryOp::Mul,
                        TokenKind::Slash => BinaryOp::Div,
                        _ => BinaryOp::Rem,
                    };
                    Expr::new(
                        ExprKind::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) },
                        span,
                    )
                }
            };
        }
        Some(lhs)
    }

    fn lhs(&mut self) -> Option<Expr> {
        let start = self.current().span;
        match self.kind() {
            TokenKind::Int => {
                let tok = self.bump();
                let value = tok.text.parse::<i64>().unwrap_or_default();
                Some(Expr::new(ExprKind::Lit(Lit::Int(value)), tok.span))
            }
            TokenKind::Long => {
                let tok = self.bump();
                let digits = tok.text.trim_end_matches(['L', 'l']);
                let value = digits.parse::<i64>().unwrap_or_default();
                Some(Expr::new(ExprKind::Lit(Lit::Long(value)), tok.span))
            }
            TokenKind::Double => {
                let tok = self.bump();
                let value = tok.text.parse::<f64>().unwrap_or_default();
                Some(Expr::new(ExprKind::Lit(Lit::Double(value)), tok.span))
            }
            TokenKind::Str => {
                let tok = self.bump();
                let inner = tok.text.trim_start_matches('"').trim_end_matches('"');
                Some(Expr::new(ExprKind::Lit(Lit::Str(unescape(inner))), tok.span))
            }
            TokenKind::CharLit => {
                let tok = self.bump();
                let inner = tok.text.trim_start_matches('\'').trim_end_matches('\'');
                let value = unescape(inner).chars().next().unwrap_or('\0');
                Some(Expr::new(ExprKind::Lit(Lit::Char(value)), tok.span))
            }
            TokenKind::KwTrue | TokenKind::KwFalse => {
                let tok = self.bump();
                Some(Expr::new(ExprKind::Lit(Lit::Bool(tok.kind == TokenKind::KwTrue)), tok.span))
            }
            TokenKind::KwNull => {
                let tok = self.bump();
                Some(Expr::new(ExprKind::Lit(Lit::Null), tok.span))
            }
            TokenKind::Ident => {
                let tok = self.bump();
                Some(Expr::new(
                    ExprKind::Ident(Ident { name: tok.text, res: Resolution::Unresolved }),
                    tok.span,
                ))
            }
            TokenKind::LParen => {
                // Primitive cast: `(int) x`.
                if self.nth_kind(1).is_primitive() && self.nth_kind(2) == TokenKind::RParen {
                    self.bump();
                    let ty = self.type_ref()?;
                    self.expect(TokenKind::RParen, "`)`");
                    let operand = self.expr_bp(PREFIX_BP)?;
                    let span = self.span_from(start);
                    return Some(Expr::new(
                        ExprKind::Cast { ty, expr: Box::new(operand) },
                        span,
                    ));
                }
                self.bump();
                let inner = self.expr()?;
                self.expect(TokenKind::RParen, "`)`");
                let span = self.span_from(start);
                Some(Expr::new(ExprKind::Paren(Box::new(inner)), span))
            }
            TokenKind::Bang | TokenKind::Minus | TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let op = match self.kind() {
                    TokenKind::Bang => UnaryOp::Not,
                    TokenKind::Minus => UnaryOp::Neg,
                    TokenKind::PlusPlus => UnaryOp::PreInc,
                    _ => UnaryOp::PreDec,
                };
                self.bump();
                let operand = self.expr_bp(PREFIX_BP)?;
                let span = self.span_from(start);
                Some(Expr::new(ExprKind::Unary { op, operand: Box::new(operand) }, span))
            }
            TokenKind::KwNew => self.new_expr(start),
            _ => {
                self.error_here("an expression");
                None
            }
        }
    }

    fn new_expr(&mut self, start: Span) -> Option<Expr> {
        self.bump();
        let ty = self.type_ref()?;
        if self.at(TokenKind::LBracket) {
            self.bump();
            if self.eat(TokenKind::RBracket) {
                // `new T[] { ... }`
                self.expect(TokenKind::LBrace, "`{`");
                let init = if self.at(TokenKind::RBrace) {
                    Vec::new()
                } else {
                    self.expr_list()?
                };
                self.expect(TokenKind::RBrace, "`}`");
                let span = self.span_from(start);
                return Some(Expr::new(
                    ExprKind::NewArray { elem: ty, dims: Vec::new(), init: Some(init) },
                    span,
                ));
            }
            let dim = self.expr()?;
            self.expect(TokenKind::RBracket, "`]`");
            let span = self.span_from(start);
            return Some(Expr::new(
                ExprKind::NewArray { elem: ty, dims: vec![dim], init: None },
                span,
            ));
        }
        self.expect(TokenKind::LParen, "`(`");
        let args = if self.at(TokenKind::RParen) {
            Vec::new()
        } else {
            self.expr_list()?
        };
        self.expect(TokenKind::RParen, "`)`");
        let span = self.span_from(start);
        Some(Expr::new(ExprKind::NewClass { class: ty, args }, span))
    }
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_stmt(src: &str) -> Stmt {
        let mut stmts = parse_stmts(src).expect("parse failure");
        assert_eq!(stmts.len(), 1, "expected one statement in {src:?}");
        stmts.remove(0)
    }

    #[test]
    fn precedence_groups_multiplication_tighter() {
        let expr = parse_expr("a + b * c").unwrap();
        let ExprKind::Binary { op: BinaryOp::Add, rhs, .. } = &expr.kind else {
            panic!("expected +, got {expr:?}");
        };
        assert!(matches!(rhs.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn postfix_chains() {
        let expr = parse_expr("md.digest(str.getBytes())").unwrap();
        let ExprKind::Call { callee, args } = &expr.kind else {
            panic!("expected call");
        };
        assert!(matches!(callee.kind, ExprKind::Select { .. }));
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn conditional_is_right_associative() {
        let expr = parse_expr("a ? b : c ? d : e").unwrap();
        let ExprKind::Conditional { else_expr, .. } = &expr.kind else {
            panic!("expected conditional");
        };
        assert!(matches!(else_expr.kind, ExprKind::Conditional { .. }));
    }

    #[test]
    fn var_decl_with_generics() {
        let stmt = one_stmt("List<String> sorted = new ArrayList<String>(foo);");
        let StmtKind::VarDecl(decl) = &stmt.kind else {
            panic!("expected var decl, got {stmt:?}");
        };
        assert_eq!(decl.name, "sorted");
        assert_eq!(decl.ty.written, "List<String>");
        assert!(matches!(
            decl.init.as_ref().unwrap().kind,
            ExprKind::NewClass { .. }
        ));
    }

    #[test]
    fn comparison_is_not_mistaken_for_a_declaration() {
        let stmt = one_stmt("a < b;");
        assert!(matches!(
            stmt.kind,
            StmtKind::Expr(Expr { kind: ExprKind::Binary { op: BinaryOp::Lt, .. }, .. })
        ));
    }

    #[test]
    fn new_array_with_initializer() {
        let stmt = one_stmt("String[] array1 = new String[] {\"foo\"};");
        let StmtKind::VarDecl(decl) = &stmt.kind else {
            panic!("expected var decl");
        };
        assert_eq!(decl.ty.written, "String[]");
        let ExprKind::NewArray { init, .. } = &decl.init.as_ref().unwrap().kind else {
            panic!("expected new array");
        };
        assert_eq!(init.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn if_else_blocks() {
        let stmt = one_stmt("if (x > 0) { return 1; } else { return 2; }");
        let StmtKind::If { else_stmt, .. } = &stmt.kind else {
            panic!("expected if");
        };
        assert!(else_stmt.is_some());
    }

    #[test]
    fn spans_cover_source_text() {
        let src = "foo(bar + 1);";
        let stmt = one_stmt(src);
        assert_eq!(stmt.span, Span::new(0, src.len() as u32));
        let StmtKind::Expr(call) = &stmt.kind else {
            panic!("expected expression statement");
        };
        assert_eq!(
            &src[call.span.start as usize..call.span.end as usize],
            "foo(bar + 1)"
        );
    }
}
