//! Typed AST for the target language.
//!
//! The rewriting engine matches against these owned trees. Every
//! expression carries its resolved type and span; identifiers carry a
//! `Resolution` recording what they refer to. The engine never mutates a
//! target tree -- replacement trees are built fresh by the inliner.

use serde::Serialize;
use tailor_types::{Prim, Ty};

use crate::span::Span;

/// Identity of a local variable within one compilation unit.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct LocalId(pub u32);

/// A literal value.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Lit {
    Bool(bool),
    Char(char),
    Int(i64),
    Long(i64),
    Double(f64),
    Str(String),
    Null,
}

impl Lit {
    /// The type of this literal.
    pub fn ty(&self) -> Ty {
        match self {
            Lit::Bool(_) => Ty::boolean(),
            Lit::Char(_) => Ty::char_(),
            Lit::Int(_) => Ty::int(),
            Lit::Long(_) => Ty::long(),
            Lit::Double(_) => Ty::double(),
            Lit::Str(_) => Ty::string(),
            Lit::Null => Ty::Null,
        }
    }
}

/// A prefix or postfix unary operator.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum UnaryOp {
    Not,
    Neg,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
            UnaryOp::PreInc | UnaryOp::PostInc => "++",
            UnaryOp::PreDec | UnaryOp::PostDec => "--",
        }
    }

    pub fn is_prefix(self) -> bool {
        !matches!(self, UnaryOp::PostInc | UnaryOp::PostDec)
    }

    /// Whether the operator writes to its operand.
    pub fn is_mutating(self) -> bool {
        matches!(self, UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec)
    }
}

/// A binary operator.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    /// The direct logical negation of a comparison operator, if any.
    /// `&&`/`||` are not in this table; they negate by De Morgan.
    pub fn negation(self) -> Option<BinaryOp> {
        match self {
            BinaryOp::Eq => Some(BinaryOp::Ne),
            BinaryOp::Ne => Some(BinaryOp::Eq),
            BinaryOp::Lt => Some(BinaryOp::Ge),
            BinaryOp::Ge => Some(BinaryOp::Lt),
            BinaryOp::Gt => Some(BinaryOp::Le),
            BinaryOp::Le => Some(BinaryOp::Gt),
            _ => None,
        }
    }

    /// The De Morgan dual of a boolean connective, if any.
    pub fn de_morgan(self) -> Option<BinaryOp> {
        match self {
            BinaryOp::And => Some(BinaryOp::Or),
            BinaryOp::Or => Some(BinaryOp::And),
            _ => None,
        }
    }

    pub fn is_comparison(self) -> bool {
        self.negation().is_some()
    }
}

/// What an identifier refers to after resolution.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Resolution {
    /// A local variable.
    Local(LocalId),
    /// A class reference (the identifier text may be a dotted path).
    Class(String),
    /// A static member of a class.
    StaticMember { class: String, member: String },
    /// A placeholder parameter marker, synthesized while capturing a
    /// placeholder implementation. Never produced by the resolver.
    Param(String),
    /// Not resolved (or not yet resolved).
    Unresolved,
}

/// An identifier expression.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Ident {
    pub name: String,
    pub res: Resolution,
}

/// Parsed type syntax, prior to resolution.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TySyntax {
    /// A primitive keyword, if this is a primitive type.
    pub prim: Option<Prim>,
    /// The (possibly dotted) class name; empty for primitives.
    pub name: String,
    /// Generic arguments.
    pub args: Vec<TySyntax>,
    /// Trailing `[]` count.
    pub array_dims: u32,
}

/// A type as written in source: resolved type plus the written form used
/// when rendering the node back to text.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TyRef {
    pub ty: Ty,
    pub written: String,
    /// Present on parsed trees until resolution; `None` on synthesized
    /// trees built by the inliner.
    pub syntax: Option<TySyntax>,
    pub span: Span,
}

impl TyRef {
    /// A synthesized type reference with an explicit written form.
    pub fn synthesized(ty: Ty, written: impl Into<String>) -> Self {
        TyRef { ty, written: written.into(), syntax: None, span: Span::DUMMY }
    }
}

/// A typed expression node.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Ty,
    pub span: Span,
}

impl Expr {
    /// An expression with an as-yet unknown type.
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr { kind, ty: Ty::Error, span }
    }

    pub fn typed(kind: ExprKind, ty: Ty, span: Span) -> Self {
        Expr { kind, ty, span }
    }

    /// This expression with any explicit parentheses stripped.
    pub fn strip_parens(&self) -> &Expr {
        match &self.kind {
            ExprKind::Paren(inner) => inner.strip_parens(),
            _ => self,
        }
    }

    /// Visit this expression and every sub-expression, preorder.
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a Expr)) {
        f(self);
        self.for_each_child(&mut |child| child.walk(f));
    }

    /// Visit the direct expression children of this node.
    pub fn for_each_child<'a>(&'a self, f: &mut dyn FnMut(&'a Expr)) {
        match &self.kind {
            ExprKind::Lit(_) | ExprKind::Ident(_) => {}
            ExprKind::Select { base, .. } => f(base),
            ExprKind::Call { callee, args } => {
                f(callee);
                args.iter().for_each(|a| f(a));
            }
            ExprKind::Unary { operand, .. } => f(operand),
            ExprKind::Binary { lhs, rhs, .. }
            | ExprKind::Assign { lhs, rhs }
            | ExprKind::CompoundAssign { lhs, rhs, .. } => {
                f(lhs);
                f(rhs);
            }
            ExprKind::Conditional { cond, then_expr, else_expr } => {
                f(cond);
                f(then_expr);
                f(else_expr);
            }
            ExprKind::Paren(inner) => f(inner),
            ExprKind::Cast { expr, .. } | ExprKind::InstanceOf { expr, .. } => f(expr),
            ExprKind::ArrayAccess { array, index } => {
                f(array);
                f(index);
            }
            ExprKind::NewClass { args, .. } => args.iter().for_each(|a| f(a)),
            ExprKind::NewArray { dims, init, .. } => {
                dims.iter().for_each(|d| f(d));
                if let Some(init) = init {
                    init.iter().for_each(|i| f(i));
                }
            }
        }
    }
}

/// The syntactic kind of an expression.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum ExprKind {
    Lit(Lit),
    Ident(Ident),
    Select { base: Box<Expr>, name: String },
    Call { callee: Box<Expr>, args: Vec<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Assign { lhs: Box<Expr>, rhs: Box<Expr> },
    CompoundAssign { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Conditional { cond: Box<Expr>, then_expr: Box<Expr>, else_expr: Box<Expr> },
    Paren(Box<Expr>),
    Cast { ty: TyRef, expr: Box<Expr> },
    InstanceOf { expr: Box<Expr>, ty: TyRef },
    ArrayAccess { array: Box<Expr>, index: Box<Expr> },
    NewClass { class: TyRef, args: Vec<Expr> },
    NewArray { elem: TyRef, dims: Vec<Expr>, init: Option<Vec<Expr>> },
}

/// A statement node.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Stmt { kind, span }
    }
}

/// The syntactic kind of a statement.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum StmtKind {
    Expr(Expr),
    VarDecl(VarDecl),
    Block(Block),
    If { cond: Expr, then_stmt: Box<Stmt>, else_stmt: Option<Box<Stmt>> },
    While { cond: Expr, body: Box<Stmt> },
    DoWhile { body: Box<Stmt>, cond: Expr },
    For { init: Vec<Stmt>, cond: Option<Expr>, update: Vec<Expr>, body: Box<Stmt> },
    Try { body: Block, catches: Vec<Catch>, finally: Option<Block> },
    Labeled { label: String, stmt: Box<Stmt> },
    Break { label: Option<String> },
    Continue { label: Option<String> },
    Return(Option<Expr>),
    Throw(Expr),
}

/// A local variable declaration.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VarDecl {
    pub name: String,
    pub sym: LocalId,
    pub ty: TyRef,
    pub init: Option<Expr>,
}

/// One catch clause of a try statement.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Catch {
    pub param: VarDecl,
    pub body: Block,
}

/// A brace-delimited statement sequence.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

/// A compilation unit: the import list visible to the import policy plus
/// one top-level block of statements.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Unit {
    pub imports: Vec<String>,
    pub block: Block,
}

/// Visit every block in a statement tree, preorder, including nested ones.
pub fn walk_blocks<'a>(block: &'a Block, f: &mut dyn FnMut(&'a Block)) {
    f(block);
    for stmt in &block.stmts {
        walk_stmt_blocks(stmt, f);
    }
}

fn walk_stmt_blocks<'a>(stmt: &'a Stmt, f: &mut dyn FnMut(&'a Block)) {
    match &stmt.kind {
        StmtKind::Block(b) => walk_blocks(b, f),
        StmtKind::If { then_stmt, else_stmt, .. } => {
            walk_stmt_blocks(then_stmt, f);
            if let Some(e) = else_stmt {
                walk_stmt_blocks(e, f);
            }
        }
        StmtKind::While { body, .. } | StmtKind::DoWhile { body, .. } => {
            walk_stmt_blocks(body, f)
        }
        StmtKind::For { init, body, .. } => {
            for s in init {
                walk_stmt_blocks(s, f);
            }
            walk_stmt_blocks(body, f);
        }
        StmtKind::Try { body, catches, finally } => {
            walk_blocks(body, f);
            for c in catches {
                walk_blocks(&c.body, f);
            }
            if let Some(fin) = finally {
                walk_blocks(fin, f);
            }
        }
        StmtKind::Labeled { stmt, .. } => walk_stmt_blocks(stmt, f),
        StmtKind::Expr(_)
        | StmtKind::VarDecl(_)
        | StmtKind::Break { .. }
        | StmtKind::Continue { .. }
        | StmtKind::Return(_)
        | StmtKind::Throw(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_negation_table_is_an_involution() {
        for op in [BinaryOp::Eq, BinaryOp::Ne, BinaryOp::Lt, BinaryOp::Le, BinaryOp::Gt, BinaryOp::Ge] {
            assert_eq!(op.negation().unwrap().negation(), Some(op));
        }
        assert_eq!(BinaryOp::And.de_morgan(), Some(BinaryOp::Or));
        assert_eq!(BinaryOp::Or.de_morgan(), Some(BinaryOp::And));
        assert_eq!(BinaryOp::Add.negation(), None);
    }

    #[test]
    fn strip_parens_reaches_the_core() {
        let lit = Expr::new(ExprKind::Lit(Lit::Int(1)), Span::DUMMY);
        let wrapped = Expr::new(
            ExprKind::Paren(Box::new(Expr::new(
                ExprKind::Paren(Box::new(lit.clone())),
                Span::DUMMY,
            ))),
            Span::DUMMY,
        );
        assert_eq!(wrapped.strip_parens(), &lit);
    }
}
