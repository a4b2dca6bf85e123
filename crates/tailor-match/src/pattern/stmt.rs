//! Statement pattern nodes and their consumption contract.
//!
//! A statement pattern consumes some prefix of the remaining target
//! statements: one for simple statements, a placeholder-determined count
//! for placeholders. If-statement patterns additionally know the
//! forward/backward duality and the implicit-else equivalence: a pattern
//! `if (c) A else B` matches a target `if (c) A` whose then-branch always
//! returns, with `B` matched against the statements that follow.

use tailor_syntax::ast::{Block, Catch, Stmt, StmtKind, TyRef, VarDecl};
use tailor_syntax::span::Span;

use crate::bindings::{Binding, Key, LocalVarBinding};
use crate::choice::Choice;
use crate::control_flow::{stmt_flow, Flow};
use crate::error::CouldNotResolveImport;
use crate::inline::Inliner;
use crate::pattern::expr::{unify_all, UExpr};
use crate::pattern::uty::UTy;
use crate::placeholder::UPlaceholderStmt;
use crate::unify::{Unifier, UnifierWithUnconsumed};

/// A catch-clause pattern; the parameter binds like a template-local
/// variable declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct UCatch {
    pub param: String,
    pub ty: UTy,
    pub body: Vec<UStmt>,
}

/// A statement pattern.
#[derive(Clone, Debug, PartialEq)]
pub enum UStmt {
    Expr(UExpr),
    /// Declares a template-local variable; binds the matched target
    /// variable's identity so later references unify by symbol.
    VarDecl { name: String, ty: UTy, init: Option<UExpr> },
    Block(Vec<UStmt>),
    /// The negated condition is precomputed for the backward strategy.
    If {
        cond: UExpr,
        negated_cond: UExpr,
        then_stmt: Box<UStmt>,
        else_stmt: Option<Box<UStmt>>,
    },
    While { cond: UExpr, body: Box<UStmt> },
    DoWhile { body: Box<UStmt>, cond: UExpr },
    For { init: Vec<UStmt>, cond: Option<UExpr>, update: Vec<UExpr>, body: Box<UStmt> },
    Try { body: Vec<UStmt>, catches: Vec<UCatch>, finally: Option<Vec<UStmt>> },
    /// Binds the target's label under a label key.
    Labeled { label: String, stmt: Box<UStmt> },
    Break { label: Option<String> },
    Continue { label: Option<String> },
    Return(Option<UExpr>),
    Throw(UExpr),
    Placeholder(UPlaceholderStmt),
}

impl UStmt {
    pub fn expr_stmt(expr: UExpr) -> UStmt {
        UStmt::Expr(expr)
    }

    pub fn var_decl(name: impl Into<String>, ty: UTy, init: Option<UExpr>) -> UStmt {
        UStmt::VarDecl { name: name.into(), ty, init }
    }

    pub fn block(stmts: Vec<UStmt>) -> UStmt {
        UStmt::Block(stmts)
    }

    pub fn if_then(cond: UExpr, then_stmt: UStmt) -> UStmt {
        let negated_cond = cond.negate();
        UStmt::If {
            cond,
            negated_cond,
            then_stmt: Box::new(then_stmt),
            else_stmt: None,
        }
    }

    pub fn if_else(cond: UExpr, then_stmt: UStmt, else_stmt: UStmt) -> UStmt {
        let negated_cond = cond.negate();
        UStmt::If {
            cond,
            negated_cond,
            then_stmt: Box::new(then_stmt),
            else_stmt: Some(Box::new(else_stmt)),
        }
    }

    pub fn while_loop(cond: UExpr, body: UStmt) -> UStmt {
        UStmt::While { cond, body: Box::new(body) }
    }

    pub fn do_while(body: UStmt, cond: UExpr) -> UStmt {
        UStmt::DoWhile { body: Box::new(body), cond }
    }

    pub fn labeled(label: impl Into<String>, stmt: UStmt) -> UStmt {
        UStmt::Labeled { label: label.into(), stmt: Box::new(stmt) }
    }

    pub fn return_value(expr: UExpr) -> UStmt {
        UStmt::Return(Some(expr))
    }

    pub fn return_void() -> UStmt {
        UStmt::Return(None)
    }

    pub fn throw(expr: UExpr) -> UStmt {
        UStmt::Throw(expr)
    }

    pub fn placeholder(p: UPlaceholderStmt) -> UStmt {
        UStmt::Placeholder(p)
    }

    /// Visit this pattern statement and every nested one, preorder.
    pub fn walk(&self, f: &mut dyn FnMut(&UStmt)) {
        f(self);
        match self {
            UStmt::Block(stmts) => stmts.iter().for_each(|s| s.walk(f)),
            UStmt::If { then_stmt, else_stmt, .. } => {
                then_stmt.walk(f);
                if let Some(e) = else_stmt {
                    e.walk(f);
                }
            }
            UStmt::While { body, .. } | UStmt::DoWhile { body, .. } => body.walk(f),
            UStmt::For { init, body, .. } => {
                init.iter().for_each(|s| s.walk(f));
                body.walk(f);
            }
            UStmt::Try { body, catches, finally } => {
                body.iter().for_each(|s| s.walk(f));
                for c in catches {
                    c.body.iter().for_each(|s| s.walk(f));
                }
                if let Some(fin) = finally {
                    fin.iter().for_each(|s| s.walk(f));
                }
            }
            UStmt::Labeled { stmt, .. } => stmt.walk(f),
            _ => {}
        }
    }

    /// Visit every expression pattern contained in this statement
    /// pattern, preorder.
    pub fn for_each_uexpr(&self, f: &mut dyn FnMut(&UExpr)) {
        self.walk(&mut |s| match s {
            UStmt::Expr(e) | UStmt::Throw(e) => e.walk(f),
            UStmt::VarDecl { init: Some(e), .. } => e.walk(f),
            UStmt::If { cond, .. } => cond.walk(f),
            UStmt::While { cond, .. } | UStmt::DoWhile { cond, .. } => cond.walk(f),
            UStmt::For { cond, update, .. } => {
                if let Some(c) = cond {
                    c.walk(f);
                }
                update.iter().for_each(|e| e.walk(f));
            }
            UStmt::Return(Some(e)) => e.walk(f),
            UStmt::Placeholder(p) => p.args.iter().for_each(|a| a.walk(f)),
            _ => {}
        });
    }

    /// Consume some prefix of the remaining target statements.
    pub fn consume<'a>(
        &'a self,
        state: UnifierWithUnconsumed<'a>,
    ) -> Choice<'a, UnifierWithUnconsumed<'a>> {
        match self {
            UStmt::Placeholder(p) => p.consume(state),
            UStmt::If { .. } => self.consume_if(state),
            _ => {
                let Some((first, rest)) = state.remaining.split_first() else {
                    return Choice::none();
                };
                self.unify_stmt(first, state.unifier)
                    .transform(move |u| UnifierWithUnconsumed::new(u, rest))
            }
        }
    }

    /// Unify against exactly one target statement.
    fn unify_stmt<'a>(&'a self, target: &'a Stmt, u: Unifier<'a>) -> Choice<'a, Unifier<'a>> {
        match (self, &target.kind) {
            (UStmt::Expr(p), StmtKind::Expr(t)) => p.unify(t, u),

            (UStmt::VarDecl { name, ty, init }, StmtKind::VarDecl(decl)) => {
                let choice = ty.unify(&decl.ty.ty, u);
                let choice = match (init, &decl.init) {
                    (None, None) => choice,
                    (Some(pi), Some(ti)) => choice.then_choose(move |u| pi.unify(ti, u)),
                    _ => return Choice::none(),
                };
                choice.transform(move |mut u| {
                    u.put_binding(
                        Key::LocalVar(name.clone()),
                        Binding::LocalVar(LocalVarBinding {
                            name: decl.name.clone(),
                            sym: decl.sym,
                            ty: decl.ty.ty.clone(),
                        }),
                    );
                    u
                })
            }

            (UStmt::Block(stmts), StmtKind::Block(b)) => thread_all(stmts, &b.stmts, u),

            (UStmt::If { .. }, StmtKind::If { .. }) => self
                .consume_if(UnifierWithUnconsumed::new(u, std::slice::from_ref(target)))
                .then_option(|st| {
                    if st.remaining.is_empty() {
                        Some(st.unifier)
                    } else {
                        None
                    }
                }),

            (UStmt::While { cond, body }, StmtKind::While { cond: tc, body: tb }) => cond
                .unify(tc, u)
                .then_choose(move |u| unify_single(Some(body.as_ref()), Some(tb.as_ref()), u)),

            (UStmt::DoWhile { body, cond }, StmtKind::DoWhile { body: tb, cond: tc }) => {
                unify_single(Some(body.as_ref()), Some(tb.as_ref()), u)
                    .then_choose(move |u| cond.unify(tc, u))
            }

            (
                UStmt::For { init, cond, update, body },
                StmtKind::For { init: ti, cond: tc, update: tu, body: tb },
            ) => {
                if init.len() != ti.len() {
                    return Choice::none();
                }
                let mut choice = Choice::of(u);
                for (p, t) in init.iter().zip(ti) {
                    choice = choice.then_choose(move |u| p.unify_stmt(t, u));
                }
                let choice = match (cond, tc) {
                    (None, None) => choice,
                    (Some(pc), Some(tcc)) => choice.then_choose(move |u| pc.unify(tcc, u)),
                    _ => return Choice::none(),
                };
                choice
                    .then_choose(move |u| unify_all(update, tu, u))
                    .then_choose(move |u| unify_single(Some(body.as_ref()), Some(tb.as_ref()), u))
            }

            (
                UStmt::Try { body, catches, finally },
                StmtKind::Try { body: tb, catches: tc, finally: tf },
            ) => {
                if catches.len() != tc.len() {
                    return Choice::none();
                }
                let mut choice = thread_all(body, &tb.stmts, u);
                for (p, t) in catches.iter().zip(tc) {
                    choice = choice.then_choose(move |u| p.unify_catch(t, u));
                }
                match (finally, tf) {
                    (None, None) => choice,
                    (Some(pf), Some(tff)) => {
                        choice.then_choose(move |u| thread_all(pf, &tff.stmts, u))
                    }
                    _ => Choice::none(),
                }
            }

            (UStmt::Labeled { label, stmt }, StmtKind::Labeled { label: tl, stmt: ts }) => {
                let consistent = bind_label(label, tl, &u);
                match consistent {
                    LabelMatch::Conflict => Choice::none(),
                    LabelMatch::AlreadyBound => {
                        unify_single(Some(stmt.as_ref()), Some(ts.as_ref()), u)
                    }
                    LabelMatch::Fresh => {
                        let mut u = u;
                        u.put_binding(Key::Label(label.clone()), Binding::Label(tl.clone()));
                        unify_single(Some(stmt.as_ref()), Some(ts.as_ref()), u)
                    }
                }
            }

            (UStmt::Break { label }, StmtKind::Break { label: tl }) => {
                unify_jump_label(label.as_deref(), tl.as_deref(), u)
            }

            (UStmt::Continue { label }, StmtKind::Continue { label: tl }) => {
                unify_jump_label(label.as_deref(), tl.as_deref(), u)
            }

            (UStmt::Return(value), StmtKind::Return(tv)) => match (value, tv) {
                (None, None) => Choice::of(u),
                (Some(pv), Some(tvv)) => pv.unify(tvv, u),
                _ => Choice::none(),
            },

            (UStmt::Throw(p), StmtKind::Throw(t)) => p.unify(t, u),

            _ => Choice::none(),
        }
    }

    /// The if-statement consumption algorithm: forward and backward
    /// strategies, each with the implicit-else extension.
    fn consume_if<'a>(
        &'a self,
        state: UnifierWithUnconsumed<'a>,
    ) -> Choice<'a, UnifierWithUnconsumed<'a>> {
        let UStmt::If { cond, negated_cond, then_stmt, else_stmt } = self else {
            unreachable!("consume_if on a non-if pattern");
        };
        let Some((first, tail)) = state.remaining.split_first() else {
            return Choice::none();
        };
        let StmtKind::If { cond: tcond, then_stmt: tthen, else_stmt: telse } = &first.kind else {
            return Choice::none();
        };
        let u = state.unifier;

        let forward = cond
            .unify(tcond, u.fork())
            .then_choose(move |u| unify_single(Some(then_stmt.as_ref()), Some(tthen.as_ref()), u))
            .then_choose(move |u| {
                if else_stmt.is_some()
                    && telse.is_none()
                    && stmt_flow(tthen) == Flow::AlwaysReturns
                {
                    // The target has no else, but its then-branch always
                    // returns: the pattern's else matches the statements
                    // that follow the if.
                    let else_pat = else_stmt.as_ref().expect("checked above");
                    implicit_branch(else_pat.as_ref(), &u, tail)
                } else {
                    unify_single(else_stmt.as_deref(), telse.as_deref(), u)
                        .transform(move |u| UnifierWithUnconsumed::new(u, tail))
                }
            });

        let backward = negated_cond
            .unify(tcond, u.fork())
            .then_choose(move |u| {
                let Some(else_pat) = else_stmt else {
                    return Choice::none();
                };
                unify_single(Some(else_pat.as_ref()), Some(tthen.as_ref()), u)
            })
            .then_choose(move |u| {
                if telse.is_none() && stmt_flow(tthen) == Flow::AlwaysReturns {
                    implicit_branch(then_stmt.as_ref(), &u, tail)
                } else {
                    unify_single(Some(then_stmt.as_ref()), telse.as_deref(), u)
                        .transform(move |u| UnifierWithUnconsumed::new(u, tail))
                }
            });

        forward.or(backward)
    }

    /// Reconstruct concrete statements from this pattern under completed
    /// bindings. Most patterns inline to exactly one statement;
    /// placeholders inline to their captured run.
    pub fn inline_stmts(
        &self,
        inliner: &mut Inliner<'_>,
    ) -> Result<Vec<Stmt>, CouldNotResolveImport> {
        match self {
            UStmt::Expr(p) => {
                let e = p.inline(inliner)?;
                Ok(vec![Stmt::new(StmtKind::Expr(e), Span::DUMMY)])
            }
            UStmt::VarDecl { name, ty, init } => {
                let key = Key::LocalVar(name.clone());
                let binding = inliner
                    .bindings
                    .local_var(&key)
                    .unwrap_or_else(|| panic!("no binding for {key}"))
                    .clone();
                let ty = inline_ty_ref(ty, inliner)?;
                let init = match init {
                    Some(i) => Some(i.inline(inliner)?),
                    None => None,
                };
                Ok(vec![Stmt::new(
                    StmtKind::VarDecl(VarDecl {
                        name: binding.name,
                        sym: binding.sym,
                        ty,
                        init,
                    }),
                    Span::DUMMY,
                )])
            }
            UStmt::Block(stmts) => {
                let inlined = inline_all(stmts, inliner)?;
                Ok(vec![Stmt::new(
                    StmtKind::Block(Block { stmts: inlined, span: Span::DUMMY }),
                    Span::DUMMY,
                )])
            }
            UStmt::If { cond, then_stmt, else_stmt, .. } => {
                let cond = cond.inline(inliner)?;
                let then_stmt = only(then_stmt.inline_stmts(inliner)?);
                let else_stmt = match else_stmt {
                    Some(e) => Some(Box::new(only(e.inline_stmts(inliner)?))),
                    None => None,
                };
                Ok(vec![Stmt::new(
                    StmtKind::If { cond, then_stmt: Box::new(then_stmt), else_stmt },
                    Span::DUMMY,
                )])
            }
            UStmt::While { cond, body } => {
                let cond = cond.inline(inliner)?;
                let body = only(body.inline_stmts(inliner)?);
                Ok(vec![Stmt::new(
                    StmtKind::While { cond, body: Box::new(body) },
                    Span::DUMMY,
                )])
            }
            UStmt::DoWhile { body, cond } => {
                let body = only(body.inline_stmts(inliner)?);
                let cond = cond.inline(inliner)?;
                Ok(vec![Stmt::new(
                    StmtKind::DoWhile { body: Box::new(body), cond },
                    Span::DUMMY,
                )])
            }
            UStmt::For { init, cond, update, body } => {
                let init = inline_all(init, inliner)?;
                let cond = match cond {
                    Some(c) => Some(c.inline(inliner)?),
                    None => None,
                };
                let update = update
                    .iter()
                    .map(|e| e.inline(inliner))
                    .collect::<Result<_, _>>()?;
                let body = only(body.inline_stmts(inliner)?);
                Ok(vec![Stmt::new(
                    StmtKind::For { init, cond, update, body: Box::new(body) },
                    Span::DUMMY,
                )])
            }
            UStmt::Try { body, catches, finally } => {
                let body = Block { stmts: inline_all(body, inliner)?, span: Span::DUMMY };
                let catches = catches
                    .iter()
                    .map(|c| c.inline(inliner))
                    .collect::<Result<_, _>>()?;
                let finally = match finally {
                    Some(f) => {
                        Some(Block { stmts: inline_all(f, inliner)?, span: Span::DUMMY })
                    }
                    None => None,
                };
                Ok(vec![Stmt::new(
                    StmtKind::Try { body, catches, finally },
                    Span::DUMMY,
                )])
            }
            UStmt::Labeled { label, stmt } => {
                let target_label = inliner
                    .bindings
                    .label(&Key::Label(label.clone()))
                    .unwrap_or(label)
                    .to_owned();
                let stmt = only(stmt.inline_stmts(inliner)?);
                Ok(vec![Stmt::new(
                    StmtKind::Labeled { label: target_label, stmt: Box::new(stmt) },
                    Span::DUMMY,
                )])
            }
            UStmt::Break { label } => {
                Ok(vec![Stmt::new(StmtKind::Break { label: inline_label(label, inliner) }, Span::DUMMY)])
            }
            UStmt::Continue { label } => Ok(vec![Stmt::new(
                StmtKind::Continue { label: inline_label(label, inliner) },
                Span::DUMMY,
            )]),
            UStmt::Return(value) => {
                let value = match value {
                    Some(v) => Some(v.inline(inliner)?),
                    None => None,
                };
                Ok(vec![Stmt::new(StmtKind::Return(value), Span::DUMMY)])
            }
            UStmt::Throw(p) => {
                let e = p.inline(inliner)?;
                Ok(vec![Stmt::new(StmtKind::Throw(e), Span::DUMMY)])
            }
            UStmt::Placeholder(p) => p.inline_stmts(inliner),
        }
    }
}

impl UCatch {
    fn unify_catch<'a>(&'a self, target: &'a Catch, u: Unifier<'a>) -> Choice<'a, Unifier<'a>> {
        self.ty.unify(&target.param.ty.ty, u).then_choose(move |mut u| {
            u.put_binding(
                Key::LocalVar(self.param.clone()),
                Binding::LocalVar(LocalVarBinding {
                    name: target.param.name.clone(),
                    sym: target.param.sym,
                    ty: target.param.ty.ty.clone(),
                }),
            );
            thread_all(&self.body, &target.body.stmts, u)
        })
    }

    fn inline(&self, inliner: &mut Inliner<'_>) -> Result<Catch, CouldNotResolveImport> {
        let key = Key::LocalVar(self.param.clone());
        let binding = inliner
            .bindings
            .local_var(&key)
            .unwrap_or_else(|| panic!("no binding for {key}"))
            .clone();
        let ty = inline_ty_ref(&self.ty, inliner)?;
        Ok(Catch {
            param: VarDecl { name: binding.name, sym: binding.sym, ty, init: None },
            body: Block { stmts: inline_all(&self.body, inliner)?, span: Span::DUMMY },
        })
    }
}

/// Thread a pattern-statement sequence through a target run, requiring
/// full consumption.
fn thread_all<'a>(
    patterns: &'a [UStmt],
    targets: &'a [Stmt],
    u: Unifier<'a>,
) -> Choice<'a, Unifier<'a>> {
    let mut choice = Choice::of(UnifierWithUnconsumed::new(u, targets));
    for p in patterns {
        choice = choice.then_choose(move |st| p.consume(st));
    }
    choice.then_option(|st| {
        if st.remaining.is_empty() {
            Some(st.unifier)
        } else {
            None
        }
    })
}

/// Unify an optional pattern statement against an optional single target
/// statement: both absent, or both present with the pattern consuming
/// exactly that statement.
fn unify_single<'a>(
    pattern: Option<&'a UStmt>,
    target: Option<&'a Stmt>,
    u: Unifier<'a>,
) -> Choice<'a, Unifier<'a>> {
    let Some(pattern) = pattern else {
        return Choice::when(target.is_none(), u);
    };
    let targets: &'a [Stmt] = match target {
        Some(t) => std::slice::from_ref(t),
        None => &[],
    };
    pattern.consume(UnifierWithUnconsumed::new(u, targets)).then_option(|st| {
        if st.remaining.is_empty() {
            Some(st.unifier)
        } else {
            None
        }
    })
}

/// A branch matched against the statements following a one-armed if.
/// When the branch is a block, both "match it as a nested block" and
/// "splice its statements into the following sequence" are observably
/// equivalent source forms, so both are offered.
fn implicit_branch<'a>(
    branch: &'a UStmt,
    u: &Unifier<'a>,
    tail: &'a [Stmt],
) -> Choice<'a, UnifierWithUnconsumed<'a>> {
    let mut result = branch.consume(UnifierWithUnconsumed::new(u.fork(), tail));
    if let UStmt::Block(stmts) = branch {
        let mut spliced = Choice::of(UnifierWithUnconsumed::new(u.fork(), tail));
        for s in stmts {
            spliced = spliced.then_choose(move |st| s.consume(st));
        }
        result = result.or(spliced);
    }
    result
}

enum LabelMatch {
    Fresh,
    AlreadyBound,
    Conflict,
}

fn bind_label(pattern: &str, target: &str, u: &Unifier<'_>) -> LabelMatch {
    match u.bindings().label(&Key::Label(pattern.to_owned())) {
        Some(bound) if bound == target => LabelMatch::AlreadyBound,
        Some(_) => LabelMatch::Conflict,
        None => LabelMatch::Fresh,
    }
}

fn unify_jump_label<'a>(
    pattern: Option<&str>,
    target: Option<&str>,
    u: Unifier<'a>,
) -> Choice<'a, Unifier<'a>> {
    match (pattern, target) {
        (None, None) => Choice::of(u),
        (Some(p), Some(t)) => match bind_label(p, t, &u) {
            LabelMatch::AlreadyBound => Choice::of(u),
            LabelMatch::Conflict => Choice::none(),
            LabelMatch::Fresh => {
                let mut u = u;
                u.put_binding(Key::Label(p.to_owned()), Binding::Label(t.to_owned()));
                Choice::of(u)
            }
        },
        _ => Choice::none(),
    }
}

fn inline_label(pattern: &Option<String>, inliner: &Inliner<'_>) -> Option<String> {
    pattern.as_ref().map(|name| {
        inliner
            .bindings
            .label(&Key::Label(name.clone()))
            .unwrap_or(name)
            .to_owned()
    })
}

fn inline_all(
    patterns: &[UStmt],
    inliner: &mut Inliner<'_>,
) -> Result<Vec<Stmt>, CouldNotResolveImport> {
    let mut out = Vec::new();
    for p in patterns {
        out.extend(p.inline_stmts(inliner)?);
    }
    Ok(out)
}

fn inline_ty_ref(ty: &UTy, inliner: &mut Inliner<'_>) -> Result<TyRef, CouldNotResolveImport> {
    let concrete = ty.inline(inliner)?;
    let written = inliner.type_text(&concrete)?;
    Ok(TyRef::synthesized(concrete, written))
}

/// Exactly one statement; if-branch patterns inline to a single
/// statement by construction.
fn only(mut stmts: Vec<Stmt>) -> Stmt {
    assert_eq!(stmts.len(), 1, "expected exactly one inlined statement");
    stmts.remove(0)
}
