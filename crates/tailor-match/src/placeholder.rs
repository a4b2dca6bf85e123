//! Placeholder matching: higher-order unification.
//!
//! A placeholder invocation stands for an arbitrary sub-computation
//! constrained only by its parameters: each parameter may bind any one
//! target expression, required parameters must all be used, and the
//! captured implementation may not reference locals the rule already
//! binds. Matching combines two strategies per node: bind the whole node
//! to one of the arguments, or decompose it one level and recurse.
//!
//! The captured implementation is the target tree with every
//! argument-matched subtree replaced by a parameter marker; it is stored
//! idempotently, so a placeholder matched twice must capture identical
//! code.

use std::rc::Rc;

use rustc_hash::FxHashMap;
use rustc_hash::FxHashSet;
use tailor_syntax::ast::{
    Block, Catch, Expr, ExprKind, Ident, Resolution, Stmt, StmtKind, VarDecl,
};
use tailor_syntax::render;
use tailor_syntax::span::Span;

use crate::bindings::{Binding, Key};
use crate::choice::Choice;
use crate::control_flow::{stmts_flow, Flow};
use crate::error::CouldNotResolveImport;
use crate::inline::Inliner;
use crate::pattern::expr::{equivalent_exprs, UExpr};
use crate::unify::{Unifier, UnifierWithUnconsumed};

/// One formal parameter of a placeholder.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaceholderParam {
    pub name: String,
    pub required: bool,
}

impl PlaceholderParam {
    pub fn required(name: impl Into<String>) -> Self {
        PlaceholderParam { name: name.into(), required: true }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        PlaceholderParam { name: name.into(), required: false }
    }
}

/// A placeholder declaration: name, return type, formal parameters, and
/// whether an identity match (a parameter used unchanged as the whole
/// implementation) is permitted.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaceholderMethod {
    pub name: String,
    pub return_ty: crate::pattern::uty::UTy,
    pub params: Vec<PlaceholderParam>,
    pub allow_identity: bool,
}

impl PlaceholderMethod {
    pub fn new(
        name: impl Into<String>,
        return_ty: crate::pattern::uty::UTy,
        params: Vec<PlaceholderParam>,
    ) -> Rc<Self> {
        Rc::new(PlaceholderMethod { name: name.into(), return_ty, params, allow_identity: false })
    }

    pub fn with_identity(mut self) -> Self {
        self.allow_identity = true;
        self
    }

    pub fn expr_key(&self) -> Key {
        Key::PlaceholderExpr(self.name.clone())
    }

    pub fn stmts_key(&self) -> Key {
        Key::PlaceholderStmts(self.name.clone())
    }

    fn required_names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().filter(|p| p.required).map(|p| p.name.as_str())
    }
}

/// A placeholder invoked as an expression.
#[derive(Clone, Debug, PartialEq)]
pub struct UPlaceholderExpr {
    pub method: Rc<PlaceholderMethod>,
    pub args: Vec<UExpr>,
}

impl UPlaceholderExpr {
    pub fn new(method: Rc<PlaceholderMethod>, args: Vec<UExpr>) -> Self {
        assert_eq!(
            method.params.len(),
            args.len(),
            "placeholder `{}` takes {} parameters",
            method.name,
            method.params.len()
        );
        UPlaceholderExpr { method, args }
    }

    pub fn unify<'a>(&'a self, target: &'a Expr, u: Unifier<'a>) -> Choice<'a, Unifier<'a>> {
        let method: &'a PlaceholderMethod = &self.method;
        let args = self.args.as_slice();
        let state = State { seen: Vec::new(), unifier: u, result: () };
        unify_expr(method, args, target, state).then_option(move |st| {
            if !method.required_names().all(|r| st.seen.iter().any(|s| s == r)) {
                return None;
            }
            let impl_expr = st.result;
            if !method.allow_identity && is_param_marker(&impl_expr).is_some() {
                return None;
            }
            let mut u = st.unifier.fork();
            let key = method.expr_key();
            let consistent = match u.get_binding(&key) {
                Some(Binding::Expr(prev)) => Some(render::expr(prev) == render::expr(&impl_expr)),
                Some(_) => Some(false),
                None => None,
            };
            match consistent {
                Some(true) => Some(u),
                Some(false) => None,
                None => {
                    u.put_binding(key, Binding::Expr(impl_expr));
                    Some(u)
                }
            }
        })
    }

    /// Re-check the captured implementation against the final bindings:
    /// required parameters must occur, and no bound local may leak in.
    pub fn reverify(&self, u: &Unifier<'_>) -> bool {
        let Some(Binding::Expr(captured)) = u.get_binding(&self.method.expr_key()) else {
            return true;
        };
        self.method.required_names().all(|r| expr_mentions_param(captured, r))
            && !expr_leaks_bound_local(captured, u)
    }

    pub fn inline(&self, inliner: &mut Inliner<'_>) -> Result<Expr, CouldNotResolveImport> {
        let key = self.method.expr_key();
        let captured = inliner
            .bindings
            .expr(&key)
            .unwrap_or_else(|| panic!("no binding for {key}"))
            .clone();
        substitute_expr(&captured, &self.param_args(), inliner)
    }

    fn param_args(&self) -> FxHashMap<&str, &UExpr> {
        self.method
            .params
            .iter()
            .zip(&self.args)
            .map(|(p, a)| (p.name.as_str(), a))
            .collect()
    }
}

/// A placeholder invoked as a whole statement (or a `return`). Carries
/// the control-flow classification its captured implementation must
/// have: an expression-statement placeholder cannot swallow a `return`.
#[derive(Clone, Debug, PartialEq)]
pub struct UPlaceholderStmt {
    pub method: Rc<PlaceholderMethod>,
    pub args: Vec<UExpr>,
    pub flow: Flow,
}

impl UPlaceholderStmt {
    pub fn new(method: Rc<PlaceholderMethod>, args: Vec<UExpr>, flow: Flow) -> Self {
        assert_eq!(
            method.params.len(),
            args.len(),
            "placeholder `{}` takes {} parameters",
            method.name,
            method.params.len()
        );
        UPlaceholderStmt { method, args, flow }
    }

    /// Consume zero or more of the unconsumed target statements as this
    /// placeholder's implementation. Longer consumptions are offered
    /// first.
    pub fn consume<'a>(
        &'a self,
        init: UnifierWithUnconsumed<'a>,
    ) -> Choice<'a, UnifierWithUnconsumed<'a>> {
        let method: &'a PlaceholderMethod = &self.method;
        let args = self.args.as_slice();
        let declared_flow = self.flow;
        let remaining = init.remaining;

        let mut real: Choice<'a, State<'a, Consumption>> = Choice::none();
        let mut here: Choice<'a, State<'a, Consumption>> = Choice::of(State {
            seen: Vec::new(),
            unifier: init.unifier.clone(),
            result: Consumption::default(),
        });

        // The pre-scan walks the candidate statements, marking required
        // arguments as they appear; a prefix is only a real option once
        // every required argument has been seen, and scanning stops at
        // the first statement that touches a forbidden local.
        let mut marks: FxHashSet<String> = FxHashSet::default();
        let required: Vec<String> = method.required_names().map(str::to_owned).collect();
        if required.iter().all(|r| marks.contains(r)) {
            real = here.clone().or(real);
        }
        for target_stmt in remaining {
            if !scan_stmt(target_stmt, &init.unifier, method, args, &mut marks) {
                break;
            }
            let prev = here;
            here = prev.then_choose(move |st| {
                let consumption = st.result.clone();
                unify_stmt(method, args, target_stmt, st.with_result(())).transform(move |st2| {
                    let mut c = consumption.clone();
                    c.consumed += 1;
                    c.impl_stmts.push(st2.result.clone());
                    st2.with_result(c)
                })
            });
            if required.iter().all(|r| marks.contains(r)) {
                real = here.clone().or(real);
            }
        }

        real.then_option(move |st| {
            if !method.required_names().all(|r| st.seen.iter().any(|s| s == r)) {
                return None;
            }
            let State { unifier, result, .. } = st;
            if stmts_flow(&result.impl_stmts) != declared_flow {
                return None;
            }
            let mut u = unifier.fork();
            let key = method.stmts_key();
            let consistent = match u.get_binding(&key) {
                Some(Binding::Stmts(prev)) => {
                    Some(render::stmts(prev) == render::stmts(&result.impl_stmts))
                }
                Some(_) => Some(false),
                None => None,
            };
            match consistent {
                Some(false) => return None,
                Some(true) => {}
                None => u.put_binding(key, Binding::Stmts(result.impl_stmts)),
            }
            Some(UnifierWithUnconsumed::new(u, &remaining[result.consumed..]))
        })
    }

    pub fn reverify(&self, u: &Unifier<'_>) -> bool {
        let Some(Binding::Stmts(captured)) = u.get_binding(&self.method.stmts_key()) else {
            return true;
        };
        self.method
            .required_names()
            .all(|r| captured.iter().any(|s| stmt_mentions_param(s, r)))
            && !captured.iter().any(|s| stmt_leaks_bound_local(s, u))
    }

    /// Inline the captured implementation. A placeholder captured as an
    /// expression elsewhere in the rule converts according to its
    /// declared flow.
    pub fn inline_stmts(&self, inliner: &mut Inliner<'_>) -> Result<Vec<Stmt>, CouldNotResolveImport> {
        let args = self.param_args();
        let captured = inliner.bindings.stmts(&self.method.stmts_key()).map(<[Stmt]>::to_vec);
        if let Some(captured) = captured {
            return captured.iter().map(|s| substitute_stmt(s, &args, inliner)).collect();
        }
        let expr_key = self.method.expr_key();
        let captured = inliner
            .bindings
            .expr(&expr_key)
            .unwrap_or_else(|| panic!("no binding for {}", self.method.stmts_key()))
            .clone();
        let expr = substitute_expr(&captured, &args, inliner)?;
        let stmt = match self.flow {
            Flow::NeverExits => Stmt::new(StmtKind::Expr(expr), Span::DUMMY),
            Flow::AlwaysReturns => Stmt::new(StmtKind::Return(Some(expr)), Span::DUMMY),
            other => panic!("cannot convert an expression placeholder to flow {other:?}"),
        };
        Ok(vec![stmt])
    }

    fn param_args(&self) -> FxHashMap<&str, &UExpr> {
        self.method
            .params
            .iter()
            .zip(&self.args)
            .map(|(p, a)| (p.name.as_str(), a))
            .collect()
    }
}

// ── Unification state ──────────────────────────────────────────────────

/// The state of a placeholder unification in progress: which parameters
/// have bound so far, the unifier, and the partial captured result.
#[derive(Clone, Debug)]
struct State<'a, R> {
    seen: Vec<String>,
    unifier: Unifier<'a>,
    result: R,
}

impl<'a, R> State<'a, R> {
    fn with_result<R2>(self, result: R2) -> State<'a, R2> {
        State { seen: self.seen, unifier: self.unifier, result }
    }
}

#[derive(Clone, Debug, Default)]
struct Consumption {
    consumed: usize,
    impl_stmts: Vec<Stmt>,
}

fn param_marker(param: &PlaceholderParam, node: &Expr) -> Expr {
    Expr::typed(
        ExprKind::Ident(Ident {
            name: param.name.clone(),
            res: Resolution::Param(param.name.clone()),
        }),
        node.ty.clone(),
        node.span,
    )
}

fn is_param_marker(e: &Expr) -> Option<&str> {
    if let ExprKind::Ident(Ident { res: Resolution::Param(p), .. }) = &e.kind {
        Some(p)
    } else {
        None
    }
}

fn expr_mentions_param(e: &Expr, param: &str) -> bool {
    let mut found = false;
    e.walk(&mut |sub| {
        if is_param_marker(sub) == Some(param) {
            found = true;
        }
    });
    found
}

fn stmt_mentions_param(s: &Stmt, param: &str) -> bool {
    let mut found = false;
    for_each_stmt_expr(s, &mut |e| {
        if expr_mentions_param(e, param) {
            found = true;
        }
    });
    found
}

fn expr_leaks_bound_local(e: &Expr, u: &Unifier<'_>) -> bool {
    let mut leaked = false;
    e.walk(&mut |sub| {
        if let ExprKind::Ident(Ident { res: Resolution::Local(sym), .. }) = &sub.kind {
            for (_, binding) in u.bindings().iter() {
                if let Binding::LocalVar(v) = binding {
                    if v.sym == *sym {
                        leaked = true;
                    }
                }
            }
        }
    });
    leaked
}

fn stmt_leaks_bound_local(s: &Stmt, u: &Unifier<'_>) -> bool {
    let mut leaked = false;
    for_each_stmt_expr(s, &mut |e| {
        if expr_leaks_bound_local(e, u) {
            leaked = true;
        }
    });
    leaked
}

/// Visit the top-level expressions of a statement tree (recursing into
/// nested statements, not into the expressions themselves).
fn for_each_stmt_expr(s: &Stmt, f: &mut dyn FnMut(&Expr)) {
    match &s.kind {
        StmtKind::Expr(e) | StmtKind::Throw(e) => f(e),
        StmtKind::Return(e) => {
            if let Some(e) = e {
                f(e);
            }
        }
        StmtKind::VarDecl(d) => {
            if let Some(init) = &d.init {
                f(init);
            }
        }
        StmtKind::Block(b) => b.stmts.iter().for_each(|s| for_each_stmt_expr(s, f)),
        StmtKind::If { cond, then_stmt, else_stmt } => {
            f(cond);
            for_each_stmt_expr(then_stmt, f);
            if let Some(e) = else_stmt {
                for_each_stmt_expr(e, f);
            }
        }
        StmtKind::While { cond, body } => {
            f(cond);
            for_each_stmt_expr(body, f);
        }
        StmtKind::DoWhile { body, cond } => {
            for_each_stmt_expr(body, f);
            f(cond);
        }
        StmtKind::For { init, cond, update, body } => {
            init.iter().for_each(|s| for_each_stmt_expr(s, f));
            if let Some(c) = cond {
                f(c);
            }
            update.iter().for_each(|e| f(e));
            for_each_stmt_expr(body, f);
        }
        StmtKind::Try { body, catches, finally } => {
            body.stmts.iter().for_each(|s| for_each_stmt_expr(s, f));
            for c in catches {
                c.body.stmts.iter().for_each(|s| for_each_stmt_expr(s, f));
            }
            if let Some(fin) = finally {
                fin.stmts.iter().for_each(|s| for_each_stmt_expr(s, f));
            }
        }
        StmtKind::Labeled { stmt, .. } => for_each_stmt_expr(stmt, f),
        StmtKind::Break { .. } | StmtKind::Continue { .. } => {}
    }
}

// ── The unification visitor ────────────────────────────────────────────

/// All the ways this node might unify with one of the placeholder's
/// arguments directly.
fn try_bind_arguments<'a>(
    method: &'a PlaceholderMethod,
    args: &'a [UExpr],
    node: &'a Expr,
    state: &State<'a, ()>,
) -> Choice<'a, State<'a, Expr>> {
    let pairs: Vec<(&'a PlaceholderParam, &'a UExpr)> =
        method.params.iter().zip(args).collect();
    let state = state.clone();
    Choice::from_vec(pairs).then_choose(move |(param, arg)| {
        let st = state.clone();
        let forked = st.unifier.fork();
        arg.unify(node, forked).transform(move |u| {
            let mut seen = st.seen.clone();
            seen.push(param.name.clone());
            State { seen, unifier: u, result: param_marker(param, node) }
        })
    })
}

/// Whether this node directly conflicts with an already-bound free
/// variable or local variable; if so, only whole-node argument binding
/// is legal.
fn forbidden_reference(node: &Expr, u: &Unifier<'_>) -> bool {
    if let ExprKind::Ident(Ident { res: Resolution::Local(sym), .. }) = &node.kind {
        for (_, binding) in u.bindings().iter() {
            if let Binding::LocalVar(v) = binding {
                if v.sym == *sym {
                    return true;
                }
            }
        }
    }
    for (key, binding) in u.bindings().iter() {
        if let (Key::FreeIdent(_), Binding::Expr(bound)) = (key, binding) {
            if equivalent_exprs(u.types(), node, bound) {
                return true;
            }
        }
    }
    false
}

/// All the ways a placeholder invocation can match an expression: whole
/// node as an argument, or structural descent.
pub(crate) fn unify_expr<'a>(
    method: &'a PlaceholderMethod,
    args: &'a [UExpr],
    node: &'a Expr,
    state: State<'a, ()>,
) -> Choice<'a, State<'a, Expr>> {
    let bind = try_bind_arguments(method, args, node, &state);
    if forbidden_reference(node, &state.unifier) {
        bind
    } else {
        bind.or(descend_expr(method, args, node, state))
    }
}

fn rebuild(node: &Expr, kind: ExprKind) -> Expr {
    Expr::typed(kind, node.ty.clone(), node.span)
}

fn descend_expr<'a>(
    method: &'a PlaceholderMethod,
    args: &'a [UExpr],
    node: &'a Expr,
    state: State<'a, ()>,
) -> Choice<'a, State<'a, Expr>> {
    match &node.kind {
        ExprKind::Lit(_) | ExprKind::Ident(_) => Choice::of(state.with_result(node.clone())),

        ExprKind::Select { base, name } => {
            unify_expr(method, args, base, state).transform(move |st| {
                let kind = ExprKind::Select {
                    base: Box::new(st.result.clone()),
                    name: name.clone(),
                };
                let expr = rebuild(node, kind);
                st.with_result(expr)
            })
        }

        ExprKind::Call { callee, args: call_args } => {
            unify_expr(method, args, callee, state).then_choose(move |st| {
                let callee_expr = st.result.clone();
                unify_expr_list(method, args, call_args, st.with_result(())).transform(
                    move |st2| {
                        let kind = ExprKind::Call {
                            callee: Box::new(callee_expr.clone()),
                            args: st2.result.clone(),
                        };
                        let expr = rebuild(node, kind);
                        st2.with_result(expr)
                    },
                )
            })
        }

        ExprKind::Unary { op, operand } => {
            let op = *op;
            unify_expr(method, args, operand, state).then_option(move |st| {
                // Placeholder parameters may not be mutated.
                if op.is_mutating() && is_param_marker(&st.result).is_some() {
                    return None;
                }
                let kind = ExprKind::Unary { op, operand: Box::new(st.result.clone()) };
                let expr = rebuild(node, kind);
                Some(st.with_result(expr))
            })
        }

        ExprKind::Binary { op, lhs, rhs } => {
            let op = *op;
            unify_expr(method, args, lhs, state).then_choose(move |st| {
                let lhs_expr = st.result.clone();
                unify_expr(method, args, rhs, st.with_result(())).transform(move |st2| {
                    let kind = ExprKind::Binary {
                        op,
                        lhs: Box::new(lhs_expr.clone()),
                        rhs: Box::new(st2.result.clone()),
                    };
                    let expr = rebuild(node, kind);
                    st2.with_result(expr)
                })
            })
        }

        ExprKind::Assign { lhs, rhs } => {
            unify_expr(method, args, lhs, state).then_choose(move |st| {
                // Assignment to a placeholder parameter is forbidden.
                if is_param_marker(&st.result).is_some() {
                    return Choice::none();
                }
                let lhs_expr = st.result.clone();
                unify_expr(method, args, rhs, st.with_result(())).transform(move |st2| {
                    let kind = ExprKind::Assign {
                        lhs: Box::new(lhs_expr.clone()),
                        rhs: Box::new(st2.result.clone()),
                    };
                    let expr = rebuild(node, kind);
                    st2.with_result(expr)
                })
            })
        }

        ExprKind::CompoundAssign { op, lhs, rhs } => {
            let op = *op;
            unify_expr(method, args, lhs, state).then_choose(move |st| {
                if is_param_marker(&st.result).is_some() {
                    return Choice::none();
                }
                let lhs_expr = st.result.clone();
                unify_expr(method, args, rhs, st.with_result(())).transform(move |st2| {
                    let kind = ExprKind::CompoundAssign {
                        op,
                        lhs: Box::new(lhs_expr.clone()),
                        rhs: Box::new(st2.result.clone()),
                    };
                    let expr = rebuild(node, kind);
                    st2.with_result(expr)
                })
            })
        }

        ExprKind::Conditional { cond, then_expr, else_expr } => {
            unify_expr(method, args, cond, state).then_choose(move |st| {
                let cond_expr = st.result.clone();
                unify_expr(method, args, then_expr, st.with_result(())).then_choose(move |st2| {
                    let cond_expr = cond_expr.clone();
                    let then_result = st2.result.clone();
                    unify_expr(method, args, else_expr, st2.with_result(())).transform(
                        move |st3| {
                            let kind = ExprKind::Conditional {
                                cond: Box::new(cond_expr.clone()),
                                then_expr: Box::new(then_result.clone()),
                                else_expr: Box::new(st3.result.clone()),
                            };
                            let expr = rebuild(node, kind);
                            st3.with_result(expr)
                        },
                    )
                })
            })
        }

        ExprKind::Paren(inner) => unify_expr(method, args, inner, state).transform(move |st| {
            let kind = ExprKind::Paren(Box::new(st.result.clone()));
            let expr = rebuild(node, kind);
            st.with_result(expr)
        }),

        ExprKind::Cast { ty, expr } => {
            unify_expr(method, args, expr, state).transform(move |st| {
                let kind = ExprKind::Cast { ty: ty.clone(), expr: Box::new(st.result.clone()) };
                let expr = rebuild(node, kind);
                st.with_result(expr)
            })
        }

        ExprKind::InstanceOf { expr, ty } => {
            unify_expr(method, args, expr, state).transform(move |st| {
                let kind =
                    ExprKind::InstanceOf { expr: Box::new(st.result.clone()), ty: ty.clone() };
                let expr = rebuild(node, kind);
                st.with_result(expr)
            })
        }

        ExprKind::ArrayAccess { array, index } => {
            unify_expr(method, args, array, state).then_choose(move |st| {
                let array_expr = st.result.clone();
                unify_expr(method, args, index, st.with_result(())).transform(move |st2| {
                    let kind = ExprKind::ArrayAccess {
                        array: Box::new(array_expr.clone()),
                        index: Box::new(st2.result.clone()),
                    };
                    let expr = rebuild(node, kind);
                    st2.with_result(expr)
                })
            })
        }

        ExprKind::NewClass { class, args: ctor_args } => {
            unify_expr_list(method, args, ctor_args, state).transform(move |st| {
                let kind = ExprKind::NewClass { class: class.clone(), args: st.result.clone() };
                let expr = rebuild(node, kind);
                st.with_result(expr)
            })
        }

        ExprKind::NewArray { elem, dims, init } => {
            unify_expr_list(method, args, dims, state).then_choose(move |st| {
                let dims_exprs = st.result.clone();
                match init {
                    None => {
                        let kind = ExprKind::NewArray {
                            elem: elem.clone(),
                            dims: dims_exprs.clone(),
                            init: None,
                        };
                        let expr = rebuild(node, kind);
                        Choice::of(st.with_result(expr))
                    }
                    Some(items) => unify_expr_list(method, args, items, st.with_result(()))
                        .transform(move |st2| {
                            let kind = ExprKind::NewArray {
                                elem: elem.clone(),
                                dims: dims_exprs.clone(),
                                init: Some(st2.result.clone()),
                            };
                            let expr = rebuild(node, kind);
                            st2.with_result(expr)
                        }),
                }
            })
        }
    }
}

fn unify_expr_list<'a>(
    method: &'a PlaceholderMethod,
    args: &'a [UExpr],
    nodes: &'a [Expr],
    state: State<'a, ()>,
) -> Choice<'a, State<'a, Vec<Expr>>> {
    let mut choice = Choice::of(state.with_result(Vec::new()));
    for node in nodes {
        choice = choice.then_choose(move |st| {
            let acc = st.result.clone();
            unify_expr(method, args, node, st.with_result(())).transform(move |st2| {
                let mut acc = acc.clone();
                acc.push(st2.result.clone());
                st2.with_result(acc)
            })
        });
    }
    choice
}

fn unify_opt_expr<'a>(
    method: &'a PlaceholderMethod,
    args: &'a [UExpr],
    node: Option<&'a Expr>,
    state: State<'a, ()>,
) -> Choice<'a, State<'a, Option<Expr>>> {
    match node {
        None => Choice::of(state.with_result(None)),
        Some(n) => unify_expr(method, args, n, state).transform(|st| {
            let result = st.result.clone();
            st.with_result(Some(result))
        }),
    }
}

fn rebuild_stmt(node: &Stmt, kind: StmtKind) -> Stmt {
    Stmt::new(kind, node.span)
}

/// Statement-level descent: rebuild each statement kind around the
/// recursively matched sub-trees.
pub(crate) fn unify_stmt<'a>(
    method: &'a PlaceholderMethod,
    args: &'a [UExpr],
    node: &'a Stmt,
    state: State<'a, ()>,
) -> Choice<'a, State<'a, Stmt>> {
    match &node.kind {
        StmtKind::Expr(e) => unify_expr(method, args, e, state).transform(move |st| {
            let stmt = rebuild_stmt(node, StmtKind::Expr(st.result.clone()));
            st.with_result(stmt)
        }),

        StmtKind::Return(value) => {
            unify_opt_expr(method, args, value.as_ref(), state).transform(move |st| {
                let stmt = rebuild_stmt(node, StmtKind::Return(st.result.clone()));
                st.with_result(stmt)
            })
        }

        StmtKind::Throw(e) => unify_expr(method, args, e, state).transform(move |st| {
            let stmt = rebuild_stmt(node, StmtKind::Throw(st.result.clone()));
            st.with_result(stmt)
        }),

        StmtKind::VarDecl(decl) => {
            unify_opt_expr(method, args, decl.init.as_ref(), state).transform(move |st| {
                let rebuilt = VarDecl {
                    name: decl.name.clone(),
                    sym: decl.sym,
                    ty: decl.ty.clone(),
                    init: st.result.clone(),
                };
                let stmt = rebuild_stmt(node, StmtKind::VarDecl(rebuilt));
                st.with_result(stmt)
            })
        }

        StmtKind::Block(b) => {
            unify_stmts(method, args, &b.stmts, state).transform(move |st| {
                let block = Block { stmts: st.result.clone(), span: b.span };
                let stmt = rebuild_stmt(node, StmtKind::Block(block));
                st.with_result(stmt)
            })
        }

        StmtKind::If { cond, then_stmt, else_stmt } => {
            unify_expr(method, args, cond, state).then_choose(move |st| {
                let cond_expr = st.result.clone();
                unify_stmt(method, args, then_stmt, st.with_result(())).then_choose(move |st2| {
                    let cond_expr = cond_expr.clone();
                    let then_result = st2.result.clone();
                    unify_opt_stmt(method, args, else_stmt.as_deref(), st2.with_result(()))
                        .transform(move |st3| {
                            let kind = StmtKind::If {
                                cond: cond_expr.clone(),
                                then_stmt: Box::new(then_result.clone()),
                                else_stmt: st3.result.clone().map(Box::new),
                            };
                            let stmt = rebuild_stmt(node, kind);
                            st3.with_result(stmt)
                        })
                })
            })
        }

        StmtKind::While { cond, body } => {
            unify_expr(method, args, cond, state).then_choose(move |st| {
                let cond_expr = st.result.clone();
                unify_stmt(method, args, body, st.with_result(())).transform(move |st2| {
                    let kind = StmtKind::While {
                        cond: cond_expr.clone(),
                        body: Box::new(st2.result.clone()),
                    };
                    let stmt = rebuild_stmt(node, kind);
                    st2.with_result(stmt)
                })
            })
        }

        StmtKind::DoWhile { body, cond } => {
            unify_stmt(method, args, body, state).then_choose(move |st| {
                let body_stmt = st.result.clone();
                unify_expr(method, args, cond, st.with_result(())).transform(move |st2| {
                    let kind = StmtKind::DoWhile {
                        body: Box::new(body_stmt.clone()),
                        cond: st2.result.clone(),
                    };
                    let stmt = rebuild_stmt(node, kind);
                    st2.with_result(stmt)
                })
            })
        }

        StmtKind::For { init, cond, update, body } => {
            unify_stmts(method, args, init, state).then_choose(move |st| {
                let init_stmts = st.result.clone();
                unify_opt_expr(method, args, cond.as_ref(), st.with_result(())).then_choose(
                    move |st2| {
                        let init_stmts = init_stmts.clone();
                        let cond_expr = st2.result.clone();
                        unify_expr_list(method, args, update, st2.with_result(())).then_choose(
                            move |st3| {
                                let init_stmts = init_stmts.clone();
                                let cond_expr = cond_expr.clone();
                                let update_exprs = st3.result.clone();
                                unify_stmt(method, args, body, st3.with_result(())).transform(
                                    move |st4| {
                                        let kind = StmtKind::For {
                                            init: init_stmts.clone(),
                                            cond: cond_expr.clone(),
                                            update: update_exprs.clone(),
                                            body: Box::new(st4.result.clone()),
                                        };
                                        let stmt = rebuild_stmt(node, kind);
                                        st4.with_result(stmt)
                                    },
                                )
                            },
                        )
                    },
                )
            })
        }

        StmtKind::Try { body, catches, finally } => {
            unify_block(method, args, body, state).then_choose(move |st| {
                let body_block = st.result.clone();
                unify_catches(method, args, catches, st.with_result(())).then_choose(
                    move |st2| {
                        let body_block = body_block.clone();
                        let catch_list = st2.result.clone();
                        unify_opt_block(method, args, finally.as_ref(), st2.with_result(()))
                            .transform(move |st3| {
                                let kind = StmtKind::Try {
                                    body: body_block.clone(),
                                    catches: catch_list.clone(),
                                    finally: st3.result.clone(),
                                };
                                let stmt = rebuild_stmt(node, kind);
                                st3.with_result(stmt)
                            })
                    },
                )
            })
        }

        StmtKind::Labeled { label, stmt } => {
            unify_stmt(method, args, stmt, state).transform(move |st| {
                let kind = StmtKind::Labeled {
                    label: label.clone(),
                    stmt: Box::new(st.result.clone()),
                };
                let stmt = rebuild_stmt(node, kind);
                st.with_result(stmt)
            })
        }

        StmtKind::Break { .. } | StmtKind::Continue { .. } => {
            Choice::of(state.with_result(node.clone()))
        }
    }
}

fn unify_opt_stmt<'a>(
    method: &'a PlaceholderMethod,
    args: &'a [UExpr],
    node: Option<&'a Stmt>,
    state: State<'a, ()>,
) -> Choice<'a, State<'a, Option<Stmt>>> {
    match node {
        None => Choice::of(state.with_result(None)),
        Some(n) => unify_stmt(method, args, n, state).transform(|st| {
            let result = st.result.clone();
            st.with_result(Some(result))
        }),
    }
}

fn unify_stmts<'a>(
    method: &'a PlaceholderMethod,
    args: &'a [UExpr],
    nodes: &'a [Stmt],
    state: State<'a, ()>,
) -> Choice<'a, State<'a, Vec<Stmt>>> {
    let mut choice = Choice::of(state.with_result(Vec::new()));
    for node in nodes {
        choice = choice.then_choose(move |st| {
            let acc = st.result.clone();
            unify_stmt(method, args, node, st.with_result(())).transform(move |st2| {
                let mut acc = acc.clone();
                acc.push(st2.result.clone());
                st2.with_result(acc)
            })
        });
    }
    choice
}

fn unify_block<'a>(
    method: &'a PlaceholderMethod,
    args: &'a [UExpr],
    block: &'a Block,
    state: State<'a, ()>,
) -> Choice<'a, State<'a, Block>> {
    unify_stmts(method, args, &block.stmts, state).transform(move |st| {
        let block = Block { stmts: st.result.clone(), span: block.span };
        st.with_result(block)
    })
}

fn unify_opt_block<'a>(
    method: &'a PlaceholderMethod,
    args: &'a [UExpr],
    block: Option<&'a Block>,
    state: State<'a, ()>,
) -> Choice<'a, State<'a, Option<Block>>> {
    match block {
        None => Choice::of(state.with_result(None)),
        Some(b) => unify_block(method, args, b, state).transform(|st| {
            let result = st.result.clone();
            st.with_result(Some(result))
        }),
    }
}

fn unify_catches<'a>(
    method: &'a PlaceholderMethod,
    args: &'a [UExpr],
    catches: &'a [Catch],
    state: State<'a, ()>,
) -> Choice<'a, State<'a, Vec<Catch>>> {
    let mut choice = Choice::of(state.with_result(Vec::new()));
    for c in catches {
        choice = choice.then_choose(move |st| {
            let acc = st.result.clone();
            unify_block(method, args, &c.body, st.with_result(())).transform(move |st2| {
                let mut acc = acc.clone();
                acc.push(Catch { param: c.param.clone(), body: st2.result.clone() });
                st2.with_result(acc)
            })
        });
    }
    choice
}

// ── Inlining captured implementations ──────────────────────────────────

/// Copy a captured implementation, replacing every parameter marker by
/// the inlining of the corresponding call-site argument.
fn substitute_expr(
    e: &Expr,
    args: &FxHashMap<&str, &UExpr>,
    inliner: &mut Inliner<'_>,
) -> Result<Expr, CouldNotResolveImport> {
    if let Some(p) = is_param_marker(e) {
        let arg = args
            .get(p)
            .unwrap_or_else(|| panic!("no argument for placeholder parameter `{p}`"));
        return arg.inline(inliner);
    }
    let kind = match &e.kind {
        ExprKind::Lit(_) | ExprKind::Ident(_) => e.kind.clone(),
        ExprKind::Select { base, name } => ExprKind::Select {
            base: Box::new(substitute_expr(base, args, inliner)?),
            name: name.clone(),
        },
        ExprKind::Call { callee, args: call_args } => ExprKind::Call {
            callee: Box::new(substitute_expr(callee, args, inliner)?),
            args: call_args
                .iter()
                .map(|a| substitute_expr(a, args, inliner))
                .collect::<Result<_, _>>()?,
        },
        ExprKind::Unary { op, operand } => ExprKind::Unary {
            op: *op,
            operand: Box::new(substitute_expr(operand, args, inliner)?),
        },
        ExprKind::Binary { op, lhs, rhs } => ExprKind::Binary {
            op: *op,
            lhs: Box::new(substitute_expr(lhs, args, inliner)?),
            rhs: Box::new(substitute_expr(rhs, args, inliner)?),
        },
        ExprKind::Assign { lhs, rhs } => ExprKind::Assign {
            lhs: Box::new(substitute_expr(lhs, args, inliner)?),
            rhs: Box::new(substitute_expr(rhs, args, inliner)?),
        },
        ExprKind::CompoundAssign { op, lhs, rhs } => ExprKind::CompoundAssign {
            op: *op,
            lhs: Box::new(substitute_expr(lhs, args, inliner)?),
            rhs: Box::new(substitute_expr(rhs, args, inliner)?),
        },
        ExprKind::Conditional { cond, then_expr, else_expr } => ExprKind::Conditional {
            cond: Box::new(substitute_expr(cond, args, inliner)?),
            then_expr: Box::new(substitute_expr(then_expr, args, inliner)?),
            else_expr: Box::new(substitute_expr(else_expr, args, inliner)?),
        },
        ExprKind::Paren(inner) => {
            ExprKind::Paren(Box::new(substitute_expr(inner, args, inliner)?))
        }
        ExprKind::Cast { ty, expr } => ExprKind::Cast {
            ty: ty.clone(),
            expr: Box::new(substitute_expr(expr, args, inliner)?),
        },
        ExprKind::InstanceOf { expr, ty } => ExprKind::InstanceOf {
            expr: Box::new(substitute_expr(expr, args, inliner)?),
            ty: ty.clone(),
        },
        ExprKind::ArrayAccess { array, index } => ExprKind::ArrayAccess {
            array: Box::new(substitute_expr(array, args, inliner)?),
            index: Box::new(substitute_expr(index, args, inliner)?),
        },
        ExprKind::NewClass { class, args: ctor_args } => ExprKind::NewClass {
            class: class.clone(),
            args: ctor_args
                .iter()
                .map(|a| substitute_expr(a, args, inliner))
                .collect::<Result<_, _>>()?,
        },
        ExprKind::NewArray { elem, dims, init } => ExprKind::NewArray {
            elem: elem.clone(),
            dims: dims
                .iter()
                .map(|d| substitute_expr(d, args, inliner))
                .collect::<Result<_, _>>()?,
            init: match init {
                Some(items) => Some(
                    items
                        .iter()
                        .map(|i| substitute_expr(i, args, inliner))
                        .collect::<Result<_, _>>()?,
                ),
                None => None,
            },
        },
    };
    Ok(Expr::typed(kind, e.ty.clone(), e.span))
}

fn substitute_block(
    b: &Block,
    args: &FxHashMap<&str, &UExpr>,
    inliner: &mut Inliner<'_>,
) -> Result<Block, CouldNotResolveImport> {
    Ok(Block {
        stmts: b.stmts.iter().map(|s| substitute_stmt(s, args, inliner)).collect::<Result<_, _>>()?,
        span: b.span,
    })
}

fn substitute_stmt(
    s: &Stmt,
    args: &FxHashMap<&str, &UExpr>,
    inliner: &mut Inliner<'_>,
) -> Result<Stmt, CouldNotResolveImport> {
    let kind = match &s.kind {
        StmtKind::Expr(e) => StmtKind::Expr(substitute_expr(e, args, inliner)?),
        StmtKind::VarDecl(d) => StmtKind::VarDecl(VarDecl {
            name: d.name.clone(),
            sym: d.sym,
            ty: d.ty.clone(),
            init: match &d.init {
                Some(init) => Some(substitute_expr(init, args, inliner)?),
                None => None,
            },
        }),
        StmtKind::Block(b) => StmtKind::Block(substitute_block(b, args, inliner)?),
        StmtKind::If { cond, then_stmt, else_stmt } => StmtKind::If {
            cond: substitute_expr(cond, args, inliner)?,
            then_stmt: Box::new(substitute_stmt(then_stmt, args, inliner)?),
            else_stmt: match else_stmt {
                Some(e) => Some(Box::new(substitute_stmt(e, args, inliner)?)),
                None => None,
            },
        },
        StmtKind::While { cond, body } => StmtKind::While {
            cond: substitute_expr(cond, args, inliner)?,
            body: Box::new(substitute_stmt(body, args, inliner)?),
        },
        StmtKind::DoWhile { body, cond } => StmtKind::DoWhile {
            body: Box::new(substitute_stmt(body, args, inliner)?),
            cond: substitute_expr(cond, args, inliner)?,
        },
        StmtKind::For { init, cond, update, body } => StmtKind::For {
            init: init.iter().map(|s| substitute_stmt(s, args, inliner)).collect::<Result<_, _>>()?,
            cond: match cond {
                Some(c) => Some(substitute_expr(c, args, inliner)?),
                None => None,
            },
            update: update
                .iter()
                .map(|e| substitute_expr(e, args, inliner))
                .collect::<Result<_, _>>()?,
            body: Box::new(substitute_stmt(body, args, inliner)?),
        },
        StmtKind::Try { body, catches, finally } => StmtKind::Try {
            body: substitute_block(body, args, inliner)?,
            catches: catches
                .iter()
                .map(|c| {
                    Ok(Catch {
                        param: c.param.clone(),
                        body: substitute_block(&c.body, args, inliner)?,
                    })
                })
                .collect::<Result<_, CouldNotResolveImport>>()?,
            finally: match finally {
                Some(f) => Some(substitute_block(f, args, inliner)?),
                None => None,
            },
        },
        StmtKind::Labeled { label, stmt } => StmtKind::Labeled {
            label: label.clone(),
            stmt: Box::new(substitute_stmt(stmt, args, inliner)?),
        },
        StmtKind::Break { .. } | StmtKind::Continue { .. } => s.kind.clone(),
        StmtKind::Return(value) => StmtKind::Return(match value {
            Some(v) => Some(substitute_expr(v, args, inliner)?),
            None => None,
        }),
        StmtKind::Throw(e) => StmtKind::Throw(substitute_expr(e, args, inliner)?),
    };
    Ok(Stmt::new(kind, s.span))
}

// ── The pre-scan used by statement placeholders ────────────────────────

fn scan_expr(
    e: &Expr,
    u: &Unifier<'_>,
    method: &PlaceholderMethod,
    args: &[UExpr],
    marks: &mut FxHashSet<String>,
) -> bool {
    for (param, arg) in method.params.iter().zip(args) {
        if let UExpr::FreeIdent(name) = arg {
            if let Some(bound) = u.bindings().expr(&Key::FreeIdent(name.clone())) {
                if equivalent_exprs(u.types(), e, bound) {
                    marks.insert(param.name.clone());
                    return true;
                }
            }
        }
    }
    if let ExprKind::Ident(Ident { res: Resolution::Local(sym), .. }) = &e.kind {
        for (_, binding) in u.bindings().iter() {
            if let Binding::LocalVar(v) = binding {
                if v.sym == *sym {
                    return false;
                }
            }
        }
    }
    let mut ok = true;
    e.for_each_child(&mut |child| {
        if ok && !scan_expr(child, u, method, args, marks) {
            ok = false;
        }
    });
    ok
}

fn scan_stmt(
    s: &Stmt,
    u: &Unifier<'_>,
    method: &PlaceholderMethod,
    args: &[UExpr],
    marks: &mut FxHashSet<String>,
) -> bool {
    let mut ok = true;
    for_each_stmt_expr(s, &mut |e| {
        if ok && !scan_expr(e, u, method, args, marks) {
            ok = false;
        }
    });
    ok
}
