//! Expression pattern nodes and their unification contract.
//!
//! `UExpr` is a closed sum type: unification dispatches by exhaustive
//! match on (pattern kind, target kind), so adding a node kind is a
//! compile-checked extension rather than a default-action fallback.
//! Every node knows how to unify against a concrete expression and how
//! to inline itself back into one under completed bindings.

use tailor_syntax::ast::{
    BinaryOp, Expr, ExprKind, Ident, Lit, Resolution, TyRef, UnaryOp,
};
use tailor_syntax::render;
use tailor_syntax::resolve::class_ref_fq;
use tailor_syntax::span::Span;
use tailor_types::Types;

use crate::bindings::{Binding, Key};
use crate::choice::Choice;
use crate::error::CouldNotResolveImport;
use crate::imports::top_level_class;
use crate::inline::Inliner;
use crate::pattern::uty::UTy;
use crate::placeholder::UPlaceholderExpr;
use crate::unify::Unifier;

/// An expression pattern.
#[derive(Clone, Debug, PartialEq)]
pub enum UExpr {
    /// A literal, matching the identical literal.
    Lit(Lit),
    /// A free template variable, binding any expression.
    FreeIdent(String),
    /// A reference to a template-local variable bound by a declaration
    /// pattern.
    LocalVarIdent(String),
    /// A reference to a class.
    ClassIdent { fq: String },
    /// A reference to a static member of a class.
    StaticSelect { class: String, member: String },
    /// An instance member select.
    Select { base: Box<UExpr>, name: String },
    /// A method invocation.
    Call { callee: Box<UExpr>, args: Vec<UExpr> },
    Unary { op: UnaryOp, operand: Box<UExpr> },
    Binary { op: BinaryOp, lhs: Box<UExpr>, rhs: Box<UExpr> },
    /// `cond ? a : b`. The negated condition is precomputed at
    /// construction so the backward matching strategy has a pattern to
    /// run against.
    Conditional {
        cond: Box<UExpr>,
        negated_cond: Box<UExpr>,
        then_expr: Box<UExpr>,
        else_expr: Box<UExpr>,
    },
    Assign { lhs: Box<UExpr>, rhs: Box<UExpr> },
    CompoundAssign { op: BinaryOp, lhs: Box<UExpr>, rhs: Box<UExpr> },
    ArrayAccess { array: Box<UExpr>, index: Box<UExpr> },
    Paren(Box<UExpr>),
    Cast { ty: UTy, expr: Box<UExpr> },
    InstanceOf { expr: Box<UExpr>, ty: UTy },
    NewClass { class: UTy, args: Vec<UExpr> },
    NewArray { elem: UTy, dims: Vec<UExpr>, init: Option<Vec<UExpr>> },
    /// Any one of the alternatives, tried in order.
    AnyOf(Vec<UExpr>),
    /// A repeated (vararg) variable: as the last argument of a call it
    /// matches the whole run of trailing arguments.
    Repeated(String),
    /// A placeholder invocation (higher-order matching).
    Placeholder(UPlaceholderExpr),
}

impl UExpr {
    pub fn free(name: impl Into<String>) -> UExpr {
        UExpr::FreeIdent(name.into())
    }

    pub fn local(name: impl Into<String>) -> UExpr {
        UExpr::LocalVarIdent(name.into())
    }

    pub fn class_ident(fq: impl Into<String>) -> UExpr {
        UExpr::ClassIdent { fq: fq.into() }
    }

    pub fn static_select(class: impl Into<String>, member: impl Into<String>) -> UExpr {
        UExpr::StaticSelect { class: class.into(), member: member.into() }
    }

    pub fn int_lit(value: i64) -> UExpr {
        UExpr::Lit(Lit::Int(value))
    }

    pub fn long_lit(value: i64) -> UExpr {
        UExpr::Lit(Lit::Long(value))
    }

    pub fn str_lit(value: impl Into<String>) -> UExpr {
        UExpr::Lit(Lit::Str(value.into()))
    }

    pub fn bool_lit(value: bool) -> UExpr {
        UExpr::Lit(Lit::Bool(value))
    }

    pub fn paren(inner: UExpr) -> UExpr {
        UExpr::Paren(Box::new(inner))
    }

    pub fn unary(op: UnaryOp, operand: UExpr) -> UExpr {
        UExpr::Unary { op, operand: Box::new(operand) }
    }

    pub fn binary(op: BinaryOp, lhs: UExpr, rhs: UExpr) -> UExpr {
        UExpr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }
    }

    /// `cond ? then_expr : else_expr`, with the negated condition
    /// precomputed for the swapped-branches matching strategy.
    pub fn conditional(cond: UExpr, then_expr: UExpr, else_expr: UExpr) -> UExpr {
        let negated_cond = cond.negate();
        UExpr::Conditional {
            cond: Box::new(cond),
            negated_cond: Box::new(negated_cond),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        }
    }

    pub fn select(base: UExpr, name: impl Into<String>) -> UExpr {
        UExpr::Select { base: Box::new(base), name: name.into() }
    }

    pub fn call(callee: UExpr, args: Vec<UExpr>) -> UExpr {
        UExpr::Call { callee: Box::new(callee), args }
    }

    pub fn assign(lhs: UExpr, rhs: UExpr) -> UExpr {
        UExpr::Assign { lhs: Box::new(lhs), rhs: Box::new(rhs) }
    }

    pub fn compound_assign(op: BinaryOp, lhs: UExpr, rhs: UExpr) -> UExpr {
        UExpr::CompoundAssign { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }
    }

    pub fn array_access(array: UExpr, index: UExpr) -> UExpr {
        UExpr::ArrayAccess { array: Box::new(array), index: Box::new(index) }
    }

    pub fn cast(ty: UTy, expr: UExpr) -> UExpr {
        UExpr::Cast { ty, expr: Box::new(expr) }
    }

    pub fn instance_of(expr: UExpr, ty: UTy) -> UExpr {
        UExpr::InstanceOf { expr: Box::new(expr), ty }
    }

    pub fn new_class(class: UTy, args: Vec<UExpr>) -> UExpr {
        UExpr::NewClass { class, args }
    }

    pub fn new_array(elem: UTy, dims: Vec<UExpr>, init: Option<Vec<UExpr>>) -> UExpr {
        UExpr::NewArray { elem, dims, init }
    }

    pub fn any_of(options: Vec<UExpr>) -> UExpr {
        UExpr::AnyOf(options)
    }

    pub fn repeated(name: impl Into<String>) -> UExpr {
        UExpr::Repeated(name.into())
    }

    /// The logically negated pattern: the operator-negation table for
    /// comparisons, De Morgan for `&&`/`||`, unwrapping for `!`, branch
    /// negation for conditionals, and a `!(...)` wrapper for everything
    /// else.
    pub fn negate(&self) -> UExpr {
        match self {
            UExpr::Binary { op, lhs, rhs } => {
                if let Some(neg) = op.negation() {
                    UExpr::Binary { op: neg, lhs: lhs.clone(), rhs: rhs.clone() }
                } else if let Some(dual) = op.de_morgan() {
                    UExpr::Binary {
                        op: dual,
                        lhs: Box::new(lhs.negate()),
                        rhs: Box::new(rhs.negate()),
                    }
                } else {
                    default_negation(self)
                }
            }
            UExpr::Unary { op: UnaryOp::Not, operand } => (**operand).clone(),
            UExpr::Paren(inner) => UExpr::paren(inner.negate()),
            UExpr::Conditional { cond, then_expr, else_expr, .. } => {
                UExpr::conditional((**cond).clone(), then_expr.negate(), else_expr.negate())
            }
            UExpr::Lit(Lit::Bool(b)) => UExpr::Lit(Lit::Bool(!b)),
            UExpr::AnyOf(options) => UExpr::AnyOf(options.iter().map(UExpr::negate).collect()),
            _ => default_negation(self),
        }
    }

    /// Visit this pattern and every sub-pattern, preorder, including
    /// placeholder arguments.
    pub fn walk(&self, f: &mut dyn FnMut(&UExpr)) {
        f(self);
        match self {
            UExpr::Lit(_)
            | UExpr::FreeIdent(_)
            | UExpr::LocalVarIdent(_)
            | UExpr::ClassIdent { .. }
            | UExpr::StaticSelect { .. }
            | UExpr::Repeated(_) => {}
            UExpr::Select { base, .. } => base.walk(f),
            UExpr::Call { callee, args } => {
                callee.walk(f);
                args.iter().for_each(|a| a.walk(f));
            }
            UExpr::Unary { operand, .. } => operand.walk(f),
            UExpr::Binary { lhs, rhs, .. }
            | UExpr::Assign { lhs, rhs }
            | UExpr::CompoundAssign { lhs, rhs, .. } => {
                lhs.walk(f);
                rhs.walk(f);
            }
            UExpr::Conditional { cond, then_expr, else_expr, .. } => {
                cond.walk(f);
                then_expr.walk(f);
                else_expr.walk(f);
            }
            UExpr::ArrayAccess { array, index } => {
                array.walk(f);
                index.walk(f);
            }
            UExpr::Paren(inner) => inner.walk(f),
            UExpr::Cast { expr, .. } | UExpr::InstanceOf { expr, .. } => expr.walk(f),
            UExpr::NewClass { args, .. } => args.iter().for_each(|a| a.walk(f)),
            UExpr::NewArray { dims, init, .. } => {
                dims.iter().for_each(|d| d.walk(f));
                if let Some(init) = init {
                    init.iter().for_each(|i| i.walk(f));
                }
            }
            UExpr::AnyOf(options) => options.iter().for_each(|o| o.walk(f)),
            UExpr::Placeholder(p) => p.args.iter().for_each(|a| a.walk(f)),
        }
    }

    /// All the ways this pattern unifies with `target`, as successor
    /// unifiers.
    pub fn unify<'a>(&'a self, target: &'a Expr, u: Unifier<'a>) -> Choice<'a, Unifier<'a>> {
        // Whole-node binders see parentheses as part of what they bind;
        // structural patterns look through them.
        match self {
            UExpr::FreeIdent(_)
            | UExpr::Repeated(_)
            | UExpr::Placeholder(_)
            | UExpr::AnyOf(_)
            | UExpr::Paren(_) => {}
            _ => {
                if let ExprKind::Paren(inner) = &target.kind {
                    return self.unify(inner, u);
                }
            }
        }

        match (self, &target.kind) {
            (UExpr::Lit(lit), ExprKind::Lit(t)) => Choice::when(lit == t, u),

            (UExpr::FreeIdent(name), _) => {
                let key = Key::FreeIdent(name.clone());
                if u.bindings().contains(&key) {
                    let consistent = {
                        let bound = u.bindings().expr(&key).expect("checked above");
                        equivalent_exprs(u.types(), bound, target)
                    };
                    return Choice::when(consistent, u);
                }
                if references_bound_local(target, &u) {
                    return Choice::none();
                }
                let mut u = u;
                u.put_binding(key, Binding::Expr(target.clone()));
                Choice::of(u)
            }

            (UExpr::LocalVarIdent(name), ExprKind::Ident(id)) => {
                let key = Key::LocalVar(name.clone());
                let consistent = match (u.bindings().local_var(&key), &id.res) {
                    (Some(binding), Resolution::Local(sym)) => binding.sym == *sym,
                    _ => false,
                };
                Choice::when(consistent, u)
            }

            (UExpr::ClassIdent { fq }, ExprKind::Ident(id)) => {
                let consistent = matches!(&id.res, Resolution::Class(c) if c == fq);
                Choice::when(consistent, u)
            }

            (UExpr::StaticSelect { class, member }, _) => {
                let consistent = match static_target(target) {
                    Some((c, m)) => c == class.as_str() && m == member.as_str(),
                    None => false,
                };
                Choice::when(consistent, u)
            }

            (UExpr::Select { base, name }, ExprKind::Select { base: tb, name: tn }) => {
                if name != tn {
                    return Choice::none();
                }
                base.unify(tb.as_ref(), u)
            }

            (UExpr::Call { callee, args }, ExprKind::Call { callee: tc, args: targs }) => {
                callee
                    .unify(tc.as_ref(), u)
                    .then_choose(move |u| unify_args(args, targs, u))
            }

            (UExpr::Unary { op, operand }, ExprKind::Unary { op: top, operand: t }) => {
                if op != top {
                    return Choice::none();
                }
                operand.unify(t.as_ref(), u)
            }

            (UExpr::Binary { op, lhs, rhs }, ExprKind::Binary { op: top, lhs: tl, rhs: tr }) => {
                if op != top {
                    return Choice::none();
                }
                lhs.unify(tl.as_ref(), u)
                    .then_choose(move |u| rhs.unify(tr.as_ref(), u))
            }

            (
                UExpr::Conditional { cond, negated_cond, then_expr, else_expr },
                ExprKind::Conditional { cond: tc, then_expr: tt, else_expr: te },
            ) => {
                let forward = cond
                    .unify(tc.as_ref(), u.fork())
                    .then_choose(move |u| then_expr.unify(tt.as_ref(), u))
                    .then_choose(move |u| else_expr.unify(te.as_ref(), u));
                let backward = negated_cond
                    .unify(tc.as_ref(), u.fork())
                    .then_choose(move |u| then_expr.unify(te.as_ref(), u))
                    .then_choose(move |u| else_expr.unify(tt.as_ref(), u));
                forward.or(backward)
            }

            (UExpr::Assign { lhs, rhs }, ExprKind::Assign { lhs: tl, rhs: tr }) => {
                lhs.unify(tl.as_ref(), u)
                    .then_choose(move |u| rhs.unify(tr.as_ref(), u))
            }

            (
                UExpr::CompoundAssign { op, lhs, rhs },
                ExprKind::CompoundAssign { op: top, lhs: tl, rhs: tr },
            ) => {
                if op != top {
                    return Choice::none();
                }
                lhs.unify(tl.as_ref(), u)
                    .then_choose(move |u| rhs.unify(tr.as_ref(), u))
            }

            (UExpr::ArrayAccess { array, index }, ExprKind::ArrayAccess { array: ta, index: ti }) => {
                array
                    .unify(ta.as_ref(), u)
                    .then_choose(move |u| index.unify(ti.as_ref(), u))
            }

            (UExpr::Paren(inner), _) => {
                let t = match &target.kind {
                    ExprKind::Paren(ti) => ti.as_ref(),
                    _ => target,
                };
                inner.unify(t, u)
            }

            (UExpr::Cast { ty, expr }, ExprKind::Cast { ty: tt, expr: te }) => {
                ty.unify(&tt.ty, u).then_choose(move |u| expr.unify(te.as_ref(), u))
            }

            (UExpr::InstanceOf { expr, ty }, ExprKind::InstanceOf { expr: te, ty: tt }) => {
                expr.unify(te.as_ref(), u).then_choose(move |u| ty.unify(&tt.ty, u))
            }

            (UExpr::NewClass { class, args }, ExprKind::NewClass { class: tc, args: targs }) => {
                class.unify(&tc.ty, u).then_choose(move |u| unify_args(args, targs, u))
            }

            (
                UExpr::NewArray { elem, dims, init },
                ExprKind::NewArray { elem: te, dims: tdims, init: tinit },
            ) => {
                // Nullable sub-components unify only pairwise-present.
                let choice = elem
                    .unify(&te.ty, u)
                    .then_choose(move |u| unify_all(dims, tdims, u));
                match (init, tinit) {
                    (None, None) => choice,
                    (Some(pi), Some(ti)) => {
                        choice.then_choose(move |u| unify_args(pi, ti, u))
                    }
                    _ => Choice::none(),
                }
            }

            (UExpr::AnyOf(options), _) => {
                Choice::any(options.iter().map(|o| o.unify(target, u.fork())).collect())
            }

            (UExpr::Placeholder(p), _) => p.unify(target, u),

            _ => Choice::none(),
        }
    }

    /// Reconstruct a concrete expression from this pattern under
    /// completed bindings.
    pub fn inline(&self, inliner: &mut Inliner<'_>) -> Result<Expr, CouldNotResolveImport> {
        match self {
            UExpr::Lit(lit) => Ok(Expr::typed(ExprKind::Lit(lit.clone()), lit.ty(), Span::DUMMY)),

            UExpr::FreeIdent(name) => {
                let key = Key::FreeIdent(name.clone());
                let bound = inliner
                    .bindings
                    .expr(&key)
                    .unwrap_or_else(|| panic!("no binding for {key}"));
                Ok(bound.clone())
            }

            UExpr::LocalVarIdent(name) => {
                let key = Key::LocalVar(name.clone());
                let binding = inliner
                    .bindings
                    .local_var(&key)
                    .unwrap_or_else(|| panic!("no binding for {key}"));
                Ok(Expr::typed(
                    ExprKind::Ident(Ident {
                        name: binding.name.clone(),
                        res: Resolution::Local(binding.sym),
                    }),
                    binding.ty.clone(),
                    Span::DUMMY,
                ))
            }

            UExpr::ClassIdent { fq } => {
                let policy = inliner.env().policy;
                policy.class_reference(inliner, top_level_class(fq), fq)
            }

            UExpr::StaticSelect { class, member } => {
                let policy = inliner.env().policy;
                policy.static_reference(inliner, top_level_class(class), class, member)
            }

            UExpr::Select { base, name } => {
                let base = base.inline(inliner)?;
                Ok(Expr::new(
                    ExprKind::Select { base: Box::new(base), name: name.clone() },
                    Span::DUMMY,
                ))
            }

            UExpr::Call { callee, args } => {
                let callee = callee.inline(inliner)?;
                let args = inline_args(args, inliner)?;
                Ok(Expr::new(
                    ExprKind::Call { callee: Box::new(callee), args },
                    Span::DUMMY,
                ))
            }

            UExpr::Unary { op, operand } => {
                let operand = operand.inline(inliner)?;
                Ok(Expr::new(ExprKind::Unary { op: *op, operand: Box::new(operand) }, Span::DUMMY))
            }

            UExpr::Binary { op, lhs, rhs } => {
                let lhs = lhs.inline(inliner)?;
                let rhs = rhs.inline(inliner)?;
                Ok(Expr::new(
                    ExprKind::Binary { op: *op, lhs: Box::new(lhs), rhs: Box::new(rhs) },
                    Span::DUMMY,
                ))
            }

            UExpr::Conditional { cond, then_expr, else_expr, .. } => {
                let cond = cond.inline(inliner)?;
                let then_expr = then_expr.inline(inliner)?;
                let else_expr = else_expr.inline(inliner)?;
                Ok(Expr::new(
                    ExprKind::Conditional {
                        cond: Box::new(cond),
                        then_expr: Box::new(then_expr),
                        else_expr: Box::new(else_expr),
                    },
                    Span::DUMMY,
                ))
            }

            UExpr::Assign { lhs, rhs } => {
                let lhs = lhs.inline(inliner)?;
                let rhs = rhs.inline(inliner)?;
                Ok(Expr::new(
                    ExprKind::Assign { lhs: Box::new(lhs), rhs: Box::new(rhs) },
                    Span::DUMMY,
                ))
            }

            UExpr::CompoundAssign { op, lhs, rhs } => {
                let lhs = lhs.inline(inliner)?;
                let rhs = rhs.inline(inliner)?;
                Ok(Expr::new(
                    ExprKind::CompoundAssign { op: *op, lhs: Box::new(lhs), rhs: Box::new(rhs) },
                    Span::DUMMY,
                ))
            }

            UExpr::ArrayAccess { array, index } => {
                let array = array.inline(inliner)?;
                let index = index.inline(inliner)?;
                Ok(Expr::new(
                    ExprKind::ArrayAccess { array: Box::new(array), index: Box::new(index) },
                    Span::DUMMY,
                ))
            }

            UExpr::Paren(inner) => {
                let inner = inner.inline(inliner)?;
                let ty = inner.ty.clone();
                Ok(Expr::typed(ExprKind::Paren(Box::new(inner)), ty, Span::DUMMY))
            }

            UExpr::Cast { ty, expr } => {
                let ty = self::inline_ty_ref(ty, inliner)?;
                let expr = expr.inline(inliner)?;
                Ok(Expr::new(ExprKind::Cast { ty, expr: Box::new(expr) }, Span::DUMMY))
            }

            UExpr::InstanceOf { expr, ty } => {
                let expr = expr.inline(inliner)?;
                let ty = self::inline_ty_ref(ty, inliner)?;
                Ok(Expr::new(ExprKind::InstanceOf { expr: Box::new(expr), ty }, Span::DUMMY))
            }

            UExpr::NewClass { class, args } => {
                let class = self::inline_ty_ref(class, inliner)?;
                let args = inline_args(args, inliner)?;
                Ok(Expr::new(ExprKind::NewClass { class, args }, Span::DUMMY))
            }

            UExpr::NewArray { elem, dims, init } => {
                let elem = self::inline_ty_ref(elem, inliner)?;
                let dims = dims.iter().map(|d| d.inline(inliner)).collect::<Result<_, _>>()?;
                let init = match init {
                    Some(items) => Some(inline_args(items, inliner)?),
                    None => None,
                };
                Ok(Expr::new(ExprKind::NewArray { elem, dims, init }, Span::DUMMY))
            }

            UExpr::AnyOf(_) => panic!("anyOf cannot appear in an after-template"),

            UExpr::Repeated(name) => {
                panic!("repeated variable `{name}` can only be inlined inside an argument list")
            }

            UExpr::Placeholder(p) => p.inline(inliner),
        }
    }
}

fn default_negation(pattern: &UExpr) -> UExpr {
    let operand = match pattern {
        UExpr::Lit(_)
        | UExpr::FreeIdent(_)
        | UExpr::LocalVarIdent(_)
        | UExpr::ClassIdent { .. }
        | UExpr::StaticSelect { .. }
        | UExpr::Select { .. }
        | UExpr::Call { .. }
        | UExpr::ArrayAccess { .. }
        | UExpr::Paren(_)
        | UExpr::Placeholder(_) => pattern.clone(),
        _ => UExpr::paren(pattern.clone()),
    };
    UExpr::unary(UnaryOp::Not, operand)
}

/// The (class, member) a target expression statically refers to, either
/// as an explicit select off a class reference or as a resolved static
/// member identifier.
fn static_target(target: &Expr) -> Option<(&str, &str)> {
    match &target.kind {
        ExprKind::Select { base, name } => class_ref_fq(base).map(|c| (c, name.as_str())),
        ExprKind::Ident(Ident { res: Resolution::StaticMember { class, member }, .. }) => {
            Some((class.as_str(), member.as_str()))
        }
        _ => None,
    }
}

/// Pairwise unification with no repeated-variable handling.
pub(crate) fn unify_all<'a>(
    patterns: &'a [UExpr],
    targets: &'a [Expr],
    u: Unifier<'a>,
) -> Choice<'a, Unifier<'a>> {
    if patterns.len() != targets.len() {
        return Choice::none();
    }
    let mut choice = Choice::of(u);
    for (p, t) in patterns.iter().zip(targets) {
        choice = choice.then_choose(move |u| p.unify(t, u));
    }
    choice
}

/// Argument-list unification: if the last pattern argument is a repeated
/// variable, the leading arguments unify pairwise and the whole run of
/// trailing target arguments is collected into a sequence binding.
pub(crate) fn unify_args<'a>(
    patterns: &'a [UExpr],
    targets: &'a [Expr],
    u: Unifier<'a>,
) -> Choice<'a, Unifier<'a>> {
    if let Some(UExpr::Repeated(name)) = patterns.last() {
        let fixed = &patterns[..patterns.len() - 1];
        if targets.len() < fixed.len() {
            return Choice::none();
        }
        let (tfixed, trest) = targets.split_at(fixed.len());
        return unify_all(fixed, tfixed, u).then_option(move |u| {
            for t in trest {
                if references_bound_local(t, &u) {
                    return None;
                }
            }
            let mut u = u.fork();
            u.put_binding(Key::Repeated(name.clone()), Binding::ExprList(trest.to_vec()));
            Some(u)
        });
    }
    unify_all(patterns, targets, u)
}

/// Inline an argument list, splicing repeated-variable bindings.
pub(crate) fn inline_args(
    patterns: &[UExpr],
    inliner: &mut Inliner<'_>,
) -> Result<Vec<Expr>, CouldNotResolveImport> {
    let mut out = Vec::new();
    for p in patterns {
        if let UExpr::Repeated(name) = p {
            let key = Key::Repeated(name.clone());
            let bound = inliner
                .bindings
                .expr_list(&key)
                .unwrap_or_else(|| panic!("no binding for {key}"));
            out.extend(bound.iter().cloned());
        } else {
            out.push(p.inline(inliner)?);
        }
    }
    Ok(out)
}

fn inline_ty_ref(ty: &UTy, inliner: &mut Inliner<'_>) -> Result<TyRef, CouldNotResolveImport> {
    let concrete = ty.inline(inliner)?;
    let written = inliner.type_text(&concrete)?;
    Ok(TyRef::synthesized(concrete, written))
}

/// Whether `expr` references any local variable already bound by the
/// pattern. A free variable may not capture the rule's own locals.
pub(crate) fn references_bound_local(expr: &Expr, u: &Unifier<'_>) -> bool {
    let mut found = false;
    expr.walk(&mut |e| {
        if found {
            return;
        }
        if let ExprKind::Ident(Ident { res: Resolution::Local(sym), .. }) = &e.kind {
            for (_, binding) in u.bindings().iter() {
                if let Binding::LocalVar(v) = binding {
                    if v.sym == *sym {
                        found = true;
                        return;
                    }
                }
            }
        }
    });
    found
}

/// The heuristic equivalence used for repeated free-variable sightings
/// and the forbidden-reference check: same resolved type and identical
/// rendered text.
pub(crate) fn equivalent_exprs(types: &Types, a: &Expr, b: &Expr) -> bool {
    types.is_same(&a.ty, &b.ty) && render::expr(a) == render::expr(b)
}
