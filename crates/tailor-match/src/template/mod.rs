//! Templates: the two concrete matching modes.
//!
//! `ExpressionTemplate` matches a single expression anywhere in a tree;
//! `BlockTemplate` matches a contiguous run of statements at any offset
//! in any block. Both layer the type-consistency check on top of
//! structural unification: the declared argument types (plus placeholder
//! return types, sorted by placeholder name) must admit a consistent
//! instantiation of the template's still-free type variables against the
//! types that actually bound.

mod block;
mod expression;

pub use block::{BlockTemplate, BlockTemplateMatch};
pub use expression::{ExpressionTemplate, ExpressionTemplateMatch};

use std::rc::Rc;

use tailor_syntax::ast::{Expr, ExprKind};
use tailor_types::{Ty, TypeVarDecl, Types};

use crate::bindings::{Binding, Key, TypeVarBinding};
use crate::pattern::uty::{UTy, UTypeVar};
use crate::pattern::UExpr;
use crate::placeholder::PlaceholderMethod;
use crate::unify::Unifier;

/// The metadata shared by both template shapes: rule type variables and
/// the declared argument types, in declaration order.
#[derive(Clone, Debug)]
pub(crate) struct TemplateCore {
    pub type_vars: Vec<UTypeVar>,
    pub args: Vec<(String, UTy)>,
}

impl TemplateCore {
    pub fn new(type_vars: Vec<UTypeVar>, args: Vec<(String, UTy)>) -> Self {
        TemplateCore { type_vars, args }
    }

    /// The type-consistency step. `ret_and_target` carries the declared
    /// return type and the matched node for expression templates; the
    /// expected return type is checked as an extra leading argument.
    /// Inference failure is an ordinary rejected candidate, not an error.
    pub fn typecheck<'a>(
        &self,
        u: Unifier<'a>,
        placeholders: &[Rc<PlaceholderMethod>],
        ret_and_target: Option<(&UTy, &Expr)>,
    ) -> Option<Unifier<'a>> {
        let inliner = u.create_inliner();
        let mut expected: Vec<Ty> = Vec::new();
        let mut actual: Vec<Ty> = Vec::new();

        if let Some((return_ty, target)) = ret_and_target {
            if !target.ty.is_void() {
                let ret = match return_ty.inline(&inliner) {
                    Ok(ty) => ty,
                    Err(e) => {
                        log::debug!("failed to resolve template return type: {e}");
                        return None;
                    }
                };
                expected.push(ret);
                actual.push(narrowed_target_ty(u.types(), target));
            }
        }

        for (name, declared) in &self.args {
            let free_key = Key::FreeIdent(name.clone());
            let repeated_key = Key::Repeated(name.clone());
            let bound_ty = if let Some(expr) = inliner.bindings.expr(&free_key) {
                Some(expr.ty.clone())
            } else if let Some(exprs) = inliner.bindings.expr_list(&repeated_key) {
                if exprs.is_empty() {
                    // A repeated variable that matched nothing constrains
                    // no types.
                    None
                } else {
                    let tys: Vec<Ty> = exprs.iter().map(|e| e.ty.clone()).collect();
                    Some(u.types().lub(&tys))
                }
            } else {
                None
            };
            if let Some(ty) = bound_ty {
                match declared.inline(&inliner) {
                    Ok(declared) => {
                        expected.push(declared);
                        actual.push(ty);
                    }
                    Err(e) => {
                        log::debug!("failed to resolve declared argument type: {e}");
                        return None;
                    }
                }
            }
        }

        let mut sorted: Vec<&Rc<PlaceholderMethod>> = placeholders.iter().collect();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));
        sorted.dedup_by(|a, b| a.name == b.name);
        for method in sorted {
            if let Some(captured) = inliner.bindings.expr(&method.expr_key()) {
                match method.return_ty.inline(&inliner) {
                    Ok(ret) => {
                        expected.push(ret);
                        actual.push(captured.ty.clone());
                    }
                    Err(e) => {
                        log::debug!("failed to resolve placeholder return type: {e}");
                        return None;
                    }
                }
            }
        }

        let mut free: Vec<TypeVarDecl> = Vec::new();
        for var in &self.type_vars {
            if u.bindings().contains(&Key::TypeVar(var.name.clone())) {
                continue;
            }
            let upper = match &var.upper {
                Some(bound) => match bound.inline(&inliner) {
                    Ok(ty) => Some(ty),
                    Err(e) => {
                        log::debug!("failed to resolve type variable bound: {e}");
                        return None;
                    }
                },
                None => None,
            };
            free.push(TypeVarDecl { name: var.name.clone(), upper });
        }

        if free.is_empty() && expected.is_empty() {
            return Some(u);
        }

        match u.types().infer(&free, &expected, &actual) {
            Ok(inst) => {
                let mut u = u;
                for var in free {
                    let ty = inst
                        .get(&var.name)
                        .cloned()
                        .expect("infer instantiates every free variable");
                    u.put_binding(Key::TypeVar(var.name), Binding::TypeVar(TypeVarBinding::of(ty)));
                }
                Some(u)
            }
            Err(e) => {
                log::debug!("no consistent instantiation: {e}");
                None
            }
        }
    }
}

/// The narrowest type a matched expression can be given. Conditional
/// expressions take the lub of their branch types (with null branches
/// deferring to the other side) instead of the wider declared type.
fn narrowed_target_ty(types: &Types, target: &Expr) -> Ty {
    if let ExprKind::Conditional { then_expr, else_expr, .. } = &target.strip_parens().kind {
        if then_expr.ty == Ty::Null {
            return else_expr.ty.clone();
        }
        if else_expr.ty == Ty::Null {
            return then_expr.ty.clone();
        }
        return types.lub(&[then_expr.ty.clone(), else_expr.ty.clone()]);
    }
    target.ty.clone()
}

/// The placeholder declarations mentioned by a pattern expression.
pub(crate) fn collect_placeholders(pattern: &UExpr, out: &mut Vec<Rc<PlaceholderMethod>>) {
    pattern.walk(&mut |e| {
        if let UExpr::Placeholder(p) = e {
            if !out.iter().any(|m| m.name == p.method.name) {
                out.push(Rc::clone(&p.method));
            }
        }
    });
}
