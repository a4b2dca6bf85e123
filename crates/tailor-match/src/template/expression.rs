//! Expression templates: match and replace a single expression.

use std::rc::Rc;

use tailor_syntax::ast::Expr;
use tailor_syntax::span::Span;

use crate::choice::Choice;
use crate::error::CouldNotResolveImport;
use crate::inline::Inliner;
use crate::pattern::uty::{UTy, UTypeVar};
use crate::pattern::UExpr;
use crate::placeholder::PlaceholderMethod;
use crate::template::{collect_placeholders, TemplateCore};
use crate::unify::{Env, Unifier};

/// A template matching one expression anywhere in a target tree.
#[derive(Clone, Debug)]
pub struct ExpressionTemplate {
    core: TemplateCore,
    expr: UExpr,
    return_ty: UTy,
    placeholders: Vec<Rc<PlaceholderMethod>>,
}

/// One successful expression match: the matched node's span plus the
/// unifier that produced it.
#[derive(Clone, Debug)]
pub struct ExpressionTemplateMatch<'a> {
    pub span: Span,
    pub unifier: Unifier<'a>,
}

impl ExpressionTemplate {
    pub fn new(
        type_vars: Vec<UTypeVar>,
        args: Vec<(String, UTy)>,
        expr: UExpr,
        return_ty: UTy,
    ) -> Self {
        let mut placeholders = Vec::new();
        collect_placeholders(&expr, &mut placeholders);
        ExpressionTemplate {
            core: TemplateCore::new(type_vars, args),
            expr,
            return_ty,
            placeholders,
        }
    }

    /// A template with no type variables.
    pub fn simple(args: Vec<(String, UTy)>, expr: UExpr, return_ty: UTy) -> Self {
        ExpressionTemplate::new(Vec::new(), args, expr, return_ty)
    }

    pub fn expr(&self) -> &UExpr {
        &self.expr
    }

    pub fn return_ty(&self) -> &UTy {
        &self.return_ty
    }

    pub fn arg_names(&self) -> impl Iterator<Item = &str> {
        self.core.args.iter().map(|(name, _)| name.as_str())
    }

    /// Structural unification, placeholder re-verification, then the
    /// type-consistency check.
    pub fn unify<'a>(&'a self, target: &'a Expr, u: Unifier<'a>) -> Choice<'a, Unifier<'a>> {
        self.expr
            .unify(target, u)
            .condition(move |u| self.verify_placeholders(u))
            .then_option(move |u| {
                self.core
                    .typecheck(u, &self.placeholders, Some((&self.return_ty, target)))
            })
    }

    /// The first way this template matches the given node, if any.
    pub fn match_at<'a>(
        &'a self,
        target: &'a Expr,
        env: Env<'a>,
    ) -> Option<ExpressionTemplateMatch<'a>> {
        self.unify(target, Unifier::new(env))
            .first()
            .map(|unifier| ExpressionTemplateMatch { span: target.span, unifier })
    }

    /// Render this template as a replacement under completed bindings.
    pub fn inline(&self, inliner: &mut Inliner<'_>) -> Result<Expr, CouldNotResolveImport> {
        self.expr.inline(inliner)
    }

    /// The negated form of this template. Panics unless the return type
    /// is boolean; rule construction validates that first.
    pub fn negation(&self) -> ExpressionTemplate {
        assert_eq!(
            self.return_ty,
            UTy::boolean(),
            "return type must be boolean to generate a negation"
        );
        ExpressionTemplate::new(
            self.core.type_vars.clone(),
            self.core.args.clone(),
            self.expr.negate(),
            self.return_ty.clone(),
        )
    }

    fn verify_placeholders(&self, u: &Unifier<'_>) -> bool {
        let mut ok = true;
        self.expr.walk(&mut |e| {
            if let UExpr::Placeholder(p) = e {
                if !p.reverify(u) {
                    ok = false;
                }
            }
        });
        ok
    }
}
