//! Pattern-side types.
//!
//! `UTy` is the template's view of a type: it may mention template type
//! variables, which unify against concrete types by binding them and
//! inline back to either the bound concrete type or a still-free
//! variable.

use tailor_types::{BoundKind, Prim, Ty};

use crate::bindings::{Binding, Key, TypeVarBinding};
use crate::choice::Choice;
use crate::error::CouldNotResolveImport;
use crate::inline::Inliner;
use crate::unify::Unifier;

/// A template type variable declaration with an optional upper bound.
#[derive(Clone, Debug, PartialEq)]
pub struct UTypeVar {
    pub name: String,
    pub upper: Option<UTy>,
}

impl UTypeVar {
    pub fn new(name: impl Into<String>) -> Self {
        UTypeVar { name: name.into(), upper: None }
    }

    pub fn bounded(name: impl Into<String>, upper: UTy) -> Self {
        UTypeVar { name: name.into(), upper: Some(upper) }
    }
}

/// A type as written in a template.
#[derive(Clone, Debug, PartialEq)]
pub enum UTy {
    Prim(Prim),
    Class { name: String, args: Vec<UTy> },
    Array(Box<UTy>),
    Var(String),
    Wildcard { kind: BoundKind, bound: Box<UTy> },
    Method { params: Vec<UTy>, ret: Box<UTy> },
}

impl UTy {
    pub fn boolean() -> UTy {
        UTy::Prim(Prim::Boolean)
    }

    pub fn int() -> UTy {
        UTy::Prim(Prim::Int)
    }

    pub fn long() -> UTy {
        UTy::Prim(Prim::Long)
    }

    pub fn byte() -> UTy {
        UTy::Prim(Prim::Byte)
    }

    pub fn void() -> UTy {
        UTy::Prim(Prim::Void)
    }

    pub fn class(name: impl Into<String>) -> UTy {
        UTy::Class { name: name.into(), args: Vec::new() }
    }

    pub fn generic(name: impl Into<String>, args: Vec<UTy>) -> UTy {
        UTy::Class { name: name.into(), args }
    }

    pub fn string() -> UTy {
        UTy::class("java.lang.String")
    }

    pub fn array(elem: UTy) -> UTy {
        UTy::Array(Box::new(elem))
    }

    pub fn var(name: impl Into<String>) -> UTy {
        UTy::Var(name.into())
    }

    pub fn wildcard(kind: BoundKind, bound: UTy) -> UTy {
        UTy::Wildcard { kind, bound: Box::new(bound) }
    }

    pub fn method(params: Vec<UTy>, ret: UTy) -> UTy {
        UTy::Method { params, ret: Box::new(ret) }
    }

    /// Unify this written type against a concrete type, binding template
    /// type variables on first sight and requiring consistency afterward.
    pub fn unify<'a>(&'a self, target: &'a Ty, u: Unifier<'a>) -> Choice<'a, Unifier<'a>> {
        match (self, target) {
            (UTy::Var(name), _) => {
                let key = Key::TypeVar(name.clone());
                let existing = u.bindings().type_var(&key).map(|b| b.ty.clone());
                match existing {
                    Some(bound) => Choice::when(bound == *target, u),
                    None => {
                        let mut u = u;
                        u.put_binding(key, Binding::TypeVar(TypeVarBinding::of(target.clone())));
                        Choice::of(u)
                    }
                }
            }
            (UTy::Prim(p), Ty::Prim(q)) => Choice::when(p == q, u),
            (UTy::Class { name, args }, Ty::Class(c)) => {
                if *name != c.name {
                    return Choice::none();
                }
                // A raw written type matches any parameterization.
                if args.is_empty() {
                    return Choice::of(u);
                }
                if args.len() != c.args.len() {
                    return Choice::none();
                }
                unify_ty_list(args, &c.args, u)
            }
            (UTy::Array(elem), Ty::Array(t)) => elem.unify(t.as_ref(), u),
            (UTy::Wildcard { kind, bound }, Ty::Wildcard(k, b)) => {
                if kind == k {
                    bound.unify(b.as_ref(), u)
                } else {
                    Choice::none()
                }
            }
            (UTy::Method { params, ret }, Ty::Method(m)) => {
                if params.len() != m.params.len() {
                    return Choice::none();
                }
                unify_ty_list(params, &m.params, u)
                    .then_choose(move |u| ret.unify(m.ret.as_ref(), u))
            }
            _ => Choice::none(),
        }
    }

    /// The concrete type this written type denotes under the current
    /// bindings. Unbound type variables stay symbolic.
    pub fn inline(&self, inliner: &Inliner<'_>) -> Result<Ty, CouldNotResolveImport> {
        Ok(match self {
            UTy::Prim(p) => Ty::Prim(*p),
            UTy::Class { name, args } => {
                let args: Result<Vec<Ty>, _> = args.iter().map(|a| a.inline(inliner)).collect();
                Ty::generic(name.clone(), args?)
            }
            UTy::Array(elem) => Ty::array(elem.inline(inliner)?),
            UTy::Var(name) => match inliner.bindings.type_var(&Key::TypeVar(name.clone())) {
                Some(binding) => binding.ty.clone(),
                None => Ty::var(name.clone()),
            },
            UTy::Wildcard { kind, bound } => Ty::wildcard(*kind, bound.inline(inliner)?),
            UTy::Method { params, ret } => {
                let params: Result<Vec<Ty>, _> =
                    params.iter().map(|p| p.inline(inliner)).collect();
                Ty::method(params?, ret.inline(inliner)?)
            }
        })
    }
}

pub(crate) fn unify_ty_list<'a>(
    patterns: &'a [UTy],
    targets: &'a [Ty],
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unify::Env;
    use tailor_types::Types;

    #[test]
    fn type_variable_binds_once_and_stays_consistent() {
        let types = Types::with_defaults();
        let env = Env::new(&types);
        let pattern = UTy::generic("java.util.List", vec![UTy::var("E")]);
        let string_list = Ty::generic("java.util.List", vec![Ty::string()]);
        let int_list = Ty::generic("java.util.List", vec![Ty::class("java.lang.Integer")]);

        let u = Unifier::new(env);
        let after_first = pattern.unify(&string_list, u).first().expect("first unify");
        assert_eq!(
            after_first.bindings().type_var(&Key::TypeVar("E".into())).unwrap().ty,
            Ty::string()
        );
        // The same variable must mean the same type on a second use.
        assert!(pattern.unify(&int_list, after_first.fork()).first().is_none());
        assert!(pattern.unify(&string_list, after_first).first().is_some());
    }

    #[test]
    fn raw_written_type_matches_any_parameterization() {
        let types = Types::with_defaults();
        let env = Env::new(&types);
        let pattern = UTy::class("java.util.List");
        let string_list = Ty::generic("java.util.List", vec![Ty::string()]);
        assert!(pattern.unify(&string_list, Unifier::new(env)).first().is_some());
    }
}
