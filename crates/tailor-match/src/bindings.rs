//! The typed binding environment.
//!
//! `Bindings` maps kind-tagged keys to what a pattern element resolved
//! to. A key may be written only once per unifier lineage: a pattern
//! variable means the same thing everywhere it appears in one rule.
//! `replace` and `remove` are the two narrow, deliberate escape hatches;
//! anything else that writes twice is a programmer error and panics.

use std::fmt;

use rustc_hash::FxHashMap;
use tailor_syntax::ast::{Expr, LocalId, Stmt};
use tailor_types::Ty;

/// A kind-tagged binding key. Keys of different kinds never collide,
/// even with equal names.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    /// A free pattern variable, bound to a target expression.
    FreeIdent(String),
    /// A template-local variable, bound to the matched target variable.
    LocalVar(String),
    /// A repeated (vararg) variable, bound to a sequence of expressions.
    Repeated(String),
    /// A statement label.
    Label(String),
    /// A template type variable.
    TypeVar(String),
    /// An expression placeholder's captured implementation.
    PlaceholderExpr(String),
    /// A statement placeholder's captured implementation.
    PlaceholderStmts(String),
}

impl Key {
    pub fn name(&self) -> &str {
        match self {
            Key::FreeIdent(n)
            | Key::LocalVar(n)
            | Key::Repeated(n)
            | Key::Label(n)
            | Key::TypeVar(n)
            | Key::PlaceholderExpr(n)
            | Key::PlaceholderStmts(n) => n,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::FreeIdent(n) => write!(f, "free variable `{n}`"),
            Key::LocalVar(n) => write!(f, "local variable `{n}`"),
            Key::Repeated(n) => write!(f, "repeated variable `{n}`"),
            Key::Label(n) => write!(f, "label `{n}`"),
            Key::TypeVar(n) => write!(f, "type variable `{n}`"),
            Key::PlaceholderExpr(n) => write!(f, "placeholder expression `{n}`"),
            Key::PlaceholderStmts(n) => write!(f, "placeholder statements `{n}`"),
        }
    }
}

/// What a matched template-local variable declaration bound to.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalVarBinding {
    /// The target variable's name, used when inlining references to it.
    pub name: String,
    pub sym: LocalId,
    pub ty: Ty,
}

/// What a template type variable resolved to: a type, optionally backed
/// by the expression whose written type syntax should be reused.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeVarBinding {
    pub ty: Ty,
    pub origin: Option<Expr>,
}

impl TypeVarBinding {
    pub fn of(ty: Ty) -> Self {
        TypeVarBinding { ty, origin: None }
    }
}

/// A bound value; type-consistent per key kind.
#[derive(Clone, Debug, PartialEq)]
pub enum Binding {
    Expr(Expr),
    ExprList(Vec<Expr>),
    Stmts(Vec<Stmt>),
    LocalVar(LocalVarBinding),
    TypeVar(TypeVarBinding),
    Label(String),
}

/// The key-to-value map recording what every pattern element resolved to.
#[derive(Clone, Debug, Default)]
pub struct Bindings {
    map: FxHashMap<Key, Binding>,
}

impl Bindings {
    pub fn new() -> Self {
        Bindings::default()
    }

    /// Bind `key` to `value`. Panics if the key is already bound.
    pub fn insert(&mut self, key: Key, value: Binding) {
        let prev = self.map.insert(key.clone(), value);
        assert!(
            prev.is_none(),
            "{key} is already bound; a pattern variable must mean the same thing everywhere in one rule"
        );
    }

    /// Overwrite an existing binding. Panics if the key is not bound.
    /// Used only for iteratively refined type-variable instantiations.
    pub fn replace(&mut self, key: Key, value: Binding) {
        let prev = self.map.insert(key.clone(), value);
        assert!(prev.is_some(), "{key} cannot be replaced: it was never bound");
    }

    /// Clear a binding so a structurally ambiguous match can be retried
    /// with a different assignment.
    pub fn remove(&mut self, key: &Key) -> Option<Binding> {
        self.map.remove(key)
    }

    pub fn get(&self, key: &Key) -> Option<&Binding> {
        self.map.get(key)
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.map.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.map.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Binding)> {
        self.map.iter()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// The expression bound to `key`, if bound. Panics if the key is
    /// bound to a different kind of value.
    pub fn expr(&self, key: &Key) -> Option<&Expr> {
        self.get(key).map(|b| match b {
            Binding::Expr(e) => e,
            other => panic!("{key} is bound to {other:?}, not an expression"),
        })
    }

    pub fn expr_list(&self, key: &Key) -> Option<&[Expr]> {
        self.get(key).map(|b| match b {
            Binding::ExprList(list) => list.as_slice(),
            other => panic!("{key} is bound to {other:?}, not an expression list"),
        })
    }

    pub fn stmts(&self, key: &Key) -> Option<&[Stmt]> {
        self.get(key).map(|b| match b {
            Binding::Stmts(list) => list.as_slice(),
            other => panic!("{key} is bound to {other:?}, not a statement list"),
        })
    }

    pub fn local_var(&self, key: &Key) -> Option<&LocalVarBinding> {
        self.get(key).map(|b| match b {
            Binding::LocalVar(v) => v,
            other => panic!("{key} is bound to {other:?}, not a local variable"),
        })
    }

    pub fn type_var(&self, key: &Key) -> Option<&TypeVarBinding> {
        self.get(key).map(|b| match b {
            Binding::TypeVar(v) => v,
            other => panic!("{key} is bound to {other:?}, not a type"),
        })
    }

    pub fn label(&self, key: &Key) -> Option<&str> {
        self.get(key).map(|b| match b {
            Binding::Label(l) => l.as_str(),
            other => panic!("{key} is bound to {other:?}, not a label"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tailor_syntax::ast::{ExprKind, Lit};
    use tailor_syntax::span::Span;

    fn lit(v: i64) -> Expr {
        Expr::typed(ExprKind::Lit(Lit::Int(v)), Ty::int(), Span::DUMMY)
    }

    #[test]
    fn keys_of_different_kinds_do_not_collide() {
        let mut bindings = Bindings::new();
        bindings.insert(Key::FreeIdent("x".into()), Binding::Expr(lit(1)));
        bindings.insert(Key::TypeVar("x".into()), Binding::TypeVar(TypeVarBinding::of(Ty::int())));
        assert_eq!(bindings.len(), 2);
    }

    #[test]
    #[should_panic(expected = "already bound")]
    fn double_binding_panics() {
        let mut bindings = Bindings::new();
        bindings.insert(Key::FreeIdent("x".into()), Binding::Expr(lit(1)));
        bindings.insert(Key::FreeIdent("x".into()), Binding::Expr(lit(2)));
    }

    #[test]
    fn remove_then_rebind_is_allowed() {
        let mut bindings = Bindings::new();
        let key = Key::LocalVar("list".into());
        bindings.insert(
            key.clone(),
            Binding::LocalVar(LocalVarBinding { name: "a".into(), sym: LocalId(0), ty: Ty::int() }),
        );
        bindings.remove(&key);
        bindings.insert(
            key.clone(),
            Binding::LocalVar(LocalVarBinding { name: "b".into(), sym: LocalId(1), ty: Ty::int() }),
        );
        assert_eq!(bindings.local_var(&key).unwrap().name, "b");
    }

    #[test]
    #[should_panic(expected = "never bound")]
    fn replace_requires_an_existing_binding() {
        let mut bindings = Bindings::new();
        bindings.replace(Key::TypeVar("E".into()), Binding::TypeVar(TypeVarBinding::of(Ty::int())));
    }
}
