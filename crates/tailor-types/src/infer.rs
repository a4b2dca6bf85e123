//! Subtyping, least upper bounds, and instantiation inference.
//!
//! `Types` holds the registered class hierarchy and answers the queries the
//! matching engine needs: `is_subtype`, `lub`, and `infer` -- the structural
//! instantiation check used to decide whether a structurally matched
//! template is also type-consistent. `infer` resolves the template's free
//! type variables through `ena`'s union-find table and verifies every
//! expected/actual pair (and every declared bound) under the resulting
//! substitution.

use std::fmt;

use ena::unify::InPlaceUnificationTable;
use rustc_hash::FxHashMap;

use crate::ty::{BoundKind, ClassTy, Prim, Ty};

/// A template type variable declaration: a name plus an optional upper
/// bound (`E extends Enum<E>`). Bounds may reference the variable itself.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeVarDecl {
    pub name: String,
    pub upper: Option<Ty>,
}

impl TypeVarDecl {
    pub fn new(name: impl Into<String>) -> Self {
        TypeVarDecl { name: name.into(), upper: None }
    }

    pub fn bounded(name: impl Into<String>, upper: Ty) -> Self {
        TypeVarDecl { name: name.into(), upper: Some(upper) }
    }
}

/// A consistent assignment of types to free type variables.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Instantiation {
    map: FxHashMap<String, Ty>,
}

impl Instantiation {
    pub fn get(&self, name: &str) -> Option<&Ty> {
        self.map.get(name)
    }

    /// Substitute the instantiated variables into `ty`.
    pub fn apply(&self, ty: &Ty) -> Ty {
        ty.subst(&|name| self.map.get(name).cloned())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Ty)> {
        self.map.iter()
    }
}

/// Why an instantiation could not be found.
#[derive(Clone, Debug, PartialEq)]
pub enum InferError {
    /// Expected and actual type lists have different lengths.
    ArityMismatch { expected: usize, actual: usize },
    /// An expected/actual pair is inconsistent under every instantiation.
    Mismatch { expected: Ty, actual: Ty },
    /// A free type variable is never constrained by any pair.
    Unresolved(String),
    /// Two exact constraints on the same variable disagree.
    Conflict { var: String, first: Ty, second: Ty },
    /// The inferred instantiation violates a declared bound.
    BoundViolation { var: String, ty: Ty, bound: Ty },
}

impl fmt::Display for InferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferError::ArityMismatch { expected, actual } => {
                write!(f, "expected {expected} argument types, found {actual}")
            }
            InferError::Mismatch { expected, actual } => {
                write!(f, "type mismatch: expected {expected}, found {actual}")
            }
            InferError::Unresolved(name) => {
                write!(f, "type variable {name} could not be instantiated")
            }
            InferError::Conflict { var, first, second } => {
                write!(f, "conflicting instantiations for {var}: {first} vs {second}")
            }
            InferError::BoundViolation { var, ty, bound } => {
                write!(f, "{ty} does not satisfy the bound {bound} of {var}")
            }
        }
    }
}

impl std::error::Error for InferError {}

#[derive(Clone, Debug)]
struct ClassDef {
    params: Vec<String>,
    supers: Vec<Ty>,
}

/// The registered class hierarchy and type oracle.
///
/// Classes must be registered before they participate in subtype or lub
/// queries; unknown class names are unrelated to everything but
/// `java.lang.Object`.
#[derive(Clone, Debug, Default)]
pub struct Types {
    classes: FxHashMap<String, ClassDef>,
}

impl Types {
    pub fn new() -> Self {
        Types::default()
    }

    /// A hierarchy pre-populated with the core `java.lang` and
    /// `java.util` shapes the engine's own tests lean on.
    pub fn with_defaults() -> Self {
        let mut types = Types::new();
        types.add_class("java.lang.Object", &[], vec![]);
        types.add_class("java.lang.CharSequence", &[], vec![]);
        types.add_class("java.lang.String", &[], vec![Ty::class("java.lang.CharSequence")]);
        types.add_class("java.lang.Number", &[], vec![]);
        types.add_class("java.lang.Integer", &[], vec![Ty::class("java.lang.Number")]);
        types.add_class("java.lang.Long", &[], vec![Ty::class("java.lang.Number")]);
        types.add_class("java.lang.Double", &[], vec![Ty::class("java.lang.Number")]);
        types.add_class("java.lang.Float", &[], vec![Ty::class("java.lang.Number")]);
        types.add_class("java.lang.Short", &[], vec![Ty::class("java.lang.Number")]);
        types.add_class("java.lang.Byte", &[], vec![Ty::class("java.lang.Number")]);
        types.add_class("java.lang.Boolean", &[], vec![]);
        types.add_class("java.lang.Character", &[], vec![]);
        types.add_class("java.lang.Enum", &["E"], vec![]);
        types.add_class("java.lang.Iterable", &["T"], vec![]);
        types.add_class(
            "java.util.Collection",
            &["E"],
            vec![Ty::generic("java.lang.Iterable", vec![Ty::var("E")])],
        );
        types.add_class(
            "java.util.List",
            &["E"],
            vec![Ty::generic("java.util.Collection", vec![Ty::var("E")])],
        );
        types.add_class(
            "java.util.ArrayList",
            &["E"],
            vec![Ty::generic("java.util.List", vec![Ty::var("E")])],
        );
        types.add_class("java.util.Comparator", &["T"], vec![]);
        types.add_class("java.util.Collections", &[], vec![]);
        types
    }

    /// Register a class with its type parameters and direct supertypes.
    ///
    /// Supertypes may reference the class's own parameters by name.
    pub fn add_class(&mut self, name: impl Into<String>, params: &[&str], supers: Vec<Ty>) {
        self.classes.insert(
            name.into(),
            ClassDef { params: params.iter().map(|p| (*p).to_owned()).collect(), supers },
        );
    }

    /// Whether `name` is a registered class.
    pub fn has_class(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// The declared type parameter names of a registered class.
    pub fn class_params(&self, name: &str) -> Option<&[String]> {
        self.classes.get(name).map(|def| def.params.as_slice())
    }

    /// The erased names of `name` and all its transitive superclasses,
    /// breadth-first, starting with `name` itself.
    pub fn super_names(&self, name: &str) -> Vec<String> {
        let mut names = vec![name.to_owned()];
        let mut i = 0;
        while i < names.len() {
            if let Some(def) = self.classes.get(&names[i]) {
                for s in &def.supers {
                    if let Ty::Class(sc) = s {
                        if !names.contains(&sc.name) {
                            names.push(sc.name.clone());
                        }
                    }
                }
            }
            i += 1;
        }
        if !names.iter().any(|n| n == "java.lang.Object") {
            names.push("java.lang.Object".to_owned());
        }
        names
    }

    pub fn is_same(&self, a: &Ty, b: &Ty) -> bool {
        a == b
    }

    /// Direct supertypes of a class type, with the class's type parameters
    /// substituted by its arguments. Raw uses erase the supertypes.
    fn direct_supers(&self, c: &ClassTy) -> Vec<Ty> {
        let Some(def) = self.classes.get(&c.name) else {
            return Vec::new();
        };
        if c.args.len() == def.params.len() && !def.params.is_empty() {
            def.supers
                .iter()
                .map(|s| {
                    s.subst(&|name| {
                        def.params.iter().position(|p| p == name).map(|i| c.args[i].clone())
                    })
                })
                .collect()
        } else {
            // Raw (or malformed) use: erase the supertype arguments.
            def.supers
                .iter()
                .map(|s| match s {
                    Ty::Class(sc) => Ty::class(sc.name.clone()),
                    other => other.clone(),
                })
                .collect()
        }
    }

    /// The instantiation of `act` viewed as class `name`, walking the
    /// supertype graph. `ArrayList<String>` viewed as `java.util.List`
    /// yields `List<String>`.
    pub fn as_supertype(&self, act: &Ty, name: &str) -> Option<ClassTy> {
        match act {
            Ty::Class(c) if c.name == name => Some(c.clone()),
            Ty::Class(c) => {
                self.direct_supers(c).iter().find_map(|s| self.as_supertype(s, name))
            }
            _ => None,
        }
    }

    /// Subtyping with wildcard containment on the supertype's arguments.
    ///
    /// Primitives follow the widening chain; `Null` is below every
    /// reference type; generic arguments are invariant unless the expected
    /// argument is a wildcard.
    pub fn is_subtype(&self, a: &Ty, b: &Ty) -> bool {
        if a == b {
            return true;
        }
        match (a, b) {
            (Ty::Error, _) | (_, Ty::Error) => false,
            (Ty::Prim(pa), Ty::Prim(pb)) => match (pa.widening_rank(), pb.widening_rank()) {
                (Some(ra), Some(rb)) => ra < rb,
                _ => false,
            },
            (Ty::Null, other) => other.is_reference(),
            (other, Ty::Class(c)) if c.name == "java.lang.Object" => other.is_reference(),
            (Ty::Class(ca), Ty::Class(cb)) => {
                if ca.name == cb.name {
                    self.args_contained(&ca.args, &cb.args)
                } else {
                    self.direct_supers(ca).iter().any(|s| self.is_subtype(s, b))
                }
            }
            (Ty::Array(ea), Ty::Array(eb)) => {
                ea == eb || (ea.is_reference() && eb.is_reference() && self.is_subtype(ea, eb))
            }
            _ => false,
        }
    }

    /// Whether the argument list `actual` is contained by `expected`:
    /// equal where the expected argument is concrete, bound-checked where
    /// it is a wildcard. An empty expected list is a raw use and contains
    /// anything.
    fn args_contained(&self, actual: &[Ty], expected: &[Ty]) -> bool {
        if expected.is_empty() {
            return true;
        }
        if actual.len() != expected.len() {
            return false;
        }
        actual.iter().zip(expected).all(|(a, e)| match e {
            Ty::Wildcard(BoundKind::Extends, bound) => self.is_subtype(a, bound),
            Ty::Wildcard(BoundKind::Super, bound) => self.is_subtype(bound, a),
            _ => a == e,
        })
    }

    /// Least upper bound of a list of types. The lub of the empty list is
    /// `Ty::Null`, the bottom type.
    pub fn lub(&self, tys: &[Ty]) -> Ty {
        let mut iter = tys.iter();
        let Some(first) = iter.next() else {
            return Ty::Null;
        };
        iter.fold(first.clone(), |acc, ty| self.lub2(&acc, ty))
    }

    fn lub2(&self, a: &Ty, b: &Ty) -> Ty {
        if self.is_subtype(a, b) {
            return b.clone();
        }
        if self.is_subtype(b, a) {
            return a.clone();
        }
        match (a, b) {
            (Ty::Prim(pa), Ty::Prim(pb)) => {
                match (pa.widening_rank(), pb.widening_rank()) {
                    (Some(ra), Some(rb)) => {
                        if ra >= rb {
                            a.clone()
                        } else {
                            b.clone()
                        }
                    }
                    _ => Ty::Error,
                }
            }
            _ if a.is_reference() && b.is_reference() => {
                for s in self.super_chain(a) {
                    if self.is_subtype(b, &s) {
                        return s;
                    }
                }
                Ty::object()
            }
            _ => Ty::Error,
        }
    }

    /// Breadth-first supertype chain of a reference type, ending at
    /// `java.lang.Object`.
    fn super_chain(&self, a: &Ty) -> Vec<Ty> {
        let mut chain = Vec::new();
        let mut frontier = vec![a.clone()];
        while let Some(ty) = frontier.pop() {
            if let Ty::Class(c) = &ty {
                for s in self.direct_supers(c) {
                    if !chain.contains(&s) {
                        chain.push(s.clone());
                        frontier.push(s);
                    }
                }
            }
        }
        chain.push(Ty::object());
        chain
    }

    /// Find a consistent instantiation of `free` making every `actual`
    /// type assignable to its `expected` counterpart.
    ///
    /// Constraints are gathered structurally, resolved through a
    /// union-find table (exact constraints must agree; loose constraints
    /// merge by lub), then every pair and every declared bound is
    /// re-verified under the final substitution.
    pub fn infer(
        &self,
        free: &[TypeVarDecl],
        expected: &[Ty],
        actual: &[Ty],
    ) -> Result<Instantiation, InferError> {
        if expected.len() != actual.len() {
            return Err(InferError::ArityMismatch {
                expected: expected.len(),
                actual: actual.len(),
            });
        }

        let mut ctx = InferCtx::new(self, free);
        for (e, a) in expected.iter().zip(actual) {
            ctx.constrain(e, a, false);
        }
        let inst = ctx.solve()?;

        for decl in free {
            let Some(ty) = inst.get(&decl.name) else {
                return Err(InferError::Unresolved(decl.name.clone()));
            };
            if let Some(upper) = &decl.upper {
                let bound = inst.apply(upper);
                if !self.is_subtype(ty, &bound) {
                    return Err(InferError::BoundViolation {
                        var: decl.name.clone(),
                        ty: ty.clone(),
                        bound,
                    });
                }
            }
        }

        for (e, a) in expected.iter().zip(actual) {
            let e = inst.apply(e);
            if !self.assignable(a, &e) {
                return Err(InferError::Mismatch { expected: e, actual: a.clone() });
            }
        }
        Ok(inst)
    }

    /// Assignability for the final verification pass: subtyping, with
    /// top-level wildcard bounds unwrapped.
    fn assignable(&self, actual: &Ty, expected: &Ty) -> bool {
        match expected {
            Ty::Wildcard(BoundKind::Extends, bound) => self.is_subtype(actual, bound),
            Ty::Wildcard(BoundKind::Super, bound) => self.is_subtype(bound, actual),
            _ => self.is_subtype(actual, expected),
        }
    }
}

// ── ena plumbing ───────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
struct TyVid(u32);

impl ena::unify::UnifyKey for TyVid {
    type Value = Option<Ty>;

    fn index(&self) -> u32 {
        self.0
    }

    fn from_index(u: u32) -> Self {
        TyVid(u)
    }

    fn tag() -> &'static str {
        "TyVid"
    }
}

impl ena::unify::EqUnifyValue for Ty {}

/// One inference run: constraint gathering plus union-find resolution.
struct InferCtx<'t> {
    types: &'t Types,
    table: InPlaceUnificationTable<TyVid>,
    vids: FxHashMap<String, TyVid>,
    /// (variable, constraining type, exact?) in discovery order.
    constraints: Vec<(String, Ty, bool)>,
    /// (variable, variable) equalities.
    links: Vec<(String, String)>,
}

impl<'t> InferCtx<'t> {
    fn new(types: &'t Types, free: &[TypeVarDecl]) -> Self {
        let mut table = InPlaceUnificationTable::new();
        let mut vids = FxHashMap::default();
        for decl in free {
            vids.insert(decl.name.clone(), table.new_key(None));
        }
        InferCtx { types, table, vids, constraints: Vec::new(), links: Vec::new() }
    }

    fn is_free(&self, name: &str) -> bool {
        self.vids.contains_key(name)
    }

    /// Gather constraints from one expected/actual pair. Mismatches are
    /// not reported here; the final verification pass catches them.
    fn constrain(&mut self, expected: &Ty, actual: &Ty, exact: bool) {
        match (expected, actual) {
            (Ty::Var(n), Ty::Var(m)) if self.is_free(n) && self.is_free(m) => {
                self.links.push((n.clone(), m.clone()));
            }
            (Ty::Var(n), _) if self.is_free(n) => {
                self.constraints.push((n.clone(), actual.clone(), exact));
            }
            (Ty::Wildcard(_, bound), _) => {
                self.constrain(bound, actual, false);
            }
            (Ty::Class(ce), _) => {
                if let Some(inst) = self.types.as_supertype(actual, &ce.name) {
                    if ce.args.len() == inst.args.len() {
                        let pairs: Vec<_> =
                            ce.args.iter().cloned().zip(inst.args.iter().cloned()).collect();
                        for (e, a) in pairs {
                            self.constrain(&e, &a, true);
                        }
                    }
                }
            }
            (Ty::Array(ee), Ty::Array(ae)) => {
                let (ee, ae) = (ee.as_ref().clone(), ae.as_ref().clone());
                self.constrain(&ee, &ae, exact);
            }
            (Ty::Method(me), Ty::Method(ma)) => {
                if me.params.len() == ma.params.len() {
                    let pairs: Vec<_> =
                        me.params.iter().cloned().zip(ma.params.iter().cloned()).collect();
                    for (e, a) in pairs {
                        self.constrain(&e, &a, false);
                    }
                }
                let (re, ra) = (me.ret.as_ref().clone(), ma.ret.as_ref().clone());
                self.constrain(&re, &ra, false);
            }
            _ => {}
        }
    }

    fn solve(mut self) -> Result<Instantiation, InferError> {
        for (n, m) in std::mem::take(&mut self.links) {
            let (a, b) = (self.vids[&n], self.vids[&m]);
            self.table.unify_var_var(a, b).map_err(|(first, second)| InferError::Conflict {
                var: n.clone(),
                first,
                second,
            })?;
        }

        // Group constraints per variable in discovery order.
        let mut grouped: FxHashMap<String, Vec<(Ty, bool)>> = FxHashMap::default();
        for (name, ty, exact) in std::mem::take(&mut self.constraints) {
            grouped.entry(name).or_default().push((ty, exact));
        }

        for (name, constraints) in grouped {
            let vid = self.vids[&name];
            let mut solution: Option<Ty> = None;
            let mut solved_exactly = false;
            for (ty, exact) in constraints {
                match (&mut solution, exact) {
                    (None, _) => {
                        solution = Some(ty);
                        solved_exactly = exact;
                    }
                    (Some(prev), true) if solved_exactly => {
                        if *prev != ty {
                            return Err(InferError::Conflict {
                                var: name.clone(),
                                first: prev.clone(),
                                second: ty,
                            });
                        }
                    }
                    (Some(prev), true) => {
                        // An exact constraint overrides accumulated loose ones;
                        // the verification pass re-checks them.
                        *prev = ty;
                        solved_exactly = true;
                    }
                    (Some(prev), false) => {
                        if !solved_exactly {
                            *prev = self.types.lub(&[prev.clone(), ty]);
                        }
                    }
                }
            }
            if let Some(ty) = solution {
                self.table
                    .unify_var_value(vid, Some(ty))
                    .map_err(|(first, second)| InferError::Conflict {
                        var: name.clone(),
                        first,
                        second,
                    })?;
            }
        }

        let mut map = FxHashMap::default();
        let names: Vec<String> = self.vids.keys().cloned().collect();
        for name in names {
            let vid = self.vids[&name];
            if let Some(ty) = self.table.probe_value(vid) {
                map.insert(name, ty);
            }
        }
        Ok(Instantiation { map })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types() -> Types {
        Types::with_defaults()
    }

    fn list_of(arg: Ty) -> Ty {
        Ty::generic("java.util.List", vec![arg])
    }

    fn array_list_of(arg: Ty) -> Ty {
        Ty::generic("java.util.ArrayList", vec![arg])
    }

    #[test]
    fn primitive_widening() {
        let t = types();
        assert!(t.is_subtype(&Ty::int(), &Ty::long()));
        assert!(t.is_subtype(&Ty::byte(), &Ty::double()));
        assert!(!t.is_subtype(&Ty::long(), &Ty::int()));
        assert!(!t.is_subtype(&Ty::boolean(), &Ty::int()));
    }

    #[test]
    fn class_hierarchy_subtyping() {
        let t = types();
        assert!(t.is_subtype(&array_list_of(Ty::string()), &list_of(Ty::string())));
        assert!(t.is_subtype(&Ty::string(), &Ty::object()));
        assert!(!t.is_subtype(&list_of(Ty::string()), &list_of(Ty::object())));
        assert!(t.is_subtype(&Ty::Null, &Ty::string()));
    }

    #[test]
    fn wildcard_containment() {
        let t = types();
        let num_list = list_of(Ty::wildcard(BoundKind::Extends, Ty::class("java.lang.Number")));
        assert!(t.is_subtype(&list_of(Ty::class("java.lang.Integer")), &num_list));
        assert!(!t.is_subtype(&list_of(Ty::string()), &num_list));
        let super_int =
            Ty::generic("java.util.Comparator", vec![Ty::wildcard(BoundKind::Super, Ty::class("java.lang.Integer"))]);
        assert!(t.is_subtype(
            &Ty::generic("java.util.Comparator", vec![Ty::class("java.lang.Number")]),
            &super_int
        ));
    }

    #[test]
    fn lub_of_siblings_is_common_super() {
        let t = types();
        assert_eq!(
            t.lub(&[Ty::class("java.lang.Integer"), Ty::class("java.lang.Double")]),
            Ty::class("java.lang.Number")
        );
        assert_eq!(t.lub(&[Ty::int(), Ty::long()]), Ty::long());
        assert_eq!(t.lub(&[]), Ty::Null);
        assert_eq!(
            t.lub(&[Ty::string(), Ty::class("java.lang.Integer")]),
            Ty::object()
        );
    }

    #[test]
    fn infer_from_generic_argument() {
        let t = types();
        let inst = t
            .infer(
                &[TypeVarDecl::new("E")],
                &[list_of(Ty::var("E"))],
                &[array_list_of(Ty::string())],
            )
            .unwrap();
        assert_eq!(inst.get("E"), Some(&Ty::string()));
    }

    #[test]
    fn infer_through_wildcard_bound() {
        let t = types();
        let expected = vec![
            Ty::generic("java.util.Collection", vec![Ty::var("E")]),
            Ty::generic(
                "java.util.Comparator",
                vec![Ty::wildcard(BoundKind::Super, Ty::var("E"))],
            ),
        ];
        let actual = vec![
            list_of(Ty::string()),
            Ty::generic("java.util.Comparator", vec![Ty::string()]),
        ];
        let inst = t.infer(&[TypeVarDecl::new("E")], &expected, &actual).unwrap();
        assert_eq!(inst.get("E"), Some(&Ty::string()));
    }

    #[test]
    fn infer_rejects_inconsistent_instantiation() {
        let t = types();
        let err = t
            .infer(
                &[TypeVarDecl::new("T")],
                &[list_of(Ty::var("T")), list_of(Ty::var("T"))],
                &[list_of(Ty::string()), list_of(Ty::class("java.lang.Integer"))],
            )
            .unwrap_err();
        assert!(matches!(err, InferError::Mismatch { .. } | InferError::Conflict { .. }));
    }

    #[test]
    fn loose_constraints_merge_by_lub() {
        let t = types();
        let inst = t
            .infer(
                &[TypeVarDecl::new("T")],
                &[Ty::var("T"), Ty::var("T")],
                &[Ty::class("java.lang.Integer"), Ty::class("java.lang.Double")],
            )
            .unwrap();
        assert_eq!(inst.get("T"), Some(&Ty::class("java.lang.Number")));
    }

    #[test]
    fn infer_respects_recursive_bound() {
        let mut t = types();
        t.add_class(
            "java.math.RoundingMode",
            &[],
            vec![Ty::generic("java.lang.Enum", vec![Ty::class("java.math.RoundingMode")])],
        );
        let decl = TypeVarDecl::bounded(
            "E",
            Ty::generic("java.lang.Enum", vec![Ty::var("E")]),
        );
        let inst = t
            .infer(&[decl.clone()], &[Ty::var("E")], &[Ty::class("java.math.RoundingMode")])
            .unwrap();
        assert_eq!(inst.get("E"), Some(&Ty::class("java.math.RoundingMode")));

        let err = t.infer(&[decl], &[Ty::var("E")], &[Ty::string()]).unwrap_err();
        assert!(matches!(err, InferError::BoundViolation { .. }));
        insta::assert_snapshot!(
            err.to_string(),
            @"java.lang.String does not satisfy the bound java.lang.Enum<java.lang.String> of E"
        );
    }

    #[test]
    fn unconstrained_variable_is_an_error() {
        let t = types();
        let err = t
            .infer(&[TypeVarDecl::new("E")], &[Ty::int()], &[Ty::int()])
            .unwrap_err();
        assert_eq!(err, InferError::Unresolved("E".to_owned()));
    }
}
