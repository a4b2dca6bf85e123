//! The inliner: reconstructing concrete trees from completed bindings.
//!
//! An `Inliner` is created from a successful unifier. Its bindings are a
//! snapshot and are never mutated; the only mutable state is the pair of
//! pending-import sets the import policy writes into while references are
//! rendered.

use rustc_hash::FxHashSet;
use tailor_types::{Ty, Types};

use crate::bindings::Bindings;
use crate::error::CouldNotResolveImport;
use crate::unify::Env;

/// The context for rendering a replacement tree from a set of
/// substitutions.
#[derive(Clone, Debug)]
pub struct Inliner<'a> {
    env: Env<'a>,
    pub bindings: Bindings,
    imports_to_add: FxHashSet<String>,
    static_imports_to_add: FxHashSet<String>,
}

impl<'a> Inliner<'a> {
    pub(crate) fn new(env: Env<'a>, bindings: Bindings) -> Self {
        Inliner {
            env,
            bindings,
            imports_to_add: FxHashSet::default(),
            static_imports_to_add: FxHashSet::default(),
        }
    }

    pub fn env(&self) -> &Env<'a> {
        &self.env
    }

    pub fn types(&self) -> &'a Types {
        self.env.types
    }

    /// Register a pending import. `java.lang` never needs importing.
    pub fn add_import(&mut self, fq: &str) {
        if !fq.starts_with("java.lang.") {
            self.imports_to_add.insert(fq.to_owned());
        }
    }

    pub fn add_static_import(&mut self, qualified_member: String) {
        self.static_imports_to_add.insert(qualified_member);
    }

    /// Check that a class is known to the type service; references to
    /// unknown classes cannot be rendered.
    pub fn resolve_class(&self, fq: &str) -> Result<(), CouldNotResolveImport> {
        if self.env.types.has_class(fq) {
            Ok(())
        } else {
            Err(CouldNotResolveImport::new(fq))
        }
    }

    /// The unit's imports plus everything registered so far.
    pub fn all_imports(&self) -> Vec<String> {
        let mut all: Vec<String> = self.env.imports.to_vec();
        let mut added: Vec<&String> = self.imports_to_add.iter().collect();
        added.sort();
        all.extend(added.into_iter().cloned());
        all
    }

    /// Pending imports, sorted for deterministic output.
    pub fn imports_to_add(&self) -> Vec<String> {
        let mut imports: Vec<String> = self.imports_to_add.iter().cloned().collect();
        imports.sort();
        imports
    }

    pub fn static_imports_to_add(&self) -> Vec<String> {
        let mut imports: Vec<String> = self.static_imports_to_add.iter().cloned().collect();
        imports.sort();
        imports
    }

    /// The written form of a type, resolving class names through the
    /// import policy.
    pub fn type_text(&mut self, ty: &Ty) -> Result<String, CouldNotResolveImport> {
        match ty {
            Ty::Prim(p) => Ok(p.to_string()),
            Ty::Class(c) => {
                let policy = self.env.policy;
                let base = policy.class_reference(self, &c.name, &c.name)?;
                let mut text = tailor_syntax::render::expr(&base);
                if !c.args.is_empty() {
                    let args: Result<Vec<String>, _> =
                        c.args.iter().map(|a| self.type_text(a)).collect();
                    text.push('<');
                    text.push_str(&args?.join(", "));
                    text.push('>');
                }
                Ok(text)
            }
            Ty::Array(elem) => Ok(format!("{}[]", self.type_text(elem)?)),
            Ty::Wildcard(kind, bound) => {
                let bound = self.type_text(bound)?;
                Ok(match kind {
                    tailor_types::BoundKind::Extends => format!("? extends {bound}"),
                    tailor_types::BoundKind::Super => format!("? super {bound}"),
                })
            }
            Ty::Var(name) => {
                match self.bindings.type_var(&crate::bindings::Key::TypeVar(name.clone())) {
                    Some(binding) => {
                        let ty = binding.ty.clone();
                        self.type_text(&ty)
                    }
                    None => Err(CouldNotResolveImport::new(name.clone())),
                }
            }
            Ty::Null | Ty::Method(_) | Ty::Error => {
                Err(CouldNotResolveImport::new(ty.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::{Binding, Key, TypeVarBinding};

    fn types() -> Types {
        Types::with_defaults()
    }

    #[test]
    fn java_lang_is_never_imported() {
        let types = types();
        let env = Env::new(&types);
        let mut inliner = Inliner::new(env, Bindings::new());
        inliner.add_import("java.lang.String");
        inliner.add_import("java.util.List");
        assert_eq!(inliner.imports_to_add(), vec!["java.util.List".to_owned()]);
    }

    #[test]
    fn type_text_substitutes_bound_type_variables() {
        let types = types();
        let imports = vec!["java.util.List".to_owned()];
        let env = Env::new(&types).with_imports(&imports);
        let mut bindings = Bindings::new();
        bindings.insert(
            Key::TypeVar("E".into()),
            Binding::TypeVar(TypeVarBinding::of(Ty::class("java.lang.Integer"))),
        );
        let mut inliner = Inliner::new(env, bindings);
        let text = inliner
            .type_text(&Ty::generic("java.util.List", vec![Ty::var("E")]))
            .unwrap();
        assert_eq!(text, "List<Integer>");
    }

    #[test]
    fn unbound_type_variable_cannot_be_rendered() {
        let types = types();
        let env = Env::new(&types);
        let mut inliner = Inliner::new(env, Bindings::new());
        assert!(inliner.type_text(&Ty::var("E")).is_err());
    }
}
