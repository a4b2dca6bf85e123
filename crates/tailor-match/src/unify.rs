//! The unifier: per-branch mutable search state.
//!
//! A `Unifier` owns one `Bindings` plus a reference to the shared,
//! read-only environment. Alternative branches of a `Choice` each work on
//! their own fork; bindings never alias across concurrently live
//! branches, which is what makes backtracking safe.

use std::sync::atomic::{AtomicBool, Ordering};

use tailor_syntax::ast::Stmt;
use tailor_types::Types;

use crate::bindings::{Binding, Bindings, Key};
use crate::imports::ImportPolicy;
use crate::inline::Inliner;

/// The shared read-only context of one matching run: the type service,
/// the unit's imports, the import policy for replacements, and an
/// optional cancellation flag.
#[derive(Copy, Clone, Debug)]
pub struct Env<'a> {
    pub types: &'a Types,
    pub imports: &'a [String],
    pub policy: ImportPolicy,
    pub cancel: Option<&'a AtomicBool>,
}

impl<'a> Env<'a> {
    pub fn new(types: &'a Types) -> Self {
        Env { types, imports: &[], policy: ImportPolicy::ImportTopLevel, cancel: None }
    }

    pub fn with_imports(mut self, imports: &'a [String]) -> Self {
        self.imports = imports;
        self
    }

    pub fn with_policy(mut self, policy: ImportPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_cancel(mut self, cancel: &'a AtomicBool) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Whether the caller has requested an abort. Observed by the search
    /// drivers between alternatives.
    pub fn cancelled(&self) -> bool {
        self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Mutable-but-forkable search state: one `Bindings` plus the shared
/// environment.
#[derive(Clone, Debug)]
pub struct Unifier<'a> {
    env: Env<'a>,
    bindings: Bindings,
}

impl<'a> Unifier<'a> {
    /// A fresh unifier for one top-level match attempt.
    pub fn new(env: Env<'a>) -> Self {
        Unifier { env, bindings: Bindings::new() }
    }

    /// An independent copy for exploring one branch of an `or`.
    /// Mutations in the fork are invisible to this unifier and its other
    /// forks.
    pub fn fork(&self) -> Unifier<'a> {
        self.clone()
    }

    pub fn env(&self) -> &Env<'a> {
        &self.env
    }

    pub fn types(&self) -> &'a Types {
        self.env.types
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn get_binding(&self, key: &Key) -> Option<&Binding> {
        self.bindings.get(key)
    }

    /// Bind a key. Panics if it is already bound and was not cleared.
    pub fn put_binding(&mut self, key: Key, value: Binding) {
        self.bindings.insert(key, value);
    }

    /// Overwrite an existing binding (type-variable refinement only).
    pub fn replace_binding(&mut self, key: Key, value: Binding) {
        self.bindings.replace(key, value);
    }

    /// Clear a binding so a structurally ambiguous match can be retried.
    pub fn clear_binding(&mut self, key: &Key) -> Option<Binding> {
        self.bindings.remove(key)
    }

    /// Promote this unifier into an inliner over a snapshot of its
    /// bindings.
    pub fn create_inliner(&self) -> Inliner<'a> {
        Inliner::new(self.env, self.bindings.clone())
    }
}

/// The state threaded through block matching: a unifier plus the run of
/// target statements not yet consumed by the pattern.
#[derive(Clone, Debug)]
pub struct UnifierWithUnconsumed<'a> {
    pub unifier: Unifier<'a>,
    pub remaining: &'a [Stmt],
}

impl<'a> UnifierWithUnconsumed<'a> {
    pub fn new(unifier: Unifier<'a>, remaining: &'a [Stmt]) -> Self {
        UnifierWithUnconsumed { unifier, remaining }
    }
}
