//! The tailor matching engine: pattern-based source rewriting.
//!
//! Given a "before" pattern over typed expressions or statements and one
//! or more "after" replacements, the engine finds every place in a target
//! tree that structurally and type-consistently matches the pattern and
//! produces a concrete replacement for each match.
//!
//! The core is a miniature logic-programming engine: a lazy backtracking
//! search combinator ([`choice::Choice`]), a typed binding environment
//! ([`bindings::Bindings`]), forkable per-branch search state
//! ([`unify::Unifier`]), per-node-kind unification over closed pattern
//! enums ([`pattern`]), higher-order placeholder matching
//! ([`placeholder`]), statement-run matching with control-flow-aware
//! special cases ([`template::BlockTemplate`], [`control_flow`]), and the
//! inlining step that turns completed bindings back into concrete trees
//! ([`inline`]).

pub mod bindings;
pub mod choice;
pub mod control_flow;
pub mod error;
pub mod imports;
pub mod inline;
pub mod pattern;
pub mod placeholder;
pub mod rule;
pub mod template;
pub mod unify;

pub use bindings::{Binding, Bindings, Key};
pub use choice::Choice;
pub use control_flow::Flow;
pub use error::{CouldNotResolveImport, MatchError, RuleError};
pub use imports::ImportPolicy;
pub use inline::Inliner;
pub use pattern::{UCatch, UExpr, UStmt, UTy, UTypeVar};
pub use placeholder::{PlaceholderMethod, PlaceholderParam, UPlaceholderExpr, UPlaceholderStmt};
pub use rule::{Replacement, RewriteRule, Template};
pub use template::{BlockTemplate, BlockTemplateMatch, ExpressionTemplate, ExpressionTemplateMatch};
pub use unify::{Env, Unifier, UnifierWithUnconsumed};
