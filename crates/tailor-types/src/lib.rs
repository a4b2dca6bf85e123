//! Type model and type-inference service for the tailor rewriting engine.
//!
//! `tailor-types` owns the representation of source-language types (`Ty`),
//! the registered class hierarchy (`Types`), subtype and least-upper-bound
//! queries, and structural instantiation inference for template type
//! variables. The matching engine treats this crate as a side-effect-free
//! oracle: "given expected and actual type lists and free type variables,
//! return a consistent instantiation or fail."

mod infer;
mod ty;

pub use infer::{InferError, Instantiation, TypeVarDecl, Types};
pub use ty::{BoundKind, ClassTy, MethodTy, Prim, Ty};
