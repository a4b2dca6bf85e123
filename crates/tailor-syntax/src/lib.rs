//! Front-end for the tailor rewriting engine: spans, the owned typed AST
//! of the target language, a lexer and parser, scope-driven resolution,
//! and precedence-aware rendering back to source text.
//!
//! The matching engine (`tailor-match`) consumes the trees this crate
//! produces and never mutates them; the renderer is shared by the engine's
//! inliner to print replacement trees.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod render;
pub mod resolve;
pub mod span;
pub mod token;

use tailor_types::Types;

use crate::ast::{Block, Unit};
use crate::error::SyntaxError;
use crate::resolve::Globals;
use crate::span::Span;

/// Parse and resolve a statement sequence into a block.
pub fn compile_block(
    src: &str,
    types: &Types,
    globals: &Globals,
) -> Result<Block, Vec<SyntaxError>> {
    let stmts = parser::parse_stmts(src)?;
    let mut block = Block { stmts, span: Span::new(0, src.len() as u32) };
    let errors = resolve::resolve_block(&mut block, types, globals);
    if errors.is_empty() {
        Ok(block)
    } else {
        Err(errors.into_iter().map(SyntaxError::Resolve).collect())
    }
}

/// Parse and resolve a whole unit: the resolved block plus the import
/// list the import policy consults.
pub fn compile_unit(
    src: &str,
    types: &Types,
    globals: &Globals,
) -> Result<Unit, Vec<SyntaxError>> {
    let block = compile_block(src, types, globals)?;
    Ok(Unit { imports: globals.imports().to_vec(), block })
}
