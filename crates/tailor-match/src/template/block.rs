//! Block templates: match a contiguous run of statements.
//!
//! The engine tries every starting offset in the target block; at each
//! offset it threads a `Choice` through the pattern statements, each one
//! consuming some prefix of the remaining run. The first maximal list of
//! disjoint matches, front to back, wins.

use std::rc::Rc;

use tailor_syntax::ast::Stmt;
use tailor_syntax::span::Span;

use crate::choice::Choice;
use crate::error::CouldNotResolveImport;
use crate::inline::Inliner;
use crate::pattern::uty::{UTy, UTypeVar};
use crate::pattern::{UExpr, UStmt};
use crate::placeholder::PlaceholderMethod;
use crate::template::TemplateCore;
use crate::unify::{Env, Unifier, UnifierWithUnconsumed};

/// A template matching a fixed (or placeholder-extended) sequence of
/// statements.
#[derive(Clone, Debug)]
pub struct BlockTemplate {
    core: TemplateCore,
    stmts: Vec<UStmt>,
    placeholders: Vec<Rc<PlaceholderMethod>>,
}

/// One successful block match: the consumed statement range plus the
/// unifier that produced it.
#[derive(Clone, Debug)]
pub struct BlockTemplateMatch<'a> {
    /// Index of the first consumed statement in the matched block.
    pub start: usize,
    /// Index one past the last consumed statement.
    pub end: usize,
    pub span: Span,
    pub unifier: Unifier<'a>,
}

impl BlockTemplate {
    pub fn new(type_vars: Vec<UTypeVar>, args: Vec<(String, UTy)>, stmts: Vec<UStmt>) -> Self {
        let mut placeholders: Vec<Rc<PlaceholderMethod>> = Vec::new();
        for stmt in &stmts {
            stmt.for_each_uexpr(&mut |e| {
                if let UExpr::Placeholder(p) = e {
                    if !placeholders.iter().any(|m| m.name == p.method.name) {
                        placeholders.push(Rc::clone(&p.method));
                    }
                }
            });
            stmt.walk(&mut |s| {
                if let UStmt::Placeholder(p) = s {
                    if !placeholders.iter().any(|m| m.name == p.method.name) {
                        placeholders.push(Rc::clone(&p.method));
                    }
                }
            });
        }
        BlockTemplate { core: TemplateCore::new(type_vars, args), stmts, placeholders }
    }

    /// A template with no type variables.
    pub fn simple(args: Vec<(String, UTy)>, stmts: Vec<UStmt>) -> Self {
        BlockTemplate::new(Vec::new(), args, stmts)
    }

    pub fn stmts(&self) -> &[UStmt] {
        &self.stmts
    }

    pub fn arg_names(&self) -> impl Iterator<Item = &str> {
        self.core.args.iter().map(|(name, _)| name.as_str())
    }

    /// All disjoint matches in the given statement run, front to back.
    pub fn matches<'a>(&'a self, stmts: &'a [Stmt], env: Env<'a>) -> Vec<BlockTemplateMatch<'a>> {
        self.matches_anywhere(stmts, 0, env).first().unwrap_or_default()
    }

    /// Render this template's statements under completed bindings.
    pub fn inline_stmts(
        &self,
        inliner: &mut Inliner<'_>,
    ) -> Result<Vec<Stmt>, CouldNotResolveImport> {
        let mut out = Vec::new();
        for stmt in &self.stmts {
            out.extend(stmt.inline_stmts(inliner)?);
        }
        Ok(out)
    }

    fn matches_from<'a>(
        &'a self,
        stmts: &'a [Stmt],
        offset: usize,
        env: Env<'a>,
    ) -> Choice<'a, Vec<BlockTemplateMatch<'a>>> {
        if stmts.is_empty() {
            return Choice::none();
        }
        let mut choice = Choice::of(UnifierWithUnconsumed::new(Unifier::new(env), stmts));
        for pattern in &self.stmts {
            choice = choice.then_choose(move |st| pattern.consume(st));
        }
        choice.then_choose(move |st| {
            let consumed = stmts.len() - st.remaining.len();
            // A match must consume at least one statement, or scanning
            // from the same offset would recurse forever.
            if consumed == 0 {
                return Choice::none();
            }
            let Some(checked) = self.core.typecheck(st.unifier, &self.placeholders, None) else {
                return Choice::none();
            };
            if !self.verify_placeholders(&checked) {
                return Choice::none();
            }
            let matched = BlockTemplateMatch {
                start: offset,
                end: offset + consumed,
                span: stmts[0].span.join(stmts[consumed - 1].span),
                unifier: checked,
            };
            self.matches_anywhere(&stmts[consumed..], offset + consumed, env)
                .transform(move |mut rest| {
                    rest.insert(0, matched.clone());
                    rest
                })
        })
    }

    fn matches_anywhere<'a>(
        &'a self,
        stmts: &'a [Stmt],
        offset: usize,
        env: Env<'a>,
    ) -> Choice<'a, Vec<BlockTemplateMatch<'a>>> {
        let mut choice = Choice::none();
        for i in 0..stmts.len() {
            choice = choice.or(self.matches_from(&stmts[i..], offset + i, env));
        }
        choice.or(Choice::of(Vec::new()))
    }

    fn verify_placeholders(&self, u: &Unifier<'_>) -> bool {
        let mut ok = true;
        for stmt in &self.stmts {
            stmt.for_each_uexpr(&mut |e| {
                if let UExpr::Placeholder(p) = e {
                    if !p.reverify(u) {
                        ok = false;
                    }
                }
            });
            stmt.walk(&mut |s| {
                if let UStmt::Placeholder(p) = s {
                    if !p.reverify(u) {
                        ok = false;
                    }
                }
            });
        }
        ok
    }
}
