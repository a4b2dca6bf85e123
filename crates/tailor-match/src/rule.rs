//! Rewrite rules: validated before/after template sets and the driver
//! that scans a compilation unit for matches and renders replacements.

use tailor_syntax::ast::{walk_blocks, Block, Expr, ExprKind, Stmt, StmtKind, Unit};
use tailor_syntax::render;
use tailor_syntax::span::Span;

use serde::Serialize;

use crate::error::{MatchError, RuleError};
use crate::template::{BlockTemplate, BlockTemplateMatch, ExpressionTemplate};
use crate::unify::Env;

/// Either template shape. A rule's templates are uniformly one or the
/// other.
#[derive(Clone, Debug)]
pub enum Template {
    Expression(ExpressionTemplate),
    Block(BlockTemplate),
}

impl Template {
    fn is_expression(&self) -> bool {
        matches!(self, Template::Expression(_))
    }
}

/// One `(location, replacement)` produced by a successful match.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Replacement {
    pub span: Span,
    pub text: String,
    pub imports_to_add: Vec<String>,
    pub static_imports_to_add: Vec<String>,
    pub imports_to_remove: Vec<String>,
}

/// A rewrite rule: one or more before-templates and the after-templates
/// that replace whatever they match.
#[derive(Clone, Debug)]
pub struct RewriteRule {
    name: String,
    before: Vec<Template>,
    after: Vec<Template>,
}

impl RewriteRule {
    /// Validate and build a rule. Malformed rules fail fast here with a
    /// descriptive error; nothing is checked again during matching.
    pub fn new(
        name: impl Into<String>,
        before: Vec<Template>,
        after: Vec<Template>,
    ) -> Result<Self, RuleError> {
        if before.is_empty() {
            return Err(RuleError::NoBeforeTemplates);
        }
        let expression = before[0].is_expression();
        if !before.iter().chain(&after).all(|t| t.is_expression() == expression) {
            return Err(RuleError::MixedTemplateShapes);
        }

        // Every argument an after-template declares must be bound by
        // every before-template, or inlining could not resolve it.
        let mut missing: Vec<String> = Vec::new();
        for after_template in &after {
            for arg in template_arg_names(after_template) {
                let in_all = before
                    .iter()
                    .all(|b| template_arg_names(b).iter().any(|n| n == &arg));
                if !in_all && !missing.contains(&arg) {
                    missing.push(arg);
                }
            }
        }
        if !missing.is_empty() {
            missing.sort();
            return Err(RuleError::UnknownAfterArguments { arguments: missing });
        }

        Ok(RewriteRule { name: name.into(), before, after })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The negated twin of this rule: every template negated. Only
    /// boolean expression rules have one.
    pub fn negation(&self) -> Result<RewriteRule, RuleError> {
        let negate = |templates: &[Template]| -> Result<Vec<Template>, RuleError> {
            templates
                .iter()
                .map(|t| match t {
                    Template::Expression(e)
                        if *e.return_ty() == crate::pattern::UTy::boolean() =>
                    {
                        Ok(Template::Expression(e.negation()))
                    }
                    _ => Err(RuleError::NonBooleanNegation),
                })
                .collect()
        };
        RewriteRule::new(
            format!("{}Negation", self.name),
            negate(&self.before)?,
            negate(&self.after)?,
        )
    }

    /// Scan a unit and produce one replacement per match,
    /// first-match-wins per location, in deterministic source order.
    pub fn rewrite<'a>(
        &'a self,
        unit: &'a Unit,
        env: Env<'a>,
    ) -> Result<Vec<Replacement>, MatchError> {
        let mut out = Vec::new();
        if self.before[0].is_expression() {
            self.scan_block(&unit.block, env, &mut out)?;
        } else {
            let mut blocks: Vec<&'a Block> = Vec::new();
            walk_blocks(&unit.block, &mut |b| blocks.push(b));
            for block in blocks {
                if env.cancelled() {
                    return Err(MatchError::Aborted);
                }
                self.rewrite_block(block, env, &mut out);
            }
        }
        Ok(out)
    }

    // ── Expression scanning ────────────────────────────────────────────

    fn scan_block<'a>(
        &'a self,
        block: &'a Block,
        env: Env<'a>,
        out: &mut Vec<Replacement>,
    ) -> Result<(), MatchError> {
        for stmt in &block.stmts {
            self.scan_stmt(stmt, env, out)?;
        }
        Ok(())
    }

    fn scan_stmt<'a>(
        &'a self,
        stmt: &'a Stmt,
        env: Env<'a>,
        out: &mut Vec<Replacement>,
    ) -> Result<(), MatchError> {
        match &stmt.kind {
            StmtKind::Expr(e) | StmtKind::Throw(e) => self.scan_expr(e, render::PREC_NONE, env, out),
            StmtKind::VarDecl(d) => match &d.init {
                Some(init) => self.scan_expr(init, render::PREC_NONE, env, out),
                None => Ok(()),
            },
            StmtKind::Block(b) => self.scan_block(b, env, out),
            StmtKind::If { cond, then_stmt, else_stmt } => {
                self.scan_expr(cond, render::PREC_NONE, env, out)?;
                self.scan_stmt(then_stmt, env, out)?;
                match else_stmt {
                    Some(e) => self.scan_stmt(e, env, out),
                    None => Ok(()),
                }
            }
            StmtKind::While { cond, body } => {
                self.scan_expr(cond, render::PREC_NONE, env, out)?;
                self.scan_stmt(body, env, out)
            }
            StmtKind::DoWhile { body, cond } => {
                self.scan_stmt(body, env, out)?;
                self.scan_expr(cond, render::PREC_NONE, env, out)
            }
            StmtKind::For { init, cond, update, body } => {
                for s in init {
                    self.scan_stmt(s, env, out)?;
                }
                if let Some(c) = cond {
                    self.scan_expr(c, render::PREC_NONE, env, out)?;
                }
                for u in update {
                    self.scan_expr(u, render::PREC_NONE, env, out)?;
                }
                self.scan_stmt(body, env, out)
            }
            StmtKind::Try { body, catches, finally } => {
                self.scan_block(body, env, out)?;
                for c in catches {
                    self.scan_block(&c.body, env, out)?;
                }
                match finally {
                    Some(f) => self.scan_block(f, env, out),
                    None => Ok(()),
                }
            }
            StmtKind::Labeled { stmt, .. } => self.scan_stmt(stmt, env, out),
            StmtKind::Break { .. } | StmtKind::Continue { .. } => Ok(()),
            StmtKind::Return(value) => match value {
                Some(e) => self.scan_expr(e, render::PREC_NONE, env, out),
                None => Ok(()),
            },
        }
    }

    /// Visit an expression node; if a before-template matches, emit the
    /// replacement and do not descend into the matched region.
    fn scan_expr<'a>(
        &'a self,
        expr: &'a Expr,
        min_prec: u8,
        env: Env<'a>,
        out: &mut Vec<Replacement>,
    ) -> Result<(), MatchError> {
        if env.cancelled() {
            return Err(MatchError::Aborted);
        }
        if let Some(replacement) = self.try_replace_expr(expr, min_prec, env) {
            out.push(replacement);
            return Ok(());
        }
        self.scan_expr_children(expr, env, out)
    }

    fn scan_expr_children<'a>(
        &'a self,
        expr: &'a Expr,
        env: Env<'a>,
        out: &mut Vec<Replacement>,
    ) -> Result<(), MatchError> {
        let kind = &expr.kind;
        match kind {
            ExprKind::Lit(_) | ExprKind::Ident(_) => Ok(()),
            ExprKind::Select { base, .. } => {
                self.scan_expr(base, render::child_min_prec(kind, 0), env, out)
            }
            ExprKind::Call { callee, args } => {
                self.scan_expr(callee, render::child_min_prec(kind, 0), env, out)?;
                for (i, a) in args.iter().enumerate() {
                    self.scan_expr(a, render::child_min_prec(kind, i + 1), env, out)?;
                }
                Ok(())
            }
            ExprKind::Unary { operand, .. } => {
                self.scan_expr(operand, render::child_min_prec(kind, 0), env, out)
            }
            ExprKind::Binary { lhs, rhs, .. }
            | ExprKind::Assign { lhs, rhs }
            | ExprKind::CompoundAssign { lhs, rhs, .. } => {
                self.scan_expr(lhs, render::child_min_prec(kind, 0), env, out)?;
                self.scan_expr(rhs, render::child_min_prec(kind, 1), env, out)
            }
            ExprKind::Conditional { cond, then_expr, else_expr } => {
                self.scan_expr(cond, render::child_min_prec(kind, 0), env, out)?;
                self.scan_expr(then_expr, render::child_min_prec(kind, 1), env, out)?;
                self.scan_expr(else_expr, render::child_min_prec(kind, 2), env, out)
            }
            ExprKind::Paren(inner) => self.scan_expr(inner, render::PREC_NONE, env, out),
            ExprKind::Cast { expr: operand, .. } | ExprKind::InstanceOf { expr: operand, .. } => {
                self.scan_expr(operand, render::child_min_prec(kind, 0), env, out)
            }
            ExprKind::ArrayAccess { array, index } => {
                self.scan_expr(array, render::child_min_prec(kind, 0), env, out)?;
                self.scan_expr(index, render::child_min_prec(kind, 1), env, out)
            }
            ExprKind::NewClass { args, .. } => {
                for a in args {
                    self.scan_expr(a, render::PREC_NONE, env, out)?;
                }
                Ok(())
            }
            ExprKind::NewArray { dims, init, .. } => {
                for d in dims {
                    self.scan_expr(d, render::PREC_NONE, env, out)?;
                }
                if let Some(init) = init {
                    for i in init {
                        self.scan_expr(i, render::PREC_NONE, env, out)?;
                    }
                }
                Ok(())
            }
        }
    }

    fn try_replace_expr<'a>(
        &'a self,
        expr: &'a Expr,
        min_prec: u8,
        env: Env<'a>,
    ) -> Option<Replacement> {
        for before in &self.before {
            let Template::Expression(template) = before else {
                continue;
            };
            let Some(matched) = template.match_at(expr, env) else {
                continue;
            };
            let Template::Expression(after) = &self.after[0] else {
                unreachable!("rule shapes are validated at construction");
            };
            let mut inliner = matched.unifier.create_inliner();
            match after.inline(&mut inliner) {
                Ok(replacement) => {
                    return Some(Replacement {
                        span: matched.span,
                        text: render::expr_prec(&replacement, min_prec),
                        imports_to_add: inliner.imports_to_add(),
                        static_imports_to_add: inliner.static_imports_to_add(),
                        imports_to_remove: Vec::new(),
                    });
                }
                Err(e) => {
                    // A local-recovery error: this candidate replacement
                    // is abandoned; the rest of the run proceeds.
                    log::warn!("skipping replacement for rule {}: {e}", self.name);
                    return None;
                }
            }
        }
        None
    }

    // ── Block rewriting ────────────────────────────────────────────────

    fn rewrite_block<'a>(&'a self, block: &'a Block, env: Env<'a>, out: &mut Vec<Replacement>) {
        for before in &self.before {
            let Template::Block(template) = before else {
                continue;
            };
            let matches = template.matches(&block.stmts, env);
            if matches.is_empty() {
                continue;
            }
            for matched in &matches {
                self.replace_block_match(block, matched, out);
            }
            // The first before-template that matches owns this block.
            break;
        }
    }

    /// Splice the inlined statements over the matched run: statements
    /// replace pairwise; surplus targets are deleted; surplus
    /// replacements merge into the final statement's slot.
    fn replace_block_match(
        &self,
        block: &Block,
        matched: &BlockTemplateMatch<'_>,
        out: &mut Vec<Replacement>,
    ) {
        let Template::Block(after) = &self.after[0] else {
            unreachable!("rule shapes are validated at construction");
        };
        let mut inliner = matched.unifier.create_inliner();
        let inlined = match after.inline_stmts(&mut inliner) {
            Ok(stmts) => stmts,
            Err(e) => {
                log::warn!("skipping replacement for rule {}: {e}", self.name);
                return;
            }
        };
        let targets = &block.stmts[matched.start..matched.end];
        let mut pieces: Vec<(Span, String)> = Vec::new();
        if inlined.len() <= targets.len() {
            for (i, stmt) in inlined.iter().enumerate() {
                pieces.push((targets[i].span, render::stmt(stmt)));
            }
            for target in &targets[inlined.len()..] {
                pieces.push((target.span, String::new()));
            }
        } else {
            let last = targets.len() - 1;
            for (i, target) in targets[..last].iter().enumerate() {
                pieces.push((target.span, render::stmt(&inlined[i])));
            }
            pieces.push((targets[last].span, render::stmts(&inlined[last..])));
        }
        let imports = inliner.imports_to_add();
        let static_imports = inliner.static_imports_to_add();
        for (i, (span, text)) in pieces.into_iter().enumerate() {
            out.push(Replacement {
                span,
                text,
                imports_to_add: if i == 0 { imports.clone() } else { Vec::new() },
                static_imports_to_add: if i == 0 { static_imports.clone() } else { Vec::new() },
                imports_to_remove: Vec::new(),
            });
        }
    }
}

fn template_arg_names(template: &Template) -> Vec<String> {
    match template {
        Template::Expression(t) => t.arg_names().map(str::to_owned).collect(),
        Template::Block(t) => t.arg_names().map(str::to_owned).collect(),
    }
}
