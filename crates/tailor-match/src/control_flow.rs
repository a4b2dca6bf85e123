//! Control-flow classification of target statements.
//!
//! Decides whether a statement run never exits, may return, may break out
//! of the analyzed region, or always returns. Block matching uses this to
//! legalize the implicit-else rewrite, and statement placeholders use it
//! to refuse to swallow control flow their declaration does not admit.

use rustc_hash::FxHashSet;
use tailor_syntax::ast::{Stmt, StmtKind};

/// How a sequence of statements can terminate.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Flow {
    NeverExits,
    MayBreakOrReturn,
    MayReturn,
    AlwaysReturns,
}

impl Flow {
    /// Combine the flows of two alternative branches.
    pub fn or(self, other: Flow) -> Flow {
        use Flow::*;
        match (self, other) {
            (NeverExits, MayBreakOrReturn | NeverExits) => other,
            (NeverExits, _) => MayReturn,
            (MayBreakOrReturn, _) => MayBreakOrReturn,
            (MayReturn, MayBreakOrReturn) => MayBreakOrReturn,
            (MayReturn, _) => MayReturn,
            (AlwaysReturns, MayBreakOrReturn | AlwaysReturns) => other,
            (AlwaysReturns, _) => MayReturn,
        }
    }

    /// Combine the flows of two statements in sequence.
    pub fn then(self, other: Flow) -> Flow {
        use Flow::*;
        match (self, other) {
            (NeverExits, _) => other,
            (MayBreakOrReturn, _) => MayBreakOrReturn,
            (MayReturn, MayBreakOrReturn | AlwaysReturns) => other,
            (MayReturn, _) => MayReturn,
            (AlwaysReturns, _) => AlwaysReturns,
        }
    }
}

/// Labels defined inside the analyzed region, plus the loop nesting
/// depth: a `break`/`continue` targeting either stays internal.
struct BreakContext {
    internal_labels: FxHashSet<String>,
    loop_depth: u32,
}

impl BreakContext {
    fn new() -> Self {
        BreakContext { internal_labels: FxHashSet::default(), loop_depth: 0 }
    }
}

/// Classify a single statement.
pub fn stmt_flow(stmt: &Stmt) -> Flow {
    visit(stmt, &mut BreakContext::new())
}

/// Classify a statement sequence.
pub fn stmts_flow(stmts: &[Stmt]) -> Flow {
    visit_all(stmts, &mut BreakContext::new())
}

fn visit_all(stmts: &[Stmt], cxt: &mut BreakContext) -> Flow {
    let mut result = Flow::NeverExits;
    for stmt in stmts {
        result = result.then(visit(stmt, cxt));
    }
    result
}

fn visit(stmt: &Stmt, cxt: &mut BreakContext) -> Flow {
    match &stmt.kind {
        StmtKind::Expr(_) | StmtKind::VarDecl(_) => Flow::NeverExits,
        StmtKind::Block(b) => visit_all(&b.stmts, cxt),
        StmtKind::If { then_stmt, else_stmt, .. } => {
            let then_flow = visit(then_stmt, cxt);
            let else_flow = match else_stmt {
                Some(e) => visit(e, cxt),
                None => Flow::NeverExits,
            };
            then_flow.or(else_flow)
        }
        StmtKind::While { body, .. } | StmtKind::DoWhile { body, .. } => {
            cxt.loop_depth += 1;
            let flow = visit(body, cxt).or(Flow::NeverExits);
            cxt.loop_depth -= 1;
            flow
        }
        StmtKind::For { body, .. } => {
            cxt.loop_depth += 1;
            let flow = visit(body, cxt).or(Flow::NeverExits);
            cxt.loop_depth -= 1;
            flow
        }
        StmtKind::Try { body, catches, finally } => {
            let mut flow = visit_all(&body.stmts, cxt);
            for c in catches {
                flow = flow.or(visit_all(&c.body.stmts, cxt));
            }
            if let Some(f) = finally {
                flow = flow.then(visit_all(&f.stmts, cxt));
            }
            flow
        }
        StmtKind::Labeled { label, stmt } => {
            cxt.internal_labels.insert(label.clone());
            let flow = visit(stmt, cxt);
            cxt.internal_labels.remove(label);
            flow
        }
        StmtKind::Break { label } | StmtKind::Continue { label } => {
            let internal = match label {
                Some(l) => cxt.internal_labels.contains(l),
                None => cxt.loop_depth > 0,
            };
            if internal {
                Flow::NeverExits
            } else {
                Flow::MayBreakOrReturn
            }
        }
        StmtKind::Return(_) | StmtKind::Throw(_) => Flow::AlwaysReturns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tailor_syntax::parser::parse_stmts;

    fn flow_of(src: &str) -> Flow {
        stmts_flow(&parse_stmts(src).expect("parse failure"))
    }

    #[test]
    fn straight_line_code_never_exits() {
        assert_eq!(flow_of("x = 1; foo(x);"), Flow::NeverExits);
    }

    #[test]
    fn return_always_returns() {
        assert_eq!(flow_of("return x;"), Flow::AlwaysReturns);
        assert_eq!(flow_of("throw e;"), Flow::AlwaysReturns);
    }

    #[test]
    fn one_armed_if_may_return() {
        assert_eq!(flow_of("if (c) { return 1; }"), Flow::MayReturn);
    }

    #[test]
    fn both_arms_returning_always_return() {
        assert_eq!(
            flow_of("if (c) { return 1; } else { return 2; }"),
            Flow::AlwaysReturns
        );
    }

    #[test]
    fn code_after_a_may_return_keeps_it_alive() {
        assert_eq!(flow_of("if (c) { return 1; } x = 2;"), Flow::MayReturn);
        assert_eq!(flow_of("if (c) { return 1; } return 2;"), Flow::AlwaysReturns);
    }

    #[test]
    fn breaks_inside_loops_stay_internal() {
        assert_eq!(flow_of("while (c) { break; }"), Flow::NeverExits);
        assert_eq!(flow_of("break;"), Flow::MayBreakOrReturn);
        assert_eq!(
            flow_of("outer: while (c) { break outer; }"),
            Flow::NeverExits
        );
    }

    #[test]
    fn try_finally_sequences() {
        assert_eq!(
            flow_of("try { return 1; } finally { x = 2; }"),
            Flow::AlwaysReturns
        );
        assert_eq!(
            flow_of("try { x = 1; } catch (Exception e) { return 2; }"),
            Flow::MayReturn
        );
    }
}
