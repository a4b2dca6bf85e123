//! Rendering trees back to source text.
//!
//! Rendering is precedence-aware: parentheses are inserted only where the
//! child's precedence demands them, so synthesized replacement trees print
//! in minimal form while still round-tripping to an equivalent tree.
//! Explicit `Paren` nodes always print their parentheses.

use crate::ast::{Block, Expr, ExprKind, Lit, Stmt, StmtKind};

/// No surrounding context; nothing is parenthesized at this level.
pub const PREC_NONE: u8 = 0;
pub const PREC_ASSIGN: u8 = 2;
pub const PREC_COND: u8 = 3;
pub const PREC_OR: u8 = 4;
pub const PREC_AND: u8 = 5;
pub const PREC_EQ: u8 = 8;
pub const PREC_REL: u8 = 9;
pub const PREC_ADD: u8 = 11;
pub const PREC_MUL: u8 = 12;
pub const PREC_UNARY: u8 = 14;
pub const PREC_POSTFIX: u8 = 15;
pub const PREC_ATOM: u8 = 16;

/// The precedence of an expression node itself.
pub fn precedence(kind: &ExprKind) -> u8 {
    match kind {
        ExprKind::Assign { .. } | ExprKind::CompoundAssign { .. } => PREC_ASSIGN,
        ExprKind::Conditional { .. } => PREC_COND,
        ExprKind::Binary { op, .. } => binary_prec(*op),
        ExprKind::InstanceOf { .. } => PREC_REL,
        ExprKind::Unary { op, .. } if op.is_prefix() => PREC_UNARY,
        ExprKind::Unary { .. } => PREC_POSTFIX,
        ExprKind::Cast { .. } => PREC_UNARY,
        ExprKind::Select { .. } | ExprKind::Call { .. } | ExprKind::ArrayAccess { .. } => {
            PREC_POSTFIX
        }
        ExprKind::NewClass { .. } | ExprKind::NewArray { .. } => PREC_POSTFIX,
        ExprKind::Lit(_) | ExprKind::Ident(_) | ExprKind::Paren(_) => PREC_ATOM,
    }
}

fn binary_prec(op: crate::ast::BinaryOp) -> u8 {
    use crate::ast::BinaryOp::*;
    match op {
        Or => PREC_OR,
        And => PREC_AND,
        Eq | Ne => PREC_EQ,
        Lt | Le | Gt | Ge => PREC_REL,
        Add | Sub => PREC_ADD,
        Mul | Div | Rem => PREC_MUL,
    }
}

/// The minimum precedence required of the child at `index` within
/// `parent` for it to print without parentheses. Mirrors the rendering
/// rules below; the rewrite driver uses it to decide whether a
/// replacement needs wrapping at the match site.
pub fn child_min_prec(parent: &ExprKind, index: usize) -> u8 {
    match parent {
        ExprKind::Binary { op, .. } => {
            let p = binary_prec(*op);
            if index == 0 {
                p
            } else {
                p + 1
            }
        }
        ExprKind::Conditional { .. } => match index {
            0 => PREC_COND + 1,
            1 => PREC_NONE,
            _ => PREC_COND,
        },
        ExprKind::Assign { .. } | ExprKind::CompoundAssign { .. } => {
            if index == 0 {
                PREC_POSTFIX
            } else {
                PREC_ASSIGN
            }
        }
        ExprKind::Unary { .. } | ExprKind::Cast { .. } => PREC_UNARY,
        ExprKind::InstanceOf { .. } => PREC_REL,
        ExprKind::Select { .. } => PREC_POSTFIX,
        ExprKind::Call { .. } | ExprKind::ArrayAccess { .. } => {
            if index == 0 {
                PREC_POSTFIX
            } else {
                PREC_NONE
            }
        }
        _ => PREC_NONE,
    }
}

/// Render an expression with no outer context.
pub fn expr(e: &Expr) -> String {
    expr_prec(e, PREC_NONE)
}

/// Render an expression, parenthesizing it if its own precedence is below
/// what the context requires.
pub fn expr_prec(e: &Expr, min: u8) -> String {
    let text = raw_expr(e);
    if precedence(&e.kind) < min {
        format!("({text})")
    } else {
        text
    }
}

fn raw_expr(e: &Expr) -> String {
    match &e.kind {
        ExprKind::Lit(lit) => lit_text(lit),
        ExprKind::Ident(id) => id.name.clone(),
        ExprKind::Select { base, name } => {
            format!("{}.{}", expr_prec(base, PREC_POSTFIX), name)
        }
        ExprKind::Call { callee, args } => {
            let args: Vec<String> = args.iter().map(|a| expr_prec(a, PREC_NONE)).collect();
            format!("{}({})", expr_prec(callee, PREC_POSTFIX), args.join(", "))
        }
        ExprKind::Unary { op, operand } => {
            if op.is_prefix() {
                format!("{}{}", op.symbol(), expr_prec(operand, PREC_UNARY))
            } else {
                format!("{}{}", expr_prec(operand, PREC_POSTFIX), op.symbol())
            }
        }
        ExprKind::Binary { op, lhs, rhs } => {
            let p = binary_prec(*op);
            format!(
                "{} {} {}",
                expr_prec(lhs, p),
                op.symbol(),
                expr_prec(rhs, p + 1)
            )
        }
        ExprKind::Assign { lhs, rhs } => {
            format!("{} = {}", expr_prec(lhs, PREC_POSTFIX), expr_prec(rhs, PREC_ASSIGN))
        }
        ExprKind::CompoundAssign { op, lhs, rhs } => {
            format!(
                "{} {}= {}",
                expr_prec(lhs, PREC_POSTFIX),
                op.symbol(),
                expr_prec(rhs, PREC_ASSIGN)
            )
        }
        ExprKind::Conditional { cond, then_expr, else_expr } => {
            format!(
                "{} ? {} : {}",
                expr_prec(cond, PREC_COND + 1),
                expr_prec(then_expr, PREC_NONE),
                expr_prec(else_expr, PREC_COND)
            )
        }
        ExprKind::Paren(inner) => format!("({})", expr_prec(inner, PREC_NONE)),
        ExprKind::Cast { ty, expr: operand } => {
            format!("({}) {}", ty.written, expr_prec(operand, PREC_UNARY))
        }
        ExprKind::InstanceOf { expr: operand, ty } => {
            format!("{} instanceof {}", expr_prec(operand, PREC_REL), ty.written)
        }
        ExprKind::ArrayAccess { array, index } => {
            format!("{}[{}]", expr_prec(array, PREC_POSTFIX), expr_prec(index, PREC_NONE))
        }
        ExprKind::NewClass { class, args } => {
            let args: Vec<String> = args.iter().map(|a| expr_prec(a, PREC_NONE)).collect();
            format!("new {}({})", class.written, args.join(", "))
        }
        ExprKind::NewArray { elem, dims, init } => {
            if let Some(init) = init {
                let items: Vec<String> = init.iter().map(|i| expr_prec(i, PREC_NONE)).collect();
                format!("new {}[] {{{}}}", elem.written, items.join(", "))
            } else {
                let dims: Vec<String> =
                    dims.iter().map(|d| format!("[{}]", expr_prec(d, PREC_NONE))).collect();
                format!("new {}{}", elem.written, dims.join(""))
            }
        }
    }
}

fn lit_text(lit: &Lit) -> String {
    match lit {
        Lit::Bool(b) => b.to_string(),
        Lit::Char(c) => format!("'{}'", escape_char(*c)),
        Lit::Int(v) => v.to_string(),
        Lit::Long(v) => format!("{v}L"),
        Lit::Double(v) => {
            if v.fract() == 0.0 && v.is_finite() {
                format!("{v:.1}")
            } else {
                format!("{v}")
            }
        }
        Lit::Str(s) => {
            let escaped: String = s.chars().map(escape_char).collect();
            format!("\"{escaped}\"")
        }
        Lit::Null => "null".to_owned(),
    }
}

fn escape_char(c: char) -> String {
    match c {
        '\n' => "\\n".to_owned(),
        '\t' => "\\t".to_owned(),
        '\r' => "\\r".to_owned(),
        '\\' => "\\\\".to_owned(),
        '"' => "\\\"".to_owned(),
        '\'' => "\\'".to_owned(),
        other => other.to_string(),
    }
}

/// Render a statement on a single line (nested blocks print inline).
pub fn stmt(s: &Stmt) -> String {
    match &s.kind {
        StmtKind::Expr(e) => format!("{};", expr(e)),
        StmtKind::VarDecl(decl) => match &decl.init {
            Some(init) => format!("{} {} = {};", decl.ty.written, decl.name, expr(init)),
            None => format!("{} {};", decl.ty.written, decl.name),
        },
        StmtKind::Block(b) => block(b),
        StmtKind::If { cond, then_stmt, else_stmt } => {
            let mut out = format!("if ({}) {}", expr(cond), stmt(then_stmt));
            if let Some(e) = else_stmt {
                out.push_str(" else ");
                out.push_str(&stmt(e));
            }
            out
        }
        StmtKind::While { cond, body } => format!("while ({}) {}", expr(cond), stmt(body)),
        StmtKind::DoWhile { body, cond } => {
            format!("do {} while ({});", stmt(body), expr(cond))
        }
        StmtKind::For { init, cond, update, body } => {
            let init_text = match init.as_slice() {
                [] => String::new(),
                stmts => {
                    let parts: Vec<String> =
                        stmts.iter().map(|s| stmt(s).trim_end_matches(';').to_owned()).collect();
                    parts.join(", ")
                }
            };
            let cond_text = cond.as_ref().map(expr).unwrap_or_default();
            let update_text: Vec<String> = update.iter().map(expr).collect();
            format!(
                "for ({init_text}; {cond_text}; {}) {}",
                update_text.join(", "),
                stmt(body)
            )
        }
        StmtKind::Try { body, catches, finally } => {
            let mut out = format!("try {}", block(body));
            for c in catches {
                out.push_str(&format!(
                    " catch ({} {}) {}",
                    c.param.ty.written,
                    c.param.name,
                    block(&c.body)
                ));
            }
            if let Some(f) = finally {
                out.push_str(&format!(" finally {}", block(f)));
            }
            out
        }
        StmtKind::Labeled { label, stmt: inner } => format!("{label}: {}", stmt(inner)),
        StmtKind::Break { label: Some(l) } => format!("break {l};"),
        StmtKind::Break { label: None } => "break;".to_owned(),
        StmtKind::Continue { label: Some(l) } => format!("continue {l};"),
        StmtKind::Continue { label: None } => "continue;".to_owned(),
        StmtKind::Return(Some(e)) => format!("return {};", expr(e)),
        StmtKind::Return(None) => "return;".to_owned(),
        StmtKind::Throw(e) => format!("throw {};", expr(e)),
    }
}

/// Render a statement sequence, one statement per line.
pub fn stmts(list: &[Stmt]) -> String {
    let parts: Vec<String> = list.iter().map(stmt).collect();
    parts.join("\n")
}

/// Render a block inline: `{ stmt stmt }`.
pub fn block(b: &Block) -> String {
    if b.stmts.is_empty() {
        return "{}".to_owned();
    }
    let parts: Vec<String> = b.stmts.iter().map(stmt).collect();
    format!("{{ {} }}", parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_expr, parse_stmts};

    fn round_trip(src: &str) -> String {
        expr(&parse_expr(src).expect("parse failure"))
    }

    #[test]
    fn explicit_parens_survive() {
        assert_eq!(round_trip("(a + b) / 2"), "(a + b) / 2");
        assert_eq!(round_trip("(x)"), "(x)");
    }

    #[test]
    fn minimal_rendering_keeps_meaning() {
        assert_eq!(round_trip("a + b * c"), "a + b * c");
        assert_eq!(round_trip("a.b(c, d)[0]"), "a.b(c, d)[0]");
        assert_eq!(round_trip("cond ? a : b"), "cond ? a : b");
        assert_eq!(round_trip("!done"), "!done");
    }

    #[test]
    fn literal_forms() {
        assert_eq!(round_trip("32L"), "32L");
        assert_eq!(round_trip("\"foo\\n\""), "\"foo\\n\"");
        assert_eq!(round_trip("1.5"), "1.5");
        assert_eq!(round_trip("null"), "null");
    }

    #[test]
    fn statements_render_on_one_line() {
        let stmts_in = parse_stmts("if (cond) { return 1; } return 2;").unwrap();
        assert_eq!(stmt(&stmts_in[0]), "if (cond) { return 1; }");
        assert_eq!(stmt(&stmts_in[1]), "return 2;");
        assert_eq!(
            stmts(&stmts_in),
            "if (cond) { return 1; }\nreturn 2;"
        );
    }

    #[test]
    fn new_expressions() {
        assert_eq!(round_trip("new ArrayList<String>(foo)"), "new ArrayList<String>(foo)");
        assert_eq!(round_trip("new String[] {\"foo\"}"), "new String[] {\"foo\"}");
    }
}
