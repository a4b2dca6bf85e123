//! Shared fixtures for the engine's integration tests: a class hierarchy
//! and signature table shaped like the JDK subset the test sources use,
//! plus helpers for collecting matches as rendered binding maps.

use std::collections::BTreeMap;

use tailor_match::{Binding, Env, ExpressionTemplate, Unifier};
use tailor_syntax::ast::{Expr, Stmt, StmtKind, Unit};
use tailor_syntax::render;
use tailor_syntax::resolve::{Globals, MethodSig};
use tailor_types::{BoundKind, Ty, TypeVarDecl, Types};

pub struct Fixture {
    pub types: Types,
    pub globals: Globals,
}

pub fn fixture() -> Fixture {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut types = Types::with_defaults();
    types.add_class("java.io.PrintStream", &[], vec![]);
    types.add_class("java.lang.System", &[], vec![]);
    types.add_class("java.lang.Math", &[], vec![]);
    types.add_class("java.lang.Exception", &[], vec![]);
    types.add_class("java.security.MessageDigest", &[], vec![]);
    types.add_class("java.math.BigInteger", &[], vec![]);
    types.add_class("java.util.Random", &[], vec![]);
    types.add_class(
        "java.math.RoundingMode",
        &[],
        vec![Ty::generic("java.lang.Enum", vec![Ty::class("java.math.RoundingMode")])],
    );
    types.add_class(
        "com.google.common.collect.ImmutableList",
        &["E"],
        vec![Ty::generic("java.util.List", vec![Ty::var("E")])],
    );
    types.add_class("com.example.Util", &[], vec![]);

    let mut globals = Globals::new();
    globals.add_static_field("java.lang.System", "out", Ty::class("java.io.PrintStream"));
    globals.add_static_field("java.lang.System", "err", Ty::class("java.io.PrintStream"));
    globals.add_static_field(
        "java.math.RoundingMode",
        "FLOOR",
        Ty::class("java.math.RoundingMode"),
    );
    globals.add_method(
        "java.io.PrintStream",
        "println",
        MethodSig::simple(vec![Ty::object()], Ty::void()),
    );
    globals.add_static("java.lang.Math", "random", MethodSig::simple(vec![], Ty::double()));
    globals.add_static(
        "java.lang.Integer",
        "parseInt",
        MethodSig::simple(vec![Ty::string()], Ty::int()),
    );
    globals.add_method(
        "java.lang.String",
        "getBytes",
        MethodSig::simple(vec![], Ty::array(Ty::byte())),
    );
    globals.add_method(
        "java.lang.Enum",
        "name",
        MethodSig::simple(vec![], Ty::string()),
    );
    globals.add_method(
        "java.security.MessageDigest",
        "digest",
        MethodSig::simple(vec![Ty::array(Ty::byte())], Ty::array(Ty::byte())),
    );
    globals.add_static(
        "java.security.MessageDigest",
        "getInstance",
        MethodSig::simple(vec![Ty::string()], Ty::class("java.security.MessageDigest")),
    );
    globals.add_static(
        "java.math.BigInteger",
        "valueOf",
        MethodSig::simple(vec![Ty::long()], Ty::class("java.math.BigInteger")),
    );
    globals.add_method("java.util.Random", "nextInt", MethodSig::simple(vec![], Ty::int()));
    globals.add_method(
        "java.util.List",
        "add",
        MethodSig::simple(vec![Ty::var("E")], Ty::boolean()),
    );
    globals.add_static(
        "java.util.Collections",
        "singletonList",
        MethodSig::generic(
            vec![TypeVarDecl::new("T")],
            vec![Ty::var("T")],
            Ty::generic("java.util.List", vec![Ty::var("T")]),
        ),
    );
    globals.add_static(
        "java.util.Collections",
        "unmodifiableList",
        MethodSig::generic(
            vec![TypeVarDecl::new("T")],
            vec![Ty::generic(
                "java.util.List",
                vec![Ty::wildcard(BoundKind::Extends, Ty::var("T"))],
            )],
            Ty::generic("java.util.List", vec![Ty::var("T")]),
        ),
    );
    globals.add_static(
        "java.util.Collections",
        "sort",
        MethodSig::generic(
            vec![TypeVarDecl::new("T")],
            vec![
                Ty::generic("java.util.List", vec![Ty::var("T")]),
                Ty::generic(
                    "java.util.Comparator",
                    vec![Ty::wildcard(BoundKind::Super, Ty::var("T"))],
                ),
            ],
            Ty::void(),
        ),
    );
    globals.add_static(
        "com.google.common.collect.ImmutableList",
        "copyOf",
        MethodSig::generic(
            vec![TypeVarDecl::new("E")],
            vec![Ty::generic(
                "java.util.Collection",
                vec![Ty::wildcard(BoundKind::Extends, Ty::var("E"))],
            )],
            Ty::generic("com.google.common.collect.ImmutableList", vec![Ty::var("E")]),
        ),
    );
    globals.add_static(
        "com.google.common.collect.ImmutableList",
        "of",
        MethodSig::generic(
            vec![TypeVarDecl::new("E")],
            vec![Ty::var("E")],
            Ty::generic("com.google.common.collect.ImmutableList", vec![Ty::var("E")]),
        ),
    );
    globals.add_static(
        "com.example.Util",
        "sum",
        MethodSig::simple(vec![Ty::int(), Ty::array(Ty::int())], Ty::int()).with_varargs(),
    );

    for fq in [
        "java.util.List",
        "java.util.ArrayList",
        "java.util.Collections",
        "java.util.Comparator",
        "java.util.Random",
        "java.security.MessageDigest",
        "java.math.BigInteger",
        "java.math.RoundingMode",
        "com.google.common.collect.ImmutableList",
        "com.example.Util",
        "java.lang.Exception",
    ] {
        globals.import_class(fq);
    }
    Fixture { types, globals }
}

pub fn compile(src: &str, fixture: &Fixture) -> Unit {
    tailor_syntax::compile_unit(src, &fixture.types, &fixture.globals)
        .unwrap_or_else(|errors| panic!("compile failure for {src:?}: {errors:?}"))
}

/// Every expression node in the unit, preorder.
pub fn all_exprs(unit: &Unit) -> Vec<&Expr> {
    let mut out = Vec::new();
    for stmt in &unit.block.stmts {
        collect_stmt_exprs(stmt, &mut out);
    }
    out
}

fn collect_stmt_exprs<'a>(stmt: &'a Stmt, out: &mut Vec<&'a Expr>) {
    fn push_all<'a>(e: &'a Expr, out: &mut Vec<&'a Expr>) {
        e.walk(&mut |sub| out.push(sub));
    }
    match &stmt.kind {
        StmtKind::Expr(e) | StmtKind::Throw(e) => push_all(e, out),
        StmtKind::VarDecl(d) => {
            if let Some(init) = &d.init {
                push_all(init, out);
            }
        }
        StmtKind::Return(value) => {
            if let Some(e) = value {
                push_all(e, out);
            }
        }
        StmtKind::Block(b) => b.stmts.iter().for_each(|s| collect_stmt_exprs(s, out)),
        StmtKind::If { cond, then_stmt, else_stmt } => {
            push_all(cond, out);
            collect_stmt_exprs(then_stmt, out);
            if let Some(e) = else_stmt {
                collect_stmt_exprs(e, out);
            }
        }
        StmtKind::While { cond, body } => {
            push_all(cond, out);
            collect_stmt_exprs(body, out);
        }
        StmtKind::DoWhile { body, cond } => {
            collect_stmt_exprs(body, out);
            push_all(cond, out);
        }
        StmtKind::For { init, cond, update, body } => {
            init.iter().for_each(|s| collect_stmt_exprs(s, out));
            if let Some(c) = cond {
                push_all(c, out);
            }
            update.iter().for_each(|e| push_all(e, out));
            collect_stmt_exprs(body, out);
        }
        StmtKind::Try { body, catches, finally } => {
            body.stmts.iter().for_each(|s| collect_stmt_exprs(s, out));
            for c in catches {
                c.body.stmts.iter().for_each(|s| collect_stmt_exprs(s, out));
            }
            if let Some(f) = finally {
                f.stmts.iter().for_each(|s| collect_stmt_exprs(s, out));
            }
        }
        StmtKind::Labeled { stmt, .. } => collect_stmt_exprs(stmt, out),
        StmtKind::Break { .. } | StmtKind::Continue { .. } => {}
    }
}

/// The bindings of a unifier, rendered to text keyed by name.
pub fn binding_strings(unifier: &Unifier<'_>) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for (key, binding) in unifier.bindings().iter() {
        let text = match binding {
            Binding::Expr(e) => render::expr(e),
            Binding::ExprList(list) => {
                let parts: Vec<String> = list.iter().map(render::expr).collect();
                format!("[{}]", parts.join(", "))
            }
            Binding::Stmts(stmts) => render::stmts(stmts),
            Binding::LocalVar(v) => v.name.clone(),
            Binding::TypeVar(t) => t.ty.to_string(),
            Binding::Label(l) => l.clone(),
        };
        out.insert(key.name().to_owned(), text);
    }
    out
}

/// Match the template against every expression node of the unit,
/// returning the rendered bindings of each match in source order.
pub fn expr_matches(
    template: &ExpressionTemplate,
    unit: &Unit,
    fixture: &Fixture,
) -> Vec<BTreeMap<String, String>> {
    let env = Env::new(&fixture.types).with_imports(&unit.imports);
    let mut out = Vec::new();
    for expr in all_exprs(unit) {
        if let Some(matched) = template.match_at(expr, env) {
            out.push(binding_strings(&matched.unifier));
        }
    }
    out
}

/// Convenience for building the expected binding maps.
pub fn bindings_of(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect()
}
