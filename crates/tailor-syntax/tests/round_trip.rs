//! End-to-end front-end tests: parse, resolve, render.

use tailor_syntax::ast::{ExprKind, Resolution, StmtKind};
use tailor_syntax::render;
use tailor_syntax::resolve::{Globals, MethodSig};
use tailor_types::{Ty, Types, TypeVarDecl};

fn env() -> (Types, Globals) {
    let types = Types::with_defaults();
    let mut globals = Globals::new();
    globals.import_class("java.util.List");
    globals.import_class("java.util.ArrayList");
    globals.import_class("java.util.Collections");
    globals.add_static(
        "java.util.Collections",
        "singletonList",
        MethodSig::generic(
            vec![TypeVarDecl::new("T")],
            vec![Ty::var("T")],
            Ty::generic("java.util.List", vec![Ty::var("T")]),
        ),
    );
    (types, globals)
}

#[test]
fn compile_and_render_round_trip() {
    let (types, mut globals) = env();
    globals.declare_var("flag", Ty::boolean());
    let block = tailor_syntax::compile_block(
        "List<String> xs = new ArrayList<String>();\nint n = flag ? 1 : 2;",
        &types,
        &globals,
    )
    .expect("compile failure");

    assert_eq!(
        render::stmt(&block.stmts[0]),
        "List<String> xs = new ArrayList<String>();"
    );
    insta::assert_snapshot!(render::stmt(&block.stmts[1]), @"int n = flag ? 1 : 2;");
}

#[test]
fn statements_keep_their_structure() {
    let (types, mut globals) = env();
    globals.declare_var("cond", Ty::boolean());
    let block = tailor_syntax::compile_block(
        "if (cond) { return 1; } return 2;",
        &types,
        &globals,
    )
    .expect("compile failure");

    insta::assert_snapshot!(
        render::stmts(&block.stmts),
        @r"
    if (cond) { return 1; }
    return 2;
    "
    );
}

#[test]
fn resolution_annotates_identifiers_and_calls() {
    let (types, globals) = env();
    let block = tailor_syntax::compile_block(
        "List<Integer> ints = Collections.singletonList(1);",
        &types,
        &globals,
    )
    .expect("compile failure");

    let StmtKind::VarDecl(decl) = &block.stmts[0].kind else {
        panic!("expected declaration");
    };
    assert_eq!(decl.ty.ty, Ty::generic("java.util.List", vec![Ty::class("java.lang.Integer")]));
    let init = decl.init.as_ref().unwrap();
    assert_eq!(init.ty, Ty::generic("java.util.List", vec![Ty::class("java.lang.Integer")]));
    let ExprKind::Call { callee, .. } = &init.kind else {
        panic!("expected call");
    };
    let ExprKind::Select { base, name } = &callee.kind else {
        panic!("expected select");
    };
    assert_eq!(name, "singletonList");
    let ExprKind::Ident(id) = &base.kind else {
        panic!("expected class reference");
    };
    assert_eq!(id.res, Resolution::Class("java.util.Collections".to_owned()));
}

#[test]
fn unresolved_units_report_every_error() {
    let (types, globals) = env();
    let result = tailor_syntax::compile_block("alpha; beta;", &types, &globals);
    let errors = result.expect_err("expected resolution errors");
    assert_eq!(errors.len(), 2);
}
