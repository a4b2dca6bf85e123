//! Rule-level tests: matching plus replacement rendering, negation,
//! varargs, placeholders, and rule validation.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};

use common::{bindings_of, compile, expr_matches, fixture, Fixture};
use tailor_match::{
    BlockTemplate, Env, ExpressionTemplate, Flow, MatchError, PlaceholderMethod,
    PlaceholderParam, Replacement, RewriteRule, RuleError, Template, UExpr, UPlaceholderExpr,
    UPlaceholderStmt, UStmt, UTy, UTypeVar,
};
use tailor_syntax::ast::BinaryOp;
use tailor_types::Ty;

fn span_text<'s>(src: &'s str, replacement: &Replacement) -> &'s str {
    &src[replacement.span.start as usize..replacement.span.end as usize]
}

/// before(x) = ImmutableList.copyOf(Collections.singletonList(x))
/// after(x)  = ImmutableList.of(x)
fn singleton_copy_rule() -> RewriteRule {
    let args = vec![("x".to_owned(), UTy::var("E"))];
    let before = ExpressionTemplate::new(
        vec![UTypeVar::new("E")],
        args.clone(),
        UExpr::call(
            UExpr::static_select("com.google.common.collect.ImmutableList", "copyOf"),
            vec![UExpr::call(
                UExpr::static_select("java.util.Collections", "singletonList"),
                vec![UExpr::free("x")],
            )],
        ),
        UTy::generic("com.google.common.collect.ImmutableList", vec![UTy::var("E")]),
    );
    let after = ExpressionTemplate::new(
        vec![UTypeVar::new("E")],
        args,
        UExpr::call(
            UExpr::static_select("com.google.common.collect.ImmutableList", "of"),
            vec![UExpr::free("x")],
        ),
        UTy::generic("com.google.common.collect.ImmutableList", vec![UTy::var("E")]),
    );
    RewriteRule::new(
        "SingletonListCopy",
        vec![Template::Expression(before)],
        vec![Template::Expression(after)],
    )
    .expect("valid rule")
}

#[test]
fn copy_of_singleton_list_rewrites_to_of() {
    let f = fixture();
    let mut globals = f.globals.clone();
    globals.declare_var("str", Ty::string());
    let f = Fixture { types: f.types, globals };

    let src = "ImmutableList.copyOf(Collections.singletonList(str.getBytes()));";
    let unit = compile(src, &f);
    let env = Env::new(&f.types).with_imports(&unit.imports);

    let replacements = singleton_copy_rule().rewrite(&unit, env).unwrap();
    assert_eq!(replacements.len(), 1);
    assert_eq!(
        span_text(src, &replacements[0]),
        "ImmutableList.copyOf(Collections.singletonList(str.getBytes()))"
    );
    assert_eq!(replacements[0].text, "ImmutableList.of(str.getBytes())");
    // ImmutableList is already imported by the unit.
    assert!(replacements[0].imports_to_add.is_empty());

    let json = serde_json::to_value(&replacements[0]).unwrap();
    assert_eq!(json["text"], "ImmutableList.of(str.getBytes())");
    assert_eq!(json["span"]["start"], 0);
}

#[test]
fn copy_of_something_else_does_not_match() {
    let f = fixture();
    let mut globals = f.globals.clone();
    globals.declare_var(
        "someOtherList",
        Ty::generic("java.util.List", vec![Ty::string()]),
    );
    let f = Fixture { types: f.types, globals };

    let unit = compile("ImmutableList.copyOf(someOtherList);", &f);
    let env = Env::new(&f.types).with_imports(&unit.imports);
    assert_eq!(singleton_copy_rule().rewrite(&unit, env).unwrap(), vec![]);
}

fn implicit_else_rule() -> RewriteRule {
    let args = vec![
        ("c".to_owned(), UTy::boolean()),
        ("a".to_owned(), UTy::int()),
        ("b".to_owned(), UTy::int()),
    ];
    let before = BlockTemplate::simple(
        args.clone(),
        vec![UStmt::if_else(
            UExpr::free("c"),
            UStmt::block(vec![UStmt::return_value(UExpr::free("a"))]),
            UStmt::block(vec![UStmt::return_value(UExpr::free("b"))]),
        )],
    );
    let after = BlockTemplate::simple(
        args,
        vec![UStmt::return_value(UExpr::conditional(
            UExpr::free("c"),
            UExpr::free("a"),
            UExpr::free("b"),
        ))],
    );
    RewriteRule::new(
        "ReturnConditional",
        vec![Template::Block(before)],
        vec![Template::Block(after)],
    )
    .expect("valid rule")
}

#[test]
fn implicit_else_matches_the_following_statements() {
    let f = fixture();
    let mut globals = f.globals.clone();
    globals.declare_var("cond", Ty::boolean());
    let f = Fixture { types: f.types, globals };

    let src = "if (cond) { return 1; } return 2;";
    let unit = compile(src, &f);
    let env = Env::new(&f.types).with_imports(&unit.imports);

    let replacements = implicit_else_rule().rewrite(&unit, env).unwrap();
    assert_eq!(replacements.len(), 2);
    assert_eq!(span_text(src, &replacements[0]), "if (cond) { return 1; }");
    insta::assert_snapshot!(replacements[0].text, @"return cond ? 1 : 2;");
    assert_eq!(span_text(src, &replacements[1]), "return 2;");
    assert_eq!(replacements[1].text, "");
}

#[test]
fn backward_strategy_matches_the_negated_source_form() {
    // A structured condition: `if (x == null) { return a; } else { return b; }`
    // rewritten to `return x == null ? a : b;`. The mirror-image source
    // negates the condition and swaps the branches.
    let args = vec![
        ("x".to_owned(), UTy::class("java.lang.Object")),
        ("a".to_owned(), UTy::int()),
        ("b".to_owned(), UTy::int()),
    ];
    let null_check = || {
        UExpr::binary(
            BinaryOp::Eq,
            UExpr::free("x"),
            UExpr::Lit(tailor_syntax::ast::Lit::Null),
        )
    };
    let before = BlockTemplate::simple(
        args.clone(),
        vec![UStmt::if_else(
            null_check(),
            UStmt::block(vec![UStmt::return_value(UExpr::free("a"))]),
            UStmt::block(vec![UStmt::return_value(UExpr::free("b"))]),
        )],
    );
    let after = BlockTemplate::simple(
        args,
        vec![UStmt::return_value(UExpr::conditional(
            null_check(),
            UExpr::free("a"),
            UExpr::free("b"),
        ))],
    );
    let rule = RewriteRule::new(
        "NullCheckConditional",
        vec![Template::Block(before)],
        vec![Template::Block(after)],
    )
    .unwrap();

    let f = fixture();
    let mut globals = f.globals.clone();
    globals.declare_var("p", Ty::object());
    let f = Fixture { types: f.types, globals };

    let src = "if (p != null) { return 2; } return 1;";
    let unit = compile(src, &f);
    let env = Env::new(&f.types).with_imports(&unit.imports);

    let replacements = rule.rewrite(&unit, env).unwrap();
    assert_eq!(replacements.len(), 2);
    assert_eq!(replacements[0].text, "return p == null ? 1 : 2;");
    assert_eq!(replacements[1].text, "");
}

#[test]
fn conditional_template_matches_both_source_forms() {
    // template: x == null ? a : b -- the structured condition forces the
    // negated/swapped strategy on the mirror-image source form.
    let template = ExpressionTemplate::simple(
        vec![
            ("x".into(), UTy::class("java.lang.Object")),
            ("a".into(), UTy::int()),
            ("b".into(), UTy::int()),
        ],
        UExpr::conditional(
            UExpr::binary(
                BinaryOp::Eq,
                UExpr::free("x"),
                UExpr::Lit(tailor_syntax::ast::Lit::Null),
            ),
            UExpr::free("a"),
            UExpr::free("b"),
        ),
        UTy::int(),
    );

    let f = fixture();
    let mut globals = f.globals.clone();
    globals.declare_var("p", Ty::object());
    let f = Fixture { types: f.types, globals };
    let unit = compile("int u = p == null ? 1 : 2;\nint v = p != null ? 2 : 1;", &f);

    assert_eq!(
        expr_matches(&template, &unit, &f),
        vec![
            bindings_of(&[("x", "p"), ("a", "1"), ("b", "2")]),
            bindings_of(&[("x", "p"), ("a", "1"), ("b", "2")]),
        ]
    );
}

#[test]
fn vararg_binding_collects_each_arity() {
    // template: Util.sum(a, b...)
    let template = ExpressionTemplate::simple(
        vec![("a".into(), UTy::int()), ("b".into(), UTy::int())],
        UExpr::call(
            UExpr::static_select("com.example.Util", "sum"),
            vec![UExpr::free("a"), UExpr::repeated("b")],
        ),
        UTy::int(),
    );

    let f = fixture();
    let mut globals = f.globals.clone();
    globals.declare_var("x", Ty::int());
    let f = Fixture { types: f.types, globals };
    let unit = compile(
        "Util.sum(x);\nUtil.sum(x, 1);\nUtil.sum(x, 1, 2, 3, 4);",
        &f,
    );

    assert_eq!(
        expr_matches(&template, &unit, &f),
        vec![
            bindings_of(&[("a", "x"), ("b", "[]")]),
            bindings_of(&[("a", "x"), ("b", "[1]")]),
            bindings_of(&[("a", "x"), ("b", "[1, 2, 3, 4]")]),
        ]
    );
}

#[test]
fn vararg_binding_splices_into_the_replacement() {
    let args = vec![("a".to_owned(), UTy::int()), ("b".to_owned(), UTy::int())];
    let before = ExpressionTemplate::simple(
        args.clone(),
        UExpr::call(
            UExpr::static_select("com.example.Util", "sum"),
            vec![UExpr::free("a"), UExpr::repeated("b")],
        ),
        UTy::int(),
    );
    let after = ExpressionTemplate::simple(
        args,
        UExpr::call(
            UExpr::static_select("com.example.Util", "sum2"),
            vec![UExpr::free("a"), UExpr::repeated("b")],
        ),
        UTy::int(),
    );
    let rule = RewriteRule::new(
        "SumToSum2",
        vec![Template::Expression(before)],
        vec![Template::Expression(after)],
    )
    .unwrap();

    let f = fixture();
    let mut globals = f.globals.clone();
    globals.declare_var("x", Ty::int());
    let f = Fixture { types: f.types, globals };
    let unit = compile("Util.sum(x, 1, 2, 3, 4);", &f);
    let env = Env::new(&f.types).with_imports(&unit.imports);

    let replacements = rule.rewrite(&unit, env).unwrap();
    assert_eq!(replacements.len(), 1);
    assert_eq!(replacements[0].text, "Util.sum2(x, 1, 2, 3, 4)");
}

#[test]
fn negation_table_is_an_involution_on_patterns() {
    for op in [BinaryOp::Eq, BinaryOp::Ne, BinaryOp::Lt, BinaryOp::Le, BinaryOp::Gt, BinaryOp::Ge]
    {
        let pattern = UExpr::binary(op, UExpr::free("a"), UExpr::free("b"));
        assert_eq!(pattern.negate().negate(), pattern);
    }
    // De Morgan on the boolean connectives.
    let conjunction = UExpr::binary(
        BinaryOp::And,
        UExpr::binary(BinaryOp::Lt, UExpr::free("a"), UExpr::free("b")),
        UExpr::binary(BinaryOp::Gt, UExpr::free("a"), UExpr::free("b")),
    );
    assert_eq!(
        conjunction.negate(),
        UExpr::binary(
            BinaryOp::Or,
            UExpr::binary(BinaryOp::Ge, UExpr::free("a"), UExpr::free("b")),
            UExpr::binary(BinaryOp::Le, UExpr::free("a"), UExpr::free("b")),
        )
    );
}

#[test]
fn negated_template_matches_negated_sources() {
    let cases = [
        (BinaryOp::Lt, "x < y;", "x >= y;"),
        (BinaryOp::Eq, "x == y;", "x != y;"),
        (BinaryOp::Gt, "x > y;", "x <= y;"),
    ];
    for (op, src, negated_src) in cases {
        let template = ExpressionTemplate::simple(
            vec![("a".into(), UTy::int()), ("b".into(), UTy::int())],
            UExpr::binary(op, UExpr::free("a"), UExpr::free("b")),
            UTy::boolean(),
        );
        let negated = template.negation();

        let f = fixture();
        let mut globals = f.globals.clone();
        globals.declare_var("x", Ty::int());
        globals.declare_var("y", Ty::int());
        let f = Fixture { types: f.types, globals };

        let unit = compile(src, &f);
        assert_eq!(expr_matches(&template, &unit, &f).len(), 1, "{src}");
        assert_eq!(expr_matches(&negated, &unit, &f).len(), 0, "{src}");

        let negated_unit = compile(negated_src, &f);
        assert_eq!(expr_matches(&negated, &negated_unit, &f).len(), 1, "{negated_src}");
        assert_eq!(expr_matches(&template, &negated_unit, &f).len(), 0, "{negated_src}");
    }
}

#[test]
fn rule_negation_rewrites_the_mirror_rule() {
    // before(x) = (x == null), after(x) = Util.isNull(x); the negation
    // rewrites x != null to !Util.isNull(x).
    let args = vec![("x".to_owned(), UTy::class("java.lang.Object"))];
    let before = ExpressionTemplate::simple(
        args.clone(),
        UExpr::binary(BinaryOp::Eq, UExpr::free("x"), UExpr::Lit(tailor_syntax::ast::Lit::Null)),
        UTy::boolean(),
    );
    let after = ExpressionTemplate::simple(
        args,
        UExpr::call(
            UExpr::static_select("com.example.Util", "isNull"),
            vec![UExpr::free("x")],
        ),
        UTy::boolean(),
    );
    let rule = RewriteRule::new(
        "IsNull",
        vec![Template::Expression(before)],
        vec![Template::Expression(after)],
    )
    .unwrap();
    let negation = rule.negation().unwrap();

    let f = fixture();
    let mut types = f.types.clone();
    types.add_class("com.example.Util", &[], vec![]);
    let mut globals = f.globals.clone();
    globals.add_static(
        "com.example.Util",
        "isNull",
        tailor_syntax::resolve::MethodSig::simple(vec![Ty::object()], Ty::boolean()),
    );
    globals.declare_var("p", Ty::object());
    let f = Fixture { types, globals };

    let unit = compile("boolean t = p != null;", &f);
    let env = Env::new(&f.types).with_imports(&unit.imports);
    assert_eq!(rule.rewrite(&unit, env).unwrap(), vec![]);
    let replacements = negation.rewrite(&unit, env).unwrap();
    assert_eq!(replacements.len(), 1);
    assert_eq!(replacements[0].text, "!Util.isNull(p)");
}

#[test]
fn match_then_inline_reproduces_an_identical_tree() {
    // A rule whose after-template is identical to its before-template
    // must reproduce the matched source exactly.
    let args = vec![("a".to_owned(), UTy::int()), ("b".to_owned(), UTy::int())];
    let pattern = || {
        UExpr::binary(
            BinaryOp::Div,
            UExpr::paren(UExpr::binary(BinaryOp::Add, UExpr::free("a"), UExpr::free("b"))),
            UExpr::int_lit(2),
        )
    };
    let rule = RewriteRule::new(
        "Identity",
        vec![Template::Expression(ExpressionTemplate::simple(
            args.clone(),
            pattern(),
            UTy::int(),
        ))],
        vec![Template::Expression(ExpressionTemplate::simple(args, pattern(), UTy::int()))],
    )
    .unwrap();

    let f = fixture();
    let src = "int z = (3 + 5) / 2;";
    let unit = compile(src, &f);
    let env = Env::new(&f.types).with_imports(&unit.imports);

    let replacements = rule.rewrite(&unit, env).unwrap();
    assert_eq!(replacements.len(), 1);
    assert_eq!(span_text(src, &replacements[0]), "(3 + 5) / 2");
    assert_eq!(replacements[0].text, "(3 + 5) / 2");
}

#[test]
fn required_placeholder_parameter_must_be_used() {
    let make_template = |param: PlaceholderParam| {
        let method = PlaceholderMethod::new("f", UTy::int(), vec![param]);
        ExpressionTemplate::simple(
            vec![("x".into(), UTy::int())],
            UExpr::binary(
                BinaryOp::Add,
                UExpr::Placeholder(UPlaceholderExpr::new(method, vec![UExpr::free("x")])),
                UExpr::free("x"),
            ),
            UTy::int(),
        )
    };

    let f = fixture();
    let mut globals = f.globals.clone();
    globals.declare_var("y", Ty::int());
    let f = Fixture { types: f.types, globals };

    let using_unit = compile("int r = y * 3 + y;", &f);
    let ignoring_unit = compile("int r = 3 + y;", &f);

    let required = make_template(PlaceholderParam::required("input"));
    assert_eq!(
        expr_matches(&required, &using_unit, &f),
        vec![bindings_of(&[("f", "input * 3"), ("x", "y")])]
    );
    assert_eq!(expr_matches(&required, &ignoring_unit, &f), vec![]);

    let optional = make_template(PlaceholderParam::optional("input"));
    assert_eq!(
        expr_matches(&optional, &ignoring_unit, &f),
        vec![bindings_of(&[("f", "3"), ("x", "y")])]
    );
}

#[test]
fn statement_placeholder_respects_declared_flow() {
    let never_exits = PlaceholderMethod::new("g", UTy::void(), vec![]);
    let before = BlockTemplate::simple(
        vec![("r".to_owned(), UTy::int())],
        vec![
            UStmt::placeholder(UPlaceholderStmt::new(never_exits, vec![], Flow::NeverExits)),
            UStmt::return_value(UExpr::free("r")),
        ],
    );

    let f = fixture();
    let mut globals = f.globals.clone();
    globals.declare_var("x", Ty::int());
    globals.declare_var("y", Ty::int());
    let f = Fixture { types: f.types, globals };
    let unit = compile("System.out.println(y);\nreturn x;", &f);
    let env = Env::new(&f.types).with_imports(&unit.imports);

    let matches = before.matches(&unit.block.stmts, env);
    assert_eq!(matches.len(), 1);
    assert_eq!((matches[0].start, matches[0].end), (0, 2));
    let bindings = common::binding_strings(&matches[0].unifier);
    assert_eq!(bindings["g"], "System.out.println(y);");
    assert_eq!(bindings["r"], "x");

    // An always-returning placeholder cannot swallow straight-line code.
    let always_returns = PlaceholderMethod::new("h", UTy::int(), vec![]);
    let returning = BlockTemplate::simple(
        vec![],
        vec![UStmt::placeholder(UPlaceholderStmt::new(
            always_returns,
            vec![],
            Flow::AlwaysReturns,
        ))],
    );
    let straight_line = compile("System.out.println(y);", &f);
    let env2 = Env::new(&f.types).with_imports(&straight_line.imports);
    assert_eq!(returning.matches(&straight_line.block.stmts, env2).len(), 0);

    let returns = compile("return y;", &f);
    let env3 = Env::new(&f.types).with_imports(&returns.imports);
    let flow_matches = returning.matches(&returns.block.stmts, env3);
    assert_eq!(flow_matches.len(), 1);
    assert_eq!(common::binding_strings(&flow_matches[0].unifier)["h"], "return y;");
}

#[test]
fn malformed_rules_fail_fast() {
    let expr_template = || {
        Template::Expression(ExpressionTemplate::simple(
            vec![("a".into(), UTy::int())],
            UExpr::free("a"),
            UTy::int(),
        ))
    };
    let block_template = || {
        Template::Block(BlockTemplate::simple(
            vec![("a".into(), UTy::int())],
            vec![UStmt::return_value(UExpr::free("a"))],
        ))
    };

    assert_eq!(
        RewriteRule::new("Empty", vec![], vec![expr_template()]).unwrap_err(),
        RuleError::NoBeforeTemplates
    );
    assert_eq!(
        RewriteRule::new("Mixed", vec![expr_template()], vec![block_template()]).unwrap_err(),
        RuleError::MixedTemplateShapes
    );

    let after_with_extras = Template::Expression(ExpressionTemplate::simple(
        vec![("a".into(), UTy::int()), ("b".into(), UTy::int()), ("c".into(), UTy::int())],
        UExpr::free("a"),
        UTy::int(),
    ));
    assert_eq!(
        RewriteRule::new("Unknown", vec![expr_template()], vec![after_with_extras]).unwrap_err(),
        RuleError::UnknownAfterArguments { arguments: vec!["b".into(), "c".into()] }
    );

    let non_boolean = RewriteRule::new("Id", vec![expr_template()], vec![expr_template()]).unwrap();
    assert_eq!(non_boolean.negation().unwrap_err(), RuleError::NonBooleanNegation);
}

#[test]
fn cancellation_aborts_the_whole_attempt() {
    let f = fixture();
    let unit = compile("int z = (3 + 5) / 2;", &f);
    let flag = AtomicBool::new(true);
    let env = Env::new(&f.types).with_imports(&unit.imports).with_cancel(&flag);
    assert_eq!(singleton_copy_rule().rewrite(&unit, env), Err(MatchError::Aborted));
    flag.store(false, Ordering::Relaxed);
    assert_eq!(singleton_copy_rule().rewrite(&unit, env), Ok(vec![]));
}
