//! Structural + type-consistent unification against compiled sources.
//!
//! Each test compiles a small source fragment, matches one template
//! against every expression or block in it, and checks the exact set of
//! matches and their bindings.

mod common;

use common::{bindings_of, compile, expr_matches, fixture};
use tailor_match::{
    BlockTemplate, Env, ExpressionTemplate, UExpr, UStmt, UTy, UTypeVar,
};
use tailor_syntax::ast::BinaryOp;
use tailor_types::BoundKind;

#[test]
fn binary_operator_template() {
    // template: (a + b) / 2
    let template = ExpressionTemplate::simple(
        vec![("a".into(), UTy::int()), ("b".into(), UTy::int())],
        UExpr::binary(
            BinaryOp::Div,
            UExpr::paren(UExpr::binary(BinaryOp::Add, UExpr::free("a"), UExpr::free("b"))),
            UExpr::int_lit(2),
        ),
        UTy::int(),
    );

    let f = fixture();
    let mut globals = f.globals.clone();
    globals.declare_var("x", tailor_types::Ty::int());
    globals.declare_var("y", tailor_types::Ty::int());
    let f = common::Fixture { types: f.types, globals };
    let unit = compile(
        "System.out.println((3 + 5) / 2);\n\
         System.out.println((x + y) / 2 + 20);\n\
         System.err.println((y + new Random().nextInt()) / 2);\n\
         System.out.println((x - y) / 2);\n\
         System.out.println((x * y) / 2);\n\
         System.out.println((x + y) / 3);\n\
         System.out.println((x + 5L) / 2);",
        &f,
    );

    assert_eq!(
        expr_matches(&template, &unit, &f),
        vec![
            bindings_of(&[("a", "3"), ("b", "5")]),
            bindings_of(&[("a", "x"), ("b", "y")]),
            bindings_of(&[("a", "y"), ("b", "new Random().nextInt()")]),
        ]
    );
}

#[test]
fn compound_assignment_template() {
    // template: str += n
    let template = ExpressionTemplate::simple(
        vec![("str".into(), UTy::string()), ("n".into(), UTy::int())],
        UExpr::compound_assign(BinaryOp::Add, UExpr::free("str"), UExpr::free("n")),
        UTy::string(),
    );

    let f = fixture();
    let unit = compile(
        "String foo = \"\";\nfoo += 5;\nfoo += \"bar\";\nfoo += 10;",
        &f,
    );

    assert_eq!(
        expr_matches(&template, &unit, &f),
        vec![
            bindings_of(&[("str", "foo"), ("n", "5")]),
            bindings_of(&[("str", "foo"), ("n", "10")]),
        ]
    );
}

#[test]
fn method_invocation_template() {
    // template: md.digest(str.getBytes())
    let template = ExpressionTemplate::simple(
        vec![
            ("md".into(), UTy::class("java.security.MessageDigest")),
            ("str".into(), UTy::string()),
        ],
        UExpr::call(
            UExpr::select(UExpr::free("md"), "digest"),
            vec![UExpr::call(UExpr::select(UExpr::free("str"), "getBytes"), vec![])],
        ),
        UTy::array(UTy::byte()),
    );

    let f = fixture();
    let mut globals = f.globals.clone();
    globals.declare_var("digest", tailor_types::Ty::class("java.security.MessageDigest"));
    globals.declare_var("string", tailor_types::Ty::string());
    let f = common::Fixture { types: f.types, globals };
    let unit = compile(
        "MessageDigest.getInstance(\"MD5\").digest(\"foo\".getBytes());\n\
         digest.digest(\"foo\".getBytes());\n\
         MessageDigest.getInstance(\"SHA1\").digest(string.getBytes());\n\
         digest.digest((string + 90).getBytes());\n\
         System.out.println(\"foo\".getBytes());",
        &f,
    );

    assert_eq!(
        expr_matches(&template, &unit, &f),
        vec![
            bindings_of(&[("md", "MessageDigest.getInstance(\"MD5\")"), ("str", "\"foo\"")]),
            bindings_of(&[("md", "digest"), ("str", "\"foo\"")]),
            bindings_of(&[("md", "MessageDigest.getInstance(\"SHA1\")"), ("str", "string")]),
            bindings_of(&[("md", "digest"), ("str", "(string + 90)")]),
        ]
    );
}

#[test]
fn static_method_invocation_template() {
    // template: BigInteger.valueOf(x) with x an int
    let template = ExpressionTemplate::simple(
        vec![("x".into(), UTy::int())],
        UExpr::call(
            UExpr::static_select("java.math.BigInteger", "valueOf"),
            vec![UExpr::free("x")],
        ),
        UTy::class("java.math.BigInteger"),
    );

    let f = fixture();
    let mut globals = f.globals.clone();
    globals.declare_var("x", tailor_types::Ty::int());
    let f = common::Fixture { types: f.types, globals };
    let unit = compile(
        "BigInteger.valueOf(32);\n\
         BigInteger.valueOf(x * 15);\n\
         BigInteger.valueOf(Integer.parseInt(\"3\"));\n\
         BigInteger.valueOf(32L);",
        &f,
    );

    assert_eq!(
        expr_matches(&template, &unit, &f),
        vec![
            bindings_of(&[("x", "32")]),
            bindings_of(&[("x", "x * 15")]),
            bindings_of(&[("x", "Integer.parseInt(\"3\")")]),
        ]
    );
}

#[test]
fn repeated_free_variable_requires_equivalent_expressions() {
    // template: x - x
    let template = ExpressionTemplate::simple(
        vec![("x".into(), UTy::int())],
        UExpr::binary(BinaryOp::Sub, UExpr::free("x"), UExpr::free("x")),
        UTy::int(),
    );

    let f = fixture();
    let mut globals = f.globals.clone();
    globals.declare_var("n", tailor_types::Ty::int());
    let f = common::Fixture { types: f.types, globals };
    let unit = compile(
        "System.out.println(3 - 3);\n\
         BigInteger.valueOf((n * 2) - (n * 2));\n\
         System.err.println(3 - 3L);\n\
         System.err.println((n * 2) - n * 2);",
        &f,
    );

    assert_eq!(
        expr_matches(&template, &unit, &f),
        vec![bindings_of(&[("x", "3")]), bindings_of(&[("x", "(n * 2)")])]
    );
}

#[test]
fn return_type_constrains_the_instantiation() {
    // template: <E> List<E> Collections.unmodifiableList(List<E> list)
    let template = ExpressionTemplate::new(
        vec![UTypeVar::new("E")],
        vec![(
            "list".into(),
            UTy::generic("java.util.List", vec![UTy::var("E")]),
        )],
        UExpr::call(
            UExpr::static_select("java.util.Collections", "unmodifiableList"),
            vec![UExpr::free("list")],
        ),
        UTy::generic("java.util.List", vec![UTy::var("E")]),
    );

    let f = fixture();
    let unit = compile(
        "Collections.unmodifiableList(new ArrayList<String>());\n\
         List<Integer> ints = Collections.unmodifiableList(Collections.singletonList(1));\n\
         Collections.singletonList(\"x\");",
        &f,
    );

    assert_eq!(
        expr_matches(&template, &unit, &f),
        vec![
            bindings_of(&[("list", "new ArrayList<String>()"), ("E", "java.lang.String")]),
            bindings_of(&[
                ("list", "Collections.singletonList(1)"),
                ("E", "java.lang.Integer"),
            ]),
        ]
    );
}

#[test]
fn recursively_bounded_type_variable() {
    // template: <E extends Enum<E>> String example(E value) = value.name()
    let e_var = UTypeVar::bounded(
        "E",
        UTy::generic("java.lang.Enum", vec![UTy::var("E")]),
    );
    let template = ExpressionTemplate::new(
        vec![e_var],
        vec![("value".into(), UTy::var("E"))],
        UExpr::call(UExpr::select(UExpr::free("value"), "name"), vec![]),
        UTy::string(),
    );

    let f = fixture();
    let unit = compile("System.out.println(RoundingMode.FLOOR.name());", &f);

    assert_eq!(
        expr_matches(&template, &unit, &f),
        vec![bindings_of(&[
            ("value", "RoundingMode.FLOOR"),
            ("E", "java.math.RoundingMode"),
        ])]
    );
}

#[test]
fn block_template_matches_a_statement_run() {
    // template:
    //   List<E> list = new ArrayList<E>(collection);
    //   Collections.sort(list, comparator);
    let template = BlockTemplate::new(
        vec![UTypeVar::new("E")],
        vec![
            (
                "collection".into(),
                UTy::generic("java.util.Collection", vec![UTy::var("E")]),
            ),
            (
                "comparator".into(),
                UTy::generic(
                    "java.util.Comparator",
                    vec![UTy::wildcard(BoundKind::Super, UTy::var("E"))],
                ),
            ),
        ],
        vec![
            UStmt::var_decl(
                "list",
                UTy::generic("java.util.List", vec![UTy::var("E")]),
                Some(UExpr::new_class(
                    UTy::generic("java.util.ArrayList", vec![UTy::var("E")]),
                    vec![UExpr::free("collection")],
                )),
            ),
            UStmt::expr_stmt(UExpr::call(
                UExpr::static_select("java.util.Collections", "sort"),
                vec![UExpr::local("list"), UExpr::free("comparator")],
            )),
        ],
    );

    let f = fixture();
    let mut globals = f.globals.clone();
    globals.declare_var(
        "cmp",
        tailor_types::Ty::generic("java.util.Comparator", vec![tailor_types::Ty::string()]),
    );
    let f = common::Fixture { types: f.types, globals };
    let unit = compile(
        "List<String> foo = new ArrayList<String>();\n\
         foo.add(\"bar\");\n\
         List<String> sorted = new ArrayList<String>(foo);\n\
         Collections.sort(sorted, cmp);",
        &f,
    );

    let env = Env::new(&f.types).with_imports(&unit.imports);
    let matches = template.matches(&unit.block.stmts, env);
    assert_eq!(matches.len(), 1);
    assert_eq!((matches[0].start, matches[0].end), (2, 4));
    assert_eq!(
        common::binding_strings(&matches[0].unifier),
        bindings_of(&[
            ("collection", "foo"),
            ("comparator", "cmp"),
            ("E", "java.lang.String"),
            ("list", "sorted"),
        ])
    );
}

#[test]
fn if_block_template_binds_both_branches() {
    // template: if (cond) { x = y; } else { x = z; }
    let template = BlockTemplate::new(
        vec![UTypeVar::new("T")],
        vec![
            ("cond".into(), UTy::boolean()),
            ("x".into(), UTy::var("T")),
            ("y".into(), UTy::var("T")),
            ("z".into(), UTy::var("T")),
        ],
        vec![UStmt::if_else(
            UExpr::free("cond"),
            UStmt::block(vec![UStmt::expr_stmt(UExpr::assign(
                UExpr::free("x"),
                UExpr::free("y"),
            ))]),
            UStmt::block(vec![UStmt::expr_stmt(UExpr::assign(
                UExpr::free("x"),
                UExpr::free("z"),
            ))]),
        )],
    );

    let f = fixture();
    let mut globals = f.globals.clone();
    globals.declare_var("x", tailor_types::Ty::string());
    let f = common::Fixture { types: f.types, globals };
    let unit = compile(
        "if (Math.random() > 0.5) { x = \"foo\"; } else { x = \"bar\"; }",
        &f,
    );

    let env = Env::new(&f.types).with_imports(&unit.imports);
    let matches = template.matches(&unit.block.stmts, env);
    assert_eq!(matches.len(), 1);
    assert_eq!(
        common::binding_strings(&matches[0].unifier),
        bindings_of(&[
            ("cond", "Math.random() > 0.5"),
            ("x", "x"),
            ("y", "\"foo\""),
            ("z", "\"bar\""),
            ("T", "java.lang.String"),
        ])
    );
}

#[test]
fn any_of_tries_alternatives_in_order() {
    // template: anyOf(str.getBytes(), str.name()) -- matches either call
    // shape with the same free variable.
    let template = ExpressionTemplate::simple(
        vec![("str".into(), UTy::string())],
        UExpr::any_of(vec![
            UExpr::call(UExpr::select(UExpr::free("str"), "getBytes"), vec![]),
            UExpr::call(UExpr::select(UExpr::free("str"), "length"), vec![]),
        ]),
        UTy::array(UTy::byte()),
    );

    let f = fixture();
    let mut globals = f.globals.clone();
    globals.declare_var("s", tailor_types::Ty::string());
    let f = common::Fixture { types: f.types, globals };
    let unit = compile("s.getBytes();", &f);

    assert_eq!(
        expr_matches(&template, &unit, &f),
        vec![bindings_of(&[("str", "s")])]
    );
}

#[test]
fn new_array_initializers_unify_pairwise_present() {
    // template: new String[] {str}
    let template = ExpressionTemplate::simple(
        vec![("str".into(), UTy::string())],
        UExpr::new_array(UTy::string(), vec![], Some(vec![UExpr::free("str")])),
        UTy::array(UTy::string()),
    );

    let f = fixture();
    let unit = compile(
        "String[] array1 = new String[] {\"foo\"};\n\
         String[] array2 = new String[5];",
        &f,
    );

    assert_eq!(
        expr_matches(&template, &unit, &f),
        vec![bindings_of(&[("str", "\"foo\"")])]
    );
}
