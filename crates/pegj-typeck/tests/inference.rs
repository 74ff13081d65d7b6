//! Integration tests for return-type inference.

use pegj_common::ast::build::*;
use pegj_common::ast::Boundary;
use pegj_common::{Diagnostics, Grammar, Severity};
use pegj_typeck::{check, sweep_cap, Ty, TypeError, TypeckResult};

fn infer(grammar: &Grammar) -> TypeckResult {
    let mut diags = Diagnostics::new();
    check(grammar, Some("Object"), &mut diags)
}

fn rule_ty(grammar: &Grammar, result: &TypeckResult, name: &str) -> Ty {
    let index = grammar.rule_index(name).expect("rule exists");
    result.types.rule(index).cloned().expect("rule typed")
}

// ── Node kinds ─────────────────────────────────────────────────────────

#[test]
fn leaf_types() {
    let g = grammar(vec![
        rule("lit", literal("abc")),
        rule("chr", class(Vec::new(), false, "[]")),
        rule("dot", any()),
        rule("txt", text(seq(vec![any(), any()]))),
    ]);
    let result = infer(&g);
    assert!(result.is_ok());
    assert_eq!(rule_ty(&g, &result, "lit"), Ty::Range);
    assert_eq!(rule_ty(&g, &result, "chr"), Ty::Char);
    assert_eq!(rule_ty(&g, &result, "dot"), Ty::Char);
    assert_eq!(rule_ty(&g, &result, "txt"), Ty::Range);
}

#[test]
fn predicates_have_no_value() {
    let g = grammar(vec![
        rule("a", simple_and(literal("x"))),
        rule("b", simple_not(literal("x"))),
        rule("c", semantic_and("return true;")),
        rule("d", semantic_not("return false;")),
    ]);
    let result = infer(&g);
    for name in ["a", "b", "c", "d"] {
        assert_eq!(rule_ty(&g, &result, name), Ty::Object, "rule {}", name);
    }
}

#[test]
fn repetitions_wrap_in_list() {
    let g = grammar(vec![
        rule("star", zero_or_more(any())),
        rule("plus", one_or_more(literal("a"))),
        rule(
            "bounded",
            range(Boundary::Constant(2), Some(Boundary::Constant(4)), any()),
        ),
        rule("opt", optional(any())),
    ]);
    let result = infer(&g);
    assert_eq!(rule_ty(&g, &result, "star"), Ty::list(Ty::Char));
    assert_eq!(rule_ty(&g, &result, "plus"), Ty::list(Ty::Range));
    assert_eq!(rule_ty(&g, &result, "bounded"), Ty::list(Ty::Char));
    assert_eq!(rule_ty(&g, &result, "opt"), Ty::option(Ty::Char));
}

#[test]
fn choice_and_sequence_unify_elements() {
    let g = grammar(vec![
        rule("same", choice(vec![literal("a"), literal("b")])),
        rule("mixed", choice(vec![literal("a"), any()])),
        rule("pair", seq(vec![any(), any()])),
        rule("triple", seq(vec![any(), literal("x"), any()])),
    ]);
    let result = infer(&g);
    assert_eq!(rule_ty(&g, &result, "same"), Ty::Range);
    assert_eq!(rule_ty(&g, &result, "mixed"), Ty::Object);
    assert_eq!(rule_ty(&g, &result, "pair"), Ty::list(Ty::Char));
    assert_eq!(rule_ty(&g, &result, "triple"), Ty::list(Ty::Object));
}

#[test]
fn named_and_labeled_delegate() {
    let g = grammar(vec![rule(
        "start",
        named("digits", labeled("ds", one_or_more(any()))),
    )]);
    let result = infer(&g);
    assert_eq!(rule_ty(&g, &result, "start"), Ty::list(Ty::Char));

    // Every node gets a type, keyed by its id.
    let mut count = 0;
    g.rules[0].expression.walk(&mut |e| {
        assert!(result.types.expr(e).is_some(), "{} untyped", e.kind_name());
        count += 1;
    });
    assert_eq!(count, 4);
}

#[test]
fn actions_use_annotation_or_default() {
    let g = grammar(vec![
        rule("typed", action_returning("return 1;", "int", literal("1"))),
        rule("untyped", action("return null;", literal("1"))),
        rule("seq", action_returning("return s;", "CharSequence", seq(vec![any()]))),
    ]);
    let mut diags = Diagnostics::new();
    let result = check(&g, Some("java.util.Map"), &mut diags);
    assert!(result.is_ok());
    assert_eq!(rule_ty(&g, &result, "typed"), Ty::Named("int".into()));
    assert_eq!(
        rule_ty(&g, &result, "untyped"),
        Ty::Named("java.util.Map".into())
    );
    assert_eq!(rule_ty(&g, &result, "seq"), Ty::Range);

    let infos: Vec<_> = diags
        .iter()
        .filter(|d| d.severity == Severity::Info)
        .map(|d| d.message.as_str())
        .collect();
    assert_eq!(
        infos,
        vec![
            "using type `int` for action from @Return annotation",
            "using default type `java.util.Map` for action",
            "using type `CharSequence` for action from @Return annotation",
        ]
    );
}

// ── Errors ─────────────────────────────────────────────────────────────

#[test]
fn missing_return_type_is_fatal() {
    let g = grammar(vec![
        rule("a", action("return 1;", literal("1"))),
        rule("b", action_returning("return 2;", "int", literal("2"))),
    ]);
    let mut diags = Diagnostics::new();
    let result = check(&g, None, &mut diags);
    assert!(!result.is_ok());
    assert_eq!(result.errors.len(), 1);
    assert!(matches!(
        result.errors[0],
        TypeError::MissingReturnType { .. }
    ));
    assert!(diags.has_errors());
    assert_eq!(
        diags.errors().next().map(|d| d.message.as_str()),
        Some("missing default return type for action result")
    );
    // Propagation never ran.
    assert!(!result.types.is_complete(g.rules.len()));
}

#[test]
fn diverging_rule_type_is_reported() {
    // Left recursion never stabilizes: List<?r>, List<List<?r>>, ...
    let g = grammar(vec![rule("r", zero_or_more(rule_ref("r")))]);
    let result = infer(&g);
    match &result.errors[..] {
        [TypeError::Diverged { sweeps, rules }] => {
            assert_eq!(*sweeps, sweep_cap(1));
            assert_eq!(rules, &vec!["r".to_string()]);
        }
        other => panic!("expected Diverged, got {:?}", other),
    }
}

// ── Fixpoint ───────────────────────────────────────────────────────────

#[test]
fn acyclic_chain_settles_in_one_sweep() {
    let g = grammar(vec![
        rule("a", rule_ref("b")),
        rule("b", rule_ref("c")),
        rule("c", one_or_more(any())),
    ]);
    let result = infer(&g);
    assert!(result.is_ok());
    assert_eq!(rule_ty(&g, &result, "a"), Ty::list(Ty::Char));
    assert_eq!(result.types.sweeps(), 1);
}

#[test]
fn recursive_rule_reaches_fixpoint() {
    // expr = "(" expr ")" / "x"
    let g = grammar(vec![rule(
        "expr",
        choice(vec![
            seq(vec![literal("("), rule_ref("expr"), literal(")")]),
            literal("x"),
        ]),
    )]);
    let result = infer(&g);
    assert!(result.is_ok());
    assert_eq!(rule_ty(&g, &result, "expr"), Ty::Object);
    assert!(result.types.sweeps() <= 2);
    assert!(result.types.is_complete(1));
}

#[test]
fn mutual_recursion_reaches_fixpoint() {
    // list = item ("," list)?   item = "[" list "]" / [a-z]+
    let g = grammar(vec![
        rule(
            "list",
            seq(vec![
                rule_ref("item"),
                optional(seq(vec![literal(","), rule_ref("list")])),
            ]),
        ),
        rule(
            "item",
            choice(vec![
                seq(vec![literal("["), rule_ref("list"), literal("]")]),
                text(one_or_more(class(Vec::new(), false, "[a-z]"))),
            ]),
        ),
    ]);
    let result = infer(&g);
    assert!(result.is_ok(), "{:?}", result.errors);
    assert_eq!(rule_ty(&g, &result, "list"), Ty::list(Ty::Object));
    assert_eq!(rule_ty(&g, &result, "item"), Ty::Object);
    // No phantom self type survives once the fixpoint settles.
    assert!(!rule_ty(&g, &result, "list").has_rec());
    assert!(result.types.sweeps() <= 3);
}

#[test]
fn typing_twice_is_stable() {
    let g = grammar(vec![
        rule("a", seq(vec![rule_ref("b"), optional(rule_ref("a"))])),
        rule("b", choice(vec![literal("x"), rule_ref("a")])),
    ]);
    let first = infer(&g);
    let second = infer(&g);
    for i in 0..g.rules.len() {
        assert_eq!(first.types.rule(i), second.types.rule(i));
    }
}

#[test]
fn rule_type_listing() {
    let g = grammar(vec![
        rule(
            "list",
            seq(vec![
                labeled("head", rule_ref("item")),
                zero_or_more(seq(vec![literal(","), rule_ref("item")])),
            ]),
        ),
        rule("item", choice(vec![text(one_or_more(any())), literal("x")])),
        rule("opt", optional(any())),
        rule("sign", action_returning("return 1;", "int", literal("-"))),
    ]);
    let result = infer(&g);
    let listing: Vec<String> = g
        .rules
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}: {}", r.name, result.types.rule(i).expect("typed")))
        .collect();
    insta::assert_snapshot!(listing.join("\n"), @r###"
    list: List<Object>
    item: CharSequence
    opt: Character
    sign: int
    "###);
}
