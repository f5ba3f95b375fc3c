//! Parser tests for the assertion language and the host syntax

use crate::ast::{Expr, FreshNames, Op};
use crate::error::VerifyError;
use crate::parser::{parse_assertion, parse_module};
use crate::source::{SourceExpr, SourceItem, SourceStmt};

/// Parse an assertion and print it
fn show(text: &str) -> String {
    parse_assertion(text, &mut FreshNames::new())
        .expect("Parse should succeed")
        .to_string()
}

fn assertion_fails(text: &str) -> bool {
    parse_assertion(text, &mut FreshNames::new()).is_err()
}

fn module_ok(source: &str) -> Vec<SourceItem> {
    parse_module(source).expect("Parse should succeed")
}

// ============================================
// Assertion precedence
// ============================================

#[test]
fn test_arithmetic_precedence() {
    assert_eq!(show("a + b * c % d"), "(a + (b * (c % d)))");
    assert_eq!(show("a - b - c"), "((a - b) - c)");
    assert_eq!(show("a * b // c"), "((a * b) // c)");
}

#[test]
fn test_unary_minus_binds_tighter_than_mod() {
    assert_eq!(show("-x % 2"), "((-x) % 2)");
    assert_eq!(show("--x"), "(-(-x))");
}

#[test]
fn test_implication_is_lowest() {
    assert_eq!(show("a < b ==> ans == b"), "((a < b) ==> (ans == b))");
    assert_eq!(
        show("a < b and b < c ==> ans == c"),
        "(((a < b) and (b < c)) ==> (ans == c))"
    );
}

#[test]
fn test_connectives_are_right_associative() {
    assert_eq!(show("a ==> b ==> c"), "(a ==> (b ==> c))");
    assert_eq!(show("a <==> b <==> c"), "(a <==> (b <==> c))");
    assert_eq!(show("a ==> b <==> c"), "((a ==> b) <==> c)");
}

#[test]
fn test_boolean_precedence() {
    assert_eq!(show("not x == y"), "(not (x == y))");
    assert_eq!(show("a and b or c"), "((a and b) or c)");
    assert_eq!(
        show("not (x and y) <==> (not x) or (not y)"),
        "((not (x and y)) <==> ((not x) or (not y)))"
    );
}

#[test]
fn test_literals() {
    assert_eq!(show("ans <==> True"), "(ans <==> True)");
    assert_eq!(show("false or 0 == 1"), "(False or (0 == 1))");
}

#[test]
fn test_chained_comparison_is_rejected() {
    assert!(assertion_fails("a < b < c"));
    assert!(assertion_fails("a == b != c"));
}

#[test]
fn test_malformed_assertions() {
    assert!(assertion_fails(""));
    assert!(assertion_fails("x +"));
    assert!(assertion_fails("(x"));
    assert!(assertion_fails("forall :: x"));
}

#[test]
fn test_parse_error_carries_span() {
    let err = parse_assertion("x + + )", &mut FreshNames::new()).unwrap_err();
    assert!(matches!(err, VerifyError::Parse { .. }));
    assert!(err.span().is_some());
}

// ============================================
// Subscripts, slices, calls
// ============================================

#[test]
fn test_subscript_and_call() {
    assert_eq!(show("len(xs) > 0"), "(len(xs) > 0)");
    assert_eq!(show("xs[i + 1] == xs[0]"), "(xs[(i + 1)] == xs[0])");
    assert_eq!(show("m[i][j]"), "m[i][j]");
}

#[test]
fn test_slices_fill_defaults() {
    assert_eq!(show("xs[i:]"), "xs[i::1]");
    assert_eq!(show("xs[:j]"), "xs[0:j:1]");
    assert_eq!(show("xs[1:5:2]"), "xs[1:5:2]");
    let e = parse_assertion("xs[::]", &mut FreshNames::new()).unwrap();
    let Expr::Subscript { index, .. } = e else {
        panic!("Expected Subscript");
    };
    assert!(matches!(*index, Expr::Slice { upper: None, .. }));
}

// ============================================
// Quantifiers
// ============================================

#[test]
fn test_forall_with_type() {
    assert_eq!(
        show("forall x : int :: x > 0 ==> n + x > n"),
        "(∀x$1: int. ((x$1 > 0) ==> ((n + x$1) > n)))"
    );
}

#[test]
fn test_exists_desugars_to_negated_forall() {
    assert_eq!(show("exists y :: y > 0"), "(not (∀y$1. (not (y$1 > 0))))");
}

#[test]
fn test_nested_quantifiers_get_distinct_binders() {
    assert_eq!(
        show("forall x :: forall y :: x + y == y + x"),
        "(∀x$2. (∀y$1. ((x$2 + y$1) == (y$1 + x$2))))"
    );
    assert_eq!(
        show("forall x :: forall x :: x"),
        "(∀x$2. (∀x$1. x$1))"
    );
}

#[test]
fn test_quantifier_after_implication() {
    assert_eq!(
        show("p ==> forall k :: k == k"),
        "(p ==> (∀k$1. (k$1 == k$1)))"
    );
    assert_eq!(show("(forall b :: b) and q"), "((∀b$1. b$1) and q)");
}

#[test]
fn test_negated_quantifiers() {
    assert_eq!(show("not forall k :: k > 0"), "(not (∀k$1. (k$1 > 0)))");
    assert_eq!(
        show("not exists k :: k == n"),
        "(not (not (∀k$1. (not (k$1 == n)))))"
    );
    assert_eq!(show("not not forall k :: k"), "(not (not (∀k$1. k$1)))");
}

#[test]
fn test_quantifier_as_last_operand_of_and_or() {
    assert_eq!(
        show("n > 0 and forall k :: k > n ==> k > 0"),
        "((n > 0) and (∀k$1. ((k$1 > n) ==> (k$1 > 0))))"
    );
    assert_eq!(
        show("n > 0 or exists k :: k == n"),
        "((n > 0) or (not (∀k$1. (not (k$1 == n)))))"
    );
    assert_eq!(
        show("a or b and not forall k :: k"),
        "(a or (b and (not (∀k$1. k$1))))"
    );
    assert_eq!(
        show("p ==> q and forall k :: k"),
        "(p ==> (q and (∀k$1. k$1)))"
    );
}

#[test]
fn test_quantifier_body_includes_iff() {
    assert_eq!(
        show("forall x :: (not (not x)) <==> x"),
        "(∀x$1. ((not (not x$1)) <==> x$1))"
    );
}

#[test]
fn test_binders_unique_across_parses() {
    let mut fresh = FreshNames::new();
    let a = parse_assertion("forall x :: x", &mut fresh).unwrap();
    let b = parse_assertion("forall x :: x", &mut fresh).unwrap();
    assert_ne!(a, b);
}

#[test]
fn test_unknown_quantifier_type() {
    let err = parse_assertion("forall x : float :: x > 0", &mut FreshNames::new()).unwrap_err();
    assert!(matches!(err, VerifyError::Type { .. }));
}

#[test]
fn test_list_quantifier_type() {
    assert_eq!(
        show("forall a : List[int] :: len(a) >= 0"),
        "(∀a$1: List[int]. (len(a$1) >= 0))"
    );
}

// ============================================
// Host modules
// ============================================

const COUNTER: &str = r#"
scope("loops")

@verify(requires=["n >= 0"], ensures=["x == n"])
def counter(n: int) -> int:
    y = n
    x = 0
    while y > 0:
        invariant("x + y == n")
        invariant("y >= 0")
        x = x + 1
        y = y - 1
    return x
"#;

#[test]
fn test_parse_counter_module() {
    let items = module_ok(COUNTER);
    assert_eq!(items.len(), 2);
    let SourceItem::Stmt(scope) = &items[0] else {
        panic!("Expected scope call");
    };
    assert!(matches!(&scope.node, SourceStmt::Expr(e) if matches!(&e.node, SourceExpr::Call { func, .. } if func.node == "scope")));

    let SourceItem::Function(f) = &items[1] else {
        panic!("Expected function");
    };
    assert_eq!(f.name.node, "counter");
    assert_eq!(f.decorators.len(), 1);
    assert_eq!(f.decorators[0].name.node, "verify");
    assert_eq!(f.decorators[0].kwargs.len(), 2);
    assert_eq!(f.params.len(), 1);
    assert_eq!(f.params[0].ty.as_ref().map(|t| t.name.as_str()), Some("int"));
    assert_eq!(f.ret.as_ref().map(ToString::to_string), Some("int".to_string()));
    assert_eq!(f.body.len(), 4);
    let SourceStmt::While { body, .. } = &f.body[2].node else {
        panic!("Expected While");
    };
    assert_eq!(body.len(), 4);
}

#[test]
fn test_parse_multiline_decorator_with_trailing_comma() {
    let src = "@verify(\n    ensures=[\n        'a < b ==> (ans == b)',\n        'b <= a ==> (ans == a)',\n    ]\n)\ndef Max_Func(a : int, b : int) -> int:\n    ans = a\n    if a < b:\n        ans = b\n    return ans\n";
    let items = module_ok(src);
    let SourceItem::Function(f) = &items[0] else {
        panic!("Expected function");
    };
    let (key, value) = &f.decorators[0].kwargs[0];
    assert_eq!(key.node, "ensures");
    assert!(matches!(&value.node, SourceExpr::List(items) if items.len() == 2));
}

#[test]
fn test_parse_elif_chain() {
    let src = "def f(x) -> int:\n    if x < 0:\n        y = 0\n    elif x == 0:\n        y = 1\n    else:\n        y = 2\n";
    let items = module_ok(src);
    let SourceItem::Function(f) = &items[0] else {
        panic!("Expected function");
    };
    let SourceStmt::If { orelse, .. } = &f.body[0].node else {
        panic!("Expected If");
    };
    assert_eq!(orelse.len(), 1);
    let SourceStmt::If { orelse: inner, .. } = &orelse[0].node else {
        panic!("Expected nested If for elif");
    };
    assert_eq!(inner.len(), 1);
}

#[test]
fn test_parse_one_line_block_and_none_return() {
    let items = module_ok("def nothing() -> None: pass\n");
    let SourceItem::Function(f) = &items[0] else {
        panic!("Expected function");
    };
    assert_eq!(f.ret.as_ref().map(|t| t.name.as_str()), Some("None"));
    assert!(matches!(f.body[0].node, SourceStmt::Pass));
    assert!(f.params.is_empty());
}

#[test]
fn test_parse_host_expressions() {
    let items = module_ok("z = not a or b and c\nw = a < b <= c\nxs[i] = -y // 2\n");
    let SourceItem::Stmt(s) = &items[0] else {
        panic!("Expected statement");
    };
    let SourceStmt::Assign { value, .. } = &s.node else {
        panic!("Expected assignment");
    };
    assert!(matches!(&value.node, SourceExpr::BoolOp { op: Op::Or, values } if values.len() == 2));

    let SourceItem::Stmt(s) = &items[1] else {
        panic!("Expected statement");
    };
    let SourceStmt::Assign { value, .. } = &s.node else {
        panic!("Expected assignment");
    };
    assert!(matches!(&value.node, SourceExpr::Compare { rest, .. } if rest.len() == 2));

    let SourceItem::Stmt(s) = &items[2] else {
        panic!("Expected statement");
    };
    assert!(matches!(&s.node, SourceStmt::Assign { target, .. } if matches!(target.node, SourceExpr::Subscript { .. })));
}

#[test]
fn test_parse_module_syntax_error() {
    assert!(parse_module("def f(:\n    pass\n").is_err());
    assert!(parse_module("    x = 1\n").is_err());
}
