//! Integration tests for the veriwp verifier
//!
//! Tests the full pipeline from host source to solver verdict:
//! - Loop desugaring and invariant checking
//! - Quantified contracts
//! - List updates
//! - Run modes and error reporting
//! - WP cross-checked against the reference interpreter

use veriwp::ast::{Expr, FreshNames};
use veriwp::config::VerifyConfig;
use veriwp::interp::{Environment, Interpreter, Outcome, Value};
use veriwp::parser::parse_assertion;
use veriwp::smt::{Solver, SolverError, Z3Process};
use veriwp::source::{load_module, SourceFunction};
use veriwp::verify::{FunctionSession, FunctionStatus, RunMode, RunReport, VerificationRun};
use veriwp::VerifyError;

/// Skip tests that need a solver when Z3 is not installed
fn z3_available(test: &str) -> bool {
    let available = Z3Process::is_available("z3");
    if !available {
        eprintln!("z3 not available, skipping {test}");
    }
    available
}

/// Verify every scope of `source`, recording failures instead of stopping
fn verify_collect(source: &str) -> RunReport {
    let module = load_module(source, "test").unwrap();
    VerificationRun::new(module, &VerifyConfig::default())
        .with_mode(RunMode::Collect)
        .verify_all()
        .unwrap()
}

fn status_of<'r>(report: &'r RunReport, name: &str) -> &'r FunctionStatus {
    &report
        .functions
        .iter()
        .find(|f| f.name == name)
        .unwrap_or_else(|| panic!("no report for {name}"))
        .status
}

// ============================================
// Loops
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
fn test_counter_loop_verifies() {
    if !z3_available("test_counter_loop_verifies") {
        return;
    }
    let report = verify_collect(COUNTER);
    assert!(report.all_verified(), "{report}");
    assert_eq!(report.verified_count, 1);
    assert_eq!(report.functions[0].scope, "loops");
}

#[test]
fn test_weakened_invariant_is_violated() {
    if !z3_available("test_weakened_invariant_is_violated") {
        return;
    }
    let source = COUNTER.replace("        invariant(\"x + y == n\")\n", "");
    let report = verify_collect(&source);
    assert_eq!(status_of(&report, "counter"), &FunctionStatus::Violated);
    let failed = &report.functions[0];
    assert!(failed.failing_obligation.is_some());
    assert!(report.to_string().contains("✗ loops::counter: violated"));
}

#[test]
fn test_weakened_invariant_fails_fast() {
    if !z3_available("test_weakened_invariant_fails_fast") {
        return;
    }
    let source = COUNTER.replace("        invariant(\"x + y == n\")\n", "");
    let module = load_module(&source, "test").unwrap();
    let err = VerificationRun::new(module, &VerifyConfig::default())
        .verify_all()
        .unwrap_err();
    assert!(err.is_verification_failure(), "{err}");
    assert!(matches!(err, VerifyError::Violated { ref function, .. } if function == "counter"));
}

#[test]
fn test_multiplication_by_repeated_addition() {
    if !z3_available("test_multiplication_by_repeated_addition") {
        return;
    }
    let report = verify_collect(
        r#"
@verify(requires=["a >= 0", "b >= 0"], ensures=["ans == a * b"])
def mult(a: int, b: int) -> int:
    ans = 0
    n = a
    while n > 0:
        invariant("n >= 0")
        invariant("ans == (a - n) * b")
        ans = ans + b
        n = n - 1
    return ans
"#,
    );
    assert!(report.all_verified(), "{report}");
}

// ============================================
// Branches
// ============================================

const BRANCHES: &str = r#"
scope("if-then-else")

@verify(ensures=["a < b ==> (ans == b)", "b <= a ==> (ans == a)"])
def Max_Func(a: int, b: int) -> int:
    ans = a
    if a < b:
        ans = b
    return ans

@verify(requires=[], ensures=["ans >= 0"])
def absolute_value(x: int) -> int:
    ans = x
    if x < 0:
        ans = -x
    return ans

@verify(ensures=["ans >= 0"])
def broken_abs(x: int) -> int:
    ans = x
    return ans

@verify(ensures=["ans == c or ans == b or ans == a", "ans >= a and ans >= b and ans >= c"])
def max_of_three(a: int, b: int, c: int) -> int:
    ans = a
    if ans < b:
        ans = b
    if ans < c:
        ans = c
    return ans
"#;

#[test]
fn test_branches() {
    if !z3_available("test_branches") {
        return;
    }
    let report = verify_collect(BRANCHES);
    assert_eq!(status_of(&report, "Max_Func"), &FunctionStatus::Verified);
    assert_eq!(status_of(&report, "absolute_value"), &FunctionStatus::Verified);
    assert_eq!(status_of(&report, "max_of_three"), &FunctionStatus::Verified);
    assert_eq!(status_of(&report, "broken_abs"), &FunctionStatus::Violated);

    let broken = report.functions.iter().find(|f| f.name == "broken_abs").unwrap();
    let x = broken
        .counterexample
        .iter()
        .find(|(name, _)| name == "x")
        .map(|(_, value)| value.parse::<i64>().unwrap())
        .expect("counterexample binds x");
    assert!(x < 0);
}

#[test]
fn test_false_assertion_fails() {
    if !z3_available("test_false_assertion_fails") {
        return;
    }
    let report = verify_collect(
        r#"
@verify(ensures=["ans == x"])
def f(x: int) -> int:
    ans = x
    assert ans > 0
    return ans
"#,
    );
    assert_eq!(status_of(&report, "f"), &FunctionStatus::Violated);
}

#[test]
fn test_assume_strengthens_the_path() {
    if !z3_available("test_assume_strengthens_the_path") {
        return;
    }
    let report = verify_collect(
        r#"
@verify(ensures=["ans > 0"])
def f(x: int) -> int:
    assume("x > 0")
    ans = x
    return ans
"#,
    );
    assert!(report.all_verified(), "{report}");
}

// ============================================
// Quantifiers
// ============================================

#[test]
fn test_quantified_contracts() {
    if !z3_available("test_quantified_contracts") {
        return;
    }
    let report = verify_collect(
        r#"
scope("quantifiers")

@verify(ensures=["forall x: int :: x > 0 ==> n + x > n"])
def test_quantifier(n: int) -> int:
    return n

@verify(ensures=["forall x :: forall y :: x + y == y + x"])
def plus_comm() -> None:
    pass

@verify(ensures=["forall x :: exists y :: y > x and x - y < 0"])
def unbounded() -> None:
    pass

@verify(ensures=["forall x :: forall y :: not (x and y) <==> (not x) or (not y)"])
def de_morgan() -> None:
    pass

@verify(ensures=["(exists y :: y > n) <==> (not (forall y :: not (y > n)))"])
def exists_is_not_forall_not(n: int) -> int:
    return n

@verify(ensures=["n > 0 or exists k :: k == n", "not forall k :: k > n"])
def bare_quantifier_operands(n: int) -> int:
    return n
"#,
    );
    assert!(report.all_verified(), "{report}");
    assert_eq!(report.verified_count, 6);
}

#[test]
fn test_false_quantified_claim() {
    if !z3_available("test_false_quantified_claim") {
        return;
    }
    let report = verify_collect(
        r#"
@verify(ensures=["forall x: int :: n + x > n"])
def g(n: int) -> int:
    return n
"#,
    );
    assert_eq!(status_of(&report, "g"), &FunctionStatus::Violated);
}

// ============================================
// Lists
// ============================================

#[test]
fn test_list_update() {
    if !z3_available("test_list_update") {
        return;
    }
    let report = verify_collect(
        r#"
scope("lists")

@verify(requires=["len(xs) > 0"], ensures=["ans == 111"])
def simpl_array_operations(xs: List[int]) -> int:
    xs[0] = 111
    ans = xs[0]
    return ans

@verify(requires=["len(xs) > 1"], ensures=["ans == old"])
def untouched_neighbour(xs: List[int]) -> int:
    old = xs[1]
    xs[0] = 5
    ans = xs[1]
    return ans
"#,
    );
    assert!(report.all_verified(), "{report}");
}

// ============================================
// Errors
// ============================================

#[test]
fn test_missing_return_type_never_reaches_solver() {
    let module = load_module(
        "@verify(requires=['n >= 0'], ensures=['x == n'])\ndef counter(n: int):\n    x = n\n",
        "test",
    )
    .unwrap();
    let err = VerificationRun::new(module, &VerifyConfig::default())
        .with_solver_factory(|| -> Result<Box<dyn Solver>, SolverError> {
            panic!("solver started for an unsigned function")
        })
        .verify_all()
        .unwrap_err();
    assert!(matches!(err, VerifyError::MissingReturnType { ref function, .. } if function == "counter"));
}

#[test]
fn test_malformed_contract_is_recorded_as_error() {
    let module = load_module(
        "@verify(ensures=['ans >= '])\ndef f(x: int) -> int:\n    ans = x\n    return ans\n",
        "test",
    )
    .unwrap();
    let report = VerificationRun::new(module, &VerifyConfig::default())
        .with_mode(RunMode::Collect)
        .with_solver_factory(|| -> Result<Box<dyn Solver>, SolverError> {
            panic!("solver started for a malformed contract")
        })
        .verify_all()
        .unwrap();
    assert_eq!(report.error_count, 1);
    assert!(report.functions[0].message.is_some());
}

#[test]
fn test_type_mismatch_in_contract() {
    let module = load_module(
        "@verify(ensures=['x and True'])\ndef f(x: int) -> int:\n    return x\n",
        "test",
    )
    .unwrap();
    let function = &module.scopes[0].functions[0];
    let err = FunctionSession::new(function)
        .prepare(&VerifyConfig::default().builtins)
        .unwrap_err();
    assert_eq!(err.kind(), "Type");
}

#[test]
fn test_calls_are_unsupported() {
    let module = load_module(
        "@verify(ensures=['ans == 0'])\ndef f(x: int) -> int:\n    ans = helper(x)\n    return ans\n",
        "test",
    )
    .unwrap();
    let function = &module.scopes[0].functions[0];
    let err = FunctionSession::new(function)
        .prepare(&VerifyConfig::default().builtins)
        .unwrap_err();
    assert_eq!(err.kind(), "Unsupported");
}

// ============================================
// Idempotence
// ============================================

#[test]
fn test_rerun_gives_identical_obligations() {
    let module = load_module(COUNTER, "test").unwrap();
    let function = &module.scopes[0].functions[0];
    let builtins = VerifyConfig::default().builtins;

    let mut first = FunctionSession::new(function);
    let mut second = FunctionSession::new(function);
    let a = first.prepare(&builtins).unwrap().to_vec();
    let b = second.prepare(&builtins).unwrap().to_vec();
    assert_eq!(a, b);
}

#[test]
fn test_rerun_gives_identical_verdicts() {
    if !z3_available("test_rerun_gives_identical_verdicts") {
        return;
    }
    let first = verify_collect(BRANCHES);
    let second = verify_collect(BRANCHES);
    let statuses = |r: &RunReport| r.functions.iter().map(|f| f.status.clone()).collect::<Vec<_>>();
    assert_eq!(statuses(&first), statuses(&second));
}

// ============================================
// Interpreter cross-checks
// ============================================

fn parse(text: &str) -> Expr {
    parse_assertion(text, &mut FreshNames::new()).unwrap()
}

fn holds(expr: &Expr, env: &Environment) -> bool {
    Interpreter::new().eval(expr, env).unwrap() == Value::Bool(true)
}

/// For deterministic loop-free code the obligation holds exactly on the
/// inputs whose execution ends in the postcondition
fn cross_check(function: &SourceFunction, inputs: &[Vec<(&str, i64)>]) {
    let mut session = FunctionSession::new(function);
    let obligations = session.prepare(&VerifyConfig::default().builtins).unwrap().to_vec();
    let ir = session.ir().unwrap().clone();
    let post = Expr::conjoin(function.ensures.iter().map(|e| parse(&e.node)));

    for input in inputs {
        let env: Environment = input.iter().map(|(k, v)| (*k, Value::Int(*v))).collect();
        let predicted = obligations.iter().all(|o| holds(&o.formula, &env));

        let mut state = env.clone();
        let outcome = Interpreter::new().exec(&ir, &mut state).unwrap();
        assert_eq!(outcome, Outcome::Normal);
        let actual = holds(&post, &state);

        assert_eq!(predicted, actual, "{} on {input:?}", function.name);
    }
}

#[test]
fn test_wp_agrees_with_execution() {
    let module = load_module(BRANCHES, "test").unwrap();
    let mut inputs = Vec::new();
    for a in -2..=2 {
        for b in -2..=2 {
            for c in [-1, 3] {
                inputs.push(vec![("a", a), ("b", b), ("c", c), ("x", a * 3 + b)]);
            }
        }
    }
    for function in &module.scopes[0].functions {
        cross_check(function, &inputs);
    }
}

#[test]
fn test_wp_agrees_with_execution_on_division() {
    let module = load_module(
        r#"
@verify(ensures=["q * d + r == n", "0 <= r"])
def divmod_(n: int, d: int) -> int:
    q = n // d
    r = n % d
    if d < 0:
        r = -r
    return q
"#,
        "test",
    )
    .unwrap();
    let mut inputs = Vec::new();
    for n in [-7, -1, 0, 5, 9] {
        for d in [-3, -2, 2, 4] {
            inputs.push(vec![("n", n), ("d", d)]);
        }
    }
    cross_check(&module.scopes[0].functions[0], &inputs);
}

#[test]
fn test_substitution_law() {
    let exprs = [
        "x * 2 + y // 3 - x % 4 > y",
        "x == y or not (x < 0)",
        "(x - y) * (x + y) == x * x - y * y",
    ];
    let replacements = ["y - 7", "x * x", "3"];
    for e in exprs {
        let e = parse(e);
        for r in replacements {
            let r = parse(r);
            for (x, y) in [(-5, 2), (0, 0), (4, -9), (11, 3)] {
                let env: Environment = [("x", Value::Int(x)), ("y", Value::Int(y))].into_iter().collect();
                let replaced = Interpreter::new().eval(&e.substitute("x", &r), &env).unwrap();

                let mut bound = env.clone();
                bound.define("x", Interpreter::new().eval(&r, &env).unwrap());
                let direct = Interpreter::new().eval(&e, &bound).unwrap();

                assert_eq!(replaced, direct, "{e}[{r}/x] at x={x}, y={y}");
            }
        }
    }
}
