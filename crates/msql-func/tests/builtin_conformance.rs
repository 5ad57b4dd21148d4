//! End-to-end behaviour of the builtins through the registry.

use std::sync::Arc;

use msql_func::{BuildContext, EvalConfig, Expression, FunctionRegistry, Row, constants};
use msql_lock::NamedLockManager;
use msql_types::{SessionId, Value};
use proptest::prelude::*;

const FLOAT_EXACT_LIMIT: i64 = 1 << 53;

fn eval_in(registry: &FunctionRegistry, name: &str, args: Vec<Value>) -> Value {
    registry
        .bind(name, constants(args))
        .and_then(|f| f.eval(&Row::empty(SessionId::new(1))))
        .unwrap_or_else(|e| panic!("{name}: {e}"))
}

fn eval(name: &str, args: Vec<Value>) -> Value {
    eval_in(&FunctionRegistry::default(), name, args)
}

fn binary_search_registry() -> FunctionRegistry {
    FunctionRegistry::new(BuildContext::new(
        EvalConfig {
            interval_linear_scan_max: 0,
        },
        Arc::new(NamedLockManager::new()),
    ))
}

struct Case {
    func: &'static str,
    args: Vec<Value>,
    want: Value,
}

fn case(func: &'static str, args: Vec<Value>, want: Value) -> Case {
    Case { func, args, want }
}

#[test]
fn comparison_table() {
    let u = Value::UInt;
    let i = Value::Int;
    let s = |x: &str| Value::from(x);
    let cases = vec![
        case("GREATEST", vec![i(2), i(0)], i(2)),
        case("LEAST", vec![i(2), i(0)], i(0)),
        case(
            "greatest",
            vec![
                Value::Float(34.0),
                Value::Float(3.0),
                Value::Float(5.0),
                Value::Float(767.0),
            ],
            Value::Float(767.0),
        ),
        case(
            "least",
            vec![
                Value::Float(34.0),
                Value::Float(3.0),
                Value::Float(5.0),
                Value::Float(767.0),
            ],
            Value::Float(3.0),
        ),
        case("GREATEST", vec![s("B"), s("A"), s("C")], s("C")),
        case("LEAST", vec![s("B"), s("A"), s("C")], s("A")),
        case("GREATEST", vec![Value::Null, i(1), i(2)], Value::Null),
        case("GREATEST", vec![i(1), Value::Null, i(2)], Value::Null),
        case("LEAST", vec![i(1), i(2), Value::Null], Value::Null),
        case("INTERVAL", vec![Value::Null, i(1), i(2)], i(-1)),
        case("INTERVAL", vec![i(1), i(2), i(3)], i(0)),
        case("INTERVAL", vec![i(2), i(1), i(3)], i(1)),
        case("INTERVAL", vec![i(3), i(1), i(2)], i(2)),
        case(
            "INTERVAL",
            vec![i(9_007_199_254_740_992), i(9_007_199_254_740_993)],
            i(0),
        ),
        case(
            "INTERVAL",
            vec![i(9_007_199_254_740_992), s("9007199254740993")],
            i(1),
        ),
        case(
            "INTERVAL",
            vec![s("9007199254740992"), i(9_007_199_254_740_993)],
            i(1),
        ),
        case(
            "INTERVAL",
            vec![s("9007199254740992"), s("9007199254740993")],
            i(1),
        ),
        case(
            "INTERVAL",
            vec![i(-9_223_372_036_854_775_807), u(9_223_372_036_854_775_808)],
            i(0),
        ),
        case(
            "INTERVAL",
            vec![u(9_223_372_036_854_775_806), i(-9_223_372_036_854_775_807)],
            i(1),
        ),
        case(
            "GREATEST",
            vec![
                s("9007199254740992"),
                s("9007199254740993"),
                s("0.1234567890123456789012345678901"),
            ],
            s("9007199254740993"),
        ),
        case(
            "LEAST",
            vec![s("9007199254740993"), s("9007199254740992"), s("1e300")],
            s("9007199254740992"),
        ),
        case(
            "GREATEST",
            vec![
                s("100000000000000000000000000000000"),
                s("100000000000000000000000000000001"),
            ],
            s("100000000000000000000000000000001"),
        ),
        case(
            "LEAST",
            vec![
                s("1234567890123456789012345678901234567891"),
                s("1234567890123456789012345678901234567890"),
            ],
            s("1234567890123456789012345678901234567890"),
        ),
        case("ISNULL", vec![i(1)], i(0)),
        case("ISNULL", vec![Value::Null], i(1)),
    ];

    for c in cases {
        let got = eval(c.func, c.args.clone());
        assert_eq!(got, c.want, "{}({:?})", c.func, c.args);
    }
}

#[test]
fn interval_long_boundary_lists_use_binary_search() {
    let bounds: Vec<Value> = (0..100).map(|n| Value::Int(n * 10)).collect();
    for (probe, want) in [(-1, 0), (0, 1), (5, 1), (10, 2), (989, 99), (990, 100), (5000, 100)] {
        let mut args = vec![Value::Int(probe)];
        args.extend(bounds.iter().cloned());
        assert_eq!(eval("INTERVAL", args), Value::Int(want), "probe {probe}");
    }
}

#[test]
fn lock_round_trip_and_contention() {
    let registry = FunctionRegistry::default();
    let call = |session: u64, name: &str, args: Vec<Value>| {
        registry
            .bind(name, constants(args))
            .and_then(|f| f.eval(&Row::empty(SessionId::new(session))))
            .unwrap()
    };

    assert_eq!(call(1, "GET_LOCK", vec![Value::from("x"), Value::Int(1)]), Value::Int(1));
    assert_eq!(call(2, "GET_LOCK", vec![Value::from("x"), Value::Int(0)]), Value::Int(0));
    assert_eq!(call(2, "RELEASE_LOCK", vec![Value::from("x")]), Value::Int(0));
    assert_eq!(call(2, "IS_USED_LOCK", vec![Value::from("x")]), Value::UInt(1));
    assert_eq!(call(1, "RELEASE_LOCK", vec![Value::from("x")]), Value::Int(1));
    assert_eq!(call(1, "RELEASE_LOCK", vec![Value::from("x")]), Value::Null);
    assert_eq!(call(2, "RELEASE_LOCK", vec![Value::from("x")]), Value::Null);
    assert_eq!(call(2, "IS_FREE_LOCK", vec![Value::from("x")]), Value::Int(1));
}

#[test]
fn session_teardown_hook_frees_locks_for_others() {
    let registry = FunctionRegistry::default();
    let row = |n| Row::empty(SessionId::new(n));
    let get = registry
        .bind("GET_LOCK", constants([Value::from("job"), Value::Int(0)]))
        .unwrap();
    assert_eq!(get.eval(&row(1)).unwrap(), Value::Int(1));
    assert_eq!(get.eval(&row(2)).unwrap(), Value::Int(0));

    assert_eq!(
        registry
            .context()
            .locks
            .release_all_held_by(SessionId::new(1)),
        1
    );
    assert_eq!(get.eval(&row(2)).unwrap(), Value::Int(1));
}

fn int_or_uint() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::Int),
        any::<u64>().prop_map(Value::UInt),
    ]
}

fn as_i128(v: &Value) -> i128 {
    match v {
        Value::Int(i) => i128::from(*i),
        Value::UInt(u) => i128::from(*u),
        other => panic!("not an integer: {other:?}"),
    }
}

proptest! {
    #[test]
    fn prop_greatest_least_ignore_argument_order(
        (values, shuffled) in prop::collection::vec(any::<i64>(), 2..10)
            .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
    ) {
        let wrap = |v: &[i64]| v.iter().copied().map(Value::Int).collect::<Vec<_>>();
        for func in ["GREATEST", "LEAST"] {
            prop_assert_eq!(eval(func, wrap(&values)), eval(func, wrap(&shuffled)));
        }
    }

    #[test]
    fn prop_signed_unsigned_extremum_is_exact(values in prop::collection::vec(int_or_uint(), 2..8)) {
        let max = values.iter().map(as_i128).max().unwrap();
        let min = values.iter().map(as_i128).min().unwrap();
        prop_assert_eq!(eval("GREATEST", values.clone()).to_text(), max.to_string());
        prop_assert_eq!(eval("LEAST", values).to_text(), min.to_string());
    }

    #[test]
    fn prop_large_integer_strings_never_collapse(
        values in prop::collection::vec(FLOAT_EXACT_LIMIT..FLOAT_EXACT_LIMIT + 64, 2..8)
    ) {
        let args = values.iter().map(|v| Value::from(v.to_string())).collect();
        let max = values.iter().max().unwrap();
        prop_assert_eq!(eval("GREATEST", args), Value::from(max.to_string()));
    }

    #[test]
    fn prop_large_integers_exact_beside_inexact_operand(
        values in prop::collection::vec(FLOAT_EXACT_LIMIT..FLOAT_EXACT_LIMIT + 64, 2..8),
        extra in prop_oneof![
            Just("1e300"),
            Just("-1e300"),
            Just("1e5000"),
            Just("0.1234567890123456789012345678901"),
            Just("1234567890123456789012345678901234567890"),
        ],
        at in any::<prop::sample::Index>(),
    ) {
        let mut args: Vec<Value> = values.iter().map(|v| Value::from(v.to_string())).collect();
        args.insert(at.index(args.len() + 1), Value::from(extra));

        let max = values.iter().max().unwrap().to_string();
        let min = values.iter().min().unwrap().to_string();
        let (want_max, want_min) = match extra {
            "-1e300" | "0.1234567890123456789012345678901" => (max, extra.to_owned()),
            _ => (extra.to_owned(), min),
        };
        prop_assert_eq!(eval("GREATEST", args.clone()), Value::from(want_max));
        prop_assert_eq!(eval("LEAST", args), Value::from(want_min));
    }

    #[test]
    fn prop_null_anywhere_is_null(
        values in prop::collection::vec(any::<i64>(), 1..6),
        at in any::<prop::sample::Index>(),
    ) {
        let mut args: Vec<Value> = values.into_iter().map(Value::Int).collect();
        let pos = at.index(args.len() + 1);
        args.insert(pos, Value::Null);
        prop_assert_eq!(eval("GREATEST", args.clone()), Value::Null);
        prop_assert_eq!(eval("LEAST", args), Value::Null);
    }

    #[test]
    fn prop_interval_counts_bounds_not_above_probe(
        probe in -50_i64..50,
        mut bounds in prop::collection::vec(-50_i64..50, 1..24),
    ) {
        bounds.sort_unstable();
        let want = bounds.iter().filter(|b| **b <= probe).count();
        let mut args = vec![Value::Int(probe)];
        args.extend(bounds.iter().copied().map(Value::Int));

        let want = Value::Int(i64::try_from(want).unwrap());
        prop_assert_eq!(&eval("INTERVAL", args.clone()), &want);
        prop_assert_eq!(&eval_in(&binary_search_registry(), "INTERVAL", args), &want);
    }
}

#[test]
fn bound_functions_are_shareable_across_threads() {
    let registry = FunctionRegistry::default();
    let f: Arc<dyn Expression> = Arc::new(
        registry
            .bind("GREATEST", constants([Value::Int(1), Value::from("7"), Value::Int(3)]))
            .unwrap(),
    );
    let handles: Vec<_> = (0..4)
        .map(|n| {
            let f = Arc::clone(&f);
            std::thread::spawn(move || f.eval(&Row::empty(SessionId::new(n))).unwrap())
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), Value::from("7"));
    }
}
