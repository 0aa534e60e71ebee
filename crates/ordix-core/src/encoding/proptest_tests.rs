//! Property-based tests for composite key round-trips and ordering.

#![allow(clippy::expect_used)]

use std::cmp::Ordering;

use proptest::prelude::*;

use crate::encoding::KeyCoder;
use crate::types::{Direction, Value};

/// Strategy for indexable values. NaN is excluded since NaN != NaN.
fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        any::<f64>().prop_filter("not NaN", |f| !f.is_nan()).prop_map(Value::Float),
        ".{0,12}".prop_map(Value::String),
        prop::collection::vec(prop_oneof![Just(0u8), Just(1u8), any::<u8>()], 0..12)
            .prop_map(Value::Bytes),
    ]
}

fn arb_direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Ascending), Just(Direction::Descending)]
}

/// A direction list with two keys of matching shape.
fn arb_key_pair() -> impl Strategy<Value = (Vec<Direction>, Vec<Value>, Vec<Value>)> {
    prop::collection::vec(arb_direction(), 1..4).prop_flat_map(|dirs| {
        let n = dirs.len();
        (
            Just(dirs),
            prop::collection::vec(arb_value(), n),
            prop::collection::vec(arb_value(), n),
        )
    })
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Int(_) => 2,
        Value::Float(_) => 3,
        Value::String(_) => 4,
        Value::Bytes(_) => 5,
        Value::Array(_) => 6,
    }
}

/// Reference ordering of single values: by type first, then by value.
fn cmp_value(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Float(x), Value::Float(y)) => x.total_cmp(y),
        (Value::String(x), Value::String(y)) => x.as_bytes().cmp(y.as_bytes()),
        (Value::Bytes(x), Value::Bytes(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Reference multi-field ordering under a direction list.
fn cmp_key(dirs: &[Direction], a: &[Value], b: &[Value]) -> Ordering {
    for ((x, y), d) in a.iter().zip(b).zip(dirs) {
        let ord = d.apply(cmp_value(x, y));
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

proptest! {
    #[test]
    fn composite_key_roundtrip((dirs, key, _) in arb_key_pair()) {
        let coder = KeyCoder::new(dirs);
        let encoded = coder.encode(&key).expect("encoding should succeed");
        let decoded = coder.decode(&encoded).expect("decoding should succeed");
        prop_assert_eq!(key, decoded);
    }

    #[test]
    fn encoding_preserves_declared_order((dirs, a, b) in arb_key_pair()) {
        let coder = KeyCoder::new(dirs.clone());
        let ea = coder.encode(&a).expect("encoding should succeed");
        let eb = coder.encode(&b).expect("encoding should succeed");
        prop_assert_eq!(ea.cmp(&eb), cmp_key(&dirs, &a, &b));
    }

    #[test]
    fn compare_agrees_with_encoded_order((dirs, a, b) in arb_key_pair()) {
        let coder = KeyCoder::new(dirs);
        let ea = coder.encode(&a).expect("encoding should succeed");
        let eb = coder.encode(&b).expect("encoding should succeed");
        prop_assert_eq!(coder.compare(&a, &b), ea.cmp(&eb));
    }

    #[test]
    fn encoding_is_deterministic((dirs, key, _) in arb_key_pair()) {
        let first = KeyCoder::new(dirs.clone()).encode(&key).expect("encoding should succeed");
        let second = KeyCoder::new(dirs).encode(&key).expect("encoding should succeed");
        prop_assert_eq!(first, second);
    }
}
