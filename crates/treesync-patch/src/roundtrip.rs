//! End-to-end checks: whatever the differ emits, the applier must turn the
//! old tree into the new one.

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;
use serde::Deserialize;
use serde_json::{json, Value};
use treesync_diff::{diff, DiffOptions};
use treesync_types::{
    decode_patch, encode_patch, Normalizable, NormalizerRegistry, OpKind, PatchOperation,
    SyncConfig,
};

use crate::apply;

fn round_trip(source: &Value, destination: &Value, opts: &DiffOptions) -> Value {
    let ops = diff(source, destination, opts).unwrap();
    // Ship through the wire form like a real consumer would.
    let wire = encode_patch(&ops).unwrap();
    let received = decode_patch(&wire).unwrap();
    apply(source, &received, &opts.config).unwrap()
}

fn arb_key() -> impl Strategy<Value = String> {
    prop_oneof!["[a-c]{1,2}", "[a~/]{1,3}", Just("$$id".to_string())]
}

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-3i64..3).prop_map(|n| Value::Number(n.into())),
        "[xy]{0,2}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 64, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map(arb_key(), inner, 0..5)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn arb_record() -> impl Strategy<Value = Value> {
    prop::collection::btree_map(arb_key(), arb_json(), 0..4)
        .prop_map(|m| Value::Object(m.into_iter().collect()))
}

/// Records with unique `id`s drawn from a small pool, so two feeds share
/// many identities in different orders.
fn arb_feed() -> impl Strategy<Value = Value> {
    prop::collection::vec((0u8..12, 0u8..3), 0..10).prop_map(|items| {
        let mut seen = HashSet::new();
        Value::Array(
            items
                .into_iter()
                .filter(|(id, _)| seen.insert(*id))
                .map(|(id, v)| json!({"id": id, "v": v}))
                .collect(),
        )
    })
}

/// Same shape as [`arb_feed`] but identities may repeat.
fn arb_colliding_feed() -> impl Strategy<Value = Value> {
    prop::collection::vec((0u8..3, 0u8..3), 0..8)
        .prop_map(|items| Value::Array(items.into_iter().map(|(id, v)| json!({"id": id, "v": v})).collect()))
}

proptest! {
    #[test]
    fn records_round_trip(a in arb_record(), b in arb_record()) {
        prop_assert_eq!(round_trip(&a, &b, &DiffOptions::default()), b);
    }

    #[test]
    fn sequences_round_trip(
        a in prop::collection::vec(arb_json(), 0..6),
        b in prop::collection::vec(arb_json(), 0..6),
    ) {
        let (a, b) = (Value::Array(a), Value::Array(b));
        prop_assert_eq!(round_trip(&a, &b, &DiffOptions::default()), b.clone());
        prop_assert_eq!(round_trip(&a, &b, &DiffOptions::new().hash_by_field("id")), b);
    }

    #[test]
    fn keyed_feeds_round_trip(a in arb_feed(), b in arb_feed()) {
        let (a, b) = (json!({"feed": a}), json!({"feed": b}));
        let opts = DiffOptions::new().hash_by_field("id");
        prop_assert_eq!(round_trip(&a, &b, &opts), b);
    }

    #[test]
    fn colliding_identities_round_trip(a in arb_colliding_feed(), b in arb_colliding_feed()) {
        let (a, b) = (json!({"feed": a}), json!({"feed": b}));
        let opts = DiffOptions::new().hash_by_field("id");
        prop_assert_eq!(round_trip(&a, &b, &opts), b);
    }

    #[test]
    fn subtree_round_trip(a in arb_record(), b in arb_record()) {
        let opts = DiffOptions::new().ancestor_path("/state/a~1b");
        let source = json!({"state": {"a/b": a}, "other": 1});
        let expected = json!({"state": {"a/b": b}, "other": 1});
        let ops = diff(&source["state"]["a/b"], &expected["state"]["a/b"], &opts).unwrap();
        prop_assert_eq!(apply(&source, &ops, &opts.config).unwrap(), expected);
    }
}

#[test]
fn keyed_reorder_reconstructs_order() {
    let a = json!([{"id": 1, "body": "first"}, {"id": 2, "body": "second"}]);
    let b = json!([{"id": 2, "body": "second"}, {"id": 1, "body": "first"}]);
    let opts = DiffOptions::new().hash_by_field("id");

    let ops = diff(&a, &b, &opts).unwrap();
    assert!(ops.len() <= 2);
    assert!(ops.iter().all(|op| op.op != OpKind::Replace));
    assert_eq!(apply(&a, &ops, &SyncConfig::default()).unwrap(), b);
}

#[test]
fn escaped_keys_do_not_touch_siblings() {
    let a = json!({"a/b": 1, "a": {"b": 1}, "~": {"0": 1}, "~0": 1});
    let b = json!({"a/b": 2, "a": {"b": 1}, "~": {"0": 1}, "~0": 3, "x/y~z": {"k": []}});
    assert_eq!(round_trip(&a, &b, &DiffOptions::default()), b);
}

#[test]
fn normalized_destination_round_trips() {
    // The consumer receives the normalized form, never the domain record.
    let opts = DiffOptions::new().prepare_map(|r| {
        Ok(match r.get("__struct__").and_then(Value::as_str) {
            Some("Money") => json!(format!("{} {}", r["amount"], r["currency"].as_str().unwrap_or(""))),
            _ => Value::Object(r.clone()),
        })
    });

    let source = json!({"price": "5 EUR", "items": []});
    let destination = json!({
        "price": {"__struct__": "Money", "amount": 7, "currency": "EUR"},
        "items": [{"__struct__": "Money", "amount": 1, "currency": "USD"}],
    });

    let ops = diff(&source, &destination, &opts).unwrap();
    let out = apply(&source, &ops, &SyncConfig::default()).unwrap();
    assert_eq!(out, json!({"price": "7 EUR", "items": ["1 USD"]}));
}

#[derive(Deserialize)]
struct Money {
    amount: i64,
    currency: String,
}

impl Normalizable for Money {
    fn to_plain_value(&self) -> Value {
        json!(format!("{} {}", self.amount, self.currency))
    }
}

#[test]
fn registry_normalizes_replaced_and_added_records() {
    let mut registry = NormalizerRegistry::new();
    registry
        .register_type::<Money>("Money")
        .register("Secret", |_| Ok(json!("***")));
    let opts = DiffOptions::new().normalizers(Arc::new(registry));

    let source = json!({"lines": [{"sku": "a"}], "price": "5 EUR", "token": "***"});
    let destination = json!({
        "lines": [
            {"sku": "a"},
            {"sku": "b", "cost": {"__struct__": "Money", "amount": 1, "currency": "USD"}},
        ],
        "price": {"__struct__": "Money", "amount": 7, "currency": "EUR"},
        "token": {"__struct__": "Secret", "value": "hunter2"},
    });

    let ops = diff(&source, &destination, &opts).unwrap();
    assert_eq!(
        ops,
        vec![
            PatchOperation::add("/lines/1", json!({"sku": "b", "cost": "1 USD"})),
            PatchOperation::replace("/price", json!("7 EUR")),
        ]
    );

    let out = apply(&source, &ops, &opts.config).unwrap();
    assert_eq!(
        out,
        json!({
            "lines": [{"sku": "a"}, {"sku": "b", "cost": "1 USD"}],
            "price": "7 EUR",
            "token": "***",
        })
    );
}

#[test]
fn dollar_key_ancestor_round_trips() {
    let opts = DiffOptions::new().ancestor_path("/$$meta");
    let source = json!({"$$meta": {"rev": 1, "tags": ["a"]}, "body": 0});
    let expected = json!({"$$meta": {"rev": 2, "tags": ["a", "b"]}, "body": 0});

    let ops = diff(&source["$$meta"], &expected["$$meta"], &opts).unwrap();
    assert!(ops.iter().all(|op| op.path.starts_with("/$$meta/")));
    assert_eq!(apply(&source, &ops, &opts.config).unwrap(), expected);
}

#[test]
fn deep_trees_round_trip_with_default_config() {
    let nest = |leaf: Value| (0..200).fold(leaf, |v, _| json!({ "x": v }));
    let (a, b) = (nest(json!([1, 2])), nest(json!([2])));
    assert_eq!(round_trip(&a, &b, &DiffOptions::default()), b);
}

#[test]
fn disabled_diff_still_round_trips() {
    let opts = DiffOptions::new().config(SyncConfig::full_resend());
    let a = json!({"a": [1, 2, 3]});
    let b = json!({"a": [3], "b": true});
    assert_eq!(round_trip(&a, &b, &opts), b);
}

#[test]
fn diff_output_feeds_bounded_ops() {
    // A keyed diff of a capped feed followed by the producer's cap stays consistent.
    let a = json!({"feed": [{"id": 1}, {"id": 2}, {"id": 3}]});
    let b = json!({"feed": [{"id": 0}, {"id": 1}, {"id": 2}]});
    let mut ops = diff(&a, &b, &DiffOptions::new().hash_by_field("id")).unwrap();
    ops.extend(crate::BoundedCollection::new("/feed", Some(3)).unwrap().cap());
    assert_eq!(apply(&a, &ops, &SyncConfig::default()).unwrap(), b);
}
