use super::*;

use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

use crate::hash::{masked, HASH_MASK};
use crate::pool::NodeRef;

/// Recursive structural audit of one subtree: ordering bounds, stored
/// heights, balance factors. Returns (height, reachable node count).
fn audit_subtree(state: &State, index: NodeRef, low: Option<u32>, high: Option<u32>) -> (i32, u32) {
    if index.is_none() {
        return (-1, 0);
    }
    let node = *state.tree.node(index);
    assert_eq!(node.hash & HASH_MASK, node.hash, "unmasked hash in tree");
    if let Some(low) = low {
        assert!(node.hash > low, "ordering violated");
    }
    if let Some(high) = high {
        assert!(node.hash < high, "ordering violated");
    }

    let (left_height, left_count) = audit_subtree(state, node.left, low, Some(node.hash));
    let (right_height, right_count) = audit_subtree(state, node.right, Some(node.hash), high);
    assert!(
        (right_height - left_height).abs() <= 1,
        "balance factor out of range"
    );

    let height = left_height.max(right_height) + 1;
    assert_eq!(i32::from(node.height), height, "stored height is stale");
    (height, left_count + right_count + 1)
}

/// Full engine audit: AVL shape, bucket exactness, id bijection.
fn validate<G: Gate>(interner: &Interner<G>) {
    // Tests own the interner exclusively, so ungated access is fine here.
    let state = unsafe { &*interner.state.get() };

    let (_, reachable) = audit_subtree(state, state.tree.root(), None, None);
    assert_eq!(
        reachable,
        state.tree.pool().len(),
        "tree must reach every pool node"
    );

    let mut seen_ids: HashSet<u32> = HashSet::new();
    let mut records_seen = 0u32;
    for node in state.tree.pool().iter() {
        let mut chain: Vec<&[u8]> = Vec::new();
        let mut cursor = node.chain;
        while !cursor.is_none() {
            let record = state.records.get(cursor);
            assert_eq!(
                masked((interner.hasher)(&record.bytes)),
                node.hash,
                "record hashed into the wrong bucket"
            );

            let raw = record.id.to_u32();
            assert!(raw >= 1 && raw < state.next_id, "id out of range");
            assert!(seen_ids.insert(raw), "duplicate id");

            for previous in &chain {
                assert_ne!(*previous, record.bytes.as_ref(), "duplicate bytes in one chain");
            }
            chain.push(&record.bytes);

            records_seen += 1;
            cursor = record.next;
        }
    }
    assert_eq!(
        records_seen,
        state.records.len(),
        "every record must sit on exactly one chain"
    );
    assert_eq!(seen_ids.len() as u32, state.next_id - 1, "ids must be dense");
}

#[derive(Clone, Debug)]
enum Op {
    Intern(Vec<u8>),
    Get(Vec<u8>),
    Resolve(u32),
}

fn key_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    // Small alphabet, short keys: plenty of repeats, which is the whole
    // point of an interner.
    prop::collection::vec(prop::sample::select(b"abcdef".to_vec()), 0..=6)
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let key = key_strategy();
    let op = prop_oneof![
        60 => key.clone().prop_map(Op::Intern),
        25 => key.prop_map(Op::Get),
        15 => (0u32..64).prop_map(Op::Resolve),
    ];
    prop::collection::vec(op, 0..=400)
}

/// Drive the interner and a flat model in lockstep, then sweep the model
/// for bijection.
fn check_against_model<G: Gate>(
    interner: &Interner<G>,
    ops: Vec<Op>,
) -> Result<(), TestCaseError> {
    let mut ids: HashMap<Vec<u8>, StrId> = HashMap::new();
    // Index i holds the string behind id i; id 0 is the empty string.
    let mut strings: Vec<Vec<u8>> = vec![Vec::new()];

    for op in ops {
        match op {
            Op::Intern(key) => {
                let id = interner.intern(&key).unwrap();
                if key.is_empty() {
                    prop_assert_eq!(id, StrId::EMPTY);
                } else if let Some(&expected) = ids.get(&key) {
                    prop_assert_eq!(id, expected);
                } else {
                    prop_assert_eq!(id.to_u32() as usize, strings.len());
                    ids.insert(key.clone(), id);
                    strings.push(key);
                }
            }
            Op::Get(key) => {
                let got = interner.get(&key);
                if key.is_empty() {
                    prop_assert_eq!(got, Ok(StrId::EMPTY));
                } else {
                    match ids.get(&key) {
                        Some(&expected) => prop_assert_eq!(got, Ok(expected)),
                        None => prop_assert_eq!(got, Err(Error::NotInterned)),
                    }
                }
            }
            Op::Resolve(raw) => {
                let id = StrId::from_u32(raw);
                match interner.resolve(id) {
                    Ok(bytes) => {
                        prop_assert!((raw as usize) < strings.len());
                        prop_assert_eq!(bytes, strings[raw as usize].as_slice());
                    }
                    Err(err) => {
                        prop_assert!(raw as usize >= strings.len());
                        prop_assert_eq!(err, Error::UnknownId(id));
                    }
                }
            }
        }
    }

    for (key, &id) in &ids {
        prop_assert_eq!(interner.get(key), Ok(id));
        prop_assert_eq!(interner.resolve(id).unwrap(), key.as_slice());
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_model_equivalence(ops in ops_strategy()) {
        let interner = Interner::new();
        check_against_model(&interner, ops)?;
        validate(&interner);
    }

    #[test]
    fn prop_model_equivalence_degenerate_hash(ops in ops_strategy()) {
        // Two usable buckets: chains get long, the tree stays tiny, and
        // exactness has to come from byte comparison alone.
        let interner = Interner::with_options(Options {
            hasher: Some(Box::new(|bytes: &[u8]| {
                (u32::from(bytes.first().copied().unwrap_or(0)) & 1) << 6
            })),
            gate: SingleThreaded,
        });
        check_against_model(&interner, ops)?;
        validate(&interner);
    }

    #[test]
    fn prop_ids_are_dense_and_ordered(
        keys in prop::collection::vec(key_strategy(), 0..=200),
    ) {
        let interner = Interner::new();
        let mut known: HashMap<Vec<u8>, StrId> = HashMap::new();
        let mut expected_next = 1u32;

        for key in keys {
            let id = interner.intern(&key).unwrap();
            if key.is_empty() {
                prop_assert_eq!(id, StrId::EMPTY);
                continue;
            }
            match known.get(&key) {
                Some(&previous) => prop_assert_eq!(id, previous),
                None => {
                    prop_assert_eq!(id.to_u32(), expected_next);
                    known.insert(key, id);
                    expected_next += 1;
                }
            }
        }
        validate(&interner);
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

#[test]
fn exhaustive_insert_orders_small_set() {
    // Ids depend on insertion order; membership and bijection must not.
    let keys: Vec<&[u8]> = vec![b"a", b"b", b"c", b"ab", b"ba", b"abc"];

    for_each_permutation(&keys, |perm| {
        let interner = Interner::new();
        for key in &perm {
            interner.intern(key).unwrap();
        }
        validate(&interner);

        for (i, key) in perm.iter().enumerate() {
            let id = interner.get(key).unwrap();
            assert_eq!(id.to_u32(), i as u32 + 1);
            assert_eq!(interner.resolve(id).unwrap(), *key);
        }
    });
}
