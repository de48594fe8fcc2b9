//! Randomized insert/remove stress test, in the spirit of the teacher's own
//! `test_utils::setup` random-tuple generators.

use std::collections::HashMap;

use rand::prelude::*;
use ridtree::{Config, FieldType, Key, KeyItem, Rid, Tree};
use tempfile::tempdir;

#[test]
fn random_insert_remove_sequence_matches_a_reference_multimap() {
    let dir = tempdir().unwrap();
    let t = Tree::create(
        dir.path().join("main.db"),
        None,
        vec![FieldType::Integer],
        None,
        Config::default(),
    )
    .unwrap();

    let mut rng = rand::thread_rng();
    let mut model: HashMap<i64, Vec<Rid>> = HashMap::new();
    let mut next_rid = 0i64;

    for _ in 0..5_000 {
        let key_val = rng.gen_range(0, 200);
        let key = Key::single(KeyItem::Integer(key_val));

        if rng.gen_bool(0.7) || model.get(&key_val).map_or(true, Vec::is_empty) {
            let rid = Rid::new(0, next_rid);
            next_rid += 1;
            t.put(Some(key), rid).unwrap();
            model.entry(key_val).or_default().push(rid);
        } else {
            let entries = model.get_mut(&key_val).unwrap();
            let idx = rng.gen_range(0, entries.len());
            let rid = entries.remove(idx);
            assert!(t.remove(Some(key), rid).unwrap());
        }
    }

    let expected_size: u64 = model.values().map(|v| v.len() as u64).sum();
    assert_eq!(t.size().unwrap(), expected_size);

    for (key_val, rids) in &model {
        let mut got = t.get(Some(Key::single(KeyItem::Integer(*key_val)))).unwrap();
        let mut want = rids.clone();
        got.sort_by_key(|r| r.position);
        want.sort_by_key(|r| r.position);
        assert_eq!(got, want);
    }
}
