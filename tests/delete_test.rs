use ridtree::{Config, FieldType, IndexError, Key, KeyItem, Rid, Tree};
use tempfile::tempdir;

fn int_tree(dir: &std::path::Path) -> Tree {
    Tree::create(
        dir.join("main.db"),
        Some(dir.join("null.db")),
        vec![FieldType::Integer],
        None,
        Config::default(),
    )
    .unwrap()
}

#[test]
fn duplicate_keys_form_a_multiset_and_remove_one_occurrence() {
    let dir = tempdir().unwrap();
    let t = int_tree(dir.path());
    let key = Key::single(KeyItem::Integer(1));
    let (r1, r2, r3) = (Rid::new(0, 1), Rid::new(0, 2), Rid::new(0, 3));

    t.put(Some(key.clone()), r1).unwrap();
    t.put(Some(key.clone()), r2).unwrap();
    t.put(Some(key.clone()), r3).unwrap();
    assert_eq!(t.get(Some(key.clone())).unwrap(), vec![r1, r2, r3]);

    assert!(t.remove(Some(key.clone()), r2).unwrap());
    assert_eq!(t.get(Some(key.clone())).unwrap(), vec![r1, r3]);
    assert_eq!(t.size().unwrap(), 2);
}

#[test]
fn null_key_insert_and_remove() {
    let dir = tempdir().unwrap();
    let t = int_tree(dir.path());
    let (r1, r2) = (Rid::new(0, 1), Rid::new(0, 2));

    t.put(None, r1).unwrap();
    t.put(None, r2).unwrap();
    assert_eq!(t.get(None).unwrap(), vec![r1, r2]);

    assert!(t.remove(None, r1).unwrap());
    assert_eq!(t.get(None).unwrap(), vec![r2]);
    assert_eq!(t.size().unwrap(), 1);
}

#[test]
fn null_key_is_rejected_without_a_null_file() {
    let dir = tempdir().unwrap();
    let t = Tree::create(
        dir.path().join("main.db"),
        None,
        vec![FieldType::Integer],
        None,
        Config::default(),
    )
    .unwrap();

    let err = t.put(None, Rid::new(0, 1)).unwrap_err();
    assert!(matches!(err, IndexError::NullKeyDisallowed));
}

#[test]
fn removing_an_absent_pair_does_not_change_size() {
    let dir = tempdir().unwrap();
    let t = int_tree(dir.path());
    t.put(Some(Key::single(KeyItem::Integer(1))), Rid::new(0, 1))
        .unwrap();

    assert!(!t
        .remove(Some(Key::single(KeyItem::Integer(1))), Rid::new(0, 99))
        .unwrap());
    assert!(!t
        .remove(Some(Key::single(KeyItem::Integer(2))), Rid::new(0, 1))
        .unwrap());
    assert_eq!(t.size().unwrap(), 1);
}

#[test]
fn oversized_key_is_rejected_before_any_mutation() {
    let dir = tempdir().unwrap();
    let mut cfg = Config::default();
    cfg.max_key_size = 8;
    let t = Tree::create(
        dir.path().join("main.db"),
        None,
        vec![FieldType::Varchar],
        None,
        cfg,
    )
    .unwrap();

    let big = Key::single(KeyItem::Varchar("far too long for eight bytes".into()));
    let err = t.put(Some(big), Rid::new(0, 1)).unwrap_err();
    assert!(matches!(err, IndexError::KeyTooBig { .. }));
    assert_eq!(t.size().unwrap(), 0);
}

#[test]
fn clearing_a_tree_drops_every_entry() {
    let dir = tempdir().unwrap();
    let t = int_tree(dir.path());
    for v in 0..100i64 {
        t.put(Some(Key::single(KeyItem::Integer(v))), Rid::new(0, v))
            .unwrap();
    }
    t.put(None, Rid::new(0, 1)).unwrap();
    assert_eq!(t.size().unwrap(), 100);

    t.clear().unwrap();
    assert_eq!(t.size().unwrap(), 0);
    assert_eq!(t.first_key().unwrap(), None);
    assert_eq!(t.get(None).unwrap(), Vec::<Rid>::new());
}
