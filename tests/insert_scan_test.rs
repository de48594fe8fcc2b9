use ridtree::{Config, FieldType, Key, KeyItem, Rid, Tree};
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
fn ascending_insert_and_range_scan() {
    let dir = tempdir().unwrap();
    let t = int_tree(dir.path());

    for v in [10i64, 20, 30, 40, 50] {
        t.put(Some(Key::single(KeyItem::Integer(v))), Rid::new(0, v))
            .unwrap();
    }

    assert_eq!(t.size().unwrap(), 5);
    assert_eq!(t.first_key().unwrap(), Some(Key::single(KeyItem::Integer(10))));
    assert_eq!(t.last_key().unwrap(), Some(Key::single(KeyItem::Integer(50))));

    let mut cursor = t
        .iterate_entries_between(
            Some(Key::single(KeyItem::Integer(10))),
            true,
            Some(Key::single(KeyItem::Integer(40))),
            false,
            true,
        )
        .unwrap();
    let mut got = Vec::new();
    while let Some(item) = cursor.next().unwrap() {
        got.push(item);
    }
    assert_eq!(
        got,
        vec![
            (Key::single(KeyItem::Integer(10)), Rid::new(0, 10)),
            (Key::single(KeyItem::Integer(20)), Rid::new(0, 20)),
            (Key::single(KeyItem::Integer(30)), Rid::new(0, 30)),
        ]
    );
}

#[test]
fn large_insert_forces_splits_and_preserves_order() {
    let dir = tempdir().unwrap();
    let t = int_tree(dir.path());

    for v in 0..10_000i64 {
        t.put(Some(Key::single(KeyItem::Integer(v))), Rid::new(0, v))
            .unwrap();
    }
    assert_eq!(t.size().unwrap(), 10_000);
    assert_eq!(
        t.last_key().unwrap(),
        Some(Key::single(KeyItem::Integer(9_999)))
    );

    let mut cursor = t
        .iterate_entries_between(None, true, None, true, false)
        .unwrap();
    let mut expect = 9_999i64;
    while let Some((key, rid)) = cursor.next().unwrap() {
        assert_eq!(key, Key::single(KeyItem::Integer(expect)));
        assert_eq!(rid, Rid::new(0, expect));
        expect -= 1;
    }
    assert_eq!(expect, -1);
}

#[test]
fn reopening_a_tree_preserves_its_contents() {
    let dir = tempdir().unwrap();
    let main = dir.path().join("main.db");
    {
        let t = Tree::create(&main, None, vec![FieldType::Integer], None, Config::default())
            .unwrap();
        for v in 0..500i64 {
            t.put(Some(Key::single(KeyItem::Integer(v))), Rid::new(0, v))
                .unwrap();
        }
        t.close().unwrap();
    }
    let t = Tree::load(&main, None, vec![FieldType::Integer], None, Config::default()).unwrap();
    assert_eq!(t.size().unwrap(), 500);
    assert_eq!(t.get(Some(Key::single(KeyItem::Integer(250)))).unwrap(), vec![Rid::new(0, 250)]);
}
