//! Mirrors the teacher's own concurrency integration test: a writer thread
//! and reader threads hammer the same tree at once, coordinated over a
//! crossbeam channel, to exercise the single-writer/many-readers lock.

use std::sync::Arc;
use std::thread;

use ridtree::{Config, FieldType, Key, KeyItem, Rid, Tree};
use tempfile::tempdir;

#[test]
fn concurrent_readers_observe_a_consistent_tree_while_a_writer_inserts() {
    let dir = tempdir().unwrap();
    let t = Arc::new(
        Tree::create(
            dir.path().join("main.db"),
            None,
            vec![FieldType::Integer],
            None,
            Config::default(),
        )
        .unwrap(),
    );

    const COUNT: i64 = 2_000;
    let (done_tx, done_rx) = crossbeam::channel::bounded::<()>(1);

    let writer = {
        let t = Arc::clone(&t);
        thread::spawn(move || {
            for v in 0..COUNT {
                t.put(Some(Key::single(KeyItem::Integer(v))), Rid::new(0, v))
                    .unwrap();
            }
            done_tx.send(()).unwrap();
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let t = Arc::clone(&t);
            let done_rx = done_rx.clone();
            thread::spawn(move || {
                while done_rx.try_recv().is_err() {
                    let size = t.size().unwrap();
                    assert!(size <= COUNT as u64);
                    if let Some(first) = t.first_key().unwrap() {
                        assert_eq!(first, Key::single(KeyItem::Integer(0)));
                    }
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for r in readers {
        r.join().unwrap();
    }

    assert_eq!(t.size().unwrap(), COUNT as u64);
    assert_eq!(
        t.last_key().unwrap(),
        Some(Key::single(KeyItem::Integer(COUNT - 1)))
    );
}
