//! Correctness under concurrent access through the tree-wide lock.

use std::sync::{Arc, Barrier};
use std::thread;

use bramble::{Storage, Tree};
use serde_json::Value;
use tempfile::TempDir;

const NUM_THREADS: usize = 8;
const KEYS_PER_THREAD: i64 = 250;

#[test]
fn concurrent_insertions_of_disjoint_ranges() {
    let tree = Arc::new(Tree::new(3).unwrap());
    let barrier = Arc::new(Barrier::new(NUM_THREADS));
    let mut handles = Vec::new();

    for thread_id in 0..NUM_THREADS {
        let tree = Arc::clone(&tree);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            let base = thread_id as i64 * KEYS_PER_THREAD;
            for offset in 0..KEYS_PER_THREAD {
                let key = base + offset;
                tree.insert(key, Value::from(key * 3));
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(tree.len(), NUM_THREADS * KEYS_PER_THREAD as usize);
    assert!(tree.validate().is_valid());
    for key in 0..(NUM_THREADS as i64 * KEYS_PER_THREAD) {
        assert_eq!(tree.search(key), Some(Value::from(key * 3)));
    }
}

#[test]
fn readers_run_alongside_writers() {
    let tree = Arc::new(Tree::new(2).unwrap());
    for key in 0..100i64 {
        tree.insert(key, Value::from(key));
    }

    let barrier = Arc::new(Barrier::new(NUM_THREADS + 1));
    let mut handles = Vec::new();

    // One writer churns the upper key range.
    {
        let tree = Arc::clone(&tree);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            for key in 100..400i64 {
                tree.insert(key, Value::from(key));
            }
            for key in 100..400i64 {
                assert!(tree.delete(key));
            }
        }));
    }

    // Readers hammer the stable lower range; every lookup must see a
    // consistent tree no matter how the writer interleaves.
    for _ in 0..NUM_THREADS {
        let tree = Arc::clone(&tree);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            for round in 0..50 {
                for key in 0..100i64 {
                    assert_eq!(tree.search(key), Some(Value::from(key)), "round {round}");
                }
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(tree.len(), 100);
    assert!(tree.validate().is_valid());
}

#[test]
fn concurrent_deletes_of_disjoint_ranges() {
    let total = NUM_THREADS as i64 * KEYS_PER_THREAD;
    let tree = Arc::new(Tree::new(4).unwrap());
    for key in 0..total {
        tree.insert(key, Value::from(key));
    }

    let barrier = Arc::new(Barrier::new(NUM_THREADS));
    let mut handles = Vec::new();
    for thread_id in 0..NUM_THREADS {
        let tree = Arc::clone(&tree);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            let base = thread_id as i64 * KEYS_PER_THREAD;
            // Every other key in this thread's range goes away.
            for offset in (0..KEYS_PER_THREAD).step_by(2) {
                assert!(tree.delete(base + offset));
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(tree.len(), total as usize / 2);
    assert!(tree.validate().is_valid());
    for key in 0..total {
        if key % 2 == 0 {
            assert_eq!(tree.search(key), None);
        } else {
            assert_eq!(tree.search(key), Some(Value::from(key)));
        }
    }
}

#[test]
fn snapshot_taken_while_readers_are_active() {
    let dir = TempDir::new().unwrap();
    let storage = Arc::new(Storage::new(dir.path().join("tree.json")));
    let tree = Arc::new(Tree::new(3).unwrap());
    for key in 0..500i64 {
        tree.insert(key, Value::from(key));
    }

    let barrier = Arc::new(Barrier::new(4));
    let mut handles = Vec::new();
    for _ in 0..3 {
        let tree = Arc::clone(&tree);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            for key in 0..500i64 {
                assert!(tree.search(key).is_some());
            }
        }));
    }
    {
        let tree = Arc::clone(&tree);
        let storage = Arc::clone(&storage);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            storage.save(&tree).unwrap();
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let restored = storage.load().unwrap();
    assert_eq!(restored.len(), 500);
    assert!(restored.validate().is_valid());
}
