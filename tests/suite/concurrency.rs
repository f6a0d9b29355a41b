//! Concurrent cancellation tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use scopetree_core::{
    CancelScope, Scope, ScopeError, background, cause, with_cancel, with_cancel_cause,
};

use crate::common::{WAIT, reason};

#[test]
fn concurrent_cancel_records_exactly_one_cause() {
    const CALLERS: usize = 16;

    let (scope, cancel) = with_cancel_cause(background());
    let done = scope.done().expect("signal");
    let causes: Vec<ScopeError> = (0..CALLERS).map(|_| reason("racer")).collect();
    let barrier = Barrier::new(CALLERS);
    let woken = AtomicUsize::new(0);

    thread::scope(|s| {
        s.spawn(|| {
            if done.wait_timeout(WAIT) {
                woken.fetch_add(1, Ordering::SeqCst);
            }
        });
        for why in &causes {
            let cancel = cancel.clone();
            let barrier = &barrier;
            s.spawn(move || {
                barrier.wait();
                cancel.cancel(why.clone());
            });
        }
    });

    let recorded = cause(&*scope).expect("cause recorded");
    assert_eq!(causes.iter().filter(|c| c.ptr_eq(&recorded)).count(), 1);
    assert!(scope.err().is_some_and(|e| e.is_canceled()));
    assert!(done.is_fired());
    assert_eq!(woken.load(Ordering::SeqCst), 1);
}

#[test]
fn derive_races_with_parent_cancel() {
    for _ in 0..64 {
        let (parent, cancel) = with_cancel(background());
        let barrier = Barrier::new(2);

        let children: Vec<Arc<CancelScope>> = thread::scope(|s| {
            let deriver = s.spawn(|| {
                barrier.wait();
                (0..32)
                    .map(|_| with_cancel(parent.clone()).0)
                    .collect::<Vec<_>>()
            });
            barrier.wait();
            cancel.cancel();
            deriver.join().expect("deriver panicked")
        });

        for child in children {
            assert!(
                child.err().is_some(),
                "child derived around a parent cancel must end up canceled"
            );
        }
    }
}

#[test]
fn tree_cancel_and_leaf_cancel_race_without_deadlock() {
    for _ in 0..32 {
        let (root, cancel_root) = with_cancel(background());
        let mut leaves = Vec::new();
        for _ in 0..8 {
            let (mid, _) = with_cancel(root.clone());
            for _ in 0..4 {
                leaves.push(with_cancel(mid.clone()));
            }
        }

        thread::scope(|s| {
            for (_, cancel_leaf) in &leaves {
                s.spawn(move || cancel_leaf.cancel());
            }
            s.spawn(|| cancel_root.cancel());
        });

        assert!(root.err().is_some());
        for (leaf, _) in &leaves {
            assert!(leaf.err().is_some());
        }
    }
}
