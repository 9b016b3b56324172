//   Copyright (c) 2024-2026 Anton Kundenko <singaraiona@gmail.com>
//   All rights reserved.
//
//   Permission is hereby granted, free of charge, to any person obtaining a copy
//   of this software and associated documentation files (the "Software"), to deal
//   in the Software without restriction, including without limitation the rights
//   to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
//   copies of the Software, and to permit persons to whom the Software is
//   furnished to do so, subject to the following conditions:
//
//   The above copyright notice and this permission notice shall be included in all
//   copies or substantial portions of the Software.
//
//   THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
//   IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
//   FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
//   AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
//   LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
//   OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
//   SOFTWARE.

//! Exercises the write-serialization controller directly against the
//! single-writer and transaction-affinity properties, without a network
//! round trip.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;

use sqlited::db::{StmtKind, WriteController};

#[test]
fn single_writer_serializes_concurrent_writes() {
    let controller = Arc::new(WriteController::new());
    let active = Arc::new(AtomicI32::new(0));
    let max_observed = Arc::new(AtomicI32::new(0));
    let barrier = Arc::new(Barrier::new(4));

    let mut handles = Vec::new();
    for client in 0..4 {
        let controller = Arc::clone(&controller);
        let active = Arc::clone(&active);
        let max_observed = Arc::clone(&max_observed);
        let barrier = Arc::clone(&barrier);
        handles.push(std::thread::spawn(move || {
            barrier.wait();
            controller.execute(client, StmtKind::Write, || {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_observed.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(20));
                active.fetch_sub(1, Ordering::SeqCst);
            });
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(max_observed.load(Ordering::SeqCst), 1);
    assert_eq!(controller.current_holder(), None);
}

#[test]
fn transaction_affinity_blocks_other_clients_until_commit() {
    let controller = Arc::new(WriteController::new());
    const CLIENT_A: i32 = 1;
    const CLIENT_B: i32 = 2;

    controller.execute(CLIENT_A, StmtKind::Begin, || {});
    assert_eq!(controller.current_holder(), Some(CLIENT_A));

    let order = Arc::new(std::sync::Mutex::new(Vec::new()));
    let controller_b = Arc::clone(&controller);
    let order_b = Arc::clone(&order);
    let b_thread = std::thread::spawn(move || {
        controller_b.execute(CLIENT_B, StmtKind::Write, || {
            order_b.lock().unwrap().push(CLIENT_B);
        });
    });

    // Give B a chance to reach the wait before A commits; B must not have
    // executed yet.
    std::thread::sleep(Duration::from_millis(50));
    assert!(order.lock().unwrap().is_empty());

    order.lock().unwrap().push(CLIENT_A);
    controller.execute(CLIENT_A, StmtKind::Commit, || {});
    assert_eq!(controller.current_holder(), None);

    b_thread.join().unwrap();
    assert_eq!(*order.lock().unwrap(), vec![CLIENT_A, CLIENT_B]);
}

#[test]
fn readonly_statements_never_wait_on_the_holder() {
    let controller = WriteController::new();
    controller.execute(1, StmtKind::Begin, || {});
    assert_eq!(controller.current_holder(), Some(1));

    // A readonly statement from a different client must run immediately,
    // never touching the holder slot.
    let ran = controller.execute(2, StmtKind::Readonly, || true);
    assert!(ran);
    assert_eq!(controller.current_holder(), Some(1));

    controller.execute(1, StmtKind::Rollback, || {});
    assert_eq!(controller.current_holder(), None);
}

#[test]
fn release_if_holder_frees_the_slot_on_disconnect() {
    let controller = WriteController::new();
    controller.execute(7, StmtKind::Begin, || {});
    assert_eq!(controller.current_holder(), Some(7));

    // A different client's disconnect must not clear someone else's slot.
    controller.release_if_holder(8);
    assert_eq!(controller.current_holder(), Some(7));

    controller.release_if_holder(7);
    assert_eq!(controller.current_holder(), None);
}

#[test]
fn classify_recognizes_transaction_keywords_case_insensitively() {
    assert_eq!(StmtKind::classify("begin", false), StmtKind::Begin);
    assert_eq!(StmtKind::classify("BEGIN TRANSACTION", false), StmtKind::Begin);
    assert_eq!(StmtKind::classify("Commit", false), StmtKind::Commit);
    assert_eq!(StmtKind::classify("end", false), StmtKind::Commit);
    assert_eq!(StmtKind::classify("rollback", false), StmtKind::Rollback);
    assert_eq!(StmtKind::classify("SELECT 1", true), StmtKind::Readonly);
    assert_eq!(StmtKind::classify("INSERT INTO t VALUES (1)", false), StmtKind::Write);
}
