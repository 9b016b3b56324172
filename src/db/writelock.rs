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

//! Server-wide single-writer discipline: at most one non-readonly statement
//! runs at a time, and once a client opens a transaction with `BEGIN`, only
//! that client may run non-readonly statements until it issues `COMMIT` or
//! `ROLLBACK`.

use std::sync::{Condvar, Mutex, MutexGuard};

use crate::net::ClientId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StmtKind {
    Readonly,
    Begin,
    Commit,
    Rollback,
    Write,
}

impl StmtKind {
    /// Classifies a prepared statement by its SQL text and the engine's own
    /// read-only determination. Transaction keywords are matched
    /// case-insensitively against the leading keyword, same as the
    /// original's dedicated `is_begin`/`is_commit`/`is_rollback` checks.
    pub fn classify(sql: &str, engine_readonly: bool) -> Self {
        let leading = sql.trim_start().split_whitespace().next().unwrap_or("");
        match leading.to_ascii_uppercase().as_str() {
            "BEGIN" => StmtKind::Begin,
            "COMMIT" | "END" => StmtKind::Commit,
            "ROLLBACK" => StmtKind::Rollback,
            _ if engine_readonly => StmtKind::Readonly,
            _ => StmtKind::Write,
        }
    }
}

#[derive(Default)]
pub struct WriteController {
    holder: Mutex<Option<ClientId>>,
    released: Condvar,
}

impl WriteController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` under the write-serialization discipline appropriate to
    /// `kind`. The mutex is held for the full duration of `f`, matching the
    /// original: at most one non-readonly statement executes at a time,
    /// server-wide, regardless of which client holds the transaction slot.
    pub fn execute<T>(&self, client: ClientId, kind: StmtKind, f: impl FnOnce() -> T) -> T {
        match kind {
            StmtKind::Readonly => f(),
            StmtKind::Begin => {
                let mut holder = self.wait_while(|h| h.is_some());
                *holder = Some(client);
                let result = f();
                drop(holder);
                self.released.notify_all();
                result
            }
            StmtKind::Commit | StmtKind::Rollback => {
                // A commit/rollback issued without a preceding BEGIN (holder
                // is none, or held by someone else) is valid wire input: the
                // engine runs it and reports "no transaction is active" as
                // an ordinary INVALID_QUERY. Only wait for ownership when
                // this client actually holds the slot; otherwise behave like
                // a plain write and never block on an owner that will never
                // claim this statement.
                let mut holder = self.wait_while(|h| h.is_some() && *h != Some(client));
                let result = f();
                *holder = None;
                drop(holder);
                self.released.notify_all();
                result
            }
            StmtKind::Write => {
                let holder = self.wait_while(|h| !(h.is_none() || *h == Some(client)));
                let result = f();
                drop(holder);
                self.released.notify_all();
                result
            }
        }
    }

    fn wait_while(&self, mut predicate: impl FnMut(&Option<ClientId>) -> bool) -> MutexGuard<'_, Option<ClientId>> {
        let mut holder = self.holder.lock().unwrap();
        while predicate(&holder) {
            holder = self.released.wait(holder).unwrap();
        }
        holder
    }

    /// Clears the slot if `client` currently holds it, e.g. because its
    /// session was destroyed mid-transaction. No-op otherwise.
    pub fn release_if_holder(&self, client: ClientId) {
        let mut holder = self.holder.lock().unwrap();
        if *holder == Some(client) {
            *holder = None;
            drop(holder);
            self.released.notify_all();
        }
    }

    /// The client currently holding the write slot, if any. Exposed for
    /// tests and diagnostics; not used by the dispatch path itself.
    pub fn current_holder(&self) -> Option<ClientId> {
        *self.holder.lock().unwrap()
    }
}
