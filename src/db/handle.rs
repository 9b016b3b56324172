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

//! The opened database file plus its busy-handler parameters. `path` is
//! immutable for the handle's lifetime; two sessions may open handles on
//! the same path, at which point the engine's own file locking applies.

use std::sync::Mutex;
use std::time::Duration;

use rusqlite::Connection;

use crate::error::{Error, Result};

fn trace_sql(sql: &str) {
    tracing::trace!(sql, "executing SQL");
}

pub struct DatabaseHandle {
    path: String,
    conn: Mutex<Connection>,
}

impl DatabaseHandle {
    /// Opens `path`, installs the busy-handler retry budget and the trace
    /// callback. `max_retry` and `sleep_ms` are collapsed into one
    /// `busy_timeout` bound, the idiomatic rusqlite equivalent of the
    /// original's retry-count-times-sleep busy handler.
    pub fn open(path: &str, max_retry: i64, sleep_ms: i64) -> Result<Self> {
        let mut conn = Connection::open(path).map_err(|e| Error::DatabaseOpening(e.to_string()))?;
        let budget_ms = (max_retry.max(0) as u64).saturating_mul(sleep_ms.max(0) as u64);
        conn.busy_timeout(Duration::from_millis(budget_ms))
            .map_err(|e| Error::DatabaseOpening(e.to_string()))?;
        conn.trace(Some(trace_sql));
        Ok(DatabaseHandle {
            path: path.to_string(),
            conn: Mutex::new(conn),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Applies a pragma from the allow-list. Invalid values surface as
    /// `INVALID_QUERY` the same as any other engine failure.
    pub fn apply_pragma(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.pragma_update(None, key, value)
            .map_err(|e| Error::InvalidQuery(e.to_string()))
    }

    /// Runs `f` with exclusive access to the connection. Held for the full
    /// duration of a statement's prepare/bind/step so that two requests on
    /// the same session's handle never interleave on one sqlite3 handle.
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock().unwrap();
        f(&conn)
    }
}
