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

//! Per-client session state and the registry that owns it. Invariant: at
//! most one session per client identifier.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::db::DatabaseHandle;
use crate::error::{Error, Result};
use crate::net::ClientId;

pub struct Session {
    pub database: String,
    pub handle: Arc<DatabaseHandle>,
    pub max_retry: i64,
    pub sleep_ms: i64,
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<ClientId, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, client: ClientId) -> Option<Arc<Session>> {
        self.sessions.lock().unwrap().get(&client).cloned()
    }

    /// Idempotent connect: a second `connect` to the same path from the
    /// same client succeeds without reopening; a different path fails.
    /// `open` is only invoked when a new session must be created.
    pub fn connect(
        &self,
        client: ClientId,
        database: &str,
        open: impl FnOnce() -> Result<DatabaseHandle>,
        max_retry: i64,
        sleep_ms: i64,
    ) -> Result<()> {
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(existing) = sessions.get(&client) {
            if existing.database != database {
                return Err(Error::InvalidRequest(
                    "connection from same socket to a different database".to_string(),
                ));
            }
            return Ok(());
        }
        let handle = open()?;
        sessions.insert(
            client,
            Arc::new(Session {
                database: database.to_string(),
                handle: Arc::new(handle),
                max_retry,
                sleep_ms,
            }),
        );
        Ok(())
    }

    /// Removes every session whose database path equals `database`.
    /// Returns the removed sessions so the caller can release any write
    /// slot they held.
    pub fn remove_by_path(&self, database: &str) -> Vec<(ClientId, Arc<Session>)> {
        let mut sessions = self.sessions.lock().unwrap();
        let matching: Vec<ClientId> = sessions
            .iter()
            .filter(|(_, s)| s.database == database)
            .map(|(id, _)| *id)
            .collect();
        matching
            .into_iter()
            .filter_map(|id| sessions.remove(&id).map(|s| (id, s)))
            .collect()
    }

    pub fn remove(&self, client: ClientId) -> Option<Arc<Session>> {
        self.sessions.lock().unwrap().remove(&client)
    }
}
