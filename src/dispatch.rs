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

//! Identifies the endpoint named by a decoded request, routes it to its
//! handler, and produces a framed reply. Errors from any handler are
//! mapped to a status kind and turned into a sentinel-filled reply here,
//! so individual handlers never have to think about wire framing.

use std::sync::Arc;

use crate::db::{statement, DatabaseHandle, WriteController};
use crate::error::{Error, Result};
use crate::net::ClientId;
use crate::session::SessionRegistry;
use crate::wire::message::{ConnectRequest, DropRequest, QueryRequest};
use crate::wire::{value, Endpoint, Reply, Request};

pub struct Dispatcher {
    sessions: SessionRegistry,
    write_controller: Arc<WriteController>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Dispatcher {
            sessions: SessionRegistry::new(),
            write_controller: Arc::new(WriteController::new()),
        }
    }

    /// Decodes `bytes` and produces the complete wire reply (header bytes
    /// followed by data bytes). Never panics on malformed input: decode
    /// failures become a `DESERIALIZATION_ERROR` reply like any other.
    pub fn handle(&self, client: ClientId, bytes: &[u8]) -> Vec<u8> {
        let reply = match Request::decode(bytes) {
            Ok(endpoint) => self.route(client, endpoint),
            Err(e) => Reply::error(&e),
        };
        reply.into_bytes()
    }

    /// Called when a client's socket is dropped: releases the write slot if
    /// the client's session held it, same as an explicit `drop`.
    pub fn on_disconnect(&self, client: ClientId) {
        self.sessions.remove(client);
        self.write_controller.release_if_holder(client);
    }

    fn route(&self, client: ClientId, endpoint: Endpoint) -> Reply {
        let name = match &endpoint {
            Endpoint::Connect(_) => "connect",
            Endpoint::Drop(_) => "drop",
            Endpoint::Query(_) => "query",
        };
        tracing::debug!(client, endpoint = name, "dispatching request");

        let result = match endpoint {
            Endpoint::Connect(req) => self.handle_connect(client, req),
            Endpoint::Drop(req) => self.handle_drop(req),
            Endpoint::Query(req) => self.handle_query(client, req),
        };
        match result {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(client, endpoint = name, details = %e.details(), "request failed");
                Reply::error(&e)
            }
        }
    }

    fn handle_connect(&self, client: ClientId, req: ConnectRequest) -> Result<Reply> {
        let max_retry = value::parse_decimal_or(
            req.max_retry.as_deref(),
            crate::wire::message::DEFAULT_MAX_RETRY,
        );
        let sleep_ms = value::parse_decimal_or(
            req.sleep_ms.as_deref(),
            crate::wire::message::DEFAULT_SLEEP_MS,
        );
        let database = req.database.clone();
        let pragmas = req.pragmas.clone();

        self.sessions.connect(
            client,
            &database,
            || {
                let handle = DatabaseHandle::open(&database, max_retry, sleep_ms)?;
                for (key, value) in &pragmas {
                    handle.apply_pragma(key, value)?;
                }
                Ok(handle)
            },
            max_retry,
            sleep_ms,
        )?;
        tracing::info!(client, database = req.database.as_str(), "connected");
        Ok(Reply::ok_empty())
    }

    fn handle_drop(&self, req: DropRequest) -> Result<Reply> {
        let removed = self.sessions.remove_by_path(&req.database);
        for (client, _) in removed {
            self.write_controller.release_if_holder(client);
        }
        // Always OK: a missing file is not a failure.
        let _ = std::fs::remove_file(&req.database);
        tracing::info!(database = req.database.as_str(), "dropped");
        Ok(Reply::ok_empty())
    }

    fn handle_query(&self, client: ClientId, req: QueryRequest) -> Result<Reply> {
        let session = self
            .sessions
            .get(client)
            .ok_or_else(|| Error::InvalidRequest("no session for client".to_string()))?;

        let write_controller = Arc::clone(&self.write_controller);
        let handle = Arc::clone(&session.handle);
        let exec = handle.with_connection(|conn| {
            let (mut stmt, kind) = statement::prepare_and_classify(conn, &req.query)?;
            tracing::debug!(client, endpoint = "query", ?kind, "dispatching query");
            write_controller.execute(client, kind, || statement::run(conn, &mut stmt, &req))
        })?;

        Ok(Reply {
            status: crate::error::StatusKind::Ok,
            message: crate::error::StatusKind::Ok.message().to_string(),
            details: String::new(),
            columns: exec.columns,
            rowcount: exec.rowcount,
            rows: exec.rows,
        })
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
