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

//! The client socket registry: a single mutex-guarded map from client
//! identifier to its socket, shared between the reactor thread (insert,
//! lookup-for-read) and the response writer (lookup-for-write, erase).

use std::collections::HashMap;
use std::sync::Mutex;

use crate::net::{ClientId, ClientSocket};

#[derive(Default)]
pub struct ClientRegistry {
    clients: Mutex<HashMap<ClientId, ClientSocket>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: ClientId, socket: ClientSocket) {
        self.clients.lock().unwrap().insert(id, socket);
    }

    pub fn remove(&self, id: ClientId) -> Option<ClientSocket> {
        self.clients.lock().unwrap().remove(&id)
    }

    pub fn contains(&self, id: ClientId) -> bool {
        self.clients.lock().unwrap().contains_key(&id)
    }

    /// Looks up and reads from the client's socket while holding the
    /// registry lock. The read itself never blocks the OS thread (the
    /// underlying stream is non-blocking and `recv` stops at `WouldBlock`),
    /// so this only contends with other clients' registry operations for
    /// as long as one edge-triggered read burst takes.
    pub fn recv(&self, id: ClientId) -> Option<crate::error::Result<Vec<u8>>> {
        let mut guard = self.clients.lock().unwrap();
        let socket = guard.get_mut(&id)?;
        Some(socket.recv())
    }

    pub fn send(&self, id: ClientId, data: &[u8]) -> Option<crate::error::Result<()>> {
        let mut guard = self.clients.lock().unwrap();
        let socket = guard.get_mut(&id)?;
        Some(socket.send(data))
    }
}
