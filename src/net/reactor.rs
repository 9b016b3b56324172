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

//! Edge-triggered readiness reactor. Registrations are keyed by raw file
//! descriptor; on each wake, ready fds are dispatched to their registered
//! callback. Error/hangup conditions deregister the fd and drop its
//! callback, but do not close it — the fd's owner (the client registry)
//! is responsible for that. Single-threaded: callbacks MUST be non-blocking.

use std::collections::HashMap;
use std::os::unix::io::RawFd;

use mio::unix::SourceFd;
use mio::{Events, Interest, Poll, Token};

use crate::error::{Error, Result};

const MAX_EVENTS: usize = 64;

pub type Callback<'a> = Box<dyn FnMut(RawFd) + Send + 'a>;

pub struct Reactor {
    poll: Poll,
    events: Events,
    callbacks: HashMap<RawFd, Callback<'static>>,
}

impl Reactor {
    pub fn new() -> Result<Self> {
        let poll = Poll::new().map_err(|e| Error::Reactor(e.to_string()))?;
        Ok(Reactor {
            poll,
            events: Events::with_capacity(MAX_EVENTS),
            callbacks: HashMap::new(),
        })
    }

    /// Registers `fd` for edge-triggered read-readiness, storing `callback`
    /// to run whenever the fd wakes.
    pub fn add(&mut self, fd: RawFd, callback: Callback<'static>) -> Result<()> {
        self.poll
            .registry()
            .register(&mut SourceFd(&fd), Token(fd as usize), Interest::READABLE)
            .map_err(|e| Error::Reactor(e.to_string()))?;
        self.callbacks.insert(fd, callback);
        Ok(())
    }

    /// Deregisters `fd`. A no-op (other than removing the callback) if the
    /// fd was already dropped by the OS-level registry, matching the
    /// original's "could have been dropped before being added" tolerance.
    pub fn remove(&mut self, fd: RawFd) {
        let _ = self.poll.registry().deregister(&mut SourceFd(&fd));
        self.callbacks.remove(&fd);
    }

    /// Blocks until at least one registered fd is ready. Readable fds are
    /// drained through their callback first, even if also reported
    /// read-closed, so bytes sent alongside a half-close are never lost.
    /// Returns fds that reported error, or hangup with nothing readable;
    /// the reactor deregisters them itself, but closing the underlying
    /// socket is the caller's responsibility (the fd is owned by the
    /// client registry, not by the reactor).
    pub fn wait(&mut self) -> Result<Vec<RawFd>> {
        self.poll
            .poll(&mut self.events, None)
            .map_err(|e| Error::Reactor(e.to_string()))?;

        let mut dead = Vec::new();
        for event in self.events.iter() {
            let fd = event.token().0 as RawFd;
            // A peer that sends a request then half-closes (shutdown(SHUT_WR))
            // delivers readable and read-closed on the same event; drain it
            // through the callback before deciding the fd is dead, or the
            // coalesced request bytes are lost with no reply ever sent. Only
            // error, or hangup with nothing left to read, mark it dead here.
            if event.is_readable() {
                if let Some(callback) = self.callbacks.get_mut(&fd) {
                    callback(fd);
                }
            }
            if event.is_error() || (event.is_read_closed() && !event.is_readable()) {
                dead.push(fd);
            }
        }
        for &fd in &dead {
            self.remove(fd);
        }
        Ok(dead)
    }
}
