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

//! A small submit/join pool. Unlike a short-task thread pool, every task
//! submitted here is a long-running loop (the reactor, a request worker, the
//! response writer), so each submission gets its own dedicated OS thread
//! rather than sharing a bounded worker set.

use std::sync::Mutex;
use std::thread::{self, JoinHandle};

#[derive(Default)]
pub struct Pool {
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Pool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit(&self, name: impl Into<String>, f: impl FnOnce() + Send + 'static) {
        let handle = thread::Builder::new()
            .name(name.into())
            .spawn(f)
            .expect("failed to spawn worker thread");
        self.handles.lock().unwrap().push(handle);
    }

    pub fn join(&self) {
        let handles = std::mem::take(&mut *self.handles.lock().unwrap());
        for handle in handles {
            let _ = handle.join();
        }
    }
}
