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

//! The passive listening socket: bind, enable reuse, go non-blocking, listen
//! with the OS-maximum backlog.

use std::net::SocketAddr;
use std::os::unix::io::{AsRawFd, RawFd};

use mio::net::TcpListener as MioTcpListener;
use socket2::{Domain, Socket, Type};

use crate::error::{Error, Result};

pub struct ServerSocket {
    listener: MioTcpListener,
}

impl ServerSocket {
    /// Resolves a passive, family-agnostic endpoint on `port`, reusable and
    /// non-blocking, then listens with the OS maximum backlog.
    pub fn bind(port: u16) -> Result<Self> {
        let addr: SocketAddr = format!("[::]:{port}").parse().expect("valid IPv6 address");

        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, None)
            .map_err(Error::Socket)?;
        socket.set_reuse_address(true).map_err(Error::Socket)?;
        socket.set_nonblocking(true).map_err(Error::Socket)?;
        socket.bind(&addr.into()).map_err(Error::Socket)?;
        socket.listen(libc_somaxconn()).map_err(Error::Socket)?;

        let listener = MioTcpListener::from_std(socket.into());
        Ok(ServerSocket { listener })
    }

    pub fn mio_listener(&mut self) -> &mut MioTcpListener {
        &mut self.listener
    }

    pub fn fd(&self) -> RawFd {
        self.listener.as_raw_fd()
    }
}

/// A generous stand-in for `SOMAXCONN`, which isn't exposed as a portable
/// constant outside of raw libc bindings; 1024 is the Linux default and
/// plenty for this service's expected connection counts.
fn libc_somaxconn() -> i32 {
    1024
}
