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

//! A per-connection socket split into a non-blocking read half (driven by
//! the reactor) and a blocking write half (driven by the response writer),
//! so reads and writes never contend on a shared lock.

use std::io::{self, Read, Write};
use std::net::TcpStream as StdTcpStream;
use std::os::unix::io::{AsRawFd, FromRawFd, RawFd};

use mio::net::TcpStream as MioTcpStream;
use socket2::Socket;

use crate::error::{Error, Result};

const RECV_CHUNK: usize = 512;

pub struct ClientSocket {
    read: MioTcpStream,
    write: StdTcpStream,
}

impl ClientSocket {
    pub fn from_accepted(stream: MioTcpStream) -> Result<Self> {
        let write = clone_blocking(stream.as_raw_fd())?;
        Ok(ClientSocket {
            read: stream,
            write,
        })
    }

    pub fn fd(&self) -> RawFd {
        self.read.as_raw_fd()
    }

    /// Drains the socket in 512-byte reads until it would block, appending
    /// everything read. A zero-byte read means the remote half-closed the
    /// connection. Must be called to exhaustion on every reactor wake or
    /// the edge-triggered notification will not fire again.
    pub fn recv(&mut self) -> Result<Vec<u8>> {
        let mut into = Vec::new();
        let mut buf = [0u8; RECV_CHUNK];
        loop {
            match self.read.read(&mut buf) {
                Ok(0) => return Err(Error::ConnectionClosed),
                Ok(n) => into.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Socket(e)),
            }
        }
        Ok(into)
    }

    /// Writes the full buffer, looping over partial writes.
    pub fn send(&mut self, data: &[u8]) -> Result<()> {
        let mut sent = 0;
        while sent < data.len() {
            match self.write.write(&data[sent..]) {
                Ok(0) => return Err(Error::Socket(io::Error::from(io::ErrorKind::WriteZero))),
                Ok(n) => sent += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Socket(e)),
            }
        }
        Ok(())
    }
}

/// Duplicates `fd` into an independent, blocking `std::net::TcpStream`
/// without taking ownership of the original fd (the `mio::net::TcpStream`
/// that owns it keeps running the reactor side).
fn clone_blocking(fd: RawFd) -> Result<StdTcpStream> {
    let borrowed = unsafe { Socket::from_raw_fd(fd) };
    let cloned = borrowed.try_clone().map_err(Error::Socket);
    std::mem::forget(borrowed);
    let cloned = cloned?;
    cloned.set_nonblocking(false).map_err(Error::Socket)?;
    Ok(cloned.into())
}
