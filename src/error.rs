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

//! Error taxonomy and the status codes it collapses to on the wire.

use std::fmt;

/// The six status kinds visible to a client, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Ok = 0,
    UnknownError = 1,
    InvalidRequest = 2,
    DeserializationError = 3,
    DatabaseOpeningError = 4,
    DatabaseNotFound = 5,
    InvalidQuery = 6,
}

impl StatusKind {
    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn message(self) -> &'static str {
        match self {
            StatusKind::Ok => "OK",
            StatusKind::UnknownError => "Unknown error",
            StatusKind::InvalidRequest => "Invalid request",
            StatusKind::DeserializationError => "Deserialization failed",
            StatusKind::DatabaseOpeningError => "Database opening failed",
            StatusKind::DatabaseNotFound => "Database not found",
            StatusKind::InvalidQuery => "Invalid query",
        }
    }
}

/// Internal error type. Never sent to a client directly: the dispatcher
/// maps each variant to a [`StatusKind`] and copies `details()` into the
/// reply header's `details` field.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("deserialization failed: {0}")]
    Deserialize(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("database not found: {0}")]
    DatabaseNotFound(String),

    #[error("failed to open database: {0}")]
    DatabaseOpening(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("socket error: {0}")]
    Socket(#[from] std::io::Error),

    #[error("reactor error: {0}")]
    Reactor(String),

    #[error("remote has closed the connection")]
    ConnectionClosed,
}

impl Error {
    pub fn status(&self) -> StatusKind {
        match self {
            Error::Deserialize(_) => StatusKind::DeserializationError,
            Error::InvalidRequest(_) => StatusKind::InvalidRequest,
            Error::DatabaseNotFound(_) => StatusKind::DatabaseNotFound,
            Error::DatabaseOpening(_) => StatusKind::DatabaseOpeningError,
            Error::Sqlite(_) | Error::InvalidQuery(_) => StatusKind::InvalidQuery,
            Error::Socket(_) | Error::Reactor(_) | Error::ConnectionClosed => {
                StatusKind::UnknownError
            }
        }
    }

    /// Engine-provided detail string, copied verbatim into the reply's
    /// `details` field. Empty for kinds with nothing further to say.
    pub fn details(&self) -> String {
        match self {
            Error::Sqlite(e) => e.to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
