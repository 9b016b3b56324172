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

//! Typed request/reply values and their MessagePack codec.

use std::collections::HashMap;
use std::io::Cursor;

use rmpv::Value as Wire;

use crate::error::{Error, Result};

pub const DEFAULT_MAX_RETRY: i64 = 100;
pub const DEFAULT_SLEEP_MS: i64 = 100;

/// Engine-configuration keys a `connect` request is allowed to set via
/// `PRAGMA`. Anything outside this list is silently ignored.
pub const PRAGMA_ALLOW_LIST: &[&str] = &["journal_mode", "foreign_keys"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Execute = 1,
    ExecuteAndFetch = 2,
}

impl Operation {
    fn from_i64(n: i64) -> Result<Self> {
        match n {
            1 => Ok(Operation::Execute),
            2 => Ok(Operation::ExecuteAndFetch),
            other => Err(Error::InvalidRequest(format!(
                "unknown operation: {other}"
            ))),
        }
    }
}

/// Positional or named bind parameters, held as the raw wire values; the
/// statement executor resolves them against the prepared statement.
#[derive(Debug, Clone)]
pub enum Params {
    Positional(Vec<Wire>),
    Named(HashMap<String, Wire>),
}

#[derive(Debug, Clone)]
pub struct ConnectRequest {
    pub database: String,
    pub max_retry: Option<String>,
    pub sleep_ms: Option<String>,
    pub pragmas: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct DropRequest {
    pub database: String,
}

#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub database: String,
    pub query: String,
    pub operation: Operation,
    pub parameters: Params,
}

#[derive(Debug, Clone)]
pub enum Endpoint {
    Connect(ConnectRequest),
    Drop(DropRequest),
    Query(QueryRequest),
}

pub struct Request;

impl Request {
    /// Decodes one top-level map out of a byte slice produced by one
    /// reactor drain. Fails with `Error::Deserialize` on anything that
    /// isn't a well-formed map, and with `Error::InvalidRequest` when the
    /// map is well-formed MessagePack but doesn't name a recognized
    /// endpoint or is missing a required field.
    pub fn decode(bytes: &[u8]) -> Result<Endpoint> {
        let mut cursor = Cursor::new(bytes);
        let value = rmpv::decode::read_value(&mut cursor)
            .map_err(|e| Error::Deserialize(e.to_string()))?;
        let map = as_map(&value).ok_or_else(|| {
            Error::Deserialize("top-level value is not a map".to_string())
        })?;

        let endpoint = string_field(map, "endpoint")
            .ok_or_else(|| Error::InvalidRequest("missing endpoint".to_string()))?;

        match endpoint {
            "connect" => Self::decode_connect(map).map(Endpoint::Connect),
            "drop" => Self::decode_drop(map).map(Endpoint::Drop),
            "query" => Self::decode_query(map).map(Endpoint::Query),
            other => Err(Error::InvalidRequest(format!(
                "unrecognized endpoint: {other}"
            ))),
        }
    }

    fn decode_connect(map: &[(Wire, Wire)]) -> Result<ConnectRequest> {
        let database = required_string(map, "database")?;
        let max_retry = string_field(map, "max_retry").map(str::to_owned);
        let sleep_ms = string_field(map, "sleep_ms").map(str::to_owned);
        let mut pragmas = Vec::new();
        for key in PRAGMA_ALLOW_LIST {
            if let Some(value) = string_field(map, key) {
                pragmas.push(((*key).to_owned(), value.to_owned()));
            }
        }
        Ok(ConnectRequest {
            database,
            max_retry,
            sleep_ms,
            pragmas,
        })
    }

    fn decode_drop(map: &[(Wire, Wire)]) -> Result<DropRequest> {
        Ok(DropRequest {
            database: required_string(map, "database")?,
        })
    }

    fn decode_query(map: &[(Wire, Wire)]) -> Result<QueryRequest> {
        let database = required_string(map, "database")?;
        let query = required_string(map, "query")?;
        let operation = map
            .iter()
            .find(|(k, _)| matches_key(k, "operation"))
            .and_then(|(_, v)| v.as_i64())
            .ok_or_else(|| Error::InvalidRequest("missing operation".to_string()))?;
        let operation = Operation::from_i64(operation)?;
        let parameters = map
            .iter()
            .find(|(k, _)| matches_key(k, "parameters"))
            .map(|(_, v)| decode_params(v))
            .transpose()?
            .unwrap_or_else(|| Params::Positional(Vec::new()));
        Ok(QueryRequest {
            database,
            query,
            operation,
            parameters,
        })
    }
}

fn decode_params(v: &Wire) -> Result<Params> {
    match v {
        Wire::Array(items) => Ok(Params::Positional(items.clone())),
        Wire::Map(entries) => {
            let mut named = HashMap::with_capacity(entries.len());
            for (k, v) in entries {
                let key = k
                    .as_str()
                    .ok_or_else(|| Error::InvalidRequest("non-string parameter key".into()))?;
                named.insert(key.to_owned(), v.clone());
            }
            Ok(Params::Named(named))
        }
        _ => Err(Error::InvalidRequest(
            "parameters must be an array or a map".to_string(),
        )),
    }
}

fn as_map(v: &Wire) -> Option<&[(Wire, Wire)]> {
    match v {
        Wire::Map(entries) => Some(entries),
        _ => None,
    }
}

fn matches_key(key: &Wire, name: &str) -> bool {
    key.as_str() == Some(name)
}

fn string_field<'a>(map: &'a [(Wire, Wire)], name: &str) -> Option<&'a str> {
    map.iter()
        .find(|(k, _)| matches_key(k, name))
        .and_then(|(_, v)| v.as_str())
}

fn required_string(map: &[(Wire, Wire)], name: &str) -> Result<String> {
    string_field(map, name)
        .map(str::to_owned)
        .ok_or_else(|| Error::InvalidRequest(format!("missing {name}")))
}

/// Column metadata as the statement executor reports it: name plus the
/// engine's declared type, or nil if the engine declares none.
pub type ColumnMeta = (String, Option<String>);

/// The two-buffer reply: a header map followed by a data payload, per the
/// wire contract in the external interfaces section.
pub struct Reply {
    pub status: crate::error::StatusKind,
    pub message: String,
    pub details: String,
    pub columns: Option<Vec<ColumnMeta>>,
    pub rowcount: i64,
    pub rows: Vec<Vec<Wire>>,
}

impl Reply {
    pub fn ok_empty() -> Self {
        Reply {
            status: crate::error::StatusKind::Ok,
            message: crate::error::StatusKind::Ok.message().to_string(),
            details: String::new(),
            columns: None,
            rowcount: -1,
            rows: Vec::new(),
        }
    }

    pub fn error(err: &Error) -> Self {
        let status = err.status();
        Reply {
            status,
            message: status.message().to_string(),
            details: err.details(),
            columns: None,
            rowcount: -1,
            rows: Vec::new(),
        }
    }

    /// Encodes the header map then the data array, concatenated into one
    /// contiguous buffer as the wire contract requires.
    pub fn into_bytes(self) -> Vec<u8> {
        let mut buf = Vec::new();
        let header = self.header_value();
        rmpv::encode::write_value(&mut buf, &header).expect("encoding to a Vec cannot fail");
        let data = Wire::Array(
            self.rows
                .into_iter()
                .map(Wire::Array)
                .collect::<Vec<_>>(),
        );
        rmpv::encode::write_value(&mut buf, &data).expect("encoding to a Vec cannot fail");
        buf
    }

    fn header_value(&self) -> Wire {
        let columns = match &self.columns {
            None => Wire::Nil,
            Some(cols) => Wire::Array(
                cols.iter()
                    .map(|(name, decltype)| {
                        Wire::Array(vec![
                            Wire::String(name.clone().into()),
                            decltype
                                .clone()
                                .map(|d| Wire::String(d.into()))
                                .unwrap_or(Wire::Nil),
                        ])
                    })
                    .collect(),
            ),
        };
        Wire::Map(vec![
            (Wire::String("status".into()), Wire::Integer(self.status.code().into())),
            (Wire::String("message".into()), Wire::String(self.message.clone().into())),
            (Wire::String("details".into()), Wire::String(self.details.clone().into())),
            (Wire::String("columns".into()), columns),
            (Wire::String("rowcount".into()), Wire::Integer(self.rowcount.into())),
        ])
    }
}
