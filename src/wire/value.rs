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

//! Value-kind conversions between the MessagePack value tree (`rmpv::Value`)
//! and the five kinds the embedded engine understands
//! (`rusqlite::types::Value`).

use rmpv::Value as Wire;
use rusqlite::types::{Value as SqlValue, ValueRef};

use crate::error::{Error, Result};

/// Converts an incoming parameter value into an engine bind value.
/// Mirrors the `bind_param` switch in the statement executor: nested
/// arrays/maps are not bindable parameter values.
pub fn to_sql_value(v: &Wire) -> Result<SqlValue> {
    match v {
        Wire::Nil => Ok(SqlValue::Null),
        Wire::Boolean(b) => Ok(SqlValue::Integer(if *b { 1 } else { 0 })),
        Wire::Integer(n) => {
            if let Some(i) = n.as_i64() {
                Ok(SqlValue::Integer(i))
            } else if let Some(u) = n.as_u64() {
                Ok(SqlValue::Integer(u as i64))
            } else {
                Err(Error::InvalidQuery("integer out of range".into()))
            }
        }
        Wire::F32(f) => Ok(SqlValue::Real(*f as f64)),
        Wire::F64(f) => Ok(SqlValue::Real(*f)),
        Wire::String(s) => {
            let text = s
                .as_str()
                .ok_or_else(|| Error::InvalidQuery("invalid UTF-8 string parameter".into()))?;
            Ok(SqlValue::Text(text.to_owned()))
        }
        Wire::Binary(bytes) => Ok(SqlValue::Blob(bytes.clone())),
        Wire::Ext(_, bytes) => Ok(SqlValue::Blob(bytes.clone())),
        Wire::Array(_) | Wire::Map(_) => {
            Err(Error::InvalidQuery("parameter binding failed".into()))
        }
    }
}

/// Converts a fetched column value back into a wire value. Text is decoded
/// lossily-never: SQLite text columns are valid UTF-8 by construction here.
pub fn from_column_value(v: ValueRef<'_>) -> Wire {
    match v {
        ValueRef::Null => Wire::Nil,
        ValueRef::Integer(i) => Wire::Integer(i.into()),
        ValueRef::Real(f) => Wire::F64(f),
        ValueRef::Text(bytes) => {
            Wire::String(String::from_utf8_lossy(bytes).into_owned().into())
        }
        ValueRef::Blob(bytes) => Wire::Binary(bytes.to_vec()),
    }
}

/// Parses a decimal string field into a positive integer, falling back to
/// `default` on anything that doesn't parse (per `connect`'s
/// `max_retry`/`sleep_ms` coercion rule).
pub fn parse_decimal_or(value: Option<&str>, default: i64) -> i64 {
    value
        .and_then(|s| s.parse::<i64>().ok())
        .filter(|n| *n >= 0)
        .unwrap_or(default)
}
