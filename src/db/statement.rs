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

//! Prepare, bind, step, and stream rows for one `query` request.

use rusqlite::{Connection, Statement};

use crate::db::writelock::StmtKind;
use crate::error::{Error, Result};
use crate::wire::message::{ColumnMeta, Operation, Params, QueryRequest};
use crate::wire::value;

pub struct ExecutionResult {
    pub columns: Option<Vec<ColumnMeta>>,
    pub rowcount: i64,
    pub rows: Vec<Vec<rmpv::Value>>,
}

/// Prepares `sql` and classifies it for the write-serialization
/// controller. Preparing never requires the write slot: it doesn't touch
/// any table data.
pub fn prepare_and_classify<'conn>(
    conn: &'conn Connection,
    sql: &str,
) -> Result<(Statement<'conn>, StmtKind)> {
    let stmt = conn.prepare(sql)?;
    let kind = StmtKind::classify(sql, stmt.readonly());
    Ok((stmt, kind))
}

/// Binds parameters, steps to completion, and assembles the result —
/// everything that must run under the write-serialization discipline for
/// non-readonly statements.
pub fn run(conn: &Connection, stmt: &mut Statement<'_>, request: &QueryRequest) -> Result<ExecutionResult> {
    bind_parameters(stmt, &request.parameters)?;

    let column_count = stmt.column_count();
    let columns = if column_count == 0 {
        None
    } else {
        Some(column_metadata(stmt, column_count))
    };

    let collect = matches!(request.operation, Operation::ExecuteAndFetch);
    let readonly = stmt.readonly();

    let mut rows_out = Vec::new();
    let mut row_counter: i64 = 0;
    {
        let mut rows = stmt.raw_query();
        while let Some(row) = rows.next()? {
            row_counter += 1;
            if collect {
                let mut values = Vec::with_capacity(column_count);
                for i in 0..column_count {
                    values.push(value::from_column_value(row.get_ref(i)?));
                }
                rows_out.push(values);
            }
        }
    }

    let rowcount = if readonly {
        row_counter
    } else {
        conn.changes() as i64
    };

    Ok(ExecutionResult {
        columns,
        rowcount,
        rows: rows_out,
    })
}

fn column_metadata(stmt: &Statement<'_>, column_count: usize) -> Vec<ColumnMeta> {
    (0..column_count)
        .map(|i| {
            let name = stmt.column_name(i).unwrap_or_default().to_string();
            let decltype = stmt.column_decltype(i).map(str::to_string);
            (name, decltype)
        })
        .collect()
}

fn bind_parameters(stmt: &mut Statement<'_>, params: &Params) -> Result<()> {
    let expected = stmt.parameter_count();
    match params {
        Params::Positional(values) => {
            if values.len() != expected {
                return Err(Error::InvalidQuery(
                    "number of passed parameters does not match number of required parameters"
                        .to_string(),
                ));
            }
            for (i, v) in values.iter().enumerate() {
                let bound = value::to_sql_value(v)?;
                stmt.raw_bind_parameter(i + 1, bound)?;
            }
        }
        Params::Named(map) => {
            for i in 1..=expected {
                let raw_name = stmt
                    .parameter_name(i)
                    .ok_or_else(|| Error::InvalidQuery("unnamed bind parameter".to_string()))?;
                // strip the leading sigil character (`:`, `@`, `$`)
                let name = &raw_name[1..];
                let wire_value = map.get(name).ok_or_else(|| {
                    Error::InvalidQuery(format!("Missing key: {name}"))
                })?;
                let bound = value::to_sql_value(wire_value)?;
                stmt.raw_bind_parameter(i, bound)?;
            }
        }
    }
    Ok(())
}
