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

//! End-to-end tests driving `sqlited::Server` over a real TCP socket with
//! hand-built MessagePack requests, mirroring the six scenarios and the
//! testable properties around session/connect/drop semantics.

use std::io::Write;
use std::net::TcpStream;
use std::time::Duration;

use rmpv::Value;
use sqlited::Server;

fn spawn_server(port: u16) {
    let server = Box::leak(Box::new(Server::new(port, 2)));
    server.start().expect("server failed to start");
    std::thread::sleep(Duration::from_millis(100));
}

fn connect_client(port: u16) -> TcpStream {
    let stream = TcpStream::connect(("127.0.0.1", port)).expect("failed to connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    stream
}

fn send_map(stream: &mut TcpStream, fields: Vec<(&str, Value)>) {
    let map = Value::Map(
        fields
            .into_iter()
            .map(|(k, v)| (Value::String(k.into()), v))
            .collect(),
    );
    let mut buf = Vec::new();
    rmpv::encode::write_value(&mut buf, &map).unwrap();
    stream.write_all(&buf).unwrap();
}

/// Reads one reply: a header map followed by a data array, each decoded off
/// the same stream in sequence.
fn read_reply(stream: &mut TcpStream) -> (Value, Value) {
    let header = rmpv::decode::read_value(stream).expect("failed to decode header");
    let data = rmpv::decode::read_value(stream).expect("failed to decode data");
    (header, data)
}

fn header_field(header: &Value, key: &str) -> Value {
    header
        .as_map()
        .unwrap()
        .iter()
        .find(|(k, _)| k.as_str() == Some(key))
        .map(|(_, v)| v.clone())
        .unwrap_or(Value::Nil)
}

fn connect_request(stream: &mut TcpStream, database: &str) -> Value {
    send_map(
        stream,
        vec![
            ("endpoint", Value::String("connect".into())),
            ("database", Value::String(database.into())),
        ],
    );
    read_reply(stream).0
}

fn query_request(
    stream: &mut TcpStream,
    database: &str,
    query: &str,
    operation: i64,
    parameters: Value,
) -> (Value, Value) {
    send_map(
        stream,
        vec![
            ("endpoint", Value::String("query".into())),
            ("database", Value::String(database.into())),
            ("query", Value::String(query.into())),
            ("operation", Value::Integer(operation.into())),
            ("parameters", parameters),
        ],
    );
    read_reply(stream)
}

fn temp_db_path(name: &str) -> String {
    let dir = std::env::temp_dir();
    format!("{}/sqlited-test-{name}-{}.db", dir.display(), std::process::id())
}

#[test]
fn connect_returns_ok() {
    spawn_server(18180);
    let mut client = connect_client(18180);
    let path = temp_db_path("connect-ok");
    let header = connect_request(&mut client, &path);
    assert_eq!(header_field(&header, "status").as_i64(), Some(0));
    assert_eq!(header_field(&header, "message").as_str(), Some("OK"));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn end_to_end_create_insert_select() {
    spawn_server(18181);
    let mut client = connect_client(18181);
    let path = temp_db_path("create-insert-select");
    connect_request(&mut client, &path);

    let (header, _) = query_request(
        &mut client,
        &path,
        "CREATE TABLE t(x INTEGER, y TEXT)",
        1,
        Value::Array(vec![]),
    );
    assert_eq!(header_field(&header, "status").as_i64(), Some(0));
    assert_eq!(header_field(&header, "rowcount").as_i64(), Some(0));
    assert_eq!(header_field(&header, "columns"), Value::Nil);

    let (header, _) = query_request(
        &mut client,
        &path,
        "INSERT INTO t VALUES(?, ?)",
        1,
        Value::Array(vec![Value::Integer(1.into()), Value::String("a".into())]),
    );
    assert_eq!(header_field(&header, "status").as_i64(), Some(0));
    assert_eq!(header_field(&header, "rowcount").as_i64(), Some(1));

    let (header, data) = query_request(
        &mut client,
        &path,
        "SELECT x,y FROM t",
        2,
        Value::Array(vec![]),
    );
    assert_eq!(header_field(&header, "status").as_i64(), Some(0));
    assert_eq!(header_field(&header, "rowcount").as_i64(), Some(1));
    let columns = header_field(&header, "columns").as_array().unwrap();
    assert_eq!(columns[0].as_array().unwrap()[0].as_str(), Some("x"));
    assert_eq!(columns[1].as_array().unwrap()[0].as_str(), Some("y"));
    let rows = data.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    let row = rows[0].as_array().unwrap();
    assert_eq!(row[0].as_i64(), Some(1));
    assert_eq!(row[1].as_str(), Some("a"));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn named_parameter_select() {
    spawn_server(18182);
    let mut client = connect_client(18182);
    let path = temp_db_path("named-params");
    connect_request(&mut client, &path);
    query_request(
        &mut client,
        &path,
        "CREATE TABLE t(x INTEGER, y TEXT)",
        1,
        Value::Array(vec![]),
    );
    query_request(
        &mut client,
        &path,
        "INSERT INTO t VALUES(?, ?)",
        1,
        Value::Array(vec![Value::Integer(1.into()), Value::String("a".into())]),
    );

    let mut named = Vec::new();
    named.push((Value::String("id".into()), Value::Integer(1.into())));
    let (header, data) = query_request(
        &mut client,
        &path,
        "SELECT x FROM t WHERE x=:id",
        2,
        Value::Map(named),
    );
    assert_eq!(header_field(&header, "status").as_i64(), Some(0));
    assert_eq!(header_field(&header, "rowcount").as_i64(), Some(1));
    let rows = data.as_array().unwrap();
    assert_eq!(rows[0].as_array().unwrap()[0].as_i64(), Some(1));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn idempotent_connect_same_path_ok_different_path_errors() {
    spawn_server(18183);
    let mut client = connect_client(18183);
    let path = temp_db_path("idempotent");
    let first = connect_request(&mut client, &path);
    assert_eq!(header_field(&first, "status").as_i64(), Some(0));

    let second = connect_request(&mut client, &path);
    assert_eq!(header_field(&second, "status").as_i64(), Some(0));

    let other_path = temp_db_path("idempotent-other");
    let third = connect_request(&mut client, &other_path);
    assert_eq!(header_field(&third, "status").as_i64(), Some(2));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn drop_erases_session_and_file() {
    spawn_server(18184);
    let mut client = connect_client(18184);
    let path = temp_db_path("drop");
    connect_request(&mut client, &path);
    query_request(
        &mut client,
        &path,
        "CREATE TABLE t(x INTEGER)",
        1,
        Value::Array(vec![]),
    );
    assert!(std::path::Path::new(&path).exists());

    send_map(
        &mut client,
        vec![
            ("endpoint", Value::String("drop".into())),
            ("database", Value::String(path.clone().into())),
        ],
    );
    let (header, _) = read_reply(&mut client);
    assert_eq!(header_field(&header, "status").as_i64(), Some(0));
    assert!(!std::path::Path::new(&path).exists());

    let (header, _) = query_request(
        &mut client,
        &path,
        "SELECT 1",
        2,
        Value::Array(vec![]),
    );
    assert_eq!(header_field(&header, "status").as_i64(), Some(2));
}

#[test]
fn query_without_session_is_invalid_request() {
    spawn_server(18185);
    let mut client = connect_client(18185);
    let (header, _) = query_request(
        &mut client,
        "/tmp/does-not-matter.db",
        "SELECT 1",
        2,
        Value::Array(vec![]),
    );
    assert_eq!(header_field(&header, "status").as_i64(), Some(2));
    assert_eq!(header_field(&header, "rowcount").as_i64(), Some(-1));
    assert_eq!(header_field(&header, "columns"), Value::Nil);
}

#[test]
fn deserialization_error_on_garbage_bytes() {
    spawn_server(18186);
    let mut client = connect_client(18186);
    // 0xc1 is msgpack's reserved/never-used byte: any conforming decoder
    // must reject it outright.
    client.write_all(&[0xc1, 0xc1, 0xc1, 0xc1]).unwrap();
    let (header, _) = read_reply(&mut client);
    assert_eq!(header_field(&header, "status").as_i64(), Some(3));
}

#[test]
fn parameter_count_mismatch_is_invalid_query() {
    spawn_server(18187);
    let mut client = connect_client(18187);
    let path = temp_db_path("param-count");
    connect_request(&mut client, &path);
    query_request(
        &mut client,
        &path,
        "CREATE TABLE t(x INTEGER, y TEXT)",
        1,
        Value::Array(vec![]),
    );

    let (header, _) = query_request(
        &mut client,
        &path,
        "INSERT INTO t VALUES(?, ?)",
        1,
        Value::Array(vec![Value::Integer(1.into())]),
    );
    assert_eq!(header_field(&header, "status").as_i64(), Some(6));
    assert_eq!(header_field(&header, "rowcount").as_i64(), Some(-1));

    let _ = std::fs::remove_file(&path);
}
