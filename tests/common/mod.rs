//! Shared utilities for integration testing.
//!
//! The e2e suites talk to a real server over raw `std::net::TcpStream`s so
//! keep-alive and connection-close behavior stay observable; an HTTP
//! client library would hide exactly the parts under test.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use nova_rest::config::ServerConfig;
use nova_rest::server::{HttpServer, ServerBuilder};

/// A parsed HTTP response.
#[derive(Debug)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Config bound to an ephemeral port, suitable for parallel test servers.
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.bind_address = "127.0.0.1:0".to_string();
    config.io_threads = 4;
    config.handler_threads = 8;
    config
}

/// Build and start a server, returning it together with its bound address.
pub fn start_server(builder: ServerBuilder) -> (HttpServer, SocketAddr) {
    let mut server = builder.build().expect("server build");
    let addr = server.start().expect("server start");
    (server, addr)
}

pub fn connect(addr: SocketAddr) -> TcpStream {
    let stream = TcpStream::connect(addr).expect("connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("read timeout");
    stream
}

/// Write one raw request and parse the response off the same stream,
/// leaving the stream usable for a follow-up request when the server
/// keeps it open.
pub fn roundtrip(stream: &mut TcpStream, raw: &str) -> RawResponse {
    stream.write_all(raw.as_bytes()).expect("write request");
    stream.flush().expect("flush request");
    read_response(stream)
}

/// Convenience: one request on a fresh connection.
pub fn get(addr: SocketAddr, path: &str) -> RawResponse {
    let mut stream = connect(addr);
    roundtrip(
        &mut stream,
        &format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n"),
    )
}

/// Read exactly one response: status line, headers, then a body framed by
/// Content-Length (0 when absent, e.g. 204).
pub fn read_response(stream: &mut TcpStream) -> RawResponse {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    // read until the end of the header block
    let header_end = loop {
        if let Some(pos) = find_header_end(&buf) {
            break pos;
        }
        let n = stream.read(&mut chunk).expect("read headers");
        assert!(n > 0, "connection closed before headers completed");
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let status_line = lines.next().expect("status line");
    let status: u16 = status_line
        .split_whitespace()
        .nth(1)
        .expect("status code")
        .parse()
        .expect("numeric status");

    let mut headers = HashMap::new();
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_string(), value.trim().to_string());
        }
    }

    let content_length: usize = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .map(|(_, v)| v.parse().expect("content-length value"))
        .unwrap_or(0);

    let mut body = buf[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).expect("read body");
        assert!(n > 0, "connection closed before body completed");
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);

    RawResponse {
        status,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    }
}

/// True once the peer has closed its side: a read returns 0 bytes.
pub fn reads_eof(stream: &mut TcpStream) -> bool {
    let mut probe = [0u8; 16];
    matches!(stream.read(&mut probe), Ok(0))
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}
