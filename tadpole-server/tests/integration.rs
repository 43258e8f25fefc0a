//! End-to-end tests: real `TcpStream`s talking RESP to a real `Reactor`
//! bound on an ephemeral port, driven on a background thread.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use tadpole_server::reactor::Reactor;

/// Binds a reactor on an OS-chosen port and runs it on a background
/// thread. The caller gets the port to connect to; the thread is
/// intentionally leaked for the life of the test process (`shutdown`
/// tests aside, nothing asks it to stop).
fn spawn_server() -> u16 {
    let _ = env_logger::try_init();
    let mut reactor = Reactor::bind(0, std::env::temp_dir().join(unique_db_name()), None)
        .expect("reactor should bind to an ephemeral port");
    let port = reactor.local_port();
    std::thread::spawn(move || {
        let _ = reactor.run();
    });
    std::thread::sleep(Duration::from_millis(50));
    port
}

fn unique_db_name() -> String {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("tadpole-test-{}-{n}.db", std::process::id())
}

fn roundtrip(port: u16, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
    stream.write_all(request).unwrap();
    stream.set_read_timeout(Some(Duration::from_millis(200))).unwrap();
    let mut buf = vec![0u8; 4096];
    let mut total = Vec::new();
    loop {
        match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                total.extend_from_slice(&buf[..n]);
                break;
            }
            Err(_) => break,
        }
    }
    total
}

#[test]
fn ping_replies_pong() {
    let port = spawn_server();
    let reply = roundtrip(port, b"*1\r\n$4\r\nPING\r\n");
    assert_eq!(reply, b"+PONG\r\n");
}

#[test]
fn put_then_get_round_trips() {
    let port = spawn_server();
    let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
    stream
        .write_all(b"*3\r\n$3\r\nput\r\n$3\r\nfoo\r\n$3\r\nbar\r\n")
        .unwrap();
    stream.set_read_timeout(Some(Duration::from_millis(200))).unwrap();
    let mut buf = [0u8; 64];
    let n = stream.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"+OK\r\n");

    stream
        .write_all(b"*2\r\n$3\r\nget\r\n$3\r\nfoo\r\n")
        .unwrap();
    let n = stream.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"$3\r\nbar\r\n");
}

#[test]
fn get_of_absent_key_is_null_bulk() {
    let port = spawn_server();
    let reply = roundtrip(port, b"*2\r\n$3\r\nget\r\n$5\r\nnope!\r\n");
    assert_eq!(reply, b"$-1\r\n");
}

#[test]
fn delete_reports_one_then_zero() {
    let port = spawn_server();
    let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
    stream.set_read_timeout(Some(Duration::from_millis(200))).unwrap();
    let mut buf = [0u8; 64];

    stream
        .write_all(b"*3\r\n$3\r\nput\r\n$3\r\nfoo\r\n$3\r\nbar\r\n")
        .unwrap();
    stream.read(&mut buf).unwrap();

    stream
        .write_all(b"*2\r\n$6\r\ndelete\r\n$3\r\nfoo\r\n")
        .unwrap();
    let n = stream.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"+1\r\n");
}

#[test]
fn scan_returns_matching_keys_newline_joined() {
    let port = spawn_server();
    let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
    stream.set_read_timeout(Some(Duration::from_millis(200))).unwrap();
    let mut buf = [0u8; 64];

    for (k, v) in [("a", "1"), ("b", "2"), ("c", "3")] {
        let req = format!(
            "*3\r\n$3\r\nput\r\n${}\r\n{}\r\n${}\r\n{}\r\n",
            k.len(),
            k,
            v.len(),
            v
        );
        stream.write_all(req.as_bytes()).unwrap();
        stream.read(&mut buf).unwrap();
    }

    stream
        .write_all(b"*3\r\n$4\r\nscan\r\n$1\r\na\r\n$1\r\nb\r\n")
        .unwrap();
    let n = stream.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"+a\nb\r\n");
}

#[test]
fn inline_ping_is_accepted() {
    let port = spawn_server();
    let reply = roundtrip(port, b"ping\r\n");
    assert_eq!(reply, b"+PONG\r\n");
}

#[test]
fn command_dispatch_is_case_insensitive_over_the_wire() {
    let port = spawn_server();
    for variant in ["PING", "ping", "PiNg"] {
        let req = format!("*1\r\n${}\r\n{}\r\n", variant.len(), variant);
        let reply = roundtrip(port, req.as_bytes());
        assert_eq!(reply, b"+PONG\r\n");
    }
}

#[test]
fn quit_closes_the_connection_after_replying_ok() {
    let port = spawn_server();
    let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
    stream
        .write_all(b"*1\r\n$4\r\nquit\r\n")
        .unwrap();
    stream.set_read_timeout(Some(Duration::from_millis(200))).unwrap();
    let mut buf = [0u8; 64];
    let n = stream.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"+OK\r\n");

    let mut rest = [0u8; 8];
    let n = stream.read(&mut rest).unwrap_or(0);
    assert_eq!(n, 0);
}
