//! Per-connection state: the socket, its `mio` token, the incremental
//! protocol parser, and the pending output buffer.

use std::net::SocketAddr;

use bytes::BytesMut;
use mio::net::TcpStream;
use mio::Token;

use crate::protocol::Parser;

/// One connected client. Lives in the reactor's `Slab`/`HashMap` of
/// sessions, keyed by its `token`.
pub struct ClientSession {
    pub stream: TcpStream,
    pub token: Token,
    pub addr: SocketAddr,
    pub parser: Parser,
    /// Bytes queued to write that a previous `WouldBlock` left behind.
    pub out: BytesMut,
}

impl ClientSession {
    pub fn new(stream: TcpStream, token: Token, addr: SocketAddr) -> Self {
        Self {
            stream,
            token,
            addr,
            parser: Parser::new(),
            out: BytesMut::new(),
        }
    }
}
