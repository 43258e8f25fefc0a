//! Converts a client's byte stream into a sequence of argument vectors.
//!
//! Two framings are supported, selected by the first byte of each new
//! command: `*` means multibulk (`*N\r\n$len\r\n<bytes>\r\n...`), anything
//! else means inline (a single line, tokenized like a shell command).
//! Both write into, and are driven from, one growing [`bytes::BytesMut`]
//! buffer, so a command split across arbitrarily many `read()` calls
//! parses identically to the same bytes delivered in one call.

use bytes::{Buf, BytesMut};

use tadpole_core::{Error, Result};

use crate::util::split_args;

/// Inline line. Mirrors the original server's `PROTO_INLINE_MAX_SIZE`.
const INLINE_MAX_SIZE: usize = 64 * 1024;
/// Maximum number of elements a multibulk command may declare.
const MBULK_MAX_COUNT: i64 = 1024 * 1024;
/// Maximum size of a single bulk string argument.
const BULK_MAX_SIZE: i64 = 512 * 1024 * 1024;

#[derive(Debug)]
enum State {
    /// Nothing parsed yet for the in-flight command.
    Fresh,
    /// Reading a multibulk command: `remaining` elements still to read,
    /// `argv` holds what's been read so far.
    Multibulk { remaining: i64, argv: Vec<Vec<u8>> },
}

/// Incremental parser for one client connection's input stream.
pub struct Parser {
    buf: BytesMut,
    state: State,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
            state: State::Fresh,
        }
    }

    /// Appends freshly read bytes to the internal buffer.
    pub fn feed(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// How many bytes are buffered but not yet parsed into a command.
    /// Callers use this against the query-buffer hard cap.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Attempts to parse one complete command out of the buffer.
    /// `Ok(None)` means more bytes are needed.
    pub fn next_command(&mut self) -> Result<Option<Vec<Vec<u8>>>> {
        loop {
            if self.buf.is_empty() {
                return Ok(None);
            }

            if matches!(self.state, State::Fresh) && self.buf[0] != b'*' {
                return self.parse_inline();
            }

            match self.parse_multibulk()? {
                Some(argv) => return Ok(Some(argv)),
                None => return Ok(None),
            }
        }
    }

    fn parse_inline(&mut self) -> Result<Option<Vec<Vec<u8>>>> {
        let newline = match self.buf.iter().position(|&b| b == b'\n') {
            Some(pos) => pos,
            None => {
                if self.buf.len() > INLINE_MAX_SIZE {
                    return Err(Error::Protocol("too big inline request".to_string()));
                }
                return Ok(None);
            }
        };

        let mut line_end = newline;
        if line_end > 0 && self.buf[line_end - 1] == b'\r' {
            line_end -= 1;
        }

        let line = String::from_utf8_lossy(&self.buf[..line_end]).into_owned();
        self.buf.advance(newline + 1);

        let tokens = split_args(&line)
            .ok_or_else(|| Error::Protocol("unbalanced quotes in request".to_string()))?;
        if tokens.is_empty() {
            return self.next_command();
        }
        Ok(Some(tokens))
    }

    fn parse_multibulk(&mut self) -> Result<Option<Vec<Vec<u8>>>> {
        if let State::Fresh = self.state {
            let newline = match self.buf.iter().position(|&b| b == b'\r') {
                Some(pos) if pos + 1 < self.buf.len() => pos,
                _ => {
                    if self.buf.len() > INLINE_MAX_SIZE {
                        return Err(Error::Protocol("too big mbulk count string".to_string()));
                    }
                    return Ok(None);
                }
            };

            let header = std::str::from_utf8(&self.buf[1..newline])
                .map_err(|_| Error::Protocol("invalid multibulk length".to_string()))?;
            let count: i64 = header
                .parse()
                .map_err(|_| Error::Protocol("invalid multibulk length".to_string()))?;
            if count > MBULK_MAX_COUNT {
                return Err(Error::Protocol("invalid multibulk length".to_string()));
            }

            self.buf.advance(newline + 2);
            if count <= 0 {
                return self.next_command();
            }
            self.state = State::Multibulk {
                remaining: count,
                argv: Vec::with_capacity(count as usize),
            };
        }

        while let State::Multibulk { remaining, argv } = &mut self.state {
            if *remaining == 0 {
                break;
            }

            let newline = match self.buf.iter().position(|&b| b == b'\r') {
                Some(pos) if pos + 1 < self.buf.len() => pos,
                _ => return Ok(None),
            };

            if self.buf[0] != b'$' {
                return Err(Error::Protocol(format!(
                    "expected '$', got '{}'",
                    self.buf[0] as char
                )));
            }

            let header = std::str::from_utf8(&self.buf[1..newline])
                .map_err(|_| Error::Protocol("invalid bulk length".to_string()))?;
            let len: i64 = header
                .parse()
                .map_err(|_| Error::Protocol("invalid bulk length".to_string()))?;
            if !(0..=BULK_MAX_SIZE).contains(&len) {
                return Err(Error::Protocol("invalid bulk length".to_string()));
            }

            let body_start = newline + 2;
            let body_end = body_start + len as usize;
            let needed = body_end + 2;
            if self.buf.len() < needed {
                return Ok(None);
            }
            if self.buf[body_end] != b'\r' || self.buf[body_end + 1] != b'\n' {
                return Err(Error::Protocol(
                    "expected trailing \\r\\n after bulk payload".to_string(),
                ));
            }

            let value = self.buf[body_start..body_end].to_vec();
            self.buf.advance(needed);
            argv.push(value);
            *remaining -= 1;
        }

        if let State::Multibulk { remaining: 0, .. } = self.state {
            let State::Multibulk { argv, .. } = std::mem::replace(&mut self.state, State::Fresh)
            else {
                unreachable!()
            };
            return Ok(Some(argv));
        }
        Ok(None)
    }
}
