//! Builds RESP reply bytes. Every handler produces a [`Reply`]; the
//! reactor serializes it into a client's output buffer.

use bytes::{BufMut, BytesMut};

use tadpole_core::Error;

/// A reply a command handler hands back to the dispatcher.
pub enum Reply {
    Simple(String),
    Bulk(Vec<u8>),
    NullBulk,
    Error(String),
}

impl Reply {
    pub fn ok() -> Self {
        Reply::Simple("OK".to_string())
    }

    /// Sanitizes `msg` the way the original error formatter does: `\r`
    /// and `\n` become spaces so an error message can never smuggle
    /// extra lines into the reply stream.
    pub fn error(msg: impl Into<String>) -> Self {
        let sanitized: String = msg
            .into()
            .chars()
            .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
            .collect();
        Reply::Error(sanitized)
    }

    /// Appends this reply's RESP encoding to `out`.
    pub fn write_into(&self, out: &mut BytesMut) {
        match self {
            Reply::Simple(s) => {
                out.put_u8(b'+');
                out.extend_from_slice(s.as_bytes());
                out.extend_from_slice(b"\r\n");
            }
            Reply::Bulk(data) => {
                out.put_u8(b'$');
                out.extend_from_slice(data.len().to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
                out.extend_from_slice(data);
                out.extend_from_slice(b"\r\n");
            }
            Reply::NullBulk => {
                out.extend_from_slice(b"$-1\r\n");
            }
            Reply::Error(msg) => {
                out.extend_from_slice(b"-ERR ");
                out.extend_from_slice(msg.as_bytes());
                out.extend_from_slice(b"\r\n");
            }
        }
    }
}

/// Command handlers raise semantic failures (unknown name, bad arity,
/// fixed-length mismatch, bad cursor order) as a [`tadpole_core::Error::Command`]
/// and convert it here, rather than building a `Reply::Error` by hand —
/// `Error`'s `Display` impl is the single place the `-ERR ...` message
/// text is produced.
impl From<Error> for Reply {
    fn from(err: Error) -> Self {
        Reply::error(err.to_string())
    }
}
