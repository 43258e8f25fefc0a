//! Command dispatch: looks up a command by (case-insensitive) name,
//! validates arity, and runs the handler against the shared [`SkipMap`].
//!
//! `quit` is special-cased by the caller before dispatch ever sees it
//! (see [`crate::reactor`]), matching the original server's separate
//! handling of the command that tears down the connection.

use std::collections::HashMap;

use tadpole_core::{Error, FixedLength, Value};
use tadpole_storage::SkipMap;

use crate::reply::Reply;

/// `arity > 0` means an exact argument count (including the command
/// name); `arity < 0` means "at least `-arity`" — unused by tadpole's
/// fixed-shape commands today but kept for parity with the original
/// table's convention.
struct CommandSpec {
    arity: i32,
    handler: fn(&mut SkipMap, &[Vec<u8>], Option<FixedLength>) -> Reply,
}

fn command_table() -> HashMap<&'static str, CommandSpec> {
    let mut table = HashMap::new();
    table.insert(
        "ping",
        CommandSpec {
            arity: 1,
            handler: ping,
        },
    );
    table.insert(
        "get",
        CommandSpec {
            arity: 2,
            handler: get,
        },
    );
    table.insert(
        "put",
        CommandSpec {
            arity: 3,
            handler: put,
        },
    );
    table.insert(
        "set",
        CommandSpec {
            arity: 3,
            handler: put,
        },
    );
    table.insert(
        "delete",
        CommandSpec {
            arity: 2,
            handler: delete,
        },
    );
    table.insert(
        "scan",
        CommandSpec {
            arity: 3,
            handler: scan,
        },
    );
    table.insert(
        "show",
        CommandSpec {
            arity: 1,
            handler: show,
        },
    );
    table
}

/// The live command table, built once and reused for the life of the
/// process. `quit`/`shutdown` go through the reactor directly; this
/// covers the data-plane commands.
pub struct Dispatcher {
    table: HashMap<&'static str, CommandSpec>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            table: command_table(),
        }
    }

    /// Looks up `argv[0]` case-insensitively, validates arity, and runs
    /// the handler. `argv` must be non-empty; the reactor guarantees this
    /// before calling in.
    pub fn dispatch(
        &self,
        map: &mut SkipMap,
        argv: &[Vec<u8>],
        fixed_length: Option<FixedLength>,
    ) -> Reply {
        let name = String::from_utf8_lossy(&argv[0]).to_ascii_lowercase();
        let Some(spec) = self.table.get(name.as_str()) else {
            return Error::Command(format!("unknown command '{name}'")).into();
        };

        let arity_ok = if spec.arity > 0 {
            spec.arity as usize == argv.len()
        } else {
            argv.len() >= (-spec.arity) as usize
        };
        if !arity_ok {
            return Error::Command(format!("wrong number of arguments for '{name}' command")).into();
        }

        (spec.handler)(map, argv, fixed_length)
    }
}

fn ping(_map: &mut SkipMap, _argv: &[Vec<u8>], _fl: Option<FixedLength>) -> Reply {
    Reply::Simple("PONG".to_string())
}

fn get(map: &mut SkipMap, argv: &[Vec<u8>], fl: Option<FixedLength>) -> Reply {
    let key = &argv[1];
    if let Some(fl) = fl {
        if key.len() != fl.key_len {
            return Error::Command(format!(
                "Illegal key length, key length should be {}",
                fl.key_len
            ))
            .into();
        }
    }
    if !map.contains(key) {
        return Reply::NullBulk;
    }
    match map.search(key) {
        Some(value) => Reply::Bulk(value.clone()),
        None => Reply::NullBulk,
    }
}

fn put(map: &mut SkipMap, argv: &[Vec<u8>], fl: Option<FixedLength>) -> Reply {
    let key = &argv[1];
    let value: &Value = &argv[2];
    if let Some(fl) = fl {
        if key.len() != fl.key_len || value.len() != fl.val_len {
            return Error::Command(format!(
                "Illegal kv length, key/value length should be {}/{}",
                fl.key_len, fl.val_len
            ))
            .into();
        }
    }
    map.insert(key.clone(), value.clone());
    Reply::ok()
}

fn delete(map: &mut SkipMap, argv: &[Vec<u8>], fl: Option<FixedLength>) -> Reply {
    let key = &argv[1];
    if let Some(fl) = fl {
        if key.len() != fl.key_len {
            return Error::Command(format!(
                "Illegal key length, key length should be {}",
                fl.key_len
            ))
            .into();
        }
    }
    Reply::Simple(if map.delete(key) { "1" } else { "0" }.to_string())
}

fn scan(map: &mut SkipMap, argv: &[Vec<u8>], fl: Option<FixedLength>) -> Reply {
    let lo = &argv[1];
    let hi = &argv[2];
    if let Some(fl) = fl {
        if lo.len() != fl.key_len || hi.len() != fl.key_len {
            return Error::Command(format!(
                "Illegal cursor length, key length should be {}",
                fl.key_len
            ))
            .into();
        }
    }
    if lo > hi {
        return Error::Command(format!(
            "CURSORERR '{}' should less or equal to '{}'",
            String::from_utf8_lossy(lo),
            String::from_utf8_lossy(hi)
        ))
        .into();
    }

    let joined = map
        .scan(lo, hi)
        .map(|k| String::from_utf8_lossy(k).into_owned())
        .collect::<Vec<_>>()
        .join("\n");
    Reply::Simple(joined)
}

fn show(map: &mut SkipMap, _argv: &[Vec<u8>], _fl: Option<FixedLength>) -> Reply {
    let fmt_key = |k: Option<&Vec<u8>>| match k {
        Some(k) => String::from_utf8_lossy(k).into_owned(),
        None => "NULL".to_string(),
    };
    Reply::Simple(format!(
        "tadpole:keys={},min={},max={}",
        map.len(),
        fmt_key(map.min_key()),
        fmt_key(map.max_key()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(reply: &Reply) -> String {
        let mut buf = bytes::BytesMut::new();
        reply.write_into(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }

    #[test]
    fn ping_replies_pong() {
        let d = Dispatcher::new();
        let mut map = SkipMap::new();
        let reply = d.dispatch(&mut map, &[b"PING".to_vec()], None);
        assert_eq!(text(&reply), "+PONG\r\n");
    }

    #[test]
    fn unknown_command_is_an_error() {
        let d = Dispatcher::new();
        let mut map = SkipMap::new();
        let reply = d.dispatch(&mut map, &[b"bogus".to_vec()], None);
        assert!(text(&reply).starts_with("-ERR unknown command"));
    }

    #[test]
    fn wrong_arity_is_an_error() {
        let d = Dispatcher::new();
        let mut map = SkipMap::new();
        let reply = d.dispatch(&mut map, &[b"get".to_vec()], None);
        assert!(text(&reply).starts_with("-ERR wrong number of arguments"));
    }

    #[test]
    fn put_then_get_round_trips() {
        let d = Dispatcher::new();
        let mut map = SkipMap::new();
        d.dispatch(
            &mut map,
            &[b"put".to_vec(), b"foo".to_vec(), b"bar".to_vec()],
            None,
        );
        let reply = d.dispatch(&mut map, &[b"get".to_vec(), b"foo".to_vec()], None);
        assert_eq!(text(&reply), "$3\r\nbar\r\n");
    }

    #[test]
    fn get_miss_is_null_bulk() {
        let d = Dispatcher::new();
        let mut map = SkipMap::new();
        let reply = d.dispatch(&mut map, &[b"get".to_vec(), b"nope!".to_vec()], None);
        assert_eq!(text(&reply), "$-1\r\n");
    }

    #[test]
    fn set_is_an_alias_for_put() {
        let d = Dispatcher::new();
        let mut map = SkipMap::new();
        d.dispatch(
            &mut map,
            &[b"set".to_vec(), b"k".to_vec(), b"v".to_vec()],
            None,
        );
        assert_eq!(map.search(b"k"), Some(&b"v".to_vec()));
    }

    #[test]
    fn delete_reports_whether_key_existed() {
        let d = Dispatcher::new();
        let mut map = SkipMap::new();
        d.dispatch(
            &mut map,
            &[b"put".to_vec(), b"foo".to_vec(), b"bar".to_vec()],
            None,
        );
        let hit = d.dispatch(&mut map, &[b"delete".to_vec(), b"foo".to_vec()], None);
        assert_eq!(text(&hit), "+1\r\n");
        let miss = d.dispatch(&mut map, &[b"delete".to_vec(), b"foo".to_vec()], None);
        assert_eq!(text(&miss), "+0\r\n");
    }

    #[test]
    fn scan_joins_matching_keys_with_newlines() {
        let d = Dispatcher::new();
        let mut map = SkipMap::new();
        for (k, v) in [("a", "1"), ("b", "2"), ("c", "3")] {
            d.dispatch(
                &mut map,
                &[b"put".to_vec(), k.as_bytes().to_vec(), v.as_bytes().to_vec()],
                None,
            );
        }
        let reply = d.dispatch(
            &mut map,
            &[b"scan".to_vec(), b"a".to_vec(), b"b".to_vec()],
            None,
        );
        assert_eq!(text(&reply), "+a\nb\r\n");
    }

    #[test]
    fn scan_with_empty_map_has_no_embedded_newline() {
        let d = Dispatcher::new();
        let mut map = SkipMap::new();
        let reply = d.dispatch(
            &mut map,
            &[b"scan".to_vec(), b"a".to_vec(), b"z".to_vec()],
            None,
        );
        assert_eq!(text(&reply), "+\r\n");
    }

    #[test]
    fn scan_rejects_inverted_cursor() {
        let d = Dispatcher::new();
        let mut map = SkipMap::new();
        let reply = d.dispatch(
            &mut map,
            &[b"scan".to_vec(), b"z".to_vec(), b"a".to_vec()],
            None,
        );
        assert!(text(&reply).starts_with("-ERR CURSORERR"));
    }

    #[test]
    fn show_reports_null_for_empty_map() {
        let d = Dispatcher::new();
        let mut map = SkipMap::new();
        let reply = d.dispatch(&mut map, &[b"show".to_vec()], None);
        assert_eq!(text(&reply), "+tadpole:keys=0,min=NULL,max=NULL\r\n");
    }

    #[test]
    fn fixed_length_rejects_wrong_sized_key() {
        let d = Dispatcher::new();
        let mut map = SkipMap::new();
        let fl = Some(FixedLength {
            key_len: 3,
            val_len: 3,
        });
        let reply = d.dispatch(&mut map, &[b"get".to_vec(), b"ab".to_vec()], fl);
        assert_eq!(
            text(&reply),
            "-ERR Illegal key length, key length should be 3\r\n"
        );
    }

    #[test]
    fn command_dispatch_is_case_insensitive() {
        let d = Dispatcher::new();
        let mut map = SkipMap::new();
        for variant in ["PING", "ping", "PiNg"] {
            let reply = d.dispatch(&mut map, &[variant.as_bytes().to_vec()], None);
            assert_eq!(text(&reply), "+PONG\r\n");
        }
    }
}
