//! Persistence for the ordered map: a flat `"<key> <value>\n"` file,
//! written atomically via write-temp-then-rename and reloaded verbatim
//! at startup.
//!
//! Keys and values here are whitespace-free by construction (the wire
//! protocol's inline and multibulk framing never admits a literal space
//! inside a bulk string once parsed), so a single-space separator and
//! newline terminator round-trip without escaping.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use tadpole_core::{Error, Result};

use crate::skiplist::SkipMap;

/// Writes every `(key, value)` pair in `map`, in ascending key order, to
/// `path`. Writes to a sibling `temp-<pid>.data` file first, `fsync`s it,
/// then renames it over `path` so a crash mid-write never corrupts the
/// previous snapshot.
pub fn save(map: &SkipMap, path: &Path) -> Result<()> {
    let tmp_name = format!("temp-{}.data", std::process::id());
    let tmp_path = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(&tmp_name),
        _ => Path::new(&tmp_name).to_path_buf(),
    };

    let mut file = File::create(&tmp_path)?;
    for (key, value) in map.iter() {
        file.write_all(key)?;
        file.write_all(b" ")?;
        file.write_all(value)?;
        file.write_all(b"\n")?;
    }
    file.sync_all()?;
    drop(file);

    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Loads `path` into a fresh [`SkipMap`]. If `path` does not exist, returns
/// an empty map (this is the normal first-run case, not an error). Any
/// line that does not split into exactly two space-separated fields is a
/// corrupt snapshot and aborts the load.
///
/// Reads the whole file as raw bytes and splits on `\n` (tolerating a
/// preceding `\r`) rather than going through `BufRead::lines`, which
/// requires each line to be valid UTF-8 — keys and values are binary-safe
/// per §3 and must round-trip a lone high byte (0x80-0xFF) that isn't
/// valid UTF-8 on its own.
pub fn load(path: &Path) -> Result<SkipMap> {
    let mut map = SkipMap::new();

    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(map),
        Err(e) => return Err(Error::Io(e)),
    };

    let mut contents = Vec::new();
    file.read_to_end(&mut contents)?;

    for mut line in contents.split(|&b| b == b'\n') {
        if line.last() == Some(&b'\r') {
            line = &line[..line.len() - 1];
        }
        if line.is_empty() {
            continue;
        }
        let space = line.iter().position(|&b| b == b' ');
        match space {
            Some(0) => {
                return Err(Error::Corruption(format!(
                    "malformed snapshot line: {:?}",
                    String::from_utf8_lossy(line)
                )));
            }
            Some(i) => {
                map.insert(line[..i].to_vec(), line[i + 1..].to_vec());
            }
            None => {
                return Err(Error::Corruption(format!(
                    "malformed snapshot line: {:?}",
                    String::from_utf8_lossy(line)
                )));
            }
        }
    }

    Ok(map)
}
