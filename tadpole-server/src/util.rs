//! A whitespace/quote/backslash-escape tokenizer shared by the inline
//! protocol parser and the config-file loader — the same job the
//! original C server gave a single `sdssplitargs` helper.

/// Splits `line` into tokens the way a shell would: whitespace separates
/// tokens, `"..."` and `'...'` quote a token (consuming the surrounding
/// quotes), and inside double quotes `\n`, `\r`, `\t`, `\\`, `\"` are
/// recognized escapes. Returns `None` if a quote is left unterminated.
pub fn split_args(line: &str) -> Option<Vec<Vec<u8>>> {
    let bytes = line.as_bytes();
    let mut i = 0;
    let mut out = Vec::new();

    loop {
        while i < bytes.len() && (bytes[i] as char).is_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }

        let mut token = Vec::new();
        if bytes[i] == b'"' {
            i += 1;
            loop {
                if i >= bytes.len() {
                    return None;
                }
                match bytes[i] {
                    b'"' => {
                        i += 1;
                        break;
                    }
                    b'\\' if i + 1 < bytes.len() => {
                        i += 1;
                        match bytes[i] {
                            b'n' => token.push(b'\n'),
                            b'r' => token.push(b'\r'),
                            b't' => token.push(b'\t'),
                            b'\\' => token.push(b'\\'),
                            b'"' => token.push(b'"'),
                            other => token.push(other),
                        }
                        i += 1;
                    }
                    other => {
                        token.push(other);
                        i += 1;
                    }
                }
            }
        } else if bytes[i] == b'\'' {
            i += 1;
            loop {
                if i >= bytes.len() {
                    return None;
                }
                if bytes[i] == b'\'' {
                    i += 1;
                    break;
                }
                token.push(bytes[i]);
                i += 1;
            }
        } else {
            while i < bytes.len() && !(bytes[i] as char).is_whitespace() {
                token.push(bytes[i]);
                i += 1;
            }
        }
        out.push(token);
    }

    Some(out)
}
