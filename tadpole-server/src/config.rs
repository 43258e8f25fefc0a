//! The config file directive parser: line-oriented, `#`-comments and
//! blank lines skipped, one directive per line, tokenized with the same
//! [`crate::util::split_args`] shell-like splitter the inline protocol
//! parser uses.

use std::path::{Path, PathBuf};

use tadpole_core::{Error, FixedLength, LogLevel, Result, ServerConfig};

use crate::util::split_args;

/// Parses the contents of a config file into a [`ServerConfig`], starting
/// from [`ServerConfig::default`]. On the first bad directive, returns a
/// [`Error::Config`] describing the line number, the offending line, and
/// what was wrong with it — mirroring the original server's "FATAL CONFIG
/// FILE ERROR" report.
pub fn parse(contents: &str) -> Result<ServerConfig> {
    let mut config = ServerConfig::default();

    for (i, raw_line) in contents.lines().enumerate() {
        let linenum = i + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let argv = split_args(line)
            .ok_or_else(|| config_err(linenum, line, "Unbalanced quotes in configuration line"))?;
        if argv.is_empty() {
            continue;
        }

        let directive = String::from_utf8_lossy(&argv[0]).to_ascii_lowercase();
        let args: Vec<String> = argv[1..]
            .iter()
            .map(|a| String::from_utf8_lossy(a).into_owned())
            .collect();

        apply_directive(&mut config, &directive, &args)
            .map_err(|msg| config_err(linenum, line, &msg))?;
    }

    Ok(config)
}

/// Reads and parses `path`. Wraps a missing or unreadable file in the
/// same [`Error::Config`] kind a bad directive would produce.
pub fn load(path: &Path) -> Result<ServerConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Open config file {} error: {e}", path.display())))?;
    parse(&contents)
}

fn apply_directive(config: &mut ServerConfig, directive: &str, args: &[String]) -> std::result::Result<(), String> {
    match (directive, args.len()) {
        ("port", 1) => {
            let port: i64 = args[0].parse().map_err(|_| "Invalid port".to_string())?;
            if !(0..=65535).contains(&port) {
                return Err("Invalid port".to_string());
            }
            config.port = port as u16;
        }
        ("loglevel", 1) => {
            config.loglevel = LogLevel::parse(&args[0])
                .ok_or_else(|| "Invalid log level. Must be one of debug, notice, warning".to_string())?;
        }
        ("dir", 1) => {
            config.dir = Some(PathBuf::from(&args[0]));
        }
        ("logfile", 1) => {
            config.logfile = if args[0].is_empty() {
                None
            } else {
                Some(PathBuf::from(&args[0]))
            };
        }
        ("daemonize", 1) => {
            config.daemonize = parse_yes_no(&args[0])?;
        }
        ("pidfile", 1) => {
            config.pidfile = Some(PathBuf::from(&args[0]));
        }
        ("fixed-length", 2) => {
            let key_len: usize = args[0]
                .parse()
                .map_err(|_| "Invalid fixed-length key length".to_string())?;
            let val_len: usize = args[1]
                .parse()
                .map_err(|_| "Invalid fixed-length value length".to_string())?;
            config.fixed_length = Some(FixedLength { key_len, val_len });
        }
        ("dbfilename", 1) => {
            if !is_base_name(&args[0]) {
                return Err("dbfilename can't be a path, just a filename".to_string());
            }
            config.dbfilename = args[0].clone();
        }
        _ => return Err("Bad directive or wrong number of arguments".to_string()),
    }
    Ok(())
}

fn parse_yes_no(s: &str) -> std::result::Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "yes" => Ok(true),
        "no" => Ok(false),
        _ => Err("argument must be 'yes' or 'no'".to_string()),
    }
}

fn is_base_name(s: &str) -> bool {
    !s.is_empty() && !s.contains('/') && !s.contains('\\')
}

fn config_err(linenum: usize, line: &str, msg: &str) -> Error {
    Error::Config(format!(
        "Reading the configuration file, at line {linenum}\n>>> '{line}'\n{msg}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_and_comments_are_skipped() {
        let cfg = parse("\n# a comment\n   \nport 7000\n").unwrap();
        assert_eq!(cfg.port, 7000);
    }

    #[test]
    fn unknown_directive_is_a_config_error() {
        let err = parse("nonsense here").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn fixed_length_sets_both_lengths() {
        let cfg = parse("fixed-length 3 5").unwrap();
        assert_eq!(
            cfg.fixed_length,
            Some(FixedLength {
                key_len: 3,
                val_len: 5
            })
        );
    }

    #[test]
    fn dbfilename_rejects_path_separators() {
        assert!(parse("dbfilename sub/dir.db").is_err());
        assert!(parse("dbfilename dir.db").is_ok());
    }

    #[test]
    fn logfile_empty_string_means_stdout() {
        let cfg = parse("logfile \"\"").unwrap();
        assert_eq!(cfg.logfile, None);
    }

    #[test]
    fn daemonize_accepts_yes_and_no() {
        assert!(parse("daemonize yes").unwrap().daemonize);
        assert!(!parse("daemonize no").unwrap().daemonize);
        assert!(parse("daemonize maybe").is_err());
    }
}
