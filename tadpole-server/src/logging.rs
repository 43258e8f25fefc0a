//! A minimal `log::Log` sink: either stdout or a log file, reopened for
//! append on every message so external log rotation (`mv logfile
//! logfile.1`) is picked up without a restart.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use log::{Level, Log, Metadata, Record};

use tadpole_core::LogLevel;

fn to_level_filter(level: LogLevel) -> log::LevelFilter {
    match level {
        LogLevel::Debug => log::LevelFilter::Debug,
        LogLevel::Verbose => log::LevelFilter::Info,
        LogLevel::Notice => log::LevelFilter::Warn,
        LogLevel::Warning => log::LevelFilter::Error,
    }
}

/// `log::Log` implementor wired up by [`init`]. `Debug` maps to
/// `log::Debug`, `Verbose` to `log::Info` (there's no 5th tadpole level),
/// `Notice` to `log::Warn`, and `Warning` to `log::Error`, preserving
/// relative ordering so `log::max_level()` filtering still behaves.
struct Sink {
    target: Mutex<Target>,
}

enum Target {
    Stdout,
    File(PathBuf),
}

impl Log for Sink {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!(
            "{} {} {}\n",
            std::process::id(),
            level_tag(record.level()),
            record.args()
        );

        let target = self.target.lock().unwrap();
        match &*target {
            Target::Stdout => {
                let _ = std::io::stdout().write_all(line.as_bytes());
            }
            Target::File(path) => {
                if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(path) {
                    let _ = f.write_all(line.as_bytes());
                }
            }
        }
    }

    fn flush(&self) {
        if let Target::Stdout = *self.target.lock().unwrap() {
            let _ = std::io::stdout().flush();
        }
    }
}

fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Error => "WARNING",
        Level::Warn => "NOTICE",
        Level::Info => "VERBOSE",
        Level::Debug | Level::Trace => "DEBUG",
    }
}

/// Installs the sink as the global logger, at `loglevel` verbosity,
/// writing to `logfile` (or stdout if `None`). May only be called once
/// per process; a second call is a startup bug and panics.
pub fn init(loglevel: LogLevel, logfile: Option<PathBuf>) {
    let target = match logfile {
        Some(path) => Target::File(path),
        None => Target::Stdout,
    };
    let sink = Box::new(Sink {
        target: Mutex::new(target),
    });
    log::set_boxed_logger(sink).expect("logger already initialized");
    log::set_max_level(to_level_filter(loglevel));
}
