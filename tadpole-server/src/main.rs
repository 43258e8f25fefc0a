//! tadpole: a single-process, in-memory ordered key/value server
//! speaking a subset of RESP.

use std::process::ExitCode;

use log::{error, warn};

use tadpole_server::{cli, config, logging, reactor};

fn main() -> ExitCode {
    match cli::parse(std::env::args()) {
        cli::Invocation::ExitWith(code) => code,
        cli::Invocation::Run { config: config_path } => run(config_path),
    }
}

fn run(config_path: std::path::PathBuf) -> ExitCode {
    let server_config = match config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("\n*** FATAL CONFIG FILE ERROR ***\n{e}");
            return ExitCode::FAILURE;
        }
    };

    logging::init(server_config.loglevel, server_config.logfile.clone());

    if let Some(dir) = &server_config.dir {
        if let Err(e) = std::env::set_current_dir(dir) {
            error!("Changing directory failed: {e}");
            return ExitCode::FAILURE;
        }
    }

    #[cfg(unix)]
    if server_config.daemonize {
        if let Err(e) = daemonize() {
            error!("daemonize failed: {e}");
            return ExitCode::FAILURE;
        }
    }

    if server_config.daemonize || server_config.pidfile.is_some() {
        write_pidfile(server_config.pidfile.as_deref());
    }

    let dbfilename = std::path::PathBuf::from(&server_config.dbfilename);
    let mut reactor = match reactor::Reactor::bind(
        server_config.port,
        dbfilename,
        server_config.fixed_length,
    ) {
        Ok(r) => r,
        Err(e) => {
            error!("Listen to port {} error: {e}", server_config.port);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = reactor.run() {
        warn!("reactor exited with error: {e}");
    }

    ExitCode::SUCCESS
}

fn write_pidfile(pidfile: Option<&std::path::Path>) {
    let default = std::path::PathBuf::from("/var/run/tadpole.pid");
    let path = pidfile.unwrap_or(&default);
    if let Ok(mut f) = std::fs::File::create(path) {
        use std::io::Write;
        let _ = writeln!(f, "{}", std::process::id());
    }
}

#[cfg(unix)]
fn daemonize() -> std::io::Result<()> {
    // SAFETY: fork/setsid are called before any threads are spawned
    // (the reactor is single-threaded and hasn't started yet), which is
    // the one condition that makes calling them from Rust sound.
    unsafe {
        match libc::fork() {
            -1 => return Err(std::io::Error::last_os_error()),
            0 => {}
            _ => std::process::exit(0),
        }
        if libc::setsid() == -1 {
            return Err(std::io::Error::last_os_error());
        }
    }
    Ok(())
}
