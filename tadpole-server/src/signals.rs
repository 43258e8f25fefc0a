//! Signal handling: `SIGHUP` and `SIGPIPE` are ignored outright (matching
//! the original server's `signal(SIGHUP, SIG_IGN)` / `signal(SIGPIPE,
//! SIG_IGN)` calls at startup), and `SIGTERM`/`SIGINT`/`SIGCHLD` each set
//! a flag the reactor checks once per poll iteration rather than
//! interrupting it mid-handler.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use signal_hook::consts::{SIGCHLD, SIGHUP, SIGINT, SIGPIPE, SIGTERM};
use signal_hook::flag;
use signal_hook::low_level;

/// Shared flags the reactor polls once per loop iteration.
pub struct Signals {
    pub shutdown: Arc<AtomicBool>,
}

/// Registers handlers for every signal tadpole cares about. Must be
/// called once, after the reactor's `Poll` is created, before the event
/// loop starts.
pub fn install() -> std::io::Result<Signals> {
    let shutdown = Arc::new(AtomicBool::new(false));
    flag::register(SIGTERM, Arc::clone(&shutdown))?;
    flag::register(SIGINT, Arc::clone(&shutdown))?;
    flag::register(SIGCHLD, Arc::clone(&shutdown))?;

    unsafe {
        low_level::register(SIGHUP, || {})?;
        low_level::register(SIGPIPE, || {})?;
    }

    Ok(Signals { shutdown })
}
