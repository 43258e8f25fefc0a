//! The single-threaded readiness loop: owns the listening socket, every
//! client session, the shared [`SkipMap`], and drives everything to
//! completion between `Poll::poll` calls. No locks, no spawned tasks —
//! exactly one thread ever touches any of this state.

use std::collections::HashMap;
use std::io::{ErrorKind, Read, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use log::{debug, info, warn};
use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Token};

use tadpole_core::{FixedLength, Result};
use tadpole_storage::{snapshot, SkipMap};

use crate::client::ClientSession;
use crate::commands::Dispatcher;
use crate::reply::Reply;
use crate::signals::Signals;

/// Per-read chunk size for client sockets.
const READ_CHUNK: usize = 16 * 1024;
/// Hard cap on a single client's unparsed input buffer.
const QUERY_BUFFER_MAX: usize = 1024 * 1024 * 1024;
/// `mio::Events` capacity; also the floor on simultaneous readiness
/// events the loop can observe per `poll` call.
const EVENTS_CAPACITY: usize = 1024;

const LISTENER_TOKEN: Token = Token(0);

pub struct Reactor {
    poll: Poll,
    listener: TcpListener,
    clients: HashMap<Token, ClientSession>,
    next_token: usize,
    dispatcher: Dispatcher,
    map: SkipMap,
    fixed_length: Option<FixedLength>,
    dbfilename: PathBuf,
    signals: Signals,
}

impl Reactor {
    /// Binds `port`, loads `dbfilename` (if it exists) into the initial
    /// map, and installs signal handlers. Returns ready to [`run`].
    pub fn bind(
        port: u16,
        dbfilename: PathBuf,
        fixed_length: Option<FixedLength>,
    ) -> Result<Self> {
        let addr: SocketAddr = ([0, 0, 0, 0], port).into();
        let mut listener = TcpListener::bind(addr)?;

        let poll = Poll::new()?;
        poll.registry()
            .register(&mut listener, LISTENER_TOKEN, Interest::READABLE)?;

        let map = snapshot::load(&dbfilename)?;
        let signals = crate::signals::install()?;

        Ok(Self {
            poll,
            listener,
            clients: HashMap::new(),
            next_token: 1,
            dispatcher: Dispatcher::new(),
            map,
            fixed_length,
            dbfilename,
            signals,
        })
    }

    /// The port actually bound — useful when `bind` was called with port
    /// `0` to let the OS choose one (tests do this).
    pub fn local_port(&self) -> u16 {
        self.listener
            .local_addr()
            .map(|a| a.port())
            .unwrap_or(0)
    }

    /// Runs until a shutdown signal arrives, then saves the snapshot and
    /// returns.
    pub fn run(&mut self) -> Result<()> {
        let mut events = Events::with_capacity(EVENTS_CAPACITY);

        loop {
            if self
                .signals
                .shutdown
                .load(std::sync::atomic::Ordering::Relaxed)
            {
                break;
            }

            match self.poll.poll(&mut events, Some(Duration::from_millis(200))) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }

            for event in events.iter() {
                if event.token() == LISTENER_TOKEN {
                    self.accept_all()?;
                } else {
                    self.handle_client_readable(event.token());
                }
            }
        }

        info!("saving snapshot to {}", self.dbfilename.display());
        if let Err(e) = snapshot::save(&self.map, &self.dbfilename) {
            warn!("failed to save snapshot: {e}");
        }
        Ok(())
    }

    fn accept_all(&mut self) -> Result<()> {
        loop {
            let (mut stream, addr) = match self.listener.accept() {
                Ok(pair) => pair,
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(()),
                Err(e) => return Err(e.into()),
            };

            let _ = stream.set_nodelay(true);
            set_keepalive(&stream);

            let token = Token(self.next_token);
            self.next_token += 1;

            self.poll
                .registry()
                .register(&mut stream, token, Interest::READABLE)?;

            debug!("accepted {addr}");
            self.clients
                .insert(token, ClientSession::new(stream, token, addr));
        }
    }

    fn handle_client_readable(&mut self, token: Token) {
        let mut should_close = false;
        let mut shutdown_requested = false;

        if let Some(client) = self.clients.get_mut(&token) {
            let mut chunk = [0u8; READ_CHUNK];
            loop {
                match client.stream.read(&mut chunk) {
                    Ok(0) => {
                        should_close = true;
                        break;
                    }
                    Ok(n) => {
                        if client.parser.buffered_len() + n > QUERY_BUFFER_MAX {
                            warn!("client {} exceeded query buffer cap", client.addr);
                            should_close = true;
                            break;
                        }
                        client.parser.feed(&chunk[..n]);
                    }
                    Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                    Err(e) => {
                        debug!("read error from {}: {e}", client.addr);
                        should_close = true;
                        break;
                    }
                }
            }
        }

        if !should_close {
            if let Some(client) = self.clients.get_mut(&token) {
                loop {
                    match client.parser.next_command() {
                        Ok(Some(argv)) => {
                            let name = String::from_utf8_lossy(&argv[0]).to_ascii_lowercase();
                            if name == "quit" {
                                Reply::ok().write_into(&mut client.out);
                                should_close = true;
                                break;
                            }
                            if name == "shutdown" {
                                shutdown_requested = true;
                                break;
                            }
                            let reply =
                                self.dispatcher
                                    .dispatch(&mut self.map, &argv, self.fixed_length);
                            reply.write_into(&mut client.out);
                        }
                        Ok(None) => break,
                        Err(e) => {
                            warn!("protocol error from {}: {e}", client.addr);
                            should_close = true;
                            break;
                        }
                    }
                }
            }
        }

        if let Some(client) = self.clients.get_mut(&token) {
            flush(client);
        }

        if shutdown_requested {
            warn!("tadpole is now ready to exit, bye bye...");
            self.signals
                .shutdown
                .store(true, std::sync::atomic::Ordering::Relaxed);
        }

        if should_close {
            self.close_client(token);
        }
    }

    fn close_client(&mut self, token: Token) {
        if let Some(mut client) = self.clients.remove(&token) {
            let _ = self.poll.registry().deregister(&mut client.stream);
        }
    }
}

fn flush(client: &mut ClientSession) {
    while !client.out.is_empty() {
        match client.stream.write(&client.out) {
            Ok(0) => break,
            Ok(n) => {
                let _ = client.out.split_to(n);
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => break,
            Err(_) => {
                client.out.clear();
                break;
            }
        }
    }
}

#[cfg(unix)]
fn set_keepalive(stream: &mio::net::TcpStream) {
    use std::os::fd::AsRawFd;
    let fd = stream.as_raw_fd();
    unsafe {
        let enable: libc::c_int = 1;
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_KEEPALIVE,
            &enable as *const _ as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        );
        let idle: libc::c_int = 60;
        libc::setsockopt(
            fd,
            libc::IPPROTO_TCP,
            libc::TCP_KEEPIDLE,
            &idle as *const _ as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        );
    }
}

#[cfg(not(unix))]
fn set_keepalive(_stream: &mio::net::TcpStream) {}
