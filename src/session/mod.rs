//! Per-connection session: state machine, read loop, and command dispatch
//!
//! A [`Session`] owns everything bound to one client connection and walks it
//! through the three RFC 1939 phases. The read loop and dispatcher live
//! here; the per-verb handlers live in the `handlers` submodule.

mod handlers;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite};
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::backend::{Authorizer, Backend};
use crate::command::{Command, Request};
use crate::error::{Pop3Error, Result};
use crate::wire::Printer;

/// Protocol phase of a session (RFC 1939 §3)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Client must identify itself before touching the maildrop
    Authorization,
    /// Maildrop locked; mail-access commands admitted
    Transaction,
    /// Terminal phase entered by a clean `QUIT` from TRANSACTION
    Update,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Authorization => "AUTHORIZATION",
            Phase::Transaction => "TRANSACTION",
            Phase::Update => "UPDATE",
        };

        write!(f, "{}", name)
    }
}

/// Phases in which each command may be dispatched
///
/// Checked before the handler runs, so an out-of-phase command is rejected
/// structurally without touching any collaborator.
fn admitted_phases(command: Command) -> &'static [Phase] {
    match command {
        Command::Quit | Command::Capa => &[Phase::Authorization, Phase::Transaction],
        Command::User | Command::Pass => &[Phase::Authorization],
        Command::Stat
        | Command::List
        | Command::Retr
        | Command::Dele
        | Command::Noop
        | Command::Rset
        | Command::Uidl => &[Phase::Transaction],
    }
}

/// State and collaborators bound to one client connection
///
/// Created per accepted connection and driven to completion by
/// [`serve`](Session::serve). Nothing is shared between sessions at this
/// layer; the backend alone serializes maildrop access.
pub struct Session<R, W> {
    phase: Phase,
    alive: bool,
    /// Username from the most recent successful `USER`; empty until then
    user: String,
    /// Password held only across the single authorization attempt
    pass: String,
    /// Whether this session holds the maildrop lock for `user`
    locked: bool,
    last_command: Option<Command>,
    authorizer: Arc<dyn Authorizer>,
    backend: Arc<dyn Backend>,
    reader: R,
    printer: Printer<W>,
    idle_timeout: Duration,
}

impl<R, W> Session<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Bind a fresh session, in AUTHORIZATION, to the two halves of a
    /// connection
    pub fn new(
        reader: R,
        writer: W,
        authorizer: Arc<dyn Authorizer>,
        backend: Arc<dyn Backend>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            phase: Phase::Authorization,
            alive: true,
            user: String::new(),
            pass: String::new(),
            locked: false,
            last_command: None,
            authorizer,
            backend,
            reader,
            printer: Printer::new(writer),
            idle_timeout,
        }
    }

    /// Run the session to completion
    ///
    /// Emits the greeting, then reads and dispatches commands until the
    /// client quits, disconnects, or idles past the deadline. Whatever the
    /// exit path, a still-held maildrop lock is released before returning.
    pub async fn serve(mut self) -> Result<()> {
        let result = self.run_loop().await;
        self.release_maildrop();
        result
    }

    async fn run_loop(&mut self) -> Result<()> {
        self.printer.welcome().await?;

        while self.alive {
            let line = match self.read_line().await {
                Ok(line) => line,
                Err(Pop3Error::ConnectionClosed) => {
                    debug!("client closed the connection");
                    return Ok(());
                }
                Err(err) => return Err(err),
            };

            self.dispatch(&line).await?;
        }

        Ok(())
    }

    /// Read one request line, bounded by the idle deadline
    ///
    /// The deadline is re-armed on every call, so it limits idle time
    /// between commands rather than total session length.
    async fn read_line(&mut self) -> Result<String> {
        let mut buf = Vec::with_capacity(128);
        let n = timeout(self.idle_timeout, self.reader.read_until(b'\n', &mut buf))
            .await
            .map_err(|_| Pop3Error::Timeout)??;

        if n == 0 {
            return Err(Pop3Error::ConnectionClosed);
        }

        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end();
        trace!("Received: {}", line);
        Ok(line.to_string())
    }

    /// Parse and execute one request line
    ///
    /// Exactly one reply line is written per failed command: variants whose
    /// `Display` is a protocol text are sent verbatim, everything else gets
    /// the generic execution-error reply. `last_command` and `phase` only
    /// advance on success, so an unknown verb or failed command never breaks
    /// the `USER`/`PASS` sequencing.
    async fn dispatch(&mut self, line: &str) -> Result<()> {
        let request = Request::parse(line);
        let command = match request.verb.parse::<Command>() {
            Ok(command) => command,
            Err(_) => {
                debug!("unknown command: {}", request.verb);
                return self
                    .printer
                    .err(&format!("Invalid command {}", request.verb))
                    .await;
            }
        };

        let outcome = if admitted_phases(command).contains(&self.phase) {
            self.handle(command, &request.args).await
        } else {
            Err(Pop3Error::InvalidState {
                command,
                phase: self.phase,
            })
        };

        match outcome {
            Ok(next) => {
                self.last_command = Some(command);
                self.phase = next;
                Ok(())
            }
            // Transport failures abort the session instead of being reported
            Err(err @ Pop3Error::Io(_)) => Err(err),
            Err(err) => {
                warn!("{} failed: {}", command, err);
                let reply = match &err {
                    Pop3Error::MissingArgument(_)
                    | Pop3Error::InvalidArgument(_)
                    | Pop3Error::Lock(_)
                    | Pop3Error::Unlock(_) => err.to_string(),
                    _ => format!("Error executing command {}", command),
                };
                self.printer.err(&reply).await
            }
        }
    }

    /// Best-effort release of a lock still held when the loop exits
    /// (disconnect, idle timeout, transport failure)
    fn release_maildrop(&mut self) {
        if !self.locked {
            return;
        }

        if let Err(err) = self.backend.unlock(&self.user) {
            warn!("failed to unlock maildrop for {}: {}", self.user, err);
        }
        self.locked = false;
    }
}
