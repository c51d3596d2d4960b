//! Per-verb command handlers
//!
//! Each handler checks its arguments, talks to the collaborators, writes its
//! own success (or user-visible failure) reply, and returns the next phase.
//! Failures it returns as errors are reported by the dispatcher, which is
//! the single point of `-ERR` emission for errors.

use tokio::io::{AsyncBufRead, AsyncWrite};

use super::{Phase, Session};
use crate::command::Command;
use crate::error::{Pop3Error, Result};

/// Capabilities announced by `CAPA` (RFC 2449)
const CAPABILITIES: &[&str] = &["USER", "UIDL"];

fn parse_message_number(arg: &str) -> Result<usize> {
    arg.parse()
        .map_err(|_| Pop3Error::InvalidArgument(arg.to_string()))
}

impl<R, W> Session<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub(super) async fn handle(&mut self, command: Command, args: &[String]) -> Result<Phase> {
        match command {
            Command::Quit => self.quit().await,
            Command::User => self.user(args).await,
            Command::Pass => self.pass(args).await,
            Command::Stat => self.stat().await,
            Command::List => self.list(args).await,
            Command::Retr => self.retr(args).await,
            Command::Dele => self.dele(args).await,
            Command::Noop => self.noop().await,
            Command::Rset => self.rset().await,
            Command::Uidl => self.uidl(args).await,
            Command::Capa => self.capa().await,
        }
    }

    /// From TRANSACTION, commit pending deletions and release the lock
    /// before saying goodbye; from AUTHORIZATION, just end the session.
    async fn quit(&mut self) -> Result<Phase> {
        let next = if self.phase == Phase::Transaction {
            self.backend
                .update(&self.user)
                .map_err(Pop3Error::Backend)?;
            self.backend.unlock(&self.user).map_err(Pop3Error::Unlock)?;
            self.locked = false;
            Phase::Update
        } else {
            self.phase
        };

        self.alive = false;
        self.printer.ok("Goodbye").await?;
        Ok(next)
    }

    async fn user(&mut self, args: &[String]) -> Result<Phase> {
        let name = match args {
            [name] => name,
            [] => return Err(Pop3Error::MissingArgument(Command::User)),
            _ => return Err(Pop3Error::InvalidArgument(args.join(" "))),
        };

        self.user = name.clone();
        self.printer.ok("").await?;
        Ok(Phase::Authorization)
    }

    /// Admitted only directly after a successful `USER`; on success the lock
    /// is taken and the session enters TRANSACTION.
    async fn pass(&mut self, args: &[String]) -> Result<Phase> {
        if self.last_command != Some(Command::User) {
            self.printer
                .err("PASS can be executed only directly after USER command")
                .await?;
            return Ok(Phase::Authorization);
        }

        let pass = match args {
            [pass] => pass,
            [] => return Err(Pop3Error::MissingArgument(Command::Pass)),
            _ => return Err(Pop3Error::InvalidArgument(args.join(" "))),
        };

        self.pass = pass.clone();
        let authorized = self.authorizer.authorize(&self.user, &self.pass);
        self.pass.clear();

        if !authorized {
            self.printer.err("Invalid username or password").await?;
            return Ok(Phase::Authorization);
        }

        self.backend.lock(&self.user).map_err(Pop3Error::Lock)?;
        self.locked = true;
        self.printer.ok("User Successfully Logged on").await?;
        Ok(Phase::Transaction)
    }

    async fn stat(&mut self) -> Result<Phase> {
        let (messages, octets) = self.backend.stat(&self.user).map_err(Pop3Error::Backend)?;
        self.printer
            .ok(&format!("{} {}", messages, octets))
            .await?;
        Ok(Phase::Transaction)
    }

    async fn list(&mut self, args: &[String]) -> Result<Phase> {
        match args {
            [arg] => {
                let msg_id = parse_message_number(arg)?;
                let listing = self
                    .backend
                    .list_message(&self.user, msg_id)
                    .map_err(Pop3Error::Backend)?;
                match listing {
                    Some(octets) => self.printer.ok(&format!("{} {}", msg_id, octets)).await?,
                    None => self.printer.err("no such message").await?,
                }
            }
            [] => {
                let sizes = self.backend.list(&self.user).map_err(Pop3Error::Backend)?;
                self.printer.ok(&format!("{} messages", sizes.len())).await?;
                let lines: Vec<String> = sizes
                    .iter()
                    .enumerate()
                    .map(|(index, octets)| format!("{} {}", index, octets))
                    .collect();
                self.printer.multi_line(&lines).await?;
            }
            _ => return Err(Pop3Error::InvalidArgument(args.join(" "))),
        }

        Ok(Phase::Transaction)
    }

    async fn retr(&mut self, args: &[String]) -> Result<Phase> {
        let arg = match args {
            [arg] => arg,
            [] => return Err(Pop3Error::MissingArgument(Command::Retr)),
            _ => return Err(Pop3Error::InvalidArgument(args.join(" "))),
        };
        let msg_id = parse_message_number(arg)?;

        let message = self
            .backend
            .retr(&self.user, msg_id)
            .map_err(Pop3Error::Backend)?;

        self.printer.ok("").await?;
        let lines: Vec<&str> = message.split("\r\n").collect();
        self.printer.multi_line(&lines).await?;
        Ok(Phase::Transaction)
    }

    async fn dele(&mut self, args: &[String]) -> Result<Phase> {
        let arg = match args {
            [arg] => arg,
            [] => return Err(Pop3Error::MissingArgument(Command::Dele)),
            _ => return Err(Pop3Error::InvalidArgument(args.join(" "))),
        };
        let msg_id = parse_message_number(arg)?;

        self.backend
            .dele(&self.user, msg_id)
            .map_err(Pop3Error::Backend)?;

        self.printer
            .ok(&format!("Message {} deleted", msg_id))
            .await?;
        Ok(Phase::Transaction)
    }

    async fn noop(&mut self) -> Result<Phase> {
        self.printer.ok("").await?;
        Ok(Phase::Transaction)
    }

    async fn rset(&mut self) -> Result<Phase> {
        self.backend.rset(&self.user).map_err(Pop3Error::Backend)?;
        self.printer.ok("").await?;
        Ok(Phase::Transaction)
    }

    async fn uidl(&mut self, args: &[String]) -> Result<Phase> {
        match args {
            [arg] => {
                let msg_id = parse_message_number(arg)?;
                let listing = self
                    .backend
                    .uidl_message(&self.user, msg_id)
                    .map_err(Pop3Error::Backend)?;
                match listing {
                    Some(uid) => self.printer.ok(&format!("{} {}", msg_id, uid)).await?,
                    None => self.printer.err("no such message").await?,
                }
            }
            [] => {
                let uids = self.backend.uidl(&self.user).map_err(Pop3Error::Backend)?;
                self.printer.ok(&format!("{} messages", uids.len())).await?;
                let lines: Vec<String> = uids
                    .iter()
                    .enumerate()
                    .map(|(index, uid)| format!("{} {}", index, uid))
                    .collect();
                self.printer.multi_line(&lines).await?;
            }
            _ => return Err(Pop3Error::InvalidArgument(args.join(" "))),
        }

        Ok(Phase::Transaction)
    }

    /// Admitted in any phase and leaves it unchanged
    async fn capa(&mut self) -> Result<Phase> {
        self.printer.ok("").await?;
        self.printer.multi_line(CAPABILITIES).await?;
        Ok(self.phase)
    }
}
