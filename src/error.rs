//! POP3 engine error types

use thiserror::Error;

use crate::command::Command;
use crate::session::Phase;

/// Error type returned by [`Authorizer`](crate::Authorizer) and
/// [`Backend`](crate::Backend) implementations.
pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

/// POP3 protocol and session errors
///
/// Variants whose `Display` text is a protocol reply (`MissingArgument`,
/// `InvalidArgument`, `Lock`, `Unlock`) are written to the client verbatim
/// by the dispatcher; the remaining variants surface as the generic
/// `Error executing command <verb>` reply.
#[derive(Error, Debug)]
pub enum Pop3Error {
    /// IO error on the client transport
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Session sat idle past the configured deadline
    #[error("Connection timeout")]
    Timeout,

    /// Client closed the connection
    #[error("Connection closed")]
    ConnectionClosed,

    /// Command dispatched in a phase where it is not admitted
    #[error("{command} is not valid in the {phase} state")]
    InvalidState {
        /// The rejected command
        command: Command,
        /// The phase the session was in
        phase: Phase,
    },

    /// Required argument absent
    #[error("Missing argument for {0} command")]
    MissingArgument(Command),

    /// Argument could not be parsed as a message number
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Maildrop lock could not be acquired
    #[error("Server was unable to lock maildrop")]
    Lock(#[source] BackendError),

    /// Maildrop lock could not be released
    #[error("Server was unable to unlock maildrop")]
    Unlock(#[source] BackendError),

    /// The maildrop backend reported a failure
    #[error("Backend error: {0}")]
    Backend(#[source] BackendError),
}

/// Result type alias using Pop3Error
pub type Result<T> = std::result::Result<T, Pop3Error>;
