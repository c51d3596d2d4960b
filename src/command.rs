//! POP3 command verbs and request-line parsing

use std::fmt;
use std::str::FromStr;

/// Command verbs understood by the session engine (RFC 1939, plus the
/// RFC 2449 `CAPA` extension)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// End the session; commits pending deletions when issued from TRANSACTION
    Quit,
    /// Name the user whose maildrop the client wants
    User,
    /// Supply the password; must directly follow a successful `USER`
    Pass,
    /// Message count and total octets of the maildrop
    Stat,
    /// Scan listing, for one message or the whole maildrop
    List,
    /// Retrieve a full message
    Retr,
    /// Mark a message for deletion
    Dele,
    /// Keep-alive, no side effect
    Noop,
    /// Unmark all messages marked for deletion in this session
    Rset,
    /// Unique-id listing, for one message or the whole maildrop
    Uidl,
    /// Capability announcement (RFC 2449); admitted in any phase
    Capa,
}

/// Error returned when a verb does not name a supported command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownCommand;

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> std::result::Result<Self, UnknownCommand> {
        Ok(match s {
            "QUIT" => Command::Quit,
            "USER" => Command::User,
            "PASS" => Command::Pass,
            "STAT" => Command::Stat,
            "LIST" => Command::List,
            "RETR" => Command::Retr,
            "DELE" => Command::Dele,
            "NOOP" => Command::Noop,
            "RSET" => Command::Rset,
            "UIDL" => Command::Uidl,
            "CAPA" => Command::Capa,
            _ => return Err(UnknownCommand),
        })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Command::Quit => "QUIT",
            Command::User => "USER",
            Command::Pass => "PASS",
            Command::Stat => "STAT",
            Command::List => "LIST",
            Command::Retr => "RETR",
            Command::Dele => "DELE",
            Command::Noop => "NOOP",
            Command::Rset => "RSET",
            Command::Uidl => "UIDL",
            Command::Capa => "CAPA",
        };

        write!(f, "{}", verb)
    }
}

/// A client request line split into verb and arguments
///
/// The verb is uppercased so matching is case-insensitive; arguments keep
/// their original case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Uppercased command keyword; empty for a blank input line
    pub verb: String,
    /// Remaining tokens in original case
    pub args: Vec<String>,
}

impl Request {
    /// Parse a raw request line
    ///
    /// Surrounding CR, LF, and spaces are trimmed, then the line is split on
    /// spaces. An empty line yields an empty verb, which fails dispatch.
    pub fn parse(line: &str) -> Request {
        let trimmed = line.trim_matches(['\r', '\n', ' ']);
        let mut tokens = trimmed.split(' ').filter(|token| !token.is_empty());

        let verb = tokens.next().unwrap_or("").to_uppercase();
        let args = tokens.map(str::to_string).collect();

        Request { verb, args }
    }
}
