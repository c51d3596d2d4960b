//! Wire codec for POP3 replies
//!
//! Serializes single-line `+OK`/`-ERR` status replies and multi-line
//! responses terminated by `.\r\n`, byte-stuffing payload lines that start
//! with `.` (RFC 1939 §3). Every write is CRLF-terminated and flushed.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::error::Result;

/// Reply serializer bound to one client transport
///
/// Multi-line responses must be preceded by a `+OK` status line emitted by
/// the caller; [`multi_line`](Printer::multi_line) writes only the payload
/// and the terminator.
pub struct Printer<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> Printer<W> {
    /// Bind a printer to the write half of a connection
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Greeting banner, sent once per connection before any input is read
    pub async fn welcome(&mut self) -> Result<()> {
        self.write_line("+OK POP3 server ready").await
    }

    /// `+OK` status line; the payload may be empty
    pub async fn ok(&mut self, message: &str) -> Result<()> {
        self.write_line(&format!("+OK {}", message)).await
    }

    /// `-ERR` status line
    pub async fn err(&mut self, message: &str) -> Result<()> {
        self.write_line(&format!("-ERR {}", message)).await
    }

    /// Multi-line payload followed by the `.\r\n` terminator
    ///
    /// A trailing CR is stripped from each line before framing; a line whose
    /// content begins with `.` is emitted with a leading extra `.` so the
    /// terminator stays unambiguous.
    pub async fn multi_line<S: AsRef<str>>(&mut self, lines: &[S]) -> Result<()> {
        let mut block = String::new();
        for line in lines {
            let line = line.as_ref();
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.starts_with('.') {
                block.push('.');
            }
            block.push_str(line);
            block.push_str("\r\n");
        }
        block.push_str(".\r\n");

        trace!("Sending {} payload lines", lines.len());
        self.writer.write_all(block.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        trace!("Sending: {}", line);
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;
        Ok(())
    }
}
