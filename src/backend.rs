//! Collaborator contracts for credential checks and maildrop access
//!
//! The engine drives two pluggable collaborators: an [`Authorizer`] that
//! checks credentials during the AUTHORIZATION phase, and a [`Backend`] that
//! owns the maildrops. Both are called synchronously from the session task;
//! a slow implementation blocks its own session but no other.

use crate::error::BackendError;

/// Credential check used by the `PASS` handler
pub trait Authorizer: Send + Sync {
    /// Pure check of a username/password pair; the engine assumes no side
    /// effects.
    fn authorize(&self, user: &str, pass: &str) -> bool;
}

/// Access to per-user maildrops
///
/// Message numbers are small non-negative integers the engine passes through
/// from the client unchanged; their interpretation belongs to the
/// implementation. Deletion marks are per-session and backend-managed:
/// `dele` marks, `rset` unmarks, `update` commits on a clean `QUIT`.
pub trait Backend: Send + Sync {
    /// Message count and total size in octets, excluding messages marked
    /// deleted
    fn stat(&self, user: &str) -> Result<(usize, usize), BackendError>;

    /// Octet size of every listable message; the position in the returned
    /// sequence is the index other calls use
    fn list(&self, user: &str) -> Result<Vec<usize>, BackendError>;

    /// Scan listing for one message; `None` when no such message exists
    fn list_message(&self, user: &str, msg_id: usize) -> Result<Option<usize>, BackendError>;

    /// Full message body, with `\r\n` line terminators
    fn retr(&self, user: &str, msg_id: usize) -> Result<String, BackendError>;

    /// Mark a message for deletion; reflected by `stat`/`list` for the rest
    /// of the session
    fn dele(&self, user: &str, msg_id: usize) -> Result<(), BackendError>;

    /// Unmark every message marked for deletion in this session
    fn rset(&self, user: &str) -> Result<(), BackendError>;

    /// Unique-id of every listable message, positionally aligned with
    /// [`list`](Backend::list)
    fn uidl(&self, user: &str) -> Result<Vec<String>, BackendError>;

    /// Unique-id listing for one message; `None` when no such message exists
    fn uidl_message(&self, user: &str, msg_id: usize) -> Result<Option<String>, BackendError>;

    /// Commit pending deletions; called on the TRANSACTION → UPDATE edge
    fn update(&self, user: &str) -> Result<(), BackendError>;

    /// Take the exclusive maildrop lock for a user
    ///
    /// Must fail while another session holds the lock for the same user.
    fn lock(&self, user: &str) -> Result<(), BackendError>;

    /// Release the maildrop lock
    ///
    /// Must be safe to call when the maildrop is not locked; the engine may
    /// retry a release on error paths.
    fn unlock(&self, user: &str) -> Result<(), BackendError>;
}
