//! In-memory collaborators for tests and single-process deployments
//!
//! [`MemoryAuthorizer`] is a plain user/password table. [`MemoryBackend`]
//! keeps every maildrop in process memory behind a mutex and implements the
//! full [`Backend`](crate::Backend) contract, including real per-user lock
//! exclusivity and session deletion marks.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::backend::{Authorizer, Backend};
use crate::error::BackendError;

/// Credential table checking passwords by exact match
#[derive(Debug, Default)]
pub struct MemoryAuthorizer {
    users: HashMap<String, String>,
}

impl MemoryAuthorizer {
    /// Create an empty credential table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user; an existing password for the same user is replaced
    pub fn add_user(&mut self, user: impl Into<String>, pass: impl Into<String>) {
        self.users.insert(user.into(), pass.into());
    }
}

impl Authorizer for MemoryAuthorizer {
    fn authorize(&self, user: &str, pass: &str) -> bool {
        self.users.get(user).is_some_and(|stored| stored == pass)
    }
}

#[derive(Debug)]
struct StoredMessage {
    uid: String,
    body: String,
    deleted: bool,
}

impl StoredMessage {
    fn octets(&self) -> usize {
        self.body.len()
    }
}

#[derive(Debug, Default)]
struct Inner {
    drops: HashMap<String, Vec<StoredMessage>>,
    locked: HashSet<String>,
}

/// In-memory maildrop store
///
/// Message numbers are 0-based slots in delivery order, fixed for the
/// lifetime of the store. Messages marked deleted stay in their slot until
/// [`update`](Backend::update) commits the marks; `stat`, `list`, and `uidl`
/// skip them.
///
/// Shared across sessions as `Arc<MemoryBackend>`; all methods take `&self`.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    inner: Mutex<Inner>,
}

impl MemoryBackend {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to a user's maildrop, creating the maildrop on
    /// first delivery
    pub fn deliver(&self, user: &str, uid: impl Into<String>, body: impl Into<String>) {
        let mut inner = self.inner.lock().unwrap();
        inner.drops.entry(user.to_string()).or_default().push(StoredMessage {
            uid: uid.into(),
            body: body.into(),
            deleted: false,
        });
    }
}

fn no_such_message(msg_id: usize) -> BackendError {
    format!("no message with number {}", msg_id).into()
}

impl Backend for MemoryBackend {
    fn stat(&self, user: &str) -> Result<(usize, usize), BackendError> {
        let inner = self.inner.lock().unwrap();
        let messages = inner.drops.get(user).map(Vec::as_slice).unwrap_or_default();

        let listable = messages.iter().filter(|message| !message.deleted);
        let (count, octets) = listable.fold((0, 0), |(count, octets), message| {
            (count + 1, octets + message.octets())
        });
        Ok((count, octets))
    }

    fn list(&self, user: &str) -> Result<Vec<usize>, BackendError> {
        let inner = self.inner.lock().unwrap();
        let messages = inner.drops.get(user).map(Vec::as_slice).unwrap_or_default();

        Ok(messages
            .iter()
            .filter(|message| !message.deleted)
            .map(StoredMessage::octets)
            .collect())
    }

    fn list_message(&self, user: &str, msg_id: usize) -> Result<Option<usize>, BackendError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .drops
            .get(user)
            .and_then(|messages| messages.get(msg_id))
            .filter(|message| !message.deleted)
            .map(StoredMessage::octets))
    }

    fn retr(&self, user: &str, msg_id: usize) -> Result<String, BackendError> {
        let inner = self.inner.lock().unwrap();
        inner
            .drops
            .get(user)
            .and_then(|messages| messages.get(msg_id))
            .filter(|message| !message.deleted)
            .map(|message| message.body.clone())
            .ok_or_else(|| no_such_message(msg_id))
    }

    fn dele(&self, user: &str, msg_id: usize) -> Result<(), BackendError> {
        let mut inner = self.inner.lock().unwrap();
        let message = inner
            .drops
            .get_mut(user)
            .and_then(|messages| messages.get_mut(msg_id))
            .filter(|message| !message.deleted)
            .ok_or_else(|| no_such_message(msg_id))?;

        message.deleted = true;
        Ok(())
    }

    fn rset(&self, user: &str) -> Result<(), BackendError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(messages) = inner.drops.get_mut(user) {
            for message in messages {
                message.deleted = false;
            }
        }
        Ok(())
    }

    fn uidl(&self, user: &str) -> Result<Vec<String>, BackendError> {
        let inner = self.inner.lock().unwrap();
        let messages = inner.drops.get(user).map(Vec::as_slice).unwrap_or_default();

        Ok(messages
            .iter()
            .filter(|message| !message.deleted)
            .map(|message| message.uid.clone())
            .collect())
    }

    fn uidl_message(&self, user: &str, msg_id: usize) -> Result<Option<String>, BackendError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .drops
            .get(user)
            .and_then(|messages| messages.get(msg_id))
            .filter(|message| !message.deleted)
            .map(|message| message.uid.clone()))
    }

    fn update(&self, user: &str) -> Result<(), BackendError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(messages) = inner.drops.get_mut(user) {
            messages.retain(|message| !message.deleted);
        }
        Ok(())
    }

    fn lock(&self, user: &str) -> Result<(), BackendError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.locked.insert(user.to_string()) {
            return Err(format!("maildrop for {} is already locked", user).into());
        }
        Ok(())
    }

    fn unlock(&self, user: &str) -> Result<(), BackendError> {
        let mut inner = self.inner.lock().unwrap();
        inner.locked.remove(user);
        Ok(())
    }
}
