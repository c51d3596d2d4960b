//! Maildrop lock lifecycle: exactly one release per acquisition on every
//! exit path, and exclusivity between concurrent sessions

use super::common::{AcceptAll, TestClient, start_server};
use pop3_rs::{Backend, BackendError, MemoryBackend};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Delegating backend that counts lock-lifecycle calls and can be told to
/// fail `update`
#[derive(Default)]
struct CountingBackend {
    inner: MemoryBackend,
    locks: AtomicUsize,
    unlocks: AtomicUsize,
    updates: AtomicUsize,
    fail_update: AtomicBool,
}

impl CountingBackend {
    fn locks(&self) -> usize {
        self.locks.load(Ordering::SeqCst)
    }

    fn unlocks(&self) -> usize {
        self.unlocks.load(Ordering::SeqCst)
    }

    fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

impl Backend for CountingBackend {
    fn stat(&self, user: &str) -> Result<(usize, usize), BackendError> {
        self.inner.stat(user)
    }

    fn list(&self, user: &str) -> Result<Vec<usize>, BackendError> {
        self.inner.list(user)
    }

    fn list_message(&self, user: &str, msg_id: usize) -> Result<Option<usize>, BackendError> {
        self.inner.list_message(user, msg_id)
    }

    fn retr(&self, user: &str, msg_id: usize) -> Result<String, BackendError> {
        self.inner.retr(user, msg_id)
    }

    fn dele(&self, user: &str, msg_id: usize) -> Result<(), BackendError> {
        self.inner.dele(user, msg_id)
    }

    fn rset(&self, user: &str) -> Result<(), BackendError> {
        self.inner.rset(user)
    }

    fn uidl(&self, user: &str) -> Result<Vec<String>, BackendError> {
        self.inner.uidl(user)
    }

    fn uidl_message(&self, user: &str, msg_id: usize) -> Result<Option<String>, BackendError> {
        self.inner.uidl_message(user, msg_id)
    }

    fn update(&self, user: &str) -> Result<(), BackendError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if self.fail_update.load(Ordering::SeqCst) {
            return Err("update rejected".into());
        }
        self.inner.update(user)
    }

    fn lock(&self, user: &str) -> Result<(), BackendError> {
        self.inner.lock(user)?;
        self.locks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn unlock(&self, user: &str) -> Result<(), BackendError> {
        self.unlocks.fetch_add(1, Ordering::SeqCst);
        self.inner.unlock(user)
    }
}

/// Poll until the counter reaches the expected value or give up
async fn wait_for(read: impl Fn() -> usize, expected: usize, what: &str) {
    for _ in 0..200 {
        if read() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{} never reached {}", what, expected);
}

#[tokio::test]
async fn test_clean_quit_locks_and_unlocks_once() {
    let backend = Arc::new(CountingBackend::default());
    let addr = start_server(Arc::new(AcceptAll), Arc::clone(&backend) as Arc<dyn Backend>).await;

    let mut client = TestClient::connect(addr).await;
    client.login("john", "secret").await;
    assert_eq!(backend.locks(), 1);
    assert_eq!(backend.unlocks(), 0);

    assert_eq!(client.roundtrip("QUIT").await, "+OK Goodbye\r\n");
    client.expect_eof().await;

    assert_eq!(backend.locks(), 1);
    assert_eq!(backend.unlocks(), 1);
    assert_eq!(backend.updates(), 1);
}

#[tokio::test]
async fn test_disconnect_releases_lock() {
    let backend = Arc::new(CountingBackend::default());
    let addr = start_server(Arc::new(AcceptAll), Arc::clone(&backend) as Arc<dyn Backend>).await;

    let mut client = TestClient::connect(addr).await;
    client.login("john", "secret").await;
    assert_eq!(backend.locks(), 1);

    // Drop the connection without QUIT
    drop(client);

    let counting = Arc::clone(&backend);
    wait_for(move || counting.unlocks(), 1, "unlock count").await;
    // The abnormal exit never committed deletions
    assert_eq!(backend.updates(), 0);
}

#[tokio::test]
async fn test_quit_before_login_never_touches_the_lock() {
    let backend = Arc::new(CountingBackend::default());
    let addr = start_server(Arc::new(AcceptAll), Arc::clone(&backend) as Arc<dyn Backend>).await;

    let mut client = TestClient::connect(addr).await;
    assert_eq!(client.roundtrip("USER john").await, "+OK \r\n");
    assert_eq!(client.roundtrip("QUIT").await, "+OK Goodbye\r\n");
    client.expect_eof().await;

    assert_eq!(backend.locks(), 0);
    assert_eq!(backend.unlocks(), 0);
    assert_eq!(backend.updates(), 0);
}

#[tokio::test]
async fn test_update_failure_keeps_session_and_lock_for_retry() {
    let backend = Arc::new(CountingBackend::default());
    backend.fail_update.store(true, Ordering::SeqCst);
    let addr = start_server(Arc::new(AcceptAll), Arc::clone(&backend) as Arc<dyn Backend>).await;

    let mut client = TestClient::connect(addr).await;
    client.login("john", "secret").await;

    // The failed QUIT leaves the session in TRANSACTION with the lock held
    assert_eq!(
        client.roundtrip("QUIT").await,
        "-ERR Error executing command QUIT\r\n"
    );
    assert_eq!(backend.unlocks(), 0);
    assert_eq!(client.roundtrip("STAT").await, "+OK 0 0\r\n");

    // Once update recovers, QUIT completes and releases the lock exactly once
    backend.fail_update.store(false, Ordering::SeqCst);
    assert_eq!(client.roundtrip("QUIT").await, "+OK Goodbye\r\n");
    client.expect_eof().await;

    assert_eq!(backend.locks(), 1);
    assert_eq!(backend.unlocks(), 1);
    assert_eq!(backend.updates(), 2);
}

#[tokio::test]
async fn test_concurrent_sessions_for_same_user_contend_on_the_lock() {
    let backend = Arc::new(CountingBackend::default());
    let addr = start_server(Arc::new(AcceptAll), Arc::clone(&backend) as Arc<dyn Backend>).await;

    let mut first = TestClient::connect(addr).await;
    first.login("john", "secret").await;

    // The second session authenticates but cannot take the maildrop
    let mut second = TestClient::connect(addr).await;
    assert_eq!(second.roundtrip("USER john").await, "+OK \r\n");
    assert_eq!(
        second.roundtrip("PASS secret").await,
        "-ERR Server was unable to lock maildrop\r\n"
    );

    // A lock failure does not advance the state machine, so PASS may be
    // retried directly once the first session is gone
    assert_eq!(first.roundtrip("QUIT").await, "+OK Goodbye\r\n");
    first.expect_eof().await;

    assert_eq!(
        second.roundtrip("PASS secret").await,
        "+OK User Successfully Logged on\r\n"
    );
    assert_eq!(second.roundtrip("QUIT").await, "+OK Goodbye\r\n");
    second.expect_eof().await;

    assert_eq!(backend.locks(), 2);
    assert_eq!(backend.unlocks(), 2);
}

#[tokio::test]
async fn test_sessions_for_different_users_do_not_contend() {
    let backend = Arc::new(CountingBackend::default());
    let addr = start_server(Arc::new(AcceptAll), Arc::clone(&backend) as Arc<dyn Backend>).await;

    let mut john = TestClient::connect(addr).await;
    let mut jane = TestClient::connect(addr).await;
    john.login("john", "secret").await;
    jane.login("jane", "secret").await;

    assert_eq!(john.roundtrip("QUIT").await, "+OK Goodbye\r\n");
    assert_eq!(jane.roundtrip("QUIT").await, "+OK Goodbye\r\n");

    assert_eq!(backend.locks(), 2);
    assert_eq!(backend.unlocks(), 2);
}
